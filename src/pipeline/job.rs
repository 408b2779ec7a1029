//! The per-job execution state machine.
//!
//! A [`Job`] is owned by exactly one worker while it runs. Everything a
//! status query may read lives behind a [`JobHandle`], which the manager
//! keeps and reads concurrently without touching the job itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::{FilterKind, JobConfig, OutputFormat};
use super::context::StageContext;
use super::filter::Corruptor;
use super::source::GeneratorSource;
use super::stage::{
    FilterStage, PersistenceStage, PersistenceStatus, SinkStage, SourceStage, StatusCell,
};
use super::status::JobStatus;
use crate::error::{ConfigurationError, GenerationError, JobError};
use crate::export::build_sinks;
use crate::metrics::MetricsCollector;
use crate::model::{
    ArtifactSummary, BackendKind, PersistenceResult, Record, SinkArtifact, Specification,
    SpecificationKind,
};
use crate::storage::build_persisters;
use crate::utils::lock;

/// Invoked once with the finished job, on the worker, after the terminal
/// status is set.
pub type CompletionCallback = Box<dyn FnOnce(&Job) + Send>;

/// The resolved stages of a configured job.
pub struct StageSet {
    pub specification: Arc<Specification>,
    pub source: Box<dyn SourceStage>,
    pub filters: Vec<Box<dyn FilterStage>>,
    pub sinks: Vec<Box<dyn SinkStage>>,
    pub persisters: Vec<Box<dyn PersistenceStage>>,
}

impl StageSet {
    /// Builds every stage named by `config`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown specification, output format or filter, and on
    /// any field the source cannot resolve.
    pub fn build(config: &JobConfig, context: &StageContext) -> Result<Self, ConfigurationError> {
        if config.count == 0 {
            return Err(ConfigurationError::InvalidCount);
        }
        let kind = SpecificationKind::from_name(&config.specification)
            .ok_or_else(|| ConfigurationError::UnknownSpecification(config.specification.clone()))?;
        let format = OutputFormat::from_name(&config.output_format)
            .ok_or_else(|| ConfigurationError::UnknownOutputFormat(config.output_format.clone()))?;
        let filter_kinds = config
            .filters
            .iter()
            .map(|name| {
                FilterKind::from_name(name)
                    .ok_or_else(|| ConfigurationError::UnknownFilter(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let specification = Arc::new(kind.specification());
        let source = GeneratorSource::new(specification.clone(), &context.registry)?;
        let filters = filter_kinds
            .into_iter()
            .map(|kind| {
                Box::new(Corruptor::new(
                    kind,
                    specification.clone(),
                    context.registry.clone(),
                )) as Box<dyn FilterStage>
            })
            .collect();
        let sinks = build_sinks(format, &specification, config, context.stream.as_ref())?;
        let persisters = build_persisters(config, &specification);

        Ok(Self {
            specification,
            source: Box::new(source),
            filters,
            sinks,
            persisters,
        })
    }
}

#[derive(Debug)]
struct Lifecycle {
    status: JobStatus,
    cancel_requested: bool,
    started: Option<(Instant, DateTime<Utc>)>,
    ended: Option<(Instant, DateTime<Utc>)>,
}

/// State shared between a running job and its observers.
#[derive(Debug)]
struct JobState {
    lifecycle: Mutex<Lifecycle>,
    count: AtomicU64,
    current: AtomicU64,
    produced: AtomicU64,
    skipped: AtomicU64,
    artifacts: Mutex<Vec<ArtifactSummary>>,
    results: Mutex<Vec<PersistenceResult>>,
    persistence: Mutex<Vec<(BackendKind, StatusCell)>>,
}

/// A cheap, clonable view of a job's observable state.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: Uuid,
    state: Arc<JobState>,
}

impl JobHandle {
    fn new(id: Uuid, count: u64) -> Self {
        Self {
            id,
            state: Arc::new(JobState {
                lifecycle: Mutex::new(Lifecycle {
                    status: JobStatus::Uninitialized,
                    cancel_requested: false,
                    started: None,
                    ended: None,
                }),
                count: AtomicU64::new(count),
                current: AtomicU64::new(0),
                produced: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
                artifacts: Mutex::new(Vec::new()),
                results: Mutex::new(Vec::new()),
                persistence: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        lock(&self.state.lifecycle).status
    }

    /// Requests cancellation.
    ///
    /// Accepted once while the job is pending, executing or persisting.
    /// Generation stops before the next record; once persisting the request
    /// has no effect on the outcome.
    pub fn cancel(&self) -> bool {
        let mut lifecycle = lock(&self.state.lifecycle);
        if lifecycle.cancel_requested || !lifecycle.status.is_active() {
            return false;
        }
        lifecycle.cancel_requested = true;
        info!(job_id = %self.id, status = %lifecycle.status, "Cancellation requested");
        true
    }

    pub fn is_cancel_requested(&self) -> bool {
        lock(&self.state.lifecycle).cancel_requested
    }

    /// Requested record count.
    pub fn count(&self) -> u64 {
        self.state.count.load(Ordering::Acquire)
    }

    /// Next sequence number to generate.
    pub fn current(&self) -> u64 {
        self.state.current.load(Ordering::Acquire)
    }

    /// Records handed to the sinks so far.
    pub fn produced(&self) -> u64 {
        self.state.produced.load(Ordering::Acquire)
    }

    pub fn skipped(&self) -> u64 {
        self.state.skipped.load(Ordering::Acquire)
    }

    /// Records still to be generated, for in-flight accounting.
    pub fn remaining(&self) -> u64 {
        self.count().saturating_sub(self.current())
    }

    /// Percentage of sequence numbers processed, only while executing.
    pub fn progress(&self) -> Option<f64> {
        if self.status() != JobStatus::Executing {
            return None;
        }
        let count = self.count();
        if count == 0 {
            return Some(0.0);
        }
        Some(self.current() as f64 / count as f64 * 100.0)
    }

    /// Time since execution started; frozen once the job ends.
    pub fn elapsed(&self) -> Option<Duration> {
        let lifecycle = lock(&self.state.lifecycle);
        let (started, _) = lifecycle.started?;
        let end = lifecycle.ended.map_or_else(Instant::now, |(ended, _)| ended);
        Some(end.saturating_duration_since(started))
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.state.lifecycle).started.map(|(_, at)| at)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.state.lifecycle).ended.map(|(_, at)| at)
    }

    pub fn artifacts(&self) -> Vec<ArtifactSummary> {
        lock(&self.state.artifacts).clone()
    }

    pub fn results(&self) -> Vec<PersistenceResult> {
        lock(&self.state.results).clone()
    }

    /// Current status of each configured persistence backend.
    pub fn persistence_status(&self) -> HashMap<BackendKind, PersistenceStatus> {
        lock(&self.state.persistence)
            .iter()
            .map(|(backend, cell)| (*backend, cell.get()))
            .collect()
    }

    fn set_status(&self, status: JobStatus) {
        lock(&self.state.lifecycle).status = status;
    }
}

/// One execution of the pipeline against a fixed configuration.
pub struct Job {
    id: Uuid,
    config: JobConfig,
    handle: JobHandle,
    stages: Option<StageSet>,
    completion: Option<CompletionCallback>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Job {
    /// Creates an unconfigured job. An id already present in `config` is
    /// kept; otherwise a fresh one is assigned.
    pub fn new(config: JobConfig) -> Self {
        let id = config.id.unwrap_or_else(Uuid::new_v4);
        let handle = JobHandle::new(id, config.count);
        Self {
            id,
            config,
            handle,
            stages: None,
            completion: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Mutable access to the configuration, only before configuration.
    pub fn config_mut(&mut self) -> Result<&mut JobConfig, JobError> {
        let status = self.status();
        if status != JobStatus::Uninitialized {
            return Err(JobError::ConfigFrozen {
                id: self.id,
                status,
            });
        }
        Ok(&mut self.config)
    }

    pub fn status(&self) -> JobStatus {
        self.handle.status()
    }

    pub fn handle(&self) -> JobHandle {
        self.handle.clone()
    }

    pub fn specification(&self) -> Option<&Specification> {
        self.stages.as_ref().map(|s| s.specification.as_ref())
    }

    /// Adds a completion callback. Callbacks run in registration order.
    pub fn on_completion(&mut self, callback: impl FnOnce(&Job) + Send + 'static) {
        let previous = self.completion.take();
        self.completion = Some(Box::new(move |job: &Job| {
            if let Some(previous) = previous {
                previous(job);
            }
            callback(job);
        }));
    }

    /// Resolves the configuration into stages and moves the job to Pending.
    ///
    /// # Errors
    ///
    /// Any resolution failure leaves the job Uninitialized.
    pub fn configure(&mut self, context: &StageContext) -> Result<(), ConfigurationError> {
        self.ensure_uninitialized()?;
        self.config.id = Some(self.id);
        let stages = StageSet::build(&self.config, context)?;
        self.configure_with(stages)
    }

    /// Moves the job to Pending with caller-supplied stages.
    pub fn configure_with(&mut self, stages: StageSet) -> Result<(), ConfigurationError> {
        self.ensure_uninitialized()?;
        if self.config.count == 0 {
            return Err(ConfigurationError::InvalidCount);
        }
        self.config.id = Some(self.id);

        *lock(&self.handle.state.persistence) = stages
            .persisters
            .iter()
            .map(|p| (p.backend(), p.status()))
            .collect();
        self.handle
            .state
            .count
            .store(self.config.count, Ordering::Release);

        info!(
            job_id = %self.id,
            specification = %stages.specification.name,
            count = self.config.count,
            sinks = stages.sinks.len(),
            filters = stages.filters.len(),
            persisters = stages.persisters.len(),
            "Job configured"
        );
        self.stages = Some(stages);
        self.handle.set_status(JobStatus::Pending);
        Ok(())
    }

    fn ensure_uninitialized(&self) -> Result<(), ConfigurationError> {
        match self.status() {
            JobStatus::Uninitialized => Ok(()),
            status => Err(ConfigurationError::NotConfigurable(status)),
        }
    }

    /// A generator seeded from the configuration, or randomly.
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.config.seed.unwrap_or_else(rand::random))
    }

    /// Executes the job with a generator seeded by [`Job::rng`].
    pub fn run(&mut self) -> Result<JobStatus, JobError> {
        let mut rng = self.rng();
        self.execute(&mut rng)
    }

    /// Runs the job to a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotPending`] unless the job is Pending.
    pub fn execute(&mut self, rng: &mut ChaCha8Rng) -> Result<JobStatus, JobError> {
        {
            let mut lifecycle = lock(&self.handle.state.lifecycle);
            if lifecycle.status != JobStatus::Pending || self.stages.is_none() {
                return Err(JobError::NotPending {
                    id: self.id,
                    status: lifecycle.status,
                });
            }
            lifecycle.status = JobStatus::Executing;
            lifecycle.started = Some((Instant::now(), Utc::now()));
        }
        let Some(mut stages) = self.stages.take() else {
            return Err(JobError::NotPending {
                id: self.id,
                status: JobStatus::Executing,
            });
        };
        info!(job_id = %self.id, count = self.config.count, "Job executing");

        let aborted = self.transform(&mut stages, rng);
        let transform_elapsed = self.handle.elapsed().unwrap_or_default();

        let persisting = {
            let mut lifecycle = lock(&self.handle.state.lifecycle);
            let persisting = !aborted && !lifecycle.cancel_requested;
            if persisting {
                lifecycle.status = JobStatus::Persisting;
            }
            persisting
        };
        if persisting {
            info!(job_id = %self.id, "Job persisting");
        }

        let artifacts = self.finish_sinks(&mut stages);
        if persisting {
            let extra = self.extra_metadata(&stages, transform_elapsed);
            self.persist(&mut stages, &artifacts, &extra);
        }
        for artifact in artifacts {
            let id = artifact.id;
            if let Err(e) = artifact.cleanup() {
                warn!(job_id = %self.id, artifact_id = %id, error = %e, "Failed to clean up artifact");
            }
        }

        let status = if persisting {
            JobStatus::Success
        } else if aborted {
            JobStatus::Failed
        } else {
            JobStatus::Canceled
        };
        {
            let mut lifecycle = lock(&self.handle.state.lifecycle);
            lifecycle.status = status;
            lifecycle.ended = Some((Instant::now(), Utc::now()));
        }

        let elapsed = self.handle.elapsed().unwrap_or_default();
        info!(
            job_id = %self.id,
            status = %status,
            produced = self.handle.produced(),
            skipped = self.handle.skipped(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Job finished"
        );
        MetricsCollector::new().record_job(
            status,
            &stages.specification.name,
            elapsed.as_secs_f64(),
        );

        if let Some(callback) = self.completion.take() {
            callback(self);
        }
        Ok(status)
    }

    /// Drives the source, filters and sinks. Returns `true` when too many
    /// records were skipped and the job must fail.
    fn transform(&self, stages: &mut StageSet, rng: &mut ChaCha8Rng) -> bool {
        let state = &self.handle.state;
        let ready: Vec<bool> = stages
            .sinks
            .iter_mut()
            .map(|sink| {
                let ready = sink.prepare();
                if !ready {
                    warn!(job_id = %self.id, sink = sink.name(), "Sink excluded after failed prepare");
                }
                ready
            })
            .collect();
        stages.filters.retain_mut(|filter| {
            let ready = filter.prepare();
            if !ready {
                debug!(job_id = %self.id, filter = filter.name(), "Filter opted out");
            }
            ready
        });

        let allowed_skips = self.config.allowed_skips();
        let metrics = MetricsCollector::new();
        let mut produced_here = 0u64;
        let mut aborted = false;

        for sequence in 0..self.config.count {
            if self.handle.is_cancel_requested() {
                debug!(job_id = %self.id, sequence, "Cancellation observed");
                break;
            }

            match next_record(stages, rng, sequence) {
                Ok(record) => {
                    for (sink, _) in stages.sinks.iter_mut().zip(&ready).filter(|(_, r)| **r) {
                        if !sink.sink(&record) {
                            debug!(job_id = %self.id, sink = sink.name(), sequence, "Sink rejected record");
                        }
                    }
                    state.produced.fetch_add(1, Ordering::AcqRel);
                    produced_here += 1;
                }
                Err(e) => {
                    let skipped = state.skipped.fetch_add(1, Ordering::AcqRel) + 1;
                    metrics.record_skipped();
                    warn!(job_id = %self.id, sequence, error = %e, "Skipping record");
                    if skipped > allowed_skips {
                        warn!(
                            job_id = %self.id,
                            skipped,
                            allowed = allowed_skips,
                            "Too many skipped records, aborting job"
                        );
                        aborted = true;
                    }
                }
            }
            state.current.store(sequence + 1, Ordering::Release);
            if aborted {
                break;
            }
        }

        metrics.record_generated(&stages.specification.name, produced_here);
        aborted
    }

    fn finish_sinks(&self, stages: &mut StageSet) -> Vec<SinkArtifact> {
        let mut artifacts = Vec::new();
        for sink in stages.sinks.iter_mut() {
            match sink.finish() {
                Ok(Some(artifact)) => {
                    debug!(
                        job_id = %self.id,
                        sink = sink.name(),
                        artifact_id = %artifact.id,
                        records = artifact.record_count,
                        "Sink produced artifact"
                    );
                    artifacts.push(artifact);
                }
                Ok(None) => {}
                Err(e) => warn!(job_id = %self.id, sink = sink.name(), error = %e, "Sink failed to finish"),
            }
        }
        *lock(&self.handle.state.artifacts) = artifacts.iter().map(SinkArtifact::summary).collect();
        artifacts
    }

    fn extra_metadata(&self, stages: &StageSet, transform_elapsed: Duration) -> Map<String, Value> {
        let mut extra = Map::new();
        extra.insert(
            "transformStageElapsedMs".to_string(),
            json!(transform_elapsed.as_millis() as u64),
        );
        extra.insert("producedCount".to_string(), json!(self.handle.produced()));
        extra.insert("skippedCount".to_string(), json!(self.handle.skipped()));
        if !stages.filters.is_empty() {
            let names: Vec<&str> = stages.filters.iter().map(|f| f.name()).collect();
            extra.insert("filters".to_string(), json!(names.join(",")));
            extra.insert("defects".to_string(), json!(true));
        }
        if let Some(prefix) = &self.config.user_prefix {
            extra.insert("userPrefix".to_string(), json!(prefix));
        }
        extra
    }

    fn persist(&self, stages: &mut StageSet, artifacts: &[SinkArtifact], extra: &Map<String, Value>) {
        let metrics = MetricsCollector::new();
        for artifact in artifacts {
            for persister in stages.persisters.iter_mut() {
                let result = persister.persist(artifact, extra);
                metrics.record_persistence(result.backend, result.success);
                if result.success {
                    info!(
                        job_id = %self.id,
                        backend = %result.backend,
                        artifact_id = %artifact.id,
                        "Artifact persisted"
                    );
                } else {
                    warn!(
                        job_id = %self.id,
                        backend = %result.backend,
                        artifact_id = %artifact.id,
                        error = ?result.metadata.get("error"),
                        "Artifact persistence failed"
                    );
                }
                lock(&self.handle.state.results).push(result);
            }
        }
    }
}

fn next_record(
    stages: &mut StageSet,
    rng: &mut ChaCha8Rng,
    sequence: u64,
) -> Result<Record, GenerationError> {
    let mut record = stages.source.next(rng, sequence)?;
    for filter in stages.filters.iter_mut() {
        if filter.sink(&record) {
            record = filter.next(rng, sequence)?;
        }
    }
    record.sequence = sequence;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::model::{FieldKind, FieldSpec, FieldValue};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counters {
        prepared: AtomicUsize,
        sunk: AtomicUsize,
        finished: AtomicUsize,
        sequences: Mutex<Vec<FieldValue>>,
    }

    struct CountingSink {
        counters: Arc<Counters>,
        ready: bool,
    }

    impl SinkStage for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn prepare(&mut self) -> bool {
            self.counters.prepared.fetch_add(1, Ordering::SeqCst);
            self.ready
        }

        fn sink(&mut self, record: &Record) -> bool {
            self.counters.sunk.fetch_add(1, Ordering::SeqCst);
            lock(&self.counters.sequences).push(record.values[0].clone());
            true
        }

        fn finish(&mut self) -> Result<Option<SinkArtifact>, StageError> {
            self.counters.finished.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    /// Fails every sequence number listed in `failing`.
    struct ScriptedSource {
        specification: Specification,
        failing: Vec<u64>,
        cancel_at: Option<(u64, JobHandle)>,
    }

    impl SourceStage for ScriptedSource {
        fn specification(&self) -> &Specification {
            &self.specification
        }

        fn next(&mut self, _rng: &mut ChaCha8Rng, sequence: u64) -> Result<Record, GenerationError> {
            if let Some((at, handle)) = &self.cancel_at {
                if *at == sequence {
                    handle.cancel();
                }
            }
            if self.failing.contains(&sequence) {
                return Err(GenerationError::Invalid(format!("scripted failure at {}", sequence)));
            }
            Ok(Record::new(sequence, vec![FieldValue::UInt(sequence)]))
        }
    }

    fn spec() -> Specification {
        Specification::new("Seq", vec![FieldSpec::new("Id", FieldKind::UInt).sequence_number()])
    }

    fn scripted_job(
        count: u64,
        failing: Vec<u64>,
        cancel_at: Option<u64>,
    ) -> (Job, Arc<Counters>) {
        let mut job = Job::new(JobConfig::new("Seq", count).with_seed(1));
        let counters = Arc::new(Counters::default());
        let source = ScriptedSource {
            specification: spec(),
            failing,
            cancel_at: cancel_at.map(|at| (at, job.handle())),
        };
        job.configure_with(StageSet {
            specification: Arc::new(spec()),
            source: Box::new(source),
            filters: Vec::new(),
            sinks: vec![Box::new(CountingSink {
                counters: counters.clone(),
                ready: true,
            })],
            persisters: Vec::new(),
        })
        .expect("job should configure");
        (job, counters)
    }

    #[test]
    fn test_successful_job_sinks_every_record_once() {
        let (mut job, counters) = scripted_job(20, Vec::new(), None);
        assert_eq!(job.status(), JobStatus::Pending);

        let status = job.run().expect("job should execute");

        assert_eq!(status, JobStatus::Success);
        assert_eq!(counters.prepared.load(Ordering::SeqCst), 1);
        assert_eq!(counters.sunk.load(Ordering::SeqCst), 20);
        assert_eq!(counters.finished.load(Ordering::SeqCst), 1);
        let sequences = lock(&counters.sequences).clone();
        let expected: Vec<FieldValue> = (0..20).map(FieldValue::UInt).collect();
        assert_eq!(sequences, expected);
    }

    #[test]
    fn test_execute_requires_pending() {
        let mut job = Job::new(JobConfig::new("Names", 1));
        let err = job.run().expect_err("unconfigured job should not execute");
        assert!(matches!(
            err,
            JobError::NotPending {
                status: JobStatus::Uninitialized,
                ..
            }
        ));

        let (mut job, _) = scripted_job(1, Vec::new(), None);
        job.run().expect("first execute should succeed");
        assert!(job.run().is_err());
        assert_eq!(job.status(), JobStatus::Success);
    }

    #[test]
    fn test_skipped_records_within_tolerance_succeed() {
        let (mut job, counters) = scripted_job(100, vec![3, 50], None);
        let status = job.run().expect("job should execute");

        assert_eq!(status, JobStatus::Success);
        assert_eq!(counters.sunk.load(Ordering::SeqCst), 98);
        assert_eq!(job.handle().skipped(), 2);
        assert_eq!(job.handle().current(), 100);
    }

    #[test]
    fn test_too_many_skips_fail_the_job() {
        let (mut job, counters) = scripted_job(10, vec![0, 1, 2], None);
        let status = job.run().expect("job should execute");

        assert_eq!(status, JobStatus::Failed);
        assert_eq!(job.handle().current(), 1);
        assert_eq!(counters.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_during_execution() {
        let (mut job, counters) = scripted_job(1_000, Vec::new(), Some(10));
        let handle = job.handle();

        let status = job.run().expect("job should execute");

        assert_eq!(status, JobStatus::Canceled);
        assert!(handle.current() <= 11);
        assert_eq!(counters.finished.load(Ordering::SeqCst), 1);
        assert!(handle.results().is_empty());
        assert!(!handle.cancel(), "second cancel must be refused");
    }

    #[test]
    fn test_cancel_while_pending_stops_before_first_record() {
        let (mut job, counters) = scripted_job(5, Vec::new(), None);
        assert!(job.handle().cancel());
        assert!(!job.handle().cancel());

        let status = job.run().expect("job should execute");
        assert_eq!(status, JobStatus::Canceled);
        assert_eq!(counters.sunk.load(Ordering::SeqCst), 0);
        assert_eq!(job.handle().current(), 0);
    }

    #[test]
    fn test_cancel_refused_after_completion() {
        let (mut job, _) = scripted_job(2, Vec::new(), None);
        job.run().expect("job should execute");
        assert!(!job.handle().cancel());
    }

    #[test]
    fn test_failed_prepare_excludes_sink_but_finishes_it() {
        let mut job = Job::new(JobConfig::new("Seq", 3));
        let counters = Arc::new(Counters::default());
        job.configure_with(StageSet {
            specification: Arc::new(spec()),
            source: Box::new(ScriptedSource {
                specification: spec(),
                failing: Vec::new(),
                cancel_at: None,
            }),
            filters: Vec::new(),
            sinks: vec![Box::new(CountingSink {
                counters: counters.clone(),
                ready: false,
            })],
            persisters: Vec::new(),
        })
        .expect("job should configure");

        job.run().expect("job should execute");
        assert_eq!(counters.sunk.load(Ordering::SeqCst), 0);
        assert_eq!(counters.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completion_callback_runs_once_after_terminal_status() {
        let (mut job, _) = scripted_job(3, Vec::new(), None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        job.on_completion(move |job| lock(&sink).push(job.status()));

        job.run().expect("job should execute");
        let _ = job.run();
        assert_eq!(*lock(&seen), vec![JobStatus::Success]);
    }

    #[test]
    fn test_config_frozen_after_configure() {
        let mut job = Job::new(JobConfig::new("Names", 1));
        job.config_mut().expect("config should be mutable").count = 4;

        let context = StageContext::builtin().expect("registry should build");
        job.configure(&context).expect("job should configure");
        assert_eq!(job.config().id, Some(job.id()));
        assert!(matches!(
            job.config_mut(),
            Err(JobError::ConfigFrozen { .. })
        ));
        assert!(matches!(
            job.configure(&context),
            Err(ConfigurationError::NotConfigurable(JobStatus::Pending))
        ));
    }

    #[test]
    fn test_configuration_errors_leave_job_uninitialized() {
        let context = StageContext::builtin().expect("registry should build");
        let cases = [
            JobConfig::new("Unknown", 10),
            JobConfig::new("Names", 0),
            JobConfig::new("Names", 10).with_output_format("xml"),
            JobConfig::new("Names", 10).with_filter("Shuffle"),
            JobConfig::new("Names", 10).with_output_format("stream"),
        ];

        for config in cases {
            let mut job = Job::new(config);
            assert!(job.configure(&context).is_err());
            assert_eq!(job.status(), JobStatus::Uninitialized);
        }
    }

    #[test]
    fn test_progress_only_while_executing() {
        let (mut job, _) = scripted_job(4, Vec::new(), None);
        let handle = job.handle();
        assert!(handle.progress().is_none());
        assert!(handle.elapsed().is_none());

        job.run().expect("job should execute");
        assert!(handle.progress().is_none());
        assert!(handle.elapsed().is_some());
        assert!(handle.started_at() <= handle.ended_at());
    }

    /// Produces an empty artifact per job.
    struct ArtifactSink;

    impl SinkStage for ArtifactSink {
        fn name(&self) -> &'static str {
            "artifact"
        }

        fn prepare(&mut self) -> bool {
            true
        }

        fn sink(&mut self, _record: &Record) -> bool {
            true
        }

        fn finish(&mut self) -> Result<Option<SinkArtifact>, StageError> {
            let path = tempfile::NamedTempFile::new()?.into_temp_path();
            Ok(Some(SinkArtifact::new("csv", 0, path)))
        }
    }

    /// Requests cancellation from inside every `persist` call.
    struct CancelingPersister {
        handle: JobHandle,
        status: StatusCell,
        cancels: Arc<Mutex<Vec<bool>>>,
        observed: Arc<Mutex<Vec<(JobStatus, HashMap<BackendKind, PersistenceStatus>)>>>,
    }

    impl PersistenceStage for CancelingPersister {
        fn backend(&self) -> BackendKind {
            BackendKind::Filesystem
        }

        fn status(&self) -> StatusCell {
            self.status.clone()
        }

        fn persist(&mut self, _artifact: &SinkArtifact, _extra: &Map<String, Value>) -> PersistenceResult {
            self.status.set(PersistenceStatus::Uploading);
            lock(&self.observed).push((self.handle.status(), self.handle.persistence_status()));
            lock(&self.cancels).push(self.handle.cancel());
            self.status.set(PersistenceStatus::Success);
            PersistenceResult::succeeded(self.handle.id(), BackendKind::Filesystem, Map::new())
        }
    }

    #[test]
    fn test_cancel_while_persisting_still_succeeds() {
        let mut job = Job::new(JobConfig::new("Seq", 5));
        let cancels = Arc::new(Mutex::new(Vec::new()));
        let observed = Arc::new(Mutex::new(Vec::new()));
        job.configure_with(StageSet {
            specification: Arc::new(spec()),
            source: Box::new(ScriptedSource {
                specification: spec(),
                failing: Vec::new(),
                cancel_at: None,
            }),
            filters: Vec::new(),
            sinks: vec![Box::new(ArtifactSink), Box::new(ArtifactSink)],
            persisters: vec![Box::new(CancelingPersister {
                handle: job.handle(),
                status: StatusCell::new(PersistenceStatus::Configured),
                cancels: cancels.clone(),
                observed: observed.clone(),
            })],
        })
        .expect("job should configure");

        let status = job.run().expect("job should execute");

        assert_eq!(status, JobStatus::Success);
        assert_eq!(*lock(&cancels), vec![true, false]);
        assert_eq!(job.handle().results().len(), 2);
        assert!(job.handle().results().iter().all(|r| r.success));

        let observed = lock(&observed).clone();
        assert_eq!(observed.len(), 2);
        for (status, backends) in observed {
            assert_eq!(status, JobStatus::Persisting);
            assert_eq!(
                backends.get(&BackendKind::Filesystem),
                Some(&PersistenceStatus::Uploading)
            );
        }
    }
}
