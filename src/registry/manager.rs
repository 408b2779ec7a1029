//! The job manager: admission, dispatch and status queries.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::admission::{evaluate, AdmissionRequest, Load};
use super::completion::{CompletionNotifier, CompletionSignal};
use crate::config::ServiceConfig;
use crate::error::{ConfigurationError, QueueError, RegistryError};
use crate::generator::RegistryBuildError;
use crate::metrics::MetricsCollector;
use crate::model::{BackendKind, Caller, PersistenceResult};
use crate::pipeline::{Job, JobConfig, JobHandle, JobStatus, PersistenceStatus, StageContext};
use crate::utils::lock;

/// Opaque capability required to cancel a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QueueToken(Uuid);

impl QueueToken {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for QueueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Registry-side bookkeeping for an admitted job.
#[derive(Debug)]
struct JobRecord {
    handle: JobHandle,
    initiator: Caller,
    canceler: Option<Caller>,
    token: QueueToken,
    created: DateTime<Utc>,
    completed: Option<DateTime<Utc>>,
    last_accessed: Option<DateTime<Utc>>,
    retain: bool,
    signal: CompletionSignal,
}

impl JobRecord {
    /// Most recent of the last query and completion; age is measured from here.
    fn touched(&self) -> Option<DateTime<Utc>> {
        self.last_accessed.or(self.completed)
    }

    fn summary(&self, now: DateTime<Utc>) -> JobSummary {
        let reference = self.touched();
        JobSummary {
            id: self.handle.id(),
            created: self.created,
            completed: self.completed,
            status: self.handle.status(),
            elapsed_ms: self.handle.elapsed().map(|e| e.as_millis() as u64),
            progress: self.handle.progress(),
            record_count: self.handle.count(),
            initiator: self.initiator.clone(),
            canceler: self.canceler.clone(),
            age_secs: reference
                .map(|at| (now - at).num_seconds().max(0) as u64)
                .unwrap_or(0),
        }
    }
}

/// Point-in-time description of one job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub completed: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub elapsed_ms: Option<u64>,
    pub progress: Option<f64>,
    pub record_count: u64,
    pub initiator: Caller,
    pub canceler: Option<Caller>,
    /// Seconds since the job was last polled, or since it completed.
    pub age_secs: u64,
}

/// Snapshot returned by [`JobManager::info`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerInfo {
    pub count: usize,
    pub in_flight_records: u64,
    pub jobs: Vec<JobSummary>,
}

/// Totals since the manager started.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifetimeStats {
    pub total_jobs: u64,
    /// Sum of requested record counts.
    pub total_records: u64,
    pub total_generation_ms: u64,
    pub spec_frequency: BTreeMap<String, u64>,
    pub result_frequency: BTreeMap<String, u64>,
    pub output_frequency: BTreeMap<String, u64>,
    pub uptime_secs: u64,
}

/// Outcome of [`JobManager::run_to_completion`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub id: Uuid,
    pub status: JobStatus,
    /// Whether the job was canceled for exceeding the synchronous timeout.
    pub timed_out: bool,
    pub results: Vec<PersistenceResult>,
}

struct Inner {
    config: ServiceConfig,
    context: StageContext,
    jobs: Mutex<HashMap<Uuid, JobRecord>>,
    lifetime: Mutex<LifetimeStats>,
    last_admitted: Mutex<HashMap<String, Instant>>,
    started: Instant,
    metrics: MetricsCollector,
}

/// Admits, runs and tracks jobs.
///
/// Each admitted job runs on its own named worker thread. The job map is
/// guarded by one lock, held only for map access; a job updates its own
/// progress through its [`JobHandle`] without taking it.
///
/// # Example
///
/// ```ignore
/// use recordforge::config::ServiceConfig;
/// use recordforge::model::Caller;
/// use recordforge::pipeline::JobConfig;
/// use recordforge::registry::JobManager;
///
/// let manager = JobManager::from_config(ServiceConfig::from_env()?)?;
/// let job = manager.create_job(JobConfig::new("CensusData", 1_000))?;
/// let id = job.id();
/// let token = manager.queue(job, Caller::local("example"), true)?;
///
/// println!("{:?}", manager.status(id));
/// manager.cancel(id, token, Caller::local("example"));
/// ```
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for JobManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobManager")
            .field("jobs", &lock(&self.inner.jobs).len())
            .field("limits", &self.inner.config.limits)
            .finish_non_exhaustive()
    }
}

impl JobManager {
    pub fn new(config: ServiceConfig, context: StageContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                context,
                jobs: Mutex::new(HashMap::new()),
                lifetime: Mutex::new(LifetimeStats::default()),
                last_admitted: Mutex::new(HashMap::new()),
                started: Instant::now(),
                metrics: MetricsCollector::new(),
            }),
        }
    }

    /// A manager backed by the built-in generator registry.
    pub fn from_config(config: ServiceConfig) -> Result<Self, RegistryBuildError> {
        let context = StageContext::builtin()?.with_stream(config.stream.clone());
        Ok(Self::new(config, context))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn context(&self) -> &StageContext {
        &self.inner.context
    }

    /// Creates a job from `config` and configures it against this manager's
    /// stage context.
    pub fn create_job(&self, config: JobConfig) -> Result<Job, ConfigurationError> {
        let mut job = Job::new(config);
        job.configure(&self.inner.context)?;
        Ok(job)
    }

    /// Admits a configured job and starts its worker.
    ///
    /// With `retain` the job stays queryable after completion until it is
    /// removed or expires; otherwise it is dropped as soon as it finishes.
    ///
    /// # Errors
    ///
    /// Rejects jobs that are not Pending, duplicate ids, and jobs breaking
    /// any admission limit. No worker is started for a rejected job.
    pub fn queue(&self, job: Job, initiator: Caller, retain: bool) -> Result<QueueToken, QueueError> {
        self.admit(job, initiator, retain, false)
            .map(|(token, _)| token)
    }

    fn admit(
        &self,
        mut job: Job,
        initiator: Caller,
        retain: bool,
        sync: bool,
    ) -> Result<(QueueToken, CompletionSignal), QueueError> {
        let id = job.id();
        if job.status() != JobStatus::Pending {
            return Err(QueueError::NotConfigured(id));
        }

        let token = QueueToken::generate();
        let (notifier, signal) = CompletionSignal::channel();
        {
            let mut jobs = lock(&self.inner.jobs);
            if jobs.contains_key(&id) {
                return Err(QueueError::Duplicate(id));
            }

            let mut last_admitted = lock(&self.inner.last_admitted);
            let now = Instant::now();
            let load = Load {
                active_jobs: jobs.values().filter(|r| r.handle.status().is_active()).count(),
                records_in_flight: in_flight(&jobs),
                since_last_admission: last_admitted
                    .get(&initiator.identity)
                    .map(|at| now.saturating_duration_since(*at)),
            };
            let request = AdmissionRequest {
                count: job.config().count,
                caller: &initiator.identity,
                sync,
            };
            let violations = evaluate(&self.inner.config.limits, &request, &load);
            if !violations.is_empty() {
                for violation in &violations {
                    self.inner.metrics.record_rejection(violation.reason());
                }
                warn!(
                    job_id = %id,
                    caller = %initiator,
                    violations = violations.len(),
                    "Job rejected by admission control"
                );
                return Err(QueueError::Rejected(violations));
            }

            last_admitted.insert(initiator.identity.clone(), now);
            jobs.insert(
                id,
                JobRecord {
                    handle: job.handle(),
                    initiator: initiator.clone(),
                    canceler: None,
                    token,
                    created: Utc::now(),
                    completed: None,
                    last_accessed: None,
                    retain,
                    signal: signal.clone(),
                },
            );
            self.inner
                .metrics
                .update_load(load.active_jobs + 1, load.records_in_flight + job.config().count);
        }

        let specification = job
            .specification()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| job.config().specification.clone());
        let manager = self.clone();
        job.on_completion(move |job| manager.complete(job, &specification, notifier));

        let spawned = std::thread::Builder::new()
            .name(format!("job-{}", &id.simple().to_string()[..8]))
            .spawn(move || {
                let mut rng = job.rng();
                if let Err(e) = job.execute(&mut rng) {
                    warn!(job_id = %job.id(), error = %e, "Worker could not execute job");
                }
            });
        if let Err(e) = spawned {
            lock(&self.inner.jobs).remove(&id);
            warn!(job_id = %id, error = %e, "Failed to spawn job worker");
            return Err(QueueError::Spawn(e));
        }

        info!(job_id = %id, caller = %initiator, retain, "Job queued");
        Ok((token, signal))
    }

    /// Bookkeeping run on the worker once the job is terminal.
    ///
    /// Lifetime stats only count jobs that actually ran. Output kinds come
    /// from the artifacts the job produced, once per kind.
    fn complete(&self, job: &Job, specification: &str, notifier: CompletionNotifier) {
        let status = job.status();
        let handle = job.handle();
        let elapsed = handle.elapsed().unwrap_or_default();
        let outputs: BTreeSet<String> = handle.artifacts().into_iter().map(|a| a.kind).collect();
        {
            let mut lifetime = lock(&self.inner.lifetime);
            lifetime.total_jobs += 1;
            lifetime.total_records += job.config().count;
            lifetime.total_generation_ms += elapsed.as_millis() as u64;
            *lifetime
                .spec_frequency
                .entry(specification.to_string())
                .or_default() += 1;
            for kind in outputs {
                *lifetime.output_frequency.entry(kind).or_default() += 1;
            }
            *lifetime
                .result_frequency
                .entry(status.to_string())
                .or_default() += 1;
        }
        {
            let mut jobs = lock(&self.inner.jobs);
            let retain = match jobs.get_mut(&job.id()) {
                Some(record) => {
                    record.completed = Some(Utc::now());
                    record.retain
                }
                None => true,
            };
            if !retain {
                jobs.remove(&job.id());
                debug!(job_id = %job.id(), "Dropped unretained job");
            }
            let active = jobs.values().filter(|r| r.handle.status().is_active()).count();
            self.inner.metrics.update_load(active, in_flight(&jobs));
        }
        notifier.notify(status);
    }

    /// Requests cancellation of a job.
    ///
    /// Requires the exact token issued at admission. Returns `true` only for
    /// the first accepted request.
    pub fn cancel(&self, id: Uuid, token: QueueToken, canceler: Caller) -> bool {
        let mut jobs = lock(&self.inner.jobs);
        let Some(record) = jobs.get_mut(&id) else {
            return false;
        };
        if record.token != token {
            warn!(job_id = %id, caller = %canceler, "Cancel refused: token mismatch");
            return false;
        }
        if !record.handle.cancel() {
            return false;
        }
        info!(job_id = %id, caller = %canceler, "Job cancel accepted");
        record.canceler = Some(canceler);
        true
    }

    fn with_record<T>(&self, id: Uuid, f: impl FnOnce(&JobRecord) -> T) -> Option<T> {
        let mut jobs = lock(&self.inner.jobs);
        let record = jobs.get_mut(&id)?;
        record.last_accessed = Some(Utc::now());
        Some(f(record))
    }

    pub fn status(&self, id: Uuid) -> Option<JobStatus> {
        self.with_record(id, |r| r.handle.status())
    }

    /// Persistence results, defined once the job succeeded.
    pub fn results(&self, id: Uuid) -> Option<Vec<PersistenceResult>> {
        self.with_record(id, |r| {
            (r.handle.status() == JobStatus::Success).then(|| r.handle.results())
        })
        .flatten()
    }

    pub fn elapsed(&self, id: Uuid) -> Option<Duration> {
        self.with_record(id, |r| r.handle.elapsed()).flatten()
    }

    /// Completion percentage, defined while the job is executing.
    pub fn progress(&self, id: Uuid) -> Option<f64> {
        self.with_record(id, |r| r.handle.progress()).flatten()
    }

    /// Backend statuses, defined while the job is persisting.
    pub fn persistence_status(&self, id: Uuid) -> Option<HashMap<BackendKind, PersistenceStatus>> {
        self.with_record(id, |r| {
            (r.handle.status() == JobStatus::Persisting).then(|| r.handle.persistence_status())
        })
        .flatten()
    }

    /// A signal resolving when the job finishes.
    pub fn completion(&self, id: Uuid) -> Option<CompletionSignal> {
        lock(&self.inner.jobs).get(&id).map(|r| r.signal.clone())
    }

    pub fn info(&self) -> ManagerInfo {
        let jobs = lock(&self.inner.jobs);
        let now = Utc::now();
        let mut summaries: Vec<JobSummary> = jobs.values().map(|r| r.summary(now)).collect();
        summaries.sort_by_key(|s| s.created);
        ManagerInfo {
            count: jobs.len(),
            in_flight_records: in_flight(&jobs),
            jobs: summaries,
        }
    }

    pub fn lifetime(&self) -> LifetimeStats {
        let mut stats = lock(&self.inner.lifetime).clone();
        stats.uptime_secs = self.inner.started.elapsed().as_secs();
        stats
    }

    /// Removes a finished job.
    ///
    /// # Errors
    ///
    /// Fails for unknown jobs and for jobs that are still active.
    pub fn remove(&self, id: Uuid) -> Result<(), RegistryError> {
        let mut jobs = lock(&self.inner.jobs);
        let status = jobs
            .get(&id)
            .map(|r| r.handle.status())
            .ok_or(RegistryError::NotFound(id))?;
        if status.is_active() {
            return Err(RegistryError::StillActive { id, status });
        }
        jobs.remove(&id);
        debug!(job_id = %id, "Job removed");
        Ok(())
    }

    /// Evicts finished jobs neither completed nor queried within `retention`.
    /// Active jobs are never evicted.
    pub fn expire(&self, retention: Duration) -> usize {
        let now = Utc::now();
        let mut jobs = lock(&self.inner.jobs);
        let before = jobs.len();
        jobs.retain(|id, record| {
            let expired = !record.handle.status().is_active()
                && record
                    .touched()
                    .and_then(|at| (now - at).to_std().ok())
                    .is_some_and(|age| age > retention);
            if expired {
                info!(job_id = %id, "Expired completed job");
            }
            !expired
        });
        before - jobs.len()
    }

    /// Queues a job and waits for it with the configured synchronous timeout.
    pub async fn run_to_completion(
        &self,
        job: Job,
        initiator: Caller,
    ) -> Result<SyncOutcome, QueueError> {
        let timeout = self.inner.config.max_sync_run_time;
        self.run_to_completion_within(job, initiator, timeout).await
    }

    /// Queues a job and waits at most `timeout` for it to finish.
    ///
    /// A job still running at the deadline is canceled; the outcome then
    /// carries whatever terminal status it reaches. The job is removed from
    /// the manager before returning.
    pub async fn run_to_completion_within(
        &self,
        job: Job,
        initiator: Caller,
        timeout: Duration,
    ) -> Result<SyncOutcome, QueueError> {
        let id = job.id();
        let (token, mut signal) = self.admit(job, initiator.clone(), true, true)?;

        let mut timed_out = false;
        let mut status = signal.wait_timeout(timeout).await;
        if status.is_none() {
            timed_out = true;
            warn!(job_id = %id, timeout_secs = timeout.as_secs(), "Synchronous run timed out");
            self.cancel(id, token, initiator);
            status = signal.wait_timeout(timeout).await;
        }

        let status = match status {
            Some(status) => status,
            None => self.status(id).unwrap_or(JobStatus::Failed),
        };
        let results = self.results(id).unwrap_or_default();
        if let Err(e) = self.remove(id) {
            debug!(job_id = %id, error = %e, "Synchronous job left in registry");
        }
        Ok(SyncOutcome {
            id,
            status,
            timed_out,
            results,
        })
    }
}

fn in_flight(jobs: &HashMap<Uuid, JobRecord>) -> u64 {
    jobs.values()
        .filter(|r| r.handle.status().is_active())
        .map(|r| r.handle.remaining())
        .sum()
}
