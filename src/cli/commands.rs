//! CLI command definitions for recordforge.
//!
//! `generate` runs one job synchronously through a [`JobManager`] and prints
//! the persistence results; `preview` prints records straight from a source
//! without persisting anything; `specs` lists what can be generated.

use std::fs;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ServiceConfig, StreamSettings};
use crate::generator::GeneratorRegistry;
use crate::metrics::{export_metrics, init_metrics};
use crate::model::{Caller, SpecificationKind};
use crate::pipeline::config::STREAM_ID_KEY;
use crate::pipeline::{FilterKind, GeneratorSource, JobConfig, JobStatus, OutputFormat, SourceStage};
use crate::registry::JobManager;

/// Default number of records for `generate`.
const DEFAULT_COUNT: &str = "100";

/// Default number of records for `preview`.
const DEFAULT_PREVIEW_COUNT: &str = "5";

/// Synthetic record generator for test datasets.
#[derive(Parser)]
#[command(name = "recordforge")]
#[command(about = "Generate synthetic structured records and persist them as datasets")]
#[command(version)]
#[command(
    long_about = "recordforge generates synthetic records from built-in specifications.\n\nRecords are encoded as CSV, JSON or plain text and persisted to the local filesystem or archive.\n\nExample usage:\n  recordforge generate --spec CensusData --count 1000 --format csv --output ./datasets"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run one generation job to completion and print its results.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Print a handful of records as JSON lines without persisting them.
    Preview(PreviewArgs),

    /// List specifications, output formats and filters.
    Specs(SpecsArgs),
}

/// Arguments for `recordforge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Specification to generate (see `recordforge specs`).
    #[arg(short, long, default_value = "CensusData")]
    pub spec: String,

    /// Number of records.
    #[arg(short = 'n', long, default_value = DEFAULT_COUNT)]
    pub count: u64,

    /// Output format: csv, json, txt or stream.
    #[arg(short, long, default_value = "csv")]
    pub format: String,

    /// Filter to apply; may be repeated.
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Prefix for persisted artifact names.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of records allowed to fail before the job fails.
    #[arg(long)]
    pub max_skipped_ratio: Option<f64>,

    /// Directory for the filesystem backend (overrides RECORDFORGE_PERSIST_DIR).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Directory for the archive backend (overrides RECORDFORGE_ARCHIVE_DIR).
    #[arg(long)]
    pub archive: Option<String>,

    /// Stream connection URL, required for the stream format.
    #[arg(long, env = "RECORDFORGE_STREAM_URL")]
    pub stream_url: Option<String>,

    /// Stream channel, required for the stream format.
    #[arg(long)]
    pub stream_id: Option<String>,

    /// Print Prometheus metrics after the run.
    #[arg(long)]
    pub metrics: bool,
}

/// Arguments for `recordforge preview`.
#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Specification to preview.
    #[arg(short, long, default_value = "CensusData")]
    pub spec: String,

    /// Number of records to print.
    #[arg(short = 'n', long, default_value = DEFAULT_PREVIEW_COUNT)]
    pub count: u64,

    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `recordforge specs`.
#[derive(Parser, Debug)]
pub struct SpecsArgs {
    /// Print the field list of each specification.
    #[arg(long)]
    pub fields: bool,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Parse CLI arguments without running any command.
///
/// Use this with `run_with_cli()` when logging must be initialized from the
/// parsed `log_level` first.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parse CLI arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with already parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate_command(args).await,
        Commands::Preview(args) => run_preview_command(args),
        Commands::Specs(args) => run_specs_command(args),
    }
}

// ============================================================================
// Generate
// ============================================================================

fn service_config(args: &GenerateArgs) -> anyhow::Result<ServiceConfig> {
    let mut config = ServiceConfig::from_env().context("invalid service configuration")?;
    if let Some(output) = &args.output {
        config = config.with_persist_dir(output);
    }
    if let Some(archive) = &args.archive {
        config = config.with_archive_dir(archive);
    }
    if let Some(url) = &args.stream_url {
        config = config.with_stream(StreamSettings::new(url.as_str()));
    }
    config.validate().context("invalid service configuration")?;
    Ok(config)
}

fn job_config(args: &GenerateArgs, service: &ServiceConfig) -> JobConfig {
    let mut config = JobConfig::new(args.spec.as_str(), args.count).with_output_format(args.format.as_str());
    for filter in &args.filters {
        config = config.with_filter(filter.as_str());
    }
    if let Some(prefix) = &args.prefix {
        config = config.with_user_prefix(prefix);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(ratio) = args.max_skipped_ratio {
        config = config.with_max_skipped_ratio(ratio);
    }
    if let Some(stream_id) = &args.stream_id {
        config = config.with_extra(STREAM_ID_KEY, stream_id.as_str());
    }
    for (kind, backend) in service.backends() {
        config = config.with_backend(kind, backend);
    }
    config
}

async fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    if args.metrics {
        init_metrics().context("failed to register metrics")?;
    }

    let service = service_config(&args)?;
    for (_, backend) in service.backends() {
        fs::create_dir_all(&backend.directory).with_context(|| {
            format!("failed to create {}", backend.directory.display())
        })?;
    }

    let config = job_config(&args, &service);
    let manager = JobManager::from_config(service).context("failed to build generator registry")?;
    let job = manager.create_job(config).context("invalid job configuration")?;

    info!(
        job_id = %job.id(),
        specification = %args.spec,
        count = args.count,
        format = %args.format,
        "Starting generation"
    );

    let outcome = manager
        .run_to_completion(job, Caller::local("cli"))
        .await
        .context("job was not admitted")?;

    if outcome.timed_out {
        warn!(job_id = %outcome.id, "Job exceeded the synchronous run time and was canceled");
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if args.metrics {
        print!("{}", export_metrics());
    }

    if outcome.status != JobStatus::Success {
        anyhow::bail!("job {} finished as {}", outcome.id, outcome.status);
    }
    Ok(())
}

// ============================================================================
// Preview
// ============================================================================

fn run_preview_command(args: PreviewArgs) -> anyhow::Result<()> {
    let kind = SpecificationKind::from_name(&args.spec)
        .with_context(|| format!("unknown specification '{}'", args.spec))?;
    let specification = Arc::new(kind.specification());
    let registry = GeneratorRegistry::shared()?;
    let mut source = GeneratorSource::new(specification.clone(), &registry)?;
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed.unwrap_or_else(rand::random));

    for sequence in 0..args.count {
        match source.next(&mut rng, sequence) {
            Ok(record) => println!("{}", serde_json::to_string(&record.view(&specification))?),
            Err(e) => warn!(sequence, error = %e, "Record skipped"),
        }
    }
    Ok(())
}

// ============================================================================
// Specs
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldListing {
    name: String,
    output_name: String,
    kind: String,
    sequence: bool,
    linked_to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpecListing {
    name: &'static str,
    fields: Vec<FieldListing>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Catalog {
    specifications: Vec<SpecListing>,
    output_formats: Vec<&'static str>,
    filters: Vec<&'static str>,
}

fn catalog() -> Catalog {
    let specifications = SpecificationKind::ALL
        .iter()
        .map(|kind| SpecListing {
            name: kind.name(),
            fields: kind
                .specification()
                .fields
                .into_iter()
                .map(|field| FieldListing {
                    kind: field.kind.to_string(),
                    sequence: field.sequence,
                    linked_to: field.link.map(|link| link.source),
                    name: field.name,
                    output_name: field.output_name,
                })
                .collect(),
        })
        .collect();
    Catalog {
        specifications,
        output_formats: OutputFormat::ALL.iter().map(OutputFormat::name).collect(),
        filters: FilterKind::ALL.iter().map(FilterKind::name).collect(),
    }
}

fn run_specs_command(args: SpecsArgs) -> anyhow::Result<()> {
    let catalog = catalog();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    println!("Specifications:");
    for spec in &catalog.specifications {
        println!("  {} ({} fields)", spec.name, spec.fields.len());
        if args.fields {
            for field in &spec.fields {
                let mut notes = Vec::new();
                if field.sequence {
                    notes.push("sequence".to_string());
                }
                if let Some(source) = &field.linked_to {
                    notes.push(format!("linked to {}", source));
                }
                let notes = if notes.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", notes.join(", "))
                };
                println!("    {:<28} {:<8}{}", field.output_name, field.kind, notes);
            }
        }
    }
    println!("Output formats: {}", catalog.output_formats.join(", "));
    println!("Filters: {}", catalog.filters.join(", "));
    Ok(())
}
