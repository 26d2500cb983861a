use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod export;
mod gradebook;
mod ingest;
mod models;
mod normalize;
mod pipeline;
mod report;
mod scoring;
mod timestamp;

use config::{PipelineConfig, ScoringPolicy, TimestampConfig, TimestampShape};
use gradebook::Gradebook;

#[derive(Parser)]
#[command(name = "zybooks-gradebook")]
#[command(about = "Build a Brightspace grade import from zyBooks assessment exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every assessment CSV in a directory and write the import file
    Process {
        #[arg(long, env = "GRADEBOOK_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,
        #[arg(long, env = "GRADEBOOK_OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,
        /// Write a markdown summary of the run to this path
        #[arg(long)]
        report: Option<PathBuf>,
        /// Abort the run on the first file that fails
        #[arg(long, default_value_t = false)]
        fail_fast: bool,
        #[command(flatten)]
        scoring: ScoringArgs,
    },
    /// Show per-student lateness and derived scores for one file
    Inspect {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[command(flatten)]
        scoring: ScoringArgs,
    },
}

#[derive(Args)]
struct ScoringArgs {
    #[arg(long, env = "GRADEBOOK_TIMEZONE", default_value = config::DEFAULT_TIMEZONE)]
    timezone: String,
    #[arg(long, env = "GRADEBOOK_POLICY", value_enum, default_value_t = ScoringPolicy::Points)]
    policy: ScoringPolicy,
    #[arg(long, value_enum, default_value_t = TimestampShape::Qualified)]
    due_shape: TimestampShape,
    #[arg(long, value_enum, default_value_t = TimestampShape::Qualified)]
    submission_shape: TimestampShape,
    /// TOML file of `[[override]]` student id corrections
    #[arg(long, env = "GRADEBOOK_OVERRIDES")]
    overrides: Option<PathBuf>,
}

impl ScoringArgs {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let zone = config::parse_timezone(&self.timezone)?;
        let overrides = match &self.overrides {
            Some(path) => config::load_overrides(path)
                .with_context(|| format!("failed to load overrides from {}", path.display()))?,
            None => Default::default(),
        };

        Ok(PipelineConfig {
            timestamps: TimestampConfig {
                zone,
                due_shape: self.due_shape,
                submission_shape: self.submission_shape,
            },
            policy: self.policy,
            overrides,
            ..PipelineConfig::default()
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            data_dir,
            output_dir,
            report,
            fail_fast,
            scoring,
        } => {
            let config = scoring.pipeline_config()?;
            info!(
                policy = ?config.policy,
                zone = %config.timestamps.zone,
                overrides = config.overrides.entries().len(),
                "configuration loaded"
            );

            let mut gradebook = Gradebook::new();
            let outcomes = pipeline::run(&data_dir, &config, &mut gradebook, fail_fast)
                .with_context(|| format!("failed to process {}", data_dir.display()))?;

            let export_path = match gradebook.finalize() {
                Ok(table) => {
                    let generated_at = chrono::Local::now().naive_local();
                    let path = export::write_export(&table, &output_dir, generated_at)
                        .context("failed to write export")?;
                    info!(
                        path = %path.display(),
                        students = gradebook.student_count(),
                        columns = gradebook.columns().len(),
                        "exported grades"
                    );
                    Some(path)
                }
                Err(err) if !err.is_fatal() => {
                    warn!(reason = %err, "nothing to export");
                    None
                }
                Err(err) => return Err(err.into()),
            };

            if let Some(report_path) = report {
                let text = report::build_report(&outcomes, export_path.as_deref());
                std::fs::write(&report_path, text)?;
                println!("Report written to {}.", report_path.display());
            }

            match export_path {
                Some(path) => println!("Grades exported to {}.", path.display()),
                None => println!("No assessments processed; nothing exported."),
            }
        }
        Commands::Inspect {
            csv,
            limit,
            scoring,
        } => {
            let config = scoring.pipeline_config()?;
            inspect(&csv, &config, limit)?;
        }
    }

    Ok(())
}

fn inspect(path: &Path, config: &PipelineConfig, limit: usize) -> anyhow::Result<()> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("input path has no file name")?;
    let file = pipeline::classify_file(name)?;
    let table = ingest::read_table_from_path(path)?;
    if table.is_empty() {
        println!("No rows found in {}.", path.display());
        return Ok(());
    }

    let records = normalize::normalize_table(&table, config)
        .with_context(|| format!("failed to normalize {}", path.display()))?;

    println!("{} #{} ({} students):", file.kind, file.index, records.len());
    for record in records.iter().take(limit) {
        let lateness = match scoring::days_late(&record.submission, &record.due) {
            scoring::Lateness::Days(days) => format!("{days} days late"),
            scoring::Lateness::Absent => "not submitted".to_string(),
        };
        let submitted = record
            .submission
            .as_datetime()
            .map(|value| value.format("%Y-%m-%d %H:%M %Z").to_string())
            .unwrap_or_else(|| "-".to_string());
        let scores: Vec<String> = scoring::derive_scores(record, file.kind, config.policy)
            .iter()
            .map(|score| format!("{} {}", score.metric, gradebook::format_score(score.value)))
            .collect();

        println!(
            "- {} submitted {} ({}): {}",
            record.student_id,
            submitted,
            lateness,
            scores.join(", ")
        );
    }

    Ok(())
}
