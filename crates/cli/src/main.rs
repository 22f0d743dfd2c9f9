//! `flowforge` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`: check a workflow document and list every finding.
//! - `order`:    print the execution sequence of a workflow document.
//! - `run`:      validate, then simulate a workflow and stream its log.
//! - `export`:   re-export a document under a timestamped file name.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use engine::document::{import_file, write_export};
use engine::{
    detect_cycle, execution_sequence, validate, EngineError, ExecutionHandler, ExecutorConfig,
    LogRecord, LogSeverity, ValidationReport, Workflow, WorkflowExecutor,
};
use nodes::SeededRandom;

#[derive(Parser)]
#[command(
    name = "flowforge",
    about = "Design-time checks and simulated runs for workflow graphs",
    version
)]
struct Cli {
    /// Shape of the diagnostic log written to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, env = "FLOWFORGE_LOG_FORMAT", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow document.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Print the order in which nodes would execute.
    Order {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Validate and simulate a workflow.
    Run {
        /// Path to the workflow JSON file.
        path: PathBuf,
        /// Seed for reproducible HTTP outcomes.
        #[arg(long, env = "FLOWFORGE_SEED")]
        seed: Option<u64>,
        #[arg(long, env = "FLOWFORGE_HTTP_SUCCESS_PROBABILITY")]
        http_success_probability: Option<f64>,
        #[arg(long, env = "FLOWFORGE_STEP_DELAY_MS")]
        step_delay_ms: Option<u64>,
        #[arg(long, env = "FLOWFORGE_SETTLE_DELAY_MS")]
        settle_delay_ms: Option<u64>,
        /// Milliseconds per second of a Delay node's duration.
        #[arg(long, env = "FLOWFORGE_DELAY_UNIT_MS")]
        delay_unit_ms: Option<u64>,
    },
    /// Write the workflow back out as `flowforge-workflow-<millis>.json`.
    Export {
        /// Path to the workflow JSON file.
        path: PathBuf,
        /// Directory to write into.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Validate { path } => {
            let workflow = load(&path)?;
            let report = validate(&workflow.nodes, &workflow.edges);
            print_report(&report);
            Ok(exit_code(report.is_valid))
        }
        Command::Order { path } => {
            let workflow = load(&path)?;
            if detect_cycle(&workflow.nodes, &workflow.edges) {
                warn!("workflow contains a cycle; the order below is not a valid schedule");
            }
            for (step, id) in execution_sequence(&workflow.nodes, &workflow.edges)
                .iter()
                .enumerate()
            {
                let label = workflow.node(id).map_or("<missing>", |n| n.display_label());
                println!("{:>3}. {id} ({label})", step + 1);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            path,
            seed,
            http_success_probability,
            step_delay_ms,
            settle_delay_ms,
            delay_unit_ms,
        } => {
            let workflow = load(&path)?;

            let mut config = ExecutorConfig::from_env();
            if let Some(p) = http_success_probability {
                config.http_success_probability = p;
            }
            if let Some(ms) = step_delay_ms {
                config.step_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = settle_delay_ms {
                config.settle_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = delay_unit_ms {
                config.delay_unit = Duration::from_millis(ms);
            }

            let mut executor = WorkflowExecutor::new(config);
            if let Some(seed) = seed {
                info!(seed, "using seeded randomness");
                executor = executor.with_random(Arc::new(SeededRandom::new(seed)));
            }

            match executor.run_validated(&workflow, &mut ConsoleHandler).await {
                Ok(summary) => {
                    println!(
                        "{} executed, {} failed, {} skipped",
                        summary.executed.len(),
                        summary.failed.len(),
                        summary.skipped.len()
                    );
                    Ok(exit_code(summary.succeeded()))
                }
                Err(EngineError::NotRunnable(report)) => {
                    print_report(&report);
                    Ok(ExitCode::FAILURE)
                }
                Err(other) => Err(other.into()),
            }
        }
        Command::Export { path, out_dir } => {
            let workflow = load(&path)?;
            let written = write_export(&out_dir, &workflow, chrono::Utc::now())
                .with_context(|| format!("cannot export into {}", out_dir.display()))?;
            println!("{}", written.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load(path: &Path) -> Result<Workflow> {
    let workflow =
        import_file(path).with_context(|| format!("cannot load workflow {}", path.display()))?;
    info!(
        nodes = workflow.nodes.len(),
        edges = workflow.edges.len(),
        "loaded {}",
        path.display()
    );
    Ok(workflow)
}

fn print_report(report: &ValidationReport) {
    for issue in &report.issues {
        match &issue.node_id {
            Some(id) => println!("{issue} [{id}]"),
            None => println!("{issue}"),
        }
    }
    if report.is_valid {
        println!("✅ Workflow is valid ({} warning(s))", report.warning_count());
    } else {
        println!(
            "❌ {} error(s), {} warning(s)",
            report.error_count(),
            report.warning_count()
        );
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Prints each log record as one line on stdout.
struct ConsoleHandler;

impl ExecutionHandler for ConsoleHandler {
    fn on_log(&mut self, record: LogRecord) {
        let status = match record.severity {
            LogSeverity::Running => "RUNNING",
            LogSeverity::Success => "OK",
            LogSeverity::Error => "FAILED",
        };
        println!(
            "{} {:<7} {}: {}",
            record.timestamp.format("%H:%M:%S%.3f"),
            status,
            record.node_label,
            record.message
        );
    }

    fn on_finish(&mut self) {
        println!("Workflow execution finished");
    }
}
