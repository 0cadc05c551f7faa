//! CLI binary for running and validating Laminar pipelines.

use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use laminar_pipeline::{PipelineOrchestrator, RunOptions};

#[derive(Parser)]
#[command(name = "laminar", version, about = "Layered pipeline runner for governance tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline
    Run {
        /// Path to the pipeline definition
        #[arg(long, default_value = "pipeline.yaml")]
        config: PathBuf,

        /// Resume: skip layers with id below N, trusting the state file
        #[arg(long)]
        start_layer: Option<u32>,

        /// Print the planned execution order without running anything
        #[arg(long)]
        dry_run: bool,

        /// Where the human-readable run summary is written
        #[arg(long, default_value = "pipeline_summary.txt")]
        summary_file: PathBuf,

        /// Append-only execution log
        #[arg(long, default_value = "pipeline_execution.log")]
        log_file: PathBuf,
    },

    /// Validate a pipeline definition
    Validate {
        /// Path to the pipeline definition
        #[arg(long, default_value = "pipeline.yaml")]
        config: PathBuf,
    },

    /// Show an overview of a pipeline definition
    Info {
        /// Path to the pipeline definition
        #[arg(long, default_value = "pipeline.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            start_layer,
            dry_run,
            summary_file,
            log_file,
        } => {
            setup_tracing(cli.verbose, if dry_run { None } else { Some(&log_file) })?;
            cmd_run(&config, start_layer, dry_run, &summary_file).await?;
        }
        Commands::Validate { config } => {
            setup_tracing(cli.verbose, None)?;
            cmd_validate(&config)?;
        }
        Commands::Info { config } => {
            setup_tracing(cli.verbose, None)?;
            cmd_info(&config)?;
        }
    }

    Ok(())
}

/// Stderr logging always; an append-mode file layer when executing a run.
fn setup_tracing(verbose: bool, log_file: Option<&std::path::Path>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "info" }));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

async fn cmd_run(
    config: &std::path::Path,
    start_layer: Option<u32>,
    dry_run: bool,
    summary_file: &std::path::Path,
) -> anyhow::Result<()> {
    let def = laminar_config::load(config)?;
    let orchestrator = PipelineOrchestrator::new(def)?;

    if dry_run {
        print_plan(&orchestrator);
        return Ok(());
    }

    println!(
        "Running pipeline: {}",
        orchestrator.definition().pipeline_name
    );
    if let Some(n) = start_layer {
        println!("Resuming from layer {}", n);
    }

    let summary = orchestrator.run(RunOptions { start_layer }).await?;

    println!("\n{}", summary.render());
    summary.write_to(summary_file)?;
    println!("Summary written to {}", summary_file.display());

    if !summary.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_plan(orchestrator: &PipelineOrchestrator) {
    let def = orchestrator.definition();
    println!("Pipeline: {} (dry run)", def.pipeline_name);
    for layer in orchestrator.plan() {
        let mode = if layer.parallel { "parallel" } else { "sequential" };
        let mut heading = format!("  layer {} '{}' [{}]", layer.id, layer.name, mode);
        if !layer.dependencies.is_empty() {
            heading.push_str(&format!(" depends on {:?}", layer.dependencies));
        }
        if layer.delay_seconds > 0 {
            heading.push_str(&format!(" delay {}s", layer.delay_seconds));
        }
        println!("{}", heading);
        for tool in &layer.tools {
            let optional = if tool.optional { " (optional)" } else { "" };
            println!(
                "    {} -> {} {}{}",
                tool.name,
                tool.script,
                tool.args.join(" "),
                optional
            );
        }
    }
}

fn cmd_validate(config: &std::path::Path) -> anyhow::Result<()> {
    let def = laminar_config::load(config)?;
    let diagnostics = laminar_config::validate(&def);

    if diagnostics.is_empty() {
        println!("Pipeline definition is valid");
        return Ok(());
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            laminar_config::Severity::Error => {
                has_error = true;
                "ERROR"
            }
            laminar_config::Severity::Warning => "WARN",
            laminar_config::Severity::Info => "INFO",
        };
        println!("[{}] {}: {}", severity, diag.rule, diag.message);
    }

    if has_error {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_info(config: &std::path::Path) -> anyhow::Result<()> {
    let def = laminar_config::load(config)?;

    println!("Pipeline: {}", def.pipeline_name);
    if !def.version.is_empty() {
        println!("Version: {}", def.version);
    }
    println!("Layers: {}", def.layers.len());
    let tool_count: usize = def.layers.iter().map(|l| l.tools.len()).sum();
    println!("Tools: {}", tool_count);
    println!("Quality gates: {}", def.quality_gates.len());
    if def.rollback.enabled {
        println!(
            "Rollback: {} action(s), triggered by layers {:?}",
            def.rollback.actions.len(),
            def.rollback.on_failure_at_layers
        );
    }

    println!("\nLayers:");
    for layer in &def.layers {
        let mut flags = Vec::new();
        if layer.parallel {
            flags.push("parallel");
        }
        if layer.optional {
            flags.push("optional");
        }
        if layer.always_run {
            flags.push("always_run");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!(
            "  {} {} ({} tool(s)){}",
            layer.id,
            layer.name,
            layer.tools.len(),
            flags
        );
    }

    Ok(())
}
