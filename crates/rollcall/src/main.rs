use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rollcall_core::RunConfig;
use rollcall_parser::all_schemas;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Compiles weekly student exports into grade-level workbooks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge the configured exports and write the workbook(s) and run summary
    Compile(RunArgs),
    /// Parse and merge every export without writing anything
    Check(RunArgs),
    /// List the export layouts this build understands
    Schemas,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Run config file; falls back to ROLLCALL_CONFIG
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the configured completeness threshold
    #[arg(long)]
    threshold: Option<usize>,
    /// Skip the mail-merge workbook
    #[arg(long)]
    no_mail_merge: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Compile(args) => {
            let config = load_config(&args)?;
            let summary = rollcall_core::run(&config).context("compile run failed")?;
            for workbook in &summary.workbooks {
                println!("wrote {}", workbook.path.display());
            }
            println!(
                "{} students retained, {} discarded",
                summary.retained_students,
                summary.discarded.len()
            );
            Ok(())
        }
        Command::Check(args) => {
            let config = load_config(&args)?;
            let compiled = rollcall_core::compile(&config).context("check failed")?;
            for input in &compiled.inputs {
                println!(
                    "{:<18} {:>5} students  {}",
                    input.reader,
                    input.students,
                    input.path.display()
                );
            }
            for discarded in &compiled.discarded {
                println!(
                    "discard {} ({} fields, {:?})",
                    discarded.student_id, discarded.populated, discarded.reason
                );
            }
            info!(retained = compiled.table.len(), "Check finished");
            Ok(())
        }
        Command::Schemas => {
            for schema in all_schemas() {
                println!("{:<18} v{}  {}", schema.id, schema.version, schema.description);
            }
            Ok(())
        }
    }
}

fn load_config(args: &RunArgs) -> Result<RunConfig> {
    dotenvy::dotenv().ok();
    let path = match &args.config {
        Some(path) => path.clone(),
        None => std::env::var("ROLLCALL_CONFIG")
            .map(PathBuf::from)
            .context("pass --config or set ROLLCALL_CONFIG")?,
    };

    let mut config = RunConfig::load(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    if let Some(threshold) = args.threshold {
        warn!(
            configured = config.completeness_threshold,
            threshold, "Overriding completeness threshold"
        );
        config.completeness_threshold = threshold;
    }
    if args.no_mail_merge {
        config.output.mail_merge = false;
    }
    config.validate()?;
    Ok(config)
}
