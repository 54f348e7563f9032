//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use convey_core::ConsoleConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "convey")]
#[command(version = "0.1")]
#[command(about = "Runs commands through a deferred, cyclic console pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Console configuration file (TOML); defaults apply when absent
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    console_args: ConsoleArgs,
}

/// Overrides for individual console settings, applied on top of the file.
#[derive(clap::Args, Debug, Clone, Default)]
struct ConsoleArgs {
    /// Cyclic buffer size in KiB (0 disables cycling)
    #[arg(long, value_name = "KB")]
    cycle_buffer_kb: Option<u32>,

    /// Flush debounce delay in milliseconds
    #[arg(long, value_name = "MS")]
    flush_delay_ms: Option<u64>,

    /// Keep lone carriage returns as literal characters
    #[arg(long)]
    no_cr_emulation: bool,
}

impl ConsoleArgs {
    fn apply(&self, config: &mut ConsoleConfig) {
        if let Some(kb) = self.cycle_buffer_kb {
            config.cycle_buffer_enabled = kb > 0;
            config.cycle_buffer_size_kb = kb;
        }
        if let Some(ms) = self.flush_delay_ms {
            config.flush_delay_ms = ms;
        }
        if self.no_cr_emulation {
            config.emulate_carriage_return = false;
        }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run a command, capture its output through the pipeline, print the
    /// final document
    Run {
        /// Program to execute
        program: String,

        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Write this text to the program's stdin before reading output
        #[arg(long, value_name = "TEXT")]
        input: Option<String>,

        /// Print content-type spans after the document text
        #[arg(long)]
        annotate: bool,
    },

    /// Normalize text from stdin (or a file) and print the result
    Render {
        /// File to read; stdin when omitted
        file: Option<PathBuf>,

        /// Print content-type spans after the document text
        #[arg(long)]
        annotate: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Keep the non-blocking writer guard alive for the whole run.
    let _log_guard = init_logging(cli.log_file.as_deref())?;

    let mut config = match cli.config.as_deref() {
        Some(path) => ConsoleConfig::load_from(path).context("load console config")?,
        None => ConsoleConfig::default(),
    };
    cli.console_args.apply(&mut config);

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move {
        match cli.command {
            Commands::Run {
                program,
                args,
                input,
                annotate,
            } => {
                commands::run::run(commands::run::RunOptions {
                    program: &program,
                    args: &args,
                    input: input.as_deref(),
                    annotate,
                    config: &config,
                })
                .await
            }
            Commands::Render { file, annotate } => {
                commands::render::run(file.as_deref(), annotate, &config).await
            }
        }
    })
}

fn init_logging(
    log_file: Option<&std::path::Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            let file = std::fs::File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}
