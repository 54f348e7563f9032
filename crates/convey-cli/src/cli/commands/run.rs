//! Run command handler.

use std::sync::Arc;

use anyhow::{Context, Result};
use convey_core::{ConsoleConfig, ConsoleView, ProcessSource};

use super::print_snapshot;

pub struct RunOptions<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    pub input: Option<&'a str>,
    pub annotate: bool,
    pub config: &'a ConsoleConfig,
}

pub async fn run(options: RunOptions<'_>) -> Result<()> {
    let mut command = tokio::process::Command::new(options.program);
    command.args(options.args);
    let source = ProcessSource::spawn(command)
        .with_context(|| format!("spawn '{}'", options.program))?;

    let console = ConsoleView::new(options.config);
    console
        .attach(Arc::new(source))
        .context("attach process to console")?;

    if let Some(input) = options.input {
        let mut text = input.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        console.send_input(&text).context("send input to process")?;
    }

    console.wait_terminated().await;
    tracing::debug!(program = options.program, "child terminated, flushing");

    let snapshot = console
        .flush()
        .await
        .context("console disposed before final flush")?;
    print_snapshot(&snapshot, options.annotate);
    console.dispose();
    Ok(())
}
