//! Render command handler.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use convey_core::{ConsoleConfig, ConsoleView, ContentType};

use super::print_snapshot;

pub async fn run(file: Option<&Path>, annotate: bool, config: &ConsoleConfig) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            buf
        }
    };

    let console = ConsoleView::new(config);
    console.print(&text, ContentType::Normal);
    let snapshot = console
        .flush()
        .await
        .context("console disposed before final flush")?;
    print_snapshot(&snapshot, annotate);
    console.dispose();
    Ok(())
}
