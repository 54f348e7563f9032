//! Child-process output source.
//!
//! Wraps a `tokio::process` child: two reader tasks stream stdout/stderr
//! chunks into the event channel, a writer task owns stdin and flushes every
//! write, and the termination event is emitted only after both readers have
//! drained so no output is lost behind it.

use std::process::Stdio;
use std::sync::Mutex;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::source::{OutputSource, SourceChannel, SourceEvent};

const READ_CHUNK: usize = 8 * 1024;

/// An `OutputSource` backed by a spawned child process.
pub struct ProcessSource {
    events: Mutex<Option<mpsc::UnboundedReceiver<SourceEvent>>>,
    input: Option<mpsc::UnboundedSender<String>>,
}

impl ProcessSource {
    /// Spawns the command with piped stdio and starts the pump tasks.
    pub fn spawn(mut command: Command) -> std::io::Result<Self> {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = command.spawn()?;

        let (tx, rx) = mpsc::unbounded_channel();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdin = child.stdin.take();

        let out_pump = tokio::spawn(pump(stdout, SourceChannel::Stdout, tx.clone()));
        let err_pump = tokio::spawn(pump(stderr, SourceChannel::Stderr, tx.clone()));

        let input = stdin.map(|mut stdin| {
            let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
            tokio::spawn(async move {
                while let Some(text) = input_rx.recv().await {
                    if stdin.write_all(text.as_bytes()).await.is_err() {
                        break;
                    }
                    if stdin.flush().await.is_err() {
                        break;
                    }
                }
            });
            input_tx
        });

        tokio::spawn(async move {
            // Drain both streams before reporting termination, so output
            // already produced is never reordered behind the exit event.
            let _ = out_pump.await;
            let _ = err_pump.await;
            let status = child.wait().await.ok().and_then(|s| s.code());
            let _ = tx.send(SourceEvent::Terminated { status });
        });

        Ok(Self {
            events: Mutex::new(Some(rx)),
            input,
        })
    }
}

impl OutputSource for ProcessSource {
    fn events(&self) -> Option<mpsc::UnboundedReceiver<SourceEvent>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }

    fn input(&self) -> Option<mpsc::UnboundedSender<String>> {
        self.input.clone()
    }
}

/// Streams one stdio pipe into the event channel, chunk by chunk.
///
/// Text is assumed decoded; invalid UTF-8 is replaced rather than dropped.
async fn pump<R>(reader: Option<R>, channel: SourceChannel, tx: mpsc::UnboundedSender<SourceEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                if tx.send(SourceEvent::Output { channel, text }).is_err() {
                    break;
                }
            }
        }
    }
}
