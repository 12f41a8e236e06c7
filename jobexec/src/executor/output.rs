use crate::events::Output;
use crate::types::OutputBlob;

use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::{select, time};
use tracing::{debug, warn};

/// Readers draining a child's stdout and stderr into one channel.
pub(crate) struct OutputCapture {
    output_rx: mpsc::UnboundedReceiver<Output>,
    readers: Vec<JoinHandle<()>>,
}

#[derive(Debug, Default)]
pub(crate) struct CapturedOutput {
    pub stdout: OutputBlob,
    pub stderr: OutputBlob,
    // pipes still open when the limit ran out
    pub truncated: bool,
}

impl OutputCapture {
    pub(crate) fn start(child: &mut Child) -> Self {
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pipe(stdout, output_tx.clone(), Output::Stdout)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pipe(stderr, output_tx, Output::Stderr)));
        }
        Self { output_rx, readers }
    }

    /// Collect output until both pipes close or `limit` runs out, keeping what was read.
    pub(crate) async fn drain(mut self, limit: Duration) -> CapturedOutput {
        let mut stdout = BytesMut::new();
        let mut stderr = BytesMut::new();
        let mut truncated = false;

        let deadline = time::sleep(limit);
        tokio::pin!(deadline);
        loop {
            select! {
                maybe_output = self.output_rx.recv() => {
                    match maybe_output {
                        Some(output) => append(&mut stdout, &mut stderr, output),
                        None => break,
                    }
                }
                _ = &mut deadline => {
                    truncated = true;
                    break;
                }
            }
        }

        if truncated {
            warn!(
                limit_ms = limit.as_millis() as u64,
                "output pipes still open after process exit; truncating capture"
            );
            for reader in &self.readers {
                reader.abort();
            }
            while let Ok(output) = self.output_rx.try_recv() {
                append(&mut stdout, &mut stderr, output);
            }
        }

        CapturedOutput {
            stdout: stdout.freeze(),
            stderr: stderr.freeze(),
            truncated,
        }
    }
}

fn append(stdout: &mut BytesMut, stderr: &mut BytesMut, output: Output) {
    match output {
        Output::Stdout(blob) => stdout.extend_from_slice(&blob),
        Output::Stderr(blob) => stderr.extend_from_slice(&blob),
    }
}

async fn pipe<R>(mut reader: R, output_tx: mpsc::UnboundedSender<Output>, tag: fn(OutputBlob) -> Output)
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        buf.reserve(4096);
        match reader.read_buf(&mut buf).await {
            Ok(n) if n > 0 => {
                // move the bytes out of buf and into a message
                if output_tx.send(tag(buf.split().freeze())).is_err() {
                    break;
                }
            }
            Ok(_) => break,
            Err(e) => {
                debug!(error = %e, "reading child output failed");
                break;
            }
        }
    }
}
