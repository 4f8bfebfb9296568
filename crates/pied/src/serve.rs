//! The `serve` command: events in, UI messages and backend requests out.

use std::{sync::Arc, time::Duration};

use pie_engine::{Engine, EngineConfig};
use pie_protocol::{
    Error as ProtocolError,
    ipc::{codec, ui_channel},
};
use tokio::{
    fs::File,
    io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::mpsc::{self, UnboundedReceiver},
    time,
};
use tracing::{debug, info, warn};

use crate::{backend::StdioBackend, cli::ServeArgs, error::Result};

/// Run the engine over the configured input until it ends.
pub async fn run(cfg: EngineConfig, args: &ServeArgs) -> Result<()> {
    let linger = Duration::from_millis(args.linger_ms);
    match &args.input {
        Some(path) => {
            let file = File::open(path).await?;
            serve(cfg, file, io::stdout(), linger).await
        }
        None => serve(cfg, io::stdin(), io::stdout(), linger).await,
    }
}

/// Write every queued line to `out`.
async fn write_lines<W>(mut rx: UnboundedReceiver<String>, mut out: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(())
}

/// Drive an engine from `input`, writing output lines to `output`.
///
/// Malformed input lines are logged and skipped.
pub async fn serve<R, W>(cfg: EngineConfig, input: R, output: W, linger: Duration) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(write_lines(out_rx, output));

    let (ui_tx, mut ui_rx) = ui_channel();
    let ui_out = out_tx.clone();
    let forward = tokio::spawn(async move {
        while let Some(msg) = ui_rx.recv().await {
            match codec::encode_line(&msg) {
                Ok(line) => {
                    if ui_out.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("failed to encode UI message: {}", e),
            }
        }
    });

    let engine = Engine::new(&cfg, Arc::new(StdioBackend::new(out_tx)), ui_tx);
    let (ev_tx, ev_rx) = mpsc::unbounded_channel();
    let engine_task = tokio::spawn(engine.run(ev_rx));

    let mut lines = BufReader::new(input).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        match codec::decode_inbound(&line) {
            Ok(ev) => {
                if ev_tx.send(ev).is_err() {
                    break;
                }
            }
            Err(ProtocolError::Empty) => {}
            Err(e) => warn!(line = line_no, "skipping malformed event: {}", e),
        }
    }
    info!(lines = line_no, "input ended");
    if !linger.is_zero() {
        time::sleep(linger).await;
    }
    drop(ev_tx);

    engine_task.await??;
    forward.await?;
    writer.await??;
    debug!("serve finished");
    Ok(())
}
