//! Blocking read loops feeding the desk metrics
//!
//! These run on a blocking thread. The serial loop reopens the port after
//! every stream error; a port that fails to open ends the loop.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use desk_protocol::{read_frames, ByteSource, CancelToken, DecodeError, FrameDecoder};
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::link::SerialLink;
use crate::metrics::{DeskMetrics, FrameHandler};

/// Sleep granularity while waiting to reconnect
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the configured source until it is exhausted, fails to open, or is cancelled
pub fn run_source(source: &SourceConfig, metrics: &DeskMetrics, cancel: &CancelToken) -> Result<()> {
    match source {
        SourceConfig::Serial {
            path,
            baud_rate,
            reconnect_delay,
        } => read_loop(path, *baud_rate, *reconnect_delay, metrics, cancel),
        SourceConfig::Replay(path) => replay(path, metrics, cancel),
    }
}

/// Stream frames from one open source into the metrics
pub fn stream_source<S: ByteSource>(
    source: S,
    metrics: &DeskMetrics,
    cancel: &CancelToken,
) -> DecodeError {
    let mut decoder = FrameDecoder::new(source, metrics.decoder());
    read_frames(&mut decoder, cancel, &mut FrameHandler::new(metrics))
}

fn read_loop(
    path: &str,
    baud_rate: u32,
    reconnect_delay: Duration,
    metrics: &DeskMetrics,
    cancel: &CancelToken,
) -> Result<()> {
    // Reconnect whenever the port closes or a read fails
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        info!("Opening serial port {} for streaming", path);
        let link = SerialLink::open(path, baud_rate, cancel.clone())
            .with_context(|| format!("port open: {path}"))?;

        if stream_source(link, metrics, cancel).is_cancelled() {
            return Ok(());
        }

        wait(reconnect_delay, cancel);
    }
}

fn replay(path: &Path, metrics: &DeskMetrics, cancel: &CancelToken) -> Result<()> {
    let file = File::open(path).with_context(|| format!("open replay file {}", path.display()))?;
    info!("Replaying {}", path.display());

    // A run of garbage aborts one decoder; keep going from the same position
    let mut reader = BufReader::new(file);
    loop {
        match stream_source(&mut reader, metrics, cancel) {
            DecodeError::EndOfStream | DecodeError::Cancelled => return Ok(()),
            DecodeError::TooManyInvalidLengths(count) => {
                debug!("Restarting replay after {} invalid lengths", count);
            }
            e => bail!("replay of {} failed: {}", path.display(), e),
        }
    }
}

fn wait(delay: Duration, cancel: &CancelToken) {
    let deadline = Instant::now() + delay;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(CANCEL_POLL_INTERVAL.min(deadline - now));
    }
}
