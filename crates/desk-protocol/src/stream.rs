//! Streaming driver
//!
//! Runs a [`FrameDecoder`] against one open source until the source fails.
//! Reconnecting is left to the caller: once the stream ends, open the link
//! again and start a new decoder.

use tracing::debug;

use crate::decoder::FrameDecoder;
use crate::error::DecodeError;
use crate::frame::Frame;
use crate::metrics::DecoderMetrics;
use crate::source::{ByteSource, CancelToken};

/// Receives frames in decode order, then the error that ended the stream
pub trait FrameConsumer {
    /// Called for every decoded frame
    fn on_frame(&mut self, frame: Frame);

    /// Called once with the error that ended the stream
    fn on_error(&mut self, _error: &DecodeError) {}
}

impl<F> FrameConsumer for F
where
    F: FnMut(Frame),
{
    fn on_frame(&mut self, frame: Frame) {
        self(frame);
    }
}

/// Decode frames until the source fails, forwarding each to `consumer`
///
/// Returns the error that ended the stream after passing it to
/// [`FrameConsumer::on_error`]. Never retries.
pub fn read_frames<S, M, C>(
    decoder: &mut FrameDecoder<S, M>,
    cancel: &CancelToken,
    consumer: &mut C,
) -> DecodeError
where
    S: ByteSource,
    M: DecoderMetrics,
    C: FrameConsumer + ?Sized,
{
    let mut frames = 0u64;

    loop {
        match decoder.next_frame(cancel) {
            Ok(frame) => {
                frames += 1;
                consumer.on_frame(frame);
            }
            Err(e) => {
                debug!("Stream ended after {} frames: {}", frames, e);
                consumer.on_error(&e);
                return e;
            }
        }
    }
}
