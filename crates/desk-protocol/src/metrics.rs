//! Observability sink for decoder anomalies
//!
//! The decoder never owns process-wide counters. A sink is handed to each
//! [`FrameDecoder`](crate::FrameDecoder) so that several links can share one
//! aggregate, and tests can observe a single decoder in isolation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters incremented by the decoder
pub trait DecoderMetrics {
    /// A frame arrived whose checksum did not match its fields
    fn record_checksum_mismatch(&self);

    /// A length byte exceeded the maximum parameter count
    fn record_invalid_length(&self);
}

/// Lock-free counters, safe to share between decoders on different threads
#[derive(Debug, Default)]
pub struct AtomicDecoderMetrics {
    checksum_mismatches: AtomicU64,
    invalid_lengths: AtomicU64,
}

impl AtomicDecoderMetrics {
    /// Create a sink with both counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Total checksum mismatches recorded
    pub fn checksum_mismatches(&self) -> u64 {
        self.checksum_mismatches.load(Ordering::Relaxed)
    }

    /// Total invalid length bytes recorded
    pub fn invalid_lengths(&self) -> u64 {
        self.invalid_lengths.load(Ordering::Relaxed)
    }
}

impl DecoderMetrics for AtomicDecoderMetrics {
    fn record_checksum_mismatch(&self) {
        self.checksum_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    fn record_invalid_length(&self) {
        self.invalid_lengths.fetch_add(1, Ordering::Relaxed);
    }
}

impl<M: DecoderMetrics + ?Sized> DecoderMetrics for Arc<M> {
    fn record_checksum_mismatch(&self) {
        (**self).record_checksum_mismatch();
    }

    fn record_invalid_length(&self) {
        (**self).record_invalid_length();
    }
}

impl<M: DecoderMetrics + ?Sized> DecoderMetrics for &M {
    fn record_checksum_mismatch(&self) {
        (**self).record_checksum_mismatch();
    }

    fn record_invalid_length(&self) {
        (**self).record_invalid_length();
    }
}
