//! Exported metrics and frame handling
//!
//! Decoder counters live in an [`AtomicDecoderMetrics`] shared with every
//! decoder; the exporter adds its own read-error counter and the desk gauges,
//! and renders all of them in the Prometheus text format.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use desk_protocol::command::desk;
use desk_protocol::{AtomicDecoderMetrics, DecodeError, Frame, FrameConsumer};
use tracing::{info, warn};

/// All metrics served on `/metrics`
#[derive(Debug)]
pub struct DeskMetrics {
    namespace: String,
    decoder: Arc<AtomicDecoderMetrics>,
    read_errors: AtomicU64,
    height_mm: AtomicU64,
    preset: AtomicU64,
}

impl DeskMetrics {
    /// Create metrics with every value at zero
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            decoder: Arc::new(AtomicDecoderMetrics::new()),
            read_errors: AtomicU64::new(0),
            height_mm: AtomicU64::new(0),
            preset: AtomicU64::new(0),
        }
    }

    /// Sink to hand to frame decoders
    pub fn decoder(&self) -> Arc<AtomicDecoderMetrics> {
        Arc::clone(&self.decoder)
    }

    /// Count a stream that ended with a read error
    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Streams that ended with a read error so far
    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }

    /// Store the latest height report, in millimeters
    pub fn set_height_mm(&self, height_mm: u64) {
        self.height_mm.store(height_mm, Ordering::Relaxed);
    }

    /// Current desk height in meters
    pub fn height_meters(&self) -> f64 {
        self.height_mm.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Store the preset the desk is moving to
    pub fn set_preset(&self, preset: u8) {
        self.preset.store(u64::from(preset), Ordering::Relaxed);
    }

    /// Last selected preset, 0 until one is seen
    pub fn preset(&self) -> u64 {
        self.preset.load(Ordering::Relaxed)
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut out = String::new();

        self.write_metric(
            &mut out,
            "checksum_errors_total",
            "counter",
            "A count of checksum errors encountered.",
            self.decoder.checksum_mismatches() as f64,
        );
        self.write_metric(
            &mut out,
            "invalid_length_count_total",
            "counter",
            "Number of times an invalid length field was received.",
            self.decoder.invalid_lengths() as f64,
        );
        self.write_metric(
            &mut out,
            "read_errors_total",
            "counter",
            "A count of read errors encountered. See logs for details.",
            self.read_errors() as f64,
        );
        self.write_metric(
            &mut out,
            "desk_height_meters",
            "gauge",
            "The current height of the desk, in meters.",
            self.height_meters(),
        );
        self.write_metric(
            &mut out,
            "desk_preset_selected",
            "gauge",
            "The last preset selected",
            self.preset() as f64,
        );

        out
    }

    fn write_metric(&self, out: &mut String, name: &str, kind: &str, help: &str, value: f64) {
        let name = format!("{}_{}", self.namespace, name);
        // Writing to a String cannot fail
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} {kind}");
        let _ = writeln!(out, "{name} {value}");
    }
}

/// Applies decoded frames to the desk metrics
pub struct FrameHandler<'a> {
    metrics: &'a DeskMetrics,
}

impl<'a> FrameHandler<'a> {
    /// Handler that writes into `metrics`
    pub fn new(metrics: &'a DeskMetrics) -> Self {
        Self { metrics }
    }
}

impl FrameConsumer for FrameHandler<'_> {
    fn on_frame(&mut self, frame: Frame) {
        match frame.command() {
            desk::HEIGHT => self.metrics.set_height_mm(frame.height_mm()),
            desk::PRESET => {
                info!("Moving to preset {}", frame.preset());
                self.metrics.set_preset(frame.preset());
            }
            code => {
                let kind = frame.kind();
                if kind.is_known() {
                    info!("Got {} frame (type {:#04x}): {}", kind.name(), code, frame);
                } else {
                    info!("Got frame (type {:#04x}): {}", code, frame);
                }
            }
        }
    }

    fn on_error(&mut self, error: &DecodeError) {
        if error.is_cancelled() {
            return;
        }

        self.metrics.record_read_error();
        warn!("Read error: {}", error);
    }
}
