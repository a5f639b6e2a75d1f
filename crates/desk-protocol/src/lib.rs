//! Jarvis Desk Protocol Library
//!
//! This crate decodes the serial protocol spoken on the bus between a
//! Jarvis standing desk controller and its handset.
//!
//! # Frame Format
//! ```text
//! [addr] [addr] [cmd] [len] [params (0-3 bytes)] [cksum] 7E
//! ```
//!
//! - `addr`: `F1` (handset) or `F2` (desk), always sent twice
//! - `cmd`: Command code
//! - `len`: Number of parameter bytes (0-3)
//! - `params`: Parameter bytes, most significant first
//! - `cksum`: `(cmd + len + params) % 0xFF`
//! - `7E`: Terminator
//!
//! # Architecture
//!
//! - [`decoder::FrameDecoder`] reads one byte at a time from a [`ByteSource`]
//!   and resynchronizes on noise by restarting its state machine
//! - [`DecoderMetrics`] is the observability sink for checksum mismatches and
//!   invalid lengths, injected into the decoder
//! - [`Frame`] exposes typed height and preset values plus a human-readable
//!   rendering
//! - [`stream::read_frames`] drives the decoder against one open source until
//!   the link fails
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use desk_protocol::{AtomicDecoderMetrics, CancelToken, FrameDecoder};
//!
//! let bytes = [0xF2, 0xF2, 0x01, 0x03, 0x04, 0xAB, 0x0F, 0xC2, 0x7E];
//! let mut decoder = FrameDecoder::new(Cursor::new(bytes), AtomicDecoderMetrics::new());
//!
//! let frame = decoder.next_frame(&CancelToken::new()).unwrap();
//! assert_eq!(frame.height_mm(), 1195);
//! ```

pub mod checksum;
pub mod command;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod interpret;
pub mod metrics;
pub mod source;
pub mod stream;

pub use command::Command;
pub use decoder::FrameDecoder;
pub use error::{DecodeError, FrameError};
pub use frame::{Address, Frame};
pub use interpret::{HeightReading, HeightUnit};
pub use metrics::{AtomicDecoderMetrics, DecoderMetrics};
pub use source::{ByteSource, CancelToken};
pub use stream::{read_frames, FrameConsumer};
