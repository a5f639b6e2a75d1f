//! Frame decoder state machine
//!
//! The decoder reads one byte at a time and walks a fixed sequence of states.
//! Any byte that doesn't fit the current state throws away the frame in
//! progress and starts over from [`DecodeState::Unsynchronized`], so the
//! decoder finds the next frame boundary on its own after noise or a
//! mid-frame start. Memory use is one partial frame, whatever the input.
//!
//! ```text
//! Unsynchronized --F1/F2--> HalfSynchronized --same addr--> Synchronized
//!   --cmd--> CommandReceived --len 1..=3--> ReadingParams --...--> ParamsComplete
//!                            --len 0------------------------------^
//!   ParamsComplete --cksum--> ChecksumReceived --7E--> (frame)
//! ```

use tracing::{debug, trace, warn};

use crate::error::DecodeError;
use crate::frame::{Address, Frame, MAX_PARAM_LEN, TERMINATOR};
use crate::metrics::DecoderMetrics;
use crate::source::{ByteSource, CancelToken};

/// Invalid length bytes tolerated within one decode attempt
pub const MAX_INVALID_LENGTHS: u32 = 3;

/// Position in the frame being decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for an address byte
    Unsynchronized,
    /// Waiting for the address byte to repeat
    HalfSynchronized,
    /// Next byte is the command
    Synchronized,
    /// Next byte is the parameter length
    CommandReceived,
    /// Reading parameter bytes; `remaining` counts down to 1
    ReadingParams { remaining: u8 },
    /// Next byte is the checksum
    ParamsComplete,
    /// Next byte must be the terminator
    ChecksumReceived,
}

/// Outcome of feeding one byte to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Advance(DecodeState),
    Reset,
    InvalidLength(u8),
    Complete,
}

/// Fields collected so far for the frame in progress
#[derive(Debug, Default)]
struct PartialFrame {
    raw: Vec<u8>,
    address: Option<Address>,
    command: u8,
    param_length: u8,
    params: u32,
    checksum: u8,
}

impl PartialFrame {
    fn accept(&mut self, state: DecodeState, byte: u8) -> Transition {
        match state {
            DecodeState::Unsynchronized => match Address::from_byte(byte) {
                Some(address) => {
                    self.address = Some(address);
                    Transition::Advance(DecodeState::HalfSynchronized)
                }
                None => Transition::Reset,
            },
            DecodeState::HalfSynchronized => {
                if self.address.map(Address::as_byte) == Some(byte) {
                    Transition::Advance(DecodeState::Synchronized)
                } else {
                    Transition::Reset
                }
            }
            DecodeState::Synchronized => {
                self.command = byte;
                Transition::Advance(DecodeState::CommandReceived)
            }
            DecodeState::CommandReceived => {
                if byte > MAX_PARAM_LEN {
                    return Transition::InvalidLength(byte);
                }
                self.param_length = byte;
                if byte == 0 {
                    Transition::Advance(DecodeState::ParamsComplete)
                } else {
                    Transition::Advance(DecodeState::ReadingParams { remaining: byte })
                }
            }
            DecodeState::ReadingParams { remaining } => {
                // Most significant byte arrives first
                self.params |= u32::from(byte) << (8 * u32::from(remaining - 1));
                if remaining > 1 {
                    Transition::Advance(DecodeState::ReadingParams {
                        remaining: remaining - 1,
                    })
                } else {
                    Transition::Advance(DecodeState::ParamsComplete)
                }
            }
            DecodeState::ParamsComplete => {
                self.checksum = byte;
                Transition::Advance(DecodeState::ChecksumReceived)
            }
            DecodeState::ChecksumReceived => {
                if byte == TERMINATOR {
                    Transition::Complete
                } else {
                    Transition::Reset
                }
            }
        }
    }

    fn finish(self) -> Option<Frame> {
        let address = self.address?;
        Some(Frame::decoded(
            self.raw,
            address,
            self.command,
            self.param_length,
            self.params,
            self.checksum,
        ))
    }
}

/// Decodes frames from a byte source
///
/// One decoder per source; `next_frame` takes `&mut self`, so a source is
/// never decoded from two places at once.
pub struct FrameDecoder<S, M> {
    source: S,
    metrics: M,
}

impl<S, M> FrameDecoder<S, M>
where
    S: ByteSource,
    M: DecoderMetrics,
{
    /// Create a decoder reading from `source` and reporting to `metrics`
    pub fn new(source: S, metrics: M) -> Self {
        Self { source, metrics }
    }

    /// Read bytes until one complete frame has been decoded
    ///
    /// Noise, repeated-address mismatches and missing terminators restart the
    /// attempt silently. A length byte above 3 restarts it too, but the third
    /// one within the same attempt fails with
    /// [`DecodeError::TooManyInvalidLengths`]. A checksum mismatch is counted
    /// and the frame is still returned.
    ///
    /// The cancel token is checked before every read.
    pub fn next_frame(&mut self, cancel: &CancelToken) -> Result<Frame, DecodeError> {
        let mut state = DecodeState::Unsynchronized;
        let mut partial = PartialFrame::default();
        let mut invalid_lengths = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(DecodeError::Cancelled);
            }

            if invalid_lengths >= MAX_INVALID_LENGTHS {
                return Err(DecodeError::TooManyInvalidLengths(invalid_lengths));
            }

            let byte = match self.source.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => return Err(DecodeError::EndOfStream),
                // A source blocked in a read reports cancellation as an I/O error
                Err(_) if cancel.is_cancelled() => return Err(DecodeError::Cancelled),
                Err(e) => return Err(DecodeError::Read(e)),
            };

            partial.raw.push(byte);

            match partial.accept(state, byte) {
                Transition::Advance(next) => state = next,
                Transition::Reset => {
                    trace!("Lost sync in {:?} at 0x{:02X}", state, byte);
                    state = DecodeState::Unsynchronized;
                    partial = PartialFrame::default();
                }
                Transition::InvalidLength(length) => {
                    warn!(
                        "Invalid length {:#04x} is greater than {} (raw: {:02X?})",
                        length, MAX_PARAM_LEN, partial.raw
                    );
                    self.metrics.record_invalid_length();
                    invalid_lengths += 1;

                    state = DecodeState::Unsynchronized;
                    partial = PartialFrame::default();
                }
                Transition::Complete => {
                    // The address is always set once past Unsynchronized
                    let Some(frame) = std::mem::take(&mut partial).finish() else {
                        state = DecodeState::Unsynchronized;
                        continue;
                    };

                    if !frame.checksum_valid() {
                        debug!(
                            "Checksum mismatch on frame {:02X?} (cmd 0x{:02X})",
                            frame.raw(),
                            frame.command()
                        );
                        self.metrics.record_checksum_mismatch();
                    }

                    return Ok(frame);
                }
            }
        }
    }
}

impl<S, M> FrameDecoder<S, M> {
    /// The metrics sink this decoder reports to
    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Borrow the underlying source
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Give back the underlying source
    pub fn into_inner(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use super::*;
    use crate::metrics::AtomicDecoderMetrics;

    fn decoder(bytes: &[u8]) -> FrameDecoder<Cursor<Vec<u8>>, AtomicDecoderMetrics> {
        FrameDecoder::new(Cursor::new(bytes.to_vec()), AtomicDecoderMetrics::new())
    }

    #[test]
    fn test_empty_stream() {
        let mut dec = decoder(&[]);
        let err = dec.next_frame(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, DecodeError::EndOfStream));
    }

    #[test]
    fn test_single_noise_byte() {
        let mut dec = decoder(&[0x00]);
        assert!(dec.next_frame(&CancelToken::new()).is_err());
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut dec = decoder(&[0xF2, 0xF2, 0x01, 0x00, 0x01, 0x7E]);
        let err = dec.next_frame(&cancel).unwrap_err();
        assert!(err.is_cancelled());
        // Nothing was read
        assert_eq!(dec.get_ref().position(), 0);
    }

    #[test]
    fn test_incomplete_frame() {
        let mut dec = decoder(&[0xF2, 0xF2]);
        let err = dec.next_frame(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, DecodeError::EndOfStream));
    }

    #[test]
    fn test_three_invalid_lengths_abort() {
        let mut dec = decoder(&[
            0xF2, 0xF2, 0x01, 0x04, //
            0xF2, 0xF2, 0x01, 0x04, //
            0xF2, 0xF2, 0x01, 0x04,
        ]);
        let err = dec.next_frame(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, DecodeError::TooManyInvalidLengths(3)));
        assert_eq!(dec.metrics().invalid_lengths(), 3);
        assert_eq!(dec.metrics().checksum_mismatches(), 0);
    }

    #[test]
    fn test_invalid_length_then_valid_frame() {
        let mut dec = decoder(&[
            0xF2, 0xF2, 0x01, 0x04, //
            0xF2, 0xF2, 0x01, 0x03, 0x01, 0x0a, 0x0f, 0x1e, 0x7E,
        ]);
        let frame = dec.next_frame(&CancelToken::new()).unwrap();
        assert_eq!(frame.params(), 0x010a0f);
        assert_eq!(dec.metrics().invalid_lengths(), 1);
    }

    #[test]
    fn test_invalid_length_budget_is_per_attempt() {
        let valid = [0xF2, 0xF2, 0x01, 0x03, 0x01, 0x0a, 0x0f, 0x1e, 0x7E];
        let mut bytes = vec![0xF2, 0xF2, 0x01, 0x09, 0xF2, 0xF2, 0x01, 0x09];
        bytes.extend_from_slice(&valid);
        bytes.extend_from_slice(&[0xF2, 0xF2, 0x01, 0x09, 0xF2, 0xF2, 0x01, 0x09]);
        bytes.extend_from_slice(&valid);

        let mut dec = decoder(&bytes);
        let cancel = CancelToken::new();
        assert!(dec.next_frame(&cancel).is_ok());
        assert!(dec.next_frame(&cancel).is_ok());
        assert_eq!(dec.metrics().invalid_lengths(), 4);
    }

    #[test]
    fn test_bad_checksum_still_returned() {
        let msg = [0xF2, 0xF2, 0x01, 0x03, 0x01, 0x0a, 0x0f, 0x05, 0x7E];
        let mut dec = decoder(&msg);
        let frame = dec.next_frame(&CancelToken::new()).unwrap();

        assert_eq!(frame.raw(), &msg);
        assert_eq!(frame.address(), Address::Desk);
        assert_eq!(frame.command(), 0x01);
        assert_eq!(frame.param_length(), 3);
        assert_eq!(frame.params(), 0x010a0f);
        assert_eq!(frame.checksum(), 0x05);
        assert!(!frame.checksum_valid());

        assert_eq!(dec.metrics().checksum_mismatches(), 1);
        assert_eq!(dec.metrics().invalid_lengths(), 0);
    }

    #[test]
    fn test_legit_frame() {
        let msg = [0xF2, 0xF2, 0x01, 0x03, 0x01, 0x0a, 0x0f, 0x1e, 0x7E];
        let mut dec = decoder(&msg);
        let frame = dec.next_frame(&CancelToken::new()).unwrap();

        assert_eq!(frame, Frame::new(Address::Desk, 0x01, &[0x01, 0x0a, 0x0f]).unwrap());
        assert_eq!(dec.metrics().checksum_mismatches(), 0);
        assert_eq!(dec.metrics().invalid_lengths(), 0);
    }

    #[test]
    fn test_zero_length_frame() {
        let msg = [0xF2, 0xF2, 0x40, 0x00, 0x40, 0x7E];
        let mut dec = decoder(&msg);
        let frame = dec.next_frame(&CancelToken::new()).unwrap();

        assert_eq!(frame.command(), 0x40);
        assert_eq!(frame.param_length(), 0);
        assert_eq!(frame.params(), 0);
        assert_eq!(frame.raw(), &msg);
    }

    #[test]
    fn test_single_param_byte() {
        let msg = [0xF2, 0xF2, 0x92, 0x01, 0x10, 0xA3, 0x7E];
        let mut dec = decoder(&msg);
        let frame = dec.next_frame(&CancelToken::new()).unwrap();
        assert_eq!(frame.params(), 0x10);
        assert!(frame.checksum_valid());
    }

    #[test]
    fn test_resync_after_noise() {
        let mut bytes = vec![0x00, 0x13, 0x7E, 0xF1, 0x55];
        bytes.extend_from_slice(&[0xF1, 0xF1, 0x29, 0x00, 0x29, 0x7E]);

        let mut dec = decoder(&bytes);
        let frame = dec.next_frame(&CancelToken::new()).unwrap();
        assert_eq!(frame.address(), Address::Handset);
        assert_eq!(frame.command(), 0x29);
        assert_eq!(frame.raw(), &[0xF1, 0xF1, 0x29, 0x00, 0x29, 0x7E]);
    }

    #[test]
    fn test_mismatched_address_pair_resets() {
        // F1 then F2 is not a sync pair; the F2 is discarded with the reset
        let bytes = [0xF1, 0xF2, 0xF2, 0xF2, 0x40, 0x00, 0x40, 0x7E];
        let mut dec = decoder(&bytes);
        let frame = dec.next_frame(&CancelToken::new()).unwrap();
        assert_eq!(frame.address(), Address::Desk);
        assert_eq!(frame.raw().len(), 6);
    }

    #[test]
    fn test_missing_terminator_resets() {
        let mut bytes = vec![0xF2, 0xF2, 0x40, 0x00, 0x40, 0x00];
        bytes.extend_from_slice(&[0xF2, 0xF2, 0x01, 0x03, 0x01, 0x0a, 0x0f, 0x1e, 0x7E]);

        let mut dec = decoder(&bytes);
        let frame = dec.next_frame(&CancelToken::new()).unwrap();
        assert_eq!(frame.command(), 0x01);
    }

    #[test]
    fn test_consecutive_frames() {
        let mut bytes = Frame::new(Address::Desk, 0x01, &[0x04, 0xab, 0x0f])
            .unwrap()
            .encode();
        bytes.extend(Frame::new(Address::Desk, 0x92, &[0x08]).unwrap().encode());

        let mut dec = decoder(&bytes);
        let cancel = CancelToken::new();
        assert_eq!(dec.next_frame(&cancel).unwrap().command(), 0x01);
        assert_eq!(dec.next_frame(&cancel).unwrap().command(), 0x92);
        assert!(matches!(
            dec.next_frame(&cancel),
            Err(DecodeError::EndOfStream)
        ));
    }

    struct FailingSource;

    impl Read for FailingSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "link closed"))
        }
    }

    #[test]
    fn test_read_error() {
        let mut dec = FrameDecoder::new(FailingSource, AtomicDecoderMetrics::new());
        let err = dec.next_frame(&CancelToken::new()).unwrap_err();
        match err {
            DecodeError::Read(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Source that cancels the token partway through a frame
    struct CancellingSource {
        bytes: Vec<u8>,
        cancel_after: usize,
        cancel: CancelToken,
    }

    impl Read for CancellingSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.cancel_after == 0 {
                self.cancel.cancel();
            }
            self.cancel_after = self.cancel_after.saturating_sub(1);
            if self.bytes.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes.remove(0);
            Ok(1)
        }
    }

    #[test]
    fn test_cancelled_mid_frame() {
        let cancel = CancelToken::new();
        let source = CancellingSource {
            bytes: vec![0xF2, 0xF2, 0x01, 0x03, 0x01, 0x0a, 0x0f, 0x1e, 0x7E],
            cancel_after: 3,
            cancel: cancel.clone(),
        };

        let mut dec = FrameDecoder::new(source, AtomicDecoderMetrics::new());
        let err = dec.next_frame(&cancel).unwrap_err();
        assert!(err.is_cancelled());
    }
}
