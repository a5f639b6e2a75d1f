//! Integration tests for the desk protocol decoder
//!
//! These tests verify end-to-end behavior across modules:
//! - Decoding arbitrary well-formed frames regardless of checksum
//! - Resynchronizing after noise
//! - Sharing one metrics sink between several decoders
//! - Streaming a capture through the driver

use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use desk_protocol::{
    read_frames, Address, AtomicDecoderMetrics, CancelToken, Command, DecodeError, Frame,
    FrameDecoder,
};
use proptest::prelude::*;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Wire bytes for a frame with an explicit checksum byte
    pub fn wire(address: u8, command: u8, params: &[u8], checksum: u8) -> Vec<u8> {
        let mut bytes = vec![address, address, command, params.len() as u8];
        bytes.extend_from_slice(params);
        bytes.extend_from_slice(&[checksum, 0x7E]);
        bytes
    }

    /// Decode every frame in `bytes`, returning them with the terminal error
    pub fn decode_all(
        bytes: Vec<u8>,
        metrics: &AtomicDecoderMetrics,
    ) -> (Vec<Frame>, DecodeError) {
        let mut decoder = FrameDecoder::new(Cursor::new(bytes), metrics);
        let mut frames = Vec::new();
        let err = read_frames(&mut decoder, &CancelToken::new(), &mut |frame: Frame| {
            frames.push(frame)
        });
        (frames, err)
    }
}

// ============================================================================
// Streaming
// ============================================================================

#[test]
fn test_capture_with_noise_and_bad_frames() {
    let metrics = AtomicDecoderMetrics::new();

    let mut capture = vec![0x13, 0x37];
    // Height, valid checksum
    capture.extend(helpers::wire(0xF2, 0x01, &[0x04, 0xab, 0x0f], 0xC2));
    // Length byte out of range
    capture.extend_from_slice(&[0xF2, 0xF2, 0x01, 0x07]);
    // Height, wrong checksum
    capture.extend(helpers::wire(0xF2, 0x01, &[0x01, 0x23, 0x0f], 0x00));
    // Preset 2
    capture.extend(helpers::wire(0xF2, 0x92, &[0x08], 0x9B));
    // Truncated frame at the end
    capture.extend_from_slice(&[0xF1, 0xF1, 0x03]);

    let (frames, err) = helpers::decode_all(capture, &metrics);

    assert!(matches!(err, DecodeError::EndOfStream));
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].height_mm(), 1195);
    assert_eq!(frames[1].height_mm(), 739);
    assert!(!frames[1].checksum_valid());
    assert_eq!(frames[2].kind(), Command::Preset);
    assert_eq!(frames[2].preset(), 2);

    assert_eq!(metrics.checksum_mismatches(), 1);
    assert_eq!(metrics.invalid_lengths(), 1);
}

#[test]
fn test_shared_metrics_across_threads() {
    let metrics = Arc::new(AtomicDecoderMetrics::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let metrics = Arc::clone(&metrics);
            thread::spawn(move || {
                let mut bytes = Vec::new();
                for _ in 0..50 {
                    bytes.extend(helpers::wire(0xF2, 0x01, &[0x02, 0x78, 0x0f], 0x00));
                }
                let mut decoder = FrameDecoder::new(Cursor::new(bytes), metrics);
                let mut count = 0;
                read_frames(&mut decoder, &CancelToken::new(), &mut |_frame: Frame| {
                    count += 1
                });
                count
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 200);
    assert_eq!(metrics.checksum_mismatches(), 200);
    assert_eq!(metrics.invalid_lengths(), 0);
}

#[test]
fn test_handset_frames_decode() {
    let metrics = AtomicDecoderMetrics::new();
    let mut capture = Frame::new(Address::Handset, 0x0E, &[0x01]).unwrap().encode();
    capture.extend(Frame::new(Address::Handset, 0x91, &[]).unwrap().encode());

    let (frames, _) = helpers::decode_all(capture, &metrics);
    let kinds: Vec<_> = frames.iter().map(Frame::kind).collect();
    assert_eq!(kinds, vec![Command::SetUnits, Command::Calibrate]);
    assert_eq!(metrics.checksum_mismatches(), 0);
}

// ============================================================================
// Property Tests
// ============================================================================

mod proptests {
    use super::*;

    fn address() -> impl Strategy<Value = u8> {
        prop_oneof![Just(0xF1u8), Just(0xF2u8)]
    }

    fn params() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..=3)
    }

    /// Noise that can never start a frame
    fn noise() -> impl Strategy<Value = Vec<u8>> {
        let byte = any::<u8>().prop_filter("not an address", |b| *b != 0xF1 && *b != 0xF2);
        prop::collection::vec(byte, 0..32)
    }

    proptest! {
        #[test]
        fn well_formed_frames_decode_exactly(
            addr in address(),
            command in any::<u8>(),
            params in params(),
            checksum in any::<u8>(),
        ) {
            let bytes = helpers::wire(addr, command, &params, checksum);
            let metrics = AtomicDecoderMetrics::new();
            let mut decoder = FrameDecoder::new(Cursor::new(bytes.clone()), &metrics);

            let frame = decoder.next_frame(&CancelToken::new()).unwrap();

            let expected_params = params.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
            prop_assert_eq!(frame.raw(), &bytes[..]);
            prop_assert_eq!(frame.raw().len(), 6 + params.len());
            prop_assert_eq!(frame.address().as_byte(), addr);
            prop_assert_eq!(frame.command(), command);
            prop_assert_eq!(usize::from(frame.param_length()), params.len());
            prop_assert_eq!(frame.params(), expected_params);
            prop_assert_eq!(frame.checksum(), checksum);

            let mismatches = if frame.checksum_valid() { 0 } else { 1 };
            prop_assert_eq!(metrics.checksum_mismatches(), mismatches);
            prop_assert_eq!(metrics.invalid_lengths(), 0);
        }

        #[test]
        fn noise_before_frame_is_skipped(
            prefix in noise(),
            addr in address(),
            command in any::<u8>(),
            params in params(),
        ) {
            let address = Address::from_byte(addr).unwrap();
            let expected = Frame::new(address, command, &params).unwrap();

            let mut bytes = prefix;
            bytes.extend(expected.encode());

            let metrics = AtomicDecoderMetrics::new();
            let mut decoder = FrameDecoder::new(Cursor::new(bytes), &metrics);
            let frame = decoder.next_frame(&CancelToken::new()).unwrap();

            prop_assert_eq!(frame, expected);
            prop_assert_eq!(metrics.checksum_mismatches(), 0);
        }

        #[test]
        fn truncated_frames_never_decode(
            addr in address(),
            command in any::<u8>(),
            params in params(),
            cut in 0usize..6,
        ) {
            let address = Address::from_byte(addr).unwrap();
            let mut bytes = Frame::new(address, command, &params).unwrap().encode();
            bytes.truncate(cut.min(bytes.len() - 1));

            let mut decoder = FrameDecoder::new(Cursor::new(bytes), AtomicDecoderMetrics::new());
            let result = decoder.next_frame(&CancelToken::new());
            prop_assert!(matches!(result, Err(DecodeError::EndOfStream)));
        }
    }
}
