//! Incremental frame boundary decoder.
//!
//! The decoder never needs a whole frame in one buffer. It is fed whatever
//! the transport produced, advances as far as that slice allows and keeps
//! enough state to pick up again on the next slice. It measures frames, it
//! does not validate them: reserved opcodes, reserved bits and non-minimal
//! length encodings all pass through unchanged.

use std::mem;

use super::consts::*;
use super::frame::{FrameEvent, FrameHeader};
use super::masking::unmask_from;
use super::opcode::Opcode;

/// Unmasked payload bytes kept per frame unless configured otherwise.
pub const DEFAULT_CAPTURE_LIMIT: usize = 4 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingHeaderByte1,
    AwaitingHeaderByte2,
    AwaitingExtendedLength,
    AwaitingMaskKey,
    AwaitingPayload,
}

/// Result of one [`FrameDecoder::consume`] call.
#[derive(Debug, PartialEq, Eq)]
pub struct Progress {
    /// Bytes taken from the front of the slice.
    pub consumed: usize,
    /// Set when this call finished a frame.
    pub frame: Option<FrameEvent>,
}
impl Progress {
    pub fn frame_completed(&self) -> bool {
        self.frame.is_some()
    }
}

/// Running totals for everything one decoder has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderTotals {
    pub frames: u64,
    pub payload_bytes: u64,
    pub raw_bytes: u64,
}

#[derive(Debug)]
pub struct FrameDecoder {
    phase: Phase,
    bytes_needed: usize,
    partial: [u8; 8],
    partial_len: usize,
    pending: FrameHeader,
    current: Option<FrameHeader>,
    payload_bytes_remaining: u64,
    payload_offset: u64,
    captured: Vec<u8>,
    capture_limit: usize,
    totals: DecoderTotals,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_capture_limit(DEFAULT_CAPTURE_LIMIT)
    }

    /// Keep at most `capture_limit` unmasked payload bytes per frame event.
    pub fn with_capture_limit(capture_limit: usize) -> Self {
        FrameDecoder {
            phase: Phase::AwaitingHeaderByte1,
            bytes_needed: 1,
            partial: [0; 8],
            partial_len: 0,
            pending: empty_header(),
            current: None,
            payload_bytes_remaining: 0,
            payload_offset: 0,
            captured: Vec::new(),
            capture_limit,
            totals: DecoderTotals::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Bytes still required before the current phase can complete.
    pub fn bytes_needed(&self) -> u64 {
        match self.phase {
            Phase::AwaitingPayload => self.payload_bytes_remaining,
            _ => (self.bytes_needed - self.partial_len) as u64,
        }
    }

    pub fn payload_bytes_remaining(&self) -> u64 {
        self.payload_bytes_remaining
    }

    /// Opcode of the most recently completed frame header.
    pub fn current_frame_type(&self) -> Option<Opcode> {
        self.current.map(|header| header.opcode)
    }

    /// Payload length of the most recently completed frame header.
    pub fn current_payload_size(&self) -> u64 {
        self.current.map_or(0, |header| header.payload_length)
    }

    pub fn totals(&self) -> DecoderTotals {
        self.totals
    }

    /// Advance over `buf` until it is exhausted or a frame completes.
    ///
    /// Callers loop on the unconsumed tail; see [`FrameDecoder::decode_chunk`].
    pub fn consume(&mut self, buf: &[u8]) -> Progress {
        let mut pos = 0;
        loop {
            match self.phase {
                Phase::AwaitingPayload => {
                    let available = (buf.len() - pos) as u64;
                    let take = available.min(self.payload_bytes_remaining) as usize;
                    self.capture(&buf[pos..pos + take]);
                    pos += take;
                    self.payload_bytes_remaining -= take as u64;
                    let frame = if self.payload_bytes_remaining == 0 {
                        Some(self.finish())
                    } else {
                        None
                    };
                    return Progress {
                        consumed: pos,
                        frame,
                    };
                }
                _ if pos == buf.len() => {
                    return Progress {
                        consumed: pos,
                        frame: None,
                    };
                }
                Phase::AwaitingHeaderByte1 => {
                    let byte = buf[pos];
                    pos += 1;
                    self.pending = empty_header();
                    self.pending.fin = is_fin(byte);
                    self.pending.rsv = reserved_bits(byte);
                    self.pending.opcode = Opcode::decode(byte);
                    self.pending.header_len = 1;
                    self.enter(Phase::AwaitingHeaderByte2, 1);
                }
                Phase::AwaitingHeaderByte2 => {
                    let byte = buf[pos];
                    pos += 1;
                    self.pending.header_len += 1;
                    self.pending.masked = is_mask(byte);
                    match byte & LENGTH_MASK {
                        LENGTH_U16 => self.enter(Phase::AwaitingExtendedLength, 2),
                        LENGTH_U64 => self.enter(Phase::AwaitingExtendedLength, 8),
                        length => {
                            self.pending.payload_length = length as u64;
                            self.after_length();
                        }
                    }
                }
                Phase::AwaitingExtendedLength => {
                    pos += self.accumulate(&buf[pos..]);
                    if self.partial_len == self.bytes_needed {
                        self.pending.payload_length = self.take_length();
                        self.after_length();
                    }
                }
                Phase::AwaitingMaskKey => {
                    pos += self.accumulate(&buf[pos..]);
                    if self.partial_len == self.bytes_needed {
                        let mut key = [0u8; MASK_KEY_SIZE];
                        key.copy_from_slice(&self.partial[..MASK_KEY_SIZE]);
                        self.pending.mask_key = Some(key);
                        self.pending.header_len += MASK_KEY_SIZE as u8;
                        self.enter_payload();
                    }
                }
            }
        }
    }

    /// Feed a whole chunk, returning every frame completed inside it.
    pub fn decode_chunk(&mut self, chunk: &[u8]) -> Vec<FrameEvent> {
        self.totals.raw_bytes += chunk.len() as u64;
        let mut frames = Vec::new();
        let mut rest = chunk;
        while !rest.is_empty() {
            let progress = self.consume(rest);
            if progress.consumed == 0 && progress.frame.is_none() {
                break;
            }
            rest = &rest[progress.consumed..];
            frames.extend(progress.frame);
        }
        frames
    }

    fn enter(&mut self, phase: Phase, bytes_needed: usize) {
        self.phase = phase;
        self.bytes_needed = bytes_needed;
        self.partial_len = 0;
    }

    fn after_length(&mut self) {
        if self.pending.masked {
            self.enter(Phase::AwaitingMaskKey, MASK_KEY_SIZE);
        } else {
            self.enter_payload();
        }
    }

    fn enter_payload(&mut self) {
        self.enter(Phase::AwaitingPayload, 0);
        self.payload_bytes_remaining = self.pending.payload_length;
        self.payload_offset = 0;
        self.current = Some(self.pending);
    }

    fn accumulate(&mut self, buf: &[u8]) -> usize {
        let take = (self.bytes_needed - self.partial_len).min(buf.len());
        self.partial[self.partial_len..self.partial_len + take].copy_from_slice(&buf[..take]);
        self.partial_len += take;
        take
    }

    fn take_length(&mut self) -> u64 {
        self.pending.header_len += self.bytes_needed as u8;
        self.partial[..self.bytes_needed]
            .iter()
            .fold(0u64, |length, byte| (length << 8) | *byte as u64)
    }

    fn capture(&mut self, bytes: &[u8]) {
        let room = self.capture_limit.saturating_sub(self.captured.len());
        let kept = &bytes[..bytes.len().min(room)];
        if !kept.is_empty() {
            match self.pending.mask_key {
                Some(key) => self
                    .captured
                    .extend(unmask_from(key, self.payload_offset, kept)),
                None => self.captured.extend_from_slice(kept),
            }
        }
        self.payload_offset += bytes.len() as u64;
    }

    fn finish(&mut self) -> FrameEvent {
        let header = self.pending;
        self.totals.frames += 1;
        self.totals.payload_bytes += header.payload_length;
        self.enter(Phase::AwaitingHeaderByte1, 1);
        FrameEvent {
            header,
            frame_size: header.header_len as u64 + header.payload_length,
            payload: mem::take(&mut self.captured),
        }
    }
}

fn empty_header() -> FrameHeader {
    FrameHeader {
        fin: false,
        rsv: 0,
        opcode: Opcode::Continuation,
        masked: false,
        payload_length: 0,
        mask_key: None,
        header_len: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::encoding::{encode_frame, encode_length};
    use proptest::prelude::*;

    fn decode_bytewise(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<FrameEvent> {
        bytes
            .chunks(1)
            .flat_map(|chunk| decoder.decode_chunk(chunk))
            .collect()
    }

    #[test]
    fn single_text_frame_in_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let progress = decoder.consume(&[0x81, 0x02, b'h', b'i']);
        assert_eq!(progress.consumed, 4);
        let frame = progress.frame.unwrap();
        assert_eq!(frame.opcode(), Opcode::Text);
        assert!(frame.header.fin);
        assert_eq!(frame.payload_length(), 2);
        assert_eq!(frame.frame_size, 4);
        assert_eq!(frame.payload, b"hi");
        assert_eq!(decoder.phase(), Phase::AwaitingHeaderByte1);
    }

    #[test]
    fn header_and_payload_in_separate_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode_chunk(&[0x81, 0x02]).is_empty());
        assert_eq!(decoder.phase(), Phase::AwaitingPayload);
        assert_eq!(decoder.current_frame_type(), Some(Opcode::Text));
        assert_eq!(decoder.current_payload_size(), 2);
        let frames = decoder.decode_chunk(b"hi");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"hi");
        assert_eq!(frames[0].frame_size, 4);
    }

    #[test]
    fn empty_slice_is_a_no_op() {
        let mut decoder = FrameDecoder::new();
        let progress = decoder.consume(&[]);
        assert_eq!(progress.consumed, 0);
        assert!(!progress.frame_completed());
        assert_eq!(decoder.phase(), Phase::AwaitingHeaderByte1);
    }

    #[test]
    fn zero_length_frame_completes_without_payload_bytes() {
        let mut decoder = FrameDecoder::new();
        let progress = decoder.consume(&[0x89, 0x00]);
        assert_eq!(progress.consumed, 2);
        let frame = progress.frame.unwrap();
        assert_eq!(frame.opcode(), Opcode::Ping);
        assert_eq!(frame.payload_length(), 0);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn consume_stops_at_frame_boundary() {
        let mut decoder = FrameDecoder::new();
        let bytes = [0x81, 0x01, b'a', 0x82, 0x01, 0x07];
        let first = decoder.consume(&bytes);
        assert_eq!(first.consumed, 3);
        assert!(first.frame_completed());
        let second = decoder.consume(&bytes[3..]);
        assert_eq!(second.consumed, 3);
        assert_eq!(second.frame.unwrap().opcode(), Opcode::Binary);
    }

    #[test]
    fn length_boundaries() {
        for length in [0usize, 125, 126, 127, 65535, 65536] {
            let payload = vec![0x5a; length];
            let bytes = encode_frame(Opcode::Binary, &payload, None);
            let expected_header = 1 + encode_length(length).len();
            let mut decoder = FrameDecoder::with_capture_limit(usize::MAX);
            let frames = decoder.decode_chunk(&bytes);
            assert_eq!(frames.len(), 1, "length {}", length);
            assert_eq!(frames[0].payload_length(), length as u64);
            assert_eq!(frames[0].header.header_len as usize, expected_header);
            assert_eq!(frames[0].payload, payload);
        }
    }

    #[test]
    fn escape_markers_pick_extension_width() {
        let mut decoder = FrameDecoder::new();
        decoder.consume(&[0x82, 126]);
        assert_eq!(decoder.phase(), Phase::AwaitingExtendedLength);
        assert_eq!(decoder.bytes_needed(), 2);

        let mut decoder = FrameDecoder::new();
        decoder.consume(&[0x82, 127, 0, 0]);
        assert_eq!(decoder.phase(), Phase::AwaitingExtendedLength);
        assert_eq!(decoder.bytes_needed(), 6);

        let mut decoder = FrameDecoder::new();
        decoder.consume(&[0x82, 125]);
        assert_eq!(decoder.phase(), Phase::AwaitingPayload);
        assert_eq!(decoder.bytes_needed(), 125);
    }

    #[test]
    fn non_minimal_length_is_measured_as_sent() {
        let mut bytes = vec![0x81, 126, 0, 3];
        bytes.extend_from_slice(b"abc");
        let frames = FrameDecoder::new().decode_chunk(&bytes);
        assert_eq!(frames[0].payload_length(), 3);
        assert_eq!(frames[0].frame_size, 7);
    }

    #[test]
    fn masked_payload_is_unmasked_across_chunks() {
        let key = [0x37, 0xfa, 0x21, 0x3d];
        let bytes = encode_frame(Opcode::Text, b"Hello, world", Some(key));
        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.decode_chunk(&bytes[..4]);
        frames.extend(decoder.decode_chunk(&bytes[4..9]));
        frames.extend(decoder.decode_chunk(&bytes[9..]));
        assert_eq!(frames.len(), 1);
        assert!(frames[0].header.masked);
        assert_eq!(frames[0].header.mask_key, Some(key));
        assert_eq!(frames[0].payload, b"Hello, world");
        assert_eq!(frames[0].frame_size, bytes.len() as u64);
    }

    #[test]
    fn mask_bit_honoured_in_either_direction() {
        let bytes = encode_frame(Opcode::Binary, &[1, 2, 3], Some([0xff; 4]));
        let frames = FrameDecoder::new().decode_chunk(&bytes);
        assert_eq!(frames[0].payload, vec![1, 2, 3]);
    }

    #[test]
    fn reserved_opcode_passes_through() {
        let frames = FrameDecoder::new().decode_chunk(&[0xf3, 0x01, 0x00]);
        assert_eq!(frames[0].opcode(), Opcode::ReservedNonControl3);
        assert_eq!(frames[0].header.rsv, 0b111);
    }

    #[test]
    fn capture_limit_truncates_payload_only() {
        let bytes = encode_frame(Opcode::Text, &[b'x'; 300], None);
        let mut decoder = FrameDecoder::with_capture_limit(16);
        let frames = decoder.decode_chunk(&bytes);
        assert_eq!(frames[0].payload.len(), 16);
        assert_eq!(frames[0].payload_length(), 300);
        assert!(frames[0].is_truncated());
    }

    #[test]
    fn totals_follow_frames() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = Vec::new();
        for size in [0usize, 10, 200] {
            bytes.extend(encode_frame(Opcode::Binary, &vec![0; size], None));
        }
        let frames = decoder.decode_chunk(&bytes);
        assert_eq!(frames.len(), 3);
        let totals = decoder.totals();
        assert_eq!(totals.frames, 3);
        assert_eq!(totals.payload_bytes, 210);
        assert_eq!(totals.raw_bytes, bytes.len() as u64);
        assert!(totals.raw_bytes >= totals.payload_bytes);
    }

    #[test]
    fn payload_remaining_counts_down() {
        let bytes = encode_frame(Opcode::Binary, &[0; 10], None);
        let mut decoder = FrameDecoder::new();
        decoder.decode_chunk(&bytes[..5]);
        assert_eq!(decoder.payload_bytes_remaining(), 7);
        decoder.decode_chunk(&bytes[5..9]);
        assert_eq!(decoder.payload_bytes_remaining(), 3);
        assert_eq!(decoder.decode_chunk(&bytes[9..]).len(), 1);
        assert_eq!(decoder.payload_bytes_remaining(), 0);
    }

    fn arb_frame() -> impl Strategy<Value = Vec<u8>> {
        (
            0u8..16,
            proptest::collection::vec(any::<u8>(), 0..300),
            proptest::option::of(any::<[u8; 4]>()),
        )
            .prop_map(|(opcode, payload, key)| encode_frame(Opcode::decode(opcode), &payload, key))
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_frames(
            frames in proptest::collection::vec(arb_frame(), 1..8),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let stream = frames.concat();

            let whole = FrameDecoder::new().decode_chunk(&stream);
            prop_assert_eq!(whole.len(), frames.len());

            let bytewise = decode_bytewise(&mut FrameDecoder::new(), &stream);
            prop_assert_eq!(&bytewise, &whole);

            let mut offsets: Vec<usize> = cuts.iter().map(|cut| cut.index(stream.len() + 1)).collect();
            offsets.push(0);
            offsets.push(stream.len());
            offsets.sort_unstable();
            let mut decoder = FrameDecoder::new();
            let mut split = Vec::new();
            for pair in offsets.windows(2) {
                split.extend(decoder.decode_chunk(&stream[pair[0]..pair[1]]));
            }
            prop_assert_eq!(&split, &whole);
        }
    }
}
