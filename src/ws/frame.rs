use super::consts::*;
use super::opcode::Opcode;

/// Header fields of one frame, as read from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub rsv: u8,
    pub opcode: Opcode,
    pub masked: bool,
    pub payload_length: u64,
    pub mask_key: Option<[u8; MASK_KEY_SIZE]>,
    /// Bytes the header occupied on the wire, 2 to 14.
    pub header_len: u8,
}

/// Direction of a byte stream relative to the proxied client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// client -> upstream
    Inbound,
    /// upstream -> client
    Outbound,
}
impl Direction {
    /// Label used by `$ws_packet_source`.
    pub fn source(&self) -> &'static str {
        match self {
            Direction::Inbound => "client",
            Direction::Outbound => "upstream",
        }
    }
}

/// One completed frame, observed by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub header: FrameHeader,
    /// Header plus payload length, in bytes.
    pub frame_size: u64,
    /// Unmasked payload, at most the decoder's capture limit.
    pub payload: Vec<u8>,
}
impl FrameEvent {
    pub fn opcode(&self) -> Opcode {
        self.header.opcode
    }
    pub fn payload_length(&self) -> u64 {
        self.header.payload_length
    }
    pub fn is_truncated(&self) -> bool {
        (self.payload.len() as u64) < self.header.payload_length
    }
}
