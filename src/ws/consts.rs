pub const FIN_MASK: u8 = 0b1000_0000;
pub const RSV_MASK: u8 = 0b0111_0000;
pub const OPCODE_MASK: u8 = 0b0000_1111;
pub const LENGTH_MASK: u8 = 0b0111_1111;
pub const MASKED_MASK: u8 = 0b1000_0000;

/// 7-bit length values above this are escape markers, not lengths.
pub const MAX_SHORT_LENGTH: u8 = 125;
pub const LENGTH_U16: u8 = 126;
pub const LENGTH_U64: u8 = 127;

pub const MASK_KEY_SIZE: usize = 4;

/// Close status sent when the connection limit is reached.
pub const CLOSE_TRY_AGAIN_LATER: u16 = 1013;
/// Close status sent when a connection outlives `max_age`.
pub const CLOSE_CONNECTION_AGED: u16 = 4001;

pub const fn is_fin(byte: u8) -> bool {
    (byte & FIN_MASK) == FIN_MASK
}
pub const fn is_mask(byte: u8) -> bool {
    (byte & MASKED_MASK) == MASKED_MASK
}
pub const fn reserved_bits(byte: u8) -> u8 {
    (byte & RSV_MASK) >> 4
}
