use super::consts::*;
use super::masking::unmask;
use super::opcode::Opcode;

pub fn encode_length(length: usize) -> Vec<u8> {
    if length <= MAX_SHORT_LENGTH as usize {
        // the first byte is the length
        vec![length as u8]
    } else if length <= 65535 {
        // the first byte is 126, read the next 2 bytes as u16 for a length
        [&[LENGTH_U16][..], &(length as u16).to_be_bytes()].concat()
    } else {
        // the first byte is 127, read the next 8 bytes as u64 for a length
        [&[LENGTH_U64][..], &(length as u64).to_be_bytes()].concat()
    }
}

/// Encode a single final frame, masking the payload when a key is given.
pub fn encode_frame(opcode: Opcode, payload: &[u8], mask_key: Option<[u8; MASK_KEY_SIZE]>) -> Vec<u8> {
    let first_byte: &[u8] = &[opcode.encode() | FIN_MASK];
    let mut length = encode_length(payload.len());
    match mask_key {
        Some(key) => {
            length[0] |= MASKED_MASK;
            [first_byte, &length, &key, &unmask(key, payload)].concat()
        }
        None => [first_byte, &length, payload].concat(),
    }
}

/// Close frame carrying `status` and as much of `reason` as fits in a
/// control frame payload.
pub fn encode_close_frame(status: u16, reason: &str) -> Vec<u8> {
    let max_reason = MAX_SHORT_LENGTH as usize - 2;
    let reason = &reason.as_bytes()[..reason.len().min(max_reason)];
    let payload = [&status.to_be_bytes()[..], reason].concat();
    encode_frame(Opcode::Close, &payload, None)
}
