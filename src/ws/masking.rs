use super::consts::MASK_KEY_SIZE;

/// XOR `payload` with `mask_key` into a new buffer.
pub fn unmask(mask_key: [u8; MASK_KEY_SIZE], payload: &[u8]) -> Vec<u8> {
    unmask_from(mask_key, 0, payload)
}

/// Same as [`unmask`], for a slice that starts `offset` bytes into the payload.
///
/// Frames reach the decoder in arbitrary chunks, so the key index of the
/// first byte in a chunk depends on how much of the payload came before it.
pub fn unmask_from(mask_key: [u8; MASK_KEY_SIZE], offset: u64, payload: &[u8]) -> Vec<u8> {
    let shift = (offset % MASK_KEY_SIZE as u64) as usize;
    payload
        .iter()
        .enumerate()
        .map(|(i, byte)| byte ^ mask_key[(i + shift) % MASK_KEY_SIZE])
        .collect()
}
