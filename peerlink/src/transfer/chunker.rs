//! Pure slicing and reassembly helpers.

/// Splits `payload` into consecutive slices of at most `max_chunk_size` bytes.
///
/// Yields `ceil(len / max_chunk_size)` slices; an empty payload yields none.
///
/// # Panics
///
/// Panics if `max_chunk_size` is zero.
pub fn chunk_payload(payload: &[u8], max_chunk_size: usize) -> impl Iterator<Item = &[u8]> {
    payload.chunks(max_chunk_size)
}

/// Concatenates chunks in the given order.
pub fn reassemble<C: AsRef<[u8]>>(chunks: &[C]) -> Vec<u8> {
    let total = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut payload = Vec::with_capacity(total);
    for chunk in chunks {
        payload.extend_from_slice(chunk.as_ref());
    }
    payload
}
