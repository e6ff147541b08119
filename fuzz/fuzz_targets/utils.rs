#![allow(dead_code)]

/// Inputs are capped so pathological mapping files and class files stay fast.
pub const MAX_INPUT_SIZE: usize = 256 * 1024;

/// `data` capped to [`MAX_INPUT_SIZE`] as UTF-8, trimming up to three bytes when the cap splits
/// a code point.
pub fn truncate_utf8(data: &[u8]) -> Option<&str> {
    let cap = data.len().min(MAX_INPUT_SIZE);
    (0..=3.min(cap)).find_map(|trim| std::str::from_utf8(&data[..cap - trim]).ok())
}
