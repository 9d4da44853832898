//! Splitting raw text into corpus-sized chunks.
//!
//! Used by the ingest command when the input is a flat document rather
//! than a pre-chunked newline-delimited corpus. Bounds are in characters,
//! not bytes, so multi-byte scripts split cleanly.

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_CHARS: usize = 500;
/// Default characters of overlap carried into the next chunk.
pub const DEFAULT_OVERLAP_CHARS: usize = 50;

/// Split `content` into chunks of at most `max_chars` characters,
/// preferring whitespace boundaries, with `overlap_chars` of trailing
/// context repeated at the start of the next chunk.
pub fn chunk_text(content: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    assert!(max_chars > 0, "max_chars must be positive");
    let overlap_chars = overlap_chars.min(max_chars / 2);

    let chars: Vec<char> = content.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());

        // Break at the last whitespace inside the window when the window
        // does not already reach the end of the input.
        let mut split = end;
        if end < chars.len() {
            if let Some(ws) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if ws > 0 {
                    split = start + ws;
                }
            }
        }

        let text: String = chars[start..split].iter().collect();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if split >= chars.len() {
            break;
        }
        // Re-include overlap from the emitted tail, always advancing.
        start = split.saturating_sub(overlap_chars).max(start + 1);
    }

    chunks
}
