/// Log segmentation: split a protocol log into per-size blocks.
///
/// Blocks are introduced by `=== Run with size=<n> ===` headers. Anything
/// before the first header is preamble and is dropped.
use regex::Regex;
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=== Run with size=(\d+) ===").unwrap());

/// The slice of a log belonging to one data size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBlock<'a> {
    pub size: u64,
    /// Text between this header and the next one (or end of input).
    pub text: &'a str,
}

/// Split `text` into size blocks, in document order.
///
/// A header whose size does not fit in a `u64` is skipped along with its
/// block; the text is never attributed to another size.
pub fn segment(text: &str) -> Vec<SizeBlock<'_>> {
    let headers: Vec<(usize, usize, &str)> = HEADER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let size = caps.get(1)?;
            Some((whole.start(), whole.end(), size.as_str()))
        })
        .collect();

    let mut blocks = Vec::with_capacity(headers.len());
    for (i, &(_, body_start, raw_size)) in headers.iter().enumerate() {
        let body_end = headers.get(i + 1).map_or(text.len(), |next| next.0);
        match raw_size.parse::<u64>() {
            Ok(size) => blocks.push(SizeBlock {
                size,
                text: &text[body_start..body_end],
            }),
            Err(e) => {
                tracing::warn!(size = raw_size, error = %e, "skipping block with unparseable size");
            }
        }
    }
    blocks
}
