//! Segment and block scanning for the chunker
//!
//! Splits source text into alternating prose/code segments on fenced code
//! block boundaries, and segments into sentence/line blocks. Both passes are
//! lossless: the produced pieces tile their input exactly.

use regex::Regex;
use std::sync::OnceLock;

/// Kind of a source segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Prose,
    Code,
}

/// A contiguous span of the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,

    /// Segment text, borrowed from the source
    pub text: &'a str,

    /// Byte offset of the segment start in the source
    pub offset: usize,
}

/// A boundary-delimited piece of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    pub text: &'a str,

    /// Byte offset of the block start, relative to the segment
    pub start: usize,

    /// Byte offset just past the block end, relative to the segment
    pub end: usize,
}

/// Matches a fenced code block: a pair of triple backticks and everything
/// between them, non-greedy, spanning newlines.
fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```.*?```").unwrap())
}

/// Partition text into prose and code segments in document order.
///
/// Unpaired fence markers are left inside prose segments. Concatenating the
/// segment texts reconstructs the input.
pub fn split_code_segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for m in fence_regex().find_iter(text) {
        if m.start() > cursor {
            segments.push(Segment {
                kind: SegmentKind::Prose,
                text: &text[cursor..m.start()],
                offset: cursor,
            });
        }
        segments.push(Segment {
            kind: SegmentKind::Code,
            text: m.as_str(),
            offset: m.start(),
        });
        cursor = m.end();
    }

    if cursor < text.len() {
        segments.push(Segment {
            kind: SegmentKind::Prose,
            text: &text[cursor..],
            offset: cursor,
        });
    }

    segments
}

/// Split a segment into blocks ending after `.`, `?`, `!`, or newline.
///
/// The boundary character stays with its block; any trailing text without a
/// boundary becomes the final block. Blocks tile the segment.
pub fn split_blocks(segment: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut start = 0;

    for (i, c) in segment.char_indices() {
        if matches!(c, '.' | '?' | '!' | '\n') {
            let end = i + c.len_utf8();
            blocks.push(Block {
                text: &segment[start..end],
                start,
                end,
            });
            start = end;
        }
    }

    if start < segment.len() {
        blocks.push(Block {
            text: &segment[start..],
            start,
            end: segment.len(),
        });
    }

    blocks
}
