//! Size-bounded text chunking with code fence awareness
//!
//! Splits normalized text into overlapping chunks for embedding while:
//! - Keeping fenced code blocks intact whenever they fit
//! - Breaking prose on sentence and line boundaries
//! - Carrying word overlap across chunk boundaries for retrieval context
//! - Recording absolute source positions and stable chunk indices

mod splitter;

pub use splitter::*;

use crate::config::ChunkConfig;
use crate::error::{Error, Result};

/// A chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text, trimmed, with any overlap words prepended
    pub content: String,

    /// Chunk index (0-based, sequential across the whole document)
    pub index: usize,

    /// Byte offset in the original text where this chunk's own blocks start
    pub start_position: usize,

    /// Byte offset in the original text just past this chunk's own blocks
    pub end_position: usize,

    /// Whether this chunk came from a fenced code block
    pub is_code_block: bool,
}

/// Options controlling chunking behavior
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Maximum characters per chunk
    pub max_chunk_size: usize,

    /// Buffers below this keep accumulating instead of flushing
    pub min_chunk_size: usize,

    /// Overlap character budget; `overlap / 10` words are carried over
    pub overlap: usize,

    /// Word-count overlap, preferred over the character budget when set
    pub overlap_words: Option<usize>,

    /// Keep fenced code blocks intact as single chunks
    pub respect_code_blocks: bool,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            min_chunk_size: 100,
            overlap: 100,
            overlap_words: None,
            respect_code_blocks: true,
        }
    }
}

impl From<&ChunkConfig> for ChunkOptions {
    fn from(config: &ChunkConfig) -> Self {
        Self {
            max_chunk_size: config.max_chunk_size,
            min_chunk_size: config.min_chunk_size,
            overlap: config.overlap,
            overlap_words: config.overlap_words,
            respect_code_blocks: config.respect_code_blocks,
        }
    }
}

impl ChunkOptions {
    /// Upper bound for a code block kept intact as a single chunk
    pub fn intact_code_limit(&self) -> usize {
        self.max_chunk_size + self.max_chunk_size / 2
    }

    /// Number of trailing words carried into the next chunk
    fn overlap_word_count(&self) -> usize {
        self.overlap_words.unwrap_or(self.overlap / 10)
    }

    /// Validate option consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 || self.min_chunk_size == 0 || self.overlap == 0 {
            return Err(Error::Config(
                "chunk sizes and overlap must be positive".to_string(),
            ));
        }

        if let Some(words) = self.overlap_words {
            if words == 0 {
                return Err(Error::Config(
                    "overlap_words must be positive when set".to_string(),
                ));
            }
        }

        if self.max_chunk_size <= self.min_chunk_size {
            return Err(Error::Config(format!(
                "max_chunk_size ({}) must be greater than min_chunk_size ({})",
                self.max_chunk_size, self.min_chunk_size
            )));
        }

        if self.overlap >= self.max_chunk_size {
            return Err(Error::Config(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                self.overlap, self.max_chunk_size
            )));
        }

        Ok(())
    }
}

/// Split text into ordered, size-bounded chunks.
///
/// Deterministic for identical input and options. Code segments that fit
/// within 1.5x the chunk budget are emitted intact; everything else goes
/// through the sentence/line splitter. Chunk indices run sequentially across
/// all segments.
pub fn chunk(text: &str, options: &ChunkOptions) -> Result<Vec<Chunk>> {
    options.validate()?;

    if text.trim().is_empty() {
        return Err(Error::Input(
            "cannot chunk empty or whitespace-only text".to_string(),
        ));
    }

    let segments = if options.respect_code_blocks {
        split_code_segments(text)
    } else {
        vec![Segment {
            kind: SegmentKind::Prose,
            text,
            offset: 0,
        }]
    };

    let mut chunks = Vec::new();

    for segment in segments {
        if segment.text.trim().is_empty() {
            continue;
        }

        if segment.kind == SegmentKind::Code && segment.text.len() <= options.intact_code_limit() {
            let index = chunks.len();
            chunks.push(Chunk {
                content: segment.text.to_string(),
                index,
                start_position: segment.offset,
                end_position: segment.offset + segment.text.len(),
                is_code_block: true,
            });
            continue;
        }

        chunk_segment(&segment, options, &mut chunks);
    }

    Ok(chunks)
}

/// Accumulate a segment's blocks into size-bounded chunks.
///
/// A buffer is flushed when the next block would push it past the maximum and
/// it already meets the minimum; the next buffer starts with the trailing
/// overlap words of the flushed content. The trailing buffer always flushes,
/// even below the minimum.
fn chunk_segment(segment: &Segment<'_>, options: &ChunkOptions, chunks: &mut Vec<Chunk>) {
    let is_code = segment.kind == SegmentKind::Code;
    let overlap_words = options.overlap_word_count();

    // Segment-relative span of the pending buffer, None when empty
    let mut span: Option<(usize, usize)> = None;
    let mut seed = String::new();

    for block in split_blocks(segment.text) {
        span = Some(match span {
            None => (block.start, block.end),
            Some((start, end)) => {
                let pending = buffered_len(&seed, &segment.text[start..end]);
                if pending + block.text.len() > options.max_chunk_size
                    && pending >= options.min_chunk_size
                {
                    let flushed = emit_chunk(segment, start, end, &seed, is_code, chunks);
                    seed = trailing_words(&flushed, overlap_words);
                    (block.start, block.end)
                } else {
                    (start, block.end)
                }
            }
        });
    }

    if let Some((start, end)) = span {
        emit_chunk(segment, start, end, &seed, is_code, chunks);
    }
}

/// Length the buffer would flush at, accounting for the seed join
fn buffered_len(seed: &str, slice: &str) -> usize {
    if seed.is_empty() {
        slice.len()
    } else {
        seed.len() + 1 + slice.trim_start().len()
    }
}

/// Push a chunk for the span, returning the emitted content for overlap
/// seeding. Whitespace-only spans with no seed produce nothing.
fn emit_chunk(
    segment: &Segment<'_>,
    start: usize,
    end: usize,
    seed: &str,
    is_code: bool,
    chunks: &mut Vec<Chunk>,
) -> String {
    let slice = &segment.text[start..end];
    let content = if seed.is_empty() {
        slice.trim().to_string()
    } else {
        format!("{} {}", seed, slice.trim_start())
            .trim_end()
            .to_string()
    };

    if content.is_empty() {
        return content;
    }

    let index = chunks.len();
    chunks.push(Chunk {
        content: content.clone(),
        index,
        start_position: segment.offset + start,
        end_position: segment.offset + end,
        is_code_block: is_code,
    });

    content
}

/// Last `count` whitespace-delimited words of the text, space-joined
fn trailing_words(text: &str, count: usize) -> String {
    if count == 0 {
        return String::new();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let keep = words.len().saturating_sub(count);
    words[keep..].join(" ")
}
