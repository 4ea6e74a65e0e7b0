//! Recursive character text splitter.
//!
//! Text is cut on the coarsest separator that yields pieces under the size
//! limit (paragraphs, then lines, then words, then characters). Neighbouring
//! pieces are then packed into chunks of at most `chunk_size` characters,
//! carrying up to `chunk_overlap` characters of trailing context into the
//! next chunk.

use std::collections::VecDeque;

use tracing::warn;

use brandguard_shared::{BrandGuardError, Result};

/// Separators tried in order, coarsest first. The empty separator splits
/// into single characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Chunk sizing, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkOptions {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(BrandGuardError::validation("chunk_size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(BrandGuardError::validation(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

/// Split `text` into overlapping chunks. Whitespace-only chunks are dropped.
pub fn split_text(text: &str, opts: &ChunkOptions) -> Vec<String> {
    split_recursive(text, &SEPARATORS, opts)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_recursive(text: &str, separators: &[&str], opts: &ChunkOptions) -> Vec<String> {
    // Pick the first separator present in the text; "" always matches.
    let position = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let finer = &separators[(position + 1).min(separators.len())..];

    let pieces: Vec<String> = if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    };

    let mut chunks = Vec::new();
    let mut pending: Vec<String> = Vec::new();

    for piece in pieces {
        if char_len(&piece) < opts.chunk_size {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            chunks.extend(merge_pieces(&pending, separator, opts));
            pending.clear();
        }

        if finer.is_empty() {
            chunks.push(piece);
        } else {
            chunks.extend(split_recursive(&piece, finer, opts));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_pieces(&pending, separator, opts));
    }

    chunks
}

/// Pack small pieces into chunks, keeping an overlapping tail window.
fn merge_pieces(pieces: &[String], separator: &str, opts: &ChunkOptions) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        let joiner = if window.is_empty() { 0 } else { sep_len };

        if total + len + joiner > opts.chunk_size {
            if total > opts.chunk_size {
                warn!(
                    size = total,
                    limit = opts.chunk_size,
                    "created a chunk larger than the configured size"
                );
            }

            if !window.is_empty() {
                push_chunk(&mut chunks, &window, separator);

                // Shrink the window until it fits the overlap budget and
                // leaves room for the incoming piece.
                while total > opts.chunk_overlap
                    || (total > 0
                        && total + len + if window.is_empty() { 0 } else { sep_len }
                            > opts.chunk_size)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
                }
            }
        }

        let joiner = if window.is_empty() { 0 } else { sep_len };
        window.push_back(piece);
        total += len + joiner;
    }

    push_chunk(&mut chunks, &window, separator);
    chunks
}

fn push_chunk(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
