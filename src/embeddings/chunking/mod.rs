
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::crawler::domain::PageUrl;
use crate::crawler::extractor::Section;
use crate::{RagError, Result};

/// Split boundaries in preference order: paragraphs, lines, sentences, words, characters
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Configuration for content chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Upper bound on tokens per chunk
    pub chunk_size: usize,
    /// Tokens shared between consecutive chunks of the same section
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
        }
    }
}

/// Count tokens with a deterministic subword approximation.
///
/// Each run of alphanumeric characters counts as one token per four
/// characters (rounded up), every other non-whitespace character is a token of
/// its own, and whitespace is free. The count never grows when two strings are
/// concatenated, which keeps merged chunks within the size bound.
#[inline]
pub fn count_tokens(text: &str) -> usize {
    let mut tokens: usize = 0;
    let mut run: usize = 0;

    for c in text.chars() {
        if c.is_alphanumeric() {
            run += 1;
            continue;
        }
        tokens += run.div_ceil(4);
        run = 0;
        if !c.is_whitespace() {
            tokens += 1;
        }
    }

    tokens + run.div_ceil(4)
}

/// Byte range of a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    span: Span,
    tokens: usize,
}

/// Recursive-boundary text splitter.
///
/// Text is cut at the first separator that occurs in it, the separator staying
/// at the start of the following piece. Pieces still over the size bound are
/// cut again with the remaining separators; small pieces are merged back up to
/// `chunk_size` tokens, carrying up to `chunk_overlap` tokens into the next chunk.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be at least 1".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    #[inline]
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    #[inline]
    pub fn with_separators(mut self, separators: &[&str]) -> Self {
        self.separators = separators.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into whitespace-trimmed chunks, as byte spans into `text`
    #[inline]
    pub fn split_spans(&self, text: &str) -> Vec<Span> {
        let whole = Span {
            start: 0,
            end: text.len(),
        };
        self.split_recursive(text, whole, &self.separators)
    }

    /// Split `text` into chunk strings
    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_spans(text)
            .into_iter()
            .map(|span| text[span.start..span.end].to_string())
            .collect()
    }

    fn split_recursive(&self, text: &str, range: Span, separators: &[String]) -> Vec<Span> {
        let segment = &text[range.start..range.end];

        let mut separator = separators.last().map_or("", String::as_str);
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if segment.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<Piece> = Vec::new();

        for span in split_keeping_separator(text, range, separator) {
            let tokens = count_tokens(&text[span.start..span.end]);
            if tokens < self.chunk_size {
                fitting.push(Piece { span, tokens });
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(text, &fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.extend(trimmed(text, span));
            } else {
                chunks.extend(self.split_recursive(text, span, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(text, &fitting));
        }

        chunks
    }

    /// Merge adjacent pieces into chunks of at most `chunk_size` tokens
    fn merge(&self, text: &str, pieces: &[Piece]) -> Vec<Span> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let bounds = window.front().copied().zip(window.back().copied());
            if let Some((first, last)) = bounds.filter(|_| total + piece.tokens > self.chunk_size) {
                chunks.extend(trimmed(
                    text,
                    Span {
                        start: first.span.start,
                        end: last.span.end,
                    },
                ));

                while total > self.chunk_overlap
                    || (total + piece.tokens > self.chunk_size && total > 0)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= front.tokens;
                }

                // whole pieces were too big to carry, so carry the tail words of the last one
                if window.is_empty() && self.chunk_overlap > 0 {
                    let budget = self
                        .chunk_overlap
                        .min(self.chunk_size.saturating_sub(piece.tokens));
                    if let Some(tail) = tail_within(text, last.span, budget) {
                        total += tail.tokens;
                        window.push_back(tail);
                    }
                }
            }
            total += piece.tokens;
            window.push_back(*piece);
        }

        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            chunks.extend(trimmed(
                text,
                Span {
                    start: first.span.start,
                    end: last.span.end,
                },
            ));
        }

        chunks
    }
}

/// Longest suffix of `span` within `budget` tokens, cut at a word start when one fits
fn tail_within(text: &str, span: Span, budget: usize) -> Option<Piece> {
    if budget == 0 {
        return None;
    }
    let span = trimmed(text, span)?;
    let segment = &text[span.start..span.end];

    let mut word_start = None;
    let mut char_start = None;
    let mut chars = segment.char_indices().rev().peekable();
    while let Some((i, c)) = chars.next() {
        if count_tokens(&segment[i..]) > budget {
            break;
        }
        if c.is_whitespace() {
            continue;
        }
        char_start = Some(i);
        if chars.peek().is_none_or(|&(_, prev)| prev.is_whitespace()) {
            word_start = Some(i);
        }
    }

    let start = span.start + word_start.or(char_start)?;
    let tail = Span {
        start,
        end: span.end,
    };
    Some(Piece {
        span: tail,
        tokens: count_tokens(&text[tail.start..tail.end]),
    })
}

/// Cut `range` before each occurrence of `separator`; an empty separator cuts between characters
fn split_keeping_separator(text: &str, range: Span, separator: &str) -> Vec<Span> {
    let segment = &text[range.start..range.end];

    let cuts: Vec<usize> = if separator.is_empty() {
        segment.char_indices().map(|(i, _)| i).skip(1).collect()
    } else {
        segment
            .match_indices(separator)
            .map(|(i, _)| i)
            .filter(|&i| i > 0)
            .collect()
    };

    let mut spans = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        if cut > start {
            spans.push(Span {
                start: range.start + start,
                end: range.start + cut,
            });
        }
        start = cut;
    }
    if start < segment.len() {
        spans.push(Span {
            start: range.start + start,
            end: range.end,
        });
    }

    spans
}

/// Shrink a span to exclude surrounding whitespace; `None` when nothing is left
fn trimmed(text: &str, span: Span) -> Option<Span> {
    let segment = &text[span.start..span.end];
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return None;
    }

    let start = span.start + (segment.len() - segment.trim_start().len());
    Some(Span {
        start,
        end: start + trimmed.len(),
    })
}

/// A token-bounded slice of a section, the unit stored in the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    source_url: PageUrl,
    section_title: String,
    content: String,
    start_char: usize,
    end_char: usize,
    chunk_index: usize,
    total_chunks: usize,
    token_count: usize,
}

impl Chunk {
    /// Build a chunk; `end_char` and `token_count` are derived from `content`
    #[inline]
    pub fn new(
        source_url: PageUrl,
        section_title: &str,
        content: String,
        start_char: usize,
        chunk_index: usize,
        total_chunks: usize,
    ) -> Result<Self> {
        if chunk_index >= total_chunks {
            return Err(RagError::InvalidRecord(format!(
                "chunk index {} out of range for {} chunks",
                chunk_index, total_chunks
            )));
        }

        let end_char = start_char + content.chars().count();
        let token_count = count_tokens(&content);
        Ok(Self {
            source_url,
            section_title: section_title.to_string(),
            content,
            start_char,
            end_char,
            chunk_index,
            total_chunks,
            token_count,
        })
    }

    #[inline]
    pub fn source_url(&self) -> &PageUrl {
        &self.source_url
    }

    #[inline]
    pub fn section_title(&self) -> &str {
        &self.section_title
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn start_char(&self) -> usize {
        self.start_char
    }

    #[inline]
    pub fn end_char(&self) -> usize {
        self.end_char
    }

    #[inline]
    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    #[inline]
    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    #[inline]
    pub fn token_count(&self) -> usize {
        self.token_count
    }
}

/// Split one section into chunks whose offsets are anchored at the section's own start
#[inline]
pub fn split_section(section: &Section, splitter: &RecursiveSplitter) -> Vec<Chunk> {
    let content = section.content();
    let spans = splitter.split_spans(content);
    let total_chunks = spans.len();

    let mut chunks = Vec::with_capacity(total_chunks);
    let mut byte_cursor = 0;
    let mut char_cursor = 0;

    for (chunk_index, span) in spans.into_iter().enumerate() {
        // span starts only move forward, so the char offset is counted incrementally
        char_cursor += content[byte_cursor..span.start].chars().count();
        byte_cursor = span.start;

        let text = &content[span.start..span.end];
        let start_char = section.start_char() + char_cursor;
        chunks.push(Chunk {
            source_url: section.source_url().clone(),
            section_title: section.section_title().to_string(),
            content: text.to_string(),
            start_char,
            end_char: start_char + text.chars().count(),
            chunk_index,
            total_chunks,
            token_count: count_tokens(text),
        });
    }

    chunks
}

/// Split every section, preserving section order
#[inline]
pub fn split_sections(sections: &[Section], splitter: &RecursiveSplitter) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = sections
        .iter()
        .flat_map(|section| split_section(section, splitter))
        .collect();

    debug!(
        "Split {} sections into {} chunks (avg {} tokens)",
        sections.len(),
        chunks.len(),
        chunks.iter().map(Chunk::token_count).sum::<usize>() / chunks.len().max(1)
    );

    chunks
}
