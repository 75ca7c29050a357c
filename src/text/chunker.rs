use regex::Regex;
use std::sync::LazyLock;

use crate::config::ContextConfig;

/// How far (in chars) around the target cut to look for a sentence or line break
pub const BOUNDARY_WINDOW: usize = 100;

static HORIZONTAL_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid whitespace regex"));
static SPACE_AROUND_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?\n ?").expect("valid newline regex"));
static BLANK_LINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

/// Normalize whitespace and line endings.
///
/// Line endings become `\n`, runs of other whitespace become a single space,
/// spaces touching a newline are dropped and any run of blank lines is reduced
/// to exactly one. The result is trimmed. `clean(clean(t)) == clean(t)`.
pub fn clean(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_WHITESPACE.replace_all(&text, " ");
    let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_LINE_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Split `text` into overlapping chunks of at most roughly `max_length` chars.
///
/// Lengths and offsets count `char`s. Cuts prefer the '.' nearest to the
/// target length within [`BOUNDARY_WINDOW`], then the nearest newline.
/// A cut never lands within `overlap` chars of the chunk start, so
/// consecutive chunks always share `overlap` chars when `overlap < max_length`.
pub fn chunk_text(text: &str, max_length: usize, overlap: usize) -> Vec<String> {
    let max_length = max_length.max(1);
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= max_length {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let target = start + max_length;
        if target >= len {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        let min_cut = start + overlap.min(max_length - 1) + 1;
        let end = find_boundary(&chars, min_cut, target).unwrap_or(target);
        chunks.push(chars[start..end].iter().collect());

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

/// Cut position just after the '.' (else '\n') nearest to `target`, at or past `min_cut`
fn find_boundary(chars: &[char], min_cut: usize, target: usize) -> Option<usize> {
    let low = target.saturating_sub(BOUNDARY_WINDOW).max(min_cut - 1);
    let high = (target + BOUNDARY_WINDOW).min(chars.len());

    let nearest = |wanted: char| {
        (low..high)
            .filter(|&i| chars[i] == wanted)
            .map(|i| i + 1)
            .min_by_key(|&cut| cut.abs_diff(target))
    };

    nearest('.').or_else(|| nearest('\n'))
}

/// Chunker bound to the configured context length and overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    max_length: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(max_length: usize, overlap: usize) -> Self {
        Self {
            max_length,
            overlap,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.max_context_length, config.chunk_overlap)
    }

    pub fn clean(&self, text: &str) -> String {
        clean(text)
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.max_length, self.overlap)
    }

    /// Clean, then chunk
    pub fn prepare(&self, text: &str) -> Vec<String> {
        self.chunk(&clean(text))
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}
