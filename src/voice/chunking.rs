//! Text chunking for the speech synthesis character limit
//!
//! The synthesis backend rejects requests much above 100 characters. This
//! module splits long text into smaller chunks while preserving the most
//! natural boundary available: sentences first, then clauses, then words.
//! A single word longer than the limit is emitted whole, never cut.

use serde::Serialize;

/// Default chunk size limit in characters
pub const DEFAULT_MAX_CHARS: usize = 100;

/// Separator placed between units packed into the same chunk
const JOIN: char = ' ';

/// A bounded slice of an utterance, submitted as one synthesis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position in the original ordering (0-based)
    pub index: usize,
    /// Chunk text
    pub text: String,
}

/// Boundary used to split text into packable units, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    /// `. `, `! `, `? `
    Sentence,
    /// `, `, `; `, `: `
    Clause,
    /// Single spaces
    Word,
}

impl Boundary {
    const fn finer(self) -> Option<Self> {
        match self {
            Self::Sentence => Some(Self::Clause),
            Self::Clause => Some(Self::Word),
            Self::Word => None,
        }
    }

    const fn terminators(self) -> &'static [char] {
        match self {
            Self::Sentence => &['.', '!', '?'],
            Self::Clause => &[',', ';', ':'],
            Self::Word => &[],
        }
    }
}

/// Split `text` into chunks that each fit within `max_chars` characters.
///
/// When `max_chars` is 0, [`DEFAULT_MAX_CHARS`] is used. Text that already
/// fits is returned unchanged as a single chunk (this includes empty text;
/// rejecting empty input is the caller's concern). Longer text is
/// whitespace-normalized first, so joining the chunks with single spaces
/// reproduces the normalized text.
///
/// # Examples
///
/// ```
/// use pinky_trust::voice::chunk_text;
///
/// let chunks = chunk_text("short", 100);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].text, "short");
/// ```
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = if max_chars == 0 { DEFAULT_MAX_CHARS } else { max_chars };

    if char_len(text) <= max_chars {
        return vec![Chunk {
            index: 0,
            text: text.to_string(),
        }];
    }

    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        // Whitespace-only input has nothing to split on
        return vec![Chunk {
            index: 0,
            text: text.to_string(),
        }];
    }

    let mut pieces = Vec::new();
    assemble(
        &split_units(&normalized, Boundary::Sentence),
        max_chars,
        Boundary::Sentence,
        &mut pieces,
    );

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect()
}

/// Collapse every whitespace run into a single space and trim the ends
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text into units at the given boundary.
///
/// Terminal punctuation stays attached to the preceding unit; the single
/// separating space is dropped and restored by [`JOIN`] on assembly.
fn split_units(text: &str, boundary: Boundary) -> Vec<&str> {
    if boundary == Boundary::Word {
        return text.split(JOIN).filter(|w| !w.is_empty()).collect();
    }

    let terminators = boundary.terminators();
    let mut units = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !terminators.contains(&c) {
            continue;
        }
        // Punctuation not followed by a space (e.g. "2.5") is not a boundary
        if let Some(&(space_at, JOIN)) = chars.peek() {
            let unit = &text[start..space_at];
            if !unit.is_empty() {
                units.push(unit);
            }
            start = space_at + JOIN.len_utf8();
            chars.next();
        }
    }

    if start < text.len() {
        units.push(&text[start..]);
    }

    units
}

/// Greedily pack units into chunks of at most `limit` characters.
///
/// A unit that alone exceeds the limit is split again at the next finer
/// boundary; at word level it is emitted as-is.
fn assemble(units: &[&str], limit: usize, boundary: Boundary, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_len = 0;

    for &unit in units {
        let unit_len = char_len(unit);

        if unit_len > limit {
            flush(&mut current, &mut current_len, out);
            match boundary.finer() {
                Some(finer) => assemble(&split_units(unit, finer), limit, finer, out),
                None => out.push(unit.to_string()),
            }
            continue;
        }

        let needed = if current.is_empty() {
            unit_len
        } else {
            current_len + 1 + unit_len
        };

        if needed > limit {
            flush(&mut current, &mut current_len, out);
            current.push_str(unit);
            current_len = unit_len;
        } else {
            if !current.is_empty() {
                current.push(JOIN);
            }
            current.push_str(unit);
            current_len = needed;
        }
    }

    flush(&mut current, &mut current_len, out);
}

fn flush(current: &mut String, current_len: &mut usize, out: &mut Vec<String>) {
    if !current.is_empty() {
        out.push(std::mem::take(current));
    }
    *current_len = 0;
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
