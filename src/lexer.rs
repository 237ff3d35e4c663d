//! # Chord Sheet Tokenizer
//!
//! Turns annotated lyric text into typed [`Line`]s.
//!
//! ## Line classification (first match wins)
//! 1. empty or all whitespace -> `Blank`
//! 2. first non-space character is `#` -> `Comment` (marker and surrounding whitespace stripped)
//! 3. trimmed line is `(x<N>)` or `(x)` -> `Repeat`
//! 4. anything else -> `Inline`
//!
//! ## Chord grammar
//! ```text
//! [ <A-G> <#|b>? <quality>? ( / <A-G> <#|b>? )? ]
//! quality = m | maj7 | maj | m7 | 7 | 9 | 11 | 13 | sus2 | sus4 | add9
//! ```
//! Bracketed text outside this grammar (`[Cdim]`, `[H]`, `[chorus]`) is kept as
//! lyric text. Concatenating the source text of an inline line's tokens always
//! reproduces the line exactly.
//!
//! ## Example
//! ```rust
//! use chordsheet::{tokenize_line, Line, Token};
//!
//! let line = tokenize_line("[G]Hello [Em]world");
//! let Line::Inline { tokens } = line else { panic!("expected inline") };
//! assert_eq!(tokens.len(), 4);
//! assert_eq!(tokens[1], Token::Lyric { text: "Hello ".to_string() });
//! ```

use crate::ast::{split_bass, split_root, ChordToken, Line, Token};

/// Recognized chord qualities
pub const QUALITIES: &[&str] = &[
    "m", "maj7", "maj", "m7", "7", "9", "11", "13", "sus2", "sus4", "add9",
];

/// Tokenize every line of a body. Lines split on `\n` or `\r\n`; nothing else
/// is trimmed, so the result has one `Line` per source line.
pub fn tokenize_body(text: &str) -> Vec<Line> {
    let mut lines: Vec<Line> = text
        .split_inclusive('\n')
        .map(|line| {
            let line = line
                .strip_suffix("\r\n")
                .or_else(|| line.strip_suffix('\n'))
                .unwrap_or(line);
            tokenize_line(line)
        })
        .collect();
    // A trailing newline (or empty text) leaves one final empty line
    if text.is_empty() || text.ends_with('\n') {
        lines.push(Line::Blank);
    }
    lines
}

/// Classify and tokenize a single line
pub fn tokenize_line(line: &str) -> Line {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    if let Some(rest) = line.trim_start().strip_prefix('#') {
        return Line::Comment {
            text: rest.trim().to_string(),
        };
    }

    if let Some(count) = parse_repeat_marker(trimmed) {
        return Line::Repeat { count };
    }

    Line::Inline {
        tokens: scan_inline(line),
    }
}

/// Build a chord token from bracket contents such as `F#m7/C#`.
///
/// `raw` is the bracketed source text; it is rebuilt as `[text]` when absent.
/// Text that does not start with a note keeps the whole main part as its root.
pub fn parse_chord_token(text: &str, raw: Option<&str>) -> ChordToken {
    let (main, bass) = split_bass(text);
    let (root, quality) = split_root(main).unwrap_or((text, ""));

    ChordToken {
        raw: raw.map(str::to_string).unwrap_or_else(|| format!("[{}]", text)),
        root: root.to_string(),
        quality: quality.to_string(),
        bass: bass.map(str::to_string),
    }
}

/// `(x3)` -> `Some(Some(3))`, `(x)` -> `Some(None)`, anything else -> `None`
fn parse_repeat_marker(trimmed: &str) -> Option<Option<u32>> {
    let inner = trimmed.strip_prefix("(x")?.strip_suffix(')')?;
    if inner.is_empty() {
        return Some(None);
    }
    if !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Counts too large for u32 fall back to the default
    Some(inner.parse().ok())
}

/// Split an inline line into chord and lyric tokens, left to right
fn scan_inline(line: &str) -> Vec<Token> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut lyric_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] == b'[' {
            if let Some(end) = match_chord(bytes, pos) {
                if pos > lyric_start {
                    tokens.push(Token::Lyric {
                        text: line[lyric_start..pos].to_string(),
                    });
                }
                let raw = &line[pos..end];
                let text = &raw[1..raw.len() - 1];
                tokens.push(Token::Chord(parse_chord_token(text, Some(raw))));
                lyric_start = end;
                pos = end;
                continue;
            }
        }
        pos += 1;
    }

    if lyric_start < line.len() {
        tokens.push(Token::Lyric {
            text: line[lyric_start..].to_string(),
        });
    }

    tokens
}

fn is_note_letter(b: Option<&u8>) -> bool {
    matches!(b, Some(b'A'..=b'G'))
}

fn is_accidental(b: Option<&u8>) -> bool {
    matches!(b, Some(b'#') | Some(b'b'))
}

/// Match a bracketed chord starting at `start` (which holds `[`).
/// Returns the byte offset just past the closing `]`.
fn match_chord(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if !is_note_letter(bytes.get(i)) {
        return None;
    }
    i += 1;
    if is_accidental(bytes.get(i)) {
        i += 1;
    }

    let rest = &bytes[i..];
    std::iter::once("")
        .chain(QUALITIES.iter().copied())
        .filter(|quality| rest.starts_with(quality.as_bytes()))
        .find_map(|quality| match_tail(bytes, i + quality.len()))
}

/// Match `(/<note><accidental?>)?]` at `i`
fn match_tail(bytes: &[u8], mut i: usize) -> Option<usize> {
    if bytes.get(i) == Some(&b'/') {
        i += 1;
        if !is_note_letter(bytes.get(i)) {
            return None;
        }
        i += 1;
        if is_accidental(bytes.get(i)) {
            i += 1;
        }
    }
    (bytes.get(i) == Some(&b']')).then_some(i + 1)
}
