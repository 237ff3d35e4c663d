//! # Song Data Model
//!
//! Types for tokenized chord sheets, song front matter and the search index.
//!
//! ## Type Hierarchy
//! ```text
//! SongContent
//!   ├── SongFrontmatter (id, title, artist, key, capo, tags, ...)
//!   │     ├── chord_shapes: Option<BTreeMap<name, ChordShape>>
//!   │     └── scroll_map: Option<Vec<SyncPoint>>
//!   ├── ast: Vec<Line>
//!   │     ├── Inline { tokens: Vec<Token> }
//!   │     │     └── Token (Chord(ChordToken) | Lyric { text })
//!   │     ├── Chordline { chords: Vec<ChordToken> }
//!   │     ├── Comment { text }
//!   │     ├── Blank
//!   │     └── Repeat { count: Option<u32> }
//!   └── unique_chords: Vec<String>
//!
//! SearchIndexEntry (id, title, artist, key, capo, tags)
//! ```
//!
//! ## Key Concepts
//!
//! ### Canonical data
//! Everything stored here is untransposed and capo-0. A `ChordToken` keeps the
//! bracketed source text in `raw` and the `root`/`quality`/`bass` split taken
//! at parse time. Display names under a transpose or capo come from the
//! `transpose` module and are never written back.
//!
//! ### Line index
//! A line's position in `ast` is its stable key. The sync-scroll map
//! (`SyncPoint::line_index`) and every renderer address lines by it.
//!
//! ### JSON shape
//! Serialization matches the published catalog file: tokens are tagged by
//! `type`, lines by `kind`, and the derived chord list is `uniqueChords`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Repeat count shown when a repeat marker has no explicit number, e.g. `(x)`.
pub const DEFAULT_REPEAT_COUNT: u32 = 2;

/// A bracketed chord annotation such as `[F#m7/C#]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordToken {
    /// Original bracketed text, e.g. `[F#m7/C#]`
    pub raw: String,
    /// Root note, e.g. `F#`
    pub root: String,
    /// Quality suffix, e.g. `m7`; empty for a bare major chord
    pub quality: String,
    /// Bass note of a slash chord, e.g. `C#`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass: Option<String>,
}

impl ChordToken {
    /// Chord name as authored, without brackets (`[F#m7/C#]` -> `F#m7/C#`)
    pub fn name(&self) -> String {
        self.raw.chars().filter(|c| *c != '[' && *c != ']').collect()
    }
}

/// One piece of an inline line, in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Token {
    Chord(ChordToken),
    Lyric { text: String },
}

impl Token {
    /// The exact source substring this token was built from
    pub fn source_text(&self) -> &str {
        match self {
            Token::Chord(chord) => &chord.raw,
            Token::Lyric { text } => text,
        }
    }

    pub fn as_chord(&self) -> Option<&ChordToken> {
        match self {
            Token::Chord(chord) => Some(chord),
            Token::Lyric { .. } => None,
        }
    }
}

/// A single line of a song body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Line {
    /// Lyrics with interleaved chords
    Inline { tokens: Vec<Token> },
    /// A chord row with no lyrics; only produced by importers that split
    /// chord rows from lyric rows, never by the tokenizer
    Chordline { chords: Vec<ChordToken> },
    /// `# text`, marker stripped
    Comment { text: String },
    Blank,
    /// `(x3)` or `(x)`
    Repeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u32>,
    },
}

impl Line {
    /// Every chord on this line, left to right
    pub fn chords(&self) -> Vec<&ChordToken> {
        match self {
            Line::Inline { tokens } => tokens.iter().filter_map(Token::as_chord).collect(),
            Line::Chordline { chords } => chords.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Effective repeat count for a repeat line (defaults to 2)
    pub fn repeat_count(&self) -> Option<u32> {
        match self {
            Line::Repeat { count } => Some(count.unwrap_or(DEFAULT_REPEAT_COUNT)),
            _ => None,
        }
    }
}

/// One position on the fretboard for a single string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFret", into = "RawFret")]
pub enum Fret {
    /// String not played (`"x"`)
    Muted,
    /// Fret number relative to the diagram's base fret; 0 is an open string
    At(u8),
}

/// Wire form of a fret: a number or the marker `"x"`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawFret {
    Number(u8),
    Marker(String),
}

impl TryFrom<RawFret> for Fret {
    type Error = String;

    fn try_from(raw: RawFret) -> Result<Self, Self::Error> {
        match raw {
            RawFret::Number(n) => Ok(Fret::At(n)),
            RawFret::Marker(m) if m.eq_ignore_ascii_case("x") => Ok(Fret::Muted),
            RawFret::Marker(m) => Err(format!("invalid fret marker: {}", m)),
        }
    }
}

impl From<Fret> for RawFret {
    fn from(fret: Fret) -> Self {
        match fret {
            Fret::Muted => RawFret::Marker("x".to_string()),
            Fret::At(n) => RawFret::Number(n),
        }
    }
}

/// Fingering diagram for one chord
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordShape {
    /// One entry per string, low string first
    pub fretting: Vec<Fret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingering: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fret: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strings: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Video time -> line index anchor for sync scrolling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPoint {
    pub time_sec: f64,
    pub line_index: usize,
}

/// Song metadata from the front matter block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongFrontmatter {
    /// Opaque stable id; the only cross-reference key
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Home key as authored, e.g. "Bb" or "F#m"
    pub key: String,
    /// Capo position the song was authored for
    #[serde(default)]
    pub capo: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chord_shapes: Option<BTreeMap<String, ChordShape>>,
    /// Monotonic in `time_sec`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_map: Option<Vec<SyncPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A fully tokenized song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongContent {
    pub frontmatter: SongFrontmatter,
    pub ast: Vec<Line>,
    /// Sorted, deduplicated chord names from `ast`. Derived; rebuild with
    /// `song::collect_unique_chords` rather than editing.
    #[serde(rename = "uniqueChords")]
    pub unique_chords: Vec<String>,
}

/// Listing/search projection of a song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub key: String,
    pub capo: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Split a chord name on its first `/` into the main part and the bass note.
///
/// `"D/F#"` -> `("D", Some("F#"))`, `"Am7"` -> `("Am7", None)`
pub fn split_bass(name: &str) -> (&str, Option<&str>) {
    match name.split_once('/') {
        Some((main, bass)) => (main, Some(bass)),
        None => (name, None),
    }
}

/// Split the main part of a chord name into root note and quality suffix.
///
/// The root is a letter `A`-`G` plus an optional `#` or `b`; the quality is
/// whatever follows. Returns `None` when the name does not start with a note.
pub fn split_root(main: &str) -> Option<(&str, &str)> {
    let bytes = main.as_bytes();
    if !matches!(bytes.first(), Some(b'A'..=b'G')) {
        return None;
    }
    let root_len = if matches!(bytes.get(1), Some(b'#') | Some(b'b')) {
        2
    } else {
        1
    };
    Some(main.split_at(root_len))
}
