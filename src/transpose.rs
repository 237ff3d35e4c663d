//! # Transposition Engine
//!
//! Chord-name arithmetic over the 12 pitch classes (C = 0 ... B = 11).
//!
//! Two independent shifts are applied at display time, never to stored data:
//! 1. the musical transpose chosen by the reader, then
//! 2. the capo, which lowers the displayed shape by the capo position
//!    (a sounding G with capo 2 is played with an F shape).
//!
//! Spelling of the result is either sharp-preferred or flat-preferred. The
//! choice comes from [`preferred_spelling_for_key`], a lookup of
//! conventionally flat keys rather than full key-signature theory.
//!
//! Anything that is not a recognized note passes through unchanged.
//!
//! ## Example
//! ```rust
//! use chordsheet::transpose::{apply_capo, transpose_chord_name};
//!
//! assert_eq!(transpose_chord_name("F#m", 2, false), "G#m");
//! assert_eq!(transpose_chord_name("D/F#", 1, true), "Eb/G");
//! assert_eq!(apply_capo("G", 2, false), "F");
//! ```

use crate::ast::{split_bass, split_root, ChordToken};

/// Sharp-preferred spelling of each pitch class
pub const SHARPS: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Flat-preferred spelling of each pitch class
pub const FLATS: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Keys conventionally written with flats, majors and their relative minors
const FLAT_KEYS: &[&str] = &[
    "F", "Bb", "Eb", "Ab", "Db", "Gb", "Cb", "Fm", "Bbm", "Ebm", "Abm", "Dbm", "Gbm", "Cbm",
];

/// Accidental spelling for transposed names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Spelling {
    #[default]
    Sharps,
    Flats,
}

impl Spelling {
    pub fn prefer_flats(self) -> bool {
        self == Spelling::Flats
    }
}

/// Transpose settings for rendering a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransposeOptions {
    pub semitones: i32,
    pub prefer_flats: bool,
}

/// Pitch class of a note name. Only the 17 common spellings are recognized
/// (no `E#`, `Fb`, `B#`, `Cb`).
pub fn note_to_index(name: &str) -> Option<u8> {
    match name {
        "C" => Some(0),
        "C#" | "Db" => Some(1),
        "D" => Some(2),
        "D#" | "Eb" => Some(3),
        "E" => Some(4),
        "F" => Some(5),
        "F#" | "Gb" => Some(6),
        "G" => Some(7),
        "G#" | "Ab" => Some(8),
        "A" => Some(9),
        "A#" | "Bb" => Some(10),
        "B" => Some(11),
        _ => None,
    }
}

/// Spell a pitch class; any integer is reduced modulo 12
pub fn index_to_note(index: i32, prefer_flats: bool) -> &'static str {
    let normalized = index.rem_euclid(12) as usize;
    if prefer_flats {
        FLATS[normalized]
    } else {
        SHARPS[normalized]
    }
}

/// Transpose a note name by `semitones`.
///
/// Unrecognized names come back unchanged. A shift that is a whole number of
/// octaves also returns the name as written, so `Db` stays `Db` even when
/// sharps are preferred.
pub fn transpose_note(note: &str, semitones: i32, prefer_flats: bool) -> String {
    let Some(index) = note_to_index(note) else {
        return note.to_string();
    };
    if semitones.rem_euclid(12) == 0 {
        return note.to_string();
    }
    index_to_note(i32::from(index) + semitones.rem_euclid(12), prefer_flats).to_string()
}

/// Transpose a full chord name (`root + quality` with optional `/bass`).
///
/// The quality is copied untouched; root and bass move independently. Names
/// that do not start with a note come back unchanged.
pub fn transpose_chord_name(name: &str, semitones: i32, prefer_flats: bool) -> String {
    let (main, bass) = split_bass(name);
    let Some((root, quality)) = split_root(main) else {
        return name.to_string();
    };

    let new_root = transpose_note(root, semitones, prefer_flats);
    match bass {
        Some(bass) => format!(
            "{}{}/{}",
            new_root,
            quality,
            transpose_note(bass, semitones, prefer_flats)
        ),
        None => format!("{}{}", new_root, quality),
    }
}

/// Name of the chord shape to play for a sounding chord with a capo at `capo`.
/// A capo at or below zero changes nothing.
pub fn apply_capo(name: &str, capo: i32, prefer_flats: bool) -> String {
    if capo <= 0 {
        return name.to_string();
    }
    transpose_chord_name(name, -capo, prefer_flats)
}

/// Displayed name of an authored chord: transpose first, then capo
pub fn display_chord_name(name: &str, semitones: i32, capo: i32, prefer_flats: bool) -> String {
    let transposed = transpose_chord_name(name, semitones, prefer_flats);
    apply_capo(&transposed, capo, prefer_flats)
}

/// Transposed display name of a chord token
pub fn transpose_token(token: &ChordToken, opts: TransposeOptions) -> String {
    transpose_chord_name(&token.name(), opts.semitones, opts.prefer_flats)
}

/// Spelling convention for a song's home key.
///
/// Exact match against the flat major key names and the same names with a
/// trailing `m` (`"Bb"`, `"Fm"`); everything else, `"Dm"` included, uses sharps.
pub fn preferred_spelling_for_key(key: &str) -> Spelling {
    if FLAT_KEYS.contains(&key) {
        Spelling::Flats
    } else {
        Spelling::Sharps
    }
}
