//! # Text Rendering and Export
//!
//! Renders a song body for reading under a transpose and capo, and turns a
//! song back into an authoring document.
//!
//! ## Display modes
//! ```text
//! combined   [G]Hello [Em]world
//! chords     G Em
//! lyrics     Hello world
//! ```
//! Comments render as `# text`, repeats as `(xN)` with N defaulting to 2, and
//! chord lines as their chords separated by spaces in every mode.
//!
//! ## Example
//! ```rust
//! use chordsheet::render::{render_line, DisplayMode, RenderOptions};
//! use chordsheet::tokenize_line;
//!
//! let line = tokenize_line("[G]Hello [Em]world");
//! let opts = RenderOptions { transpose: 2, ..Default::default() };
//! assert_eq!(render_line(&line, &opts), "[A]Hello [F#m]world");
//!
//! let lyrics = RenderOptions { mode: DisplayMode::Lyrics, ..Default::default() };
//! assert_eq!(render_line(&line, &lyrics), "Hello world");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::ast::{ChordToken, Line, SongContent, Token, DEFAULT_REPEAT_COUNT};
use crate::error::SheetError;
use crate::transpose::{display_chord_name, preferred_spelling_for_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Combined,
    Chords,
    Lyrics,
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "combined" => Ok(DisplayMode::Combined),
            "chords" => Ok(DisplayMode::Chords),
            "lyrics" => Ok(DisplayMode::Lyrics),
            other => Err(format!(
                "unknown display mode '{}' (expected combined, chords or lyrics)",
                other
            )),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplayMode::Combined => "combined",
            DisplayMode::Chords => "chords",
            DisplayMode::Lyrics => "lyrics",
        };
        f.write_str(name)
    }
}

/// Reader settings applied at display time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub mode: DisplayMode,
    /// Musical transpose in semitones
    pub transpose: i32,
    /// Capo position; shapes are shown relative to it
    pub capo: i32,
    /// Forces a spelling; `None` follows the song key in [`render_song`]
    /// and means sharps for a bare line
    pub prefer_flats: Option<bool>,
}

impl RenderOptions {
    pub fn prefer_flats_for(&self, key: &str) -> bool {
        self.prefer_flats
            .unwrap_or_else(|| preferred_spelling_for_key(key).prefer_flats())
    }

    /// These options with the spelling settled for a song in `key`
    pub fn for_key(&self, key: &str) -> RenderOptions {
        RenderOptions {
            prefer_flats: Some(self.prefer_flats_for(key)),
            ..*self
        }
    }

    /// Displayed name of an authored chord name
    pub fn chord_name(&self, name: &str) -> String {
        display_chord_name(name, self.transpose, self.capo, self.prefer_flats.unwrap_or(false))
    }
}

fn chord_label(chord: &ChordToken, opts: &RenderOptions) -> String {
    opts.chord_name(&chord.name())
}

/// Render one line
pub fn render_line(line: &Line, opts: &RenderOptions) -> String {
    match line {
        Line::Blank => String::new(),
        Line::Comment { text } => format!("# {}", text),
        Line::Repeat { count } => format!("(x{})", count.unwrap_or(DEFAULT_REPEAT_COUNT)),
        Line::Chordline { chords } => chords
            .iter()
            .map(|chord| chord_label(chord, opts))
            .collect::<Vec<_>>()
            .join(" "),
        Line::Inline { tokens } => match opts.mode {
            DisplayMode::Combined => tokens
                .iter()
                .map(|token| match token {
                    Token::Chord(chord) => format!("[{}]", chord_label(chord, opts)),
                    Token::Lyric { text } => text.clone(),
                })
                .collect(),
            DisplayMode::Chords => tokens
                .iter()
                .filter_map(Token::as_chord)
                .map(|chord| chord_label(chord, opts))
                .collect::<Vec<_>>()
                .join(" "),
            DisplayMode::Lyrics => tokens
                .iter()
                .filter_map(|token| match token {
                    Token::Lyric { text } => Some(text.as_str()),
                    Token::Chord(_) => None,
                })
                .collect(),
        },
    }
}

/// Render every line of a song, one output line per `ast` line
pub fn render_song(song: &SongContent, opts: &RenderOptions) -> String {
    let opts = opts.for_key(&song.frontmatter.key);
    song.ast
        .iter()
        .map(|line| render_line(line, &opts))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Authoring text of a body. Tokenizing the result gives back `ast`, except
/// that chord lines come back as inline lines.
pub fn to_source(ast: &[Line]) -> String {
    ast.iter()
        .map(|line| match line {
            Line::Inline { tokens } => tokens.iter().map(Token::source_text).collect(),
            Line::Chordline { chords } => chords
                .iter()
                .map(|chord| chord.raw.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            Line::Comment { text } => format!("# {}", text),
            Line::Blank => String::new(),
            Line::Repeat { count: Some(n) } => format!("(x{})", n),
            Line::Repeat { count: None } => "(x)".to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Complete authoring document: YAML front matter followed by the body
pub fn to_markdown(song: &SongContent) -> Result<String, SheetError> {
    let yaml = serde_yaml::to_string(&song.frontmatter)
        .map_err(|e| SheetError::MetadataError(e.to_string()))?;
    Ok(format!("---\n{}---\n{}", yaml, to_source(&song.ast)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{parse_chord_token, tokenize_body, tokenize_line};
    use crate::song::parse_song_document;

    const DOC: &str = "---
id: demo
title: \"Demo: A Song\"
artist: Me
key: F
capo: 1
tags: [test]
chord_shapes:
  Fadd9: { fretting: [x, x, 3, 2, 1, 3] }
scroll_map:
  - { timeSec: 0, lineIndex: 0 }
---
[F]One [C/E]two [Dm7]three
# Bridge

(x)
(x4)
";

    fn opts(mode: DisplayMode, transpose: i32, capo: i32) -> RenderOptions {
        RenderOptions {
            mode,
            transpose,
            capo,
            prefer_flats: None,
        }
    }

    #[test]
    fn test_display_modes() {
        let line = tokenize_line("[G]Hello [Em]world");
        assert_eq!(render_line(&line, &opts(DisplayMode::Combined, 0, 0)), "[G]Hello [Em]world");
        assert_eq!(render_line(&line, &opts(DisplayMode::Chords, 0, 0)), "G Em");
        assert_eq!(render_line(&line, &opts(DisplayMode::Lyrics, 0, 0)), "Hello world");
    }

    #[test]
    fn test_other_line_kinds() {
        let o = opts(DisplayMode::Lyrics, 3, 0);
        assert_eq!(render_line(&Line::Blank, &o), "");
        assert_eq!(
            render_line(&Line::Comment { text: "Chorus".to_string() }, &o),
            "# Chorus"
        );
        assert_eq!(render_line(&Line::Repeat { count: None }, &o), "(x2)");
        assert_eq!(render_line(&Line::Repeat { count: Some(5) }, &o), "(x5)");

        // Chord lines ignore the display mode
        let chordline = Line::Chordline {
            chords: vec![parse_chord_token("C", None), parse_chord_token("G/B", None)],
        };
        assert_eq!(render_line(&chordline, &o), "D# A#/D");
    }

    #[test]
    fn test_transpose_then_capo() {
        let line = tokenize_line("[G]a [D/F#]b");
        let o = opts(DisplayMode::Combined, 2, 2);
        assert_eq!(render_line(&line, &o), "[G]a [D/F#]b");

        let o = opts(DisplayMode::Chords, 0, 2);
        assert_eq!(render_line(&line, &o), "F C/E");
    }

    #[test]
    fn test_line_spelling_comes_from_options() {
        let line = tokenize_line("[C]x [F#m]y");
        let flats = RenderOptions {
            prefer_flats: Some(true),
            ..opts(DisplayMode::Chords, 1, 0)
        };
        assert_eq!(render_line(&line, &flats), "Db Gm");
        assert_eq!(render_line(&line, &opts(DisplayMode::Chords, 1, 0)), "C# Gm");

        let resolved = opts(DisplayMode::Chords, 1, 0).for_key("Bb");
        assert_eq!(resolved.prefer_flats, Some(true));
        assert_eq!(render_line(&line, &resolved), "Db Gm");
        // An explicit spelling beats the key
        assert_eq!(flats.for_key("E").prefer_flats, Some(true));
    }

    #[test]
    fn test_render_song_uses_key_spelling() {
        let song = parse_song_document(DOC, None).unwrap();
        let rendered = render_song(&song, &opts(DisplayMode::Combined, 1, 0));
        let lines: Vec<&str> = rendered.split('\n').collect();
        assert_eq!(lines[0], "[Gb]One [Db/F]two [Ebm7]three");
        assert_eq!(lines[1], "# Bridge");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "(x2)");
        assert_eq!(lines[4], "(x4)");
        assert_eq!(lines.len(), song.ast.len());

        let sharps = RenderOptions {
            prefer_flats: Some(false),
            ..opts(DisplayMode::Chords, 1, 0)
        };
        assert_eq!(render_song(&song, &sharps).lines().next(), Some("F# C#/F D#m7"));
    }

    #[test]
    fn test_display_mode_parse() {
        assert_eq!("chords".parse::<DisplayMode>(), Ok(DisplayMode::Chords));
        assert_eq!(DisplayMode::Lyrics.to_string(), "lyrics");
        assert!("karaoke".parse::<DisplayMode>().is_err());
    }

    #[test]
    fn test_to_source_reproduces_body() {
        let body = "[G]Hello [Em]world\n  # note  \n\n(x)\n(x3)\n[Cdim] stays text\n";
        let ast = tokenize_body(body);
        let source = to_source(&ast);
        assert_eq!(tokenize_body(&source), ast);
    }

    #[test]
    fn test_chordline_source_reads_back_inline() {
        let ast = vec![Line::Chordline {
            chords: vec![parse_chord_token("Am", None), parse_chord_token("F", None)],
        }];
        let source = to_source(&ast);
        assert_eq!(source, "[Am] [F]");
        let reread = tokenize_line(&source);
        assert!(matches!(reread, Line::Inline { .. }));
        assert_eq!(reread.chords().len(), 2);
    }

    #[test]
    fn test_markdown_round_trip() {
        let song = parse_song_document(DOC, None).unwrap();
        let markdown = to_markdown(&song).unwrap();
        assert!(markdown.starts_with("---\nid: demo\n"));
        let reparsed = parse_song_document(&markdown, None).unwrap();
        assert_eq!(reparsed, song);
    }
}
