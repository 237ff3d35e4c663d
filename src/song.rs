//! # Song Model Builder
//!
//! Combines front matter with a tokenized body into a [`SongContent`].
//!
//! ## Authoring format
//! ```text
//! ---
//! id: wonderwall
//! title: Wonderwall
//! artist: Oasis
//! key: F#m
//! capo: 2
//! tags: [britpop, acoustic]
//! ---
//! [Em7]Today is [G]gonna be the day
//! ```
//! The block between the first two `---` lines is YAML. It must open the
//! document; everything after the closing `---` line is the body.
//!
//! ## Derived data
//! `unique_chords` is always rebuilt from `ast` by [`collect_unique_chords`]:
//! bracket-stripped chord text as authored, deduplicated, sorted.
//!
//! ## Example
//! ```rust
//! use chordsheet::parse_song_document;
//!
//! let source = "---\ntitle: Demo\nartist: Me\nkey: G\n---\n[G]Hello [D/F#]there [G]\n";
//! let song = parse_song_document(source, Some("demo")).unwrap();
//!
//! assert_eq!(song.frontmatter.id, "demo");
//! assert_eq!(song.unique_chords, vec!["D/F#", "G"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::ast::{ChordShape, ChordToken, Line, SearchIndexEntry, SongContent, SongFrontmatter, SyncPoint};
use crate::error::SheetError;
use crate::lexer::tokenize_body;
use crate::youtube::extract_youtube_id;

/// Front matter as written, before required fields are checked
#[derive(Deserialize, Debug, Default)]
struct RawFrontmatter {
    #[serde(default, deserialize_with = "scalar_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    artist: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    album: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    key: Option<String>,
    #[serde(default)]
    capo: Option<u32>,
    #[serde(default, deserialize_with = "scalar_string")]
    youtube_id: Option<String>,
    #[serde(default)]
    chord_shapes: Option<BTreeMap<String, ChordShape>>,
    #[serde(default)]
    scroll_map: Option<Vec<SyncPoint>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Accept any YAML scalar as text, so `title: 1979` or `key: 7` still read.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a plain value, found {:?}",
            other
        ))),
    }
}

/// Tokenize `body` and attach it to `frontmatter`
pub fn build_song(frontmatter: SongFrontmatter, body: &str) -> SongContent {
    let ast = tokenize_body(body);
    let unique_chords = collect_unique_chords(&ast);
    SongContent {
        frontmatter,
        ast,
        unique_chords,
    }
}

/// Sorted set of chord names (as authored, brackets stripped) used in `ast`
pub fn collect_unique_chords(ast: &[Line]) -> Vec<String> {
    let names: BTreeSet<String> = ast
        .iter()
        .flat_map(Line::chords)
        .map(ChordToken::name)
        .collect();
    names.into_iter().collect()
}

impl SongContent {
    /// The search-index projection of this song
    pub fn index_entry(&self) -> SearchIndexEntry {
        let fm = &self.frontmatter;
        SearchIndexEntry {
            id: fm.id.clone(),
            title: fm.title.clone(),
            artist: fm.artist.clone(),
            key: fm.key.clone(),
            capo: fm.capo,
            tags: fm.tags.clone(),
        }
    }
}

/// Split a document into its YAML front matter and body.
///
/// Returns `(None, source)` when the document does not open with a `---`
/// line or the block is never closed.
pub fn extract_frontmatter(source: &str) -> (Option<&str>, &str) {
    let mut lines = source.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (None, source);
    };
    if first.trim_end() != "---" {
        return (None, source);
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == "---" {
            return (Some(&source[start..offset]), &source[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, source)
}

/// Parse a YAML front matter block.
///
/// Without an `id` the block takes `fallback_id` (the build step passes the
/// file stem), then an id derived from title and artist. `title`, `artist`
/// and `key` are required.
pub fn parse_frontmatter(yaml: &str, fallback_id: Option<&str>) -> Result<SongFrontmatter, SheetError> {
    let raw: RawFrontmatter = if yaml.trim().is_empty() {
        RawFrontmatter::default()
    } else {
        serde_yaml::from_str(yaml).map_err(|e| SheetError::MetadataError(e.to_string()))?
    };

    let title = raw.title.ok_or_else(|| missing("title"))?;
    let artist = raw.artist.ok_or_else(|| missing("artist"))?;
    let key = raw.key.ok_or_else(|| missing("key"))?;
    let id = raw
        .id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| fallback_id.map(str::to_string))
        .or_else(|| derive_song_id(&title, &artist))
        .ok_or_else(|| missing("id"))?;

    let youtube_id = match raw.youtube_id {
        Some(input) => {
            let normalized = extract_youtube_id(&input);
            if normalized.is_none() {
                warn!(song = %id, value = %input, "ignoring unrecognized youtube_id");
            }
            normalized
        }
        None => None,
    };

    Ok(SongFrontmatter {
        id,
        title,
        artist,
        album: raw.album,
        key,
        capo: raw.capo.unwrap_or(0),
        youtube_id,
        chord_shapes: raw.chord_shapes,
        scroll_map: raw.scroll_map,
        tags: raw.tags.filter(|tags| !tags.is_empty()),
    })
}

fn missing(field: &str) -> SheetError {
    SheetError::MetadataError(format!("missing field `{}`", field))
}

/// Parse a complete song document (front matter + body)
pub fn parse_song_document(source: &str, fallback_id: Option<&str>) -> Result<SongContent, SheetError> {
    let (yaml, body) = extract_frontmatter(source);
    let yaml = yaml.ok_or_else(|| {
        SheetError::MetadataError("document must start with a `---` front matter block".to_string())
    })?;
    let frontmatter = parse_frontmatter(yaml, fallback_id)?;
    Ok(build_song(frontmatter, body))
}

/// URL-safe id: lowercase ASCII letters and digits, other runs collapsed to `-`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Id derived from title and artist, `None` if both slug to nothing
pub fn derive_song_id(title: &str, artist: &str) -> Option<String> {
    let slug = slugify(&format!("{}-{}", title.trim(), artist.trim()));
    (!slug.is_empty()).then_some(slug)
}
