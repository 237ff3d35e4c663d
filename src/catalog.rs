//! # Catalog Index
//!
//! A catalog is the song map plus its denormalized search entries. Two exist at
//! runtime: the read-only baseline (published catalog file) and the local
//! overlay. Readers only ever see [`merge`] of the two.
//!
//! ## Queries
//! - [`filter`] - conjunctive exact-match criteria (artist, key, capo, tags ⊆ entry tags)
//! - [`search`] - fuzzy ranking from a [`SearchEngine`], intersected with a filter
//! - [`facets`] - distinct artists, keys, capos and tags for filter menus
//!
//! ## Ordering
//! Entry lists are sorted by title with accents folded and case ignored
//! first, so `Émotion` files under E. The sort is stable, so equal titles keep
//! their insertion order.
//!
//! ## Example
//! ```rust
//! use chordsheet::catalog::{facets, filter, merge, Catalog, FilterCriteria};
//! use chordsheet::parse_song_document;
//!
//! let song = parse_song_document("---\ntitle: B\nartist: X\nkey: G\n---\n[G]x", Some("b")).unwrap();
//! let baseline = Catalog::from_songs([song]);
//! let merged = merge(&baseline, &Catalog::default());
//!
//! let criteria = FilterCriteria { key: Some("G".to_string()), ..Default::default() };
//! assert_eq!(filter(&merged.entries, &criteria).len(), 1);
//! assert_eq!(facets(&merged.entries).artists, vec!["X"]);
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

use crate::ast::{SearchIndexEntry, SongContent};
use crate::error::SheetError;
use crate::song::parse_song_document;

/// Song map plus search entries, in the published `{entries, songs}` shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub entries: Vec<SearchIndexEntry>,
    pub songs: BTreeMap<String, SongContent>,
}

impl Catalog {
    /// Catalog of `songs` with one entry each; a later song with the same id
    /// replaces an earlier one.
    pub fn from_songs(songs: impl IntoIterator<Item = SongContent>) -> Self {
        let mut catalog = Catalog::default();
        for song in songs {
            catalog.upsert_song(song);
        }
        catalog
    }

    /// Parse a baseline catalog. Any shape other than `{entries, songs}` is an error.
    pub fn from_json(text: &str) -> Result<Self, SheetError> {
        serde_json::from_str(text).map_err(|e| SheetError::CatalogError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, SheetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn song(&self, id: &str) -> Option<&SongContent> {
        self.songs.get(id)
    }

    pub fn entry(&self, id: &str) -> Option<&SearchIndexEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Insert or replace a song and its entry, keeping entries sorted by title
    pub fn upsert_song(&mut self, song: SongContent) {
        let entry = song.index_entry();
        let entries = std::mem::take(&mut self.entries);
        self.entries = merge_entries(entries.into_iter().chain(std::iter::once(entry)));
        self.songs.insert(song.frontmatter.id.clone(), song);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.songs.is_empty()
    }
}

/// Read a baseline catalog file
pub fn load_baseline(path: &Path) -> Result<Catalog, SheetError> {
    let text = fs::read_to_string(path).map_err(|e| SheetError::io(path, e))?;
    let catalog = Catalog::from_json(&text)?;
    debug!(path = %path.display(), entries = catalog.entries.len(), "loaded baseline catalog");
    Ok(catalog)
}

/// Build a catalog from `(fallback_id, document)` pairs.
///
/// Documents that fail to parse are skipped with a warning.
pub fn build_catalog<I, S>(documents: I) -> Catalog
where
    I: IntoIterator<Item = (S, String)>,
    S: AsRef<str>,
{
    let mut songs = Vec::new();
    for (fallback_id, source) in documents {
        match parse_song_document(&source, Some(fallback_id.as_ref())) {
            Ok(song) => songs.push(song),
            Err(e) => warn!(document = fallback_id.as_ref(), error = %e, "skipping song"),
        }
    }
    let catalog = Catalog::from_songs(songs);
    debug!(songs = catalog.songs.len(), "built catalog");
    catalog
}

/// Every `.md` document under `dir` as `(file stem, contents)`, in path order.
///
/// Unreadable files are skipped with a warning.
pub fn read_song_documents(dir: &Path) -> Result<Vec<(String, String)>, SheetError> {
    if !dir.is_dir() {
        return Err(SheetError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "md"))
    {
        let path = entry.path();
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        match fs::read_to_string(path) {
            Ok(content) => documents.push((stem, content)),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable song"),
        }
    }
    Ok(documents)
}

/// Sort key of a title: decomposed, combining marks dropped, lowercased
fn title_key(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Title order: folded key first, then case-insensitive, raw text as tie-break
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    title_key(a)
        .cmp(&title_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Deduplicate entries by id (last wins, first position kept) and sort by title
fn merge_entries(entries: impl IntoIterator<Item = SearchIndexEntry>) -> Vec<SearchIndexEntry> {
    let mut merged: Vec<SearchIndexEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        match positions.get(&entry.id) {
            Some(&pos) => merged[pos] = entry,
            None => {
                positions.insert(entry.id.clone(), merged.len());
                merged.push(entry);
            }
        }
    }
    merged.sort_by(|a, b| compare_titles(&a.title, &b.title));
    merged
}

/// Layer `overlay` over `baseline`; the overlay wins on every shared id
pub fn merge(baseline: &Catalog, overlay: &Catalog) -> Catalog {
    let mut songs = baseline.songs.clone();
    songs.extend(overlay.songs.iter().map(|(id, song)| (id.clone(), song.clone())));

    let entries = merge_entries(
        baseline
            .entries
            .iter()
            .chain(overlay.entries.iter())
            .cloned(),
    );

    debug!(
        baseline = baseline.songs.len(),
        overlay = overlay.songs.len(),
        merged = songs.len(),
        "merged catalogs"
    );
    Catalog { entries, songs }
}

/// Conjunctive filter; unset (or empty) fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub artist: Option<String>,
    pub key: Option<String>,
    pub capo: Option<u32>,
    /// Every listed tag must be on the entry
    pub tags: Option<Vec<String>>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        active(&self.artist).is_none()
            && active(&self.key).is_none()
            && self.capo.is_none()
            && self.tags.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn matches(&self, entry: &SearchIndexEntry) -> bool {
        if active(&self.artist).is_some_and(|artist| entry.artist != artist) {
            return false;
        }
        if active(&self.key).is_some_and(|key| entry.key != key) {
            return false;
        }
        if self.capo.is_some_and(|capo| entry.capo != capo) {
            return false;
        }
        match &self.tags {
            Some(wanted) if !wanted.is_empty() => {
                let have = entry.tags.as_deref().unwrap_or_default();
                wanted.iter().all(|tag| have.contains(tag))
            }
            _ => true,
        }
    }
}

fn active(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Entries matching every active criterion, in their original order
pub fn filter(entries: &[SearchIndexEntry], criteria: &FilterCriteria) -> Vec<SearchIndexEntry> {
    entries
        .iter()
        .filter(|entry| criteria.matches(entry))
        .cloned()
        .collect()
}

/// Fuzzy text ranking collaborator.
///
/// Implementations rank over an entry's title, artist, tags and key.
pub trait SearchEngine {
    /// Indices into `entries` of the matches, best first
    fn rank(&self, entries: &[SearchIndexEntry], query: &str) -> Vec<usize>;
}

/// Text fields a search engine looks at
pub fn searchable_fields(entry: &SearchIndexEntry) -> Vec<&str> {
    let mut fields = vec![entry.title.as_str(), entry.artist.as_str()];
    if let Some(tags) = &entry.tags {
        fields.extend(tags.iter().map(String::as_str));
    }
    fields.push(entry.key.as_str());
    fields
}

/// Default engine: substring hits score 0, otherwise edit distance against the
/// whole field and against every run of words as long as the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzySearch {
    /// Maximum accepted score; 0 is exact, 1 accepts anything
    pub threshold: f64,
}

impl Default for FuzzySearch {
    fn default() -> Self {
        Self { threshold: 0.35 }
    }
}

impl FuzzySearch {
    /// Score of `query` (already lowercased) against one field
    fn score_field(query: &str, field: &str) -> f64 {
        let field = field.to_lowercase();
        if field.contains(query) {
            return 0.0;
        }

        let mut best = 1.0 - normalized_levenshtein(query, &field);
        let words: Vec<&str> = field.split_whitespace().collect();
        let width = query.split_whitespace().count().max(1);
        if words.len() > width {
            for window in words.windows(width) {
                let candidate = window.join(" ");
                best = best.min(1.0 - normalized_levenshtein(query, &candidate));
            }
        }
        best
    }

    fn score(&self, entry: &SearchIndexEntry, query: &str) -> f64 {
        searchable_fields(entry)
            .into_iter()
            .map(|field| Self::score_field(query, field))
            .fold(1.0, f64::min)
    }
}

impl SearchEngine for FuzzySearch {
    fn rank(&self, entries: &[SearchIndexEntry], query: &str) -> Vec<usize> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, self.score(entry, &query)))
            .filter(|(_, score)| *score <= self.threshold)
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.into_iter().map(|(i, _)| i).collect()
    }
}

/// Ranked search results restricted to entries passing `criteria`.
///
/// A blank query returns the filtered entries unranked.
pub fn search(
    entries: &[SearchIndexEntry],
    query: &str,
    engine: &dyn SearchEngine,
    criteria: &FilterCriteria,
) -> Vec<SearchIndexEntry> {
    let filtered = filter(entries, criteria);
    if query.trim().is_empty() {
        return filtered;
    }

    let allowed: HashSet<&str> = filtered.iter().map(|e| e.id.as_str()).collect();
    let mut seen = HashSet::new();
    engine
        .rank(entries, query)
        .into_iter()
        .filter_map(|i| entries.get(i))
        .filter(|entry| allowed.contains(entry.id.as_str()) && seen.insert(entry.id.as_str()))
        .cloned()
        .collect()
}

/// Distinct filter values across a set of entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub artists: Vec<String>,
    pub keys: Vec<String>,
    pub capos: Vec<u32>,
    pub tags: Vec<String>,
}

/// Sorted distinct artists, keys, capos (numeric) and tags
pub fn facets(entries: &[SearchIndexEntry]) -> Facets {
    let artists: BTreeSet<&str> = entries.iter().map(|e| e.artist.as_str()).collect();
    let keys: BTreeSet<&str> = entries.iter().map(|e| e.key.as_str()).collect();
    let capos: BTreeSet<u32> = entries.iter().map(|e| e.capo).collect();
    let tags: BTreeSet<&str> = entries
        .iter()
        .flat_map(|e| e.tags.iter().flatten())
        .map(String::as_str)
        .collect();

    Facets {
        artists: artists.into_iter().map(str::to_string).collect(),
        keys: keys.into_iter().map(str::to_string).collect(),
        capos: capos.into_iter().collect(),
        tags: tags.into_iter().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::build_song;
    use crate::ast::SongFrontmatter;

    fn song(id: &str, title: &str, artist: &str, key: &str, capo: u32, tags: &[&str]) -> SongContent {
        let frontmatter = SongFrontmatter {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: None,
            key: key.to_string(),
            capo,
            youtube_id: None,
            chord_shapes: None,
            scroll_map: None,
            tags: if tags.is_empty() {
                None
            } else {
                Some(tags.iter().map(|t| t.to_string()).collect())
            },
        };
        build_song(frontmatter, "[G]la la")
    }

    fn sample() -> Catalog {
        Catalog::from_songs([
            song("ww", "Wonderwall", "Oasis", "F#m", 2, &["britpop", "acoustic"]),
            song("hc", "Hotel California", "Eagles", "Bm", 7, &["rock"]),
            song("lib", "Let It Be", "The Beatles", "C", 0, &["rock", "piano"]),
            song("hey", "Hey Jude", "The Beatles", "F", 0, &[]),
            song("dm", "Don't Look Back in Anger", "Oasis", "C", 0, &["britpop"]),
        ])
    }

    fn ids(entries: &[SearchIndexEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_from_songs_sorted_by_title() {
        let catalog = sample();
        assert_eq!(ids(&catalog.entries), vec!["dm", "hey", "hc", "lib", "ww"]);
        assert_eq!(catalog.songs.len(), 5);
    }

    #[test]
    fn test_title_order_ignores_case() {
        assert_eq!(compare_titles("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_titles("Zebra", "apple"), Ordering::Greater);
        assert_eq!(compare_titles("abc", "abc"), Ordering::Equal);
    }

    #[test]
    fn test_accented_titles_sort_with_base_letter() {
        let catalog = Catalog::from_songs([
            song("z", "Zombie", "The Cranberries", "Em", 0, &[]),
            song("e", "Émotion", "Daniel Bélanger", "D", 0, &[]),
            song("a", "Angel", "Sarah McLachlan", "Db", 0, &[]),
        ]);
        let titles: Vec<&str> = catalog.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Angel", "Émotion", "Zombie"]);

        assert_eq!(compare_titles("Émotion", "Emotion"), Ordering::Greater);
        assert_eq!(compare_titles("émotion", "Emotion"), Ordering::Greater);
        assert_eq!(compare_titles("Café", "Cafe Racer"), Ordering::Less);
    }

    #[test]
    fn test_merge_overlay_wins() {
        let baseline = sample();
        let overlay = Catalog::from_songs([
            song("ww", "Wonderwall (live)", "Oasis", "Em", 0, &[]),
            song("new", "Apples", "Me", "G", 0, &[]),
        ]);

        let merged = merge(&baseline, &overlay);
        assert_eq!(merged.songs.len(), 6);
        assert_eq!(merged.songs["ww"], overlay.songs["ww"]);
        assert_eq!(merged.songs["hc"], baseline.songs["hc"]);
        assert_eq!(merged.entries.len(), 6);
        assert_eq!(merged.entry("ww").map(|e| e.key.as_str()), Some("Em"));
        assert_eq!(merged.entries[0].id, "new");

        // Exactly one entry per id
        let unique: HashSet<&str> = merged.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(unique.len(), merged.entries.len());
    }

    #[test]
    fn test_merge_contains_every_id() {
        let baseline = sample();
        let overlay = Catalog::from_songs([song("x", "X", "Y", "C", 0, &[])]);
        let merged = merge(&baseline, &overlay);
        for id in baseline.songs.keys().chain(overlay.songs.keys()) {
            assert!(merged.songs.contains_key(id), "{}", id);
        }
    }

    #[test]
    fn test_merge_with_empty_sides() {
        let baseline = sample();
        assert_eq!(merge(&baseline, &Catalog::default()), baseline);
        assert_eq!(merge(&Catalog::default(), &baseline), baseline);
    }

    #[test]
    fn test_filter_by_fields() {
        let entries = sample().entries;

        let by_artist = FilterCriteria {
            artist: Some("Oasis".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&entries, &by_artist)), vec!["dm", "ww"]);

        let by_key_and_capo = FilterCriteria {
            key: Some("C".to_string()),
            capo: Some(0),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&entries, &by_key_and_capo)), vec!["dm", "lib"]);

        let capo_seven = FilterCriteria {
            capo: Some(7),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&entries, &capo_seven)), vec!["hc"]);
    }

    #[test]
    fn test_filter_tags_is_subset_test() {
        let entries = sample().entries;
        let both = FilterCriteria {
            tags: Some(vec!["rock".to_string(), "piano".to_string()]),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&entries, &both)), vec!["lib"]);

        let rock = FilterCriteria {
            tags: Some(vec!["rock".to_string()]),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&entries, &rock)), vec!["hc", "lib"]);
    }

    #[test]
    fn test_empty_criteria_match_all() {
        let entries = sample().entries;
        let empty = FilterCriteria {
            artist: Some(String::new()),
            tags: Some(Vec::new()),
            ..Default::default()
        };
        assert!(empty.is_empty());
        // Entries without tags still pass an empty tag criterion
        assert_eq!(filter(&entries, &empty).len(), entries.len());
    }

    #[test]
    fn test_fuzzy_search_ranks_matches() {
        let entries = sample().entries;
        let engine = FuzzySearch::default();

        let hits = search(&entries, "wonderwal", &engine, &FilterCriteria::default());
        assert_eq!(ids(&hits), vec!["ww"]);

        let typo = search(&entries, "hotell", &engine, &FilterCriteria::default());
        assert_eq!(ids(&typo)[0], "hc");

        let artist = search(&entries, "beatles", &engine, &FilterCriteria::default());
        assert_eq!(ids(&artist), vec!["hey", "lib"]);

        let tag = search(&entries, "britpop", &engine, &FilterCriteria::default());
        assert_eq!(ids(&tag), vec!["dm", "ww"]);

        assert!(search(&entries, "zzzzzz", &engine, &FilterCriteria::default()).is_empty());
    }

    #[test]
    fn test_search_intersects_filter() {
        let entries = sample().entries;
        let engine = FuzzySearch::default();
        let criteria = FilterCriteria {
            key: Some("F#m".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&search(&entries, "oasis", &engine, &criteria)), vec!["ww"]);
    }

    #[test]
    fn test_blank_query_returns_filtered() {
        let entries = sample().entries;
        let criteria = FilterCriteria {
            artist: Some("The Beatles".to_string()),
            ..Default::default()
        };
        let hits = search(&entries, "  ", &FuzzySearch::default(), &criteria);
        assert_eq!(ids(&hits), vec!["hey", "lib"]);
    }

    struct Reversed;

    impl SearchEngine for Reversed {
        fn rank(&self, entries: &[SearchIndexEntry], _query: &str) -> Vec<usize> {
            // Out-of-range and duplicate indices must be tolerated
            let mut order: Vec<usize> = (0..entries.len()).rev().collect();
            order.push(0);
            order.push(99);
            order
        }
    }

    #[test]
    fn test_search_keeps_engine_order() {
        let entries = sample().entries;
        let criteria = FilterCriteria {
            tags: Some(vec!["britpop".to_string()]),
            ..Default::default()
        };
        let hits = search(&entries, "anything", &Reversed, &criteria);
        assert_eq!(ids(&hits), vec!["ww", "dm"]);
    }

    #[test]
    fn test_facets() {
        let facets = facets(&sample().entries);
        assert_eq!(facets.artists, vec!["Eagles", "Oasis", "The Beatles"]);
        assert_eq!(facets.keys, vec!["Bm", "C", "F", "F#m"]);
        assert_eq!(facets.capos, vec![0, 2, 7]);
        assert_eq!(facets.tags, vec!["acoustic", "britpop", "piano", "rock"]);
    }

    #[test]
    fn test_capo_facets_are_numeric() {
        let catalog = Catalog::from_songs([
            song("a", "A", "X", "C", 10, &[]),
            song("b", "B", "X", "C", 9, &[]),
            song("c", "C", "X", "C", 1, &[]),
        ]);
        assert_eq!(facets(&catalog.entries).capos, vec![1, 9, 10]);
    }

    #[test]
    fn test_baseline_shape_is_checked() {
        assert!(matches!(
            Catalog::from_json(r#"{"entries": []}"#),
            Err(SheetError::CatalogError(_))
        ));
        assert!(matches!(
            Catalog::from_json("[1, 2, 3]"),
            Err(SheetError::CatalogError(_))
        ));
        let empty = Catalog::from_json(r#"{"entries": [], "songs": {}}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let catalog = sample();
        let json = catalog.to_json_pretty().unwrap();
        assert!(json.contains("\"uniqueChords\""));
        assert_eq!(Catalog::from_json(&json).unwrap(), catalog);
    }

    #[test]
    fn test_read_song_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested").join("one.md"),
            "---\ntitle: One\nartist: A\nkey: C\n---\n[C]x",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = read_song_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "one");

        let catalog = build_catalog(docs);
        assert_eq!(catalog.song("one").map(|s| s.frontmatter.title.as_str()), Some("One"));

        assert!(matches!(
            read_song_documents(&dir.path().join("missing")),
            Err(SheetError::Io { .. })
        ));
    }

    #[test]
    fn test_build_catalog_skips_bad_documents() {
        let docs = vec![
            ("good", "---\ntitle: Good\nartist: A\nkey: G\n---\n[G]ok".to_string()),
            ("bad", "no front matter".to_string()),
        ];
        let catalog = build_catalog(docs);
        assert_eq!(ids(&catalog.entries), vec!["good"]);
        assert!(catalog.song("bad").is_none());
    }
}
