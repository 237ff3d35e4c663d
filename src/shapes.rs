//! Chord diagram lookup.
//!
//! A [`ChordLibrary`] maps chord names to fingering shapes. The built-in table
//! covers common open and barre guitar chords; a song's own `chord_shapes`
//! take precedence over it. A missing shape is normal and simply means no
//! diagram is shown.

use std::collections::BTreeMap;

use crate::ast::{ChordShape, Fret, SongContent};
use crate::render::RenderOptions;

/// Built-in shapes as `(name, frets low to high)`; `x` is a muted string
const BUILTIN_SHAPES: &[(&str, &str)] = &[
    ("A", "x02220"),
    ("Am", "x02210"),
    ("A7", "x02020"),
    ("Am7", "x02010"),
    ("Amaj7", "x02120"),
    ("Asus2", "x02200"),
    ("Asus4", "x02230"),
    ("Ab", "466544"),
    ("B", "x24442"),
    ("Bm", "x24432"),
    ("B7", "x21202"),
    ("Bm7", "x20202"),
    ("Bb", "x13331"),
    ("C", "x32010"),
    ("C7", "x32310"),
    ("Cmaj7", "x32000"),
    ("Cadd9", "x32030"),
    ("C#m", "x46654"),
    ("D", "xx0232"),
    ("Dm", "xx0231"),
    ("D7", "xx0212"),
    ("Dm7", "xx0211"),
    ("Dmaj7", "xx0222"),
    ("Dsus2", "xx0230"),
    ("Dsus4", "xx0233"),
    ("E", "022100"),
    ("Em", "022000"),
    ("E7", "020100"),
    ("Em7", "022030"),
    ("Emaj7", "021100"),
    ("Esus4", "022200"),
    ("Eb", "x68886"),
    ("F", "133211"),
    ("Fm", "133111"),
    ("F7", "131211"),
    ("Fmaj7", "xx3210"),
    ("F#", "244322"),
    ("F#m", "244222"),
    ("G", "320003"),
    ("Gm", "355333"),
    ("G7", "320001"),
    ("Gmaj7", "320002"),
    ("Gsus4", "330013"),
    ("G#m", "466444"),
];

/// Shape from a compact fret string such as `x32010`
pub fn shape_from_frets(frets: &str) -> ChordShape {
    let fretting = frets
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(n) => Fret::At(n as u8),
            None => Fret::Muted,
        })
        .collect::<Vec<_>>();
    ChordShape {
        strings: u8::try_from(fretting.len()).ok(),
        fretting,
        fingering: None,
        base_fret: None,
        label: None,
    }
}

/// Compact fret string of a shape, `x32010` style; frets above 9 are
/// written in parentheses
pub fn frets_string(shape: &ChordShape) -> String {
    shape
        .fretting
        .iter()
        .map(|fret| match fret {
            Fret::Muted => "x".to_string(),
            Fret::At(n) if *n < 10 => n.to_string(),
            Fret::At(n) => format!("({})", n),
        })
        .collect()
}

/// Name -> shape table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChordLibrary {
    shapes: BTreeMap<String, ChordShape>,
}

impl ChordLibrary {
    pub fn builtin() -> Self {
        let shapes = BUILTIN_SHAPES
            .iter()
            .map(|(name, frets)| (name.to_string(), shape_from_frets(frets)))
            .collect();
        Self { shapes }
    }

    pub fn insert(&mut self, name: impl Into<String>, shape: ChordShape) {
        self.shapes.insert(name.into(), shape);
    }

    pub fn get(&self, name: &str) -> Option<&ChordShape> {
        self.shapes.get(name)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// This library with the song's own shapes layered on top
    pub fn for_song(&self, song: &SongContent) -> ChordLibrary {
        let mut library = self.clone();
        if let Some(shapes) = &song.frontmatter.chord_shapes {
            for (name, shape) in shapes {
                library.insert(name.clone(), shape.clone());
            }
        }
        library
    }

    /// Shape for a displayed chord, falling back to the authored name
    pub fn resolve(&self, displayed: &str, authored: &str) -> Option<&ChordShape> {
        self.get(displayed).or_else(|| self.get(authored))
    }
}

/// One chord of a song as it would be shown in the diagram panel
#[derive(Debug, Clone, PartialEq)]
pub struct ChordDiagram {
    /// Name as written in the song
    pub authored: String,
    /// Name after transpose and capo
    pub displayed: String,
    pub shape: Option<ChordShape>,
}

/// Diagrams for every unique chord of `song` under `opts`, in
/// `unique_chords` order
pub fn diagrams_for(song: &SongContent, library: &ChordLibrary, opts: &RenderOptions) -> Vec<ChordDiagram> {
    let library = library.for_song(song);
    let opts = opts.for_key(&song.frontmatter.key);
    song.unique_chords
        .iter()
        .map(|authored| {
            let displayed = opts.chord_name(authored);
            let shape = library.resolve(&displayed, authored).cloned();
            ChordDiagram {
                authored: authored.clone(),
                displayed,
                shape,
            }
        })
        .collect()
}
