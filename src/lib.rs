pub mod ast;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lexer;
pub mod overlay;
pub mod render;
pub mod shapes;
pub mod song;
pub mod sync;
pub mod transpose;
pub mod youtube;

use std::path::Path;

pub use ast::*;
pub use catalog::{facets, filter, merge, search, Catalog, Facets, FilterCriteria, FuzzySearch, SearchEngine};
pub use config::Config;
pub use error::*;
pub use lexer::{parse_chord_token, tokenize_body, tokenize_line};
pub use overlay::{BlobStore, FileBlobStore, MemoryBlobStore, OverlayStore};
pub use render::{render_song, to_markdown, DisplayMode, RenderOptions};
pub use song::{build_song, parse_song_document};
pub use transpose::{apply_capo, transpose_chord_name};

/// The catalog readers see: the configured baseline (if any) with the local
/// overlay layered on top.
pub fn load_catalog(config: &Config) -> Result<Catalog, SheetError> {
    let baseline = match &config.baseline {
        Some(path) => catalog::load_baseline(path)?,
        None => Catalog::default(),
    };
    let overlay = config.overlay_store().load();
    Ok(merge(&baseline, &overlay))
}

/// Build a catalog from every `.md` song document under `dir`
pub fn build_catalog_dir(dir: &Path) -> Result<Catalog, SheetError> {
    let documents = catalog::read_song_documents(dir)?;
    Ok(catalog::build_catalog(documents))
}
