//! # Error Types
//!
//! Errors that cross the library boundary. Most of the engine degrades instead
//! of failing: malformed chord brackets become lyric text, untransposable names
//! pass through unchanged and a corrupt overlay loads as empty. What remains
//! here are the hard failures:
//!
//! - `MetadataError` - a song document has missing or invalid front matter
//! - `CatalogError` - a baseline catalog does not have the `{entries, songs}` shape
//! - `ConfigError` - the config file could not be parsed
//! - `Io` - a file could not be read or written
//! - `Json` - a catalog could not be serialized
//!
//! ## Usage
//! ```rust
//! use chordsheet::{parse_song_document, SheetError};
//!
//! match parse_song_document("no front matter here", None) {
//!     Ok(song) => println!("{}", song.frontmatter.title),
//!     Err(SheetError::MetadataError(message)) => eprintln!("bad song: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetError {
    /// Invalid front matter.
    ///
    /// # Example
    /// ```
    /// # use chordsheet::SheetError;
    /// let err = SheetError::MetadataError("missing field `title`".to_string());
    /// assert_eq!(err.to_string(), "Invalid front matter: missing field `title`");
    /// ```
    #[error("Invalid front matter: {0}")]
    MetadataError(String),

    /// Baseline catalog with the wrong shape.
    ///
    /// This is a boundary precondition violation and is never retried.
    #[error("Invalid catalog: {0}")]
    CatalogError(String),

    /// Config file that is not valid YAML or has unknown keys
    #[error("Invalid config: {0}")]
    ConfigError(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SheetError::Io {
            path: path.into(),
            source,
        }
    }
}
