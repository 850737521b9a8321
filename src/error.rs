//! Error types for the layout engine and the MusicXML importer.
//!
//! Layout, addressing and geometry never fail: bad geometry is clamped and
//! unknown pitches fall back to the staff center. Errors only surface where
//! data enters the crate (time-signature edits, settings strings, imports).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A second time-signature change was inserted at a measure that
    /// already carries one.
    #[error("a time signature change already exists at measure {measure}")]
    DuplicateTimeSignatureChange { measure: u32 },

    #[error("invalid time signature {numerator}/{denominator}")]
    InvalidTimeSignature { numerator: u32, denominator: u32 },

    /// A measures-per-row setting that is neither "auto" nor a positive integer.
    #[error("invalid measures-per-row preference '{0}'")]
    InvalidPreference(String),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unsupported root element '{0}', only 'score-partwise' is supported")]
    UnsupportedRoot(String),

    #[error("failed to read MXL archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("no MusicXML file found in archive (files: {0:?})")]
    MissingRootFile(Vec<String>),

    #[error("invalid UTF-8 in MusicXML file: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
