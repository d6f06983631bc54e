//! Score readers
//!
//! Only the SymbTr-txt representation is supported for analysis; the mu2 and
//! MusicXML representations carry the same music but lack the offset and
//! lyrics conventions the extraction relies on, so asking for them fails
//! explicitly instead of degrading silently.

pub mod txt;

use std::path::Path;

use crate::error::{ExtractorError, ExtractorResult};
use crate::models::Score;

pub use txt::TxtReader;

/// Score name derived from a file path (the stem, without extension)
pub fn symbtr_name_from_path(path: &Path) -> ExtractorResult<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ExtractorError::MalformedScoreName(path.display().to_string())
        })
}

/// mu2 scores are not supported
pub fn read_mu2(_path: &Path) -> ExtractorResult<(Score, bool)> {
    Err(ExtractorError::UnsupportedFormat("mu2".to_string()))
}

/// MusicXML scores are not supported
pub fn read_musicxml(_path: &Path) -> ExtractorResult<(Score, bool)> {
    Err(ExtractorError::UnsupportedFormat("musicxml".to_string()))
}
