//! Structural analysis of SymbTr scores of Ottoman-Turkish makam music.
//!
//! The crate reads a machine-readable SymbTr-txt score, parses the metadata
//! encoded in its name, extracts the formal sections written into the lyrics
//! column, the expert-annotated phrases and the usul-governed rhythmic
//! regions, and assigns semiotic similarity labels (A1, B2, AB1, ...) to
//! every extracted fragment by comparing lyrics and melodies across the
//! piece.
//!
//! The typical entry point is [`SymbTrDataExtractor`]:
//!
//! ```no_run
//! use symbtr_extractor::{ReferenceData, SymbTrDataExtractor};
//!
//! # fn main() -> symbtr_extractor::ExtractorResult<()> {
//! let extractor = SymbTrDataExtractor::new(ReferenceData::builtin());
//! let (data, is_valid) = extractor.extract(
//!     std::path::Path::new("hicaz--sarki--aksak--ornek--bestekar.txt"),
//!     None,
//!     None,
//! )?;
//! println!("{}", serde_json::to_string_pretty(&data)?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extractor;
pub mod merge;
pub mod metadata;
pub mod models;
pub mod offset;
pub mod phrase;
pub mod reader;
pub mod rhythm;
pub mod section;
pub mod slug;
pub mod structure;

pub use error::{ExtractorError, ExtractorResult};
pub use extractor::{Phrases, ScoreData, SymbTrDataExtractor, ValueUnit};
pub use merge::merge;
pub use metadata::reference::ReferenceData;
pub use metadata::{Metadata, MetadataExtractor, MetadataService};
pub use models::{Fragment, Score, SectionRef};
pub use phrase::PhraseExtractor;
pub use reader::TxtReader;
pub use rhythm::{RhythmicFeatureExtractor, RhythmicStructure};
pub use section::SectionExtractor;
pub use structure::StructureLabeler;
