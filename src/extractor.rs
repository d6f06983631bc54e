//! Top-level extraction facade
//!
//! Ties the reader, metadata resolution, section/phrase extraction and
//! rhythmic analysis together into one call that produces the full
//! serializable description of a SymbTr score.

use std::path::Path;

use serde::Serialize;

use crate::error::{ExtractorError, ExtractorResult};
use crate::metadata::reference::ReferenceData;
use crate::metadata::{Metadata, MetadataExtractor, MetadataService};
use crate::models::{Fragment, Score};
use crate::phrase::PhraseExtractor;
use crate::reader::{symbtr_name_from_path, TxtReader};
use crate::rhythm::{RhythmicFeatureExtractor, RhythmicStructure};
use crate::section::SectionExtractor;

/// A measured quantity with its unit
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValueUnit {
    pub value: f64,
    pub unit: String,
}

/// Expert-annotated phrases and automatically segmented phrases, side by side
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct Phrases {
    pub annotated: Vec<Fragment>,
    pub automatic: Vec<Fragment>,
}

/// Everything extracted from one score
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreData {
    #[serde(flatten)]
    pub metadata: Metadata,
    /// Total duration of the piece in seconds
    pub duration: ValueUnit,
    /// Number of sounding events (notes and rests with nonzero duration)
    pub number_of_notes: usize,
    pub sections: Vec<Fragment>,
    pub phrases: Phrases,
    pub rhythmic_structure: Vec<RhythmicStructure>,
}

/// Extracts the structural and metadata description of SymbTr scores
///
/// The extractor itself is cheap to construct and holds only configuration;
/// one instance can process any number of scores.
#[derive(Clone, Copy)]
pub struct SymbTrDataExtractor<'a> {
    ref_data: &'a ReferenceData,
    lyrics_sim_thres: f64,
    melody_sim_thres: f64,
    extract_all_labels: bool,
    metadata_service: Option<&'a dyn MetadataService>,
}

impl<'a> SymbTrDataExtractor<'a> {
    /// Create an extractor with the default similarity thresholds (0.75)
    pub fn new(ref_data: &'a ReferenceData) -> Self {
        SymbTrDataExtractor {
            ref_data,
            lyrics_sim_thres: 0.75,
            melody_sim_thres: 0.75,
            extract_all_labels: false,
            metadata_service: None,
        }
    }

    /// Override the lyric and melodic similarity thresholds
    ///
    /// Both thresholds are similarity ratios and must lie in `[0, 1]`.
    pub fn with_sim_thresholds(
        mut self,
        lyrics_sim_thres: f64,
        melody_sim_thres: f64,
    ) -> ExtractorResult<Self> {
        for thres in [lyrics_sim_thres, melody_sim_thres] {
            if !(0.0..=1.0).contains(&thres) {
                return Err(ExtractorError::InvalidParameter(format!(
                    "similarity threshold {} is outside [0, 1]",
                    thres
                )));
            }
        }
        self.lyrics_sim_thres = lyrics_sim_thres;
        self.melody_sim_thres = melody_sim_thres;
        Ok(self)
    }

    /// Treat every known label as a section marker, not only the structure
    /// group
    pub fn with_all_labels(mut self, extract_all_labels: bool) -> Self {
        self.extract_all_labels = extract_all_labels;
        self
    }

    /// Attach an external metadata registry for MBID resolution
    pub fn with_metadata_service(mut self, service: &'a dyn MetadataService) -> Self {
        self.metadata_service = Some(service);
        self
    }

    /// Extract a score from a SymbTr-txt file
    ///
    /// The score name is taken from the file stem. `segment_note_bounds`
    /// holds external 1-based note numbers from an automatic segmentation,
    /// if one was run. Returns the score data and an overall validity flag
    /// covering score content, metadata and section continuity.
    pub fn extract(
        &self,
        txt_path: &Path,
        mbid: Option<&str>,
        segment_note_bounds: Option<&[usize]>,
    ) -> ExtractorResult<(ScoreData, bool)> {
        let symbtr_name = symbtr_name_from_path(txt_path)?;
        let (score, is_score_valid) = TxtReader::read(txt_path, &symbtr_name)?;
        let (data, is_data_valid) =
            self.extract_from_score(&score, &symbtr_name, mbid, segment_note_bounds)?;
        Ok((data, is_score_valid && is_data_valid))
    }

    /// Extract from an already parsed score
    pub fn extract_from_score(
        &self,
        score: &Score,
        symbtr_name: &str,
        mbid: Option<&str>,
        segment_note_bounds: Option<&[usize]>,
    ) -> ExtractorResult<(ScoreData, bool)> {
        let metadata_extractor = MetadataExtractor::new(self.ref_data, self.metadata_service);
        let (metadata, is_metadata_valid) = metadata_extractor.get_metadata(symbtr_name, mbid)?;

        let section_extractor = SectionExtractor::new(
            self.ref_data,
            self.lyrics_sim_thres,
            self.melody_sim_thres,
            self.extract_all_labels,
        );
        let (sections, is_sections_valid) = section_extractor.extract(score, symbtr_name)?;

        let phrase_extractor =
            PhraseExtractor::new(self.ref_data, self.lyrics_sim_thres, self.melody_sim_thres);
        let annotated = phrase_extractor.extract_annotated(score, &sections)?;
        let automatic = match segment_note_bounds {
            Some(bounds) => phrase_extractor.extract_auto_segments(score, bounds, &sections)?,
            None => Vec::new(),
        };

        let rhythmic_structure = RhythmicFeatureExtractor::new(self.ref_data).extract(score)?;

        let data = ScoreData {
            metadata,
            duration: ValueUnit {
                value: score.duration.iter().map(|&d| d as f64).sum::<f64>() * 0.001,
                unit: "second".to_string(),
            },
            number_of_notes: score.duration.iter().filter(|&&d| d > 0).count(),
            sections,
            phrases: Phrases {
                annotated,
                automatic,
            },
            rhythmic_structure,
        };
        Ok((data, is_metadata_valid && is_sections_valid))
    }
}
