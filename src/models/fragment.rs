//! Structural fragments: sections, phrases and segments
//!
//! All three granularities share one record shape. During boundary
//! resolution a fragment may have an unresolved start or end; the
//! [`Boundary`] state makes that explicit instead of relying on missing
//! map keys the way loosely-typed pipelines tend to.

use serde::Serialize;

use crate::error::{ExtractorError, ExtractorResult};

/// One endpoint of a fragment during the two-phase resolution algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Not yet determined; resolved in the reverse pass
    Unresolved,
    /// Resolved 0-based local note index
    Note(usize),
}

impl Boundary {
    /// The resolved index, if any
    pub fn get(&self) -> Option<usize> {
        match self {
            Boundary::Unresolved => None,
            Boundary::Note(i) => Some(*i),
        }
    }

    /// The resolved index, or an invariant violation when still unresolved
    pub fn resolved(&self, what: &str) -> ExtractorResult<usize> {
        self.get().ok_or_else(|| {
            ExtractorError::InvariantViolation(format!("{} boundary left unresolved", what))
        })
    }
}

/// A section under construction, before both boundaries are known
#[derive(Debug, Clone)]
pub struct PendingSection {
    /// Human-readable name (explicit label text, or VOCAL_SECTION)
    pub name: String,
    /// Slugified name
    pub slug: String,
    /// Start boundary (unresolved for lyric-end marker sections)
    pub start_note: Boundary,
    /// End boundary (unresolved for explicit-label sections)
    pub end_note: Boundary,
    /// Concatenated true lyrics, filled once the span is final
    pub lyrics: String,
}

/// Cross-reference from a phrase/segment to the section(s) containing it
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectionRef {
    /// Index of the section in the extracted section list
    pub section_idx: usize,
    /// The section's melodic structure label
    pub melodic_structure: String,
    /// The section's lyric structure label
    pub lyric_structure: String,
}

/// A resolved structural fragment
///
/// `start_note`/`end_note` are 0-based local indices while the fragment
/// flows through labeling, and are remapped to the score's external 1-based
/// `index` numbering before being returned to the caller.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Fragment {
    /// Human-readable name
    pub name: String,
    /// Slugified name
    pub slug: String,
    /// First note of the span (inclusive)
    pub start_note: usize,
    /// Last note of the span (inclusive)
    pub end_note: usize,
    /// Concatenated true lyrics within the span
    pub lyrics: String,
    /// Semiotic label from the lyric organization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyric_structure: Option<String>,
    /// Semiotic label from the melodic organization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub melodic_structure: Option<String>,
    /// Cesni/flavor annotations within the span (phrases/segments only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flavor: Vec<String>,
    /// Containing sections (phrases/segments only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SectionRef>,
}

impl Fragment {
    /// Create a fragment with resolved boundaries and no labels yet
    pub fn new(name: &str, slug: &str, start_note: usize, end_note: usize, lyrics: String) -> Self {
        Fragment {
            name: name.to_string(),
            slug: slug.to_string(),
            start_note,
            end_note,
            lyrics,
            lyric_structure: None,
            melodic_structure: None,
            flavor: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Remap the local 0-based boundaries to the score's external indices
    pub fn to_symbtr_idx(&mut self, index: &[usize]) {
        self.start_note = index[self.start_note];
        self.end_note = index[self.end_note];
    }
}
