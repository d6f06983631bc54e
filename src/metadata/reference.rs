//! Reference data tables for makam, usul, form and structure labels
//!
//! The tables are plain JSON key-value files. A built-in set is embedded in
//! the binary; alternative tables can be loaded from disk. The loaded value
//! is read-only and is passed by reference into every component, so one
//! `ReferenceData` can safely be shared across concurrent score analyses.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::ExtractorResult;

/// Theoretical attributes of a makam (melodic mode)
#[derive(Debug, Clone, Deserialize)]
pub struct MakamEntry {
    /// Slug used in SymbTr score names
    pub symbtr_slug: String,
    /// Display name in the mu2 format
    pub mu2_name: String,
    /// Name used by the external metadata registry
    pub dunya_name: String,
    /// Tonic (karar) note symbol
    pub karar_symbol: String,
    /// Key signature as accidental symbols
    pub key_signature: Vec<String>,
}

/// A notational variant of an usul
#[derive(Debug, Clone, Deserialize)]
pub struct UsulVariant {
    /// Label text as written in mu2 files and usul rows
    pub mu2_name: String,
    /// Metrical subdivision unit of the cycle
    pub mertebe: u32,
    /// Number of pulses in one cycle
    pub num_pulses: u32,
}

/// Attributes of an usul (rhythmic cycle)
#[derive(Debug, Clone, Deserialize)]
pub struct UsulEntry {
    /// Slug used in SymbTr score names
    pub symbtr_slug: String,
    /// Name used by the external metadata registry
    pub dunya_name: String,
    /// Known notational variants
    pub variants: Vec<UsulVariant>,
}

/// Attributes of a form
#[derive(Debug, Clone, Deserialize)]
pub struct FormEntry {
    /// Slug used in SymbTr score names
    pub symbtr_slug: String,
    /// Display name in the mu2 format
    pub mu2_name: String,
    /// Name used by the external metadata registry
    pub dunya_name: String,
}

/// Label strings that may appear in the lyrics column without being lyrics
#[derive(Debug, Clone, Deserialize)]
pub struct StructureLabels {
    /// Named formal sections (e.g. NAKARAT, MEYAN)
    pub structure: Vec<String>,
    /// Cesni/flavor annotations
    pub flavor: Vec<String>,
    /// Tempo directives
    pub tempo: Vec<String>,
}

impl StructureLabels {
    /// Every known label across all groups
    pub fn all(&self) -> Vec<String> {
        self.structure
            .iter()
            .chain(self.flavor.iter())
            .chain(self.tempo.iter())
            .cloned()
            .collect()
    }
}

/// The full reference-data set used throughout an extraction
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceData {
    /// Makam table, keyed by attribute key
    pub makam: HashMap<String, MakamEntry>,
    /// Usul table, keyed by attribute key
    pub usul: HashMap<String, UsulEntry>,
    /// Form table, keyed by attribute key
    pub form: HashMap<String, FormEntry>,
    /// Lyrics-column label groups
    pub labels: StructureLabels,
}

static BUILTIN: Lazy<ReferenceData> = Lazy::new(|| {
    ReferenceData::from_json_strs(
        include_str!("../../data/makam.json"),
        include_str!("../../data/usul.json"),
        include_str!("../../data/form.json"),
        include_str!("../../data/labels.json"),
    )
    .expect("built-in reference data must parse")
});

impl ReferenceData {
    /// The built-in table set shipped with the crate
    pub fn builtin() -> &'static ReferenceData {
        &BUILTIN
    }

    /// Parse the four tables from JSON strings
    pub fn from_json_strs(
        makam: &str,
        usul: &str,
        form: &str,
        labels: &str,
    ) -> ExtractorResult<Self> {
        Ok(ReferenceData {
            makam: serde_json::from_str(makam)?,
            usul: serde_json::from_str(usul)?,
            form: serde_json::from_str(form)?,
            labels: serde_json::from_str(labels)?,
        })
    }

    /// Load the four tables from JSON files
    pub fn from_files(
        makam: &Path,
        usul: &Path,
        form: &Path,
        labels: &Path,
    ) -> ExtractorResult<Self> {
        Self::from_json_strs(
            &std::fs::read_to_string(makam)?,
            &std::fs::read_to_string(usul)?,
            &std::fs::read_to_string(form)?,
            &std::fs::read_to_string(labels)?,
        )
    }

    /// Makam entry matching a SymbTr slug
    pub fn makam_by_slug(&self, slug: &str) -> Option<&MakamEntry> {
        self.makam.values().find(|m| m.symbtr_slug == slug)
    }

    /// Usul entry matching a SymbTr slug
    pub fn usul_by_slug(&self, slug: &str) -> Option<&UsulEntry> {
        self.usul.values().find(|u| u.symbtr_slug == slug)
    }

    /// Form entry matching a SymbTr slug
    pub fn form_by_slug(&self, slug: &str) -> Option<&FormEntry> {
        self.form.values().find(|f| f.symbtr_slug == slug)
    }

    /// Attribute key of the makam/usul/form with the given slug
    pub fn attribute_key(&self, attribute: &str, slug: &str) -> Option<String> {
        match attribute {
            "makam" => self
                .makam
                .iter()
                .find(|(_, v)| v.symbtr_slug == slug)
                .map(|(k, _)| k.clone()),
            "usul" => self
                .usul
                .iter()
                .find(|(_, v)| v.symbtr_slug == slug)
                .map(|(k, _)| k.clone()),
            "form" => self
                .form
                .iter()
                .find(|(_, v)| v.symbtr_slug == slug)
                .map(|(k, _)| k.clone()),
            _ => None,
        }
    }

    /// Usul attribute key matching a variant's mu2 label text
    pub fn usul_key_from_mu2(&self, mu2_name: &str) -> Option<&str> {
        self.usul
            .iter()
            .find(|(_, u)| u.variants.iter().any(|v| v.mu2_name == mu2_name))
            .map(|(k, _)| k.as_str())
    }
}
