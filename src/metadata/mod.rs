//! Score metadata
//!
//! A SymbTr score name encodes its makam, form, usul, title and composer as
//! double-hyphen separated slugs. This module parses the name, resolves each
//! slug against the reference tables and optionally enriches the result with
//! a document fetched from an external metadata registry.

pub mod reference;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ExtractorError, ExtractorResult};
use self::reference::ReferenceData;

/// The five slugs encoded in a SymbTr score name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreNameSlugs {
    pub makam: String,
    pub form: String,
    pub usul: String,
    pub name: String,
    pub composer: String,
}

/// Split a score name of the form `makam--form--usul--name--composer`
pub fn get_slugs(symbtr_name: &str) -> ExtractorResult<ScoreNameSlugs> {
    let fields: Vec<&str> = symbtr_name.split("--").collect();
    if fields.len() != 5 {
        return Err(ExtractorError::MalformedScoreName(symbtr_name.to_string()));
    }
    Ok(ScoreNameSlugs {
        makam: fields[0].to_string(),
        form: fields[1].to_string(),
        usul: fields[2].to_string(),
        name: fields[3].to_string(),
        composer: fields[4].to_string(),
    })
}

/// A makam/form/usul reference, resolved as far as the tables allow
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttributeMetadata {
    /// Slug taken from the score name
    pub symbtr_slug: String,
    /// Key into the reference table, when the slug is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_key: Option<String>,
    /// Name used by the external metadata registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dunya_name: Option<String>,
}

/// Tonic (karar) of the piece, derived from the makam table
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Tonic {
    pub symbol: String,
}

/// Everything known about a score before note-level analysis
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metadata {
    pub symbtr_name: String,
    pub makam: AttributeMetadata,
    pub form: AttributeMetadata,
    pub usul: AttributeMetadata,
    pub title_slug: String,
    pub composer_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tonic: Option<Tonic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mbid: Option<String>,
    /// Work document from the external registry, when fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work: Option<Value>,
    /// Recording document from the external registry, when fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording: Option<Value>,
}

/// An external registry that can resolve an MBID to a metadata document
///
/// The returned document is expected to carry a `url` field ending in
/// `/work/<mbid>` or `/recording/<mbid>`, which decides where the document
/// is attached.
pub trait MetadataService {
    fn fetch(&self, mbid: &str) -> ExtractorResult<Value>;
}

/// Resolves score names against the reference tables
#[derive(Clone, Copy)]
pub struct MetadataExtractor<'a> {
    ref_data: &'a ReferenceData,
    service: Option<&'a dyn MetadataService>,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(ref_data: &'a ReferenceData, service: Option<&'a dyn MetadataService>) -> Self {
        MetadataExtractor { ref_data, service }
    }

    /// Build the metadata of a score from its name and optional MBID
    ///
    /// Returns the metadata and a validity flag. Slugs missing from the
    /// reference tables leave their fields unresolved and flag the metadata
    /// invalid; the extraction itself still proceeds.
    pub fn get_metadata(
        &self,
        symbtr_name: &str,
        mbid: Option<&str>,
    ) -> ExtractorResult<(Metadata, bool)> {
        let slugs = get_slugs(symbtr_name)?;
        let mut valid = true;

        let makam = self.attribute_metadata("makam", &slugs.makam, symbtr_name, &mut valid);
        let form = self.attribute_metadata("form", &slugs.form, symbtr_name, &mut valid);
        let usul = self.attribute_metadata("usul", &slugs.usul, symbtr_name, &mut valid);

        let tonic = self
            .ref_data
            .makam_by_slug(&slugs.makam)
            .map(|m| Tonic {
                symbol: m.karar_symbol.clone(),
            });

        let mut metadata = Metadata {
            symbtr_name: symbtr_name.to_string(),
            makam,
            form,
            usul,
            title_slug: slugs.name,
            composer_slug: slugs.composer,
            tonic,
            mbid: mbid.map(str::to_string),
            work: None,
            recording: None,
        };

        if let Some(mbid) = mbid {
            match self.service {
                Some(service) => self.attach_document(&mut metadata, service.fetch(mbid)?),
                None => log::warn!(
                    "{}: mbid {} given but no metadata service configured",
                    symbtr_name,
                    mbid
                ),
            }
        }

        Ok((metadata, valid))
    }

    fn attribute_metadata(
        &self,
        attribute: &str,
        slug: &str,
        symbtr_name: &str,
        valid: &mut bool,
    ) -> AttributeMetadata {
        let attribute_key = self.ref_data.attribute_key(attribute, slug);
        if attribute_key.is_none() {
            log::warn!("{}: unknown {} slug '{}'", symbtr_name, attribute, slug);
            *valid = false;
        }
        let dunya_name = match attribute {
            "makam" => self.ref_data.makam_by_slug(slug).map(|m| m.dunya_name.clone()),
            "usul" => self.ref_data.usul_by_slug(slug).map(|u| u.dunya_name.clone()),
            "form" => self.ref_data.form_by_slug(slug).map(|f| f.dunya_name.clone()),
            _ => None,
        };
        AttributeMetadata {
            symbtr_slug: slug.to_string(),
            attribute_key,
            dunya_name,
        }
    }

    fn attach_document(&self, metadata: &mut Metadata, doc: Value) {
        let url = doc.get("url").and_then(Value::as_str).unwrap_or_default();
        if url.contains("/work/") {
            metadata.work = Some(doc);
        } else if url.contains("/recording/") {
            metadata.recording = Some(doc);
        } else {
            log::warn!(
                "{}: metadata document is neither work nor recording",
                metadata.symbtr_name
            );
        }
    }
}
