//! Rhythmic structure extraction
//!
//! Every usul change row (code 51) opens a rhythmic region: the usul named
//! in the row's lyrics column governs all notes up to the next change. The
//! tempo of a region is inferred from the duration of the first sounding
//! note after the change, except in free meter where no tempo exists.

use num_rational::Ratio;
use serde::Serialize;

use crate::error::{ExtractorError, ExtractorResult};
use crate::metadata::reference::ReferenceData;
use crate::models::score::USUL_BOUNDARY_CODE;
use crate::models::Score;

/// Mu2 label of the free-meter pseudo-usul
const FREE_METER_MU2: &str = "[Serbest]";

/// Usul in effect over a rhythmic region
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsulInfo {
    /// Label text from the usul row
    pub mu2_name: String,
    /// Usul id from the LNS column of the row
    pub symbtr_internal_id: u32,
    /// Key into the usul reference table, when the label is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_key: Option<String>,
    /// Metrical subdivision unit, when the label is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mertebe: Option<u32>,
    /// Pulses per cycle, when the label is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_pulses: Option<u32>,
}

/// Tempo of a rhythmic region in beats per minute
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Tempo {
    /// Beats per minute; absent in free meter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    /// Always "bpm"
    pub unit: String,
}

/// One region of the score governed by a single usul
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RhythmicStructure {
    /// The governing usul
    pub usul: UsulInfo,
    /// Inferred tempo
    pub tempo: Tempo,
    /// First note of the region, external numbering
    pub start_note: usize,
    /// Last note of the region, external numbering
    pub end_note: usize,
}

/// Extracts the per-usul rhythmic regions of a score
#[derive(Debug, Clone, Copy)]
pub struct RhythmicFeatureExtractor<'a> {
    ref_data: &'a ReferenceData,
}

impl<'a> RhythmicFeatureExtractor<'a> {
    pub fn new(ref_data: &'a ReferenceData) -> Self {
        RhythmicFeatureExtractor { ref_data }
    }

    /// Extract one [`RhythmicStructure`] per usul change row
    ///
    /// The first row of a well-formed score is an usul row, so every note
    /// falls into exactly one region.
    pub fn extract(&self, score: &Score) -> ExtractorResult<Vec<RhythmicStructure>> {
        let usul_rows: Vec<usize> = score
            .code
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == USUL_BOUNDARY_CODE)
            .map(|(i, _)| i)
            .collect();
        if usul_rows.is_empty() {
            return Err(ExtractorError::MalformedScore(
                "score has no usul rows".to_string(),
            ));
        }

        let mut structures = Vec::with_capacity(usul_rows.len());
        for (k, &row) in usul_rows.iter().enumerate() {
            let mu2_name = score.lyrics[row].clone();
            let usul = self.usul_info(
                &mu2_name,
                score.lns[row],
                score.numerator[row],
                score.denumerator[row],
            );
            let tempo = compute_tempo_from_next_note(score, row, usul.mertebe)?;

            let end_row = usul_rows
                .get(k + 1)
                .map_or(score.len() - 1, |&next| next - 1);
            structures.push(RhythmicStructure {
                usul,
                tempo,
                start_note: score.index[row],
                end_note: score.index[end_row],
            });
        }
        Ok(structures)
    }

    /// Resolve one usul row against the reference table
    ///
    /// The row's own Pay/Payda columns carry the notated pulse count and
    /// mertebe and take precedence; the table variant only fills in when the
    /// row leaves them at zero, since a score may be notated in a mertebe
    /// the table does not list.
    fn usul_info(&self, mu2_name: &str, internal_id: u32, row_num: u32, row_denum: u32) -> UsulInfo {
        let key = self.ref_data.usul_key_from_mu2(mu2_name);
        let variant = key.and_then(|k| {
            self.ref_data.usul[k]
                .variants
                .iter()
                .find(|v| v.mu2_name == mu2_name)
        });
        if key.is_none() {
            log::warn!("unknown usul label: {}", mu2_name);
        }

        let mertebe = match row_denum {
            0 => variant.map(|v| v.mertebe),
            d => Some(d),
        };
        let number_of_pulses = match row_num {
            0 => variant.map(|v| v.num_pulses),
            n => Some(n),
        };
        UsulInfo {
            mu2_name: mu2_name.to_string(),
            symbtr_internal_id: internal_id,
            attribute_key: key.map(str::to_string),
            mertebe,
            number_of_pulses,
        }
    }
}

/// Tempo implied by the first sounding note after an usul row
///
/// The beat is one mertebe-th of a whole note; the note's millisecond
/// duration and symbolic duration together fix the beat length. Free meter
/// carries no tempo, and neither does a region with no sounding notes.
fn compute_tempo_from_next_note(
    score: &Score,
    usul_row: usize,
    mertebe: Option<u32>,
) -> ExtractorResult<Tempo> {
    let unit = "bpm".to_string();
    let mertebe = match mertebe {
        Some(m) if m > 0 && score.lyrics[usul_row] != FREE_METER_MU2 => m,
        _ => return Ok(Tempo { value: None, unit }),
    };

    let mut row = usul_row + 1;
    while row < score.len() {
        if score.duration[row] > 0 && score.denumerator[row] > 0 {
            let sym_dur = Ratio::new(score.numerator[row], score.denumerator[row]);
            let sym_dur = *sym_dur.numer() as f64 / *sym_dur.denom() as f64;
            let dur_sec = score.duration[row] as f64 * 0.001;
            let value = (60.0 / (dur_sec * mertebe as f64 * sym_dur)).round() as u32;
            return Ok(Tempo {
                value: Some(value),
                unit,
            });
        }
        row += 1;
    }
    Ok(Tempo { value: None, unit })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_score(rows: &[(i32, &str, u32, u32, u32, u32)]) -> Score {
        // (code, lyrics, num, denum, dur_ms, lns)
        let n = rows.len();
        Score {
            index: (1..=n).collect(),
            code: rows.iter().map(|r| r.0).collect(),
            note53: vec!["A4".to_string(); n],
            note_ae: vec!["A4".to_string(); n],
            comma53: vec![22; n],
            comma_ae: vec![22; n],
            numerator: rows.iter().map(|r| r.2).collect(),
            denumerator: rows.iter().map(|r| r.3).collect(),
            duration: rows.iter().map(|r| r.4).collect(),
            lyrics: rows.iter().map(|r| r.1.to_string()).collect(),
            offset: (0..n).map(|i| i as f64 * 0.25).collect(),
            lns: rows.iter().map(|r| r.5).collect(),
            bas: vec![0; n],
        }
    }

    #[test]
    fn test_single_usul_region() {
        // quarter note lasting 500 ms under mertebe 4 means 120 bpm
        let score = make_score(&[
            (51, "Sofyan", 4, 4, 0, 11),
            (9, "ya", 1, 4, 500, 0),
            (9, "le", 1, 4, 500, 0),
        ]);
        let structures = RhythmicFeatureExtractor::new(ReferenceData::builtin())
            .extract(&score)
            .unwrap();

        assert_eq!(structures.len(), 1);
        let s = &structures[0];
        assert_eq!(s.usul.attribute_key.as_deref(), Some("sofyan"));
        assert_eq!(s.usul.mertebe, Some(4));
        assert_eq!(s.usul.number_of_pulses, Some(4));
        assert_eq!(s.usul.symbtr_internal_id, 11);
        assert_eq!(s.tempo.value, Some(120));
        assert_eq!(s.tempo.unit, "bpm");
        assert_eq!((s.start_note, s.end_note), (1, 3));
    }

    #[test]
    fn test_usul_change_splits_regions() {
        let score = make_score(&[
            (51, "Aksak", 9, 8, 0, 1),
            (9, "", 1, 8, 250, 0),
            (9, "", 1, 8, 250, 0),
            (51, "Sofyan", 4, 4, 0, 11),
            (9, "", 1, 4, 500, 0),
        ]);
        let structures = RhythmicFeatureExtractor::new(ReferenceData::builtin())
            .extract(&score)
            .unwrap();

        assert_eq!(structures.len(), 2);
        assert_eq!(structures[0].usul.attribute_key.as_deref(), Some("aksak"));
        assert_eq!((structures[0].start_note, structures[0].end_note), (1, 3));
        assert_eq!((structures[1].start_note, structures[1].end_note), (4, 5));
        // eighth note at 250 ms under mertebe 8: 60 / (0.25 * 8 * 1/8) = 240 bpm
        assert_eq!(structures[0].tempo.value, Some(240));
    }

    #[test]
    fn test_row_meter_overrides_reference_table() {
        // Aksak notated in mertebe 4; the table variant says 8
        let score = make_score(&[
            (51, "Aksak", 9, 4, 0, 1),
            (9, "", 1, 4, 500, 0),
        ]);
        let structures = RhythmicFeatureExtractor::new(ReferenceData::builtin())
            .extract(&score)
            .unwrap();

        let usul = &structures[0].usul;
        assert_eq!(usul.attribute_key.as_deref(), Some("aksak"));
        assert_eq!(usul.mertebe, Some(4));
        assert_eq!(usul.number_of_pulses, Some(9));
        assert_eq!(structures[0].tempo.value, Some(120));
    }

    #[test]
    fn test_free_meter_has_no_tempo() {
        let score = make_score(&[
            (51, "[Serbest]", 0, 0, 0, 56),
            (9, "", 1, 4, 500, 0),
        ]);
        let structures = RhythmicFeatureExtractor::new(ReferenceData::builtin())
            .extract(&score)
            .unwrap();

        assert_eq!(structures[0].usul.attribute_key.as_deref(), Some("serbest"));
        assert_eq!(structures[0].tempo.value, None);
    }

    #[test]
    fn test_unknown_usul_keeps_label() {
        let score = make_score(&[
            (51, "Gizli", 4, 4, 0, 99),
            (9, "", 1, 4, 500, 0),
        ]);
        let structures = RhythmicFeatureExtractor::new(ReferenceData::builtin())
            .extract(&score)
            .unwrap();

        let usul = &structures[0].usul;
        assert_eq!(usul.mu2_name, "Gizli");
        assert_eq!(usul.attribute_key, None);
        // the row's own meter columns still yield mertebe and a tempo
        assert_eq!(usul.mertebe, Some(4));
        assert_eq!(usul.number_of_pulses, Some(4));
        assert_eq!(structures[0].tempo.value, Some(120));
    }

    #[test]
    fn test_score_without_usul_rows_is_malformed() {
        let score = make_score(&[(9, "", 1, 4, 500, 0)]);
        assert!(matches!(
            RhythmicFeatureExtractor::new(ReferenceData::builtin()).extract(&score),
            Err(ExtractorError::MalformedScore(_))
        ));
    }
}
