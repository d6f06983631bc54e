//! Section extraction
//!
//! Locates section boundaries from the lyrics column: explicit structure
//! labels (e.g. NAKARAT) open instrumental/named sections, and the
//! double-space lyric-end convention closes vocal sections. Boundary
//! resolution runs backward through the piece because each section's start
//! depends on the sections already resolved after it, and vocal section
//! starts are snapped to the measure in which their first syllable falls.

use crate::error::{ExtractorError, ExtractorResult};
use crate::metadata::reference::ReferenceData;
use crate::models::score::true_lyrics_idx;
use crate::models::{Boundary, Fragment, PendingSection, Score};
use crate::offset;
use crate::slug::slugify_tr;
use crate::structure::StructureLabeler;

/// Name given to sections closed by a lyric-end marker
pub const VOCAL_SECTION: &str = "VOCAL_SECTION";

/// Name given to a synthesized leading instrumental section
pub const INSTRUMENTAL_SECTION: &str = "INSTRUMENTAL_SECTION";

/// Extracts and labels the sections of a score
#[derive(Debug, Clone, Copy)]
pub struct SectionExtractor<'a> {
    ref_data: &'a ReferenceData,
    lyrics_sim_thres: f64,
    melody_sim_thres: f64,
    extract_all_labels: bool,
}

impl<'a> SectionExtractor<'a> {
    /// Create a section extractor
    ///
    /// `extract_all_labels` treats every known label in the lyrics column as
    /// a section marker instead of only the structure group.
    pub fn new(
        ref_data: &'a ReferenceData,
        lyrics_sim_thres: f64,
        melody_sim_thres: f64,
        extract_all_labels: bool,
    ) -> Self {
        SectionExtractor {
            ref_data,
            lyrics_sim_thres,
            melody_sim_thres,
            extract_all_labels,
        }
    }

    /// Extract, label and validate the sections of `score`
    ///
    /// Returns the sections with boundaries remapped to the score's external
    /// 1-based indices, and a validity flag covering section continuity and
    /// measure alignment. A score with an entirely empty lyrics column has
    /// nothing to analyze and yields an empty, valid section list.
    pub fn extract(
        &self,
        score: &Score,
        symbtr_name: &str,
    ) -> ExtractorResult<(Vec<Fragment>, bool)> {
        let all_labels = self.ref_data.labels.all();
        let struct_lbl: Vec<String> = if self.extract_all_labels {
            all_labels.clone()
        } else {
            self.ref_data.labels.structure.clone()
        };

        let (measure_start_idx, is_measure_start_valid) =
            offset::find_measure_start_idx(&score.offset);

        let sections = if score.has_empty_lyrics() {
            Vec::new()
        } else {
            let pending = scan_markers(score, &struct_lbl);
            let resolved =
                self.locate_section_boundaries(pending, score, &all_labels, &measure_start_idx)?;
            let labeler =
                StructureLabeler::new(self.ref_data, self.lyrics_sim_thres, self.melody_sim_thres);
            labeler.label_structures(resolved, score)?
        };

        let ignore_labels: Vec<String> = all_labels
            .iter()
            .filter(|l| !struct_lbl.contains(l))
            .cloned()
            .collect();
        let sections_valid = self.validate_sections(&sections, score, &ignore_labels, symbtr_name);
        let valid = sections_valid && is_measure_start_valid;

        let mut sections = sections;
        for section in &mut sections {
            section.to_symbtr_idx(&score.index);
        }

        Ok((sections, valid))
    }

    /// MusicXML scores are not supported
    pub fn extract_from_musicxml(&self, _score: &Score) -> ExtractorResult<Vec<Fragment>> {
        Err(ExtractorError::UnsupportedFormat("musicxml".to_string()))
    }

    /// mu2 scores are not supported
    pub fn extract_from_mu2(&self, _score: &Score) -> ExtractorResult<Vec<Fragment>> {
        Err(ExtractorError::UnsupportedFormat("mu2".to_string()))
    }

    /// Resolve the missing boundary of every marked section
    ///
    /// Sections are processed from last to first: explicit-label sections
    /// extend to the next section start, vocal sections walk back to the
    /// earliest lyric onset after the previous boundary and snap it to its
    /// measure start. The candidate lists are recomputed for every section
    /// so each step sees the boundaries resolved so far.
    fn locate_section_boundaries(
        &self,
        mut pending: Vec<PendingSection>,
        score: &Score,
        all_labels: &[String],
        measure_start_idx: &[usize],
    ) -> ExtractorResult<Vec<Fragment>> {
        let first_note_idx = score.first_note_idx().ok_or_else(|| {
            ExtractorError::InvariantViolation("score has no sounding events".to_string())
        })?;
        let real_lyrics_idx = true_lyrics_idx(&score.lyrics, all_labels, &score.duration);

        for i in (0..pending.len()).rev() {
            let starts = start_candidates(&pending, score.len());

            if pending[i].slug == VOCAL_SECTION {
                let marker_end = pending[i].end_note.resolved("vocal section end")?;
                let end = next_boundary_after(&starts, marker_end)? - 1;
                pending[i].end_note = Boundary::Note(end);

                let ends = end_candidates(&pending);
                let prev_closest_start = starts
                    .iter()
                    .copied()
                    .filter(|&x| x < end)
                    .max()
                    .map_or(-1, |x| x as i64);
                let prev_closest_end = ends
                    .iter()
                    .copied()
                    .filter(|&x| x < end as i64)
                    .max()
                    .unwrap_or(-1);

                let chk_ind = prev_closest_start.max(prev_closest_end);
                let next_lyrics_start = real_lyrics_idx
                    .iter()
                    .copied()
                    .find(|&r| (r as i64) > chk_ind)
                    .ok_or_else(|| {
                        ExtractorError::InvariantViolation(
                            "no lyric onset after the previous section boundary".to_string(),
                        )
                    })?;
                let next_lyrics_measure = score.offset[next_lyrics_start].floor();

                // two lyric events in one measure is abnormal but not fatal
                let same_measure = prev_closest_end >= 0
                    && next_lyrics_measure == score.offset[prev_closest_end as usize].floor();

                let start = if same_measure {
                    log::warn!(
                        "lyric events '{}' and '{}' share measure {}",
                        score.lyrics[prev_closest_end as usize],
                        score.lyrics[next_lyrics_start],
                        next_lyrics_measure
                    );
                    next_lyrics_start
                } else {
                    let snapped = offset::get_measure_offset_id(
                        next_lyrics_measure,
                        &score.offset,
                        measure_start_idx,
                    )
                    .ok_or_else(|| {
                        ExtractorError::InvariantViolation(
                            "no measure starts available for snapping".to_string(),
                        )
                    })?;
                    snapped.max(first_note_idx)
                };
                pending[i].start_note = Boundary::Note(start);

                pending[i].lyrics = real_lyrics_idx
                    .iter()
                    .copied()
                    .filter(|&r| start <= r && r <= end)
                    .map(|r| score.lyrics[r].as_str())
                    .collect();
            } else {
                let start = pending[i].start_note.resolved("labeled section start")?;
                let end = next_boundary_after(&starts, start)? - 1;
                pending[i].end_note = Boundary::Note(end);
            }
        }

        let mut sections = Vec::with_capacity(pending.len());
        for p in pending {
            let start = p.start_note.resolved("section start")?;
            let end = p.end_note.resolved("section end")?;
            sections.push(Fragment::new(&p.name, &p.slug, start, end, p.lyrics));
        }

        // leading instrumental gap before the first marked section
        if let Some(min_start) = sections.iter().map(|s| s.start_note).min() {
            if min_start > first_note_idx {
                sections.push(Fragment::new(
                    INSTRUMENTAL_SECTION,
                    INSTRUMENTAL_SECTION,
                    first_note_idx,
                    min_start - 1,
                    String::new(),
                ));
            }
        }

        sections.sort_by_key(|s| s.start_note);
        Ok(sections)
    }

    /// Check continuity, measure alignment and label hygiene
    ///
    /// Continuity breaks and end-before-start spans flag the extraction
    /// invalid; a section starting off the measure grid is only advisory.
    fn validate_sections(
        &self,
        sections: &[Fragment],
        score: &Score,
        ignore_labels: &[String],
        symbtr_name: &str,
    ) -> bool {
        let mut valid = true;

        if sections.is_empty() {
            log::warn!("{}: missing section info in lyrics", symbtr_name);
        } else if let Some(first_note_idx) = score.first_note_idx() {
            let starts: Vec<usize> = sections
                .iter()
                .map(|s| s.start_note)
                .chain(std::iter::once(score.len()))
                .collect();
            let ends: Vec<i64> = std::iter::once(first_note_idx as i64 - 1)
                .chain(sections.iter().map(|s| s.end_note as i64))
                .collect();
            for (&s, &e) in starts.iter().zip(ends.iter()) {
                if s as i64 - e != 1 {
                    log::error!("{}: {}->{}, gap between the sections", symbtr_name, e, s);
                    valid = false;
                }
            }
        }

        for section in sections {
            let off_measure = !offset::is_integer_offset(score.offset[section.start_note])
                && !ignore_labels.contains(&section.slug);
            if off_measure {
                log::warn!(
                    "{}: {}, {} does not start on a measure: {}",
                    symbtr_name,
                    section.start_note,
                    section.slug,
                    score.offset[section.start_note]
                );
            }
            if section.start_note > section.end_note {
                log::error!(
                    "{}: {}->{}, {} ends before it starts",
                    symbtr_name,
                    section.start_note,
                    section.end_note,
                    section.slug
                );
                valid = false;
            }
        }

        // a label with trailing whitespace is an authoring error in the score
        let mut checked_labels = self.ref_data.labels.all();
        checked_labels.push(".".to_string());
        for (i, lyric) in score.lyrics.iter().enumerate() {
            for label in &checked_labels {
                if *lyric == format!("{} ", label) || *lyric == format!("{}  ", label) {
                    log::error!("{}: {}, extra space in '{}'", symbtr_name, i, lyric);
                    valid = false;
                }
            }
        }

        valid
    }
}

/// Open a pending section at every structure label and lyric-end marker
fn scan_markers(score: &Score, struct_lbl: &[String]) -> Vec<PendingSection> {
    let mut pending = Vec::new();
    for (i, lyric) in score.lyrics.iter().enumerate() {
        if struct_lbl.iter().any(|l| l == lyric) {
            pending.push(PendingSection {
                name: lyric.clone(),
                slug: slugify_tr(lyric),
                start_note: Boundary::Note(i),
                end_note: Boundary::Unresolved,
                lyrics: String::new(),
            });
        } else if lyric.contains("  ") {
            pending.push(PendingSection {
                name: VOCAL_SECTION.to_string(),
                slug: VOCAL_SECTION.to_string(),
                start_note: Boundary::Unresolved,
                end_note: Boundary::Note(i),
                lyrics: String::new(),
            });
        }
    }
    pending
}

/// Resolved section starts plus the end-of-score sentinel
fn start_candidates(pending: &[PendingSection], score_len: usize) -> Vec<usize> {
    pending
        .iter()
        .filter_map(|s| s.start_note.get())
        .chain(std::iter::once(score_len))
        .collect()
}

/// Resolved section ends, seeded with -1 for before-the-score
fn end_candidates(pending: &[PendingSection]) -> Vec<i64> {
    std::iter::once(-1)
        .chain(pending.iter().filter_map(|s| s.end_note.get().map(|e| e as i64)))
        .collect()
}

/// The closest boundary strictly after `after`
fn next_boundary_after(starts: &[usize], after: usize) -> ExtractorResult<usize> {
    starts
        .iter()
        .copied()
        .filter(|&x| x > after)
        .min()
        .ok_or_else(|| {
            ExtractorError::InvariantViolation(
                "no section boundary after the current section".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A score with one leading usul row and the given lyric/offset columns
    fn make_score(lyrics: &[&str], offsets: &[f64]) -> Score {
        let n = lyrics.len();
        assert_eq!(n, offsets.len());
        let mut code = vec![9; n];
        code[0] = 51;
        let mut duration = vec![250; n];
        duration[0] = 0;
        Score {
            index: (1..=n).collect(),
            code,
            note53: vec!["A4".to_string(); n],
            note_ae: vec!["A4".to_string(); n],
            comma53: (0..n).map(|i| 22 + (i % 3) as i32).collect(),
            comma_ae: (0..n).map(|i| 22 + (i % 3) as i32).collect(),
            numerator: vec![1; n],
            denumerator: vec![4; n],
            duration,
            lyrics: lyrics.iter().map(|s| s.to_string()).collect(),
            offset: offsets.to_vec(),
            lns: vec![0; n],
            bas: vec![0; n],
        }
    }

    fn extractor(ref_data: &ReferenceData) -> SectionExtractor<'_> {
        SectionExtractor::new(ref_data, 0.75, 0.75, false)
    }

    #[test]
    fn test_empty_lyrics_yield_no_sections() {
        let score = make_score(
            &["", "", "", "", ""],
            &[0.0, 0.0, 0.25, 0.5, 0.75],
        );
        let (sections, valid) = extractor(ReferenceData::builtin())
            .extract(&score, "test")
            .unwrap();
        assert!(sections.is_empty());
        assert!(valid);
    }

    #[test]
    fn test_single_vocal_section_spans_whole_score() {
        // lyric-end marker on the last note closes one vocal section
        let score = make_score(
            &["", "ya", "le", "li", "yar  "],
            &[0.0, 0.0, 0.25, 0.5, 0.75],
        );
        let (sections, valid) = extractor(ReferenceData::builtin())
            .extract(&score, "test")
            .unwrap();

        assert!(valid);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, VOCAL_SECTION);
        // boundaries are reported in external 1-based indexing
        assert_eq!(sections[0].start_note, 2);
        assert_eq!(sections[0].end_note, 5);
        assert_eq!(sections[0].lyrics, "yaleliyar  ");
    }

    #[test]
    fn test_explicit_label_opens_instrumental_section() {
        let score = make_score(
            &["", "NAKARAT", "", "", "ya", "le  ", "", ""],
            &[0.0, 0.0, 0.0, 0.5, 1.0, 1.5, 2.0, 2.5],
        );
        let (sections, valid) = extractor(ReferenceData::builtin())
            .extract(&score, "test")
            .unwrap();

        assert!(valid);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "NAKARAT");
        assert_eq!(sections[1].name, VOCAL_SECTION);
        // the vocal section snaps to the measure of its first syllable
        assert_eq!(sections[1].start_note, 5);
        assert_eq!(sections[1].end_note, 8);
    }

    #[test]
    fn test_leading_gap_becomes_instrumental_section() {
        // two full instrumental measures before the sung part
        let score = make_score(
            &["", "", "", "", "", "ya", "le", "li  "],
            &[0.0, 0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 2.75],
        );
        let (sections, valid) = extractor(ReferenceData::builtin())
            .extract(&score, "test")
            .unwrap();

        assert!(valid);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, INSTRUMENTAL_SECTION);
        assert_eq!(sections[0].start_note, 2);
        assert_eq!(sections[0].end_note, 5);
        assert_eq!(sections[0].lyric_structure.as_deref(), Some("INSTRUMENTAL"));
        assert_eq!(sections[1].start_note, 6);
    }

    #[test]
    fn test_label_with_trailing_space_is_invalid() {
        let score = make_score(
            &["", "NAKARAT ", "ya", "le  "],
            &[0.0, 0.0, 0.25, 0.5],
        );
        let (_, valid) = extractor(ReferenceData::builtin())
            .extract(&score, "test")
            .unwrap();
        assert!(!valid);
    }

    #[test]
    fn test_unsupported_formats_signal_explicitly() {
        let score = make_score(&["", "ya  "], &[0.0, 0.0]);
        let ex = extractor(ReferenceData::builtin());
        assert!(matches!(
            ex.extract_from_musicxml(&score),
            Err(ExtractorError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ex.extract_from_mu2(&score),
            Err(ExtractorError::UnsupportedFormat(_))
        ));
    }
}
