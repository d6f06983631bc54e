//! Phrase and segment extraction
//!
//! Phrases come from annotation rows embedded in the score (codes 53/54/55
//! plus usul changes); segments come from an externally computed list of
//! boundary note numbers. Both paths share the same boundary cleanup, span
//! construction, semiotic labeling and section linking.

use crate::error::{ExtractorError, ExtractorResult};
use crate::metadata::reference::ReferenceData;
use crate::models::score::{
    lyrics_between, FLAVOR_CODE, PHRASE_ANNOTATION_CODES, PHRASE_BOUND_CODES,
};
use crate::models::{Fragment, Score, SectionRef};
use crate::structure::StructureLabeler;

/// Extracts phrases (from in-score annotations) and segments (from external
/// boundary lists), labels them and links them to their containing sections
#[derive(Debug, Clone, Copy)]
pub struct PhraseExtractor<'a> {
    ref_data: &'a ReferenceData,
    lyrics_sim_thres: f64,
    melody_sim_thres: f64,
}

impl<'a> PhraseExtractor<'a> {
    /// Create a phrase extractor with the given similarity thresholds
    pub fn new(ref_data: &'a ReferenceData, lyrics_sim_thres: f64, melody_sim_thres: f64) -> Self {
        PhraseExtractor {
            ref_data,
            lyrics_sim_thres,
            melody_sim_thres,
        }
    }

    /// Extract the expert-annotated phrases of `score`
    ///
    /// Boundaries are the rows carrying phrase annotation or usul change
    /// codes. Usul changes alone do not count as annotations: a score
    /// without any 53/54/55 row has no annotated phrases.
    pub fn extract_annotated(
        &self,
        score: &Score,
        sections: &[Fragment],
    ) -> ExtractorResult<Vec<Fragment>> {
        let annotated = score
            .code
            .iter()
            .any(|c| PHRASE_ANNOTATION_CODES.contains(c));
        if !annotated {
            return Ok(Vec::new());
        }

        let first_note_idx = score.first_note_idx().ok_or_else(|| {
            ExtractorError::InvariantViolation("score has no sounding events".to_string())
        })?;
        let raw_bounds: Vec<usize> = score
            .code
            .iter()
            .enumerate()
            .filter(|&(i, c)| PHRASE_BOUND_CODES.contains(c) && i > first_note_idx)
            .map(|(i, _)| i)
            .collect();
        self.extract(score, raw_bounds, sections, "PHRASE")
    }

    /// Extract automatic segments from 1-based boundary note numbers
    ///
    /// `bound_notes` holds external SymbTr note numbers, e.g. from an
    /// automatic segmentation run. An empty list yields no segments.
    pub fn extract_auto_segments(
        &self,
        score: &Score,
        bound_notes: &[usize],
        sections: &[Fragment],
    ) -> ExtractorResult<Vec<Fragment>> {
        if bound_notes.is_empty() {
            return Ok(Vec::new());
        }
        let mut raw_bounds = Vec::with_capacity(bound_notes.len());
        for &b in bound_notes {
            let local = score
                .index
                .iter()
                .position(|&idx| idx == b)
                .ok_or_else(|| {
                    ExtractorError::InvalidParameter(format!(
                        "segment boundary {} is not a note number of the score",
                        b
                    ))
                })?;
            raw_bounds.push(local);
        }
        self.extract(score, raw_bounds, sections, "SEGMENT")
    }

    fn extract(
        &self,
        score: &Score,
        raw_bounds: Vec<usize>,
        sections: &[Fragment],
        kind: &str,
    ) -> ExtractorResult<Vec<Fragment>> {
        let first_note_idx = score.first_note_idx().ok_or_else(|| {
            ExtractorError::InvariantViolation("score has no sounding events".to_string())
        })?;
        let bounds = parse_bounds(raw_bounds, first_note_idx, score.len());

        let all_labels = self.ref_data.labels.all();
        let mut phrases = Vec::with_capacity(bounds.len().saturating_sub(1));
        for pair in bounds.windows(2) {
            let (start, end) = (pair[0], pair[1] - 1);

            let lyrics = lyrics_between(score, &all_labels, start, end);
            let name = if lyrics.is_empty() {
                format!("INSTRUMENTAL_{}", kind)
            } else {
                format!("VOCAL_{}", kind)
            };

            let mut phrase = Fragment::new(&name, &name, start, end, lyrics);
            phrase.flavor = (start..=end)
                .filter(|&i| score.code[i] == FLAVOR_CODE)
                .map(|i| score.lyrics[i].clone())
                .collect();
            phrases.push(phrase);
        }

        let labeler =
            StructureLabeler::new(self.ref_data, self.lyrics_sim_thres, self.melody_sim_thres);
        let mut phrases = labeler.label_structures(phrases, score)?;

        for phrase in &mut phrases {
            phrase.to_symbtr_idx(&score.index);
            phrase.sections = link_sections(phrase, sections)?;
        }
        Ok(phrases)
    }
}

/// Clean up raw boundary indices into a sorted, well-spaced bound list
///
/// Ensures the first note and the end of the score are bounds, and collapses
/// adjacent bounds: the earlier one wins, except at the very first note
/// where the later one is dropped instead.
fn parse_bounds(raw_bounds: Vec<usize>, first_note_idx: usize, score_len: usize) -> Vec<usize> {
    let mut bounds = raw_bounds;
    bounds.push(first_note_idx);
    bounds.push(score_len);
    bounds.sort_unstable();
    bounds.dedup();

    let mut i = 0;
    while i + 1 < bounds.len() {
        if bounds[i + 1] - bounds[i] == 1 {
            if bounds[i] == first_note_idx {
                bounds.remove(i + 1);
            } else {
                bounds.remove(i);
            }
        } else {
            i += 1;
        }
    }
    bounds
}

/// Every section the phrase's span touches, from the section containing its
/// first note through the section containing its last
///
/// Both the phrase and the sections are in external note numbering at this
/// point. A note inside more than one section breaks the section partition
/// and is fatal; an endpoint inside none (e.g. when the section list is
/// empty) shrinks the range to the other endpoint's section, if any.
fn link_sections(phrase: &Fragment, sections: &[Fragment]) -> ExtractorResult<Vec<SectionRef>> {
    let start = section_idx_of(phrase.start_note, sections)?;
    let end = section_idx_of(phrase.end_note, sections)?;
    let range = match (start, end) {
        (Some(s), Some(e)) => s..=e,
        (Some(s), None) => s..=s,
        (None, Some(e)) => e..=e,
        (None, None) => return Ok(Vec::new()),
    };
    Ok(range
        .map(|section_idx| {
            let section = &sections[section_idx];
            SectionRef {
                section_idx,
                melodic_structure: section.melodic_structure.clone().unwrap_or_default(),
                lyric_structure: section.lyric_structure.clone().unwrap_or_default(),
            }
        })
        .collect())
}

fn section_idx_of(note: usize, sections: &[Fragment]) -> ExtractorResult<Option<usize>> {
    let matched: Vec<usize> = sections
        .iter()
        .enumerate()
        .filter(|(_, s)| s.start_note <= note && note <= s.end_note)
        .map(|(i, _)| i)
        .collect();
    if matched.len() > 1 {
        return Err(ExtractorError::InvariantViolation(format!(
            "note {} belongs to {} sections",
            note,
            matched.len()
        )));
    }
    Ok(matched.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_score(codes: &[i32], lyrics: &[&str]) -> Score {
        let n = codes.len();
        assert_eq!(n, lyrics.len());
        let duration: Vec<u32> = codes.iter().map(|&c| if c == 9 { 250 } else { 0 }).collect();
        Score {
            index: (1..=n).collect(),
            code: codes.to_vec(),
            note53: vec!["A4".to_string(); n],
            note_ae: vec!["A4".to_string(); n],
            comma53: (0..n).map(|i| 22 + (i % 4) as i32).collect(),
            comma_ae: (0..n).map(|i| 22 + (i % 4) as i32).collect(),
            numerator: vec![1; n],
            denumerator: vec![4; n],
            duration,
            lyrics: lyrics.iter().map(|s| s.to_string()).collect(),
            offset: (0..n).map(|i| i as f64 * 0.25).collect(),
            lns: vec![0; n],
            bas: vec![0; n],
        }
    }

    #[test]
    fn test_parse_bounds_collapses_consecutive() {
        // 1 is adjacent to the first note, so the later bound goes; the end
        // of the score is always appended
        assert_eq!(parse_bounds(vec![0, 1, 5, 10], 0, 12), vec![0, 5, 10, 12]);
    }

    #[test]
    fn test_parse_bounds_drops_earlier_bound() {
        // away from the first note the earlier of two adjacent bounds goes
        assert_eq!(parse_bounds(vec![4, 5, 9], 0, 12), vec![0, 5, 9, 12]);
    }

    #[test]
    fn test_no_annotations_yield_no_phrases() {
        let score = make_score(&[51, 9, 9, 9], &["", "ya", "le", "li"]);
        let extractor = PhraseExtractor::new(ReferenceData::builtin(), 0.75, 0.75);
        let phrases = extractor.extract_annotated(&score, &[]).unwrap();
        assert!(phrases.is_empty());
    }

    #[test]
    fn test_usul_changes_alone_are_not_annotations() {
        // a mid-score usul change without any 53/54/55 row means the score
        // was never phrase-annotated
        let score = make_score(
            &[51, 9, 9, 9, 51, 9, 9, 9],
            &["", "", "", "", "", "", "", ""],
        );
        let extractor = PhraseExtractor::new(ReferenceData::builtin(), 0.75, 0.75);
        let phrases = extractor.extract_annotated(&score, &[]).unwrap();
        assert!(phrases.is_empty());
    }

    #[test]
    fn test_annotation_before_first_note_is_not_a_bound() {
        let score = make_score(&[51, 53, 9, 9], &["", "", "ya", "le"]);
        let extractor = PhraseExtractor::new(ReferenceData::builtin(), 0.75, 0.75);
        let phrases = extractor.extract_annotated(&score, &[]).unwrap();

        // the stray annotation row only marks the score as annotated; the
        // single phrase starts at the first sounding note
        assert_eq!(phrases.len(), 1);
        assert_eq!((phrases[0].start_note, phrases[0].end_note), (3, 4));
    }

    #[test]
    fn test_annotated_phrases_split_and_name() {
        // phrase annotation (53) after the fourth note splits the piece;
        // first half sung, second half instrumental
        let score = make_score(
            &[51, 9, 9, 9, 9, 53, 9, 9, 9, 9],
            &["", "ya", "le", "li", "yar", "", "", "", "", ""],
        );
        let extractor = PhraseExtractor::new(ReferenceData::builtin(), 0.75, 0.75);
        let phrases = extractor.extract_annotated(&score, &[]).unwrap();

        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].name, "VOCAL_PHRASE");
        assert_eq!(phrases[0].lyrics, "yaleliyar");
        assert_eq!(phrases[1].name, "INSTRUMENTAL_PHRASE");
        assert_eq!(phrases[1].lyric_structure.as_deref(), Some("INSTRUMENTAL"));
        // external 1-based note numbers
        assert_eq!((phrases[0].start_note, phrases[0].end_note), (2, 5));
        assert_eq!((phrases[1].start_note, phrases[1].end_note), (6, 10));
    }

    #[test]
    fn test_flavor_rows_are_collected() {
        let score = make_score(
            &[51, 9, 9, 54, 9, 9],
            &["", "ya", "le", "Hicaz", "li", "yar"],
        );
        let extractor = PhraseExtractor::new(ReferenceData::builtin(), 0.75, 0.75);
        let phrases = extractor.extract_annotated(&score, &[]).unwrap();

        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[1].flavor, vec!["Hicaz".to_string()]);
    }

    #[test]
    fn test_auto_segments_use_external_note_numbers() {
        let score = make_score(
            &[51, 9, 9, 9, 9, 9, 9, 9],
            &["", "", "", "", "", "", "", ""],
        );
        let extractor = PhraseExtractor::new(ReferenceData::builtin(), 0.75, 0.75);
        // note number 5 is local row 4
        let segments = extractor
            .extract_auto_segments(&score, &[5], &[])
            .unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].name, "INSTRUMENTAL_SEGMENT");
        assert_eq!((segments[0].start_note, segments[0].end_note), (2, 4));
        assert_eq!((segments[1].start_note, segments[1].end_note), (5, 8));
    }

    #[test]
    fn test_unknown_segment_bound_is_rejected() {
        let score = make_score(&[51, 9, 9], &["", "", ""]);
        let extractor = PhraseExtractor::new(ReferenceData::builtin(), 0.75, 0.75);
        assert!(matches!(
            extractor.extract_auto_segments(&score, &[99], &[]),
            Err(ExtractorError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_section_linking() {
        let score = make_score(
            &[51, 9, 9, 9, 53, 9, 9, 9],
            &["", "ya", "le", "li", "", "", "", ""],
        );
        let mut section_a = Fragment::new("VOCAL_SECTION", "VOCAL_SECTION", 2, 4, String::new());
        section_a.lyric_structure = Some("A1".to_string());
        section_a.melodic_structure = Some("A1".to_string());
        let mut section_b =
            Fragment::new("INSTRUMENTAL_SECTION", "INSTRUMENTAL_SECTION", 5, 8, String::new());
        section_b.lyric_structure = Some("INSTRUMENTAL".to_string());
        section_b.melodic_structure = Some("B1".to_string());
        let sections = vec![section_a, section_b];

        let extractor = PhraseExtractor::new(ReferenceData::builtin(), 0.75, 0.75);
        let phrases = extractor.extract_annotated(&score, &sections).unwrap();

        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].sections.len(), 1);
        assert_eq!(phrases[0].sections[0].section_idx, 0);
        assert_eq!(phrases[0].sections[0].lyric_structure, "A1");
        assert_eq!(phrases[1].sections[0].section_idx, 1);
    }

    #[test]
    fn test_span_over_three_sections_references_the_middle_one() {
        let score = make_score(
            &[51, 9, 9, 9, 9, 9, 9],
            &["", "", "", "", "", "", ""],
        );
        let mut sections = Vec::new();
        for (i, (start, end)) in [(2, 3), (4, 5), (6, 7)].iter().enumerate() {
            let mut section =
                Fragment::new("VOCAL_SECTION", "VOCAL_SECTION", *start, *end, String::new());
            section.lyric_structure = Some(format!("A{}", i + 1));
            section.melodic_structure = Some(format!("A{}", i + 1));
            sections.push(section);
        }

        let extractor = PhraseExtractor::new(ReferenceData::builtin(), 0.75, 0.75);
        // one segment covering the whole score crosses all three sections
        let segments = extractor
            .extract_auto_segments(&score, &[2], &sections)
            .unwrap();

        assert_eq!(segments.len(), 1);
        let idx: Vec<usize> = segments[0].sections.iter().map(|r| r.section_idx).collect();
        assert_eq!(idx, vec![0, 1, 2]);
        assert_eq!(segments[0].sections[1].lyric_structure, "A2");
    }
}
