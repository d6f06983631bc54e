//! Structure labeling of resolved fragments
//!
//! Given fragments with resolved boundaries, analyzes the lyrics and the
//! melody of each fragment independently, groups fragments into similarity
//! cliques, and writes the resulting semiotic labels back onto new copies of
//! the fragments.
//!
//! The lyric organization only checks whether the lyrics are similar to each
//! other; it does not check that they are sung on the same notes or with the
//! same durations. Two fragments with identical text but different syllable
//! onsets therefore compare as equal, which in practice is rare.

use crate::error::{ExtractorError, ExtractorResult};
use crate::metadata::reference::ReferenceData;
use crate::models::score::true_lyrics_idx;
use crate::models::{Fragment, Score};
use crate::structure::cliques::get_cliques;
use crate::structure::distance::dist_matrix;
use crate::structure::semiotic::semiotize;

/// Lyric structure label of fragments without any sung lyrics
pub const INSTRUMENTAL_LABEL: &str = "INSTRUMENTAL";

/// Per-fragment slices of the score columns used during labeling
#[derive(Debug, Clone)]
struct ScoreFragment {
    durs: Vec<u32>,
    nums: Vec<u32>,
    denums: Vec<u32>,
    notes: Vec<i32>,
    lyrics: Vec<String>,
}

impl ScoreFragment {
    fn slice(score: &Score, start: usize, end: usize) -> Self {
        ScoreFragment {
            durs: score.duration[start..=end].to_vec(),
            nums: score.numerator[start..=end].to_vec(),
            denums: score.denumerator[start..=end].to_vec(),
            notes: score.comma53[start..=end].to_vec(),
            lyrics: score.lyrics[start..=end].to_vec(),
        }
    }

    /// Drop annotation/control rows (zero duration) from all columns
    fn drop_silent_rows(&mut self) {
        let keep: Vec<bool> = self.durs.iter().map(|&d| d != 0).collect();
        let mut i = 0;
        self.notes.retain(|_| {
            i += 1;
            keep[i - 1]
        });
        let mut i = 0;
        self.nums.retain(|_| {
            i += 1;
            keep[i - 1]
        });
        let mut i = 0;
        self.denums.retain(|_| {
            i += 1;
            keep[i - 1]
        });
        self.durs.retain(|&d| d != 0);
    }
}

/// Labels fragments by lyric and melodic similarity
#[derive(Debug, Clone, Copy)]
pub struct StructureLabeler<'a> {
    ref_data: &'a ReferenceData,
    lyrics_sim_thres: f64,
    melody_sim_thres: f64,
}

impl<'a> StructureLabeler<'a> {
    /// Create a labeler with the given similarity thresholds
    pub fn new(ref_data: &'a ReferenceData, lyrics_sim_thres: f64, melody_sim_thres: f64) -> Self {
        StructureLabeler {
            ref_data,
            lyrics_sim_thres,
            melody_sim_thres,
        }
    }

    /// Compute `lyric_structure` and `melodic_structure` for every fragment
    ///
    /// Consumes the fragments and returns annotated copies; boundaries must
    /// be 0-based local note indices into `score`.
    pub fn label_structures(
        &self,
        mut fragments: Vec<Fragment>,
        score: &Score,
    ) -> ExtractorResult<Vec<Fragment>> {
        if fragments.is_empty() {
            return Ok(fragments);
        }

        let mut score_fragments: Vec<ScoreFragment> = fragments
            .iter()
            .map(|f| ScoreFragment::slice(score, f.start_note, f.end_note))
            .collect();

        self.lyric_organization(&mut fragments, &score_fragments)?;
        self.melodic_organization(&mut fragments, &mut score_fragments)?;

        Ok(fragments)
    }

    fn lyric_organization(
        &self,
        fragments: &mut [Fragment],
        score_fragments: &[ScoreFragment],
    ) -> ExtractorResult<()> {
        let all_labels = self.ref_data.labels.all();

        // strip structure labels, annotation characters and control rows
        let lyric_streams: Vec<String> = score_fragments
            .iter()
            .map(|sf| {
                true_lyrics_idx(&sf.lyrics, &all_labels, &sf.durs)
                    .iter()
                    .map(|&i| sf.lyrics[i].replace(' ', ""))
                    .collect()
            })
            .collect();

        let dists = dist_matrix(&lyric_streams);
        let cliques = get_cliques(&dists, self.lyrics_sim_thres)?;
        let labels = semiotize(&cliques)?;

        for (i, fragment) in fragments.iter_mut().enumerate() {
            fragment.lyric_structure = Some(if lyric_streams[i].is_empty() {
                INSTRUMENTAL_LABEL.to_string()
            } else {
                labels[i].clone()
            });
        }

        assert_labels(&lyric_streams, &labels, "lyrics")
    }

    fn melodic_organization(
        &self,
        fragments: &mut [Fragment],
        score_fragments: &mut [ScoreFragment],
    ) -> ExtractorResult<()> {
        for sf in score_fragments.iter_mut() {
            sf.drop_silent_rows();
        }

        // the shortest note across all fragments has the greatest denominator;
        // it becomes the common time unit for melody synthesis
        let max_denum = score_fragments
            .iter()
            .flat_map(|sf| sf.denums.iter().copied())
            .max()
            .unwrap_or(1);

        let melodies: Vec<Vec<i32>> = score_fragments
            .iter()
            .map(|sf| synth_melody(sf, max_denum))
            .collect();

        // map each distinct pitch to a single letter for edit distance
        let mut unique_notes: Vec<i32> = Vec::new();
        for sf in score_fragments.iter() {
            for &note in &sf.notes {
                if !unique_notes.contains(&note) {
                    unique_notes.push(note);
                }
            }
        }
        let letters = letter_table(unique_notes.len());
        let melody_streams: Vec<String> = melodies
            .iter()
            .map(|m| mel_to_str(m, &unique_notes, &letters))
            .collect();

        let dists = dist_matrix(&melody_streams);
        let cliques = get_cliques(&dists, self.melody_sim_thres)?;
        let labels = semiotize(&cliques)?;

        for (i, fragment) in fragments.iter_mut().enumerate() {
            fragment.melodic_structure = Some(melodic_label(fragment, &labels[i]));
        }

        assert_labels(&melodies, &labels, "melody")
    }
}

/// Melodic label for one fragment
///
/// Fragments named after an explicit structure label (neither VOCAL nor
/// INSTRUMENTAL) carry their slug as a prefix; the occurrence counter is kept
/// bare, while mixture labels are kept whole.
fn melodic_label(fragment: &Fragment, label: &str) -> String {
    let generic_name =
        fragment.name.contains("VOCAL") || fragment.name.contains("INSTRUMENTAL");
    if generic_name {
        return label.to_string();
    }

    let mut chars = label.chars();
    chars.next();
    let rest: String = chars.collect();
    if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("{}_{}", fragment.slug, rest)
    } else {
        format!("{}_{}", fragment.slug, label)
    }
}

/// Repeat each pitch so all fragments share one rhythmic grid
fn synth_melody(sf: &ScoreFragment, max_denum: u32) -> Vec<i32> {
    let mut melody = Vec::new();
    for (i, &note) in sf.notes.iter().enumerate() {
        if sf.denums[i] == 0 {
            continue;
        }
        let num_samples = (sf.nums[i] as usize * max_denum as usize) / sf.denums[i] as usize;
        melody.extend(std::iter::repeat(note).take(num_samples));
    }
    melody
}

/// Concatenate the melody into a string of per-pitch letters
fn mel_to_str(melody: &[i32], unique_notes: &[i32], letters: &[char]) -> String {
    melody
        .iter()
        .map(|note| {
            let idx = unique_notes
                .iter()
                .position(|n| n == note)
                .unwrap_or_default();
            letters[idx]
        })
        .collect()
}

/// Single-character symbols for pitch encoding: ASCII letters first, then
/// uppercase Unicode letters when a score uses more than 52 distinct pitches
fn letter_table(n: usize) -> Vec<char> {
    ('A'..='Z')
        .chain('a'..='z')
        .chain(
            (0xC0u32..)
                .filter_map(char::from_u32)
                .filter(|c| c.is_uppercase()),
        )
        .take(n)
        .collect()
}

/// Verify that fragments sharing a label have identical underlying content
///
/// Two fragments with the same label are by construction at most the exact
/// threshold apart; any inequality signals algorithm or data corruption and
/// is fatal.
fn assert_labels<T: PartialEq>(
    stream: &[T],
    labels: &[String],
    name: &str,
) -> ExtractorResult<()> {
    for (i, label) in labels.iter().enumerate() {
        for (j, other) in labels.iter().enumerate() {
            if label == other && stream[i] != stream[j] {
                return Err(ExtractorError::InvariantViolation(format!(
                    "mismatch in {} label: {}",
                    name, label
                )));
            }
        }
    }
    Ok(())
}
