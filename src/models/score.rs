//! SymbTr score record
//!
//! A score is an ordered sequence of note events stored as parallel arrays,
//! mirroring the columns of the SymbTr-txt format. The `index` column is the
//! external, 1-based event identifier; all processing happens in 0-based
//! local indices and is remapped to `index` just before results are returned.

/// Event code of an ordinary note or rest row
pub const NOTE_CODE: i32 = 9;

/// Event code marking an usul (rhythmic cycle) boundary
pub const USUL_BOUNDARY_CODE: i32 = 51;

/// Event codes marking phrase/annotation rows (incl. the usul boundary)
pub const PHRASE_BOUND_CODES: [i32; 4] = [51, 53, 54, 55];

/// Event codes of explicit phrase annotations (excl. the usul boundary)
pub const PHRASE_ANNOTATION_CODES: [i32; 3] = [53, 54, 55];

/// Event code of a cesni/flavor annotation row
pub const FLAVOR_CODE: i32 = 54;

/// Inclusive range of control-row event codes
pub const CONTROL_CODE_RANGE: std::ops::RangeInclusive<i32> = 50..=56;

/// A SymbTr score as parallel per-event columns
///
/// All vectors have the same length. Rows with `duration == 0` are
/// control/annotation rows, not sounding events.
#[derive(Debug, Clone, Default)]
pub struct Score {
    /// External 1-based event identifier (strictly +1 per row)
    pub index: Vec<usize>,
    /// Event-type code (9 note/rest, 50-56 control rows)
    pub code: Vec<i32>,
    /// Pitch symbol in the 53-comma (Tura) system
    pub note53: Vec<String>,
    /// Pitch symbol in the Arel-Ezgi-Uzdilek system
    pub note_ae: Vec<String>,
    /// Pitch height in 53-comma units (-1 for rests)
    pub comma53: Vec<i32>,
    /// Pitch height in AEU comma units (-1 for rests)
    pub comma_ae: Vec<i32>,
    /// Symbolic duration numerator, relative to the usul's metrical unit
    pub numerator: Vec<u32>,
    /// Symbolic duration denominator
    pub denumerator: Vec<u32>,
    /// Wall-clock duration in milliseconds (0 for annotation rows)
    pub duration: Vec<u32>,
    /// Lyrics column: syllables, structure labels or annotation text
    pub lyrics: Vec<String>,
    /// Fractional beat offset, pre-shifted so measure k starts at offset k
    pub offset: Vec<f64>,
    /// SymbTr-internal line identifier
    pub lns: Vec<u32>,
    /// Bass/accompaniment column
    pub bas: Vec<u32>,
}

impl Score {
    /// Number of events in the score
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// True when the score has no events
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Index of the first event that is not a control row
    pub fn first_note_idx(&self) -> Option<usize> {
        self.code
            .iter()
            .position(|c| !CONTROL_CODE_RANGE.contains(c))
    }

    /// Whether event `i` is notated as a rest
    pub fn is_rest(&self, i: usize) -> bool {
        self.comma53[i] == -1
            || self.comma_ae[i] == -1
            || ["Es", "Sus", ""]
                .iter()
                .any(|rs| self.note53[i] == *rs || self.note_ae[i] == *rs)
    }

    /// True when every lyrics field is empty
    pub fn has_empty_lyrics(&self) -> bool {
        self.lyrics.iter().all(|l| l.is_empty())
    }
}

/// Indices of events that carry an actual sung syllable
///
/// Structure labels, annotation characters and zero-duration rows are
/// filtered out; only the remaining lyric-bearing events are returned.
pub fn true_lyrics_idx(lyrics: &[String], labels: &[String], durations: &[u32]) -> Vec<usize> {
    lyrics
        .iter()
        .enumerate()
        .filter(|(i, l)| {
            !(labels.iter().any(|lb| lb == *l)
                || matches!(l.as_str(), "." | "" | " ")
                || durations[*i] == 0)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Concatenated true lyrics within `[start, end]`, embedded spaces removed
pub fn lyrics_between(score: &Score, labels: &[String], start: usize, end: usize) -> String {
    let real_lyrics_idx = true_lyrics_idx(&score.lyrics, labels, &score.duration);
    real_lyrics_idx
        .iter()
        .filter(|&&i| start <= i && i <= end)
        .map(|&i| score.lyrics[i].replace(' ', ""))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_with_codes(codes: &[i32]) -> Score {
        let n = codes.len();
        Score {
            index: (1..=n).collect(),
            code: codes.to_vec(),
            note53: vec![String::new(); n],
            note_ae: vec![String::new(); n],
            comma53: vec![0; n],
            comma_ae: vec![0; n],
            numerator: vec![1; n],
            denumerator: vec![4; n],
            duration: vec![250; n],
            lyrics: vec![String::new(); n],
            offset: vec![0.0; n],
            lns: vec![0; n],
            bas: vec![0; n],
        }
    }

    #[test]
    fn test_first_note_skips_control_rows() {
        let score = score_with_codes(&[51, 52, 9, 9]);
        assert_eq!(score.first_note_idx(), Some(2));
    }

    #[test]
    fn test_first_note_none_for_all_control() {
        let score = score_with_codes(&[51, 52, 53]);
        assert_eq!(score.first_note_idx(), None);
    }

    #[test]
    fn test_true_lyrics_idx_filters_labels_and_control_rows() {
        let lyrics: Vec<String> = ["NAKARAT", "ya", ".", "", "le", " ", "li"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let labels = vec!["NAKARAT".to_string()];
        let durations = vec![0, 250, 250, 250, 250, 250, 0];

        // "li" is dropped for its zero duration even though it reads as a syllable
        assert_eq!(true_lyrics_idx(&lyrics, &labels, &durations), vec![1, 4]);
    }

    #[test]
    fn test_lyrics_between_strips_embedded_spaces() {
        let mut score = score_with_codes(&[9, 9, 9]);
        score.lyrics = vec!["gel ".to_string(), "di  ".to_string(), "m".to_string()];
        let joined = lyrics_between(&score, &[], 0, 1);
        assert_eq!(joined, "geldi");
    }
}
