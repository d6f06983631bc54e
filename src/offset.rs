//! Measure-offset processing
//!
//! The offset column is pre-shifted by the reader so the first note of
//! measure k carries offset k. These helpers find the first note of every
//! integer-numbered measure and snap arbitrary offsets back to the nearest
//! measure start.

/// Tolerance for floating-point integer comparisons on offsets
const OFFSET_TOL: f64 = 0.001;

/// Index of the first event of every integer-numbered measure
///
/// Returns the indices for measures `0..=floor(max offset)` and a validity
/// flag. The flag is false when a discovered measure start does not land on
/// the requested measure number, i.e. some measure is skipped entirely by
/// the offsets.
pub fn find_measure_start_idx(offsets: &[f64]) -> (Vec<usize>, bool) {
    let mut measure_start_idx = Vec::new();
    if offsets.is_empty() {
        return (measure_start_idx, true);
    }

    let max_offset = offsets.iter().copied().fold(f64::MIN, f64::max);
    let mut skipped = Vec::new();
    for measure in 0..=(max_offset.floor() as i64) {
        let target = measure as f64;
        if let Some(idx) = offsets.iter().position(|&o| o > target - OFFSET_TOL) {
            measure_start_idx.push(idx);
            if (offsets[idx] - target).abs() > OFFSET_TOL {
                skipped.push(offsets[idx]);
            }
        }
    }

    let is_measure_start_valid = skipped.is_empty();
    if !is_measure_start_valid {
        log::warn!("some measures are skipped by the offsets: {:?}", skipped);
    }

    (measure_start_idx, is_measure_start_valid)
}

/// Whether an offset sits on a measure boundary (integer, within tolerance)
pub fn is_integer_offset(offset: f64) -> bool {
    (offset - offset.round()).abs() * 1000.0 < 1.0
}

/// Measure-start index nearest to a requested measure offset
///
/// Used to snap a lyric onset back to the start of the measure in which it
/// occurs. Ties resolve to the earlier measure start.
pub fn get_measure_offset_id(
    measure_offset: f64,
    offsets: &[f64],
    measure_start_idx: &[usize],
) -> Option<usize> {
    measure_start_idx
        .iter()
        .copied()
        .min_by(|&a, &b| {
            (offsets[a] - measure_offset)
                .abs()
                .total_cmp(&(offsets[b] - measure_offset).abs())
        })
}
