//! Normalized string distance
//!
//! Edit distance normalized by the longer string's length, so the result is
//! always in [0, 1]. Works on Unicode symbol sequences (lyric syllables) and
//! on the single-character melody encodings.

/// Levenshtein distance between `a` and `b`, normalized by the longer length
///
/// Two empty strings are identical by definition (e.g. two instrumental
/// fragments), so the distance is 0 rather than undefined.
pub fn norm_levenshtein(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    strsim::levenshtein(a, b) as f64 / max_len as f64
}

/// All-pairs distance matrix over a list of strings
///
/// The result is symmetric with a zero diagonal.
pub fn dist_matrix(items: &[String]) -> Vec<Vec<f64>> {
    let n = items.len();
    let mut dists = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = norm_levenshtein(&items[i], &items[j]);
            dists[i][j] = d;
            dists[j][i] = d;
        }
    }
    dists
}
