//! Turkish-aware slugification
//!
//! Used for section names written in the lyrics column, which carry Turkish
//! characters (dotless i, cedillas, circumflexes). The transliteration folds
//! them to ASCII before the usual slug cleanup.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s-]").expect("valid regex");
    static ref SEPARATORS: Regex = Regex::new(r"[-\s]+").expect("valid regex");
}

/// Slugify a Turkish string
///
/// Folds Turkish letters to their ASCII counterparts, drops any remaining
/// non-ASCII characters, strips non-word characters and collapses whitespace
/// and hyphen runs into single hyphens.
pub fn slugify_tr(value: &str) -> String {
    let folded: String = value.chars().filter_map(fold_char).collect();
    let cleaned = NON_WORD.replace_all(&folded, "");
    SEPARATORS
        .replace_all(cleaned.trim(), "-")
        .into_owned()
}

fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'ı' => 'i',
        'İ' => 'I',
        'ğ' => 'g',
        'Ğ' => 'G',
        'ş' => 's',
        'Ş' => 'S',
        'ç' => 'c',
        'Ç' => 'C',
        'ö' => 'o',
        'Ö' => 'O',
        'ü' => 'u',
        'Ü' => 'U',
        'â' | 'á' | 'à' => 'a',
        'Â' | 'Á' | 'À' => 'A',
        'î' | 'í' | 'ì' => 'i',
        'Î' | 'Í' | 'Ì' => 'I',
        'û' | 'ú' | 'ù' => 'u',
        'Û' | 'Ú' | 'Ù' => 'U',
        'ê' | 'é' | 'è' => 'e',
        'Ê' | 'É' | 'È' => 'E',
        'ô' | 'ó' | 'ò' => 'o',
        'Ô' | 'Ó' | 'Ò' => 'O',
        other if other.is_ascii() => other,
        _ => return None,
    };
    Some(folded)
}
