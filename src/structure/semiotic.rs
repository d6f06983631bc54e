//! Semiotic structure labeling
//!
//! Converts the clique partitions into per-fragment labels following the
//! annotation conventions of Bimbot et al., "Semiotic structure labeling of
//! music pieces: Concepts, methods and annotation conventions" (ISMIR 2012).
//! Only the simplest labels are produced: A, A1, B and mixtures such as AB1.

use std::collections::HashMap;

use crate::error::{ExtractorError, ExtractorResult};
use crate::structure::cliques::Cliques;

/// Assign a semiotic label to every fragment index covered by the cliques
///
/// Each similar clique contributes a base letter in sorted order; each exact
/// clique gets the base letter(s) of the similar clique(s) containing it plus
/// a running occurrence counter. All members of one exact clique receive the
/// identical label string.
pub fn semiotize(cliques: &Cliques) -> ExtractorResult<Vec<String>> {
    let num_nodes = cliques
        .exact
        .iter()
        .flatten()
        .max()
        .map_or(0, |&max| max + 1);
    let mut labels = vec![String::from("?"); num_nodes];

    let basenames = basenames(cliques.similar.len());
    let mut similar_counters = vec![1usize; cliques.similar.len()];
    let mut mixture_counters: HashMap<String, usize> = HashMap::new();

    for exact_clique in &cliques.exact {
        let containing: Vec<usize> = cliques
            .similar
            .iter()
            .enumerate()
            .filter(|(_, sim)| exact_clique.is_subset(sim))
            .map(|(i, _)| i)
            .collect();

        match containing.len() {
            0 => {
                return Err(ExtractorError::InvariantViolation(
                    "exact clique is not contained in any similar clique".to_string(),
                ))
            }
            1 => {
                let si = containing[0];
                for &e in exact_clique {
                    labels[e] = format!("{}{}", basenames[si], similar_counters[si]);
                }
                similar_counters[si] += 1;
            }
            _ => {
                let mixture: String = containing.iter().map(|&i| basenames[i]).collect();
                let counter = *mixture_counters.get(&mixture).unwrap_or(&1);
                for &e in exact_clique {
                    labels[e] = format!("{}{}", mixture, counter);
                }
                mixture_counters.insert(mixture, counter + 1);
            }
        }
    }

    Ok(labels)
}

/// Base letters for similar cliques: A..Z, continuing through the uppercase
/// Unicode letters when a piece has more than 26 similarity groups
fn basenames(n: usize) -> Vec<char> {
    (0u32..)
        .filter_map(char::from_u32)
        .filter(|c| c.is_uppercase())
        .take(n)
        .collect()
}
