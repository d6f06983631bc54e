//! Clique partitions over fragment distance matrices
//!
//! Builds two clique decompositions over the fragment indices: `exact`
//! (distance within floating-point noise of zero) and `similar` (distance
//! below the configured threshold). Maximal cliques are enumerated with
//! Bron-Kerbosch, matching the behavior of a general clique finder over what
//! is in practice an equivalence-class graph.
//!
//! Equality is transitive, so the exact cliques must partition the indices;
//! overlap there is an invariant violation. Similar cliques may overlap when
//! the similarity relation is not transitive - an exact clique contained in
//! several similar cliques is what produces mixture labels downstream.

use std::collections::BTreeSet;

use crate::error::{ExtractorError, ExtractorResult};

/// Tolerance for treating two fragments as literally equal
const EXACT_DIST_THRESHOLD: f64 = 0.001;

/// Exact and similar clique decompositions over fragment indices
#[derive(Debug, Clone)]
pub struct Cliques {
    /// Cliques of literally identical fragments (a partition)
    pub exact: Vec<BTreeSet<usize>>,
    /// Cliques of similar fragments (may overlap)
    pub similar: Vec<BTreeSet<usize>>,
}

/// Build the clique decompositions for a distance matrix
///
/// `sim_thres` is a similarity threshold in [0, 1]; it is converted to the
/// distance threshold `1 - sim_thres` internally. Both clique lists are
/// sorted by their minimum member so downstream label assignment is
/// deterministic.
pub fn get_cliques(dists: &[Vec<f64>], sim_thres: f64) -> ExtractorResult<Cliques> {
    let dist_thres = 1.0 - sim_thres;

    let similar = sort_cliques(find_cliques(&adjacency(dists, dist_thres)));
    let exact = sort_cliques(find_cliques(&adjacency(dists, EXACT_DIST_THRESHOLD)));

    validate_exact_partition(&exact, dists.len())?;

    Ok(Cliques { exact, similar })
}

/// Neighbor sets of the graph with an edge wherever distance <= threshold
fn adjacency(dists: &[Vec<f64>], threshold: f64) -> Vec<BTreeSet<usize>> {
    let n = dists.len();
    let mut adj = vec![BTreeSet::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if dists[i][j] <= threshold {
                adj[i].insert(j);
                adj[j].insert(i);
            }
        }
    }
    adj
}

/// Enumerate all maximal cliques (Bron-Kerbosch with pivoting)
fn find_cliques(adj: &[BTreeSet<usize>]) -> Vec<BTreeSet<usize>> {
    let mut cliques = Vec::new();
    let mut r = BTreeSet::new();
    let p: BTreeSet<usize> = (0..adj.len()).collect();
    bron_kerbosch(adj, &mut r, p, BTreeSet::new(), &mut cliques);
    cliques
}

fn bron_kerbosch(
    adj: &[BTreeSet<usize>],
    r: &mut BTreeSet<usize>,
    mut p: BTreeSet<usize>,
    mut x: BTreeSet<usize>,
    out: &mut Vec<BTreeSet<usize>>,
) {
    if p.is_empty() && x.is_empty() {
        out.push(r.clone());
        return;
    }

    // pivot on the vertex with the most candidates among its neighbors
    let pivot = match p
        .union(&x)
        .copied()
        .max_by_key(|&u| adj[u].intersection(&p).count())
    {
        Some(u) => u,
        None => return,
    };

    let candidates: Vec<usize> = p.difference(&adj[pivot]).copied().collect();
    for v in candidates {
        r.insert(v);
        let next_p: BTreeSet<usize> = p.intersection(&adj[v]).copied().collect();
        let next_x: BTreeSet<usize> = x.intersection(&adj[v]).copied().collect();
        bron_kerbosch(adj, r, next_p, next_x, out);
        r.remove(&v);
        p.remove(&v);
        x.insert(v);
    }
}

/// Sort cliques by their minimum member index, ascending
fn sort_cliques(mut cliques: Vec<BTreeSet<usize>>) -> Vec<BTreeSet<usize>> {
    cliques.sort_by_key(|c| c.iter().next().copied().unwrap_or(usize::MAX));
    cliques
}

fn validate_exact_partition(exact: &[BTreeSet<usize>], n: usize) -> ExtractorResult<()> {
    let mut seen = vec![0usize; n];
    for clique in exact {
        for &e in clique {
            seen[e] += 1;
        }
    }
    if seen.iter().any(|&count| count != 1) {
        return Err(ExtractorError::InvariantViolation(
            "exact cliques do not partition the fragment indices".to_string(),
        ));
    }
    Ok(())
}
