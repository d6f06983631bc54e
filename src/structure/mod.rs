//! Structural similarity analysis
//!
//! The semiotic labeling pipeline: string distance, clique grouping over the
//! distance matrices, label assignment, and the labeler that orchestrates the
//! lyric and melodic organization of a fragment list.

pub mod cliques;
pub mod distance;
pub mod labeler;
pub mod semiotic;

pub use cliques::{get_cliques, Cliques};
pub use distance::{dist_matrix, norm_levenshtein};
pub use labeler::{StructureLabeler, INSTRUMENTAL_LABEL};
pub use semiotic::semiotize;
