//! Data models for SymbTr score analysis

pub mod fragment;
pub mod score;

pub use fragment::{Boundary, Fragment, PendingSection, SectionRef};
pub use score::Score;
