//! Tunable limits for the labelling passes.
//!
//! Grounded on `original_source/src/bibx/algorithms/sap.py::Sap.__init__`
//! for every field but `max_branch_size`, which has no precedent in the
//! snapshot available (branch/Louvain post-dates it) and uses the
//! default stated for the branch pass.

/// Configuration for a SAP classification run.
#[derive(Debug, Clone, Copy)]
pub struct SapConfig {
    pub max_roots: usize,
    pub max_leaves: usize,
    pub max_trunk: usize,
    pub max_branch_size: usize,
    pub min_leaf_connections: Option<u64>,
    pub max_leaf_age_years: Option<i32>,
}

impl Default for SapConfig {
    fn default() -> Self {
        SapConfig {
            max_roots: 20,
            max_leaves: 50,
            max_trunk: 20,
            max_branch_size: 15,
            min_leaf_connections: Some(3),
            max_leaf_age_years: Some(7),
        }
    }
}
