//! SAP ("sap" = structure, authors, patterns) graph classifier: builds a
//! citation graph from a [`Collection`], cleans it, and labels vertices
//! as root / leaf / trunk / branch by the passes in [`passes`] and
//! [`branch`].

pub mod branch;
pub mod cleanup;
pub mod config;
pub mod graph;
pub mod passes;

use petgraph::graph::{DiGraph, NodeIndex};

pub use config::SapConfig;
pub use graph::NodeAttrs;

use crate::error::Result;
use crate::model::Collection;

pub type Tree = DiGraph<NodeAttrs, ()>;

/// Build, clean, and fully label a citation graph from `collection`.
///
/// Mirrors `original_source/src/bibx/algorithms/sap.py::Sap.tree`, with
/// the added branch pass (see [`branch`] for its grounding).
pub fn classify(collection: &Collection, cfg: &SapConfig) -> Result<Tree> {
    let cg = graph::build_graph(collection);
    let cg = cleanup::cleanup(cg);
    let mut tree = cg.graph;

    passes::compute_root(&mut tree, cfg);
    passes::compute_leaves(&mut tree, cfg)?;
    passes::compute_sap(&mut tree)?;
    passes::compute_trunk(&mut tree, cfg)?;
    branch::compute_branch(&mut tree, cfg);
    Ok(tree)
}

/// Keep only vertices tagged root, trunk, leaf, or branch — drops
/// whatever [`classify`] left unclassified, mirroring `Sap._clear`.
pub fn prune(tree: &Tree) -> Tree {
    let keep: Vec<NodeIndex> = tree
        .node_indices()
        .filter(|&n| tree[n].root > 0 || tree[n].trunk > 0 || tree[n].leaf > 0 || tree[n].branch > 0)
        .collect();
    tree.filter_map(
        |idx, attrs| if keep.contains(&idx) { Some(attrs.clone()) } else { None },
        |_, _| Some(()),
    )
}

/// The role a labelled vertex plays in the tree, mirroring
/// `Preprocess._get_tos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Root,
    Trunk,
    Leaf,
    Branch(u8),
    Unclassified,
}

pub fn role(attrs: &NodeAttrs) -> Role {
    if attrs.root > 0 {
        Role::Root
    } else if attrs.trunk > 0 {
        Role::Trunk
    } else if attrs.leaf > 0 {
        Role::Leaf
    } else if attrs.branch > 0 {
        Role::Branch(attrs.branch)
    } else {
        Role::Unclassified
    }
}
