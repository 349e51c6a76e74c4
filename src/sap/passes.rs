//! The root / leaf / sap / trunk labelling passes.
//!
//! Grounded on `original_source/src/bibx/algorithms/sap.py` (`_compute_root`,
//! `_compute_leaves`, `_compute_sap`, `_compute_trunk`), adapted from
//! `networkx`'s generic-attribute graph to `petgraph`'s typed `NodeAttrs`.
//! `_compute_root` there caps candidates by `max_trunk` before applying
//! `max_roots`, which looks like a copy-paste bug since the two budgets
//! are otherwise independent; the simpler "keep top `max_roots` by
//! score" rule is implemented here instead.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{BibError, Result};
use crate::sap::config::SapConfig;
use crate::sap::graph::NodeAttrs;

type Graph = DiGraph<NodeAttrs, ()>;

fn topological_order(graph: &Graph) -> Result<Vec<NodeIndex>> {
    toposort(graph, None).map_err(|_| BibError::SapPrecondition("graph must be acyclic"))
}

/// Roots: out-degree-0 vertices (cite nothing in the graph), scored by
/// in-degree, top `max_roots` kept, ties broken by insertion order.
pub fn compute_root(graph: &mut Graph, cfg: &SapConfig) {
    let mut candidates: Vec<(NodeIndex, u64)> = graph
        .node_indices()
        .filter(|&n| graph.edges_directed(n, Direction::Outgoing).count() == 0)
        .map(|n| (n, graph.edges_directed(n, Direction::Incoming).count() as u64))
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1));

    for idx in graph.node_indices() {
        graph[idx].root = 0;
    }
    for (idx, score) in candidates.into_iter().take(cfg.max_roots) {
        graph[idx].root = score;
    }
}

/// Leaves: in-degree-0 vertices (never cited), filtered by minimum
/// root-reachability and recency, top `max_leaves` by root-reachability.
pub fn compute_leaves(graph: &mut Graph, cfg: &SapConfig) -> Result<()> {
    let roots: Vec<NodeIndex> = graph.node_indices().filter(|&n| graph[n].root > 0).collect();
    if roots.is_empty() {
        return Err(BibError::SapPrecondition("graph must have at least one root"));
    }

    let order = topological_order(graph)?;
    let mut connections: HashMap<NodeIndex, u64> = HashMap::new();
    for &n in &roots {
        connections.insert(n, 1);
    }
    for &node in order.iter().rev() {
        let successors: Vec<NodeIndex> = graph.neighbors_directed(node, Direction::Outgoing).collect();
        if !successors.is_empty() {
            let sum = successors.iter().map(|s| *connections.get(s).unwrap_or(&0)).sum();
            connections.insert(node, sum);
        } else {
            connections.entry(node).or_insert(0);
        }
    }

    let all_candidates: Vec<(NodeIndex, u64)> = graph
        .node_indices()
        .filter(|&n| graph.edges_directed(n, Direction::Incoming).count() == 0)
        .map(|n| (n, *connections.get(&n).unwrap_or(&0)))
        .collect();

    let mut candidates = all_candidates.clone();
    if let Some(min_conn) = cfg.min_leaf_connections {
        candidates.retain(|(_, c)| *c >= min_conn);
    }
    if let Some(max_age) = cfg.max_leaf_age_years {
        let newest = candidates.iter().filter_map(|(n, _)| graph[*n].year).max();
        if let Some(newest) = newest {
            let cutoff = newest - max_age;
            candidates.retain(|(n, _)| graph[*n].year.map(|y| y >= cutoff).unwrap_or(false));
        }
    }
    if candidates.is_empty() {
        log::info!("sap: leaf filters removed every candidate, reverting to unfiltered list");
        candidates = all_candidates;
    }
    candidates.sort_by(|a, b| b.1.cmp(&a.1));

    for idx in graph.node_indices() {
        graph[idx].leaf = 0;
    }
    for (idx, c) in candidates.into_iter().take(cfg.max_leaves) {
        graph[idx].leaf = c;
    }
    Ok(())
}

/// Downstream flow from roots (`raw_sap`) and upstream flow from leaves
/// (`elaborate_sap`), combined into `sap`.
pub fn compute_sap(graph: &mut Graph) -> Result<()> {
    let roots: Vec<NodeIndex> = graph.node_indices().filter(|&n| graph[n].root > 0).collect();
    let leaves: Vec<NodeIndex> = graph.node_indices().filter(|&n| graph[n].leaf > 0).collect();
    if roots.is_empty() || leaves.is_empty() {
        return Err(BibError::SapPrecondition("graph must have both roots and leaves"));
    }

    for idx in graph.node_indices() {
        graph[idx].raw_sap = 0;
        graph[idx].root_connections = 0;
    }
    for &n in &roots {
        graph[n].raw_sap = graph[n].root;
        graph[n].root_connections = 1;
    }
    let order = topological_order(graph)?;
    for &node in order.iter().rev() {
        let successors: Vec<NodeIndex> = graph.neighbors_directed(node, Direction::Outgoing).collect();
        if !successors.is_empty() {
            let raw: u64 = successors.iter().map(|&s| graph[s].raw_sap).sum();
            let rc: u64 = successors.iter().map(|&s| graph[s].root_connections).sum();
            graph[node].raw_sap = raw;
            graph[node].root_connections = rc;
        }
    }

    for idx in graph.node_indices() {
        graph[idx].elaborate_sap = 0;
        graph[idx].leaf_connections = 0;
    }
    for &n in &leaves {
        graph[n].elaborate_sap = graph[n].leaf;
        graph[n].leaf_connections = 1;
    }
    for &node in &order {
        let predecessors: Vec<NodeIndex> = graph.neighbors_directed(node, Direction::Incoming).collect();
        if !predecessors.is_empty() {
            let elaborate: u64 = predecessors.iter().map(|&p| graph[p].elaborate_sap).sum();
            let lc: u64 = predecessors.iter().map(|&p| graph[p].leaf_connections).sum();
            graph[node].elaborate_sap = elaborate;
            graph[node].leaf_connections = lc;
        }
    }

    for idx in graph.node_indices() {
        let n = &graph[idx];
        graph[idx].sap = n.leaf_connections * n.raw_sap + n.root_connections * n.elaborate_sap;
    }
    Ok(())
}

/// Trunk: non-root, non-leaf vertices with positive `sap`, top
/// `max_trunk` by `sap`.
pub fn compute_trunk(graph: &mut Graph, cfg: &SapConfig) -> Result<()> {
    let mut candidates: Vec<(NodeIndex, u64)> = graph
        .node_indices()
        .filter(|&n| graph[n].root == 0 && graph[n].leaf == 0 && graph[n].sap > 0)
        .map(|n| (n, graph[n].sap))
        .collect();
    if candidates.is_empty() {
        return Err(BibError::SapPrecondition("graph must have at least one node with positive sap"));
    }
    candidates.sort_by(|a, b| b.1.cmp(&a.1));

    for idx in graph.node_indices() {
        graph[idx].trunk = 0;
    }
    for (idx, sap) in candidates.into_iter().take(cfg.max_trunk) {
        graph[idx].trunk = sap;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::DiGraph;

    fn node(key: &str, year: Option<i32>) -> NodeAttrs {
        NodeAttrs { key: key.to_string(), year, ..Default::default() }
    }

    /// A small diamond: newest -> mid1, mid2 -> oldest.
    fn diamond() -> Graph {
        let mut g = DiGraph::new();
        let newest = g.add_node(node("newest", Some(2022)));
        let mid1 = g.add_node(node("mid1", Some(2015)));
        let mid2 = g.add_node(node("mid2", Some(2016)));
        let oldest = g.add_node(node("oldest", Some(2000)));
        g.add_edge(newest, mid1, ());
        g.add_edge(newest, mid2, ());
        g.add_edge(mid1, oldest, ());
        g.add_edge(mid2, oldest, ());
        g
    }

    #[test]
    fn full_pipeline_labels_diamond() {
        let mut g = diamond();
        let cfg = SapConfig {
            min_leaf_connections: None,
            max_leaf_age_years: None,
            ..SapConfig::default()
        };
        compute_root(&mut g, &cfg);
        compute_leaves(&mut g, &cfg).unwrap();
        compute_sap(&mut g).unwrap();
        compute_trunk(&mut g, &cfg).unwrap();

        let oldest = g.node_indices().find(|&n| g[n].key == "oldest").unwrap();
        let newest = g.node_indices().find(|&n| g[n].key == "newest").unwrap();
        assert!(g[oldest].root > 0);
        assert!(g[newest].leaf > 0);
        assert!(g.node_indices().any(|n| g[n].trunk > 0));
    }

    #[test]
    fn trunk_fails_without_sap() {
        let mut g = diamond();
        let result = compute_trunk(&mut g, &SapConfig::default());
        assert!(matches!(result, Err(BibError::SapPrecondition(_))));
    }
}
