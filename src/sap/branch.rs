//! Branch pass: modularity-driven community detection on the undirected
//! projection of the graph, followed by recency-based member selection.
//!
//! No precedent exists in the retrieved `original_source` snapshot of
//! `sap.py` (the branch/Louvain feature post-dates it — `preprocess.py`
//! already references a `BRANCH` constant from a later version we don't
//! have). Implemented as a single-level greedy modularity optimization
//! (the first phase of Louvain, without the hierarchical aggregation
//! step) since `petgraph` has no built-in community detection and no
//! pack example performs one.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::sap::config::SapConfig;
use crate::sap::graph::NodeAttrs;

type Graph = DiGraph<NodeAttrs, ()>;

fn undirected_adjacency(graph: &Graph) -> HashMap<NodeIndex, HashMap<NodeIndex, f64>> {
    let mut adjacency: HashMap<NodeIndex, HashMap<NodeIndex, f64>> = HashMap::new();
    for idx in graph.node_indices() {
        adjacency.entry(idx).or_default();
    }
    for edge in graph.edge_indices() {
        let (a, b) = graph.edge_endpoints(edge).unwrap();
        if a == b {
            continue;
        }
        *adjacency.entry(a).or_default().entry(b).or_insert(0.0) += 1.0;
        *adjacency.entry(b).or_default().entry(a).or_insert(0.0) += 1.0;
    }
    adjacency
}

/// Single-level greedy modularity optimization: repeatedly move each
/// vertex into the neighboring community that most increases modularity,
/// until a full pass makes no move.
fn louvain_communities(graph: &Graph) -> HashMap<NodeIndex, usize> {
    let adjacency = undirected_adjacency(graph);
    let nodes: Vec<NodeIndex> = graph.node_indices().collect();
    let degree: HashMap<NodeIndex, f64> =
        nodes.iter().map(|&n| (n, adjacency[&n].values().sum())).collect();
    let total_weight: f64 = degree.values().sum::<f64>() / 2.0;

    let mut community: HashMap<NodeIndex, usize> =
        nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    if total_weight == 0.0 {
        return community;
    }
    let mut community_degree: HashMap<usize, f64> =
        nodes.iter().map(|&n| (community[&n], degree[&n])).collect();

    let two_m = 2.0 * total_weight;
    let mut improved = true;
    while improved {
        improved = false;
        for &node in &nodes {
            let node_degree = degree[&node];
            let current = community[&node];
            *community_degree.entry(current).or_insert(0.0) -= node_degree;

            let mut neighbor_weight: HashMap<usize, f64> = HashMap::new();
            for (&neighbor, &weight) in &adjacency[&node] {
                if neighbor == node {
                    continue;
                }
                *neighbor_weight.entry(community[&neighbor]).or_insert(0.0) += weight;
            }

            let mut best = current;
            let mut best_gain = 0.0;
            for (&candidate, &k_in) in &neighbor_weight {
                let sigma_tot = *community_degree.get(&candidate).unwrap_or(&0.0);
                let gain = k_in - sigma_tot * node_degree / two_m;
                if gain > best_gain {
                    best_gain = gain;
                    best = candidate;
                }
            }

            community.insert(node, best);
            *community_degree.entry(best).or_insert(0.0) += node_degree;
            if best != current {
                improved = true;
            }
        }
    }
    community
}

/// Assign `branch = 1..3` to the recency-selected members of the three
/// smallest communities (excluding roots and trunk vertices); `branch =
/// 0` elsewhere.
pub fn compute_branch(graph: &mut Graph, cfg: &SapConfig) {
    let community = louvain_communities(graph);
    let mut members: HashMap<usize, Vec<NodeIndex>> = HashMap::new();
    for (&node, &comm) in &community {
        members.entry(comm).or_default().push(node);
    }

    let mut by_size: Vec<(usize, Vec<NodeIndex>)> = members.into_iter().collect();
    by_size.sort_by_key(|(_, members)| members.len());

    for idx in graph.node_indices() {
        graph[idx].branch = 0;
    }

    for (branch_id, (_, nodes)) in by_size.into_iter().take(3).enumerate() {
        let mut candidates: Vec<(NodeIndex, i32)> = nodes
            .into_iter()
            .filter(|&n| graph[n].root == 0 && graph[n].trunk == 0)
            .filter_map(|n| graph[n].year.map(|y| (n, y)))
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        for (idx, _) in candidates.into_iter().take(cfg.max_branch_size) {
            graph[idx].branch = (branch_id + 1) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_graph_assigns_no_branches() {
        let mut graph: Graph = DiGraph::new();
        graph.add_node(NodeAttrs { key: "a".into(), year: Some(2020), ..Default::default() });
        compute_branch(&mut graph, &SapConfig::default());
        assert!(graph.node_indices().all(|n| graph[n].branch == 0));
    }

    #[test]
    fn branch_members_are_non_root_non_trunk() {
        let mut graph: Graph = DiGraph::new();
        let a = graph.add_node(NodeAttrs { key: "a".into(), year: Some(2020), root: 1, ..Default::default() });
        let b = graph.add_node(NodeAttrs { key: "b".into(), year: Some(2021), ..Default::default() });
        graph.add_edge(b, a, ());
        compute_branch(&mut graph, &SapConfig::default());
        assert_eq!(graph[a].branch, 0);
    }
}
