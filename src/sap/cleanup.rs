//! Graph cleanup: giant weakly-connected component, weak-leaf trimming,
//! and SCC-breaking so the labelling passes can assume a DAG.
//!
//! No `networkx`-cleanup precedent was retrieved in `original_source`;
//! `petgraph::algo` provides the equivalents of
//! `weakly_connected_components`/`strongly_connected_components`.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::sap::graph::{CitationGraph, NodeAttrs};

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind { parent: (0..n).collect() }
    }
    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

fn rebuild(graph: &DiGraph<NodeAttrs, ()>, keep: &HashSet<NodeIndex>) -> CitationGraph {
    let mut new_graph = DiGraph::new();
    let mut remap = HashMap::new();
    let mut index_by_key = HashMap::new();
    for idx in graph.node_indices() {
        if keep.contains(&idx) {
            let attrs = graph[idx].clone();
            let new_idx = new_graph.add_node(attrs.clone());
            remap.insert(idx, new_idx);
            index_by_key.insert(attrs.key, new_idx);
        }
    }
    for edge in graph.edge_indices() {
        let (a, b) = graph.edge_endpoints(edge).unwrap();
        if let (Some(&na), Some(&nb)) = (remap.get(&a), remap.get(&b)) {
            new_graph.update_edge(na, nb, ());
        }
    }
    CitationGraph { graph: new_graph, index_by_key }
}

/// Keep only the largest weakly-connected component.
pub fn largest_weak_component(cg: &CitationGraph) -> CitationGraph {
    let graph = &cg.graph;
    let n = graph.node_count();
    if n == 0 {
        return rebuild(graph, &HashSet::new());
    }
    let index_pos: HashMap<NodeIndex, usize> =
        graph.node_indices().enumerate().map(|(i, idx)| (idx, i)).collect();
    let mut uf = UnionFind::new(n);
    for edge in graph.edge_indices() {
        let (a, b) = graph.edge_endpoints(edge).unwrap();
        uf.union(index_pos[&a], index_pos[&b]);
    }
    let mut sizes: HashMap<usize, usize> = HashMap::new();
    for idx in graph.node_indices() {
        let root = uf.find(index_pos[&idx]);
        *sizes.entry(root).or_insert(0) += 1;
    }
    let Some((&biggest_root, _)) = sizes.iter().max_by_key(|(_, &size)| size) else {
        return rebuild(graph, &HashSet::new());
    };
    let keep: HashSet<NodeIndex> = graph
        .node_indices()
        .filter(|idx| uf.find(index_pos[idx]) == biggest_root)
        .collect();
    rebuild(graph, &keep)
}

/// Remove every vertex with in-degree 1 and out-degree 0: cited exactly
/// once and citing nothing in the graph.
pub fn remove_weak_leaves(cg: &CitationGraph) -> CitationGraph {
    let graph = &cg.graph;
    let keep: HashSet<NodeIndex> = graph
        .node_indices()
        .filter(|&idx| {
            let in_deg = graph.edges_directed(idx, Direction::Incoming).count();
            let out_deg = graph.edges_directed(idx, Direction::Outgoing).count();
            !(in_deg == 1 && out_deg == 0)
        })
        .collect();
    rebuild(graph, &keep)
}

/// Break every non-trivial strongly-connected component by removing
/// every edge whose endpoints both lie in it, yielding a DAG.
pub fn break_cycles(cg: &CitationGraph) -> CitationGraph {
    let graph = &cg.graph;
    let sccs = tarjan_scc(graph);
    let mut scc_of: HashMap<NodeIndex, usize> = HashMap::new();
    let mut scc_sizes: Vec<usize> = Vec::with_capacity(sccs.len());
    for (i, component) in sccs.iter().enumerate() {
        scc_sizes.push(component.len());
        for &node in component {
            scc_of.insert(node, i);
        }
    }

    let mut new_graph = graph.clone();
    new_graph.retain_edges(|g, edge| {
        let (a, b) = g.edge_endpoints(edge).unwrap();
        let same_scc = scc_of.get(&a) == scc_of.get(&b);
        let big_scc = scc_of.get(&a).map(|&i| scc_sizes[i] > 1).unwrap_or(false);
        !(same_scc && big_scc)
    });
    CitationGraph { graph: new_graph, index_by_key: cg.index_by_key.clone() }
}

/// Run the full cleanup pipeline: giant component, weak-leaf trim, then
/// SCC-breaking to force a DAG.
pub fn cleanup(cg: CitationGraph) -> CitationGraph {
    let cg = largest_weak_component(&cg);
    let cg = remove_weak_leaves(&cg);
    break_cycles(&cg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sap::graph::NodeAttrs;

    fn node(key: &str) -> NodeAttrs {
        NodeAttrs { key: key.to_string(), ..Default::default() }
    }

    #[test]
    fn weak_leaf_is_removed() {
        let mut graph = DiGraph::new();
        let a = graph.add_node(node("a"));
        let b = graph.add_node(node("b"));
        let c = graph.add_node(node("c"));
        graph.add_edge(a, b, ());
        graph.add_edge(a, c, ());
        let index_by_key = [("a".to_string(), a), ("b".to_string(), b), ("c".to_string(), c)].into();
        let cg = CitationGraph { graph, index_by_key };
        let cleaned = remove_weak_leaves(&cg);
        assert_eq!(cleaned.graph.node_count(), 1);
    }

    #[test]
    fn cycle_is_broken() {
        let mut graph = DiGraph::new();
        let a = graph.add_node(node("a"));
        let b = graph.add_node(node("b"));
        graph.add_edge(a, b, ());
        graph.add_edge(b, a, ());
        let index_by_key = [("a".to_string(), a), ("b".to_string(), b)].into();
        let cg = CitationGraph { graph, index_by_key };
        let broken = break_cycles(&cg);
        assert_eq!(broken.graph.edge_count(), 0);
        assert!(petgraph::algo::toposort(&broken.graph, None).is_ok());
    }
}
