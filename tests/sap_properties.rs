//! SAP classifier label assignment, budget monotonicity, and cleanup
//! acyclicity.
//!
//! The label-assignment and monotonicity tests exercise the labelling
//! passes directly on a hand-built graph, the same way `sap::passes`'s
//! own unit tests do: the toy graph's leaves have in-degree 1 and
//! out-degree 0, which is exactly what cleanup's weak-leaf-removal step
//! prunes, so routing it through `classify` (which always cleans first)
//! would strip the very vertices the test is about.

use std::collections::HashSet;

use bibliosap::model::{Article, ArticleHandle};
use bibliosap::sap::graph::NodeAttrs;
use bibliosap::sap::{classify, passes, SapConfig};
use bibliosap::Collection;
use petgraph::graph::{DiGraph, NodeIndex};

type Graph = DiGraph<NodeAttrs, ()>;

fn node(key: &str) -> NodeAttrs {
    NodeAttrs { key: key.to_string(), year: Some(2000), ..Default::default() }
}

/// `{a,b,c} -> d -> {e,f,g}`: a fan-in into a fan-out, every vertex the
/// same year.
fn toy_graph() -> Graph {
    let mut g: Graph = DiGraph::new();
    let a = g.add_node(node("a"));
    let b = g.add_node(node("b"));
    let c = g.add_node(node("c"));
    let d = g.add_node(node("d"));
    let e = g.add_node(node("e"));
    let f = g.add_node(node("f"));
    let h = g.add_node(node("g"));
    for citer in [a, b, c] {
        g.add_edge(citer, d, ());
    }
    for cited in [e, f, h] {
        g.add_edge(d, cited, ());
    }
    g
}

fn no_filters() -> SapConfig {
    SapConfig { min_leaf_connections: None, max_leaf_age_years: None, ..SapConfig::default() }
}

fn key_of(g: &Graph, key: &str) -> NodeIndex {
    g.node_indices().find(|&n| g[n].key == key).unwrap()
}

fn run_passes(g: &mut Graph, cfg: &SapConfig) {
    passes::compute_root(g, cfg);
    passes::compute_leaves(g, cfg).unwrap();
    passes::compute_sap(g).unwrap();
    passes::compute_trunk(g, cfg).unwrap();
}

#[test]
fn fan_in_fan_out_graph_labels_roots_leaves_and_trunk() {
    let mut g = toy_graph();
    run_passes(&mut g, &no_filters());

    for key in ["e", "f", "g"] {
        let n = key_of(&g, key);
        assert!(g[n].root > 0, "{key} should be a root");
        assert_eq!(g[n].leaf, 0);
        assert_eq!(g[n].trunk, 0);
    }
    for key in ["a", "b", "c"] {
        let n = key_of(&g, key);
        assert!(g[n].leaf > 0, "{key} should be a leaf");
        assert_eq!(g[n].root, 0);
        assert_eq!(g[n].trunk, 0);
    }
    let d = key_of(&g, "d");
    assert!(g[d].trunk > 0, "d should be trunk");
    assert_eq!(g[d].root, 0);
    assert_eq!(g[d].leaf, 0);
}

#[test]
fn raising_root_and_leaf_budgets_never_shrinks_the_selection() {
    let narrow_cfg = SapConfig { max_roots: 1, ..no_filters() };
    let wide_cfg = SapConfig { max_roots: 3, ..no_filters() };
    let mut narrow = toy_graph();
    let mut wide = toy_graph();
    run_passes(&mut narrow, &narrow_cfg);
    run_passes(&mut wide, &wide_cfg);

    let roots_of = |g: &Graph| -> HashSet<String> {
        g.node_indices().filter(|&n| g[n].root > 0).map(|n| g[n].key.clone()).collect()
    };
    assert!(roots_of(&narrow).is_subset(&roots_of(&wide)));

    let narrow_leaf_cfg = SapConfig { max_leaves: 1, ..no_filters() };
    let wide_leaf_cfg = SapConfig { max_leaves: 3, ..no_filters() };
    let mut narrow_leaves = toy_graph();
    let mut wide_leaves = toy_graph();
    run_passes(&mut narrow_leaves, &narrow_leaf_cfg);
    run_passes(&mut wide_leaves, &wide_leaf_cfg);

    let leaves_of = |g: &Graph| -> HashSet<String> {
        g.node_indices().filter(|&n| g[n].leaf > 0).map(|n| g[n].key.clone()).collect()
    };
    assert!(leaves_of(&narrow_leaves).is_subset(&leaves_of(&wide_leaves)));
}

fn ids(label: &str) -> HashSet<String> {
    HashSet::from([label.to_string()])
}

#[test]
fn cleanup_breaks_a_cycle_before_labelling_runs() {
    // the diamond's mid layer additionally cites each other in a cycle;
    // cleanup must break it before the labelling passes run at all.
    let oldest: ArticleHandle = Article { year: Some(2000), ..Article::new("oldest", ids("oldest")) }.into_handle();
    let mid1 = Article {
        year: Some(2010),
        references: vec![oldest.clone()],
        ..Article::new("mid1", ids("mid1"))
    }
    .into_handle();
    let mid2 = Article {
        year: Some(2011),
        references: vec![oldest.clone(), mid1.clone()],
        ..Article::new("mid2", ids("mid2"))
    }
    .into_handle();
    mid1.borrow_mut().references.push(mid2.clone());
    let newest = Article {
        year: Some(2020),
        references: vec![mid1.clone(), mid2.clone()],
        ..Article::new("newest", ids("newest"))
    }
    .into_handle();

    // `citation_pairs` only looks one hop past `Collection::articles`, so
    // every citer in the cycle must be listed directly.
    let collection = Collection::new(vec![newest, mid1, mid2]);
    let tree = classify(&collection, &no_filters()).unwrap();
    assert!(petgraph::algo::toposort(&tree, None).is_ok());
}
