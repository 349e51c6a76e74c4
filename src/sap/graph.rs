//! Citation graph construction.
//!
//! `sap.py` operates on an already-built `networkx.DiGraph` (built by
//! the never-retrieved `Sap.create_graph`), so construction here uses
//! `petgraph`, the ecosystem graph crate (no pack example imports it,
//! noted as a deliberate exception in DESIGN.md — there is no closer
//! precedent for a typed directed graph with node-attribute
//! bookkeeping).

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::model::{ArticleHandle, Collection};

/// Per-vertex data: the semantic fields copied from the owning article,
/// plus the mutable labels the classification passes assign.
#[derive(Debug, Clone, Default)]
pub struct NodeAttrs {
    pub key: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub page: Option<String>,
    pub doi: Option<String>,
    pub times_cited: Option<u32>,
    pub keywords: Vec<String>,

    pub root: u64,
    pub leaf: u64,
    pub trunk: u64,
    pub branch: u8,

    pub raw_sap: u64,
    pub root_connections: u64,
    pub elaborate_sap: u64,
    pub leaf_connections: u64,
    pub sap: u64,
}

impl NodeAttrs {
    fn from_article(key: String, article: &ArticleHandle) -> Self {
        let a = article.borrow();
        NodeAttrs {
            key,
            authors: a.authors.clone(),
            year: a.year,
            title: a.title.clone(),
            journal: a.journal.clone(),
            volume: a.volume.clone(),
            issue: a.issue.clone(),
            page: a.page.clone(),
            doi: a.doi.clone(),
            times_cited: a.times_cited,
            keywords: a.keywords.clone(),
            ..Default::default()
        }
    }
}

/// A citation graph plus the key → vertex index lookup used while
/// building and cleaning it.
pub struct CitationGraph {
    pub graph: DiGraph<NodeAttrs, ()>,
    pub index_by_key: HashMap<String, NodeIndex>,
}

impl CitationGraph {
    fn get_or_insert(&mut self, key: String, article: &ArticleHandle, overwrite: bool) -> NodeIndex {
        if let Some(&idx) = self.index_by_key.get(&key) {
            if overwrite {
                self.graph[idx] = NodeAttrs::from_article(key, article);
            }
            idx
        } else {
            let idx = self.graph.add_node(NodeAttrs::from_article(key.clone(), article));
            self.index_by_key.insert(key, idx);
            idx
        }
    }
}

/// Build the citation graph from a collection: vertices are `key`
/// strings, edges are `citer → cited`. Citing articles' attributes take
/// precedence over attributes copied while they were only a reference
/// stub. Self-loops are removed.
pub fn build_graph(collection: &Collection) -> CitationGraph {
    let mut cg = CitationGraph {
        graph: DiGraph::new(),
        index_by_key: HashMap::new(),
    };

    for article in &collection.articles {
        if let Some(key) = article.borrow().key() {
            cg.get_or_insert(key, article, true);
        }
    }
    for (citer, cited) in collection.citation_pairs() {
        let Some(citer_key) = citer.borrow().key() else { continue };
        let Some(cited_key) = cited.borrow().key() else { continue };
        let citer_idx = cg.get_or_insert(citer_key.clone(), &citer, false);
        let cited_idx = cg.get_or_insert(cited_key.clone(), &cited, false);
        if citer_idx != cited_idx {
            cg.graph.update_edge(citer_idx, cited_idx, ());
        }
    }
    cg
}
