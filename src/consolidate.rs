//! Identity closure: unify articles across sources by transitive identifier
//! equivalence. Grounded on `original_source/src/bibx/collection.py`'s
//! `Collection._unique_articles_by_id` / `deduplicate_articles`, which use
//! `networkx`'s connected-components over an identifier co-occurrence
//! graph; implemented here with an explicit union-find with path
//! compression instead, for the same result with no extra dependency.

use std::collections::HashMap;

use crate::model::article::{identity_key, ArticleHandle};

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Every article reachable from `roots`, one hop into `references`,
/// without duplication by object identity. Mirrors
/// `Collection._all_articles`: top-level articles plus their immediate
/// references, not a recursive walk of the whole tree.
fn all_articles(roots: &[ArticleHandle]) -> Vec<ArticleHandle> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for article in roots {
        let key = identity_key(article);
        if seen.insert(key) {
            out.push(article.clone());
        }
        for reference in &article.borrow().references {
            let rkey = identity_key(reference);
            if seen.insert(rkey) {
                out.push(reference.clone());
            }
        }
    }
    out
}

/// Deduplicate a list of articles by identifier-equivalence closure.
///
/// Idempotent and order-preserving for the first appearance of each
/// equivalence class. Reference rewiring is shallow (one hop): an
/// article's `references` are rewritten to canonical instances, but the
/// consolidator never follows references recursively a second time after
/// merging.
pub fn deduplicate_articles(articles: Vec<ArticleHandle>) -> Vec<ArticleHandle> {
    let universe = all_articles(&articles);

    // Map each id string to every universe index that carries it, and
    // union indices that share the *same* article's id set (a self-loop
    // on the first id keeps singleton ids/articles in their own class).
    let mut id_to_indices: HashMap<String, Vec<usize>> = HashMap::new();
    let mut uf = UnionFind::new(universe.len());

    for (i, article) in universe.iter().enumerate() {
        let borrowed = article.borrow();
        let mut ids: Vec<&str> = borrowed.ids.iter().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        if let Some((first, rest)) = ids.split_first() {
            id_to_indices.entry(first.to_string()).or_default().push(i);
            for other in rest {
                id_to_indices.entry(other.to_string()).or_default().push(i);
            }
        }
    }
    // Union every pair of universe indices that share a common id.
    for indices in id_to_indices.values() {
        for pair in indices.windows(2) {
            uf.union(pair[0], pair[1]);
        }
    }

    // Group universe indices by root, merge each group left-to-right.
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..universe.len() {
        let root = {
            // second borrow_mut pass for path compression
            let r = uf.find(i);
            r
        };
        groups.entry(root).or_default().push(i);
    }

    // For each group, the canonical article is the left-to-right merge
    // of every *distinct* article object (by identity) that contributes
    // any id in the group.
    let mut canonical_by_index: HashMap<usize, ArticleHandle> = HashMap::new();
    for indices in groups.values() {
        let mut seen_identity = std::collections::HashSet::new();
        let mut distinct = Vec::new();
        for &i in indices {
            let key = identity_key(&universe[i]);
            if seen_identity.insert(key) {
                distinct.push(universe[i].clone());
            }
        }
        let mut merged = distinct[0].borrow().clone();
        for article in &distinct[1..] {
            merged = merged.merge(&article.borrow());
        }
        let canonical = merged.into_handle();
        for &i in indices {
            canonical_by_index.insert(i, canonical.clone());
        }
    }

    // Map identifier -> canonical article, used for the output pass and
    // for rewiring references.
    let mut id_to_canonical: HashMap<String, ArticleHandle> = HashMap::new();
    for (i, article) in universe.iter().enumerate() {
        let canonical = canonical_by_index[&i].clone();
        for id in &article.borrow().ids {
            id_to_canonical.insert(id.clone(), canonical.clone());
        }
    }

    // Emit one canonical article per distinct equivalence class, in the
    // order each class first appears in the *original* input.
    let mut output = Vec::new();
    let mut emitted = std::collections::HashSet::new();
    for article in &articles {
        let ids = article.borrow().ids.clone();
        let Some(first_id) = ids.iter().min() else {
            continue;
        };
        let Some(canonical) = id_to_canonical.get(first_id) else {
            continue;
        };
        let key = identity_key(canonical);
        if emitted.insert(key) {
            output.push(canonical.clone());
        }
    }

    // Rewire references: each reference whose first id resolves to a
    // canonical article is replaced by it; unresolved references are
    // left as-is (stubs).
    for article in &output {
        let old_refs = article.borrow().references.clone();
        let mut new_refs = Vec::with_capacity(old_refs.len());
        for reference in old_refs {
            let ids = reference.borrow().ids.clone();
            let resolved = ids
                .iter()
                .min()
                .and_then(|id| id_to_canonical.get(id))
                .cloned();
            new_refs.push(resolved.unwrap_or(reference));
        }
        article.borrow_mut().references = new_refs;
    }

    output
}
