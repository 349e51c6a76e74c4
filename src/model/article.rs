use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde::Serialize;

/// Shared handle to an [`Article`].
///
/// References between articles are not a tree: after consolidation many
/// citers can point at the very same canonical article. `Rc<RefCell<_>>`
/// gives us that shared, identity-comparable ownership without resorting
/// to a separate arena/index scheme.
pub type ArticleHandle = Rc<RefCell<Article>>;

/// An opaque scalar recovered from a source format but not promoted to a
/// first-class [`Article`] field. Preserved for round-tripping callers
/// that want the raw parsed data (e.g. an `extra["WC"]` research-area list).
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraValue {
    Text(String),
    List(Vec<String>),
    Int(i64),
}

/// Serializable summary returned by [`Article::info`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleInfo {
    pub permalink: Option<String>,
    pub label: String,
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
    pub sources: Vec<String>,
}

/// A single scientific article, as recovered from one of the supported
/// bibliographic formats, merged from several sources, or fetched from a
/// remote catalogue.
///
/// An article's identity is its *set* of `ids` (see
/// [`Article::merge`]), not any single field.
#[derive(Debug, Clone, Default)]
pub struct Article {
    pub label: String,
    pub ids: HashSet<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub page: Option<String>,
    pub doi: Option<String>,
    pub permalink_override: Option<String>,
    pub times_cited: Option<u32>,
    pub references: Vec<ArticleHandle>,
    pub keywords: Vec<String>,
    pub sources: HashSet<String>,
    pub extra: HashMap<String, ExtraValue>,
}

fn keep<T: Clone>(a: &Option<T>, b: &Option<T>) -> Option<T> {
    a.clone().or_else(|| b.clone())
}

fn keep_longest(a: &str, b: &str) -> String {
    if a.len() >= b.len() {
        a.to_string()
    } else {
        b.to_string()
    }
}

impl Article {
    pub fn new(label: impl Into<String>, ids: HashSet<String>) -> Self {
        Article {
            label: label.into(),
            ids,
            ..Default::default()
        }
    }

    /// Wrap this article in a shared, identity-comparable handle.
    pub fn into_handle(self) -> ArticleHandle {
        Rc::new(RefCell::new(self))
    }

    /// Combine two articles that were found to share an identifier.
    ///
    /// `self` wins ties: it contributes its own scalar fields first and
    /// falls back to `other`'s only when its own are absent. List fields
    /// (`authors`, `references`, `keywords`) keep the first non-empty
    /// list rather than concatenating, matching the source format's
    /// single-pass semantics.
    pub fn merge(&self, other: &Article) -> Article {
        let mut extra = self.extra.clone();
        for (k, v) in &other.extra {
            extra.insert(k.clone(), v.clone());
        }

        Article {
            label: keep_longest(&self.label, &other.label),
            ids: self.ids.union(&other.ids).cloned().collect(),
            authors: if self.authors.is_empty() {
                other.authors.clone()
            } else {
                self.authors.clone()
            },
            year: keep(&self.year, &other.year),
            title: keep(&self.title, &other.title),
            journal: keep(&self.journal, &other.journal),
            volume: keep(&self.volume, &other.volume),
            issue: keep(&self.issue, &other.issue),
            page: keep(&self.page, &other.page),
            doi: keep(&self.doi, &other.doi),
            permalink_override: keep(&self.permalink_override, &other.permalink_override),
            times_cited: keep(&self.times_cited, &other.times_cited),
            references: if self.references.is_empty() {
                other.references.clone()
            } else {
                self.references.clone()
            },
            keywords: if self.keywords.is_empty() {
                other.keywords.clone()
            } else {
                self.keywords.clone()
            },
            sources: self.sources.union(&other.sources).cloned().collect(),
            extra,
        }
    }

    /// The lexicographically smallest id, used only for legacy graph
    /// keying by the SAP classifier. Identity for every other purpose is
    /// the full `ids` set.
    pub fn key(&self) -> Option<String> {
        self.ids.iter().min().cloned()
    }

    /// `lowercase(firstAuthorSurname) + year`, when both are known.
    pub fn simple_id(&self) -> Option<String> {
        let author = self.authors.first()?;
        let year = self.year?;
        let surname = author.split(' ').next().unwrap_or("").replace(',', "");
        Some(format!("{}{}", surname, year).to_lowercase())
    }

    /// Comma-joined `AU, PY, J9, V<volume>, P<page>, DOI <doi>` rendering,
    /// omitting absent parts; `None` if every part is absent.
    pub fn simple_label(&self) -> Option<String> {
        let au = self.authors.first().map(|a| a.replace(',', ""));
        let py = self.year.map(|y| y.to_string());
        let j9 = self.journal.clone();
        let vl = self.volume.as_ref().map(|v| format!("V{v}"));
        let bp = self.page.as_ref().map(|p| format!("P{p}"));
        let di = self.doi.as_ref().map(|d| format!("DOI {d}"));

        let pieces: Vec<String> = [au, py, j9, vl, bp, di].into_iter().flatten().collect();
        if pieces.is_empty() {
            None
        } else {
            Some(pieces.join(", "))
        }
    }

    /// The canonical URL for this article: an explicit override, else a
    /// `doi.org` redirect built from the DOI, else `None`.
    pub fn permalink(&self) -> Option<String> {
        self.permalink_override
            .clone()
            .or_else(|| self.doi.as_ref().map(|doi| format!("https://doi.org/{doi}")))
    }

    /// Add a `simple:<simple_id>` entry to `ids`, if one can be derived.
    pub fn add_simple_id(&mut self) -> &mut Self {
        if let Some(id) = self.simple_id() {
            self.ids.insert(format!("simple:{id}"));
        }
        self
    }

    /// Overwrite `label` with [`Article::simple_label`], if one can be derived.
    pub fn set_simple_label(&mut self) -> &mut Self {
        if let Some(label) = self.simple_label() {
            self.label = label;
        }
        self
    }

    /// A serializable summary of this article's scalar fields, grounded
    /// on `Article.info` in `original_source/src/bibx/article.py`.
    pub fn info(&self) -> ArticleInfo {
        ArticleInfo {
            permalink: self.permalink(),
            label: self.label.clone(),
            authors: self.authors.clone(),
            year: self.year,
            title: self.title.clone(),
            journal: self.journal.clone(),
            volume: self.volume.clone(),
            issue: self.issue.clone(),
            page: self.page.clone(),
            doi: self.doi.clone(),
            times_cited: self.times_cited,
            keywords: self.keywords.clone(),
            sources: self.sources.iter().cloned().collect(),
        }
    }
}

/// Identity comparison for two handles, mirroring Python's `id(article)`.
pub fn same_article(a: &ArticleHandle, b: &ArticleHandle) -> bool {
    Rc::ptr_eq(a, b)
}

/// A stable key for an [`ArticleHandle`]'s identity, suitable for use in a
/// `HashSet`/`HashMap` when deduplicating by object identity.
pub fn identity_key(a: &ArticleHandle) -> usize {
    Rc::as_ptr(a) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(xs: &[&str]) -> HashSet<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_prefers_self_scalars_and_unions_ids() {
        let a = Article {
            title: Some("T".into()),
            ids: ids(&["doi:10.1/x"]),
            ..Default::default()
        };
        let b = Article {
            times_cited: Some(5),
            ids: ids(&["doi:10.1/x", "simple:smith2010"]),
            ..Default::default()
        };
        let merged = a.merge(&b);
        assert_eq!(merged.title.as_deref(), Some("T"));
        assert_eq!(merged.times_cited, Some(5));
        assert_eq!(merged.ids, ids(&["doi:10.1/x", "simple:smith2010"]));
    }

    #[test]
    fn simple_id_lowercases_surname_and_year() {
        let a = Article {
            authors: vec!["Smith, J".into()],
            year: Some(2010),
            ..Default::default()
        };
        assert_eq!(a.simple_id().as_deref(), Some("smith2010"));
    }

    #[test]
    fn simple_label_omits_absent_parts() {
        let a = Article {
            authors: vec!["Smith, J".into()],
            year: Some(2010),
            ..Default::default()
        };
        assert_eq!(a.simple_label().as_deref(), Some("Smith, J, 2010"));
    }

    #[test]
    fn permalink_falls_back_to_doi() {
        let a = Article {
            doi: Some("10.1/x".into()),
            ..Default::default()
        };
        assert_eq!(a.permalink().as_deref(), Some("https://doi.org/10.1/x"));
    }

    #[test]
    fn info_mirrors_scalar_fields_and_permalink() {
        let a = Article {
            label: "L".into(),
            authors: vec!["Smith, J".into()],
            year: Some(2010),
            title: Some("T".into()),
            doi: Some("10.1/x".into()),
            times_cited: Some(3),
            keywords: vec!["kw".into()],
            sources: ids(&["scopus"]),
            ..Default::default()
        };
        let info = a.info();
        assert_eq!(info.label, "L");
        assert_eq!(info.year, Some(2010));
        assert_eq!(info.times_cited, Some(3));
        assert_eq!(info.permalink.as_deref(), Some("https://doi.org/10.1/x"));
        assert_eq!(info.sources, vec!["scopus".to_string()]);
    }
}
