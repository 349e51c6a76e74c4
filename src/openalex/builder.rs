//! Collection builder over the OpenAlex fetcher: seed fetch, reference
//! enrichment, `Work` → `Article` conversion, reference rewiring.
//!
//! Grounded on `original_source/src/bibx/builders/openalex.py`, which
//! has only `basic`/`common`/`full`. `most` (2000 most-frequent
//! references) is an added intermediate tier, a direct extrapolation of
//! the `common` logic with a larger cap.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::model::{Article, ArticleHandle, Collection};
use crate::openalex::client::{Fetcher, Work};

const MAX_COMMON_REFERENCES: usize = 400;
const MAX_MOST_REFERENCES: usize = 2000;

/// How aggressively to fetch an article's referenced works, beyond the
/// seed set itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentMode {
    /// Only the seed set is fetched; references become id-only stubs.
    Basic,
    /// The 400 most frequently referenced ids (minus the seed) are fetched.
    Common,
    /// The 2000 most frequently referenced ids (minus the seed) are fetched.
    Most,
    /// Every referenced id (minus the seed) is fetched.
    Full,
}

/// Builder for collections of articles from the OpenAlex API.
pub struct OpenAlexCollectionBuilder<'a> {
    query: String,
    limit: usize,
    mode: EnrichmentMode,
    client: &'a dyn Fetcher,
}

impl<'a> OpenAlexCollectionBuilder<'a> {
    pub fn new(query: impl Into<String>, limit: usize, mode: EnrichmentMode, client: &'a dyn Fetcher) -> Self {
        OpenAlexCollectionBuilder {
            query: query.into(),
            limit,
            mode,
            client,
        }
    }

    pub fn build(self) -> Result<Collection> {
        log::info!("openalex: building collection for query {}", self.query);
        let works = self.client.list_recent_articles(&self.query, self.limit)?;
        let mut cache: HashMap<String, Work> =
            works.iter().map(|w| (w.id.clone(), w.clone())).collect();

        let mut referenced: Vec<String> = Vec::new();
        for work in &works {
            referenced.extend(work.referenced_works.iter().cloned());
        }

        let missing: Vec<String> = match self.mode {
            EnrichmentMode::Basic => Vec::new(),
            EnrichmentMode::Common => most_frequent_missing(&referenced, &cache, MAX_COMMON_REFERENCES),
            EnrichmentMode::Most => most_frequent_missing(&referenced, &cache, MAX_MOST_REFERENCES),
            EnrichmentMode::Full => {
                let seed: HashSet<&String> = cache.keys().collect();
                referenced
                    .iter()
                    .cloned()
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .filter(|id| !seed.contains(id))
                    .collect()
            }
        };

        if !missing.is_empty() {
            log::info!("openalex: fetching {} missing references", missing.len());
            let missing_works = self.client.list_articles_by_openalex_id(&missing)?;
            for work in missing_works {
                cache.insert(work.id.clone(), work);
            }
        }

        let mut article_cache: HashMap<String, ArticleHandle> = HashMap::new();
        for (id, work) in &cache {
            article_cache.insert(id.clone(), work_to_article(work).into_handle());
        }

        log::info!("openalex: enriching references");
        let mut articles = Vec::with_capacity(works.len());
        for work in &works {
            let article = article_cache[&work.id].clone();
            let references = work
                .referenced_works
                .iter()
                .filter(|r| **r != work.id)
                .map(|r| {
                    article_cache
                        .get(r)
                        .cloned()
                        .unwrap_or_else(|| reference_stub(r).into_handle())
                })
                .collect();
            article.borrow_mut().references = references;
            articles.push(article);
        }
        Ok(Collection::new(crate::consolidate::deduplicate_articles(articles)))
    }
}

fn most_frequent_missing(referenced: &[String], cache: &HashMap<String, Work>, cap: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in referenced {
        *counts.entry(id.as_str()).or_insert(0) += 1;
    }
    let mut by_count: Vec<(&str, usize)> = counts.into_iter().collect();
    by_count.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    by_count
        .into_iter()
        .take(cap)
        .map(|(id, _)| id.to_string())
        .filter(|id| !cache.contains_key(id))
        .collect()
}

fn invert_name(name: &str) -> String {
    let mut parts: Vec<&str> = name.split_whitespace().collect();
    let Some(last) = parts.pop() else {
        return name.to_string();
    };
    if parts.is_empty() {
        last.to_string()
    } else {
        format!("{}, {}", last, parts.join(" "))
    }
}

fn extract_doi(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        rest.splitn(2, '/').nth(1).unwrap_or(rest).to_string()
    } else {
        url.to_string()
    }
}

fn work_to_article(work: &Work) -> Article {
    let ids: HashSet<String> = work
        .ids
        .iter()
        .map(|(source, id)| {
            if source == "doi" {
                format!("doi:{}", extract_doi(id))
            } else {
                format!("{source}:{id}")
            }
        })
        .collect();

    let journal = work
        .primary_location
        .as_ref()
        .and_then(|loc| loc.source.as_ref())
        .map(|s| s.display_name.clone());
    let permalink = work
        .primary_location
        .as_ref()
        .and_then(|loc| loc.landing_page_url.clone());

    let mut article = Article {
        label: work.id.clone(),
        ids,
        authors: work.authorships.iter().map(|a| invert_name(&a.author.display_name)).collect(),
        year: Some(work.publication_year),
        title: work.title.clone(),
        journal,
        volume: work.biblio.volume.clone(),
        issue: work.biblio.issue.clone(),
        page: work.biblio.first_page.clone(),
        doi: work.doi.as_deref().map(extract_doi),
        permalink_override: permalink,
        times_cited: Some(work.cited_by_count),
        keywords: work.keywords.iter().map(|k| k.display_name.clone()).collect(),
        sources: ["openalex".to_string()].into_iter().collect(),
        ..Default::default()
    };
    article.add_simple_id();
    article
}

fn reference_stub(openalex_id: &str) -> Article {
    Article {
        label: openalex_id.to_string(),
        ids: [format!("openalex:{openalex_id}")].into_iter().collect(),
        permalink_override: Some(openalex_id.to_string()),
        sources: ["openalex".to_string()].into_iter().collect(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openalex::client::tests::FakeFetcher;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn work(id: &str, refs: &[&str]) -> Work {
        Work {
            id: id.to_string(),
            ids: HashMap::from([("openalex".to_string(), id.to_string())]),
            doi: None,
            title: Some(format!("Title {id}")),
            publication_year: 2020,
            authorships: vec![],
            cited_by_count: 0,
            keywords: vec![],
            referenced_works: refs.iter().map(|s| s.to_string()).collect(),
            biblio: Default::default(),
            primary_location: None,
        }
    }

    #[test]
    fn basic_mode_leaves_stub_references() {
        let fetcher = FakeFetcher {
            seed: vec![work("W1", &["W2"])],
            by_id: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        };
        let collection = OpenAlexCollectionBuilder::new("q", 10, EnrichmentMode::Basic, &fetcher)
            .build()
            .unwrap();
        assert_eq!(collection.articles.len(), 1);
        let references = collection.articles[0].borrow().references.clone();
        assert_eq!(references.len(), 1);
        assert!(references[0].borrow().title.is_none());
    }

    #[test]
    fn full_mode_fetches_every_reference() {
        let mut by_id = HashMap::new();
        by_id.insert("W2".to_string(), work("W2", &[]));
        let fetcher = FakeFetcher {
            seed: vec![work("W1", &["W2"])],
            by_id: Mutex::new(by_id),
            calls: AtomicUsize::new(0),
        };
        let collection = OpenAlexCollectionBuilder::new("q", 10, EnrichmentMode::Full, &fetcher)
            .build()
            .unwrap();
        let references = collection.articles[0].borrow().references.clone();
        assert_eq!(references[0].borrow().title.as_deref(), Some("Title W2"));
    }
}
