//! The OpenAlex HTTP client: paginated seed fetch plus id-chunked
//! enrichment fetch, both run over a bounded worker pool.
//!
//! Grounded on `original_source/src/bibx/clients/openalex.py`, a thin
//! `requests.Session` wrapper. Ported to `reqwest::blocking::Client`
//! plus a fixed-size `rayon::ThreadPool` as the bounded worker pool,
//! rather than `asyncio`/threads.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Deserialize;

use crate::error::{BibError, Result};

const MAX_WORKS_PER_PAGE: usize = 200;
const MAX_IDS_PER_REQUEST: usize = 80;
const MAX_IN_FLIGHT: usize = 5;
const DEFAULT_BASE_URL: &str = "https://api.openalex.org";
const DEFAULT_EMAIL: &str = "technology@coreofscience.org";

/// `Work`'s field names, joined for the `select` query parameter so the
/// API only returns what we deserialize. Mirrors the original client's
/// `select=",".join(Work.model_fields.keys())`.
const SELECT_FIELDS: &str = "id,ids,doi,title,publication_year,authorships,cited_by_count,keywords,referenced_works,biblio,primary_location";

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub orcid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkAuthorship {
    pub author_position: String,
    pub author: Author,
    #[serde(default)]
    pub is_corresponding: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkKeyword {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkBiblio {
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub first_page: Option<String>,
    #[serde(default)]
    pub last_page: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkLocationSource {
    pub id: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkLocation {
    #[serde(default)]
    pub is_oa: bool,
    #[serde(default)]
    pub landing_page_url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub source: Option<WorkLocationSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Work {
    pub id: String,
    #[serde(default)]
    pub ids: HashMap<String, String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub publication_year: i32,
    #[serde(default)]
    pub authorships: Vec<WorkAuthorship>,
    #[serde(default)]
    pub cited_by_count: u32,
    #[serde(default)]
    pub keywords: Vec<WorkKeyword>,
    #[serde(default)]
    pub referenced_works: Vec<String>,
    #[serde(default)]
    pub biblio: WorkBiblio,
    #[serde(default)]
    pub primary_location: Option<WorkLocation>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMeta {
    count: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct WorkResponse {
    results: Vec<Work>,
    meta: ResponseMeta,
}

/// Abstraction over the OpenAlex API so tests can substitute a fake
/// without performing real HTTP requests (the pack has no HTTP-mocking
/// crate).
pub trait Fetcher {
    fn list_recent_articles(&self, query: &str, limit: usize) -> Result<Vec<Work>>;
    fn list_articles_by_openalex_id(&self, ids: &[String]) -> Result<Vec<Work>>;
}

/// Blocking, bounded-concurrency client for the real OpenAlex API.
pub struct OpenAlexClient {
    base_url: String,
    email: String,
    http: reqwest::blocking::Client,
}

impl OpenAlexClient {
    pub fn new(base_url: Option<String>, email: Option<String>) -> Self {
        OpenAlexClient {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            email: email.unwrap_or_else(|| DEFAULT_EMAIL.to_string()),
            http: reqwest::blocking::Client::new(),
        }
    }

    fn user_agent(&self) -> String {
        format!("Rust/reqwest/bibliosap mailto:{}", self.email)
    }

    fn fetch_page(&self, query: &str, page: usize) -> Result<WorkResponse> {
        let filter = format!(
            "title_and_abstract.search:{},type:types/article,cited_by_count:>1",
            query.replace(' ', "+")
        );
        log::info!("openalex: fetching page {page} with filter {filter}");
        let response = self
            .http
            .get(format!("{}/works", self.base_url))
            .header("User-Agent", self.user_agent())
            .query(&[
                ("filter", filter.as_str()),
                ("sort", "publication_year:desc"),
                ("per_page", &MAX_WORKS_PER_PAGE.to_string()),
                ("page", &page.to_string()),
                ("select", SELECT_FIELDS),
            ])
            .send()
            .map_err(|e| BibError::RemoteError(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| BibError::RemoteError(e.to_string()))?
            .json::<WorkResponse>()
            .map_err(|e| BibError::RemoteError(e.to_string()))
    }

    fn fetch_by_ids(&self, ids: &[String]) -> Result<WorkResponse> {
        let value = ids.join("|");
        let filter = format!("ids.openalex:{value},type:types/article");
        log::info!("openalex: fetching {} ids", ids.len());
        let response = self
            .http
            .get(format!("{}/works", self.base_url))
            .header("User-Agent", self.user_agent())
            .query(&[
                ("filter", filter.as_str()),
                ("per_page", &MAX_IDS_PER_REQUEST.to_string()),
                ("select", SELECT_FIELDS),
            ])
            .send()
            .map_err(|e| BibError::RemoteError(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| BibError::RemoteError(e.to_string()))?
            .json::<WorkResponse>()
            .map_err(|e| BibError::RemoteError(e.to_string()))
    }
}

fn bounded_pool() -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(MAX_IN_FLIGHT)
        .build()
        .map_err(|e| BibError::RemoteError(e.to_string()))
}

impl Fetcher for OpenAlexClient {
    fn list_recent_articles(&self, query: &str, limit: usize) -> Result<Vec<Work>> {
        let pages = (limit / MAX_WORKS_PER_PAGE) + 1;
        let pool = bounded_pool()?;
        let responses: Vec<Option<WorkResponse>> = pool.install(|| {
            (1..=pages)
                .into_par_iter()
                .map(|page| match self.fetch_page(query, page) {
                    Ok(response) => Some(response),
                    Err(e) => {
                        log::warn!("openalex: page {page} failed: {e}");
                        None
                    }
                })
                .collect()
        });

        if responses.iter().all(Option::is_none) {
            return Err(BibError::RemoteError(format!(
                "no seed page succeeded for query '{query}'"
            )));
        }

        let mut results: Vec<Work> = responses
            .into_iter()
            .flatten()
            .flat_map(|r| r.results)
            .collect();
        results.truncate(limit);
        Ok(results)
    }

    fn list_articles_by_openalex_id(&self, ids: &[String]) -> Result<Vec<Work>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let chunks: Vec<&[String]> = ids.chunks(MAX_IDS_PER_REQUEST).collect();
        let pool = bounded_pool()?;
        let responses: Vec<Option<WorkResponse>> = pool.install(|| {
            chunks
                .into_par_iter()
                .map(|chunk| match self.fetch_by_ids(chunk) {
                    Ok(response) => Some(response),
                    Err(e) => {
                        log::warn!("openalex: id chunk failed: {e}");
                        None
                    }
                })
                .collect()
        });
        Ok(responses.into_iter().flatten().flat_map(|r| r.results).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A fake client that never performs HTTP requests, standing in for
    /// the real one in tests (the pack has no HTTP-mocking dependency).
    pub struct FakeFetcher {
        pub seed: Vec<Work>,
        pub by_id: Mutex<HashMap<String, Work>>,
        pub calls: AtomicUsize,
    }

    impl Fetcher for FakeFetcher {
        fn list_recent_articles(&self, _query: &str, limit: usize) -> Result<Vec<Work>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.seed.iter().take(limit).cloned().collect())
        }

        fn list_articles_by_openalex_id(&self, ids: &[String]) -> Result<Vec<Work>> {
            let map = self.by_id.lock().unwrap();
            Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
        }
    }

    #[test]
    fn fake_fetcher_truncates_to_limit() {
        let seed: Vec<Work> = (0..5)
            .map(|i| Work {
                id: format!("W{i}"),
                ids: HashMap::new(),
                doi: None,
                title: None,
                publication_year: 2020,
                authorships: vec![],
                cited_by_count: 0,
                keywords: vec![],
                referenced_works: vec![],
                biblio: WorkBiblio::default(),
                primary_location: None,
            })
            .collect();
        let fetcher = FakeFetcher {
            seed,
            by_id: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        };
        let works = fetcher.list_recent_articles("test", 3).unwrap();
        assert_eq!(works.len(), 3);
    }
}
