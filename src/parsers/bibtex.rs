//! Scopus BibTeX parser.
//!
//! Grounded on `original_source/src/bibx/builders/scopus_bib.py`, using
//! the `biblatex` crate for entry parsing.

use std::collections::HashMap;
use std::io::Read;
use std::sync::OnceLock;

use biblatex::{Bibliography, Chunk, Entry};
use regex::Regex;

use crate::error::{BibError, Result};
use crate::model::article::ExtraValue;
use crate::model::{Article, Collection};
use crate::parsers::common::parse_year;

fn cited_by_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)cited by (\d+)").unwrap())
}

fn doi_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(10\.\d{4,9}/[-._;()/:A-Z0-9]+)").unwrap())
}

fn year_paren_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\d{4})\)").unwrap())
}

/// Builder for collections of articles from Scopus BibTeX files.
pub struct ScopusBibCollectionBuilder {
    texts: Vec<String>,
}

impl ScopusBibCollectionBuilder {
    pub fn new() -> Self {
        ScopusBibCollectionBuilder { texts: Vec::new() }
    }

    pub fn add_reader(mut self, mut reader: impl Read) -> std::io::Result<Self> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        self.texts.push(buf);
        Ok(self)
    }

    pub fn build(self) -> Result<Collection> {
        if self.texts.iter().all(|t| t.trim().is_empty()) {
            return Ok(Collection::default());
        }

        let mut articles = Vec::new();
        let mut any_entry = false;
        for text in &self.texts {
            let bibliography = Bibliography::parse(text)
                .map_err(|e| BibError::Bibtex(format!("{e:?}")))?;
            for entry in bibliography.iter() {
                any_entry = true;
                match article_from_entry(entry) {
                    Ok(article) => articles.push(article.into_handle()),
                    Err(BibError::MissingCriticalInformation) => {
                        log::info!("bibtex: skipping entry missing author or year");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        if !any_entry {
            return Err(BibError::InvalidFormat("Scopus BibTeX"));
        }
        Ok(Collection::new(articles))
    }
}

impl Default for ScopusBibCollectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Join a field's chunk list into a plain string, the same way the
/// teacher's `bibtex.rs::format_field_value` flattens a raw field.
fn chunks_to_string(chunks: &[biblatex::Spanned<Chunk>]) -> String {
    chunks
        .iter()
        .map(|spanned| match &spanned.v {
            Chunk::Normal(s) => s.clone(),
            Chunk::Verbatim(s) => s.clone(),
            Chunk::Math(s) => s.clone(),
        })
        .collect::<Vec<_>>()
        .join("")
}

fn field_str(entry: &Entry, field: &str) -> Option<String> {
    entry.fields.get(field).map(|chunks| chunks_to_string(chunks))
}

fn article_from_entry(entry: &Entry) -> Result<Article> {
    let author_field = field_str(entry, "author");
    let year_field = field_str(entry, "year").and_then(|s| parse_year(&s));
    let (Some(author_field), Some(year)) = (author_field, year_field) else {
        return Err(BibError::MissingCriticalInformation);
    };

    let times_cited = field_str(entry, "note")
        .as_deref()
        .and_then(|note| cited_by_pattern().captures(note))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    let doi = field_str(entry, "doi");
    let title = field_str(entry, "title");
    let keywords = field_str(entry, "keywords")
        .map(|s| s.split("; ").map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default();

    let references = field_str(entry, "references")
        .map(|refs| {
            refs.split("; ")
                .filter_map(|r| match article_from_reference(r) {
                    Ok(a) => Some(a.into_handle()),
                    Err(_) => {
                        log::debug!("bibtex: dropping unparseable reference '{r}'");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let mut extra = HashMap::new();
    for (key, chunks) in &entry.fields {
        extra.insert(key.clone(), ExtraValue::Text(chunks_to_string(chunks)));
    }

    let mut article = Article {
        label: doi.clone().unwrap_or_else(|| title.clone().unwrap_or_else(|| "replaceme".to_string())),
        ids: doi.iter().map(|d| format!("doi:{d}")).collect(),
        title,
        authors: author_field.split(" and ").map(|s| s.trim().to_string()).collect(),
        year: Some(year),
        journal: field_str(entry, "journal"),
        volume: field_str(entry, "volume"),
        issue: field_str(entry, "issue"),
        page: field_str(entry, "art_number"),
        doi,
        keywords,
        references,
        times_cited,
        sources: [entry.key.clone()].into_iter().collect(),
        extra,
        ..Default::default()
    };
    article.add_simple_id();
    article.set_simple_label();
    Ok(article)
}

fn article_from_reference(reference: &str) -> Result<Article> {
    let year = year_paren_pattern()
        .captures(reference)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_year(m.as_str()))
        .ok_or_else(|| BibError::MalformedReference(reference.to_string()))?;
    let author = reference
        .splitn(3, ',')
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BibError::MalformedReference(reference.to_string()))?;
    let doi = doi_pattern().captures(reference).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());

    let mut article = Article {
        label: reference.to_string(),
        ids: doi.iter().map(|d| format!("doi:{d}")).collect(),
        authors: vec![author],
        year: Some(year),
        doi,
        sources: [reference.to_string()].into_iter().collect(),
        ..Default::default()
    };
    article.add_simple_id();
    Ok(article)
}
