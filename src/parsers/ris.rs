//! Scopus RIS parser.
//!
//! Grounded on `original_source/src/bibx/builders/scopus_ris.py`. Records
//! are blank-line separated; each line is `<TAG>  - <value>` or a bare
//! continuation of the previous tag. `N1` lines of the form
//! `<label>: <content>` are bucketed per label, so `N1:References`
//! collects the reference strings.

use std::collections::HashMap;
use std::io::Read;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{BibError, Result};
use crate::model::article::ExtraValue;
use crate::model::{Article, Collection};
use crate::parsers::common::parse_year;

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:(?P<tag>[A-Z0-9]{2})  - )?(?P<value>.*)$").unwrap())
}

fn volume_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?P<volume>\d+)(?: \((?P<issue>.+?)\))?").unwrap())
}

fn page_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"pp?\. (?P<page>\w+)(?:-[^,\s]+)?").unwrap())
}

fn doi_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:doi\.org/|aps\.org/doi/|doi:?) ?(?P<doi>[^\s,;:]{5,})").unwrap()
    })
}

fn year_paren_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\d{4}\)").unwrap())
}

/// Builder for collections of articles from Scopus RIS files.
pub struct ScopusRisCollectionBuilder {
    texts: Vec<String>,
}

impl ScopusRisCollectionBuilder {
    pub fn new() -> Self {
        ScopusRisCollectionBuilder { texts: Vec::new() }
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
        if !self.texts.iter().any(|t| looks_like_ris(t)) {
            return Err(BibError::InvalidFormat("Scopus RIS"));
        }

        let mut articles = Vec::new();
        for text in &self.texts {
            for record in text.split("\n\n").map(str::trim).filter(|s| !s.is_empty()) {
                match article_from_record(record) {
                    Ok(article) => articles.push(article.into_handle()),
                    Err(BibError::MissingCriticalInformation) => {
                        log::info!("ris: skipping record missing authors or year");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(Collection::new(articles))
    }
}

impl Default for ScopusRisCollectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn looks_like_ris(text: &str) -> bool {
    let first_nonblank = text.lines().find(|l| !l.trim().is_empty());
    match first_nonblank {
        Some(line) => tag_pattern().captures(line).and_then(|c| c.name("tag")).is_some(),
        None => true,
    }
}

fn ris_to_dict(record: &str) -> Result<HashMap<String, Vec<String>>> {
    let mut parsed: HashMap<String, Vec<String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in record.lines() {
        let line = line.trim_end_matches('\r');
        let caps = tag_pattern()
            .captures(line)
            .ok_or_else(|| BibError::MalformedLine(line.to_string()))?;
        let tag = caps.name("tag").map(|m| m.as_str().to_string());
        let mut value = caps.name("value").map(|m| m.as_str().to_string()).unwrap_or_default();

        if tag.as_deref() == Some("ER") {
            break;
        }

        if let Some(tag) = tag {
            if tag == "N1" {
                if let Some((label, rest)) = value.split_once(':') {
                    current = Some(format!("N1:{}", label.trim()));
                    value = rest.trim().to_string();
                } else {
                    current = Some(tag);
                }
            } else {
                current = Some(tag);
            }
        }

        if !value.is_empty() {
            if let Some(key) = &current {
                parsed.entry(key.clone()).or_default().push(value);
            }
        }
    }
    Ok(parsed)
}

fn find_volume_info(reference: &str) -> (Option<String>, Option<String>) {
    if let Some(page) = page_pattern().captures(reference) {
        let before_page = reference.split(&page[0]).next().unwrap_or("");
        let volume = volume_pattern().captures(before_page);
        (
            volume.and_then(|v| v.name("volume")).map(|m| format!("V{}", m.as_str())),
            page.name("page").map(|m| format!("P{}", m.as_str())),
        )
    } else if let Some(volume) = volume_pattern().captures(reference) {
        (
            volume.name("volume").map(|m| format!("V{}", m.as_str())),
            None,
        )
    } else {
        (None, None)
    }
}

fn find_doi(reference: &str) -> Option<String> {
    doi_pattern()
        .captures(reference)
        .and_then(|c| c.name("doi"))
        .map(|m| m.as_str().to_string())
}

fn article_from_reference(reference: &str) -> Result<Article> {
    let year_match = year_paren_pattern()
        .find(reference)
        .ok_or_else(|| BibError::MalformedReference(reference.to_string()))?;
    let authors_part = &reference[..year_match.start()];
    let year_str = &reference[year_match.start() + 1..year_match.end() - 1];
    let rest = &reference[year_match.end()..];

    let mut author_pieces = authors_part.splitn(2, ", ");
    let first_name = author_pieces.next().unwrap_or("").trim();
    let last_name = author_pieces.next().unwrap_or("").trim();
    let year = parse_year(year_str).ok_or_else(|| BibError::MalformedReference(reference.to_string()))?;
    if first_name.is_empty() {
        return Err(BibError::MalformedReference(reference.to_string()));
    }

    let rest = rest.trim_start_matches(", ").trim_start();
    let (journal_part, rest) = rest
        .split_once(", ")
        .ok_or_else(|| BibError::MalformedReference(reference.to_string()))?;
    let journal = {
        let trimmed = journal_part.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.replace('.', "").to_uppercase())
        }
    };
    let (volume, page) = find_volume_info(rest);
    let doi = find_doi(reference);

    let author = format!("{} {}", first_name, last_name.replace(' ', "").replace('.', ""));
    Ok(Article {
        label: reference.to_string(),
        ids: doi.iter().map(|d| format!("doi:{d}")).collect(),
        authors: vec![author],
        year: Some(year),
        journal,
        volume,
        page,
        doi,
        sources: [reference.to_string()].into_iter().collect(),
        ..Default::default()
    })
}

fn article_from_record(record: &str) -> Result<Article> {
    let data = ris_to_dict(record)?;
    let authors = data.get("AU").cloned().unwrap_or_default();
    let year = data
        .get("PY")
        .and_then(|v| v.first())
        .and_then(|s| parse_year(s));
    if authors.is_empty() || year.is_none() {
        return Err(BibError::MissingCriticalInformation);
    }

    let joined = |code: &str| data.get(code).map(|v| v.join(" "));
    let doi = data.get("DO").and_then(|v| v.first()).cloned();
    let times_cited = data
        .get("TC")
        .and_then(|v| v.first())
        .and_then(|s| s.trim().parse::<u32>().ok());

    let references = data
        .get("N1:References")
        .map(|refs| {
            refs.iter()
                .filter_map(|r| match article_from_reference(r) {
                    Ok(a) => Some(a.into_handle()),
                    Err(_) => {
                        log::debug!("ris: dropping unparseable reference '{r}'");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let mut extra = HashMap::new();
    for (code, values) in &data {
        extra.insert(code.clone(), ExtraValue::List(values.clone()));
    }

    let mut article = Article {
        label: doi.clone().unwrap_or_else(|| "replaceme".to_string()),
        ids: doi.iter().map(|d| format!("doi:{d}")).collect(),
        title: joined("TI"),
        authors,
        year,
        journal: joined("J2"),
        volume: joined("VL"),
        issue: joined("IS"),
        page: joined("SP"),
        doi,
        keywords: data.get("KW").cloned().unwrap_or_default(),
        references,
        times_cited,
        sources: ["scopus".to_string()].into_iter().collect(),
        extra,
        ..Default::default()
    };
    article.add_simple_id();
    article.set_simple_label();
    Ok(article)
}
