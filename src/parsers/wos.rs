//! Web of Science (WoS) field-coded text parser.
//!
//! Grounded on `original_source/src/bibx/builders/wos.py`. Records are
//! separated by blank lines; each line either starts a new two-letter
//! field or continues the previous one with two leading spaces. `ER`
//! ends a record, `EF`/`FN`/`VR` are header/trailer sentinels ignored
//! here as in the original.

use std::collections::HashMap;
use std::io::Read;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{BibError, Result};
use crate::model::article::ExtraValue;
use crate::model::{Article, Collection};
use crate::parsers::common::{delimited, parse_year};

fn line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:(?P<field>[A-Z0-9]{2})|  )(?: (?P<value>.*))?$").unwrap())
}

fn citation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^(?P<AU>[^,]+),\x20
             (?P<PY>\d{4}),\x20
             (?P<J9>[^,]+)
             (,\x20V(?P<VL>[\w\d-]+))?
             (,\x20[Pp](?P<BP>\w+))?
             (,\x20DOI\x20(?P<DI>.+))?
            ",
        )
        .unwrap()
    })
}

/// Builder for collections of articles from Web of Science ISI files.
pub struct WosCollectionBuilder {
    texts: Vec<String>,
}

impl WosCollectionBuilder {
    pub fn new() -> Self {
        WosCollectionBuilder { texts: Vec::new() }
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
        if !self.texts.iter().any(|t| looks_like_wos(t)) {
            return Err(BibError::InvalidFormat("Web of Science"));
        }

        let mut articles = Vec::new();
        for text in &self.texts {
            for chunk in split_records(text) {
                match parse_article(&chunk) {
                    Ok(article) => articles.push(article.into_handle()),
                    Err(BibError::MissingCriticalInformation) => {
                        log::info!("wos: skipping record missing authors or year");
                    }
                    Err(BibError::MalformedLine(line)) => {
                        log::debug!("wos: skipping record with malformed line '{line}'");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(Collection::new(articles))
    }
}

impl Default for WosCollectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn looks_like_wos(text: &str) -> bool {
    let first_nonblank = text.lines().find(|l| !l.trim().is_empty());
    match first_nonblank {
        Some(line) => {
            line.starts_with("FN") || line.starts_with("VR") || line_pattern().is_match(line)
        }
        None => true,
    }
}

fn split_records(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != "ER" && *s != "EF")
        .map(|s| s.to_string())
        .collect()
}

fn parse_article(record: &str) -> Result<Article> {
    let mut fields: HashMap<String, Vec<String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in record.lines() {
        let line = line.trim_end_matches('\r');
        let caps = line_pattern()
            .captures(line)
            .ok_or_else(|| BibError::MalformedLine(line.to_string()))?;
        if let Some(field) = caps.name("field") {
            current = Some(field.as_str().to_string());
        }
        let Some(field) = &current else { continue };
        if matches!(field.as_str(), "FN" | "VR" | "ER") {
            continue;
        }
        if let Some(value) = caps.name("value") {
            fields.entry(field.clone()).or_default().push(value.as_str().to_string());
        }
    }

    let authors = fields.get("AU").cloned().unwrap_or_default();
    let year = fields
        .get("PY")
        .and_then(|v| v.first())
        .and_then(|s| parse_year(s));
    if authors.is_empty() || year.is_none() {
        return Err(BibError::MissingCriticalInformation);
    }

    let joined = |code: &str| fields.get(code).map(|v| v.join(" "));
    let doi = joined("DI");
    let mut keywords = fields.get("DE").map(|v| delimited(&v.join("; "), "; ")).unwrap_or_default();
    keywords.extend(fields.get("ID").map(|v| delimited(&v.join("; "), "; ")).unwrap_or_default());

    let references = fields
        .get("CR")
        .map(|lines| {
            lines
                .iter()
                .filter_map(|raw| match parse_reference(raw) {
                    Ok(article) => Some(article.into_handle()),
                    Err(_) => {
                        log::debug!("wos: dropping unparseable reference '{raw}'");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let times_cited = fields
        .get("Z9")
        .and_then(|v| v.first())
        .and_then(|s| s.trim().parse::<u32>().ok());

    let mut extra = HashMap::new();
    for (code, values) in &fields {
        extra.insert(code.clone(), ExtraValue::List(values.clone()));
    }

    let mut article = Article {
        label: doi.clone().unwrap_or_else(|| "replaceme".to_string()),
        ids: doi.iter().map(|d| format!("doi:{d}")).collect(),
        authors,
        year,
        title: joined("TI"),
        journal: joined("J9"),
        volume: joined("VL"),
        issue: joined("IS"),
        page: joined("BP"),
        doi,
        times_cited,
        references,
        keywords,
        sources: [record.to_string()].into_iter().collect(),
        extra,
        ..Default::default()
    };
    article.add_simple_id();
    article.set_simple_label();
    Ok(article)
}

fn parse_reference(raw: &str) -> Result<Article> {
    let caps = citation_pattern()
        .captures(raw)
        .ok_or_else(|| BibError::MalformedReference(raw.to_string()))?;
    let author = caps.name("AU").map(|m| m.as_str().trim().to_string());
    let year = caps.name("PY").and_then(|m| parse_year(m.as_str()));
    let (Some(author), Some(year)) = (author, year) else {
        return Err(BibError::MalformedReference(raw.to_string()));
    };
    let doi = caps.name("DI").map(|m| m.as_str().trim().to_string());
    let mut article = Article {
        label: raw.to_string(),
        ids: doi.iter().map(|d| format!("doi:{d}")).collect(),
        authors: vec![author],
        year: Some(year),
        journal: caps.name("J9").map(|m| m.as_str().trim().to_string()),
        volume: caps.name("VL").map(|m| m.as_str().to_string()),
        page: caps.name("BP").map(|m| m.as_str().to_string()),
        doi,
        sources: [raw.to_string()].into_iter().collect(),
        ..Default::default()
    };
    article.add_simple_id();
    Ok(article)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "AU Sun, ZW\nPY 2017\nTI A study of things\nCR Smith, J, 2010, J Foo, V1, P1, DOI 10.1/a\nCR this is not a valid reference\nER";

    #[test]
    fn parses_minimal_record() {
        let collection = WosCollectionBuilder::new()
            .add_reader(MINIMAL.as_bytes())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(collection.articles.len(), 1);
        let article = collection.articles[0].borrow();
        assert_eq!(article.year, Some(2017));
        assert_eq!(collection.citation_pairs().count(), 1);
    }

    #[test]
    fn skip_and_log_invariant() {
        let text = format!("{MINIMAL}\n\nPY 2020\nTI missing authors\nER");
        let collection = WosCollectionBuilder::new()
            .add_reader(text.as_bytes())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(collection.articles.len(), 1);
    }

    #[test]
    fn rejects_non_wos_input() {
        let result = WosCollectionBuilder::new()
            .add_reader("this is just prose, not a bibliographic record at all".as_bytes())
            .unwrap()
            .build();
        assert!(matches!(result, Err(BibError::InvalidFormat(_))));
    }
}
