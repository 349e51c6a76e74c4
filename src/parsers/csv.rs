//! Scopus CSV parser.
//!
//! Grounded on `original_source/src/bibx/builders/scopus_csv.py`'s `Row`
//! column mapping and `_article_from_reference` splitting logic. Rows
//! are read with the `csv` crate's `Reader` and headers, rather than a
//! typed row model (no `pydantic` analogue in the pack), matching column
//! names by hand field by field.

use std::collections::HashMap;
use std::io::Read;

use crate::error::{BibError, Result};
use crate::model::article::ExtraValue;
use crate::model::{Article, Collection};
use crate::parsers::common::parse_year;

const REQUIRED_HEADERS: &[&str] = &[
    "Authors",
    "Year",
    "Title",
    "Abbreviated Source Title",
    "Volume",
    "Issue",
    "Page start",
    "DOI",
    "Cited by",
    "References",
    "Author Keywords",
    "Index Keywords",
    "Source",
];

/// Builder for collections of articles from Scopus CSV exports.
pub struct ScopusCsvCollectionBuilder {
    texts: Vec<String>,
}

impl ScopusCsvCollectionBuilder {
    pub fn new() -> Self {
        ScopusCsvCollectionBuilder { texts: Vec::new() }
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
        let mut any_row = false;
        for text in &self.texts {
            let mut reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());
            let headers = reader.headers()?.clone();
            if !REQUIRED_HEADERS.iter().all(|h| headers.iter().any(|c| c == *h)) {
                return Err(BibError::InvalidFormat("Scopus CSV"));
            }
            for record in reader.records() {
                let record = record?;
                any_row = true;
                let row: HashMap<&str, &str> = headers.iter().zip(record.iter()).collect();
                match article_from_row(&row) {
                    Ok(article) => articles.push(article.into_handle()),
                    Err(BibError::MissingCriticalInformation) => {
                        log::info!("csv: skipping row missing authors or year");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        if !any_row {
            return Ok(Collection::default());
        }
        Ok(Collection::new(articles))
    }
}

impl Default for ScopusCsvCollectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn split_semicolon(value: Option<&&str>) -> Vec<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.split("; ").map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

fn non_empty(value: Option<&&str>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(String::from)
}

/// A lone author cell that arrived as `"Lastname, F., G."` (three
/// comma-separated pieces, no semicolon) is really one name split too
/// eagerly; collapse it back into `"Lastname, F."` form.
fn rotate_lone_author(authors: Vec<String>) -> Vec<String> {
    if authors.len() != 1 {
        return authors;
    }
    let pieces: Vec<&str> = authors[0].split(',').map(str::trim).collect();
    if pieces.len() == 3 {
        vec![format!("{}, {}", pieces[0], pieces[1..].join(" "))]
    } else {
        authors
    }
}

fn article_from_row(row: &HashMap<&str, &str>) -> Result<Article> {
    let authors = rotate_lone_author(split_semicolon(row.get("Authors")));
    let year = row.get("Year").and_then(|y| parse_year(y));
    if authors.is_empty() || year.is_none() {
        return Err(BibError::MissingCriticalInformation);
    }
    let year = year.unwrap();

    let doi = non_empty(row.get("DOI"));
    let source = non_empty(row.get("Source")).unwrap_or_default();
    let mut keywords: Vec<String> = split_semicolon(row.get("Author Keywords"));
    for kw in split_semicolon(row.get("Index Keywords")) {
        if !keywords.contains(&kw) {
            keywords.push(kw);
        }
    }

    let references = split_semicolon(row.get("References"))
        .into_iter()
        .filter_map(|r| match article_from_reference(&r) {
            Some(a) => Some(a.into_handle()),
            None => {
                log::debug!("csv: dropping unparseable reference '{r}'");
                None
            }
        })
        .collect();

    let mut extra = HashMap::new();
    for (key, value) in row {
        extra.insert((*key).to_string(), ExtraValue::Text((*value).to_string()));
    }

    let mut article = Article {
        label: String::new(),
        ids: doi.iter().map(|d| format!("doi:{d}")).collect(),
        title: non_empty(row.get("Title")),
        authors,
        year: Some(year),
        journal: non_empty(row.get("Abbreviated Source Title")),
        volume: non_empty(row.get("Volume")),
        issue: non_empty(row.get("Issue")),
        page: non_empty(row.get("Page start")),
        doi,
        times_cited: row.get("Cited by").and_then(|v| v.trim().parse::<u32>().ok()),
        references,
        keywords,
        sources: [source].into_iter().filter(|s| !s.is_empty()).collect(),
        extra,
        ..Default::default()
    };
    article.add_simple_id();
    article.set_simple_label();
    Ok(article)
}

/// `*authors, journal, issue, year = reference.split(", ")`: the last
/// comma-separated field is the parenthesized year, the second-to-last
/// the issue, the third-to-last the journal, everything before that the
/// authors.
fn article_from_reference(reference: &str) -> Option<Article> {
    let parts: Vec<&str> = reference.split(", ").collect();
    if parts.len() < 4 {
        return None;
    }
    let (authors, rest) = parts.split_at(parts.len() - 3);
    if authors.is_empty() {
        return None;
    }
    let journal = rest[0];
    let issue = rest[1];
    let year_token = rest[2].trim_start_matches('(').trim_end_matches(')');
    let year = parse_year(year_token)?;

    let mut article = Article {
        label: reference.to_string(),
        ids: [reference.to_string()].into_iter().collect(),
        authors: authors.iter().map(|s| s.trim().to_string()).collect(),
        year: Some(year),
        journal: Some(journal.trim().to_string()),
        issue: Some(issue.trim().to_string()),
        ..Default::default()
    };
    article.add_simple_id();
    Some(article)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Authors,Year,Title,Abbreviated Source Title,Volume,Issue,Page start,DOI,Cited by,References,Author Keywords,Index Keywords,Source\n";

    #[test]
    fn parses_minimal_row() {
        let row = "Smith J.; Doe A.,2020,A study,J Foo,1,2,10,10.1/a,5,\"Jones K., Another, 3, (2015)\",kw1; kw2,kw2; kw3,scopus\n";
        let text = format!("{HEADER}{row}");
        let collection = ScopusCsvCollectionBuilder::new()
            .add_reader(text.as_bytes())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(collection.articles.len(), 1);
        let article = collection.articles[0].borrow();
        assert_eq!(article.year, Some(2020));
        assert_eq!(article.keywords.len(), 3);
        assert_eq!(collection.citation_pairs().count(), 1);
    }

    #[test]
    fn rejects_missing_required_headers() {
        let text = "Foo,Bar\n1,2\n";
        let result = ScopusCsvCollectionBuilder::new()
            .add_reader(text.as_bytes())
            .unwrap()
            .build();
        assert!(matches!(result, Err(BibError::InvalidFormat(_))));
    }
}
