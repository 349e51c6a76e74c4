//! Ingest, consolidate, and rank scholarly citation graphs into a tree
//! of science.
//!
//! Five pieces compose bottom-up: the [`model`] every article and
//! collection is expressed in, one [`parsers`] builder per supported
//! export format, the [`consolidate`]r that unifies articles across
//! sources, the [`openalex`] remote fetcher, and the [`sap`] graph
//! classifier. This module is the thin façade over all of them.

pub mod consolidate;
pub mod error;
pub mod model;
pub mod openalex;
pub mod parsers;
pub mod sap;

use std::io::Read;

pub use error::{BibError, Result};
pub use model::{Article, ArticleHandle, ArticleInfo, Collection, ExtraValue};

use parsers::{ScopusBibCollectionBuilder, ScopusCsvCollectionBuilder, ScopusRisCollectionBuilder, WosCollectionBuilder};

/// Parse a Web of Science export into a [`Collection`].
pub fn read_wos(reader: impl Read) -> Result<Collection> {
    WosCollectionBuilder::new().add_reader(reader)?.build()
}

/// Parse a Scopus RIS export into a [`Collection`].
pub fn read_scopus_ris(reader: impl Read) -> Result<Collection> {
    ScopusRisCollectionBuilder::new().add_reader(reader)?.build()
}

/// Parse a Scopus BibTeX export into a [`Collection`].
pub fn read_scopus_bibtex(reader: impl Read) -> Result<Collection> {
    ScopusBibCollectionBuilder::new().add_reader(reader)?.build()
}

/// Parse a Scopus CSV export into a [`Collection`].
pub fn read_scopus_csv(reader: impl Read) -> Result<Collection> {
    ScopusCsvCollectionBuilder::new().add_reader(reader)?.build()
}

/// Auto-detect the format of `text` and parse it, trying WoS, then
/// Scopus RIS, then Scopus BibTeX, then Scopus CSV, in that order. Each
/// rejection is logged at debug level before falling through to the
/// next parser.
pub fn read_any(text: &str) -> Result<Collection> {
    match read_wos(text.as_bytes()) {
        Ok(collection) => return Ok(collection),
        Err(BibError::InvalidFormat(fmt)) => log::debug!("read_any: not {fmt}, trying Scopus RIS"),
        Err(e) => return Err(e),
    }
    match read_scopus_ris(text.as_bytes()) {
        Ok(collection) => return Ok(collection),
        Err(BibError::InvalidFormat(fmt)) => log::debug!("read_any: not {fmt}, trying Scopus BibTeX"),
        Err(e) => return Err(e),
    }
    match read_scopus_bibtex(text.as_bytes()) {
        Ok(collection) => return Ok(collection),
        Err(BibError::InvalidFormat(_)) | Err(BibError::Bibtex(_)) => {
            log::debug!("read_any: not Scopus BibTeX, trying Scopus CSV")
        }
        Err(e) => return Err(e),
    }
    read_scopus_csv(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_any_falls_through_to_csv() {
        let header = "Authors,Year,Title,Abbreviated Source Title,Volume,Issue,Page start,DOI,Cited by,References,Author Keywords,Index Keywords,Source\n";
        let row = "Smith J.,2020,A study,J Foo,1,2,10,10.1/a,5,,,,scopus\n";
        let text = format!("{header}{row}");
        let collection = read_any(&text).unwrap();
        assert_eq!(collection.articles.len(), 1);
    }

    #[test]
    fn read_any_rejects_prose() {
        let result = read_any("this is not bibliographic data in any format we support");
        assert!(result.is_err());
    }
}
