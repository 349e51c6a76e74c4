//! Format parsers: one collection builder per supported bibliographic
//! export format, plus the shared helpers in [`common`].

pub mod bibtex;
pub mod common;
pub mod csv;
pub mod ris;
pub mod wos;

pub use bibtex::ScopusBibCollectionBuilder;
pub use csv::ScopusCsvCollectionBuilder;
pub use ris::ScopusRisCollectionBuilder;
pub use wos::WosCollectionBuilder;
