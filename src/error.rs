use thiserror::Error;

/// The error taxonomy shared by every stage of the pipeline: parsing,
/// consolidation, remote fetching, and SAP classification.
#[derive(Error, Debug)]
pub enum BibError {
    /// A line inside a structured record didn't match the format's grammar.
    #[error("'{0}' is not a valid line for this format")]
    MalformedLine(String),

    /// A single reference string inside an otherwise-valid record couldn't be parsed.
    #[error("'{0}' does not look like a citation")]
    MalformedReference(String),

    /// A record is missing `authors` or `year` after parsing.
    #[error("record is missing authors or year")]
    MissingCriticalInformation,

    /// The input doesn't plausibly match this parser's format at all.
    #[error("the input does not look like a {0} file")]
    InvalidFormat(&'static str),

    /// The remote catalogue failed, returned an unexpected schema, or exhausted retries.
    #[error("remote fetch failed: {0}")]
    RemoteError(String),

    /// A SAP pass was invoked on a graph lacking the attribute it requires.
    #[error("SAP precondition failed: {0}")]
    SapPrecondition(&'static str),

    /// Underlying CSV decoding failure (Scopus CSV parser).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying BibTeX grammar failure (Scopus BibTeX parser).
    #[error("BibTeX error: {0}")]
    Bibtex(String),

    /// Underlying I/O failure while reading input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BibError>;
