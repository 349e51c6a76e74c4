//! Remote fetcher and enrichment builder for the OpenAlex catalogue.

pub mod builder;
pub mod client;

pub use builder::{EnrichmentMode, OpenAlexCollectionBuilder};
pub use client::{Fetcher, OpenAlexClient, Work};
