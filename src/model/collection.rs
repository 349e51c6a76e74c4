use std::collections::HashMap;

use chrono::Datelike;

use crate::consolidate::deduplicate_articles;
use crate::model::article::ArticleHandle;

/// A list of articles plus the derived views the rest of the toolkit
/// builds on: citation pairs and year histograms.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub articles: Vec<ArticleHandle>,
}

impl Collection {
    pub fn new(articles: Vec<ArticleHandle>) -> Self {
        Collection { articles }
    }

    /// Merge this collection with another, deduplicating the combined
    /// article list by identifier-equivalence (see [`crate::consolidate`]).
    pub fn merge(&self, other: &Collection) -> Collection {
        let mut all = self.articles.clone();
        all.extend(other.articles.iter().cloned());
        Collection::new(deduplicate_articles(all))
    }

    /// Every `(citer, cited)` pair induced by `references`. Self-pairs
    /// (citer and cited share a `key`) are valid at this layer; SAP
    /// cleanup is responsible for removing them from the graph.
    pub fn citation_pairs(&self) -> impl Iterator<Item = (ArticleHandle, ArticleHandle)> + '_ {
        self.articles.iter().flat_map(|article| {
            let refs = article.borrow().references.clone();
            refs.into_iter().map(move |r| (article.clone(), r))
        })
    }

    fn first_year(&self) -> Option<i32> {
        self.articles
            .iter()
            .filter_map(|a| a.borrow().year)
            .min()
    }

    fn current_year() -> i32 {
        chrono::Utc::now().year()
    }

    /// Publication count by year, zero-filled from the oldest known
    /// publication year through the current calendar year. Empty if no
    /// article has a known year.
    pub fn published_by_year(&self) -> HashMap<i32, u32> {
        let Some(first) = self.first_year() else {
            return HashMap::new();
        };
        let mut years: HashMap<i32, u32> = (first..=Self::current_year()).map(|y| (y, 0)).collect();
        for article in &self.articles {
            if let Some(year) = article.borrow().year {
                *years.entry(year).or_insert(0) += 1;
            }
        }
        years
    }

    /// Citation count by year: the sum of `times_cited` over articles
    /// published in that year, zero-filled like [`Collection::published_by_year`].
    pub fn cited_by_year(&self) -> HashMap<i32, u64> {
        let Some(first) = self.first_year() else {
            return HashMap::new();
        };
        let mut years: HashMap<i32, u64> = (first..=Self::current_year()).map(|y| (y, 0)).collect();
        for article in &self.articles {
            let a = article.borrow();
            if let (Some(year), Some(cited)) = (a.year, a.times_cited) {
                *years.entry(year).or_insert(0) += cited as u64;
            }
        }
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::article::Article;
    use std::collections::HashSet;

    fn article(year: Option<i32>) -> ArticleHandle {
        Article {
            ids: HashSet::from([format!("simple:{:?}", year)]),
            year,
            ..Default::default()
        }
        .into_handle()
    }

    #[test]
    fn published_by_year_zero_fills_and_counts() {
        let years = [2010, 2010, 2000, 2000, 2021, 2021, 2022, 2005, 2005, 2010];
        let mut articles: Vec<ArticleHandle> = years.iter().map(|y| article(Some(*y))).collect();
        articles.push(article(None));
        articles.push(article(None));
        articles.push(article(None));
        let collection = Collection::new(articles);

        let histogram = collection.published_by_year();
        assert_eq!(histogram[&2010], 3);
        assert_eq!(histogram[&2001], 0);
        let total: u32 = histogram.values().sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn citation_pairs_follow_references() {
        let leaf = article(Some(1999));
        let root = Article {
            references: vec![leaf.clone()],
            ..Default::default()
        }
        .into_handle();
        let collection = Collection::new(vec![root.clone()]);
        let pairs: Vec<_> = collection.citation_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert!(crate::model::article::same_article(&pairs[0].0, &root));
        assert!(crate::model::article::same_article(&pairs[0].1, &leaf));
    }
}
