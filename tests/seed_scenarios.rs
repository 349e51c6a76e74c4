//! BibTeX two-entry citation counts, and cross-source consolidation
//! with both scalar fields populated.

use std::collections::HashSet;

use bibliosap::{read_scopus_bibtex, Article};

#[test]
fn bibtex_two_entries_mixed_citation_counts() {
    let mut refs = String::new();
    for i in 0..20 {
        refs.push_str(&format!("Author{i}, Some paper {i}, ({}) Journal Bar; ", 2000 + i));
    }
    let refs = refs.trim_end_matches("; ");

    let text = format!(
        r#"@ARTICLE{{Key2020,
  author = {{Smith, J. and Doe, A.}},
  title = {{A study of things}},
  year = {{2020}},
  journal = {{Journal of Foo}},
  doi = {{10.1/abc}},
  note = {{cited By 12}},
  references = {{Jones, K., Another paper, (2015) Journal Qux}},
}}

@ARTICLE{{Key2021,
  author = {{Roe, R.}},
  title = {{Another study}},
  year = {{2021}},
  journal = {{Journal of Baz}},
  doi = {{10.1/xyz}},
  references = {{{refs}}},
}}
"#
    );

    let collection = read_scopus_bibtex(text.as_bytes()).unwrap();
    assert_eq!(collection.articles.len(), 2);

    let mut times_cited: Vec<Option<u32>> = collection
        .articles
        .iter()
        .map(|a| a.borrow().times_cited)
        .collect();
    times_cited.sort();
    assert_eq!(times_cited, vec![None, Some(12)]);

    assert_eq!(collection.citation_pairs().count(), 1 + 20);
}

#[test]
fn consolidation_merges_scalar_fields_across_sources() {
    let a = Article {
        title: Some("T".to_string()),
        ..Article::new("A", HashSet::from(["doi:10.1/x".to_string()]))
    }
    .into_handle();
    let b = Article {
        times_cited: Some(5),
        ..Article::new("B", HashSet::from(["doi:10.1/x".to_string(), "simple:smith2010".to_string()]))
    }
    .into_handle();

    let collection = bibliosap::Collection::new(vec![a, b]).merge(&bibliosap::Collection::default());
    assert_eq!(collection.articles.len(), 1);
    let merged = collection.articles[0].borrow();
    assert_eq!(merged.title.as_deref(), Some("T"));
    assert_eq!(merged.times_cited, Some(5));
    assert!(merged.ids.contains("doi:10.1/x"));
    assert!(merged.ids.contains("simple:smith2010"));
}
