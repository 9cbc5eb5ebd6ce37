use std::collections::HashSet;

use crate::models::CanonicalArticle;

/// Canonical form of an extracted link.
///
/// Everything from the first `?` is dropped, then anything that does not
/// already start with `http` is prefixed with `base_url`. Fragments, host
/// case and trailing slashes are left alone.
pub fn normalize(raw_url: &str, base_url: &str) -> String {
    let path = match raw_url.find('?') {
        Some(idx) => &raw_url[..idx],
        None => raw_url,
    };

    if path.starts_with("http") {
        path.to_string()
    } else {
        format!("{}{}", base_url, path)
    }
}

/// Splits a batch into first occurrences and the number of repeated URLs.
pub fn dedupe(articles: Vec<CanonicalArticle>) -> (Vec<CanonicalArticle>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(articles.len());
    let mut repeats = 0;

    for article in articles {
        if seen.insert(article.url.clone()) {
            unique.push(article);
        } else {
            repeats += 1;
        }
    }

    (unique, repeats)
}
