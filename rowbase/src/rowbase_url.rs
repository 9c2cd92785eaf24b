use std::env;

use crate::domain::RowFilter;

/// Base URL of a Rowbase project, e.g. `https://acme.rowbase.co`.
#[derive(Debug, Clone)]
pub struct RowbaseUrl(String);

impl AsRef<str> for RowbaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl RowbaseUrl {
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    /// Creates a new RowbaseUrl from the environment variable `ROWBASE_URL`.
    pub fn from_env() -> Self {
        Self(env::var("ROWBASE_URL").expect("ROWBASE_URL must be set in env"))
    }

    /// Append the given path to the URL.
    pub fn append_path(&self, path: &str) -> Self {
        let trimmed_url = self.0.trim_end_matches('/');
        let trimmed_path = path.trim_start_matches('/');
        Self(format!("{}/{}", trimmed_url, trimmed_path))
    }

    pub fn with_filter(&self, filter: &impl RowFilter) -> Self {
        let mut url = self.0.clone();
        for (key, value) in filter.as_query() {
            let sep = if url.contains('?') { '&' } else { '?' };
            url.push(sep);
            url.push_str(&key);
            url.push('=');
            url.push_str(&value);
        }
        Self(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EqFilter, FilterSet, PageFilter};

    #[test]
    fn append_path_normalizes_slashes() {
        let url = RowbaseUrl::new("https://acme.rowbase.co/");
        assert_eq!(
            url.append_path("/rest/v1/invoices").as_ref(),
            "https://acme.rowbase.co/rest/v1/invoices"
        );
    }

    #[test]
    fn filters_use_question_mark_then_ampersand() {
        let url = RowbaseUrl::new("https://acme.rowbase.co")
            .append_path("rest/v1/invoices")
            .with_filter(&FilterSet::new().with(EqFilter::new("status", "open")))
            .with_filter(&PageFilter::new(20, 0));
        assert_eq!(
            url.as_ref(),
            "https://acme.rowbase.co/rest/v1/invoices?status=eq.open&limit=20&offset=0"
        );
    }
}
