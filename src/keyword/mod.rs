//! Keyword search against the marketplace catalog endpoint.

pub mod types;

use percent_encoding::utf8_percent_encode;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::COMPONENT_ENCODE_SET;
use crate::product::MatchResult;
use crate::title::expand_queries;
use types::{CatalogResponse, collect_items};

#[derive(Debug, thiserror::Error)]
pub enum KeywordError {
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("Failed to fetch from Daraz: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Daraz catalog returned status {0}")]
    Status(u16),

    #[error("malformed catalog response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Keyword lookup against a product catalog.
/// Implemented by `CatalogClient` for production; mock implementations used in tests.
pub trait KeywordSearch {
    async fn search(&self, query: &str) -> Result<Vec<MatchResult>, KeywordError>;
}

#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/catalog/?ajax=true&isFirstRequest=true&page=1&q={}",
            self.base_url,
            utf8_percent_encode(query, COMPONENT_ENCODE_SET)
        )
    }
}

impl KeywordSearch for CatalogClient {
    async fn search(&self, query: &str) -> Result<Vec<MatchResult>, KeywordError> {
        if query.trim().is_empty() {
            return Err(KeywordError::EmptyQuery);
        }

        let response = self
            .http
            .get(self.search_url(query))
            .header("User-Agent", crate::USER_AGENT)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, query, "catalog search failed");
            return Err(KeywordError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: Option<CatalogResponse> = serde_json::from_str(&body)?;
        let results = collect_items(parsed);

        info!(query, results = results.len(), "catalog search complete");
        Ok(results)
    }
}

/// Tries each expanded query for `raw_title` once, stopping at the first with results.
pub async fn search_expanded(
    client: &impl KeywordSearch,
    raw_title: &str,
) -> Result<Vec<MatchResult>, KeywordError> {
    let queries: Vec<String> = expand_queries(raw_title)
        .into_iter()
        .filter(|q| !q.is_empty())
        .collect();

    if queries.is_empty() {
        return Err(KeywordError::EmptyQuery);
    }

    for query in &queries {
        let results = client.search(query).await?;
        if !results.is_empty() {
            return Ok(results);
        }
        debug!(%query, "no catalog hits, trying next query");
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::MatchSource;
    use std::sync::Mutex;

    struct MockCatalog {
        hits_for: &'static str,
        queries: Mutex<Vec<String>>,
    }

    impl MockCatalog {
        fn hits_for(query: &'static str) -> Self {
            Self {
                hits_for: query,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn captured_queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl KeywordSearch for MockCatalog {
        async fn search(&self, query: &str) -> Result<Vec<MatchResult>, KeywordError> {
            self.queries.lock().unwrap().push(query.to_string());
            if query == self.hits_for {
                Ok(vec![MatchResult {
                    url: "https://d.com/p".into(),
                    title: query.into(),
                    image: String::new(),
                    price: "100".into(),
                    rating: None,
                    source: MatchSource::Keyword,
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[test]
    fn search_url_encodes_query() {
        let client = CatalogClient::new(Client::new(), "https://www.daraz.com.bd/");
        assert_eq!(
            client.search_url("bamboo toothbrush & co"),
            "https://www.daraz.com.bd/catalog/?ajax=true&isFirstRequest=true&page=1&q=bamboo%20toothbrush%20%26%20co"
        );
    }

    #[tokio::test]
    async fn expanded_search_falls_through_to_bare_anchor() {
        let mock = MockCatalog::hits_for("Toothbrush");
        let results = search_expanded(&mock, "Bamboo Toothbrush").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(mock.captured_queries(), vec!["Bamboo Toothbrush", "Toothbrush"]);
    }

    #[tokio::test]
    async fn expanded_search_stops_at_first_hit() {
        let mock = MockCatalog::hits_for("Bamboo Toothbrush");
        search_expanded(&mock, "Bamboo Toothbrush").await.unwrap();

        assert_eq!(mock.captured_queries(), vec!["Bamboo Toothbrush"]);
    }

    #[tokio::test]
    async fn expanded_search_rejects_empty_title() {
        let mock = MockCatalog::hits_for("x");
        let err = search_expanded(&mock, "Wholesale OEM").await.unwrap_err();
        assert!(matches!(err, KeywordError::EmptyQuery));
        assert!(mock.captured_queries().is_empty());
    }
}
