//! ============================================================================
//! Discogs Client - Catalog Query Facade
//! ============================================================================
//! Stable internal contract over the Discogs database API:
//! - search releases by free text
//! - release and master detail records
//! - "trending" surrogate (fixed genre/year filter)
//! Every request carries the static token and the fixed client identifier.
//! ============================================================================

use reqwest::header::USER_AGENT;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::types::{MasterDetail, ReleaseDetail, SearchResponse, SearchResult};
use crate::error::{GoldieError, Result};

/// Discogs API base URL
pub const DISCOGS_API: &str = "https://api.discogs.com";

/// Client identifier sent on every request
pub const CLIENT_USER_AGENT: &str = "DiscogsAppWeb/1.0";

const SEARCH_PAGE_SIZE: &str = "20";
const TRENDING_PAGE_SIZE: &str = "10";
const TRENDING_GENRE: &str = "Electronic";
const TRENDING_YEAR: &str = "2024";

/// Client for the Discogs database API
#[derive(Clone)]
pub struct DiscogsClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl DiscogsClient {
    /// Create a client against the public Discogs API
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, DISCOGS_API.to_string())
    }

    /// Create with a custom base URL
    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search releases. A blank query returns nothing without touching the
    /// network.
    pub async fn search_releases(&self, query: &str) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        info!("Searching Discogs releases: {}", query);

        let response: SearchResponse = self
            .fetch(
                "/database/search",
                &[("q", query), ("type", "release"), ("per_page", SEARCH_PAGE_SIZE)],
            )
            .await?;

        debug!("Search '{}' returned {} results", query, response.results.len());
        Ok(response.results)
    }

    pub async fn get_release_details(&self, id: &str) -> Result<ReleaseDetail> {
        info!("Fetching release {}", id);
        self.fetch(&format!("/releases/{}", id.trim()), &[]).await
    }

    pub async fn get_master_details(&self, id: &str) -> Result<MasterDetail> {
        info!("Fetching master {}", id);
        self.fetch(&format!("/masters/{}", id.trim()), &[]).await
    }

    /// Discogs has no trending endpoint for token auth, so this searches
    /// recent electronic releases instead.
    pub async fn get_trending(&self) -> Result<Vec<SearchResult>> {
        info!("Fetching trending releases");

        let response: SearchResponse = self
            .fetch(
                "/database/search",
                &[
                    ("genre", TRENDING_GENRE),
                    ("year", TRENDING_YEAR),
                    ("type", "release"),
                    ("per_page", TRENDING_PAGE_SIZE),
                ],
            )
            .await?;

        Ok(response.results)
    }

    /// GET an endpoint with the token attached; non-2xx is an upstream error
    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {} ({} params)", url, params.len());

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .query(params)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(|e| {
                error!("Discogs request to {} failed: {}", endpoint, e);
                GoldieError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let description = status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string();
            error!("Discogs API error on {}: {} {}", endpoint, status.as_u16(), description);
            return Err(GoldieError::Upstream {
                status: status.as_u16(),
                description,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GoldieError::Parse(format!("Failed to parse Discogs response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockServer;

    #[tokio::test]
    async fn test_empty_query_makes_no_request() {
        let server = MockServer::start(vec![]);
        let client = DiscogsClient::with_base_url("tok".to_string(), server.base_url.clone());

        assert!(client.search_releases("").await.unwrap().is_empty());
        assert!(client.search_releases("   ").await.unwrap().is_empty());
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_search_sends_token_and_client_id() {
        let body = r#"{"pagination": {"items": 1}, "results": [
            {"id": 1, "title": "Virus - Locura", "thumb": "t.jpg", "cover_image": "c.jpg", "year": "1985"}
        ]}"#;
        let server = MockServer::start(vec![(200, body.to_string())]);
        let client = DiscogsClient::with_base_url("secret-token".to_string(), server.base_url.clone());

        let results = client.search_releases("virus locura").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Virus - Locura");
        assert_eq!(results[0].year.as_deref(), Some("1985"));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, "GET");
        assert!(request.url.starts_with("/database/search?"));
        assert!(request.url.contains("token=secret-token"));
        assert!(request.url.contains("q=virus+locura"));
        assert!(request.url.contains("type=release"));
        assert!(request.url.contains("per_page=20"));
        assert_eq!(request.user_agent.as_deref(), Some(CLIENT_USER_AGENT));
    }

    #[tokio::test]
    async fn test_trending_uses_fixed_filter() {
        let server = MockServer::start(vec![(200, r#"{"results": []}"#.to_string())]);
        let client = DiscogsClient::with_base_url("tok".to_string(), server.base_url.clone());

        assert!(client.get_trending().await.unwrap().is_empty());

        let url = &server.requests()[0].url;
        assert!(url.contains("genre=Electronic"));
        assert!(url.contains("year=2024"));
        assert!(url.contains("per_page=10"));
        assert!(url.contains("token=tok"));
    }

    #[tokio::test]
    async fn test_release_details() {
        let body = r#"{"id": 249504, "title": "Artaud", "artists": [{"name": "Pescado Rabioso"}],
            "tracklist": [{"position": "A1", "title": "Todas Las Hojas Son Del Viento", "duration": "2:29"}]}"#;
        let server = MockServer::start(vec![(200, body.to_string())]);
        let client = DiscogsClient::with_base_url("tok".to_string(), server.base_url.clone());

        let release = client.get_release_details("249504").await.unwrap();
        assert_eq!(release.primary_artist(), Some("Pescado Rabioso"));
        assert_eq!(release.tracklist.len(), 1);
        assert!(server.requests()[0].url.starts_with("/releases/249504?token=tok"));
    }

    #[tokio::test]
    async fn test_master_details() {
        let body = r#"{"id": 33, "title": "Artaud", "main_release": 249504}"#;
        let server = MockServer::start(vec![(200, body.to_string())]);
        let client = DiscogsClient::with_base_url("tok".to_string(), server.base_url.clone());

        let master = client.get_master_details("33").await.unwrap();
        assert_eq!(master.main_release, Some(249504));
        assert!(server.requests()[0].url.starts_with("/masters/33?"));
    }

    #[tokio::test]
    async fn test_non_success_is_upstream_error() {
        let server = MockServer::start(vec![(404, r#"{"message": "Release not found."}"#.to_string())]);
        let client = DiscogsClient::with_base_url("tok".to_string(), server.base_url.clone());

        let err = client.get_release_details("0").await.unwrap_err();
        match err {
            GoldieError::Upstream { status, description } => {
                assert_eq!(status, 404);
                assert_eq!(description, "Not Found");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = DiscogsClient::with_base_url("tok".to_string(), "http://localhost:1/".to_string());
        assert_eq!(client.base_url(), "http://localhost:1");
        assert_eq!(DiscogsClient::new("tok".to_string()).base_url(), DISCOGS_API);
    }
}
