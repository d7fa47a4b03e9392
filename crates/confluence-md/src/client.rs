//! HTTP client for the Confluence REST API
//!
//! [`PageSource`] is the retrieval seam used by the CLI; [`ConfluenceClient`]
//! implements it over `reqwest` with basic auth.

use crate::config::Config;
use crate::error::FetchError;
use crate::types::{Page, PageSummary, SearchQuery, SearchResults};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Total request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Expansions needed to render a page
const PAGE_EXPAND: &str = "body.storage,body.view,version,history,space";

/// Expansions needed to list search hits
const SEARCH_EXPAND: &str = "space,version,history,lastModified";

/// Maximum bytes of an error body kept in logs
const LOG_BODY_LIMIT: usize = 500;

/// Source of Confluence pages
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch a page by its numeric id
    async fn page_by_id(&self, id: &str) -> Result<Page, FetchError>;

    /// Run a content search
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults, FetchError>;

    /// Fetch a page by its browser URL (`.../pages/<id>/...`)
    async fn page_by_url(&self, url: &str) -> Result<Page, FetchError> {
        let id = extract_page_id(url)?;
        self.page_by_id(&id).await
    }
}

/// Extract the page id from a Confluence page URL.
///
/// The id is the path segment right after `/pages/`.
pub fn extract_page_id(page_url: &str) -> Result<String, FetchError> {
    let url = Url::parse(page_url)
        .map_err(|e| FetchError::InvalidPageUrl(format!("{}: {}", page_url, e)))?;

    let (_, rest) = url.path().split_once("/pages/").ok_or_else(|| {
        FetchError::InvalidPageUrl(format!("{}: missing /pages/ segment", page_url))
    })?;

    match rest.split('/').next() {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(FetchError::InvalidPageUrl(format!(
            "{}: could not extract page ID",
            page_url
        ))),
    }
}

/// Confluence REST API client
#[derive(Clone)]
pub struct ConfluenceClient {
    base_url: String,
    email: String,
    api_token: String,
    http: reqwest::Client,
}

impl ConfluenceClient {
    /// Create a client for the given site
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::ClientBuildError)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: email.into(),
            api_token: api_token.into(),
            http,
        })
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(&config.confluence_url, &config.email, &config.api_token)
    }

    /// Site base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Browser URL of a search hit
    pub fn web_url(&self, summary: &PageSummary) -> String {
        summary.web_url(&self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, ?query, "Request: GET");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .query(query)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        debug!(status = status.as_u16(), "Response");

        let body = response.text().await.map_err(FetchError::from_reqwest)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %truncate(&body, LOG_BODY_LIMIT), "Error response");
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        debug!(body = %truncate(&body, LOG_BODY_LIMIT), "Raw response");
        serde_json::from_str(&body).map_err(FetchError::Decode)
    }
}

#[async_trait]
impl PageSource for ConfluenceClient {
    async fn page_by_id(&self, id: &str) -> Result<Page, FetchError> {
        debug!(id, "Fetching page by ID");
        let path = format!("/rest/api/content/{}", id);
        let page: Page = self.get_json(&path, &[("expand", PAGE_EXPAND)]).await?;
        debug!(id = %page.id, title = %page.title, "Fetched page");
        Ok(page)
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResults, FetchError> {
        let cql = query.to_cql();
        let limit = query.limit.to_string();
        debug!(cql = %cql, "Search");

        let results: SearchResults = self
            .get_json(
                "/rest/api/content/search",
                &[
                    ("cql", cql.as_str()),
                    ("limit", limit.as_str()),
                    ("expand", SEARCH_EXPAND),
                ],
            )
            .await?;

        debug!(size = results.size, "Search returned results");
        if let Some(first) = results.results.first() {
            debug!(title = %first.title, id = %first.id, "First result");
        }
        Ok(results)
    }
}

impl std::fmt::Debug for ConfluenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluenceClient")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Cut a string to at most `max` bytes on a char boundary
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
