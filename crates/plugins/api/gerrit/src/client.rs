//! Gerrit REST API client implementation.

use async_trait::async_trait;
use gerrit_core::{
    Account, Change, ConnectionConfig, Error, Result, ReviewInput, ReviewProvider, SubmitInput,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{GerritAccount, GerritChange};
use crate::xssi;

/// Option asking Gerrit to include the current revision in change entities.
const CURRENT_REVISION: &str = "CURRENT_REVISION";

/// Gerrit REST API client authenticating with HTTP basic auth.
pub struct GerritClient {
    base_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

impl GerritClient {
    /// Create a client from resolved connection settings.
    pub fn new(connection: &ConnectionConfig) -> Self {
        Self::with_credentials(&connection.url, &connection.username, &connection.password)
    }

    /// Create a client with explicit credentials.
    ///
    /// REST paths are appended to `base_url` as-is, so a server that only
    /// authenticates under `/a/` needs that prefix in the URL.
    pub fn with_credentials(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build request with auth and accept headers.
    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
    }

    /// Build an API URL from path segments, percent-encoding each one.
    ///
    /// Segments are decoded first, so ids Gerrit returns already encoded
    /// (`platform%2Fbuild~main~I0123`) are encoded exactly once.
    fn api_url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid Gerrit URL '{}': {}", self.base_url, e)))?;

        let decoded = segments
            .iter()
            .map(|segment| {
                urlencoding::decode(segment).map_err(|e| {
                    Error::InvalidInput(format!("Invalid path segment '{}': {}", segment, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid Gerrit URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(decoded.iter().map(|segment| segment.as_ref()));

        Ok(url)
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: reqwest::Url,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(url = %url, "Gerrit GET request");

        let response = self
            .request(reqwest::Method::GET, url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: reqwest::Url,
        body: &B,
    ) -> Result<T> {
        debug!(url = %url, "Gerrit POST request");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Handle response, unwrapping the XSSI prefix on both paths.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = xssi::error_message(&body);
            warn!(
                status = status_code,
                message = message,
                "Gerrit API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        xssi::decode(&body)
    }
}

// =============================================================================
// Mapping functions: Gerrit types -> Unified types
// =============================================================================

fn map_account(account: Option<&GerritAccount>) -> Option<Account> {
    account.map(|a| Account {
        account_id: a.account_id,
        name: a.name.clone(),
        username: a.username.clone(),
        email: a.email.clone(),
    })
}

fn map_change(change: &GerritChange) -> Change {
    let current_patchset = change
        .current_revision
        .as_ref()
        .and_then(|sha| change.revisions.get(sha))
        .map(|revision| revision.number);

    Change {
        id: change.id.clone(),
        number: change.number,
        change_id: change.change_id.clone(),
        project: change.project.clone(),
        branch: change.branch.clone(),
        topic: change.topic.clone(),
        subject: change.subject.clone(),
        status: change.status.clone(),
        owner: map_account(change.owner.as_ref()),
        updated: change.updated.clone(),
        current_revision: change.current_revision.clone(),
        current_patchset,
    }
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl ReviewProvider for GerritClient {
    fn provider_name(&self) -> &'static str {
        "gerrit"
    }

    async fn query_changes(&self, query: &str, limit: Option<u32>) -> Result<Vec<Change>> {
        let url = self.api_url(&["changes", ""])?;

        let mut params = vec![("q", query.to_string())];
        if let Some(limit) = limit {
            params.push(("n", limit.to_string()));
        }
        params.push(("o", CURRENT_REVISION.to_string()));

        let changes: Vec<GerritChange> = self.get(url, &params).await?;
        Ok(changes.iter().map(map_change).collect())
    }

    async fn get_change(&self, change_id: &str) -> Result<Change> {
        let url = self.api_url(&["changes", change_id, "detail"])?;
        let change: GerritChange = self
            .get(url, &[("o", CURRENT_REVISION.to_string())])
            .await?;
        Ok(map_change(&change))
    }

    async fn get_change_detail(&self, change_id: &str, options: &[String]) -> Result<Value> {
        let url = self.api_url(&["changes", change_id, "detail"])?;
        let params: Vec<(&str, String)> = options.iter().map(|o| ("o", o.clone())).collect();
        self.get(url, &params).await
    }

    async fn post_review(
        &self,
        change_id: &str,
        revision_id: &str,
        input: &ReviewInput,
    ) -> Result<Value> {
        let url = self.api_url(&["changes", change_id, "revisions", revision_id, "review"])?;
        self.post(url, input).await
    }

    async fn submit_change(&self, change_id: &str, input: &SubmitInput) -> Result<Change> {
        let url = self.api_url(&["changes", change_id, "submit"])?;
        let change: GerritChange = self.post(url, input).await?;
        Ok(map_change(&change))
    }
}
