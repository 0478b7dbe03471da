//! HTTP client for the DiMediaNet endpoints.
//!
//! One `ApiClient` serves both calls this application makes: the login
//! POST against the auth endpoint and the authenticated image GET. Login
//! failures are folded into the returned [`LoginResult`] rather than
//! propagated; the image fetch surfaces [`ApiError`] for the caller to
//! log.

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, redirect, Client, StatusCode};
use tracing::{debug, info, warn};

use crate::auth::{extract_token, Credentials, Session};
use crate::config::Config;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total request timeout in seconds, covering send and body read.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Sleep interval between completion checks in the blocking fetch variant.
const BLOCKING_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a single login call. Captures transport and protocol
/// failures instead of erroring, so the caller always gets the status
/// code and raw body the server produced (when one answered at all).
#[derive(Debug, Clone, Default)]
pub struct LoginResult {
    pub success: bool,
    pub status_code: Option<u16>,
    pub raw_body: String,
    pub error: Option<String>,
    pub token: Option<String>,
}

/// Client for the auth and image endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    login_url: String,
    image_url: String,
    container: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            // 3xx responses must reach the login success-range check
            // instead of being consumed by redirect following.
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            login_url: config.login_url.clone(),
            image_url: config.image_url.clone(),
            container: config.container.clone(),
        })
    }

    /// POST credentials to the login endpoint.
    ///
    /// Token extraction runs on error bodies too: the upstream API has
    /// been observed embedding a usable token in some error payloads, and
    /// callers are expected to keep such a token.
    pub async fn login(&self, credentials: &Credentials) -> LoginResult {
        let mut result = LoginResult::default();

        let response = match self
            .client
            .post(&self.login_url)
            .json(credentials)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // No response at all; nothing to extract a token from.
                warn!(error = %e, "login transport failure");
                result.error = Some(e.to_string());
                return result;
            }
        };

        let status = response.status();
        result.status_code = Some(status.as_u16());
        result.success = is_login_success(status);
        result.raw_body = response.text().await.unwrap_or_default();

        if !result.success {
            result.error = Some(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("error")
            ));
        }

        result.token = extract_token(&result.raw_body);

        if result.success {
            info!(
                status = status.as_u16(),
                has_token = result.token.is_some(),
                "login response"
            );
        } else {
            warn!(
                status = status.as_u16(),
                token_salvaged = result.token.is_some(),
                "login rejected"
            );
        }

        result
    }

    /// GET the configured image as raw bytes.
    ///
    /// The bearer header is attached only when the session holds a token;
    /// without one the request goes out unauthenticated, and the server
    /// decides what that is worth.
    pub async fn fetch_image(&self, session: &Session) -> Result<Vec<u8>, ApiError> {
        Self::fetch_image_inner(
            self.client.clone(),
            self.image_request_url(),
            session.token().map(str::to_string),
        )
        .await
    }

    /// Blocking form of [`ApiClient::fetch_image`].
    ///
    /// Spawns the request on the runtime and parks the calling thread in
    /// fixed-interval sleeps until the task reports done. Must be called
    /// from a thread that is not driving the runtime.
    pub fn fetch_image_blocking(
        &self,
        handle: &tokio::runtime::Handle,
        session: &Session,
    ) -> Result<Vec<u8>, ApiError> {
        let task = handle.spawn(Self::fetch_image_inner(
            self.client.clone(),
            self.image_request_url(),
            session.token().map(str::to_string),
        ));

        while !task.is_finished() {
            std::thread::sleep(BLOCKING_POLL_INTERVAL);
        }

        match handle.block_on(task) {
            Ok(result) => result,
            // The task is never aborted, so a join error is a panic from
            // inside the fetch; carry it across.
            Err(join_error) => std::panic::resume_unwind(join_error.into_panic()),
        }
    }

    async fn fetch_image_inner(
        client: Client,
        url: String,
        token: Option<String>,
    ) -> Result<Vec<u8>, ApiError> {
        debug!(url = %url, authenticated = token.is_some(), "fetching image");

        let mut request = client.get(&url).header(header::ACCEPT, "*/*");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::protocol(status, &body));
        }

        let bytes = response.bytes().await?;
        debug!(len = bytes.len(), "image downloaded");
        Ok(bytes.to_vec())
    }

    /// Image URL with the storage container query appended.
    fn image_request_url(&self) -> String {
        format!("{}?container={}", self.image_url, self.container)
    }
}

/// Login statuses anywhere in 200..400 count as success. Including 3xx is
/// deliberate tolerance: redirects are not followed (see `ApiClient::new`),
/// so a redirect status reaches this check as-is.
fn is_login_success(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_success_range() {
        assert!(is_login_success(StatusCode::OK));
        assert!(is_login_success(StatusCode::CREATED));
        assert!(is_login_success(StatusCode::MOVED_PERMANENTLY));
        assert!(is_login_success(StatusCode::from_u16(399).unwrap()));
        assert!(!is_login_success(StatusCode::from_u16(199).unwrap()));
        assert!(!is_login_success(StatusCode::BAD_REQUEST));
        assert!(!is_login_success(StatusCode::UNAUTHORIZED));
        assert!(!is_login_success(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_image_url_gains_container_query() {
        let config = Config {
            image_url: "https://example.test/api/Files/457".to_string(),
            container: "blobs".to_string(),
            ..Config::default()
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(
            client.image_request_url(),
            "https://example.test/api/Files/457?container=blobs"
        );
    }

    #[test]
    fn test_login_result_default_is_failure() {
        let result = LoginResult::default();
        assert!(!result.success);
        assert_eq!(result.status_code, None);
        assert_eq!(result.token, None);
    }
}
