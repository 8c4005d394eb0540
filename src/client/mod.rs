//! Minimal client for the Splunk management REST API.
//!
//! Covers what the tools need: authentication, one-shot searches and index
//! enumeration.

pub mod results;

pub use results::{SplunkMessage, parse_messages, read_results};

use crate::config::{Credentials, Scheme, SplunkConfig};
use crate::types::{SearchRecord, SplunkError, SplunkResult};
use crate::VERSION;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

/// Login endpoint, exchanges username/password for a session key
const LOGIN_PATH: &str = "services/auth/login";

/// Search jobs endpoint
const JOBS_PATH: &str = "services/search/jobs";

/// Index listing endpoint
const INDEXES_PATH: &str = "services/data/indexes";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "sessionKey")]
    session_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexesResponse {
    #[serde(default)]
    entry: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    name: String,
}

/// An authenticated session with a Splunk instance
pub struct SplunkService {
    client: Client,
    base_url: Url,
    authorization: String,
    scheme: Scheme,
    verify_tls: bool,
}

impl std::fmt::Debug for SplunkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplunkService")
            .field("base_url", &self.base_url.as_str())
            .field("scheme", &self.scheme)
            .field("verify_tls", &self.verify_tls)
            .finish_non_exhaustive()
    }
}

impl SplunkService {
    /// Connect to Splunk using the given settings
    ///
    /// Token auth needs no round trip. Username/password auth logs in and
    /// keeps the returned session key. Incomplete credentials fail before
    /// any request is made.
    #[instrument(skip(config), fields(host = %config.host, port = config.port))]
    pub async fn connect(config: &SplunkConfig) -> SplunkResult<Self> {
        let credentials = config.credentials()?;
        let base_url = config.base_url()?;
        let verify_tls = config.verify_tls();

        let mut builder = Client::builder()
            .user_agent(format!("splunk-mcp/{}", VERSION))
            .danger_accept_invalid_certs(!verify_tls)
            .gzip(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(SplunkError::HttpError)?;

        let authorization = match credentials {
            Credentials::Token(token) => {
                debug!("Using token authentication");
                token_authorization(&token)
            },
            Credentials::Basic { username, password } => {
                let session_key = login(&client, &base_url, &username, &password).await?;
                format!("Splunk {}", session_key)
            },
        };

        info!(url = %base_url, verify_tls, "Connected to Splunk");

        Ok(Self {
            client,
            base_url,
            authorization,
            scheme: config.scheme,
            verify_tls,
        })
    }

    /// Base URL of the management API
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether TLS certificates are verified
    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// Run a blocking one-shot search and collect its output
    #[instrument(skip(self))]
    pub async fn oneshot(
        &self,
        query: &str,
        earliest_time: &str,
        latest_time: &str,
    ) -> SplunkResult<Vec<SearchRecord>> {
        let url = self.base_url.join(JOBS_PATH)?;
        let form = [
            ("search", query),
            ("exec_mode", "oneshot"),
            ("earliest_time", earliest_time),
            ("latest_time", latest_time),
            ("output_mode", "json"),
        ];

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .form(&form)
            .send()
            .await?;

        let body = success_body(response).await?;
        let records = read_results(&body)?;

        info!(record_count = records.len(), "Search completed");
        Ok(records)
    }

    /// Names of the indexes visible to the authenticated user
    #[instrument(skip(self))]
    pub async fn list_indexes(&self) -> SplunkResult<Vec<String>> {
        let url = self.base_url.join(INDEXES_PATH)?;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .query(&[("output_mode", "json"), ("count", "0")])
            .send()
            .await?;

        let body = success_body(response).await?;
        let listing: IndexesResponse = serde_json::from_str(&body)?;
        let names: Vec<String> = listing.entry.into_iter().map(|e| e.name).collect();

        debug!(index_count = names.len(), "Listed indexes");
        Ok(names)
    }
}

/// Authorization header value for a token
///
/// Tokens already carrying a `Splunk ` or `Bearer ` prefix are sent as is.
fn token_authorization(token: &str) -> String {
    if token.starts_with("Splunk ") || token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Splunk {}", token)
    }
}

async fn login(client: &Client, base_url: &Url, username: &str, password: &str) -> SplunkResult<String> {
    let url = base_url.join(LOGIN_PATH)?;
    debug!(username = %username, "Logging in to Splunk");

    let response = client
        .post(url)
        .form(&[
            ("username", username),
            ("password", password),
            ("output_mode", "json"),
        ])
        .send()
        .await?;

    let body = success_body(response).await?;
    let login: LoginResponse = serde_json::from_str(&body)?;

    login
        .session_key
        .filter(|key| !key.is_empty())
        .ok_or_else(|| SplunkError::UnexpectedResponse("login reply has no sessionKey".to_string()))
}

/// Body of a successful reply, or the reply turned into an upstream error
async fn success_body(response: Response) -> SplunkResult<String> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return Ok(body);
    }

    Err(SplunkError::Upstream {
        status: status.as_u16(),
        message: upstream_message(&body),
    })
}

/// Join the texts of an error reply's `messages`, falling back to the raw body
fn upstream_message(body: &str) -> String {
    let texts: Vec<String> = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|mut value| value.get_mut("messages").map(|m| m.take()))
        .map(parse_messages)
        .unwrap_or_default()
        .into_iter()
        .map(|m| m.text)
        .filter(|text| !text.is_empty())
        .collect();

    if texts.is_empty() {
        body.trim().to_string()
    } else {
        texts.join("; ")
    }
}
