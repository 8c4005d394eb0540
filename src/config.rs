//! Connection settings for the Splunk management API.
//!
//! Settings are resolved once at startup, either from CLI flags (with
//! environment fallback) or from the environment directly, and then handed
//! to the [`ConnectionManager`](crate::connection::ConnectionManager).

use crate::types::{SplunkError, SplunkResult};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default Splunk host
pub const DEFAULT_HOST: &str = "localhost";

/// Default Splunk management port
pub const DEFAULT_PORT: u16 = 8089;

/// Environment variable names
pub const ENV_HOST: &str = "SPLUNK_HOST";
/// Management port variable
pub const ENV_PORT: &str = "SPLUNK_PORT";
/// Scheme variable
pub const ENV_PROTOCOL: &str = "SPLUNK_PROTOCOL";
/// Token variable
pub const ENV_TOKEN: &str = "SPLUNK_TOKEN";
/// Username variable
pub const ENV_USERNAME: &str = "SPLUNK_USERNAME";
/// Password variable
pub const ENV_PASSWORD: &str = "SPLUNK_PASSWORD";
/// Request timeout variable
pub const ENV_TIMEOUT_SECS: &str = "SPLUNK_TIMEOUT_SECS";

/// URL scheme used to reach Splunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    /// Plain HTTP
    Http,
    /// HTTPS (default)
    #[default]
    Https,
}

impl Scheme {
    /// Scheme as it appears in a URL
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = SplunkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(SplunkError::ConfigError(format!(
                "Invalid protocol '{}': expected http or https",
                other
            ))),
        }
    }
}

/// How to authenticate against Splunk
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Authentication token, sent on every request
    Token(String),
    /// Username and password, exchanged for a session key at login
    Basic {
        /// Splunk username
        username: String,
        /// Splunk password
        password: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Settings for reaching and authenticating against Splunk
#[derive(Clone)]
pub struct SplunkConfig {
    /// Splunk host name or address
    pub host: String,

    /// Management port
    pub port: u16,

    /// URL scheme
    pub scheme: Scheme,

    /// Authentication token; takes precedence over username/password
    pub token: Option<String>,

    /// Username for credential auth
    pub username: Option<String>,

    /// Password for credential auth
    pub password: Option<String>,

    /// Optional timeout applied to every request
    pub timeout: Option<Duration>,
}

impl Default for SplunkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            scheme: Scheme::default(),
            token: None,
            username: None,
            password: None,
            timeout: None,
        }
    }
}

impl fmt::Debug for SplunkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplunkConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SplunkConfig {
    /// Resolve settings from the process environment
    pub fn from_env() -> SplunkResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup
    ///
    /// Missing variables fall back to defaults. Credentials are not checked
    /// here; see [`SplunkConfig::credentials`].
    pub fn from_lookup<F>(lookup: F) -> SplunkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = non_empty(lookup(ENV_HOST)) {
            config.host = host;
        }

        if let Some(port) = non_empty(lookup(ENV_PORT)) {
            config.port = port.trim().parse().map_err(|_| {
                SplunkError::ConfigError(format!("Invalid {}: {}", ENV_PORT, port))
            })?;
        }

        if let Some(scheme) = non_empty(lookup(ENV_PROTOCOL)) {
            config.scheme = scheme.parse()?;
        }

        if let Some(secs) = non_empty(lookup(ENV_TIMEOUT_SECS)) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                SplunkError::ConfigError(format!("Invalid {}: {}", ENV_TIMEOUT_SECS, secs))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        config.token = lookup(ENV_TOKEN);
        config.username = lookup(ENV_USERNAME);
        config.password = lookup(ENV_PASSWORD);

        Ok(config)
    }

    /// Pick the authentication mode
    ///
    /// A non-empty token wins. Otherwise both username and password must be
    /// set; empty strings count as unset.
    pub fn credentials(&self) -> SplunkResult<Credentials> {
        if let Some(token) = non_empty(self.token.clone()) {
            return Ok(Credentials::Token(token));
        }

        match (
            non_empty(self.username.clone()),
            non_empty(self.password.clone()),
        ) {
            (Some(username), Some(password)) => Ok(Credentials::Basic { username, password }),
            _ => Err(SplunkError::ConfigError(format!(
                "{} and {} must be set if {} is not provided.",
                ENV_USERNAME, ENV_PASSWORD, ENV_TOKEN
            ))),
        }
    }

    /// TLS certificates are only verified over HTTPS
    pub fn verify_tls(&self) -> bool {
        self.scheme == Scheme::Https
    }

    /// Base URL of the management API, e.g. `https://localhost:8089/`
    ///
    /// IPv6 literals are bracketed, so `::1` becomes `https://[::1]:8089/`.
    pub fn base_url(&self) -> SplunkResult<Url> {
        let url = Url::parse(&format!(
            "{}://{}:{}/",
            self.scheme,
            self.authority_host(),
            self.port
        ))?;
        Ok(url)
    }

    fn authority_host(&self) -> String {
        let host = self.host.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
