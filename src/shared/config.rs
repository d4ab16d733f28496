//! Application configuration. CMS credentials, endpoints, polling cadence.

use serde::Deserialize;

/// Default poll cadence in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1500;
/// Default number of poll attempts before the job client gives up
/// (~5 minutes at the default cadence).
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 200;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Gateway bind address. Read from HUB_BIND_ADDR.
    #[serde(default)]
    pub bind_addr: Option<String>,

    /// CMS base URL (e.g. https://cms.example.com). Read from HUB_CMS_BASE_URL.
    #[serde(default)]
    pub cms_base_url: Option<String>,

    /// CMS service account email. Read from HUB_CMS_EMAIL.
    #[serde(default)]
    pub cms_email: Option<String>,

    /// CMS service account password. Read from HUB_CMS_PASSWORD.
    #[serde(default)]
    pub cms_password: Option<String>,

    /// Auth provider base URL for session verification. Read from HUB_AUTH_BASE_URL.
    #[serde(default)]
    pub auth_base_url: Option<String>,

    /// Gateway URL targeted by `analyze` mode. Read from HUB_GATEWAY_URL.
    #[serde(default)]
    pub gateway_url: Option<String>,

    /// Session token forwarded by `analyze` mode. Read from HUB_SESSION_TOKEN.
    #[serde(default)]
    pub session_token: Option<String>,

    /// Analyzer version tag written to new requests. Read from HUB_ANALYZER_VERSION.
    #[serde(default)]
    pub analyzer_version: Option<String>,

    /// Poll cadence in ms for the job client. Read from HUB_POLL_INTERVAL_MS.
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    /// Poll attempts before giving up. Read from HUB_POLL_MAX_ATTEMPTS.
    #[serde(default)]
    pub poll_max_attempts: Option<u32>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("HUB"));
        if let Ok(path) = std::env::var("HUB_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn bind_addr_or_default(&self) -> String {
        self.bind_addr
            .clone()
            .unwrap_or_else(|| "127.0.0.1:8787".to_string())
    }

    pub fn gateway_url_or_default(&self) -> String {
        self.gateway_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_addr_or_default()))
    }

    pub fn analyzer_version_or_default(&self) -> String {
        self.analyzer_version
            .clone()
            .unwrap_or_else(|| "open_v1".to_string())
    }

    pub fn poll_interval_ms_or_default(&self) -> u64 {
        self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS)
    }

    pub fn poll_max_attempts_or_default(&self) -> u32 {
        self.poll_max_attempts.unwrap_or(DEFAULT_POLL_MAX_ATTEMPTS)
    }

    /// CMS adapter needs base URL and a service credential.
    pub fn is_cms_configured(&self) -> bool {
        self.cms_base_url.as_deref().is_some_and(|s| !s.is_empty())
            && self.cms_email.as_deref().is_some_and(|s| !s.is_empty())
            && self.cms_password.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn is_auth_configured(&self) -> bool {
        self.auth_base_url.as_deref().is_some_and(|s| !s.is_empty())
    }
}
