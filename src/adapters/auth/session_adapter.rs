//! Session verification adapters.
//!
//! `HttpSessionAdapter` asks the external auth provider; `StaticSessions` is
//! a fixed token→user map for tests and credential-less dev runs.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::ports::SessionPort;

/// Verifies bearer tokens against the auth provider's session endpoint.
pub struct HttpSessionAdapter {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    user: Option<SessionUser>,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    id: String,
}

impl HttpSessionAdapter {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl SessionPort for HttpSessionAdapter {
    async fn verify(&self, token: &str) -> Result<Option<String>, DomainError> {
        let res = self
            .client
            .get(format!("{}/session", self.base_url))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| DomainError::Session(format!("session request failed: {}", e)))?;

        // Invalid or expired token: caller proceeds as anonymous.
        if res.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(DomainError::Session(format!(
                "session endpoint returned {}",
                res.status()
            )));
        }
        let session: SessionResponse = res
            .json()
            .await
            .map_err(|e| DomainError::Session(format!("malformed session response: {}", e)))?;
        Ok(session.user.map(|u| u.id))
    }
}

/// Fixed token→user map. No real verification.
#[derive(Default)]
pub struct StaticSessions {
    tokens: HashMap<String, String>,
}

impl StaticSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, user_id: &str) -> Self {
        self.tokens.insert(token.to_string(), user_id.to_string());
        self
    }
}

#[async_trait::async_trait]
impl SessionPort for StaticSessions {
    async fn verify(&self, token: &str) -> Result<Option<String>, DomainError> {
        Ok(self.tokens.get(token).cloned())
    }
}
