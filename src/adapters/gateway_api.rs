//! Reqwest implementation of the AnalyzerApi port, talking to a running
//! gateway. Used by the `analyze` mode and by anything embedding the job
//! client outside this process.

use serde::Deserialize;

use crate::domain::{DomainError, RequestStatus};
use crate::ports::{AnalyzerApi, PollSnapshot, Submission};

pub struct GatewayApiClient {
    client: reqwest::Client,
    base_url: String,
    /// Optional bearer token forwarded on every call.
    session_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollResponse {
    status: RequestStatus,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

impl GatewayApiClient {
    pub fn new(base_url: String, session_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token,
        }
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Turn a non-2xx gateway response into a human-readable message
    /// combining the error code and details when present.
    async fn error_message(res: reqwest::Response) -> String {
        let status = res.status();
        match res.json::<ErrorBody>().await {
            Ok(body) => match body.details {
                Some(details) => format!("{} ({})", body.error, details),
                None => body.error,
            },
            Err(_) => format!("gateway returned {}", status),
        }
    }
}

#[async_trait::async_trait]
impl AnalyzerApi for GatewayApiClient {
    async fn create_request(&self, submission: &Submission) -> Result<String, DomainError> {
        let res = self
            .with_auth(self.client.post(format!("{}/analysis-requests", self.base_url)))
            .json(&serde_json::json!({
                "channelInput": submission.channel,
                "reportLanguage": submission.language,
                "depth": submission.depth,
                "purposeHint": submission.purpose_hint,
            }))
            .send()
            .await
            .map_err(|e| DomainError::Transport(format!("create request failed: {}", e)))?;

        if !res.status().is_success() {
            return Err(DomainError::Transport(Self::error_message(res).await));
        }
        let created: CreateResponse = res
            .json()
            .await
            .map_err(|e| DomainError::Transport(format!("malformed create response: {}", e)))?;
        Ok(created.request_id)
    }

    async fn poll(&self, request_id: &str) -> Result<PollSnapshot, DomainError> {
        let res = self
            .with_auth(
                self.client
                    .get(format!("{}/analysis-requests/{}", self.base_url, request_id)),
            )
            .send()
            .await
            .map_err(|e| DomainError::Transport(format!("poll failed: {}", e)))?;

        if !res.status().is_success() {
            return Err(DomainError::Transport(Self::error_message(res).await));
        }
        let poll: PollResponse = res
            .json()
            .await
            .map_err(|e| DomainError::Transport(format!("malformed poll response: {}", e)))?;
        Ok(PollSnapshot {
            status: poll.status,
            error: poll.error,
            report: poll.result,
        })
    }
}
