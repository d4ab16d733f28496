//! Client-side port. The job lifecycle client calls a running gateway
//! through this trait; tests script it, `analyze` mode backs it with reqwest.

use crate::domain::{DomainError, ReportLanguage, RequestStatus};

/// A validated submission, ready to send. Channel is normalized and depth
/// range-checked before this is constructed.
#[derive(Debug, Clone)]
pub struct Submission {
    pub channel: String,
    pub language: ReportLanguage,
    pub depth: u32,
    pub purpose_hint: Option<String>,
}

/// What one poll of the gateway reported.
#[derive(Debug, Clone)]
pub struct PollSnapshot {
    pub status: RequestStatus,
    /// Error detail stored on the request, echoed verbatim for failed jobs.
    pub error: Option<String>,
    /// Shaped report (full or preview per the caller's access), present once ready.
    pub report: Option<serde_json::Value>,
}

/// Gateway API as seen by the polling client.
#[async_trait::async_trait]
pub trait AnalyzerApi: Send + Sync {
    /// Submit a new analysis request. Returns the request id to poll.
    async fn create_request(&self, submission: &Submission) -> Result<String, DomainError>;

    /// Poll the status of a request.
    async fn poll(&self, request_id: &str) -> Result<PollSnapshot, DomainError>;
}
