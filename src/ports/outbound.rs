//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{AnalysisRequest, AnalysisResult, DomainError, NewAnalysisRequest};

/// Filter for result listings.
#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    /// Restrict to one channel (normalized name).
    pub channel: Option<String>,
    /// Restrict to one analyzer version tag.
    pub version: Option<String>,
}

/// One page of results plus the total count for pagination.
#[derive(Debug, Clone)]
pub struct ResultPage {
    pub items: Vec<AnalysisResult>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Headless CMS gateway. The CMS is the single system of record; the
/// gateway holds no server-side state of its own.
///
/// The adapter authenticates with a service-level credential per operation
/// (idempotent login exchange); end-user sessions never reach the CMS.
#[async_trait::async_trait]
pub trait CmsPort: Send + Sync {
    /// Create an analysis request record with status `processing`. Returns the new id.
    async fn create_request(&self, req: &NewAnalysisRequest) -> Result<String, DomainError>;

    /// Read a request by id. `None` when absent.
    async fn get_request(&self, id: &str) -> Result<Option<AnalysisRequest>, DomainError>;

    /// Read the result linked to a request (1:1 back-reference; at most one expected).
    async fn find_result_for_request(
        &self,
        request_id: &str,
    ) -> Result<Option<AnalysisResult>, DomainError>;

    /// Read a result by id. `None` when absent.
    async fn get_result(&self, id: &str) -> Result<Option<AnalysisResult>, DomainError>;

    /// Most recent result for a channel + analyzer version, if any.
    async fn find_latest_result(
        &self,
        channel: &str,
        version: &str,
    ) -> Result<Option<AnalysisResult>, DomainError>;

    /// Page through an owner's results, newest first.
    async fn list_results(
        &self,
        owner: &str,
        filter: &ResultFilter,
        limit: u32,
        page: u32,
    ) -> Result<ResultPage, DomainError>;

    /// Delete a result. Returns `false` when the id was absent.
    async fn delete_result(&self, id: &str) -> Result<bool, DomainError>;

    /// Persist `metadata.shareToken` via a partial update. Must not clobber
    /// other metadata keys.
    async fn set_share_token(&self, id: &str, token: &str) -> Result<(), DomainError>;

    /// Best-effort side write: log a submission lead. Callers spawn this and
    /// swallow errors; it must never affect the main response.
    async fn record_lead(
        &self,
        channel: &str,
        owner: &str,
        purpose_hint: &str,
    ) -> Result<(), DomainError>;
}

/// Auth provider session verification. Maps a bearer token to a user id.
#[async_trait::async_trait]
pub trait SessionPort: Send + Sync {
    /// `Ok(None)` for a missing/invalid session (callers fall back to
    /// anonymous); `Err` only for provider transport failures.
    async fn verify(&self, token: &str) -> Result<Option<String>, DomainError>;
}
