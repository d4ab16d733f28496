//! In-memory CmsPort for tests and for running without CMS credentials.
//!
//! Also plays the external analysis worker via `complete_request` /
//! `fail_request`, which is how tests drive a job to a terminal state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;
use tracing::info;

use crate::domain::{
    AnalysisPayload, AnalysisRequest, AnalysisResult, DomainError, NewAnalysisRequest,
    RequestStatus,
};
use crate::ports::{CmsPort, ResultFilter, ResultPage};

#[derive(Debug, Clone)]
pub struct LeadRecord {
    pub channel: String,
    pub owner: String,
    pub purpose_hint: String,
}

#[derive(Default)]
struct Store {
    requests: HashMap<String, AnalysisRequest>,
    results: HashMap<String, AnalysisResult>,
    leads: Vec<LeadRecord>,
}

/// In-memory CMS double.
#[derive(Default)]
pub struct MemoryCms {
    store: RwLock<Store>,
    /// Counts mutating result writes (used to assert share-token idempotence).
    result_writes: AtomicUsize,
}

impl MemoryCms {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(prefix: &str) -> String {
        format!("{}_{}", prefix, ulid::Ulid::new().to_string().to_lowercase())
    }

    /// Worker hook: mark a request ready and attach its result. Returns the
    /// result id.
    pub async fn complete_request(
        &self,
        request_id: &str,
        payload: AnalysisPayload,
    ) -> Result<String, DomainError> {
        let mut store = self.store.write().await;
        let request = store
            .requests
            .get_mut(request_id)
            .ok_or_else(|| DomainError::NotFound(format!("request {}", request_id)))?;
        request.status = RequestStatus::Ready;
        let request = request.clone();

        let id = Self::next_id("res");
        store.results.insert(
            id.clone(),
            AnalysisResult {
                id: id.clone(),
                request_id: request.id.clone(),
                owner: request.owner.clone(),
                channel: request.channel.clone(),
                language: request.language,
                depth: request.depth,
                version: request.version.clone(),
                payload,
                metadata: serde_json::Map::new(),
                created_at: chrono::Utc::now(),
            },
        );
        Ok(id)
    }

    /// Worker hook: mark a request failed with an error detail.
    pub async fn fail_request(&self, request_id: &str, error: &str) -> Result<(), DomainError> {
        let mut store = self.store.write().await;
        let request = store
            .requests
            .get_mut(request_id)
            .ok_or_else(|| DomainError::NotFound(format!("request {}", request_id)))?;
        request.status = RequestStatus::Failed;
        request.error = Some(error.to_string());
        Ok(())
    }

    /// Test hook: attach an extra metadata entry to a stored result, as the
    /// worker or an operator might outside this gateway.
    pub async fn annotate_result(
        &self,
        id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), DomainError> {
        let mut store = self.store.write().await;
        let result = store
            .results
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("result {}", id)))?;
        result.metadata.insert(key.to_string(), value);
        Ok(())
    }

    pub fn result_write_count(&self) -> usize {
        self.result_writes.load(Ordering::SeqCst)
    }

    pub async fn lead_count(&self) -> usize {
        self.store.read().await.leads.len()
    }
}

#[async_trait::async_trait]
impl CmsPort for MemoryCms {
    async fn create_request(&self, req: &NewAnalysisRequest) -> Result<String, DomainError> {
        let id = Self::next_id("req");
        let mut store = self.store.write().await;
        store.requests.insert(
            id.clone(),
            AnalysisRequest {
                id: id.clone(),
                owner: req.requester.clone(),
                channel: req.channel.clone(),
                language: req.language,
                depth: req.depth,
                version: req.version.clone(),
                is_open_access: req.is_open_access,
                status: RequestStatus::Processing,
                error: None,
                created_at: chrono::Utc::now(),
            },
        );
        info!(request_id = %id, "[memory] request stored");
        Ok(id)
    }

    async fn get_request(&self, id: &str) -> Result<Option<AnalysisRequest>, DomainError> {
        Ok(self.store.read().await.requests.get(id).cloned())
    }

    async fn find_result_for_request(
        &self,
        request_id: &str,
    ) -> Result<Option<AnalysisResult>, DomainError> {
        Ok(self
            .store
            .read()
            .await
            .results
            .values()
            .find(|r| r.request_id == request_id)
            .cloned())
    }

    async fn get_result(&self, id: &str) -> Result<Option<AnalysisResult>, DomainError> {
        Ok(self.store.read().await.results.get(id).cloned())
    }

    async fn find_latest_result(
        &self,
        channel: &str,
        version: &str,
    ) -> Result<Option<AnalysisResult>, DomainError> {
        let store = self.store.read().await;
        Ok(store
            .results
            .values()
            .filter(|r| r.channel == channel && r.version == version)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn list_results(
        &self,
        owner: &str,
        filter: &ResultFilter,
        limit: u32,
        page: u32,
    ) -> Result<ResultPage, DomainError> {
        let store = self.store.read().await;
        let mut matching: Vec<&AnalysisResult> = store
            .results
            .values()
            .filter(|r| r.owner.storage_id() == owner)
            .filter(|r| filter.channel.as_deref().is_none_or(|c| r.channel == c))
            .filter(|r| filter.version.as_deref().is_none_or(|v| r.version == v))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        // Widen before multiplying; the caller clamps limit but not page.
        let offset = page.saturating_sub(1) as usize * limit as usize;
        let items = matching
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ResultPage {
            items,
            total,
            page,
            limit,
        })
    }

    async fn delete_result(&self, id: &str) -> Result<bool, DomainError> {
        let mut store = self.store.write().await;
        Ok(store.results.remove(id).is_some())
    }

    async fn set_share_token(&self, id: &str, token: &str) -> Result<(), DomainError> {
        let mut store = self.store.write().await;
        let result = store
            .results
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("result {}", id)))?;
        result.metadata.insert(
            "shareToken".to_string(),
            serde_json::Value::String(token.to_string()),
        );
        self.result_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn record_lead(
        &self,
        channel: &str,
        owner: &str,
        purpose_hint: &str,
    ) -> Result<(), DomainError> {
        let mut store = self.store.write().await;
        store.leads.push(LeadRecord {
            channel: channel.to_string(),
            owner: owner.to_string(),
            purpose_hint: purpose_hint.to_string(),
        });
        Ok(())
    }
}
