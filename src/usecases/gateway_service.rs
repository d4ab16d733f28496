//! Request/Result gateway. Translates front-end calls into CMS operations,
//! enforcing normalization and access control before any stored data leaves.
//!
//! Stateless: the CMS is the single source of truth, every call stands alone.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{
    normalize_channel, validate_depth, AnalysisResult, DomainError, NewAnalysisRequest,
    ReportLanguage, RequestStatus, Requester,
};
use crate::ports::{CmsPort, ResultFilter};
use crate::usecases::access_gate::{decide_access, Access};
use crate::usecases::projection::{project, project_full, ProjectedResult};

/// Default page size for listings.
const DEFAULT_PAGE_SIZE: u32 = 20;
/// Hard cap on page size.
const MAX_PAGE_SIZE: u32 = 50;

/// Analyzer versions whose requests are "open": creatable and pollable
/// without a session regardless of who created them.
const OPEN_VERSIONS: &[&str] = &["open_v1"];

/// Input for creating an analysis request. Raw channel input, not yet normalized.
#[derive(Debug, Clone)]
pub struct CreateRequestInput {
    pub channel_input: String,
    pub language: ReportLanguage,
    pub depth: u32,
    pub purpose_hint: Option<String>,
}

/// Query parameters for the by-channel read.
#[derive(Debug, Clone, Default)]
pub struct ChannelQuery {
    pub version: Option<String>,
    pub share_token: Option<String>,
    pub result_id: Option<String>,
}

/// Unified poll response: status plus, once ready, the shaped result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOutcome {
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProjectedResult>,
}

/// Shaped by-channel response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapedResult {
    pub access: Access,
    pub result: ProjectedResult,
}

/// One page of an owner's results (full projection: the caller is authenticated).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultListing {
    pub items: Vec<crate::usecases::ResultFullDto>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Compact report row for the cross-version "all my reports" view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: String,
    pub channel: String,
    pub version: String,
    pub language: ReportLanguage,
    pub shared: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListing {
    pub items: Vec<ReportSummary>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Gateway service. Coordinates the CMS port and the access gate.
pub struct GatewayService {
    cms: Arc<dyn CmsPort>,
    /// Analyzer version tag written to new requests and used as the default
    /// partition for by-channel reads.
    analyzer_version: String,
}

impl GatewayService {
    pub fn new(cms: Arc<dyn CmsPort>, analyzer_version: String) -> Self {
        Self {
            cms,
            analyzer_version,
        }
    }

    /// Create a new analysis request with status `processing`.
    ///
    /// Creation never requires authentication. A purpose hint triggers a
    /// best-effort lead write that cannot affect the response.
    pub async fn create_request(
        &self,
        requester: &Requester,
        input: CreateRequestInput,
    ) -> Result<String, DomainError> {
        let channel = normalize_channel(&input.channel_input);
        if channel.is_empty() {
            return Err(DomainError::Validation("channel must not be empty".into()));
        }
        validate_depth(input.depth)?;

        let is_open_access =
            !requester.is_authenticated() || OPEN_VERSIONS.contains(&self.analyzer_version.as_str());

        let new_request = NewAnalysisRequest {
            requester: requester.clone(),
            channel: channel.clone(),
            language: input.language,
            depth: input.depth,
            version: self.analyzer_version.clone(),
            is_open_access,
            purpose_hint: input.purpose_hint.clone(),
        };

        let id = self.cms.create_request(&new_request).await?;
        info!(request_id = %id, channel = %channel, "analysis request created");

        if let Some(hint) = input.purpose_hint.filter(|h| !h.trim().is_empty()) {
            let cms = Arc::clone(&self.cms);
            let owner = requester.storage_id().to_string();
            tokio::spawn(async move {
                if let Err(e) = cms.record_lead(&channel, &owner, &hint).await {
                    warn!(error = %e, "lead write failed (ignored)");
                }
            });
        }

        Ok(id)
    }

    /// Poll a request by id. Open requests are pollable anonymously; anything
    /// else requires the owner's session.
    pub async fn poll_request(
        &self,
        requester: &Requester,
        request_id: &str,
    ) -> Result<PollOutcome, DomainError> {
        let request = self
            .cms
            .get_request(request_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("request {}", request_id)))?;

        let is_owner = match (&request.owner, requester.user_id()) {
            (Requester::Authenticated(owner), Some(caller)) => owner == caller,
            _ => false,
        };
        if !request.is_open_access && !is_owner {
            return match requester {
                Requester::Anonymous => Err(DomainError::Unauthenticated),
                Requester::Authenticated(_) => {
                    Err(DomainError::Forbidden("not the request owner".into()))
                }
            };
        }

        if request.status != RequestStatus::Ready {
            return Ok(PollOutcome {
                status: request.status,
                error: request.error,
                access: None,
                result: None,
            });
        }

        // The ready flag can land before the result row is visible; report
        // processing and let the next tick retry.
        let Some(result) = self.cms.find_result_for_request(request_id).await? else {
            return Ok(PollOutcome {
                status: RequestStatus::Processing,
                error: None,
                access: None,
                result: None,
            });
        };

        let access = if requester.is_authenticated() {
            Access::Full
        } else {
            Access::Preview
        };
        Ok(PollOutcome {
            status: RequestStatus::Ready,
            error: None,
            access: Some(access),
            result: Some(project(access, &result)),
        })
    }

    /// Read a result by channel slug, or by explicit id scoped to that channel.
    /// A mismatched channel for an explicit id is a not-found, so result ids
    /// cannot be guessed across channels.
    pub async fn result_by_channel(
        &self,
        requester: &Requester,
        slug: &str,
        query: &ChannelQuery,
    ) -> Result<ShapedResult, DomainError> {
        let channel = normalize_channel(slug);
        if channel.is_empty() {
            return Err(DomainError::Validation("channel must not be empty".into()));
        }
        let version = query.version.as_deref().unwrap_or(&self.analyzer_version);

        let result: AnalysisResult = match &query.result_id {
            Some(rid) => self
                .cms
                .get_result(rid)
                .await?
                .filter(|r| r.channel == channel)
                .ok_or_else(|| DomainError::NotFound(format!("result for {}", channel)))?,
            None => self
                .cms
                .find_latest_result(&channel, version)
                .await?
                .ok_or_else(|| DomainError::NotFound(format!("result for {}", channel)))?,
        };

        let access = decide_access(
            requester,
            result.share_token(),
            query.share_token.as_deref(),
        );
        Ok(ShapedResult {
            access,
            result: project(access, &result),
        })
    }

    /// Page through the caller's own results, optionally narrowed to a
    /// channel + version. Authenticated callers see full projections.
    pub async fn list_results(
        &self,
        requester: &Requester,
        filter: ResultFilter,
        limit: Option<u32>,
        page: Option<u32>,
    ) -> Result<ResultListing, DomainError> {
        let owner = requester.user_id().ok_or(DomainError::Unauthenticated)?;
        let (limit, page) = clamp_page(limit, page);

        let page_data = self.cms.list_results(owner, &filter, limit, page).await?;
        Ok(ResultListing {
            items: page_data.items.iter().map(project_full).collect(),
            total: page_data.total,
            page: page_data.page,
            limit: page_data.limit,
        })
    }

    /// Cross-version aggregate of everything the caller owns, as compact rows.
    pub async fn list_reports(
        &self,
        requester: &Requester,
        limit: Option<u32>,
        page: Option<u32>,
    ) -> Result<ReportListing, DomainError> {
        let owner = requester.user_id().ok_or(DomainError::Unauthenticated)?;
        let (limit, page) = clamp_page(limit, page);

        let page_data = self
            .cms
            .list_results(owner, &ResultFilter::default(), limit, page)
            .await?;
        let items = page_data
            .items
            .iter()
            .map(|r| ReportSummary {
                id: r.id.clone(),
                channel: r.channel.clone(),
                version: r.version.clone(),
                language: r.language,
                shared: r.share_token().is_some(),
                created_at: r.created_at,
            })
            .collect();
        Ok(ReportListing {
            items,
            total: page_data.total,
            page: page_data.page,
            limit: page_data.limit,
        })
    }

    /// Delete a result. Ownership is checked explicitly here, same policy as
    /// share-token creation; nothing is delegated to CMS access control.
    pub async fn delete_result(
        &self,
        requester: &Requester,
        result_id: &str,
    ) -> Result<(), DomainError> {
        let caller = requester.user_id().ok_or(DomainError::Unauthenticated)?;
        let result = self
            .cms
            .get_result(result_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("result {}", result_id)))?;
        self.ensure_owner(&result, caller)?;

        let deleted = self.cms.delete_result(result_id).await?;
        if !deleted {
            return Err(DomainError::NotFound(format!("result {}", result_id)));
        }
        info!(result_id, "result deleted");
        Ok(())
    }

    /// Create or return the share token for a result. Idempotent: an existing
    /// token is returned unchanged without a write.
    pub async fn share_result(
        &self,
        requester: &Requester,
        result_id: &str,
    ) -> Result<String, DomainError> {
        let caller = requester.user_id().ok_or(DomainError::Unauthenticated)?;
        let result = self
            .cms
            .get_result(result_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("result {}", result_id)))?;
        self.ensure_owner(&result, caller)?;

        if let Some(existing) = result.share_token() {
            return Ok(existing.to_string());
        }

        let token = ulid::Ulid::new().to_string().to_lowercase();
        self.cms.set_share_token(result_id, &token).await?;
        info!(result_id, "share token created");
        Ok(token)
    }

    /// Explicit equality check between caller id and stored owner id.
    /// Anonymous results have no owner and cannot be mutated here.
    fn ensure_owner(&self, result: &AnalysisResult, caller: &str) -> Result<(), DomainError> {
        match &result.owner {
            Requester::Authenticated(owner) if owner == caller => Ok(()),
            _ => Err(DomainError::Forbidden("not the result owner".into())),
        }
    }
}

fn clamp_page(limit: Option<u32>, page: Option<u32>) -> (u32, u32) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);
    (limit, page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cms::MemoryCms;
    use crate::domain::{AnalysisPayload, CharacteristicPost, Insight};
    use crate::usecases::projection::ProjectedResult;

    fn service(version: &str) -> (Arc<MemoryCms>, GatewayService) {
        let cms = Arc::new(MemoryCms::new());
        let gateway = GatewayService::new(Arc::clone(&cms) as Arc<dyn CmsPort>, version.into());
        (cms, gateway)
    }

    fn user(id: &str) -> Requester {
        Requester::Authenticated(id.to_string())
    }

    fn input(channel: &str) -> CreateRequestInput {
        CreateRequestInput {
            channel_input: channel.to_string(),
            language: ReportLanguage::En,
            depth: 200,
            purpose_hint: None,
        }
    }

    fn payload_with_content() -> AnalysisPayload {
        AnalysisPayload {
            profile: serde_json::json!({"tone": "informal"}),
            statistics: serde_json::json!({"posts": 200}),
            sampling: serde_json::json!({"window_days": 30}),
            insights: (0..4)
                .map(|n| Insight {
                    title: format!("insight {}", n),
                    summary: format!("summary {}", n),
                    evidence: vec![serde_json::json!({"post": n})],
                })
                .collect(),
            characteristic_posts: (0..7)
                .map(|n| CharacteristicPost {
                    category: "typical".into(),
                    text: format!("post {}", n),
                    link: None,
                    date: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn create_normalizes_channel_and_validates_depth() {
        let (cms, gateway) = service("open_v1");

        let id = gateway
            .create_request(&Requester::Anonymous, input("https://t.me/testchan"))
            .await
            .unwrap();
        let stored = cms.get_request(&id).await.unwrap().unwrap();
        assert_eq!(stored.channel, "testchan");
        assert!(stored.is_open_access);
        assert_eq!(stored.status, RequestStatus::Processing);

        let mut bad = input("@testchan");
        bad.depth = 501;
        let err = gateway
            .create_request(&Requester::Anonymous, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = gateway
            .create_request(&Requester::Anonymous, input("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn purpose_hint_records_a_lead_without_blocking() {
        let (cms, gateway) = service("open_v1");
        let mut with_hint = input("@testchan");
        with_hint.purpose_hint = Some("competitor research".into());

        gateway
            .create_request(&Requester::Anonymous, with_hint)
            .await
            .unwrap();

        // The lead write is spawned; give it a moment.
        for _ in 0..50 {
            if cms.lead_count().await == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(cms.lead_count().await, 1);
    }

    #[tokio::test]
    async fn poll_unknown_request_is_not_found() {
        let (_cms, gateway) = service("open_v1");
        let err = gateway
            .poll_request(&Requester::Anonymous, "req_missing")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn poll_echoes_processing_and_failure() {
        let (cms, gateway) = service("open_v1");
        let id = gateway
            .create_request(&Requester::Anonymous, input("@testchan"))
            .await
            .unwrap();

        let outcome = gateway
            .poll_request(&Requester::Anonymous, &id)
            .await
            .unwrap();
        assert_eq!(outcome.status, RequestStatus::Processing);
        assert!(outcome.result.is_none());

        cms.fail_request(&id, "channel is private").await.unwrap();
        let outcome = gateway
            .poll_request(&Requester::Anonymous, &id)
            .await
            .unwrap();
        assert_eq!(outcome.status, RequestStatus::Failed);
        assert_eq!(outcome.error.as_deref(), Some("channel is private"));
    }

    #[tokio::test]
    async fn poll_shapes_ready_result_by_caller_identity() {
        let (cms, gateway) = service("open_v1");
        let id = gateway
            .create_request(&Requester::Anonymous, input("@testchan"))
            .await
            .unwrap();
        cms.complete_request(&id, payload_with_content())
            .await
            .unwrap();

        let outcome = gateway
            .poll_request(&Requester::Anonymous, &id)
            .await
            .unwrap();
        assert_eq!(outcome.status, RequestStatus::Ready);
        assert_eq!(outcome.access, Some(Access::Preview));
        assert!(matches!(outcome.result, Some(ProjectedResult::Preview(_))));

        let outcome = gateway.poll_request(&user("user-1"), &id).await.unwrap();
        assert_eq!(outcome.access, Some(Access::Full));
        match outcome.result {
            Some(ProjectedResult::Full(full)) => assert_eq!(full.channel, "testchan"),
            other => panic!("expected full projection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_open_request_is_owner_only() {
        let (_cms, gateway) = service("pro_v2");
        let id = gateway
            .create_request(&user("owner-1"), input("@testchan"))
            .await
            .unwrap();

        assert!(gateway.poll_request(&user("owner-1"), &id).await.is_ok());
        let err = gateway
            .poll_request(&Requester::Anonymous, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated));
        let err = gateway
            .poll_request(&user("other-2"), &id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn by_channel_applies_the_access_gate() {
        let (cms, gateway) = service("open_v1");
        let id = gateway
            .create_request(&user("owner-1"), input("@testchan"))
            .await
            .unwrap();
        let result_id = cms
            .complete_request(&id, payload_with_content())
            .await
            .unwrap();

        // Anonymous, no token: preview.
        let shaped = gateway
            .result_by_channel(&Requester::Anonymous, "testchan", &ChannelQuery::default())
            .await
            .unwrap();
        assert_eq!(shaped.access, Access::Preview);

        // Owner mints a token; anonymous with the link gets full.
        let token = gateway.share_result(&user("owner-1"), &result_id).await.unwrap();
        let shaped = gateway
            .result_by_channel(
                &Requester::Anonymous,
                "@testchan",
                &ChannelQuery {
                    share_token: Some(token),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(shaped.access, Access::Full);

        // Wrong token stays preview.
        let shaped = gateway
            .result_by_channel(
                &Requester::Anonymous,
                "testchan",
                &ChannelQuery {
                    share_token: Some("bogus".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(shaped.access, Access::Preview);
    }

    #[tokio::test]
    async fn explicit_result_id_is_scoped_to_its_channel() {
        let (cms, gateway) = service("open_v1");
        let id = gateway
            .create_request(&Requester::Anonymous, input("@testchan"))
            .await
            .unwrap();
        let result_id = cms
            .complete_request(&id, AnalysisPayload::default())
            .await
            .unwrap();

        assert!(gateway
            .result_by_channel(
                &Requester::Anonymous,
                "testchan",
                &ChannelQuery {
                    result_id: Some(result_id.clone()),
                    ..Default::default()
                },
            )
            .await
            .is_ok());

        // Same id under another channel: not found, ids are not guessable.
        let err = gateway
            .result_by_channel(
                &Requester::Anonymous,
                "otherchan",
                &ChannelQuery {
                    result_id: Some(result_id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn share_token_is_idempotent_and_owner_only() {
        let (cms, gateway) = service("open_v1");
        let id = gateway
            .create_request(&user("owner-1"), input("@testchan"))
            .await
            .unwrap();
        let result_id = cms
            .complete_request(&id, AnalysisPayload::default())
            .await
            .unwrap();

        let first = gateway.share_result(&user("owner-1"), &result_id).await.unwrap();
        assert!(first.len() >= 20);
        let second = gateway.share_result(&user("owner-1"), &result_id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cms.result_write_count(), 1);

        let err = gateway
            .share_result(&user("other-2"), &result_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        let err = gateway
            .share_result(&Requester::Anonymous, &result_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated));
    }

    #[tokio::test]
    async fn sharing_preserves_unrelated_metadata() {
        let (cms, gateway) = service("open_v1");
        let id = gateway
            .create_request(&user("owner-1"), input("@testchan"))
            .await
            .unwrap();
        let result_id = cms
            .complete_request(&id, AnalysisPayload::default())
            .await
            .unwrap();
        cms.annotate_result(&result_id, "pinned", serde_json::json!(true))
            .await
            .unwrap();

        let token = gateway.share_result(&user("owner-1"), &result_id).await.unwrap();

        let stored = cms.get_result(&result_id).await.unwrap().unwrap();
        assert_eq!(stored.share_token(), Some(token.as_str()));
        assert_eq!(stored.metadata.get("pinned"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn anonymous_results_cannot_be_shared_or_deleted() {
        let (cms, gateway) = service("open_v1");
        let id = gateway
            .create_request(&Requester::Anonymous, input("@testchan"))
            .await
            .unwrap();
        let result_id = cms
            .complete_request(&id, AnalysisPayload::default())
            .await
            .unwrap();

        let err = gateway
            .share_result(&user("user-1"), &result_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        let err = gateway
            .delete_result(&user("user-1"), &result_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn delete_enforces_ownership_then_removes() {
        let (cms, gateway) = service("open_v1");
        let id = gateway
            .create_request(&user("owner-1"), input("@testchan"))
            .await
            .unwrap();
        let result_id = cms
            .complete_request(&id, AnalysisPayload::default())
            .await
            .unwrap();

        let err = gateway
            .delete_result(&user("other-2"), &result_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        gateway.delete_result(&user("owner-1"), &result_id).await.unwrap();
        let err = gateway
            .delete_result(&user("owner-1"), &result_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn listings_require_auth_and_clamp_page_size() {
        let (cms, gateway) = service("open_v1");
        for n in 0..3 {
            let id = gateway
                .create_request(&user("owner-1"), input(&format!("chan{}", n)))
                .await
                .unwrap();
            cms.complete_request(&id, AnalysisPayload::default())
                .await
                .unwrap();
        }

        let err = gateway
            .list_results(&Requester::Anonymous, ResultFilter::default(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated));

        let listing = gateway
            .list_results(&user("owner-1"), ResultFilter::default(), Some(500), None)
            .await
            .unwrap();
        assert_eq!(listing.limit, 50);
        assert_eq!(listing.total, 3);
        assert_eq!(listing.items.len(), 3);

        let filtered = gateway
            .list_results(
                &user("owner-1"),
                ResultFilter {
                    channel: Some("chan1".into()),
                    version: Some("open_v1".into()),
                },
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(filtered.total, 1);

        let reports = gateway
            .list_reports(&user("owner-1"), None, None)
            .await
            .unwrap();
        assert_eq!(reports.items.len(), 3);
        assert!(reports.items.iter().all(|r| !r.shared));
    }
}
