//! CMS document mapping. Converts between CMS JSON documents and domain
//! entities; the `"anonymous"` owner sentinel lives only here.

use serde::Deserialize;

use crate::domain::{
    AnalysisPayload, AnalysisRequest, AnalysisResult, NewAnalysisRequest, ReportLanguage,
    RequestStatus, Requester,
};

/// An `analysis-requests` document as stored by the CMS.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDoc {
    pub id: String,
    pub owner: String,
    pub channel: String,
    pub report_language: ReportLanguage,
    pub depth: u32,
    pub version: String,
    #[serde(default)]
    pub is_open_access: bool,
    pub status: RequestStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// An `analysis-results` document as stored by the CMS.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDoc {
    pub id: String,
    /// Foreign key back to the request (1:1).
    pub request: String,
    pub owner: String,
    pub channel: String,
    pub report_language: ReportLanguage,
    pub depth: u32,
    pub version: String,
    #[serde(flatten)]
    pub payload: AnalysisPayload,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub fn request_from_doc(doc: RequestDoc) -> AnalysisRequest {
    AnalysisRequest {
        id: doc.id,
        owner: Requester::from_storage(&doc.owner),
        channel: doc.channel,
        language: doc.report_language,
        depth: doc.depth,
        version: doc.version,
        is_open_access: doc.is_open_access,
        status: doc.status,
        error: doc.error,
        created_at: doc.created_at,
    }
}

pub fn result_from_doc(doc: ResultDoc) -> AnalysisResult {
    AnalysisResult {
        id: doc.id,
        request_id: doc.request,
        owner: Requester::from_storage(&doc.owner),
        channel: doc.channel,
        language: doc.report_language,
        depth: doc.depth,
        version: doc.version,
        payload: doc.payload,
        metadata: doc.metadata,
        created_at: doc.created_at,
    }
}

/// Body for creating a request document. Status starts as `processing`; the
/// external worker owns every later transition.
pub fn new_request_body(req: &NewAnalysisRequest) -> serde_json::Value {
    serde_json::json!({
        "owner": req.requester.storage_id(),
        "channel": req.channel,
        "reportLanguage": req.language,
        "depth": req.depth,
        "version": req.version,
        "isOpenAccess": req.is_open_access,
        "status": RequestStatus::Processing,
        "purposeHint": req.purpose_hint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_doc_parses_with_missing_optionals() {
        let json = serde_json::json!({
            "id": "res-1",
            "request": "req-1",
            "owner": "anonymous",
            "channel": "testchan",
            "reportLanguage": "EN",
            "depth": 250,
            "version": "open_v1",
            "profile": {"tone": "informal"},
            "createdAt": "2026-01-05T10:00:00Z"
        });
        let doc: ResultDoc = serde_json::from_value(json).unwrap();
        let result = result_from_doc(doc);
        assert_eq!(result.owner, Requester::Anonymous);
        assert!(result.payload.insights.is_empty());
        assert!(result.metadata.is_empty());
        assert_eq!(result.share_token(), None);
    }

    #[test]
    fn new_request_body_uses_owner_sentinel() {
        let body = new_request_body(&NewAnalysisRequest {
            requester: Requester::Anonymous,
            channel: "testchan".into(),
            language: ReportLanguage::De,
            depth: 300,
            version: "open_v1".into(),
            is_open_access: true,
            purpose_hint: None,
        });
        assert_eq!(body["owner"], "anonymous");
        assert_eq!(body["status"], "processing");
        assert_eq!(body["reportLanguage"], "DE");
    }
}
