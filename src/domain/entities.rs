//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/CMS types here; these are mapped from adapters.

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Lower bound for analysis depth (posts sampled).
pub const MIN_DEPTH: u32 = 200;
/// Upper bound for analysis depth.
pub const MAX_DEPTH: u32 = 500;

/// Sentinel owner value stored in the CMS for requests created without a session.
/// Only the CMS mapping layer should ever see this string; the rest of the code
/// works with [`Requester`].
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// Who is making a call. Explicit variant instead of a magic user-id string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    Anonymous,
    Authenticated(String),
}

impl Requester {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Requester::Authenticated(_))
    }

    /// User id, if authenticated.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Requester::Anonymous => None,
            Requester::Authenticated(id) => Some(id.as_str()),
        }
    }

    /// Owner string as stored in CMS documents (`"anonymous"` sentinel for no session).
    pub fn storage_id(&self) -> &str {
        match self {
            Requester::Anonymous => ANONYMOUS_OWNER,
            Requester::Authenticated(id) => id.as_str(),
        }
    }

    /// Rebuild a requester from a stored owner string.
    pub fn from_storage(owner: &str) -> Self {
        if owner == ANONYMOUS_OWNER || owner.is_empty() {
            Requester::Anonymous
        } else {
            Requester::Authenticated(owner.to_string())
        }
    }
}

/// Report language requested for the analysis output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportLanguage {
    En,
    Ru,
    De,
}

impl std::str::FromStr for ReportLanguage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EN" => Ok(ReportLanguage::En),
            "RU" => Ok(ReportLanguage::Ru),
            "DE" => Ok(ReportLanguage::De),
            other => Err(DomainError::Validation(format!(
                "unsupported report language: {}",
                other
            ))),
        }
    }
}

/// Status of an analysis request. Mutated by the external worker, never by us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Processing,
    Ready,
    Failed,
}

/// Strip `https://t.me/` prefix and a leading `@`, trim whitespace.
/// Idempotent: normalizing an already-normalized name is a no-op.
pub fn normalize_channel(input: &str) -> String {
    let s = input.trim();
    let s = s.strip_prefix("https://t.me/").unwrap_or(s);
    let s = s.strip_prefix('@').unwrap_or(s);
    s.to_string()
}

/// Depth must stay within [MIN_DEPTH, MAX_DEPTH].
pub fn validate_depth(depth: u32) -> Result<(), DomainError> {
    if (MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "depth {} out of range [{}, {}]",
            depth, MIN_DEPTH, MAX_DEPTH
        )))
    }
}

/// Payload for creating an analysis request. Channel is already normalized
/// and depth validated by the time this exists.
#[derive(Debug, Clone)]
pub struct NewAnalysisRequest {
    pub requester: Requester,
    pub channel: String,
    pub language: ReportLanguage,
    pub depth: u32,
    pub version: String,
    /// Computed at creation time: anonymous requester or open analyzer version.
    /// Open requests are pollable without a session.
    pub is_open_access: bool,
    pub purpose_hint: Option<String>,
}

/// A stored analysis request. Id assigned by the CMS.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub id: String,
    pub owner: Requester,
    pub channel: String,
    pub language: ReportLanguage,
    pub depth: u32,
    pub version: String,
    pub is_open_access: bool,
    pub status: RequestStatus,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One insight extracted by the analyzer, with its supporting posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub summary: String,
    /// Evidence posts backing the insight. Never shown in preview mode.
    #[serde(default)]
    pub evidence: Vec<serde_json::Value>,
}

/// A post the analyzer picked as characteristic of the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacteristicPost {
    /// Bucket assigned by the analyzer, e.g. "typical" or "top".
    pub category: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<chrono::DateTime<chrono::Utc>>,
}

/// The analyzer's output attached to a result. Profile/statistics/sampling are
/// worker-defined and passed through opaquely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    #[serde(default)]
    pub profile: serde_json::Value,
    #[serde(default)]
    pub statistics: serde_json::Value,
    #[serde(default)]
    pub sampling: serde_json::Value,
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub characteristic_posts: Vec<CharacteristicPost>,
}

/// A stored analysis result. One-to-one with the request that produced it.
/// Owner/channel/language/depth/version are denormalized copies for querying.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub id: String,
    pub request_id: String,
    pub owner: Requester,
    pub channel: String,
    pub language: ReportLanguage,
    pub depth: u32,
    pub version: String,
    pub payload: AnalysisPayload,
    /// Free-form metadata; may hold a `shareToken` string.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AnalysisResult {
    /// The share token stored on this result, if any (empty strings count as none).
    pub fn share_token(&self) -> Option<&str> {
        self.metadata
            .get("shareToken")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
    }
}
