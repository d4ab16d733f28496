//! Typed projections of a stored result, one per visibility level.
//!
//! Total functions: every stored result projects without panicking, including
//! empty payloads. Redaction happens here, after the access gate has decided.

use serde::Serialize;

use crate::domain::{AnalysisResult, CharacteristicPost, ReportLanguage};

/// Preview keeps at most this many insight summaries.
const PREVIEW_INSIGHT_CAP: usize = 3;
/// Preview keeps at most this many "typical" characteristic posts.
const PREVIEW_TYPICAL_POSTS_CAP: usize = 5;

/// Full view: everything the analyzer produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultFullDto {
    pub id: String,
    pub channel: String,
    pub language: ReportLanguage,
    pub depth: u32,
    pub version: String,
    pub profile: serde_json::Value,
    pub statistics: serde_json::Value,
    pub sampling: serde_json::Value,
    pub insights: Vec<crate::domain::Insight>,
    pub characteristic_posts: Vec<CharacteristicPost>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Title + summary of an insight, evidence dropped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSummaryDto {
    pub title: String,
    pub summary: String,
}

/// Preview view: teaser-safe fields only. Profile, statistics, and sampling
/// pass through unredacted; insight evidence is omitted entirely and only the
/// "typical" post bucket survives, capped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPreviewDto {
    pub id: String,
    pub channel: String,
    pub language: ReportLanguage,
    pub depth: u32,
    pub version: String,
    pub profile: serde_json::Value,
    pub statistics: serde_json::Value,
    pub sampling: serde_json::Value,
    pub insight_summaries: Vec<InsightSummaryDto>,
    pub characteristic_posts: Vec<CharacteristicPost>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Either projection, serialized transparently.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProjectedResult {
    Full(ResultFullDto),
    Preview(ResultPreviewDto),
}

/// Apply the projection matching an access decision.
pub fn project(access: crate::usecases::Access, result: &AnalysisResult) -> ProjectedResult {
    match access {
        crate::usecases::Access::Full => ProjectedResult::Full(project_full(result)),
        crate::usecases::Access::Preview => ProjectedResult::Preview(project_preview(result)),
    }
}

pub fn project_full(result: &AnalysisResult) -> ResultFullDto {
    ResultFullDto {
        id: result.id.clone(),
        channel: result.channel.clone(),
        language: result.language,
        depth: result.depth,
        version: result.version.clone(),
        profile: result.payload.profile.clone(),
        statistics: result.payload.statistics.clone(),
        sampling: result.payload.sampling.clone(),
        insights: result.payload.insights.clone(),
        characteristic_posts: result.payload.characteristic_posts.clone(),
        created_at: result.created_at,
    }
}

pub fn project_preview(result: &AnalysisResult) -> ResultPreviewDto {
    let insight_summaries = result
        .payload
        .insights
        .iter()
        .take(PREVIEW_INSIGHT_CAP)
        .map(|i| InsightSummaryDto {
            title: i.title.clone(),
            summary: i.summary.clone(),
        })
        .collect();

    let characteristic_posts = result
        .payload
        .characteristic_posts
        .iter()
        .filter(|p| p.category == "typical")
        .take(PREVIEW_TYPICAL_POSTS_CAP)
        .cloned()
        .collect();

    ResultPreviewDto {
        id: result.id.clone(),
        channel: result.channel.clone(),
        language: result.language,
        depth: result.depth,
        version: result.version.clone(),
        profile: result.payload.profile.clone(),
        statistics: result.payload.statistics.clone(),
        sampling: result.payload.sampling.clone(),
        insight_summaries,
        characteristic_posts,
        created_at: result.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisPayload, Insight, Requester};

    fn result_with_payload(payload: AnalysisPayload) -> AnalysisResult {
        AnalysisResult {
            id: "res-1".into(),
            request_id: "req-1".into(),
            owner: Requester::Authenticated("user-1".into()),
            channel: "testchan".into(),
            language: ReportLanguage::En,
            depth: 300,
            version: "open_v1".into(),
            payload,
            metadata: serde_json::Map::new(),
            created_at: chrono::Utc::now(),
        }
    }

    fn insight(n: usize) -> Insight {
        Insight {
            title: format!("insight {}", n),
            summary: format!("summary {}", n),
            evidence: vec![serde_json::json!({"post": n})],
        }
    }

    fn post(category: &str, n: usize) -> CharacteristicPost {
        CharacteristicPost {
            category: category.into(),
            text: format!("post {}", n),
            link: None,
            date: None,
        }
    }

    #[test]
    fn preview_caps_insights_and_drops_evidence() {
        let payload = AnalysisPayload {
            insights: (0..6).map(insight).collect(),
            ..Default::default()
        };
        let dto = project_preview(&result_with_payload(payload));
        assert_eq!(dto.insight_summaries.len(), 3);
        assert_eq!(dto.insight_summaries[0].title, "insight 0");
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("insights").is_none());
        assert!(json.to_string().find("evidence").is_none());
    }

    #[test]
    fn preview_keeps_only_typical_posts_capped_at_five() {
        let mut posts: Vec<CharacteristicPost> = (0..8).map(|n| post("typical", n)).collect();
        posts.push(post("top", 99));
        let payload = AnalysisPayload {
            characteristic_posts: posts,
            ..Default::default()
        };
        let dto = project_preview(&result_with_payload(payload));
        assert_eq!(dto.characteristic_posts.len(), 5);
        assert!(dto.characteristic_posts.iter().all(|p| p.category == "typical"));
    }

    #[test]
    fn preview_is_total_on_empty_payload() {
        let dto = project_preview(&result_with_payload(AnalysisPayload::default()));
        assert!(dto.insight_summaries.is_empty());
        assert!(dto.characteristic_posts.is_empty());
    }

    #[test]
    fn full_keeps_everything() {
        let payload = AnalysisPayload {
            insights: (0..6).map(insight).collect(),
            characteristic_posts: vec![post("typical", 1), post("top", 2)],
            ..Default::default()
        };
        let dto = project_full(&result_with_payload(payload));
        assert_eq!(dto.insights.len(), 6);
        assert_eq!(dto.characteristic_posts.len(), 2);
        assert!(!dto.insights[0].evidence.is_empty());
    }
}
