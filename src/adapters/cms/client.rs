//! CMS adapter. Implements CmsPort against a Payload-style headless CMS
//! REST API (`where[field][equals]=` filters, `docs`/`totalDocs` envelopes).
//!
//! Each operation performs its own service login; the short-lived token is
//! never cached across requests (idempotent exchange, no locking needed).

use serde::Deserialize;

use crate::adapters::cms::mapper;
use crate::domain::{AnalysisRequest, AnalysisResult, DomainError, NewAnalysisRequest};
use crate::ports::{CmsPort, ResultFilter, ResultPage};

const REQUESTS_COLLECTION: &str = "analysis-requests";
const RESULTS_COLLECTION: &str = "analysis-results";
const LEADS_COLLECTION: &str = "leads";

/// HTTP adapter for the CMS, authenticated with a service account.
pub struct CmsHttpAdapter {
    client: reqwest::Client,
    base_url: String,
    service_email: String,
    service_password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct CreatedEnvelope<T> {
    doc: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindEnvelope<T> {
    docs: Vec<T>,
    #[serde(default)]
    total_docs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CreatedId {
    id: String,
}

impl CmsHttpAdapter {
    pub fn new(base_url: String, service_email: String, service_password: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_email,
            service_password,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/api/{}", self.base_url, collection)
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, collection, id)
    }

    /// Exchange the service credential for a short-lived token.
    async fn service_token(&self) -> Result<String, DomainError> {
        let res = self
            .client
            .post(format!("{}/api/users/login", self.base_url))
            .json(&serde_json::json!({
                "email": self.service_email,
                "password": self.service_password,
            }))
            .send()
            .await
            .map_err(|e| DomainError::Cms(format!("service login request failed: {}", e)))?;

        if !res.status().is_success() {
            // Status only: the login error body may echo the credential.
            return Err(DomainError::Cms(format!(
                "service login rejected: {}",
                res.status()
            )));
        }
        let login: LoginResponse = res
            .json()
            .await
            .map_err(|e| DomainError::Cms(format!("malformed login response: {}", e)))?;
        Ok(login.token)
    }

    /// Read the error body of a non-2xx CMS response, truncated for logs.
    async fn upstream_detail(res: reqwest::Response) -> String {
        let status = res.status();
        let body = res.text().await.unwrap_or_else(|_| "unknown".to_string());
        let detail: String = body.chars().take(300).collect();
        format!("{}: {}", status, detail)
    }

    async fn get_doc<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, DomainError> {
        let token = self.service_token().await?;
        let res = self
            .client
            .get(self.doc_url(collection, id))
            .header("Authorization", format!("JWT {}", token))
            .send()
            .await
            .map_err(|e| DomainError::Cms(format!("CMS request failed: {}", e)))?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(DomainError::Cms(Self::upstream_detail(res).await));
        }
        let doc = res
            .json::<T>()
            .await
            .map_err(|e| DomainError::Cms(format!("malformed CMS document: {}", e)))?;
        Ok(Some(doc))
    }

    async fn find_docs<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        query: &[(String, String)],
    ) -> Result<FindEnvelope<T>, DomainError> {
        let token = self.service_token().await?;
        let res = self
            .client
            .get(self.collection_url(collection))
            .query(query)
            .header("Authorization", format!("JWT {}", token))
            .send()
            .await
            .map_err(|e| DomainError::Cms(format!("CMS request failed: {}", e)))?;

        if !res.status().is_success() {
            return Err(DomainError::Cms(Self::upstream_detail(res).await));
        }
        res.json::<FindEnvelope<T>>()
            .await
            .map_err(|e| DomainError::Cms(format!("malformed CMS find response: {}", e)))
    }

    async fn create_doc(
        &self,
        collection: &str,
        body: &serde_json::Value,
    ) -> Result<String, DomainError> {
        let token = self.service_token().await?;
        let res = self
            .client
            .post(self.collection_url(collection))
            .header("Authorization", format!("JWT {}", token))
            .json(body)
            .send()
            .await
            .map_err(|e| DomainError::Cms(format!("CMS write failed: {}", e)))?;

        if !res.status().is_success() {
            return Err(DomainError::Cms(Self::upstream_detail(res).await));
        }
        let created: CreatedEnvelope<CreatedId> = res
            .json()
            .await
            .map_err(|e| DomainError::Cms(format!("malformed CMS create response: {}", e)))?;
        Ok(created.doc.id)
    }

    async fn patch_doc(
        &self,
        collection: &str,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<(), DomainError> {
        let token = self.service_token().await?;
        let res = self
            .client
            .patch(self.doc_url(collection, id))
            .header("Authorization", format!("JWT {}", token))
            .json(body)
            .send()
            .await
            .map_err(|e| DomainError::Cms(format!("CMS update failed: {}", e)))?;

        if !res.status().is_success() {
            return Err(DomainError::Cms(Self::upstream_detail(res).await));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CmsPort for CmsHttpAdapter {
    async fn create_request(&self, req: &NewAnalysisRequest) -> Result<String, DomainError> {
        self.create_doc(REQUESTS_COLLECTION, &mapper::new_request_body(req))
            .await
    }

    async fn get_request(&self, id: &str) -> Result<Option<AnalysisRequest>, DomainError> {
        Ok(self
            .get_doc::<mapper::RequestDoc>(REQUESTS_COLLECTION, id)
            .await?
            .map(mapper::request_from_doc))
    }

    async fn find_result_for_request(
        &self,
        request_id: &str,
    ) -> Result<Option<AnalysisResult>, DomainError> {
        let found = self
            .find_docs::<mapper::ResultDoc>(
                RESULTS_COLLECTION,
                &[
                    ("where[request][equals]".into(), request_id.into()),
                    ("limit".into(), "1".into()),
                ],
            )
            .await?;
        Ok(found.docs.into_iter().next().map(mapper::result_from_doc))
    }

    async fn get_result(&self, id: &str) -> Result<Option<AnalysisResult>, DomainError> {
        Ok(self
            .get_doc::<mapper::ResultDoc>(RESULTS_COLLECTION, id)
            .await?
            .map(mapper::result_from_doc))
    }

    async fn find_latest_result(
        &self,
        channel: &str,
        version: &str,
    ) -> Result<Option<AnalysisResult>, DomainError> {
        let found = self
            .find_docs::<mapper::ResultDoc>(
                RESULTS_COLLECTION,
                &[
                    ("where[channel][equals]".into(), channel.into()),
                    ("where[version][equals]".into(), version.into()),
                    ("sort".into(), "-createdAt".into()),
                    ("limit".into(), "1".into()),
                ],
            )
            .await?;
        Ok(found.docs.into_iter().next().map(mapper::result_from_doc))
    }

    async fn list_results(
        &self,
        owner: &str,
        filter: &ResultFilter,
        limit: u32,
        page: u32,
    ) -> Result<ResultPage, DomainError> {
        let mut query = vec![
            ("where[owner][equals]".to_string(), owner.to_string()),
            ("sort".to_string(), "-createdAt".to_string()),
            ("limit".to_string(), limit.to_string()),
            ("page".to_string(), page.to_string()),
        ];
        if let Some(channel) = &filter.channel {
            query.push(("where[channel][equals]".into(), channel.clone()));
        }
        if let Some(version) = &filter.version {
            query.push(("where[version][equals]".into(), version.clone()));
        }

        let found = self
            .find_docs::<mapper::ResultDoc>(RESULTS_COLLECTION, &query)
            .await?;
        let total = found.total_docs.unwrap_or(found.docs.len() as u64);
        Ok(ResultPage {
            items: found.docs.into_iter().map(mapper::result_from_doc).collect(),
            total,
            page,
            limit,
        })
    }

    async fn delete_result(&self, id: &str) -> Result<bool, DomainError> {
        let token = self.service_token().await?;
        let res = self
            .client
            .delete(self.doc_url(RESULTS_COLLECTION, id))
            .header("Authorization", format!("JWT {}", token))
            .send()
            .await
            .map_err(|e| DomainError::Cms(format!("CMS delete failed: {}", e)))?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !res.status().is_success() {
            return Err(DomainError::Cms(Self::upstream_detail(res).await));
        }
        Ok(true)
    }

    async fn set_share_token(&self, id: &str, token: &str) -> Result<(), DomainError> {
        // PATCH replaces the whole metadata map, so merge with the stored one
        // to preserve unrelated keys.
        let result = self
            .get_result(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("result {}", id)))?;
        let mut metadata = result.metadata;
        metadata.insert(
            "shareToken".to_string(),
            serde_json::Value::String(token.to_string()),
        );
        self.patch_doc(
            RESULTS_COLLECTION,
            id,
            &serde_json::json!({ "metadata": metadata }),
        )
        .await
    }

    async fn record_lead(
        &self,
        channel: &str,
        owner: &str,
        purpose_hint: &str,
    ) -> Result<(), DomainError> {
        self.create_doc(
            LEADS_COLLECTION,
            &serde_json::json!({
                "channel": channel,
                "owner": owner,
                "purposeHint": purpose_hint,
            }),
        )
        .await
        .map(|_| ())
    }
}
