use crate::errors::AppError;
use crate::models::{EnrichmentRecord, Lead, LeadWithEnrichment, NewLead};
use crate::prospector::LeadStore;
use reqwest::{header::HeaderMap, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const LIST_LEADS_QUERY: &str = "select=*,enrichment:lead_enrichment(*)&order=created_at.desc";

/// Client for the REST surface of the remote lead store.
///
/// Every request carries the API key both as `apikey` and as a bearer token.
#[derive(Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    /// Creates a new `StoreClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Project URL; requests go to `{base_url}/rest/v1/...`.
    /// * `api_key` - Publishable API key.
    /// * `timeout` - Per-request timeout.
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to create store client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    async fn send(&self, builder: RequestBuilder, action: &str) -> Result<Response, AppError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Store request failed ({}): {}", action, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = error_message(response).await;
            tracing::error!("Store returned {} while trying to {}: {}", status, action, message);
            return Err(AppError::Transport(format!(
                "Store returned {}: {}",
                status, message
            )));
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response, action: &str) -> Result<T, AppError> {
        response.json().await.map_err(|e| {
            AppError::Transport(format!("Failed to parse store response ({}): {}", action, e))
        })
    }

    async fn insert_leads<B: Serialize + ?Sized>(&self, body: &B) -> Result<Vec<Lead>, AppError> {
        let builder = self
            .client
            .post(self.endpoint("leads"))
            .header("Prefer", "return=representation")
            .json(body);

        let response = self.send(builder, "create leads").await?;
        Self::decode(response, "create leads").await
    }

    /// Lists all leads, newest first, each joined with its enrichment.
    pub async fn list_leads(&self) -> Result<Vec<LeadWithEnrichment>, AppError> {
        let url = self.endpoint(&format!("leads?{}", LIST_LEADS_QUERY));
        tracing::debug!("Fetching leads from store: {}", url);

        let response = self.send(self.client.get(&url), "list leads").await?;
        let leads: Vec<LeadWithEnrichment> = Self::decode(response, "list leads").await?;

        tracing::info!("Fetched {} lead(s) from store", leads.len());
        Ok(leads)
    }

    /// Persists new leads and returns them with server-assigned ids.
    pub async fn create_leads(&self, leads: &[NewLead]) -> Result<Vec<Lead>, AppError> {
        if leads.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!("Creating {} lead(s) in store", leads.len());
        let created = self.insert_leads(leads).await?;
        tracing::info!("✓ Store created {} lead(s)", created.len());

        Ok(created)
    }

    /// Persists a single lead.
    pub async fn create_lead(&self, lead: &NewLead) -> Result<Option<Lead>, AppError> {
        tracing::info!("Creating lead in store: {}", lead.company_name);
        let created = self.insert_leads(lead).await?;
        Ok(created.into_iter().next())
    }

    /// Creates or replaces the enrichment row of `record.lead_id`.
    pub async fn upsert_enrichment(&self, record: &EnrichmentRecord) -> Result<(), AppError> {
        let builder = self
            .client
            .post(self.endpoint("lead_enrichment?on_conflict=lead_id"))
            .header("Prefer", "resolution=merge-duplicates")
            .json(record);

        self.send(builder, "upsert enrichment").await?;
        tracing::info!("✓ Enrichment stored for lead {}", record.lead_id);

        Ok(())
    }
}

/// Pulls the backend's `message` field out of an error body, if any.
async fn error_message(response: Response) -> String {
    let headers: HeaderMap = response.headers().clone();
    let text = response.text().await.unwrap_or_default();

    let is_json = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("json"))
        .unwrap_or(true);

    if is_json {
        if let Some(message) = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        {
            return message;
        }
    }

    if text.trim().is_empty() {
        "Network error".to_string()
    } else {
        text
    }
}

impl LeadStore for StoreClient {
    async fn list_leads(&self) -> Result<Vec<LeadWithEnrichment>, AppError> {
        StoreClient::list_leads(self).await
    }

    async fn create_leads(&self, leads: &[NewLead]) -> Result<Vec<Lead>, AppError> {
        StoreClient::create_leads(self, leads).await
    }

    async fn upsert_enrichment(&self, record: &EnrichmentRecord) -> Result<(), AppError> {
        StoreClient::upsert_enrichment(self, record).await
    }
}
