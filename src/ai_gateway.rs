use crate::ai_models::{
    parse_enrichment_insight, parse_prospected_leads, GenerateContentRequest,
    GenerateContentResponse, GenerationOptions,
};
use crate::errors::AppError;
use crate::models::{EnrichmentInsight, Lead, LeadWithEnrichment, ProspectedLead};
use crate::prospector::LeadIntelligence;
use std::time::Duration;

/// Number of businesses requested per prospecting call.
pub const PROSPECT_BATCH_SIZE: usize = 5;

/// Number of leads sent along with a market-insight request.
pub const INSIGHT_SAMPLE_SIZE: usize = 8;

pub const NO_LEADS_INSIGHT: &str =
    "No lead data available for analysis. Initiate a probe to begin.";
pub const EMPTY_REPLY_INSIGHT: &str = "Market intelligence is currently being synthesized.";
pub const OFFLINE_INSIGHT: &str = "Strategic analysis temporarily offline.";

/// True for the fixed sentences returned instead of a model-written insight.
pub fn is_fallback_insight(text: &str) -> bool {
    [NO_LEADS_INSIGHT, EMPTY_REPLY_INSIGHT, OFFLINE_INSIGHT].contains(&text)
}

/// Client for the generative model API.
///
/// Each operation makes exactly one attempt. Failures are logged and turned
/// into an empty, absent, or fallback value instead of an error.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Creates a new `GeminiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://generativelanguage.googleapis.com`.
    /// * `api_key` - API key sent in the `x-goog-api-key` header.
    /// * `model` - Model identifier used for every call.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to create model client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one generate-content call and returns the reply text.
    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        tracing::debug!(
            "Calling model {} (json_only: {}, web_search: {})",
            self.model,
            options.json_only,
            options.web_search
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateContentRequest::new(prompt, options))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Model request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Transport(format!(
                "Model API returned {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::Transport(format!("Failed to parse model API response: {}", e))
        })?;

        Ok(body.text().unwrap_or_default())
    }

    /// Discovers up to [`PROSPECT_BATCH_SIZE`] businesses matching `query`.
    pub async fn prospect(&self, query: &str) -> Vec<ProspectedLead> {
        let options = GenerationOptions {
            json_only: true,
            web_search: true,
        };

        let result = match self.generate(&prospect_prompt(query), options).await {
            Ok(text) => parse_prospected_leads(&text),
            Err(e) => Err(e),
        };

        match result {
            Ok(leads) => {
                tracing::info!("Model returned {} prospect(s) for \"{}\"", leads.len(), query);
                leads
            }
            Err(e) => {
                tracing::error!("Prospecting AI error: {}", e);
                Vec::new()
            }
        }
    }

    /// Validates, classifies, and scores one lead. `None` means "do not
    /// overwrite whatever is stored".
    pub async fn enrich(&self, lead: &Lead) -> Option<EnrichmentInsight> {
        let options = GenerationOptions {
            json_only: true,
            web_search: true,
        };

        let result = match self.generate(&enrichment_prompt(lead), options).await {
            Ok(text) => parse_enrichment_insight(&text),
            Err(e) => Err(e),
        };

        match result {
            Ok(insight) => Some(insight),
            Err(e) => {
                tracing::error!("Enrichment AI error for {}: {}", lead.company_name, e);
                None
            }
        }
    }

    /// One strategic sentence about the current lead set.
    pub async fn summarize(&self, leads: &[LeadWithEnrichment]) -> String {
        if leads.is_empty() {
            return NO_LEADS_INSIGHT.to_string();
        }

        let prompt = match insight_prompt(leads) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!("Failed to build insight prompt: {}", e);
                return OFFLINE_INSIGHT.to_string();
            }
        };

        match self.generate(&prompt, GenerationOptions::default()).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => EMPTY_REPLY_INSIGHT.to_string(),
            Err(e) => {
                tracing::warn!("Market insight unavailable: {}", e);
                OFFLINE_INSIGHT.to_string()
            }
        }
    }
}

impl LeadIntelligence for GeminiClient {
    async fn prospect(&self, query: &str) -> Result<Vec<ProspectedLead>, AppError> {
        Ok(GeminiClient::prospect(self, query).await)
    }

    async fn enrich(&self, lead: &Lead) -> Result<Option<EnrichmentInsight>, AppError> {
        Ok(GeminiClient::enrich(self, lead).await)
    }

    async fn summarize(&self, leads: &[LeadWithEnrichment]) -> String {
        GeminiClient::summarize(self, leads).await
    }
}

// ============ Prompts ============

pub fn prospect_prompt(query: &str) -> String {
    format!(
        r#"Act as a world-class B2B Lead Generation Agent.
Your mission: Find {count} high-quality, 100% authentic businesses matching this search query: "{query}".

Search targets: Google Maps, Instagram, LinkedIn, and major B2B directories (Alibaba, Kompass, etc.).
Priority: Find businesses with a website, a verifiable email address, and active social media presence.

Return ONLY a JSON array of objects with the following fields:
[
  {{
    "company_name": "string",
    "website": "string",
    "email": "string",
    "phone": "string",
    "location": "string",
    "industry": "string",
    "source": "string (e.g., 'Google Maps', 'Instagram', 'Alibaba')"
  }}
]

Ensure every lead has a 'source' specified. Do not include placeholders or fake data."#,
        count = PROSPECT_BATCH_SIZE,
        query = query,
    )
}

pub fn enrichment_prompt(lead: &Lead) -> String {
    let website = lead.website.as_deref().unwrap_or("N/A");
    let email = lead.email.as_deref().unwrap_or("N/A");

    format!(
        r#"You are a professional B2B lead enrichment AI specialized in finding authentic business data.

Current Lead Information:
- Company: "{company}"
- Website: "{website}"
- Email: "{email}"
- Source: "{source}"

Instructions:
1. Search the internet (Google, LinkedIn, Instagram, Facebook, TikTok) to find the most accurate digital footprint for this business.
2. Verify if the provided email "{email}" is a valid business email.
3. Find direct URLs for their Instagram, Facebook, LinkedIn, and TikTok profiles.
4. Categorize the industry precisely.
5. Calculate a "Lead Readiness Score" (0-100) based on their digital presence, contactability, and B2B relevance.

You MUST return ONLY a JSON object with this exact structure:
{{
  "validated_email": boolean,
  "social_profiles": {{
    "instagram": "string or null",
    "facebook": "string or null",
    "linkedin": "string or null",
    "tiktok": "string or null"
  }},
  "industry_category": "string",
  "lead_score": number,
  "explanation": "string (brief reasoning for the score)"
}}"#,
        company = lead.company_name,
        website = website,
        email = email,
        source = lead.source,
    )
}

pub fn insight_prompt(leads: &[LeadWithEnrichment]) -> Result<String, AppError> {
    let sample = &leads[..leads.len().min(INSIGHT_SAMPLE_SIZE)];
    let sample_json = serde_json::to_string(sample)?;

    Ok(format!(
        "Analyze this list of B2B leads and provide a sharp, one-sentence strategic insight for a sales director. \
Focus on quality, industry concentration, or contactability trends.\nLeads: {}",
        sample_json
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn lead(name: &str) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            source: "Kompass".to_string(),
            company_name: name.to_string(),
            website: None,
            email: Some("sales@example.ae".to_string()),
            phone: None,
            location: Some("Dubai".to_string()),
            industry: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_prompts_carry_lead_details() {
        let prompt = prospect_prompt("Solar panel distributors in Dubai");
        assert!(prompt.contains("Find 5 high-quality"));
        assert!(prompt.contains("\"Solar panel distributors in Dubai\""));

        let prompt = enrichment_prompt(&lead("Emirates Sun"));
        assert!(prompt.contains("- Company: \"Emirates Sun\""));
        assert!(prompt.contains("- Website: \"N/A\""));
        assert!(prompt.contains("\"sales@example.ae\" is a valid business email"));
    }

    #[test]
    fn test_insight_prompt_samples_first_eight() {
        let leads: Vec<LeadWithEnrichment> = (0..12)
            .map(|i| LeadWithEnrichment {
                lead: lead(&format!("Company {:02}", i)),
                enrichment: None,
            })
            .collect();

        let prompt = insight_prompt(&leads).unwrap();

        assert!(prompt.contains("Company 07"));
        assert!(!prompt.contains("Company 08"));
    }

    #[test]
    fn test_fallback_detection() {
        assert!(is_fallback_insight(NO_LEADS_INSIGHT));
        assert!(is_fallback_insight(OFFLINE_INSIGHT));
        assert!(!is_fallback_insight("Solar distributors cluster in Dubai."));
    }
}
