//! Wire types of the generate-content API and decoding of model replies into
//! domain types.
//!
//! Model output is never trusted: replies are de-fenced, decoded into loose
//! JSON, and every field is checked before a domain value is built.

use crate::errors::AppError;
use crate::models::{EnrichmentInsight, ProspectedLead, SocialProfiles};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

// ============ Request ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleSearch {}

/// Toggles for a single generate-content call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Ask for a JSON-only reply.
    pub json_only: bool,
    /// Ground the reply in web search results.
    pub web_search: bool,
}

impl GenerateContentRequest {
    pub fn new(prompt: &str, options: GenerationOptions) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: options.json_only.then(|| GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
            tools: if options.web_search {
                vec![Tool {
                    google_search: GoogleSearch::default(),
                }]
            } else {
                Vec::new()
            },
        }
    }
}

// ============ Response ============

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        Some(text)
    }
}

// ============ Reply decoding ============

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```(?:json|JSON)?").expect("fence pattern is valid"))
}

/// Removes Markdown code fences wrapping a model reply.
pub fn strip_fences(text: &str) -> String {
    fence_regex().replace_all(text, "").trim().to_string()
}

fn decode_reply(text: &str) -> Result<Value, AppError> {
    let clean = strip_fences(text);
    if clean.is_empty() {
        return Err(AppError::Parse("model reply is empty".to_string()));
    }
    serde_json::from_str(&clean).map_err(|e| {
        tracing::error!("Failed to parse JSON from model response: {}", text);
        AppError::Parse(format!("model reply is not JSON: {}", e))
    })
}

/// Reads a text field, accepting numbers (phone numbers often come back bare).
/// Blank values and literal placeholders count as absent.
fn text_field(value: &Value, key: &str) -> Option<String> {
    let raw = match value.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    match raw.to_ascii_lowercase().as_str() {
        "" | "null" | "none" | "n/a" => None,
        _ => Some(raw),
    }
}

/// The prospecting reply is either a bare array or `{ "leads": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProspectPayload {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(default)]
        leads: Vec<Value>,
    },
}

impl ProspectPayload {
    fn into_entries(self) -> Vec<Value> {
        match self {
            ProspectPayload::Bare(entries) => entries,
            ProspectPayload::Wrapped { leads } => leads,
        }
    }
}

fn prospected_lead(entry: &Value) -> Option<ProspectedLead> {
    let company_name = text_field(entry, "company_name")?;

    Some(ProspectedLead {
        company_name,
        source: text_field(entry, "source"),
        website: text_field(entry, "website"),
        email: text_field(entry, "email"),
        phone: text_field(entry, "phone"),
        location: text_field(entry, "location"),
        industry: text_field(entry, "industry"),
    })
}

/// Decodes a prospecting reply into candidate leads.
///
/// Entries without a company name are dropped.
pub fn parse_prospected_leads(text: &str) -> Result<Vec<ProspectedLead>, AppError> {
    let payload: ProspectPayload = serde_json::from_value(decode_reply(text)?)
        .map_err(|_| AppError::Parse("expected a lead array or a `leads` object".to_string()))?;

    let entries = payload.into_entries();
    let total = entries.len();
    let leads: Vec<ProspectedLead> = entries.iter().filter_map(prospected_lead).collect();

    if leads.len() < total {
        tracing::warn!(
            "Dropped {} prospect(s) without a company name",
            total - leads.len()
        );
    }

    Ok(leads)
}

/// Clamps a score into 0–100; non-finite values are rejected.
pub fn clamp_score(score: f64) -> Option<f64> {
    score.is_finite().then(|| score.clamp(0.0, 100.0))
}

fn social_profiles(value: Option<&Value>) -> SocialProfiles {
    let Some(profiles) = value.filter(|v| v.is_object()) else {
        return SocialProfiles::default();
    };

    SocialProfiles {
        instagram: text_field(profiles, "instagram"),
        facebook: text_field(profiles, "facebook"),
        linkedin: text_field(profiles, "linkedin"),
        tiktok: text_field(profiles, "tiktok"),
    }
}

/// Decodes an enrichment reply. A numeric `lead_score` is mandatory.
pub fn parse_enrichment_insight(text: &str) -> Result<EnrichmentInsight, AppError> {
    let value = decode_reply(text)?;
    if !value.is_object() {
        return Err(AppError::Parse("expected an enrichment object".to_string()));
    }

    let lead_score = value
        .get("lead_score")
        .and_then(Value::as_f64)
        .and_then(clamp_score)
        .ok_or_else(|| AppError::Parse("enrichment reply lacks a numeric lead_score".to_string()))?;

    Ok(EnrichmentInsight {
        validated_email: value
            .get("validated_email")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        social_profiles: social_profiles(value.get("social_profiles")),
        industry_category: text_field(&value, "industry_category"),
        lead_score,
        explanation: text_field(&value, "explanation"),
    })
}
