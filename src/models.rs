use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Source label applied to discovered leads that arrive without one.
pub const DEFAULT_SOURCE: &str = "Global Prospector";

/// Score at or above which a lead counts as sales-ready.
pub const HIGH_READY_THRESHOLD: f64 = 90.0;

/// Number of leads surfaced as top performers.
pub const TOP_PERFORMERS: usize = 5;

// ============ Store Models ============

/// A business persisted in the `leads` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Server-assigned identifier.
    pub id: Uuid,
    /// Where the lead was discovered (e.g. "Google Maps"). Never empty.
    pub source: String,
    /// Company or trade name.
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for the `leads` table.
///
/// `source` is not optional here: a lead can only be built for persistence
/// once its source has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub company_name: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

/// A candidate business as reported by the model, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProspectedLead {
    pub company_name: String,
    pub source: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
}

impl ProspectedLead {
    /// Resolves the source label, falling back to [`DEFAULT_SOURCE`] when the
    /// model left it out or blank.
    pub fn into_new_lead(self) -> NewLead {
        let source = self
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        NewLead {
            company_name: self.company_name,
            source,
            website: self.website,
            email: self.email,
            phone: self.phone,
            location: self.location,
            industry: self.industry,
        }
    }
}

/// Social network name → profile URL. Absent means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialProfiles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiktok: Option<String>,
}

impl SocialProfiles {
    pub fn known_count(&self) -> usize {
        [
            &self.instagram,
            &self.facebook,
            &self.linkedin,
            &self.tiktok,
        ]
        .iter()
        .filter(|p| p.is_some())
        .count()
    }
}

/// A row of the `lead_enrichment` table. At most one per lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Foreign key to the `leads` table.
    pub lead_id: Uuid,
    /// The lead's email, kept only when the model validated it.
    #[serde(default)]
    pub enriched_email: Option<String>,
    #[serde(default)]
    pub social_profiles: Option<SocialProfiles>,
    /// Readiness score, 0–100.
    pub ai_score: f64,
    pub validated: bool,
    #[serde(default)]
    pub industry_category: Option<String>,
    #[serde(default)]
    pub readiness_explanation: Option<String>,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

/// Upsert payload for the `lead_enrichment` table, keyed by `lead_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentRecord {
    pub lead_id: Uuid,
    pub enriched_email: Option<String>,
    pub ai_score: f64,
    pub validated: bool,
    pub industry_category: Option<String>,
    pub social_profiles: SocialProfiles,
    pub readiness_explanation: Option<String>,
    pub last_checked: DateTime<Utc>,
}

impl EnrichmentRecord {
    pub fn from_insight(lead: &Lead, insight: &EnrichmentInsight, checked_at: DateTime<Utc>) -> Self {
        Self {
            lead_id: lead.id,
            enriched_email: if insight.validated_email {
                lead.email.clone()
            } else {
                None
            },
            ai_score: insight.lead_score,
            validated: insight.validated_email,
            industry_category: insight.industry_category.clone(),
            social_profiles: insight.social_profiles.clone(),
            readiness_explanation: insight.explanation.clone(),
            last_checked: checked_at,
        }
    }
}

/// Validated intelligence the model produced for one lead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentInsight {
    pub validated_email: bool,
    pub social_profiles: SocialProfiles,
    pub industry_category: Option<String>,
    /// Always within 0–100.
    pub lead_score: f64,
    pub explanation: Option<String>,
}

/// A lead joined with its (optional) enrichment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadWithEnrichment {
    #[serde(flatten)]
    pub lead: Lead,
    #[serde(default, deserialize_with = "deserialize_embedded_enrichment")]
    pub enrichment: Option<Enrichment>,
}

impl LeadWithEnrichment {
    /// Readiness score, 0 when not yet enriched.
    pub fn score(&self) -> f64 {
        self.enrichment.as_ref().map(|e| e.ai_score).unwrap_or(0.0)
    }

    pub fn is_validated(&self) -> bool {
        self.enrichment.as_ref().map(|e| e.validated).unwrap_or(false)
    }
}

/// The embedded relation comes back as an object, an array, or null
/// depending on how the backend detects the relationship cardinality.
#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddedEnrichment {
    Many(Vec<Enrichment>),
    One(Box<Enrichment>),
}

fn deserialize_embedded_enrichment<'de, D>(deserializer: D) -> Result<Option<Enrichment>, D::Error>
where
    D: Deserializer<'de>,
{
    let embedded = Option::<EmbeddedEnrichment>::deserialize(deserializer)?;
    Ok(match embedded {
        Some(EmbeddedEnrichment::Many(rows)) => rows.into_iter().next(),
        Some(EmbeddedEnrichment::One(row)) => Some(*row),
        None => None,
    })
}

// ============ Dashboard Models ============

/// Aggregate figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_ingested: usize,
    pub verified_emails: usize,
    pub high_ready: usize,
    pub top_performers: Vec<LeadWithEnrichment>,
}

impl DashboardStats {
    pub fn from_leads(leads: &[LeadWithEnrichment]) -> Self {
        let mut ranked: Vec<&LeadWithEnrichment> = leads.iter().collect();
        // Stable sort keeps newest-first order among equal scores.
        ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));

        Self {
            total_ingested: leads.len(),
            verified_emails: leads.iter().filter(|l| l.is_validated()).count(),
            high_ready: leads
                .iter()
                .filter(|l| l.score() >= HIGH_READY_THRESHOLD)
                .count(),
            top_performers: ranked
                .into_iter()
                .take(TOP_PERFORMERS)
                .cloned()
                .collect(),
        }
    }
}
