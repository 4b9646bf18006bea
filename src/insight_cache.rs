use crate::ai_gateway::{is_fallback_insight, INSIGHT_SAMPLE_SIZE};
use crate::models::LeadWithEnrichment;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Caches market insights by the content of the lead sample they were
/// written for, so refreshing an unchanged lead list does not hit the model.
#[derive(Clone)]
pub struct InsightCache {
    entries: Cache<String, String>,
}

impl Default for InsightCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600), 1_000)
    }
}

impl InsightCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity)
                .build(),
        }
    }

    /// SHA-256 (hex) of the serialized sample sent to the model.
    pub fn sample_key(leads: &[LeadWithEnrichment]) -> String {
        let sample = &leads[..leads.len().min(INSIGHT_SAMPLE_SIZE)];
        let serialized = serde_json::to_vec(sample).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(&serialized);
        hex::encode(hasher.finalize())
    }

    pub async fn get(&self, leads: &[LeadWithEnrichment]) -> Option<String> {
        self.entries.get(&Self::sample_key(leads)).await
    }

    /// Stores a model-written insight. Fallback sentences are not cached.
    pub async fn insert(&self, leads: &[LeadWithEnrichment], insight: &str) {
        if is_fallback_insight(insight) {
            return;
        }
        self.entries
            .insert(Self::sample_key(leads), insight.to_string())
            .await;
    }
}
