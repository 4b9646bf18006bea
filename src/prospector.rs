//! Probe cycle orchestration
//!
//! One cycle runs these steps in order:
//! 1. Ask the model for businesses matching the query
//! 2. Default missing sources and persist the new leads
//! 3. Enrich each created lead, one at a time, persisting every result
//! 4. Reload the lead list and the market insight
//!
//! Every step reports to the rolling activity log. Failures of a single lead
//! never abort the batch; anything else that escapes is turned into a
//! `Critical:` log line and the busy flag is always released.

use crate::dashboard_state::{DashboardSnapshot, DashboardState, ProbePhase};
use crate::errors::AppError;
use crate::insight_cache::InsightCache;
use crate::models::{
    EnrichmentInsight, EnrichmentRecord, Lead, LeadWithEnrichment, NewLead, ProspectedLead,
};
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Persistence seam used by the workflow.
pub trait LeadStore: Send + Sync {
    /// All leads with their enrichment, newest first.
    fn list_leads(&self) -> impl Future<Output = Result<Vec<LeadWithEnrichment>, AppError>> + Send;

    /// Persists new leads, returning them with their assigned ids.
    fn create_leads(
        &self,
        leads: &[NewLead],
    ) -> impl Future<Output = Result<Vec<Lead>, AppError>> + Send;

    /// Creates or replaces the enrichment of `record.lead_id`.
    fn upsert_enrichment(
        &self,
        record: &EnrichmentRecord,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Model seam used by the workflow.
///
/// Implementations are expected to absorb their own failures (empty list,
/// `None`, fallback sentence); an `Err` is still handled by the workflow.
pub trait LeadIntelligence: Send + Sync {
    fn prospect(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<ProspectedLead>, AppError>> + Send;

    fn enrich(
        &self,
        lead: &Lead,
    ) -> impl Future<Output = Result<Option<EnrichmentInsight>, AppError>> + Send;

    fn summarize(&self, leads: &[LeadWithEnrichment]) -> impl Future<Output = String> + Send;
}

/// Per-cycle enrichment tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    /// Leads the store created.
    pub created: usize,
    /// Leads whose enrichment was stored.
    pub enriched: usize,
    /// Leads the model returned nothing for.
    pub skipped: usize,
    /// Leads whose enrichment or its storage failed.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Blank query, or another cycle was already running.
    Ignored,
    NoLeadsFound,
    NoLeadsCreated,
    Completed(ProbeReport),
    Failed { message: String },
}

/// Proof that the busy flag was claimed for one query.
#[must_use = "a claimed probe must be run or the busy flag stays set"]
#[derive(Debug)]
pub struct ProbeTicket {
    query: String,
}

impl ProbeTicket {
    pub fn query(&self) -> &str {
        &self.query
    }
}

#[derive(Debug, Clone, Copy)]
enum Severity {
    Info,
    Warn,
    Error,
}

/// Releases the busy flag when the cycle ends, however it ends.
struct ProbeGuard<'a> {
    state: &'a Mutex<DashboardState>,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).finish_probe();
    }
}

fn lock(state: &Mutex<DashboardState>) -> MutexGuard<'_, DashboardState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Prospector<S, G> {
    store: S,
    intelligence: G,
    state: Mutex<DashboardState>,
    insights: InsightCache,
}

impl<S: LeadStore, G: LeadIntelligence> Prospector<S, G> {
    pub fn new(store: S, intelligence: G) -> Self {
        Self::with_insight_cache(store, intelligence, InsightCache::default())
    }

    pub fn with_insight_cache(store: S, intelligence: G, insights: InsightCache) -> Self {
        Self {
            store,
            intelligence,
            state: Mutex::new(DashboardState::default()),
            insights,
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        lock(&self.state).snapshot()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.state).is_busy()
    }

    pub fn leads(&self) -> Vec<LeadWithEnrichment> {
        lock(&self.state).leads().to_vec()
    }

    fn enter(&self, phase: ProbePhase) {
        lock(&self.state).enter_phase(phase);
    }

    fn record(&self, severity: Severity, line: impl Into<String>) {
        let line = line.into();
        match severity {
            Severity::Info => tracing::info!("{}", line),
            Severity::Warn => tracing::warn!("{}", line),
            Severity::Error => tracing::error!("{}", line),
        }
        lock(&self.state).record(line);
    }

    /// Claims the busy flag. `None` for a blank query or while a cycle runs;
    /// such requests are dropped without queuing.
    pub fn begin(&self, query: &str) -> Option<ProbeTicket> {
        let mut state = lock(&self.state);
        if !state.begin_probe(query) {
            tracing::debug!("Probe request ignored (blank query or cycle in progress)");
            return None;
        }
        Some(ProbeTicket {
            query: query.trim().to_string(),
        })
    }

    /// Claims the busy flag and runs a full cycle.
    pub async fn run_probe(&self, query: &str) -> ProbeOutcome {
        match self.begin(query) {
            Some(ticket) => self.run(ticket).await,
            None => ProbeOutcome::Ignored,
        }
    }

    /// Runs a cycle for an already claimed ticket.
    pub async fn run(&self, ticket: ProbeTicket) -> ProbeOutcome {
        let _guard = ProbeGuard { state: &self.state };
        let query = ticket.query;

        self.record(
            Severity::Info,
            format!("Probe: Initiated deep search for \"{}\"", query),
        );

        match self.cycle(&query).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Deep probe error: {}", e);

                let message = match e.to_string() {
                    m if m.trim().is_empty() => "Check connection.".to_string(),
                    m => m,
                };
                self.record(
                    Severity::Error,
                    format!("Critical: Search failed. {}", message),
                );
                ProbeOutcome::Failed { message }
            }
        }
    }

    async fn cycle(&self, query: &str) -> Result<ProbeOutcome, AppError> {
        self.record(
            Severity::Info,
            "AI: Crawling B2B indices and social networks...",
        );
        let prospects = self.intelligence.prospect(query).await?;

        if prospects.is_empty() {
            self.record(
                Severity::Warn,
                "AI: No leads found for this query. Refine keywords.",
            );
            return Ok(ProbeOutcome::NoLeadsFound);
        }

        let new_leads: Vec<NewLead> = prospects
            .into_iter()
            .map(ProspectedLead::into_new_lead)
            .collect();

        self.enter(ProbePhase::PersistingLeads);
        self.record(
            Severity::Info,
            format!(
                "Data: Saving {} authentic entities to local node...",
                new_leads.len()
            ),
        );
        let created = self.store.create_leads(&new_leads).await?;

        if created.is_empty() {
            self.record(
                Severity::Warn,
                "Notice: No new leads were created in the database.",
            );
            return Ok(ProbeOutcome::NoLeadsCreated);
        }

        self.enter(ProbePhase::Enriching);
        self.record(
            Severity::Info,
            "Cycle: Starting real-time enrichment and social lookup...",
        );
        let report = self.enrich_sequentially(&created).await;

        self.record(Severity::Info, "Status: Global probe cycle complete.");
        tracing::info!(
            "Probe cycle for \"{}\": {} created, {} enriched, {} skipped, {} failed",
            query,
            report.created,
            report.enriched,
            report.skipped,
            report.failed
        );

        self.refresh().await;

        Ok(ProbeOutcome::Completed(report))
    }

    /// Enriches leads strictly one after another. The model API is
    /// rate-limited per key, so a cycle never has two enrich calls in flight.
    async fn enrich_sequentially(&self, leads: &[Lead]) -> ProbeReport {
        let mut report = ProbeReport {
            created: leads.len(),
            ..Default::default()
        };

        for lead in leads {
            self.record(
                Severity::Info,
                format!("Enriching: {}...", lead.company_name),
            );

            match self.intelligence.enrich(lead).await {
                Ok(Some(insight)) => {
                    let record = EnrichmentRecord::from_insight(lead, &insight, Utc::now());

                    self.enter(ProbePhase::PersistingEnrichment);
                    let stored = self.store.upsert_enrichment(&record).await;
                    self.enter(ProbePhase::Enriching);

                    match stored {
                        Ok(()) => {
                            report.enriched += 1;
                            self.record(
                                Severity::Info,
                                format!(
                                    "Success: {} enriched (Score: {:.0})",
                                    lead.company_name, insight.lead_score
                                ),
                            );
                        }
                        Err(e) => {
                            report.failed += 1;
                            tracing::error!("Failed to store enrichment for lead {}: {}", lead.id, e);
                            self.record(
                                Severity::Error,
                                format!("Error: Could not enrich {}.", lead.company_name),
                            );
                        }
                    }
                }
                Ok(None) => {
                    report.skipped += 1;
                    self.record(
                        Severity::Warn,
                        format!("Warning: No enrichment data found for {}.", lead.company_name),
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("Failed to enrich lead {}: {}", lead.id, e);
                    self.record(
                        Severity::Error,
                        format!("Error: Could not enrich {}.", lead.company_name),
                    );
                }
            }
        }

        report
    }

    /// Reloads the lead list and the market insight.
    ///
    /// A store failure is logged and leaves the previous list in place. When
    /// refreshes overlap, a list fetched by an older one never replaces a
    /// newer one.
    pub async fn refresh(&self) {
        let seq = lock(&self.state).begin_refresh();

        match self.store.list_leads().await {
            Ok(leads) => {
                let applied = lock(&self.state).replace_leads(seq, leads.clone());
                if applied {
                    let insight = self.market_insight(&leads).await;
                    lock(&self.state).set_insight(seq, insight);
                } else {
                    tracing::debug!("Discarding stale lead list from refresh #{}", seq);
                }
            }
            Err(e) => {
                tracing::error!("Fetch leads failed: {}", e);
                self.record(Severity::Error, "System: Database fetch error.");
            }
        }

        lock(&self.state).finish_refresh();
    }

    async fn market_insight(&self, leads: &[LeadWithEnrichment]) -> String {
        if let Some(cached) = self.insights.get(leads).await {
            tracing::debug!("Market insight served from cache");
            return cached;
        }

        let insight = self.intelligence.summarize(leads).await;
        self.insights.insert(leads, &insight).await;
        insight
    }

    /// Looks a lead up in the current list and notes the inspection.
    pub fn inspect(&self, lead_id: Uuid) -> Result<LeadWithEnrichment, AppError> {
        let lead = lock(&self.state)
            .leads()
            .iter()
            .find(|l| l.lead.id == lead_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", lead_id)))?;

        self.record(
            Severity::Info,
            format!("Inspection: {} details view.", lead.lead.company_name),
        );
        Ok(lead)
    }
}
