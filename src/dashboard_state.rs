//! Application state shared by the probe workflow and the presentation layer.
//!
//! All mutation goes through the named transitions below; readers only ever
//! see an owned [`DashboardSnapshot`].

use crate::models::{DashboardStats, LeadWithEnrichment};
use serde::Serialize;
use std::collections::VecDeque;

/// Number of activity lines kept for display.
pub const ACTIVITY_LOG_CAPACITY: usize = 10;

/// Where the current probe cycle is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbePhase {
    #[default]
    Idle,
    Prospecting,
    PersistingLeads,
    Enriching,
    PersistingEnrichment,
}

/// Rolling log of workflow events, most recent first.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    lines: VecDeque<String>,
}

impl ActivityLog {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_front(line.into());
        self.lines.truncate(ACTIVITY_LOG_CAPACITY);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&str> {
        self.lines.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct DashboardState {
    leads: Vec<LeadWithEnrichment>,
    log: ActivityLog,
    busy: bool,
    /// Refreshes currently in flight.
    refreshing: usize,
    /// Sequence number handed to the latest refresh, and the newest one whose
    /// result has been applied.
    refresh_seq: u64,
    applied_seq: u64,
    query: String,
    phase: ProbePhase,
    insight: String,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub busy: bool,
    pub loading: bool,
    pub phase: ProbePhase,
    pub query: String,
    pub insight: String,
    pub logs: Vec<String>,
    pub stats: DashboardStats,
    pub leads: Vec<LeadWithEnrichment>,
}

impl DashboardState {
    /// Single-flight guard: claims the busy flag for `query`.
    ///
    /// Returns false (and changes nothing) for a blank query or while
    /// another cycle is running.
    pub fn begin_probe(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() || self.busy {
            return false;
        }

        self.busy = true;
        self.query = query.to_string();
        self.phase = ProbePhase::Prospecting;
        true
    }

    pub fn enter_phase(&mut self, phase: ProbePhase) {
        self.phase = phase;
    }

    /// Releases the busy flag and clears the query.
    pub fn finish_probe(&mut self) {
        self.busy = false;
        self.query.clear();
        self.phase = ProbePhase::Idle;
    }

    pub fn record(&mut self, line: impl Into<String>) {
        self.log.push(line);
    }

    /// Marks a refresh as started and returns its sequence number.
    pub fn begin_refresh(&mut self) -> u64 {
        self.refreshing += 1;
        self.refresh_seq += 1;
        self.refresh_seq
    }

    pub fn finish_refresh(&mut self) {
        self.refreshing = self.refreshing.saturating_sub(1);
    }

    /// Installs the lead list fetched by refresh `seq`.
    ///
    /// Returns false (and keeps the current list) when a refresh that started
    /// later has already been applied.
    pub fn replace_leads(&mut self, seq: u64, leads: Vec<LeadWithEnrichment>) -> bool {
        if seq < self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        self.leads = leads;
        true
    }

    /// Installs the insight written for refresh `seq`, unless a newer list
    /// has replaced the one it describes.
    pub fn set_insight(&mut self, seq: u64, insight: String) {
        if seq == self.applied_seq {
            self.insight = insight;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn phase(&self) -> ProbePhase {
        self.phase
    }

    pub fn leads(&self) -> &[LeadWithEnrichment] {
        &self.leads
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            busy: self.busy,
            loading: self.refreshing > 0,
            phase: self.phase,
            query: self.query.clone(),
            insight: self.insight.clone(),
            logs: self.log.lines(),
            stats: DashboardStats::from_leads(&self.leads),
            leads: self.leads.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_ten_newest_first() {
        let mut log = ActivityLog::default();
        for i in 0..15 {
            log.push(format!("line {}", i));
        }

        assert_eq!(log.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(log.latest(), Some("line 14"));
        assert_eq!(log.lines().last().map(String::as_str), Some("line 5"));
    }

    #[test]
    fn test_single_flight_guard() {
        let mut state = DashboardState::default();

        assert!(!state.begin_probe("   "));
        assert!(!state.is_busy());

        assert!(state.begin_probe("  Solar panel distributors in Dubai "));
        assert!(state.is_busy());
        assert_eq!(state.snapshot().query, "Solar panel distributors in Dubai");
        assert_eq!(state.phase(), ProbePhase::Prospecting);

        assert!(!state.begin_probe("Coffee roasters in Lisbon"));
        assert_eq!(state.snapshot().query, "Solar panel distributors in Dubai");

        state.finish_probe();
        let snapshot = state.snapshot();
        assert!(!snapshot.busy);
        assert!(snapshot.query.is_empty());
        assert_eq!(snapshot.phase, ProbePhase::Idle);
    }

    fn named(name: &str) -> LeadWithEnrichment {
        serde_json::from_value(serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "source": "Google Maps",
            "company_name": name,
            "created_at": "2026-10-18T09:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_overlapping_refreshes() {
        let mut state = DashboardState::default();

        let first = state.begin_refresh();
        let second = state.begin_refresh();
        assert!(state.snapshot().loading);

        // The later refresh lands first
        assert!(state.replace_leads(second, vec![named("Gulf Solar"), named("Desert PV")]));
        state.set_insight(second, "Two distributors tracked.".into());
        state.finish_refresh();
        assert!(state.snapshot().loading);

        // The earlier one must not roll the list back
        assert!(!state.replace_leads(first, vec![named("Gulf Solar")]));
        state.set_insight(first, "One distributor tracked.".into());
        state.finish_refresh();

        let snapshot = state.snapshot();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.leads.len(), 2);
        assert_eq!(snapshot.insight, "Two distributors tracked.");
    }

    #[test]
    fn test_phase_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(ProbePhase::PersistingLeads).unwrap(),
            "persisting-leads"
        );
    }
}
