//! Nexus Leads library
//!
//! Prospects B2B leads through a generative model with web-search grounding,
//! persists them in a REST-fronted store, enriches each lead with a readiness
//! score and social footprint, and keeps a dashboard view of the results.
//!
//! # Modules
//!
//! - `api`: API-layer namespace.
//! - `core`: Domain-layer namespace.
//! - `integrations`: External service namespace.
//! - `ai_gateway`: Generative model client (prospect, enrich, summarize).
//! - `ai_models`: Model wire types and reply decoding.
//! - `config`: Configuration management.
//! - `dashboard_state`: Application state and rolling activity log.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `insight_cache`: Market-insight cache.
//! - `models`: Core data models.
//! - `prospector`: Probe cycle orchestration.
//! - `settings`: Persisted store connection settings.
//! - `store_client`: Remote lead store client.

pub mod api;
pub mod core;
pub mod integrations;

pub mod ai_gateway;
pub mod ai_models;
pub mod config;
pub mod dashboard_state;
pub mod errors;
pub mod handlers;
pub mod insight_cache;
pub mod models;
pub mod prospector;
pub mod settings;
pub mod store_client;
