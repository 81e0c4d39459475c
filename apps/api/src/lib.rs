//! Shelfmark — captures web pages and social posts, enriches them with
//! LLM-produced metadata, and materializes stable knowledge-base notes
//! into a content-addressed vault.

pub mod capture;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod fingerprint;
pub mod materialize;
pub mod models;
pub mod routes;
pub mod state;
pub mod template;
pub mod vault;
