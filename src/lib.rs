//! Registry access token resource for the CRaaS v2 API.
//!
//! Lifecycle reconciliation and idempotent delete for CRaaS v2 tokens,
//! plus the API client, tracked state and CLI plumbing around them.

pub mod cli;
pub mod client;
pub mod config;
pub mod delete_guard;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod reconcile;
pub mod resource;
pub mod state;
