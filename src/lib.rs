//! LeadGrid Aggregation API Library
//!
//! This library provides the core functionality for the LeadGrid multi-source
//! lead aggregation API: provider adapters, result normalization, the service
//! registry with concurrent fan-out, confidence-based merging, and the email
//! discovery fallback chain.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `fallback`: Email discovery fallback chain.
//! - `handlers`: HTTP request handlers.
//! - `merger`: Confidence-weighted enrichment merge.
//! - `models`: Core data models.
//! - `normalizer`: Shared provider-response normalization rules.
//! - `quota`: Usage-ceiling detection.
//! - `registry`: Provider registry and fan-out operations.
//! - `services`: External provider adapters.

pub mod config;
pub mod errors;
pub mod fallback;
pub mod handlers;
pub mod merger;
pub mod models;
pub mod normalizer;
pub mod quota;
pub mod registry;
pub mod services;
