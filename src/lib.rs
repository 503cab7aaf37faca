//! adtrack - campaign event tracking and revenue attribution
//!
//! Records impressions, clicks, conversions and engagement for ads,
//! affiliate links and sponsored content, keeps per-entity counters and
//! daily revenue rows, and serves reports and a revenue dashboard.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: Maintenance commands
//!
//! # Architecture
//! - `tracking`: validation, deduplication and event ingestion
//! - `selection`: eligible-entity selection
//! - `analytics`: reports, revenue aggregation and the report cache
//! - `storage`: repository traits and the SeaORM backend
//! - `api`: HTTP services and middleware
//! - `config`: configuration management
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod selection;
pub mod storage;
pub mod system;
pub mod tracking;
pub mod utils;
