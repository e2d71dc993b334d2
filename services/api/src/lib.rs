//! services/api/src/lib.rs
//!
//! The `api` service library: configuration, error types, the adapters that
//! implement the core ports, and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
