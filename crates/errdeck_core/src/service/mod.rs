//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep ingestion and management callers decoupled from storage details.

pub mod app_service;
pub mod dedup_service;
pub mod ingest_service;
pub mod notification_service;
