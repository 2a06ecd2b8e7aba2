//! Domain model for apps, deduplicated problems and notification targets.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep identity rules (api key shape, fingerprint equality) next to the
//!   types they govern.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - An app's api key is assigned once at creation and never changes.
//! - Two errs under one app never share a fingerprint.

pub mod app;
pub mod problem;
pub mod user;
