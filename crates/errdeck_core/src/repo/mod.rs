//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories only accept fully migrated connections.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`,
//!   `Conflict`) in addition to storage errors.

pub mod app_repo;
pub mod error;
pub mod problem_repo;
pub(crate) mod schema;
pub mod user_repo;
