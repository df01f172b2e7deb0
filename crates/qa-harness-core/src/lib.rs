//! # QA Harness Core
//!
//! Shared, WASM-safe logic for QA Harness: knowledge models, the error
//! taxonomy, store and embedding abstractions, the best-match algorithm,
//! the rewrite fallback chain, and the [`service::KnowledgeService`] that
//! ties them together.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! Concrete backends live in the `qa-harness` app crate.

pub mod embedding;
pub mod error;
pub mod matcher;
pub mod models;
pub mod rewrite;
pub mod service;
pub mod store;

pub use error::{QaError, Result};
