//! # QA Harness
//!
//! An embedding-based FAQ answering engine.
//!
//! Admins curate question/answer pairs. Each pair is embedded once when it
//! is added. Incoming questions are embedded the same way and compared
//! against every stored vector by cosine similarity; the best entry above
//! the configured threshold answers, optionally rephrased by a generative
//! rewrite service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ CLI (qa) │──▶│ KnowledgeService │──▶│    SQLite    │
//! │   HTTP   │   │ embed + match    │   │ kb + log     │
//! └──────────┘   └────────┬─────────┘   └──────────────┘
//!                         │
//!              ┌──────────┴──────────┐
//!              ▼                     ▼
//!       ┌─────────────┐       ┌─────────────┐
//!       │  Embedding  │       │   Rewrite   │
//!       │ local/remote│       │ Gemini/OAI  │
//!       └─────────────┘       └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qa init
//! qa add "What are your opening hours? - 9am to 5pm on weekdays"
//! qa ask "when are you open"
//! qa serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite knowledge store and interaction log |
//! | [`background_log`] | Detached interaction log delivery |
//! | [`embedding`] | Embedding provider backends |
//! | [`rewrite`] | Rewrite service backends |
//! | [`auth`] | Admin allow-list |
//! | [`app`] | Service assembly |
//! | [`kb`] | Knowledge base admin commands |
//! | [`ask`] | Question and feedback commands |
//! | [`server`] | HTTP server |

pub mod app;
pub mod ask;
pub mod auth;
pub mod background_log;
pub mod config;
pub mod db;
pub mod embedding;
pub mod kb;
pub mod migrate;
pub mod rewrite;
pub mod server;
pub mod sqlite_store;
