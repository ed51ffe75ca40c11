//! # inkpress
//!
//! A snippet-to-PDF service. Callers submit a short program in one of four
//! dialects; inkpress screens it for disallowed constructs, repairs common
//! mistakes with deterministic text rules, runs it in a private sandbox
//! directory and returns the PDF it produced.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌─────────┐   ┌──────────┐   ┌──────────┐
//! │  Safety  │──▶│ Rewrite │──▶│ Execute │──▶│ Artifact │──▶│ Recorder │
//! │  Filter  │   │  Rules  │   │Strategy │   │  bytes   │   │ (SQLite) │
//! └──────────┘   └─────────┘   └─────────┘   └──────────┘   └──────────┘
//!       ▲                                                         │
//!       │               Pipeline coordinator                      ▼
//! ┌─────┴────┐                                              ┌──────────┐
//! │ HTTP/CLI │◀─────────────── PDF or error ────────────────│  /stats  │
//! └──────────┘                                              └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline error taxonomy |
//! | [`safety`] | Disallowed-pattern filter |
//! | [`rewrite`] | Per-dialect repair rules |
//! | [`execute`] | Per-dialect execution strategies |
//! | [`pipeline`] | Request coordinator |
//! | [`store`] | Outcome persistence and recorder |
//! | [`stats`] | Statistics formatting |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod error;
pub mod execute;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod rewrite;
pub mod safety;
pub mod server;
pub mod stats;
pub mod store;
