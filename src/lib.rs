//! ```text
//! ScanPolicy ──► PolicyBuilder ──► ContentPipeline
//!                                   │
//!          raw text ──► sanitize ───┤
//!                                   ├─► structure::validate ─┐
//!                                   ├─► InjectionScanner ────┴─► ScanResult
//!                                   │
//!                        safe ──────┼─► sandbox::wrap ──► serving
//!                        unsafe ────┴─► quarantine (score + flags)
//! ```
//!
//! # gatehouse
//!
//! **Deterministic content security pipeline for LLM-bound fetched text.**
//!
//! `gatehouse` sits between a document fetcher and an LLM consumer. Every
//! fetched document is stripped of invisible Unicode, checked for the
//! structure it claims to have, scored against an extensible injection
//! rule table, and, when accepted, packaged in a labeled untrusted-data
//! container. Rejections are quarantined with their score and flags so
//! nothing silently disappears.
//!
//! Classification is regex and table driven, with no model calls and no
//! I/O: the same bytes always produce the same verdict.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gatehouse::prelude::*;
//!
//! let policy = PolicyBuilder::new()
//!     .with_file("gatehouse.toml")?
//!     .with_env()
//!     .build()?;
//!
//! let pipeline = ContentPipeline::new(policy)?;
//! let report = pipeline.process(&fetched_text, "docs/example");
//! if let Some(text) = report.disposition.sandboxed_text() {
//!     serve(text);
//! }
//! ```
//!
//! ## Key Properties
//!
//! - **Deterministic** – pure transforms; identical input, identical verdict
//! - **Fail closed** – unsafe verdicts quarantine unless a policy opts into
//!   audit-only serving
//! - **Additive scoring** – flags sum; a verdict can be recomputed from its
//!   flags at any time
//! - **Extensible rules** – policies append or disable rules without
//!   touching the scanning algorithm
//!
//! ## Modules
//!
//! - [`config`] – Scan policy, builder pattern, file/env loading
//! - [`pipeline`] – Orchestrator, verdict types, dispositions
//! - [`scan`] – Sanitizer, structural validator, rule table, scanner
//! - [`sandbox`] – Untrusted-data packaging for accepted content
//! - [`auth`] – API-key gate and rate limiting at the serving boundary
//! - [`record`] – Typed records crossing the storage boundary

#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod pipeline;
pub mod record;
pub mod sandbox;
pub mod scan;

/// Re-exports for convenient access to core types
pub mod prelude {
    pub use crate::auth::{AccessCheck, ApiKeyGate, AuthError, CredentialError, Tier};
    pub use crate::config::{ConfigError, FailMode, PolicyBuilder, ScanPolicy};
    pub use crate::pipeline::verdict::{Flag, ScanResult, Severity};
    pub use crate::pipeline::{ContentPipeline, Disposition, PipelineReport};
    pub use crate::scan::rules::{CustomRule, RuleSetConfig};
    pub use crate::scan::sanitize::{CharCategory, InvisibleCharReport};
    pub use crate::scan::scanner::{InjectionScanner, ScanError};
}
