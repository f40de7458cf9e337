// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod bootstrap;
pub mod config;
pub mod dedup;
pub mod digest;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod matcher;
pub mod notify;
pub mod pipeline;
pub mod retry;
pub mod scheduler;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::bootstrap::build_pipeline;
pub use crate::config::AppConfig;
pub use crate::error::DigestError;
pub use crate::pipeline::{Pipeline, PipelineParts, RunFailure, RunOutcome, RunReport, Stage};
