//! veremail-core - an email syntax, DNS, SMTP, and reputation validation
//! engine.
//!
//! [`Engine`] is the entry point: it owns the resolver/SMTP/health caches
//! a real deployment wants to keep warm across many calls, and exposes
//! [`Engine::validate`] for a single address and [`Engine::validate_batch`]
//! for a bulk run.

#![warn(clippy::all, clippy::pedantic)]

use std::sync::Arc;

pub mod address;
pub mod bulk;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod disposable;
pub mod error;
pub mod health;
pub mod resolver;
pub mod result;
pub mod scoring;
pub mod smtp;
pub mod typo;

pub use address::{Address, ParseOptions};
pub use bulk::{BulkResult, BulkSummary};
pub use config::{EngineConfig, RequestOptions, Thresholds};
pub use error::{DnsError, EngineError, SmtpError, SyntaxError};
pub use result::{Factors, Status, ValidationResult};
pub use smtp::Deliverable;

use bulk::BulkScheduler;
use coordinator::Coordinator;

/// Target used on every `tracing` call this crate emits.
pub const LOG_TARGET: &str = "veremail_core";

/// The validation engine. Cheap to clone (everything it owns is behind
/// an `Arc`); a single instance is meant to be built once at startup and
/// shared across every request, the way the teacher's `Client` is built
/// once per process and reused across checks.
#[derive(Clone)]
pub struct Engine {
    coordinator: Arc<Coordinator>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            coordinator: Arc::new(Coordinator::new(config.clone())),
            config,
        }
    }

    /// Runs the full pipeline for a single address (spec §4.8).
    pub async fn validate(&self, email: &str, options: &RequestOptions) -> ValidationResult {
        self.coordinator.validate(email, options).await
    }

    /// Runs a deduplicated, concurrency-bounded batch (spec §4.9).
    pub async fn validate_batch(
        &self,
        emails: &[String],
        options: &RequestOptions,
    ) -> BulkResult {
        let scheduler = BulkScheduler::with_coordinator(self.coordinator.clone(), &self.config);
        scheduler.validate_batch(emails, options).await
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Convenience one-shot helper for callers that don't want to keep an
/// [`Engine`] around. Builds a fresh engine (and so a cold cache) on
/// every call — prefer [`Engine::validate`] when validating more than a
/// handful of addresses.
pub async fn validate_email(email: &str, options: &RequestOptions) -> ValidationResult {
    Engine::default().validate(email, options).await
}

/// Convenience one-shot helper mirroring [`validate_email`] for batches.
pub async fn validate_batch(emails: &[String], options: &RequestOptions) -> BulkResult {
    Engine::default().validate_batch(emails, options).await
}
