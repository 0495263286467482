//! Per-request options (spec §6 "Recognized options") and process-wide
//! engine configuration, generalized from the teacher's `Config` builder
//! (`with_sender_address`/`with_client_domain`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Thresholds used by the coordinator's verdict table (spec §4.8).
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub valid: u8,
    pub risky: u8,
}

impl Thresholds {
    pub fn for_mode(strict: bool) -> Self {
        if strict {
            Self {
                valid: 90,
                risky: 70,
            }
        } else {
            Self {
                valid: 85,
                risky: 65,
            }
        }
    }
}

/// Options carried on a single validation request (spec §6). Mirrors the
/// wire option table exactly, including its camelCase field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(default = "default_true")]
    pub check_syntax: bool,
    #[serde(default = "default_true")]
    pub check_domain: bool,
    #[serde(default = "default_true")]
    pub check_mx: bool,
    #[serde(default = "default_true")]
    pub check_smtp: bool,
    #[serde(default = "default_true")]
    pub check_disposable: bool,
    #[serde(default = "default_true")]
    pub check_typos: bool,
    #[serde(default, alias = "useStrictMode")]
    pub strict_mode: bool,
    #[serde(default = "default_true")]
    pub allow_international: bool,
    #[serde(default = "default_smtp_timeout_ms")]
    pub smtp_timeout_ms: u64,
    #[serde(default)]
    pub smtp_from_domain: Option<String>,
    #[serde(default = "default_true")]
    pub enable_cache: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Opts a bulk call into actually probing SMTP. `checkSmtp` alone isn't
    /// enough in bulk: the scheduler forces SMTP off by default (spec §6 —
    /// too expensive to run against every address in a list) unless a
    /// caller sets this flag, which [`crate::bulk::BulkScheduler`] treats
    /// as "yes, really do it". Ignored outside bulk.
    #[serde(default)]
    pub check_smtp_in_bulk: bool,
}

fn default_true() -> bool {
    true
}
fn default_smtp_timeout_ms() -> u64 {
    5_000
}
fn default_batch_size() -> usize {
    10
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            check_syntax: true,
            check_domain: true,
            check_mx: true,
            check_smtp: true,
            check_disposable: true,
            check_typos: true,
            strict_mode: false,
            allow_international: true,
            smtp_timeout_ms: default_smtp_timeout_ms(),
            smtp_from_domain: None,
            enable_cache: true,
            batch_size: default_batch_size(),
            check_smtp_in_bulk: false,
        }
    }
}

impl RequestOptions {
    pub fn smtp_timeout(&self) -> Duration {
        Duration::from_millis(self.smtp_timeout_ms)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::for_mode(self.strict_mode)
    }
}

/// Process-wide settings, loaded once and shared across all validations
/// (spec §9 "global singletons"). Not part of the per-request wire
/// contract.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Address used in `MAIL FROM:`. No mail is ever actually sent.
    pub probe_from_address: String,
    /// Domain presented in `HELO`/`EHLO`, overridable per request via
    /// `smtpFromDomain`.
    pub default_from_domain: String,
    pub smtp_port: u16,
    /// Line-delimited blocklist path (spec §3 `DisposableCorpus`);
    /// absence is non-fatal.
    pub disposable_blocklist_path: Option<PathBuf>,
    /// Bulk Scheduler concurrency ceiling (spec §4.9/§5).
    pub bulk_concurrency: usize,
    /// Pause between bulk chunks to avoid bursty remote load.
    pub bulk_chunk_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_from_address: "probe@example.com".to_string(),
            default_from_domain: "example.com".to_string(),
            smtp_port: 25,
            disposable_blocklist_path: None,
            bulk_concurrency: 10,
            bulk_chunk_delay: Duration::from_millis(200),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_probe_from_address(mut self, address: String) -> Self {
        self.probe_from_address = address;
        self
    }

    #[must_use]
    pub fn with_default_from_domain(mut self, domain: String) -> Self {
        self.default_from_domain = domain;
        self
    }

    #[must_use]
    pub fn with_smtp_port(mut self, port: u16) -> Self {
        self.smtp_port = port;
        self
    }

    #[must_use]
    pub fn with_disposable_blocklist_path(mut self, path: PathBuf) -> Self {
        self.disposable_blocklist_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_bulk_concurrency(mut self, concurrency: usize) -> Self {
        self.bulk_concurrency = concurrency;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_mode_raises_thresholds() {
        let lenient = Thresholds::for_mode(false);
        let strict = Thresholds::for_mode(true);
        assert!(strict.valid > lenient.valid);
        assert!(strict.risky > lenient.risky);
    }

    #[test]
    fn request_options_default_matches_spec() {
        let options = RequestOptions::default();
        assert!(options.check_syntax);
        assert!(options.check_smtp);
        assert!(!options.strict_mode);
        assert_eq!(options.smtp_timeout_ms, 5_000);
        assert_eq!(options.batch_size, 10);
    }

    #[test]
    fn deserializes_from_wire_shape() {
        let json = r#"{"strictMode": true, "batchSize": 25}"#;
        let options: RequestOptions = serde_json::from_str(json).unwrap();
        assert!(options.strict_mode);
        assert_eq!(options.batch_size, 25);
        assert!(options.check_syntax);
    }
}
