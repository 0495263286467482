//! The pipeline's output record (spec §3 `ValidationResult`) and its
//! sub-records. Built incrementally by the coordinator across stages and
//! frozen once returned — spec §9's "cross-stage coupling via a mutable
//! record" maps here to a plain builder struct that is only ever read
//! through `&ValidationResult` once construction finishes.

use serde::{Deserialize, Serialize};

use crate::health::DomainHealth;
use crate::smtp::Deliverable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Valid,
    Risky,
    Invalid,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factors {
    pub format: bool,
    pub domain: bool,
    pub mx: bool,
    pub smtp: bool,
    pub reputation: u8,
    pub deliverability: u8,
}

impl Default for Factors {
    fn default() -> Self {
        Self {
            format: false,
            domain: false,
            mx: false,
            smtp: false,
            reputation: 0,
            deliverability: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub original: String,

    pub syntax_valid: bool,
    pub domain_valid: bool,
    pub mx_found: bool,
    pub disposable: bool,
    pub typo_detected: bool,

    pub smtp_deliverable: Deliverable,

    pub suggestion: Option<String>,
    pub normalized_email: String,
    pub gmail_normalized: Option<String>,
    pub is_role_based: bool,
    pub has_plus_alias: bool,
    pub is_catch_all: bool,
    pub is_international: bool,
    pub is_free_provider: bool,

    pub factors: Factors,
    pub domain_health: DomainHealth,

    pub smtp_server_banner: Option<String>,
    pub smtp_server_response: Option<String>,
    pub tls_supported: bool,

    pub score: u8,
    pub status: Status,
    pub reason: String,
    pub checks_performed: Vec<String>,
    pub validation_time_ms: u64,
}

impl ValidationResult {
    /// A result shaped for an address that failed to parse: every later
    /// boolean stays `false` and only the `"syntax"` check ran (spec §8
    /// universal invariant).
    pub fn syntax_rejection(original: &str, reason: String, validation_time_ms: u64) -> Self {
        Self {
            original: original.to_string(),
            syntax_valid: false,
            domain_valid: false,
            mx_found: false,
            disposable: false,
            typo_detected: false,
            smtp_deliverable: Deliverable::No,
            suggestion: None,
            normalized_email: original.to_string(),
            gmail_normalized: None,
            is_role_based: false,
            has_plus_alias: false,
            is_catch_all: false,
            is_international: false,
            is_free_provider: false,
            factors: Factors::default(),
            domain_health: DomainHealth {
                spf: false,
                dkim: false,
                dmarc: false,
                blacklisted: false,
                reputation: 0,
            },
            smtp_server_banner: None,
            smtp_server_response: None,
            tls_supported: false,
            score: 0,
            status: Status::Invalid,
            reason,
            checks_performed: vec!["syntax".to_string()],
            validation_time_ms,
        }
    }

    /// A result for an address the engine never finished validating
    /// because the validation task itself failed (panicked, was
    /// cancelled, or otherwise couldn't run) — distinct from a result the
    /// pipeline legitimately classified as invalid (spec §4.9/§7 "a
    /// per-item bulk failure yields `status=error`").
    pub fn error(original: &str, reason: String, validation_time_ms: u64) -> Self {
        Self {
            original: original.to_string(),
            syntax_valid: false,
            domain_valid: false,
            mx_found: false,
            disposable: false,
            typo_detected: false,
            smtp_deliverable: Deliverable::No,
            suggestion: None,
            normalized_email: original.to_string(),
            gmail_normalized: None,
            is_role_based: false,
            has_plus_alias: false,
            is_catch_all: false,
            is_international: false,
            is_free_provider: false,
            factors: Factors::default(),
            domain_health: DomainHealth {
                spf: false,
                dkim: false,
                dmarc: false,
                blacklisted: false,
                reputation: 0,
            },
            smtp_server_banner: None,
            smtp_server_response: None,
            tls_supported: false,
            score: 0,
            status: Status::Error,
            reason,
            checks_performed: Vec::new(),
            validation_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_rejection_has_only_syntax_check_performed() {
        let result = ValidationResult::syntax_rejection("bad", "missing @".to_string(), 1);
        assert_eq!(result.checks_performed, vec!["syntax".to_string()]);
        assert!(!result.syntax_valid);
        assert_eq!(result.status, Status::Invalid);
    }

    #[test]
    fn error_result_has_error_status_and_no_checks_performed() {
        let result = ValidationResult::error("bad", "task panicked".to_string(), 1);
        assert_eq!(result.status, Status::Error);
        assert!(result.checks_performed.is_empty());
    }
}
