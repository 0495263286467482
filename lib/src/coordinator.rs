//! The Validator Coordinator (spec §4.8): runs every enabled stage in
//! order, short-circuiting once a stage forecloses the outcome, then
//! feeds the accumulated signals into [`crate::scoring::score`] and the
//! status decision table.
//!
//! Grounded on `nexemail`'s `check_email` coordinator function, which
//! chains syntax -> mx -> misc -> smtp with early returns and derives a
//! final reason from whichever stage actually decided the outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::address::{self, ParseOptions};
use crate::config::{EngineConfig, RequestOptions};
use crate::disposable::{DisposableClassifier, DisposableCorpus};
use crate::health::HealthProbe;
use crate::resolver::DomainResolver;
use crate::result::{Factors, Status, ValidationResult};
use crate::scoring::{self, ScoringInput};
use crate::smtp::{self, Deliverable, ProbeOptions};
use crate::typo::TypoCorrector;

/// Domains whose local-part rewriting rules the coordinator knows about
/// for `gmail_normalized` (spec §3 `ValidationResult.gmailNormalized`).
const GMAIL_DOMAINS: &[&str] = &["gmail.com", "googlemail.com"];

/// Owns every stage's shared, cached state and wires them together per
/// request. One instance is expected to live for the process lifetime
/// (spec §9 "global singletons") and be shared across concurrent
/// validations, including the bulk scheduler.
pub struct Coordinator {
    config: EngineConfig,
    typos: TypoCorrector,
    disposable: DisposableClassifier,
    resolver: DomainResolver,
    health: HealthProbe,
}

impl Coordinator {
    pub fn new(config: EngineConfig) -> Self {
        let blocklist_path: Option<PathBuf> = config.disposable_blocklist_path.clone();
        let corpus = Arc::new(DisposableCorpus::load(blocklist_path.as_deref()));
        Self {
            config,
            typos: TypoCorrector::new(),
            disposable: DisposableClassifier::new(corpus),
            resolver: DomainResolver::new(),
            health: HealthProbe::new(),
        }
    }

    /// Runs the full pipeline for a single address (spec §4.8).
    pub async fn validate(&self, email: &str, options: &RequestOptions) -> ValidationResult {
        let started = Instant::now();
        let mut checks_performed = Vec::new();

        // Parsing always runs internally: every later stage needs the
        // decomposed local/domain pair. `checkSyntax` governs whether a
        // parse failure is fatal. With it enabled (the default) a bad
        // address is rejected outright, mirroring spec §4.1's "first
        // failure wins". With it disabled, a caller has said they don't
        // want RFC syntax enforced, so a parse failure falls back to a
        // best-effort `local@domain` split and the pipeline keeps going —
        // but there's nothing to fall back to without an '@', so that case
        // still rejects.
        let parse_options = ParseOptions {
            strict: options.strict_mode,
            allow_international: options.allow_international,
        };
        let (local, domain, is_international, syntax_valid) =
            match address::parse(email, parse_options) {
                Ok(address) => (
                    address.local_part().to_string(),
                    address.domain().to_string(),
                    address.is_international(),
                    true,
                ),
                Err(err) if options.check_syntax => {
                    tracing::debug!(target: crate::LOG_TARGET, email, error = %err, "syntax rejection");
                    return ValidationResult::syntax_rejection(
                        email,
                        err.to_string(),
                        elapsed_ms(started),
                    );
                }
                Err(err) => match email.rsplit_once('@') {
                    Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                        let international = domain.chars().any(|c| !c.is_ascii());
                        (
                            local.to_string(),
                            domain.to_ascii_lowercase(),
                            international,
                            false,
                        )
                    }
                    _ => {
                        return ValidationResult::syntax_rejection(
                            email,
                            err.to_string(),
                            elapsed_ms(started),
                        );
                    }
                },
            };
        if options.check_syntax {
            checks_performed.push("syntax".to_string());
        }
        let normalized_email = format!("{local}@{domain}");

        let typo_suggestion = if options.check_typos {
            checks_performed.push("typo".to_string());
            Some(self.typos.suggest(email))
        } else {
            None
        };

        let disposable = if options.check_disposable {
            checks_performed.push("disposable".to_string());
            self.disposable.is_disposable(&domain)
        } else {
            false
        };

        let domain_validity = if options.check_domain {
            checks_performed.push("domain".to_string());
            Some(self.resolver.resolve_domain(&domain).await)
        } else {
            None
        };
        let domain_valid = domain_validity.as_ref().map(|v| v.valid).unwrap_or(true);

        if options.check_domain && !domain_valid {
            tracing::debug!(target: crate::LOG_TARGET, email, domain, "domain invalid; skipping mx/health/smtp");
            let thresholds = options.thresholds();
            let (status, reason) = decide_status(
                0,
                thresholds.valid,
                thresholds.risky,
                disposable,
                false,
                domain_valid,
                false,
            );
            return ValidationResult {
                original: email.to_string(),
                syntax_valid,
                domain_valid,
                mx_found: false,
                disposable,
                typo_detected: typo_suggestion
                    .as_ref()
                    .map(|t| t.typo_detected)
                    .unwrap_or(false),
                smtp_deliverable: Deliverable::No,
                suggestion: typo_suggestion.and_then(|t| t.suggestion.clone()),
                normalized_email,
                gmail_normalized: GMAIL_DOMAINS
                    .contains(&domain.as_str())
                    .then(|| normalize_gmail_local(&local, &domain)),
                is_role_based: scoring::is_role_based(&local),
                has_plus_alias: local.contains('+'),
                is_catch_all: false,
                is_international,
                is_free_provider: crate::typo::POPULAR_DOMAINS.contains(&domain.as_str()),
                factors: Factors {
                    format: true,
                    domain: false,
                    mx: false,
                    smtp: false,
                    reputation: 0,
                    deliverability: 0,
                },
                domain_health: crate::health::DomainHealth {
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
                status,
                reason: domain_validity
                    .as_ref()
                    .and_then(|v| v.reason.clone())
                    .unwrap_or(reason),
                checks_performed,
                validation_time_ms: elapsed_ms(started),
            };
        }

        let mx_outcome = if options.check_mx {
            checks_performed.push("mx".to_string());
            Some(self.resolver.resolve_mx(&domain).await)
        } else {
            None
        };
        let mx_found = mx_outcome.as_ref().map(|m| m.found).unwrap_or(false);

        let health = if options.check_domain {
            checks_performed.push("health".to_string());
            Some(self.health.health(&domain).await)
        } else {
            None
        };

        let smtp_probe = if options.check_smtp && mx_found {
            checks_performed.push("smtp".to_string());
            let mx_host = mx_outcome
                .as_ref()
                .and_then(|m| m.records.first())
                .map(|r| r.exchange.clone())
                .unwrap_or_else(|| domain.clone());
            let probe_options = ProbeOptions {
                timeout: options.smtp_timeout(),
                from_domain: options
                    .smtp_from_domain
                    .clone()
                    .unwrap_or_else(|| self.config.default_from_domain.clone()),
                probe_from_address: self.config.probe_from_address.clone(),
                port: self.config.smtp_port,
            };
            Some(smtp::probe(&normalized_email, &mx_host, &probe_options).await)
        } else {
            None
        };

        // No probe ran (SMTP disabled, or MX missing): there's no evidence
        // of deliverability either way, but the spec's decision table
        // treats that the same as a hard "no" rather than leaving it
        // `Unknown`, which is reserved for an indeterminate server response.
        let deliverable = smtp_probe
            .as_ref()
            .map(|p| p.deliverable)
            .unwrap_or(Deliverable::No);
        let is_catch_all = smtp_probe.as_ref().map(|p| p.is_catch_all).unwrap_or(false);

        let is_role_based = scoring::is_role_based(&local);
        let has_plus_alias = local.contains('+');
        let is_free_provider = crate::typo::POPULAR_DOMAINS.contains(&domain.as_str());
        let gmail_normalized = GMAIL_DOMAINS
            .contains(&domain.as_str())
            .then(|| normalize_gmail_local(&local, &domain));

        let reputation = health.as_ref().map(|h| h.reputation).unwrap_or(50);
        let spf = health.as_ref().map(|h| h.spf).unwrap_or(false);
        let dmarc = health.as_ref().map(|h| h.dmarc).unwrap_or(false);
        let dkim = health.as_ref().map(|h| h.dkim).unwrap_or(false);
        let blacklisted = health.as_ref().map(|h| h.blacklisted).unwrap_or(false);
        let tls_supported = smtp_probe.as_ref().map(|p| p.tls_supported).unwrap_or(false);

        let typo_with_suggestion = typo_suggestion
            .as_ref()
            .map(|t| t.typo_detected)
            .unwrap_or(false);

        let scoring_input = ScoringInput {
            syntax_valid,
            domain_valid,
            mx_found,
            smtp_deliverable: deliverable,
            spf,
            dmarc,
            dkim,
            disposable,
            blacklisted,
            role_based: is_role_based,
            free_provider: is_free_provider,
            typo_with_suggestion,
            tls_supported,
            domain_reputation: reputation,
            is_business_email: !is_free_provider && domain_valid && mx_found,
            strict: options.strict_mode,
        };
        let score = scoring::score(&scoring_input);

        let thresholds = options.thresholds();
        let (status, reason) = decide_status(
            score,
            thresholds.valid,
            thresholds.risky,
            disposable,
            blacklisted,
            domain_valid,
            mx_found,
        );

        let factors = Factors {
            format: true,
            domain: domain_valid,
            mx: mx_found,
            smtp: matches!(deliverable, Deliverable::Yes),
            reputation,
            deliverability: mx_outcome
                .as_ref()
                .map(|m| m.deliverability_score)
                .unwrap_or(0),
        };

        let domain_health = health
            .map(|h| (*h).clone())
            .unwrap_or(crate::health::DomainHealth {
                spf: false,
                dkim: false,
                dmarc: false,
                blacklisted: false,
                reputation: 50,
            });

        ValidationResult {
            original: email.to_string(),
            syntax_valid,
            domain_valid,
            mx_found,
            disposable,
            typo_detected: typo_with_suggestion,
            smtp_deliverable: deliverable,
            suggestion: typo_suggestion.and_then(|t| t.suggestion.clone()),
            normalized_email,
            gmail_normalized,
            is_role_based,
            has_plus_alias,
            is_catch_all,
            is_international,
            is_free_provider,
            factors,
            domain_health,
            smtp_server_banner: smtp_probe.as_ref().and_then(|p| p.banner.clone()),
            smtp_server_response: smtp_probe.as_ref().and_then(|p| p.final_response.clone()),
            tls_supported,
            score,
            status,
            reason,
            checks_performed,
            validation_time_ms: elapsed_ms(started),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn decide_status(
    score: u8,
    valid_threshold: u8,
    risky_threshold: u8,
    disposable: bool,
    blacklisted: bool,
    domain_valid: bool,
    mx_found: bool,
) -> (Status, String) {
    if disposable {
        return (
            Status::Risky,
            "address belongs to a known disposable domain".to_string(),
        );
    }
    if blacklisted {
        return (
            Status::Invalid,
            "domain is blacklisted".to_string(),
        );
    }
    if !domain_valid {
        return (
            Status::Invalid,
            "domain does not resolve".to_string(),
        );
    }
    if !mx_found {
        return (
            Status::Invalid,
            "no mail exchanger for domain".to_string(),
        );
    }
    if score >= valid_threshold {
        return (Status::Valid, "passed all enabled checks".to_string());
    }
    if score >= risky_threshold {
        return (
            Status::Risky,
            "passed most checks but score is below the valid threshold".to_string(),
        );
    }
    (
        Status::Invalid,
        "score is below the risky threshold".to_string(),
    )
}

fn normalize_gmail_local(local: &str, domain: &str) -> String {
    let trimmed = local.split('+').next().unwrap_or(local);
    format!("{}@{}", trimmed.replace('.', ""), domain)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gmail_normalization_strips_dots_and_plus_alias() {
        assert_eq!(
            normalize_gmail_local("john.doe+news", "gmail.com"),
            "johndoe@gmail.com"
        );
    }

    #[test]
    fn decide_status_prefers_disposable_over_blacklisted() {
        let (status, _) = decide_status(0, 85, 65, true, true, true, true);
        assert_eq!(status, Status::Risky);
    }

    #[test]
    fn decide_status_invalid_when_mx_missing() {
        let (status, _) = decide_status(90, 85, 65, false, false, true, false);
        assert_eq!(status, Status::Invalid);
    }

    #[test]
    fn decide_status_valid_above_threshold() {
        let (status, _) = decide_status(90, 85, 65, false, false, true, true);
        assert_eq!(status, Status::Valid);
    }

    #[test]
    fn decide_status_risky_between_thresholds() {
        let (status, _) = decide_status(70, 85, 65, false, false, true, true);
        assert_eq!(status, Status::Risky);
    }

    #[tokio::test]
    async fn syntax_rejection_short_circuits_before_any_network_io() {
        let coordinator = Coordinator::new(EngineConfig::default());
        let result = coordinator
            .validate("not-an-email", &RequestOptions::default())
            .await;
        assert_eq!(result.status, Status::Invalid);
        assert_eq!(result.checks_performed, vec!["syntax".to_string()]);
    }

    #[tokio::test]
    async fn invalid_domain_short_circuits_before_mx_and_smtp() {
        let coordinator = Coordinator::new(EngineConfig::default());
        let options = RequestOptions {
            check_mx: true,
            check_smtp: true,
            ..RequestOptions::default()
        };
        let result = coordinator
            .validate("user@this-domain-should-not-resolve.invalid", &options)
            .await;
        assert_eq!(result.status, Status::Invalid);
        assert!(!result.domain_valid);
        assert!(!result.checks_performed.contains(&"mx".to_string()));
        assert!(!result.checks_performed.contains(&"smtp".to_string()));
    }

    #[tokio::test]
    async fn disabled_syntax_check_falls_back_to_a_plain_split() {
        let coordinator = Coordinator::new(EngineConfig::default());
        let options = RequestOptions {
            check_syntax: false,
            check_domain: false,
            check_mx: false,
            check_smtp: false,
            check_disposable: false,
            check_typos: false,
            ..RequestOptions::default()
        };
        let result = coordinator.validate("jo hn@example.com", &options).await;
        assert!(!result.syntax_valid);
        assert!(!result.checks_performed.contains(&"syntax".to_string()));
        assert_eq!(result.normalized_email, "jo hn@example.com");
    }

    #[tokio::test]
    async fn no_smtp_probe_defaults_to_not_deliverable() {
        let coordinator = Coordinator::new(EngineConfig::default());
        let options = RequestOptions {
            check_domain: false,
            check_mx: false,
            check_smtp: false,
            check_disposable: false,
            check_typos: false,
            ..RequestOptions::default()
        };
        let result = coordinator.validate("user@example.com", &options).await;
        assert_eq!(result.smtp_deliverable, crate::smtp::Deliverable::No);
    }
}
