//! Disposable-domain classifier (spec §4.3): blocklist membership, suffix
//! inheritance, suspicious patterns, and a broader heuristic-only pattern
//! catalogue.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::cache::{ttl, TtlCache};

/// Used when no blocklist file is configured, or the configured path is
/// missing — absence of the file is non-fatal (spec §3 `DisposableCorpus`).
const FALLBACK_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "guerrillamail.com",
    "mailinator.com",
    "tempmail.com",
    "throwawaymail.com",
    "yopmail.com",
    "trashmail.com",
    "getnada.com",
    "sharklasers.com",
    "dispostable.com",
    "fakeinbox.com",
    "maildrop.cc",
];

/// Suspicious TLDs per spec §4.3.
const SUSPICIOUS_TLDS: &[&str] = &[".tk", ".ml", ".ga", ".cf"];

static CORE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"temp.*mail", r"\d+min", r"throwaway", r"disposable"]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern compiles"))
        .collect()
});

/// Broader, heuristic-only pattern catalogue: time-, action-, purpose-,
/// and privacy-themed domain names. Two or more matches classify a domain
/// as disposable even without a blocklist hit (spec §4.3).
static HEURISTIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // time-themed
        r"sec(ond)?mail",
        r"minute",
        r"hour",
        r"\d+day",
        // action-themed
        r"trash",
        r"burn",
        r"dump",
        r"junk",
        r"delete",
        // purpose-themed
        r"fake",
        r"test.*mail",
        r"spam",
        r"guerr?illa",
        // privacy-themed
        r"anon",
        r"hide",
        r"incognito",
        r"privacy",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern compiles"))
    .collect()
});

/// Loaded once at startup, immutable thereafter (spec §9 "global
/// singletons"): a blocklist of domains, a fixed regex catalogue, and a
/// static fallback set.
pub struct DisposableCorpus {
    blocklist: HashSet<String>,
}

impl DisposableCorpus {
    /// Loads a line-delimited blocklist (`#` comments ignored) from
    /// `path`. A missing file is non-fatal; the static fallback is used.
    pub fn load(path: Option<&Path>) -> Self {
        let mut blocklist: HashSet<String> = FALLBACK_DOMAINS
            .iter()
            .map(|s| (*s).to_string())
            .collect();

        if let Some(path) = path {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    for line in contents.lines() {
                        let line = line.trim();
                        if line.is_empty() || line.starts_with('#') {
                            continue;
                        }
                        blocklist.insert(line.to_ascii_lowercase());
                    }
                }
                Err(err) => {
                    tracing::debug!(
                        target: crate::LOG_TARGET,
                        path = %path.display(),
                        error = %err,
                        "disposable blocklist file not found, using fallback set"
                    );
                }
            }
        }

        Self { blocklist }
    }

    fn contains(&self, domain: &str) -> bool {
        self.blocklist.contains(domain)
    }
}

impl Default for DisposableCorpus {
    fn default() -> Self {
        Self::load(None)
    }
}

pub struct DisposableClassifier {
    corpus: Arc<DisposableCorpus>,
    cache: TtlCache<String, bool>,
}

impl DisposableClassifier {
    pub fn new(corpus: Arc<DisposableCorpus>) -> Self {
        Self {
            corpus,
            cache: TtlCache::new(ttl::DISPOSABLE),
        }
    }

    pub fn is_disposable(&self, domain: &str) -> bool {
        let domain = domain.to_ascii_lowercase();
        if let Some(cached) = self.cache.get(&domain) {
            return cached;
        }
        let result = self.compute(&domain);
        self.cache.put(domain, result);
        result
    }

    /// A rough [0,100] risk score derived from how many independent
    /// signals fired. Not itself cached; cheap relative to the
    /// classification lookup it reuses.
    pub fn risk_score(&self, domain: &str) -> u8 {
        let domain = domain.to_ascii_lowercase();
        if self.corpus.contains(&domain) {
            return 100;
        }
        if parent_suffix_member(&self.corpus, &domain) {
            return 90;
        }

        let mut score: u32 = 0;
        if CORE_PATTERNS.iter().any(|re| re.is_match(&domain)) {
            score += 60;
        }
        if has_suspicious_tld(&domain) {
            score += 30;
        }
        if has_high_digit_ratio_with_mail(&domain) {
            score += 25;
        }
        score += 10 * heuristic_match_count(&domain) as u32;

        score.min(100) as u8
    }

    fn compute(&self, domain: &str) -> bool {
        self.corpus.contains(domain)
            || parent_suffix_member(&self.corpus, domain)
            || CORE_PATTERNS.iter().any(|re| re.is_match(domain))
            || has_suspicious_tld(domain)
            || has_high_digit_ratio_with_mail(domain)
            || heuristic_match_count(domain) >= 2
    }
}

/// A subdomain inherits its parent's disposable status: the last two
/// labels of `domain` are checked against the blocklist.
fn parent_suffix_member(corpus: &DisposableCorpus, domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let parent = labels[labels.len() - 2..].join(".");
    corpus.contains(&parent)
}

fn has_suspicious_tld(domain: &str) -> bool {
    SUSPICIOUS_TLDS.iter().any(|tld| domain.ends_with(tld))
}

fn has_high_digit_ratio_with_mail(domain: &str) -> bool {
    if !domain.contains("mail") {
        return false;
    }
    let digits = domain.chars().filter(|c| c.is_ascii_digit()).count();
    let len = domain.chars().count().max(1);
    (digits as f64 / len as f64) > 0.3
}

fn heuristic_match_count(domain: &str) -> usize {
    HEURISTIC_PATTERNS
        .iter()
        .filter(|re| re.is_match(domain))
        .count()
}
