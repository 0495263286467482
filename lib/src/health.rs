//! Domain-level authentication and reputation probe (spec §4.6): SPF and
//! DMARC via TXT lookups, a static blacklist hook, and a reputation score.
//!
//! DKIM is never actually probed (no selector is known ahead of time) —
//! `dkim` stays `false` unconditionally. This is a documented limitation
//! carried over verbatim from spec §9's open questions, not an oversight.

use hickory_resolver::Resolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{ttl, TtlCache};

const TRUSTED_PROVIDERS: &[&str] = &[
    "gmail.com",
    "outlook.com",
    "yahoo.com",
    "hotmail.com",
    "icloud.com",
    "aol.com",
    "protonmail.com",
];

const SUSPICIOUS_TLDS: &[&str] = &[".tk", ".ml", ".ga", ".cf"];

/// Static hook for a real RBL integration that the core does not
/// implement (spec §9 open question) — a small hard-coded set of
/// disallowed/example domains is checked instead.
const BLACKLISTED_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "test.com"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainHealth {
    pub spf: bool,
    pub dkim: bool,
    pub dmarc: bool,
    pub blacklisted: bool,
    pub reputation: u8,
}

pub struct HealthProbe {
    cache: TtlCache<String, Arc<DomainHealth>>,
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthProbe {
    pub fn new() -> Self {
        Self {
            cache: TtlCache::new(ttl::HEALTH),
        }
    }

    /// `health(d) -> {spf, dkim, dmarc, blacklisted, reputation}`.
    pub async fn health(&self, domain: &str) -> Arc<DomainHealth> {
        let domain = domain.to_ascii_lowercase();
        if let Some(cached) = self.cache.get(&domain) {
            return cached;
        }

        let spf = has_spf(&domain).await;
        let dmarc = has_dmarc(&domain).await;
        let blacklisted = BLACKLISTED_DOMAINS.contains(&domain.as_str());
        let dkim = false;

        let reputation = compute_reputation(&domain, spf, dkim, dmarc);

        let result = Arc::new(DomainHealth {
            spf,
            dkim,
            dmarc,
            blacklisted,
            reputation,
        });
        self.cache.put(domain, result.clone());
        result
    }
}

fn compute_reputation(domain: &str, spf: bool, dkim: bool, dmarc: bool) -> u8 {
    let mut score: i32 = 50;

    if TRUSTED_PROVIDERS.contains(&domain) {
        score += 40;
    }
    if is_corporate_heuristic(domain) {
        score += 20;
    }
    if spf {
        score += 5;
    }
    if dkim {
        score += 5;
    }
    if dmarc {
        score += 10;
    }
    if SUSPICIOUS_TLDS.iter().any(|tld| domain.ends_with(tld)) {
        score -= 30;
    }

    score.clamp(0, 100) as u8
}

fn is_corporate_heuristic(domain: &str) -> bool {
    if domain.contains("corp") || domain.contains("company") {
        return true;
    }
    // "Unusual" TLD: neither a common gTLD nor a two-letter ccTLD.
    match domain.rsplit_once('.') {
        Some((_, tld)) => {
            !matches!(tld, "com" | "net" | "org" | "edu" | "gov" | "io") && tld.len() != 2
        }
        None => false,
    }
}

async fn has_spf(domain: &str) -> bool {
    txt_records_starting_with(domain, "v=spf1").await
}

async fn has_dmarc(domain: &str) -> bool {
    txt_records_starting_with(&format!("_dmarc.{domain}"), "v=dmarc1").await
}

/// A TXT lookup failure is treated as "record not present" (spec §7
/// "health probe failure") — it never fails the overall validation.
async fn txt_records_starting_with(host: &str, prefix: &str) -> bool {
    let Ok(builder) = Resolver::builder_tokio() else {
        return false;
    };
    let resolver = builder.build();
    match resolver.txt_lookup(host).await {
        Ok(lookup) => lookup.iter().any(|txt| {
            txt.iter()
                .flat_map(|bytes| std::str::from_utf8(bytes).ok())
                .collect::<String>()
                .to_ascii_lowercase()
                .starts_with(prefix)
        }),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trusted_provider_gets_reputation_bonus() {
        let score = compute_reputation("gmail.com", true, false, true);
        // 50 + 40 (trusted) + 5 (spf) + 10 (dmarc) = 105 clamped to 100
        assert_eq!(score, 100);
    }

    #[test]
    fn suspicious_tld_loses_reputation() {
        let score = compute_reputation("mail.tk", false, false, false);
        assert_eq!(score, 20);
    }

    #[test]
    fn corporate_heuristic_applies_to_name_and_unusual_tld() {
        assert!(is_corporate_heuristic("acmecorp.com"));
        assert!(is_corporate_heuristic("acme.xyz"));
        assert!(!is_corporate_heuristic("acme.com"));
        assert!(!is_corporate_heuristic("acme.de"));
    }

    #[tokio::test]
    async fn example_domains_are_blacklisted() {
        let probe = HealthProbe::new();
        let result = probe.health("example.com").await;
        assert!(result.blacklisted);
        assert!(!result.dkim);
    }
}
