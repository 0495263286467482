//! DNS resolution of A/AAAA and MX records with a TTL-bounded cache
//! (spec §4.4). Grounded on the teacher's `lookup_mx`/`first_dns_record`,
//! generalized to cover domain validity (A/AAAA) as well as MX, with the
//! RFC 5321 §5.1 implicit-MX fallback the teacher didn't need.

use hickory_resolver::Resolver;
use hickory_resolver::proto::rr::rdata::MX;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{ttl, TtlCache};
use crate::error::DnsError;

const WELL_KNOWN_PROVIDERS: &[&str] = &["google.com", "outlook.com", "microsoft.com", "amazon.com"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainValidity {
    pub valid: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxRecord {
    pub exchange: String,
    pub preference: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxOutcome {
    pub found: bool,
    pub records: Vec<MxRecord>,
    pub deliverability_score: u8,
    pub reason: Option<String>,
}

pub struct DomainResolver {
    domain_cache: TtlCache<String, Arc<DomainValidity>>,
    mx_cache: TtlCache<String, Arc<MxOutcome>>,
}

impl Default for DomainResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainResolver {
    pub fn new() -> Self {
        Self {
            domain_cache: TtlCache::new(ttl::DOMAIN),
            mx_cache: TtlCache::new(ttl::MX),
        }
    }

    /// `resolveDomain(d) -> {valid, reason}`.
    pub async fn resolve_domain(&self, domain: &str) -> Arc<DomainValidity> {
        let ascii = to_ascii(domain);
        if let Some(cached) = self.domain_cache.get(&ascii) {
            return cached;
        }

        let result = Arc::new(match host_lookup(&ascii).await {
            Ok(()) => DomainValidity {
                valid: true,
                reason: None,
            },
            Err(e) => DomainValidity {
                valid: false,
                reason: Some(e.to_string()),
            },
        });
        self.domain_cache.put(ascii, result.clone());
        result
    }

    /// `resolveMX(d) -> {found, records[], deliverabilityScore, reason}`.
    pub async fn resolve_mx(&self, domain: &str) -> Arc<MxOutcome> {
        let ascii = to_ascii(domain);
        if let Some(cached) = self.mx_cache.get(&ascii) {
            return cached;
        }

        let result = Arc::new(self.compute_mx(&ascii).await);
        self.mx_cache.put(ascii, result.clone());
        result
    }

    async fn compute_mx(&self, domain: &str) -> MxOutcome {
        match mx_lookup(domain).await {
            Ok(records) if !records.is_empty() => {
                let score = deliverability_score(&records);
                MxOutcome {
                    found: true,
                    records,
                    deliverability_score: score,
                    reason: None,
                }
            }
            Ok(_) | Err(_) => {
                // No usable MX records: fall back to an implicit MX via
                // the domain's own A record (RFC 5321 §5.1).
                match host_lookup(domain).await {
                    Ok(()) => MxOutcome {
                        found: true,
                        records: Vec::new(),
                        deliverability_score: 60,
                        reason: Some("no MX records; using implicit A-record MX".to_string()),
                    },
                    Err(e) => MxOutcome {
                        found: false,
                        records: Vec::new(),
                        deliverability_score: 0,
                        reason: Some(DnsError::NoMxRecords.to_string() + ": " + &e.to_string()),
                    },
                }
            }
        }
    }
}

fn to_ascii(domain: &str) -> String {
    if domain.chars().any(|c| !c.is_ascii()) {
        idna::domain_to_ascii(domain).unwrap_or_else(|_| domain.to_ascii_lowercase())
    } else {
        domain.to_ascii_lowercase()
    }
}

fn deliverability_score(records: &[MxRecord]) -> u8 {
    let mut score: u32 = 70;
    if records.len() > 1 {
        score += 10;
    }
    if records.len() > 2 {
        score += 5;
    }
    if records
        .iter()
        .any(|r| WELL_KNOWN_PROVIDERS.iter().any(|p| r.exchange.contains(p)))
    {
        score += 15;
    }
    score.min(100) as u8
}

async fn host_lookup(domain: &str) -> Result<(), DnsError> {
    let resolver = Resolver::builder_tokio().map_err(|e| DnsError::ResolverError(e.to_string()))?.build();
    resolver
        .lookup_ip(domain)
        .await
        .map(|_| ())
        .map_err(|_| DnsError::NoHostRecords)
}

async fn mx_lookup(domain: &str) -> Result<Vec<MxRecord>, DnsError> {
    let resolver = Resolver::builder_tokio().map_err(|e| DnsError::ResolverError(e.to_string()))?.build();
    let lookup = resolver
        .mx_lookup(domain)
        .await
        .map_err(|e| DnsError::ResolverError(e.to_string()))?;

    let mut records: Vec<MxRecord> = lookup
        .into_iter()
        .filter(|r| r.exchange().is_fqdn() && !r.exchange().is_root())
        .map(|r: MX| MxRecord {
            exchange: r.exchange().to_string(),
            preference: r.preference(),
        })
        .collect();
    records.sort_by_key(|r| r.preference);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliverability_score_base_is_70() {
        let records = vec![MxRecord {
            exchange: "mx.example.com".to_string(),
            preference: 10,
        }];
        assert_eq!(deliverability_score(&records), 70);
    }

    #[test]
    fn multiple_records_and_known_provider_raise_score() {
        let records = vec![
            MxRecord {
                exchange: "aspmx.l.google.com".to_string(),
                preference: 1,
            },
            MxRecord {
                exchange: "alt1.aspmx.l.google.com".to_string(),
                preference: 5,
            },
            MxRecord {
                exchange: "alt2.aspmx.l.google.com".to_string(),
                preference: 10,
            },
        ];
        // 70 base + 10 (>1) + 5 (>2) + 15 (google.com) = 100
        assert_eq!(deliverability_score(&records), 100);
    }

    #[tokio::test]
    async fn unresolvable_domain_has_no_mx() {
        let resolver = DomainResolver::new();
        let result = resolver
            .resolve_mx("domain-really-does-not-exist-xyzxyz.invalid")
            .await;
        assert!(!result.found);
    }
}
