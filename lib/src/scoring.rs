//! Local-part/domain shape scoring and reputation weighting (spec §4.7).
//! The canonical coefficient set — spec §9 notes the source carried two
//! slightly different weight tables; this one is authoritative.

use crate::smtp::Deliverable;

const ROLE_BASED_LOCALS: &[&str] = &[
    "admin",
    "support",
    "info",
    "sales",
    "contact",
    "help",
    "webmaster",
    "postmaster",
    "noreply",
    "no-reply",
    "abuse",
    "security",
    "billing",
    "office",
    "hr",
];

/// Inputs the scorer needs, gathered by the coordinator once every stage
/// has run. Deliberately flat instead of re-deriving from
/// `ValidationResult` directly, so the scorer stays a pure function that
/// is trivially testable and re-runnable (spec §8 "scoring is pure").
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput {
    pub syntax_valid: bool,
    pub domain_valid: bool,
    pub mx_found: bool,
    pub smtp_deliverable: Deliverable,
    pub spf: bool,
    pub dmarc: bool,
    pub dkim: bool,
    pub disposable: bool,
    pub blacklisted: bool,
    pub role_based: bool,
    pub free_provider: bool,
    pub typo_with_suggestion: bool,
    pub tls_supported: bool,
    pub domain_reputation: u8,
    pub is_business_email: bool,
    pub strict: bool,
}

/// `score(result) -> int [0,100]`.
pub fn score(input: &ScoringInput) -> u8 {
    let mut total: i32 = 0;

    if input.syntax_valid {
        total += 25;
    }
    if input.domain_valid {
        total += 20;
    }
    if input.mx_found {
        total += 25;
    }

    total += match input.smtp_deliverable {
        Deliverable::Yes => 20,
        Deliverable::Unknown => 5,
        Deliverable::No => 0,
    };

    if input.spf {
        total += 5;
    }
    if input.dmarc {
        total += 7;
    }
    if input.dkim {
        total += 3;
    }

    if input.disposable {
        total -= if input.strict { 50 } else { 40 };
    }
    if input.blacklisted {
        total -= if input.strict { 60 } else { 50 };
    }
    if input.role_based {
        total -= if input.strict { 25 } else { 15 };
    }
    if input.free_provider {
        total -= if input.strict { 10 } else { 5 };
    }
    if input.typo_with_suggestion {
        total -= if input.strict { 25 } else { 15 };
    }

    if input.tls_supported {
        total += 5;
    }

    total += (i32::from(input.domain_reputation) - 50) / 5;

    if input.is_business_email {
        total += 10;
    }

    total.clamp(0, 100) as u8
}

/// `reputation(address, result) -> int [0,100]`.
pub fn address_reputation(local_part: &str, domain_reputation: u8) -> u8 {
    let mut score: i32 = 50;
    let lower = local_part.to_ascii_lowercase();

    if lower.contains("noreply") || lower.contains("no-reply") {
        score -= 20;
    }
    if lower.contains("test") || lower.contains("demo") {
        score -= 15;
    }
    if has_digit_run(&lower, 5) {
        score -= 10;
    }
    if local_part.len() < 3 {
        score -= 10;
    }
    if local_part.len() > 20 {
        score -= 5;
    }

    score += (i32::from(domain_reputation) - 50) / 2;

    score.clamp(0, 100) as u8
}

pub fn is_role_based(local_part: &str) -> bool {
    ROLE_BASED_LOCALS.contains(&local_part.to_ascii_lowercase().as_str())
}

fn has_digit_run(s: &str, min_len: usize) -> bool {
    let mut run = 0usize;
    for c in s.chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run >= min_len {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}
