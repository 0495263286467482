//! Known-misspelling lookup and bounded edit-distance suggestion against a
//! fixed provider list (spec §4.2).

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{ttl, TtlCache};

/// Popular consumer domains used both as correction targets and as the
/// "never correct these to each other" whitelist (spec §4.2 step 5).
pub const POPULAR_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
    "protonmail.com",
    "live.com",
    "msn.com",
    "comcast.net",
];

static MISSPELLINGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("gmial.com", "gmail.com"),
        ("gmai.com", "gmail.com"),
        ("gamil.com", "gmail.com"),
        ("gnail.com", "gmail.com"),
        ("gmail.co", "gmail.com"),
        ("gmal.com", "gmail.com"),
        ("yahooo.com", "yahoo.com"),
        ("yaho.com", "yahoo.com"),
        ("yahoo.co", "yahoo.com"),
        ("hotmial.com", "hotmail.com"),
        ("hotmal.com", "hotmail.com"),
        ("hotmai.com", "hotmail.com"),
        ("outlok.com", "outlook.com"),
        ("outloo.com", "outlook.com"),
        ("iclould.com", "icloud.com"),
        ("icoud.com", "icloud.com"),
    ])
});

/// Generic TLD typos that are corrected regardless of the second-level
/// domain, e.g. `example.con` -> `example.com`.
static TLD_SUBSTITUTIONS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([(".con", ".com"), (".com.", ".com"), (".comm", ".com")]));

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TypoSuggestion {
    pub typo_detected: bool,
    pub suggestion: Option<String>,
    pub corrections: Vec<String>,
    pub confidence: u8,
}

impl TypoSuggestion {
    fn none() -> Self {
        Self {
            typo_detected: false,
            suggestion: None,
            corrections: Vec::new(),
            confidence: 0,
        }
    }
}

pub struct TypoCorrector {
    cache: TtlCache<String, Arc<TypoSuggestion>>,
}

impl Default for TypoCorrector {
    fn default() -> Self {
        Self::new()
    }
}

impl TypoCorrector {
    pub fn new() -> Self {
        Self {
            cache: TtlCache::new(ttl::TYPO),
        }
    }

    /// `suggest(s) -> {typoDetected, suggestion?, corrections[], confidence}`.
    pub fn suggest(&self, email: &str) -> Arc<TypoSuggestion> {
        if let Some(cached) = self.cache.get(&email.to_string()) {
            return cached;
        }
        let result = Arc::new(compute_suggestion(email));
        self.cache.put(email.to_string(), result.clone());
        result
    }
}

fn compute_suggestion(email: &str) -> TypoSuggestion {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return TypoSuggestion {
            corrections: vec!["missing '@' separator".to_string()],
            ..TypoSuggestion::none()
        };
    };
    if local.is_empty() || domain.is_empty() {
        return TypoSuggestion {
            corrections: vec!["empty local part or domain".to_string()],
            ..TypoSuggestion::none()
        };
    }

    let domain_lower = domain.to_ascii_lowercase();
    let mut corrections = Vec::new();
    if !domain_lower.contains('.') {
        corrections.push("domain is missing a TLD".to_string());
    }
    if domain_lower.contains("..") {
        corrections.push("domain contains '..'".to_string());
    }
    if email.chars().any(char::is_whitespace) {
        corrections.push("address contains embedded whitespace".to_string());
    }

    let is_popular = POPULAR_DOMAINS.contains(&domain_lower.as_str());

    // Step 2: exact misspelling lookup.
    if let Some(&canonical) = MISSPELLINGS.get(domain_lower.as_str()) {
        return TypoSuggestion {
            typo_detected: true,
            suggestion: Some(format!("{local}@{canonical}")),
            corrections,
            confidence: 95,
        };
    }

    // Step 2b: TLD-only substitution, e.g. ".con" -> ".com".
    for (bad_suffix, good_suffix) in TLD_SUBSTITUTIONS.iter() {
        if domain_lower.ends_with(bad_suffix) && !domain_lower.ends_with(good_suffix) {
            let fixed = format!("{}{good_suffix}", &domain_lower[..domain_lower.len() - bad_suffix.len()]);
            return TypoSuggestion {
                typo_detected: true,
                suggestion: Some(format!("{local}@{fixed}")),
                corrections,
                confidence: 90,
            };
        }
    }

    // Step 3: bounded edit-distance search against the popular whitelist,
    // but never suggest a popular domain "correction" for itself or a
    // trivially close neighbor (step 5 — avoids false positives on
    // gmail.com itself).
    if !is_popular {
        if let Some((candidate, distance)) = nearest_popular_domain(&domain_lower) {
            if (1..=2).contains(&distance) {
                return TypoSuggestion {
                    typo_detected: true,
                    suggestion: Some(format!("{local}@{candidate}")),
                    corrections,
                    confidence: 80,
                };
            }
        }
    }

    TypoSuggestion {
        typo_detected: false,
        suggestion: None,
        corrections,
        confidence: 0,
    }
}

fn nearest_popular_domain(domain: &str) -> Option<(&'static str, usize)> {
    POPULAR_DOMAINS
        .iter()
        .map(|&candidate| (candidate, levenshtein(domain, candidate)))
        .min_by_key(|&(_, distance)| distance)
}

/// Classic Wagner-Fischer edit distance (insertions, deletions,
/// substitutions each cost 1).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());

    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr = vec![0usize; m + 1];

    for i in 1..=n {
        curr[0] = i;
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_misspelling_is_corrected() {
        let corrector = TypoCorrector::new();
        let result = corrector.suggest("user@gmai.com");
        assert!(result.typo_detected);
        assert_eq!(result.suggestion.as_deref(), Some("user@gmail.com"));
        assert_eq!(result.confidence, 95);
    }

    #[test]
    fn tld_only_substitution_is_corrected() {
        let corrector = TypoCorrector::new();
        let result = corrector.suggest("user@example.con");
        assert!(result.typo_detected);
        assert_eq!(result.suggestion.as_deref(), Some("user@example.com"));
        assert_eq!(result.confidence, 90);
    }

    #[test]
    fn popular_domains_are_never_corrected_to_themselves() {
        let corrector = TypoCorrector::new();
        for domain in POPULAR_DOMAINS {
            let result = corrector.suggest(&format!("user@{domain}"));
            assert!(!result.typo_detected, "{domain} was flagged as a typo");
        }
    }

    #[test]
    fn missing_at_is_flagged_without_suggestion() {
        let corrector = TypoCorrector::new();
        let result = corrector.suggest("not-an-email");
        assert!(!result.typo_detected);
        assert!(result.suggestion.is_none());
        assert!(!result.corrections.is_empty());
    }

    #[test]
    fn levenshtein_distances_are_correct() {
        assert_eq!(levenshtein("gmail.com", "gmail.com"), 0);
        assert_eq!(levenshtein("gmal.com", "gmail.com"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn nearby_unlisted_domain_gets_suggestion() {
        let corrector = TypoCorrector::new();
        let result = corrector.suggest("user@gmaill.com");
        assert!(result.typo_detected);
        assert_eq!(result.suggestion.as_deref(), Some("user@gmail.com"));
    }
}
