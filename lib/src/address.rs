//! RFC 5321/5322 syntax parser (spec §4.1).
//!
//! Validates an address against the pragmatic subset of RFC 5321/5322 the
//! engine cares about and decomposes it into an immutable [`Address`].
//! Rules are enforced in the exact order spec §4.1 lists them; the first
//! failure wins.

use crate::error::SyntaxError;

const MAX_ADDRESS_LEN: usize = 320;
const MAX_LOCAL_LEN: usize = 64;
const MAX_DOMAIN_LEN: usize = 253;

const DOT_ATOM_EXTRA: &[char] = &[
    '!', '#', '$', '%', '&', '\'', '*', '+', '/', '=', '?', '^', '_', '`', '{', '|', '}', '~', '-',
];

/// Options that affect which addresses the parser accepts (spec §4.8
/// "strict mode"; spec §6 `allowInternational`).
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub strict: bool,
    pub allow_international: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: false,
            allow_international: true,
        }
    }
}

/// An address that has passed syntax validation. Immutable after
/// construction; consumed (by reference) by every later pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    original: String,
    local_part: String,
    /// ASCII, lowercased, punycode-normalized domain.
    domain: String,
    quoted_local: bool,
    international: bool,
}

impl Address {
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    /// Normalized ASCII domain, lowercase, punycode-encoded if the
    /// original domain contained non-ASCII labels.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn is_quoted_local(&self) -> bool {
        self.quoted_local
    }

    pub fn is_international(&self) -> bool {
        self.international
    }

    /// `local@domain`, using the normalized ASCII domain.
    pub fn normalized(&self) -> String {
        format!("{}@{}", self.local_part, self.domain)
    }
}

/// Parses and validates `s`, returning a [`SyntaxError`] describing the
/// first rule that failed.
pub fn parse(s: &str, options: ParseOptions) -> Result<Address, SyntaxError> {
    if s.len() > MAX_ADDRESS_LEN {
        return Err(SyntaxError::TooLong);
    }

    let parts: Vec<&str> = s.rsplitn(2, '@').collect();
    if parts.len() != 2 {
        return Err(SyntaxError::MissingOrMultipleAt);
    }
    // rsplitn(2, ...) gives us [domain, local] in reverse order.
    let (domain_raw, local_raw) = (parts[0], parts[1]);
    if local_raw.contains('@') {
        return Err(SyntaxError::MissingOrMultipleAt);
    }

    let quoted_local = local_raw.starts_with('"') && local_raw.ends_with('"') && local_raw.len() >= 2;
    validate_local_part(local_raw, quoted_local, options)?;

    let domain = validate_domain(domain_raw, options)?;

    // Checked after the '@' split and the local/domain character classes so
    // a local part with an actual bad character (not just whitespace) still
    // reports that more specific rejection first.
    if s.chars().any(|c| c == ' ' || c == '\t') {
        return Err(SyntaxError::UnescapedSpace);
    }

    let international = domain_raw.chars().any(|c| !c.is_ascii());

    Ok(Address {
        original: s.to_string(),
        local_part: local_raw.to_string(),
        domain,
        quoted_local,
        international,
    })
}

fn validate_local_part(
    local: &str,
    quoted: bool,
    options: ParseOptions,
) -> Result<(), SyntaxError> {
    if local.is_empty() {
        return Err(SyntaxError::EmptyLocalPart);
    }
    if local.len() > MAX_LOCAL_LEN {
        return Err(SyntaxError::LocalPartTooLong);
    }

    if quoted {
        if options.strict {
            return Err(SyntaxError::QuotedLocalDisallowed);
        }
        return Ok(());
    }

    if local.starts_with('.') || local.ends_with('.') {
        return Err(SyntaxError::LocalPartDotBoundary);
    }
    if local.contains("..") {
        return Err(SyntaxError::LocalPartDoubleDot);
    }
    if options.strict && local.contains('+') {
        return Err(SyntaxError::PlusAddressingDisallowed);
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || DOT_ATOM_EXTRA.contains(&c))
    {
        return Err(SyntaxError::LocalPartInvalidChar);
    }

    Ok(())
}

fn validate_domain(domain: &str, options: ParseOptions) -> Result<String, SyntaxError> {
    if domain.is_empty() {
        return Err(SyntaxError::EmptyDomain);
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(SyntaxError::DomainTooLong);
    }

    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        return validate_domain_literal(literal);
    }

    let has_non_ascii = domain.chars().any(|c| !c.is_ascii());
    let ascii_domain = if has_non_ascii {
        if !options.allow_international {
            return Err(SyntaxError::InternationalDisallowed);
        }
        let encoded = idna::domain_to_ascii(domain).map_err(|_| SyntaxError::IdnaEncodingFailed)?;
        // Re-validate the punycode-encoded form against the label rules.
        validate_ascii_labels(&encoded)?;
        encoded
    } else {
        validate_ascii_labels(domain)?;
        domain.to_ascii_lowercase()
    };

    Ok(ascii_domain)
}

fn validate_ascii_labels(domain: &str) -> Result<(), SyntaxError> {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(SyntaxError::TooFewLabels);
    }

    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return Err(SyntaxError::InvalidLabel);
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(SyntaxError::InvalidLabel);
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(SyntaxError::InvalidLabelChar);
        }
    }

    let tld = labels.last().expect("labels has at least 2 entries");
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SyntaxError::InvalidTld);
    }

    Ok(())
}

fn validate_domain_literal(literal: &str) -> Result<String, SyntaxError> {
    let literal = literal.strip_prefix("IPv6:").unwrap_or(literal);
    if literal.parse::<std::net::Ipv4Addr>().is_ok() || literal.parse::<std::net::Ipv6Addr>().is_ok()
    {
        Ok(format!("[{literal}]"))
    } else {
        Err(SyntaxError::InvalidDomainLiteral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient() -> ParseOptions {
        ParseOptions::default()
    }

    fn strict() -> ParseOptions {
        ParseOptions {
            strict: true,
            allow_international: true,
        }
    }

    #[test]
    fn accepts_simple_address() {
        let addr = parse("john.doe@gmail.com", lenient()).unwrap();
        assert_eq!(addr.local_part(), "john.doe");
        assert_eq!(addr.domain(), "gmail.com");
        assert!(!addr.is_international());
    }

    #[test]
    fn rejects_missing_at() {
        assert_eq!(
            parse("invalid-email", lenient()),
            Err(SyntaxError::MissingOrMultipleAt)
        );
    }

    #[test]
    fn rejects_single_label_domain() {
        assert_eq!(parse("a@b", lenient()), Err(SyntaxError::TooFewLabels));
    }

    #[test]
    fn rejects_double_dot_local_part() {
        assert_eq!(
            parse("a..b@example.com", lenient()),
            Err(SyntaxError::LocalPartDoubleDot)
        );
    }

    #[test]
    fn length_boundary_320_64_is_accepted() {
        let local = "a".repeat(64);
        let domain_len = 320 - 1 - 64; // '@' plus local part
        let mut domain = String::new();
        while domain.len() + 4 < domain_len {
            domain.push_str("a.");
        }
        domain.push_str("com");
        let s = format!("{local}@{domain}");
        assert!(s.len() <= 320);
        assert!(parse(&s, lenient()).is_ok());
    }

    #[test]
    fn length_over_320_is_rejected() {
        let s = format!("{}@{}.com", "a".repeat(64), "b".repeat(260));
        assert_eq!(parse(&s, lenient()), Err(SyntaxError::TooLong));
    }

    #[test]
    fn local_part_over_64_is_rejected() {
        let s = format!("{}@example.com", "a".repeat(65));
        assert_eq!(parse(&s, lenient()), Err(SyntaxError::LocalPartTooLong));
    }

    #[test]
    fn strict_mode_rejects_plus_addressing() {
        assert_eq!(
            parse("john+news@gmail.com", strict()),
            Err(SyntaxError::PlusAddressingDisallowed)
        );
        assert!(parse("john+news@gmail.com", lenient()).is_ok());
    }

    #[test]
    fn strict_mode_rejects_quoted_local() {
        assert_eq!(
            parse("\"john doe\"@example.com", strict()),
            Err(SyntaxError::QuotedLocalDisallowed)
        );
    }

    #[test]
    fn international_domain_normalizes_to_ascii() {
        let addr = parse("user@exämple.com", lenient()).unwrap();
        assert!(addr.is_international());
        assert!(addr.domain().starts_with("xn--"));
    }

    #[test]
    fn international_domain_rejected_when_disallowed() {
        let options = ParseOptions {
            strict: false,
            allow_international: false,
        };
        assert_eq!(
            parse("user@exämple.com", options),
            Err(SyntaxError::InternationalDisallowed)
        );
    }

    #[test]
    fn bracketed_ipv4_literal_is_accepted() {
        let addr = parse("user@[192.168.0.1]", lenient()).unwrap();
        assert_eq!(addr.domain(), "[192.168.0.1]");
    }

    #[test]
    fn tld_must_be_alphabetic() {
        assert_eq!(
            parse("user@example.123", lenient()),
            Err(SyntaxError::InvalidTld)
        );
    }
}
