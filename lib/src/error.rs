//! Typed error taxonomy for each pipeline stage.
//!
//! None of these ever escape the engine's public API as a bare `Result`
//! error — the [`crate::coordinator`] folds every variant into a
//! [`crate::result::ValidationResult`] field (`reason`, `status`) instead.
//! They exist so that each stage can be tested and reasoned about on its
//! own, and so that [`EngineError`] gives bulk callers something concrete
//! to put in a per-item failure slot.

use thiserror::Error;

/// Rejection produced by the RFC 5321/5322 parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("address exceeds 320 bytes")]
    TooLong,
    #[error("address must contain exactly one '@'")]
    MissingOrMultipleAt,
    #[error("local part is empty")]
    EmptyLocalPart,
    #[error("local part exceeds 64 bytes")]
    LocalPartTooLong,
    #[error("local part has a leading or trailing '.'")]
    LocalPartDotBoundary,
    #[error("local part contains '..'")]
    LocalPartDoubleDot,
    #[error("local part contains characters outside the allowed dot-atom set")]
    LocalPartInvalidChar,
    #[error("quoted local parts are not allowed in strict mode")]
    QuotedLocalDisallowed,
    #[error("'+' addressing is not allowed in strict mode")]
    PlusAddressingDisallowed,
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain exceeds 253 bytes")]
    DomainTooLong,
    #[error("domain must have at least two labels")]
    TooFewLabels,
    #[error("domain label is empty, too long, or has a leading/trailing '-'")]
    InvalidLabel,
    #[error("domain label contains characters outside a-z A-Z 0-9 -")]
    InvalidLabelChar,
    #[error("top-level domain must be alphabetic and at least 2 bytes")]
    InvalidTld,
    #[error("domain literal is not a valid IPv4/IPv6 address")]
    InvalidDomainLiteral,
    #[error("internationalized domain failed IDNA/punycode encoding")]
    IdnaEncodingFailed,
    #[error("internationalized domains are not permitted")]
    InternationalDisallowed,
    #[error("address contains an unescaped space")]
    UnescapedSpace,
}

/// Failure resolving a domain's DNS records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("domain does not resolve to any A/AAAA record")]
    NoHostRecords,
    #[error("domain has no MX record and no fallback A record")]
    NoMxRecords,
    #[error("DNS resolver error: {0}")]
    ResolverError(String),
}

/// Outcome of the SMTP envelope dialogue that isn't a plain accept/reject.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmtpError {
    #[error("connection or dialogue timed out")]
    Timeout,
    #[error("socket error: {0}")]
    Io(String),
    #[error("server response: {0}")]
    UnexpectedResponse(String),
}

/// Per-item failure surfaced by the bulk scheduler.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl From<SyntaxError> for EngineError {
    fn from(e: SyntaxError) -> Self {
        Self(e.to_string())
    }
}

impl From<DnsError> for EngineError {
    fn from(e: DnsError) -> Self {
        Self(e.to_string())
    }
}

impl From<SmtpError> for EngineError {
    fn from(e: SmtpError) -> Self {
        Self(e.to_string())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self(format!("validation task failed: {e}"))
    }
}
