//! Envelope-level SMTP dialogue against the recipient's primary MX (spec
//! §4.5). Grounded on the teacher's `verify_mail`, which already drives a
//! `tokio::net::TcpStream` wrapped in a `BufStream` through EHLO/MAIL
//! FROM/RCPT TO — this module generalizes that single-shot RCPT probe
//! into the explicit multi-state dialogue spec §4.5/§9 call for (buffer
//! incoming bytes, advance on each line whose leading digit class
//! matches 2xx/5xx/other), adding the second RCPT TO used to detect
//! catch-all domains.
//!
//! One TCP connection per call; connections are never reused across
//! validations (spec §4.5 last bullet).

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time;

use crate::error::SmtpError;

/// The ternary SMTP outcome (spec §9 "a Boolean collapse loses
/// precision"): `Unknown` is a first-class value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deliverable {
    Yes,
    No,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub deliverable: Deliverable,
    pub is_catch_all: bool,
    pub banner: Option<String>,
    pub final_response: Option<String>,
    pub tls_supported: bool,
    pub reason: Option<String>,
}

impl ProbeResult {
    fn failure(reason: impl Into<String>) -> Self {
        Self {
            deliverable: Deliverable::No,
            is_catch_all: false,
            banner: None,
            final_response: None,
            tls_supported: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub from_domain: String,
    pub probe_from_address: String,
    pub port: u16,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            from_domain: "example.com".to_string(),
            probe_from_address: "probe@example.com".to_string(),
            port: 25,
        }
    }
}

/// `probe(email, domain) -> {deliverable, isCatchAll, banner?, finalResponse?, tlsSupported, reason}`.
///
/// Precondition: only called when `mx_found = true` and SMTP probing is
/// enabled (checked by [`crate::coordinator`], not here).
pub async fn probe(email: &str, mx_host: &str, options: &ProbeOptions) -> ProbeResult {
    match time::timeout(options.timeout, dialogue(email, mx_host, options)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(target: crate::LOG_TARGET, mx_host, "smtp dialogue timed out");
            ProbeResult {
                deliverable: Deliverable::No,
                is_catch_all: false,
                banner: None,
                final_response: None,
                tls_supported: false,
                reason: Some(SmtpError::Timeout.to_string()),
            }
        }
    }
}

async fn dialogue(email: &str, mx_host: &str, options: &ProbeOptions) -> ProbeResult {
    let domain = match email.rsplit_once('@') {
        Some((_, d)) => d,
        None => return ProbeResult::failure("address missing domain"),
    };

    let stream = match TcpStream::connect((mx_host, options.port)).await {
        Ok(s) => s,
        Err(e) => return ProbeResult::failure(SmtpError::Io(e.to_string())),
    };
    let mut stream = BufStream::new(stream);

    // WAIT_BANNER
    let banner = match read_response(&mut stream).await {
        Ok(r) => r,
        Err(e) => return ProbeResult::failure(e),
    };
    if banner.code / 100 != 2 {
        return ProbeResult::failure(SmtpError::UnexpectedResponse(banner.text));
    }
    let tls_supported = banner_hints_tls(&banner.text);

    // WAIT_HELO
    if let Err(e) = send(&mut stream, &format!("HELO {}", options.from_domain)).await {
        return ProbeResult::failure(e);
    }
    let helo = match read_response(&mut stream).await {
        Ok(r) => r,
        Err(e) => return ProbeResult::failure(e),
    };
    if helo.code / 100 != 2 {
        return ProbeResult::failure(SmtpError::UnexpectedResponse(helo.text));
    }

    // WAIT_MAIL
    if let Err(e) = send(
        &mut stream,
        &format!("MAIL FROM:<{}>", options.probe_from_address),
    )
    .await
    {
        return ProbeResult::failure(e);
    }
    let mail = match read_response(&mut stream).await {
        Ok(r) => r,
        Err(e) => return ProbeResult::failure(e),
    };
    if mail.code / 100 != 2 {
        return ProbeResult::failure(SmtpError::UnexpectedResponse(mail.text));
    }

    // WAIT_RCPT
    if let Err(e) = send(&mut stream, &format!("RCPT TO:<{email}>")).await {
        return ProbeResult::failure(e);
    }
    let rcpt = match read_response(&mut stream).await {
        Ok(r) => r,
        Err(e) => return ProbeResult::failure(e),
    };

    let (deliverable, reason) = match rcpt.code {
        200..=299 => (Deliverable::Yes, None),
        550 => (Deliverable::No, None),
        _ => (
            Deliverable::Unknown,
            Some(format!("server response: {}", rcpt.text)),
        ),
    };

    // Catch-all is only worth checking when the target itself was
    // accepted; a rejected/indeterminate target already answers the
    // deliverability question.
    let is_catch_all = if deliverable == Deliverable::Yes {
        probe_catch_all(&mut stream, domain).await
    } else {
        false
    };

    let _ = send(&mut stream, "QUIT").await;

    ProbeResult {
        deliverable,
        is_catch_all,
        banner: Some(banner.text),
        final_response: Some(rcpt.text),
        tls_supported,
        reason,
    }
}

async fn probe_catch_all(stream: &mut BufStream<TcpStream>, domain: &str) -> bool {
    let random_local = format!("nonexistent-{}", wall_clock_ms());
    if send(stream, &format!("RCPT TO:<{random_local}@{domain}>")).await.is_err() {
        return false;
    }
    match read_response(stream).await {
        Ok(r) => r.code / 100 == 2,
        Err(_) => false,
    }
}

fn wall_clock_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn banner_hints_tls(banner: &str) -> bool {
    let lower = banner.to_ascii_lowercase();
    lower.contains("tls") || lower.contains("starttls")
}

struct Response {
    code: u16,
    text: String,
}

async fn send(stream: &mut BufStream<TcpStream>, line: &str) -> Result<(), SmtpError> {
    stream
        .write_all(format!("{line}\r\n").as_bytes())
        .await
        .map_err(|e| SmtpError::Io(e.to_string()))?;
    stream.flush().await.map_err(|e| SmtpError::Io(e.to_string()))
}

/// Reads lines until one whose fourth character is a space rather than a
/// `-` (the SMTP multi-line continuation marker), per spec §9's explicit
/// state-machine note.
async fn read_response(stream: &mut BufStream<TcpStream>) -> Result<Response, SmtpError> {
    let mut last_code = 0u16;
    let mut lines = Vec::new();

    loop {
        let mut line = String::new();
        let bytes_read = stream
            .read_line(&mut line)
            .await
            .map_err(|e| SmtpError::Io(e.to_string()))?;
        if bytes_read == 0 {
            return Err(SmtpError::Io("connection closed by peer".to_string()));
        }
        let line = line.trim_end().to_string();
        if line.len() < 4 {
            return Err(SmtpError::UnexpectedResponse(line));
        }
        let code: u16 = line[0..3]
            .parse()
            .map_err(|_| SmtpError::UnexpectedResponse(line.clone()))?;
        last_code = code;
        let continuation = line.as_bytes()[3] == b'-';
        lines.push(line[4.min(line.len())..].to_string());
        if !continuation {
            break;
        }
    }

    Ok(Response {
        code: last_code,
        text: lines.join(" "),
    })
}
