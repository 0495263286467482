//! End-to-end tests against a scripted in-process SMTP server, grounded
//! on the teacher's own `Framed`/`LinesCodec` mock server pattern but
//! driving the full multi-state dialogue (`HELO`/`MAIL FROM`/`RCPT TO`,
//! the second `RCPT TO` used for catch-all detection) instead of a
//! single-shot exchange.

use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::task;
use tokio_util::codec::{Framed, LinesCodec};

use veremail_core::smtp::{self, Deliverable, ProbeOptions};

/// One scripted exchange: a predicate over the line the client sends,
/// and the single-line response to answer with.
struct Step {
    matches: Box<dyn Fn(&str) -> bool + Send>,
    response: &'static str,
}

fn exact(expected: &'static str, response: &'static str) -> Step {
    Step {
        matches: Box::new(move |line| line == expected),
        response,
    }
}

fn prefix(expected_prefix: &'static str, response: &'static str) -> Step {
    Step {
        matches: Box::new(move |line| line.starts_with(expected_prefix)),
        response,
    }
}

/// Binds an ephemeral port, sends a `220` banner, then answers each
/// incoming line against `script` in order. Returns the bound address so
/// the caller can point a client at it.
async fn spawn_mock_server(banner: &'static str, script: Vec<Step>) -> std::net::SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    task::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (_, writer) = stream.split();
        let mut writer = BufWriter::new(writer);
        writer.write_all(format!("{banner}\r\n").as_bytes()).await.unwrap();
        writer.flush().await.unwrap();

        let mut framed = Framed::new(stream, LinesCodec::new());
        let mut remaining: VecDeque<Step> = script.into();
        while let Some(Ok(line)) = framed.next().await {
            let Some(step) = remaining.pop_front() else {
                break;
            };
            assert!((step.matches)(&line), "unexpected command: {line}");
            let _ = framed.send(step.response.to_string()).await;
            if line == "QUIT" {
                break;
            }
        }
    });

    addr
}

fn probe_options(port: u16) -> ProbeOptions {
    ProbeOptions {
        timeout: Duration::from_millis(500),
        from_domain: "veremail.test".to_string(),
        probe_from_address: "probe@veremail.test".to_string(),
        port,
    }
}

#[tokio::test]
async fn probe_accepts_a_deliverable_mailbox() {
    let addr = spawn_mock_server(
        "220 mock.example.com ESMTP",
        vec![
            exact("HELO veremail.test", "250 OK"),
            exact("MAIL FROM:<probe@veremail.test>", "250 OK"),
            exact("RCPT TO:<hello@example.com>", "250 OK"),
            prefix("RCPT TO:<nonexistent-", "550 No such user"),
            exact("QUIT", "221 Bye"),
        ],
    )
    .await;

    let result = smtp::probe("hello@example.com", "127.0.0.1", &probe_options(addr.port())).await;
    assert_eq!(result.deliverable, Deliverable::Yes);
    assert!(!result.is_catch_all);
    assert!(result.banner.unwrap().contains("mock.example.com"));
}

#[tokio::test]
async fn probe_rejects_a_nonexistent_mailbox() {
    let addr = spawn_mock_server(
        "220 mock.example.com ESMTP",
        vec![
            exact("HELO veremail.test", "250 OK"),
            exact("MAIL FROM:<probe@veremail.test>", "250 OK"),
            exact("RCPT TO:<ghost@example.com>", "550 No such user"),
            exact("QUIT", "221 Bye"),
        ],
    )
    .await;

    let result = smtp::probe("ghost@example.com", "127.0.0.1", &probe_options(addr.port())).await;
    assert_eq!(result.deliverable, Deliverable::No);
    assert!(!result.is_catch_all);
}

#[tokio::test]
async fn probe_detects_a_catch_all_domain() {
    let addr = spawn_mock_server(
        "220 mock.example.com ESMTP",
        vec![
            exact("HELO veremail.test", "250 OK"),
            exact("MAIL FROM:<probe@veremail.test>", "250 OK"),
            exact("RCPT TO:<hello@example.com>", "250 OK"),
            prefix("RCPT TO:<nonexistent-", "250 OK"),
            exact("QUIT", "221 Bye"),
        ],
    )
    .await;

    let result = smtp::probe("hello@example.com", "127.0.0.1", &probe_options(addr.port())).await;
    assert_eq!(result.deliverable, Deliverable::Yes);
    assert!(result.is_catch_all);
}

#[tokio::test]
async fn probe_times_out_when_the_server_goes_silent() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    task::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // Accept the connection but never write a banner.
        std::mem::forget(stream);
    });

    let mut options = probe_options(addr.port());
    options.timeout = Duration::from_millis(100);
    let result = smtp::probe("hello@example.com", "127.0.0.1", &options).await;
    assert_eq!(result.deliverable, Deliverable::No);
    assert!(result.reason.unwrap().contains("timed out"));
}

#[tokio::test]
async fn probe_treats_a_4xx_greeting_as_undeliverable() {
    let addr = spawn_mock_server("421 service not available", vec![]).await;

    let result = smtp::probe("hello@example.com", "127.0.0.1", &probe_options(addr.port())).await;
    assert_eq!(result.deliverable, Deliverable::No);
}
