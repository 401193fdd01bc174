//! Shared fixtures for unit tests: local probe targets and engine stubs.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, mpsc};

use crate::alerts::{AlertError, AlertTransport};
use crate::models::CheckRecord;
use crate::monitoring::checker::Checker;
use crate::monitoring::types::Outcome;

/// Raw record as written by the check-creation path.
pub fn raw_check(id: &str) -> Value {
    json!({
        "id": id,
        "userPhone": "5551234567",
        "protocol": "http",
        "url": "status.example.com/health",
        "method": "get",
        "successCodes": [200],
        "timeoutSeconds": 2
    })
}

/// Twenty-character id derived from a short tag.
pub fn check_id(tag: &str) -> String {
    format!("{tag:0>20}")
}

/// HTTP server answering every request with `status`. Each request, head
/// and body, is forwarded on the returned channel.
pub async fn spawn_http_target(status: u16) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = answer(stream, status, tx).await;
            });
        }
    });

    (addr, rx)
}

async fn answer(
    mut stream: TcpStream,
    status: u16,
    tx: mpsc::UnboundedSender<String>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_len = loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break end + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_len]).to_ascii_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|len| len.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_len + body_len {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());

    let response =
        format!("HTTP/1.1 {status} Test\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Accepts connections and never answers them.
pub async fn spawn_silent_target() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    addr
}

/// Address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Checker returning a scripted outcome without touching the network.
pub struct StubChecker {
    outcome: Mutex<Outcome>,
    delay: Option<Duration>,
    probes: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    started: Notify,
}

impl StubChecker {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            delay: None,
            probes: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started: Notify::new(),
        }
    }

    /// Each probe sleeps for `delay` before resolving.
    pub fn slow(outcome: Outcome, delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::new(outcome) }
    }

    pub fn set_outcome(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Largest number of probes that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Resolves once a probe has started.
    pub async fn started(&self) {
        self.started.notified().await;
    }
}

#[async_trait]
impl Checker for StubChecker {
    async fn probe(&self, _check: &CheckRecord) -> Outcome {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        self.started.notify_one();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.outcome.lock().unwrap().clone()
    }
}

/// Transport remembering every message it was asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self { fail: AtomicBool::new(true), ..Self::default() }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertTransport for RecordingTransport {
    async fn send(&self, destination: &str, message: &str) -> Result<(), AlertError> {
        self.sent.lock().unwrap().push((destination.to_string(), message.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(AlertError::Rejected { status: 500, body: "provider down".into() });
        }
        Ok(())
    }
}
