#![allow(dead_code)]

use docgate::{SendError, SubmissionSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Request as seen by the loopback server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Request line and headers, lowercased.
    pub head: String,
    pub body: String,
}

/// Serve exactly one HTTP/1.1 request on 127.0.0.1 and answer with `status_line` + `body`.
pub async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.expect("accept");
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = sock.read(&mut chunk).await.expect("read");
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                (name.trim() == "content-length").then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = sock.read(&mut chunk).await.expect("read body");
            assert!(n > 0, "client closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body =
            String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string();

        let response = format!(
            "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        sock.write_all(response.as_bytes()).await.expect("write response");
        let _ = sock.shutdown().await;

        CapturedRequest { head, body: request_body }
    });

    (format!("http://{}/api/v3/lk/documents/create", addr), handle)
}

/// In-process sender that records when it was called and can be told to fail or stall.
#[derive(Clone, Default)]
pub struct RecordingSender {
    calls: Arc<Mutex<Vec<(Instant, String, String)>>>,
    fail_with_status: Option<u16>,
    delay: Option<Duration>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(status: u16) -> Self {
        Self { fail_with_status: Some(status), ..Self::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(t, _, _)| *t).collect()
    }

    pub fn signatures(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, _, s)| s.clone()).collect()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, p, _)| p.clone()).collect()
    }
}

#[async_trait::async_trait]
impl SubmissionSender for RecordingSender {
    async fn submit(&self, payload: String, signature: &str) -> Result<String, SendError> {
        self.calls.lock().unwrap().push((Instant::now(), payload, signature.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail_with_status {
            Some(status) => Err(SendError::Status { status, body: "rejected".into() }),
            None => Ok(r#"{"value":"ok"}"#.to_string()),
        }
    }
}

/// Let spawned telemetry tasks run before inspecting a sink.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
