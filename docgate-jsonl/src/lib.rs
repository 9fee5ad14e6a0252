//! JSONL sink for `docgate`. Appends one gate event per line.
//!
//! ```no_run
//! use docgate::RateGate;
//! use docgate_jsonl::JsonlSink;
//! use std::time::Duration;
//!
//! let gate = RateGate::new(Duration::from_secs(60), 8)
//!     .unwrap()
//!     .with_sink(JsonlSink::new("/var/log/docgate/events.jsonl"));
//! ```

use docgate::telemetry::{GateEvent, TelemetrySink};
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

#[derive(Clone, Debug)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl tower_service::Service<GateEvent> for JsonlSink {
    type Response = ();
    type Error = io::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: GateEvent) -> Self::Future {
        let path = self.path.clone();
        let line = event.to_json().to_string() + "\n";
        Box::pin(async move {
            use tokio::io::AsyncWriteExt;
            let mut file =
                tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
            if let Err(e) = file.write_all(line.as_bytes()).await {
                tracing::warn!(path = %path.display(), error = %e, "jsonl sink write failed");
                return Err(e);
            }
            file.flush().await?;
            Ok(())
        })
    }
}

impl TelemetrySink for JsonlSink {
    type SinkError = io::Error;
}
