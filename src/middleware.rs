//! Tower integration.
//!
//! [`RateGateLayer`] puts a [`RateGate`] in front of any service: each request waits for
//! admission, then is forwarded exactly once. The layer doesn't know what the inner service
//! does, only that it must not be called without an admission.

use crate::error::GateError;
use crate::gate::RateGate;
use crate::telemetry::GateEvent;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that gates requests through a shared [`RateGate`].
#[derive(Clone, Debug)]
pub struct RateGateLayer<K> {
    gate: RateGate<K>,
}

impl<K> RateGateLayer<K> {
    /// Create a layer; clones of the layer and of its services share `gate`.
    pub fn new(gate: RateGate<K>) -> Self {
        Self { gate }
    }
}

impl<S, K: Clone> Layer<S> for RateGateLayer<K> {
    type Service = RateGateService<S, K>;

    fn layer(&self, service: S) -> Self::Service {
        RateGateService { inner: service, gate: self.gate.clone() }
    }
}

/// Middleware service that waits for admission before calling `inner`.
#[derive(Clone, Debug)]
pub struct RateGateService<S, K> {
    inner: S,
    gate: RateGate<K>,
}

impl<S, K, Req> Service<Req> for RateGateService<S, K>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    K: Service<GateEvent, Response = ()> + Clone + Send + Sync + 'static,
    K::Error: std::error::Error + Send + 'static,
    K::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = GateError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(GateError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let gate = self.gate.clone();
        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            gate.acquire().await;
            inner.call(req).await.map_err(GateError::Inner)
        })
    }
}
