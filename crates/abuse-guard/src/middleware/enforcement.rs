//! Enforcement middleware.
//!
//! Resolves the caller, rejects blocked clients with `403` before the
//! handler runs, then feeds the handler's result back into the guard.
//!
//! Handlers can be explicit about authentication by attaching response
//! extensions:
//!
//! ```ignore
//! use abuse_guard::middleware::{AuthSignal, FailureReason};
//! use axum::{http::StatusCode, Extension};
//!
//! async fn login() -> impl axum::response::IntoResponse {
//!     (
//!         StatusCode::UNAUTHORIZED,
//!         Extension(AuthSignal::Failed),
//!         Extension(FailureReason("bad password".into())),
//!     )
//! }
//! ```

use super::identity::connection_info;
use crate::domain::{BlockedError, Outcome};
use crate::ports::AbuseGuardApi;
use crate::service::AbuseGuardService;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

/// Response extension: the handler's verdict on the presented credentials.
/// Overrides status-based classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSignal {
    Succeeded,
    Failed,
}

/// Response extension: reason recorded with a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason(pub String);

impl IntoResponse for BlockedError {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self.to_payload()).unwrap_or_default();
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = StatusCode::FORBIDDEN;

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from(self.retry_after_secs()),
        );
        response
    }
}

/// Abuse guard layer
#[derive(Clone)]
pub struct AbuseGuardLayer {
    guard: Arc<AbuseGuardService>,
}

impl AbuseGuardLayer {
    pub fn new(guard: Arc<AbuseGuardService>) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> Arc<AbuseGuardService> {
        Arc::clone(&self.guard)
    }
}

impl<S> Layer<S> for AbuseGuardLayer {
    type Service = AbuseGuardMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AbuseGuardMiddleware {
            inner,
            guard: Arc::clone(&self.guard),
        }
    }
}

/// Abuse guard service
#[derive(Clone)]
pub struct AbuseGuardMiddleware<S> {
    inner: S,
    guard: Arc<AbuseGuardService>,
}

impl<S> Service<Request<Body>> for AbuseGuardMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let guard = Arc::clone(&self.guard);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let info = connection_info(&req, &guard.resolver().config().header);
            let key = guard.resolver().resolve(&info);

            if let Err(blocked) = guard.check(&key) {
                warn!(
                    client_key = %key,
                    path = %req.uri().path(),
                    retry_after_secs = blocked.retry_after_secs(),
                    "Rejected request from blocked client"
                );
                return Ok(blocked.into_response());
            }

            let authenticated = info.authenticated_user.is_some();
            let response = inner.call(req).await?;

            let signal = response
                .extensions()
                .get::<AuthSignal>()
                .map(|signal| *signal == AuthSignal::Succeeded);
            let reason = response
                .extensions()
                .get::<FailureReason>()
                .map(|reason| reason.0.clone());
            let outcome = Outcome::from_status(response.status().as_u16(), signal, authenticated);

            guard.on_outcome(&key, outcome, reason.as_deref());
            Ok(response)
        })
    }
}
