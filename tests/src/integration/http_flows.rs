//! # HTTP Enforcement Flows
//!
//! An axum router behind `AbuseGuardLayer`, driven request by request:
//!
//! 1. Failed logins accumulate until the client is rejected with 403
//! 2. Blocks expire on the clock alone and escalate on re-offense
//! 3. Operator endpoints read stats and lift blocks
//! 4. A real listener resolves clients from the TCP peer address

#[cfg(test)]
mod tests {
    use super::super::fixtures::{fixture, Fixture};
    use abuse_guard::{
        AbuseGuardApi, AbuseGuardLayer, AbuseGuardService, AuthSignal, ClientKey, FailureReason,
        GuardConfig,
    };
    use axum::{
        body::Body,
        extract::{Path, State},
        http::{header, Request, StatusCode},
        response::IntoResponse,
        routing::{delete, get, post},
        Extension, Json, Router,
    };
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    const MINUTE: Duration = Duration::from_secs(60);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn login(req: Request<Body>) -> impl IntoResponse {
        let password = req
            .headers()
            .get("x-password")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if password == "correct horse" {
            (StatusCode::OK, Extension(AuthSignal::Succeeded)).into_response()
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Extension(AuthSignal::Failed),
                Extension(FailureReason("invalid credentials".into())),
            )
                .into_response()
        }
    }

    async fn stats(State(guard): State<Arc<AbuseGuardService>>) -> impl IntoResponse {
        Json(guard.get_stats())
    }

    async fn unblock(
        State(guard): State<Arc<AbuseGuardService>>,
        Path(ip): Path<String>,
    ) -> StatusCode {
        if guard.unblock(&ClientKey::ip(ip)) {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::NOT_FOUND
        }
    }

    fn router(guard: Arc<AbuseGuardService>) -> Router {
        let admin = Router::new()
            .route("/admin/stats", get(stats))
            .route("/admin/blocks/:ip", delete(unblock))
            .with_state(Arc::clone(&guard));

        Router::new()
            .route("/login", post(login))
            .route("/health", get(|| async { "ok" }))
            .layer(AbuseGuardLayer::new(guard))
            .merge(admin)
    }

    fn login_from(ip: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("x-forwarded-for", format!("{ip}, 10.0.0.1"))
            .header("x-password", password)
            .body(Body::empty())
            .unwrap()
    }

    async fn status(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>) {
        let response = app.clone().oneshot(req).await.unwrap();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        (response.status(), retry_after)
    }

    async fn json(app: &Router, req: Request<Body>) -> serde_json::Value {
        let response = app.clone().oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn production_like() -> GuardConfig {
        GuardConfig {
            max_failed_attempts: 10,
            failure_window: 15 * MINUTE,
            initial_block_duration: 15 * MINUTE,
            max_block_duration: 24 * 60 * MINUTE,
            ..GuardConfig::default()
        }
    }

    // =============================================================================
    // BRUTE FORCE LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_brute_force_is_blocked_then_escalated() {
        let Fixture { guard, clock, audit } = fixture(production_like());
        let app = router(Arc::clone(&guard));

        for _ in 0..10 {
            let (code, _) = status(&app, login_from("198.51.100.4", "guess")).await;
            assert_eq!(code, StatusCode::UNAUTHORIZED);
        }

        let (code, retry) = status(&app, login_from("198.51.100.4", "guess")).await;
        assert_eq!(code, StatusCode::FORBIDDEN);
        assert_eq!(retry.as_deref(), Some("900"));

        // The right password does not help while blocked
        let (code, _) = status(&app, login_from("198.51.100.4", "correct horse")).await;
        assert_eq!(code, StatusCode::FORBIDDEN);

        // Block ends on its own
        clock.advance(16 * MINUTE);
        let (code, _) = status(&app, login_from("198.51.100.4", "guess")).await;
        assert_eq!(code, StatusCode::UNAUTHORIZED);

        for _ in 0..9 {
            status(&app, login_from("198.51.100.4", "guess")).await;
        }
        let (code, retry) = status(&app, login_from("198.51.100.4", "guess")).await;
        assert_eq!(code, StatusCode::FORBIDDEN);
        assert_eq!(retry.as_deref(), Some("1800"));

        let events = audit.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].block_duration_ms, 15 * 60 * 1000);
        assert_eq!(events[1].block_duration_ms, 30 * 60 * 1000);
        assert_eq!(events[1].reason, "invalid credentials");
    }

    #[tokio::test]
    async fn test_success_before_threshold_resets_counter() {
        let Fixture { guard, .. } = fixture(production_like());
        let app = router(Arc::clone(&guard));

        for _ in 0..9 {
            status(&app, login_from("198.51.100.4", "guess")).await;
        }
        let (code, _) = status(&app, login_from("198.51.100.4", "correct horse")).await;
        assert_eq!(code, StatusCode::OK);

        for _ in 0..9 {
            let (code, _) = status(&app, login_from("198.51.100.4", "guess")).await;
            assert_eq!(code, StatusCode::UNAUTHORIZED);
        }
        assert!(!guard.is_blocked(&ClientKey::ip("198.51.100.4")));
    }

    #[tokio::test]
    async fn test_blocked_client_does_not_affect_neighbours() {
        let Fixture { guard, .. } = fixture(GuardConfig::for_testing());
        let app = router(guard);

        for _ in 0..3 {
            status(&app, login_from("198.51.100.4", "guess")).await;
        }

        let health = |ip: &str| {
            Request::builder()
                .uri("/health")
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap()
        };
        assert_eq!(
            status(&app, health("198.51.100.4")).await.0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(status(&app, health("198.51.100.5")).await.0, StatusCode::OK);
    }

    // =============================================================================
    // OPERATOR ENDPOINTS
    // =============================================================================

    #[tokio::test]
    async fn test_stats_and_manual_unblock() {
        let Fixture { guard, .. } = fixture(GuardConfig::for_testing());
        let app = router(guard);

        for _ in 0..3 {
            status(&app, login_from("198.51.100.4", "guess")).await;
        }
        status(&app, login_from("198.51.100.9", "guess")).await;

        let stats = json(
            &app,
            Request::builder()
                .uri("/admin/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(stats["totalTracked"], 2);
        assert_eq!(stats["blockedCount"], 1);
        assert_eq!(stats["perClient"][0]["key"], "198.51.100.4");
        assert_eq!(stats["perClient"][0]["blocked"], true);
        assert_eq!(stats["perClient"][1]["failureCount"], 1);

        let unblock = |ip: &str| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/admin/blocks/{ip}"))
                .body(Body::empty())
                .unwrap()
        };
        assert_eq!(
            status(&app, unblock("198.51.100.4")).await.0,
            StatusCode::NO_CONTENT
        );
        assert_eq!(
            status(&app, unblock("198.51.100.4")).await.0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(&app, login_from("198.51.100.4", "guess")).await.0,
            StatusCode::UNAUTHORIZED
        );
    }

    // =============================================================================
    // REAL LISTENER
    // =============================================================================

    async fn raw_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_peer_address_is_the_key_without_proxy_header() {
        let guard = Arc::new(AbuseGuardService::new(GuardConfig::for_testing()).unwrap());
        let app = Router::new()
            .route("/login", get(|| async { StatusCode::UNAUTHORIZED }))
            .layer(AbuseGuardLayer::new(Arc::clone(&guard)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
        });

        for _ in 0..3 {
            let response = raw_get(addr, "/login").await;
            assert!(response.starts_with("HTTP/1.1 401"), "{response}");
        }
        let response = raw_get(addr, "/login").await;
        assert!(response.starts_with("HTTP/1.1 403"), "{response}");
        assert!(response.contains("CLIENT_BLOCKED"));

        assert!(guard.is_blocked(&ClientKey::ip("127.0.0.1")));
        server.abort();
    }
}
