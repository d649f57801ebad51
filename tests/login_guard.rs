use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use login_guard::config::GuardConfig;
use login_guard::guard::LoginGuard;
use login_guard::models::ThrottleResponse;
use login_guard::rate_limit::AttemptStore;
use login_guard::router::build_router;
use login_guard::state::AppState;
use login_guard::upstream::Upstream;
use login_guard::{ClientKey, ProxyTrust};

// Stub authentication backend: rejects every credential with 401
async fn spawn_upstream() -> String {
    async fn reject(body: String) -> impl IntoResponse {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "echo": body })),
        )
    }

    let app = Router::new().route("/login", post(reject));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn gateway(upstream_url: &str, config: GuardConfig) -> (Router, Arc<AttemptStore>) {
    let store = Arc::new(AttemptStore::new());
    let state = Arc::new(AppState {
        guard: LoginGuard::new(Arc::clone(&store), config),
        upstream: Upstream::new(reqwest::Client::new(), upstream_url, "/login"),
        login_path: "/login".to_string(),
    });
    (build_router(state), store)
}

fn small_config() -> GuardConfig {
    GuardConfig {
        max_attempts: 3,
        window: Duration::from_secs(60),
        ..GuardConfig::default()
    }
}

fn login_request(xff: Option<&str>, email: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(xff) = xff {
        builder = builder.header("x-forwarded-for", xff);
    }
    let body = serde_json::json!({ "email": email, "password": "hunter2" }).to_string();
    let mut req = builder.body(Body::from(body)).unwrap();
    let peer: SocketAddr = "10.0.0.1:52000".parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(peer));
    req
}

#[tokio::test]
async fn allowed_attempts_reach_upstream_with_body_intact() {
    let upstream = spawn_upstream().await;
    let (app, _) = gateway(&upstream, small_config());

    let res = app
        .oneshot(login_request(Some("203.0.113.5"), "alice@example.com"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["echo"].as_str().unwrap().contains("alice@example.com"));
}

#[tokio::test]
async fn exceeding_quota_returns_429_with_retry_after() {
    let upstream = spawn_upstream().await;
    let (app, _) = gateway(&upstream, small_config());

    for _ in 0..3 {
        let res = app
            .clone()
            .oneshot(login_request(Some("203.0.113.5"), "alice@example.com"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    let res = app
        .clone()
        .oneshot(login_request(Some("203.0.113.5"), "ALICE@example.com "))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = res.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((59..=60).contains(&retry_after));

    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let throttle: ThrottleResponse = serde_json::from_slice(&body).unwrap();
    assert!(!throttle.message.is_empty());
    assert!(throttle.retry_after_ms > 0 && throttle.retry_after_ms <= 60_000);
}

#[tokio::test]
async fn other_clients_keep_their_own_quota() {
    let upstream = spawn_upstream().await;
    let (app, store) = gateway(&upstream, small_config());

    for _ in 0..4 {
        app.clone()
            .oneshot(login_request(Some("203.0.113.5"), "alice@example.com"))
            .await
            .unwrap();
    }

    let res = app
        .clone()
        .oneshot(login_request(Some("203.0.113.6"), "alice@example.com"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .clone()
        .oneshot(login_request(Some("203.0.113.5"), "bob@example.com"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn peer_address_is_used_without_forwarded_header() {
    let upstream = spawn_upstream().await;
    let (app, store) = gateway(&upstream, small_config());

    app.oneshot(login_request(None, "alice@example.com"))
        .await
        .unwrap();

    let key = ClientKey::new("10.0.0.1", "alice@example.com");
    assert_eq!(store.record(&key).unwrap().count, 1);
}

#[tokio::test]
async fn strict_proxy_mode_ignores_spoofed_left_entries() {
    let upstream = spawn_upstream().await;
    let config = GuardConfig {
        proxy_trust: ProxyTrust::Hops(1),
        ..small_config()
    };
    let (app, store) = gateway(&upstream, config);

    // rotating the spoofed left-most entry must not buy fresh quota
    for i in 0..4 {
        let xff = format!("6.6.6.{}, 203.0.113.5", i);
        let res = app
            .clone()
            .oneshot(login_request(Some(&xff), "alice@example.com"))
            .await
            .unwrap();
        let expected = if i < 3 {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::TOO_MANY_REQUESTS
        };
        assert_eq!(res.status(), expected);
    }
    assert_eq!(store.len(), 1);
}

// Each entry becomes its own X-Forwarded-For header line
fn login_request_with_lines(lines: &[&str], email: &str) -> Request<Body> {
    let mut req = login_request(None, email);
    for line in lines {
        req.headers_mut().append("x-forwarded-for", line.parse().unwrap());
    }
    req
}

#[tokio::test]
async fn strict_proxy_mode_reads_every_forwarded_line() {
    let upstream = spawn_upstream().await;
    let config = GuardConfig {
        proxy_trust: ProxyTrust::Hops(1),
        ..small_config()
    };
    let (app, store) = gateway(&upstream, config);

    // client-written line first, our proxy's line second
    let mut throttled = 0;
    for i in 0..10 {
        let spoofed = format!("6.6.6.{}", i);
        let res = app
            .clone()
            .oneshot(login_request_with_lines(
                &[&spoofed, "203.0.113.5"],
                "alice@example.com",
            ))
            .await
            .unwrap();
        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            throttled += 1;
        }
    }

    assert_eq!(throttled, 7);
    assert_eq!(store.len(), 1);
    let key = ClientKey::new("203.0.113.5", "alice@example.com");
    assert_eq!(store.record(&key).unwrap().count, 3);
}

#[tokio::test]
async fn left_most_mode_uses_first_entry_across_lines() {
    let upstream = spawn_upstream().await;
    let (app, store) = gateway(&upstream, small_config());

    app.oneshot(login_request_with_lines(
        &["198.51.100.9, 198.51.100.10", "203.0.113.5"],
        "alice@example.com",
    ))
    .await
    .unwrap();

    assert_eq!(store.len(), 1);
    let key = ClientKey::new("198.51.100.9", "alice@example.com");
    assert_eq!(store.record(&key).unwrap().count, 1);
}

#[tokio::test]
async fn wrong_method_is_not_counted_as_an_attempt() {
    let upstream = spawn_upstream().await;
    let (app, store) = gateway(&upstream, small_config());

    let mut req = Request::builder()
        .method("GET")
        .uri("/login")
        .header("x-forwarded-for", "203.0.113.5")
        .body(Body::empty())
        .unwrap();
    let peer: SocketAddr = "10.0.0.1:52000".parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(peer));

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(store.is_empty());
}

#[tokio::test]
async fn unreachable_upstream_is_a_gateway_error() {
    // nothing listens on the discard port
    let (app, _) = gateway("http://127.0.0.1:9", small_config());

    let res = app
        .oneshot(login_request(Some("203.0.113.5"), "alice@example.com"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn oversized_login_body_is_refused() {
    let upstream = spawn_upstream().await;
    let (app, store) = gateway(&upstream, small_config());

    let req = Request::builder()
        .method("POST")
        .uri("/login")
        .body(Body::from(vec![b'a'; 128 * 1024]))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(store.is_empty());
}

#[tokio::test]
async fn health_and_metrics_are_served() {
    let (app, _) = gateway("http://127.0.0.1:9", small_config());

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_exceed_quota() {
    let upstream = spawn_upstream().await;
    let (app, _) = gateway(&upstream, small_config());

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                app.oneshot(login_request(Some("203.0.113.5"), "alice@example.com"))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut passed = 0;
    for h in handles {
        if h.await.unwrap() != StatusCode::TOO_MANY_REQUESTS {
            passed += 1;
        }
    }
    assert_eq!(passed, 3);
}
