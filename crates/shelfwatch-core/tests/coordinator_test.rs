#![allow(clippy::unwrap_used)]
// Integration tests for `Coordinator` against a wiremock server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelfwatch_api::ApiClient;
use shelfwatch_core::{
    Coordinator, CoreError, FailureKind, FieldData, FieldValue, ServerConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

const TOKEN: &str = "coordinator-token";

fn coordinator(server: &MockServer, timeout: Duration) -> Coordinator {
    polling_coordinator(server, timeout, Duration::from_secs(3600))
}

fn polling_coordinator(server: &MockServer, timeout: Duration, interval: Duration) -> Coordinator {
    let url = Url::parse(&server.uri()).unwrap();
    let token = SecretString::from(TOKEN.to_string());
    let mut config = ServerConfig::new(url.clone(), token.clone());
    config.scan_interval = interval;
    config.timeout = timeout;
    let client = ApiClient::with_client(reqwest::Client::new(), url, token, timeout);
    Coordinator::with_client(config, client).unwrap()
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_healthy(server: &MockServer) {
    mount_json(server, "/ping", json!({ "success": true })).await;
    mount_json(
        server,
        "/api/users",
        json!({
            "users": [
                { "username": "hass", "isActive": true },
                { "username": "alice", "isActive": true, "token": "alice-token" },
                { "username": "bob", "isActive": true, "token": TOKEN },
                { "username": "carol", "isActive": false }
            ]
        }),
    )
    .await;
    mount_json(
        server,
        "/api/users/online",
        json!({ "usersOnline": [], "openSessions": [{ "id": "s1" }] }),
    )
    .await;
    mount_json(
        server,
        "/api/libraries",
        json!({
            "libraries": [
                { "id": "lib1", "name": "Books", "mediaType": "book" },
                { "id": "lib2", "name": "Podcasts", "mediaType": "podcast" }
            ]
        }),
    )
    .await;
    mount_json(
        server,
        "/api/libraries/lib1/stats",
        json!({
            "totalItems": 10,
            "totalSize": 2_147_483_648_u64,
            "totalDuration": 3600.0,
            "totalAuthors": 4
        }),
    )
    .await;
    mount_json(
        server,
        "/api/libraries/lib2/stats",
        json!({ "totalItems": 3, "totalSize": 1024, "numAudioTracks": 30 }),
    )
    .await;
}

const EXPANDED_FIELDS: [&str; 11] = [
    "connectivity",
    "active_users",
    "open_sessions",
    "library_count",
    "library_stats",
    "library_lib1_size",
    "library_lib1_items",
    "library_lib1_duration",
    "library_lib2_size",
    "library_lib2_items",
    "library_lib2_duration",
];

// ── Cycle results ───────────────────────────────────────────────────

#[tokio::test]
async fn test_snapshot_has_exactly_the_configured_fields() {
    let server = MockServer::start().await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    coord.load_libraries().await.unwrap();
    coord.refresh().await.unwrap();

    let snap = coord.get_snapshot();
    let keys: Vec<&str> = snap.keys().collect();
    assert_eq!(keys, EXPANDED_FIELDS);
    assert_eq!(coord.field_keys(), EXPANDED_FIELDS);
    assert!(coord.last_update_success());
    assert!(snap.is_connected());

    assert_eq!(snap.count("active_users"), Some(1));
    assert_eq!(snap.count("open_sessions"), Some(1));
    assert_eq!(snap.count("library_count"), Some(2));
    assert_eq!(
        snap.get("library_lib1_size").and_then(FieldValue::data),
        Some(&FieldData::Bytes(2_147_483_648))
    );
    assert_eq!(
        snap.get("library_lib1_duration").and_then(FieldValue::data),
        Some(&FieldData::Seconds(3600.0))
    );

    let Some(FieldData::Libraries(all)) = snap.get("library_stats").and_then(FieldValue::data)
    else {
        panic!("library_stats should hold per-library totals");
    };
    assert_eq!(all["lib1"].total_authors, Some(4));
    assert_eq!(all["lib2"].total_tracks, Some(30));
}

#[tokio::test]
async fn test_static_fields_without_library_list() {
    let server = MockServer::start().await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    coord.refresh().await.unwrap();

    let snap = coord.get_snapshot();
    assert_eq!(snap.fields.len(), 5);
    let Some(FieldData::Libraries(all)) = snap.get("library_stats").and_then(FieldValue::data)
    else {
        panic!("library_stats should follow the live library list");
    };
    assert_eq!(all.len(), 2);
    assert!(coord.known_libraries().is_empty());
}

#[tokio::test]
async fn test_timeout_is_isolated_to_one_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/online"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "openSessions": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_millis(300));

    coord.refresh().await.unwrap();

    let snap = coord.get_snapshot();
    let failed: Vec<(&str, Option<FailureKind>)> = snap
        .failed_fields()
        .map(|(k, v)| (k, v.failure_kind()))
        .collect();
    assert_eq!(failed, vec![("open_sessions", Some(FailureKind::Timeout))]);
    assert_eq!(snap.ok_count(), 4);
    assert_eq!(coord.field_success("open_sessions"), Some(false));
    assert_eq!(coord.field_success("active_users"), Some(true));
    assert_eq!(coord.field_success("no_such_field"), None);
    // Transient failures alone do not fail the cycle.
    assert!(coord.last_update_success());
}

#[tokio::test]
async fn test_parse_error_is_recorded_not_raised() {
    let server = MockServer::start().await;
    mount_json(&server, "/api/users", json!({ "users": "not-a-list" })).await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    coord.refresh().await.unwrap();

    let snap = coord.get_snapshot();
    assert_eq!(
        snap.get("active_users").and_then(FieldValue::failure_kind),
        Some(FailureKind::ParseError)
    );
    assert_eq!(snap.ok_count(), 4);
    assert!(!coord.last_update_success());
}

#[tokio::test]
async fn test_error_objects_with_ok_status_are_parse_errors() {
    let server = MockServer::start().await;
    mount_json(&server, "/ping", json!({ "error": "nope" })).await;
    mount_json(&server, "/api/users", json!({})).await;
    mount_json(&server, "/api/users/online", json!([])).await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    coord.refresh().await.unwrap();

    let snap = coord.get_snapshot();
    for field in ["connectivity", "active_users", "open_sessions"] {
        assert_eq!(
            snap.get(field).and_then(FieldValue::failure_kind),
            Some(FailureKind::ParseError),
            "{field}"
        );
    }
    assert_eq!(snap.count("library_count"), Some(2));
    assert!(!coord.last_update_success());
}

#[tokio::test]
async fn test_missing_library_list_is_parse_error() {
    let server = MockServer::start().await;
    mount_json(&server, "/api/libraries", json!({})).await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    coord.refresh().await.unwrap();

    let snap = coord.get_snapshot();
    for field in ["library_count", "library_stats"] {
        assert_eq!(
            snap.get(field).and_then(FieldValue::failure_kind),
            Some(FailureKind::ParseError),
            "{field}"
        );
    }
}

#[tokio::test]
async fn test_failing_library_list_spares_expanded_fields() {
    let server = MockServer::start().await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));
    coord.load_libraries().await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/libraries"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_healthy(&server).await;
    coord.refresh().await.unwrap();

    let snap = coord.get_snapshot();
    for field in ["library_count", "library_stats"] {
        assert_eq!(
            snap.get(field).and_then(FieldValue::failure_kind),
            Some(FailureKind::HttpStatusError),
            "{field}"
        );
    }
    // Expanded fields read their own stats endpoint, not the live list.
    for field in &EXPANDED_FIELDS[5..] {
        assert_eq!(coord.field_success(field), Some(true), "{field}");
    }
    assert_eq!(
        snap.get("library_lib1_items").and_then(FieldValue::data),
        Some(&FieldData::Count(10))
    );
}

// ── Readiness and retention ─────────────────────────────────────────

#[tokio::test]
async fn test_total_failure_on_first_cycle_is_not_ready() {
    let server = MockServer::start().await;
    let coord = coordinator(&server, Duration::from_secs(2));

    let err = coord.setup().await.unwrap_err();
    assert!(matches!(err, CoreError::NotReady { .. }), "got {err:?}");
    assert!(err.is_retryable());

    let snap = coord.get_snapshot();
    assert_eq!(snap.fields.len(), 5);
    assert_eq!(snap.ok_count(), 0);
    assert_eq!(
        snap.get("connectivity").and_then(FieldValue::failure_kind),
        Some(FailureKind::HttpStatusError)
    );
    assert!(!coord.last_update_success());
}

#[tokio::test]
async fn test_total_failure_after_success_keeps_last_known_values() {
    let server = MockServer::start().await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    coord.load_libraries().await.unwrap();
    coord.refresh().await.unwrap();
    assert!(coord.last_update_success());

    server.reset().await;
    coord.refresh().await.unwrap();

    let snap = coord.get_snapshot();
    assert_eq!(snap.fields.len(), EXPANDED_FIELDS.len());
    assert_eq!(snap.ok_count(), 0);
    assert!(!coord.last_update_success());
    assert_eq!(coord.field_success("active_users"), Some(false));

    let users = snap.get("active_users").unwrap();
    assert_eq!(users.data(), None);
    assert_eq!(users.latest(), Some(&FieldData::Count(1)));
    assert_eq!(
        snap.get("library_lib1_size").and_then(FieldValue::latest),
        Some(&FieldData::Bytes(2_147_483_648))
    );
}

#[tokio::test]
async fn test_unknown_failure_aborts_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/ping"))
        .mount(&server)
        .await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    coord.add_listener(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let err = coord.refresh().await.unwrap_err();
    match err {
        CoreError::Unexpected { field, source } => {
            assert_eq!(field, "connectivity");
            assert_eq!(source.kind(), FailureKind::UnknownFailure);
        }
        other => panic!("expected Unexpected, got {other:?}"),
    }
    assert!(coord.get_snapshot().is_empty());
    assert!(!coord.last_update_success());
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(coord.cycles_completed(), 0);
}

// ── Descriptor expansion ────────────────────────────────────────────

#[tokio::test]
async fn test_repeated_library_expansion_adds_no_duplicates() {
    let server = MockServer::start().await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    let first = coord.load_libraries().await.unwrap();
    let second = coord.load_libraries().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(coord.known_libraries().len(), 2);

    coord.refresh().await.unwrap();
    assert_eq!(coord.get_snapshot().fields.len(), EXPANDED_FIELDS.len());
}

#[tokio::test]
async fn test_library_stats_fetched_once_per_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/libraries/lib1/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totalItems": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/libraries/lib2/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totalItems": 2 })))
        .expect(1)
        .mount(&server)
        .await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    coord.load_libraries().await.unwrap();
    coord.refresh().await.unwrap();

    assert_eq!(coord.get_snapshot().count("library_lib2_items"), Some(2));
    server.verify().await;
}

// ── Listeners and scheduling ────────────────────────────────────────

#[tokio::test]
async fn test_listeners_fire_once_per_cycle() {
    let server = MockServer::start().await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let id = coord.add_listener(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    coord.refresh().await.unwrap();
    coord.refresh().await.unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);

    assert!(coord.remove_listener(id));
    assert!(!coord.remove_listener(id));
    coord.refresh().await.unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
    assert_eq!(coord.cycles_completed(), 3);
}

#[tokio::test]
async fn test_subscribers_see_published_snapshot() {
    let server = MockServer::start().await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));
    let mut rx = coord.subscribe();

    coord.refresh().await.unwrap();

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().count("library_count"), Some(2));
}

#[tokio::test]
async fn test_request_refresh_coalesces_with_running_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    let running = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    coord.request_refresh().await.unwrap();
    running.await.unwrap().unwrap();

    assert_eq!(coord.cycles_completed(), 1);
}

#[tokio::test]
async fn test_setup_starts_polling_and_shutdown_stops_it() {
    let server = MockServer::start().await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    coord.setup().await.unwrap();
    assert_eq!(coord.get_snapshot().fields.len(), EXPANDED_FIELDS.len());
    // A second start is a no-op.
    coord.start().await.unwrap();

    coord.shutdown().await;
    assert!(coord.is_shut_down());
    assert!(matches!(coord.refresh().await, Err(CoreError::Shutdown)));
    assert!(matches!(coord.start().await, Err(CoreError::Shutdown)));
    assert_eq!(coord.cycles_completed(), 1);
}

#[tokio::test]
async fn test_shutdown_drops_in_flight_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    mount_healthy(&server).await;
    let coord = coordinator(&server, Duration::from_secs(2));

    let running = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    coord.shutdown().await;

    assert!(matches!(running.await.unwrap(), Err(CoreError::Shutdown)));
    assert!(coord.get_snapshot().is_empty());
    assert_eq!(coord.cycles_completed(), 0);
}

#[test]
fn test_zero_interval_is_rejected() {
    let url = Url::parse("http://127.0.0.1:1").unwrap();
    let mut config = ServerConfig::new(url, SecretString::from(TOKEN.to_string()));
    config.scan_interval = Duration::ZERO;
    assert!(matches!(
        Coordinator::new(config),
        Err(CoreError::Config { .. })
    ));
}

// ── Periodic task ───────────────────────────────────────────────────

fn ping_requests(requests: &[wiremock::Request]) -> usize {
    requests.iter().filter(|r| r.url.path() == "/ping").count()
}

#[tokio::test]
async fn test_periodic_cycles_count_completions_not_ticks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_healthy(&server).await;
    let coord = polling_coordinator(&server, Duration::from_secs(2), Duration::from_millis(100));

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    coord.add_listener(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    coord.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    coord.shutdown().await;

    // Fifteen ticks elapsed, but each cycle takes three of them.
    let cycles = coord.cycles_completed();
    assert!((2..=5).contains(&cycles), "cycles: {cycles}");
    assert_eq!(fired.load(Ordering::SeqCst), usize::try_from(cycles).unwrap());

    let pings = ping_requests(&server.received_requests().await.unwrap());
    assert!(pings <= 6, "pings: {pings}");
}

#[tokio::test]
async fn test_tick_during_running_cycle_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_millis(1000)),
        )
        .mount(&server)
        .await;
    mount_healthy(&server).await;
    let coord = polling_coordinator(&server, Duration::from_secs(3), Duration::from_millis(700));

    // The manual cycle holds the gate through the tick at 700 ms.
    coord.start().await.unwrap();
    let manual = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.refresh().await })
    };
    manual.await.unwrap().unwrap();
    assert_eq!(coord.cycles_completed(), 1);

    // A queued tick would have started as soon as the gate was released.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let pings = ping_requests(&server.received_requests().await.unwrap());
    assert_eq!(pings, 1);

    coord.shutdown().await;
}
