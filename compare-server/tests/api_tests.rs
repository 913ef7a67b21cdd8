//! Integration tests for compare-server API endpoints
//!
//! Tests cover:
//! - Health endpoint (no session required)
//! - Session and token verification ahead of every list action
//! - Add / remove / clear semantics and the capacity limit
//! - Matrix projection, including unresolvable products
//! - Guest lists merged at login and dropped at logout

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use compare_common::config::{set_setting, TomlConfig, SETTING_ATTRIBUTES, SETTING_TABLE_STYLE};
use compare_common::db::{init_database, users};
use compare_common::{CatalogItem, CatalogLookup, ItemId, Owner};
use compare_server::{build_router, AppState, SESSION_HEADER};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// In-memory catalog; ids listed in `failing` return an error
struct StubCatalog {
    items: HashMap<u64, CatalogItem>,
    failing: Vec<u64>,
}

impl StubCatalog {
    fn new() -> Self {
        let mut items = HashMap::new();
        for (id, name, attrs) in [
            (1u64, "Espresso Machine", vec![("price", "$199"), ("sku", "EM-1")]),
            (2, "Grinder", vec![("price", "$89"), ("weight", "2 kg")]),
            (3, "Kettle", vec![("price", "$45")]),
            (4, "Scale", vec![("price", "$25")]),
            (5, "Tamper", vec![("price", "$15")]),
        ] {
            let id_value = ItemId::new(id as i64).unwrap();
            items.insert(
                id,
                CatalogItem {
                    id: id_value,
                    name: name.to_string(),
                    url: format!("/product/{}", id),
                    image_url: None,
                    attributes: attrs
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                },
            );
        }
        Self {
            items,
            failing: vec![7],
        }
    }
}

#[async_trait]
impl CatalogLookup for StubCatalog {
    async fn lookup(&self, id: ItemId) -> compare_common::Result<Option<CatalogItem>> {
        if self.failing.contains(&id.get()) {
            return Err(compare_common::Error::Internal("catalog offline".to_string()));
        }
        Ok(self.items.get(&id.get()).cloned())
    }
}

struct TestApp {
    app: Router,
    state: AppState,
    _dir: TempDir,
}

/// Test helper: fresh database and router with the given TOML config
async fn setup_app(toml: &str) -> TestApp {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("compare.db")).await.unwrap();
    let config = TomlConfig::from_toml_str(toml).unwrap();
    let state = AppState::with_catalog(pool, config, Arc::new(StubCatalog::new()));

    TestApp {
        app: build_router(state.clone()),
        state,
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Should parse JSON")
        };
        (status, body)
    }

    async fn post(&self, uri: &str, session_id: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(sid) = session_id {
            builder = builder.header(SESSION_HEADER, sid);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Start a session, returning (session_id, token)
    async fn new_session(&self) -> (String, String) {
        let (status, body) = self.post("/api/session", None, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        (
            body["session_id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Create an account and log a fresh session in to it
    async fn logged_in(&self, username: &str, role: &str) -> (String, String, String) {
        let user = users::create_user(&self.state.db, username, "secret", role)
            .await
            .unwrap();
        let (sid, token) = self.new_session().await;
        let (status, _) = self
            .post(
                "/api/session/login",
                Some(&sid),
                json!({"token": token, "username": username, "password": "secret"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        (sid, token, user.guid)
    }

    async fn list_of(&self, owner: &Owner) -> Vec<u64> {
        self.state
            .store
            .get(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|id| id.get())
            .collect()
    }
}

fn assert_reason(body: &Value, reason: &str) {
    assert_eq!(body["error"]["reason"], reason, "unexpected body: {}", body);
    assert!(body["error"]["message"].is_string());
}

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_session_required() {
    let t = setup_app("").await;
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = t.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "compare-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Authorization Tests
// =============================================================================

#[tokio::test]
async fn test_bad_token_rejected_without_mutation() {
    let t = setup_app("").await;
    let (sid, token, guid) = t.logged_in("alice", "customer").await;
    let owner = Owner::User(guid);

    let (status, _) = t
        .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": 1}))
        .await;
    assert_eq!(status, StatusCode::OK);

    for body in [
        json!({"token": "forged", "item_id": 2}),
        json!({"item_id": 2}),
        json!({"token": "", "item_id": 2}),
    ] {
        let (status, body) = t.post("/api/compare/add", Some(&sid), body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_reason(&body, "unauthorized");
    }

    let (status, _) = t
        .post("/api/compare/clear", Some(&sid), json!({"token": "forged"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(t.list_of(&owner).await, vec![1]);
}

#[tokio::test]
async fn test_missing_or_unknown_session_rejected() {
    let t = setup_app("").await;
    let (_, token) = t.new_session().await;

    let (status, body) = t
        .post("/api/compare/list", None, json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_reason(&body, "unauthorized");

    let (status, _) = t
        .post("/api/compare/list", Some("no-such-session"), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_body_is_unauthorized() {
    let t = setup_app("").await;
    let (sid, _, _) = t.logged_in("alice", "customer").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/compare/add")
        .header("content-type", "application/json")
        .header(SESSION_HEADER, &sid)
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = t.send(request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_reason(&body, "unauthorized");
}

#[tokio::test]
async fn test_expired_session_rejected() {
    let t = setup_app("session_timeout_seconds = 60\n").await;
    let (sid, token, guid) = t.logged_in("alice", "customer").await;

    sqlx::query("UPDATE sessions SET created_at = ? WHERE session_id = ?")
        .bind(Utc::now() - Duration::seconds(120))
        .bind(&sid)
        .execute(&t.state.db)
        .await
        .unwrap();

    let (status, _) = t
        .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": 1}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(t.list_of(&Owner::User(guid)).await.is_empty());
}

#[tokio::test]
async fn test_login_refused_for_role_without_read_capability() {
    let t = setup_app("allow_guest_compare = true\n").await;
    let user = users::create_user(&t.state.db, "mallory", "secret", "suspended")
        .await
        .unwrap();
    let account = Owner::User(user.guid.clone());

    let (sid, token) = t.new_session().await;
    let (status, _) = t
        .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": 3}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let guest = Owner::Anonymous(sid.clone());

    let (status, body) = t
        .post(
            "/api/session/login",
            Some(&sid),
            json!({"token": token, "username": "mallory", "password": "secret"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_reason(&body, "unauthorized");

    // Nothing merged, guest list intact, session still anonymous
    assert!(t.list_of(&account).await.is_empty());
    assert_eq!(t.list_of(&guest).await, vec![3]);
    let (status, body) = t
        .post("/api/compare/list", Some(&sid), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([3]));
}

#[tokio::test]
async fn test_anonymous_session_rejected_when_guest_compare_disabled() {
    let t = setup_app("").await;
    let (sid, token) = t.new_session().await;

    let (status, _) = t
        .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": 1}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(t.list_of(&Owner::Anonymous(sid)).await.is_empty());
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let t = setup_app("").await;
    users::create_user(&t.state.db, "alice", "secret", "customer")
        .await
        .unwrap();
    let (sid, token) = t.new_session().await;

    let (status, body) = t
        .post(
            "/api/session/login",
            Some(&sid),
            json!({"token": token, "username": "alice", "password": "wrong"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_reason(&body, "unauthorized");
}

// =============================================================================
// List Action Tests
// =============================================================================

#[tokio::test]
async fn test_add_until_capacity() {
    let t = setup_app("max_items = 3\n").await;
    let (sid, token, guid) = t.logged_in("alice", "customer").await;

    for (id, expected) in [(1, 1), (2, 2), (3, 3)] {
        let (status, body) = t
            .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": id}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product added to compare");
        assert_eq!(body["count"], expected);
    }

    let (status, body) = t
        .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": 4}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_reason(&body, "capacity_exceeded");
    assert_eq!(body["error"]["message"], "Maximum products reached (3 max)");

    assert_eq!(t.list_of(&Owner::User(guid)).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_add_is_idempotent_even_when_full() {
    let t = setup_app("max_items = 2\n").await;
    let (sid, token, guid) = t.logged_in("alice", "customer").await;

    for (id, expected) in [(1, 1), (2, 2), (2, 2), (1, 2)] {
        let (status, body) = t
            .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": id}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], expected);
    }

    assert_eq!(t.list_of(&Owner::User(guid)).await, vec![1, 2]);
}

#[tokio::test]
async fn test_numeric_string_item_id_accepted() {
    let t = setup_app("").await;
    let (sid, token, guid) = t.logged_in("alice", "customer").await;

    let (status, _) = t
        .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": "5"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.list_of(&Owner::User(guid)).await, vec![5]);
}

#[tokio::test]
async fn test_invalid_item_rejected_without_mutation() {
    let t = setup_app("").await;
    let (sid, token, guid) = t.logged_in("alice", "customer").await;

    for item in [json!(0), json!(-1), json!("abc"), json!(null), json!(1.5)] {
        let (status, body) = t
            .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": item}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "item_id {}", item);
        assert_reason(&body, "invalid_item");
    }

    let (status, body) = t
        .post("/api/compare/remove", Some(&sid), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_reason(&body, "invalid_item");

    assert!(t.list_of(&Owner::User(guid)).await.is_empty());
}

#[tokio::test]
async fn test_remove_and_clear() {
    let t = setup_app("").await;
    let (sid, token, guid) = t.logged_in("alice", "customer").await;
    let owner = Owner::User(guid);

    for id in [1, 2, 3] {
        t.post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": id}))
            .await;
    }

    let (status, body) = t
        .post("/api/compare/remove", Some(&sid), json!({"token": token, "item_id": 2}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product removed from compare");
    assert_eq!(body["count"], 2);
    assert_eq!(t.list_of(&owner).await, vec![1, 3]);

    // Absent item is not an error
    let (status, body) = t
        .post("/api/compare/remove", Some(&sid), json!({"token": token, "item_id": 9}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, body) = t
        .post("/api/compare/clear", Some(&sid), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comparison list cleared");
    assert_eq!(body["count"], 0);
    assert!(t.list_of(&owner).await.is_empty());
}

#[tokio::test]
async fn test_list_reports_items_and_capacity() {
    let t = setup_app("").await;
    let (sid, token, _) = t.logged_in("alice", "customer").await;

    for id in [3, 1] {
        t.post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": id}))
            .await;
    }

    let (status, body) = t
        .post("/api/compare/list", Some(&sid), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([3, 1]));
    assert_eq!(body["max_items"], 4);
}

// =============================================================================
// Matrix Tests
// =============================================================================

#[tokio::test]
async fn test_matrix_empty_list() {
    let t = setup_app("").await;
    let (sid, token, _) = t.logged_in("alice", "customer").await;

    let (status, body) = t
        .post("/api/compare/matrix", Some(&sid), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "empty");
    assert_eq!(body["message"], "No products to compare");
}

#[tokio::test]
async fn test_matrix_follows_list_order_and_settings() {
    let t = setup_app("").await;
    set_setting(
        &t.state.db,
        SETTING_ATTRIBUTES,
        r#"[{"key":"price","label":"Price"},{"key":"weight","label":"Weight"}]"#,
    )
    .await
    .unwrap();
    set_setting(&t.state.db, SETTING_TABLE_STYLE, "modern")
        .await
        .unwrap();

    let (sid, token, _) = t.logged_in("alice", "customer").await;
    for id in [2, 1] {
        t.post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": id}))
            .await;
    }

    let (status, body) = t
        .post("/api/compare/matrix", Some(&sid), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["table_style"], "modern");

    let matrix = &body["matrix"];
    assert_eq!(matrix["header"][0]["name"], "Grinder");
    assert_eq!(matrix["header"][1]["name"], "Espresso Machine");

    let rows = matrix["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["label"], "Price");
    assert_eq!(rows[0]["cells"][0], json!({"kind": "value", "text": "$89"}));
    assert_eq!(rows[0]["cells"][1], json!({"kind": "value", "text": "$199"}));
    assert_eq!(rows[1]["cells"][1], json!({"kind": "placeholder"}));

    assert_eq!(matrix["actions"][0]["view_url"], "/product/2");
}

#[tokio::test]
async fn test_matrix_degrades_unresolvable_products() {
    let t = setup_app("").await;
    let (sid, token, _) = t.logged_in("alice", "customer").await;

    // 7 fails in the catalog, 42 does not exist
    for id in [1, 7, 42] {
        let (status, _) = t
            .post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": id}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = t
        .post("/api/compare/matrix", Some(&sid), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let header = body["matrix"]["header"].as_array().unwrap();
    assert_eq!(header.len(), 3);
    assert_eq!(header[0]["available"], true);
    assert_eq!(header[1]["available"], false);
    assert_eq!(header[1]["item_id"], 7);
    assert_eq!(header[2]["available"], false);

    let price = &body["matrix"]["rows"][0];
    assert_eq!(price["key"], "price");
    assert_eq!(price["cells"][1], json!({"kind": "missing"}));
    assert_eq!(price["cells"][2], json!({"kind": "missing"}));
}

// =============================================================================
// Session Bridge Tests
// =============================================================================

#[tokio::test]
async fn test_guest_list_merged_at_login() {
    let t = setup_app("allow_guest_compare = true\n").await;
    let user = users::create_user(&t.state.db, "alice", "secret", "customer")
        .await
        .unwrap();
    let account = Owner::User(user.guid.clone());

    // Account already holds [5, 7]
    let (sid1, token1) = t.new_session().await;
    t.post(
        "/api/session/login",
        Some(&sid1),
        json!({"token": token1, "username": "alice", "password": "secret"}),
    )
    .await;
    for id in [5, 7] {
        t.post("/api/compare/add", Some(&sid1), json!({"token": token1, "item_id": id}))
            .await;
    }

    // Guest collects [7, 9] on another session
    let (sid2, token2) = t.new_session().await;
    for id in [7, 9] {
        let (status, _) = t
            .post("/api/compare/add", Some(&sid2), json!({"token": token2, "item_id": id}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let guest = Owner::Anonymous(sid2.clone());
    assert_eq!(t.list_of(&guest).await, vec![7, 9]);

    let (status, body) = t
        .post(
            "/api/session/login",
            Some(&sid2),
            json!({"token": token2, "username": "alice", "password": "secret"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["merged"]["count"], 3);
    assert_eq!(body["merged"]["adopted"], 1);
    assert_eq!(body["merged"]["dropped"], 0);

    assert_eq!(t.list_of(&account).await, vec![5, 7, 9]);
    assert!(t.list_of(&guest).await.is_empty());

    // Same session now acts on the account list
    let (_, body) = t
        .post("/api/compare/list", Some(&sid2), json!({"token": token2}))
        .await;
    assert_eq!(body["items"], json!([5, 7, 9]));
}

#[tokio::test]
async fn test_merge_truncates_to_capacity() {
    let t = setup_app("allow_guest_compare = true\nmax_items = 2\n").await;
    let user = users::create_user(&t.state.db, "alice", "secret", "customer")
        .await
        .unwrap();

    let (sid, token) = t.new_session().await;
    for id in [3, 4] {
        t.post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": id}))
            .await;
    }

    t.state
        .store
        .add(&Owner::User(user.guid.clone()), ItemId::new(1).unwrap())
        .await
        .unwrap();

    let (status, body) = t
        .post(
            "/api/session/login",
            Some(&sid),
            json!({"token": token, "username": "alice", "password": "secret"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["merged"]["adopted"], 1);
    assert_eq!(body["merged"]["dropped"], 1);
    assert_eq!(t.list_of(&Owner::User(user.guid)).await, vec![1, 3]);
}

#[tokio::test]
async fn test_logout_returns_session_to_empty_guest_list() {
    let t = setup_app("allow_guest_compare = true\n").await;
    let (sid, token, guid) = t.logged_in("alice", "customer").await;

    t.post("/api/compare/add", Some(&sid), json!({"token": token, "item_id": 1}))
        .await;

    let (status, body) = t
        .post("/api/session/logout", Some(&sid), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    // Account list survives; the session is anonymous again
    assert_eq!(t.list_of(&Owner::User(guid)).await, vec![1]);
    let (status, body) = t
        .post("/api/compare/list", Some(&sid), json!({"token": token}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
}
