//! End-to-end login tests against a stub authentication endpoint.

use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::{json, Value};

use classdesk_core::api::{AuthClient, AuthError};
use classdesk_core::auth::{SessionManager, SESSION_STORAGE_KEY};
use classdesk_core::storage::{MemoryStore, SessionStore};

fn jwt(claims: Value) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

fn claims_for(name: &str) -> Value {
    let exp = Utc::now().timestamp() + 24 * 3600;
    match name {
        "admin" => json!({"sub": name, "ROLES": ["ADMIN"], "PERMISSIONS": ["user:create", "question:write"], "exp": exp}),
        "teacher1" => json!({"sub": name, "ROLES": ["TEACHER"], "PERMISSIONS": ["question:write"], "exp": exp}),
        "student1" => json!({"sub": name, "ROLES": ["STUDENT"], "exp": exp}),
        "custodian" => json!({"sub": name, "ROLES": ["CUSTODIAN"], "exp": exp}),
        "fractional" => json!({"sub": name, "ROLES": ["TEACHER"], "PERMISSIONS": null, "exp": exp as f64 + 0.5}),
        "expired" => json!({"sub": name, "ROLES": ["STUDENT"], "exp": Utc::now().timestamp() - 60}),
        _ => json!({"sub": name}),
    }
}

/// Mimics the backend: demo accounts log in with `password123`.
async fn login_handler(Json(body): Json<Value>) -> Response {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default();

    if password != "password123" {
        return (StatusCode::UNAUTHORIZED, "Incorrect Username or Password! ").into_response();
    }

    match name.as_str() {
        "no-token" => Json(json!({"tokenType": "Bearer"})).into_response(),
        "garbled" => Json(json!({"jwt": "not-a-jwt", "tokenType": "Bearer"})).into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "database down").into_response(),
        "html" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        _ => Json(json!({
            "jwt": jwt(claims_for(&name)),
            "tokenType": "Bearer",
            "expiresIn": 86_400_000
        }))
        .into_response(),
    }
}

/// Serve the stub on an ephemeral port and return its base URL.
async fn spawn_stub() -> String {
    let app = Router::new().route("/api/login", post(login_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

async fn manager() -> (SessionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let client = AuthClient::new(spawn_stub().await).unwrap();
    (SessionManager::new(client, store.clone()), store)
}

#[tokio::test]
async fn test_admin_login() {
    let (manager, store) = manager().await;

    let ok = manager.login("admin", "password123").await.unwrap();
    assert!(ok);

    let session = manager.current_session().expect("session after login");
    assert_eq!(session.display_name, "admin");
    assert_eq!(session.primary_role, "admin");
    assert!(manager.has_role("ADMIN"));
    assert!(!manager.has_role("STUDENT"));
    assert!(manager.has_permission("user:create"));
    assert!(manager.is_authenticated());
    assert_eq!(manager.token(), Some(session.token.clone()));
    assert!(store.get(SESSION_STORAGE_KEY).unwrap().is_some());
}

#[tokio::test]
async fn test_persisted_session_survives_restart() {
    let (manager, store) = manager().await;
    assert!(manager.login("teacher1", "password123").await.unwrap());
    let before = manager.current_session().unwrap();
    drop(manager);

    let client = AuthClient::new("http://127.0.0.1:9/api").unwrap();
    let restarted = SessionManager::new(client, store);
    let after = restarted.current_session().expect("restored session");

    assert_eq!(after.token, before.token);
    assert_eq!(after.roles, before.roles);
    assert_eq!(after.permissions, before.permissions);
    assert_eq!(after.primary_role, "teacher");
    assert!(restarted.is_authenticated());
}

#[tokio::test]
async fn test_unauthorized_login() {
    let (manager, store) = manager().await;

    let err = manager.login("admin", "wrong").await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized), "got {:?}", err);
    assert_eq!(err.user_message(), "Invalid username or password");
    assert!(manager.current_session().is_none());
    assert!(store.get(SESSION_STORAGE_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let (manager, _store) = manager().await;
    assert!(manager.login("student1", "password123").await.unwrap());

    assert!(manager.login("admin", "wrong").await.is_err());
    assert_eq!(manager.current_session().unwrap().display_name, "student1");
}

#[tokio::test]
async fn test_response_without_token() {
    let (manager, store) = manager().await;

    let ok = manager.login("no-token", "password123").await.unwrap();
    assert!(!ok);
    assert!(manager.current_session().is_none());
    assert!(store.get(SESSION_STORAGE_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_and_invalid_body() {
    let (manager, _store) = manager().await;

    let err = manager.login("broken", "password123").await.unwrap_err();
    assert!(matches!(err, AuthError::Remote { status: 500, .. }), "got {:?}", err);
    assert_eq!(err.user_message(), "Login failed. Please try again.");

    let err = manager.login("html", "password123").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidResponse(_)), "got {:?}", err);
    assert!(manager.current_session().is_none());
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Reserve a port, then close it so nothing is listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = AuthClient::new(format!("http://{}/api", addr)).unwrap();
    let manager = SessionManager::new(client, Arc::new(MemoryStore::new()));

    let err = manager.login("admin", "password123").await.unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)), "got {:?}", err);
    assert_eq!(
        err.user_message(),
        "Unable to connect to server. Please check if the backend is running."
    );
    assert!(manager.current_session().is_none());
}

#[tokio::test]
async fn test_undecodable_token_still_logs_in() {
    let (manager, _store) = manager().await;

    assert!(manager.login("garbled", "password123").await.unwrap());
    let session = manager.current_session().unwrap();
    assert_eq!(session.primary_role, "user");
    assert!(session.roles.is_empty());
    assert!(session.permissions.is_empty());

    // The expiry check cannot read the token and logs out
    assert!(!manager.is_authenticated());
    assert!(manager.current_session().is_none());
}

#[tokio::test]
async fn test_expired_token_logs_out_on_check() {
    let (manager, store) = manager().await;

    assert!(manager.login("expired", "password123").await.unwrap());
    assert!(manager.has_role("STUDENT"));

    assert!(!manager.is_authenticated());
    assert!(manager.current_session().is_none());
    assert!(store.get(SESSION_STORAGE_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_fractional_expiry_and_null_claims() {
    let (manager, _store) = manager().await;

    assert!(manager.login("fractional", "password123").await.unwrap());
    let session = manager.current_session().unwrap();
    assert_eq!(session.primary_role, "teacher");
    assert!(session.permissions.is_empty());

    assert!(manager.is_authenticated());
    assert!(manager.has_role("TEACHER"));
}

#[tokio::test]
async fn test_primary_role_fallbacks() {
    let (manager, _store) = manager().await;

    assert!(manager.login("custodian", "password123").await.unwrap());
    assert_eq!(manager.current_session().unwrap().primary_role, "custodian");
    assert!(manager.has_role("CUSTODIAN"));

    // No roles claim at all
    assert!(manager.login("nobody", "password123").await.unwrap());
    assert_eq!(manager.current_session().unwrap().primary_role, "user");
    assert!(!manager.has_role("CUSTODIAN"));
}

#[tokio::test]
async fn test_observers_see_every_transition() {
    let (manager, _store) = manager().await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = manager.subscribe(move |state| {
        sink.lock()
            .unwrap()
            .push(state.map(|s| s.primary_role.clone()));
    });

    manager.login("student1", "password123").await.unwrap();
    manager.login("admin", "password123").await.unwrap();
    manager.logout();
    manager.logout();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            None,
            Some("student".to_string()),
            Some("admin".to_string()),
            None,
            None,
        ]
    );
}

#[tokio::test]
async fn test_overlapping_logins_last_write_wins() {
    let (manager, store) = manager().await;

    let last_published = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&last_published);
    let _sub = manager.subscribe(move |state| {
        *sink.lock().unwrap() = state.map(|s| s.display_name.clone());
    });

    let (a, b) = tokio::join!(
        manager.login("teacher1", "password123"),
        manager.login("student1", "password123"),
    );
    assert!(a.unwrap());
    assert!(b.unwrap());

    // Whichever response was processed last is current, published and stored
    let current = manager.current_session().unwrap();
    assert_eq!(last_published.lock().unwrap().as_deref(), Some(current.display_name.as_str()));

    let stored: Value = serde_json::from_str(&store.get(SESSION_STORAGE_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored["username"], current.display_name);
}

#[tokio::test]
async fn test_observer_logout_during_login_is_final() {
    let (manager, store) = manager().await;
    let manager = Arc::new(manager);

    // First observer rejects every session it is shown
    let weak = Arc::downgrade(&manager);
    let _guard = manager.subscribe(move |state| {
        if state.is_some() {
            if let Some(manager) = weak.upgrade() {
                manager.logout();
            }
        }
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _recorder = manager.subscribe(move |state| {
        sink.lock()
            .unwrap()
            .push(state.map(|s| s.display_name.clone()));
    });

    assert!(manager.login("admin", "password123").await.unwrap());

    // The later observer never sees the session the first one already ended
    assert_eq!(*seen.lock().unwrap(), vec![None, None]);
    assert!(manager.current_session().is_none());
    assert!(store.get(SESSION_STORAGE_KEY).unwrap().is_none());
}
