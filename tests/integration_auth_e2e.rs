//! Black-box login-flow tests against a running stack.
//!
//! Requires the service on 127.0.0.1:3000 with Postgres and Redis behind it,
//! and two seeded, active, verified accounts:
//!   admin@example.com    / SecurePass123!@#  (role ADMIN)
//!   customer@example.com / SecurePass123!@#  (role CUSTOMER)
//! Run with `cargo test -- --ignored`.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use repairhub_auth::client::redirect::{landing_for, ADMIN_HOME, CUSTOMER_DASHBOARD};
use repairhub_auth::client::resolver::{resolve_role, RoleSource};
use repairhub_auth::client::session::{AuthClient, SessionState};
use repairhub_auth::models::user::Role;

static BASE_URL: Lazy<String> =
    Lazy::new(|| std::env::var("AUTH_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".into()));

const PASSWORD: &str = "SecurePass123!@#";

fn raw_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running server with seeded accounts"]
async fn admin_login_lands_on_the_admin_home() {
    let client = AuthClient::new(BASE_URL.as_str()).unwrap();

    let login = client.login("admin@example.com", PASSWORD).await.unwrap();
    assert!(login.success);
    assert_eq!(login.user.role, Role::Admin);
    assert!(login.session.expires_at > chrono::Utc::now());

    let cancel = client.poll_token().await;
    let resolved = resolve_role(&client, &cancel).await.unwrap();
    assert_eq!(resolved.role, Role::Admin);
    assert_eq!(resolved.source, RoleSource::Session);
    assert_eq!(landing_for(&resolved), ADMIN_HOME);

    client.logout().await.unwrap();
    assert_eq!(client.snapshot().await, SessionState::Absent);
}

#[tokio::test]
#[ignore = "requires a running server with seeded accounts"]
async fn customer_login_lands_on_the_dashboard_not_admin() {
    let client = AuthClient::new(BASE_URL.as_str()).unwrap();

    let login = client
        .login("customer@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(login.user.role, Role::Customer);

    let cancel = client.poll_token().await;
    let resolved = resolve_role(&client, &cancel).await.unwrap();
    let path = landing_for(&resolved);
    assert_eq!(path, CUSTOMER_DASHBOARD);
    assert_ne!(path, ADMIN_HOME);

    client.logout().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running server with seeded accounts"]
async fn wrong_password_reports_invalid_credentials_and_creates_no_session() {
    let client = AuthClient::new(BASE_URL.as_str()).unwrap();

    let err = client
        .login("admin@example.com", "definitely-wrong")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid email or password"));

    // No session cookie was issued, so the session endpoint reports empty.
    assert_eq!(client.refresh().await.unwrap(), SessionState::Absent);
}

#[tokio::test]
#[ignore = "requires a running server with seeded accounts"]
async fn session_endpoint_is_idempotent_between_login_and_logout() {
    let client = AuthClient::new(BASE_URL.as_str()).unwrap();
    client.login("customer@example.com", PASSWORD).await.unwrap();

    let first = client.refresh().await.unwrap();
    let second = client.refresh().await.unwrap();
    let third = client.refresh().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second, third);

    match first {
        SessionState::Active(snapshot) => {
            assert_eq!(snapshot.user.role, Role::Customer);
            assert!(snapshot.session.expires_at > chrono::Utc::now());
        }
        other => panic!("Expected an active session, got {:?}", other),
    }

    client.logout().await.unwrap();
    assert_eq!(client.refresh().await.unwrap(), SessionState::Absent);
}

#[tokio::test]
#[ignore = "requires a running server with seeded accounts"]
async fn unauthenticated_session_query_returns_explicit_empty() {
    let response = raw_client()
        .get(format!("{}/api/auth/session", *BASE_URL))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["session"], Value::Null);
    assert_eq!(body["user"], Value::Null);
}

#[tokio::test]
#[ignore = "requires a running server with seeded accounts"]
async fn role_change_requires_an_admin_session() {
    let client = raw_client();

    // Log in as a customer, then try to hit the privileged role endpoint.
    let login = client
        .post(format!("{}/api/auth/login", *BASE_URL))
        .json(&json!({ "email": "customer@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);
    let csrf = login
        .cookies()
        .find(|c| c.name() == "csrf_token")
        .map(|c| c.value().to_string());
    let body: Value = login.json().await.unwrap();
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    let mut request = client
        .post(format!(
            "{}/api/admin/users/{}/role",
            *BASE_URL, user_id
        ))
        .json(&json!({ "role": "ADMIN" }));
    if let Some(token) = csrf {
        request = request.header("x-csrf-token", token);
    }

    let response = request.send().await.unwrap();
    assert_eq!(response.status().as_u16(), 403);
}
