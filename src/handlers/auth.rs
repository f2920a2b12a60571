use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::net::SocketAddr;
use tower_cookies::{Cookie, Cookies};
use tower_cookies::cookie::time::Duration;
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, Result},
    middleware_layer::csrf::generate_csrf_token,
    models::session::Session,
    models::user::{User, UserPublic},
    repositories::user as user_repo,
    services::auth as auth_service,
    state::AppState,
    validation::auth::*,
};

use redis::AsyncCommands;

/// The name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";
/// The name of the CSRF token cookie.
pub const CSRF_COOKIE: &str = "csrf_token";
/// How long an issued CSRF token lives, in days.
const CSRF_TOKEN_DAYS: i64 = 1;
/// The Redis TTL for a CSRF token. Derived from the cookie lifetime: the
/// server-side record and the cookie must expire together, otherwise
/// mutating requests fail CSRF checks while the cookie still looks valid.
const CSRF_TOKEN_TTL_SECONDS: u64 = (CSRF_TOKEN_DAYS * 86400) as u64;

/// The request payload for user registration.
#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// The request payload for user login.
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The response payload for simple authentication-related requests.
#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// The session fields exposed to clients. The session id itself only travels
/// in the HttpOnly cookie.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The response payload for a successful login. Carries the full user,
/// including the role, so clients can route without a second round-trip.
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: UserPublic,
    pub session: SessionInfo,
}

/// The response payload for the session query endpoint. Both fields are
/// `null` when the caller is not authenticated.
#[derive(Serialize, Deserialize)]
pub struct SessionResponse {
    pub session: Option<SessionInfo>,
    pub user: Option<UserPublic>,
}

/// Creates a secure cookie with the given name, value, and max age.
fn create_secure_cookie(name: String, value: String, max_age_days: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.clone(), value);

    let is_production = std::env::var("APP_ENV")
        .unwrap_or_else(|_| "development".to_string()) == "production";

    if name != CSRF_COOKIE {
        cookie.set_http_only(true);
    }

    if is_production {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    let duration_secs = max_age_days * 86400;
    cookie.set_max_age(Duration::seconds(duration_secs));
    cookie.set_path("/");

    cookie
}

/// Creates a session for the user, stores it in Redis, and sets the session
/// and CSRF cookies. This is the only path that creates a session record.
async fn issue_session(
    state: &mut AppState,
    cookies: &Cookies,
    user: &User,
    ip_address: Option<String>,
    user_agent: Option<String>,
) -> Result<Session> {
    let session_id = Uuid::new_v4();
    tracing::debug!("🔑 Generated session_id: {}", session_id);

    let now = Utc::now();
    let session = Session {
        id: session_id,
        user_id: user.id,
        role: user.role,
        ip_address,
        user_agent,
        created_at: now,
        expires_at: now + chrono::Duration::days(state.config.session_duration_days),
    };

    let session_json = sonic_rs::to_string(&session)
        .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

    let expiration_seconds: u64 = (state.config.session_duration_days * 86400) as u64;
    let _: () = state
        .redis
        .set_ex(
            format!("session:{}", session_id),
            &session_json,
            expiration_seconds,
        )
        .await
        .map_err(|e| {
            tracing::error!("❌ Redis set_ex failed: {}", e);
            AppError::Redis(e)
        })?;

    tracing::info!("✅ Session saved to Redis: session:{}", session_id);

    let session_cookie = create_secure_cookie(
        SESSION_COOKIE.to_string(),
        session_id.to_string(),
        state.config.session_duration_days,
    );
    cookies.add(session_cookie);

    let csrf_token = generate_csrf_token()?;
    let _: () = state
        .redis
        .set_ex(format!("csrf:{}", csrf_token), "valid", CSRF_TOKEN_TTL_SECONDS)
        .await
        .map_err(|e| {
            tracing::error!("❌ Redis set_ex failed for CSRF: {}", e);
            AppError::Redis(e)
        })?;

    let csrf_cookie = create_secure_cookie(CSRF_COOKIE.to_string(), csrf_token, CSRF_TOKEN_DAYS);
    cookies.add(csrf_cookie);
    tracing::debug!("✅ Session and CSRF cookies added");

    Ok(session)
}

/// Extracts the user agent header as an owned string, if present.
fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|ua| ua.to_string())
}

/// Handles customer registration.
///
/// New accounts start as CUSTOMER and unverified; no session is issued until
/// the email has been verified and the user signs in.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("📝 Register attempt for: {}", payload.email);
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    validate_name(&payload.first_name)?;
    validate_name(&payload.last_name)?;

    let user = auth_service::create_user(
        &state.db,
        &payload.email,
        &payload.first_name,
        &payload.last_name,
        &payload.password,
    )
    .await?;

    tracing::info!("✅ User registered: {}", user.id);

    let response = AuthResponse {
        success: true,
        message: "Registration successful. Please verify your email address.".to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles user login.
///
/// On success the session is written to the store, the session cookie is set,
/// and the response body carries the user with its role so the client can
/// decide the landing route immediately.
#[axum::debug_handler]
pub async fn login(
    State(mut state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt for: {}", payload.email);
    validate_email(&payload.email)?;

    let user = auth_service::authenticate_user(&state.db, &payload.email, &payload.password).await?;

    let session = issue_session(
        &mut state,
        &cookies,
        &user,
        Some(addr.ip().to_string()),
        extract_user_agent(&headers),
    )
    .await?;

    tracing::info!("✅ User logged in: {} ({})", user.id, user.role);

    let response = LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        user: UserPublic::from(&user),
        session: SessionInfo {
            created_at: session.created_at,
            expires_at: session.expires_at,
        },
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the current session and user, or an explicit empty payload when
/// the caller is not authenticated. Repeated calls without an intervening
/// login/logout return the same answer.
#[axum::debug_handler]
pub async fn current_session(
    State(mut state): State<AppState>,
    cookies: Cookies,
) -> Result<Response> {
    let empty = || {
        (
            StatusCode::OK,
            Json(SessionResponse {
                session: None,
                user: None,
            }),
        )
            .into_response()
    };

    let Some(session_id) = cookies
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
    else {
        return Ok(empty());
    };

    let session_json: Option<String> = state
        .redis
        .get(format!("session:{}", session_id))
        .await?;

    let Some(session_json) = session_json else {
        return Ok(empty());
    };

    let session: Session = sonic_rs::from_str(&session_json)
        .map_err(|e| AppError::Internal(format!("Invalid session JSON: {}", e)))?;

    if session.is_expired(Utc::now()) {
        tracing::debug!("Session {} expired, deleting", session_id);
        let _: () = state
            .redis
            .del(format!("session:{}", session_id))
            .await
            .unwrap_or(());
        return Ok(empty());
    }

    // The user row is the authoritative source for the role and profile; the
    // session blob may hold a stale role after an admin change.
    let Some(user) = user_repo::find_by_id(&state.db, &session.user_id).await? else {
        return Ok(empty());
    };

    if !user.is_active {
        return Ok(empty());
    }

    let response = SessionResponse {
        session: Some(SessionInfo {
            created_at: session.created_at,
            expires_at: session.expires_at,
        }),
        user: Some(UserPublic::from(&user)),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout.
#[axum::debug_handler]
pub async fn logout(
    State(mut state): State<AppState>,
    Extension(session): Extension<Session>,
    cookies: Cookies,
) -> Result<Response> {
    tracing::info!("👋 Logout for user: {}", session.user_id);

    let session_id = cookies
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let _: () = state
        .redis
        .del(format!("session:{}", session_id))
        .await?;

    tracing::info!("✅ Session deleted from Redis");

    if let Some(csrf_cookie) = cookies.get(CSRF_COOKIE) {
        let csrf_token = csrf_cookie.value();
        let _: () = state
            .redis
            .del(format!("csrf:{}", csrf_token))
            .await
            .unwrap_or(());
    }

    let mut session_cookie = Cookie::new(SESSION_COOKIE, "");
    session_cookie.set_max_age(Duration::seconds(0));
    session_cookie.set_path("/");
    cookies.remove(session_cookie);

    let mut csrf_cookie = Cookie::new(CSRF_COOKIE, "");
    csrf_cookie.set_max_age(Duration::seconds(0));
    csrf_cookie.set_path("/");
    cookies.remove(csrf_cookie);

    tracing::info!("✅ User logged out: {}", session.user_id);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
