use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
    Extension,
};
use chrono::Utc;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    handlers::auth::SESSION_COOKIE,
    models::session::Session,
    repositories::user as user_repo,
    state::AppState,
};

use redis::AsyncCommands;

/// Extracts the session token from the request cookies.
fn extract_session_token(cookies: &Cookies) -> Option<Uuid> {
    cookies
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// A middleware that requires a valid session to be present.
///
/// Reads the session cookie, verifies the record against the session store,
/// rejects missing/expired/invalid sessions, and attaches the `Session` to
/// the request extensions for downstream handlers.
pub async fn require_auth(
    State(mut state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    tracing::debug!("🔐 Checking authentication...");

    let session_id = extract_session_token(&cookies).ok_or_else(|| {
        tracing::warn!("❌ No session_id cookie found");
        StatusCode::UNAUTHORIZED
    })?;

    let session_json: String = state
        .redis
        .get(format!("session:{}", session_id))
        .await
        .map_err(|e| {
            tracing::warn!("❌ Redis error or session not found: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

    let session: Session = sonic_rs::from_str(&session_json).map_err(|e| {
        tracing::warn!("❌ Invalid session JSON: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    if session.is_expired(Utc::now()) {
        tracing::warn!("❌ Session expired for user: {}", session.user_id);

        let _: () = state
            .redis
            .del(format!("session:{}", session_id))
            .await
            .unwrap_or(());

        return Err(StatusCode::UNAUTHORIZED);
    }

    tracing::debug!("✅ User authenticated: {}", session.user_id);

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// A middleware that requires an admin-tier role. Must run after
/// `require_auth`.
///
/// The role cached in the session (or claimed by the client) is never
/// trusted for authorization; the user row is reloaded from the database and
/// the current role re-verified on every privileged request.
pub async fn require_admin(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = user_repo::find_by_id(&state.db, &session.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load user for role check: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or_else(|| {
            tracing::warn!("❌ Session references unknown user: {}", session.user_id);
            StatusCode::FORBIDDEN
        })?;

    if !user.is_active || !user.role.is_admin() {
        tracing::warn!(
            "❌ Admin access denied for user {} (role {})",
            user.id,
            user.role
        );
        return Err(StatusCode::FORBIDDEN);
    }

    tracing::debug!("✅ Admin access granted: {}", user.id);

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
