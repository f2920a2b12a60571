use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::handlers::auth::{
    LoginRequest, LoginResponse, SessionInfo, SessionResponse, CSRF_COOKIE,
};
use crate::models::user::UserPublic;

/// A snapshot of the authenticated session as last seen from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session: SessionInfo,
    pub user: UserPublic,
}

/// The client-side view of session state.
///
/// `Loading` is distinct from `Absent` on purpose: callers must never treat
/// "not fetched yet" as "not signed in".
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No fetch has completed yet.
    Loading,
    /// The server definitively reported no session.
    Absent,
    /// An unexpired session exists.
    Active(SessionSnapshot),
}

impl SessionState {
    /// The resolved role, if the state carries one.
    pub fn role(&self) -> Option<crate::models::user::Role> {
        match self {
            SessionState::Active(snapshot) => Some(snapshot.user.role),
            _ => None,
        }
    }
}

/// The single owned client for all session reads.
///
/// One instance per app lifecycle: created at startup, torn down at logout.
/// All UI code observes session state through this object so two competing
/// auth services can never disagree about who is signed in.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    cookie_jar: Arc<Jar>,
    base_url: String,
    state: Arc<RwLock<SessionState>>,
    poll_token: Arc<RwLock<CancellationToken>>,
}

impl AuthClient {
    /// Creates a new client for the given auth service base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let cookie_jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(cookie_jar.clone())
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            cookie_jar,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Arc::new(RwLock::new(SessionState::Loading)),
            poll_token: Arc::new(RwLock::new(CancellationToken::new())),
        })
    }

    /// Returns the last known session state without touching the network.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// The cancellation token guarding any polling loop currently tied to
    /// this client. Cancelled on logout/teardown.
    pub async fn poll_token(&self) -> CancellationToken {
        self.poll_token.read().await.clone()
    }

    /// Re-queries the session endpoint and updates the cached state.
    ///
    /// Also the hook for cross-tab consistency: call on focus/visibility
    /// change so a session established or cleared elsewhere becomes visible.
    pub async fn refresh(&self) -> Result<SessionState> {
        let response = self
            .http
            .get(format!("{}/api/auth/session", self.base_url))
            .send()
            .await?
            .error_for_status()?;

        let payload: SessionResponse = response.json().await?;

        let new_state = match (payload.session, payload.user) {
            (Some(session), Some(user)) => SessionState::Active(SessionSnapshot { session, user }),
            _ => SessionState::Absent,
        };

        *self.state.write().await = new_state.clone();
        Ok(new_state)
    }

    /// Submits credentials. On success the session cookie is captured by the
    /// cookie jar and the cached state is updated from the response body, so
    /// the role is available without any further round-trip.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let response = self
            .http
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let message = extract_error_message(response).await;
            return Err(AppError::Authentication(message));
        }

        let payload: LoginResponse = response.json().await?;

        *self.state.write().await = SessionState::Active(SessionSnapshot {
            session: payload.session.clone(),
            user: payload.user.clone(),
        });

        Ok(payload)
    }

    /// Ends the session: stops any in-flight polling, invalidates the session
    /// server-side, and resets the cached state to a definitive `Absent`.
    pub async fn logout(&self) -> Result<()> {
        self.cancel_polling().await;

        let mut request = self
            .http
            .post(format!("{}/api/auth/logout", self.base_url));
        if let Some(csrf) = self.csrf_token() {
            request = request.header("x-csrf-token", csrf);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let message = extract_error_message(response).await;
            tracing::warn!("Logout rejected by server: {}", message);
        }

        *self.state.write().await = SessionState::Absent;
        Ok(())
    }

    /// Cancels the current polling guard and arms a fresh one for the next
    /// login flow.
    pub async fn cancel_polling(&self) {
        let mut guard = self.poll_token.write().await;
        guard.cancel();
        *guard = CancellationToken::new();
    }

    /// Reads the CSRF token out of the cookie jar, if the server issued one.
    fn csrf_token(&self) -> Option<String> {
        let url = self.base_url.parse().ok()?;
        let header = self.cookie_jar.cookies(&url)?;
        let cookies = header.to_str().ok()?;

        cookies.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == CSRF_COOKIE).then(|| value.to_string())
        })
    }
}

/// Pulls the `error` field out of an error response body, falling back to a
/// generic message so internals never reach the UI.
async fn extract_error_message(response: reqwest::Response) -> String {
    if let Ok(body) = response.json::<AuthErrorBody>().await {
        body.error
    } else {
        "Request failed. Please try again.".to_string()
    }
}

#[derive(serde::Deserialize)]
struct AuthErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Utc;
    use uuid::Uuid;

    fn snapshot_with_role(role: Role) -> SessionSnapshot {
        SessionSnapshot {
            session: SessionInfo {
                created_at: Utc::now(),
                expires_at: Utc::now() + chrono::Duration::days(7),
            },
            user: UserPublic {
                id: Uuid::new_v4(),
                email: "tech@example.com".to_string(),
                first_name: "Taylor".to_string(),
                last_name: "Reyes".to_string(),
                role,
            },
        }
    }

    #[test]
    fn loading_and_absent_expose_no_role() {
        assert_eq!(SessionState::Loading.role(), None);
        assert_eq!(SessionState::Absent.role(), None);
    }

    #[test]
    fn active_state_exposes_the_role() {
        let state = SessionState::Active(snapshot_with_role(Role::Technician));
        assert_eq!(state.role(), Some(Role::Technician));
    }

    #[tokio::test]
    async fn client_starts_in_loading_state() {
        let client = AuthClient::new("http://127.0.0.1:3000").unwrap();
        assert_eq!(client.snapshot().await, SessionState::Loading);
    }

    #[tokio::test]
    async fn cancel_polling_arms_a_fresh_token() {
        let client = AuthClient::new("http://127.0.0.1:3000").unwrap();
        let first = client.poll_token().await;
        client.cancel_polling().await;
        assert!(first.is_cancelled());
        assert!(!client.poll_token().await.is_cancelled());
    }
}
