use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::session::{AuthClient, SessionState};
use crate::models::user::Role;

/// Maximum number of session polls before giving up.
pub const MAX_ATTEMPTS: u32 = 8;
/// Spacing after each of the first `EARLY_ATTEMPTS` polls.
const EARLY_SPACING: Duration = Duration::from_millis(300);
/// Spacing after later polls.
const LATE_SPACING: Duration = Duration::from_millis(600);
/// Number of polls that use the short spacing.
const EARLY_ATTEMPTS: u32 = 3;

/// Where a resolved role came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSource {
    /// Observed in an active session snapshot.
    Session,
    /// The retry budget ran out; the safe default was applied.
    Fallback,
}

/// The outcome of a role-resolution run, kept for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRole {
    pub role: Role,
    pub source: RoleSource,
    /// The attempt at which the role was found (or `MAX_ATTEMPTS` on
    /// fallback).
    pub attempts: u32,
}

/// Anything the resolver can poll for a session snapshot. Production code
/// uses [`AuthClient`]; tests script their own sequences.
pub trait SessionSource {
    /// Fetches a fresh session snapshot.
    fn poll_session(&self) -> impl Future<Output = SessionState> + Send;
}

impl SessionSource for AuthClient {
    async fn poll_session(&self) -> SessionState {
        // A failed poll is not a failed resolution; the next attempt may
        // succeed, so network errors collapse into "nothing observed yet".
        match self.refresh().await {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!("Session poll failed: {}", e);
                SessionState::Loading
            }
        }
    }
}

/// Polls `source` until a role is observed or the budget is exhausted.
///
/// Session creation on the server and the session becoming visible to the
/// client are not atomic, so a single read-after-login can race and see no
/// role. Bounded polling papers over that window: 8 attempts, 300 ms apart
/// for the first three, 600 ms thereafter.
///
/// Returns `None` only when `cancel` fires (user navigated away or logged
/// out) — in that case no redirect decision must be made. Otherwise always
/// returns a decisive role, falling back to CUSTOMER when the budget runs
/// out, so the caller is never left in a loading state.
pub async fn resolve_role<S: SessionSource>(
    source: &S,
    cancel: &CancellationToken,
) -> Option<ResolvedRole> {
    for attempt in 1..=MAX_ATTEMPTS {
        if cancel.is_cancelled() {
            tracing::debug!("Role resolution cancelled at attempt {}", attempt);
            return None;
        }

        if let Some(role) = source.poll_session().await.role() {
            tracing::debug!("Role {} observed at attempt {}", role, attempt);
            return Some(ResolvedRole {
                role,
                source: RoleSource::Session,
                attempts: attempt,
            });
        }

        if attempt < MAX_ATTEMPTS {
            let spacing = if attempt <= EARLY_ATTEMPTS {
                EARLY_SPACING
            } else {
                LATE_SPACING
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Role resolution cancelled during wait {}", attempt);
                    return None;
                }
                _ = tokio::time::sleep(spacing) => {}
            }
        }
    }

    tracing::warn!(
        "Role not observed within {} attempts, falling back to CUSTOMER",
        MAX_ATTEMPTS
    );

    Some(ResolvedRole {
        role: Role::Customer,
        source: RoleSource::Fallback,
        attempts: MAX_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::SessionSnapshot;
    use crate::handlers::auth::SessionInfo;
    use crate::models::user::UserPublic;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;
    use uuid::Uuid;

    /// Replays a scripted sequence of states; the last state repeats.
    struct ScriptedSource {
        states: Mutex<VecDeque<SessionState>>,
    }

    impl ScriptedSource {
        fn new(states: impl IntoIterator<Item = SessionState>) -> Self {
            Self {
                states: Mutex::new(states.into_iter().collect()),
            }
        }
    }

    impl SessionSource for ScriptedSource {
        async fn poll_session(&self) -> SessionState {
            let mut states = self.states.lock().unwrap();
            if states.len() > 1 {
                states.pop_front().unwrap()
            } else {
                states.front().cloned().unwrap_or(SessionState::Loading)
            }
        }
    }

    fn active(role: Role) -> SessionState {
        SessionState::Active(SessionSnapshot {
            session: SessionInfo {
                created_at: Utc::now(),
                expires_at: Utc::now() + chrono::Duration::days(7),
            },
            user: UserPublic {
                id: Uuid::new_v4(),
                email: "user@example.com".to_string(),
                first_name: "Sam".to_string(),
                last_name: "Okafor".to_string(),
                role,
            },
        })
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_role_resolves_on_first_attempt_without_waiting() {
        let source = ScriptedSource::new([active(Role::Admin)]);
        let start = Instant::now();

        let resolved = resolve_role(&source, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(resolved.role, Role::Admin);
        assert_eq!(resolved.source, RoleSource::Session);
        assert_eq!(resolved.attempts, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn late_role_is_found_with_adaptive_spacing() {
        // Four empty polls, then the session becomes visible.
        let source = ScriptedSource::new([
            SessionState::Loading,
            SessionState::Absent,
            SessionState::Absent,
            SessionState::Absent,
            active(Role::Technician),
        ]);
        let start = Instant::now();

        let resolved = resolve_role(&source, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(resolved.role, Role::Technician);
        assert_eq!(resolved.attempts, 5);
        // 3 short waits plus 1 long wait before the fifth attempt.
        assert_eq!(start.elapsed(), Duration::from_millis(3 * 300 + 600));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_falls_back_to_customer() {
        let source = ScriptedSource::new([SessionState::Absent]);
        let start = Instant::now();

        let resolved = resolve_role(&source, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(resolved.role, Role::Customer);
        assert_eq!(resolved.source, RoleSource::Fallback);
        assert_eq!(resolved.attempts, MAX_ATTEMPTS);
        // Worst case is exactly 3 × 300 ms + 4 × 600 ms = 3300 ms; the
        // schedule never waits beyond that before falling back.
        assert_eq!(start.elapsed(), Duration::from_millis(3 * 300 + 4 * 600));
        assert!(start.elapsed() <= Duration::from_millis(3300));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling_with_no_decision() {
        let source = ScriptedSource::new([SessionState::Absent]);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(450)).await;
            canceller.cancel();
        });

        let resolved = resolve_role(&source, &cancel).await;
        assert_eq!(resolved, None);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_never_polls() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let source = ScriptedSource::new([active(Role::SuperAdmin)]);
        assert_eq!(resolve_role(&source, &cancel).await, None);
    }
}
