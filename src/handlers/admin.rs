use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::{Role, User, UserPublic},
    repositories::user as user_repo,
    state::AppState,
};

/// The request payload for changing a user's role.
#[derive(Deserialize, Debug)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// The response payload for a role change.
#[derive(Serialize)]
pub struct SetRoleResponse {
    pub success: bool,
    pub user: UserPublic,
}

/// Changes a user's role. This is the only write path for roles; clients can
/// never change a role through their own session.
///
/// Admin-tier assignments (ADMIN, SUPER_ADMIN) require a SUPER_ADMIN caller.
#[axum::debug_handler]
pub async fn set_user_role(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Response> {
    tracing::info!(
        "🛠️ Role change requested by {}: user {} -> {}",
        admin.id,
        user_id,
        payload.role
    );

    if payload.role.is_admin() && admin.role != Role::SuperAdmin {
        tracing::warn!("❌ {} may not grant admin-tier roles", admin.id);
        return Err(AppError::Unauthorized);
    }

    if user_id == admin.id {
        return Err(AppError::Validation(
            "Cannot change your own role".to_string(),
        ));
    }

    let user = user_repo::update_role(&state.db, &user_id, payload.role).await?;

    tracing::info!("✅ Role updated: user {} is now {}", user.id, user.role);

    let response = SetRoleResponse {
        success: true,
        user: UserPublic::from(&user),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
