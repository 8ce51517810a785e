use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::user::UserInfo;
use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;

/// All accounts, admin only.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "User list", body = [UserInfo]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let users = sqlx::query_as::<_, UserInfo>(
        "SELECT id, username, role_id, is_blocked, created_at FROM users ORDER BY id",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(users))
}

async fn set_blocked(
    auth: &AuthUser,
    pool: &MySqlPool,
    user_id: u64,
    blocked: bool,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    if user_id == auth.user_id {
        return Err(ApiError::validation("You cannot block your own account"));
    }

    let result = sqlx::query("UPDATE users SET is_blocked = ? WHERE id = ?")
        .bind(blocked)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(user_id, blocked, "Updated account block flag");

    Ok(HttpResponse::Ok().json(json!({
        "message": if blocked { "User blocked" } else { "User unblocked" }
    })))
}

/// Block an account; blocked users cannot check in, check out or push
/// location updates.
#[utoipa::path(
    put,
    path = "/api/users/{id}/block",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User blocked"),
        (status = 400, description = "Cannot block yourself"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn block_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    set_blocked(&auth, pool.get_ref(), path.into_inner(), true).await
}

/// Lift a block.
#[utoipa::path(
    put,
    path = "/api/users/{id}/unblock",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User unblocked"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn unblock_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    set_blocked(&auth, pool.get_ref(), path.into_inner(), false).await
}
