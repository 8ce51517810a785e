use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Row shape used by login and the auth middleware.
#[derive(FromRow)]
pub struct UserRow {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub is_blocked: bool,
}

/// Public view of a user, returned by the admin user list.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserInfo {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "jdoe")]
    pub username: String,

    #[schema(example = 2)]
    pub role_id: u8,

    #[schema(example = false)]
    pub is_blocked: bool,

    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}
