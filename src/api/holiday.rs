use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::holiday::Holiday;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

/// Company holiday calendar, ordered by date.
#[utoipa::path(
    get,
    path = "/api/holiday",
    responses(
        (status = 200, description = "Holiday list", body = [Holiday]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn list_holidays(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let holidays = sqlx::query_as::<_, Holiday>(
        "SELECT id, name, holiday_date FROM holidays ORDER BY holiday_date",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(holidays))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHoliday {
    #[schema(example = "Victory Day")]
    pub name: String,
    #[schema(example = "2026-12-16", format = "date", value_type = String)]
    pub holiday_date: NaiveDate,
}

/// Add a holiday, admin only.
#[utoipa::path(
    post,
    path = "/api/holiday",
    request_body = CreateHoliday,
    responses(
        (status = 201, description = "Holiday created"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "A holiday already exists on that date")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn create_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateHoliday>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Holiday name must not be empty"));
    }

    let result = sqlx::query("INSERT INTO holidays (name, holiday_date) VALUES (?, ?)")
        .bind(payload.name.trim())
        .bind(payload.holiday_date)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "Holiday created"
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Err(ApiError::conflict("A holiday already exists on that date"));
                }
            }
            Err(e.into())
        }
    }
}

/// Remove a holiday, admin only.
#[utoipa::path(
    delete,
    path = "/api/holiday/{id}",
    params(("id" = u64, Path, description = "Holiday id")),
    responses(
        (status = 200, description = "Holiday removed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn delete_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let result = sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Holiday not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Holiday removed" })))
}
