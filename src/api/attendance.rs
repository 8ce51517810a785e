use crate::api::leave::has_approved_leave;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, CheckoutDisposition, LocationStamp, checkout_disposition,
    hours_between, is_stale_sample,
};
use crate::storage::{ImageStore, extension_for};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::ToSchema;

const RECORD_COLUMNS: &str = "id, user_id, work_date, status, check_in_at, \
    check_in_latitude, check_in_longitude, check_in_address, check_in_photo, \
    check_out_at, check_out_latitude, check_out_longitude, check_out_address, \
    hours_worked, last_latitude, last_longitude, last_address, last_location_at";

async fn fetch_for_day(
    pool: &MySqlPool,
    user_id: u64,
    day: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = ? AND work_date = ?"
    ))
    .bind(user_id)
    .bind(day)
    .fetch_optional(pool)
    .await
}

#[derive(Debug)]
struct CheckInEvidence {
    image: Vec<u8>,
    extension: &'static str,
    location: LocationStamp,
}

/// Pulls the `image` and `location` fields out of the multipart form,
/// enforcing the image-only content-type rule and the size cap while the
/// body streams in. Unknown fields (e.g. `device`) are drained and ignored.
async fn read_check_in_form(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<CheckInEvidence, ApiError> {
    let mut image: Option<(Vec<u8>, &'static str)> = None;
    let mut location: Option<LocationStamp> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?
    {
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        match name.as_str() {
            "image" => {
                let extension = field
                    .content_type()
                    .and_then(|m| extension_for(m.essence_str()))
                    .ok_or_else(|| ApiError::validation("Only image files are allowed"))?;

                let mut buf: Vec<u8> = Vec::new();
                while let Some(chunk) = field
                    .try_next()
                    .await
                    .map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?
                {
                    if buf.len() + chunk.len() > max_bytes {
                        return Err(ApiError::validation(format!(
                            "File size too large. Maximum size is {}MB.",
                            max_bytes / (1024 * 1024)
                        )));
                    }
                    buf.extend_from_slice(&chunk);
                }
                image = Some((buf, extension));
            }
            "location" => {
                let mut buf: Vec<u8> = Vec::new();
                while let Some(chunk) = field
                    .try_next()
                    .await
                    .map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?
                {
                    buf.extend_from_slice(&chunk);
                }
                let stamp: LocationStamp = serde_json::from_slice(&buf).map_err(|_| {
                    ApiError::validation("Location must be JSON with numeric coordinates")
                })?;
                location = Some(stamp);
            }
            _ => {
                while field
                    .try_next()
                    .await
                    .map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?
                    .is_some()
                {}
            }
        }
    }

    let (image, extension) = image.ok_or_else(|| ApiError::validation("Please upload an image"))?;
    if image.is_empty() {
        return Err(ApiError::validation("Please upload an image"));
    }
    let location = location.ok_or_else(|| ApiError::validation("Location is required"))?;

    Ok(CheckInEvidence {
        image,
        extension,
        location,
    })
}

fn require_in_range(location: &LocationStamp) -> Result<(), ApiError> {
    if location.coordinates.in_range() {
        Ok(())
    } else {
        Err(ApiError::validation("Location coordinates out of range"))
    }
}

/// Check-in: create today's record from photo + location evidence.
#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    responses(
        (status = 201, description = "Checked in; created record returned", body = Object, example = json!({
            "message": "Attendance marked successfully"
        })),
        (status = 400, description = "Missing/oversized image or missing location"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Blocked account"),
        (status = 409, description = "Already checked in today, or on approved leave"),
        (status = 503, description = "Storage or database unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    store: web::Data<ImageStore>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    auth.require_active()?;

    let evidence = read_check_in_form(payload, config.max_upload_bytes).await?;
    require_in_range(&evidence.location)?;

    let now = Utc::now().naive_utc();
    let today = now.date();

    if has_approved_leave(pool.get_ref(), auth.user_id, today).await? {
        return Err(ApiError::conflict("You are on approved leave today"));
    }

    if fetch_for_day(pool.get_ref(), auth.user_id, today).await?.is_some() {
        return Err(ApiError::conflict("Already checked in today"));
    }

    let photo_url = store
        .store(&evidence.image, evidence.extension)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to store check-in photo");
            ApiError::TransientIo
        })?;

    let captured_at = evidence.location.captured_at_or(now);
    let coords = evidence.location.coordinates;

    let result = sqlx::query(
        r#"
        INSERT INTO attendance
            (user_id, work_date, status, check_in_at,
             check_in_latitude, check_in_longitude, check_in_address, check_in_photo,
             last_latitude, last_longitude, last_address, last_location_at)
        VALUES (?, ?, 'checked-in', ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(today)
    .bind(now)
    .bind(coords.latitude)
    .bind(coords.longitude)
    .bind(&evidence.location.address)
    .bind(&photo_url)
    .bind(coords.latitude)
    .bind(coords.longitude)
    .bind(&evidence.location.address)
    .bind(captured_at)
    .execute(pool.get_ref())
    .await;

    if let Err(e) = result {
        // Unique (user_id, work_date) closes the read-then-insert race.
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return Err(ApiError::conflict("Already checked in today"));
            }
        }
        return Err(e.into());
    }

    let record = fetch_for_day(pool.get_ref(), auth.user_id, today)
        .await?
        .ok_or(ApiError::Internal)?;

    sqlx::query(
        r#"
        INSERT INTO attendance_locations (attendance_id, latitude, longitude, address, sampled_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id)
    .bind(coords.latitude)
    .bind(coords.longitude)
    .bind(&evidence.location.address)
    .bind(captured_at)
    .execute(pool.get_ref())
    .await?;

    info!(user_id = auth.user_id, record_id = record.id, "Checked in");

    Ok(HttpResponse::Created().json(json!({
        "message": "Attendance marked successfully",
        "attendance": record
    })))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub location: LocationStamp,

    /// Set on the second call of the early-checkout confirmation flow.
    #[serde(default)]
    pub confirm_early: bool,
}

/// Check-out: terminal transition for the day, computing worked hours.
/// Below the minimum shift length the first call returns a
/// confirmation-required signal without mutating; a second call with
/// `confirmEarly: true` commits.
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checked out, or confirmation required", body = Object, example = json!({
            "message": "Checked out successfully"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Blocked account"),
        (status = 409, description = "No active check-in, or already checked out")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_checkout(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_active()?;
    require_in_range(&body.location)?;

    let now = Utc::now().naive_utc();
    let record = fetch_for_day(pool.get_ref(), auth.user_id, now.date())
        .await?
        .ok_or_else(|| ApiError::state("You need to check in first"))?;

    if record.status == AttendanceStatus::CheckedOut {
        return Err(ApiError::state("Already checked out today"));
    }

    let elapsed = hours_between(record.check_in_at, now);

    if checkout_disposition(elapsed, config.min_shift_hours, body.confirm_early)
        == CheckoutDisposition::ConfirmationRequired
    {
        info!(
            user_id = auth.user_id,
            hours = elapsed,
            "Early checkout awaiting confirmation"
        );
        return Ok(HttpResponse::Ok().json(json!({
            "confirmationRequired": true,
            "hoursWorked": elapsed,
            "message": format!(
                "You have worked {elapsed:.2} of {} hours. Confirm to check out early.",
                config.min_shift_hours
            )
        })));
    }

    let coords = body.location.coordinates;
    let updated = sqlx::query(
        r#"
        UPDATE attendance
        SET status = 'checked-out',
            check_out_at = ?,
            check_out_latitude = ?,
            check_out_longitude = ?,
            check_out_address = ?,
            hours_worked = ?
        WHERE id = ?
        AND status = 'checked-in'
        "#,
    )
    .bind(now)
    .bind(coords.latitude)
    .bind(coords.longitude)
    .bind(&body.location.address)
    .bind(elapsed)
    .bind(record.id)
    .execute(pool.get_ref())
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::state("Already checked out today"));
    }

    let record = fetch_for_day(pool.get_ref(), auth.user_id, now.date())
        .await?
        .ok_or(ApiError::Internal)?;

    info!(
        user_id = auth.user_id,
        record_id = record.id,
        hours_worked = elapsed,
        "Checked out"
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "attendance": record
    })))
}

/// Today's record for the caller, as a 0- or 1-element array. The UI treats
/// this as the source of truth when rehydrating after a reload.
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Array with today's record, empty if not checked in", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let record = fetch_for_day(pool.get_ref(), auth.user_id, Utc::now().date_naive()).await?;
    let records: Vec<AttendanceRecord> = record.into_iter().collect();
    Ok(HttpResponse::Ok().json(records))
}

/// Periodic location update from the tracking agent. Requires an active
/// check-in; samples older than the latest accepted one are acknowledged
/// but not stored.
#[utoipa::path(
    put,
    path = "/api/attendance/location",
    request_body = LocationStamp,
    responses(
        (status = 200, description = "Sample stored, or ignored as stale"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "No active check-in for today")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_location(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<LocationStamp>,
) -> Result<HttpResponse, ApiError> {
    auth.require_active()?;
    require_in_range(&body.0)?;

    let now = Utc::now().naive_utc();
    let record = fetch_for_day(pool.get_ref(), auth.user_id, now.date())
        .await?
        .filter(|r| r.status == AttendanceStatus::CheckedIn)
        .ok_or_else(|| ApiError::state("No active check-in for today"))?;

    let sampled_at = body.captured_at_or(now);
    if is_stale_sample(record.last_location_at, sampled_at) {
        debug!(
            user_id = auth.user_id,
            record_id = record.id,
            "Stale location sample ignored"
        );
        return Ok(HttpResponse::Ok().json(json!({
            "message": "Stale location sample ignored",
            "ignored": true
        })));
    }

    let coords = body.coordinates;
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE attendance
        SET last_latitude = ?, last_longitude = ?, last_address = ?, last_location_at = ?
        WHERE id = ?
        "#,
    )
    .bind(coords.latitude)
    .bind(coords.longitude)
    .bind(&body.address)
    .bind(sampled_at)
    .bind(record.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO attendance_locations (attendance_id, latitude, longitude, address, sampled_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id)
    .bind(coords.latitude)
    .bind(coords.longitude)
    .bind(&body.address)
    .bind(sampled_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Location updated" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub start_date: String,
    pub end_date: Option<String>,
}

/// Accepts plain dates and full RFC 3339 instants, since clients send both.
fn parse_date_param(value: &str) -> Result<NaiveDate, ApiError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .map_err(|_| ApiError::validation(format!("Invalid date: {value}")))
}

#[derive(sqlx::FromRow)]
struct ExportRow {
    username: String,
    work_date: NaiveDate,
    status: AttendanceStatus,
    check_in_at: NaiveDateTime,
    check_out_at: Option<NaiveDateTime>,
    hours_worked: Option<f64>,
    check_in_address: Option<String>,
    check_out_address: Option<String>,
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn export_csv(rows: &[ExportRow]) -> String {
    let mut out = String::from(
        "username,date,status,check_in,check_out,hours_worked,check_in_address,check_out_address\n",
    );
    for row in rows {
        let check_out = row
            .check_out_at
            .map(|t| t.to_string())
            .unwrap_or_default();
        let hours = row
            .hours_worked
            .map(|h| format!("{h:.4}"))
            .unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            csv_field(&row.username),
            row.work_date,
            row.status,
            row.check_in_at,
            check_out,
            hours,
            csv_field(row.check_in_address.as_deref().unwrap_or("")),
            csv_field(row.check_out_address.as_deref().unwrap_or("")),
        ));
    }
    out
}

/// CSV export over a date range, admin only.
#[utoipa::path(
    get,
    path = "/api/attendance/export",
    params(
        ("startDate" = String, Query, description = "Range start (date or RFC 3339)"),
        ("endDate" = Option<String>, Query, description = "Range end, defaults to start")
    ),
    responses(
        (status = 200, description = "CSV attachment", body = String, content_type = "text/csv"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn export_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let start = parse_date_param(&query.start_date)?;
    let end = match &query.end_date {
        Some(value) => parse_date_param(value)?,
        None => start,
    };
    if start > end {
        return Err(ApiError::validation("startDate cannot be after endDate"));
    }

    let rows = sqlx::query_as::<_, ExportRow>(
        r#"
        SELECT u.username, a.work_date, a.status, a.check_in_at, a.check_out_at,
               a.hours_worked, a.check_in_address, a.check_out_address
        FROM attendance a
        JOIN users u ON u.id = a.user_id
        WHERE a.work_date BETWEEN ? AND ?
        ORDER BY a.work_date, u.username
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"attendance-{start}-{end}.csv\""),
        ))
        .body(export_csv(&rows)))
}

/// All records for one calendar day, admin only.
#[utoipa::path(
    get,
    path = "/api/attendance/date/{date}",
    params(("date" = String, Path, description = "Calendar day, YYYY-MM-DD")),
    responses(
        (status = 200, description = "Records for the day", body = [AttendanceRecord]),
        (status = 400, description = "Invalid date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_by_date(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let day = parse_date_param(&path.into_inner())?;

    let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {RECORD_COLUMNS} FROM attendance WHERE work_date = ? ORDER BY check_in_at"
    ))
    .bind(day)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(records))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub date: Option<String>,
}

#[derive(serde::Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationHistoryEntry {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub sampled_at: NaiveDateTime,
}

/// Accepted location samples for one user, admin only, optionally filtered
/// to a single day.
#[utoipa::path(
    get,
    path = "/api/attendance/{user_id}/location-history",
    params(
        ("user_id" = u64, Path, description = "User whose samples to list"),
        ("date" = Option<String>, Query, description = "Restrict to one day")
    ),
    responses(
        (status = 200, description = "Samples in capture order", body = [LocationHistoryEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn location_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let day = match &query.date {
        Some(value) => Some(parse_date_param(value)?),
        None => None,
    };

    let mut sql = String::from(
        r#"
        SELECT l.latitude, l.longitude, l.address, l.sampled_at
        FROM attendance_locations l
        JOIN attendance a ON a.id = l.attendance_id
        WHERE a.user_id = ?
        "#,
    );
    if day.is_some() {
        sql.push_str(" AND a.work_date = ?");
    }
    sql.push_str(" ORDER BY l.sampled_at");

    let mut q = sqlx::query_as::<_, LocationHistoryEntry>(&sql).bind(user_id);
    if let Some(day) = day {
        q = q.bind(day);
    }

    let entries = q.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::FromRequest;
    use actix_web::test::TestRequest;

    async fn form_from(body: &'static str) -> Multipart {
        let (req, mut payload) = TestRequest::default()
            .insert_header((
                "content-type",
                "multipart/form-data; boundary=XBOUNDARY",
            ))
            .set_payload(body)
            .to_http_parts();
        Multipart::from_request(&req, &mut payload).await.unwrap()
    }

    #[actix_web::test]
    async fn check_in_without_image_is_rejected() {
        let form = form_from(concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"location\"\r\n\r\n",
            "{\"coordinates\":{\"latitude\":23.78,\"longitude\":90.27}}\r\n",
            "--XBOUNDARY--\r\n"
        ))
        .await;

        let err = read_check_in_form(form, 1024).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.to_string(), "Please upload an image");
    }

    #[actix_web::test]
    async fn check_in_with_non_image_upload_is_rejected() {
        let form = form_from(concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"x.txt\"\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "hello\r\n",
            "--XBOUNDARY--\r\n"
        ))
        .await;

        let err = read_check_in_form(form, 1024).await.unwrap_err();
        assert_eq!(err.to_string(), "Only image files are allowed");
    }

    #[actix_web::test]
    async fn check_in_with_oversized_image_is_rejected() {
        let form = form_from(concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"x.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "0123456789\r\n",
            "--XBOUNDARY--\r\n"
        ))
        .await;

        let err = read_check_in_form(form, 4).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.to_string().starts_with("File size too large"));
    }

    #[actix_web::test]
    async fn check_in_without_location_is_rejected() {
        let form = form_from(concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"x.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "fakejpegbytes\r\n",
            "--XBOUNDARY--\r\n"
        ))
        .await;

        let err = read_check_in_form(form, 1024).await.unwrap_err();
        assert_eq!(err.to_string(), "Location is required");
    }

    #[actix_web::test]
    async fn check_in_form_with_both_fields_parses() {
        let form = form_from(concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"x.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "fakejpegbytes\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"location\"\r\n\r\n",
            "{\"coordinates\":{\"latitude\":23.78,\"longitude\":90.27}}\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"device\"\r\n\r\n",
            "mobile\r\n",
            "--XBOUNDARY--\r\n"
        ))
        .await;

        let evidence = read_check_in_form(form, 1024).await.unwrap();
        assert_eq!(evidence.image, b"fakejpegbytes");
        assert_eq!(evidence.extension, "jpg");
        assert_eq!(evidence.location.coordinates.latitude, 23.78);
    }

    #[test]
    fn date_params_accept_dates_and_instants() {
        assert_eq!(
            parse_date_param("2026-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert_eq!(
            parse_date_param("2026-03-01T15:04:05Z").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert!(parse_date_param("03/01/2026").is_err());
    }

    #[test]
    fn csv_fields_are_escaped() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn export_includes_header_and_rows() {
        let rows = vec![ExportRow {
            username: "jdoe".to_string(),
            work_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            status: AttendanceStatus::CheckedOut,
            check_in_at: NaiveDate::from_ymd_opt(2026, 1, 5)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            check_out_at: NaiveDate::from_ymd_opt(2026, 1, 5)
                .unwrap()
                .and_hms_opt(18, 30, 0)
                .unwrap()
                .into(),
            hours_worked: Some(9.5),
            check_in_address: Some("HQ, floor 3".to_string()),
            check_out_address: None,
        }];

        let csv = export_csv(&rows);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("username,date,status"));
        let row = lines.next().unwrap();
        assert!(row.contains("jdoe"));
        assert!(row.contains("checked-out"));
        assert!(row.contains("9.5000"));
        assert!(row.contains("\"HQ, floor 3\""));
    }
}
