use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ApiError,
    model::{role::Role, user::UserRow},
    models::{LoginReq, RegisterReq, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

/// Self-registration always creates employees; admins are seeded out of band.
pub async fn register(
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let username = user.username.trim();

    if username.is_empty() || user.password.is_empty() {
        return Err(ApiError::validation(
            "Username and password must not be empty",
        ));
    }

    let hashed = hash_password(&user.password);

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, password, role_id)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(&hashed)
    .bind(Role::Employee.id())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "User registered successfully"
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Err(ApiError::conflict("Username already exists"));
                }
            }
            Err(e.into())
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(ApiError::validation("Username or password required"));
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, password, role_id, is_blocked
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&user.username)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::Auth("Invalid credentials".to_string()))?;

    if verify_password(&user.password, &db_user.password).is_err() {
        info!("Invalid credentials: password mismatch");
        return Err(ApiError::Auth("Invalid credentials".to_string()));
    }

    if db_user.is_blocked {
        info!(user_id = db_user.id, "Blocked account attempted login");
        return Err(ApiError::forbidden("Your account has been blocked"));
    }

    let access_token = generate_access_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(db_user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref())
    .await?;

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    }))
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let claims = refresh_claims_from(&req, &config)?;

    let record = sqlx::query_as::<_, (u64, u64, bool)>(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let (token_id, user_id, revoked) = match record {
        Some(r) => r,
        None => return Err(ApiError::Auth("Unknown refresh token".to_string())),
    };
    if revoked {
        return Err(ApiError::Auth("Refresh token revoked".to_string()));
    }

    // Rotate: revoke the presented token, issue a fresh pair.
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(token_id)
        .execute(pool.get_ref())
        .await?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await?;

    let access_token = generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    Ok(HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    })))
}

/// Revokes the presented refresh token. Succeeds even if the token was
/// already revoked or never existed.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let claims = match refresh_claims_from(&req, &config) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}

fn refresh_claims_from(
    req: &HttpRequest,
    config: &Config,
) -> Result<crate::models::Claims, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Auth("No token".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Auth("Invalid token".to_string()))?;

    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| ApiError::Auth("Invalid token".to_string()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Auth("Refresh token required".to_string()));
    }

    Ok(claims)
}
