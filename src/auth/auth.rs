use crate::error::ApiError;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

/// Authenticated caller, resolved by the auth middleware and injected into
/// request extensions.
#[derive(Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Blocked accounts may still read, but every mutating attendance
    /// operation refuses them.
    pub blocked: bool,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ApiError::Auth("Missing token".to_string()).into()),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_active(&self) -> Result<(), ApiError> {
        if self.blocked {
            Err(ApiError::forbidden("Your account has been blocked"))
        } else {
            Ok(())
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
