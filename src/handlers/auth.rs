//! Caller identity.
//!
//! Tokens are verified by the gateway in front of this service, which
//! forwards the authenticated user as `X-User-Id` and a comma-separated
//! `X-User-Roles` list.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::principal::{Principal, Role};
use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLES_HEADER: &str = "X-User-Roles";

impl FromRequest for Principal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(principal_from_headers(req))
    }
}

fn principal_from_headers(req: &HttpRequest) -> Result<Principal, AppError> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
    let user_id = Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;

    let roles = req
        .headers()
        .get(USER_ROLES_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(parse_roles)
        .unwrap_or_default();

    Ok(Principal::new(user_id, roles))
}

/// Unknown role names are dropped.
fn parse_roles(header: &str) -> Vec<Role> {
    header
        .split(',')
        .filter(|r| !r.trim().is_empty())
        .filter_map(|r| match r.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                log::debug!("Ignoring role: {}", e);
                None
            }
        })
        .collect()
}

pub fn require_any_role(principal: &Principal, roles: &[Role]) -> Result<(), AppError> {
    if principal.has_any_role(roles) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {} lacks a required role",
            principal.user_id
        )))
    }
}
