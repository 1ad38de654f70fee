//! Bearer-token guard for administrator routes.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::config::AdminAuth;
use crate::models::AccountKind;
use crate::state::AppState;
use crate::utils::error::AppError;

/// Caller of an administrator route.
///
/// With [`AdminAuth::Required`] a valid token issued to a user or system
/// account must be presented. With [`AdminAuth::Open`] every caller is let
/// through and a valid admin token only identifies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admin {
    pub account_id: Option<Uuid>,
}

#[async_trait]
impl<S> FromRequestParts<AppState<S>> for Admin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let required = state.admin_auth == AdminAuth::Required;

        let Some(token) = bearer_token(parts) else {
            return if required {
                Err(AppError::Unauthorized("Missing bearer token".to_string()))
            } else {
                Ok(Admin { account_id: None })
            };
        };

        match state.credentials.verify_token(token, Utc::now()) {
            Ok(claims) if claims.kind != AccountKind::Member => Ok(Admin {
                account_id: Some(claims.sub),
            }),
            Ok(claims) if required => {
                debug!(account_id = %claims.sub, "Member token on admin route");
                Err(AppError::Forbidden(
                    "Administrator access required".to_string(),
                ))
            }
            Err(e) if required => Err(e.into()),
            _ => Ok(Admin { account_id: None }),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
