//! Bearer-token authentication extractor

use anyhow::anyhow;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use ld_backend::AuthUser;

use crate::error::{ErrorKind, ServerError};
use crate::state::State;

/// The authenticated caller, resolved from the `Authorization` header.
///
/// Any failure to resolve the token (missing header, malformed scheme,
/// or a rejection from the identity provider) collapses to 401.
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = parts
            .extensions
            .get::<State>()
            .cloned()
            .ok_or_else(|| ErrorKind::Remote(anyhow!("state extension missing")))?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ErrorKind::Unauthorized)?;

        let user = state
            .auth
            .get_user(token)
            .await
            .map_err(|_| ErrorKind::Unauthorized)?;
        Ok(CurrentUser(user))
    }
}
