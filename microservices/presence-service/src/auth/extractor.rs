//! Bearer token extraction for handlers

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use super::{Authenticator, UserRecord};
use crate::error::ApiError;

/// The caller resolved from the `Authorization: Bearer` header
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserRecord);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<Authenticator>::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let user = auth.authenticate(header).await?;
        Ok(Self(user))
    }
}
