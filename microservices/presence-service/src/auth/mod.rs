//! Authentication
//!
//! Every presence route requires a bearer token. A token that fails
//! validation yields 401; a valid token for an identity the directory does
//! not know yields 403.

mod directory;
mod extractor;
mod token;

pub use directory::{InMemoryUserDirectory, UserDirectory, UserRecord};
pub use extractor::AuthenticatedUser;
pub use token::{Claims, TokenService};

use nexus_core::{NexusError, Result, UserId};
use std::sync::Arc;
use tracing::warn;

pub struct Authenticator {
    tokens: TokenService,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl Authenticator {
    /// Without a directory the token claims are trusted as the identity
    pub fn new(tokens: TokenService, directory: Option<Arc<dyn UserDirectory>>) -> Self {
        Self { tokens, directory }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Resolve the caller from a raw `Authorization` header value
    pub async fn authenticate(&self, header: Option<&str>) -> Result<UserRecord> {
        let header = header
            .ok_or_else(|| NexusError::Auth("Access denied. No token provided.".to_string()))?;
        let token = extract_bearer(header)
            .ok_or_else(|| NexusError::Auth("Invalid authorization scheme".to_string()))?;

        let claims = self.tokens.validate(token)?;
        let user_id = UserId::new(claims.sub.clone());

        match &self.directory {
            Some(directory) => match directory.find(&user_id).await? {
                Some(user) => Ok(user),
                None => {
                    warn!(user_id = %user_id, "Token subject not found in directory");
                    Err(NexusError::Forbidden("User not found".to_string()))
                }
            },
            None => Ok(UserRecord {
                id: user_id,
                name: claims.name,
                email: claims.email,
                role: claims.role,
            }),
        }
    }
}

pub fn extract_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
