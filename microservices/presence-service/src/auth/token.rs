//! JWT issuing and validation

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use nexus_core::{NexusError, Result, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::directory::UserRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    expiry_secs: u64,
}

impl TokenService {
    pub fn new(secret: &str, issuer: &str, expiry_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            expiry_secs,
        }
    }

    /// Generate an access token for `user`
    pub fn issue(&self, user: &UserRecord) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiry_secs as i64);

        let claims = Claims {
            sub: user.id.to_string(),
            iss: self.issuer.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| NexusError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Validate signature, expiry and issuer
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| NexusError::Auth(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::UserId;

    fn admin() -> UserRecord {
        UserRecord {
            id: UserId::new("u-admin"),
            name: "Ana".to_string(),
            email: "ana@nexus.test".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_issue_then_validate() {
        let tokens = TokenService::new("secret", "nexus", 3600);
        let token = tokens.issue(&admin()).unwrap();

        let claims = tokens.validate(&token).unwrap();
        assert_eq!(claims.sub, "u-admin");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, "nexus");
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issuer_a = TokenService::new("secret", "nexus", 3600);
        let issuer_b = TokenService::new("secret", "elsewhere", 3600);
        let token = issuer_a.issue(&admin()).unwrap();

        assert!(matches!(issuer_b.validate(&token), Err(NexusError::Auth(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenService::new("secret", "nexus", 3600)
            .issue(&admin())
            .unwrap();
        let other = TokenService::new("other-secret", "nexus", 3600);

        assert!(matches!(other.validate(&token), Err(NexusError::Auth(_))));
    }
}
