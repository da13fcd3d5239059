use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use foodtasker_order_service::clock::Clock;
use foodtasker_order_service::models::{Credential, Role};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Access token is required")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token has expired")]
    Expired,
    #[error("Unknown account")]
    UnknownAccount,
    #[error("Cannot issue token")]
    Issue,
}

/// Turns a bearer credential into the account and role it stands for.
#[async_trait]
pub trait IdentityGate: Send + Sync {
    async fn validate(&self, token: &str) -> Result<Credential, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    exp: usize,
    iat: usize,
    sub: String,
    role: Role,
}

/// HS256 tokens signed with a shared secret. Expiry is judged by the
/// injected clock rather than the system time.
pub struct JwtIdentityGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl JwtIdentityGate {
    pub const ACCESS_TOKEN_EXPIRES_HOURS: i64 = 8;

    pub fn new(secret_key: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_ref()),
            decoding_key: DecodingKey::from_secret(secret_key.as_ref()),
            clock,
        }
    }

    pub fn issue(&self, account_id: Uuid, role: Role, ttl: TimeDelta) -> Result<String, AuthError> {
        let now = self.clock.now();
        let claims = Claims {
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
            sub: account_id.to_string(),
            role,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| AuthError::Issue)
    }
}

#[async_trait]
impl IdentityGate for JwtIdentityGate {
    async fn validate(&self, token: &str) -> Result<Credential, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let token = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        if token.claims.exp as i64 <= self.clock.now().timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(Credential {
            account_id: Uuid::parse_str(&token.claims.sub).map_err(|_| AuthError::InvalidToken)?,
            role: token.claims.role,
        })
    }
}
