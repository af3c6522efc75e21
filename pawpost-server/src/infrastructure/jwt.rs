use crate::domain::DomainError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub exp: usize,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Result<Self, DomainError> {
        if secret.is_empty() {
            return Err(DomainError::InternalError(
                "JWT secret cannot be empty".to_string(),
            ));
        }

        if secret.len() < 32 {
            tracing::warn!(
                "JWT secret is too short ({} chars). Minimum recommended is 32 chars.",
                secret.len()
            );
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn generate_token(&self, user_id: i64, username: String) -> Result<String, DomainError> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::hours(TOKEN_LIFETIME_HOURS))
            .ok_or_else(|| DomainError::InternalError("Token expiry overflow".to_string()))?
            .timestamp() as usize;

        let claims = Claims {
            user_id,
            username,
            exp: expiration,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {}", e);
            DomainError::InternalError(format!("Failed to generate token: {}", e))
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<i64, DomainError> {
        match decode::<Claims>(token, &self.decoding_key, &Validation::default()) {
            Ok(token_data) => {
                tracing::debug!("Token verified for user_id: {}", token_data.claims.user_id);
                Ok(token_data.claims.user_id)
            }
            Err(e) => {
                tracing::warn!("Token verification failed: {}", e);
                Err(DomainError::Unauthorized(format!("Invalid token: {}", e)))
            }
        }
    }
}
