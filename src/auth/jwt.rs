//! JWT access/refresh token issue and validation.

use crate::error::{AppError, AppResult};
use crate::models::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub user_id: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

/// Signed access + refresh token strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues a token pair for an authenticated user.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> AppResult<TokenPair>;
}

/// HS256 signing key plus token lifetimes.
#[derive(Clone)]
pub struct JwtSecret {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtSecret {
    pub fn new(secret: String, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            secret,
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    fn encode(&self, user_id: Uuid, token_type: TokenType) -> AppResult<String> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            token_type,
            user_id: user_id.to_string(),
            jti: Uuid::new_v4().as_simple().to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(e.to_string()))
    }

    /// New access token for `user_id`.
    pub fn issue_access(&self, user_id: Uuid) -> AppResult<String> {
        self.encode(user_id, TokenType::Access)
    }

    /// Check signature, expiry and token type; returns the user id.
    pub fn validate(&self, token: &str, expected: TokenType) -> AppResult<Uuid> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AppError::Jwt(e.to_string()))?;
        if data.claims.token_type != expected {
            return Err(AppError::Jwt("Token has wrong type".to_string()));
        }
        let id =
            Uuid::parse_str(&data.claims.user_id).map_err(|e| AppError::Jwt(e.to_string()))?;
        Ok(id)
    }
}

impl TokenIssuer for JwtSecret {
    fn issue(&self, user: &User) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.encode(user.id, TokenType::Access)?,
            refresh: self.encode(user.id, TokenType::Refresh)?,
        })
    }
}
