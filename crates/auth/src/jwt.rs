//! JSON Web Token issuing and validation.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Public id of the user.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub kind: TokenKind,
    pub jti: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

/// Issues and validates one kind of token with its own secret.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    kind: TokenKind,
    ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, issuer: impl Into<String>, kind: TokenKind, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            kind,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn generate_token(&self, subject: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
            iss: self.issuer.clone(),
            kind: self.kind,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Decode `token`, checking signature, expiry, issuer and token kind.
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.kind != self.kind {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_that_is_long_enough_for_hs256";

    fn manager(kind: TokenKind, ttl: Duration) -> JwtManager {
        JwtManager::new(SECRET, "supportdesk-test", kind, ttl)
    }

    #[test]
    fn test_token_generation_and_validation() {
        let jwt = manager(TokenKind::Access, Duration::from_secs(60));
        let token = jwt.generate_token("user_123").unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.iss, "supportdesk-test");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_tokens_are_unique() {
        let jwt = manager(TokenKind::Refresh, Duration::from_secs(60));
        let first = jwt.generate_token("user_123").unwrap();
        let second = jwt.generate_token("user_123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_token() {
        let jwt = manager(TokenKind::Access, Duration::from_secs(60));
        assert_eq!(jwt.validate_token("invalid.jwt.token").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_expired_token() {
        let jwt = manager(TokenKind::Access, Duration::from_secs(0));
        let token = jwt.generate_token("user_123").unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(jwt.validate_token(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let access = manager(TokenKind::Access, Duration::from_secs(60));
        let refresh = manager(TokenKind::Refresh, Duration::from_secs(60));
        let token = refresh.generate_token("user_123").unwrap();
        assert_eq!(access.validate_token(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let jwt = manager(TokenKind::Access, Duration::from_secs(60));
        let other = JwtManager::new(
            "another_secret_key_that_is_long_enough",
            "supportdesk-test",
            TokenKind::Access,
            Duration::from_secs(60),
        );
        let token = other.generate_token("user_123").unwrap();
        assert_eq!(jwt.validate_token(&token).unwrap_err(), TokenError::Invalid);
    }
}
