//! Bearer-token validation.
//!
//! Tokens are HS256-signed JWTs issued by the identity service; this server
//! only verifies them and reads the subject as the owner id.

use chemviz_core::types::OwnerId;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// JWT claims carried by every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the owning user's id.
    pub sub: OwnerId,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp). Optional in incoming tokens.
    #[serde(default)]
    pub iat: i64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to verify tokens.
    pub secret: String,
}

impl JwtConfig {
    /// Load from `JWT_SECRET`, which must be set and non-empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        Ok(Self { secret })
    }
}

/// Validate and decode an access token, returning the embedded [`Claims`].
///
/// Checks the signature and expiry.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encoding should succeed")
    }

    fn claims(exp_offset_secs: i64) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: 42,
            exp: now + exp_offset_secs,
            iat: now - 10,
        }
    }

    #[test]
    fn test_valid_token_yields_claims() {
        let config = test_config();
        let token = sign(&claims(900), &config.secret);
        let decoded = validate_token(&token, &config).expect("token validation should succeed");
        assert_eq!(decoded.sub, 42);
    }

    #[test]
    fn test_token_with_only_subject_and_expiry_is_accepted() {
        let config = test_config();
        let exp = chrono::Utc::now().timestamp() + 900;
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "sub": 7, "exp": exp }),
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("encoding should succeed");

        let decoded = validate_token(&token, &config).expect("minimal claims should validate");
        assert_eq!(decoded.sub, 7);
        assert_eq!(decoded.iat, 0);
    }

    #[test]
    fn test_unknown_claims_are_ignored() {
        let config = test_config();
        let exp = chrono::Utc::now().timestamp() + 900;
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "sub": 7, "exp": exp, "role": "admin", "jti": "abc" }),
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("encoding should succeed");

        assert_eq!(validate_token(&token, &config).unwrap().sub, 7);
    }

    #[test]
    fn test_expired_token_fails() {
        let config = test_config();
        // Well beyond the default 60-second leeway.
        let token = sign(&claims(-300), &config.secret);
        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn test_different_secret_fails() {
        let token = sign(&claims(900), "secret-alpha");
        let config = JwtConfig {
            secret: "secret-bravo".to_string(),
        };
        assert!(validate_token(&token, &config).is_err());
    }
}
