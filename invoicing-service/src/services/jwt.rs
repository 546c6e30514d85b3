use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// Issues and validates HS256 access tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_minutes: i64,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<Uuid, anyhow::Error> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow::anyhow!("Invalid subject in token: {}", e))
    }
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        if config.secret.is_empty() {
            return Err(anyhow::anyhow!("JWT secret must not be empty"));
        }

        tracing::info!("JWT service initialized with HS256 secret");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            expiry_minutes: config.expiry_minutes,
        })
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: Uuid, email: &str) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Validate and decode an access token
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;

        Ok(token_data.claims)
    }

    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(expiry_minutes: i64) -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiry_minutes,
        }
    }

    #[test]
    fn test_access_token_generation_and_validation() -> Result<(), anyhow::Error> {
        let service = JwtService::new(&config(60))?;
        let user_id = Uuid::new_v4();

        let token = service.generate_access_token(user_id, "jonas@example.lt")?;
        let claims = service.validate_access_token(&token)?;

        assert_eq!(claims.user_id()?, user_id);
        assert_eq!(claims.email, "jonas@example.lt");
        assert_eq!(claims.exp - claims.iat, 3600);
        Ok(())
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() -> Result<(), anyhow::Error> {
        let service = JwtService::new(&config(60))?;
        let other = JwtService::new(&JwtConfig {
            secret: "another-secret".to_string(),
            expiry_minutes: 60,
        })?;

        let token = other.generate_access_token(Uuid::new_v4(), "a@b.lt")?;
        assert!(service.validate_access_token(&token).is_err());
        Ok(())
    }

    #[test]
    fn test_expired_token_is_rejected() -> Result<(), anyhow::Error> {
        let service = JwtService::new(&config(-10))?;
        let token = service.generate_access_token(Uuid::new_v4(), "a@b.lt")?;
        assert!(service.validate_access_token(&token).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(JwtService::new(&JwtConfig {
            secret: String::new(),
            expiry_minutes: 60,
        })
        .is_err());
    }
}
