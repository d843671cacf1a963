//! HS256 session tokens

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::Result;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Signs and verifies session tokens with a shared secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    lifetime: Duration,
    issuer: Option<String>,
}

impl TokenIssuer {
    /// Build from the JWT configuration
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(config.secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            validation: Arc::new(validation),
            lifetime: Duration::days(i64::from(config.expire_days)),
            issuer: config.issuer.clone(),
        }
    }

    /// Sign a token for `user_id`
    pub fn issue(&self, user_id: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.lifetime).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Verify signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}
