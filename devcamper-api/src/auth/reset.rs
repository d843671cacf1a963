//! Password reset tokens and their delivery

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::error::Result;
use crate::models::User;

/// Plain token handed to the user plus the digest stored on the account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    /// Sent to the user, never stored
    pub token: String,
    /// blake3 hex digest of `token`
    pub digest: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// Generate a random 20-byte hex token valid for `ttl`
    pub fn generate(ttl: Duration) -> Self {
        let mut bytes = [0u8; 20];
        rand::rng().fill(&mut bytes);
        let token: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self {
            digest: digest(&token),
            token,
            expires_at: Utc::now() + ttl,
        }
    }
}

/// Digest stored in place of a reset token
pub fn digest(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Delivers a password reset link
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    /// Send `reset_url` to the user
    async fn send_reset(&self, user: &User, reset_url: &str) -> Result<()>;
}

/// Writes the reset link to the log instead of sending mail
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send_reset(&self, user: &User, reset_url: &str) -> Result<()> {
        tracing::info!(
            user_id = %user.id,
            email = %user.email,
            reset_url,
            "password reset requested"
        );
        Ok(())
    }
}
