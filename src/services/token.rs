//! Identifier encoding and activation/reset tokens
//!
//! An activation token is `<timestamp base36>-<hex HMAC-SHA256>`. The MAC
//! covers the user's id, password hash, active flag and email together with
//! the timestamp, so a token stops verifying as soon as any of those change:
//! activating the account or setting a password consumes every outstanding
//! token for that user. Nothing is stored server side.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z
const TOKEN_EPOCH_OFFSET: i64 = 978_307_200;

const KEY_SALT: &str = "hr_onboarding.tokens.ActivationTokenGenerator";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid user identifier")]
pub struct InvalidIdentifier;

/// Encode a user id into a URL-safe opaque string
pub fn encode_id(id: i64) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Reverse of [`encode_id`]
pub fn decode_id(encoded: &str) -> Result<i64, InvalidIdentifier> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim())
        .map_err(|_| InvalidIdentifier)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| InvalidIdentifier)?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        return Err(InvalidIdentifier);
    }
    text.parse().map_err(|_| InvalidIdentifier)
}

/// Stateless generator and checker of activation and password reset tokens
#[derive(Clone)]
pub struct ActivationTokenGenerator {
    secret: String,
    ttl_secs: i64,
}

impl std::fmt::Debug for ActivationTokenGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationTokenGenerator")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl ActivationTokenGenerator {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Token for the user's current state
    pub fn make_token(&self, user: &User) -> String {
        self.make_token_at(user, current_timestamp())
    }

    /// True if the token was issued for the user's current state and is
    /// still inside the validity window. Never errors.
    pub fn check_token(&self, user: &User, token: &str) -> bool {
        self.check_token_at(user, token, current_timestamp())
    }

    fn make_token_at(&self, user: &User, timestamp: i64) -> String {
        let mac = self.mac_for(user, timestamp);
        format!(
            "{}-{}",
            to_base36(timestamp),
            hex::encode(mac.finalize().into_bytes())
        )
    }

    fn check_token_at(&self, user: &User, token: &str, now: i64) -> bool {
        let Some((ts_b36, signature)) = token.split_once('-') else {
            return false;
        };
        let Some(timestamp) = from_base36(ts_b36) else {
            return false;
        };
        let Ok(signature_bytes) = hex::decode(signature) else {
            return false;
        };

        if self.mac_for(user, timestamp).verify_slice(&signature_bytes).is_err() {
            return false;
        }

        timestamp <= now && now - timestamp <= self.ttl_secs
    }

    fn mac_for(&self, user: &User, timestamp: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(KEY_SALT.as_bytes());
        mac.update(b"\x00");
        mac.update(
            format!(
                "{}{}{}{}{}",
                user.id,
                user.password_hash,
                u8::from(user.is_active),
                timestamp,
                user.email.to_lowercase()
            )
            .as_bytes(),
        );
        mac
    }
}

fn current_timestamp() -> i64 {
    Utc::now().timestamp() - TOKEN_EPOCH_OFFSET
}

fn to_base36(mut value: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn from_base36(value: &str) -> Option<i64> {
    if value.is_empty() || value.len() > 13 {
        return None;
    }
    i64::from_str_radix(value, 36).ok().filter(|v| *v >= 0)
}
