//! Signed, time-limited email activation links.
//!
//! A link carries two opaque path segments: the user id encoded as URL-safe
//! base64, and a token `{issued_at_hex}-{signature}`. The signature is an
//! HMAC-SHA256 over the user id, the current password hash and the last login
//! time, so changing the password or logging in again invalidates every
//! outstanding link. The email-verified flag is not part of the signed state,
//! so following the same link twice succeeds both times.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Default validity of an activation link.
pub const DEFAULT_ACTIVATION_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// The user state an activation token is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationState<'a> {
    pub user_id: usize,
    pub password_hash: &'a str,
    pub last_login: Option<i64>,
}

pub fn encode_uid(user_id: usize) -> String {
    URL_SAFE_NO_PAD.encode(user_id.to_string())
}

pub fn decode_uid(uid: &str) -> Option<usize> {
    let bytes = URL_SAFE_NO_PAD.decode(uid).ok()?;
    String::from_utf8(bytes).ok()?.parse().ok()
}

#[derive(Clone)]
pub struct ActivationTokenGenerator {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for ActivationTokenGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationTokenGenerator")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ActivationTokenGenerator {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    fn mac(&self, state: &ActivationState, issued_at: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any size"));
        let last_login = state
            .last_login
            .map(|t| t.to_string())
            .unwrap_or_default();
        mac.update(
            format!(
                "{}|{}|{}|{}",
                state.user_id, state.password_hash, last_login, issued_at
            )
            .as_bytes(),
        );
        mac
    }

    pub fn make_token(&self, state: &ActivationState, now: i64) -> String {
        let signature = self.mac(state, now).finalize().into_bytes();
        format!("{:x}-{}", now, URL_SAFE_NO_PAD.encode(signature))
    }

    /// Returns true if `token` was issued for `state` and has not expired.
    pub fn check_token(&self, state: &ActivationState, token: &str, now: i64) -> bool {
        let Some((issued_hex, signature)) = token.split_once('-') else {
            return false;
        };
        let Ok(issued_at) = i64::from_str_radix(issued_hex, 16) else {
            return false;
        };
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        if self.mac(state, issued_at).verify_slice(&signature).is_err() {
            return false;
        }
        issued_at <= now && (now - issued_at) as u64 <= self.ttl.as_secs()
    }
}
