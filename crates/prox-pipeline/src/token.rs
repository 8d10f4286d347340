//! Process tokens for the on-demand synchronous path.
//!
//! A token is `{expiry_unix}.{hex(hmac_sha256(secret, "{type}:{id}:{expiry}"))}`.
//! It authorizes one origin for a short window and carries no other state.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use prox_core::entities::EntityRef;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("process tokens are disabled: no secret configured")]
    Disabled,

    #[error("malformed process token")]
    Malformed,

    #[error("process token expired")]
    Expired,

    #[error("process token signature mismatch")]
    BadSignature,
}

#[derive(Clone)]
pub struct ProcessTokens {
    secret: String,
    validity: chrono::Duration,
}

impl ProcessTokens {
    #[must_use]
    pub fn new(secret: impl Into<String>, validity_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            validity: crate::seconds(validity_secs),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    fn mac(&self, origin: EntityRef, expiry: i64) -> Result<HmacSha256, TokenError> {
        if !self.enabled() {
            return Err(TokenError::Disabled);
        }
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| TokenError::Disabled)?;
        mac.update(format!("{}:{}:{expiry}", origin.entity_type, origin.id).as_bytes());
        Ok(mac)
    }

    /// Issue a token for `origin`, valid from `now` for the configured window.
    pub fn issue(&self, origin: EntityRef, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expiry = (now + self.validity).timestamp();
        let signature = self.mac(origin, expiry)?.finalize().into_bytes();
        Ok(format!("{expiry}.{}", hex::encode(signature)))
    }

    /// Check signature and expiry in constant time.
    pub fn verify(
        &self,
        origin: EntityRef,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let (expiry, signature) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        let expiry: i64 = expiry.parse().map_err(|_| TokenError::Malformed)?;
        let provided = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        self.mac(origin, expiry)?
            .verify_slice(&provided)
            .map_err(|_| TokenError::BadSignature)?;
        if now.timestamp() > expiry {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}
