//! Integrity protection applied to encoded state before it leaves the server.

use std::fmt;

use crate::error::{CorruptionKind, Result};

/// Transform applied after encoding and reversed before decoding.
///
/// `user_key` is an optional per-visitor value (typically a session id)
/// bound into the protection, so a field issued to one visitor is rejected
/// when replayed by another. Implementations that do not authenticate may
/// ignore it.
pub trait StateProtector: Send + Sync + fmt::Debug {
    fn protect(&self, bytes: Vec<u8>, user_key: Option<&str>) -> Vec<u8>;

    /// Fails with [`CorruptionKind::IntegrityCheckFailed`] when the payload
    /// was not produced by [`protect`](Self::protect) with the same settings
    /// and user key.
    fn unprotect(&self, bytes: Vec<u8>, user_key: Option<&str>) -> Result<Vec<u8>>;
}

/// Passes bytes through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProtection;

impl StateProtector for NoProtection {
    fn protect(&self, bytes: Vec<u8>, _user_key: Option<&str>) -> Vec<u8> {
        bytes
    }

    fn unprotect(&self, bytes: Vec<u8>, _user_key: Option<&str>) -> Result<Vec<u8>> {
        Ok(bytes)
    }
}

/// Key derivation context; changing it invalidates every issued field.
const KEY_CONTEXT: &str = "postback 2024-06 hidden state field mac v1";

pub const MAC_LEN: usize = blake3::OUT_LEN;

/// Appends a keyed BLAKE3 tag and verifies it on the way back in.
///
/// The 32-byte MAC key is derived from the configured secret, so secrets of
/// any length are accepted.
#[derive(Clone)]
pub struct MacProtector {
    key: [u8; blake3::KEY_LEN],
}

impl MacProtector {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret),
        }
    }

    fn tag(&self, payload: &[u8], user_key: Option<&str>) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        match user_key {
            Some(user_key) => {
                hasher.update(&[1]);
                hasher.update(&(user_key.len() as u64).to_le_bytes());
                hasher.update(user_key.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(payload);
        hasher.finalize()
    }
}

impl fmt::Debug for MacProtector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacProtector").finish_non_exhaustive()
    }
}

impl StateProtector for MacProtector {
    fn protect(&self, mut bytes: Vec<u8>, user_key: Option<&str>) -> Vec<u8> {
        let tag = self.tag(&bytes, user_key);
        bytes.extend_from_slice(tag.as_bytes());
        bytes
    }

    fn unprotect(&self, mut bytes: Vec<u8>, user_key: Option<&str>) -> Result<Vec<u8>> {
        let Some(split) = bytes.len().checked_sub(MAC_LEN) else {
            tracing::warn!(len = bytes.len(), "State payload shorter than its MAC");
            return Err(CorruptionKind::IntegrityCheckFailed.into());
        };
        let received = <[u8; MAC_LEN]>::try_from(&bytes[split..])
            .map_err(|_| CorruptionKind::IntegrityCheckFailed)?;
        // blake3::Hash compares in constant time.
        if self.tag(&bytes[..split], user_key) != blake3::Hash::from(received) {
            tracing::warn!(user_key = user_key.is_some(), "State payload failed MAC verification");
            return Err(CorruptionKind::IntegrityCheckFailed.into());
        }
        bytes.truncate(split);
        Ok(bytes)
    }
}
