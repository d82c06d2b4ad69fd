//! Durable identity provider: a client-side token that survives
//! reconnects, so peers can key tiles on it instead of the transient
//! connection id.

use crate::message::UserId;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;

const TOKEN_LEN: usize = 32;

/// File-backed store for the durable identity token.
///
/// The token is opaque and only as unique as 32 random alphanumeric
/// characters make it; nothing detects two stores producing the same one.
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        IdentityStore { path: path.into() }
    }

    /// Returns the persisted token, generating and persisting a fresh one
    /// on first use. An unreadable or empty file also yields a fresh token;
    /// identity is lost in that case, not the ability to join.
    pub fn get_or_create(&self) -> io::Result<UserId> {
        match fs::read_to_string(&self.path) {
            Ok(existing) => {
                let token = existing.trim();
                if !token.is_empty() {
                    return Ok(UserId(token.to_string()));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                debug!("identity file unreadable ({e}), regenerating");
            }
        }

        let token: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        fs::write(&self.path, &token)?;
        Ok(UserId(token))
    }
}
