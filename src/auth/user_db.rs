// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The user-database interface and the authentication glue in front of
//! it. The verifier is constant-time with respect to user existence: a
//! missing user still pays for one digest computation and one
//! fixed-length comparison against a dummy digest.

use std::{collections::HashMap, pin::Pin};

use anyhow::Result;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use crate::{
    auth::{rate_limiter::RateLimiter, rbac::Role},
    cfg::config::UserConfig,
    transport::channel::Identity,
};

/// One record as the external store returns it.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Lower-case hex SHA-256 of the secret.
    pub password_digest: String,
    pub role: Role,
    pub enabled: bool,
    pub public_keys: Vec<String>,
}

/// Why verification failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyFailure {
    #[error("user not found")]
    UserNotFound,
    #[error("user disabled")]
    UserDisabled,
    #[error("invalid password")]
    InvalidPassword,
    #[error("password verification error")]
    PasswordVerificationError,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("too many failed attempts, try again later")]
    RateLimited,
    #[error(transparent)]
    Rejected(#[from] VerifyFailure),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type BoxedLookup<'a> = Pin<Box<dyn Future<Output = Result<Option<UserRecord>>> + Send + 'a>>;

pub trait UserDatabase: Send + Sync {
    fn lookup<'a>(&'a self, username: &'a str) -> BoxedLookup<'a>;
}

/// In-memory store fed from the YAML config; the development harness
/// and the tests use it in place of a real user database.
#[derive(Debug, Default)]
pub struct StaticUserDb {
    users: HashMap<String, UserRecord>,
}

impl StaticUserDb {
    pub fn from_config(users: &[UserConfig]) -> Self {
        let users = users
            .iter()
            .map(|u| {
                (
                    u.username.clone(),
                    UserRecord {
                        password_digest: u.password_sha256.to_lowercase(),
                        role: u.role,
                        enabled: u.enabled,
                        public_keys: u.public_keys.clone(),
                    },
                )
            })
            .collect();
        Self { users }
    }
}

impl UserDatabase for StaticUserDb {
    fn lookup<'a>(&'a self, username: &'a str) -> BoxedLookup<'a> {
        let record = self.users.get(username).cloned();
        Box::pin(async move { Ok(record) })
    }
}

/// Digest that absent users are verified against, so the failure path
/// costs the same work as the present-user path.
static DUMMY_DIGEST: Lazy<String> = Lazy::new(|| password_digest(""));

pub fn password_digest(secret: &str) -> String {
    use std::fmt::Write;

    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Byte-wise constant-time equality over equal-length inputs.
fn digest_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Verifies a secret against a record, dummy-hashing when the user is
/// unknown.
pub fn verify_password(
    record: Option<&UserRecord>,
    secret: &str,
) -> Result<Role, VerifyFailure> {
    let supplied = password_digest(secret);
    match record {
        None => {
            // Burn the comparison anyway.
            let _ = digest_eq(&supplied, &DUMMY_DIGEST);
            Err(VerifyFailure::UserNotFound)
        },
        Some(record) => {
            if record.password_digest.len() != 64 {
                return Err(VerifyFailure::PasswordVerificationError);
            }
            let ok = digest_eq(&supplied, &record.password_digest);
            if !record.enabled {
                return Err(VerifyFailure::UserDisabled);
            }
            if ok {
                Ok(record.role)
            } else {
                Err(VerifyFailure::InvalidPassword)
            }
        },
    }
}

/// Full authentication path: rate-limiter gate, user lookup, constant
/// time verification, failure recording. On success both limiter keys
/// are reset and an [`Identity`] is produced for the serve loop.
pub async fn authenticate<D: UserDatabase + ?Sized>(
    db: &D,
    limiter: &RateLimiter,
    peer_addr: &str,
    username: &str,
    secret: &str,
) -> Result<Identity, AuthError> {
    let ip = peer_addr.rsplit_once(':').map_or(peer_addr, |(host, _)| host);
    if !limiter.check_ip(ip) || !limiter.check_user(username) {
        warn!(user = username, peer = peer_addr, "authentication rate-limited");
        return Err(AuthError::RateLimited);
    }

    let record = db.lookup(username).await?;
    match verify_password(record.as_ref(), secret) {
        Ok(role) => {
            limiter.record_success(ip, username);
            Ok(Identity {
                username: username.to_string(),
                role,
                peer_addr: peer_addr.to_string(),
            })
        },
        Err(reason) => {
            limiter.record_failure(ip, username);
            warn!(user = username, peer = peer_addr, %reason, "authentication failed");
            Err(AuthError::Rejected(reason))
        },
    }
}
