// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::auth::rbac::Role;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Session-facing server parameters (limits, timeouts, lock policy).
    pub server: ServerConfig,
    /// Transport framing caps shared by the base:1.0 and base:1.1 codecs.
    #[serde(default)]
    pub framing: FramingConfig,
    /// Inbound XML document guard limits.
    #[serde(default)]
    pub xml: XmlConfig,
    /// Sliding-window authentication rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Datastore bootstrap behaviour.
    #[serde(default)]
    pub datastore: DatastoreConfig,
    /// Static user records for the development harness and tests. A real
    /// deployment replaces these with an external user database.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServerConfig {
    /// Listen address used by the development binary.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Hard cap on concurrently live sessions. Connections over the limit
    /// are rejected before the hello exchange.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u32,
    /// A session with no traffic for this long is expired by the cleanup
    /// ticker.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Total session lifetime bound, measured from creation.
    #[serde(default = "default_absolute_timeout")]
    pub absolute_timeout_secs: u64,
    /// Cleanup ticker period.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// Datastore lock absolute timeout.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,
    /// Whether commit empties the per-session candidate. The default keeps
    /// it so subsequent edits stack.
    #[serde(default)]
    pub clear_candidate_on_commit: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FramingConfig {
    /// Per-message decode cap. The per-chunk cap equals this value.
    #[serde(default = "default_max_message")]
    pub max_message_bytes: usize,
    /// Cap on a base:1.1 chunk-header line, terminator included.
    #[serde(default = "default_max_header_line")]
    pub max_header_line_bytes: usize,
    /// Largest chunk the encoder emits.
    #[serde(default = "default_encode_chunk")]
    pub encode_chunk_bytes: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct XmlConfig {
    #[serde(default = "default_max_document")]
    pub max_document_bytes: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
    #[serde(default = "default_max_attributes")]
    pub max_attributes: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_ip_window")]
    pub ip_window_secs: u64,
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    #[serde(default = "default_user_window")]
    pub user_window_secs: u64,
    #[serde(default = "default_user_limit")]
    pub user_limit: usize,
    #[serde(default = "default_lockout")]
    pub lockout_secs: u64,
    #[serde(default = "default_prune_interval")]
    pub prune_interval_secs: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct DatastoreConfig {
    /// Optional path to the initial running configuration in the
    /// line-oriented `set` text form. Absent means an empty running config.
    #[serde(default)]
    pub initial_config_path: Option<String>,
}

/// One static user record. `password_sha256` is the lower-case hex SHA-256
/// digest of the secret.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UserConfig {
    pub username: String,
    pub password_sha256: String,
    pub role: Role,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub public_keys: Vec<String>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8300".to_string()
}

fn default_max_sessions() -> u32 {
    64
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_absolute_timeout() -> u64 {
    3600 * 12
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_lock_timeout() -> u64 {
    3600
}

fn default_max_message() -> usize {
    16 * 1024 * 1024
}

fn default_max_header_line() -> usize {
    64
}

fn default_encode_chunk() -> usize {
    4096
}

fn default_max_document() -> usize {
    10 * 1024 * 1024
}

fn default_max_depth() -> usize {
    50
}

fn default_max_elements() -> usize {
    10_000
}

fn default_max_attributes() -> usize {
    20
}

fn default_ip_window() -> u64 {
    300
}

fn default_ip_limit() -> usize {
    3
}

fn default_user_window() -> u64 {
    600
}

fn default_user_limit() -> usize {
    5
}

fn default_lockout() -> u64 {
    900
}

fn default_prune_interval() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_sessions: default_max_sessions(),
            idle_timeout_secs: default_idle_timeout(),
            absolute_timeout_secs: default_absolute_timeout(),
            cleanup_interval_secs: default_cleanup_interval(),
            lock_timeout_secs: default_lock_timeout(),
            clear_candidate_on_commit: false,
        }
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: default_max_message(),
            max_header_line_bytes: default_max_header_line(),
            encode_chunk_bytes: default_encode_chunk(),
        }
    }
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: default_max_document(),
            max_depth: default_max_depth(),
            max_elements: default_max_elements(),
            max_attributes: default_max_attributes(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip_window_secs: default_ip_window(),
            ip_limit: default_ip_limit(),
            user_window_secs: default_user_window(),
            user_limit: default_user_limit(),
            lockout_secs: default_lockout(),
            prune_interval_secs: default_prune_interval(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            framing: FramingConfig::default(),
            xml: XmlConfig::default(),
            rate_limit: RateLimitConfig::default(),
            datastore: DatastoreConfig::default(),
            users: Vec::new(),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.server.max_sessions > 0, "max_sessions must be > 0");
        ensure!(
            self.framing.max_message_bytes > 0,
            "framing.max_message_bytes must be > 0"
        );
        ensure!(
            self.framing.encode_chunk_bytes > 0
                && self.framing.encode_chunk_bytes <= self.framing.max_message_bytes,
            "framing.encode_chunk_bytes must be within (0, max_message_bytes]"
        );
        ensure!(
            self.framing.max_header_line_bytes >= 4,
            "framing.max_header_line_bytes too small to hold a chunk header"
        );
        ensure!(self.xml.max_depth > 0, "xml.max_depth must be > 0");
        ensure!(self.xml.max_elements > 0, "xml.max_elements must be > 0");
        for user in &self.users {
            ensure!(!user.username.is_empty(), "user with empty username");
            ensure!(
                user.password_sha256.len() == 64
                    && user
                        .password_sha256
                        .bytes()
                        .all(|b| b.is_ascii_hexdigit()),
                "user {}: password_sha256 must be 64 hex chars",
                user.username
            );
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.server.idle_timeout_secs)
    }

    pub fn absolute_timeout(&self) -> Duration {
        Duration::from_secs(self.server.absolute_timeout_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.server.cleanup_interval_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.server.lock_timeout_secs)
    }
}
