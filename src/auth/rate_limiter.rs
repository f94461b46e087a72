// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Sliding-window failure tracking per source address and per username.
//!
//! A key that reaches its failure limit inside the tracking window is
//! locked out; lockouts expire after a fixed duration and stale records
//! are cleaned lazily on check as well as by a background prune task.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cfg::config::RateLimitConfig;

#[derive(Debug, Default)]
struct FailureTracker {
    failures: Vec<Instant>,
    lockout_start: Option<Instant>,
}

pub struct RateLimiter {
    by_ip: DashMap<String, FailureTracker>,
    by_user: DashMap<String, FailureTracker>,
    ip_window: Duration,
    ip_limit: usize,
    user_window: Duration,
    user_limit: usize,
    lockout: Duration,
    prune_interval: Duration,
}

impl RateLimiter {
    pub fn new(cfg: &RateLimitConfig) -> Self {
        Self {
            by_ip: DashMap::new(),
            by_user: DashMap::new(),
            ip_window: Duration::from_secs(cfg.ip_window_secs),
            ip_limit: cfg.ip_limit,
            user_window: Duration::from_secs(cfg.user_window_secs),
            user_limit: cfg.user_limit,
            lockout: Duration::from_secs(cfg.lockout_secs),
            prune_interval: Duration::from_secs(cfg.prune_interval_secs),
        }
    }

    /// Records one failed authentication attempt against both keys.
    pub fn record_failure(&self, ip: &str, username: &str) {
        record(
            &self.by_ip,
            ip,
            self.ip_window,
            self.ip_limit,
        );
        record(
            &self.by_user,
            username,
            self.user_window,
            self.user_limit,
        );
    }

    /// A success wipes both keys entirely.
    pub fn record_success(&self, ip: &str, username: &str) {
        self.by_ip.remove(ip);
        self.by_user.remove(username);
    }

    pub fn check_ip(&self, ip: &str) -> bool {
        check(&self.by_ip, ip, self.lockout)
    }

    pub fn check_user(&self, username: &str) -> bool {
        check(&self.by_user, username, self.lockout)
    }

    /// Drops stale records to bound memory.
    pub fn prune_now(&self) {
        let now = Instant::now();
        prune_map(&self.by_ip, now, self.ip_window, self.lockout);
        prune_map(&self.by_user, now, self.user_window, self.lockout);
    }

    /// Background prune ticker. Runs until `cancel` fires.
    pub async fn run_prune(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.prune_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.prune_now();
                    debug!(
                        ip_keys = self.by_ip.len(),
                        user_keys = self.by_user.len(),
                        "rate-limiter prune tick"
                    );
                },
            }
        }
    }
}

fn record(map: &DashMap<String, FailureTracker>, key: &str, window: Duration, limit: usize) {
    let now = Instant::now();
    let mut tracker = map.entry(key.to_string()).or_default();
    tracker.failures.push(now);
    tracker
        .failures
        .retain(|t| now.duration_since(*t) <= window);
    if tracker.failures.len() >= limit && tracker.lockout_start.is_none() {
        tracker.lockout_start = Some(now);
        debug!(key, "rate-limiter lockout");
    }
}

fn check(map: &DashMap<String, FailureTracker>, key: &str, lockout: Duration) -> bool {
    let now = Instant::now();
    let expired = match map.get(key) {
        None => return true,
        Some(tracker) => match tracker.lockout_start {
            None => return true,
            Some(start) => now.duration_since(start) > lockout,
        },
    };
    if expired {
        // Lockout has lapsed; clean the stale record lazily.
        map.remove(key);
        return true;
    }
    false
}

fn prune_map(
    map: &DashMap<String, FailureTracker>,
    now: Instant,
    window: Duration,
    lockout: Duration,
) {
    map.retain(|_, tracker| {
        tracker
            .failures
            .retain(|t| now.duration_since(*t) <= window);
        let lockout_live = tracker
            .lockout_start
            .is_some_and(|start| now.duration_since(start) <= lockout);
        lockout_live || !tracker.failures.is_empty()
    });
}
