// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use netconf_server_rs::{auth::rate_limiter::RateLimiter, cfg::config::RateLimitConfig};

fn limiter() -> RateLimiter {
    RateLimiter::new(&RateLimitConfig::default())
}

#[tokio::test(start_paused = true)]
async fn fresh_keys_are_allowed() {
    let limiter = limiter();
    assert!(limiter.check_ip("10.0.0.1"));
    assert!(limiter.check_user("alice"));
}

#[tokio::test(start_paused = true)]
async fn ip_locks_out_after_three_failures() {
    let limiter = limiter();
    for _ in 0..2 {
        limiter.record_failure("10.0.0.1", "alice");
        assert!(limiter.check_ip("10.0.0.1"));
    }
    limiter.record_failure("10.0.0.1", "alice");
    assert!(!limiter.check_ip("10.0.0.1"));
    // The user limit is higher, so the user key is still clean.
    assert!(limiter.check_user("alice"));
}

#[tokio::test(start_paused = true)]
async fn user_locks_out_after_five_failures() {
    let limiter = limiter();
    for i in 0..5 {
        // Spread over addresses so only the user key accumulates.
        limiter.record_failure(&format!("10.0.0.{i}"), "bob");
    }
    assert!(!limiter.check_user("bob"));
}

#[tokio::test(start_paused = true)]
async fn lockout_expires_after_duration() {
    let limiter = limiter();
    for _ in 0..3 {
        limiter.record_failure("10.0.0.1", "alice");
    }
    assert!(!limiter.check_ip("10.0.0.1"));

    tokio::time::advance(Duration::from_secs(901)).await;
    assert!(limiter.check_ip("10.0.0.1"));
    // The stale record was cleaned lazily; failures start from scratch.
    limiter.record_failure("10.0.0.1", "alice");
    assert!(limiter.check_ip("10.0.0.1"));
}

#[tokio::test(start_paused = true)]
async fn old_failures_fall_out_of_the_window() {
    let limiter = limiter();
    limiter.record_failure("10.0.0.1", "alice");
    limiter.record_failure("10.0.0.1", "alice");
    // Let both entries age beyond the 5-minute IP window.
    tokio::time::advance(Duration::from_secs(301)).await;
    limiter.record_failure("10.0.0.1", "alice");
    // Only one failure inside the window, so no lockout.
    assert!(limiter.check_ip("10.0.0.1"));
}

#[tokio::test(start_paused = true)]
async fn success_resets_both_keys() {
    let limiter = limiter();
    limiter.record_failure("10.0.0.1", "alice");
    limiter.record_failure("10.0.0.1", "alice");
    limiter.record_success("10.0.0.1", "alice");
    limiter.record_failure("10.0.0.1", "alice");
    limiter.record_failure("10.0.0.1", "alice");
    // Two failures since the reset: still under the limit of three.
    assert!(limiter.check_ip("10.0.0.1"));
}

#[tokio::test(start_paused = true)]
async fn prune_drops_stale_records() {
    let limiter = limiter();
    limiter.record_failure("10.0.0.1", "alice");
    tokio::time::advance(Duration::from_secs(3600)).await;
    limiter.prune_now();
    // After pruning the key behaves as if it never failed.
    assert!(limiter.check_ip("10.0.0.1"));
    assert!(limiter.check_user("alice"));
}
