// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Process-wide counters, updated with atomics only.

use std::sync::atomic::AtomicU64;

#[derive(Debug, Default)]
pub struct Metrics {
    pub sessions_opened: AtomicU64,
    pub sessions_closed: AtomicU64,
    pub rpcs_dispatched: AtomicU64,
    pub rpc_errors: AtomicU64,
    pub commits: AtomicU64,
}
