// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    auth::rbac::Role,
    datastore::store::Target,
    transport::framing::BaseVersion,
};

/// Mutable per-session state behind its own lock, so the common
/// touch/lookup path never contends on the session table.
#[derive(Debug)]
pub struct SessionState {
    pub last_used: DateTime<Utc>,
    pub base: BaseVersion,
    pub locked_targets: HashSet<Target>,
}

/// One authenticated NETCONF session.
///
/// The surrogate id is globally unique and internal; the numeric id is
/// the protocol-visible `session-id` and is never reused within process
/// lifetime. The manager owns sessions; everything else holds
/// non-owning `Arc` views, and channel teardown is driven through the
/// cancellation token rather than a channel handle, which keeps the
/// ownership graph acyclic.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub numeric_id: u32,
    pub username: String,
    pub role: Role,
    pub peer_addr: String,
    pub created_at: DateTime<Utc>,
    pub idle_timeout: Duration,
    pub absolute_timeout: Duration,
    pub cancel: CancellationToken,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(
        numeric_id: u32,
        username: String,
        role: Role,
        peer_addr: String,
        idle_timeout: Duration,
        absolute_timeout: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            numeric_id,
            username,
            role,
            peer_addr,
            created_at: now,
            idle_timeout,
            absolute_timeout,
            cancel: CancellationToken::new(),
            state: Mutex::new(SessionState {
                last_used: now,
                base: BaseVersion::V1_1,
                locked_targets: HashSet::new(),
            }),
        }
    }

    /// Bumps `last_used`; called by the dispatcher for every RPC.
    pub async fn touch(&self) {
        self.state.lock().await.last_used = Utc::now();
    }

    pub async fn last_used(&self) -> DateTime<Utc> {
        self.state.lock().await.last_used
    }

    pub async fn base_version(&self) -> BaseVersion {
        self.state.lock().await.base
    }

    pub async fn set_base_version(&self, base: BaseVersion) {
        self.state.lock().await.base = base;
    }

    pub async fn note_lock_acquired(&self, target: Target) {
        self.state.lock().await.locked_targets.insert(target);
    }

    pub async fn note_lock_released(&self, target: Target) {
        self.state.lock().await.locked_targets.remove(&target);
    }

    pub async fn locked_targets(&self) -> Vec<Target> {
        self.state
            .lock()
            .await
            .locked_targets
            .iter()
            .copied()
            .collect()
    }

    /// True when either the idle or the absolute deadline has passed.
    pub async fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let last_used = self.last_used().await;
        let idle = chrono::Duration::from_std(self.idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(600));
        let absolute = chrono::Duration::from_std(self.absolute_timeout)
            .unwrap_or_else(|_| chrono::Duration::hours(12));
        last_used + idle < now || self.created_at + absolute < now
    }
}
