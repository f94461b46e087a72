// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The session table. Both indices (surrogate id, numeric id) live under
//! one `RwLock` and are always updated together, so membership in the
//! two is identical at every observable point.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::rbac::Role,
    datastore::store::Datastore,
    metrics::Metrics,
    session::session::Session,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session limit of {limit} reached")]
    TooManySessions { limit: u32 },
    #[error("session-id space exhausted")]
    IdsExhausted,
}

#[derive(Default)]
struct Indexes {
    by_id: HashMap<Uuid, Arc<Session>>,
    by_numeric: HashMap<u32, Uuid>,
}

pub struct SessionManager {
    indexes: RwLock<Indexes>,
    next_numeric: AtomicU32,
    max_sessions: u32,
    idle_timeout: Duration,
    absolute_timeout: Duration,
    cleanup_interval: Duration,
    datastore: Arc<Datastore>,
    metrics: Arc<Metrics>,
}

impl SessionManager {
    pub fn new(
        max_sessions: u32,
        idle_timeout: Duration,
        absolute_timeout: Duration,
        cleanup_interval: Duration,
        datastore: Arc<Datastore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            indexes: RwLock::new(Indexes::default()),
            next_numeric: AtomicU32::new(1),
            max_sessions,
            idle_timeout,
            absolute_timeout,
            cleanup_interval,
            datastore,
            metrics,
        }
    }

    /// Creates and registers a session. Enforces the global session cap
    /// and refuses outright when the numeric-id space is spent, rather
    /// than wrapping onto a possibly-live id.
    pub async fn create(
        &self,
        username: &str,
        role: Role,
        peer_addr: &str,
    ) -> Result<Arc<Session>, SessionError> {
        let mut indexes = self.indexes.write().await;
        if indexes.by_id.len() as u32 >= self.max_sessions {
            return Err(SessionError::TooManySessions {
                limit: self.max_sessions,
            });
        }
        let numeric_id = self.next_numeric.fetch_add(1, Ordering::Relaxed);
        if numeric_id == u32::MAX {
            // Park the counter at its ceiling; all further creations fail.
            self.next_numeric.store(u32::MAX, Ordering::Relaxed);
            return Err(SessionError::IdsExhausted);
        }
        let session = Arc::new(Session::new(
            numeric_id,
            username.to_string(),
            role,
            peer_addr.to_string(),
            self.idle_timeout,
            self.absolute_timeout,
        ));
        indexes.by_id.insert(session.id, Arc::clone(&session));
        indexes.by_numeric.insert(numeric_id, session.id);
        self.metrics.sessions_opened.fetch_add(1, Ordering::Relaxed);
        info!(
            session = %session.id,
            session_id = numeric_id,
            user = username,
            peer = peer_addr,
            "session created"
        );
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.indexes.read().await.by_id.get(&id).cloned()
    }

    pub async fn get_by_numeric(&self, numeric_id: u32) -> Option<Arc<Session>> {
        let indexes = self.indexes.read().await;
        let id = indexes.by_numeric.get(&numeric_id)?;
        indexes.by_id.get(id).cloned()
    }

    pub async fn live_count(&self) -> usize {
        self.indexes.read().await.by_id.len()
    }

    /// Closes a session: removes it from both indices, releases its
    /// datastore locks (on a fresh, non-cancelled path) and fires its
    /// cancellation token so the serve loop drops the channel.
    pub async fn close(&self, id: Uuid) {
        let session = {
            let mut indexes = self.indexes.write().await;
            let session = indexes.by_id.remove(&id);
            if let Some(session) = &session {
                indexes.by_numeric.remove(&session.numeric_id);
            }
            session
        };
        let Some(session) = session else {
            return;
        };
        self.datastore.release_session_locks(session.id).await;
        session.cancel.cancel();
        self.metrics.sessions_closed.fetch_add(1, Ordering::Relaxed);
        info!(session = %session.id, session_id = session.numeric_id, "session closed");
    }

    /// kill-session teardown behaves exactly like timeout expiry for the
    /// target.
    pub async fn kill_by_numeric(&self, numeric_id: u32) -> bool {
        match self.get_by_numeric(numeric_id).await {
            Some(session) => {
                self.close(session.id).await;
                true
            },
            None => false,
        }
    }

    /// Removes every session past its idle or absolute deadline.
    pub async fn expire_stale(&self) -> usize {
        let now = Utc::now();
        let snapshot: Vec<Arc<Session>> = {
            let indexes = self.indexes.read().await;
            indexes.by_id.values().cloned().collect()
        };
        let mut expired = Vec::new();
        for session in snapshot {
            if session.is_expired(now).await {
                expired.push(session);
            }
        }
        let count = expired.len();
        for session in expired {
            warn!(
                session = %session.id,
                session_id = session.numeric_id,
                "session expired"
            );
            self.close(session.id).await;
        }
        count
    }

    /// Cleanup ticker. Runs until `cancel` fires.
    pub async fn run_cleanup(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.cleanup_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = self.expire_stale().await;
                    if removed > 0 {
                        debug!(removed, "cleanup tick expired sessions");
                    }
                },
            }
        }
    }
}
