// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The datastore proper. One internal mutex linearises every operation,
//! which is what gives cross-session commit/lock/get a total order. Lock
//! deadlines are absolute; an expired lock is treated as released on the
//! next observation.

use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::datastore::backend::{BackendApply, BackendError};

/// Lockable / readable datastore targets. `startup` is rejected before
/// the datastore is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Running,
    Candidate,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Running => "running",
            Target::Candidate => "candidate",
        }
    }
}

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("no candidate configuration for this session")]
    NoCandidate,
    #[error("{target} is locked by session {holder_numeric:?}")]
    LockHeld {
        target: &'static str,
        holder_numeric: Option<u32>,
        holder_user: Option<String>,
    },
    #[error("lock on {target} is held by another session")]
    NotLockHolder { target: &'static str },
    #[error("no lock is held on {target}")]
    NoLock { target: &'static str },
    #[error("failed to persist running configuration: {0}")]
    Persist(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Identity of a lock requester, denormalised so lock-denied replies can
/// name the holder without a session-table lookup.
#[derive(Debug, Clone)]
pub struct LockHolder {
    pub session_id: Uuid,
    pub numeric_id: u32,
    pub username: String,
}

#[derive(Debug, Clone)]
struct LockRecord {
    holder: LockHolder,
    acquired_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
}

/// Snapshot of a lock's state as exposed to handlers.
#[derive(Debug, Clone, Default)]
pub struct LockInfo {
    pub is_locked: bool,
    pub session_id: Option<Uuid>,
    pub numeric_id: Option<u32>,
    pub username: Option<String>,
    pub acquired_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct StoredConfig {
    pub text: String,
    pub modified_at: DateTime<Utc>,
}

/// One entry of the commit audit trail.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub id: u64,
    pub username: String,
    pub source_addr: String,
    pub timestamp: DateTime<Utc>,
    pub message: Option<String>,
}

const AUDIT_CAP: usize = 1024;

struct Inner {
    running: StoredConfig,
    candidates: HashMap<Uuid, StoredConfig>,
    locks: HashMap<Target, LockRecord>,
    audit: VecDeque<CommitRecord>,
    next_commit_id: u64,
}

pub struct Datastore {
    inner: Mutex<Inner>,
    backend: Box<dyn BackendApply>,
    clear_candidate_on_commit: bool,
    persist_path: Option<PathBuf>,
}

impl Datastore {
    pub fn new(
        initial_running: String,
        backend: Box<dyn BackendApply>,
        clear_candidate_on_commit: bool,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                running: StoredConfig {
                    text: initial_running,
                    modified_at: Utc::now(),
                },
                candidates: HashMap::new(),
                locks: HashMap::new(),
                audit: VecDeque::new(),
                next_commit_id: 1,
            }),
            backend,
            clear_candidate_on_commit,
            persist_path: None,
        }
    }

    /// Enables file persistence: every successful commit rewrites the
    /// running configuration at `path` before the in-memory swap, so the
    /// file the server boots from always matches running.
    pub fn with_persistence(mut self, path: PathBuf) -> Self {
        self.persist_path = Some(path);
        self
    }

    pub async fn get_running(&self) -> StoredConfig {
        self.inner.lock().await.running.clone()
    }

    pub async fn get_candidate(&self, session_id: Uuid) -> Result<StoredConfig, DatastoreError> {
        self.inner
            .lock()
            .await
            .candidates
            .get(&session_id)
            .cloned()
            .ok_or(DatastoreError::NoCandidate)
    }

    /// Upserts the per-session candidate.
    pub async fn save_candidate(&self, session_id: Uuid, text: String) {
        let mut inner = self.inner.lock().await;
        inner.candidates.insert(
            session_id,
            StoredConfig {
                text,
                modified_at: Utc::now(),
            },
        );
    }

    /// Idempotent.
    pub async fn delete_candidate(&self, session_id: Uuid) {
        self.inner.lock().await.candidates.remove(&session_id);
    }

    /// Acquires the target lock for `holder`, with an absolute deadline.
    /// Re-acquisition by the current holder refreshes the deadline.
    pub async fn acquire_lock(
        &self,
        target: Target,
        holder: LockHolder,
        timeout: std::time::Duration,
    ) -> Result<(), DatastoreError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        if let Some(existing) = inner.locks.get(&target) {
            let expired = existing.deadline <= now;
            if !expired && existing.holder.session_id != holder.session_id {
                return Err(DatastoreError::LockHeld {
                    target: target.as_str(),
                    holder_numeric: Some(existing.holder.numeric_id),
                    holder_user: Some(existing.holder.username.clone()),
                });
            }
        }
        let deadline = now
            + ChronoDuration::from_std(timeout)
                .unwrap_or_else(|_| ChronoDuration::seconds(3600));
        debug!(datastore = target.as_str(), session = %holder.session_id, "lock acquired");
        inner.locks.insert(
            target,
            LockRecord {
                holder,
                acquired_at: now,
                deadline,
            },
        );
        Ok(())
    }

    /// Releases the lock if `session_id` holds it. An expired or absent
    /// lock yields `NoLock`; a live lock held elsewhere `NotLockHolder`.
    pub async fn release_lock(
        &self,
        target: Target,
        session_id: Uuid,
    ) -> Result<(), DatastoreError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        match inner.locks.get(&target) {
            None => Err(DatastoreError::NoLock {
                target: target.as_str(),
            }),
            Some(record) if record.deadline <= now => {
                inner.locks.remove(&target);
                Err(DatastoreError::NoLock {
                    target: target.as_str(),
                })
            },
            Some(record) if record.holder.session_id != session_id => {
                Err(DatastoreError::NotLockHolder {
                    target: target.as_str(),
                })
            },
            Some(_) => {
                inner.locks.remove(&target);
                debug!(datastore = target.as_str(), session = %session_id, "lock released");
                Ok(())
            },
        }
    }

    pub async fn get_lock_info(&self, target: Target) -> LockInfo {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        if let Some(record) = inner.locks.get(&target)
            && record.deadline <= now
        {
            inner.locks.remove(&target);
        }
        match inner.locks.get(&target) {
            None => LockInfo::default(),
            Some(record) => LockInfo {
                is_locked: true,
                session_id: Some(record.holder.session_id),
                numeric_id: Some(record.holder.numeric_id),
                username: Some(record.holder.username.clone()),
                acquired_at: Some(record.acquired_at),
                deadline: Some(record.deadline),
            },
        }
    }

    /// True when `session_id` currently holds a live lock on `target`.
    pub async fn holds_lock(&self, target: Target, session_id: Uuid) -> bool {
        let info = self.get_lock_info(target).await;
        info.is_locked && info.session_id == Some(session_id)
    }

    /// Commits the session's candidate: backend apply first, then the
    /// atomic swap into running and an audit-trail append. The candidate
    /// is retained unless configured otherwise.
    pub async fn commit(
        &self,
        session_id: Uuid,
        username: &str,
        source_addr: &str,
        message: Option<String>,
    ) -> Result<u64, DatastoreError> {
        let mut inner = self.inner.lock().await;
        let candidate = inner
            .candidates
            .get(&session_id)
            .cloned()
            .ok_or(DatastoreError::NoCandidate)?;

        self.backend.apply(&candidate.text).await?;

        if let Some(path) = &self.persist_path {
            tokio::fs::write(path, candidate.text.as_bytes())
                .await
                .map_err(|e| DatastoreError::Persist(e.to_string()))?;
        }

        inner.running = StoredConfig {
            text: candidate.text,
            modified_at: Utc::now(),
        };
        if self.clear_candidate_on_commit {
            inner.candidates.remove(&session_id);
        }

        let id = inner.next_commit_id;
        inner.next_commit_id += 1;
        let record = CommitRecord {
            id,
            username: username.to_string(),
            source_addr: source_addr.to_string(),
            timestamp: Utc::now(),
            message,
        };
        inner.audit.push_back(record);
        if inner.audit.len() > AUDIT_CAP {
            inner.audit.pop_front();
        }
        info!(commit_id = id, user = username, "configuration committed");
        Ok(id)
    }

    /// Most-recent-last snapshot of the commit audit trail.
    pub async fn audit_log(&self) -> Vec<CommitRecord> {
        self.inner.lock().await.audit.iter().cloned().collect()
    }

    /// Releases every lock held by a closing session. Used by session
    /// teardown; never fails.
    pub async fn release_session_locks(&self, session_id: Uuid) {
        let mut inner = self.inner.lock().await;
        inner
            .locks
            .retain(|_, record| record.holder.session_id != session_id);
        inner.candidates.remove(&session_id);
    }
}
