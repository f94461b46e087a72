// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashSet, sync::Arc, time::Duration};

use netconf_server_rs::{
    auth::rbac::Role,
    datastore::{
        backend::AcceptAllBackend,
        store::{Datastore, LockHolder, Target},
    },
    metrics::Metrics,
    session::manager::{SessionError, SessionManager},
};

fn manager_with(max_sessions: u32, idle: Duration, absolute: Duration) -> Arc<SessionManager> {
    let datastore = Arc::new(Datastore::new(
        String::new(),
        Box::new(AcceptAllBackend),
        false,
    ));
    Arc::new(SessionManager::new(
        max_sessions,
        idle,
        absolute,
        Duration::from_secs(60),
        datastore,
        Arc::new(Metrics::default()),
    ))
}

fn manager() -> Arc<SessionManager> {
    manager_with(64, Duration::from_secs(600), Duration::from_secs(3600))
}

#[tokio::test]
async fn numeric_ids_are_unique_across_churn() {
    let manager = manager();
    let mut seen = HashSet::new();

    for round in 0..10 {
        let mut batch = Vec::new();
        for i in 0..5 {
            let session = manager
                .create(&format!("user{round}-{i}"), Role::Operator, "10.0.0.1:1")
                .await
                .expect("create");
            assert!(
                seen.insert(session.numeric_id),
                "numeric id {} reused",
                session.numeric_id
            );
            assert_ne!(session.numeric_id, 0);
            batch.push(session);
        }
        // Close a few and make sure their ids never come back.
        for session in batch.iter().take(3) {
            manager.close(session.id).await;
        }
    }
}

#[tokio::test]
async fn both_indices_stay_consistent() {
    let manager = manager();
    let session = manager
        .create("alice", Role::Admin, "10.0.0.1:1")
        .await
        .expect("create");

    let by_numeric = manager
        .get_by_numeric(session.numeric_id)
        .await
        .expect("numeric lookup");
    assert_eq!(by_numeric.id, session.id);

    manager.close(session.id).await;
    assert!(manager.get(session.id).await.is_none());
    assert!(manager.get_by_numeric(session.numeric_id).await.is_none());
}

#[tokio::test]
async fn enforces_session_cap() {
    let manager = manager_with(2, Duration::from_secs(600), Duration::from_secs(3600));
    let _a = manager.create("a", Role::Operator, "p").await.expect("a");
    let b = manager.create("b", Role::Operator, "p").await.expect("b");
    let err = manager.create("c", Role::Operator, "p").await.expect_err("cap");
    assert!(matches!(err, SessionError::TooManySessions { .. }));

    // Closing one frees a slot.
    manager.close(b.id).await;
    manager.create("c", Role::Operator, "p").await.expect("after close");
}

#[tokio::test]
async fn close_releases_datastore_locks_and_cancels() {
    let datastore = Arc::new(Datastore::new(
        String::new(),
        Box::new(AcceptAllBackend),
        false,
    ));
    let manager = Arc::new(SessionManager::new(
        8,
        Duration::from_secs(600),
        Duration::from_secs(3600),
        Duration::from_secs(60),
        Arc::clone(&datastore),
        Arc::new(Metrics::default()),
    ));

    let session = manager
        .create("alice", Role::Operator, "10.0.0.1:1")
        .await
        .expect("create");
    datastore
        .acquire_lock(
            Target::Candidate,
            LockHolder {
                session_id: session.id,
                numeric_id: session.numeric_id,
                username: session.username.clone(),
            },
            Duration::from_secs(3600),
        )
        .await
        .expect("lock");
    session.note_lock_acquired(Target::Candidate).await;

    manager.close(session.id).await;

    assert!(!datastore.get_lock_info(Target::Candidate).await.is_locked);
    assert!(session.cancel.is_cancelled());
}

#[tokio::test]
async fn kill_by_numeric_behaves_like_expiry() {
    let manager = manager();
    let session = manager
        .create("bob", Role::Operator, "10.0.0.2:1")
        .await
        .expect("create");
    assert!(manager.kill_by_numeric(session.numeric_id).await);
    assert!(!manager.kill_by_numeric(session.numeric_id).await, "already gone");
    assert!(session.cancel.is_cancelled());
}

#[tokio::test]
async fn expire_stale_removes_idle_sessions() {
    // Zero idle timeout: every session is immediately stale.
    let manager = manager_with(8, Duration::ZERO, Duration::from_secs(3600));
    let session = manager
        .create("alice", Role::Operator, "p")
        .await
        .expect("create");
    let removed = manager.expire_stale().await;
    assert_eq!(removed, 1);
    assert!(manager.get(session.id).await.is_none());
}

#[tokio::test]
async fn expire_stale_removes_absolutely_aged_sessions() {
    let manager = manager_with(8, Duration::from_secs(3600), Duration::ZERO);
    let session = manager
        .create("alice", Role::Operator, "p")
        .await
        .expect("create");
    session.touch().await;
    let removed = manager.expire_stale().await;
    assert_eq!(removed, 1, "absolute timeout ignores last_used");
    assert!(manager.get(session.id).await.is_none());
}

#[tokio::test]
async fn fresh_sessions_survive_cleanup() {
    let manager = manager();
    let session = manager
        .create("alice", Role::Operator, "p")
        .await
        .expect("create");
    assert_eq!(manager.expire_stale().await, 0);
    assert!(manager.get(session.id).await.is_some());
}
