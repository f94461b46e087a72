// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use netconf_server_rs::auth::rbac::Role;

use crate::integration_tests::common::{TestClient, test_server};

const EDIT: &str = "<edit-config><target><candidate/></target>\
    <config><configuration><system><host-name>r2</host-name></system></configuration>\
    </config></edit-config>";

/// edit-config without a prior lock: lock-denied with the edit-config
/// error path and no lock-owner-session, since nobody holds the lock.
#[tokio::test]
async fn edit_without_lock_is_denied_without_owner() -> Result<()> {
    let server = test_server();
    let mut client = TestClient::connect_v1_1(&server, "alice", Role::Operator).await?;

    let reply = client.rpc("1", EDIT).await?;
    assert!(reply.contains("<error-tag>lock-denied</error-tag>"), "{reply}");
    assert!(
        reply.contains("<error-path>/rpc/edit-config/target</error-path>"),
        "{reply}"
    );
    assert!(!reply.contains("lock-owner-session"), "{reply}");
    Ok(())
}

/// Session A holds the candidate lock; session B's edit-config names A's
/// numeric id in lock-owner-session.
#[tokio::test]
async fn contested_lock_names_the_owner() -> Result<()> {
    let server = test_server();
    let mut alice = TestClient::connect_v1_1(&server, "alice", Role::Operator).await?;
    let mut bob = TestClient::connect_v1_1(&server, "bob", Role::Operator).await?;

    let reply = alice
        .rpc("1", "<lock><target><candidate/></target></lock>")
        .await?;
    assert!(reply.contains("<ok/>"), "{reply}");

    let reply = bob.rpc("1", EDIT).await?;
    assert!(reply.contains("<error-tag>lock-denied</error-tag>"), "{reply}");
    assert!(
        reply.contains(&format!(
            "<lock-owner-session>{}</lock-owner-session>",
            alice.session_id
        )),
        "{reply}"
    );

    // Bob cannot take the lock either, and the denial names Alice too.
    let reply = bob
        .rpc("2", "<lock><target><candidate/></target></lock>")
        .await?;
    assert!(reply.contains("<error-tag>lock-denied</error-tag>"), "{reply}");
    assert!(
        reply.contains(&format!(
            "<lock-owner-session>{}</lock-owner-session>",
            alice.session_id
        )),
        "{reply}"
    );
    Ok(())
}

#[tokio::test]
async fn unlock_semantics() -> Result<()> {
    let server = test_server();
    let mut alice = TestClient::connect_v1_1(&server, "alice", Role::Operator).await?;
    let mut bob = TestClient::connect_v1_1(&server, "bob", Role::Operator).await?;

    // Unlock with no lock held at all.
    let reply = alice
        .rpc("1", "<unlock><target><candidate/></target></unlock>")
        .await?;
    assert!(reply.contains("<error-tag>operation-failed</error-tag>"), "{reply}");

    alice
        .rpc("2", "<lock><target><candidate/></target></lock>")
        .await?;

    // Bob does not own it.
    let reply = bob
        .rpc("1", "<unlock><target><candidate/></target></unlock>")
        .await?;
    assert!(reply.contains("<error-tag>lock-denied</error-tag>"), "{reply}");

    // The owner releases it.
    let reply = alice
        .rpc("3", "<unlock><target><candidate/></target></unlock>")
        .await?;
    assert!(reply.contains("<ok/>"), "{reply}");
    Ok(())
}

/// Closing the holder's session frees the lock for others.
#[tokio::test]
async fn lock_released_on_session_close() -> Result<()> {
    let server = test_server();
    let mut alice = TestClient::connect_v1_1(&server, "alice", Role::Operator).await?;
    let mut bob = TestClient::connect_v1_1(&server, "bob", Role::Operator).await?;

    alice
        .rpc("1", "<lock><target><candidate/></target></lock>")
        .await?;
    let reply = alice.rpc("2", "<close-session/>").await?;
    assert!(reply.contains("<ok/>"), "{reply}");
    // The server tears the session down right after the reply.
    assert_eq!(alice.read_text().await?, None);

    let reply = bob
        .rpc("1", "<lock><target><candidate/></target></lock>")
        .await?;
    assert!(reply.contains("<ok/>"), "{reply}");
    Ok(())
}
