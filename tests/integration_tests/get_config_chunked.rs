// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use netconf_server_rs::auth::rbac::Role;

use crate::integration_tests::common::{TestClient, test_server};

/// After a base:1.1 hello, both directions switch to chunked framing and
/// get-config returns the running tree under `<data>`.
#[tokio::test]
async fn get_config_over_chunked_framing() -> Result<()> {
    let server = test_server();
    let mut client = TestClient::connect_v1_1(&server, "alice", Role::Operator).await?;

    let reply = client
        .rpc("1", "<get-config><source><running/></source></get-config>")
        .await?;
    assert!(reply.starts_with("<rpc-reply message-id=\"1\""), "{reply}");
    assert!(reply.contains("<data><configuration>"), "{reply}");
    assert!(reply.contains("<host-name>r1</host-name>"), "{reply}");
    assert!(reply.contains("<address><name>10.0.0.1/24</name></address>"), "{reply}");
    Ok(())
}

#[tokio::test]
async fn get_config_with_subtree_filter() -> Result<()> {
    let server = test_server();
    let mut client = TestClient::connect_v1_1(&server, "alice", Role::Operator).await?;

    let reply = client
        .rpc(
            "2",
            "<get-config><source><running/></source>\
             <filter type=\"subtree\"><system/></filter></get-config>",
        )
        .await?;
    assert!(reply.contains("<host-name>r1</host-name>"), "{reply}");
    assert!(!reply.contains("<interfaces>"), "{reply}");
    Ok(())
}

#[tokio::test]
async fn get_config_rejects_startup_and_xpath() -> Result<()> {
    let server = test_server();
    let mut client = TestClient::connect_v1_1(&server, "alice", Role::Operator).await?;

    let reply = client
        .rpc("3", "<get-config><source><startup/></source></get-config>")
        .await?;
    assert!(reply.contains("<error-tag>invalid-value</error-tag>"), "{reply}");

    let reply = client
        .rpc(
            "4",
            "<get-config><source><running/></source>\
             <filter type=\"xpath\" select=\"//system\"/></get-config>",
        )
        .await?;
    assert!(
        reply.contains("<error-tag>operation-not-supported</error-tag>"),
        "{reply}"
    );
    Ok(())
}

#[tokio::test]
async fn get_returns_config_and_state() -> Result<()> {
    let server = test_server();
    let mut client = TestClient::connect_v1_1(&server, "alice", Role::Operator).await?;

    let reply = client.rpc("5", "<get/>").await?;
    assert!(reply.contains("<data><configuration>"), "{reply}");
    assert!(reply.contains("<host-name>r1</host-name>"), "{reply}");
    Ok(())
}
