// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared harness: a NETCONF server over in-memory duplex channels plus
//! a minimal client-side codec built from the crate's own framer.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use netconf_server_rs::{
    auth::rbac::Role,
    cfg::config::Config,
    datastore::backend::AcceptAllBackend,
    handlers::get::StaticStateProvider,
    proto::{CAP_BASE_1_0, CAP_BASE_1_1},
    server::NetconfServer,
    transport::{
        channel::Identity,
        framing::{BaseVersion, FrameReader, FrameWriter},
    },
};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf, split};

pub const RUNNING: &str = "set system host-name r1\n\
set interfaces ge-0/0/0 unit 0 family inet address 10.0.0.1/24\n";

pub fn test_server() -> Arc<NetconfServer> {
    let mut cfg = Config::default();
    cfg.server.max_sessions = 8;
    NetconfServer::new(
        cfg,
        RUNNING.to_string(),
        Box::new(AcceptAllBackend),
        Arc::new(StaticStateProvider::default()),
    )
}

/// One connected client. The server side runs in a spawned task, the
/// client side reuses the crate's framer as its codec.
pub struct TestClient {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: FrameWriter<WriteHalf<DuplexStream>>,
    pub session_id: u32,
    pub server_hello: String,
}

impl TestClient {
    /// Connects with the given identity and performs the full hello
    /// exchange, advertising `caps`.
    pub async fn connect(
        server: &Arc<NetconfServer>,
        username: &str,
        role: Role,
        caps: &[&str],
    ) -> Result<TestClient> {
        let (client_end, server_end) = tokio::io::duplex(1024 * 1024);
        let (server_read, server_write) = split(server_end);
        let identity = Identity {
            username: username.to_string(),
            role,
            peer_addr: "10.0.0.99:55000".to_string(),
        };
        let server = Arc::clone(server);
        tokio::spawn(async move {
            let _ = server.serve_channel(server_read, server_write, identity).await;
        });

        let (client_read, client_write) = split(client_end);
        let framing = netconf_server_rs::cfg::config::FramingConfig::default();
        let mut client = TestClient {
            reader: FrameReader::new(client_read, framing.clone()),
            writer: FrameWriter::new(client_write, framing),
            session_id: 0,
            server_hello: String::new(),
        };

        let server_hello = client.read_text().await?.context("no server hello")?;
        client.session_id = extract_session_id(&server_hello)?;
        client.server_hello = server_hello;

        let mut hello = String::from(
            "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><capabilities>",
        );
        for cap in caps {
            hello.push_str("<capability>");
            hello.push_str(cap);
            hello.push_str("</capability>");
        }
        hello.push_str("</capabilities></hello>");
        client.writer.write_message(hello.as_bytes()).await?;

        // Mirror the server's negotiation on the client codec.
        if caps.contains(&CAP_BASE_1_1) {
            client.reader.set_version(BaseVersion::V1_1);
            client.writer.set_version(BaseVersion::V1_1);
        }
        Ok(client)
    }

    /// Connects advertising both base versions (the common case).
    pub async fn connect_v1_1(
        server: &Arc<NetconfServer>,
        username: &str,
        role: Role,
    ) -> Result<TestClient> {
        Self::connect(server, username, role, &[CAP_BASE_1_0, CAP_BASE_1_1]).await
    }

    pub async fn read_text(&mut self) -> Result<Option<String>> {
        match self.reader.read_message().await? {
            None => Ok(None),
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
        }
    }

    /// Sends one raw message and returns the reply document.
    pub async fn roundtrip(&mut self, request: &str) -> Result<String> {
        self.writer.write_message(request.as_bytes()).await?;
        self.read_text().await?.context("connection closed")
    }

    /// Wraps an operation body in an `<rpc>` envelope.
    pub async fn rpc(&mut self, message_id: &str, body: &str) -> Result<String> {
        let request = format!(
            "<rpc message-id=\"{message_id}\" \
             xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">{body}</rpc>"
        );
        self.roundtrip(&request).await
    }
}

fn extract_session_id(hello: &str) -> Result<u32> {
    let start = hello
        .find("<session-id>")
        .ok_or_else(|| anyhow!("server hello lacks session-id: {hello}"))?
        + "<session-id>".len();
    let end = hello[start..]
        .find("</session-id>")
        .ok_or_else(|| anyhow!("unterminated session-id"))?;
    Ok(hello[start..start + end].trim().parse()?)
}
