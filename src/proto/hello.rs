// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The `<hello>` exchange (RFC 6241 §8.1). The server sends its hello
//! first, then reads the client's; the negotiated base version selects
//! the framing variant for the rest of the session.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    cfg::config::XmlConfig,
    proto::{
        BASE_NS, CAP_BASE_1_0, CAP_BASE_1_0_ALT, CAP_BASE_1_1, CAP_BASE_1_1_ALT,
        CAP_CANDIDATE, CAP_VALIDATE, CAP_VENDOR_MODULE,
        error::RpcError,
        xml::parse_guarded,
    },
    transport::framing::BaseVersion,
};

#[derive(Debug, Serialize)]
#[serde(rename = "hello")]
struct ServerHello {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    capabilities: Capabilities,
    #[serde(rename = "session-id")]
    session_id: u32,
}

#[derive(Debug, Serialize)]
struct Capabilities {
    capability: Vec<String>,
}

/// Every capability URI this server advertises.
pub fn server_capabilities() -> Vec<String> {
    vec![
        CAP_BASE_1_0.to_string(),
        CAP_BASE_1_1.to_string(),
        CAP_CANDIDATE.to_string(),
        CAP_VALIDATE.to_string(),
        CAP_VENDOR_MODULE.to_string(),
    ]
}

/// Renders the server `<hello>` with the session's protocol-visible
/// numeric id.
pub fn render_server_hello(session_id: u32) -> Result<String> {
    let hello = ServerHello {
        xmlns: BASE_NS.to_string(),
        capabilities: Capabilities {
            capability: server_capabilities(),
        },
        session_id,
    };
    let mut buffer = String::with_capacity(512);
    let ser = quick_xml::se::Serializer::new(&mut buffer);
    hello
        .serialize(ser)
        .context("failed to serialize server hello")?;
    Ok(buffer)
}

/// Capability list announced by the client.
#[derive(Debug, Clone)]
pub struct ClientHello {
    pub capabilities: Vec<String>,
}

impl ClientHello {
    pub fn has_capability(&self, uri: &str) -> bool {
        self.capabilities.iter().any(|c| c == uri)
    }

    /// base:1.1 wins whenever the client advertises it.
    pub fn negotiated_version(&self) -> BaseVersion {
        if self.has_capability(CAP_BASE_1_1) || self.has_capability(CAP_BASE_1_1_ALT) {
            BaseVersion::V1_1
        } else {
            BaseVersion::V1_0
        }
    }
}

/// Parses and validates a client `<hello>` document.
///
/// RFC 6241 requires every client to advertise base:1.0 and forbids a
/// `session-id` in the client's hello; both violations are fatal.
pub fn parse_client_hello(doc: &[u8], limits: &XmlConfig) -> Result<ClientHello, RpcError> {
    let root = parse_guarded(doc, limits).map_err(|e| e.to_rpc_error())?;

    if root.name != "hello" {
        return Err(RpcError::malformed_message("expected <hello> document")
            .with_bad_element(root.name));
    }
    if !root.namespace.is_empty() && root.namespace != BASE_NS {
        return Err(
            RpcError::malformed_message("wrong hello namespace")
                .with_bad_namespace(root.namespace),
        );
    }
    if root.child("session-id").is_some() {
        return Err(RpcError::malformed_message(
            "client hello must not contain session-id",
        )
        .with_bad_element("session-id"));
    }

    let capabilities: Vec<String> = root
        .child("capabilities")
        .ok_or_else(|| RpcError::missing_element("capabilities"))?
        .children_named("capability")
        .map(|c| c.trimmed_text().to_string())
        .collect();

    let hello = ClientHello { capabilities };
    if !hello.has_capability(CAP_BASE_1_0) && !hello.has_capability(CAP_BASE_1_0_ALT) {
        return Err(RpcError::malformed_message(
            "client hello must advertise base:1.0",
        ));
    }
    Ok(hello)
}
