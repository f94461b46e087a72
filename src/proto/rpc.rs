// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Inbound `<rpc>` envelope parsing: message-id extraction, namespace
//! checks and operation-element selection. Operation lookup itself lives
//! in the dispatcher so that unknown operations surface as
//! `operation-not-supported` rather than a parse failure.

use crate::{
    cfg::config::XmlConfig,
    proto::{BASE_NS, error::RpcError, xml::{XmlElement, parse_guarded}},
};

/// One parsed RPC request: the echoed `message-id` and the operation
/// element (name plus body).
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub message_id: String,
    pub operation: XmlElement,
}

impl RpcRequest {
    pub fn operation_name(&self) -> &str {
        &self.operation.name
    }
}

/// Parses a framed message into an [`RpcRequest`].
///
/// On failure the caller replies with the returned [`RpcError`] and, for
/// envelope-level failures, has no message-id to echo.
pub fn parse_rpc(doc: &[u8], limits: &XmlConfig) -> Result<RpcRequest, RpcError> {
    let root = parse_guarded(doc, limits).map_err(|e| e.to_rpc_error())?;

    if root.name != "rpc" {
        return Err(RpcError::malformed_message("expected <rpc> document")
            .with_bad_element(root.name));
    }
    if !root.namespace.is_empty() && root.namespace != BASE_NS {
        return Err(RpcError::malformed_message("wrong rpc namespace")
            .with_bad_namespace(root.namespace));
    }

    let message_id = match root.attr("message-id") {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => {
            return Err(RpcError::malformed_message(
                "rpc requires a non-empty message-id attribute",
            )
            .with_bad_attribute("message-id"));
        },
    };

    let mut elements = root.children.iter();
    let operation = match (elements.next(), elements.next()) {
        (Some(op), None) => op,
        (None, _) => {
            return Err(RpcError::missing_element("operation")
                .with_path("/rpc"));
        },
        (Some(_), Some(extra)) => {
            return Err(RpcError::malformed_message(
                "rpc must contain exactly one operation element",
            )
            .with_bad_element(extra.name.clone()));
        },
    };

    // The operation may live in the base namespace or use the default
    // (empty) one; anything else is rejected before dispatch.
    if !operation.namespace.is_empty() && operation.namespace != BASE_NS {
        return Err(RpcError::malformed_message("wrong operation namespace")
            .with_bad_namespace(operation.namespace.clone())
            .with_bad_element(operation.name.clone()));
    }

    Ok(RpcRequest {
        message_id,
        operation: operation.clone(),
    })
}
