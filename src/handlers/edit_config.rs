// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! edit-config(target, default-operation?, test-option?, error-option?,
//! config): merge-only editing of the session's candidate.

use crate::{
    handlers::{
        OpContext,
        common::{
            DatastoreName, datastore_arg, parse_stored_text, read_source_text,
            require_candidate_lock,
        },
    },
    model::{text, xml_view},
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

pub async fn edit_config(
    ctx: &OpContext,
    session: &Session,
    op: &XmlElement,
) -> Result<ReplyBody, RpcError> {
    for child in &op.children {
        match child.name.as_str() {
            "target" | "default-operation" | "test-option" | "error-option" | "config" => {},
            other => return Err(RpcError::unknown_element(other.to_string())),
        }
    }

    match datastore_arg(op, "target")? {
        DatastoreName::Candidate => {},
        DatastoreName::Running => {
            return Err(RpcError::operation_not_supported(
                "writable-running is not supported",
            )
            .with_bad_element("running"));
        },
        DatastoreName::Startup => {
            return Err(RpcError::operation_not_supported(
                "startup datastore is not supported",
            )
            .with_bad_element("startup"));
        },
    }

    require_candidate_lock(ctx, session, "/rpc/edit-config/target").await?;

    if let Some(value) = op.child_text("default-operation")
        && value != "merge"
    {
        return Err(RpcError::operation_not_supported(format!(
            "default-operation {value} is not supported"
        ))
        .with_bad_element("default-operation"));
    }
    if let Some(value) = op.child_text("test-option")
        && value != "set"
    {
        return Err(RpcError::operation_not_supported(format!(
            "test-option {value} is not supported"
        ))
        .with_bad_element("test-option"));
    }
    if let Some(value) = op.child_text("error-option")
        && value != "stop-on-error"
    {
        return Err(RpcError::operation_not_supported(format!(
            "error-option {value} is not supported"
        ))
        .with_bad_element("error-option"));
    }

    let config = op
        .child("config")
        .ok_or_else(|| RpcError::missing_element("config"))?;
    let configuration = config
        .child("configuration")
        .ok_or_else(|| RpcError::missing_element("configuration"))?;
    let incoming =
        xml_view::tree_from_element(configuration).map_err(|e| e.to_rpc_error())?;

    let existing_text = read_source_text(ctx, session, DatastoreName::Candidate).await?;
    let mut merged = parse_stored_text(&existing_text)?;
    merged.merge(&incoming);

    ctx.datastore
        .save_candidate(session.id, text::serialize(&merged))
        .await;
    Ok(ReplyBody::Ok)
}
