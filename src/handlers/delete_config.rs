// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    handlers::{
        OpContext,
        common::{DatastoreName, datastore_arg, require_candidate_lock},
    },
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

/// delete-config(target): drops the session's candidate. Idempotent.
pub async fn delete_config(
    ctx: &OpContext,
    session: &Session,
    op: &XmlElement,
) -> Result<ReplyBody, RpcError> {
    for child in &op.children {
        match child.name.as_str() {
            "target" => {},
            other => return Err(RpcError::unknown_element(other.to_string())),
        }
    }

    match datastore_arg(op, "target")? {
        DatastoreName::Candidate => {},
        DatastoreName::Running => {
            return Err(RpcError::operation_not_supported(
                "deleting the running configuration is not supported",
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

    require_candidate_lock(ctx, session, "/rpc/delete-config/target").await?;

    ctx.datastore.delete_candidate(session.id).await;
    Ok(ReplyBody::Ok)
}
