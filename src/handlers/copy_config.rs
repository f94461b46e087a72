// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    handlers::{
        OpContext,
        common::{DatastoreName, datastore_arg, read_source_text, require_candidate_lock},
    },
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

/// copy-config(target, source): the source's text form is written
/// verbatim as the new candidate. An empty source legally produces an
/// empty candidate.
pub async fn copy_config(
    ctx: &OpContext,
    session: &Session,
    op: &XmlElement,
) -> Result<ReplyBody, RpcError> {
    for child in &op.children {
        match child.name.as_str() {
            "target" | "source" => {},
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

    require_candidate_lock(ctx, session, "/rpc/copy-config/target").await?;

    let source = datastore_arg(op, "source")?;
    let text = read_source_text(ctx, session, source).await?;
    ctx.datastore.save_candidate(session.id, text).await;
    Ok(ReplyBody::Ok)
}
