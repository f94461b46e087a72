// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    handlers::{OpContext, common::require_candidate_lock},
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

/// discard-changes: drops the session's candidate. Idempotent.
pub async fn discard_changes(
    ctx: &OpContext,
    session: &Session,
    op: &XmlElement,
) -> Result<ReplyBody, RpcError> {
    if let Some(child) = op.children.first() {
        return Err(RpcError::unknown_element(child.name.clone()));
    }

    require_candidate_lock(ctx, session, "/rpc/discard-changes").await?;

    ctx.datastore.delete_candidate(session.id).await;
    Ok(ReplyBody::Ok)
}
