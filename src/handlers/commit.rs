// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::atomic::Ordering;

use crate::{
    datastore::store::DatastoreError,
    handlers::{OpContext, common::require_candidate_lock},
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

/// commit: hands the candidate to the backend; on acceptance the
/// candidate replaces running atomically and an audit record is
/// appended.
pub async fn commit(
    ctx: &OpContext,
    session: &Session,
    op: &XmlElement,
) -> Result<ReplyBody, RpcError> {
    if let Some(child) = op.children.first() {
        return Err(RpcError::unknown_element(child.name.clone()));
    }

    require_candidate_lock(ctx, session, "/rpc/commit").await?;

    match ctx
        .datastore
        .commit(session.id, &session.username, &session.peer_addr, None)
        .await
    {
        Ok(_commit_id) => {
            ctx.metrics.commits.fetch_add(1, Ordering::Relaxed);
            Ok(ReplyBody::Ok)
        },
        Err(DatastoreError::NoCandidate) => Err(RpcError::operation_failed(
            "no candidate configuration to commit",
        )),
        Err(DatastoreError::Backend(e)) => Err(RpcError::invalid_value(e.to_string())
            .with_app_tag("backend-validation-failed")),
        Err(other) => Err(RpcError::operation_failed(other.to_string())
            .with_app_tag("datastore-error")),
    }
}
