//! This module contains one handler per NETCONF RPC operation, plus the
//! dispatcher that routes a parsed request to them.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod commit;
pub mod common;
pub mod copy_config;
pub mod delete_config;
pub mod discard_changes;
pub mod edit_config;
pub mod get;
pub mod get_config;
pub mod locking;
pub mod session_ops;
pub mod validate;

use std::sync::{Arc, atomic::Ordering};

use tracing::debug;

use crate::{
    auth::rbac::{self, Operation},
    datastore::store::Datastore,
    handlers::get::OperationalDataProvider,
    metrics::Metrics,
    proto::{error::RpcError, reply::ReplyBody, rpc::RpcRequest},
    session::{manager::SessionManager, session::Session},
};

/// Shared context every handler receives.
pub struct OpContext {
    pub datastore: Arc<Datastore>,
    pub sessions: Arc<SessionManager>,
    pub state_provider: Arc<dyn OperationalDataProvider>,
    pub lock_timeout: std::time::Duration,
    pub metrics: Arc<Metrics>,
}

/// What the serve loop does after writing the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    None,
    /// Tear the session down once the reply is on the wire.
    Close,
}

/// Routes one RPC: operation resolution, RBAC, handler invocation.
///
/// Operation resolution comes first so a malformed operation name is
/// reported as `operation-not-supported`, never masked as an
/// authorization failure. A cancelled session surfaces as a best-effort
/// `operation-failed` reply.
pub async fn dispatch(
    ctx: &OpContext,
    session: &Arc<Session>,
    rpc: &RpcRequest,
) -> (ReplyBody, PostAction) {
    session.touch().await;
    ctx.metrics.rpcs_dispatched.fetch_add(1, Ordering::Relaxed);

    let name = rpc.operation_name();
    let Some(op) = Operation::from_name(name) else {
        debug!(operation = name, "unknown operation");
        return (
            ReplyBody::error(
                RpcError::operation_not_supported(format!("unknown operation: {name}"))
                    .with_bad_element(name.to_string()),
            ),
            PostAction::None,
        );
    };

    if !rbac::is_allowed(session.role, op) {
        return (
            ReplyBody::error(RpcError::access_denied(format!(
                "role {} may not invoke {}",
                session.role,
                op.name()
            ))),
            PostAction::None,
        );
    }

    let body = &rpc.operation;
    let handled = tokio::select! {
        _ = session.cancel.cancelled() => {
            Err(RpcError::operation_failed("session is closing")
                .with_app_tag("timeout"))
        },
        result = async {
            match op {
                Operation::GetConfig => get_config::get_config(ctx, session, body).await,
                Operation::Get => get::get(ctx, session, body).await,
                Operation::Lock => locking::lock(ctx, session, body).await,
                Operation::Unlock => locking::unlock(ctx, session, body).await,
                Operation::EditConfig => edit_config::edit_config(ctx, session, body).await,
                Operation::Validate => validate::validate(ctx, session, body).await,
                Operation::Commit => commit::commit(ctx, session, body).await,
                Operation::DiscardChanges => {
                    discard_changes::discard_changes(ctx, session, body).await
                },
                Operation::CopyConfig => copy_config::copy_config(ctx, session, body).await,
                Operation::DeleteConfig => {
                    delete_config::delete_config(ctx, session, body).await
                },
                Operation::CloseSession => session_ops::close_session(ctx, session).await,
                Operation::KillSession => session_ops::kill_session(ctx, session, body).await,
            }
        } => result,
    };

    match handled {
        Ok(reply) => {
            let action = if op == Operation::CloseSession {
                PostAction::Close
            } else {
                PostAction::None
            };
            (reply, action)
        },
        Err(err) => {
            ctx.metrics.rpc_errors.fetch_add(1, Ordering::Relaxed);
            (ReplyBody::error(err), PostAction::None)
        },
    }
}
