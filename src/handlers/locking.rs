// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! lock / unlock. Locks carry an absolute timeout; a lock whose
//! deadline passed is observed as released, so unlock after expiry is
//! `operation-failed`, not `lock-denied`.

use crate::{
    datastore::store::{DatastoreError, LockHolder, Target},
    handlers::{
        OpContext,
        common::{DatastoreName, datastore_arg},
    },
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

fn lock_target(op: &XmlElement) -> Result<Target, RpcError> {
    match datastore_arg(op, "target")? {
        DatastoreName::Running => Ok(Target::Running),
        DatastoreName::Candidate => Ok(Target::Candidate),
        DatastoreName::Startup => Err(RpcError::invalid_value(
            "startup datastore is not supported",
        )
        .with_bad_element("startup")),
    }
}

pub async fn lock(
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
    let target = lock_target(op)?;

    let holder = LockHolder {
        session_id: session.id,
        numeric_id: session.numeric_id,
        username: session.username.clone(),
    };
    match ctx
        .datastore
        .acquire_lock(target, holder, ctx.lock_timeout)
        .await
    {
        Ok(()) => {
            session.note_lock_acquired(target).await;
            Ok(ReplyBody::Ok)
        },
        Err(DatastoreError::LockHeld { holder_numeric, .. }) => {
            let mut err = RpcError::lock_denied(format!(
                "{} datastore is locked by another session",
                target.as_str()
            ))
            .with_path("/rpc/lock/target");
            if let Some(numeric) = holder_numeric {
                err = err.with_lock_owner(numeric);
            }
            Err(err)
        },
        Err(other) => Err(RpcError::operation_failed(other.to_string())
            .with_app_tag("datastore-error")),
    }
}

pub async fn unlock(
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
    let target = lock_target(op)?;

    match ctx.datastore.release_lock(target, session.id).await {
        Ok(()) => {
            session.note_lock_released(target).await;
            Ok(ReplyBody::Ok)
        },
        Err(DatastoreError::NoLock { .. }) => Err(RpcError::operation_failed(format!(
            "no lock is held on {}",
            target.as_str()
        ))),
        Err(DatastoreError::NotLockHolder { .. }) => {
            let info = ctx.datastore.get_lock_info(target).await;
            let mut err = RpcError::lock_denied(format!(
                "{} lock is held by another session",
                target.as_str()
            ))
            .with_path("/rpc/unlock/target");
            if let Some(numeric) = info.numeric_id {
                err = err.with_lock_owner(numeric);
            }
            Err(err)
        },
        Err(other) => Err(RpcError::operation_failed(other.to_string())
            .with_app_tag("datastore-error")),
    }
}
