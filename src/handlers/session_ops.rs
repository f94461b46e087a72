// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! close-session and kill-session. Closing always succeeds; the serve
//! loop tears the session down after the `<ok/>` is framed. Killing a
//! session behaves exactly like timeout expiry for the target.

use crate::{
    handlers::OpContext,
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

pub async fn close_session(
    _ctx: &OpContext,
    _session: &Session,
) -> Result<ReplyBody, RpcError> {
    Ok(ReplyBody::Ok)
}

pub async fn kill_session(
    ctx: &OpContext,
    session: &Session,
    op: &XmlElement,
) -> Result<ReplyBody, RpcError> {
    for child in &op.children {
        match child.name.as_str() {
            "session-id" => {},
            other => return Err(RpcError::unknown_element(other.to_string())),
        }
    }

    let raw = op
        .child_text("session-id")
        .ok_or_else(|| RpcError::missing_element("session-id"))?;
    let target: u32 = raw.parse().map_err(|_| {
        RpcError::invalid_value(format!("bad session-id: {raw}"))
            .with_bad_element("session-id")
    })?;

    if target == session.numeric_id {
        return Err(RpcError::invalid_value(
            "a session cannot kill itself",
        )
        .with_bad_element("session-id"));
    }

    if !ctx.sessions.kill_by_numeric(target).await {
        return Err(RpcError::invalid_value(format!(
            "no session with id {target}"
        ))
        .with_bad_element("session-id"));
    }
    Ok(ReplyBody::Ok)
}
