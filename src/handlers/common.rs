// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Argument plumbing shared by the operation handlers: datastore name
//! resolution, filter extraction and the candidate-lock gate.

use crate::{
    datastore::store::Target,
    handlers::OpContext,
    model::tree::ConfigTree,
    proto::{error::RpcError, xml::XmlElement},
    session::session::Session,
};

/// Datastore names accepted on the wire. `startup` parses but every
/// operation rejects it as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatastoreName {
    Running,
    Candidate,
    Startup,
}

impl DatastoreName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatastoreName::Running => "running",
            DatastoreName::Candidate => "candidate",
            DatastoreName::Startup => "startup",
        }
    }
}

/// Resolves `<source>`/`<target>` to a datastore name. A missing
/// container or an empty one is `missing-element`; an unexpected child
/// is `unknown-element`.
pub fn datastore_arg(
    op: &XmlElement,
    container: &str,
) -> Result<DatastoreName, RpcError> {
    let holder = op
        .child(container)
        .ok_or_else(|| RpcError::missing_element(container.to_string()))?;
    let mut children = holder.children.iter();
    let name_el = children
        .next()
        .ok_or_else(|| RpcError::missing_element(container.to_string()))?;
    if children.next().is_some() {
        return Err(RpcError::malformed_message(format!(
            "{container} must name exactly one datastore"
        )));
    }
    match name_el.name.as_str() {
        "running" => Ok(DatastoreName::Running),
        "candidate" => Ok(DatastoreName::Candidate),
        "startup" => Ok(DatastoreName::Startup),
        other => Err(RpcError::unknown_element(other.to_string())),
    }
}

/// Pulls the optional `<filter>` out of an operation body and checks its
/// type: absent or `subtree` is accepted, `xpath` is unsupported,
/// anything else is an invalid value.
pub fn filter_arg(op: &XmlElement) -> Result<Option<&XmlElement>, RpcError> {
    let Some(filter) = op.child("filter") else {
        return Ok(None);
    };
    match filter.attr("type") {
        None | Some("subtree") => Ok(Some(filter)),
        Some("xpath") => Err(RpcError::operation_not_supported(
            "xpath filters are not supported",
        )
        .with_bad_attribute("type")),
        Some(other) => Err(RpcError::invalid_value(format!(
            "unsupported filter type: {other}"
        ))
        .with_bad_attribute("type")),
    }
}

/// Gate for every candidate-mutating operation: the session must hold
/// the candidate lock. When someone else holds it, the reply names the
/// holder's numeric id.
pub async fn require_candidate_lock(
    ctx: &OpContext,
    session: &Session,
    error_path: &str,
) -> Result<(), RpcError> {
    let info = ctx.datastore.get_lock_info(Target::Candidate).await;
    if info.is_locked && info.session_id == Some(session.id) {
        return Ok(());
    }
    let mut err = RpcError::lock_denied("candidate datastore is not locked by this session")
        .with_path(error_path.to_string());
    if info.is_locked && let Some(numeric) = info.numeric_id {
        err = err.with_lock_owner(numeric);
    }
    Err(err)
}

/// Reads the effective configuration of a datastore as text: the
/// session's candidate falls back to running when it has never been
/// written.
pub async fn read_source_text(
    ctx: &OpContext,
    session: &Session,
    source: DatastoreName,
) -> Result<String, RpcError> {
    match source {
        DatastoreName::Running => Ok(ctx.datastore.get_running().await.text),
        DatastoreName::Candidate => match ctx.datastore.get_candidate(session.id).await {
            Ok(stored) => Ok(stored.text),
            Err(_) => Ok(ctx.datastore.get_running().await.text),
        },
        DatastoreName::Startup => Err(RpcError::invalid_value(
            "startup datastore is not supported",
        )
        .with_bad_element("startup")),
    }
}

/// Parses stored configuration text. Stored text is produced by this
/// server, so a parse failure is an internal datastore error, not a
/// peer mistake.
pub fn parse_stored_text(text: &str) -> Result<ConfigTree, RpcError> {
    crate::model::text::parse(text).map_err(|e| {
        RpcError::operation_failed(format!("stored configuration unreadable: {e}"))
            .with_app_tag("datastore-error")
    })
}
