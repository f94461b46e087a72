// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    handlers::{
        OpContext,
        common::{DatastoreName, datastore_arg, parse_stored_text, read_source_text},
    },
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

/// validate(source): structural and range validation of the candidate.
pub async fn validate(
    ctx: &OpContext,
    session: &Session,
    op: &XmlElement,
) -> Result<ReplyBody, RpcError> {
    for child in &op.children {
        match child.name.as_str() {
            "source" => {},
            other => return Err(RpcError::unknown_element(other.to_string())),
        }
    }

    match datastore_arg(op, "source")? {
        DatastoreName::Candidate => {},
        other => {
            return Err(RpcError::invalid_value(format!(
                "validate supports only the candidate datastore, not {}",
                other.as_str()
            ))
            .with_bad_element(other.as_str()));
        },
    }

    let text = read_source_text(ctx, session, DatastoreName::Candidate).await?;
    let tree = parse_stored_text(&text)?;

    let issues = tree.validate();
    if issues.is_empty() {
        Ok(ReplyBody::Ok)
    } else {
        Err(RpcError::invalid_value(issues.join("; "))
            .with_app_tag("validation-failed"))
    }
}
