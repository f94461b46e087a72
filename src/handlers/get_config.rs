// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    handlers::{
        OpContext,
        common::{DatastoreName, datastore_arg, filter_arg, parse_stored_text, read_source_text},
    },
    model::{filter::apply_filter, xml_view},
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

/// get-config(source, filter?): returns the filtered configuration of
/// `running` or the session's `candidate`.
pub async fn get_config(
    ctx: &OpContext,
    session: &Session,
    op: &XmlElement,
) -> Result<ReplyBody, RpcError> {
    for child in &op.children {
        match child.name.as_str() {
            "source" | "filter" => {},
            other => return Err(RpcError::unknown_element(other.to_string())),
        }
    }

    let source = datastore_arg(op, "source")?;
    if source == DatastoreName::Startup {
        return Err(
            RpcError::invalid_value("startup datastore is not supported")
                .with_bad_element("startup"),
        );
    }
    let filter = filter_arg(op)?;

    let text = read_source_text(ctx, session, source).await?;
    let tree = parse_stored_text(&text)?;
    let config_el = xml_view::tree_to_element(&tree);

    let selected = match filter {
        None => config_el,
        Some(filter_el) => apply_filter(&config_el, filter_el)
            .map_err(|e| RpcError::invalid_value(e.to_string()))?,
    };

    Ok(ReplyBody::Data(xml_view::render_element(&selected)))
}
