// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! get(filter?): running configuration plus operational state from the
//! external provider, under one `<data>` element.

use std::pin::Pin;

use anyhow::Result;

use crate::{
    handlers::{
        OpContext,
        common::{filter_arg, parse_stored_text},
    },
    model::{filter::apply_filter, xml_view},
    proto::{error::RpcError, reply::ReplyBody, xml::XmlElement},
    session::session::Session,
};

pub type BoxedFetch<'a> = Pin<Box<dyn Future<Output = Result<Vec<XmlElement>>> + Send + 'a>>;

/// Source of operational state. The real provider assembles state from
/// live backends and lives outside this crate.
pub trait OperationalDataProvider: Send + Sync {
    fn fetch<'a>(&'a self) -> BoxedFetch<'a>;
}

/// Fixed state set, used by the development harness and tests.
#[derive(Debug, Default)]
pub struct StaticStateProvider {
    pub elements: Vec<XmlElement>,
}

impl OperationalDataProvider for StaticStateProvider {
    fn fetch<'a>(&'a self) -> BoxedFetch<'a> {
        let elements = self.elements.clone();
        Box::pin(async move { Ok(elements) })
    }
}

pub async fn get(
    ctx: &OpContext,
    _session: &Session,
    op: &XmlElement,
) -> Result<ReplyBody, RpcError> {
    for child in &op.children {
        match child.name.as_str() {
            "filter" => {},
            other => return Err(RpcError::unknown_element(other.to_string())),
        }
    }
    let filter = filter_arg(op)?;

    let running = ctx.datastore.get_running().await.text;
    let tree = parse_stored_text(&running)?;

    let mut data = XmlElement::new("data");
    data.children.push(xml_view::tree_to_element(&tree));
    let state = ctx.state_provider.fetch().await.map_err(|e| {
        RpcError::operation_failed(format!("operational data unavailable: {e}"))
            .with_app_tag("datastore-error")
    })?;
    data.children.extend(state);

    let selected = match filter {
        None => data,
        Some(filter_el) => apply_filter(&data, filter_el)
            .map_err(|e| RpcError::invalid_value(e.to_string()))?,
    };

    let mut rendered = String::new();
    for child in &selected.children {
        rendered.push_str(&xml_view::render_element(child));
    }
    Ok(ReplyBody::Data(rendered))
}
