// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Outbound `<rpc-reply>` rendering. A reply carries exactly one of an
//! `<ok/>`, a `<data>` payload, or one or more `<rpc-error>` children.

use quick_xml::escape::escape;

use crate::proto::{BASE_NS, error::RpcError};

/// Body of one reply. `Data` holds already-rendered XML (the handler is
/// responsible for producing well-formed content); `Errors` is never
/// empty.
#[derive(Debug, Clone)]
pub enum ReplyBody {
    Ok,
    Data(String),
    Errors(Vec<RpcError>),
}

impl ReplyBody {
    pub fn error(err: RpcError) -> Self {
        ReplyBody::Errors(vec![err])
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ReplyBody::Errors(_))
    }
}

/// Renders a complete `<rpc-reply>` document. `message_id` is `None`
/// only when the request was too malformed to extract one.
pub fn render_reply(message_id: Option<&str>, body: &ReplyBody) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("<rpc-reply");
    if let Some(id) = message_id {
        out.push_str(" message-id=\"");
        out.push_str(&escape(id));
        out.push('"');
    }
    out.push_str(" xmlns=\"");
    out.push_str(BASE_NS);
    out.push_str("\">");
    match body {
        ReplyBody::Ok => out.push_str("<ok/>"),
        ReplyBody::Data(inner) => {
            out.push_str("<data>");
            out.push_str(inner);
            out.push_str("</data>");
        },
        ReplyBody::Errors(errors) => {
            for err in errors {
                render_rpc_error(&mut out, err);
            }
        },
    }
    out.push_str("</rpc-reply>");
    out
}

fn render_rpc_error(out: &mut String, err: &RpcError) {
    out.push_str("<rpc-error>");
    push_leaf(out, "error-type", err.error_type.as_str());
    push_leaf(out, "error-tag", err.tag.as_str());
    push_leaf(out, "error-severity", "error");
    if let Some(app_tag) = &err.app_tag {
        push_leaf(out, "error-app-tag", app_tag);
    }
    if let Some(path) = &err.path {
        push_leaf(out, "error-path", path);
    }
    if let Some(message) = &err.message {
        push_leaf(out, "error-message", message);
    }
    if !err.info.is_empty() {
        out.push_str("<error-info>");
        if let Some(v) = &err.info.bad_element {
            push_leaf(out, "bad-element", v);
        }
        if let Some(v) = &err.info.bad_attribute {
            push_leaf(out, "bad-attribute", v);
        }
        if let Some(v) = &err.info.bad_namespace {
            push_leaf(out, "bad-namespace", v);
        }
        if let Some(id) = err.info.lock_owner_session {
            push_leaf(out, "lock-owner-session", &id.to_string());
        }
        out.push_str("</error-info>");
    }
    out.push_str("</rpc-error>");
}

fn push_leaf(out: &mut String, name: &str, value: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
    out.push_str(&escape(value));
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}
