// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use netconf_server_rs::{
    cfg::config::XmlConfig,
    proto::xml::{XmlGuardError, parse_guarded},
};

fn limits() -> XmlConfig {
    XmlConfig::default()
}

#[test]
fn parses_nested_document() {
    let root = parse_guarded(
        b"<rpc message-id=\"1\"><get-config><source><running/></source></get-config></rpc>",
        &limits(),
    )
    .expect("parse");
    assert_eq!(root.name, "rpc");
    assert_eq!(root.attr("message-id"), Some("1"));
    let op = root.child("get-config").expect("operation");
    assert!(op.child("source").expect("source").child("running").is_some());
}

#[test]
fn rejects_doctype() {
    let err = parse_guarded(
        b"<!DOCTYPE rpc SYSTEM \"evil.dtd\"><rpc message-id=\"1\"/>",
        &limits(),
    )
    .expect_err("DOCTYPE must be rejected");
    assert!(matches!(err, XmlGuardError::DoctypeForbidden));
    let rpc_err = err.to_rpc_error();
    assert_eq!(rpc_err.info.bad_element.as_deref(), Some("DOCTYPE"));
}

#[test]
fn rejects_oversized_document() {
    let mut limits = limits();
    limits.max_document_bytes = 16;
    let err = parse_guarded(b"<rpc message-id=\"1\"><x/></rpc>", &limits)
        .expect_err("oversized document must be rejected");
    assert!(matches!(err, XmlGuardError::DocTooLarge { .. }));
}

#[test]
fn rejects_excessive_depth() {
    let mut limits = limits();
    limits.max_depth = 4;
    let doc = b"<a><b><c><d><e/></d></c></b></a>";
    let err = parse_guarded(doc, &limits).expect_err("depth must be capped");
    assert!(matches!(err, XmlGuardError::TooDeep { .. }));
}

#[test]
fn rejects_excessive_element_count() {
    let mut limits = limits();
    limits.max_elements = 4;
    let doc = b"<a><b/><c/><d/><e/></a>";
    let err = parse_guarded(doc, &limits).expect_err("element count must be capped");
    assert!(matches!(err, XmlGuardError::TooManyElements { .. }));
}

#[test]
fn rejects_excessive_attributes() {
    let mut limits = limits();
    limits.max_attributes = 2;
    let doc = b"<a x=\"1\" y=\"2\" z=\"3\"/>";
    let err = parse_guarded(doc, &limits).expect_err("attribute count must be capped");
    assert!(matches!(err, XmlGuardError::TooManyAttributes { .. }));
}

#[test]
fn rejects_unbalanced_document() {
    assert!(parse_guarded(b"<a><b></a>", &limits()).is_err());
    assert!(parse_guarded(b"<a>", &limits()).is_err());
    assert!(parse_guarded(b"", &limits()).is_err());
}

#[test]
fn resolves_default_and_prefixed_namespaces() {
    let doc = b"<rpc xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\" \
                xmlns:v=\"urn:vendor\"><v:op/></rpc>";
    let root = parse_guarded(doc, &limits()).expect("parse");
    assert_eq!(root.namespace, "urn:ietf:params:xml:ns:netconf:base:1.0");
    let op = root.children.first().expect("child");
    assert_eq!(op.name, "op");
    assert_eq!(op.namespace, "urn:vendor");
}

#[test]
fn collects_text_and_entities() {
    let root = parse_guarded(b"<a>x &amp; y</a>", &limits()).expect("parse");
    assert_eq!(root.trimmed_text(), "x & y");
}

#[test]
fn rejects_undeclared_entity() {
    assert!(parse_guarded(b"<a>&boom;</a>", &limits()).is_err());
}
