// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use netconf_server_rs::{
    cfg::config::XmlConfig,
    proto::{
        CAP_BASE_1_0, CAP_BASE_1_1, CAP_CANDIDATE, CAP_VALIDATE, CAP_VENDOR_MODULE,
        hello::{parse_client_hello, render_server_hello},
    },
    transport::framing::BaseVersion,
};

fn client_hello(caps: &[&str]) -> Vec<u8> {
    let mut doc = String::from(
        "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><capabilities>",
    );
    for cap in caps {
        doc.push_str("<capability>");
        doc.push_str(cap);
        doc.push_str("</capability>");
    }
    doc.push_str("</capabilities></hello>");
    doc.into_bytes()
}

#[test]
fn server_hello_advertises_everything() {
    let hello = render_server_hello(7).expect("render");
    for cap in [
        CAP_BASE_1_0,
        CAP_BASE_1_1,
        CAP_CANDIDATE,
        CAP_VALIDATE,
        CAP_VENDOR_MODULE,
    ] {
        assert!(hello.contains(cap), "missing capability {cap} in {hello}");
    }
    assert!(hello.contains("<session-id>7</session-id>"), "hello: {hello}");
}

#[test]
fn negotiates_v1_0_when_client_stops_there() {
    let hello =
        parse_client_hello(&client_hello(&[CAP_BASE_1_0]), &XmlConfig::default())
            .expect("parse");
    assert_eq!(hello.negotiated_version(), BaseVersion::V1_0);
}

#[test]
fn negotiates_v1_1_when_advertised() {
    let hello = parse_client_hello(
        &client_hello(&[CAP_BASE_1_0, CAP_BASE_1_1]),
        &XmlConfig::default(),
    )
    .expect("parse");
    assert_eq!(hello.negotiated_version(), BaseVersion::V1_1);
}

#[test]
fn accepts_rfc_spelling_of_base_caps() {
    let hello = parse_client_hello(
        &client_hello(&[
            "urn:ietf:params:netconf:base:1.0",
            "urn:ietf:params:netconf:base:1.1",
        ]),
        &XmlConfig::default(),
    )
    .expect("parse");
    assert_eq!(hello.negotiated_version(), BaseVersion::V1_1);
}

#[test]
fn rejects_hello_without_base_1_0() {
    let err = parse_client_hello(&client_hello(&[CAP_BASE_1_1]), &XmlConfig::default())
        .expect_err("base:1.0 is mandatory");
    assert_eq!(err.tag.as_str(), "malformed-message");
}

#[test]
fn rejects_client_hello_with_session_id() {
    let doc = b"<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
        <capabilities><capability>urn:ietf:params:xml:ns:netconf:base:1.0</capability></capabilities>\
        <session-id>4</session-id></hello>";
    let err = parse_client_hello(doc, &XmlConfig::default())
        .expect_err("client session-id is forbidden");
    assert_eq!(err.info.bad_element.as_deref(), Some("session-id"));
}

#[test]
fn rejects_wrong_root() {
    let err = parse_client_hello(b"<rpc/>", &XmlConfig::default())
        .expect_err("non-hello root");
    assert_eq!(err.tag.as_str(), "malformed-message");
}
