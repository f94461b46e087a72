//! NETCONF XML envelopes: hello, rpc, rpc-reply and the rpc-error
//! taxonomy, plus the guarded XML reader every inbound document goes
//! through.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod error;
pub mod hello;
pub mod reply;
pub mod rpc;
pub mod xml;

/// NETCONF base namespace, mandatory on every envelope root.
pub const BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Capability URI advertised for base:1.0.
pub const CAP_BASE_1_0: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
/// Capability URI advertised for base:1.1.
pub const CAP_BASE_1_1: &str = "urn:ietf:params:xml:ns:netconf:base:1.1";
/// Candidate datastore capability.
pub const CAP_CANDIDATE: &str = "urn:ietf:params:xml:ns:netconf:capability:candidate:1.0";
/// Validate capability, version 1.1.
pub const CAP_VALIDATE: &str = "urn:ietf:params:xml:ns:netconf:capability:validate:1.1";
/// Vendor configuration module.
pub const CAP_VENDOR_MODULE: &str = "urn:arcadia:params:xml:ns:arcos:config:1.0";

/// RFC 6241 spells hello capabilities without the `xml:ns` segment; some
/// stacks send that form, so version detection accepts both.
pub const CAP_BASE_1_0_ALT: &str = "urn:ietf:params:netconf:base:1.0";
pub const CAP_BASE_1_1_ALT: &str = "urn:ietf:params:netconf:base:1.1";
