//! NETCONF transport layer: message framing over an in-order byte stream.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

#![allow(clippy::module_inception)]
pub mod channel;
pub mod framing;
