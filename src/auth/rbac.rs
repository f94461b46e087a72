// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The role × operation access matrix. Evaluation is a single indexed
//! lookup per RPC; anything not explicitly allowed is denied.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The three configured roles. Unknown role strings never deserialize,
/// so a record with a bad role cannot authenticate at all.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "operator")]
    Operator,
    #[serde(rename = "read-only", alias = "readonly")]
    ReadOnly,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Operator => "operator",
            Role::ReadOnly => "read-only",
        })
    }
}

/// Every RPC operation this server dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Operation {
    GetConfig = 0,
    Get,
    Lock,
    Unlock,
    EditConfig,
    Validate,
    Commit,
    DiscardChanges,
    CopyConfig,
    DeleteConfig,
    CloseSession,
    KillSession,
}

pub const OPERATION_COUNT: usize = 12;

pub const ALL_OPERATIONS: [Operation; OPERATION_COUNT] = [
    Operation::GetConfig,
    Operation::Get,
    Operation::Lock,
    Operation::Unlock,
    Operation::EditConfig,
    Operation::Validate,
    Operation::Commit,
    Operation::DiscardChanges,
    Operation::CopyConfig,
    Operation::DeleteConfig,
    Operation::CloseSession,
    Operation::KillSession,
];

impl Operation {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "get-config" => Operation::GetConfig,
            "get" => Operation::Get,
            "lock" => Operation::Lock,
            "unlock" => Operation::Unlock,
            "edit-config" => Operation::EditConfig,
            "validate" => Operation::Validate,
            "commit" => Operation::Commit,
            "discard-changes" => Operation::DiscardChanges,
            "copy-config" => Operation::CopyConfig,
            "delete-config" => Operation::DeleteConfig,
            "close-session" => Operation::CloseSession,
            "kill-session" => Operation::KillSession,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::GetConfig => "get-config",
            Operation::Get => "get",
            Operation::Lock => "lock",
            Operation::Unlock => "unlock",
            Operation::EditConfig => "edit-config",
            Operation::Validate => "validate",
            Operation::Commit => "commit",
            Operation::DiscardChanges => "discard-changes",
            Operation::CopyConfig => "copy-config",
            Operation::DeleteConfig => "delete-config",
            Operation::CloseSession => "close-session",
            Operation::KillSession => "kill-session",
        }
    }
}

/// Dense allow matrix, rows indexed by role, columns by operation
/// discriminant. Reads only grant to read-only; kill-session only to
/// admin.
const ALLOW: [[bool; OPERATION_COUNT]; 3] = {
    const R: usize = 0; // read-only
    const O: usize = 1; // operator
    const A: usize = 2; // admin
    let mut m = [[false; OPERATION_COUNT]; 3];

    m[R][Operation::GetConfig as usize] = true;
    m[R][Operation::Get as usize] = true;

    let mut col = 0;
    while col < OPERATION_COUNT {
        // Operators get everything except kill-session.
        m[O][col] = col != Operation::KillSession as usize;
        m[A][col] = true;
        col += 1;
    }
    m
};

fn role_row(role: Role) -> usize {
    match role {
        Role::ReadOnly => 0,
        Role::Operator => 1,
        Role::Admin => 2,
    }
}

/// The single RBAC predicate.
pub fn is_allowed(role: Role, op: Operation) -> bool {
    ALLOW[role_row(role)][op as usize]
}
