// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The closed `rpc-error` taxonomy of RFC 6241 §4.3, restricted to the
//! tags this server emits. Handlers build values of [`RpcError`] and the
//! reply codec renders them; user-visible text goes into `error-message`,
//! machine-parseable classification into tag, app-tag and error-info.

use core::fmt;
use std::error::Error;

/// `error-type`: the protocol layer where the failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Transport => "transport",
            ErrorType::Rpc => "rpc",
            ErrorType::Protocol => "protocol",
            ErrorType::Application => "application",
        }
    }
}

/// `error-tag`: closed set of failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTag {
    MalformedMessage,
    InvalidValue,
    OperationNotSupported,
    MissingElement,
    UnknownElement,
    AccessDenied,
    LockDenied,
    OperationFailed,
}

impl ErrorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::MalformedMessage => "malformed-message",
            ErrorTag::InvalidValue => "invalid-value",
            ErrorTag::OperationNotSupported => "operation-not-supported",
            ErrorTag::MissingElement => "missing-element",
            ErrorTag::UnknownElement => "unknown-element",
            ErrorTag::AccessDenied => "access-denied",
            ErrorTag::LockDenied => "lock-denied",
            ErrorTag::OperationFailed => "operation-failed",
        }
    }

    /// Every protocol-class tag maps to `error-type` protocol; only
    /// `operation-failed` is an application failure.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ErrorTag::OperationFailed => ErrorType::Application,
            _ => ErrorType::Protocol,
        }
    }
}

/// Optional structured `error-info` children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    pub bad_element: Option<String>,
    pub bad_attribute: Option<String>,
    pub bad_namespace: Option<String>,
    /// Numeric id of the session holding a contested lock, omitted when
    /// the holder is unknown.
    pub lock_owner_session: Option<u32>,
}

impl ErrorInfo {
    pub fn is_empty(&self) -> bool {
        self.bad_element.is_none()
            && self.bad_attribute.is_none()
            && self.bad_namespace.is_none()
            && self.lock_owner_session.is_none()
    }
}

/// One `<rpc-error>` element. Severity is always `error`; warnings are
/// never emitted. `info` is boxed to keep the common `Result` path
/// small.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub error_type: ErrorType,
    pub tag: ErrorTag,
    pub app_tag: Option<String>,
    pub path: Option<String>,
    pub message: Option<String>,
    pub info: Box<ErrorInfo>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag.as_str())?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl Error for RpcError {}

impl RpcError {
    pub fn new(tag: ErrorTag) -> Self {
        Self {
            error_type: tag.error_type(),
            tag,
            app_tag: None,
            path: None,
            message: None,
            info: Box::default(),
        }
    }

    pub fn malformed_message<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorTag::MalformedMessage).with_message(message)
    }

    pub fn invalid_value<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorTag::InvalidValue).with_message(message)
    }

    pub fn operation_not_supported<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorTag::OperationNotSupported).with_message(message)
    }

    pub fn missing_element<S: Into<String>>(element: S) -> Self {
        let element = element.into();
        Self::new(ErrorTag::MissingElement)
            .with_message(format!("required element is missing: {element}"))
            .with_bad_element(element)
    }

    pub fn unknown_element<S: Into<String>>(element: S) -> Self {
        let element = element.into();
        Self::new(ErrorTag::UnknownElement)
            .with_message(format!("unknown element: {element}"))
            .with_bad_element(element)
    }

    pub fn access_denied<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorTag::AccessDenied)
            .with_message(message)
            .with_app_tag("rbac-deny")
    }

    pub fn lock_denied<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorTag::LockDenied).with_message(message)
    }

    pub fn operation_failed<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorTag::OperationFailed).with_message(message)
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_app_tag<S: Into<String>>(mut self, app_tag: S) -> Self {
        self.app_tag = Some(app_tag.into());
        self
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_bad_element<S: Into<String>>(mut self, element: S) -> Self {
        self.info.bad_element = Some(element.into());
        self
    }

    pub fn with_bad_attribute<S: Into<String>>(mut self, attribute: S) -> Self {
        self.info.bad_attribute = Some(attribute.into());
        self
    }

    pub fn with_bad_namespace<S: Into<String>>(mut self, ns: S) -> Self {
        self.info.bad_namespace = Some(ns.into());
        self
    }

    pub fn with_lock_owner(mut self, numeric_id: u32) -> Self {
        self.info.lock_owner_session = Some(numeric_id);
        self
    }
}
