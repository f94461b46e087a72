// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The commit path hands the candidate text to this interface before the
//! running datastore is swapped; a rejection aborts the commit with
//! backend-validation semantics. The real implementation drives the
//! forwarding/routing backends and lives outside this crate.

use std::pin::Pin;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("backend rejected configuration: {0}")]
pub struct BackendError(pub String);

pub type BoxedApply<'a> = Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + 'a>>;

pub trait BackendApply: Send + Sync {
    fn apply<'a>(&'a self, config_text: &'a str) -> BoxedApply<'a>;
}

/// Accept-everything backend used by the development harness and tests.
#[derive(Debug, Default)]
pub struct AcceptAllBackend;

impl BackendApply for AcceptAllBackend {
    fn apply<'a>(&'a self, _config_text: &'a str) -> BoxedApply<'a> {
        Box::pin(async { Ok(()) })
    }
}

/// Backend that rejects every commit with a fixed reason. Test helper.
#[derive(Debug)]
pub struct RejectingBackend(pub String);

impl BackendApply for RejectingBackend {
    fn apply<'a>(&'a self, _config_text: &'a str) -> BoxedApply<'a> {
        let reason = self.0.clone();
        Box::pin(async move { Err(BackendError(reason)) })
    }
}
