// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Authenticated identity handed over by the transport collaborator
/// (normally the SSH server) together with the byte-stream halves.
#[derive(Debug, Clone)]
pub struct Identity {
    pub username: String,
    pub role: crate::auth::rbac::Role,
    /// Source address in display form, kept for audit records and the
    /// rate limiter.
    pub peer_addr: String,
}

/// Runs a transport future under both a timeout and the session's
/// cancellation token. Used for every socket-facing await in the serve
/// loop so a dead peer or a kill-session cannot wedge the task.
pub async fn io_with_timeout<F, T, E>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<anyhow::Error>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(anyhow!("{label} cancelled")),
        res = timeout(io_timeout, fut) => {
            match res {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(anyhow!("{label} timeout")),
            }
        }
    }
}
