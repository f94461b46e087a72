//! The protocol engine's front door: wiring of datastore, session
//! manager and rate limiter, plus the per-channel serve loop.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    auth::rate_limiter::RateLimiter,
    cfg::config::Config,
    datastore::{backend::BackendApply, store::Datastore},
    handlers::{self, OpContext, PostAction, get::OperationalDataProvider},
    metrics::Metrics,
    proto::{
        hello::{parse_client_hello, render_server_hello},
        reply::{ReplyBody, render_reply},
        rpc::parse_rpc,
    },
    session::{manager::SessionManager, session::Session},
    transport::{
        channel::{Identity, io_with_timeout},
        framing::{FrameReader, FrameWriter},
    },
};

/// Subsystem name NETCONF clients must request on the SSH channel; the
/// transport front end rejects anything else.
pub const SSH_SUBSYSTEM: &str = "netconf";

/// Bound on any single reply/hello write, so a peer that stops reading
/// cannot wedge the serve task until the cleanup ticker notices.
const WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

pub struct NetconfServer {
    pub cfg: Arc<Config>,
    pub datastore: Arc<Datastore>,
    pub sessions: Arc<SessionManager>,
    pub rate_limiter: Arc<RateLimiter>,
    pub state_provider: Arc<dyn OperationalDataProvider>,
    pub metrics: Arc<Metrics>,
}

impl NetconfServer {
    pub fn new(
        cfg: Config,
        initial_running: String,
        backend: Box<dyn BackendApply>,
        state_provider: Arc<dyn OperationalDataProvider>,
    ) -> Arc<Self> {
        let cfg = Arc::new(cfg);
        let metrics = Arc::new(Metrics::default());
        let mut datastore = Datastore::new(
            initial_running,
            backend,
            cfg.server.clear_candidate_on_commit,
        );
        if let Some(path) = &cfg.datastore.initial_config_path {
            datastore = datastore.with_persistence(path.into());
        }
        let datastore = Arc::new(datastore);
        let sessions = Arc::new(SessionManager::new(
            cfg.server.max_sessions,
            cfg.idle_timeout(),
            cfg.absolute_timeout(),
            cfg.cleanup_interval(),
            Arc::clone(&datastore),
            Arc::clone(&metrics),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(&cfg.rate_limit));
        Arc::new(Self {
            cfg,
            datastore,
            sessions,
            rate_limiter,
            state_provider,
            metrics,
        })
    }

    /// Spawns the session-cleanup and rate-limiter-prune tickers.
    pub fn spawn_background(self: &Arc<Self>, cancel: &CancellationToken) {
        let sessions = Arc::clone(&self.sessions);
        let cleanup_cancel = cancel.clone();
        tokio::spawn(async move {
            sessions.run_cleanup(cleanup_cancel).await;
        });
        let limiter = Arc::clone(&self.rate_limiter);
        let prune_cancel = cancel.clone();
        tokio::spawn(async move {
            limiter.run_prune(prune_cancel).await;
        });
    }

    fn op_context(&self) -> OpContext {
        OpContext {
            datastore: Arc::clone(&self.datastore),
            sessions: Arc::clone(&self.sessions),
            state_provider: Arc::clone(&self.state_provider),
            lock_timeout: self.cfg.lock_timeout(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Serves one authenticated channel to completion: hello exchange,
    /// then the strictly sequential read → dispatch → reply loop. The
    /// transport collaborator has already verified the identity.
    pub async fn serve_channel<R, W>(
        self: Arc<Self>,
        read: R,
        write: W,
        identity: Identity,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        // Reject over-limit connections before any hello is exchanged.
        let session = self
            .sessions
            .create(&identity.username, identity.role, &identity.peer_addr)
            .await
            .context("session rejected")?;

        let mut reader = FrameReader::new(read, self.cfg.framing.clone());
        let mut writer = FrameWriter::new(write, self.cfg.framing.clone());

        let result = self
            .run_session(&mut reader, &mut writer, &session)
            .await;

        // Teardown runs on a fresh path: the session's own token may
        // already be cancelled.
        self.sessions.close(session.id).await;
        let _ = writer.shutdown().await;
        result
    }

    async fn run_session<R, W>(
        &self,
        reader: &mut FrameReader<R>,
        writer: &mut FrameWriter<W>,
        session: &Arc<Session>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        // The server speaks first (RFC 6242 §3); both hellos ride the
        // base:1.0 end-of-message framing.
        let server_hello = render_server_hello(session.numeric_id)?;
        io_with_timeout(
            "write hello",
            writer.write_message(server_hello.as_bytes()),
            WRITE_TIMEOUT,
            &session.cancel,
        )
        .await
        .context("failed to send server hello")?;

        let client_hello_bytes = tokio::select! {
            _ = session.cancel.cancelled() => anyhow::bail!("session cancelled before hello"),
            msg = reader.read_message() => {
                msg.context("failed to read client hello")?
                    .context("peer closed before hello")?
            },
        };
        let client_hello = match parse_client_hello(&client_hello_bytes, &self.cfg.xml) {
            Ok(hello) => hello,
            Err(err) => {
                warn!(session_id = session.numeric_id, error = %err, "bad client hello");
                anyhow::bail!("invalid client hello: {err}");
            },
        };

        let version = client_hello.negotiated_version();
        session.set_base_version(version).await;
        // Bytes buffered past the hello survive this switch.
        reader.set_version(version);
        writer.set_version(version);
        info!(
            session_id = session.numeric_id,
            base = version.as_str(),
            "hello exchange complete"
        );

        let ctx = self.op_context();
        loop {
            let message = tokio::select! {
                _ = session.cancel.cancelled() => {
                    debug!(session_id = session.numeric_id, "session cancelled");
                    return Ok(());
                },
                msg = reader.read_message() => msg,
            };
            let message = match message {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    debug!(session_id = session.numeric_id, "peer closed channel");
                    return Ok(());
                },
                Err(e) => {
                    // Framing violations are fatal to the session.
                    warn!(session_id = session.numeric_id, error = %e, "framing error");
                    anyhow::bail!("framing error: {e}");
                },
            };

            let (message_id, body, action) =
                match parse_rpc(&message, &self.cfg.xml) {
                    Ok(rpc) => {
                        let (body, action) =
                            handlers::dispatch(&ctx, session, &rpc).await;
                        (Some(rpc.message_id), body, action)
                    },
                    Err(err) => {
                        debug!(session_id = session.numeric_id, error = %err, "malformed rpc");
                        (None, ReplyBody::error(err), PostAction::None)
                    },
                };

            let rendered = render_reply(message_id.as_deref(), &body);
            if let Err(e) = io_with_timeout(
                "write reply",
                writer.write_message(rendered.as_bytes()),
                WRITE_TIMEOUT,
                &session.cancel,
            )
            .await
            {
                warn!(session_id = session.numeric_id, error = %e, "failed to write reply");
                anyhow::bail!("write error: {e}");
            }

            if action == PostAction::Close {
                info!(session_id = session.numeric_id, "close-session acknowledged");
                return Ok(());
            }
        }
    }
}
