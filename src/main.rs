// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Development harness. A production deployment terminates SSH in front
//! of the engine and hands over authenticated channels; this binary
//! listens on plain TCP instead and authenticates with a two-line
//! plaintext preamble (username, then password), which keeps the whole
//! protocol path exercisable with nothing but netcat.

use std::sync::Arc;

use anyhow::{Context, Result};
use netconf_server_rs::{
    auth::user_db::{StaticUserDb, authenticate},
    cfg::{
        cli::{Args, resolve_config_path},
        config::Config,
        logger::init_logger,
    },
    datastore::backend::AcceptAllBackend,
    handlers::get::StaticStateProvider,
    server::NetconfServer,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;
    let _logger_guard = init_logger(&args.logger)?;

    let cfg = resolve_config_path(&args.config)
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let initial_running = match &cfg.datastore.initial_config_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read initial config {path}"));
            },
        },
        None => String::new(),
    };

    let user_db = Arc::new(StaticUserDb::from_config(&cfg.users));
    let listen_addr = cfg.server.listen_addr.clone();
    let server = NetconfServer::new(
        cfg,
        initial_running,
        Box::new(AcceptAllBackend),
        Arc::new(StaticStateProvider::default()),
    );

    let cancel = CancellationToken::new();
    server.spawn_background(&cancel);

    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!(addr = listen_addr, "listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let server = Arc::clone(&server);
        let user_db = Arc::clone(&user_db);
        tokio::spawn(async move {
            let peer_addr = peer.to_string();
            let (read_half, write_half) = stream.into_split();
            let mut read_half = BufReader::new(read_half);

            // Plaintext preamble standing in for SSH authentication.
            let mut username = String::new();
            let mut secret = String::new();
            if read_half.read_line(&mut username).await.is_err()
                || read_half.read_line(&mut secret).await.is_err()
            {
                return;
            }
            let identity = match authenticate(
                user_db.as_ref(),
                &server.rate_limiter,
                &peer_addr,
                username.trim(),
                secret.trim(),
            )
            .await
            {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(peer = peer_addr, error = %e, "authentication rejected");
                    return;
                },
            };

            if let Err(e) = server.serve_channel(read_half, write_half, identity).await {
                warn!(peer = peer_addr, error = %e, "session ended with error");
            }
        });
    }
}
