// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Command-line arguments of the development server binary.
#[derive(Debug, Clone)]
pub struct Args {
    /// Server configuration YAML.
    pub config: String,
    /// Logger configuration YAML.
    pub logger: String,
}

impl Args {
    pub fn parse<I: Iterator<Item = String>>(mut argv: I) -> Result<Self> {
        let mut config = "config/server.yaml".to_string();
        let mut logger = "config/logger.yaml".to_string();

        while let Some(arg) = argv.next() {
            match arg.as_str() {
                "--config" => {
                    config = argv.next().context("--config requires a path")?;
                },
                "--logger" => {
                    logger = argv.next().context("--logger requires a path")?;
                },
                other => bail!("unknown argument: {other}"),
            }
        }

        Ok(Self { config, logger })
    }
}

pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;

    Ok(canon)
}
