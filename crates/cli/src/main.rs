// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tracing::error;

use tfauth_cli::config::{Command, Config};
use tfauth_cli::terminal::TerminalInteraction;
use tfauth_cli::{fetch, manage};

fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    match run(config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Prompts share the terminal with stdout; logs go to stderr.
    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

fn run(config: Config) -> anyhow::Result<i32> {
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("tls crypto provider already installed");
    }

    match &config.command {
        Command::Fetch(args) => {
            let interaction = Arc::new(TerminalInteraction::stdio(args.oauth_token.clone()));
            let reports = fetch::run(&config.auth, args, interaction)?;
            let mut failed = false;
            for report in &reports {
                println!("{}", report.line());
                failed |= report.result.is_err();
            }
            Ok(if failed { 1 } else { 0 })
        }
        Command::Forget { server } => {
            manage::forget(&config.auth, server)?;
            Ok(0)
        }
        Command::Show { server } => {
            match manage::show(&config.auth, server)? {
                Some(kind) => println!("{server}: {kind}"),
                None => println!("{server}: no stored credentials"),
            }
            Ok(0)
        }
    }
}
