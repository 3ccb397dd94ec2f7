//! Registry Gateway - entitlement-gated content access with signed CDN redirects

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing::error;

use registry_gateway::{
    cli::{Cli, Command},
    config::Config,
    gateway::Gateway,
    setup_tracing,
    token::{TokenAlgorithm, generate_cdn_token},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Some(Command::Token {
            path,
            secret,
            expires_in,
            algorithm,
        }) => run_token(&path, &secret, expires_in, algorithm),
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Mint a signed CDN token and print it.
fn run_token(path: &str, secret: &str, expires_in: u64, algorithm: TokenAlgorithm) -> ExitCode {
    let expiry = Utc::now().timestamp() + expires_in as i64;
    match generate_cdn_token(path, secret, expiry, algorithm) {
        Ok(token) => {
            println!("{token}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Failed to generate token");
            ExitCode::FAILURE
        }
    }
}

/// Run the gateway server
async fn run_server(cli: Cli) -> ExitCode {
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    // CLI flags override file and environment settings.
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }

    let gateway = match Gateway::new(config) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!(error = %e, "Failed to initialize gateway");
            return ExitCode::FAILURE;
        }
    };

    match gateway.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Gateway error");
            ExitCode::FAILURE
        }
    }
}
