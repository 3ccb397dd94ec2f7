//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::token::TokenAlgorithm;

/// Registry Gateway - entitlement-gated content access with signed CDN redirects
#[derive(Parser, Debug)]
#[command(name = "registry-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "REGISTRY_GATEWAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "REGISTRY_GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "REGISTRY_GATEWAY_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "REGISTRY_GATEWAY_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "REGISTRY_GATEWAY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gateway server (default)
    Serve,

    /// Mint a signed CDN token for a content path
    Token {
        /// Content path the token grants access to
        #[arg(required = true)]
        path: String,

        /// Hex-encoded shared secret
        #[arg(short, long, env = "REGISTRY_GATEWAY_CDN__SECRET")]
        secret: String,

        /// Token lifetime in seconds from now
        #[arg(short, long, default_value_t = 1800)]
        expires_in: u64,

        /// Digest algorithm (sha256, sha512)
        #[arg(short, long, default_value = "sha256")]
        algorithm: TokenAlgorithm,
    },
}
