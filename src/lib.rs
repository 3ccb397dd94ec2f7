//! Registry Gateway Library
//!
//! Content-access gateway for container-registry content. Decides, per
//! request, whether a repository/image/tag path may be served and produces
//! signed, time-limited redirects for delivery through a downstream CDN.
//!
//! # Features
//!
//! - **Entitlement authorization**: mTLS client certificates carry entitled
//!   content paths; protected repositories require a matching entitlement
//! - **Path resolution**: legacy, namespaced, and v2-style repository paths
//!   normalize into canonical identifiers
//! - **Signed redirects**: HMAC tokens compatible with the downstream CDN's
//!   verifier
//! - **Hot reload**: the repository catalog refreshes atomically when its
//!   data directory changes
//!
//! # No existence oracle
//!
//! Every authorization or resolution failure surfaces as the same
//! `404 Not Found`; unauthorized callers cannot probe which repositories
//! exist.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authz;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod gateway;
pub mod paths;
pub mod token;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Value of the `Docker-Distribution-API-Version` header on v2 responses
pub const DISTRIBUTION_API_VERSION: &str = "registry/2.0";

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
