//! OIDC Policy Library
//!
//! Validation and normalization core of an OpenID Connect provider, plus the
//! runtime bearer authorization engine that consumes its output.
//!
//! # Features
//!
//! - **Key Registry**: issuer signing keys with inferred algorithms, RFC 7638
//!   key IDs and X.509 chain checks
//! - **Client Validation**: every registered client normalized in one pass,
//!   accumulating all errors and deprecation warnings
//! - **Signing Resolution**: one algorithm/key ID procedure shared by all
//!   five signed response kinds
//! - **Live Reload**: immutable [`model::PolicyModel`] snapshots swapped
//!   atomically, only when error-free
//! - **Bearer Authorization**: scope, audience and fresh subject evaluation
//!   on every request
//!
//! ```no_run
//! use oidc_policy::{config::OidcConfig, provider};
//!
//! # fn main() -> oidc_policy::Result<()> {
//! let config = OidcConfig::load(None)?;
//! let (model, report) = provider::build_policy_model(&config)?;
//! println!("{} clients, {} warnings", model.clients.len(), report.warnings().len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authz;
pub mod cli;
pub mod clients;
pub mod config;
pub mod discovery;
pub mod error;
pub mod keys;
pub mod model;
pub mod policy;
pub mod provider;
pub mod reload;
pub mod validator;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Internal(e.to_string()))?;
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Internal(e.to_string()))?;
        }
    }

    Ok(())
}
