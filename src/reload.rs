//! Live policy snapshot with serialized reloads.
//!
//! Readers clone an `Arc<PolicyModel>` and never wait on a reload. A reload
//! validates the new configuration off to the side and only swaps the
//! snapshot in when the report has no errors; otherwise the previous model
//! stays active.
//!
//! ```no_run
//! use std::path::Path;
//! use oidc_policy::{config::OidcConfig, reload::LivePolicy};
//!
//! # fn main() -> oidc_policy::Result<()> {
//! let config = OidcConfig::load(Some(Path::new("oidc.yaml")))?;
//! let live = LivePolicy::from_config(&config)?;
//!
//! let snapshot = live.get();
//! println!("{} clients", snapshot.clients.len());
//!
//! live.reload_from_path(Path::new("oidc.yaml"))?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::OidcConfig;
use crate::model::PolicyModel;
use crate::provider::build_policy_model;
use crate::validator::ValidationReport;
use crate::{Error, Result};

/// The active policy model
#[derive(Debug)]
pub struct LivePolicy {
    inner: RwLock<Arc<PolicyModel>>,
    generation: AtomicU64,
    reload_lock: Mutex<()>,
}

impl LivePolicy {
    /// Seed with an already validated model.
    #[must_use]
    pub fn new(model: PolicyModel) -> Self {
        Self {
            inner: RwLock::new(Arc::new(model)),
            generation: AtomicU64::new(0),
            reload_lock: Mutex::new(()),
        }
    }

    /// Validate `config` and seed with the result.
    pub fn from_config(config: &OidcConfig) -> Result<Self> {
        let (model, _) = build_policy_model(config)?;
        Ok(Self::new(model))
    }

    /// Clone the current snapshot.
    #[must_use]
    pub fn get(&self) -> Arc<PolicyModel> {
        Arc::clone(&self.inner.read())
    }

    /// Number of successful reloads since construction. Never blocks on an
    /// in-flight reload.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Validate `config` and publish it. On failure the previous snapshot
    /// remains active and the error carries the full report.
    pub fn reload(&self, config: &OidcConfig) -> Result<ValidationReport> {
        let _guard = self.reload_lock.lock();

        match build_policy_model(config) {
            Ok((model, report)) => {
                *self.inner.write() = Arc::new(model);
                let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                info!(
                    generation,
                    warnings = report.warnings().len(),
                    "Policy reload: new snapshot published"
                );
                Ok(report)
            }
            Err(e) => {
                if let Error::Validation(report) = &e {
                    for issue in report.errors() {
                        warn!(issue = %issue, "Policy reload rejected");
                    }
                }
                warn!(error = %e, "Policy reload failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    /// Load `path` through the configuration loader, then [`reload`](Self::reload).
    pub fn reload_from_path(&self, path: &Path) -> Result<ValidationReport> {
        let config = OidcConfig::load(Some(path)).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "Policy reload: failed to load configuration");
        })?;
        self.reload(&config)
    }
}
