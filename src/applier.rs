//! Applying synthesized configuration to the running daemon.
//!
//! The apply sequence is linear with no retries: synthesize, write
//! atomically, validate with the external checker, reload. Validation
//! failure aborts with the checker's diagnostics; reload failure is
//! downgraded to a warning because the on-disk file is already known valid.
//!
//! Callers must serialize [`ConfigApplier::apply`] invocations themselves —
//! two concurrent writers would race on the single managed file.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::conf;
use crate::control::UnboundControl;
use crate::error::{ManagerError, Result};
use crate::settings::ResolverSettings;
use crate::stats::{self, ResolverStats};
use crate::util;

/// Default location of the managed configuration fragment.
pub const DEFAULT_MANAGED_CONF: &str = "/etc/unbound/unbound.conf.d/managed-resolver.conf";

/// Result of a successful apply.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    /// `true` when a configuration was written, `false` on the disabled path.
    pub applied: bool,
    /// Human-readable summary.
    pub message: String,
    /// Set when the daemon reload failed after a valid write.
    pub reload_warning: Option<String>,
}

/// Point-in-time resolver status, assembled fail-open.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverStatus {
    /// Whether the managed configuration file exists on disk.
    pub configured: bool,
    /// Whether the daemon answered the status query.
    pub running: bool,
    /// Daemon version, when running.
    pub version: Option<String>,
    /// Daemon uptime in seconds, when running.
    pub uptime_secs: Option<u64>,
    /// Human-readable summary.
    pub message: String,
}

/// Result of a single-shot resolution probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    /// Whether the probe produced an answer.
    pub success: bool,
    /// The domain that was queried.
    pub domain: String,
    /// First answer, when any.
    pub answer: Option<String>,
    /// Human-readable summary.
    pub message: String,
}

/// Owns the managed configuration file and coordinates with the daemon.
///
/// # Example
///
/// ```rust,ignore
/// use unbound_manager::{ConfigApplier, ResolverSettings, UnboundCommand};
///
/// let applier = ConfigApplier::new(UnboundCommand::new());
/// let outcome = applier.apply(&settings)?;
/// assert!(outcome.applied);
/// ```
pub struct ConfigApplier<C> {
    conf_path: PathBuf,
    control: C,
}

impl<C: UnboundControl> ConfigApplier<C> {
    /// Creates an applier targeting the default managed file.
    #[must_use]
    pub fn new(control: C) -> Self {
        Self {
            conf_path: PathBuf::from(DEFAULT_MANAGED_CONF),
            control,
        }
    }

    /// Overrides the managed file path (useful for testing).
    #[must_use]
    pub fn with_conf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.conf_path = path.into();
        self
    }

    /// Returns the managed configuration file path.
    #[must_use]
    pub fn conf_path(&self) -> &Path {
        &self.conf_path
    }

    /// Synthesizes and deploys the configuration for `settings`.
    ///
    /// With the resolver disabled this removes the managed file if present
    /// and reports success; calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidSettings`] when validation fails before
    /// any write, [`ManagerError::Io`] on filesystem failure, or
    /// [`ManagerError::ConfigRejected`] when the external checker rejects the
    /// written file. On rejection the file is left in place for inspection —
    /// there is no automatic rollback, and the daemon keeps its previously
    /// loaded configuration until the next successful apply.
    pub fn apply(&self, settings: &ResolverSettings) -> Result<ApplyOutcome> {
        let Some(config) = conf::generate(settings)? else {
            return self.remove_managed();
        };

        if let Some(parent) = self.conf_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        util::write_atomic(&self.conf_path, &config)?;
        tracing::info!(
            path = %self.conf_path.display(),
            bytes = config.len(),
            "Wrote resolver configuration"
        );

        let check = self.control.check_syntax()?;
        if !check.success {
            tracing::error!(
                path = %self.conf_path.display(),
                details = %check.output,
                "Checker rejected the generated configuration, file left in place"
            );
            return Err(ManagerError::ConfigRejected {
                details: check.output,
            });
        }

        let reload_warning = match self.control.reload() {
            Ok(outcome) if outcome.success => None,
            Ok(outcome) => Some(outcome.output),
            Err(e) => Some(e.to_string()),
        };
        if let Some(warning) = &reload_warning {
            tracing::warn!(warning = %warning, "Could not reload the daemon");
        } else {
            tracing::info!("Daemon reloaded");
        }

        Ok(ApplyOutcome {
            applied: true,
            message: "resolver configuration applied".to_string(),
            reload_warning,
        })
    }

    fn remove_managed(&self) -> Result<ApplyOutcome> {
        if self.conf_path.exists() {
            std::fs::remove_file(&self.conf_path)?;
            tracing::info!(path = %self.conf_path.display(), "Removed resolver configuration");
        }
        Ok(ApplyOutcome {
            applied: false,
            message: "resolver disabled".to_string(),
            reload_warning: None,
        })
    }

    /// Reports whether the resolver is configured and the daemon answers.
    ///
    /// Never fails: collaborator errors degrade to a not-running status.
    #[must_use]
    pub fn status(&self) -> ResolverStatus {
        if !self.conf_path.exists() {
            return ResolverStatus {
                configured: false,
                running: false,
                version: None,
                uptime_secs: None,
                message: "resolver not configured".to_string(),
            };
        }

        match self.control.status() {
            Ok(outcome) if outcome.success => {
                let daemon = stats::parse_status(&outcome.output);
                ResolverStatus {
                    configured: true,
                    running: true,
                    version: daemon.version,
                    uptime_secs: daemon.uptime_secs,
                    message: "resolver is running".to_string(),
                }
            }
            Ok(_) => ResolverStatus {
                configured: true,
                running: false,
                version: None,
                uptime_secs: None,
                message: "resolver service is not running".to_string(),
            },
            Err(e) => {
                tracing::debug!(error = %e, "Status query failed");
                ResolverStatus {
                    configured: true,
                    running: false,
                    version: None,
                    uptime_secs: None,
                    message: format!("status unavailable: {e}"),
                }
            }
        }
    }

    /// Fetches and parses daemon statistics.
    ///
    /// Never fails: any collaborator error yields zeroed stats.
    #[must_use]
    pub fn stats(&self) -> ResolverStats {
        match self.control.stats() {
            Ok(outcome) if outcome.success => stats::parse_stats(&outcome.output),
            Ok(outcome) => {
                tracing::debug!(output = %outcome.output, "Stats query failed");
                ResolverStats::default()
            }
            Err(e) => {
                tracing::debug!(error = %e, "Stats query failed");
                ResolverStats::default()
            }
        }
    }

    /// Resolves `domain` against the local daemon as a liveness test.
    ///
    /// Never fails: probe errors are reported in the outcome.
    #[must_use]
    pub fn probe(&self, domain: &str) -> ProbeOutcome {
        match self.control.probe(domain) {
            Ok(outcome) if outcome.success => {
                let answer = outcome
                    .output
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(String::from);
                match answer {
                    Some(addr) => ProbeOutcome {
                        success: true,
                        domain: domain.to_string(),
                        answer: Some(addr),
                        message: "resolution successful".to_string(),
                    },
                    None => ProbeOutcome {
                        success: false,
                        domain: domain.to_string(),
                        answer: None,
                        message: "no response from resolver".to_string(),
                    },
                }
            }
            Ok(outcome) => ProbeOutcome {
                success: false,
                domain: domain.to_string(),
                answer: None,
                message: format!("resolution failed: {}", outcome.output),
            },
            Err(e) => ProbeOutcome {
                success: false,
                domain: domain.to_string(),
                answer: None,
                message: format!("resolution failed: {e}"),
            },
        }
    }
}
