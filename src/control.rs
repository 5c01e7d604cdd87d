//! Daemon control capability.
//!
//! The core subsystem never shells out directly: everything it needs from the
//! daemon goes through [`UnboundControl`], so tests can substitute an
//! in-memory fake. [`UnboundCommand`] is the production adapter over the
//! stock Unbound command-line tools.

use std::process::Command;

use crate::error::Result;

/// Default control tool (`reload`, `status`, `stats_noreset`).
pub const DEFAULT_CONTROL_BIN: &str = "unbound-control";

/// Default configuration checker.
pub const DEFAULT_CHECK_BIN: &str = "unbound-checkconf";

/// Default resolution probe tool.
pub const DEFAULT_PROBE_BIN: &str = "dig";

/// Outcome of one daemon control invocation.
#[derive(Debug, Clone)]
pub struct ControlOutcome {
    /// Whether the command exited successfully.
    pub success: bool,
    /// Combined stdout and stderr, stderr last.
    pub output: String,
}

/// Narrow interface to the resolver daemon.
///
/// All methods return `Err` only when the command could not be run at all;
/// a command that ran and failed is a `success: false` outcome carrying its
/// diagnostic text.
pub trait UnboundControl {
    /// Runs the daemon's configuration checker against the on-disk state.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`](crate::ManagerError::Io) if the checker
    /// cannot be invoked.
    fn check_syntax(&self) -> Result<ControlOutcome>;

    /// Asks the running daemon to reload its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`](crate::ManagerError::Io) if the control
    /// tool cannot be invoked.
    fn reload(&self) -> Result<ControlOutcome>;

    /// Returns the daemon's status dump (`version:`, `uptime:`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`](crate::ManagerError::Io) if the control
    /// tool cannot be invoked.
    fn status(&self) -> Result<ControlOutcome>;

    /// Returns cumulative statistics as newline-delimited `key=value` text.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`](crate::ManagerError::Io) if the control
    /// tool cannot be invoked.
    fn stats(&self) -> Result<ControlOutcome>;

    /// Resolves `domain` against the local daemon: single attempt with a
    /// short deadline, so a dead daemon cannot hang the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`](crate::ManagerError::Io) if the probe
    /// tool cannot be invoked.
    fn probe(&self, domain: &str) -> Result<ControlOutcome>;
}

/// Command-line adapter over the Unbound tool suite.
///
/// # Example
///
/// ```rust,ignore
/// use unbound_manager::control::{UnboundCommand, UnboundControl};
///
/// let control = UnboundCommand::new();
/// let check = control.check_syntax()?;
/// assert!(check.success);
/// ```
pub struct UnboundCommand {
    control_bin: String,
    check_bin: String,
    probe_bin: String,
}

impl UnboundCommand {
    /// Creates an adapter using the stock tool names, resolved via `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            control_bin: DEFAULT_CONTROL_BIN.to_string(),
            check_bin: DEFAULT_CHECK_BIN.to_string(),
            probe_bin: DEFAULT_PROBE_BIN.to_string(),
        }
    }

    /// Overrides the control tool.
    #[must_use]
    pub fn with_control_bin(mut self, bin: impl Into<String>) -> Self {
        self.control_bin = bin.into();
        self
    }

    /// Overrides the configuration checker.
    #[must_use]
    pub fn with_check_bin(mut self, bin: impl Into<String>) -> Self {
        self.check_bin = bin.into();
        self
    }

    /// Overrides the probe tool.
    #[must_use]
    pub fn with_probe_bin(mut self, bin: impl Into<String>) -> Self {
        self.probe_bin = bin.into();
        self
    }

    fn run(&self, bin: &str, args: &[&str]) -> Result<ControlOutcome> {
        let output = Command::new(bin).args(args).output()?;

        let mut text = String::from_utf8_lossy(&output.stdout)
            .trim_end()
            .to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }

        let success = output.status.success();
        tracing::debug!(bin, success, "Ran daemon control command");
        Ok(ControlOutcome { success, output: text })
    }
}

impl UnboundControl for UnboundCommand {
    fn check_syntax(&self) -> Result<ControlOutcome> {
        self.run(&self.check_bin, &[])
    }

    fn reload(&self) -> Result<ControlOutcome> {
        self.run(&self.control_bin, &["reload"])
    }

    fn status(&self) -> Result<ControlOutcome> {
        self.run(&self.control_bin, &["status"])
    }

    fn stats(&self) -> Result<ControlOutcome> {
        self.run(&self.control_bin, &["stats_noreset"])
    }

    fn probe(&self, domain: &str) -> Result<ControlOutcome> {
        self.run(
            &self.probe_bin,
            &["@127.0.0.1", domain, "A", "+short", "+time=2", "+tries=1"],
        )
    }
}

impl Default for UnboundCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_captures_stdout_and_exit_status() {
        let control = UnboundCommand::new().with_control_bin("echo");
        let outcome = control.status().unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output, "status");
    }

    #[test]
    fn run_reports_nonzero_exit() {
        let control = UnboundCommand::new().with_check_bin("false");
        let outcome = control.check_syntax().unwrap();
        assert!(!outcome.success);
    }

    #[test]
    fn missing_binary_is_an_error() {
        let control = UnboundCommand::new().with_check_bin("/nonexistent/unbound-checkconf");
        assert!(control.check_syntax().is_err());
    }

    #[test]
    fn probe_is_bounded_to_a_single_attempt() {
        let control = UnboundCommand::new().with_probe_bin("echo");
        let outcome = control.probe("example.com").unwrap();
        assert!(outcome.output.contains("+time=2"));
        assert!(outcome.output.contains("+tries=1"));
    }
}
