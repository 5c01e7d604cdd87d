//! # unbound-manager
//!
//! Manage an [Unbound](https://nlnetlabs.nl/projects/unbound/about/)
//! recursive resolver: synthesize its configuration from structured settings,
//! apply it safely (write, validate, reload, with backups), and administer
//! the per-zone include files the daemon loads.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use unbound_manager::{
//!     AllowedNetwork, ConfigApplier, ResolverSettings, UnboundCommand, ZoneDirectory,
//! };
//!
//! let mut settings = ResolverSettings::default();
//! settings.enabled = true;
//! settings.access.allowed_networks.push(AllowedNetwork::new("10.0.0.0/8", "LAN"));
//!
//! // Write, validate with unbound-checkconf, reload (requires root).
//! let applier = ConfigApplier::new(UnboundCommand::new());
//! let outcome = applier.apply(&settings)?;
//! assert!(outcome.applied);
//!
//! // Administer zone include files.
//! let zones = ZoneDirectory::new();
//! zones.ensure_include_directive()?;
//! let configured = zones.list_zones()?;
//! ```
//!
//! ## Configuration lifecycle
//!
//! The generated file is a pure function of [`ResolverSettings`]: identical
//! settings produce byte-identical text, in a fixed section order so
//! successive applies diff cleanly. The file is fully owned by this crate —
//! it carries a machine-generated marker and is overwritten on every apply.
//!
//! Applying follows a linear sequence with no retries: synthesize, write via
//! atomic replace, run `unbound-checkconf`, then `unbound-control reload`.
//! A checker rejection aborts with the diagnostic text and leaves the file
//! on disk for inspection; a reload failure is only a warning, because the
//! written file is already known valid.
//!
//! Disabling the resolver (`settings.enabled = false`) removes the managed
//! file on the next apply. Both paths are idempotent.
//!
//! ## Concurrency
//!
//! One resolver instance, one managed file, last writer wins. Callers must
//! serialize [`ConfigApplier::apply`] invocations themselves; read-only
//! operations (status, stats, probe) are independent and fail open.
//!
//! ## Permissions
//!
//! Writing under `/etc/unbound/` and talking to the control socket require
//! root. The caller is responsible for privilege elevation (`sudo`, a
//! service manager, etc.).

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod applier;
pub mod conf;
pub mod control;
pub mod error;
pub mod settings;
pub mod stats;
pub mod util;
pub mod zones;

pub use applier::{ApplyOutcome, ConfigApplier, ProbeOutcome, ResolverStatus};
pub use control::{ControlOutcome, UnboundCommand, UnboundControl};
pub use error::{ManagerError, Result};
pub use settings::{AllowedNetwork, ResolverSettings, SettingsStore, UpstreamServer};
pub use stats::{DaemonStatus, ResolverStats};
pub use zones::{ZoneDirectory, ZoneEntry};
