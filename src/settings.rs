//! Resolver settings model and JSON-backed persistence.
//!
//! [`ResolverSettings`] is the single source of truth for the generated
//! daemon configuration: the config file content is a pure function of this
//! struct at the moment of synthesis.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, Result};
use crate::util;

/// Default location of the persisted settings file.
const DEFAULT_SETTINGS_FILE: &str = "/var/lib/unbound-manager/settings.json";

/// Structured resolver configuration.
///
/// # Example
///
/// ```
/// use unbound_manager::settings::{AllowedNetwork, ResolverSettings};
///
/// let mut settings = ResolverSettings::default();
/// settings.enabled = true;
/// settings.access.allowed_networks.push(AllowedNetwork::new("10.0.0.0/8", "LAN"));
///
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Master switch. When `false`, no configuration is generated and any
    /// previously generated file is removed on apply.
    pub enabled: bool,

    /// Source-network access control, default-deny.
    pub access: AccessSettings,

    /// Thread count and prefetch behaviour.
    pub performance: PerformanceSettings,

    /// Message and RRset cache sizes.
    pub cache_size: CacheSizeSettings,

    /// Cache TTL clamping.
    pub cache_ttl: CacheTtlSettings,

    /// Identity/version disclosure.
    pub security: SecuritySettings,

    /// Daemon verbosity and query/reply logging.
    pub logging: LoggingSettings,

    /// When `true` and at least one upstream is enabled, all queries are
    /// forwarded instead of recursed.
    pub forwarding_enabled: bool,

    /// Ordered upstream forwarders, used only when forwarding is enabled.
    pub upstream_dns: Vec<UpstreamServer>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            access: AccessSettings::default(),
            performance: PerformanceSettings::default(),
            cache_size: CacheSizeSettings::default(),
            cache_ttl: CacheTtlSettings::default(),
            security: SecuritySettings::default(),
            logging: LoggingSettings::default(),
            forwarding_enabled: false,
            upstream_dns: Vec::new(),
        }
    }
}

impl ResolverSettings {
    /// Checks every field against the ranges the daemon accepts.
    ///
    /// Called by the synthesizer before any output is produced, so malformed
    /// settings never reach the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidSettings`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.performance.num_threads == 0 {
            return Err(invalid("num_threads must be at least 1"));
        }
        if self.cache_size.msg == 0 {
            return Err(invalid("msg cache size must be at least 1 MB"));
        }
        if self.cache_size.rrset == 0 {
            return Err(invalid("rrset cache size must be at least 1 MB"));
        }
        if self.cache_ttl.max < self.cache_ttl.min {
            return Err(invalid(&format!(
                "cache-max-ttl ({}) is below cache-min-ttl ({})",
                self.cache_ttl.max, self.cache_ttl.min
            )));
        }
        if self.logging.verbosity > 5 {
            return Err(invalid(&format!(
                "verbosity {} is out of range 0-5",
                self.logging.verbosity
            )));
        }
        for network in &self.access.allowed_networks {
            if network.network.parse::<IpNetwork>().is_err() {
                return Err(invalid(&format!("bad network CIDR: {}", network.network)));
            }
        }
        for upstream in &self.upstream_dns {
            if upstream.address.parse::<IpAddr>().is_err() {
                return Err(invalid(&format!(
                    "bad upstream address for {}: {}",
                    upstream.name, upstream.address
                )));
            }
            if upstream.port == 0 {
                return Err(invalid(&format!("upstream {} has port 0", upstream.name)));
            }
        }
        Ok(())
    }

    /// Returns `true` if forwarding is on and at least one upstream is enabled.
    #[must_use]
    pub fn forwarding_active(&self) -> bool {
        self.forwarding_enabled && self.upstream_dns.iter().any(|u| u.enabled)
    }
}

fn invalid(msg: &str) -> ManagerError {
    ManagerError::InvalidSettings(msg.to_string())
}

/// Source-network access control list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    /// Enabled entries become allow rules, in declared order, after the
    /// universal deny rule.
    pub allowed_networks: Vec<AllowedNetwork>,
}

/// One allowed source network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowedNetwork {
    /// CIDR notation, e.g. `"10.0.0.0/8"`.
    pub network: String,
    /// Free-text label, emitted as a trailing comment.
    pub description: String,
    /// Disabled entries are omitted from the generated file entirely.
    pub enabled: bool,
}

impl AllowedNetwork {
    /// Creates an enabled entry.
    #[must_use]
    pub fn new(network: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            description: description.into(),
            enabled: true,
        }
    }
}

impl Default for AllowedNetwork {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// Thread count and prefetch behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSettings {
    /// Worker threads, must be positive.
    pub num_threads: u32,
    /// Refresh popular cache entries before they expire.
    pub prefetch: bool,
    /// Prefetch DNSSEC keys too. Only emitted when `prefetch` is on.
    pub prefetch_key: bool,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            num_threads: 2,
            prefetch: true,
            prefetch_key: false,
        }
    }
}

/// Cache sizes in megabytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSizeSettings {
    /// Message cache size in MB.
    pub msg: u32,
    /// RRset cache size in MB. Unbound recommends twice the message cache.
    pub rrset: u32,
}

impl Default for CacheSizeSettings {
    fn default() -> Self {
        Self { msg: 50, rrset: 100 }
    }
}

/// TTL clamping in seconds. Invariant: `max >= min`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtlSettings {
    /// Lower bound applied to cached entries.
    pub min: u32,
    /// Upper bound applied to cached entries.
    pub max: u32,
}

impl Default for CacheTtlSettings {
    fn default() -> Self {
        Self {
            min: 300,
            max: 86_400,
        }
    }
}

/// Identity/version disclosure knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Refuse `id.server`/`hostname.bind` queries.
    pub hide_identity: bool,
    /// Refuse `version.server`/`version.bind` queries.
    pub hide_version: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            hide_identity: true,
            hide_version: true,
        }
    }
}

/// Daemon logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Daemon verbosity, 0-5.
    pub verbosity: u8,
    /// Log every query.
    pub log_queries: bool,
    /// Log every reply.
    pub log_replies: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            verbosity: 1,
            log_queries: false,
            log_replies: false,
        }
    }
}

/// One upstream forwarder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamServer {
    /// Display name, emitted as a trailing comment.
    pub name: String,
    /// IP address of the upstream resolver.
    pub address: String,
    /// UDP/TCP port, 1-65535.
    pub port: u16,
    /// Disabled entries are omitted from the forward zone.
    pub enabled: bool,
}

impl UpstreamServer {
    /// Creates an enabled upstream on port 53.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port: 53,
            enabled: true,
        }
    }

    /// Overrides the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl Default for UpstreamServer {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// JSON-backed settings persistence.
///
/// Loading a missing file yields [`ResolverSettings::default`]; a present but
/// malformed file is an error rather than a silent reset.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store at the default settings path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SETTINGS_FILE),
        }
    }

    /// Creates a store at a custom path (useful for testing).
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the settings file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads persisted settings, falling back to defaults when the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] on read failure or
    /// [`ManagerError::MalformedSettings`] when the file cannot be parsed.
    pub fn load(&self) -> Result<ResolverSettings> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No settings file, using defaults");
            return Ok(ResolverSettings::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persists settings as pretty-printed JSON via atomic replace.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the parent directory cannot be created
    /// or the file cannot be written.
    pub fn save(&self, settings: &ResolverSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        util::write_atomic(&self.path, &json)?;
        tracing::info!(path = %self.path.display(), "Saved resolver settings");
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}
