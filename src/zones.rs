//! Local zone include files, their backups, and the main-config include
//! directive.
//!
//! Each zone lives in one `<name>.conf` file under the zones directory and
//! contains at least one `local-zone: "<name>" <type>` directive. The daemon
//! picks the files up through a wildcard include in its main configuration,
//! which [`ZoneDirectory::ensure_include_directive`] installs idempotently.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use regex::Regex;

use crate::error::{ManagerError, Result};
use crate::util;

/// Default zones directory.
pub const DEFAULT_ZONES_DIR: &str = "/etc/unbound/local.d";

/// Default main daemon configuration file.
pub const DEFAULT_MAIN_CONF: &str = "/etc/unbound/unbound.conf";

/// Backups retained by [`ZoneDirectory::cleanup_backups`] unless overridden.
pub const DEFAULT_BACKUP_KEEP: usize = 10;

/// Extension of zone include files and their backups.
const ZONE_EXT: &str = "conf";

/// Subdirectory holding zone file backups.
const BACKUP_SUBDIR: &str = "backups";

/// Marker comment written above the include directive.
const INCLUDE_MARKER: &str = "# unbound-manager local zones";

/// Single-purpose matcher for the one directive this crate extracts.
///
/// Grammar: `local-zone: "<name>" <type>`, first occurrence per file wins.
/// This is deliberately not a config-language parser.
fn zone_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"local-zone:\s+"([^"]+)"\s+(\w+)"#).expect("static zone directive pattern")
    })
}

/// One configured zone, as extracted from its include file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneEntry {
    /// Zone name as written in the directive.
    pub name: String,
    /// Local-zone type (`static`, `transparent`, ...).
    pub zone_type: String,
    /// The include file the directive was found in.
    pub file: PathBuf,
}

/// Manages the on-disk collection of per-zone include files.
///
/// # Example
///
/// ```rust,ignore
/// use unbound_manager::ZoneDirectory;
///
/// let zones = ZoneDirectory::new();
/// for zone in zones.list_zones()? {
///     println!("{} ({})", zone.name, zone.zone_type);
/// }
/// ```
pub struct ZoneDirectory {
    zones_dir: PathBuf,
    main_conf: PathBuf,
}

impl ZoneDirectory {
    /// Creates a manager for the default Unbound layout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zones_dir: PathBuf::from(DEFAULT_ZONES_DIR),
            main_conf: PathBuf::from(DEFAULT_MAIN_CONF),
        }
    }

    /// Creates a manager over custom paths (useful for testing).
    #[must_use]
    pub fn with_paths(zones_dir: impl Into<PathBuf>, main_conf: impl Into<PathBuf>) -> Self {
        Self {
            zones_dir: zones_dir.into(),
            main_conf: main_conf.into(),
        }
    }

    /// Returns the zones directory path.
    #[must_use]
    pub fn zones_dir(&self) -> &Path {
        &self.zones_dir
    }

    /// Scans the zones directory and extracts one zone per include file.
    ///
    /// Files without the directive are silently skipped, as are files that
    /// cannot be read. A missing directory is created first.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the directory cannot be created or
    /// listed.
    pub fn list_zones(&self) -> Result<Vec<ZoneEntry>> {
        if !self.zones_dir.exists() {
            std::fs::create_dir_all(&self.zones_dir)?;
        }

        let mut zones = Vec::new();
        for entry in std::fs::read_dir(&self.zones_dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != ZONE_EXT) {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&path) else {
                tracing::debug!(path = %path.display(), "Skipping unreadable zone file");
                continue;
            };
            if let Some(caps) = zone_directive().captures(&content) {
                zones.push(ZoneEntry {
                    name: caps[1].to_string(),
                    zone_type: caps[2].to_string(),
                    file: path,
                });
            }
        }
        Ok(zones)
    }

    /// Returns `true` if a zone with this exact name is configured.
    ///
    /// Fails open to `false` on any read error.
    #[must_use]
    pub fn zone_exists(&self, name: &str) -> bool {
        self.list_zones()
            .is_ok_and(|zones| zones.iter().any(|z| z.name == name))
    }

    /// Derives the include file path for a zone name.
    ///
    /// One trailing dot is stripped, so `"example.com."` and `"example.com"`
    /// resolve to the same file.
    #[must_use]
    pub fn zone_file_path(&self, name: &str) -> PathBuf {
        let stem = name.strip_suffix('.').unwrap_or(name);
        self.zones_dir.join(format!("{stem}.{ZONE_EXT}"))
    }

    /// Copies the zone's include file to a timestamped backup.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when the zone file does not exist,
    /// or [`ManagerError::Io`] on copy failure.
    pub fn backup_zone(&self, name: &str) -> Result<PathBuf> {
        let zone_file = self.zone_file_path(name);
        if !zone_file.exists() {
            return Err(ManagerError::NotFound {
                path: zone_file.display().to_string(),
            });
        }

        let backup_dir = self.backup_dir();
        std::fs::create_dir_all(&backup_dir)?;

        let stem = name.strip_suffix('.').unwrap_or(name);
        let backup = backup_dir.join(format!("{stem}.{}.{ZONE_EXT}", util::unix_millis()));
        std::fs::copy(&zone_file, &backup)?;

        tracing::info!(zone = %name, backup = %backup.display(), "Backed up zone file");
        Ok(backup)
    }

    /// Restores a zone's include file from a backup, overwriting the live
    /// file unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when the backup does not exist, or
    /// [`ManagerError::Io`] on copy failure.
    pub fn restore_zone(&self, backup: &Path, name: &str) -> Result<()> {
        if !backup.exists() {
            return Err(ManagerError::NotFound {
                path: backup.display().to_string(),
            });
        }

        let zone_file = self.zone_file_path(name);
        std::fs::copy(backup, &zone_file)?;

        tracing::info!(zone = %name, backup = %backup.display(), "Restored zone file");
        Ok(())
    }

    /// Deletes all but the `keep` most recently modified backups.
    ///
    /// Safe to call with no backups present: reports zero deletions.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the backup directory cannot be listed
    /// or a stale backup cannot be removed.
    pub fn cleanup_backups(&self, keep: usize) -> Result<usize> {
        let backup_dir = self.backup_dir();
        if !backup_dir.exists() {
            return Ok(0);
        }

        let mut backups: Vec<(PathBuf, SystemTime)> = Vec::new();
        for entry in std::fs::read_dir(&backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != ZONE_EXT) {
                continue;
            }
            backups.push((path, entry.metadata()?.modified()?));
        }

        // Newest first; everything past `keep` goes.
        backups.sort_by(|a, b| b.1.cmp(&a.1));

        let mut deleted = 0;
        for (path, _) in backups.into_iter().skip(keep) {
            std::fs::remove_file(&path)?;
            deleted += 1;
        }

        if deleted > 0 {
            tracing::info!(deleted, "Removed old zone backups");
        }
        Ok(deleted)
    }

    /// Ensures the main configuration includes the zones directory.
    ///
    /// Idempotent by exact-string match on the include line; every mutation
    /// is preceded by a timestamped full-file backup. A no-op makes no
    /// backup.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the main configuration cannot be read,
    /// backed up, or rewritten.
    pub fn ensure_include_directive(&self) -> Result<()> {
        let content = std::fs::read_to_string(&self.main_conf)?;
        let include = self.include_line();

        if content.contains(&include) {
            tracing::debug!(conf = %self.main_conf.display(), "Include directive already present");
            return Ok(());
        }

        self.backup_main_conf()?;
        let updated = format!("{}\n\n{INCLUDE_MARKER}\n{include}\n", content.trim_end());
        util::write_atomic(&self.main_conf, &updated)?;

        tracing::info!(conf = %self.main_conf.display(), "Added local zones include directive");
        Ok(())
    }

    /// Removes the include directive and its marker comment.
    ///
    /// Idempotent; a no-op makes no backup.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the main configuration cannot be read,
    /// backed up, or rewritten.
    pub fn remove_include_directive(&self) -> Result<()> {
        let content = std::fs::read_to_string(&self.main_conf)?;
        let include = self.include_line();

        if !content.contains(&include) && !content.contains(INCLUDE_MARKER) {
            tracing::debug!(conf = %self.main_conf.display(), "Include directive not present");
            return Ok(());
        }

        self.backup_main_conf()?;
        let kept: Vec<&str> = content
            .lines()
            .filter(|line| !line.contains(INCLUDE_MARKER) && !line.contains(&include))
            .collect();
        let updated = format!("{}\n", kept.join("\n").trim_end());
        util::write_atomic(&self.main_conf, &updated)?;

        tracing::info!(conf = %self.main_conf.display(), "Removed local zones include directive");
        Ok(())
    }

    fn include_line(&self) -> String {
        format!("include: \"{}/*.{ZONE_EXT}\"", self.zones_dir.display())
    }

    fn backup_dir(&self) -> PathBuf {
        self.zones_dir.join(BACKUP_SUBDIR)
    }

    fn backup_main_conf(&self) -> Result<PathBuf> {
        let mut backup = self.main_conf.as_os_str().to_owned();
        backup.push(format!(".backup.{}", util::unix_millis()));
        let backup = PathBuf::from(backup);

        std::fs::copy(&self.main_conf, &backup)?;
        tracing::info!(backup = %backup.display(), "Backed up main configuration");
        Ok(backup)
    }
}

impl Default for ZoneDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dirs() -> (tempfile::TempDir, ZoneDirectory) {
        let dir = tempfile::tempdir().unwrap();
        let main_conf = dir.path().join("unbound.conf");
        std::fs::write(&main_conf, "server:\n    verbosity: 1\n").unwrap();
        let zones = ZoneDirectory::with_paths(dir.path().join("local.d"), main_conf);
        (dir, zones)
    }

    fn write_zone(zones: &ZoneDirectory, name: &str, zone_type: &str) {
        std::fs::create_dir_all(zones.zones_dir()).unwrap();
        std::fs::write(
            zones.zone_file_path(name),
            format!(
                "local-zone: \"{name}\" {zone_type}\nlocal-data: \"{name} 3600 IN A 10.0.0.1\"\n"
            ),
        )
        .unwrap();
    }

    #[test]
    fn zone_file_path_strips_one_trailing_dot() {
        let (_dir, zones) = test_dirs();
        assert_eq!(
            zones.zone_file_path("example.com."),
            zones.zone_file_path("example.com")
        );
        assert!(
            zones
                .zone_file_path("example.com")
                .to_string_lossy()
                .ends_with("example.com.conf")
        );
    }

    #[test]
    fn list_extracts_first_directive_per_file() {
        let (_dir, zones) = test_dirs();
        write_zone(&zones, "example.com", "static");
        write_zone(&zones, "internal.lan", "transparent");

        // A file without the directive is skipped.
        std::fs::write(
            zones.zones_dir().join("junk.conf"),
            "# nothing to see here\n",
        )
        .unwrap();
        // Non-.conf files are ignored.
        std::fs::write(zones.zones_dir().join("notes.txt"), "local-zone: \"x\" static\n")
            .unwrap();

        let mut listed = zones.list_zones().unwrap();
        listed.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "example.com");
        assert_eq!(listed[0].zone_type, "static");
        assert_eq!(listed[1].name, "internal.lan");
        assert_eq!(listed[1].zone_type, "transparent");
    }

    #[test]
    fn list_creates_missing_directory() {
        let (_dir, zones) = test_dirs();
        assert!(zones.list_zones().unwrap().is_empty());
        assert!(zones.zones_dir().exists());
    }

    #[test]
    fn zone_exists_fails_open() {
        let (_dir, zones) = test_dirs();
        write_zone(&zones, "example.com", "static");

        assert!(zones.zone_exists("example.com"));
        assert!(!zones.zone_exists("missing.com"));

        let broken = ZoneDirectory::with_paths("/proc/nonexistent/zones", "/proc/nonexistent/conf");
        assert!(!broken.zone_exists("example.com"));
    }

    #[test]
    fn backup_missing_zone_is_not_found() {
        let (_dir, zones) = test_dirs();
        assert!(matches!(
            zones.backup_zone("missing.com"),
            Err(ManagerError::NotFound { .. })
        ));
    }

    #[test]
    fn backup_and_restore_roundtrip() {
        let (_dir, zones) = test_dirs();
        write_zone(&zones, "example.com", "static");

        let backup = zones.backup_zone("example.com").unwrap();
        assert!(backup.exists());
        assert!(backup.parent().unwrap().ends_with(BACKUP_SUBDIR));

        // Mutate the live file, then restore.
        std::fs::write(zones.zone_file_path("example.com"), "local-zone: \"example.com\" deny\n")
            .unwrap();
        zones.restore_zone(&backup, "example.com").unwrap();

        let content = std::fs::read_to_string(zones.zone_file_path("example.com")).unwrap();
        assert!(content.contains("local-zone: \"example.com\" static"));
    }

    #[test]
    fn restore_missing_backup_is_not_found() {
        let (dir, zones) = test_dirs();
        assert!(matches!(
            zones.restore_zone(&dir.path().join("nope.conf"), "example.com"),
            Err(ManagerError::NotFound { .. })
        ));
    }

    #[test]
    fn cleanup_keeps_newest_backups() {
        let (_dir, zones) = test_dirs();
        let backup_dir = zones.zones_dir().join(BACKUP_SUBDIR);
        std::fs::create_dir_all(&backup_dir).unwrap();

        // Five backups with strictly increasing mtimes.
        let now = std::time::SystemTime::now();
        for i in 0..5u64 {
            let path = backup_dir.join(format!("example.com.{i}.conf"));
            let file = std::fs::File::create(&path).unwrap();
            let mtime = now - std::time::Duration::from_secs(100 - i * 10);
            file.set_modified(mtime).unwrap();
        }

        assert_eq!(zones.cleanup_backups(2).unwrap(), 3);

        let mut remaining: Vec<String> = std::fs::read_dir(&backup_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining, vec!["example.com.3.conf", "example.com.4.conf"]);
    }

    #[test]
    fn cleanup_with_no_backups_reports_zero() {
        let (_dir, zones) = test_dirs();
        assert_eq!(zones.cleanup_backups(DEFAULT_BACKUP_KEEP).unwrap(), 0);
    }

    #[test]
    fn ensure_include_is_idempotent() {
        let (dir, zones) = test_dirs();
        zones.ensure_include_directive().unwrap();
        zones.ensure_include_directive().unwrap();

        let content = std::fs::read_to_string(dir.path().join("unbound.conf")).unwrap();
        assert_eq!(content.matches("include:").count(), 1);
        assert!(content.contains(INCLUDE_MARKER));

        // Exactly one backup: the second call was a no-op.
        let backups = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .contains(".backup.")
            })
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn remove_include_undoes_ensure() {
        let (dir, zones) = test_dirs();
        zones.ensure_include_directive().unwrap();
        zones.remove_include_directive().unwrap();

        let content = std::fs::read_to_string(dir.path().join("unbound.conf")).unwrap();
        assert!(!content.contains("include:"));
        assert!(!content.contains(INCLUDE_MARKER));
        assert!(content.contains("verbosity: 1"));

        // Removing again is a no-op.
        zones.remove_include_directive().unwrap();
    }
}
