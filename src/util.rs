//! Internal utilities.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix time in milliseconds.
///
/// Used to suffix backup file names. Clocks before the epoch yield `0`.
#[must_use]
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

/// Writes `contents` to `path` through a sibling temporary file and rename,
/// so no reader ever observes a partially-written file.
///
/// # Errors
///
/// Returns the underlying I/O error if the write or rename fails.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_millis_is_past_2020() {
        // 2020-01-01T00:00:00Z in milliseconds.
        assert!(unix_millis() > 1_577_836_800_000);
    }

    #[test]
    fn write_atomic_replaces_and_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.conf");

        write_atomic(&path, "first\n").unwrap();
        write_atomic(&path, "second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second\n");
        assert!(!dir.path().join("target.conf.tmp").exists());
    }
}
