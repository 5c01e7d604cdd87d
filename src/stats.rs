//! Parsing of daemon statistics and status output.
//!
//! `unbound-control stats_noreset` emits newline-delimited `key=value` pairs;
//! `unbound-control status` emits `key: value` lines. Both parsers are
//! tolerant by contract: empty input, junk lines, and missing keys all
//! produce zeroed results rather than errors, because the consumers are
//! read-only dashboard views.

use std::collections::BTreeMap;

use serde::Serialize;

/// Typed view over a statistics dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolverStats {
    /// `total.num.queries`.
    pub queries: u64,
    /// `total.num.cachehits`.
    pub cache_hits: u64,
    /// `total.num.cachemiss`.
    pub cache_misses: u64,
    /// `total.num.prefetch`.
    pub prefetches: u64,
    /// `total.recursion.time.avg`, in seconds.
    pub avg_recursion_secs: f64,
    /// `round(cache_hits / queries * 100)`, `0` when no queries were seen.
    pub cache_hit_rate: u8,
    /// Per-type query counters (`num.query.type.A` and friends).
    pub query_types: BTreeMap<String, u64>,
    /// Every parsed `key=value` pair, numeric or not, for detail views.
    pub raw: BTreeMap<String, String>,
}

/// Parses a `stats_noreset` dump.
///
/// Lines without `=` are skipped; non-numeric values survive in `raw` but do
/// not contribute to the typed counters.
#[must_use]
pub fn parse_stats(text: &str) -> ResolverStats {
    let mut raw = BTreeMap::new();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once('=') {
            raw.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let counter =
        |key: &str| -> u64 { raw.get(key).and_then(|v| v.parse().ok()).unwrap_or(0) };

    let queries = counter("total.num.queries");
    let cache_hits = counter("total.num.cachehits");

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let cache_hit_rate = if queries == 0 {
        0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let rate = (cache_hits as f64 / queries as f64) * 100.0;
        rate.round() as u8
    };

    let mut query_types = BTreeMap::new();
    for (key, value) in &raw {
        if let Some(qtype) = key.strip_prefix("num.query.type.") {
            if let Ok(count) = value.parse::<u64>() {
                query_types.insert(qtype.to_string(), count);
            }
        }
    }

    ResolverStats {
        queries,
        cache_hits,
        cache_misses: counter("total.num.cachemiss"),
        prefetches: counter("total.num.prefetch"),
        avg_recursion_secs: raw
            .get("total.recursion.time.avg")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0),
        cache_hit_rate,
        query_types,
        raw,
    }
}

/// Version and uptime extracted from a status dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaemonStatus {
    /// Daemon version string, e.g. `"1.17.1"`.
    pub version: Option<String>,
    /// Uptime in whole seconds.
    pub uptime_secs: Option<u64>,
}

/// Parses `unbound-control status` output.
#[must_use]
pub fn parse_status(text: &str) -> DaemonStatus {
    let mut status = DaemonStatus::default();
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("version:") {
            status.version = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("uptime:") {
            // Format is "uptime: <secs> seconds".
            status.uptime_secs = rest.split_whitespace().next().and_then(|v| v.parse().ok());
        }
    }
    status
}
