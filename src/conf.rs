//! Configuration synthesis.
//!
//! [`generate`] turns [`ResolverSettings`] into the text of an Unbound
//! `server:` configuration fragment. The output is a pure function of its
//! input: identical settings always produce byte-identical text, and the
//! sections appear in a fixed order so successive generations diff cleanly.

use crate::error::Result;
use crate::settings::ResolverSettings;

/// Marker line present in every generated file.
///
/// The generated file is owned by this crate and overwritten on every apply;
/// the marker is the only guard against hand edits.
pub const GENERATED_MARKER: &str = "# Generated by unbound-manager";

/// Synthesizes the resolver configuration for `settings`.
///
/// Returns `Ok(None)` when the resolver is disabled, signalling that there is
/// nothing to deploy and any previously generated file should be removed.
///
/// # Errors
///
/// Returns [`ManagerError::InvalidSettings`](crate::ManagerError::InvalidSettings)
/// when validation fails; no partial output is ever produced.
pub fn generate(settings: &ResolverSettings) -> Result<Option<String>> {
    if !settings.enabled {
        return Ok(None);
    }
    settings.validate()?;

    let mut out = String::new();

    out.push_str("# Unbound resolver configuration\n");
    out.push_str(GENERATED_MARKER);
    out.push('\n');
    out.push_str("# Do not edit manually; changes are overwritten on every apply\n");
    out.push('\n');

    out.push_str("server:\n");
    out.push_str("    # Network interface\n");
    out.push_str("    interface: 0.0.0.0\n");
    out.push_str("    port: 53\n");
    out.push('\n');
    out.push_str("    # Protocol support\n");
    out.push_str("    do-ip4: yes\n");
    out.push_str("    do-ip6: yes\n");
    out.push_str("    do-udp: yes\n");
    out.push_str("    do-tcp: yes\n");
    out.push('\n');

    out.push_str("    # Access control\n");
    out.push_str("    access-control: 0.0.0.0/0 refuse\n");
    for network in &settings.access.allowed_networks {
        if !network.enabled {
            continue;
        }
        out.push_str(&format!("    access-control: {} allow", network.network));
        if !network.description.is_empty() {
            out.push_str(&format!("    # {}", network.description));
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str("    # Performance tuning\n");
    out.push_str(&format!("    num-threads: {}\n", settings.performance.num_threads));
    out.push_str(&format!("    msg-cache-size: {}m\n", settings.cache_size.msg));
    out.push_str(&format!("    rrset-cache-size: {}m\n", settings.cache_size.rrset));
    out.push_str(&format!("    cache-min-ttl: {}\n", settings.cache_ttl.min));
    out.push_str(&format!("    cache-max-ttl: {}\n", settings.cache_ttl.max));
    out.push('\n');

    out.push_str("    # Privacy & security\n");
    out.push_str(&format!(
        "    hide-identity: {}\n",
        yes_no(settings.security.hide_identity)
    ));
    out.push_str(&format!(
        "    hide-version: {}\n",
        yes_no(settings.security.hide_version)
    ));
    out.push('\n');

    if settings.performance.prefetch {
        out.push_str("    # Prefetch\n");
        out.push_str("    prefetch: yes\n");
        if settings.performance.prefetch_key {
            out.push_str("    prefetch-key: yes\n");
        }
        out.push('\n');
    }

    out.push_str("    # Logging\n");
    out.push_str(&format!("    verbosity: {}\n", settings.logging.verbosity));
    out.push_str(&format!(
        "    log-queries: {}\n",
        yes_no(settings.logging.log_queries)
    ));
    out.push_str(&format!(
        "    log-replies: {}\n",
        yes_no(settings.logging.log_replies)
    ));
    out.push('\n');

    out.push_str("    # Statistics\n");
    out.push_str("    statistics-interval: 0\n");
    out.push_str("    extended-statistics: yes\n");
    out.push_str("    statistics-cumulative: yes\n");
    out.push('\n');

    out.push_str("    # Recursion control\n");
    out.push_str("    do-not-query-localhost: no\n");

    if settings.forwarding_active() {
        out.push('\n');
        out.push_str("# Forward all queries to upstream DNS\n");
        out.push_str("forward-zone:\n");
        out.push_str("    name: \".\"\n");
        for upstream in &settings.upstream_dns {
            if !upstream.enabled {
                continue;
            }
            out.push_str(&format!(
                "    forward-addr: {}@{}",
                upstream.address, upstream.port
            ));
            if !upstream.name.is_empty() {
                out.push_str(&format!("    # {}", upstream.name));
            }
            out.push('\n');
        }
        // Forwarder-only resolution: never fall back to recursing directly.
        out.push_str("    forward-first: no\n");
    }

    Ok(Some(out))
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AllowedNetwork, UpstreamServer};

    fn enabled_settings() -> ResolverSettings {
        let mut settings = ResolverSettings::default();
        settings.enabled = true;
        settings
    }

    #[test]
    fn disabled_yields_none() {
        assert_eq!(generate(&ResolverSettings::default()).unwrap(), None);
    }

    #[test]
    fn generation_is_deterministic() {
        let mut settings = enabled_settings();
        settings
            .access
            .allowed_networks
            .push(AllowedNetwork::new("192.168.1.0/24", "office"));
        settings.forwarding_enabled = true;
        settings.upstream_dns.push(UpstreamServer::new("Quad9", "9.9.9.9"));

        let first = generate(&settings).unwrap().unwrap();
        let second = generate(&settings).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn deny_rule_precedes_allow_rules_in_input_order() {
        let mut settings = enabled_settings();
        settings
            .access
            .allowed_networks
            .push(AllowedNetwork::new("10.0.0.0/8", "first"));
        settings
            .access
            .allowed_networks
            .push(AllowedNetwork::new("172.16.0.0/12", "second"));

        let text = generate(&settings).unwrap().unwrap();
        let deny = text.find("access-control: 0.0.0.0/0 refuse").unwrap();
        let first = text.find("access-control: 10.0.0.0/8 allow").unwrap();
        let second = text.find("access-control: 172.16.0.0/12 allow").unwrap();
        assert!(deny < first && first < second);
    }

    #[test]
    fn disabled_networks_are_omitted() {
        let mut settings = enabled_settings();
        let mut network = AllowedNetwork::new("10.9.8.0/24", "off");
        network.enabled = false;
        settings.access.allowed_networks.push(network);

        let text = generate(&settings).unwrap().unwrap();
        assert!(!text.contains("10.9.8.0/24"));
    }

    #[test]
    fn ttl_inversion_fails_before_output() {
        let mut settings = enabled_settings();
        settings.cache_ttl.min = 3600;
        settings.cache_ttl.max = 60;
        assert!(generate(&settings).is_err());
    }

    #[test]
    fn forward_zone_requires_an_enabled_upstream() {
        let mut settings = enabled_settings();
        settings.forwarding_enabled = true;
        let mut upstream = UpstreamServer::new("off", "8.8.8.8");
        upstream.enabled = false;
        settings.upstream_dns.push(upstream);

        let text = generate(&settings).unwrap().unwrap();
        assert!(!text.contains("forward-zone:"));
    }

    #[test]
    fn forward_zone_lists_enabled_upstreams_and_disables_forward_first() {
        let mut settings = enabled_settings();
        settings.forwarding_enabled = true;
        settings
            .upstream_dns
            .push(UpstreamServer::new("Cloudflare", "1.1.1.1"));
        settings
            .upstream_dns
            .push(UpstreamServer::new("Quad9", "9.9.9.9").with_port(8853));

        let text = generate(&settings).unwrap().unwrap();
        assert!(text.contains("forward-zone:"));
        assert!(text.contains("name: \".\""));
        assert!(text.contains("forward-addr: 1.1.1.1@53"));
        assert!(text.contains("forward-addr: 9.9.9.9@8853"));
        assert!(text.contains("forward-first: no"));
    }

    #[test]
    fn example_scenario_from_dashboard() {
        let mut settings = enabled_settings();
        settings.cache_size.msg = 50;
        settings.cache_size.rrset = 100;
        settings
            .access
            .allowed_networks
            .push(AllowedNetwork::new("10.0.0.0/8", ""));

        let text = generate(&settings).unwrap().unwrap();
        assert!(text.contains("msg-cache-size: 50m"));
        assert!(text.contains("rrset-cache-size: 100m"));
        assert!(text.contains("access-control: 10.0.0.0/8 allow"));
        assert!(!text.contains("forward-zone"));
    }

    #[test]
    fn prefetch_key_needs_prefetch() {
        let mut settings = enabled_settings();
        settings.performance.prefetch = false;
        settings.performance.prefetch_key = true;

        let text = generate(&settings).unwrap().unwrap();
        assert!(!text.contains("prefetch: yes"));
        assert!(!text.contains("prefetch-key: yes"));
    }

    #[test]
    fn marker_is_present() {
        let text = generate(&enabled_settings()).unwrap().unwrap();
        assert!(text.starts_with("# Unbound resolver configuration"));
        assert!(text.contains(GENERATED_MARKER));
    }
}
