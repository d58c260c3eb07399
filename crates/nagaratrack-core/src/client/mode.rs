//! Client mode selection
//!
//! Picks exactly one data-access strategy for the lifetime of the session.
//! The decision is a pure function of three environment signals and is made
//! once at startup; it is never re-evaluated, and a request failure later
//! does not flip the mode. Static is the fail-safe default.

use serde::{Deserialize, Serialize};

/// Hostname suffixes of static-hosting platforms where no backend exists
const STATIC_HOST_SUFFIXES: &[&str] =
    &[".github.io", ".netlify.app", ".vercel.app", ".pages.dev"];

/// Port the backend listens on when its configured hostname has to be
/// swapped for the page's own host
pub const BACKEND_FALLBACK_PORT: u16 = 8000;

/// Which data-access strategy the session runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    /// Bundled data only, mutated in memory; no network
    Static,
    /// Live REST backend via the configured base URL
    Dynamic,
}

/// Environment signals the selector consumes
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Explicit static-mode override
    pub static_override: bool,
    /// The page's own hostname
    pub hostname: String,
    /// Configured remote API base URL, if any
    pub api_base: Option<String>,
}

impl ClientConfig {
    /// Read the selector inputs from `NAGARATRACK_STATIC_MODE`,
    /// `NAGARATRACK_HOSTNAME`, and `NAGARATRACK_API_URL`
    pub fn from_env() -> Self {
        let static_override = std::env::var("NAGARATRACK_STATIC_MODE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let hostname = std::env::var("NAGARATRACK_HOSTNAME")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        let api_base = std::env::var("NAGARATRACK_API_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        ClientConfig {
            static_override,
            hostname,
            api_base,
        }
    }
}

/// Decide the client mode. First match wins:
///
/// 1. explicit override -> static
/// 2. recognized static-hosting domain -> static
/// 3. no API base configured -> static
/// 4. otherwise -> dynamic
pub fn select_mode(static_override: bool, hostname: &str, api_base: Option<&str>) -> ClientMode {
    if static_override {
        return ClientMode::Static;
    }
    let host = hostname.trim().to_ascii_lowercase();
    if STATIC_HOST_SUFFIXES.iter().any(|s| host.ends_with(s)) {
        return ClientMode::Static;
    }
    match api_base {
        Some(base) if !base.trim().is_empty() => ClientMode::Dynamic,
        _ => ClientMode::Static,
    }
}

/// Resolve the base URL for dynamic mode.
///
/// A configured host that is a bare single-label name (a Docker service
/// name like `backend`) is unreachable from the page, so the page's own
/// host is substituted with the fixed backend port. `localhost` and IP
/// addresses pass through untouched.
pub fn resolve_base_url(api_base: &str, hostname: &str) -> String {
    let trimmed = api_base.trim().trim_end_matches('/');
    let Ok(url) = reqwest::Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    let Some(host) = url.host_str() else {
        return trimmed.to_string();
    };
    let is_ip = host.parse::<std::net::IpAddr>().is_ok();
    let internal_only = !is_ip && !host.contains('.') && host != "localhost";
    if internal_only {
        format!("{}://{}:{}", url.scheme(), hostname, BACKEND_FALLBACK_PORT)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_override_wins() {
        let mode = select_mode(true, "example.com", Some("http://api.example.com"));
        assert_eq!(mode, ClientMode::Static);
    }

    #[test]
    fn test_static_hosting_domains() {
        for host in [
            "demo.github.io",
            "nagaratrack.netlify.app",
            "preview.vercel.app",
            "demo.pages.dev",
        ] {
            let mode = select_mode(false, host, Some("http://api.example.com"));
            assert_eq!(mode, ClientMode::Static, "host {host}");
        }
    }

    #[test]
    fn test_no_base_url_falls_back_to_static() {
        assert_eq!(select_mode(false, "example.com", None), ClientMode::Static);
        assert_eq!(select_mode(false, "example.com", Some("  ")), ClientMode::Static);
    }

    #[test]
    fn test_dynamic_when_base_configured() {
        let mode = select_mode(false, "example.com", Some("http://api.example.com"));
        assert_eq!(mode, ClientMode::Dynamic);
    }

    #[test]
    fn test_selection_is_pure() {
        for _ in 0..3 {
            assert_eq!(
                select_mode(false, "demo.example.com", Some("http://backend:8000")),
                ClientMode::Dynamic
            );
        }
    }

    #[test]
    fn test_internal_hostname_is_substituted() {
        let base = resolve_base_url("http://backend:8000", "demo.example.com");
        assert_eq!(base, "http://demo.example.com:8000");
    }

    #[test]
    fn test_reachable_hosts_pass_through() {
        assert_eq!(
            resolve_base_url("http://api.example.com/", "demo.example.com"),
            "http://api.example.com"
        );
        assert_eq!(
            resolve_base_url("http://localhost:8000", "demo.example.com"),
            "http://localhost:8000"
        );
        assert_eq!(
            resolve_base_url("http://127.0.0.1:8000", "demo.example.com"),
            "http://127.0.0.1:8000"
        );
    }
}
