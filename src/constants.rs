//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden through the environment; see `EngineConfig::apply_env`.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "PathScope";

/// Marker used wherever a fact could not be determined
pub const UNKNOWN: &str = "unknown";

/// Pseudo-target under which link bandwidth samples are stored
pub const LINK_TARGET: &str = "link";

// ============================================
// Sampling defaults
// ============================================

/// Default rolling buffer capacity (samples per target/metric)
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Upper bound accepted for buffer capacity
pub const MAX_BUFFER_CAPACITY: usize = 10_000;

/// Default per-probe timeout (milliseconds)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_LATENCY_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_BANDWIDTH_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_PACKET_LOSS_INTERVAL_MS: u64 = 15_000;
pub const DEFAULT_JITTER_INTERVAL_MS: u64 = 8_000;
pub const DEFAULT_AGGREGATION_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_DNS_INTERVAL_MS: u64 = 300_000;

/// Latency probes per tick
pub const DEFAULT_LATENCY_PROBES: u32 = 5;
pub const DEFAULT_LATENCY_SPACING_MS: u64 = 100;

/// Packet loss batch size
pub const DEFAULT_PACKET_LOSS_PROBES: u32 = 10;

/// Jitter burst size and spacing
pub const DEFAULT_JITTER_PROBES: u32 = 10;
pub const DEFAULT_JITTER_SPACING_MS: u64 = 200;

/// Bandwidth payload sizes (bytes)
pub const DEFAULT_BANDWIDTH_PAYLOADS: &[u64] = &[100 * 1024, 500 * 1024, 1000 * 1024];

/// Consecutive failed ticks before a target is reported unreachable
pub const DEFAULT_UNREACHABLE_AFTER: u32 = 3;

// ============================================
// DNS defaults
// ============================================

pub const DEFAULT_DOMAIN: &str = "example.com";

pub const DEFAULT_DNS_QUERY_DELAY_MS: u64 = 100;

/// DoH JSON resolvers, first one is the primary
pub const DEFAULT_DOH_RESOLVERS: &[&str] = &[
    "https://dns.google/resolve",
    "https://cloudflare-dns.com/dns-query",
    "https://dns.quad9.net/dns-query",
];

/// Well-known root server addresses (a.root, b.root, c.root)
pub const ROOT_SERVERS: &[&str] = &["198.41.0.4", "199.9.14.201", "192.33.4.12"];

// ============================================
// Probe endpoints
// ============================================

pub const DEFAULT_PUBLIC_IP_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_BANDWIDTH_URL: &str = "https://speed.cloudflare.com/__down";

// ============================================
// Exporter
// ============================================

pub const DEFAULT_SERVER_PORT: u16 = 8087;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Read a string from the environment, ignoring empty values
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read and parse a value from the environment
pub fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|s| s.parse().ok())
}

/// Read a boolean flag ("false"/"0" disable, anything else enables)
pub fn env_flag(key: &str, default: bool) -> bool {
    env_string(key)
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(default)
}

/// Get exporter port from environment or use default
pub fn get_server_port() -> u16 {
    env_parse("PATHSCOPE_PORT").unwrap_or(DEFAULT_SERVER_PORT)
}

/// Check if the HTTP exporter is enabled
pub fn is_server_enabled() -> bool {
    env_flag("PATHSCOPE_SERVE", true)
}

/// Write a final snapshot export when the binary exits
pub fn is_export_on_exit() -> bool {
    env_flag("PATHSCOPE_EXPORT_ON_EXIT", false)
}

/// Get the public IP metadata endpoint
pub fn get_public_ip_url() -> String {
    env_string("PATHSCOPE_PUBLIC_IP_URL").unwrap_or_else(|| DEFAULT_PUBLIC_IP_URL.to_string())
}

/// Get the bandwidth payload endpoint
pub fn get_bandwidth_url() -> String {
    env_string("PATHSCOPE_BANDWIDTH_URL").unwrap_or_else(|| DEFAULT_BANDWIDTH_URL.to_string())
}
