//! Exporter configuration

use crate::constants;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Exporter port (`PATHSCOPE_PORT`)
    pub port: u16,

    /// Serve the HTTP exporter at all (`PATHSCOPE_SERVE`)
    pub enabled: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: constants::get_server_port(),
            enabled: constants::is_server_enabled(),
        }
    }
}
