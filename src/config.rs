// MIT License - Copyright (c) 2026 Peter Wright

use std::collections::HashMap;

/// Configuration for connecting to an Envisalink panel interface.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Panel interface host
    pub panel_host: String,
    /// Panel interface control port (default: 4025)
    pub panel_port: u16,
    /// Panel session password
    pub panel_password: String,
    /// Whether to run the downstream proxy server (default: false)
    pub proxy_enable: bool,
    /// Proxy listen host (default: 0.0.0.0)
    pub server_host: String,
    /// Proxy listen port (default: 4025)
    pub server_port: u16,
    /// Proxy session password; `None` falls back to the panel password
    pub server_password: Option<String>,
    /// Highest zone id tracked; updates beyond it are ignored
    pub max_zones: u16,
    /// Highest partition id tracked; updates beyond it are ignored
    pub max_partitions: u16,
    /// Emit discrete typed events rather than aggregate snapshots
    pub atomic_events: bool,
    /// Apply the first-ever update to an entity silently
    pub suppress_initial_update: bool,
    /// Zone id → display label
    pub zone_labels: HashMap<u16, String>,
    /// User id → display label
    pub user_labels: HashMap<u16, String>,
    /// Drop inbound frames whose checksum does not verify (default: false)
    pub verify_checksums: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            panel_host: "192.168.0.100".to_string(),
            panel_port: 4025,
            panel_password: "user".to_string(),
            proxy_enable: false,
            server_host: "0.0.0.0".to_string(),
            server_port: 4025,
            server_password: None,
            max_zones: 64,
            max_partitions: 8,
            atomic_events: true,
            suppress_initial_update: true,
            zone_labels: HashMap::new(),
            user_labels: HashMap::new(),
            verify_checksums: false,
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// The effective proxy password: configured value, or the panel password.
    pub fn effective_server_password(&self) -> &str {
        self.server_password
            .as_deref()
            .unwrap_or(&self.panel_password)
    }
}

/// Builder for BridgeConfig.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn panel_host(mut self, host: impl Into<String>) -> Self {
        self.config.panel_host = host.into();
        self
    }

    pub fn panel_port(mut self, port: u16) -> Self {
        self.config.panel_port = port;
        self
    }

    pub fn panel_password(mut self, password: impl Into<String>) -> Self {
        self.config.panel_password = password.into();
        self
    }

    pub fn proxy_enable(mut self, enable: bool) -> Self {
        self.config.proxy_enable = enable;
        self
    }

    pub fn server_host(mut self, host: impl Into<String>) -> Self {
        self.config.server_host = host.into();
        self
    }

    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    pub fn server_password(mut self, password: impl Into<String>) -> Self {
        self.config.server_password = Some(password.into());
        self
    }

    pub fn max_zones(mut self, max: u16) -> Self {
        self.config.max_zones = max;
        self
    }

    pub fn max_partitions(mut self, max: u16) -> Self {
        self.config.max_partitions = max;
        self
    }

    pub fn atomic_events(mut self, atomic: bool) -> Self {
        self.config.atomic_events = atomic;
        self
    }

    pub fn suppress_initial_update(mut self, suppress: bool) -> Self {
        self.config.suppress_initial_update = suppress;
        self
    }

    pub fn zone_label(mut self, id: u16, label: impl Into<String>) -> Self {
        self.config.zone_labels.insert(id, label.into());
        self
    }

    pub fn zone_labels(mut self, labels: HashMap<u16, String>) -> Self {
        self.config.zone_labels = labels;
        self
    }

    pub fn user_label(mut self, id: u16, label: impl Into<String>) -> Self {
        self.config.user_labels.insert(id, label.into());
        self
    }

    pub fn user_labels(mut self, labels: HashMap<u16, String>) -> Self {
        self.config.user_labels = labels;
        self
    }

    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.config.verify_checksums = verify;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.panel_port, 4025);
        assert_eq!(config.server_port, 4025);
        assert_eq!(config.server_host, "0.0.0.0");
        assert!(!config.proxy_enable);
        assert!(!config.verify_checksums);
    }

    #[test]
    fn test_server_password_falls_back_to_panel_password() {
        let config = BridgeConfig::builder().panel_password("1234").build();
        assert_eq!(config.effective_server_password(), "1234");

        let config = BridgeConfig::builder()
            .panel_password("1234")
            .server_password("abcd")
            .build();
        assert_eq!(config.effective_server_password(), "abcd");
    }

    #[test]
    fn test_builder() {
        let config = BridgeConfig::builder()
            .panel_host("10.0.0.5")
            .panel_port(4026)
            .proxy_enable(true)
            .max_zones(8)
            .max_partitions(2)
            .atomic_events(true)
            .suppress_initial_update(false)
            .zone_label(1, "Front Door")
            .user_label(4, "Alice")
            .build();

        assert_eq!(config.panel_host, "10.0.0.5");
        assert_eq!(config.panel_port, 4026);
        assert!(config.proxy_enable);
        assert_eq!(config.max_zones, 8);
        assert_eq!(config.zone_labels.get(&1).unwrap(), "Front Door");
        assert_eq!(config.user_labels.get(&4).unwrap(), "Alice");
    }
}
