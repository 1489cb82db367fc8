//! Driver identity and configuration.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default name the plugin registers under.
pub const DEFAULT_PLUGIN_NAME: &str = "csi.networkservicemesh.io";

/// Process-wide identity of the driver.
///
/// Built once at startup and shared read-only with every request handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Identifier of the node this plugin runs on.
    pub node_id: String,
    /// Name reported by `GetPluginInfo`.
    pub plugin_name: String,
    /// Version reported by `GetPluginInfo`.
    pub version: String,
    /// Host directory holding the NSM API socket; bind-mounted into every
    /// published target path.
    pub socket_dir: PathBuf,
}

impl DriverConfig {
    pub fn new(node_id: impl Into<String>, socket_dir: impl Into<PathBuf>) -> Self {
        Self {
            node_id: node_id.into(),
            plugin_name: DEFAULT_PLUGIN_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            socket_dir: socket_dir.into(),
        }
    }

    pub fn with_plugin_name(mut self, plugin_name: impl Into<String>) -> Self {
        self.plugin_name = plugin_name.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Reject configurations the driver cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(ConfigError::MissingNodeId);
        }
        if self.socket_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingSocketDir);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DriverConfig::new("node-1", "/nsm-socket-dir");
        assert_eq!(config.plugin_name, DEFAULT_PLUGIN_NAME);
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn missing_node_id() {
        let config = DriverConfig::new("", "/nsm-socket-dir");
        assert_eq!(config.validate(), Err(ConfigError::MissingNodeId));
    }

    #[test]
    fn missing_socket_dir() {
        let config = DriverConfig::new("node-1", "");
        assert_eq!(config.validate(), Err(ConfigError::MissingSocketDir));
    }
}
