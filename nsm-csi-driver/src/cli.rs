//! Command-line flags and their environment fallbacks.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use libcsi::DriverConfig;
use libcsi::config::DEFAULT_PLUGIN_NAME;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Provides the NSM API socket directory via ephemeral inline CSI volumes.
#[derive(Parser, Debug)]
#[command(name = "nsm-csi-driver", version)]
pub struct Args {
    /// Node ID reported to the container orchestrator.
    #[arg(long, env = "NSM_NODE_NAME", default_value = "")]
    pub node_name: String,

    /// Plugin name to register.
    #[arg(long, env = "NSM_PLUGIN_NAME", default_value = DEFAULT_PLUGIN_NAME)]
    pub plugin_name: String,

    /// Path to the NSM API socket directory.
    #[arg(long, env = "NSM_SOCKET_DIR")]
    pub nsm_socket_dir: Option<PathBuf>,

    /// Path to the CSI socket.
    #[arg(long, env = "NSM_CSI_SOCKET_PATH", default_value = "/nsm-csi/csi.sock")]
    pub csi_socket_path: PathBuf,

    /// Version reported by GetPluginInfo.
    #[arg(long, env = "NSM_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub driver_version: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    pub fn driver_config(&self) -> DriverConfig {
        // Missing values are rejected by `DriverConfig::validate`.
        DriverConfig::new(&self.node_name, self.nsm_socket_dir.clone().unwrap_or_default())
            .with_plugin_name(&self.plugin_name)
            .with_version(&self.driver_version)
    }
}
