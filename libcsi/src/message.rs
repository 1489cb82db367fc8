//! CSI protocol messages carried over the plugin socket.
//!
//! [`CsiMessage`] is the top-level envelope for all request and response
//! variants exchanged between the CSI client (kubelet side) and the CSI
//! server (this plugin).

use serde::{Deserialize, Serialize};

use crate::error::CsiError;
use crate::types::*;

/// Top-level message envelope.
///
/// Each connection carries exactly one request followed by one response.
/// The client sends a *request* variant and the server replies with the
/// corresponding *response* variant (or [`CsiMessage::Error`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CsiMessage {
    // ----- Requests --------------------------------------------------------
    /// Query plugin info (Identity).
    GetPluginInfo,
    /// Query plugin capabilities (Identity).
    GetPluginCapabilities,
    /// Health probe (Identity).
    Probe,

    /// Bind-mount a volume at a target path (Node).
    NodePublishVolume(NodePublishVolumeRequest),
    /// Remove a previously published volume (Node).
    NodeUnpublishVolume(NodeUnpublishVolumeRequest),
    /// Query node service capabilities (Node).
    NodeGetCapabilities,
    /// Query node info (Node).
    NodeGetInfo,
    /// Query the condition of a published volume (Node).
    NodeGetVolumeStats(NodeGetVolumeStatsRequest),

    // ----- Responses -------------------------------------------------------
    /// Plugin information.
    PluginInfoResponse(PluginInfo),
    /// Plugin capabilities.
    PluginCapabilitiesResponse(Vec<PluginCapability>),
    /// Node service capabilities.
    NodeCapabilitiesResponse(Vec<NodeCapability>),
    /// Node information.
    NodeInfoResponse(NodeInfo),
    /// Volume condition.
    VolumeStatsResponse(NodeGetVolumeStatsResponse),

    /// Generic success acknowledgement (no payload).
    Ok,
    /// An error occurred.
    Error(CsiError),
}

impl CsiMessage {
    /// Fully qualified CSI method name of a request variant, used as the
    /// `method` field when logging.  Response variants return `None`.
    pub fn method(&self) -> Option<&'static str> {
        let method = match self {
            Self::GetPluginInfo => "/csi.v1.Identity/GetPluginInfo",
            Self::GetPluginCapabilities => "/csi.v1.Identity/GetPluginCapabilities",
            Self::Probe => "/csi.v1.Identity/Probe",
            Self::NodePublishVolume(_) => "/csi.v1.Node/NodePublishVolume",
            Self::NodeUnpublishVolume(_) => "/csi.v1.Node/NodeUnpublishVolume",
            Self::NodeGetCapabilities => "/csi.v1.Node/NodeGetCapabilities",
            Self::NodeGetInfo => "/csi.v1.Node/NodeGetInfo",
            Self::NodeGetVolumeStats(_) => "/csi.v1.Node/NodeGetVolumeStats",
            _ => return None,
        };
        Some(method)
    }
}

impl std::fmt::Display for CsiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetPluginInfo => f.write_str("GetPluginInfo"),
            Self::GetPluginCapabilities => f.write_str("GetPluginCapabilities"),
            Self::Probe => f.write_str("Probe"),
            Self::NodePublishVolume(req) => write!(f, "NodePublishVolume({})", req.volume_id),
            Self::NodeUnpublishVolume(req) => {
                write!(f, "NodeUnpublishVolume({})", req.volume_id)
            }
            Self::NodeGetCapabilities => f.write_str("NodeGetCapabilities"),
            Self::NodeGetInfo => f.write_str("NodeGetInfo"),
            Self::NodeGetVolumeStats(req) => write!(f, "NodeGetVolumeStats({})", req.volume_id),
            Self::PluginInfoResponse(info) => write!(f, "PluginInfo(name={})", info.name),
            Self::PluginCapabilitiesResponse(caps) => {
                write!(f, "PluginCapabilities(count={})", caps.len())
            }
            Self::NodeCapabilitiesResponse(caps) => {
                write!(f, "NodeCapabilities(count={})", caps.len())
            }
            Self::NodeInfoResponse(info) => write!(f, "NodeInfo({})", info.node_id),
            Self::VolumeStatsResponse(stats) => write!(
                f,
                "VolumeStats(abnormal={})",
                stats.volume_condition.abnormal
            ),
            Self::Ok => f.write_str("Ok"),
            Self::Error(e) => write!(f, "Error({})", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serde_roundtrip() {
        let msg = CsiMessage::NodeUnpublishVolume(NodeUnpublishVolumeRequest {
            volume_id: VolumeId::from("v1"),
            target_path: "/mnt/v1".into(),
        });
        let json = serde_json::to_string(&msg).expect("serialize");
        let de: CsiMessage = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(de, msg);
    }

    #[test]
    fn unit_variants_encode_as_strings() {
        let json = serde_json::to_string(&CsiMessage::Probe).expect("serialize");
        assert_eq!(json, r#""Probe""#);
    }

    #[test]
    fn error_message_roundtrip() {
        let msg = CsiMessage::Error(CsiError::InvalidArgument("missing volume id".into()));
        let json = serde_json::to_string(&msg).expect("serialize");
        let de: CsiMessage = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(de, CsiMessage::Error(CsiError::InvalidArgument(_))));
    }

    #[test]
    fn only_requests_have_a_method() {
        assert_eq!(
            CsiMessage::NodeGetInfo.method(),
            Some("/csi.v1.Node/NodeGetInfo")
        );
        assert_eq!(CsiMessage::Ok.method(), None);
    }

    #[test]
    fn display_formatting() {
        assert_eq!(CsiMessage::Ok.to_string(), "Ok");
        assert_eq!(CsiMessage::Probe.to_string(), "Probe");
        let msg = CsiMessage::NodeGetVolumeStats(NodeGetVolumeStatsRequest {
            volume_id: VolumeId::from("v1"),
            volume_path: "/mnt/v1".into(),
        });
        assert_eq!(msg.to_string(), "NodeGetVolumeStats(v1)");
    }
}
