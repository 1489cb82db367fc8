//! Core CSI types: volume capabilities, node requests, and plugin metadata.
//!
//! These types form the data model shared by the CSI traits, the transport
//! layer, and the driver.  They are all [`Serialize`]/[`Deserialize`] so they
//! can be carried over the plugin socket as JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Volume context key set by the kubelet for inline ephemeral volumes.
pub const EPHEMERAL_CONTEXT_KEY: &str = "csi.storage.k8s.io/ephemeral";

// ---------------------------------------------------------------------------
// Volume identity
// ---------------------------------------------------------------------------

/// Opaque identifier for a volume, assigned by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VolumeId(pub String);

impl VolumeId {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Access mode & capabilities
// ---------------------------------------------------------------------------

/// Describes how a volume may be accessed, following the CSI enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessMode {
    Unknown,
    /// Can be published once as read/write on a single node.
    SingleNodeWriter,
    /// Can be published as read-only on a single node.
    SingleNodeReaderOnly,
    /// Can be published as read-only on multiple nodes.
    MultiNodeReaderOnly,
    /// Can be published on multiple nodes, only one of them writable.
    MultiNodeSingleWriter,
    /// Can be published as read/write on multiple nodes.
    MultiNodeMultiWriter,
    /// Can be published as read/write by a single workload on a single node.
    SingleNodeSingleWriter,
    /// Can be published as read/write by many workloads on a single node.
    SingleNodeMultiWriter,
}

/// Filesystem-mount access type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MountVolume {
    /// Requested filesystem type; empty means "plugin default".
    #[serde(default)]
    pub fs_type: String,
    /// Additional mount flags (e.g. `"noatime"`).
    #[serde(default)]
    pub mount_flags: Vec<String>,
}

/// The shape in which a volume is exposed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessType {
    /// Raw block device.
    Block,
    /// Mounted filesystem.
    Mount(MountVolume),
}

/// Describes the capabilities required from a volume.
///
/// Both halves are optional on the wire so that a missing field can be
/// rejected with a precise reason rather than a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeCapability {
    #[serde(default)]
    pub access_type: Option<AccessType>,
    #[serde(default)]
    pub access_mode: Option<AccessMode>,
}

impl VolumeCapability {
    /// A plain filesystem mount with no fs type and no flags.
    pub fn plain_mount(access_mode: AccessMode) -> Self {
        Self {
            access_type: Some(AccessType::Mount(MountVolume::default())),
            access_mode: Some(access_mode),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request to publish (bind-mount) a volume at a workload target path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodePublishVolumeRequest {
    /// Volume to publish.
    #[serde(default)]
    pub volume_id: VolumeId,
    /// Where the mount must land,
    /// e.g. `/var/lib/kubelet/pods/<pod-uid>/volumes/kubernetes.io~csi/<name>/mount`.
    #[serde(default)]
    pub target_path: String,
    /// Requested capability.
    #[serde(default)]
    pub volume_capability: Option<VolumeCapability>,
    /// Whether the workload sees the volume read-only.
    #[serde(default)]
    pub readonly: bool,
    /// Opaque context supplied by the kubelet.
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
}

impl NodePublishVolumeRequest {
    /// The value of the kubelet's ephemeral marker, if present.
    pub fn ephemeral_mode(&self) -> Option<&str> {
        self.volume_context
            .get(EPHEMERAL_CONTEXT_KEY)
            .map(String::as_str)
    }
}

/// Request to remove a previously published volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeUnpublishVolumeRequest {
    #[serde(default)]
    pub volume_id: VolumeId,
    #[serde(default)]
    pub target_path: String,
}

/// Request for the health of a published volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeGetVolumeStatsRequest {
    #[serde(default)]
    pub volume_id: VolumeId,
    /// The path the volume was published at.
    #[serde(default)]
    pub volume_path: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Health of a published volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeCondition {
    pub abnormal: bool,
    pub message: String,
}

impl VolumeCondition {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            abnormal: false,
            message: message.into(),
        }
    }

    pub fn abnormal(message: impl Into<String>) -> Self {
        Self {
            abnormal: true,
            message: message.into(),
        }
    }
}

/// Result of a volume stats query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeGetVolumeStatsResponse {
    pub volume_condition: VolumeCondition,
}

// ---------------------------------------------------------------------------
// Plugin & node info
// ---------------------------------------------------------------------------

/// Information about the CSI plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginInfo {
    /// Plugin name, e.g. `"csi.networkservicemesh.io"`.
    pub name: String,
    /// Vendor-provided version string.
    pub vendor_version: String,
}

/// Plugin-level capabilities defined by CSI.
///
/// This plugin only runs the Node service and advertises none of these, so
/// `GetPluginCapabilities` answers with an empty list. The variants stay so
/// that [`CsiClient`](crate::CsiClient) can decode the answer of a plugin
/// that does advertise them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PluginCapability {
    /// Plugin provides a Controller service.
    ControllerService,
    /// Plugin supports volume topology constraints.
    VolumeAccessibilityConstraints,
}

/// RPCs supported by the Node service beyond the mandatory ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeCapability {
    /// `NodeGetVolumeStats` reports a [`VolumeCondition`].
    VolumeCondition,
    /// `NodeGetVolumeStats` is implemented.
    GetVolumeStats,
}

/// Information about the node on which the CSI Node service runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeInfo {
    /// Unique node identifier.
    pub node_id: String,
    /// Maximum number of volumes the node can host; `0` means unbounded.
    pub max_volumes_per_node: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_id_display() {
        let id = VolumeId("vol-abc".into());
        assert_eq!(id.to_string(), "vol-abc");
        assert!(!id.is_empty());
        assert!(VolumeId::default().is_empty());
    }

    #[test]
    fn ephemeral_mode_reads_kubelet_context() {
        let mut req = NodePublishVolumeRequest::default();
        assert_eq!(req.ephemeral_mode(), None);

        req.volume_context
            .insert(EPHEMERAL_CONTEXT_KEY.into(), "true".into());
        assert_eq!(req.ephemeral_mode(), Some("true"));
    }

    #[test]
    fn publish_request_missing_fields_decode_as_defaults() {
        let json = r#"{"volume_id":"v1","target_path":"/mnt/v1"}"#;
        let req: NodePublishVolumeRequest = serde_json::from_str(json).expect("deserialize");
        assert_eq!(req.volume_id, VolumeId::from("v1"));
        assert!(req.volume_capability.is_none());
        assert!(!req.readonly);
        assert!(req.volume_context.is_empty());
    }

    #[test]
    fn requests_without_ids_or_paths_decode_as_empty() {
        let publish: NodePublishVolumeRequest =
            serde_json::from_str(r#"{"target_path":"/mnt/v1","readonly":true}"#).unwrap();
        assert!(publish.volume_id.is_empty());
        assert_eq!(publish.target_path, "/mnt/v1");

        let unpublish: NodeUnpublishVolumeRequest =
            serde_json::from_str(r#"{"volume_id":"v1"}"#).unwrap();
        assert_eq!(unpublish.volume_id, VolumeId::from("v1"));
        assert!(unpublish.target_path.is_empty());

        let stats: NodeGetVolumeStatsRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(stats, NodeGetVolumeStatsRequest::default());
    }

    #[test]
    fn plugin_capabilities_decode_from_peer() {
        let caps: Vec<PluginCapability> =
            serde_json::from_str(r#"["ControllerService","VolumeAccessibilityConstraints"]"#)
                .unwrap();
        assert_eq!(
            caps,
            vec![
                PluginCapability::ControllerService,
                PluginCapability::VolumeAccessibilityConstraints
            ]
        );
    }

    #[test]
    fn plain_mount_capability() {
        let cap = VolumeCapability::plain_mount(AccessMode::MultiNodeReaderOnly);
        assert_eq!(
            cap.access_type,
            Some(AccessType::Mount(MountVolume {
                fs_type: String::new(),
                mount_flags: Vec::new(),
            }))
        );
        assert_eq!(cap.access_mode, Some(AccessMode::MultiNodeReaderOnly));
    }
}
