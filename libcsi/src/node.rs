//! CSI Node service trait.
//!
//! The Node service runs on each worker node and handles the local filesystem
//! operations required to make a volume available to Pod containers:
//!
//! 1. **Publish**: bind-mount the volume source at the Pod's target path.
//! 2. **Unpublish**: remove the bind-mount and the target directory.
//! 3. **Volume stats**: report whether a published volume is still usable.

use async_trait::async_trait;

use crate::error::CsiError;
use crate::types::{
    NodeCapability, NodeGetVolumeStatsRequest, NodeGetVolumeStatsResponse, NodeInfo,
    NodePublishVolumeRequest, NodeUnpublishVolumeRequest,
};

/// Node service: local mount / unmount operations.
#[async_trait]
pub trait CsiNode: Send + Sync {
    /// Publish a volume at `req.target_path`.
    async fn publish_volume(&self, req: NodePublishVolumeRequest) -> Result<(), CsiError>;

    /// Unpublish a volume: unmount `req.target_path` and remove it.
    async fn unpublish_volume(&self, req: NodeUnpublishVolumeRequest) -> Result<(), CsiError>;

    /// Advertise the optional Node RPCs this plugin implements.
    async fn get_capabilities(&self) -> Result<Vec<NodeCapability>, CsiError>;

    /// Return information about the node on which this service is running.
    async fn get_info(&self) -> Result<NodeInfo, CsiError>;

    /// Report the condition of a published volume.
    ///
    /// An unhealthy volume is reported in the response, not as an error.
    async fn get_volume_stats(
        &self,
        req: NodeGetVolumeStatsRequest,
    ) -> Result<NodeGetVolumeStatsResponse, CsiError>;
}
