//! Ephemeral inline volume backend.
//!
//! [`EphemeralBackend`] implements [`CsiIdentity`] and [`CsiNode`] by
//! bind-mounting a single host directory (the NSM API socket directory) into
//! every accepted target path.  It keeps no per-volume state: each request is
//! served from its own fields plus the immutable [`DriverConfig`].
//!
//! The host-side mount is read-write while the kubelet mounts the volume
//! read-only into containers, so publish requires `readonly=true` yet refuses
//! a read-only access mode.
//!
//! Calls for the same target path are not serialized here; callers must
//! serialize lifecycle calls per volume.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::config::DriverConfig;
use crate::error::{ConfigError, CsiError};
use crate::identity::CsiIdentity;
use crate::mount::{Mounter, SystemMounter};
use crate::node::CsiNode;
use crate::types::*;
use crate::validate;

/// Mode of a freshly created target directory.
const TARGET_DIR_MODE: u32 = 0o750;

/// Why a published volume is considered unhealthy.
#[derive(Debug, Error)]
enum VolumeHealthError {
    #[error("failed to determine mount status of volume path: {0}")]
    MountStatus(#[source] io::Error),

    #[error("volume path is not mounted")]
    NotMounted,

    #[error("unable to list contents of volume path: {0}")]
    ListContents(#[source] io::Error),
}

/// CSI backend serving ephemeral inline volumes backed by one host directory.
pub struct EphemeralBackend {
    config: Arc<DriverConfig>,
    mounter: Arc<dyn Mounter>,
}

impl EphemeralBackend {
    /// Create a backend that performs mounts through `mounter`.
    pub fn new(config: DriverConfig, mounter: Arc<dyn Mounter>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            mounter,
        })
    }

    /// Create a backend that mounts through the host kernel.
    pub fn with_system_mounter(config: DriverConfig) -> Result<Self, ConfigError> {
        Self::new(config, Arc::new(SystemMounter))
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    async fn publish(&self, req: &NodePublishVolumeRequest) -> Result<(), CsiError> {
        validate::check_publish(req)?;

        let target = PathBuf::from(&req.target_path);
        let mut builder = tokio::fs::DirBuilder::new();
        builder.mode(TARGET_DIR_MODE);
        match builder.create(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("target path already exists");
            }
            Err(e) => {
                return Err(CsiError::Internal(format!(
                    "unable to create target path {:?}: {e}",
                    req.target_path
                )));
            }
        }

        let mounter = Arc::clone(&self.mounter);
        let source = self.config.socket_dir.clone();
        blocking(move || mounter.bind_mount(&source, &target))
            .await
            .map_err(|e| {
                CsiError::Internal(format!("unable to mount {:?}: {e}", req.target_path))
            })?;
        Ok(())
    }

    async fn unpublish(&self, req: &NodeUnpublishVolumeRequest) -> Result<(), CsiError> {
        validate::check_unpublish(req)?;

        let target = PathBuf::from(&req.target_path);
        let mounter = Arc::clone(&self.mounter);
        let unmount_target = target.clone();
        blocking(move || mounter.unmount(&unmount_target))
            .await
            .map_err(|e| {
                CsiError::Internal(format!("unable to unmount {:?}: {e}", req.target_path))
            })?;

        // Only an unmounted, empty directory may be removed.
        tokio::fs::remove_dir(&target).await.map_err(|e| {
            CsiError::Internal(format!(
                "unable to remove target path {:?}: {e}",
                req.target_path
            ))
        })?;
        Ok(())
    }

    /// A volume is healthy when its path is a mount point whose contents can
    /// be listed; listing fails if the bind mount has gone stale.
    async fn check_volume_mount(&self, volume_path: &Path) -> Result<(), VolumeHealthError> {
        let mounter = Arc::clone(&self.mounter);
        let path = volume_path.to_path_buf();
        let mounted = blocking(move || mounter.is_mount_point(&path))
            .await
            .map_err(VolumeHealthError::MountStatus)?;
        if !mounted {
            return Err(VolumeHealthError::NotMounted);
        }

        tokio::fs::read_dir(volume_path)
            .await
            .map(drop)
            .map_err(VolumeHealthError::ListContents)
    }
}

/// Run a blocking mount primitive on Tokio's blocking pool.
///
/// The closure runs to completion even if the awaiting task is dropped.
async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::from)?
}

// ---------------------------------------------------------------------------
// CsiIdentity
// ---------------------------------------------------------------------------

#[async_trait]
impl CsiIdentity for EphemeralBackend {
    async fn get_plugin_info(&self) -> Result<PluginInfo, CsiError> {
        Ok(PluginInfo {
            name: self.config.plugin_name.clone(),
            vendor_version: self.config.version.clone(),
        })
    }

    async fn probe(&self) -> Result<(), CsiError> {
        Ok(())
    }

    async fn get_plugin_capabilities(&self) -> Result<Vec<PluginCapability>, CsiError> {
        // Only the Node service is implemented.
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// CsiNode
// ---------------------------------------------------------------------------

#[async_trait]
impl CsiNode for EphemeralBackend {
    #[instrument(
        skip_all,
        fields(
            volume_id = %req.volume_id,
            target_path = %req.target_path,
            access_mode = ?req.volume_capability.as_ref().and_then(|c| c.access_mode),
        )
    )]
    async fn publish_volume(&self, req: NodePublishVolumeRequest) -> Result<(), CsiError> {
        match self.publish(&req).await {
            Ok(()) => {
                info!("volume published");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to publish volume");
                Err(e)
            }
        }
    }

    #[instrument(skip_all, fields(volume_id = %req.volume_id, target_path = %req.target_path))]
    async fn unpublish_volume(&self, req: NodeUnpublishVolumeRequest) -> Result<(), CsiError> {
        match self.unpublish(&req).await {
            Ok(()) => {
                info!("volume unpublished");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to unpublish volume");
                Err(e)
            }
        }
    }

    async fn get_capabilities(&self) -> Result<Vec<NodeCapability>, CsiError> {
        Ok(vec![
            NodeCapability::VolumeCondition,
            NodeCapability::GetVolumeStats,
        ])
    }

    async fn get_info(&self) -> Result<NodeInfo, CsiError> {
        Ok(NodeInfo {
            node_id: self.config.node_id.clone(),
            max_volumes_per_node: 0,
        })
    }

    #[instrument(skip_all, fields(volume_id = %req.volume_id, volume_path = %req.volume_path))]
    async fn get_volume_stats(
        &self,
        req: NodeGetVolumeStatsRequest,
    ) -> Result<NodeGetVolumeStatsResponse, CsiError> {
        let volume_condition = match self.check_volume_mount(Path::new(&req.volume_path)).await {
            Ok(()) => {
                info!("volume is healthy");
                VolumeCondition::healthy("mounted")
            }
            Err(e) => {
                error!(error = %e, "volume is unhealthy");
                VolumeCondition::abnormal(e.to_string())
            }
        };
        Ok(NodeGetVolumeStatsResponse { volume_condition })
    }
}
