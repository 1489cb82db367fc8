//! Request validation for the Node service.
//!
//! Checks run in a fixed order and the first failing one is reported.  A
//! rejected request never touches the filesystem.

use thiserror::Error;

use crate::error::CsiError;
use crate::types::{
    AccessMode, AccessType, NodePublishVolumeRequest, NodeUnpublishVolumeRequest, VolumeCapability,
};

/// Why a request was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    #[error("missing volume id")]
    MissingVolumeId,
    #[error("missing target path")]
    MissingTargetPath,
    #[error("missing volume capability")]
    MissingCapability,
    #[error("missing access type")]
    MissingAccessType,
    #[error("access type must be a simple mount")]
    NotPlainMount,
    #[error("missing access mode")]
    MissingAccessMode,
    #[error("invalid access mode")]
    ReadOnlyAccessMode,
    #[error("pod volume must request readOnly=true")]
    NotReadOnly,
    #[error("only ephemeral volumes supported")]
    NotEphemeral,
}

impl From<Violation> for CsiError {
    fn from(v: Violation) -> Self {
        CsiError::InvalidArgument(v.to_string())
    }
}

/// Validate a publish request.
///
/// The host-side mount is always read-write, so a read-only access mode is
/// refused while the workload-facing `readonly` flag is mandatory.
pub fn check_publish(req: &NodePublishVolumeRequest) -> Result<(), Violation> {
    if req.volume_id.is_empty() {
        return Err(Violation::MissingVolumeId);
    }
    if req.target_path.is_empty() {
        return Err(Violation::MissingTargetPath);
    }
    let Some(capability) = &req.volume_capability else {
        return Err(Violation::MissingCapability);
    };
    if capability.access_type.is_none() {
        return Err(Violation::MissingAccessType);
    }
    if !is_plain_mount(capability) {
        return Err(Violation::NotPlainMount);
    }
    let Some(access_mode) = capability.access_mode else {
        return Err(Violation::MissingAccessMode);
    };
    if access_mode == AccessMode::SingleNodeReaderOnly {
        return Err(Violation::ReadOnlyAccessMode);
    }
    if !req.readonly {
        return Err(Violation::NotReadOnly);
    }
    if req.ephemeral_mode() != Some("true") {
        return Err(Violation::NotEphemeral);
    }
    Ok(())
}

/// Validate an unpublish request.
pub fn check_unpublish(req: &NodeUnpublishVolumeRequest) -> Result<(), Violation> {
    if req.volume_id.is_empty() {
        return Err(Violation::MissingVolumeId);
    }
    if req.target_path.is_empty() {
        return Err(Violation::MissingTargetPath);
    }
    Ok(())
}

fn is_plain_mount(capability: &VolumeCapability) -> bool {
    match &capability.access_type {
        Some(AccessType::Mount(m)) => m.fs_type.is_empty() && m.mount_flags.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::{EPHEMERAL_CONTEXT_KEY, MountVolume, VolumeId};

    fn valid_request() -> NodePublishVolumeRequest {
        NodePublishVolumeRequest {
            volume_id: VolumeId::from("v1"),
            target_path: "/mnt/v1".into(),
            volume_capability: Some(VolumeCapability::plain_mount(
                AccessMode::MultiNodeMultiWriter,
            )),
            readonly: true,
            volume_context: HashMap::from([(EPHEMERAL_CONTEXT_KEY.into(), "true".into())]),
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert_eq!(check_publish(&valid_request()), Ok(()));
    }

    #[test]
    fn accepts_every_writable_access_mode() {
        for mode in [
            AccessMode::Unknown,
            AccessMode::SingleNodeWriter,
            AccessMode::MultiNodeReaderOnly,
            AccessMode::MultiNodeSingleWriter,
            AccessMode::MultiNodeMultiWriter,
            AccessMode::SingleNodeSingleWriter,
            AccessMode::SingleNodeMultiWriter,
        ] {
            let mut req = valid_request();
            req.volume_capability = Some(VolumeCapability::plain_mount(mode));
            assert_eq!(check_publish(&req), Ok(()), "{mode:?}");
        }
    }

    #[test]
    fn violations_are_reported_in_order() {
        // Each case breaks exactly one rule and leaves the earlier ones intact.
        let cases: [(fn(&mut NodePublishVolumeRequest), Violation); 9] = [
            (|r| r.volume_id = VolumeId::default(), Violation::MissingVolumeId),
            (|r| r.target_path.clear(), Violation::MissingTargetPath),
            (|r| r.volume_capability = None, Violation::MissingCapability),
            (
                |r| {
                    if let Some(cap) = r.volume_capability.as_mut() {
                        cap.access_type = None;
                    }
                },
                Violation::MissingAccessType,
            ),
            (
                |r| {
                    if let Some(cap) = r.volume_capability.as_mut() {
                        cap.access_type = Some(AccessType::Block);
                    }
                },
                Violation::NotPlainMount,
            ),
            (
                |r| {
                    if let Some(cap) = r.volume_capability.as_mut() {
                        cap.access_mode = None;
                    }
                },
                Violation::MissingAccessMode,
            ),
            (
                |r| {
                    if let Some(cap) = r.volume_capability.as_mut() {
                        cap.access_mode = Some(AccessMode::SingleNodeReaderOnly);
                    }
                },
                Violation::ReadOnlyAccessMode,
            ),
            (|r| r.readonly = false, Violation::NotReadOnly),
            (
                |r| {
                    r.volume_context
                        .insert(EPHEMERAL_CONTEXT_KEY.into(), "false".into());
                },
                Violation::NotEphemeral,
            ),
        ];

        for (break_rule, expected) in cases {
            let mut req = valid_request();
            break_rule(&mut req);
            assert_eq!(check_publish(&req), Err(expected));
        }
    }

    #[test]
    fn first_violation_wins() {
        let req = NodePublishVolumeRequest {
            readonly: false,
            ..Default::default()
        };
        assert_eq!(check_publish(&req), Err(Violation::MissingVolumeId));

        let mut req = valid_request();
        req.readonly = false;
        req.volume_context.clear();
        assert_eq!(check_publish(&req), Err(Violation::NotReadOnly));
    }

    #[test]
    fn mount_with_fs_type_or_flags_is_not_plain() {
        let mut req = valid_request();
        req.volume_capability = Some(VolumeCapability {
            access_type: Some(AccessType::Mount(MountVolume {
                fs_type: "ext4".into(),
                mount_flags: Vec::new(),
            })),
            access_mode: Some(AccessMode::SingleNodeWriter),
        });
        assert_eq!(check_publish(&req), Err(Violation::NotPlainMount));

        req.volume_capability = Some(VolumeCapability {
            access_type: Some(AccessType::Mount(MountVolume {
                fs_type: String::new(),
                mount_flags: vec!["noatime".into()],
            })),
            access_mode: Some(AccessMode::SingleNodeWriter),
        });
        assert_eq!(check_publish(&req), Err(Violation::NotPlainMount));
    }

    #[test]
    fn ephemeral_flag_must_be_exactly_true() {
        for value in ["True", "TRUE", "1", " true", ""] {
            let mut req = valid_request();
            req.volume_context
                .insert(EPHEMERAL_CONTEXT_KEY.into(), value.into());
            assert_eq!(check_publish(&req), Err(Violation::NotEphemeral), "{value:?}");
        }
    }

    #[test]
    fn unpublish_requires_id_and_path() {
        let req = NodeUnpublishVolumeRequest::default();
        assert_eq!(check_unpublish(&req), Err(Violation::MissingVolumeId));

        let req = NodeUnpublishVolumeRequest {
            volume_id: VolumeId::from("v1"),
            target_path: String::new(),
        };
        assert_eq!(check_unpublish(&req), Err(Violation::MissingTargetPath));

        let req = NodeUnpublishVolumeRequest {
            volume_id: VolumeId::from("v1"),
            target_path: "/mnt/v1".into(),
        };
        assert_eq!(check_unpublish(&req), Ok(()));
    }

    #[test]
    fn violation_maps_to_invalid_argument() {
        let err: CsiError = Violation::NotEphemeral.into();
        assert_eq!(
            err,
            CsiError::InvalidArgument("only ephemeral volumes supported".into())
        );
    }
}
