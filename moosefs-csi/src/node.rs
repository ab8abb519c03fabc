//! CSI node lifecycle service.
//!
//! Implements the stage → publish → unpublish → unstage protocol for
//! MooseFS volumes. The service keeps no per-volume state: every operation
//! probes the live host mount table and acts only when the observed state
//! differs from the requested one, which makes repeated calls converge.
//!
//! There is no locking across the probe-then-act sequence; the orchestrator
//! is expected to serialize calls per volume. Two racing calls for the same
//! path may both observe "not mounted" and both attempt the mount, the
//! second surfacing whatever the mount tool reports.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::info;

use moosefs_csi_shared::{
    node_service_capability, volume_capability, Node, NodeGetCapabilitiesRequest,
    NodeGetCapabilitiesResponse, NodeGetInfoRequest, NodeGetInfoResponse,
    NodeGetVolumeStatsRequest, NodeGetVolumeStatsResponse, NodePublishVolumeRequest,
    NodePublishVolumeResponse, NodeServiceCapability, NodeStageVolumeRequest,
    NodeStageVolumeResponse, NodeUnpublishVolumeRequest, NodeUnpublishVolumeResponse,
    NodeUnstageVolumeRequest, NodeUnstageVolumeResponse, Topology, VolumeCapability,
};

use crate::config::DriverConfig;
use crate::mounter::Mounter;

/// Filesystem type passed to mount(8) for every volume.
const FS_TYPE: &str = "moosefs";

/// Key of the volume-context entry carrying the MooseFS master address.
const ENDPOINT_CONTEXT_KEY: &str = "endpoint";

/// Topology key under which the region is advertised.
const TOPOLOGY_REGION_KEY: &str = "region";

/// Node-side lifecycle service.
pub struct NodeService {
    config: DriverConfig,
    mounter: Arc<dyn Mounter>,
}

impl NodeService {
    /// Create a node service over the given mounter.
    pub fn new(config: DriverConfig, mounter: Arc<dyn Mounter>) -> Self {
        Self { config, mounter }
    }
}

/// Capability-provided mount flags, empty when the capability carries a
/// block access type.
fn mount_flags(capability: &VolumeCapability) -> Vec<String> {
    match &capability.access_type {
        Some(volume_capability::AccessType::Mount(mount)) => mount.mount_flags.clone(),
        _ => Vec::new(),
    }
}

#[tonic::async_trait]
impl Node for NodeService {
    /// Mount the volume to a staging path on the node. Called before
    /// NodePublishVolume; the publish step later binds the staging path to
    /// the workload-visible target.
    async fn node_stage_volume(
        &self,
        request: Request<NodeStageVolumeRequest>,
    ) -> Result<Response<NodeStageVolumeResponse>, Status> {
        let req = request.into_inner();

        if req.volume_id.is_empty() {
            return Err(Status::invalid_argument(
                "NodeStageVolume Volume ID must be provided",
            ));
        }
        let endpoint = req
            .volume_context
            .get(ENDPOINT_CONTEXT_KEY)
            .cloned()
            .unwrap_or_default();
        if endpoint.is_empty() {
            return Err(Status::invalid_argument(
                "NodeStageVolume Endpoint must be provided",
            ));
        }
        if req.staging_target_path.is_empty() {
            return Err(Status::invalid_argument(
                "NodeStageVolume Staging Target Path must be provided",
            ));
        }
        let capability = req.volume_capability.as_ref().ok_or_else(|| {
            Status::invalid_argument("NodeStageVolume Volume Capability must be provided")
        })?;

        let source = endpoint.as_str();
        let target = Path::new(&req.staging_target_path);
        let options = mount_flags(capability);

        info!(
            volume_id = %req.volume_id,
            endpoint = %endpoint,
            staging_target_path = %req.staging_target_path,
            fs_type = FS_TYPE,
            mount_options = ?options,
            method = "node_stage_volume",
            "mounting the volume for staging"
        );

        if self.mounter.is_mounted(target)? {
            info!(
                staging_target_path = %req.staging_target_path,
                "source is already mounted to the staging path"
            );
        } else {
            self.mounter.mount(source, target, FS_TYPE, &options)?;
        }

        Ok(Response::new(NodeStageVolumeResponse {}))
    }

    /// Unmount the volume from the staging path. A no-op when the path is
    /// already unmounted.
    async fn node_unstage_volume(
        &self,
        request: Request<NodeUnstageVolumeRequest>,
    ) -> Result<Response<NodeUnstageVolumeResponse>, Status> {
        let req = request.into_inner();

        if req.volume_id.is_empty() {
            return Err(Status::invalid_argument(
                "NodeUnstageVolume Volume ID must be provided",
            ));
        }
        if req.staging_target_path.is_empty() {
            return Err(Status::invalid_argument(
                "NodeUnstageVolume Staging Target Path must be provided",
            ));
        }

        info!(
            volume_id = %req.volume_id,
            staging_target_path = %req.staging_target_path,
            method = "node_unstage_volume",
            "node unstage volume called"
        );

        let target = Path::new(&req.staging_target_path);
        if self.mounter.is_mounted(target)? {
            self.mounter.unmount(target)?;
        } else {
            info!(
                staging_target_path = %req.staging_target_path,
                "staging target path is already unmounted"
            );
        }

        Ok(Response::new(NodeUnstageVolumeResponse {}))
    }

    /// Bind-mount the staged volume to the workload target path.
    async fn node_publish_volume(
        &self,
        request: Request<NodePublishVolumeRequest>,
    ) -> Result<Response<NodePublishVolumeResponse>, Status> {
        let req = request.into_inner();

        if req.volume_id.is_empty() {
            return Err(Status::invalid_argument(
                "NodePublishVolume Volume ID must be provided",
            ));
        }
        let endpoint = req
            .volume_context
            .get(ENDPOINT_CONTEXT_KEY)
            .cloned()
            .unwrap_or_default();
        if endpoint.is_empty() {
            return Err(Status::invalid_argument(
                "NodePublishVolume Endpoint must be provided",
            ));
        }
        if req.staging_target_path.is_empty() {
            return Err(Status::invalid_argument(
                "NodePublishVolume Staging Target Path must be provided",
            ));
        }
        if req.target_path.is_empty() {
            return Err(Status::invalid_argument(
                "NodePublishVolume Target Path must be provided",
            ));
        }
        let capability = req.volume_capability.as_ref().ok_or_else(|| {
            Status::invalid_argument("NodePublishVolume Volume Capability must be provided")
        })?;

        let source = req.staging_target_path.as_str();
        let target = Path::new(&req.target_path);

        // Capability flags first, then bind, then ro: the executor joins
        // these in order into the -o option list.
        let mut options = mount_flags(capability);
        options.push("bind".to_string());
        if req.readonly {
            options.push("ro".to_string());
        }

        info!(
            volume_id = %req.volume_id,
            endpoint = %endpoint,
            source = %source,
            target = %req.target_path,
            fs_type = FS_TYPE,
            mount_options = ?options,
            method = "node_publish_volume",
            "node publish volume called"
        );

        // The bind mount is verified at its own target; the staging path
        // being mounted says nothing about the publish target.
        if self.mounter.is_mounted(target)? {
            info!(target = %req.target_path, "volume is already mounted");
        } else {
            self.mounter.mount(source, target, FS_TYPE, &options)?;
        }

        Ok(Response::new(NodePublishVolumeResponse {}))
    }

    /// Unmount the bind mount from the target path. A no-op when the path
    /// is already unmounted.
    async fn node_unpublish_volume(
        &self,
        request: Request<NodeUnpublishVolumeRequest>,
    ) -> Result<Response<NodeUnpublishVolumeResponse>, Status> {
        let req = request.into_inner();

        if req.volume_id.is_empty() {
            return Err(Status::invalid_argument(
                "NodeUnpublishVolume Volume ID must be provided",
            ));
        }
        if req.target_path.is_empty() {
            return Err(Status::invalid_argument(
                "NodeUnpublishVolume Target Path must be provided",
            ));
        }

        info!(
            volume_id = %req.volume_id,
            target_path = %req.target_path,
            method = "node_unpublish_volume",
            "node unpublish volume called"
        );

        let target = Path::new(&req.target_path);
        if self.mounter.is_mounted(target)? {
            self.mounter.unmount(target)?;
        } else {
            info!(target_path = %req.target_path, "target path is already unmounted");
        }

        Ok(Response::new(NodeUnpublishVolumeResponse {}))
    }

    /// Volume statistics are not collected by this driver.
    async fn node_get_volume_stats(
        &self,
        _request: Request<NodeGetVolumeStatsRequest>,
    ) -> Result<Response<NodeGetVolumeStatsResponse>, Status> {
        Ok(Response::new(NodeGetVolumeStatsResponse::default()))
    }

    /// Advertise the stage/unstage two-phase protocol. Constant output.
    async fn node_get_capabilities(
        &self,
        _request: Request<NodeGetCapabilitiesRequest>,
    ) -> Result<Response<NodeGetCapabilitiesResponse>, Status> {
        let stage_unstage = NodeServiceCapability {
            r#type: Some(node_service_capability::Type::Rpc(
                node_service_capability::Rpc {
                    r#type: node_service_capability::rpc::Type::StageUnstageVolume as i32,
                },
            )),
        };

        info!(method = "node_get_capabilities", "node get capabilities called");
        Ok(Response::new(NodeGetCapabilitiesResponse {
            capabilities: vec![stage_unstage],
        }))
    }

    /// Report the node identity and its topology segment so the
    /// orchestrator knows where volumes published here are reachable.
    async fn node_get_info(
        &self,
        _request: Request<NodeGetInfoRequest>,
    ) -> Result<Response<NodeGetInfoResponse>, Status> {
        info!(method = "node_get_info", "node get info called");
        Ok(Response::new(NodeGetInfoResponse {
            node_id: self.config.node_id.clone(),
            max_volumes_per_node: 0,
            accessible_topology: Some(Topology {
                segments: HashMap::from([(
                    TOPOLOGY_REGION_KEY.to_string(),
                    self.config.region.clone(),
                )]),
            }),
        }))
    }
}
