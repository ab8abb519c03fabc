//! gRPC server bootstrap.

use std::sync::Arc;

use tokio_stream::wrappers::{TcpListenerStream, UnixListenerStream};
use tonic::transport::Server;
use tracing::info;

use moosefs_csi_shared::{DriverResult, Endpoint, NodeServer};

use crate::config::DriverConfig;
use crate::mounter::{HostMounter, Mounter};
use crate::node::NodeService;

/// MooseFS CSI node plugin.
pub struct Driver {
    config: DriverConfig,
    mounter: Arc<dyn Mounter>,
}

impl Driver {
    /// Create a driver backed by the host mount utilities.
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            mounter: Arc::new(HostMounter::new()),
        }
    }

    /// Serve the node service until the process is terminated.
    pub async fn run(self) -> DriverResult<()> {
        let endpoint = self.config.endpoint.clone();
        let node = NodeService::new(self.config, self.mounter);
        let router = Server::builder().add_service(NodeServer::new(node));

        match endpoint {
            Endpoint::Unix { socket_path } => {
                // Remove a stale socket left behind by a previous run.
                if socket_path.exists() {
                    std::fs::remove_file(&socket_path)?;
                }
                if let Some(parent) = socket_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let listener = tokio::net::UnixListener::bind(&socket_path)?;
                info!("listening on unix://{}", socket_path.display());

                router
                    .serve_with_incoming(UnixListenerStream::new(listener))
                    .await?;
            }
            Endpoint::Tcp { addr } => {
                let listener = tokio::net::TcpListener::bind(addr).await?;
                info!("listening on tcp://{addr}");

                router
                    .serve_with_incoming(TcpListenerStream::new(listener))
                    .await?;
            }
        }

        Ok(())
    }
}
