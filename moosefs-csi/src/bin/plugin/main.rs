//! Entry point for the MooseFS CSI node plugin.

use clap::Parser;
use tracing::info;

use moosefs_csi::config::default_node_id;
use moosefs_csi::{Driver, DriverConfig, Topology};
use moosefs_csi_shared::{DriverResult, Endpoint};

/// MooseFS CSI plugin - node-side agent exposing MooseFS volumes as mounts
#[derive(Parser, Debug)]
#[command(author, version, about = "MooseFS CSI node plugin")]
struct PluginArgs {
    /// CSI endpoint, e.g. unix:///var/lib/kubelet/plugins/moosefs-csi-driver/csi.sock
    #[arg(
        long,
        default_value = "unix:///var/lib/kubelet/plugins/moosefs-csi-driver/csi.sock"
    )]
    endpoint: Endpoint,

    /// Unique node identifier reported to the orchestrator
    #[arg(long, env = "NODE_ID", default_value_t = default_node_id())]
    node_id: String,

    /// MooseFS cluster topology, e.g. master:AWS,chunk:AWS
    #[arg(long, default_value = "master:AWS,chunk:AWS")]
    topology: Topology,

    /// MooseFS endpoint of an already provisioned cluster,
    /// e.g. 192.168.75.201: (remember the ':' suffix)
    #[arg(long)]
    mfs_endpoint: Option<String>,

    /// AWS region advertised in the node topology segment
    #[arg(long, env = "AWS_REGION", default_value = "")]
    aws_region: String,
}

#[tokio::main]
async fn main() -> DriverResult<()> {
    // Respects RUST_LOG, defaults to info.
    tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = PluginArgs::parse();
    info!(
        endpoint = %args.endpoint,
        node_id = %args.node_id,
        topology = %args.topology,
        mfs_endpoint = ?args.mfs_endpoint,
        region = %args.aws_region,
        "starting MooseFS CSI node plugin"
    );

    let config = DriverConfig {
        endpoint: args.endpoint,
        node_id: args.node_id,
        region: args.aws_region,
        topology: args.topology,
        mfs_endpoint: args.mfs_endpoint,
    };

    Driver::new(config).run().await
}
