//! Driver configuration assembled at startup.
//!
//! All values are fixed at construction; nothing here mutates after the
//! server starts.

use std::str::FromStr;

use moosefs_csi_shared::{DriverError, Endpoint};

/// Immutable configuration for one plugin process.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Endpoint the gRPC server listens on.
    pub endpoint: Endpoint,
    /// Unique node identifier reported through NodeGetInfo.
    pub node_id: String,
    /// Region advertised in the node's accessible-topology segment.
    pub region: String,
    /// Where the MooseFS master and chunk servers run.
    pub topology: Topology,
    /// Endpoint of an already provisioned MooseFS cluster, e.g.
    /// "192.168.75.201:" (the ':' suffix is part of the address).
    pub mfs_endpoint: Option<String>,
}

/// Cluster topology descriptor, parsed from `master:<loc>,chunk:<loc>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    pub master: String,
    pub chunk: String,
}

impl FromStr for Topology {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut master = None;
        let mut chunk = None;

        for entry in s.split(',') {
            let (key, value) = entry.split_once(':').ok_or_else(|| {
                DriverError::InvalidArgument(format!(
                    "invalid topology entry {entry:?}: expected key:value"
                ))
            })?;
            match key.trim() {
                "master" => master = Some(value.trim().to_string()),
                "chunk" => chunk = Some(value.trim().to_string()),
                other => {
                    return Err(DriverError::InvalidArgument(format!(
                        "unknown topology key {other:?}"
                    )))
                }
            }
        }

        Ok(Self {
            master: master.ok_or_else(|| {
                DriverError::InvalidArgument("topology is missing the master entry".to_string())
            })?,
            chunk: chunk.ok_or_else(|| {
                DriverError::InvalidArgument("topology is missing the chunk entry".to_string())
            })?,
        })
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "master:{},chunk:{}", self.master, self.chunk)
    }
}

/// Host name fallback for `--node-id` when the environment provides none.
pub fn default_node_id() -> String {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}
