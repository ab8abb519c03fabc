//! CSI endpoint addressing.
//!
//! The orchestrator hands the plugin a listen address as a URI; kubelet
//! deployments use a unix socket under the plugin directory, while TCP is
//! kept for out-of-cluster debugging.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::DriverError;

/// Listen address for the plugin's gRPC server.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Endpoint {
    /// Unix socket endpoint
    Unix { socket_path: PathBuf },

    /// TCP endpoint
    Tcp { addr: SocketAddr },
}

impl Endpoint {
    /// Create a unix socket endpoint.
    pub fn unix(socket_path: PathBuf) -> Self {
        Self::Unix { socket_path }
    }

    /// Create a TCP endpoint.
    pub fn tcp(addr: SocketAddr) -> Self {
        Self::Tcp { addr }
    }

    /// Get the URI representation of this endpoint.
    pub fn to_uri(&self) -> String {
        match self {
            Endpoint::Unix { socket_path } => {
                format!("unix://{}", socket_path.display())
            }
            Endpoint::Tcp { addr } => format!("tcp://{}", addr),
        }
    }

    /// Parse an endpoint from a URI string.
    pub fn from_uri(uri: &str) -> Result<Self, DriverError> {
        if let Some(path) = uri.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(DriverError::InvalidEndpoint(format!(
                    "unix URI '{}' has an empty socket path",
                    uri
                )));
            }
            Ok(Self::unix(PathBuf::from(path)))
        } else if let Some(addr) = uri.strip_prefix("tcp://") {
            let addr = addr.parse::<SocketAddr>().map_err(|e| {
                DriverError::InvalidEndpoint(format!(
                    "invalid TCP address in '{}': {}",
                    uri, e
                ))
            })?;
            Ok(Self::tcp(addr))
        } else {
            Err(DriverError::InvalidEndpoint(format!(
                "invalid endpoint URI '{}': expected unix:// or tcp://",
                uri
            )))
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl std::str::FromStr for Endpoint {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}
