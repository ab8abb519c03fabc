//! Shared protocol layer for the MooseFS CSI driver.
//!
//! This crate contains the generated CSI protobuf types, the endpoint
//! addressing used by both the plugin binary and clients, and the common
//! error type.

pub mod endpoint;
pub mod errors;

// Generated protobuf types
pub mod generated {
    #![allow(clippy::all, unused_qualifications)]
    tonic::include_proto!("csi.v1");
}

pub use endpoint::Endpoint;
pub use errors::{DriverError, DriverResult};

// Node service
pub use generated::node_client::NodeClient;
pub use generated::node_server::{Node, NodeServer};

// All generated types
pub use generated::*;
