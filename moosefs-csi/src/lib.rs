//! MooseFS CSI node plugin.
//!
//! Exposes MooseFS volumes as locally mounted paths through the CSI
//! stage/publish lifecycle. Mount state is derived fresh from the host
//! mount table on every call, so repeated operations converge to the same
//! mounted or unmounted state without duplicating mounts.

pub mod config;
pub mod mounter;
pub mod node;
pub mod runner;
pub mod server;

pub use config::{DriverConfig, Topology};
pub use mounter::{HostMounter, Mounter};
pub use node::NodeService;
pub use server::Driver;
