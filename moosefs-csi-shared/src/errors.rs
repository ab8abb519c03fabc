//! Error types shared by the driver library and the plugin binary.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type DriverResult<T> = Result<T, DriverError>;

/// Driver-wide error type.
///
/// No variant is retried internally; every failure propagates to the caller
/// unchanged in meaning. Mount and unmount failures carry the resolved
/// command line and its combined output verbatim so an operator can replay
/// the invocation by hand.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A required request field is missing or empty. Caller error, never
    /// retried; the message names the field.
    #[error("{0}")]
    InvalidArgument(String),

    /// The mount-table inspection utility is not installed on this host.
    #[error("{tool:?} executable not found in $PATH")]
    ToolUnavailable { tool: &'static str },

    /// The inspection utility produced output that does not parse as its
    /// JSON schema.
    #[error("could not unmarshal findmnt output {output:?}: {source}")]
    MalformedProbeOutput {
        output: String,
        #[source]
        source: serde_json::Error,
    },

    /// The inspection utility exited non-zero with output, which is a tool
    /// failure rather than the expected "no mount found" signal.
    #[error("checking mounted failed: cmd: {command:?} output: {output:?}")]
    ProbeFailed { command: String, output: String },

    /// A mount exists at the target but its propagation mode is not
    /// `shared`, so it will not be visible to bind-mount consumers in other
    /// mount namespaces. The target is mounted; the mount is misconfigured.
    #[error("mount propagation for target {target:?} is not enabled")]
    PropagationNotShared { target: PathBuf },

    /// The mount command exited non-zero.
    #[error("mounting failed: cmd: {command:?} output: {output:?}")]
    MountFailed { command: String, output: String },

    /// The unmount command exited non-zero.
    #[error("unmounting failed: cmd: {command:?} output: {output:?}")]
    UnmountFailed { command: String, output: String },

    /// An endpoint URI could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// I/O error from directory creation, socket handling or process spawn.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure from the gRPC server.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl From<DriverError> for tonic::Status {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::InvalidArgument(_) => {
                tonic::Status::invalid_argument(err.to_string())
            }
            _ => tonic::Status::internal(err.to_string()),
        }
    }
}
