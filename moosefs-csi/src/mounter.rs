//! Host mount-table reconciliation.
//!
//! The mounter is the only component that touches the host: `mount`/`umount`
//! change the mount table and `findmnt` inspects it. Nothing is cached
//! between calls; every answer is derived from the live table.

use std::path::Path;
use std::process::Output;

use moosefs_csi_shared::{DriverError, DriverResult};
use serde::Deserialize;
use tracing::debug;

use crate::runner::{CommandRunner, HostRunner};

const MOUNT_CMD: &str = "mount";
const UMOUNT_CMD: &str = "umount";
const FINDMNT_CMD: &str = "findmnt";

/// Propagation mode a mount must have to stay visible across bind-mount
/// namespaces.
const SHARED_PROPAGATION: &str = "shared";

/// Performs and inspects host mounts.
///
/// One production implementation backed by host commands plus in-memory
/// fakes in tests; the node service depends only on this contract.
pub trait Mounter: Send + Sync {
    /// Mount `source` at `target` with the given filesystem type and
    /// mount options. The target directory is created if missing.
    fn mount(
        &self,
        source: &str,
        target: &Path,
        fstype: &str,
        options: &[String],
    ) -> DriverResult<()>;

    /// Unmount whatever is mounted at `target`.
    fn unmount(&self, target: &Path) -> DriverResult<()>;

    /// Whether `target` is currently mounted.
    ///
    /// Returns `Ok(false)` when the mount table has no entry for `target`.
    /// Returns [`DriverError::PropagationNotShared`] when an entry was found
    /// but its propagation mode would hide the mount from bind-mount
    /// consumers; the target is mounted in that case, but misconfigured.
    fn is_mounted(&self, target: &Path) -> DriverResult<bool>;
}

#[derive(Debug, Deserialize)]
struct FindmntResponse {
    #[serde(default)]
    filesystems: Vec<FileSystem>,
}

#[derive(Debug, Deserialize)]
struct FileSystem {
    #[serde(default)]
    target: String,
    #[serde(default)]
    propagation: String,
    #[serde(default)]
    fstype: String,
    #[serde(default)]
    options: String,
}

/// Mounter backed by the host `mount`, `umount` and `findmnt` binaries.
pub struct HostMounter<R = HostRunner> {
    runner: R,
}

impl HostMounter {
    /// Create a mounter that invokes the real host utilities.
    pub fn new() -> Self {
        Self { runner: HostRunner }
    }
}

impl Default for HostMounter {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> HostMounter<R> {
    /// Create a mounter with a custom command runner.
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> Mounter for HostMounter<R> {
    fn mount(
        &self,
        source: &str,
        target: &Path,
        fstype: &str,
        options: &[String],
    ) -> DriverResult<()> {
        if source.is_empty() {
            return Err(DriverError::InvalidArgument(
                "source is not specified for mounting the volume".to_string(),
            ));
        }
        if target.as_os_str().is_empty() {
            return Err(DriverError::InvalidArgument(
                "destination path is not specified for mounting the volume".to_string(),
            ));
        }

        let mut args: Vec<String> = vec!["-t".to_string(), fstype.to_string()];
        if !options.is_empty() {
            args.push("-o".to_string());
            args.push(options.join(","));
        }
        args.push(source.to_string());
        args.push(target.display().to_string());

        // mkdir -p semantics: an existing target directory is not an error.
        std::fs::create_dir_all(target)?;

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.runner.run(MOUNT_CMD, &arg_refs)?;
        if !out.status.success() {
            return Err(DriverError::MountFailed {
                command: format!("{} {}", MOUNT_CMD, args.join(" ")),
                output: combined_output(&out),
            });
        }

        debug!(source, target = %target.display(), fstype, "mounted");
        Ok(())
    }

    fn unmount(&self, target: &Path) -> DriverResult<()> {
        if target.as_os_str().is_empty() {
            return Err(DriverError::InvalidArgument(
                "destination path is not specified for unmounting the volume".to_string(),
            ));
        }

        let target_str = target.display().to_string();
        let out = self.runner.run(UMOUNT_CMD, &[&target_str])?;
        if !out.status.success() {
            return Err(DriverError::UnmountFailed {
                command: format!("{} {}", UMOUNT_CMD, target_str),
                output: combined_output(&out),
            });
        }

        debug!(target = %target.display(), "unmounted");
        Ok(())
    }

    fn is_mounted(&self, target: &Path) -> DriverResult<bool> {
        if target.as_os_str().is_empty() {
            return Err(DriverError::InvalidArgument(
                "target is not specified for checking the mount".to_string(),
            ));
        }

        if !self.runner.lookup(FINDMNT_CMD) {
            return Err(DriverError::ToolUnavailable { tool: FINDMNT_CMD });
        }

        let target_str = target.display().to_string();
        let args = [
            "-o",
            "TARGET,PROPAGATION,FSTYPE,OPTIONS",
            "-M",
            &target_str,
            "-J",
        ];
        let out = self.runner.run(FINDMNT_CMD, &args)?;
        let combined = combined_output(&out);

        if !out.status.success() {
            // findmnt exits non-zero when it finds no mount for the target;
            // only non-empty output marks a real tool failure.
            if combined.trim().is_empty() {
                return Ok(false);
            }
            return Err(DriverError::ProbeFailed {
                command: format!("{} {}", FINDMNT_CMD, args.join(" ")),
                output: combined,
            });
        }

        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        if stdout.is_empty() {
            // No output means there is no mount.
            return Ok(false);
        }

        let resp: FindmntResponse =
            serde_json::from_str(&stdout).map_err(|source| DriverError::MalformedProbeOutput {
                output: stdout.clone(),
                source,
            })?;

        let mut target_found = false;
        for fs in &resp.filesystems {
            debug!(
                target = %fs.target,
                propagation = %fs.propagation,
                fstype = %fs.fstype,
                options = %fs.options,
                "mount table entry"
            );

            // Propagation must be shared, otherwise the mount is invisible
            // to bind-mount consumers in other mount namespaces.
            if fs.propagation != SHARED_PROPAGATION {
                return Err(DriverError::PropagationNotShared {
                    target: target.to_path_buf(),
                });
            }

            // The mountpoint itself has to match as well.
            if Path::new(&fs.target) == target {
                target_found = true;
            }
        }

        Ok(target_found)
    }
}

fn combined_output(out: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&out.stderr));
    combined
}
