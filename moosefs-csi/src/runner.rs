//! External command execution.

use std::io;
use std::process::{Command, Output};

/// Runs host commands on behalf of the mounter.
///
/// Injectable so tests can simulate a missing tool, non-zero exits and
/// garbled output without touching the host mount table.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, waiting for it to exit and capturing its
    /// status and output.
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output>;

    /// Whether `program` resolves to an executable on this host.
    fn lookup(&self, program: &str) -> bool;
}

/// Production runner backed by `std::process::Command`.
///
/// Invocations block the calling thread until the child exits; there is no
/// timeout, so a hung mount command blocks its lifecycle operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostRunner;

impl CommandRunner for HostRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output> {
        Command::new(program).args(args).output()
    }

    fn lookup(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
