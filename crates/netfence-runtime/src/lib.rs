//! Backend layer for netfence.
//!
//! This crate talks to the outside world: a `CommandInvoker` that runs
//! external programs, the `FabricControl` facade over the `juju` CLI, the
//! MetalLB resource builders and the `kubectl`-backed `ResourceClient`,
//! prerequisite checks, and recording mocks used by the reconciler tests.

pub mod command;
pub mod fabric;
pub mod loadbalancer;
pub mod mock;
pub mod prereq;

pub use command::{CommandInvoker, SubprocessInvoker};
pub use fabric::{FabricControl, JujuFabric};
pub use loadbalancer::{
    KubectlClient, KubectlProvider, Resource, ResourceClient, ResourceClientProvider,
    ResourceKind,
};
pub use prereq::{check_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command '{command}' failed{}: {output}", exit_suffix(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },
    #[error("runtime execution failed: {0}")]
    ExecFailed(String),
    #[error("unexpected command output: {0}")]
    UnexpectedOutput(String),
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("resource API error: {0}")]
    Api(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn exit_suffix(status: &Option<i32>) -> String {
    status.map(|c| format!(" (exit {c})")).unwrap_or_default()
}
