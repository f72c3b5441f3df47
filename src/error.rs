use miette::Diagnostic;
use thiserror::Error;

use crate::vm_state::VmState;

#[derive(Debug, Error, Diagnostic)]
pub enum BoxerError {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("failed to write config to {path}")]
    ConfigWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {program}")]
    #[diagnostic(help("set `vboxmanage.path` in boxer.toml to the VBoxManage executable"))]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("creating VM '{vm}' stopped at step '{step}': {stderr}")]
    #[diagnostic(help("completed steps: {completed}; {recovery}"))]
    CreateStepFailed {
        vm: String,
        step: String,
        completed: String,
        stderr: String,
        /// `createvm` succeeded, so VirtualBox knows the VM.
        registered: bool,
        recovery: String,
    },

    #[error("source directory not found at: {path}")]
    #[diagnostic(help("check `template.dir` in boxer.toml"))]
    SourceNotFound { path: String },

    #[error("destination directory already exists at: {path}")]
    DestinationExists { path: String },

    #[error("disk image not found at {path}; UUID change skipped")]
    #[diagnostic(help("check `template.disk_name` in boxer.toml"))]
    DiskImageMissing { path: String },

    #[error("cannot {operation} VM '{vm}': it is {state}")]
    InvalidTransition {
        vm: String,
        operation: String,
        state: VmState,
    },

    #[error("failed to retrieve IP address of '{vm}': {message}")]
    #[diagnostic(help("the guest additions must be running in the VM to report its address"))]
    GuestIpUnavailable { vm: String, message: String },

    #[error("prompt error: {message}")]
    Prompt { message: String },

    #[error("cancelled")]
    Cancelled,
}
