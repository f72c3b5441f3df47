//! Shared vocabulary for VM lifecycle state.
//!
//! VirtualBox owns the registry; `VmState` is reconstructed from
//! `showvminfo --machinereadable` each time an operation needs it and never
//! cached across menu iterations.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::BoxerError;
use crate::invoker::Invoker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    /// Not known to VirtualBox.
    Unregistered,
    /// Registered, powered off (also aborted).
    Stopped,
    /// Registered with its state saved to disk. Settings are locked until
    /// the VM is started again.
    Saved,
    /// Registered and running (also paused or in transition).
    Running,
    /// Unregistered with its files removed. Terminal.
    Deleted,
}

/// Lifecycle operations that move a VM between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Start,
    Stop,
    Delete,
}

impl VmState {
    /// State reached by applying `op`, or `None` when `op` is not valid here.
    pub fn transition(self, op: Operation) -> Option<VmState> {
        match (self, op) {
            (VmState::Unregistered, Operation::Create) => Some(VmState::Stopped),
            (VmState::Stopped | VmState::Saved, Operation::Start) => Some(VmState::Running),
            (VmState::Running, Operation::Stop) => Some(VmState::Stopped),
            (VmState::Stopped | VmState::Saved | VmState::Running, Operation::Delete) => {
                Some(VmState::Deleted)
            }
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, VmState::Deleted)
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VmState::Unregistered => "not registered",
            VmState::Stopped => "stopped",
            VmState::Saved => "saved",
            VmState::Running => "running",
            VmState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Parse `key=value` lines from `showvminfo --machinereadable`.
///
/// Quoted values are unquoted; keys may be quoted too (`"SATA Controller-0-0"=...`).
pub fn parse_machine_readable(stdout: &str) -> BTreeMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((unquote(key.trim()), unquote(value.trim())))
        })
        .collect()
}

fn unquote(s: &str) -> String {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
        .to_string()
}

/// Map a `VMState` value onto the lifecycle vocabulary.
pub fn state_from_vbox(value: &str) -> Option<VmState> {
    match value {
        "poweroff" | "aborted" => Some(VmState::Stopped),
        "saved" => Some(VmState::Saved),
        "running" | "paused" | "starting" | "stopping" | "saving" | "restoring"
        | "gurumeditation" | "stuck" => Some(VmState::Running),
        _ => None,
    }
}

/// Everything boxer reads from `showvminfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmInfo {
    pub state: VmState,
    pub vrde_port: Option<u16>,
}

/// Query VirtualBox for the VM's current state.
///
/// Returns `Ok(None)` when the output cannot be interpreted; callers then
/// issue their command anyway and let VirtualBox report the problem.
pub async fn detect<I: Invoker>(invoker: &I, vm: &str) -> Result<Option<VmInfo>, BoxerError> {
    let args = vec![
        "showvminfo".to_string(),
        vm.to_string(),
        "--machinereadable".to_string(),
    ];
    let output = invoker.invoke(&args).await?;

    if !output.success() {
        if output.stderr.contains("Could not find a registered machine") {
            return Ok(Some(VmInfo {
                state: VmState::Unregistered,
                vrde_port: None,
            }));
        }
        tracing::debug!(vm, stderr = %output.error_text(), "showvminfo failed");
        return Ok(None);
    }

    let fields = parse_machine_readable(&output.stdout);
    let Some(state) = fields.get("VMState").and_then(|v| state_from_vbox(v)) else {
        return Ok(None);
    };
    let vrde_port = fields
        .get("vrdeport")
        .and_then(|p| p.parse::<u16>().ok())
        .filter(|p| *p != 0);

    tracing::debug!(vm, %state, "detected VM state");
    Ok(Some(VmInfo { state, vrde_port }))
}
