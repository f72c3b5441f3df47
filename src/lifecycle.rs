//! VM lifecycle: create, start, stop, delete.
//!
//! Each operation is a fixed sequence of `VBoxManage` commands. Every command's
//! exit status is checked; the first failure stops the sequence.

use std::path::PathBuf;

use crate::config::{Config, NetworkMode};
use crate::error::BoxerError;
use crate::invoker::Invoker;
use crate::vm_state::{self, Operation, VmState};
use crate::{paths, provision};

const SATA_CONTROLLER: &str = "SATA Controller";
const IDE_CONTROLLER: &str = "IDE Controller";

/// Everything needed to register a new VM. Consumed by [`Lifecycle::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmCreateSpec {
    pub name: String,
    pub memory_mb: u32,
    pub cpus: u32,
    pub disk_path: PathBuf,
    pub cloud_init_iso: PathBuf,
    pub network: NetworkMode,
}

impl VmCreateSpec {
    pub fn validate(&self) -> Result<(), BoxerError> {
        validate_vm_name(&self.name)?;
        if self.memory_mb == 0 {
            return Err(BoxerError::Validation {
                message: "memory must be a positive number of MB".into(),
            });
        }
        if self.cpus == 0 {
            return Err(BoxerError::Validation {
                message: "cpus must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// VM names double as clone directory names.
pub fn validate_vm_name(name: &str) -> Result<(), BoxerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BoxerError::Validation {
            message: "VM name must not be empty".into(),
        });
    }
    if trimmed != name
        || name.contains(['/', '\\', '"'])
        || name == "."
        || name == ".."
    {
        return Err(BoxerError::Validation {
            message: format!("invalid VM name '{name}'"),
        });
    }
    Ok(())
}

/// What the user asks for when creating a VM from the configured template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVm {
    pub name: String,
    pub memory_mb: u32,
    pub cpus: u32,
    pub network: NetworkMode,
}

/// One command in the create sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStep {
    pub label: &'static str,
    pub args: Vec<String>,
}

fn step<const N: usize>(label: &'static str, parts: [&str; N]) -> CreateStep {
    CreateStep {
        label,
        args: parts.iter().map(|s| s.to_string()).collect(),
    }
}

/// The ordered command sequence that registers and configures `spec`.
pub fn create_steps(spec: &VmCreateSpec, os_type: &str, bridge_adapter: &str) -> Vec<CreateStep> {
    let vm = spec.name.as_str();
    let memory = spec.memory_mb.to_string();
    let cpus = spec.cpus.to_string();
    let disk = spec.disk_path.display().to_string();
    let iso = spec.cloud_init_iso.display().to_string();

    let network = match spec.network {
        NetworkMode::Bridged => step(
            "configure bridged networking",
            ["modifyvm", vm, "--nic1", "bridged", "--bridgeadapter1", bridge_adapter],
        ),
        NetworkMode::Nat => step("configure NAT networking", ["modifyvm", vm, "--nic1", "nat"]),
    };

    vec![
        step("register VM", ["createvm", "--name", vm, "--register"]),
        step(
            "set memory, CPUs and OS type",
            ["modifyvm", vm, "--memory", &memory, "--cpus", &cpus, "--ostype", os_type],
        ),
        step(
            "add SATA controller",
            ["storagectl", vm, "--name", SATA_CONTROLLER, "--add", "sata", "--controller", "IntelAhci"],
        ),
        step(
            "attach disk image",
            [
                "storageattach", vm, "--storagectl", SATA_CONTROLLER, "--port", "0", "--device",
                "0", "--type", "hdd", "--medium", &disk,
            ],
        ),
        step(
            "add IDE controller",
            ["storagectl", vm, "--name", IDE_CONTROLLER, "--add", "ide"],
        ),
        step(
            "attach cloud-init image",
            [
                "storageattach", vm, "--storagectl", IDE_CONTROLLER, "--port", "1", "--device",
                "0", "--type", "dvddrive", "--medium", &iso,
            ],
        ),
        network,
    ]
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Confirmation was not given; nothing was touched.
    Aborted,
}

/// Deletion proceeds only on an explicit `yes` (any case).
pub fn confirm_delete(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("yes")
}

/// Issues lifecycle commands for one VM at a time.
pub struct Lifecycle<'a, I> {
    invoker: &'a I,
    config: &'a Config,
}

impl<'a, I: Invoker> Lifecycle<'a, I> {
    pub fn new(invoker: &'a I, config: &'a Config) -> Self {
        Self { invoker, config }
    }

    /// Check that `op` is valid from the VM's current state.
    ///
    /// Returns the detected state, or `None` when VirtualBox's answer could
    /// not be interpreted (the caller proceeds and lets the command report).
    pub async fn check(&self, vm: &str, op: Operation) -> Result<Option<VmState>, BoxerError> {
        let Some(info) = vm_state::detect(self.invoker, vm).await? else {
            return Ok(None);
        };
        match info.state.transition(op) {
            Some(_) => Ok(Some(info.state)),
            None => Err(BoxerError::InvalidTransition {
                vm: vm.to_string(),
                operation: op.to_string(),
                state: info.state,
            }),
        }
    }

    /// Clone the template into `<clone root>/<name>` and register the VM.
    ///
    /// Returns the attached disk path. Nothing is registered when cloning
    /// fails.
    pub async fn create_from_template(&self, request: &NewVm) -> Result<PathBuf, BoxerError> {
        validate_vm_name(&request.name)?;
        let template = self.config.template_dir()?;
        let disk_name = self.config.disk_name()?;
        let cloud_init_iso = self.config.cloud_init_iso()?;

        self.check(&request.name, Operation::Create).await?;

        let dest = paths::clone_dir(&self.config.clone_root(), &request.name);
        let disk_path = provision::clone_template(self.invoker, &template, &dest, disk_name).await?;

        let spec = VmCreateSpec {
            name: request.name.clone(),
            memory_mb: request.memory_mb,
            cpus: request.cpus,
            disk_path: disk_path.clone(),
            cloud_init_iso,
            network: request.network,
        };
        match self.create(&spec).await {
            Ok(()) => Ok(disk_path),
            Err(BoxerError::CreateStepFailed {
                vm,
                step,
                completed,
                stderr,
                registered,
                recovery,
            }) => {
                let recovery = if registered {
                    format!("{recovery}, then remove {}", dest.display())
                } else {
                    // No registered VM references the clone yet.
                    match tokio::fs::remove_dir_all(&dest).await {
                        Ok(()) => {
                            tracing::info!(path = %dest.display(), "removed clone of unregistered VM");
                            format!("nothing was registered and {} was removed", dest.display())
                        }
                        Err(e) => {
                            tracing::warn!(path = %dest.display(), error = %e, "cannot remove clone");
                            format!("nothing was registered; remove {} before retrying", dest.display())
                        }
                    }
                };
                Err(BoxerError::CreateStepFailed {
                    vm,
                    step,
                    completed,
                    stderr,
                    registered,
                    recovery,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Unregistered → Stopped.
    pub async fn create(&self, spec: &VmCreateSpec) -> Result<(), BoxerError> {
        spec.validate()?;
        let adapter = self.config.network.bridge_adapter.trim();
        if spec.network == NetworkMode::Bridged && adapter.is_empty() {
            return Err(BoxerError::Validation {
                message: "bridged networking needs `network.bridge_adapter` in boxer.toml".into(),
            });
        }

        let steps = create_steps(spec, &self.config.vm.os_type, adapter);
        let mut completed: Vec<&str> = Vec::new();

        for step in &steps {
            tracing::debug!(vm = %spec.name, step = step.label, "create step");
            let output = self.invoker.invoke(&step.args).await?;
            if !output.success() {
                tracing::warn!(vm = %spec.name, step = step.label, "create step failed");
                let registered = !completed.is_empty();
                return Err(BoxerError::CreateStepFailed {
                    vm: spec.name.clone(),
                    step: step.label.to_string(),
                    completed: if registered {
                        completed.join(", ")
                    } else {
                        "none".to_string()
                    },
                    stderr: output.error_text(),
                    registered,
                    recovery: if registered {
                        format!("remove the partial VM with `boxer delete {}`", spec.name)
                    } else {
                        "nothing was registered".to_string()
                    },
                });
            }
            completed.push(step.label);
        }

        tracing::info!(vm = %spec.name, network = %spec.network, "VM created");
        Ok(())
    }

    /// Stopped → Running, headless.
    pub async fn start(&self, vm: &str) -> Result<(), BoxerError> {
        self.check(vm, Operation::Start).await?;
        self.start_headless(vm).await
    }

    /// `startvm <vm> --type headless` without a state check.
    pub(crate) async fn start_headless(&self, vm: &str) -> Result<(), BoxerError> {
        let args = vec![
            "startvm".to_string(),
            vm.to_string(),
            "--type".to_string(),
            "headless".to_string(),
        ];
        self.invoker.invoke(&args).await?.check(&args)?;
        tracing::info!(vm, "VM started headless");
        Ok(())
    }

    /// Running → Stopped. Hard power-off, not an ACPI shutdown.
    pub async fn stop(&self, vm: &str) -> Result<(), BoxerError> {
        self.check(vm, Operation::Stop).await?;
        self.power_off(vm).await
    }

    async fn power_off(&self, vm: &str) -> Result<(), BoxerError> {
        let args = vec!["controlvm".to_string(), vm.to_string(), "poweroff".to_string()];
        self.invoker.invoke(&args).await?.check(&args)?;
        tracing::info!(vm, "VM powered off");
        Ok(())
    }

    /// Any registered state → Deleted, gated on `confirmation`.
    ///
    /// Without confirmation no command is issued. A running VM is powered
    /// off before it is unregistered.
    pub async fn delete(&self, vm: &str, confirmation: &str) -> Result<DeleteOutcome, BoxerError> {
        if !confirm_delete(confirmation) {
            tracing::debug!(vm, "delete not confirmed");
            return Ok(DeleteOutcome::Aborted);
        }

        if self.check(vm, Operation::Delete).await? == Some(VmState::Running) {
            self.power_off(vm).await?;
        }

        let args = vec![
            "unregistervm".to_string(),
            vm.to_string(),
            "--delete".to_string(),
        ];
        self.invoker.invoke(&args).await?.check(&args)?;
        tracing::info!(vm, "VM deleted");
        Ok(DeleteOutcome::Deleted)
    }
}
