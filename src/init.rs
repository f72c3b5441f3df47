use std::path::Path;

use inquire::validator::Validation;
use inquire::{Confirm, Select, Text};

use crate::config::NetworkMode;
use crate::error::BoxerError;
use crate::paths;
use crate::prompt::map_inquire_err;

// ── wizard state ─────────────────────────────────────────

struct WizardConfig {
    vboxmanage_path: String,
    template_dir: String,
    disk_name: String,
    os_type: String,
    cloud_init_iso: String,
    clone_root: String,
    network_mode: NetworkMode,
    bridge_adapter: String,
}

// ── public entry point ───────────────────────────────────

/// Write a starter config to `output_path`.
pub fn run(defaults: bool, output_path: &Path) -> Result<(), BoxerError> {
    if output_path.exists() {
        if defaults {
            return Err(BoxerError::Validation {
                message: format!(
                    "{} already exists (use interactive mode to overwrite)",
                    output_path.display()
                ),
            });
        }
        let overwrite = Confirm::new(&format!(
            "{} already exists. Overwrite?",
            output_path.display()
        ))
        .with_default(false)
        .prompt()
        .map_err(map_inquire_err)?;
        if !overwrite {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let config = if defaults {
        default_config()
    } else {
        run_wizard()?
    };

    let toml = generate_toml(&config);
    std::fs::write(output_path, &toml).map_err(|e| BoxerError::ConfigWrite {
        path: output_path.display().to_string(),
        source: e,
    })?;
    tracing::info!(path = %output_path.display(), "config written");

    println!("Created {}", output_path.display());
    if config.template_dir.is_empty() || config.cloud_init_iso.is_empty() {
        println!("Fill in [template] and [vm] before creating VMs.");
    }
    println!("Run `boxer` to open the menu.");
    Ok(())
}

// ── defaults ─────────────────────────────────────────────

fn default_config() -> WizardConfig {
    WizardConfig {
        vboxmanage_path: "VBoxManage".into(),
        template_dir: String::new(),
        disk_name: String::new(),
        os_type: "Debian_64".into(),
        cloud_init_iso: String::new(),
        clone_root: paths::default_clone_root().display().to_string(),
        network_mode: NetworkMode::Nat,
        bridge_adapter: String::new(),
    }
}

// ── wizard step navigation ───────────────────────────────

enum WizardStep {
    Hypervisor,
    Template,
    Clones,
    Network,
    Done,
}

impl WizardStep {
    fn next(&self) -> Self {
        match self {
            Self::Hypervisor => Self::Template,
            Self::Template => Self::Clones,
            Self::Clones => Self::Network,
            Self::Network | Self::Done => Self::Done,
        }
    }

    fn prev(&self) -> Self {
        match self {
            Self::Hypervisor | Self::Template => Self::Hypervisor,
            Self::Clones => Self::Template,
            Self::Network => Self::Clones,
            Self::Done => Self::Network,
        }
    }
}

// ── interactive wizard ───────────────────────────────────

fn run_wizard() -> Result<WizardConfig, BoxerError> {
    println!();
    let mut config = default_config();
    let mut step = WizardStep::Hypervisor;

    // Esc on a step goes back one step; on the first step it cancels.
    loop {
        let result = match step {
            WizardStep::Hypervisor => match prompt_vboxmanage(&config.vboxmanage_path) {
                Err(BoxerError::Cancelled) => return Err(BoxerError::Cancelled),
                other => other.map(|path| config.vboxmanage_path = path),
            },
            WizardStep::Template => prompt_template(&config).map(|(dir, disk, os, iso)| {
                config.template_dir = dir;
                config.disk_name = disk;
                config.os_type = os;
                config.cloud_init_iso = iso;
            }),
            WizardStep::Clones => {
                prompt_clone_root(&config.clone_root).map(|root| config.clone_root = root)
            }
            WizardStep::Network => prompt_network().map(|(mode, adapter)| {
                config.network_mode = mode;
                config.bridge_adapter = adapter;
            }),
            WizardStep::Done => break,
        };

        match result {
            Ok(()) => step = step.next(),
            Err(BoxerError::Cancelled) => step = step.prev(),
            Err(e) => return Err(e),
        }
    }

    Ok(config)
}

// ── wizard steps ─────────────────────────────────────────

fn not_empty(input: &str) -> Result<Validation, inquire::CustomUserError> {
    if input.trim().is_empty() {
        Ok(Validation::Invalid("Value cannot be empty".into()))
    } else {
        Ok(Validation::Valid)
    }
}

fn prompt_vboxmanage(current: &str) -> Result<String, BoxerError> {
    Text::new("VBoxManage executable:")
        .with_default(current)
        .with_help_message("Name on PATH or absolute path")
        .with_validator(not_empty)
        .prompt()
        .map_err(map_inquire_err)
}

fn prompt_template(config: &WizardConfig) -> Result<(String, String, String, String), BoxerError> {
    let dir = Text::new("Template VM directory:")
        .with_help_message("Directory copied for every new VM")
        .with_validator(|input: &str| {
            if input.trim().is_empty() || Path::new(input.trim()).is_dir() {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid("Directory not found".into()))
            }
        })
        .prompt()
        .map_err(map_inquire_err)?;

    let disk = Text::new("Disk image file name:")
        .with_help_message("e.g. 'debian.vdi', inside the template directory")
        .with_validator(|input: &str| {
            if input.contains(['/', '\\']) {
                Ok(Validation::Invalid("Enter a file name, not a path".into()))
            } else {
                Ok(Validation::Valid)
            }
        })
        .prompt()
        .map_err(map_inquire_err)?;

    let os_type = Text::new("Guest OS type:")
        .with_default(&config.os_type)
        .with_help_message("See `VBoxManage list ostypes`")
        .with_validator(not_empty)
        .prompt()
        .map_err(map_inquire_err)?;

    let iso = Text::new("Cloud-init ISO:")
        .with_help_message("Attached to every new VM as a DVD")
        .prompt()
        .map_err(map_inquire_err)?;

    Ok((
        dir.trim().to_string(),
        disk.trim().to_string(),
        os_type.trim().to_string(),
        iso.trim().to_string(),
    ))
}

fn prompt_clone_root(current: &str) -> Result<String, BoxerError> {
    Text::new("Clone directory:")
        .with_default(current)
        .with_help_message("Each VM is cloned into <clone directory>/<vm name>")
        .with_validator(not_empty)
        .prompt()
        .map_err(map_inquire_err)
        .map(|s| s.trim().to_string())
}

fn prompt_network() -> Result<(NetworkMode, String), BoxerError> {
    let mode = Select::new("Default network mode:", vec!["nat", "bridged"])
        .prompt()
        .map_err(map_inquire_err)?;

    if mode == "nat" {
        return Ok((NetworkMode::Nat, String::new()));
    }

    let adapter = Text::new("  Host adapter to bridge:")
        .with_help_message("e.g. 'eth0' or 'en0: Wi-Fi'")
        .with_validator(not_empty)
        .prompt()
        .map_err(map_inquire_err)?;
    Ok((NetworkMode::Bridged, adapter.trim().to_string()))
}

// ── TOML generation ──────────────────────────────────────

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn generate_toml(config: &WizardConfig) -> String {
    let mut out = String::new();

    out.push_str("[vboxmanage]\n");
    out.push_str(&format!("path = {}\n", quote(&config.vboxmanage_path)));
    out.push('\n');

    out.push_str("[template]\n");
    if config.template_dir.is_empty() {
        out.push_str("# dir = \"/vms/templates/debian\"\n");
    } else {
        out.push_str(&format!("dir = {}\n", quote(&config.template_dir)));
    }
    if config.disk_name.is_empty() {
        out.push_str("# disk_name = \"debian.vdi\"\n");
    } else {
        out.push_str(&format!("disk_name = {}\n", quote(&config.disk_name)));
    }
    out.push('\n');

    out.push_str("[clone]\n");
    out.push_str(&format!("root = {}\n", quote(&config.clone_root)));
    out.push('\n');

    out.push_str("[vm]\n");
    out.push_str(&format!("os_type = {}\n", quote(&config.os_type)));
    if config.cloud_init_iso.is_empty() {
        out.push_str("# cloud_init_iso = \"/vms/seed.iso\"\n");
    } else {
        out.push_str(&format!("cloud_init_iso = {}\n", quote(&config.cloud_init_iso)));
    }
    out.push('\n');

    out.push_str("[network]\n");
    out.push_str(&format!("default_mode = \"{}\"\n", config.network_mode));
    if config.bridge_adapter.is_empty() {
        out.push_str("# bridge_adapter = \"eth0\"\n");
    } else {
        out.push_str(&format!("bridge_adapter = {}\n", quote(&config.bridge_adapter)));
    }
    out.push('\n');

    // commented-out hints
    out.push_str("# [console]\n");
    out.push_str("# ip_wait_timeout_s = 60\n");
    out.push_str("# poll_interval_s = 5\n");
    out.push_str("#\n");
    out.push_str("# [logging]\n");
    out.push_str("# file = \"/tmp/boxer.log\"\n");

    out
}

// ── tests ────────────────────────────────────────────────
