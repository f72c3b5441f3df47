use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use facet::Facet;

use crate::error::BoxerError;
use crate::paths;

#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct Config {
    #[facet(default)]
    pub vboxmanage: VBoxManageConfig,
    #[facet(default)]
    pub template: TemplateConfig,
    #[facet(default)]
    pub clone: CloneConfig,
    #[facet(default)]
    pub vm: VmConfig,
    #[facet(default)]
    pub network: NetworkConfig,
    #[facet(default)]
    pub console: ConsoleConfig,
    #[facet(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct VBoxManageConfig {
    #[facet(default = "VBoxManage")]
    pub path: String,
}

impl Default for VBoxManageConfig {
    fn default() -> Self {
        Self {
            path: "VBoxManage".into(),
        }
    }
}

/// The VM directory every new VM is cloned from.
#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct TemplateConfig {
    #[facet(default)]
    pub dir: String,
    /// Disk image file name inside `dir` (e.g. `debian.vdi`).
    #[facet(default)]
    pub disk_name: String,
}

#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct CloneConfig {
    /// Parent of per-VM clone directories. Empty means `~/VirtualBox VMs`.
    #[facet(default)]
    pub root: String,
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct VmConfig {
    #[facet(default = "Debian_64")]
    pub os_type: String,
    #[facet(default)]
    pub cloud_init_iso: String,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            os_type: "Debian_64".into(),
            cloud_init_iso: String::new(),
        }
    }
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct NetworkConfig {
    #[facet(default = "nat")]
    pub default_mode: String,
    /// Host adapter used for bridged networking.
    #[facet(default)]
    pub bridge_adapter: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_mode: "nat".into(),
            bridge_adapter: String::new(),
        }
    }
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct ConsoleConfig {
    #[facet(default = 60)]
    pub ip_wait_timeout_s: u64,
    #[facet(default = 5)]
    pub poll_interval_s: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            ip_wait_timeout_s: 60,
            poll_interval_s: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct LoggingConfig {
    /// Log file path. Empty means `~/.local/share/boxer/boxer.log`.
    #[facet(default)]
    pub file: String,
}

/// How the first NIC of a new VM is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NetworkMode {
    Nat,
    Bridged,
}

impl FromStr for NetworkMode {
    type Err = BoxerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nat" => Ok(NetworkMode::Nat),
            "bridged" => Ok(NetworkMode::Bridged),
            other => Err(BoxerError::Validation {
                message: format!("network mode must be 'nat' or 'bridged' (got '{other}')"),
            }),
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkMode::Nat => f.write_str("nat"),
            NetworkMode::Bridged => f.write_str("bridged"),
        }
    }
}

impl Config {
    pub fn default_network(&self) -> NetworkMode {
        self.network
            .default_mode
            .parse()
            .unwrap_or(NetworkMode::Nat)
    }

    pub fn template_dir(&self) -> Result<PathBuf, BoxerError> {
        require("template.dir", &self.template.dir).map(PathBuf::from)
    }

    pub fn disk_name(&self) -> Result<&str, BoxerError> {
        require("template.disk_name", &self.template.disk_name)
    }

    pub fn cloud_init_iso(&self) -> Result<PathBuf, BoxerError> {
        require("vm.cloud_init_iso", &self.vm.cloud_init_iso).map(PathBuf::from)
    }

    pub fn clone_root(&self) -> PathBuf {
        if self.clone.root.is_empty() {
            paths::default_clone_root()
        } else {
            PathBuf::from(&self.clone.root)
        }
    }

    pub fn log_file(&self) -> PathBuf {
        if self.logging.file.is_empty() {
            paths::default_log_path()
        } else {
            PathBuf::from(&self.logging.file)
        }
    }

    pub fn ip_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.console.ip_wait_timeout_s)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.console.poll_interval_s)
    }
}

fn require<'a>(key: &str, value: &'a str) -> Result<&'a str, BoxerError> {
    if value.trim().is_empty() {
        Err(BoxerError::Validation {
            message: format!("`{key}` is not set in {}", paths::CONFIG_FILE),
        })
    } else {
        Ok(value)
    }
}

// ── validation ────────────────────────────────────────────

fn validate_config(config: &Config) -> Result<(), BoxerError> {
    if config.vboxmanage.path.trim().is_empty() {
        return Err(BoxerError::Validation {
            message: "vboxmanage.path must not be empty".into(),
        });
    }

    let disk = &config.template.disk_name;
    if !disk.is_empty()
        && (disk.contains('/') || disk.contains('\\') || disk == "." || disk == "..")
    {
        return Err(BoxerError::Validation {
            message: format!("template.disk_name must be a file name, not a path (got '{disk}')"),
        });
    }

    let mode: NetworkMode = config.network.default_mode.parse()?;
    if mode == NetworkMode::Bridged && config.network.bridge_adapter.trim().is_empty() {
        return Err(BoxerError::Validation {
            message: "network.bridge_adapter is required when default_mode is 'bridged'".into(),
        });
    }

    if config.console.ip_wait_timeout_s > 0 && config.console.poll_interval_s == 0 {
        return Err(BoxerError::Validation {
            message: "console.poll_interval_s must be at least 1".into(),
        });
    }

    Ok(())
}

// ── public API ────────────────────────────────────────────

pub fn load_config(path: &Path) -> Result<Config, BoxerError> {
    let contents = std::fs::read_to_string(path).map_err(|source| BoxerError::ConfigLoad {
        path: path.display().to_string(),
        source,
    })?;

    parse_config(&contents, path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config, BoxerError> {
    let config: Config = facet_toml::from_str(contents).map_err(|e| BoxerError::ConfigParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Find and load the config.
///
/// An explicit path must exist. Otherwise `./boxer.toml`, then the user
/// config file, then built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(Config, Option<PathBuf>), BoxerError> {
    if let Some(path) = explicit {
        return Ok((load_config(path)?, Some(path.to_path_buf())));
    }

    for candidate in [PathBuf::from(paths::CONFIG_FILE), paths::user_config_path()] {
        if candidate.is_file() {
            let config = load_config(&candidate)?;
            return Ok((config, Some(candidate)));
        }
    }

    tracing::debug!("no config file found, using defaults");
    Ok((Config::default(), None))
}
