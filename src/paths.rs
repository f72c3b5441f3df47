use std::path::{Path, PathBuf};

/// Config file name looked up in the working directory.
pub const CONFIG_FILE: &str = "boxer.toml";

/// User-level config file: `~/.config/boxer/boxer.toml`
pub fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("boxer")
        .join(CONFIG_FILE)
}

/// Default log file: `~/.local/share/boxer/boxer.log`
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("boxer")
        .join("boxer.log")
}

/// Where clones go when `clone.root` is unset: VirtualBox's own default folder.
pub fn default_clone_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("VirtualBox VMs")
}

/// Per-VM clone directory: `<root>/<vm name>`
pub fn clone_dir(root: &Path, vm: &str) -> PathBuf {
    root.join(vm)
}

/// Disk image inside a clone directory.
pub fn disk_path(clone_dir: &Path, disk_name: &str) -> PathBuf {
    clone_dir.join(disk_name)
}
