use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::NetworkMode;

#[derive(Parser, Debug)]
#[command(name = "boxer", version, about = "Menu-driven VirtualBox VM manager")]
pub struct Cli {
    /// Path to config file (default: ./boxer.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive menu (default)
    Menu,

    /// List registered VMs
    List,

    /// Clone the template and register a new VM
    Create {
        /// VM name, also used as the clone directory name
        #[arg(long)]
        name: String,

        /// Memory in MB, or with a suffix (e.g. 4G)
        #[arg(long, value_parser = parse_memory)]
        memory: u32,

        /// Number of virtual CPUs
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        cpus: u32,

        /// Network mode for the first NIC (default from config)
        #[arg(long, value_enum)]
        network: Option<NetworkMode>,

        /// Register the VM without starting it
        #[arg(long)]
        no_start: bool,
    },

    /// Start a VM headless
    Start {
        /// VM name
        vm: String,
    },

    /// Power off a running VM
    Stop {
        /// VM name
        vm: String,
    },

    /// Unregister a VM and delete its files
    Delete {
        /// VM name
        vm: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Enable VRDE, start the VM if needed, and print its address
    Console {
        /// VM name
        vm: String,
    },

    /// Create a boxer.toml in the current directory
    Init {
        /// Write defaults without prompting
        #[arg(long)]
        defaults: bool,
    },
}

fn parse_memory(s: &str) -> Result<u32, String> {
    crate::util::parse_memory_mb(s).map_err(|e| e.to_string())
}
