#![allow(unused_assignments)] // thiserror/miette proc macros trigger false positives

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod init;
pub mod invoker;
pub mod lifecycle;
pub mod logging;
pub mod paths;
pub mod prompt;
pub mod provision;
pub mod registry;
pub mod selector;
pub mod shell;
pub mod util;
pub mod vm_state;
