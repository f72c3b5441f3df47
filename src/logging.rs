use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

type Slot = Arc<Mutex<Option<File>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<File>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── LogFile ──────────────────────────────────────────────

/// A `MakeWriter` that drops everything until a file is attached.
///
/// The subscriber is installed before the config (and so the log path) is
/// known; [`LogFileHandle::open`] attaches the file afterwards.
#[derive(Clone)]
pub struct LogFile {
    slot: Slot,
}

/// Attaches the file behind a [`LogFile`].
#[derive(Clone)]
pub struct LogFileHandle {
    slot: Slot,
}

impl LogFile {
    pub fn new() -> (Self, LogFileHandle) {
        let slot: Slot = Arc::new(Mutex::new(None));
        (Self { slot: slot.clone() }, LogFileHandle { slot })
    }
}

impl LogFileHandle {
    /// Open `path` for appending, creating parent directories.
    pub fn open(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        *lock(&self.slot) = Some(file);
        Ok(())
    }
}

pub struct LogFileWriter {
    slot: Slot,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match lock(&self.slot).as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match lock(&self.slot).as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter {
            slot: self.slot.clone(),
        }
    }
}

// ── subscriber setup ─────────────────────────────────────

/// Terminal filter: `RUST_LOG` wins, then `--verbose`, else silent so the
/// menu output stays clean.
pub fn terminal_filter(verbose: bool) -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("boxer=debug")
    } else {
        EnvFilter::new("off")
    }
}

/// Install the global subscriber: stderr plus the (not yet opened) log file.
pub fn init(verbose: bool) -> LogFileHandle {
    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(terminal_filter(verbose));

    let (file_writer, handle) = LogFile::new();
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("boxer=debug"));

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .init();

    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discards_until_opened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("boxer.log");
        let (file, handle) = LogFile::new();

        file.make_writer().write_all(b"dropped\n").unwrap();
        assert!(!path.exists());

        handle.open(&path).unwrap();
        file.make_writer().write_all(b"kept\n").unwrap();
        file.make_writer().flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "kept\n");
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boxer.log");
        fs::write(&path, "earlier run\n").unwrap();

        let (file, handle) = LogFile::new();
        handle.open(&path).unwrap();
        file.make_writer().write_all(b"this run\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier run\nthis run\n");
    }
}
