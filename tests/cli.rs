use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;

fn boxer() -> assert_cmd::Command {
    cargo_bin_cmd!("boxer").into()
}

fn write_config(dir: &tempfile::TempDir, vboxmanage: &str, extra: &str) -> std::path::PathBuf {
    let config_path = dir.path().join("boxer.toml");
    let mut f = std::fs::File::create(&config_path).unwrap();
    write!(
        f,
        r#"
[vboxmanage]
path = "{vboxmanage}"

[logging]
file = "{log}"
{extra}
"#,
        log = dir.path().join("boxer.log").display(),
    )
    .unwrap();
    config_path
}

#[test]
fn help_works() {
    boxer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Menu-driven VirtualBox VM manager"));
}

#[test]
fn missing_config_shows_error() {
    boxer()
        .args(["--config", "/nonexistent/boxer.toml", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn invalid_network_mode_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, "VBoxManage", "[network]\ndefault_mode = \"hostonly\"\n");

    boxer()
        .args(["--config", config_path.to_str().unwrap(), "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("network mode must be"));
}

#[test]
fn missing_vboxmanage_reports_spawn_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, "/nonexistent/VBoxManage", "");

    boxer()
        .args(["--config", config_path.to_str().unwrap(), "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to run"));
}

#[test]
fn create_requires_template_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, "VBoxManage", "");

    boxer()
        .args([
            "--config",
            config_path.to_str().unwrap(),
            "create",
            "--name",
            "web-01",
            "--memory",
            "2048",
            "--cpus",
            "1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("template.dir"));
}

#[test]
fn init_defaults_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("boxer.toml");

    boxer()
        .args(["--config", config_path.to_str().unwrap(), "init", "--defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let written = std::fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("[vboxmanage]"));

    boxer()
        .args(["--config", config_path.to_str().unwrap(), "init", "--defaults"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[cfg(unix)]
mod fake_vboxmanage {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    const SCRIPT: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
case "$1" in
  list)
    echo '"web-01" {11111111-1111-1111-1111-111111111111}'
    echo '"db 01" {22222222-2222-2222-2222-222222222222}'
    ;;
  showvminfo)
    if [ "$2" = "web-01" ]; then
      echo 'name="web-01"'
      echo 'VMState="poweroff"'
    else
      echo "VBoxManage: error: Could not find a registered machine named '$2'" >&2
      exit 1
    fi
    ;;
  startvm)
    echo "VM \"$2\" has been successfully started."
    ;;
esac
exit 0
"#;

    struct Fixture {
        dir: tempfile::TempDir,
        config: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let script = dir.path().join("VBoxManage");
            std::fs::write(&script, SCRIPT).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            let config = write_config(&dir, script.to_str().unwrap(), "");
            Self { dir, config }
        }

        fn cmd(&self) -> assert_cmd::Command {
            let mut cmd = boxer();
            cmd.args(["--config", self.config.to_str().unwrap()]);
            cmd
        }

        fn calls(&self) -> String {
            std::fs::read_to_string(self.dir.path().join("calls.log")).unwrap_or_default()
        }
    }

    #[test]
    fn list_prints_numbered_vms() {
        let fx = Fixture::new();
        fx.cmd()
            .arg("list")
            .assert()
            .success()
            .stdout("1. web-01\n2. db 01\n");
        assert_eq!(fx.calls(), "list vms\n");
    }

    #[test]
    fn menu_over_piped_stdin() {
        let fx = Fixture::new();
        fx.cmd()
            .write_stdin("1\n7\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("2. db 01"))
            .stdout(predicate::str::contains("Exiting Virtual Machine Manager."));
    }

    #[test]
    fn menu_back_returns_without_commands() {
        let fx = Fixture::new();
        fx.cmd()
            .arg("menu")
            .write_stdin("3\nback\n7\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Returning to main menu..."));
        assert_eq!(fx.calls(), "list vms\n");
    }

    #[test]
    fn start_stopped_vm() {
        let fx = Fixture::new();
        fx.cmd()
            .args(["start", "web-01"])
            .assert()
            .success()
            .stdout(predicate::str::contains("started headless"));
        assert!(fx.calls().contains("startvm web-01 --type headless"));
    }

    #[test]
    fn start_unknown_vm_is_rejected() {
        let fx = Fixture::new();
        fx.cmd()
            .args(["start", "ghost"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not registered"));
        assert!(!fx.calls().contains("startvm"));
    }

    #[test]
    fn stop_already_stopped_vm_is_rejected() {
        let fx = Fixture::new();
        fx.cmd()
            .args(["stop", "web-01"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("it is stopped"));
        assert!(!fx.calls().contains("controlvm"));
    }

    #[test]
    fn delete_needs_yes() {
        let fx = Fixture::new();
        fx.cmd()
            .args(["delete", "web-01"])
            .write_stdin("no\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("VM deletion cancelled."));
        assert!(!fx.calls().contains("unregistervm"));

        fx.cmd()
            .args(["delete", "web-01", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("has been deleted"));
        assert!(fx.calls().contains("unregistervm web-01 --delete"));
    }

    #[test]
    fn log_file_records_commands() {
        let fx = Fixture::new();
        fx.cmd().arg("list").assert().success();
        let log = std::fs::read_to_string(fx.dir.path().join("boxer.log")).unwrap();
        assert!(log.contains("invoking"));
    }
}
