//! Remote console access over VRDE.
//!
//! Enables the remote display server, makes sure the VM runs headless, then
//! polls the guest property the guest additions publish until the VM reports
//! an IPv4 address or the wait times out.

use std::time::Duration;

use indicatif::ProgressBar;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::BoxerError;
use crate::invoker::Invoker;
use crate::lifecycle::Lifecycle;
use crate::vm_state::{self, VmState};

pub const GUEST_IP_PROPERTY: &str = "/VirtualBox/GuestInfo/Net/0/V4/IP";

/// Where to point a remote desktop client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleInfo {
    pub ip: String,
    pub vrde_port: Option<u16>,
}

/// Address from `guestproperty get` output: the text after the last colon.
///
/// `None` when the guest has not published the property yet.
pub fn parse_guest_ip(stdout: &str) -> Option<String> {
    let text = stdout.trim();
    if text.is_empty() || text.starts_with("No value set") {
        return None;
    }
    let ip = text.rsplit(':').next().unwrap_or(text).trim();
    (!ip.is_empty()).then(|| ip.to_string())
}

/// One `guestproperty get` round trip.
pub async fn query_guest_ip<I: Invoker>(invoker: &I, vm: &str) -> Result<String, BoxerError> {
    let args = vec![
        "guestproperty".to_string(),
        "get".to_string(),
        vm.to_string(),
        GUEST_IP_PROPERTY.to_string(),
    ];
    let output = invoker.invoke(&args).await?;

    if !output.success() {
        return Err(BoxerError::GuestIpUnavailable {
            vm: vm.to_string(),
            message: output.stderr.trim().to_string(),
        });
    }

    parse_guest_ip(&output.stdout).ok_or_else(|| BoxerError::GuestIpUnavailable {
        vm: vm.to_string(),
        message: output.error_text(),
    })
}

/// Poll until the guest reports an address.
///
/// At least one query is made. Gives up once another `interval` would reach
/// `timeout`, returning the last failure text.
pub async fn wait_for_guest_ip<I: Invoker>(
    invoker: &I,
    vm: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<String, BoxerError> {
    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let last = match query_guest_ip(invoker, vm).await {
            Ok(ip) => {
                tracing::info!(vm, %ip, attempt, "guest reported IP");
                return Ok(ip);
            }
            Err(BoxerError::GuestIpUnavailable { message, .. }) => message,
            Err(e) => return Err(e),
        };
        tracing::debug!(vm, attempt, reason = %last, "guest IP not available yet");

        if Instant::now() + interval >= deadline {
            return Err(BoxerError::GuestIpUnavailable {
                vm: vm.to_string(),
                message: last,
            });
        }
        tokio::time::sleep(interval).await;
    }
}

/// `controlvm <vm> vrde on`, for a VM whose settings are locked by a session.
async fn enable_vrde_live<I: Invoker>(invoker: &I, vm: &str) -> Result<(), BoxerError> {
    let args = vec![
        "controlvm".to_string(),
        vm.to_string(),
        "vrde".to_string(),
        "on".to_string(),
    ];
    invoker.invoke(&args).await?.check(&args)?;
    tracing::info!(vm, "VRDE enabled on running VM");
    Ok(())
}

/// Turn VRDE on, start the VM headless if needed, and wait for its address.
pub async fn expose_console<I: Invoker>(
    invoker: &I,
    config: &Config,
    vm: &str,
) -> Result<ConsoleInfo, BoxerError> {
    let state = vm_state::detect(invoker, vm).await?.map(|info| info.state);

    match state {
        Some(state @ (VmState::Unregistered | VmState::Deleted)) => {
            return Err(BoxerError::InvalidTransition {
                vm: vm.to_string(),
                operation: "open the console of".into(),
                state,
            });
        }
        Some(VmState::Running) => enable_vrde_live(invoker, vm).await?,
        Some(VmState::Saved) => {
            // modifyvm cannot touch a saved machine; restore it first.
            Lifecycle::new(invoker, config).start_headless(vm).await?;
            enable_vrde_live(invoker, vm).await?;
        }
        Some(VmState::Stopped) | None => {
            let args = vec![
                "modifyvm".to_string(),
                vm.to_string(),
                "--vrde".to_string(),
                "on".to_string(),
            ];
            invoker.invoke(&args).await?.check(&args)?;
            tracing::info!(vm, "VRDE enabled");
            Lifecycle::new(invoker, config).start_headless(vm).await?;
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Waiting for '{vm}' to report its IP address..."));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let ip = wait_for_guest_ip(invoker, vm, config.ip_wait_timeout(), config.poll_interval()).await;
    spinner.finish_and_clear();
    let ip = ip?;

    let vrde_port = vm_state::detect(invoker, vm)
        .await?
        .and_then(|info| info.vrde_port);

    Ok(ConsoleInfo { ip, vrde_port })
}
