//! The interactive menu loop.
//!
//! Every choice runs to completion (or fails with a printed error) before the
//! menu is shown again. Input ending at any prompt returns to the menu, and
//! ending at the menu prompt exits.

use std::io::Write;

use crate::config::{Config, NetworkMode};
use crate::console;
use crate::error::BoxerError;
use crate::invoker::Invoker;
use crate::lifecycle::{self, DeleteOutcome, Lifecycle, NewVm};
use crate::prompt::Prompter;
use crate::registry::{self, VmSnapshot};
use crate::selector::{self, Selection};
use crate::util::{parse_count, parse_memory_mb};

const MENU: &str = "
--- Virtual Machine Manager ---
1. List Virtual Machines
2. Create a New VM
3. Start a VM
4. Stop a VM
5. Delete a VM
6. Access VM Console (VRDE)
7. Exit";

const MENU_PROMPT: &str = "Select an option (1-7):";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    List,
    Create,
    Start,
    Stop,
    Delete,
    Console,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        Some(match input.trim() {
            "1" => MenuChoice::List,
            "2" => MenuChoice::Create,
            "3" => MenuChoice::Start,
            "4" => MenuChoice::Stop,
            "5" => MenuChoice::Delete,
            "6" => MenuChoice::Console,
            "7" => MenuChoice::Exit,
            _ => return None,
        })
    }
}

pub struct Shell<'a, I, P, W> {
    invoker: &'a I,
    config: &'a Config,
    prompter: P,
    out: W,
}

impl<'a, I: Invoker, P: Prompter, W: Write> Shell<'a, I, P, W> {
    pub fn new(invoker: &'a I, config: &'a Config, prompter: P, out: W) -> Self {
        Self {
            invoker,
            config,
            prompter,
            out,
        }
    }

    /// Run the menu until the user exits or input ends.
    pub async fn run(&mut self) -> Result<(), BoxerError> {
        loop {
            self.say(MENU)?;
            let Some(input) = self.prompter.ask(MENU_PROMPT)? else {
                break;
            };
            let Some(choice) = MenuChoice::parse(&input) else {
                self.say("Invalid choice. Please select a valid option.")?;
                continue;
            };
            if choice == MenuChoice::Exit {
                break;
            }

            match self.dispatch(choice).await {
                Ok(()) => {}
                Err(BoxerError::Cancelled) => break,
                Err(e) => {
                    tracing::warn!(?choice, error = %e, "menu action failed");
                    self.say(&format!("Error: {e}"))?;
                }
            }
        }
        self.say("Exiting Virtual Machine Manager.")
    }

    async fn dispatch(&mut self, choice: MenuChoice) -> Result<(), BoxerError> {
        tracing::debug!(?choice, "menu choice");
        let lifecycle = Lifecycle::new(self.invoker, self.config);

        match choice {
            MenuChoice::List => {
                self.show_vms().await?;
            }
            MenuChoice::Create => self.create().await?,
            MenuChoice::Start => {
                if let Some(vm) = self.pick_vm().await? {
                    lifecycle.start(&vm).await?;
                    self.say(&format!("VM '{vm}' is starting... Please wait a moment."))?;
                }
            }
            MenuChoice::Stop => {
                if let Some(vm) = self.pick_vm().await? {
                    lifecycle.stop(&vm).await?;
                    self.say(&format!("VM '{vm}' has been stopped."))?;
                }
            }
            MenuChoice::Delete => {
                if let Some(vm) = self.pick_vm().await? {
                    let answer = self
                        .prompter
                        .ask(&format!(
                            "Are you sure you want to delete the VM '{vm}'? This action cannot be undone. (yes/no):"
                        ))?
                        .unwrap_or_default();
                    match lifecycle.delete(&vm, &answer).await? {
                        DeleteOutcome::Deleted => self.say(&format!("VM '{vm}' has been deleted."))?,
                        DeleteOutcome::Aborted => self.say("VM deletion cancelled.")?,
                    }
                }
            }
            MenuChoice::Console => {
                if let Some(vm) = self.pick_vm().await? {
                    let info = console::expose_console(self.invoker, self.config, &vm).await?;
                    self.say(&format!(
                        "VM '{vm}' is running with VRDE enabled. Connect using a remote desktop client."
                    ))?;
                    self.say(&format!("IP Address of '{vm}': {}", info.ip))?;
                    if let Some(port) = info.vrde_port {
                        self.say(&format!("VRDE port: {port}"))?;
                    }
                }
            }
            MenuChoice::Exit => {}
        }
        Ok(())
    }

    /// Fetch the registry once and print it as a numbered list.
    async fn show_vms(&mut self) -> Result<VmSnapshot, BoxerError> {
        let snapshot = registry::list_vms(self.invoker).await?;
        if snapshot.is_empty() {
            self.say("No VMs found.")?;
        } else {
            self.say("\nRegistered Virtual Machines:")?;
            let lines: Vec<String> = snapshot
                .names()
                .enumerate()
                .map(|(i, name)| format!("{}. {name}", i + 1))
                .collect();
            for line in lines {
                self.say(&line)?;
            }
        }
        Ok(snapshot)
    }

    /// List, then let the user choose. `None` when there is nothing to pick
    /// or the user backed out.
    async fn pick_vm(&mut self) -> Result<Option<String>, BoxerError> {
        let snapshot = self.show_vms().await?;
        if snapshot.is_empty() {
            return Ok(None);
        }
        match selector::select(&snapshot, &mut self.prompter, &mut self.out)? {
            Selection::Vm(vm) => Ok(Some(vm)),
            Selection::Cancelled => {
                self.say("Returning to main menu...")?;
                Ok(None)
            }
        }
    }

    async fn create(&mut self) -> Result<(), BoxerError> {
        let Some(name) = self.ask_until("Enter VM name:", |s| {
            lifecycle::validate_vm_name(s).map(|_| s.to_string())
        })?
        else {
            return Ok(());
        };
        let Some(memory_mb) =
            self.ask_until("Enter memory size in MB (e.g., 4096 for 4 GB):", parse_memory_mb)?
        else {
            return Ok(());
        };
        let Some(cpus) = self.ask_until("Enter number of CPUs (e.g., 2):", parse_count)? else {
            return Ok(());
        };

        self.say("Network modes: [1] NAT, [2] Bridged")?;
        let network = match self
            .prompter
            .ask("Choose network mode (1 or 2):")?
            .as_deref()
            .map(str::trim)
        {
            Some("1") => NetworkMode::Nat,
            Some("2") => NetworkMode::Bridged,
            _ => {
                self.say("Invalid choice, defaulting to NAT.")?;
                NetworkMode::Nat
            }
        };

        let request = NewVm {
            name,
            memory_mb,
            cpus,
            network,
        };
        let lifecycle = Lifecycle::new(self.invoker, self.config);

        self.say(&format!("Cloning template for '{}'...", request.name))?;
        let disk = lifecycle.create_from_template(&request).await?;
        self.say(&format!(
            "VM '{}' created with disk {} and cloud-init ISO attached.",
            request.name,
            disk.display()
        ))?;

        lifecycle.start(&request.name).await?;
        self.say(&format!(
            "VM '{}' is starting... Please wait a moment.",
            request.name
        ))
    }

    /// Re-prompt until `parse` accepts the input. `None` when input ends.
    fn ask_until<T>(
        &mut self,
        prompt: &str,
        parse: impl Fn(&str) -> Result<T, BoxerError>,
    ) -> Result<Option<T>, BoxerError> {
        loop {
            let Some(input) = self.prompter.ask(prompt)? else {
                return Ok(None);
            };
            match parse(&input) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => self.say(&e.to_string())?,
            }
        }
    }

    fn say(&mut self, line: &str) -> Result<(), BoxerError> {
        writeln!(self.out, "{line}").map_err(|source| BoxerError::Io {
            context: "writing output".into(),
            source,
        })
    }
}
