use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::Parser;

use boxer::cli::{Cli, Command};
use boxer::config::{self, Config};
use boxer::console;
use boxer::error::BoxerError;
use boxer::invoker::VBoxManage;
use boxer::lifecycle::{DeleteOutcome, Lifecycle, NewVm};
use boxer::logging;
use boxer::paths;
use boxer::prompt::{InquirePrompter, LinePrompter, Prompter};
use boxer::registry;
use boxer::shell::Shell;

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let log_file = logging::init(cli.verbose);

    // init runs before config loading since it writes the config
    if let Some(Command::Init { defaults }) = cli.command {
        let path = cli
            .config
            .unwrap_or_else(|| PathBuf::from(paths::CONFIG_FILE));
        return boxer::init::run(defaults, &path).map_err(Into::into);
    }

    let (config, source) = config::resolve_config(cli.config.as_deref())?;

    let log_path = config.log_file();
    if let Err(e) = log_file.open(&log_path) {
        tracing::warn!(path = %log_path.display(), error = %e, "cannot open log file");
    }
    tracing::info!(
        config = ?source.as_deref().map(|p| p.display().to_string()),
        "boxer starting"
    );

    let vbox = VBoxManage::new(&config.vboxmanage.path);
    run(cli.command.unwrap_or(Command::Menu), &vbox, &config).await?;
    Ok(())
}

async fn run(command: Command, vbox: &VBoxManage, config: &Config) -> Result<(), BoxerError> {
    let lifecycle = Lifecycle::new(vbox, config);

    match command {
        Command::Init { .. } => unreachable!(),
        Command::Menu => {
            if io::stdin().is_terminal() {
                Shell::new(vbox, config, InquirePrompter, io::stdout())
                    .run()
                    .await?;
            } else {
                let prompter = LinePrompter::new(io::stdin().lock(), io::stdout());
                Shell::new(vbox, config, prompter, io::stdout())
                    .run()
                    .await?;
            }
        }
        Command::List => {
            let snapshot = registry::list_vms(vbox).await?;
            if snapshot.is_empty() {
                println!("No VMs found.");
            }
            for (i, name) in snapshot.names().enumerate() {
                println!("{}. {name}", i + 1);
            }
        }
        Command::Create {
            name,
            memory,
            cpus,
            network,
            no_start,
        } => {
            let request = NewVm {
                name,
                memory_mb: memory,
                cpus,
                network: network.unwrap_or_else(|| config.default_network()),
            };
            let disk = lifecycle.create_from_template(&request).await?;
            println!("Created VM '{}' (disk {})", request.name, disk.display());
            if !no_start {
                lifecycle.start(&request.name).await?;
                println!("VM '{}' started headless.", request.name);
            }
        }
        Command::Start { vm } => {
            lifecycle.start(&vm).await?;
            println!("VM '{vm}' started headless.");
        }
        Command::Stop { vm } => {
            lifecycle.stop(&vm).await?;
            println!("VM '{vm}' has been stopped.");
        }
        Command::Delete { vm, yes } => {
            let answer = if yes {
                "yes".to_string()
            } else {
                ask(&format!(
                    "Are you sure you want to delete the VM '{vm}'? This action cannot be undone. (yes/no):"
                ))?
                .unwrap_or_default()
            };
            match lifecycle.delete(&vm, &answer).await? {
                DeleteOutcome::Deleted => println!("VM '{vm}' has been deleted."),
                DeleteOutcome::Aborted => println!("VM deletion cancelled."),
            }
        }
        Command::Console { vm } => {
            let info = console::expose_console(vbox, config, &vm).await?;
            println!("VM '{vm}' is running with VRDE enabled. Connect using a remote desktop client.");
            println!("IP Address of '{vm}': {}", info.ip);
            if let Some(port) = info.vrde_port {
                println!("VRDE port: {port}");
            }
        }
    }
    Ok(())
}

fn ask(prompt: &str) -> Result<Option<String>, BoxerError> {
    if io::stdin().is_terminal() {
        InquirePrompter.ask(prompt)
    } else {
        LinePrompter::new(io::stdin().lock(), io::stdout()).ask(prompt)
    }
}
