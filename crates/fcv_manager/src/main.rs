// fcv-node entry point.
//
// Opens a node's version metadata, runs startup recovery, and exposes the
// init/status/set operations an operator or test harness drives.

use std::io::IsTerminal;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use fcv_manager::{FcvError, FcvStateMachine, NodeArgs, TransitionHooks};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "fcv-node")]
#[command(about = "Inspect and change a node's feature compatibility version", long_about = None)]
struct Args {
    #[command(flatten)]
    node: NodeArgs,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the FCV document if missing and print the recovery report.
    Init,
    /// Print the persisted FCV document as JSON.
    Status,
    /// Request a transition to a version (`latest`, `lastContinuous`, `lastLTS` or `major.minor`).
    Set { version: String },
}

fn main() -> anyhow::Result<()> {
    // Enable ANSI colors only when stderr is a terminal and NO_COLOR is unset.
    let ansi = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    tracing_subscriber::fmt()
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = args.node.into_config()?;
    let store = config.open_store()?;

    if matches!(args.cmd, Command::Status) && store.read().map_err(with_code)?.is_none() {
        anyhow::bail!(
            "no feature compatibility version document in {}; run `init` first",
            config.data_dir.display()
        );
    }

    // Cleanup actions belong to the storage layers that own the formats;
    // this binary drives the state machine only.
    let machine = FcvStateMachine::open(store, TransitionHooks::default(), config.machine)
        .map_err(with_code)?;

    match args.cmd {
        Command::Init => {
            let report = machine.last_recovery();
            let out = json!({
                "created": report.created,
                "pending": report.pending.map(|state| state.to_string()),
                "document": report.document,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&machine.status())?);
        }
        Command::Set { version } => {
            machine.request_transition_str(&version).map_err(with_code)?;
            println!("{}", serde_json::to_string_pretty(&machine.status())?);
        }
    }
    Ok(())
}

fn with_code(err: FcvError) -> anyhow::Error {
    anyhow!("{err} (code {})", err.code())
}
