//! Command-line front end for the fault-injection harness.
//!
//! Three subcommands:
//! - `byte-kill`: stream stdin through a local child process to stdout and
//!   terminate the child the instant it has produced N output bytes.
//! - `inject`: resolve a node through a plugin, bring it up, and arm an
//!   event that kills it when the condition holds.
//! - `resurrect`: resolve a node and arm an event that brings it back.
//!
//! Each invocation is self-contained: it builds its node, arms its event,
//! waits for the event to fire (or Ctrl-C), and exits. Fatal configuration
//! errors print to stderr and exit nonzero.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use log::info;
use tokio_util::sync::CancellationToken;

use frac::{
    action, split_command, Event, FaultMode, Frac, FracConfig, FracError, LocalFrac,
    LocalProcessNode, LocalStreamingHooks, Node, PluginRegistry, RuntimeHooks,
    wait_for_shutdown_signal,
};

#[derive(Parser)]
#[command(name = "frac", about = "Inject faults into process nodes on trigger conditions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pipe stdin through CMD to stdout, killing CMD at an exact output byte offset.
    ByteKill {
        /// Output byte offset at which the child is terminated.
        #[arg(long)]
        bytes: u64,
        /// Command line to spawn (quoted as one argument).
        #[arg(long)]
        cmd: String,
    },
    /// Arm an event that kills a node when the condition holds.
    Inject {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Arm an event that brings a node back when the condition holds.
    Resurrect {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Node identifier, interpreted by the plugin (for `local`: a command line).
    #[arg(long)]
    node: String,
    /// Event kind: delay, bytes, or token.
    #[arg(long)]
    event: String,
    /// Delay in milliseconds (required for `delay` events).
    #[arg(long)]
    ms: Option<u64>,
    /// Byte threshold (required for `bytes` events).
    #[arg(long)]
    bytes: Option<u64>,
    /// Token to watch for (required for `token` events).
    #[arg(long)]
    token: Option<String>,
    /// Backend plugin providing the node.
    #[arg(long, default_value = "local")]
    plugin: String,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::ByteKill { bytes, cmd } => cmd_byte_kill(bytes, &cmd).await,
        Commands::Inject { target } => cmd_arm(target, false).await,
        Commands::Resurrect { target } => cmd_arm(target, true).await,
    };

    if let Err(err) = result {
        eprintln!("frac: [{}] {}", err.as_label(), err.as_message());
        std::process::exit(1);
    }
}

async fn cmd_byte_kill(bytes: u64, cmd: &str) -> Result<(), FracError> {
    let cfg = FracConfig::default();
    let argv = split_command(cmd)?;
    let node = Arc::new(LocalProcessNode::new(argv, FaultMode::Terminate, &cfg)?);
    node.start().await?;

    let hooks = LocalStreamingHooks::new(node.clone(), &cfg);
    LocalFrac
        .inject(node.clone(), &Event::bytes(bytes), hooks.clone())
        .await;
    info!("armed byte-kill of {:?} at output byte {bytes}", node.name());

    tokio::select! {
        forwarded = hooks.pump_data(tokio::io::stdin(), tokio::io::stdout()) => {
            info!("pump finished after {forwarded} bytes");
        }
        _ = wait_for_shutdown_signal() => {
            info!("interrupted");
        }
    }

    node.kill().await?;
    Ok(())
}

async fn cmd_arm(args: TargetArgs, resurrect: bool) -> Result<(), FracError> {
    let cfg = FracConfig::default();
    let registry = PluginRegistry::with_builtin(cfg.clone());
    let plugin = registry.resolve(&args.plugin)?;
    let event = build_event(&args, &cfg)?;

    let node = plugin.create_node(&args.node)?;
    let hooks = plugin.create_hooks(node.clone())?;
    let frac = plugin.create_frac();

    if !resurrect {
        // The target has to be up before a kill means anything; on a fresh
        // node this is a plain start.
        frac.resurrect(node.clone()).await?;
        frac.inject(node.clone(), &event, hooks.clone()).await;
        info!("armed kill of {:?} on {:?}", node.name(), args.event);
    } else {
        frac.schedule_resurrection(node.clone(), &event, hooks.clone())
            .await;
        info!("armed resurrection of {:?} on {:?}", node.name(), args.event);
    }

    // Appended after the kill/resurrect so the select below only wakes once
    // the whole chain has run.
    let fired = CancellationToken::new();
    {
        let fired = fired.clone();
        hooks.on_fire(action(move || {
            let fired = fired.clone();
            async move {
                fired.cancel();
            }
        }));
    }

    tokio::select! {
        _ = fired.cancelled() => {
            info!("event fired; action chain complete");
        }
        _ = wait_for_shutdown_signal() => {
            info!("interrupted before the event fired");
        }
    }
    Ok(())
}

fn build_event(args: &TargetArgs, cfg: &FracConfig) -> Result<Event, FracError> {
    let event = match args.event.as_str() {
        "delay" => Event::delay(args.ms.ok_or(FracError::MissingValue {
            flag: "ms",
            event: "delay",
        })?),
        "bytes" => Event::bytes(args.bytes.ok_or(FracError::MissingValue {
            flag: "bytes",
            event: "bytes",
        })?),
        "token" => Event::token(args.token.clone().ok_or(FracError::MissingValue {
            flag: "token",
            event: "token",
        })?),
        other => {
            return Err(FracError::UnknownEvent {
                name: other.to_string(),
            })
        }
    };
    Ok(event.with_poll_interval(cfg.poll_interval))
}
