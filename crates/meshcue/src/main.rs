use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use meshcue_core::messages::{ServerCommand, ServerEvent};
use meshcue_core::{AlfredDaemon, CueServer, LoopbackDaemon, MeshDaemon, ServerConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Control server for a mesh-networked live-show cueing system.
#[derive(Parser, Debug)]
#[command(name = "meshcue")]
#[command(about = "Meshcue cue server")]
struct Args {
    /// Path to the server configuration file
    #[arg(long, default_value = "meshcue.json")]
    config: PathBuf,

    /// Override the configured data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the configured mesh daemon binary
    #[arg(long)]
    daemon: Option<String>,

    /// Use an in-process loopback daemon instead of the mesh (dry runs)
    #[arg(long)]
    loopback: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = ServerConfig::load(&args.config);
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(daemon) = args.daemon {
        config.daemon_binary = daemon;
    }

    let daemon: Box<dyn MeshDaemon> = if args.loopback {
        log::info!("using the in-process loopback daemon");
        Box::new(LoopbackDaemon::new())
    } else {
        Box::new(AlfredDaemon::new(
            config.daemon_binary.clone(),
            config.daemon_timeout(),
        ))
    };

    let server = CueServer::new(&config, daemon);
    let data = server.data();

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    // Minimal presentation layer: stdin lines in, printed events out.
    tokio::spawn(read_operator_input(command_tx));
    tokio::spawn(print_events(event_rx));

    {
        let data = data.read().await;
        println!(
            "loaded {} cue groups; current group {}. Type /list for commands, quit to exit.",
            data.max_group() + 1,
            data.current_group()
        );
    }

    server.run(command_rx, event_tx).await
}

/// Turn operator input lines into server commands. EOF or `quit` closes the
/// show, which the server treats as the stop signal.
async fn read_operator_input(command_tx: mpsc::UnboundedSender<ServerCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let _ = command_tx.send(ServerCommand::Ready);
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim().to_string();
                let command = match line.as_str() {
                    "" => continue,
                    "quit" | "exit" => ServerCommand::Shutdown,
                    "next" => ServerCommand::NextCue,
                    "prev" | "previous" => ServerCommand::PreviousCue,
                    _ => ServerCommand::CommandLine(line),
                };
                let stop = matches!(command, ServerCommand::Shutdown);
                if command_tx.send(command).is_err() || stop {
                    break;
                }
            }
            Ok(None) | Err(_) => {
                let _ = command_tx.send(ServerCommand::Shutdown);
                break;
            }
        }
    }
}

async fn print_events(mut event_rx: mpsc::UnboundedReceiver<ServerEvent>) {
    while let Some(event) = event_rx.recv().await {
        match event {
            ServerEvent::CueChanged {
                group,
                max_group,
                current,
                ..
            } => {
                println!("cue group {} of {}:", group, max_group);
                for cue in &current.cues {
                    println!(
                        "  {:<8} {:<20} {:<24} [{}]",
                        cue.number, cue.when, cue.action, cue.state
                    );
                }
            }
            ServerEvent::NodesUpdated(statuses) => {
                for row in statuses.rows() {
                    if !row.node_state.is_empty() {
                        println!(
                            "node {} @ {}: {} ({})",
                            row.node_number, row.cue_number, row.node_state, row.last_updated
                        );
                    }
                }
            }
            ServerEvent::CommandFeedback(message) => println!("{}", message),
            ServerEvent::FormatProblem(issue) => println!("{}", issue),
            ServerEvent::ShutdownComplete => break,
        }
    }
}
