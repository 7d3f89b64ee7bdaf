use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinSet;
use tokio::time::interval;

use crate::commands::{self, Command};
use crate::config::ServerConfig;
use crate::data::DataManager;
use crate::errors::{ErrorLog, TaskExit};
use crate::mesh::daemon::MeshDaemon;
use crate::mesh::transport::{Channel, MeshTransport};
use crate::messages::{ServerCommand, ServerEvent};
use crate::node_status::NodeReport;

const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(250);
const ATTRIBUTES_INTERVAL: Duration = Duration::from_millis(2000);
const STATES_INTERVAL: Duration = Duration::from_millis(2500);
const CURRENT_CUES_INTERVAL: Duration = Duration::from_millis(100);
const NODE_POLL_INTERVAL: Duration = Duration::from_millis(300);
const STALENESS_INTERVAL: Duration = Duration::from_secs(60);

/// The composition root: owns the data model, the mesh transport, and the
/// error log, and runs the concurrent schedule of heartbeat, broadcast,
/// poll, and aggregation tasks.
///
/// All tasks except the heartbeat wait on a one-shot setup barrier released
/// when the presentation layer reports itself wired. A `Shutdown` command
/// (or the presentation layer dropping its channel) stops the run cleanly;
/// any other task failure is recorded to the error log and ends the run.
pub struct CueServer {
    data: Arc<RwLock<DataManager>>,
    transport: Arc<MeshTransport>,
    error_log: ErrorLog,
}

impl CueServer {
    pub fn new(config: &ServerConfig, daemon: Box<dyn MeshDaemon>) -> Self {
        Self {
            data: Arc::new(RwLock::new(DataManager::new(config))),
            transport: Arc::new(MeshTransport::new(daemon)),
            error_log: ErrorLog::new(config.error_log_path()),
        }
    }

    /// Shared handle to the data model, for the presentation layer.
    pub fn data(&self) -> Arc<RwLock<DataManager>> {
        Arc::clone(&self.data)
    }

    pub fn transport(&self) -> Arc<MeshTransport> {
        Arc::clone(&self.transport)
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Run every scheduled task until the presentation layer closes or a
    /// task fails. The first task to finish decides the outcome; everything
    /// else is cancelled before returning.
    pub async fn run(
        mut self,
        command_rx: mpsc::UnboundedReceiver<ServerCommand>,
        event_tx: mpsc::UnboundedSender<ServerEvent>,
    ) -> anyhow::Result<()> {
        let (setup_tx, setup_rx) = watch::channel(false);
        let mut tasks: JoinSet<Result<(), TaskExit>> = JoinSet::new();

        tasks.spawn(heartbeat_task(Arc::clone(&self.transport)));
        tasks.spawn(attributes_task(
            Arc::clone(&self.data),
            Arc::clone(&self.transport),
            setup_rx.clone(),
        ));
        tasks.spawn(states_task(
            Arc::clone(&self.data),
            Arc::clone(&self.transport),
            setup_rx.clone(),
        ));
        tasks.spawn(current_cues_task(
            Arc::clone(&self.data),
            Arc::clone(&self.transport),
            setup_rx.clone(),
        ));
        tasks.spawn(node_report_task(
            Arc::clone(&self.data),
            Arc::clone(&self.transport),
            event_tx.clone(),
            setup_rx.clone(),
        ));
        tasks.spawn(staleness_task(
            Arc::clone(&self.data),
            event_tx.clone(),
            setup_rx,
        ));
        tasks.spawn(command_task(
            Arc::clone(&self.data),
            setup_tx,
            command_rx,
            event_tx.clone(),
        ));

        log::info!("cue server running");
        let result = match tasks.join_next().await {
            None | Some(Ok(Ok(()))) | Some(Ok(Err(TaskExit::Stop))) => {
                log::info!("cue server stopping");
                Ok(())
            }
            Some(Ok(Err(TaskExit::Fatal(err)))) => {
                log::error!("cue server task failed: {:#}", err);
                self.error_log.record(format!("{:#}", err));
                Err(err)
            }
            Some(Err(join_err)) => {
                let err = anyhow!("cue server task panicked: {}", join_err);
                self.error_log.record(format!("{:#}", err));
                Err(err)
            }
        };

        tasks.shutdown().await;
        let _ = event_tx.send(ServerEvent::ShutdownComplete);
        result
    }
}

/// Block until the presentation layer has released the setup barrier. A
/// dropped barrier means the command task is gone, which is a shutdown.
async fn await_setup(setup: &mut watch::Receiver<bool>) -> Result<(), TaskExit> {
    setup
        .wait_for(|ready| *ready)
        .await
        .map(|_| ())
        .map_err(|_| TaskExit::Stop)
}

/// Let the nodes know the server is alive. Runs from process start,
/// independent of the setup barrier.
async fn heartbeat_task(transport: Arc<MeshTransport>) -> Result<(), TaskExit> {
    let mut ticker = interval(HEARTBEAT_INTERVAL);
    loop {
        ticker.tick().await;
        transport.send(Channel::Heartbeat, &Utc::now()).await;
    }
}

async fn attributes_task(
    data: Arc<RwLock<DataManager>>,
    transport: Arc<MeshTransport>,
    mut setup: watch::Receiver<bool>,
) -> Result<(), TaskExit> {
    await_setup(&mut setup).await?;
    let mut ticker = interval(ATTRIBUTES_INTERVAL);
    loop {
        ticker.tick().await;
        let attributes = data.read().await.attributes().to_vec();
        transport.send(Channel::Attributes, &attributes).await;
    }
}

async fn states_task(
    data: Arc<RwLock<DataManager>>,
    transport: Arc<MeshTransport>,
    mut setup: watch::Receiver<bool>,
) -> Result<(), TaskExit> {
    await_setup(&mut setup).await?;
    let mut ticker = interval(STATES_INTERVAL);
    loop {
        ticker.tick().await;
        let states = data.read().await.states().to_vec();
        transport.send(Channel::CueToNode, &states).await;
    }
}

async fn current_cues_task(
    data: Arc<RwLock<DataManager>>,
    transport: Arc<MeshTransport>,
    mut setup: watch::Receiver<bool>,
) -> Result<(), TaskExit> {
    await_setup(&mut setup).await?;
    let mut ticker = interval(CURRENT_CUES_INTERVAL);
    loop {
        ticker.tick().await;
        let current = data.read().await.current_cues().clone();
        transport.send(Channel::CurrentCues, &current).await;
    }
}

/// Poll the report channel and merge whatever arrived. Reports for cues
/// outside the current group are dropped by the aggregator.
async fn node_report_task(
    data: Arc<RwLock<DataManager>>,
    transport: Arc<MeshTransport>,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
    mut setup: watch::Receiver<bool>,
) -> Result<(), TaskExit> {
    await_setup(&mut setup).await?;
    let mut ticker = interval(NODE_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if let Some(reports) = transport.receive::<NodeReport>(Channel::NodeReport).await {
            let mut data = data.write().await;
            data.apply_reports(&reports);
            let _ = event_tx.send(ServerEvent::NodesUpdated(data.node_statuses().clone()));
        }
    }
}

async fn staleness_task(
    data: Arc<RwLock<DataManager>>,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
    mut setup: watch::Receiver<bool>,
) -> Result<(), TaskExit> {
    await_setup(&mut setup).await?;
    let mut ticker = interval(STALENESS_INTERVAL);
    loop {
        ticker.tick().await;
        let mut data = data.write().await;
        data.refresh_staleness();
        let _ = event_tx.send(ServerEvent::NodesUpdated(data.node_statuses().clone()));
    }
}

/// Drain presentation commands as fast as they arrive. Owns the setup
/// barrier sender: the first `Ready` releases every gated task.
async fn command_task(
    data: Arc<RwLock<DataManager>>,
    setup_tx: watch::Sender<bool>,
    mut command_rx: mpsc::UnboundedReceiver<ServerCommand>,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
) -> Result<(), TaskExit> {
    while let Some(command) = command_rx.recv().await {
        match command {
            ServerCommand::Ready => {
                let _ = setup_tx.send(true);
            }
            ServerCommand::Shutdown => return Err(TaskExit::Stop),
            ServerCommand::NextCue => {
                let mut data = data.write().await;
                data.next_cue();
                let _ = event_tx.send(cue_changed(&data));
            }
            ServerCommand::PreviousCue => {
                let mut data = data.write().await;
                data.previous_cue();
                let _ = event_tx.send(cue_changed(&data));
            }
            ServerCommand::ReplaceTable { kind, table } => {
                let mut data = data.write().await;
                match data.replace_table(kind, table) {
                    Ok(()) => {
                        let _ = event_tx.send(cue_changed(&data));
                    }
                    Err(issue) => {
                        if issue.applied {
                            let _ = event_tx.send(cue_changed(&data));
                        }
                        let _ = event_tx.send(ServerEvent::FormatProblem(issue));
                    }
                }
            }
            ServerCommand::CommandLine(line) => {
                run_command_line(&data, &event_tx, &line).await;
            }
        }
    }
    // The presentation layer dropped its sender: same as being closed.
    Err(TaskExit::Stop)
}

async fn run_command_line(
    data: &Arc<RwLock<DataManager>>,
    event_tx: &mpsc::UnboundedSender<ServerEvent>,
    line: &str,
) {
    let command = match commands::parse(line) {
        Ok(command) => command,
        Err(message) => {
            feedback(event_tx, format!("Format Error: {}", message));
            return;
        }
    };
    match command {
        Command::GotoCue(group) => {
            let mut data = data.write().await;
            if data.warp_cue(group) {
                let _ = event_tx.send(cue_changed(&data));
            } else {
                feedback(event_tx, "Input Error: invalid cue group number");
            }
        }
        Command::Save(name) => {
            let data = data.read().await;
            match data.save_show(&name) {
                Ok(folder) => {
                    feedback(event_tx, format!("Saved show to {}", folder.display()));
                }
                Err(err) => feedback(event_tx, format!("could not save the show: {:#}", err)),
            }
        }
        Command::OpenSaved(name) => open_show(data, event_tx, &name, false).await,
        Command::OpenExample(name) => open_show(data, event_tx, &name, true).await,
        Command::List => feedback(event_tx, commands::help_text()),
        Command::Reset => {
            let mut data = data.write().await;
            match data.reset() {
                Ok(()) => {
                    let _ = event_tx.send(cue_changed(&data));
                    feedback(event_tx, "Reset back to the built-in tables");
                }
                Err(issue) => {
                    if issue.applied {
                        let _ = event_tx.send(cue_changed(&data));
                    }
                    let _ = event_tx.send(ServerEvent::FormatProblem(issue));
                }
            }
        }
    }
}

async fn open_show(
    data: &Arc<RwLock<DataManager>>,
    event_tx: &mpsc::UnboundedSender<ServerEvent>,
    name: &str,
    example: bool,
) {
    let mut data = data.write().await;
    match data.open_show(name, example) {
        Ok(None) => {
            let _ = event_tx.send(cue_changed(&data));
            feedback(event_tx, format!("Opened show {}", name));
        }
        Ok(Some(issue)) => {
            if issue.applied {
                let _ = event_tx.send(cue_changed(&data));
            }
            let _ = event_tx.send(ServerEvent::FormatProblem(issue));
        }
        Err(invalid) => feedback(event_tx, invalid.to_string()),
    }
}

fn feedback(event_tx: &mpsc::UnboundedSender<ServerEvent>, message: impl Into<String>) {
    let _ = event_tx.send(ServerEvent::CommandFeedback(message.into()));
}

fn cue_changed(data: &DataManager) -> ServerEvent {
    ServerEvent::CueChanged {
        group: data.current_group(),
        max_group: data.max_group(),
        current: data.current_cues().clone(),
        node_statuses: data.node_statuses().clone(),
    }
}
