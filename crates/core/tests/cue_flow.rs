use chrono::Utc;
use meshcue_core::messages::{ServerCommand, ServerEvent};
use meshcue_core::{
    codec, Channel, CueServer, DataManager, LoopbackDaemon, MeshTransport, NodeReport, RawTable,
    ServerConfig, CUE_COLUMNS,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

fn config(temp_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        data_dir: temp_dir.path().join("data"),
        shows_dir: temp_dir.path().join("shows"),
        examples_dir: temp_dir.path().join("example_shows"),
        ..ServerConfig::default()
    }
}

#[test]
fn full_navigation_cycle_returns_to_the_start() {
    let temp_dir = TempDir::new().unwrap();
    let mut data = DataManager::new(&config(&temp_dir));

    let start = data.current_group();
    let steps = data.max_group() + 1;
    for _ in 0..steps {
        data.next_cue();
    }
    assert_eq!(data.current_group(), start);
    for _ in 0..steps {
        data.previous_cue();
    }
    assert_eq!(data.current_group(), start);
}

#[test]
fn operator_edit_round_trips_through_save_and_open() {
    let temp_dir = TempDir::new().unwrap();
    let mut data = DataManager::new(&config(&temp_dir));

    let mut raw = RawTable::new(CUE_COLUMNS.to_vec());
    raw.push_row(vec!["SL1", "on go", "strike", "Fire"]);
    raw.push_row(vec!["", "", "", ""]);
    raw.push_row(vec!["SR1", "on go", "strike", "Fire"]);
    data.replace_cues(raw).unwrap();
    assert_eq!(data.max_group(), 1);

    data.save_show("matinee").unwrap();
    data.reset().unwrap();
    assert_eq!(data.max_group(), 3);

    let outcome = data.open_show("matinee", false).unwrap();
    assert!(outcome.is_none());
    assert_eq!(data.max_group(), 1);
    assert_eq!(data.current_group(), 0);
}

#[tokio::test]
async fn transport_carries_domain_values_end_to_end() {
    let transport = MeshTransport::new(Box::new(LoopbackDaemon::new()));

    let report = NodeReport {
        cue_number: "SL1".to_string(),
        node_number: "1".to_string(),
        node_state: "Ready".to_string(),
        timestamp: Utc::now(),
    };
    transport.send(Channel::NodeReport, &report).await;

    let received: NodeReport = transport.receive_one(Channel::NodeReport).await.unwrap();
    assert_eq!(received, report);
    assert_eq!(
        transport.last_sent(Channel::NodeReport),
        Some(codec::encode(&report))
    );
}

#[tokio::test]
async fn server_runs_a_session_and_stops_on_shutdown() {
    let temp_dir = TempDir::new().unwrap();
    let server = CueServer::new(&config(&temp_dir), Box::new(LoopbackDaemon::new()));
    let data = server.data();

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    command_tx.send(ServerCommand::Ready).unwrap();
    command_tx
        .send(ServerCommand::CommandLine("/goto cue 1".to_string()))
        .unwrap();
    command_tx.send(ServerCommand::Shutdown).unwrap();

    server.run(command_rx, event_tx).await.unwrap();

    assert_eq!(data.read().await.current_group(), 1);
    let mut saw_shutdown = false;
    while let Ok(event) = event_rx.try_recv() {
        saw_shutdown = matches!(event, ServerEvent::ShutdownComplete);
    }
    assert!(saw_shutdown);
}
