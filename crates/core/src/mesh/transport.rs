use std::collections::HashMap;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec;
use crate::mesh::daemon::MeshDaemon;

/// The five logical channels of the cueing protocol and their daemon ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Server liveness timestamps.
    Heartbeat,
    /// Node identity/ownership table.
    Attributes,
    /// Cue-state to node-state vocabulary.
    CueToNode,
    /// Snapshot of the current cue group.
    CurrentCues,
    /// Per-node status reports flowing back to the server.
    NodeReport,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Heartbeat,
        Channel::Attributes,
        Channel::CueToNode,
        Channel::CurrentCues,
        Channel::NodeReport,
    ];

    pub fn id(self) -> u8 {
        match self {
            Channel::Heartbeat => 65,
            Channel::Attributes => 68,
            Channel::CueToNode => 69,
            Channel::CurrentCues => 70,
            Channel::NodeReport => 71,
        }
    }
}

/// Typed publish/fetch layer over the mesh daemon. Sends are fire and
/// forget; receives absorb daemon failures as "no data currently available"
/// since the broadcast medium is lossy by design.
pub struct MeshTransport {
    daemon: Box<dyn MeshDaemon>,
    last_sent: Mutex<HashMap<Channel, Vec<u8>>>,
}

impl MeshTransport {
    pub fn new(daemon: Box<dyn MeshDaemon>) -> Self {
        Self {
            daemon,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Encode and publish a value. No delivery confirmation exists; a failed
    /// publish is only visible at debug level and the next scheduled
    /// broadcast retries naturally.
    pub async fn send<T: Serialize>(&self, channel: Channel, value: &T) {
        let payload = codec::encode(value);
        self.last_sent.lock().insert(channel, payload.clone());
        if let Err(err) = self.daemon.publish(channel.id(), &payload).await {
            log::debug!("publish on {:?} failed: {:#}", channel, err);
        }
    }

    /// Fetch and decode everything currently published on a channel.
    /// `None` means no records decoded, whether because the channel is empty
    /// or because the daemon call failed.
    pub async fn receive<T: DeserializeOwned>(&self, channel: Channel) -> Option<Vec<T>> {
        let blob = match self.daemon.fetch_all(channel.id()).await {
            Ok(blob) => blob,
            Err(err) => {
                log::debug!("fetch on {:?} failed: {:#}", channel, err);
                return None;
            }
        };
        let records = codec::decode(&blob);
        if records.is_empty() {
            None
        } else {
            Some(records)
        }
    }

    /// Fetch a channel expected to carry a single record. Returns the record
    /// only when exactly one decoded; callers wanting a batch use `receive`.
    pub async fn receive_one<T: DeserializeOwned>(&self, channel: Channel) -> Option<T> {
        let mut records: Vec<T> = self.receive(channel).await?;
        if records.len() == 1 {
            records.pop()
        } else {
            None
        }
    }

    /// The payload most recently sent on a channel, for introspection.
    pub fn last_sent(&self, channel: Channel) -> Option<Vec<u8>> {
        self.last_sent.lock().get(&channel).cloned()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::mesh::daemon::LoopbackDaemon;
    use crate::node_status::NodeReport;

    struct DeadDaemon;

    #[async_trait]
    impl MeshDaemon for DeadDaemon {
        async fn publish(&self, _channel_id: u8, _payload: &[u8]) -> Result<()> {
            Err(anyhow!("daemon not running"))
        }

        async fn fetch_all(&self, _channel_id: u8) -> Result<Vec<u8>> {
            Err(anyhow!("daemon not running"))
        }
    }

    fn report(cue_number: &str) -> NodeReport {
        NodeReport {
            cue_number: cue_number.to_string(),
            node_number: "1".to_string(),
            node_state: "Ready".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_receive_on_empty_channel_is_none() {
        let transport = MeshTransport::new(Box::new(LoopbackDaemon::new()));
        let received: Option<Vec<NodeReport>> = transport.receive(Channel::NodeReport).await;
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_receive_one_returns_the_single_record() {
        let transport = MeshTransport::new(Box::new(LoopbackDaemon::new()));
        let sent = report("SL1");
        transport.send(Channel::NodeReport, &sent).await;

        let received: NodeReport = transport.receive_one(Channel::NodeReport).await.unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn test_receive_returns_all_records_in_order() {
        let transport = MeshTransport::new(Box::new(LoopbackDaemon::new()));
        transport.send(Channel::NodeReport, &report("SL1")).await;
        transport.send(Channel::NodeReport, &report("SR1")).await;

        let received: Vec<NodeReport> = transport.receive(Channel::NodeReport).await.unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].cue_number, "SL1");
        assert_eq!(received[1].cue_number, "SR1");

        // Singular access is unavailable once more than one record exists.
        let one: Option<NodeReport> = transport.receive_one(Channel::NodeReport).await;
        assert!(one.is_none());
    }

    #[tokio::test]
    async fn test_daemon_failure_is_silent() {
        let transport = MeshTransport::new(Box::new(DeadDaemon));
        transport.send(Channel::Heartbeat, &"tick").await;

        let received: Option<Vec<NodeReport>> = transport.receive(Channel::NodeReport).await;
        assert!(received.is_none());
        // The last-sent cache still records the attempt.
        assert!(transport.last_sent(Channel::Heartbeat).is_some());
    }

    #[tokio::test]
    async fn test_channel_ids_match_the_wire_protocol() {
        for (channel, id) in Channel::ALL.iter().zip([65u8, 68, 69, 70, 71]) {
            assert_eq!(channel.id(), id);
        }
    }
}
