use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::codec;

/// The mesh broadcast daemon's two primitives: publish bytes under a channel
/// id, and fetch everything currently published under a channel id. The
/// daemon is best-effort by design; callers treat failures as "no data".
#[async_trait]
pub trait MeshDaemon: Send + Sync {
    async fn publish(&self, channel_id: u8, payload: &[u8]) -> Result<()>;
    async fn fetch_all(&self, channel_id: u8) -> Result<Vec<u8>>;
}

/// The real daemon, reached by invoking its CLI: payload piped to
/// `<binary> -s <id>`, responses read from `<binary> -r <id>`. Every call is
/// bounded by a timeout so a wedged daemon cannot stall the scheduler.
pub struct AlfredDaemon {
    binary: String,
    timeout: Duration,
}

impl AlfredDaemon {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MeshDaemon for AlfredDaemon {
    async fn publish(&self, channel_id: u8, payload: &[u8]) -> Result<()> {
        let mut child = Command::new(&self.binary)
            .arg("-s")
            .arg(channel_id.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawning {} -s {}", self.binary, channel_id))?;

        let mut stdin = child.stdin.take().context("daemon stdin unavailable")?;
        let publish = async {
            stdin.write_all(payload).await?;
            stdin.shutdown().await?;
            drop(stdin);
            child.wait().await
        };
        match tokio::time::timeout(self.timeout, publish).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(anyhow!("daemon publish exited with {}", status)),
            Ok(Err(err)) => Err(err).context("waiting for daemon publish"),
            Err(_) => {
                let _ = child.start_kill();
                Err(anyhow!("daemon publish timed out"))
            }
        }
    }

    async fn fetch_all(&self, channel_id: u8) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.binary);
        command
            .arg("-r")
            .arg(channel_id.to_string())
            .stdin(Stdio::null());
        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) if output.status.success() => Ok(output.stdout),
            Ok(Ok(output)) => Err(anyhow!("daemon fetch exited with {}", output.status)),
            Ok(Err(err)) => Err(err).context("running daemon fetch"),
            Err(_) => Err(anyhow!("daemon fetch timed out")),
        }
    }
}

/// In-process daemon that stores published payloads per channel and replays
/// them in the daemon's wire framing. Used by tests and by dry runs on a
/// machine without the mesh daemon installed.
#[derive(Default)]
pub struct LoopbackDaemon {
    channels: Mutex<HashMap<u8, Vec<Vec<u8>>>>,
}

impl LoopbackDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self, channel_id: u8) {
        self.channels.lock().remove(&channel_id);
    }
}

#[async_trait]
impl MeshDaemon for LoopbackDaemon {
    async fn publish(&self, channel_id: u8, payload: &[u8]) -> Result<()> {
        self.channels
            .lock()
            .entry(channel_id)
            .or_default()
            .push(payload.to_vec());
        Ok(())
    }

    async fn fetch_all(&self, channel_id: u8) -> Result<Vec<u8>> {
        let channels = self.channels.lock();
        let mut out = Vec::new();
        for payload in channels.get(&channel_id).into_iter().flatten() {
            out.extend_from_slice(b"{ \"00:00:00:00:00:00\", \"");
            out.extend_from_slice(&codec::escape(&codec::escape(payload)));
            out.extend_from_slice(b"\" },\n");
        }
        Ok(out)
    }
}
