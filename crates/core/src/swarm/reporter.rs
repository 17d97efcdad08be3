//! # Run Reporter
//!
//! Single write path for everything a run makes observable. Local channels
//! are authoritative and receive every record first, in emission order; the
//! remote store is a best-effort mirror whose failures go to the developer
//! channel only and never affect the run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::project::{Agent, LogEntry, LogKind, ProjectPatch};
use crate::store::DocumentStore;
use crate::swarm::pipeline::Stage;

/// Local (authoritative) sinks for one run.
pub struct RunChannels {
    pub log_tx: mpsc::Sender<LogEntry>,
    pub patch_tx: mpsc::Sender<ProjectPatch>,
    pub stage_tx: mpsc::Sender<Stage>,
}

/// Receiving ends of [`RunChannels`].
pub struct RunReceivers {
    pub log_rx: mpsc::Receiver<LogEntry>,
    pub patch_rx: mpsc::Receiver<ProjectPatch>,
    pub stage_rx: mpsc::Receiver<Stage>,
}

impl RunChannels {
    /// Channel set sized for a full run's traffic, with the receivers.
    pub fn new() -> (Self, RunReceivers) {
        let (log_tx, log_rx) = mpsc::channel(256);
        let (patch_tx, patch_rx) = mpsc::channel(64);
        let (stage_tx, stage_rx) = mpsc::channel(16);
        (
            Self {
                log_tx,
                patch_tx,
                stage_tx,
            },
            RunReceivers {
                log_rx,
                patch_rx,
                stage_rx,
            },
        )
    }
}

pub struct RunReporter {
    project_id: String,
    next_log_id: AtomicU64,
    channels: RunChannels,
    mirror: Option<Arc<dyn DocumentStore>>,
}

impl RunReporter {
    pub fn new(
        project_id: impl Into<String>,
        channels: RunChannels,
        mirror: Option<Arc<dyn DocumentStore>>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            next_log_id: AtomicU64::new(0),
            channels,
            mirror,
        }
    }

    /// Emit one log entry: UI first, then the store mirror.
    ///
    /// The mirror write is awaited in place so a run stays strictly
    /// sequential, but its result only ever reaches `tracing`.
    pub async fn log(&self, agent: Agent, kind: LogKind, message: impl Into<String>) {
        let entry = LogEntry {
            id: self.next_log_id.fetch_add(1, Ordering::SeqCst),
            agent,
            message: message.into(),
            timestamp: Utc::now(),
            kind,
        };

        let _ = self.channels.log_tx.send(entry.clone()).await;

        if let Some(store) = &self.mirror {
            if let Err(e) = store.append_log(&self.project_id, &entry).await {
                tracing::warn!(
                    project = %self.project_id,
                    error = %e,
                    "log mirror write failed, continuing local-only"
                );
            }
        }
    }

    /// Announce the stage the run just entered. Local-only: stage position
    /// is derived state, the store persists status and verdict instead.
    pub async fn stage(&self, stage: Stage) {
        let _ = self.channels.stage_tx.send(stage).await;
    }

    /// Emit a partial project update: UI first, then the store mirror.
    pub async fn update(&self, patch: ProjectPatch) {
        let _ = self.channels.patch_tx.send(patch.clone()).await;

        if let Some(store) = &self.mirror {
            if let Err(e) = store.update(&self.project_id, &patch).await {
                tracing::warn!(
                    project = %self.project_id,
                    error = %e,
                    "project mirror update failed, continuing local-only"
                );
            }
        }
    }
}
