//! Worker Link
//!
//! The session's single outbound channel to the compute worker. Sending is
//! fire-and-forget: the effect of a command is only ever observed through the
//! events that come back.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use lumen_core::{WorkerCommand, WorkerEvent};
use lumen_llm::{ModelBackend, WorkerChannels, WorkerOptions, WorkerRuntime};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

/// Command side of a worker connection.
#[derive(Debug, Clone)]
pub struct WorkerLink {
    commands: mpsc::UnboundedSender<WorkerCommand>,
}

impl WorkerLink {
    pub fn new(commands: mpsc::UnboundedSender<WorkerCommand>) -> Self {
        Self { commands }
    }

    /// Post a command to the worker.
    pub fn send(&self, command: WorkerCommand) -> AppResult<()> {
        let kind = command.kind();
        match self.commands.send(command) {
            Ok(()) => {
                debug!("[WorkerLink] Sent {} command", kind);
                Ok(())
            }
            Err(_) => {
                error!("[WorkerLink] Worker is gone, {} command dropped", kind);
                Err(AppError::worker(format!(
                    "worker is not running, could not send {}",
                    kind
                )))
            }
        }
    }
}

/// A freshly spawned worker, split into the parts the session needs.
#[derive(Debug)]
pub struct SpawnedWorker {
    pub link: WorkerLink,
    pub events: mpsc::Receiver<WorkerEvent>,
    pub task: JoinHandle<()>,
}

/// Spawn `backend` as the compute worker, sized and tuned from `config`.
pub fn spawn_worker<B>(backend: B, config: &AppConfig) -> SpawnedWorker
where
    B: ModelBackend + 'static,
{
    let options = WorkerOptions {
        event_capacity: config.event_queue_capacity,
        reasoning_end_marker: config.reasoning_end_marker.clone(),
    };
    let WorkerChannels {
        commands,
        events,
        handle,
    } = WorkerRuntime::spawn(backend, options);

    SpawnedWorker {
        link: WorkerLink::new(commands),
        events,
        task: handle,
    }
}
