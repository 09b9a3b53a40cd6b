use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use domain::codec::gate::{self, GateCommandSet, GateResponse};
use domain::link::DeviceLink;
use domain::{DeviceEvent, DeviceKind, HardwareError};

use crate::events::EventBus;

const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Last state reported by the gate hardware.
///
/// The gate acks asynchronously, so this is the most recent confirmation,
/// not a live reading; the ack requested by `status()` refreshes the value
/// for later calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateStatus {
    pub is_open: bool,
    pub last_transition_at: Option<DateTime<Utc>>,
}

enum GateCommand {
    Open {
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    Close {
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    Status {
        reply: oneshot::Sender<Result<GateStatus, HardwareError>>,
    },
}

/// Drives a boom gate over an exclusive link.
///
/// Commands resolve once their bytes were handed to the link. Actual gate
/// movement is only ever reported through acks on the receive side, which
/// surface as `StateChanged` events.
pub struct GateController {
    cmd_tx: mpsc::Sender<GateCommand>,
    events: EventBus,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl GateController {
    /// Spawn the gate actor. The link is opened in the background; an open
    /// failure emits an `Error` event and leaves the controller alive.
    pub fn new(link: Box<dyn DeviceLink>, commands: GateCommandSet) -> Self {
        let events = EventBus::new();
        let cancel_token = CancellationToken::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let actor = GateActor {
            link,
            commands,
            events: events.clone(),
            cmd_rx,
            cancel_token: cancel_token.clone(),
            is_open: false,
            last_transition_at: None,
        };
        let task = tokio::spawn(actor.run());

        Self {
            cmd_tx,
            events,
            cancel_token,
            task: Mutex::new(Some(task)),
        }
    }

    /// Send the open command.
    pub async fn open(&self) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(GateCommand::Open { reply: reply_tx }, reply_rx)
            .await
    }

    /// Send the close command.
    pub async fn close(&self) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(GateCommand::Close { reply: reply_tx }, reply_rx)
            .await
    }

    /// Request a status refresh and return the cached state.
    ///
    /// The refresh is fire-and-forget: the reply carries the state as of
    /// the last ack, and the requested ack lands later as `StateChanged`.
    pub async fn status(&self) -> Result<GateStatus, HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(GateCommand::Status { reply: reply_tx }, reply_rx)
            .await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Stop the actor and close the link. Idempotent; no events are
    /// emitted after this returns.
    pub async fn dispose(&self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(device = %DeviceKind::Gate, error = %e, "Gate actor ended abnormally");
            }
        }
    }

    async fn request<T>(
        &self,
        command: GateCommand,
        reply_rx: oneshot::Receiver<Result<T, HardwareError>>,
    ) -> Result<T, HardwareError> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| disposed_error())?;
        reply_rx.await.map_err(|_| disposed_error())?
    }
}

impl Drop for GateController {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn disposed_error() -> HardwareError {
    HardwareError::unavailable(DeviceKind::Gate, "gate controller disposed")
}

struct GateActor {
    link: Box<dyn DeviceLink>,
    commands: GateCommandSet,
    events: EventBus,
    cmd_rx: mpsc::Receiver<GateCommand>,
    cancel_token: CancellationToken,
    is_open: bool,
    last_transition_at: Option<DateTime<Utc>>,
}

impl GateActor {
    async fn run(mut self) {
        match self.link.open().await {
            Ok(()) => {
                info!(device = %DeviceKind::Gate, transport = self.link.transport(), "Gate link ready");
                self.events.emit(DeviceEvent::ready(DeviceKind::Gate));
            }
            Err(e) => {
                warn!(device = %DeviceKind::Gate, error = %e, "Gate link failed to open");
                self.events.emit(DeviceEvent::error(&e));
            }
        }

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(device = %DeviceKind::Gate, "Shutdown signal received");
                    break;
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                chunk = self.link.read_chunk(), if self.link.is_ready() => {
                    match chunk {
                        Ok(Some(bytes)) => self.process_chunk(&bytes),
                        Ok(None) => {}
                        Err(e) => {
                            warn!(device = %DeviceKind::Gate, error = %e, "Gate read failed");
                            self.events.emit(DeviceEvent::error(&e));
                        }
                    }
                }
            }
        }

        if let Err(e) = self.link.close().await {
            warn!(device = %DeviceKind::Gate, error = %e, "Error closing gate link");
        }
    }

    async fn handle_command(&mut self, cmd: GateCommand) {
        match cmd {
            GateCommand::Open { reply } => {
                let command = self.commands.open.clone();
                let _ = reply.send(self.transmit(&command).await);
            }
            GateCommand::Close { reply } => {
                let command = self.commands.close.clone();
                let _ = reply.send(self.transmit(&command).await);
            }
            GateCommand::Status { reply } => {
                let command = self.commands.status.clone();
                let result = self.transmit(&command).await.map(|()| GateStatus {
                    is_open: self.is_open,
                    last_transition_at: self.last_transition_at,
                });
                let _ = reply.send(result);
            }
        }
    }

    async fn transmit(&mut self, command: &[u8]) -> Result<(), HardwareError> {
        if !self.link.is_ready() {
            return Err(HardwareError::not_initialized(DeviceKind::Gate));
        }
        if let Err(e) = self.link.write(command).await {
            warn!(device = %DeviceKind::Gate, error = %e, "Gate write failed");
            self.events.emit(DeviceEvent::error(&e));
            return Err(e);
        }
        Ok(())
    }

    fn process_chunk(&mut self, bytes: &[u8]) {
        // Unrecognized bytes are collected so a noisy line produces one
        // data event per chunk instead of one per byte.
        let mut unrecognized = Vec::new();
        for &byte in bytes {
            match gate::decode(byte) {
                GateResponse::OpenConfirmed => self.confirm_transition(true),
                GateResponse::CloseConfirmed => self.confirm_transition(false),
                GateResponse::Fault => {
                    let error = HardwareError::protocol(
                        DeviceKind::Gate,
                        "gate hardware reported a fault",
                        Some(gate::ACK_FAULT),
                    );
                    warn!(device = %DeviceKind::Gate, "Gate hardware reported a fault");
                    self.events.emit(DeviceEvent::error(&error));
                }
                GateResponse::Other(other) => unrecognized.push(other),
            }
        }
        if !unrecognized.is_empty() {
            self.events
                .emit(DeviceEvent::data(DeviceKind::Gate, Bytes::from(unrecognized)));
        }
    }

    fn confirm_transition(&mut self, is_open: bool) {
        self.is_open = is_open;
        self.last_transition_at = Some(Utc::now());
        info!(device = %DeviceKind::Gate, is_open, "Gate ack received");
        self.events.emit(DeviceEvent::state_changed(is_open));
    }
}
