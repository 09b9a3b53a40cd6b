use std::time::Duration;

use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use domain::codec::scanner::ScanBuffer;
use domain::link::DeviceLink;
use domain::{DeviceEvent, DeviceKind, HardwareError};

use crate::events::EventBus;

const COMMAND_CHANNEL_CAPACITY: usize = 16;

enum ScannerCommand {
    Trigger {
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    StartContinuousScan {
        interval: Duration,
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    StopContinuousScan {
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    /// Tick from the continuous scan loop; replies whether the trigger
    /// command went out.
    LoopTrigger {
        reply: oneshot::Sender<bool>,
    },
}

/// Drives a serial barcode scanner over an exclusive link.
///
/// Inbound bytes are assembled into CR-terminated lines and emitted as
/// `Scan` events, however the scan was provoked. The continuous scan loop
/// runs as a cancellable child task and gives up after a configured number
/// of consecutive trigger failures.
pub struct ScannerController {
    cmd_tx: mpsc::Sender<ScannerCommand>,
    events: EventBus,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ScannerController {
    pub fn new(
        link: Box<dyn DeviceLink>,
        trigger_command: Vec<u8>,
        max_consecutive_failures: u32,
    ) -> Self {
        let events = EventBus::new();
        let cancel_token = CancellationToken::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let actor = ScannerActor {
            link,
            trigger_command,
            max_consecutive_failures,
            buffer: ScanBuffer::new(),
            scan_loop: None,
            events: events.clone(),
            cmd_tx: cmd_tx.clone(),
            cmd_rx,
            cancel_token: cancel_token.clone(),
        };
        let task = tokio::spawn(actor.run());

        Self {
            cmd_tx,
            events,
            cancel_token,
            task: Mutex::new(Some(task)),
        }
    }

    /// Send one trigger command to provoke a scan.
    pub async fn trigger(&self) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(ScannerCommand::Trigger { reply: reply_tx }, reply_rx)
            .await
    }

    /// Start triggering every `interval` until stopped. Fails if a scan
    /// loop is already running.
    pub async fn start_continuous_scan(&self, interval: Duration) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            ScannerCommand::StartContinuousScan {
                interval,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Stop the continuous scan loop. A no-op when none is running.
    pub async fn stop_continuous_scan(&self) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(ScannerCommand::StopContinuousScan { reply: reply_tx }, reply_rx)
            .await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Stop the actor, its scan loop and close the link. Idempotent; no
    /// events are emitted after this returns.
    pub async fn dispose(&self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(device = %DeviceKind::Scanner, error = %e, "Scanner actor ended abnormally");
            }
        }
    }

    async fn request(
        &self,
        command: ScannerCommand,
        reply_rx: oneshot::Receiver<Result<(), HardwareError>>,
    ) -> Result<(), HardwareError> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| disposed_error())?;
        reply_rx.await.map_err(|_| disposed_error())?
    }
}

impl Drop for ScannerController {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn disposed_error() -> HardwareError {
    HardwareError::unavailable(DeviceKind::Scanner, "scanner controller disposed")
}

struct ScanLoop {
    token: CancellationToken,
    task: JoinHandle<()>,
}

struct ScannerActor {
    link: Box<dyn DeviceLink>,
    trigger_command: Vec<u8>,
    max_consecutive_failures: u32,
    buffer: ScanBuffer,
    scan_loop: Option<ScanLoop>,
    events: EventBus,
    cmd_tx: mpsc::Sender<ScannerCommand>,
    cmd_rx: mpsc::Receiver<ScannerCommand>,
    cancel_token: CancellationToken,
}

impl ScannerActor {
    async fn run(mut self) {
        match self.link.open().await {
            Ok(()) => {
                info!(device = %DeviceKind::Scanner, transport = self.link.transport(), "Scanner link ready");
                self.events.emit(DeviceEvent::ready(DeviceKind::Scanner));
            }
            Err(e) => {
                warn!(device = %DeviceKind::Scanner, error = %e, "Scanner link failed to open");
                self.events.emit(DeviceEvent::error(&e));
            }
        }

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(device = %DeviceKind::Scanner, "Shutdown signal received");
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
                        Ok(Some(bytes)) => {
                            for barcode in self.buffer.push(&bytes) {
                                info!(device = %DeviceKind::Scanner, barcode = %barcode, "Barcode scanned");
                                self.events.emit(DeviceEvent::scan(barcode));
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(device = %DeviceKind::Scanner, error = %e, "Scanner read failed");
                            self.events.emit(DeviceEvent::error(&e));
                        }
                    }
                }
            }
        }

        self.stop_scan_loop().await;
        if let Err(e) = self.link.close().await {
            warn!(device = %DeviceKind::Scanner, error = %e, "Error closing scanner link");
        }
    }

    async fn handle_command(&mut self, cmd: ScannerCommand) {
        match cmd {
            ScannerCommand::Trigger { reply } => {
                let _ = reply.send(self.transmit_trigger().await);
            }
            ScannerCommand::StartContinuousScan { interval, reply } => {
                let _ = reply.send(self.start_scan_loop(interval).await);
            }
            ScannerCommand::StopContinuousScan { reply } => {
                self.stop_scan_loop().await;
                let _ = reply.send(Ok(()));
            }
            ScannerCommand::LoopTrigger { reply } => {
                let _ = reply.send(self.transmit_trigger().await.is_ok());
            }
        }
    }

    async fn transmit_trigger(&mut self) -> Result<(), HardwareError> {
        if !self.link.is_ready() {
            return Err(HardwareError::not_initialized(DeviceKind::Scanner));
        }
        if let Err(e) = self.link.write(&self.trigger_command).await {
            warn!(device = %DeviceKind::Scanner, error = %e, "Scanner trigger write failed");
            self.events.emit(DeviceEvent::error(&e));
            return Err(e);
        }
        Ok(())
    }

    async fn start_scan_loop(&mut self, interval: Duration) -> Result<(), HardwareError> {
        // A loop that hit its failure cutoff has already exited on its own;
        // reap it so a new one can start.
        let running = self
            .scan_loop
            .as_ref()
            .is_some_and(|scan| !scan.task.is_finished());
        if running {
            return Err(HardwareError::unavailable(
                DeviceKind::Scanner,
                "continuous scan already running",
            ));
        }
        if let Some(finished) = self.scan_loop.take() {
            let _ = finished.task.await;
        }

        let token = self.cancel_token.child_token();
        let task = tokio::spawn(continuous_scan_loop(
            self.cmd_tx.clone(),
            self.events.clone(),
            token.clone(),
            interval,
            self.max_consecutive_failures,
        ));
        self.scan_loop = Some(ScanLoop { token, task });
        info!(device = %DeviceKind::Scanner, interval_ms = interval.as_millis() as u64, "Continuous scan started");
        Ok(())
    }

    async fn stop_scan_loop(&mut self) {
        if let Some(scan) = self.scan_loop.take() {
            scan.token.cancel();
            if let Err(e) = scan.task.await {
                warn!(device = %DeviceKind::Scanner, error = %e, "Scan loop ended abnormally");
            }
            info!(device = %DeviceKind::Scanner, "Continuous scan stopped");
        }
    }
}

/// Trigger, wait, re-arm. Runs until cancelled or until too many
/// consecutive trigger failures.
async fn continuous_scan_loop(
    cmd_tx: mpsc::Sender<ScannerCommand>,
    events: EventBus,
    token: CancellationToken,
    interval: Duration,
    max_consecutive_failures: u32,
) {
    let mut consecutive_failures: u32 = 0;
    loop {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = tokio::select! {
            _ = token.cancelled() => return,
            sent = cmd_tx.send(ScannerCommand::LoopTrigger { reply: reply_tx }) => sent.is_ok(),
        };
        if !sent {
            return;
        }

        let triggered = tokio::select! {
            _ = token.cancelled() => return,
            reply = reply_rx => match reply {
                Ok(triggered) => triggered,
                Err(_) => return,
            },
        };

        if triggered {
            consecutive_failures = 0;
        } else {
            consecutive_failures += 1;
            if consecutive_failures >= max_consecutive_failures {
                error!(device = %DeviceKind::Scanner, failures = consecutive_failures, "Continuous scan giving up");
                events.emit(DeviceEvent::error(&HardwareError::unavailable(
                    DeviceKind::Scanner,
                    format!(
                        "continuous scan stopped after {consecutive_failures} consecutive trigger failures"
                    ),
                )));
                return;
            }
        }

        tokio::select! {
            _ = token.cancelled() => return,
            _ = sleep(interval) => {}
        }
    }
}
