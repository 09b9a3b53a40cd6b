use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use domain::codec::printer::{self, PrintOptions};
use domain::link::DeviceLink;
use domain::{DeviceEvent, DeviceKind, HardwareError};

use crate::events::EventBus;

const COMMAND_CHANNEL_CAPACITY: usize = 16;

enum PrinterCommand {
    Print {
        text: String,
        options: PrintOptions,
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    PrintBarcode {
        data: String,
        height: u8,
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    Cut {
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    Feed {
        lines: u8,
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
}

/// Drives an ESC/POS receipt printer over an exclusive link.
///
/// Every job re-encodes its own formatting, so one call never inherits
/// styling from the previous one. All calls reject while the link is not
/// ready.
pub struct PrinterController {
    cmd_tx: mpsc::Sender<PrinterCommand>,
    events: EventBus,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PrinterController {
    pub fn new(link: Box<dyn DeviceLink>) -> Self {
        let events = EventBus::new();
        let cancel_token = CancellationToken::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let actor = PrinterActor {
            link,
            events: events.clone(),
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

    /// Print text with per-job formatting.
    pub async fn print(&self, text: &str, options: PrintOptions) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            PrinterCommand::Print {
                text: text.to_string(),
                options,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Print a CODE39 barcode at the given height in dots.
    pub async fn print_barcode(&self, data: &str, height: u8) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            PrinterCommand::PrintBarcode {
                data: data.to_string(),
                height,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Full paper cut.
    pub async fn cut(&self) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(PrinterCommand::Cut { reply: reply_tx }, reply_rx)
            .await
    }

    /// Feed blank lines.
    pub async fn feed(&self, lines: u8) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            PrinterCommand::Feed {
                lines,
                reply: reply_tx,
            },
            reply_rx,
        )
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
                warn!(device = %DeviceKind::Printer, error = %e, "Printer actor ended abnormally");
            }
        }
    }

    async fn request(
        &self,
        command: PrinterCommand,
        reply_rx: oneshot::Receiver<Result<(), HardwareError>>,
    ) -> Result<(), HardwareError> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| disposed_error())?;
        reply_rx.await.map_err(|_| disposed_error())?
    }
}

impl Drop for PrinterController {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn disposed_error() -> HardwareError {
    HardwareError::unavailable(DeviceKind::Printer, "printer controller disposed")
}

struct PrinterActor {
    link: Box<dyn DeviceLink>,
    events: EventBus,
    cmd_rx: mpsc::Receiver<PrinterCommand>,
    cancel_token: CancellationToken,
}

impl PrinterActor {
    async fn run(mut self) {
        match self.link.open().await {
            Ok(()) => {
                info!(device = %DeviceKind::Printer, transport = self.link.transport(), "🖨️ Printer link ready");
                self.events.emit(DeviceEvent::ready(DeviceKind::Printer));
            }
            Err(e) => {
                warn!(device = %DeviceKind::Printer, error = %e, "Printer link failed to open");
                self.events.emit(DeviceEvent::error(&e));
            }
        }

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(device = %DeviceKind::Printer, "Shutdown signal received");
                    break;
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
            }
        }

        if let Err(e) = self.link.close().await {
            warn!(device = %DeviceKind::Printer, error = %e, "Error closing printer link");
        }
    }

    async fn handle_command(&mut self, cmd: PrinterCommand) {
        match cmd {
            PrinterCommand::Print {
                text,
                options,
                reply,
            } => {
                let payload = printer::encode_print(&text, &options);
                let _ = reply.send(self.transmit(&payload).await);
            }
            PrinterCommand::PrintBarcode {
                data,
                height,
                reply,
            } => {
                let payload = printer::encode_barcode(&data, height);
                let _ = reply.send(self.transmit(&payload).await);
            }
            PrinterCommand::Cut { reply } => {
                let _ = reply.send(self.transmit(&printer::encode_cut()).await);
            }
            PrinterCommand::Feed { lines, reply } => {
                let _ = reply.send(self.transmit(&printer::encode_feed(lines)).await);
            }
        }
    }

    async fn transmit(&mut self, payload: &[u8]) -> Result<(), HardwareError> {
        if !self.link.is_ready() {
            return Err(HardwareError::not_initialized(DeviceKind::Printer));
        }
        if let Err(e) = self.link.write(payload).await {
            error!(device = %DeviceKind::Printer, error = %e, "❌ Printer write failed");
            self.events.emit(DeviceEvent::error(&e));
            return Err(e);
        }
        debug!(device = %DeviceKind::Printer, bytes = payload.len(), "Print data transmitted");
        Ok(())
    }
}
