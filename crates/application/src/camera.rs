use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use domain::camera::{CameraDevice, CaptureOptions};
use domain::{DeviceEvent, DeviceKind, HardwareError};

use crate::events::EventBus;

const COMMAND_CHANNEL_CAPACITY: usize = 16;

enum CameraCommand {
    Capture {
        options: CaptureOptions,
        reply: oneshot::Sender<Result<Bytes, HardwareError>>,
    },
    StartStream {
        interval: Duration,
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    StopStream {
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    /// Tick from the stream loop; replies whether a frame went out.
    StreamFrame {
        reply: oneshot::Sender<bool>,
    },
}

/// Drives a capture camera.
///
/// One-shot captures return the image and emit a `Capture` event; the
/// stream loop emits a `Frame` event per acquisition and gives up after a
/// configured number of consecutive failures.
pub struct CameraController {
    cmd_tx: mpsc::Sender<CameraCommand>,
    events: EventBus,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CameraController {
    /// Spawn the camera actor. The device is initialized in the
    /// background; an init failure emits an `Error` event and leaves the
    /// controller alive.
    pub fn new(device: Box<dyn CameraDevice>, max_consecutive_failures: u32) -> Self {
        let events = EventBus::new();
        let cancel_token = CancellationToken::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let actor = CameraActor {
            device,
            max_consecutive_failures,
            stream: None,
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

    /// Acquire one image.
    pub async fn capture(&self, options: CaptureOptions) -> Result<Bytes, HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(CameraCommand::Capture {
                options,
                reply: reply_tx,
            })
            .await
            .map_err(|_| disposed_error())?;
        reply_rx.await.map_err(|_| disposed_error())?
    }

    /// Start acquiring a frame every `interval` until stopped. Fails if a
    /// stream is already running.
    pub async fn start_stream(&self, interval: Duration) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            CameraCommand::StartStream {
                interval,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Stop the stream loop. A no-op when none is running.
    pub async fn stop_stream(&self) -> Result<(), HardwareError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(CameraCommand::StopStream { reply: reply_tx }, reply_rx)
            .await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Stop the actor, its stream loop and release the device. Idempotent;
    /// no events are emitted after this returns.
    pub async fn dispose(&self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(device = %DeviceKind::Camera, error = %e, "Camera actor ended abnormally");
            }
        }
    }

    async fn request(
        &self,
        command: CameraCommand,
        reply_rx: oneshot::Receiver<Result<(), HardwareError>>,
    ) -> Result<(), HardwareError> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| disposed_error())?;
        reply_rx.await.map_err(|_| disposed_error())?
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn disposed_error() -> HardwareError {
    HardwareError::unavailable(DeviceKind::Camera, "camera controller disposed")
}

struct StreamLoop {
    token: CancellationToken,
    task: JoinHandle<()>,
}

struct CameraActor {
    device: Box<dyn CameraDevice>,
    max_consecutive_failures: u32,
    stream: Option<StreamLoop>,
    events: EventBus,
    cmd_tx: mpsc::Sender<CameraCommand>,
    cmd_rx: mpsc::Receiver<CameraCommand>,
    cancel_token: CancellationToken,
}

impl CameraActor {
    async fn run(mut self) {
        match self.device.init().await {
            Ok(()) => {
                info!(device = %DeviceKind::Camera, "Camera ready");
                self.events.emit(DeviceEvent::ready(DeviceKind::Camera));
            }
            Err(e) => {
                warn!(device = %DeviceKind::Camera, error = %e, "Camera failed to initialize");
                self.events.emit(DeviceEvent::error(&e));
            }
        }

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(device = %DeviceKind::Camera, "Shutdown signal received");
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

        self.stop_stream_loop().await;
        if let Err(e) = self.device.shutdown().await {
            warn!(device = %DeviceKind::Camera, error = %e, "Error releasing camera");
        }
    }

    async fn handle_command(&mut self, cmd: CameraCommand) {
        match cmd {
            CameraCommand::Capture { options, reply } => {
                let result = self.acquire(&options).await;
                if let Ok(frame) = &result {
                    self.events.emit(DeviceEvent::capture(frame.clone()));
                }
                let _ = reply.send(result);
            }
            CameraCommand::StartStream { interval, reply } => {
                let _ = reply.send(self.start_stream_loop(interval).await);
            }
            CameraCommand::StopStream { reply } => {
                self.stop_stream_loop().await;
                let _ = reply.send(Ok(()));
            }
            CameraCommand::StreamFrame { reply } => {
                let delivered = match self.acquire(&CaptureOptions::default()).await {
                    Ok(frame) => {
                        self.events.emit(DeviceEvent::frame(frame));
                        true
                    }
                    Err(_) => false,
                };
                let _ = reply.send(delivered);
            }
        }
    }

    async fn acquire(&mut self, options: &CaptureOptions) -> Result<Bytes, HardwareError> {
        if !self.device.is_ready() {
            return Err(HardwareError::not_initialized(DeviceKind::Camera));
        }
        match self.device.capture(options).await {
            Ok(frame) => Ok(frame),
            Err(e) => {
                warn!(device = %DeviceKind::Camera, error = %e, "Capture failed");
                self.events.emit(DeviceEvent::error(&e));
                Err(e)
            }
        }
    }

    async fn start_stream_loop(&mut self, interval: Duration) -> Result<(), HardwareError> {
        // A loop that hit its failure cutoff has already exited on its own;
        // reap it so a new one can start.
        let running = self
            .stream
            .as_ref()
            .is_some_and(|stream| !stream.task.is_finished());
        if running {
            return Err(HardwareError::unavailable(
                DeviceKind::Camera,
                "stream already running",
            ));
        }
        if let Some(finished) = self.stream.take() {
            let _ = finished.task.await;
        }

        let token = self.cancel_token.child_token();
        let task = tokio::spawn(stream_loop(
            self.cmd_tx.clone(),
            self.events.clone(),
            token.clone(),
            interval,
            self.max_consecutive_failures,
        ));
        self.stream = Some(StreamLoop { token, task });
        info!(device = %DeviceKind::Camera, interval_ms = interval.as_millis() as u64, "Stream started");
        Ok(())
    }

    async fn stop_stream_loop(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.token.cancel();
            if let Err(e) = stream.task.await {
                warn!(device = %DeviceKind::Camera, error = %e, "Stream loop ended abnormally");
            }
            info!(device = %DeviceKind::Camera, "Stream stopped");
        }
    }
}

/// Acquire, wait, re-arm. Runs until cancelled or until too many
/// consecutive capture failures.
async fn stream_loop(
    cmd_tx: mpsc::Sender<CameraCommand>,
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
            sent = cmd_tx.send(CameraCommand::StreamFrame { reply: reply_tx }) => sent.is_ok(),
        };
        if !sent {
            return;
        }

        let delivered = tokio::select! {
            _ = token.cancelled() => return,
            reply = reply_rx => match reply {
                Ok(delivered) => delivered,
                Err(_) => return,
            },
        };

        if delivered {
            consecutive_failures = 0;
        } else {
            consecutive_failures += 1;
            if consecutive_failures >= max_consecutive_failures {
                error!(device = %DeviceKind::Camera, failures = consecutive_failures, "Stream giving up");
                events.emit(DeviceEvent::error(&HardwareError::unavailable(
                    DeviceKind::Camera,
                    format!(
                        "stream stopped after {consecutive_failures} consecutive capture failures"
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
