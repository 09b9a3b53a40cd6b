use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use domain::link::{ConnectionState, DeviceLink};
use domain::{DeviceKind, HardwareError};
use tokio::sync::{Mutex, mpsc};

const READ_POLL: Duration = Duration::from_millis(50);

/// In-memory device link for tests and bench mode
///
/// Inbound bytes are scripted through the handle; outbound writes are
/// recorded for assertion.
pub struct MockLink {
    device: DeviceKind,
    state: ConnectionState,
    inbound: mpsc::UnboundedReceiver<Bytes>,
    written: Arc<Mutex<Vec<u8>>>,
    fail_open: bool,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

/// Test-side handle to a MockLink
#[derive(Clone)]
pub struct MockLinkHandle {
    inbound: mpsc::UnboundedSender<Bytes>,
    written: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl MockLink {
    pub fn new(device: DeviceKind) -> (Self, MockLinkHandle) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let fail_writes = Arc::new(AtomicBool::new(false));
        let fail_reads = Arc::new(AtomicBool::new(false));

        let link = Self {
            device,
            state: ConnectionState::default(),
            inbound: inbound_rx,
            written: written.clone(),
            fail_open: false,
            fail_writes: fail_writes.clone(),
            fail_reads: fail_reads.clone(),
        };
        let handle = MockLinkHandle {
            inbound: inbound_tx,
            written,
            fail_writes,
            fail_reads,
        };
        (link, handle)
    }

    /// A link whose open() always fails
    pub fn failing_open(device: DeviceKind) -> (Self, MockLinkHandle) {
        let (mut link, handle) = Self::new(device);
        link.fail_open = true;
        (link, handle)
    }

    /// A link with no scripted side, for running a lane without hardware
    pub fn detached(device: DeviceKind) -> Self {
        let (link, _handle) = Self::new(device);
        link
    }
}

impl MockLinkHandle {
    /// Script one inbound chunk
    pub fn push_bytes(&self, bytes: &[u8]) {
        // Receiver gone means the link was dropped; tests surface that via
        // their own assertions.
        let _ = self.inbound.send(Bytes::copy_from_slice(bytes));
    }

    /// Snapshot of everything written to the device so far
    pub async fn written(&self) -> Vec<u8> {
        self.written.lock().await.clone()
    }

    pub async fn clear_written(&self) {
        self.written.lock().await.clear();
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceLink for MockLink {
    async fn open(&mut self) -> Result<(), HardwareError> {
        if self.state.is_ready() {
            return Ok(());
        }
        self.state = self
            .state
            .to_opening()
            .map_err(|e| HardwareError::unavailable(self.device, e))?;

        if self.fail_open {
            self.state = self.state.to_faulted();
            return Err(HardwareError::io(self.device, "mock open failure"));
        }

        self.state = self
            .state
            .to_ready()
            .map_err(|e| HardwareError::unavailable(self.device, e))?;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), HardwareError> {
        if !self.state.is_ready() {
            return Err(HardwareError::not_initialized(self.device));
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HardwareError::io(self.device, "mock write failure"));
        }
        let mut written = self.written.lock().await;
        written.extend_from_slice(bytes);
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, HardwareError> {
        if !self.state.is_ready() {
            return Err(HardwareError::not_initialized(self.device));
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            self.state = self.state.to_faulted();
            return Err(HardwareError::io(self.device, "mock read failure"));
        }
        match tokio::time::timeout(READ_POLL, self.inbound.recv()).await {
            Ok(Some(bytes)) => Ok(Some(bytes)),
            // Sender dropped: behave like a quiet port
            Ok(None) => {
                tokio::time::sleep(READ_POLL).await;
                Ok(None)
            }
            Err(_) => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), HardwareError> {
        self.state = self.state.to_closed();
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    fn transport(&self) -> &str {
        "mock"
    }
}
