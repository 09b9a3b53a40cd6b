use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::manager::DeviceManager;
use domain::{DeviceEvent, DeviceKind};
use infrastructure::config::LaneConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory (optional)
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override lane ID
    #[arg(long)]
    lane_id: Option<String>,

    /// Swap every configured device for its mock backend
    #[arg(long)]
    mock: bool,
}

async fn run() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,lane_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🅿️ Parkalot Lane Agent Starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let args = Args::parse();

    // 1. Load Configuration
    let mut config = LaneConfig::load(&args.config_dir)?;
    if let Some(id) = args.lane_id {
        config.lane_id = id;
    }
    if args.mock {
        warn!("Running with mock devices, no hardware will be touched");
        config.force_mock();
    }
    info!("✅ Loaded configuration for lane: {}", config.lane_id);

    // 2. Bring up the configured peripherals
    let manager = DeviceManager::from_config(&config)?;

    // 3. Mirror every device event into the log
    let mut loggers: Vec<JoinHandle<()>> = Vec::new();
    if let Some(gate) = manager.gate() {
        loggers.push(spawn_event_logger(DeviceKind::Gate, gate.subscribe()));
    }
    if let Some(printer) = manager.printer() {
        loggers.push(spawn_event_logger(DeviceKind::Printer, printer.subscribe()));
    }
    if let Some(scanner) = manager.scanner() {
        loggers.push(spawn_event_logger(DeviceKind::Scanner, scanner.subscribe()));
    }
    if let Some(trigger) = manager.trigger() {
        loggers.push(spawn_event_logger(DeviceKind::Trigger, trigger.subscribe()));
    }
    if let Some(camera) = manager.camera() {
        loggers.push(spawn_event_logger(DeviceKind::Camera, camera.subscribe()));
    }

    // 4. Scanners poll on their own once started
    if let (Some(scanner), Some(section)) = (manager.scanner(), &config.scanner) {
        scanner
            .start_continuous_scan(Duration::from_millis(section.scan_interval_ms))
            .await?;
    }

    info!("✅ Lane agent running");

    // 5. Shutdown Signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutting down..."),
        Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
    }

    manager.dispose_all().await;
    for logger in loggers {
        logger.abort();
    }

    info!("👋 Good bye!");
    Ok(())
}

fn spawn_event_logger(
    device: DeviceKind,
    mut events: broadcast::Receiver<DeviceEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(device, &event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(device = %device, missed, "Event logger lagged")
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(device: DeviceKind, event: &DeviceEvent) {
    match event {
        DeviceEvent::Ready { .. } => info!(device = %device, "✅ Device ready"),
        DeviceEvent::Error { message, code, .. } => {
            warn!(device = %device, code = ?code, "❌ {message}")
        }
        DeviceEvent::StateChanged { is_open, .. } => {
            info!(device = %device, is_open, "Gate state changed")
        }
        DeviceEvent::Scan { barcode, .. } => info!(device = %device, barcode = %barcode, "Scan"),
        DeviceEvent::Trigger { .. } => info!(device = %device, "Vehicle detected"),
        DeviceEvent::Capture { data, .. } => {
            info!(device = %device, bytes = data.len(), "Capture complete")
        }
        DeviceEvent::Frame { data, .. } => debug!(device = %device, bytes = data.len(), "Frame"),
        DeviceEvent::Data { bytes, .. } => {
            debug!(device = %device, bytes = bytes.len(), "Unrecognized data")
        }
    }
}

fn main() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
