//! sidewinderd: special-key daemon for SideWinder and G105 keyboards.

use anyhow::{Context, Result};
use clap::Parser;
use sidewinderd_core::capture::EvdevCapture;
use sidewinderd_core::config::Config;
use sidewinderd_core::controller::Controller;
use sidewinderd_core::device::{self, DeviceDescriptor, KeyboardModel};
use sidewinderd_core::hid::HidrawDevice;
use sidewinderd_core::input::{UinputKeyboard, VIRTUAL_DEVICE_NAME};
use sidewinderd_core::key::emitted_key_codes;
use sidewinderd_core::macros::MacroEngine;
use sidewinderd_core::shutdown::ShutdownSignal;
use sidewinderd_core::store::MacroStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sidewinderd",
    version,
    about = "Macro keys, profiles and LEDs for SideWinder X4/X6 and Logitech G105 keyboards"
)]
struct Cli {
    /// Configuration file (default: ~/.config/sidewinderd/sidewinderd.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// More log output; repeat for trace level. RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// List attached supported keyboards and exit.
    #[arg(long)]
    list_devices: bool,
}

fn model_name(dev: &DeviceDescriptor) -> &str {
    KeyboardModel::from_ids(dev.vendor_id, dev.product_id)
        .map_or(dev.model.tag.as_str(), |m| m.name())
}

fn open_capture(config: &Config, dev: &DeviceDescriptor) -> Option<EvdevCapture> {
    let path = config
        .capture_device
        .clone()
        .or_else(|| device::find_capture_node(dev.vendor_id, dev.product_id));
    let Some(path) = path else {
        warn!("No capture keyboard found, recordings will be empty");
        return None;
    };
    match EvdevCapture::open(&path) {
        Ok(capture) => Some(capture),
        Err(e) => {
            warn!(error = %e, "Capture keyboard unavailable, recordings will be empty");
            None
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(cli.config.as_deref())?;
    let table = config.model_table();

    if cli.list_devices {
        let devices = device::discover_devices(&table)?;
        if devices.is_empty() {
            println!("No supported keyboards found.");
            println!("Check that the keyboard is connected and its hidraw node is readable.");
        }
        for dev in &devices {
            println!(
                "{} (VID: 0x{:04X}, PID: 0x{:04X}, path: {})",
                model_name(dev),
                dev.vendor_id,
                dev.product_id,
                dev.node.display()
            );
        }
        return Ok(());
    }

    let dev = device::discover_first(&table)?;
    info!(
        model = model_name(&dev),
        profiles = dev.num_profiles(),
        macro_keys = dev.num_macro_keys(),
        "Using keyboard"
    );

    let hid = HidrawDevice::open(&dev.node)?;
    let sink = UinputKeyboard::register(VIRTUAL_DEVICE_NAME, emitted_key_codes())?;
    let engine = MacroEngine::new(MacroStore::new(&config.macro_dir), config.capture_delays);
    info!(path = %config.macro_dir.display(), "Macro store");

    let shutdown = Arc::new(ShutdownSignal::new()?);
    let handler = Arc::clone(&shutdown);
    ctrlc::set_handler(move || handler.trigger()).context("install signal handler")?;

    let mut controller = Controller::new(&dev.model, hid, sink, engine);
    if let Some(capture) = open_capture(&config, &dev) {
        controller = controller.with_capture(Box::new(capture));
    }

    controller.run(&shutdown)?;
    info!("Exiting");
    Ok(())
}
