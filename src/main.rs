pub mod config;
pub mod device;
pub mod dispatch;
pub mod normalize;
pub mod protocol;
pub mod transport;

use crate::config::StreamerConfig;
use crate::device::WiimoteSource;
use crate::dispatch::{run_dispatcher, Dispatcher};
use crate::transport::UdpSender;
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Streams Wii Remote input to an emulator over UDP
#[derive(Parser, Debug)]
#[command(name = "wiimote-streamer", version, about)]
struct Cli {
    /// Destination address of the emulator
    #[arg(long)]
    host: IpAddr,

    /// Destination UDP port
    #[arg(long)]
    port: u16,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Calibration and runtime configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup(cli.debug)?;
    debug!("Command line: {:?}", cli);

    let config = StreamerConfig::load(cli.config).await?;

    let destination = SocketAddr::new(cli.host, cli.port);
    let sender = UdpSender::bind(destination)
        .map_err(|e| eyre!("Failed to set up UDP sender: {}", e))?;

    let source = WiimoteSource::open(&config.device).map_err(|e| {
        error!("{}", e);
        eyre!("Failed to open Wii Remote: {}", e)
    })?;

    let dispatcher = Dispatcher::create(
        Box::new(source),
        Box::new(sender),
        config.calibration,
        config.protocol.framing,
        Some(config.dispatch),
        CancellationToken::new(),
    )?;
    spawn_interrupt_handler(dispatcher.cancellation_token());

    let (reason, report) = run_dispatcher(dispatcher).await;
    info!(
        "Streamed {} events to {} ({})",
        report.total_events(),
        destination,
        reason
    );

    Ok(())
}

// Ctrl-C cancels the token; the dispatcher notices between ticks
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                cancel.cancel();
            }
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
    });
}

fn setup(debug: bool) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env(if debug { Level::DEBUG } else { Level::INFO });
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
