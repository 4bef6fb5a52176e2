//! ocserv-telemetry - OpenConnect session metrics shipper
//!
//! This is the composition root that wires together all the components.

use ocserv_telemetry::adapters::outbound::{CommandSource, InfluxWriter, OcctlParser};
use ocserv_telemetry::application::{local_hostname, PointBuffer, Poller};
use ocserv_telemetry::config::load_config;
use ocserv_telemetry::infrastructure::{supervise, ShutdownController};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_DATE: Option<&str> = option_env!("OCSERV_TELEMETRY_BUILD_DATE");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().skip(1).any(|a| a == "-v" || a == "--version") {
        eprintln!(
            "ocserv-telemetry version {} (built {})",
            VERSION,
            BUILD_DATE.unwrap_or("unknown")
        );
        return Ok(());
    }

    // Load configuration from environment
    let cfg = load_config()?;
    cfg.validate()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters
    let writer = Arc::new(InfluxWriter::new(cfg.influx_settings())?);
    let source = Arc::new(CommandSource::from_command_line(&cfg.metrics_cmd)?);
    let parser = Arc::new(OcctlParser::new());

    // 2. Application services
    let buffer = Arc::new(PointBuffer::new(writer, local_hostname(), cfg.max_points));

    tracing::info!(
        "starting ocserv-telemetry influx={} db={} every {}s dry_run={} host={} max_points={}",
        cfg.influx_url,
        cfg.influx_db,
        cfg.metrics_delay_secs,
        cfg.dry_run,
        buffer.hostname(),
        buffer.max_points()
    );

    let poller = Poller::new(source, parser, buffer, cfg.metrics_delay());

    // 3. Run until a signal or a fatal pipeline error
    let controller = ShutdownController::new();
    let pipeline = {
        let controller = controller.clone();
        async move { poller.run(&controller).await }
    };

    supervise(pipeline, controller).await?;

    tracing::info!("ocserv-telemetry stopped");
    Ok(())
}
