mod sim;

use clap::Parser;
use eip_monitor_core::{EventDispatcher, InputCache, MonitorConfig, SensorBitPolicy, SessionMonitor};
use eip_monitor_sdk::ProtocolClient;
use sim::SimulatedController;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// EIP Monitor - sensor event acknowledgment client
///
/// Registers a session with an EtherNet/IP controller, opens an implicit
/// messaging connection, monitors cyclic sensor datagrams and answers
/// qualifying events with an acknowledgment datagram. This binary drives the
/// monitor against a built-in simulated controller; production integrations
/// supply their own protocol client.
#[derive(Parser)]
#[command(name = "eip-monitor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "EIP monitor", long_about = None)]
struct Cli {
    /// Controller IP address
    #[arg(long, env = "EIP_MONITOR_HOST", default_value = "192.168.1.10")]
    host: String,

    /// Controller explicit-messaging port
    #[arg(long, env = "EIP_MONITOR_PORT", default_value_t = 44818)]
    port: u16,

    /// Monitoring window in seconds (0 = run until interrupted)
    #[arg(long, default_value_t = 30)]
    duration: u64,

    /// Cyclic emission period of the simulated controller, in milliseconds
    #[arg(long, default_value_t = 500)]
    sim_period_ms: u64,

    /// JSON monitor configuration file; overrides the flags above
    #[arg(short, long, env = "EIP_MONITOR_CONFIG")]
    config: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> anyhow::Result<MonitorConfig> {
    if let Some(path) = &cli.config {
        let raw = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&raw)?);
    }

    // Build from flags, letting the serde field defaults fill the rest.
    let doc = serde_json::json!({
        "host": cli.host,
        "port": cli.port,
        "runForSecs": (cli.duration > 0).then_some(cli.duration),
    });
    Ok(serde_json::from_value(doc)?)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let target = config.target()?;

    let sim = Arc::new(SimulatedController::new(Duration::from_millis(
        cli.sim_period_ms.max(1),
    )));
    let client: Arc<dyn ProtocolClient> = sim.clone();
    let monitor = SessionMonitor::new(Arc::clone(&client));

    let cache = Arc::new(InputCache::new(config.cache_capacity));
    let policy = Arc::new(SensorBitPolicy::new(config.trigger_mask, config.ack_byte));
    let dispatcher = EventDispatcher::spawn(
        Arc::clone(&client),
        Arc::clone(&cache),
        policy,
        monitor.cancel_token(),
    );

    // Interruption flows into orderly teardown rather than aborting the run.
    let cancel = monitor.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt signal");
            cancel.cancel();
        }
    });

    let consumer: Arc<dyn eip_monitor_sdk::DatagramConsumer> = dispatcher.clone();

    info!(%target, window = ?config.window(), "starting monitor");
    let result = monitor
        .run(
            target,
            consumer,
            Arc::clone(&cache),
            config.window(),
            config.poll_interval(),
        )
        .await;

    let metrics = dispatcher.metrics();
    info!(
        received = metrics.received,
        acknowledged = metrics.acknowledged,
        send_failures = metrics.send_failures,
        "monitor run complete"
    );
    info!(
        acks_received = sim.acks_received(),
        latest_input = ?sim.latest_cyclic_input().as_ref(),
        "simulated controller totals"
    );

    Ok(result?)
}
