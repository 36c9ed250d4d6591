//! attendance_publisher node entry point.

use clap::Parser;
use eyre::{Result, WrapErr};
use rollcall_core::{AttendanceClient, Executor, LinePublisher, StatsAggregator};
use rollcall_node::{
    Config,
    cli::{Args, init_tracing, shutdown_signal},
};
use tracing::info;

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = args.load_config()?;

    // One thread delivers every tick
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to create tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let aggregator_config = config.to_aggregator_config();
    let client = AttendanceClient::new(&aggregator_config.api_endpoint, &config.to_http_config())?;
    let period = aggregator_config.publish_rate;

    let mut aggregator = StatsAggregator::new(aggregator_config, client, LinePublisher::stdout());

    let mut executor = Executor::new(config.queue_depth)?;
    executor.add_timer(period)?;

    info!(publish_rate = ?period, "Attendance Publisher Node started");

    let stats = executor.spin(&mut aggregator, shutdown_signal()).await;

    info!(
        ticks = stats.ticks,
        dropped = stats.dropped,
        "Attendance Publisher Node shutting down"
    );
    Ok(())
}
