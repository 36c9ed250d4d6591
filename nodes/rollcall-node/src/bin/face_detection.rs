//! face_detection node entry point.

use clap::Parser;
use eyre::{Result, WrapErr};
use rollcall_core::{AttendanceClient, Executor, FaceForwarder, LinePublisher, SeetaDetector};
use rollcall_node::{
    Config, DirectorySource,
    cli::{Args, init_tracing, shutdown_signal},
};
use tracing::info;

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = args.load_config()?;

    // One thread delivers every frame
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to create tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let faces = &config.face_detection;

    let detector = SeetaDetector::load(&faces.detector.model_path, &config.to_seeta_params())?;
    info!(model = %faces.detector.model_path.display(), "Loaded face detector");

    let forwarder_config = config.to_forwarder_config();
    let client = AttendanceClient::new(&forwarder_config.api_endpoint, &config.to_http_config())?;
    let camera_topic = forwarder_config.camera_topic.clone();

    let mut forwarder =
        FaceForwarder::new(forwarder_config, detector, client, LinePublisher::stdout());

    let mut executor = Executor::new(config.queue_depth)?;
    let source = DirectorySource::new(&faces.frame_source.directory);
    info!(
        camera_topic = %camera_topic,
        directory = %source.dir().display(),
        poll_interval = ?faces.frame_source.poll_interval,
        "Subscribed to camera frames"
    );
    executor.attach(source.spawn(faces.frame_source.poll_interval, executor.sender()));

    info!("Face Detection Node started");

    let stats = executor.spin(&mut forwarder, shutdown_signal()).await;

    info!(
        images = stats.images,
        dropped = stats.dropped,
        "Face Detection Node shutting down"
    );
    Ok(())
}
