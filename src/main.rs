use std::sync::Arc;

use anyhow::Result;
use log::info;

use cranberry_capture::api::ApiClient;
use cranberry_capture::camera::SystemCameraProvider;
use cranberry_capture::capture::CaptureController;
use cranberry_capture::feed::ActivityFeed;
use cranberry_capture::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let settings_path = Settings::resolve_path();
    let settings = Settings::load(settings_path.as_deref())?;
    info!(
        "cranberry capture client starting up (capture endpoint: {})",
        settings.capture_endpoint
    );

    let feed = ActivityFeed::new();
    feed.info("system started; press Ctrl-C to stop");

    let api = Arc::new(ApiClient::new(&settings)?);
    let controller = CaptureController::new(
        settings,
        api,
        Arc::new(SystemCameraProvider),
        feed.clone(),
    );

    controller.start().await?;

    tokio::signal::ctrl_c().await?;
    controller.stop().await?;

    Ok(())
}
