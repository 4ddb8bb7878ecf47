use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use kidsplay::api::HttpApiClient;
use kidsplay::config::KidsModeConfig;
use kidsplay::fullscreen::LoggingSurface;
use kidsplay::kiosk::KioskCommand;
use kidsplay::playback::SimulatedEmbed;
use kidsplay::runtime::Collaborators;
use kidsplay::sensors::{ChannelSource, RawSensorEvent};
use kidsplay::{KidsModeHandle, KidsModeView};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = KidsModeConfig::load().await?;

    let api = Arc::new(
        HttpApiClient::new(&config.api).map_err(|e| eyre!("Failed to create API client: {}", e))?,
    );
    let collaborators = Collaborators {
        api: api.clone(),
        tracker: api,
        embed: Arc::new(SimulatedEmbed::new(Duration::from_millis(
            config.playback.simulated_load_ms,
        ))),
        surface: Box::new(LoggingSurface::new(true)),
    };

    // Simulated motion sensors fed from stdin
    let (sensor_sender, sensor_receiver) = mpsc::channel::<RawSensorEvent>(64);
    let sensors = ChannelSource::new(sensor_receiver);

    let kids_mode = KidsModeHandle::spawn(
        collaborators,
        config.runtime_settings(),
        Some(Box::new(sensors)),
    )
    .await
    .map_err(|e| eyre!("Failed to start kids mode: {}", e))?;
    info!("Gestures enabled: {}", kids_mode.gestures_enabled());

    let view = kids_mode.subscribe();
    let _view_logger = tokio::spawn(log_view_changes(view.clone()));

    info!("Ready. Type `scan <chip id>` to start, `quit` to leave");
    run_kiosk(&kids_mode, &view, sensor_sender).await?;

    kids_mode
        .shutdown()
        .await
        .map_err(|e| eyre!("Kids mode did not shut down cleanly: {}", e))?;
    info!("Bye");
    Ok(())
}

async fn run_kiosk(
    kids_mode: &KidsModeHandle,
    view: &watch::Receiver<KidsModeView>,
    sensors: mpsc::Sender<RawSensorEvent>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match KioskCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        // Shutdown goes through the handle so gestures stop first
        if command == KioskCommand::Quit {
            return Ok(());
        }

        let now = Local::now();
        for sample in command.sensor_events(now) {
            if sensors.send(sample).await.is_err() {
                warn!("Motion sensors are not listening");
                break;
            }
        }

        let generation = view.borrow().player_generation;
        for event in command.runtime_events(generation, now) {
            kids_mode
                .send(event)
                .await
                .map_err(|e| eyre!("Kids mode stopped: {}", e))?;
        }
    }

    debug!("Stdin closed");
    Ok(())
}

async fn log_view_changes(mut view: watch::Receiver<KidsModeView>) {
    while view.changed().await.is_ok() {
        let current = view.borrow_and_update().clone();
        let video = current
            .current_video
            .as_ref()
            .map(|v| format!("{} ({}/{})", v.title, current.video_index.unwrap_or(0) + 1, current.video_count))
            .unwrap_or_else(|| "-".to_string());

        info!(
            "[{:?}] video: {} loading: {} fullscreen: {} position: {:.1}s",
            current.screen, video, current.loading, current.fullscreen, current.position
        );
        if let Some(message) = current.message {
            info!("[{:?}] {}", current.screen, message);
        }
        if let Some(notice) = current.notice {
            info!("[notice] {}", notice.child_message());
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
