#![allow(dead_code)]

use async_trait::async_trait;
use kidsplay::api::{ApiError, Chip, ChipPlaylist, ChipUid, PlaylistApi, SessionReport, SessionTracker, VideoRef};
use kidsplay::fullscreen::{FullscreenError, FullscreenSurface};
use kidsplay::playback::{EmbedError, SimulatedEmbed, VideoEmbed};
use kidsplay::runtime::{Collaborators, RuntimeSettings};
use kidsplay::sensors::SensorSource;
use kidsplay::{KidsModeHandle, KidsModeView, Screen};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const OFFLINE_CHIP: &str = "OFFLINE";

pub fn video(id: u64, title: &str, sequence_order: u32) -> VideoRef {
    VideoRef {
        id,
        title: title.to_string(),
        platform_id: 1,
        platform_video_id: format!("yt-{}", title.to_lowercase()),
        sequence_order,
    }
}

/// In-memory chip registry
#[derive(Default)]
pub struct FakeApi {
    chips: HashMap<String, Vec<VideoRef>>,
}

impl FakeApi {
    pub fn with_chip(mut self, uid: &str, videos: Vec<VideoRef>) -> Self {
        self.chips.insert(uid.to_string(), videos);
        self
    }

    /// TEST123 with A, B, C (delivered out of order), EMPTY1 without videos,
    /// SOLO1 with a single video
    pub fn standard() -> Self {
        Self::default()
            .with_chip(
                "TEST123",
                vec![video(12, "C", 3), video(10, "A", 1), video(11, "B", 2)],
            )
            .with_chip("EMPTY1", vec![])
            .with_chip("SOLO1", vec![video(20, "Solo", 1)])
    }
}

#[async_trait]
impl PlaylistApi for FakeApi {
    async fn scan_chip(&self, chip_uid: &ChipUid) -> Result<ChipPlaylist, ApiError> {
        if chip_uid.as_str() == OFFLINE_CHIP {
            return Err(ApiError::NetworkError("connection refused".to_string()));
        }
        let videos = self
            .chips
            .get(chip_uid.as_str())
            .ok_or_else(|| ApiError::ChipNotFound(chip_uid.clone()))?;
        Ok(ChipPlaylist {
            chip: Chip {
                chip_uid: chip_uid.clone(),
            },
            videos: videos.clone(),
        })
    }
}

#[derive(Default)]
pub struct RecordingTracker {
    reports: Mutex<Vec<SessionReport>>,
}

impl RecordingTracker {
    pub fn reports(&self) -> Vec<SessionReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionTracker for RecordingTracker {
    async fn report_session_end(&self, report: &SessionReport) -> Result<(), ApiError> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct SurfaceLog {
    pub requests: usize,
    pub exits: usize,
    pub fullscreen: bool,
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn log(&self) -> SurfaceLog {
        self.log.lock().unwrap().clone()
    }
}

impl FullscreenSurface for RecordingSurface {
    fn request_fullscreen(&mut self) -> Result<(), FullscreenError> {
        let mut log = self.log.lock().unwrap();
        log.requests += 1;
        log.fullscreen = true;
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<(), FullscreenError> {
        let mut log = self.log.lock().unwrap();
        log.exits += 1;
        log.fullscreen = false;
        Ok(())
    }
}

/// Simulated player that remembers every seek it was asked for
#[derive(Clone)]
pub struct RecordingEmbed {
    inner: SimulatedEmbed,
    seeks: Arc<Mutex<Vec<f64>>>,
}

impl RecordingEmbed {
    pub fn new(inner: SimulatedEmbed) -> Self {
        Self {
            inner,
            seeks: Arc::default(),
        }
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoEmbed for RecordingEmbed {
    async fn load(&self, video: &VideoRef) -> Result<(), EmbedError> {
        self.inner.load(video).await
    }

    fn seek(&self, position: f64) {
        self.seeks.lock().unwrap().push(position);
    }
}

pub struct Harness {
    pub kids_mode: KidsModeHandle,
    pub view: watch::Receiver<KidsModeView>,
    pub tracker: Arc<RecordingTracker>,
    pub surface: RecordingSurface,
}

pub async fn start(embed: SimulatedEmbed, sensors: Option<Box<dyn SensorSource>>) -> Harness {
    start_with(Arc::new(embed), sensors).await
}

pub async fn start_with(embed: Arc<dyn VideoEmbed>, sensors: Option<Box<dyn SensorSource>>) -> Harness {
    let tracker = Arc::new(RecordingTracker::default());
    let surface = RecordingSurface::default();
    let collaborators = Collaborators {
        api: Arc::new(FakeApi::standard()),
        tracker: tracker.clone(),
        embed,
        surface: Box::new(surface.clone()),
    };

    let kids_mode = KidsModeHandle::spawn(collaborators, RuntimeSettings::default(), sensors)
        .await
        .unwrap();
    let view = kids_mode.subscribe();
    Harness {
        kids_mode,
        view,
        tracker,
        surface,
    }
}

pub fn quick_embed() -> SimulatedEmbed {
    SimulatedEmbed::new(Duration::from_millis(200))
}

impl Harness {
    pub async fn wait_for(&mut self, what: &str, predicate: impl FnMut(&KidsModeView) -> bool) -> KidsModeView {
        let result = tokio::time::timeout(Duration::from_secs(30), self.view.wait_for(predicate))
            .await
            .map(|waited| waited.map(|view| view.clone()));
        match result {
            Ok(Ok(view)) => view,
            Ok(Err(_)) => panic!("runtime stopped while waiting for {}", what),
            Err(_) => panic!("timed out waiting for {}; last view {:?}", what, *self.view.borrow()),
        }
    }

    /// Waits until video `id` is visible on the playback screen
    pub async fn wait_playing(&mut self, id: u64) -> KidsModeView {
        self.wait_for(&format!("video {} playing", id), |view| {
            view.screen == Screen::Playing
                && view.current_video.as_ref().map(|v| v.id) == Some(id)
                && !view.loading
        })
        .await
    }
}
