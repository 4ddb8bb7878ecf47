//! Kids-mode runtime
//!
//! ```text
//!  Scan / Touch / Embed / Gesture / affordances
//!                   │
//!                   ▼
//!       RuntimeEvent queue ──► KidsMode::handle ──► watch<KidsModeView>
//!                                 │
//!     ScanGate · PlaylistController · SwipeDetector · FullscreenManager
//!                                 │
//!          lookup tasks · EmbedLoader · SessionReporter (spawned work)
//! ```
//!
//! [`KidsMode`] owns every component and is the only place their outputs
//! are turned into side effects. All asynchronous work (chip lookups, video
//! loads, the success confirmation timer) reports back through the same
//! inbound queue, so components are only ever touched from one task.

use crate::api::{ChipUid, PlaylistApi, SessionTracker, VideoRef};
use crate::events::{Command, GestureOutput, Notice, RuntimeEvent};
use crate::fullscreen::{FullscreenManager, FullscreenSurface};
use crate::gestures::{GestureError, GestureHandle, GestureInput, GestureSettings};
use crate::playback::{
    EmbedLoader, PlaybackPhase, PlaybackSession, PlaybackSettings, PlaylistController,
    PlaylistEvent, PlaylistOutput, SessionEnd, VideoEmbed,
};
use crate::reporting::SessionReporter;
use crate::scan::{ScanGate, ScanGateEvent, ScanGateOutput, ScanPhase, ScanSettings};
use crate::sensors::SensorSource;
use crate::swipe::{SwipeDetector, SwipeSettings};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Gesture pipeline error: {0}")]
    Gesture(#[from] GestureError),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Runtime task failed: {0}")]
    TaskError(String),
}

/// External capabilities the runtime drives
pub struct Collaborators {
    pub api: Arc<dyn PlaylistApi>,
    pub tracker: Arc<dyn SessionTracker>,
    pub embed: Arc<dyn VideoEmbed>,
    pub surface: Box<dyn FullscreenSurface>,
}

#[derive(Clone, Debug, Default)]
pub struct RuntimeSettings {
    pub gestures: GestureSettings,
    pub swipe: SwipeSettings,
    pub playback: PlaybackSettings,
    pub scan: ScanSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Idle,
    Scanning,
    Success,
    Playing,
    Error,
}

/// What the child currently sees
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KidsModeView {
    pub screen: Screen,
    pub prompt_pulsating: bool,
    pub manual_entry_visible: bool,
    pub chip_uid: Option<ChipUid>,
    pub current_video: Option<VideoRef>,
    /// 0-based index of `current_video`
    pub video_index: Option<usize>,
    pub video_count: usize,
    pub loading: bool,
    /// Load generation callbacks for the current video must carry
    pub player_generation: Option<u64>,
    pub position: f64,
    pub message: Option<&'static str>,
    /// "Try again" on a failed video
    pub retry_available: bool,
    /// "Scan again" on the scan error screen
    pub scan_again_available: bool,
    pub notice: Option<Notice>,
    pub fullscreen: bool,
    pub sessions_reported: usize,
}

/// Acknowledgment that clears itself once its timer fires
struct TransientNotice {
    id: u64,
    notice: Notice,
    timer: CancellationToken,
}

pub struct KidsMode {
    gate: ScanGate,
    playlist: Option<PlaylistController>,
    swipe: SwipeDetector,
    fullscreen: FullscreenManager,
    reporter: SessionReporter,
    loader: EmbedLoader,
    api: Arc<dyn PlaylistApi>,
    gesture_input: Option<mpsc::Sender<GestureInput>>,
    events: mpsc::Sender<RuntimeEvent>,
    view: watch::Sender<KidsModeView>,
    confirmation: Option<CancellationToken>,
    // Shown until dismissed, survives sessions
    notice: Option<Notice>,
    transient_notice: Option<TransientNotice>,
    next_notice_id: u64,
    settings: RuntimeSettings,
}

impl KidsMode {
    /// `events` must feed the receiver later passed to [`KidsMode::run`]
    pub fn new(
        collaborators: Collaborators,
        settings: RuntimeSettings,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> (Self, watch::Receiver<KidsModeView>) {
        let (view, view_receiver) = watch::channel(KidsModeView::default());
        let kids_mode = Self {
            gate: ScanGate::new(),
            playlist: None,
            swipe: SwipeDetector::new(settings.swipe.clone()),
            fullscreen: FullscreenManager::new(collaborators.surface),
            reporter: SessionReporter::new(collaborators.tracker),
            loader: EmbedLoader::new(collaborators.embed, events.clone()),
            api: collaborators.api,
            gesture_input: None,
            events,
            view,
            confirmation: None,
            notice: None,
            transient_notice: None,
            next_notice_id: 0,
            settings,
        };
        kids_mode.publish();
        (kids_mode, view_receiver)
    }

    /// Lets the runtime reset gesture state whenever a session starts
    pub fn with_gesture_input(mut self, gesture_input: Option<mpsc::Sender<GestureInput>>) -> Self {
        self.gesture_input = gesture_input;
        self
    }

    pub fn gate(&self) -> &ScanGate {
        &self.gate
    }

    pub fn playlist(&self) -> Option<&PlaylistController> {
        self.playlist.as_ref()
    }

    pub fn handle(&mut self, event: RuntimeEvent) -> ControlFlow<()> {
        debug!("Handling {:?}", event);
        match event {
            RuntimeEvent::Scan(chip_uid) => self.on_gate(ScanGateEvent::Scan(chip_uid)),
            RuntimeEvent::LookupFinished { chip_uid, result } => {
                self.on_gate(ScanGateEvent::LookupFinished { chip_uid, result })
            }
            RuntimeEvent::ConfirmationElapsed => {
                self.confirmation = None;
                self.on_gate(ScanGateEvent::ConfirmationShown);
            }
            RuntimeEvent::Gesture(GestureOutput::Command(command)) => self.on_command(command),
            RuntimeEvent::Gesture(GestureOutput::Notice(notice)) => self.show_notice(notice),
            RuntimeEvent::Touch(touch) => {
                if let Some(command) = self.swipe.handle(touch) {
                    self.on_command(command);
                }
            }
            RuntimeEvent::Embed(embed) => self.on_playlist(PlaylistEvent::Embed(embed)),
            RuntimeEvent::Retry => {
                let failed = self
                    .playlist
                    .as_ref()
                    .is_some_and(|p| matches!(p.phase(), PlaybackPhase::Failed(_)));
                if failed {
                    info!("Retrying failed video");
                    self.on_command(Command::RestartCurrent);
                } else {
                    debug!("Retry ignored, nothing has failed");
                }
            }
            RuntimeEvent::BackToScan => self.on_command(Command::ExitFullscreen),
            RuntimeEvent::ScanAgain => self.on_gate(ScanGateEvent::ScanAgain),
            RuntimeEvent::DismissNotice => {
                if self.transient_notice.is_some() {
                    self.clear_transient_notice();
                } else {
                    self.notice = None;
                }
            }
            RuntimeEvent::NoticeElapsed(id) => {
                if self.transient_notice.as_ref().is_some_and(|t| t.id == id) {
                    self.clear_transient_notice();
                } else {
                    debug!("Notice {} already gone", id);
                }
            }
            RuntimeEvent::Shutdown => {
                info!("Kids mode shutting down");
                if self.playlist.is_some() {
                    self.on_command(Command::ExitFullscreen);
                }
                self.loader.cancel();
                self.fullscreen.exit();
                self.publish();
                return ControlFlow::Break(());
            }
        }
        self.publish();
        ControlFlow::Continue(())
    }

    /// Handles events until `Shutdown` or until every sender is gone
    pub async fn run(mut self, mut receiver: mpsc::Receiver<RuntimeEvent>) {
        info!("Kids mode running");
        while let Some(event) = receiver.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }
        self.loader.cancel();
        self.fullscreen.exit();
        self.reporter.drain().await;
        info!("Kids mode stopped");
    }

    fn on_command(&mut self, command: Command) {
        if self.playlist.is_none() {
            debug!("No session running, ignoring {:?}", command);
            return;
        }
        self.on_playlist(PlaylistEvent::Command(command));
    }

    fn on_gate(&mut self, event: ScanGateEvent) {
        let Some(output) = self.gate.handle(event) else {
            return;
        };
        match output {
            ScanGateOutput::Lookup(chip_uid) => self.spawn_lookup(chip_uid),
            ScanGateOutput::SessionStart { chip_uid, videos } => {
                self.start_session(chip_uid, videos)
            }
            ScanGateOutput::SessionError(error) => {
                info!("Scan error shown: {}", error.child_message());
            }
        }
    }

    fn on_playlist(&mut self, event: PlaylistEvent) {
        let Some(playlist) = self.playlist.as_mut() else {
            debug!("No session running, dropping {:?}", event);
            return;
        };
        let outputs = playlist.handle(event);
        self.apply(outputs);
    }

    fn apply(&mut self, outputs: Vec<PlaylistOutput>) {
        for output in outputs {
            match output {
                PlaylistOutput::Load { video, generation } => self.loader.load(video, generation),
                PlaylistOutput::Seek { position } => self.loader.seek(position),
                PlaylistOutput::Notice(notice) => self.show_notice(notice),
                PlaylistOutput::Failed(error) => {
                    warn!("Playback failed, offering retry: {}", error);
                }
                PlaylistOutput::Finished(end) => self.finish_session(end),
            }
        }
    }

    fn spawn_lookup(&self, chip_uid: ChipUid) {
        let api = self.api.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api.scan_chip(&chip_uid).await;
            if let Err(e) = events
                .send(RuntimeEvent::LookupFinished { chip_uid, result })
                .await
            {
                warn!("Lookup finished after runtime stopped: {}", e);
            }
        });
    }

    fn start_session(&mut self, chip_uid: ChipUid, videos: Vec<VideoRef>) {
        let session = match PlaybackSession::new(chip_uid, videos) {
            Ok(session) => session,
            Err(e) => {
                error!("Could not start session: {}", e);
                self.gate.handle(ScanGateEvent::SessionFinished);
                return;
            }
        };

        self.fullscreen.enter();
        if let Some(gesture_input) = &self.gesture_input {
            if let Err(e) = gesture_input.try_send(GestureInput::ResetSession) {
                warn!("Could not reset gesture state: {}", e);
            }
        }
        self.swipe.arm();
        self.clear_transient_notice();

        let (playlist, outputs) = PlaylistController::start(session);
        self.playlist = Some(playlist);
        self.apply(outputs);
        self.schedule_confirmation();
    }

    fn schedule_confirmation(&mut self) {
        let token = CancellationToken::new();
        self.confirmation = Some(token.clone());
        let events = self.events.clone();
        let delay = Duration::from_millis(self.settings.playback.success_display_ms);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = events.send(RuntimeEvent::ConfirmationElapsed).await {
                        debug!("Confirmation elapsed after runtime stopped: {}", e);
                    }
                }
            }
        });
    }

    fn show_notice(&mut self, notice: Notice) {
        info!("Showing notice: {}", notice.child_message());
        if !notice.is_transient() {
            self.notice = Some(notice);
            return;
        }

        self.clear_transient_notice();
        self.next_notice_id += 1;
        let id = self.next_notice_id;
        let timer = CancellationToken::new();
        let events = self.events.clone();
        let delay = Duration::from_millis(self.settings.playback.notice_display_ms);

        let cancelled = timer.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = events.send(RuntimeEvent::NoticeElapsed(id)).await {
                        debug!("Notice elapsed after runtime stopped: {}", e);
                    }
                }
            }
        });
        self.transient_notice = Some(TransientNotice { id, notice, timer });
    }

    fn clear_transient_notice(&mut self) {
        if let Some(transient) = self.transient_notice.take() {
            transient.timer.cancel();
        }
    }

    fn finish_session(&mut self, end: SessionEnd) {
        self.loader.cancel();
        if let Some(token) = self.confirmation.take() {
            token.cancel();
        }
        self.fullscreen.exit();
        self.swipe.disarm();
        self.clear_transient_notice();
        self.reporter.report(end.report);
        self.playlist = None;
        self.gate.handle(ScanGateEvent::SessionFinished);
    }

    pub fn view(&self) -> KidsModeView {
        let mut view = KidsModeView {
            prompt_pulsating: self.gate.prompt_pulsating(),
            notice: self
                .transient_notice
                .as_ref()
                .map(|t| t.notice)
                .or(self.notice),
            fullscreen: self.fullscreen.is_fullscreen(),
            sessions_reported: self.reporter.submitted(),
            ..Default::default()
        };

        match self.gate.phase() {
            ScanPhase::Idle => {
                view.screen = Screen::Idle;
                view.manual_entry_visible = self.settings.scan.capability.shows_manual_entry();
            }
            ScanPhase::Scanning { chip_uid } => {
                view.screen = Screen::Scanning;
                view.chip_uid = Some(chip_uid.clone());
            }
            ScanPhase::Success { chip_uid, .. } => {
                view.screen = Screen::Success;
                view.chip_uid = Some(chip_uid.clone());
            }
            ScanPhase::PlaybackActive { chip_uid } => {
                view.screen = Screen::Playing;
                view.chip_uid = Some(chip_uid.clone());
            }
            ScanPhase::Error { error } => {
                view.screen = Screen::Error;
                view.message = Some(error.child_message());
                view.scan_again_available = true;
            }
        }

        if let Some(playlist) = &self.playlist {
            view.current_video = Some(playlist.current_video().clone());
            view.video_index = Some(playlist.session().current_index());
            view.video_count = playlist.session().len();
            view.loading = playlist.is_loading();
            view.player_generation = Some(playlist.generation());
            view.position = playlist.position();
            if let PlaybackPhase::Failed(error) = playlist.phase() {
                view.message = Some(error.child_message());
                view.retry_available = true;
            }
        }
        view
    }

    fn publish(&self) {
        let next = self.view();
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Running kids-mode runtime plus its optional gesture pipeline
pub struct KidsModeHandle {
    events: mpsc::Sender<RuntimeEvent>,
    view: watch::Receiver<KidsModeView>,
    gestures: Option<GestureHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl KidsModeHandle {
    /// Spawns the runtime; with a sensor source the gesture pipeline is
    /// started first so its notices and commands reach the same queue
    pub async fn spawn(
        collaborators: Collaborators,
        settings: RuntimeSettings,
        sensors: Option<Box<dyn SensorSource>>,
    ) -> Result<Self, RuntimeError> {
        let (events, receiver) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let mut tasks = Vec::new();

        let gestures = match sensors {
            Some(source) => {
                let (gesture_sender, mut gesture_receiver) = mpsc::channel(EVENT_QUEUE_CAPACITY);
                let handle =
                    GestureHandle::spawn(source, settings.gestures.clone(), gesture_sender).await?;

                let forward = events.clone();
                tasks.push(tokio::spawn(async move {
                    while let Some(output) = gesture_receiver.recv().await {
                        if forward.send(RuntimeEvent::Gesture(output)).await.is_err() {
                            debug!("Runtime gone, stopping gesture forwarding");
                            break;
                        }
                    }
                }));
                Some(handle)
            }
            None => None,
        };

        let gesture_input = gestures.as_ref().and_then(GestureHandle::input_sender);
        let (kids_mode, view) = KidsMode::new(collaborators, settings, events.clone());
        let kids_mode = kids_mode.with_gesture_input(gesture_input);
        tasks.insert(0, tokio::spawn(kids_mode.run(receiver)));

        info!("Kids mode spawned");
        Ok(Self {
            events,
            view,
            gestures,
            tasks,
        })
    }

    pub fn sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.events.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<KidsModeView> {
        self.view.clone()
    }

    pub fn gestures_enabled(&self) -> bool {
        self.gestures.as_ref().is_some_and(GestureHandle::is_enabled)
    }

    pub async fn send(&self, event: RuntimeEvent) -> Result<(), RuntimeError> {
        self.events
            .send(event)
            .await
            .map_err(|e| RuntimeError::ChannelError(e.to_string()))
    }

    /// Stops gestures, then the runtime, waiting for pending reports
    pub async fn shutdown(mut self) -> Result<(), RuntimeError> {
        if let Some(mut gestures) = self.gestures.take() {
            gestures.shutdown().await?;
        }
        if self.events.send(RuntimeEvent::Shutdown).await.is_err() {
            warn!("Runtime already stopped");
        }

        let mut tasks = self.tasks.drain(..);
        if let Some(runtime_task) = tasks.next() {
            runtime_task
                .await
                .map_err(|e| RuntimeError::TaskError(e.to_string()))?;
        }
        for task in tasks {
            task.abort();
        }
        Ok(())
    }
}
