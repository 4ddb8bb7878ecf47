//! PlaylistController state machine
//!
//! ```text
//!            ┌───────── Ended (more videos) ─────────┐
//!            ▼                                       │
//! start ─► Loading ──Ready──► Playing ──────────────┤
//!            │                   │                   │
//!          Error               Error            Ended (last)
//!            ▼                   ▼                   ▼
//!          Failed ◄──────────────┘               Completed
//!            │
//!   RestartCurrent ─► Loading          ExitFullscreen (any) ─► Exited
//! ```
//!
//! The controller never touches a player itself. It returns
//! [`PlaylistOutput`]s that the runtime executes, and every load carries a
//! generation number so late callbacks from a superseded load are dropped.

use super::embed::EmbedEvent;
use super::session::{PlaybackError, PlaybackSession};
use crate::api::{SessionReport, VideoRef};
use crate::events::{Command, Notice};
use chrono::Local;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackPhase {
    /// Waiting for the embed to become ready; the loading indicator is shown
    Loading,
    Playing,
    /// The current video failed; retry or back-to-scan are offered
    Failed(PlaybackError),
    Completed,
    Exited,
}

impl PlaybackPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackPhase::Completed | PlaybackPhase::Exited)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistEvent {
    Command(Command),
    Embed(EmbedEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The last video ended
    Completed,
    /// The child left early (swipe or back-to-scan)
    Exited,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEnd {
    pub reason: EndReason,
    pub report: SessionReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistOutput {
    Load { video: VideoRef, generation: u64 },
    Seek { position: f64 },
    Notice(Notice),
    Failed(PlaybackError),
    Finished(SessionEnd),
}

#[derive(Debug)]
pub struct PlaylistController {
    session: PlaybackSession,
    phase: PlaybackPhase,
    generation: u64,
    position: f64,
    duration: Option<f64>,
}

impl PlaylistController {
    /// Takes ownership of a fresh session and asks for its first video
    pub fn start(session: PlaybackSession) -> (Self, Vec<PlaylistOutput>) {
        info!(
            "Starting playlist for chip {} with {} videos",
            session.chip_uid(),
            session.len()
        );
        let mut controller = Self {
            session,
            phase: PlaybackPhase::Loading,
            generation: 0,
            position: 0.0,
            duration: None,
        };
        let output = controller.load_current();
        (controller, vec![output])
    }

    pub fn phase(&self) -> &PlaybackPhase {
        &self.phase
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn current_video(&self) -> &VideoRef {
        self.session.current()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn is_loading(&self) -> bool {
        self.phase == PlaybackPhase::Loading
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn handle(&mut self, event: PlaylistEvent) -> Vec<PlaylistOutput> {
        if self.phase.is_terminal() {
            debug!("Playlist already finished, ignoring {:?}", event);
            return Vec::new();
        }

        match event {
            PlaylistEvent::Command(command) => self.handle_command(command),
            PlaylistEvent::Embed(embed) => self.handle_embed(embed),
        }
    }

    fn handle_command(&mut self, command: Command) -> Vec<PlaylistOutput> {
        match command {
            Command::ScrubBy(delta) => self.scrub_by(delta).into_iter().collect(),
            Command::SkipNext => {
                if self.session.is_last() {
                    info!("Skip requested on the last video, staying put");
                    return vec![PlaylistOutput::Notice(Notice::NoMoreVideos)];
                }
                self.advance()
            }
            Command::SkipPrevious => {
                if self.session.step_back() {
                    info!("Going back to video {}", self.session.current_index() + 1);
                    return vec![self.load_current()];
                }
                info!("Previous requested on the first video, restarting it");
                let mut outputs = vec![self.restart_current()];
                outputs.push(PlaylistOutput::Notice(Notice::FirstVideoRestarted));
                outputs
            }
            Command::RestartCurrent => vec![self.restart_current()],
            Command::ExitFullscreen => vec![self.finish(EndReason::Exited)],
        }
    }

    fn handle_embed(&mut self, event: EmbedEvent) -> Vec<PlaylistOutput> {
        if event.generation() != self.generation {
            debug!(
                "Dropping stale embed event {:?} (current generation {})",
                event, self.generation
            );
            return Vec::new();
        }

        match event {
            EmbedEvent::Ready { .. } => {
                if self.phase == PlaybackPhase::Loading {
                    info!("Video {} is playing", self.session.current().id);
                    self.phase = PlaybackPhase::Playing;
                    self.session.mark_current_watched();
                }
                Vec::new()
            }
            EmbedEvent::Progress {
                position, duration, ..
            } => {
                if self.phase == PlaybackPhase::Playing {
                    if duration.is_some() {
                        self.duration = duration;
                    }
                    self.position = self.clamp(position);
                }
                Vec::new()
            }
            EmbedEvent::Ended { .. } => match self.phase {
                PlaybackPhase::Loading | PlaybackPhase::Playing => self.advance(),
                _ => Vec::new(),
            },
            EmbedEvent::Error { message, .. } => {
                let error = PlaybackError::LoadFailed {
                    video_id: self.session.current().id,
                    reason: message,
                };
                warn!("{}", error);
                self.phase = PlaybackPhase::Failed(error.clone());
                vec![PlaylistOutput::Failed(error)]
            }
        }
    }

    /// Next video, or the end of the session when none is left
    fn advance(&mut self) -> Vec<PlaylistOutput> {
        if self.session.step_forward() {
            info!(
                "Advancing to video {} of {}",
                self.session.current_index() + 1,
                self.session.len()
            );
            vec![self.load_current()]
        } else {
            vec![self.finish(EndReason::Completed)]
        }
    }

    fn restart_current(&mut self) -> PlaylistOutput {
        if self.phase == PlaybackPhase::Playing {
            self.position = 0.0;
            PlaylistOutput::Seek { position: 0.0 }
        } else {
            self.load_current()
        }
    }

    fn scrub_by(&mut self, delta: f64) -> Option<PlaylistOutput> {
        if self.phase != PlaybackPhase::Playing {
            return None;
        }
        let target = self.clamp(self.position + delta);
        if target == self.position {
            return None;
        }
        self.position = target;
        Some(PlaylistOutput::Seek { position: target })
    }

    fn clamp(&self, position: f64) -> f64 {
        let position = position.max(0.0);
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn load_current(&mut self) -> PlaylistOutput {
        self.generation += 1;
        self.phase = PlaybackPhase::Loading;
        self.position = 0.0;
        self.duration = None;
        PlaylistOutput::Load {
            video: self.session.current().clone(),
            generation: self.generation,
        }
    }

    fn finish(&mut self, reason: EndReason) -> PlaylistOutput {
        // Bump the generation so nothing from the last load is accepted
        self.generation += 1;
        self.phase = match reason {
            EndReason::Completed => PlaybackPhase::Completed,
            EndReason::Exited => PlaybackPhase::Exited,
        };

        let report = SessionReport {
            chip_uid: self.session.chip_uid().clone(),
            videos_watched: self.session.watched().to_vec(),
            completed: reason == EndReason::Completed,
            started_at: self.session.started_at(),
            ended_at: Local::now(),
        };
        info!(
            "Session for chip {} finished ({:?}), {} videos watched",
            report.chip_uid,
            reason,
            report.videos_watched.len()
        );
        PlaylistOutput::Finished(SessionEnd { reason, report })
    }
}
