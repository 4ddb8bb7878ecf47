//! Platform video embed capability
//!
//! YouTube/Vimeo/Dailymotion players all boil down to: load a video, then
//! report ready/progress/ended/error, and accept seeks. Every callback is
//! tagged with the load generation it belongs to so that callbacks from a
//! player the controller has already moved past can be recognized and
//! dropped.

use crate::api::VideoRef;
use crate::events::RuntimeEvent;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum EmbedEvent {
    Ready {
        generation: u64,
    },
    Progress {
        generation: u64,
        position: f64,
        duration: Option<f64>,
    },
    Ended {
        generation: u64,
    },
    Error {
        generation: u64,
        message: String,
    },
}

impl EmbedEvent {
    pub fn generation(&self) -> u64 {
        match self {
            EmbedEvent::Ready { generation }
            | EmbedEvent::Progress { generation, .. }
            | EmbedEvent::Ended { generation }
            | EmbedEvent::Error { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Load failed: {0}")]
    LoadFailed(String),
}

#[async_trait]
pub trait VideoEmbed: Send + Sync + 'static {
    /// Resolves once the video can be shown
    async fn load(&self, video: &VideoRef) -> Result<(), EmbedError>;

    fn seek(&self, position: f64);
}

/// Stand-in player: loads after a fixed delay, optionally failing some videos
#[derive(Debug, Clone, Default)]
pub struct SimulatedEmbed {
    load_delay: Duration,
    failing: HashSet<u64>,
}

impl SimulatedEmbed {
    pub fn new(load_delay: Duration) -> Self {
        Self {
            load_delay,
            failing: HashSet::new(),
        }
    }

    /// Make loads of this video id fail
    pub fn failing(mut self, video_id: u64) -> Self {
        self.failing.insert(video_id);
        self
    }
}

#[async_trait]
impl VideoEmbed for SimulatedEmbed {
    async fn load(&self, video: &VideoRef) -> Result<(), EmbedError> {
        tokio::time::sleep(self.load_delay).await;
        if self.failing.contains(&video.id) {
            return Err(EmbedError::LoadFailed(format!(
                "{} is unavailable",
                video.platform_video_id
            )));
        }
        Ok(())
    }

    fn seek(&self, position: f64) {
        debug!("Simulated player seeking to {:.2}s", position);
    }
}

struct InFlightLoad {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Runs at most one load at a time and reports its outcome to the runtime
pub struct EmbedLoader {
    embed: Arc<dyn VideoEmbed>,
    events: mpsc::Sender<RuntimeEvent>,
    in_flight: Option<InFlightLoad>,
}

impl EmbedLoader {
    pub fn new(embed: Arc<dyn VideoEmbed>, events: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            embed,
            events,
            in_flight: None,
        }
    }

    /// Starts loading `video`; any load still running is cancelled first
    pub fn load(&mut self, video: VideoRef, generation: u64) {
        self.cancel();

        let token = CancellationToken::new();
        let task_token = token.clone();
        let embed = self.embed.clone();
        let events = self.events.clone();

        info!(
            "Loading video {} ({}) as generation {}",
            video.id, video.title, generation
        );
        let task = tokio::spawn(async move {
            let token = task_token;
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Load of video {} (generation {}) cancelled", video.id, generation);
                }
                result = embed.load(&video) => {
                    if token.is_cancelled() {
                        return;
                    }
                    let event = match result {
                        Ok(()) => EmbedEvent::Ready { generation },
                        Err(e) => EmbedEvent::Error { generation, message: e.to_string() },
                    };
                    if let Err(e) = events.send(RuntimeEvent::Embed(event)).await {
                        warn!("Runtime gone before load of video {} finished: {}", video.id, e);
                    }
                }
            }
        });
        self.in_flight = Some(InFlightLoad { token, task });
    }

    pub fn seek(&self, position: f64) {
        self.embed.seek(position);
    }

    pub fn cancel(&mut self) {
        if let Some(load) = self.in_flight.take() {
            load.token.cancel();
        }
    }

    /// Whether a load is still running and has not reported yet
    pub fn has_pending_load(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|load| !load.token.is_cancelled() && !load.task.is_finished())
    }
}
