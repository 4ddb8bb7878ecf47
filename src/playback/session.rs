use crate::api::{ChipUid, VideoRef};
use chrono::{DateTime, Local};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("Cannot start a session without videos")]
    EmptySession,

    #[error("Video {video_id} failed: {reason}")]
    LoadFailed { video_id: u64, reason: String },
}

impl PlaybackError {
    pub fn child_message(&self) -> &'static str {
        match self {
            PlaybackError::EmptySession => "There are no videos to play.",
            PlaybackError::LoadFailed { .. } => "Oops! This video doesn't want to play right now.",
        }
    }
}

/// The videos resolved for one scan and the cursor into them
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    chip_uid: ChipUid,
    videos: Vec<VideoRef>,
    current_index: usize,
    started_at: DateTime<Local>,
    watched: Vec<u64>,
}

impl PlaybackSession {
    pub fn new(chip_uid: ChipUid, videos: Vec<VideoRef>) -> Result<Self, PlaybackError> {
        if videos.is_empty() {
            return Err(PlaybackError::EmptySession);
        }
        Ok(Self {
            chip_uid,
            videos,
            current_index: 0,
            started_at: Local::now(),
            watched: Vec::new(),
        })
    }

    pub fn chip_uid(&self) -> &ChipUid {
        &self.chip_uid
    }

    pub fn videos(&self) -> &[VideoRef] {
        &self.videos
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> &VideoRef {
        &self.videos[self.current_index]
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 == self.videos.len()
    }

    /// Moves the cursor forward; `false` when already on the last video
    pub fn step_forward(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current_index += 1;
        true
    }

    /// Moves the cursor back; `false` when already on the first video
    pub fn step_back(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current_index -= 1;
        true
    }

    pub fn mark_current_watched(&mut self) {
        let id = self.current().id;
        if !self.watched.contains(&id) {
            self.watched.push(id);
        }
    }

    pub fn watched(&self) -> &[u64] {
        &self.watched
    }
}
