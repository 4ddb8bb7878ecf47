//! ScanGate state machine
//!
//! ```text
//! Idle ──scan──► Scanning ──videos──► Success ──► PlaybackActive ──► Idle
//!  ▲                │
//!  └──scan again── Error ◄──empty / lookup failed
//! ```

use crate::api::{ApiError, ChipPlaylist, ChipUid, VideoRef};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a scan did not start a session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("Chip {0} has no videos")]
    EmptyPlaylist(ChipUid),

    #[error("Chip {0} is not registered")]
    UnknownChip(ChipUid),

    #[error("Chip lookup failed: {0}")]
    LookupFailed(String),

    #[error("Malformed playlist: {0}")]
    MalformedPlaylist(String),
}

impl ScanError {
    /// Text shown to the child; never technical
    pub fn child_message(&self) -> &'static str {
        match self {
            ScanError::EmptyPlaylist(_) => {
                "There are no videos on this chip yet. Ask a grown-up to add some!"
            }
            ScanError::UnknownChip(_) => "Hmm, I don't know this chip. Ask a grown-up for help!",
            ScanError::LookupFailed(_) | ScanError::MalformedPlaylist(_) => {
                "Oops, something went wrong. Let's try that again!"
            }
        }
    }

    /// Whether scanning the same chip again might succeed without a grown-up
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScanError::LookupFailed(_) | ScanError::MalformedPlaylist(_)
        )
    }
}

impl From<ApiError> for ScanError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::ChipNotFound(chip_uid) => ScanError::UnknownChip(chip_uid),
            other => ScanError::LookupFailed(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Scanning { chip_uid: ChipUid },
    Success { chip_uid: ChipUid, video_count: usize },
    PlaybackActive { chip_uid: ChipUid },
    Error { error: ScanError },
}

#[derive(Debug)]
pub enum ScanGateEvent {
    Scan(ChipUid),
    LookupFinished {
        chip_uid: ChipUid,
        result: Result<ChipPlaylist, ApiError>,
    },
    ConfirmationShown,
    SessionFinished,
    ScanAgain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanGateOutput {
    /// Resolve this chip through the playlist API
    Lookup(ChipUid),
    SessionStart {
        chip_uid: ChipUid,
        videos: Vec<VideoRef>,
    },
    SessionError(ScanError),
}

#[derive(Debug)]
pub struct ScanGate {
    phase: ScanPhase,
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanGate {
    pub fn new() -> Self {
        Self {
            phase: ScanPhase::Idle,
        }
    }

    pub fn phase(&self) -> &ScanPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == ScanPhase::Idle
    }

    /// The scan prompt pulses for as long as the gate waits for a chip
    pub fn prompt_pulsating(&self) -> bool {
        self.is_idle()
    }

    pub fn handle(&mut self, event: ScanGateEvent) -> Option<ScanGateOutput> {
        match event {
            ScanGateEvent::Scan(chip_uid) => match &self.phase {
                ScanPhase::Idle | ScanPhase::Error { .. } => {
                    info!("Chip {} scanned, looking up playlist", chip_uid);
                    self.phase = ScanPhase::Scanning {
                        chip_uid: chip_uid.clone(),
                    };
                    Some(ScanGateOutput::Lookup(chip_uid))
                }
                busy => {
                    debug!("Ignoring scan of {} while {:?}", chip_uid, busy);
                    None
                }
            },
            ScanGateEvent::LookupFinished { chip_uid, result } => {
                match &self.phase {
                    ScanPhase::Scanning { chip_uid: pending } if *pending == chip_uid => {}
                    other => {
                        debug!("Dropping stale lookup for {} while {:?}", chip_uid, other);
                        return None;
                    }
                }

                match resolve(&chip_uid, result) {
                    Ok(videos) => {
                        info!("Chip {} resolved to {} videos", chip_uid, videos.len());
                        self.phase = ScanPhase::Success {
                            chip_uid: chip_uid.clone(),
                            video_count: videos.len(),
                        };
                        Some(ScanGateOutput::SessionStart { chip_uid, videos })
                    }
                    Err(error) => {
                        warn!("Scan of {} failed: {}", chip_uid, error);
                        self.phase = ScanPhase::Error {
                            error: error.clone(),
                        };
                        Some(ScanGateOutput::SessionError(error))
                    }
                }
            }
            ScanGateEvent::ConfirmationShown => {
                if let ScanPhase::Success { chip_uid, .. } = &self.phase {
                    info!("Playback active for chip {}", chip_uid);
                    self.phase = ScanPhase::PlaybackActive {
                        chip_uid: chip_uid.clone(),
                    };
                }
                None
            }
            ScanGateEvent::SessionFinished => {
                if matches!(
                    self.phase,
                    ScanPhase::Success { .. } | ScanPhase::PlaybackActive { .. }
                ) {
                    info!("Session finished, back to scan screen");
                    self.phase = ScanPhase::Idle;
                }
                None
            }
            ScanGateEvent::ScanAgain => {
                if let ScanPhase::Error { .. } = self.phase {
                    info!("Returning to scan screen");
                    self.phase = ScanPhase::Idle;
                }
                None
            }
        }
    }
}

fn resolve(
    chip_uid: &ChipUid,
    result: Result<ChipPlaylist, ApiError>,
) -> Result<Vec<VideoRef>, ScanError> {
    let playlist = result?;
    if playlist.videos.is_empty() {
        return Err(ScanError::EmptyPlaylist(chip_uid.clone()));
    }
    order_playlist(playlist.videos)
}

/// Orders videos by sequence number
///
/// Gaps in the numbering are tolerated; duplicate sequence numbers or video
/// ids reject the playlist.
pub fn order_playlist(mut videos: Vec<VideoRef>) -> Result<Vec<VideoRef>, ScanError> {
    videos.sort_by_key(|video| video.sequence_order);

    let mut seen_ids = HashSet::new();
    for (position, video) in videos.iter().enumerate() {
        if !seen_ids.insert(video.id) {
            return Err(ScanError::MalformedPlaylist(format!(
                "video {} assigned twice",
                video.id
            )));
        }
        if position > 0 && videos[position - 1].sequence_order == video.sequence_order {
            return Err(ScanError::MalformedPlaylist(format!(
                "sequence order {} used twice",
                video.sequence_order
            )));
        }
        if video.sequence_order as usize != position + 1 {
            warn!(
                "Playlist numbering is not contiguous: video {} has sequence {} at position {}",
                video.id,
                video.sequence_order,
                position + 1
            );
        }
    }
    Ok(videos)
}
