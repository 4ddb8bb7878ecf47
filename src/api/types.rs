use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier read from an NFC tag or typed in manually
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChipUid(String);

impl ChipUid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChipUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chip {
    pub chip_uid: ChipUid,
}

/// One playlist entry as delivered by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRef {
    pub id: u64,
    pub title: String,
    pub platform_id: u64,
    pub platform_video_id: String,
    /// 1-based position within the chip's playlist
    pub sequence_order: u32,
}

/// Response of the chip scan endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipPlaylist {
    pub chip: Chip,
    #[serde(default)]
    pub videos: Vec<VideoRef>,
}

/// Body of the session-end notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub chip_uid: ChipUid,
    /// Ids of the videos that actually became visible, in viewing order
    pub videos_watched: Vec<u64>,
    /// `true` when the playlist ran out, `false` when the child left early
    pub completed: bool,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
}
