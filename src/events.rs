//! Command and event vocabulary shared by all kids-mode components
//!
//! Components never read each other's fields. Gestures become [`Command`]s,
//! host callbacks become [`RuntimeEvent`]s, and both travel through the
//! runtime's single inbound queue.

use crate::api::{ApiError, ChipPlaylist, ChipUid};
use crate::playback::embed::EmbedEvent;
use crate::swipe::TouchEvent;

/// Playback command produced by gestures or by the retry/back affordances
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Move the playback position by the given number of seconds (signed)
    ScrubBy(f64),
    SkipNext,
    SkipPrevious,
    RestartCurrent,
    ExitFullscreen,
}

/// Child-facing, dismissible acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Skip was requested on the last video
    NoMoreVideos,
    /// Previous was requested on the first video, so it started over
    FirstVideoRestarted,
    /// Motion/orientation access was refused, tilting and shaking are off
    MotionAccessDenied,
}

impl Notice {
    /// Brief acknowledgments that belong to the running session and clear
    /// themselves; everything else stays until dismissed
    pub fn is_transient(&self) -> bool {
        matches!(self, Notice::NoMoreVideos | Notice::FirstVideoRestarted)
    }

    pub fn child_message(&self) -> &'static str {
        match self {
            Notice::NoMoreVideos => "That was the last video!",
            Notice::FirstVideoRestarted => "Starting this video again!",
            Notice::MotionAccessDenied => {
                "Tilting and shaking are turned off. Ask a grown-up to allow motion."
            }
        }
    }
}

/// Output of the gesture pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutput {
    Command(Command),
    Notice(Notice),
}

/// Everything the kids-mode runtime reacts to
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A chip was tapped (NFC) or entered manually
    Scan(ChipUid),
    /// The chip lookup started by a scan has resolved
    LookupFinished {
        chip_uid: ChipUid,
        result: Result<ChipPlaylist, ApiError>,
    },
    /// The scan success confirmation has been visible long enough
    ConfirmationElapsed,
    Gesture(GestureOutput),
    Touch(TouchEvent),
    Embed(EmbedEvent),
    /// "Try again" on a failed video
    Retry,
    /// "Back to scan screen" on a failed video
    BackToScan,
    /// "Scan again" on the scan error screen
    ScanAgain,
    DismissNotice,
    /// Display time of the transient notice with this id is over
    NoticeElapsed(u64),
    Shutdown,
}
