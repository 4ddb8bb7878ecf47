//! Playlist playback
//!
//! - [`session`] - `PlaybackSession`: ordered videos plus cursor
//! - [`controller`] - `PlaylistController`: the per-session state machine
//! - [`embed`] - platform video embed capability and the cancellable loader

pub mod controller;
pub mod embed;
pub mod session;

pub use controller::{EndReason, PlaybackPhase, PlaylistController, PlaylistEvent, PlaylistOutput, SessionEnd};
pub use embed::{EmbedError, EmbedEvent, EmbedLoader, SimulatedEmbed, VideoEmbed};
pub use session::{PlaybackError, PlaybackSession};

use serde::{Deserialize, Serialize};

/// How long the scan success confirmation stays up before playback takes over
pub const SUCCESS_DISPLAY_MS: u64 = 600;
/// How long "last video" and "starting over" acknowledgments stay up
pub const NOTICE_DISPLAY_MS: u64 = 2500;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub success_display_ms: u64,
    pub notice_display_ms: u64,
    /// Load time of the simulated embed used by the kiosk binary
    pub simulated_load_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            success_display_ms: SUCCESS_DISPLAY_MS,
            notice_display_ms: NOTICE_DISPLAY_MS,
            simulated_load_ms: 300,
        }
    }
}
