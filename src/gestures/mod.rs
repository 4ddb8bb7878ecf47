//! Gesture engine: motion signals to playback commands
//!
//! Tilt and shake are two independent paths that meet only at the
//! [`Command`](crate::events::Command) layer:
//!
//! - [`tilt`] - dead zone and intensity curve, continuous `ScrubBy`
//! - [`shake`] - cooldown gate, discrete `SkipNext` / `SkipPrevious`
//! - [`interpreter`] - `GestureState` plus the per-signal decision logic
//! - [`engine`] - statum lifecycle and the tokio task running it

pub mod engine;
pub mod interpreter;
pub mod shake;
pub mod tilt;

pub use engine::{GestureEngine, GestureError, GestureHandle, GestureInput};
pub use interpreter::{GestureInterpreter, GestureState};
pub use shake::{ShakeSettings, SHAKE_COOLDOWN_MS};
pub use tilt::{TiltSettings, TILT_DEAD_ZONE_DEG, TILT_MAX_DEG};

use crate::sensors::SamplerSettings;
use serde::{Deserialize, Serialize};

/// Settings for the whole gesture path, split per stage on spawn
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    pub tilt: TiltSettings,
    pub shake: ShakeSettings,
    pub sampler: SamplerSettings,
}
