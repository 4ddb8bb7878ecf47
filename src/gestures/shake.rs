//! Shake to skip mapping
//!
//! After an accepted shake every further shake is dropped until the cooldown
//! expires. Dropped shakes are not queued.

use crate::events::Command;
use crate::sensors::ShakeDirection;
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

/// Cooldown after an accepted shake
pub const SHAKE_COOLDOWN_MS: i64 = 800;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeSettings {
    pub cooldown_ms: i64,
}

impl Default for ShakeSettings {
    fn default() -> Self {
        Self {
            cooldown_ms: SHAKE_COOLDOWN_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShakeVerdict {
    Accepted { cooldown_until: DateTime<Local> },
    Dropped { remaining_ms: i64 },
}

pub fn judge(
    cooldown_until: Option<DateTime<Local>>,
    at: DateTime<Local>,
    settings: &ShakeSettings,
) -> ShakeVerdict {
    match cooldown_until {
        Some(until) if at < until => ShakeVerdict::Dropped {
            remaining_ms: (until - at).num_milliseconds(),
        },
        _ => ShakeVerdict::Accepted {
            cooldown_until: at + Duration::milliseconds(settings.cooldown_ms),
        },
    }
}

pub fn command_for(direction: ShakeDirection) -> Command {
    match direction {
        ShakeDirection::Right => Command::SkipNext,
        ShakeDirection::Left => Command::SkipPrevious,
    }
}
