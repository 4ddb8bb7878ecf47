//! Tilt to scrub mapping
//!
//! `beta` inside ±`dead_zone_deg` is ignored. Beyond it the excess, clamped
//! at `max_tilt_deg`, maps linearly onto a scrub rate between
//! `min_scrub_rate` and `max_scrub_rate` seconds of video per second of tilt.
//! Positive beta scrubs forward, negative backward.

use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const TILT_DEAD_ZONE_DEG: f32 = 15.0;
pub const TILT_MAX_DEG: f32 = 45.0;
pub const MIN_SCRUB_RATE: f64 = 1.0;
pub const MAX_SCRUB_RATE: f64 = 8.0;
/// Longest gap between two samples that still counts as sustained tilt
pub const MAX_SCRUB_INTERVAL_MS: i64 = 250;
/// Interval assumed for the first sample after a pause
pub const NOMINAL_SAMPLE_INTERVAL_MS: i64 = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TiltSettings {
    pub dead_zone_deg: f32,
    pub max_tilt_deg: f32,
    pub min_scrub_rate: f64,
    pub max_scrub_rate: f64,
    pub max_interval_ms: i64,
    pub nominal_interval_ms: i64,
}

impl Default for TiltSettings {
    fn default() -> Self {
        Self {
            dead_zone_deg: TILT_DEAD_ZONE_DEG,
            max_tilt_deg: TILT_MAX_DEG,
            min_scrub_rate: MIN_SCRUB_RATE,
            max_scrub_rate: MAX_SCRUB_RATE,
            max_interval_ms: MAX_SCRUB_INTERVAL_MS,
            nominal_interval_ms: NOMINAL_SAMPLE_INTERVAL_MS,
        }
    }
}

impl TiltSettings {
    pub fn in_dead_zone(&self, beta: f32) -> bool {
        beta.abs() <= self.dead_zone_deg
    }
}

/// Signed scrub rate in seconds per second, `0.0` inside the dead zone
pub fn scrub_rate(beta: f32, settings: &TiltSettings) -> f64 {
    if settings.in_dead_zone(beta) {
        return 0.0;
    }

    let span = (settings.max_tilt_deg - settings.dead_zone_deg).max(f32::EPSILON);
    let excess = (beta.abs().min(settings.max_tilt_deg) - settings.dead_zone_deg).max(0.0);
    let fraction = f64::from(excess / span);
    let rate = settings.min_scrub_rate + (settings.max_scrub_rate - settings.min_scrub_rate) * fraction;

    rate.copysign(f64::from(beta))
}

/// Scrub delta for one orientation sample covering `interval`
pub fn scrub_delta(beta: f32, interval: Duration, settings: &TiltSettings) -> Option<f64> {
    let rate = scrub_rate(beta, settings);
    if rate == 0.0 {
        return None;
    }

    let millis = clamp_interval(interval, settings).num_milliseconds();
    Some(rate * millis as f64 / 1000.0)
}

fn clamp_interval(interval: Duration, settings: &TiltSettings) -> Duration {
    let millis = interval.num_milliseconds();
    if millis <= 0 {
        Duration::milliseconds(settings.nominal_interval_ms)
    } else {
        Duration::milliseconds(millis.min(settings.max_interval_ms))
    }
}
