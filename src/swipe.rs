//! Swipe-down-to-exit detection
//!
//! A completed touch sequence is classified by its net displacement. Only a
//! predominantly vertical, downward swipe of at least `min_distance_px`
//! counts, and only while the detector is armed (a session is loading or
//! playing). Firing disarms it, so a second swipe on an exited session is a
//! no-op.

use crate::events::Command;
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const SWIPE_MIN_DISTANCE_PX: f32 = 100.0;
pub const SWIPE_COOLDOWN_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Start {
        x: f32,
        y: f32,
        timestamp: DateTime<Local>,
    },
    Move {
        x: f32,
        y: f32,
        timestamp: DateTime<Local>,
    },
    End {
        x: f32,
        y: f32,
        timestamp: DateTime<Local>,
    },
    Cancel,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SwipeSettings {
    pub min_distance_px: f32,
    pub cooldown_ms: i64,
}

impl Default for SwipeSettings {
    fn default() -> Self {
        Self {
            min_distance_px: SWIPE_MIN_DISTANCE_PX,
            cooldown_ms: SWIPE_COOLDOWN_MS,
        }
    }
}

/// Start of the touch sequence in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeState {
    pub start_x: f32,
    pub start_y: f32,
    pub start_time: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeClass {
    ExitSwipe,
    TooShort,
    NotVertical,
    Upward,
}

/// Classifies net displacement; screen `y` grows downward
pub fn classify(dx: f32, dy: f32, settings: &SwipeSettings) -> SwipeClass {
    if dy.abs() < settings.min_distance_px {
        SwipeClass::TooShort
    } else if dx.abs() > dy.abs() {
        SwipeClass::NotVertical
    } else if dy < 0.0 {
        SwipeClass::Upward
    } else {
        SwipeClass::ExitSwipe
    }
}

#[derive(Debug)]
pub struct SwipeDetector {
    settings: SwipeSettings,
    current: Option<SwipeState>,
    armed: bool,
    last_exit_at: Option<DateTime<Local>>,
}

impl SwipeDetector {
    pub fn new(settings: SwipeSettings) -> Self {
        Self {
            settings,
            current: None,
            armed: false,
            last_exit_at: None,
        }
    }

    /// Enable exit swipes for a new session
    pub fn arm(&mut self) {
        debug!("Swipe detector armed");
        self.armed = true;
        self.current = None;
    }

    /// Back on the scan screen: swipes do nothing
    pub fn disarm(&mut self) {
        debug!("Swipe detector disarmed");
        self.armed = false;
        self.current = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn in_progress(&self) -> Option<&SwipeState> {
        self.current.as_ref()
    }

    pub fn handle(&mut self, event: TouchEvent) -> Option<Command> {
        match event {
            TouchEvent::Start { x, y, timestamp } => {
                self.current = Some(SwipeState {
                    start_x: x,
                    start_y: y,
                    start_time: timestamp,
                });
                None
            }
            // Classification uses net displacement only
            TouchEvent::Move { .. } => None,
            TouchEvent::Cancel => {
                self.current = None;
                None
            }
            TouchEvent::End { x, y, timestamp } => {
                let start = self.current.take()?;
                self.finish(start, x - start.start_x, y - start.start_y, timestamp)
            }
        }
    }

    fn finish(
        &mut self,
        start: SwipeState,
        dx: f32,
        dy: f32,
        at: DateTime<Local>,
    ) -> Option<Command> {
        let class = classify(dx, dy, &self.settings);
        debug!(
            "Touch sequence dx={:.1} dy={:.1} over {}ms classified as {:?}",
            dx,
            dy,
            (at - start.start_time).num_milliseconds(),
            class
        );

        if class != SwipeClass::ExitSwipe {
            return None;
        }
        if !self.armed {
            debug!("Exit swipe ignored, no session is playing");
            return None;
        }
        if let Some(last) = self.last_exit_at {
            if at - last < Duration::milliseconds(self.settings.cooldown_ms) {
                debug!("Exit swipe ignored, still cooling down");
                return None;
            }
        }

        info!("Exit swipe detected");
        self.armed = false;
        self.last_exit_at = Some(at);
        Some(Command::ExitFullscreen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swipe(detector: &mut SwipeDetector, dx: f32, dy: f32, t: DateTime<Local>) -> Option<Command> {
        detector.handle(TouchEvent::Start { x: 200.0, y: 100.0, timestamp: t });
        detector.handle(TouchEvent::Move {
            x: 200.0 + dx / 2.0,
            y: 100.0 + dy / 2.0,
            timestamp: t + Duration::milliseconds(60),
        });
        detector.handle(TouchEvent::End {
            x: 200.0 + dx,
            y: 100.0 + dy,
            timestamp: t + Duration::milliseconds(120),
        })
    }

    fn armed() -> SwipeDetector {
        let mut detector = SwipeDetector::new(SwipeSettings::default());
        detector.arm();
        detector
    }

    #[test]
    fn short_swipe_is_ignored() {
        let mut detector = armed();
        assert_eq!(swipe(&mut detector, 0.0, 80.0, Local::now()), None);
        assert!(detector.is_armed());
    }

    #[test]
    fn long_downward_swipe_exits_once() {
        let mut detector = armed();
        let t0 = Local::now();
        assert_eq!(swipe(&mut detector, 30.0, 150.0, t0), Some(Command::ExitFullscreen));
        assert_eq!(
            swipe(&mut detector, 30.0, 150.0, t0 + Duration::seconds(3)),
            None
        );
    }

    #[test]
    fn diagonal_with_vertical_dominance_counts() {
        let mut detector = armed();
        assert_eq!(
            swipe(&mut detector, 120.0, 130.0, Local::now()),
            Some(Command::ExitFullscreen)
        );
    }

    #[test]
    fn diagonal_with_horizontal_dominance_does_not() {
        let mut detector = armed();
        assert_eq!(swipe(&mut detector, 160.0, 130.0, Local::now()), None);
    }

    #[test]
    fn upward_swipe_is_ignored() {
        assert_eq!(
            classify(0.0, -200.0, &SwipeSettings::default()),
            SwipeClass::Upward
        );
    }

    #[test]
    fn disarmed_detector_never_fires() {
        let mut detector = SwipeDetector::new(SwipeSettings::default());
        assert_eq!(swipe(&mut detector, 0.0, 300.0, Local::now()), None);
    }

    #[test]
    fn rearmed_detector_respects_cooldown() {
        let mut detector = armed();
        let t0 = Local::now();
        assert!(swipe(&mut detector, 0.0, 200.0, t0).is_some());

        detector.arm();
        assert_eq!(swipe(&mut detector, 0.0, 200.0, t0 + Duration::milliseconds(300)), None);
        assert!(swipe(&mut detector, 0.0, 200.0, t0 + Duration::seconds(2)).is_some());
    }

    #[test]
    fn end_without_start_and_cancelled_sequences_are_ignored() {
        let mut detector = armed();
        let t0 = Local::now();
        assert_eq!(
            detector.handle(TouchEvent::End { x: 0.0, y: 500.0, timestamp: t0 }),
            None
        );

        detector.handle(TouchEvent::Start { x: 0.0, y: 0.0, timestamp: t0 });
        detector.handle(TouchEvent::Cancel);
        assert!(detector.in_progress().is_none());
        assert_eq!(
            detector.handle(TouchEvent::End { x: 0.0, y: 500.0, timestamp: t0 }),
            None
        );
    }
}
