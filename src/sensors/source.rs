//! `SensorSource` capability
//!
//! Orientation and motion are process-wide singletons on the host. They are
//! only ever reached through this trait, so tests can swap in a
//! [`ReplaySource`] that plays back recorded samples.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tracing::debug;

/// `accelerationIncludingGravity` vector in m/s²
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Raw sample as delivered by the host
#[derive(Debug, Clone, PartialEq)]
pub enum RawSensorEvent {
    /// Device orientation; `beta` is the front-to-back tilt in degrees
    Orientation {
        beta: f32,
        timestamp: DateTime<Local>,
    },
    Motion {
        acceleration: Acceleration,
        timestamp: DateTime<Local>,
    },
}

impl RawSensorEvent {
    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            RawSensorEvent::Orientation { timestamp, .. }
            | RawSensorEvent::Motion { timestamp, .. } => *timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

/// Result of a non-blocking poll
#[derive(Debug, Clone, PartialEq)]
pub enum SensorPoll {
    Event(RawSensorEvent),
    /// Nothing new right now
    Pending,
    /// The source will never deliver again
    Closed,
}

pub trait SensorSource: Send + 'static {
    /// Whether the platform needs an explicit user grant before delivering
    fn requires_permission(&self) -> bool {
        false
    }

    fn request_permission(&mut self) -> PermissionDecision {
        PermissionDecision::Granted
    }

    fn poll_event(&mut self) -> SensorPoll;
}

/// Plays back a recorded sequence of samples
#[derive(Debug, Clone)]
pub struct ReplaySource {
    samples: VecDeque<RawSensorEvent>,
    requires_permission: bool,
    decision: PermissionDecision,
}

impl ReplaySource {
    pub fn new(samples: impl IntoIterator<Item = RawSensorEvent>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            requires_permission: false,
            decision: PermissionDecision::Granted,
        }
    }

    /// Behave like a platform that asks the user first and answers `decision`
    pub fn with_permission(mut self, decision: PermissionDecision) -> Self {
        self.requires_permission = true;
        self.decision = decision;
        self
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SensorSource for ReplaySource {
    fn requires_permission(&self) -> bool {
        self.requires_permission
    }

    fn request_permission(&mut self) -> PermissionDecision {
        debug!("Replay source answering permission request: {:?}", self.decision);
        self.decision
    }

    fn poll_event(&mut self) -> SensorPoll {
        match self.samples.pop_front() {
            Some(event) => SensorPoll::Event(event),
            None => SensorPoll::Closed,
        }
    }
}

/// Live source fed by whatever owns the sending half (device bridge, kiosk stdin)
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<RawSensorEvent>,
}

impl ChannelSource {
    pub fn new(receiver: mpsc::Receiver<RawSensorEvent>) -> Self {
        Self { receiver }
    }
}

impl SensorSource for ChannelSource {
    fn poll_event(&mut self) -> SensorPoll {
        match self.receiver.try_recv() {
            Ok(event) => SensorPoll::Event(event),
            Err(mpsc::error::TryRecvError::Empty) => SensorPoll::Pending,
            Err(mpsc::error::TryRecvError::Disconnected) => SensorPoll::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_source_drains_in_order_then_closes() {
        let now = Local::now();
        let mut source = ReplaySource::new(vec![
            RawSensorEvent::Orientation { beta: 1.0, timestamp: now },
            RawSensorEvent::Orientation { beta: 2.0, timestamp: now },
        ]);

        assert!(matches!(
            source.poll_event(),
            SensorPoll::Event(RawSensorEvent::Orientation { beta, .. }) if beta == 1.0
        ));
        assert!(matches!(
            source.poll_event(),
            SensorPoll::Event(RawSensorEvent::Orientation { beta, .. }) if beta == 2.0
        ));
        assert_eq!(source.poll_event(), SensorPoll::Closed);
    }

    #[test]
    fn channel_source_reports_pending_and_closed() {
        let (tx, rx) = mpsc::channel(4);
        let mut source = ChannelSource::new(rx);
        assert_eq!(source.poll_event(), SensorPoll::Pending);

        drop(tx);
        assert_eq!(source.poll_event(), SensorPoll::Closed);
    }
}
