use crate::gestures::engine::GestureInput;
use crate::sensors::source::{PermissionDecision, RawSensorEvent, SensorPoll, SensorSource};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Magnitude of `accelerationIncludingGravity.x` (m/s²) that counts as a shake
pub const SHAKE_THRESHOLD: f32 = 15.0;
pub const SAMPLE_POLL_INTERVAL_MS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShakeDirection {
    Left,
    Right,
}

/// Normalized gesture signal
#[derive(Debug, Clone, PartialEq)]
pub enum GestureSignal {
    /// Continuous front-to-back tilt in degrees, one per orientation sample
    Tilt { beta: f32, timestamp: DateTime<Local> },
    /// Discrete impulse, emitted once per threshold crossing
    Shake {
        direction: ShakeDirection,
        magnitude: f32,
        timestamp: DateTime<Local>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    pub shake_threshold: f32,
    pub poll_interval_ms: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            shake_threshold: SHAKE_THRESHOLD,
            poll_interval_ms: SAMPLE_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("Motion permission denied")]
    PermissionDenied,

    #[error("Failed to send signal: {0}")]
    SignalSendError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum SamplerState {
    Initializing,
    Sampling,
}

#[machine]
pub struct GestureSampler<S: SamplerState> {
    source: Box<dyn SensorSource>,

    settings: SamplerSettings,

    // Inbound queue of the gesture engine
    signal_sender: mpsc::Sender<GestureInput>,

    // Direction of the shake currently above threshold, if any
    shake_in_progress: Option<ShakeDirection>,
}

impl<S: SamplerState> GestureSampler<S> {
    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }
}

impl GestureSampler<Initializing> {
    pub fn create(
        source: Box<dyn SensorSource>,
        settings: Option<SamplerSettings>,
        signal_sender: mpsc::Sender<GestureInput>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        debug!("Creating GestureSampler with settings: {:?}", settings);
        Self::new(source, settings, signal_sender, None)
    }

    /// Asks the platform for motion access where it is required
    ///
    /// On denial the sampler, and with it the source, is dropped: no listener
    /// stays attached.
    pub fn request_permission(mut self) -> Result<GestureSampler<Sampling>, SamplerError> {
        if !self.source.requires_permission() {
            debug!("Sensor source needs no explicit permission");
            return Ok(self.transition());
        }

        info!("Requesting motion/orientation permission");
        match self.source.request_permission() {
            PermissionDecision::Granted => {
                info!("Motion permission granted, transitioning to Sampling state");
                Ok(self.transition())
            }
            PermissionDecision::Denied => {
                warn!("Motion permission denied, gestures stay disabled");
                Err(SamplerError::PermissionDenied)
            }
        }
    }
}

impl GestureSampler<Sampling> {
    /// Turns one raw sample into at most one signal
    pub fn normalize(&mut self, event: RawSensorEvent) -> Option<GestureSignal> {
        match event {
            RawSensorEvent::Orientation { beta, timestamp } => {
                if !beta.is_finite() {
                    debug!("Dropping non-finite orientation sample");
                    return None;
                }
                Some(GestureSignal::Tilt {
                    beta: beta.clamp(-180.0, 180.0),
                    timestamp,
                })
            }
            RawSensorEvent::Motion {
                acceleration,
                timestamp,
            } => {
                let x = acceleration.x;
                if !x.is_finite() {
                    debug!("Dropping non-finite motion sample");
                    return None;
                }

                if x.abs() < self.settings.shake_threshold {
                    self.shake_in_progress = None;
                    return None;
                }

                let direction = if x > 0.0 {
                    ShakeDirection::Right
                } else {
                    ShakeDirection::Left
                };

                // Still above threshold in the same direction: same impulse
                if self.shake_in_progress == Some(direction) {
                    return None;
                }
                self.shake_in_progress = Some(direction);

                debug!("Shake {:?} detected (x = {:.2})", direction, x);
                Some(GestureSignal::Shake {
                    direction,
                    magnitude: x.abs(),
                    timestamp,
                })
            }
        }
    }

    /// Drains every sample the source has ready
    ///
    /// Returns `Ok(false)` once the source is closed.
    pub async fn sample_pending(&mut self) -> Result<bool, SamplerError> {
        loop {
            match self.source.poll_event() {
                SensorPoll::Event(event) => {
                    if let Some(signal) = self.normalize(event) {
                        self.signal_sender
                            .send(GestureInput::Signal(signal))
                            .await
                            .map_err(|e| SamplerError::SignalSendError(e.to_string()))?;
                    }
                }
                SensorPoll::Pending => return Ok(true),
                SensorPoll::Closed => return Ok(false),
            }
        }
    }

    pub async fn run_sampling_loop(mut self, shutdown: CancellationToken) {
        info!("Starting GestureSampler loop");
        let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("GestureSampler shutting down");
                    break;
                }
                _ = tokio::time::sleep(poll_interval) => {
                    match self.sample_pending().await {
                        Ok(true) => {}
                        Ok(false) => {
                            info!("Sensor source closed, GestureSampler stopping");
                            break;
                        }
                        Err(e) => {
                            error!("GestureSampler stopping: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::source::{Acceleration, ReplaySource};

    fn motion(x: f32) -> RawSensorEvent {
        RawSensorEvent::Motion {
            acceleration: Acceleration { x, y: 0.0, z: 9.81 },
            timestamp: Local::now(),
        }
    }

    fn sampling(source: ReplaySource) -> (GestureSampler<Sampling>, mpsc::Receiver<GestureInput>) {
        let (tx, rx) = mpsc::channel(64);
        let sampler = GestureSampler::create(Box::new(source), None, tx)
            .request_permission()
            .unwrap();
        (sampler, rx)
    }

    #[test]
    fn one_physical_shake_yields_one_impulse() {
        let (mut sampler, _rx) = sampling(ReplaySource::new(vec![]));

        let signals: Vec<_> = [2.0, 16.0, 22.0, 18.0, 3.0]
            .into_iter()
            .filter_map(|x| sampler.normalize(motion(x)))
            .collect();

        assert_eq!(signals.len(), 1);
        assert!(matches!(
            signals[0],
            GestureSignal::Shake { direction: ShakeDirection::Right, .. }
        ));
    }

    #[test]
    fn sign_of_x_selects_direction() {
        let (mut sampler, _rx) = sampling(ReplaySource::new(vec![]));

        let left = sampler.normalize(motion(-20.0));
        assert!(matches!(
            left,
            Some(GestureSignal::Shake { direction: ShakeDirection::Left, .. })
        ));

        // Swinging straight through to the other side is a new impulse
        let right = sampler.normalize(motion(20.0));
        assert!(matches!(
            right,
            Some(GestureSignal::Shake { direction: ShakeDirection::Right, .. })
        ));
    }

    #[test]
    fn ambient_jitter_produces_no_shake() {
        let (mut sampler, _rx) = sampling(ReplaySource::new(vec![]));
        for x in [0.3, -1.2, 4.0, -6.5, 9.9, -14.9] {
            assert!(sampler.normalize(motion(x)).is_none());
        }
    }

    #[test]
    fn non_finite_samples_are_dropped() {
        let (mut sampler, _rx) = sampling(ReplaySource::new(vec![]));
        let tilt = RawSensorEvent::Orientation {
            beta: f32::NAN,
            timestamp: Local::now(),
        };
        assert!(sampler.normalize(tilt).is_none());
        assert!(sampler.normalize(motion(f32::INFINITY)).is_none());
    }

    #[test]
    fn denied_permission_keeps_sampler_from_starting() {
        let (tx, _rx) = mpsc::channel(4);
        let source = ReplaySource::new(vec![]).with_permission(PermissionDecision::Denied);
        let result = GestureSampler::create(Box::new(source), None, tx).request_permission();
        assert!(matches!(result, Err(SamplerError::PermissionDenied)));
    }

    #[tokio::test]
    async fn pending_samples_are_forwarded_to_engine_queue() {
        let now = Local::now();
        let source = ReplaySource::new(vec![
            RawSensorEvent::Orientation { beta: 30.0, timestamp: now },
            motion(25.0),
        ]);
        let (mut sampler, mut rx) = sampling(source);

        let open = sampler.sample_pending().await.unwrap();
        assert!(!open);

        assert!(matches!(
            rx.recv().await,
            Some(GestureInput::Signal(GestureSignal::Tilt { beta, .. })) if beta == 30.0
        ));
        assert!(matches!(
            rx.recv().await,
            Some(GestureInput::Signal(GestureSignal::Shake { .. }))
        ));
    }
}
