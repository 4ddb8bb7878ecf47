use super::shake::{self, ShakeVerdict};
use super::tilt;
use super::GestureSettings;
use crate::events::Command;
use crate::sensors::GestureSignal;
use chrono::{DateTime, Duration, Local};
use tracing::debug;

/// Mutable gesture bookkeeping, owned by one interpreter and reset per session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureState {
    pub last_shake_at: Option<DateTime<Local>>,
    pub cooldown_until: Option<DateTime<Local>>,
    pub current_tilt_deg: f32,
    last_tilt_at: Option<DateTime<Local>>,
}

impl GestureState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn last_tilt_at(&self) -> Option<DateTime<Local>> {
        self.last_tilt_at
    }
}

pub struct GestureInterpreter {
    settings: GestureSettings,
    state: GestureState,
}

impl GestureInterpreter {
    pub fn new(settings: GestureSettings) -> Self {
        Self {
            settings,
            state: GestureState::default(),
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn reset(&mut self) {
        debug!("Resetting gesture state");
        self.state.reset();
    }

    pub fn handle(&mut self, signal: &GestureSignal) -> Option<Command> {
        match signal {
            GestureSignal::Tilt { beta, timestamp } => self.handle_tilt(*beta, *timestamp),
            GestureSignal::Shake {
                direction,
                timestamp,
                ..
            } => {
                let verdict = shake::judge(self.state.cooldown_until, *timestamp, &self.settings.shake);
                match verdict {
                    ShakeVerdict::Accepted { cooldown_until } => {
                        self.state.last_shake_at = Some(*timestamp);
                        self.state.cooldown_until = Some(cooldown_until);
                        let command = shake::command_for(*direction);
                        debug!("Shake {:?} accepted -> {:?}", direction, command);
                        Some(command)
                    }
                    ShakeVerdict::Dropped { remaining_ms } => {
                        debug!(
                            "Shake {:?} dropped, cooldown has {}ms left",
                            direction, remaining_ms
                        );
                        None
                    }
                }
            }
        }
    }

    fn handle_tilt(&mut self, beta: f32, timestamp: DateTime<Local>) -> Option<Command> {
        let interval = match self.state.last_tilt_at {
            Some(previous) => timestamp - previous,
            None => Duration::milliseconds(self.settings.tilt.nominal_interval_ms),
        };
        self.state.current_tilt_deg = beta;
        self.state.last_tilt_at = Some(timestamp);

        tilt::scrub_delta(beta, interval, &self.settings.tilt).map(Command::ScrubBy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::ShakeDirection;

    fn tilt_at(beta: f32, t: DateTime<Local>) -> GestureSignal {
        GestureSignal::Tilt { beta, timestamp: t }
    }

    fn shake_at(direction: ShakeDirection, t: DateTime<Local>) -> GestureSignal {
        GestureSignal::Shake {
            direction,
            magnitude: 20.0,
            timestamp: t,
        }
    }

    fn scrub_total(beta: f32) -> f64 {
        let mut interpreter = GestureInterpreter::new(GestureSettings::default());
        let t0 = Local::now();
        (0..10)
            .filter_map(|i| interpreter.handle(&tilt_at(beta, t0 + Duration::milliseconds(50 * i))))
            .map(|command| match command {
                Command::ScrubBy(delta) => delta,
                other => panic!("unexpected {:?}", other),
            })
            .sum()
    }

    #[test]
    fn stationary_device_emits_nothing() {
        let mut interpreter = GestureInterpreter::new(GestureSettings::default());
        let t0 = Local::now();
        for i in 0..50 {
            let jitter = if i % 2 == 0 { 4.0 } else { -6.0 };
            let t = t0 + Duration::milliseconds(20 * i);
            assert!(interpreter.handle(&tilt_at(jitter, t)).is_none());
        }
    }

    #[test]
    fn sustained_tilt_keeps_emitting_scrubs() {
        let mut interpreter = GestureInterpreter::new(GestureSettings::default());
        let t0 = Local::now();
        let commands: Vec<_> = (0..5)
            .filter_map(|i| interpreter.handle(&tilt_at(30.0, t0 + Duration::milliseconds(50 * i))))
            .collect();
        assert_eq!(commands.len(), 5);
        assert!(commands
            .iter()
            .all(|c| matches!(c, Command::ScrubBy(d) if *d > 0.0)));
    }

    #[test]
    fn max_tilt_outscrubs_mild_tilt_over_same_interval() {
        assert!(scrub_total(45.0) > scrub_total(20.0));
        assert!(scrub_total(-45.0) < scrub_total(-20.0));
    }

    #[test]
    fn shakes_closer_than_cooldown_fire_once() {
        let mut interpreter = GestureInterpreter::new(GestureSettings::default());
        let t0 = Local::now();

        let first = interpreter.handle(&shake_at(ShakeDirection::Right, t0));
        let second = interpreter.handle(&shake_at(
            ShakeDirection::Right,
            t0 + Duration::milliseconds(500),
        ));

        assert_eq!(first, Some(Command::SkipNext));
        assert_eq!(second, None);
    }

    #[test]
    fn shakes_at_least_cooldown_apart_fire_twice() {
        let mut interpreter = GestureInterpreter::new(GestureSettings::default());
        let t0 = Local::now();

        let first = interpreter.handle(&shake_at(ShakeDirection::Right, t0));
        let second = interpreter.handle(&shake_at(
            ShakeDirection::Right,
            t0 + Duration::milliseconds(800),
        ));

        assert_eq!(first, Some(Command::SkipNext));
        assert_eq!(second, Some(Command::SkipNext));
    }

    #[test]
    fn dropped_shake_does_not_extend_cooldown() {
        let mut interpreter = GestureInterpreter::new(GestureSettings::default());
        let t0 = Local::now();

        interpreter.handle(&shake_at(ShakeDirection::Left, t0));
        interpreter.handle(&shake_at(ShakeDirection::Left, t0 + Duration::milliseconds(700)));
        let third = interpreter.handle(&shake_at(
            ShakeDirection::Left,
            t0 + Duration::milliseconds(810),
        ));
        assert_eq!(third, Some(Command::SkipPrevious));
    }

    #[test]
    fn reset_clears_cooldown() {
        let mut interpreter = GestureInterpreter::new(GestureSettings::default());
        let t0 = Local::now();

        interpreter.handle(&shake_at(ShakeDirection::Right, t0));
        interpreter.reset();
        assert_eq!(interpreter.state(), &GestureState::default());

        let again = interpreter.handle(&shake_at(
            ShakeDirection::Right,
            t0 + Duration::milliseconds(100),
        ));
        assert_eq!(again, Some(Command::SkipNext));
    }
}
