//! Line commands of the kiosk binary
//!
//! Stands in for the NFC reader, the touch screen, the motion sensors and
//! the video player on a headless device:
//!
//! ```text
//! scan <uid>        tap a chip            swipe <dx> <dy>  touch sequence
//! ready | end       player callbacks      tilt <beta>      orientation sample
//! fail [reason]     player error          shake <x>        motion impulse
//! progress <s> [d]  playback position     retry | back | again | dismiss
//! quit
//! ```

use crate::api::ChipUid;
use crate::events::RuntimeEvent;
use crate::playback::EmbedEvent;
use crate::scan::parse_manual_entry;
use crate::sensors::{Acceleration, RawSensorEvent};
use crate::swipe::TouchEvent;
use chrono::{DateTime, Duration, Local};
use thiserror::Error;

const GRAVITY: f32 = 9.81;
/// Where simulated swipes start on screen
const SWIPE_ORIGIN: (f32, f32) = (400.0, 200.0);

#[derive(Debug, Error, PartialEq)]
pub enum KioskError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Not a number: {0}")]
    InvalidNumber(String),

    #[error("Not a chip id: {0}")]
    InvalidChip(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum KioskCommand {
    Scan(ChipUid),
    Ready,
    End,
    Fail(String),
    Progress { position: f64, duration: Option<f64> },
    Tilt(f32),
    Shake(f32),
    Swipe { dx: f32, dy: f32 },
    Retry,
    Back,
    Again,
    Dismiss,
    Quit,
}

impl KioskCommand {
    pub fn parse(line: &str) -> Result<Self, KioskError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(KioskError::UnknownCommand(String::new()));
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "scan" => {
                let raw = words.next().ok_or(KioskError::MissingArgument("chip id"))?;
                let chip_uid =
                    parse_manual_entry(raw).ok_or_else(|| KioskError::InvalidChip(raw.to_string()))?;
                KioskCommand::Scan(chip_uid)
            }
            "ready" => KioskCommand::Ready,
            "end" => KioskCommand::End,
            "fail" => {
                let reason = words.collect::<Vec<_>>().join(" ");
                KioskCommand::Fail(if reason.is_empty() {
                    "simulated failure".to_string()
                } else {
                    reason
                })
            }
            "progress" => KioskCommand::Progress {
                position: number(words.next(), "position")?,
                duration: words.next().map(|d| number(Some(d), "duration")).transpose()?,
            },
            "tilt" => KioskCommand::Tilt(number(words.next(), "beta")?),
            "shake" => KioskCommand::Shake(number(words.next(), "x acceleration")?),
            "swipe" => KioskCommand::Swipe {
                dx: number(words.next(), "dx")?,
                dy: number(words.next(), "dy")?,
            },
            "retry" => KioskCommand::Retry,
            "back" => KioskCommand::Back,
            "again" => KioskCommand::Again,
            "dismiss" => KioskCommand::Dismiss,
            "quit" | "exit" => KioskCommand::Quit,
            other => return Err(KioskError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// Events for the runtime queue; player callbacks need the current
    /// player generation and produce nothing without one
    pub fn runtime_events(&self, generation: Option<u64>, now: DateTime<Local>) -> Vec<RuntimeEvent> {
        let embed = |make: fn(u64) -> EmbedEvent| {
            generation
                .map(|g| vec![RuntimeEvent::Embed(make(g))])
                .unwrap_or_default()
        };

        match self {
            KioskCommand::Scan(chip_uid) => vec![RuntimeEvent::Scan(chip_uid.clone())],
            KioskCommand::Ready => embed(|generation| EmbedEvent::Ready { generation }),
            KioskCommand::End => embed(|generation| EmbedEvent::Ended { generation }),
            KioskCommand::Fail(message) => generation
                .map(|generation| {
                    vec![RuntimeEvent::Embed(EmbedEvent::Error {
                        generation,
                        message: message.clone(),
                    })]
                })
                .unwrap_or_default(),
            KioskCommand::Progress { position, duration } => generation
                .map(|generation| {
                    vec![RuntimeEvent::Embed(EmbedEvent::Progress {
                        generation,
                        position: *position,
                        duration: *duration,
                    })]
                })
                .unwrap_or_default(),
            KioskCommand::Swipe { dx, dy } => {
                let (x, y) = SWIPE_ORIGIN;
                vec![
                    RuntimeEvent::Touch(TouchEvent::Start { x, y, timestamp: now }),
                    RuntimeEvent::Touch(TouchEvent::Move {
                        x: x + dx / 2.0,
                        y: y + dy / 2.0,
                        timestamp: now + Duration::milliseconds(60),
                    }),
                    RuntimeEvent::Touch(TouchEvent::End {
                        x: x + dx,
                        y: y + dy,
                        timestamp: now + Duration::milliseconds(120),
                    }),
                ]
            }
            KioskCommand::Retry => vec![RuntimeEvent::Retry],
            KioskCommand::Back => vec![RuntimeEvent::BackToScan],
            KioskCommand::Again => vec![RuntimeEvent::ScanAgain],
            KioskCommand::Dismiss => vec![RuntimeEvent::DismissNotice],
            KioskCommand::Quit => vec![RuntimeEvent::Shutdown],
            KioskCommand::Tilt(_) | KioskCommand::Shake(_) => Vec::new(),
        }
    }

    /// Samples for the simulated sensor source
    ///
    /// A shake is an impulse followed by a resting sample so the sampler
    /// re-arms for the next one.
    pub fn sensor_events(&self, now: DateTime<Local>) -> Vec<RawSensorEvent> {
        match self {
            KioskCommand::Tilt(beta) => vec![RawSensorEvent::Orientation {
                beta: *beta,
                timestamp: now,
            }],
            KioskCommand::Shake(x) => vec![
                RawSensorEvent::Motion {
                    acceleration: Acceleration { x: *x, y: 0.0, z: GRAVITY },
                    timestamp: now,
                },
                RawSensorEvent::Motion {
                    acceleration: Acceleration { x: 0.0, y: 0.0, z: GRAVITY },
                    timestamp: now + Duration::milliseconds(100),
                },
            ],
            _ => Vec::new(),
        }
    }
}

fn number<T: std::str::FromStr>(word: Option<&str>, name: &'static str) -> Result<T, KioskError> {
    let word = word.ok_or(KioskError::MissingArgument(name))?;
    word.parse()
        .map_err(|_| KioskError::InvalidNumber(word.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scan_with_manual_entry_rules() {
        assert_eq!(
            KioskCommand::parse("scan test123"),
            Ok(KioskCommand::Scan(ChipUid::new("TEST123")))
        );
        assert_eq!(
            KioskCommand::parse("scan"),
            Err(KioskError::MissingArgument("chip id"))
        );
    }

    #[test]
    fn parses_numeric_arguments() {
        assert_eq!(KioskCommand::parse("tilt -30"), Ok(KioskCommand::Tilt(-30.0)));
        assert_eq!(
            KioskCommand::parse("swipe 10 150"),
            Ok(KioskCommand::Swipe { dx: 10.0, dy: 150.0 })
        );
        assert_eq!(
            KioskCommand::parse("progress 12.5"),
            Ok(KioskCommand::Progress { position: 12.5, duration: None })
        );
        assert_eq!(
            KioskCommand::parse("shake lots"),
            Err(KioskError::InvalidNumber("lots".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_commands() {
        assert_eq!(
            KioskCommand::parse("dance"),
            Err(KioskError::UnknownCommand("dance".to_string()))
        );
        assert!(KioskCommand::parse("   ").is_err());
    }

    #[test]
    fn player_callbacks_need_a_generation() {
        let now = Local::now();
        assert!(KioskCommand::End.runtime_events(None, now).is_empty());

        let events = KioskCommand::End.runtime_events(Some(3), now);
        assert!(matches!(
            events.as_slice(),
            [RuntimeEvent::Embed(EmbedEvent::Ended { generation: 3 })]
        ));
    }

    #[test]
    fn swipe_becomes_a_full_touch_sequence() {
        let events = KioskCommand::Swipe { dx: 0.0, dy: 150.0 }.runtime_events(None, Local::now());
        assert_eq!(events.len(), 3);
        assert!(matches!(events[2], RuntimeEvent::Touch(TouchEvent::End { y, .. }) if y == 350.0));
    }

    #[test]
    fn shake_rests_after_impulse() {
        let samples = KioskCommand::Shake(20.0).sensor_events(Local::now());
        assert_eq!(samples.len(), 2);
        assert!(KioskCommand::Quit.sensor_events(Local::now()).is_empty());
    }
}
