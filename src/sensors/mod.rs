//! Device motion input
//!
//! Two stages, mirroring the collector/processor split of the gesture path:
//!
//! 1. [`source`] - `SensorSource` capability wrapping the host's orientation
//!    and motion streams (real device, channel, or recorded replay)
//! 2. [`sampler`] - `GestureSampler`, normalizing raw samples into
//!    [`GestureSignal`]s for the gesture engine
//!
//! ```text
//! SensorSource ──► GestureSampler ──► GestureInput::Signal ──► GestureEngine
//!  (raw beta/x)     (tilt / shake)
//! ```

pub mod sampler;
pub mod source;

pub use sampler::{GestureSampler, GestureSignal, SamplerError, SamplerSettings, ShakeDirection};
pub use source::{
    Acceleration, ChannelSource, PermissionDecision, RawSensorEvent, ReplaySource, SensorPoll,
    SensorSource,
};
