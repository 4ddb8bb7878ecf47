//! Kids-mode playback controller
//!
//! Turns a chip scan into an ordered, button-free video session and lets a
//! child steer it with the device itself:
//!
//! ```text
//! Chip scan ──► ScanGate ──► PlaylistController ──► FullscreenManager
//!                                ▲          │
//!      SensorSource ──► Sampler ─┤          └──► SessionReporter
//!                    ──► GestureEngine
//!      Touch ──► SwipeDetector ──┘
//! ```
//!
//! Every component is a small state machine driven through a single
//! `handle(event)` entry point. The [`runtime`] owns them all and feeds them
//! from one inbound queue, so no two components share mutable state.

pub mod api;
pub mod config;
pub mod events;
pub mod fullscreen;
pub mod gestures;
pub mod kiosk;
pub mod playback;
pub mod reporting;
pub mod runtime;
pub mod scan;
pub mod sensors;
pub mod swipe;

pub use events::{Command, GestureOutput, Notice, RuntimeEvent};
pub use runtime::{KidsMode, KidsModeHandle, KidsModeView, Screen};
