//! Chip scanning
//!
//! [`gate`] holds the scan-screen state machine. [`input`] is the
//! substitution point for devices without a native NFC reader: a manually
//! entered chip id produces the same `Scan` event as a tapped chip.

pub mod gate;
pub mod input;

pub use gate::{order_playlist, ScanError, ScanGate, ScanGateEvent, ScanGateOutput, ScanPhase};
pub use input::{parse_manual_entry, ScanCapability, ScanSettings};
