use crate::api::ChipUid;
use serde::{Deserialize, Serialize};

const MAX_CHIP_UID_LEN: usize = 64;

/// How chips reach the gate on this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanCapability {
    /// Native NFC reader delivering chip ids
    NativeNfc,
    /// No NFC API: the scan screen shows a manual entry field
    #[default]
    Manual,
}

impl ScanCapability {
    pub fn shows_manual_entry(&self) -> bool {
        matches!(self, ScanCapability::Manual)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub capability: ScanCapability,
}

/// Normalizes a typed chip id
///
/// Surrounding whitespace is dropped and letters are upper-cased, matching
/// the hex form NFC readers report. Empty, over-long or whitespace-containing
/// input is rejected.
pub fn parse_manual_entry(input: &str) -> Option<ChipUid> {
    let trimmed = input.trim();
    if trimmed.is_empty()
        || trimmed.len() > MAX_CHIP_UID_LEN
        || trimmed.chars().any(char::is_whitespace)
    {
        return None;
    }
    Some(ChipUid::new(trimmed.to_ascii_uppercase()))
}
