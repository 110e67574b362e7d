// Throttle presets
// Named network-condition profiles understood by the control API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Throttling presets accepted by `/throttling/activate`, plus deactivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThrottlePreset {
    ThreeG,
    FourG,
    Fibre100Mbps,
    Fibre32Mbps,
    Adsl2Plus16Mbps,
    Adsl2_8Mbps,
    Adsl2Mbps,
    Vdsl32Mbps,
    Isdn256Kbps,
    Isdn512Kbps,
    Modem56Kbps,
    Deactivate,
}

impl ThrottlePreset {
    /// Every accepted preset, in the order they are listed to users
    pub const ALL: [ThrottlePreset; 12] = [
        ThrottlePreset::ThreeG,
        ThrottlePreset::FourG,
        ThrottlePreset::Fibre100Mbps,
        ThrottlePreset::Fibre32Mbps,
        ThrottlePreset::Adsl2Plus16Mbps,
        ThrottlePreset::Adsl2_8Mbps,
        ThrottlePreset::Adsl2Mbps,
        ThrottlePreset::Vdsl32Mbps,
        ThrottlePreset::Isdn256Kbps,
        ThrottlePreset::Isdn512Kbps,
        ThrottlePreset::Modem56Kbps,
        ThrottlePreset::Deactivate,
    ];

    /// Name as it appears in the `preset` query parameter (already URL-encoded)
    pub fn wire_name(&self) -> &'static str {
        match self {
            ThrottlePreset::ThreeG => "3G",
            ThrottlePreset::FourG => "4G",
            ThrottlePreset::Fibre100Mbps => "100+Mbps+Fibre",
            ThrottlePreset::Fibre32Mbps => "32+Mbps+Fibre",
            ThrottlePreset::Adsl2Plus16Mbps => "16+Mbps+ADSL2%2B",
            ThrottlePreset::Adsl2_8Mbps => "8+Mbps+ADSL2",
            ThrottlePreset::Adsl2Mbps => "2+Mbps+ADSL",
            ThrottlePreset::Vdsl32Mbps => "32+Mbps+VDSL",
            ThrottlePreset::Isdn256Kbps => "256+kbps+ISDN%2FDSL",
            ThrottlePreset::Isdn512Kbps => "512+kbps+ISDN%2FDSL",
            ThrottlePreset::Modem56Kbps => "56+kbps+Modem",
            ThrottlePreset::Deactivate => "deactivate",
        }
    }

    pub fn is_deactivate(&self) -> bool {
        matches!(self, ThrottlePreset::Deactivate)
    }

    /// Comma-separated list of accepted names
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|p| p.wire_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ThrottlePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Rejected preset name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid preset '{name}'. Valid values: {valid}")]
pub struct InvalidPresetError {
    pub name: String,
    pub valid: String,
}

impl FromStr for ThrottlePreset {
    type Err = InvalidPresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("start") || trimmed.eq_ignore_ascii_case("on") {
            return Ok(ThrottlePreset::ThreeG);
        }
        if trimmed.eq_ignore_ascii_case("deactivate") {
            return Ok(ThrottlePreset::Deactivate);
        }

        Self::ALL
            .iter()
            .copied()
            .find(|p| p.wire_name() == trimmed)
            .ok_or_else(|| InvalidPresetError {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}
