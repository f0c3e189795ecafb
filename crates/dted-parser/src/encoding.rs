//! Raw sample decoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lowest plausible terrestrial elevation in meters (exclusive).
pub const MIN_PLAUSIBLE_ELEVATION: f32 = -100.0;

/// Highest plausible terrestrial elevation in meters (exclusive).
pub const MAX_PLAUSIBLE_ELEVATION: f32 = 10_000.0;

/// How a 16-bit post is stored on disk.
///
/// Posts are whole meters with no bias in both encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    /// MIL-PRF-89020B 3.11.3.1: bit 15 is the sign, bits 0-14 the magnitude.
    /// `0xFFFF` is the void value.
    #[default]
    SignedMagnitude,
    /// Producers that write two's complement; `-32767` and `-32768` are void.
    TwosComplement,
}

impl SampleEncoding {
    /// Decode a raw big-endian post into meters. Void and implausible
    /// values decode to NaN.
    pub fn decode(self, raw: u16) -> f32 {
        let meters = match self {
            Self::SignedMagnitude => {
                if raw == 0xFFFF {
                    return f32::NAN;
                }
                let magnitude = (raw & 0x7FFF) as f32;
                if raw & 0x8000 != 0 {
                    -magnitude
                } else {
                    magnitude
                }
            }
            Self::TwosComplement => {
                let value = raw as i16;
                if value == -32767 || value == i16::MIN {
                    return f32::NAN;
                }
                value as f32
            }
        };

        if is_elev_valid(meters) {
            meters
        } else {
            f32::NAN
        }
    }

    /// Decode a big-endian byte pair.
    pub fn decode_be(self, bytes: [u8; 2]) -> f32 {
        self.decode(u16::from_be_bytes(bytes))
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedMagnitude => write!(f, "signed_magnitude"),
            Self::TwosComplement => write!(f, "twos_complement"),
        }
    }
}

impl FromStr for SampleEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "signed_magnitude" | "sign_magnitude" => Ok(Self::SignedMagnitude),
            "twos_complement" => Ok(Self::TwosComplement),
            other => Err(format!("unknown sample encoding: {}", other)),
        }
    }
}

/// Whether a decoded elevation is inside the plausible terrestrial range.
/// NaN is never valid.
pub fn is_elev_valid(meters: f32) -> bool {
    meters > MIN_PLAUSIBLE_ELEVATION && meters < MAX_PLAUSIBLE_ELEVATION
}
