//! Severity gradient and RGBA helpers shared by the simulation and renderers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    /// Untouched land, used before the first simulated day.
    pub const LAND: Rgba = Rgba(68, 111, 0, 255);
    pub const GREEN: Rgba = Rgba(0, 120, 0, 255);
    pub const YELLOW: Rgba = Rgba(230, 200, 0, 255);
    pub const RED: Rgba = Rgba(220, 30, 0, 255);
    pub const DARK_RED: Rgba = Rgba(110, 0, 0, 255);
    pub const GREY: Rgba = Rgba(40, 40, 40, 255);

    pub fn rgb(self) -> (u8, u8, u8) {
        (self.0, self.1, self.2)
    }

    /// Parses an `rrggbbaa` string as used by the region id table.
    pub fn from_hex(hex: &str) -> Result<Self, ColourError> {
        let hex = hex.trim();
        if hex.len() != 8 {
            return Err(ColourError::Length(hex.to_string()));
        }
        // from_str_radix alone would let a leading '+' through
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColourError::Digits(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(|| ColourError::Digits(hex.to_string()))
        };
        Ok(Rgba(channel(0..2)?, channel(2..4)?, channel(4..6)?, channel(6..8)?))
    }

    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}{:02x}", self.0, self.1, self.2, self.3)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColourError {
    #[error("expected 8-char hex RGBA, got '{0}'")]
    Length(String),
    #[error("invalid hex digits in '{0}'")]
    Digits(String),
}

const GRADIENT: [(f64, Rgba); 5] = [
    (0.00, Rgba::GREEN),
    (0.12, Rgba::YELLOW),
    (0.40, Rgba::RED),
    (0.70, Rgba::DARK_RED),
    (1.00, Rgba::GREY),
];

/// Maps a normalised severity onto the green → yellow → red → dark red → grey ramp.
pub fn severity_colour(severity: f64) -> Rgba {
    if severity.is_nan() {
        return GRADIENT[0].1;
    }
    let severity = severity.clamp(0.0, 1.0);
    for pair in GRADIENT.windows(2) {
        let (start, from) = pair[0];
        let (end, to) = pair[1];
        if severity <= end {
            let t = (severity - start) / (end - start);
            return Rgba(
                lerp_channel(from.0, to.0, t),
                lerp_channel(from.1, to.1, t),
                lerp_channel(from.2, to.2, t),
                255,
            );
        }
    }
    GRADIENT[GRADIENT.len() - 1].1
}

fn lerp_channel(from: u8, to: u8, t: f64) -> u8 {
    let value = from as f64 + (to as f64 - from as f64) * t;
    value.round().clamp(0.0, 255.0) as u8
}
