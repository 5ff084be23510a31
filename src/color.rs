// ============================================================================
// COLOR — clamped RGBA value with rgba()/hex string round-trip
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::CanvasError;

/// An RGBA color: byte channels plus an alpha in 0..=1.
///
/// Construction is forgiving: a channel outside 0..=255 (or non-finite)
/// degrades to 0, an alpha outside 0..=1 degrades to 1. Bad input never
/// fails, matching the geometry types.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    red: u8,
    green: u8,
    blue: u8,
    alpha: f64,
}

impl Color {
    pub const BLACK: Color = Color { red: 0, green: 0, blue: 0, alpha: 1.0 };
    pub const WHITE: Color = Color { red: 255, green: 255, blue: 255, alpha: 1.0 };
    pub const TRANSPARENT: Color = Color { red: 0, green: 0, blue: 0, alpha: 0.0 };

    /// Build a color from loosely validated components.
    pub fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Color {
            red: channel(red),
            green: channel(green),
            blue: channel(blue),
            alpha: if alpha.is_finite() && (0.0..=1.0).contains(&alpha) {
                alpha
            } else {
                1.0
            },
        }
    }

    /// Build a color from raw surface bytes; alpha is normalized to 0..=1.
    pub fn from_rgba8(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Color {
            red,
            green,
            blue,
            alpha: f64::from(alpha) / 255.0,
        }
    }

    pub fn red(&self) -> u8 {
        self.red
    }

    pub fn green(&self) -> u8 {
        self.green
    }

    pub fn blue(&self) -> u8 {
        self.blue
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The raw bytes written into a surface, alpha rescaled to 0..=255.
    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            self.red,
            self.green,
            self.blue,
            (self.alpha * 255.0).round() as u8,
        ]
    }

    /// `#rrggbb` form. Alpha is not representable here and is dropped.
    pub fn to_hex_string(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl fmt::Display for Color {
    /// `rgba(r, g, b, a)`, the form the style setters accept back.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({}, {}, {}, {})",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

impl FromStr for Color {
    type Err = CanvasError;

    /// Parses `rgba(r, g, b, a)` and `#rrggbb`. Recognized forms with bad
    /// components degrade per the constructor; unrecognized forms fail.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() == 6
                && let Ok(val) = u32::from_str_radix(hex, 16)
            {
                return Ok(Color::from_rgba8(
                    (val >> 16) as u8,
                    (val >> 8) as u8,
                    val as u8,
                    255,
                ));
            }
            return Err(CanvasError::InvalidColor(s.to_string()));
        }

        let body = s
            .strip_prefix("rgba(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| CanvasError::InvalidColor(s.to_string()))?;

        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CanvasError::InvalidColor(s.to_string()));
        }

        let num = |p: &str| p.parse::<f64>().unwrap_or(f64::NAN);
        Ok(Color::new(
            num(parts[0]),
            num(parts[1]),
            num(parts[2]),
            num(parts[3]),
        ))
    }
}

/// Byte channel from a loose number: in-range values truncate, anything
/// else becomes 0.
fn channel(value: f64) -> u8 {
    if value.is_finite() && value >= 0.0 && value < 256.0 {
        value as u8
    } else {
        0
    }
}

// ============================================================================
// Tests
// ============================================================================
