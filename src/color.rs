//! Color categorization for road-sign images
//!
//! Road-sign artwork is dominated by a small palette (red, yellow, green,
//! blue, white, black), so every image is summarized by a single letter:
//! - `Y` Yellow (orange signs are filed here too)
//! - `G` Green
//! - `R` Red
//! - `B` Blue
//! - `W` White
//! - `K` Black
//! - `O` Other (gray, muddy or ambiguous)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the seven categorical color codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorCode {
    #[serde(rename = "Y")]
    Yellow,
    #[serde(rename = "G")]
    Green,
    #[serde(rename = "R")]
    Red,
    #[serde(rename = "B")]
    Blue,
    #[serde(rename = "W")]
    White,
    #[serde(rename = "K")]
    Black,
    #[serde(rename = "O")]
    Other,
}

impl ColorCode {
    /// Every code, in counter-table order
    pub const ALL: [ColorCode; 7] = [
        ColorCode::Yellow,
        ColorCode::Green,
        ColorCode::Red,
        ColorCode::Blue,
        ColorCode::White,
        ColorCode::Black,
        ColorCode::Other,
    ];

    /// Single-letter code used as the file name prefix
    pub fn letter(self) -> char {
        match self {
            ColorCode::Yellow => 'Y',
            ColorCode::Green => 'G',
            ColorCode::Red => 'R',
            ColorCode::Blue => 'B',
            ColorCode::White => 'W',
            ColorCode::Black => 'K',
            ColorCode::Other => 'O',
        }
    }

    /// Human readable label for previews and summaries
    pub fn label(self) -> &'static str {
        match self {
            ColorCode::Yellow => "Yellow",
            ColorCode::Green => "Green",
            ColorCode::Red => "Red",
            ColorCode::Blue => "Blue",
            ColorCode::White => "White",
            ColorCode::Black => "Black",
            ColorCode::Other => "Other",
        }
    }

    /// Position of this code in [`ColorCode::ALL`]
    pub(crate) fn index(self) -> usize {
        match self {
            ColorCode::Yellow => 0,
            ColorCode::Green => 1,
            ColorCode::Red => 2,
            ColorCode::Blue => 3,
            ColorCode::White => 4,
            ColorCode::Black => 5,
            ColorCode::Other => 6,
        }
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Error returned when a string is not one of the seven codes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color code: {0:?}")]
pub struct UnknownColorCode(pub String);

impl FromStr for ColorCode {
    type Err = UnknownColorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Y" | "y" => Ok(ColorCode::Yellow),
            "G" | "g" => Ok(ColorCode::Green),
            "R" | "r" => Ok(ColorCode::Red),
            "B" | "b" => Ok(ColorCode::Blue),
            "W" | "w" => Ok(ColorCode::White),
            "K" | "k" => Ok(ColorCode::Black),
            "O" | "o" => Ok(ColorCode::Other),
            other => Err(UnknownColorCode(other.to_string())),
        }
    }
}

/// An 8-bit RGB sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Classify this sample, see [`classify`]
    pub fn classify(self) -> ColorCode {
        classify(self.r, self.g, self.b)
    }
}

/// Map an RGB sample to its color code
///
/// The rules overlap in RGB space, so the order below is part of the contract:
/// 1. White and black extremes
/// 2. Yellow, then orange (filed as yellow)
/// 3. Muted colors: small channel spread at mid brightness
/// 4. Red, green, blue dominance (green is the most lenient, to catch dark highway greens)
/// 5. Whichever channel is strictly largest, if the spread is noticeable
/// 6. Other
pub fn classify(r: u8, g: u8, b: u8) -> ColorCode {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));

    if r > 200 && g > 200 && b > 200 {
        return ColorCode::White;
    }

    if r < 60 && g < 60 && b < 60 {
        return ColorCode::Black;
    }

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;
    let brightness = f64::from(r + g + b) / 3.0;

    if r > 150 && g > 150 && b < 130 {
        return ColorCode::Yellow;
    }

    // Orange; r = 180 is included so pure (180, 100, 50) orange lands here
    if r >= 180 && g > 80 && g < 180 && b < 100 {
        return ColorCode::Yellow;
    }

    if diff < 30 && brightness > 60.0 && brightness < 200.0 {
        if g > r && g > b && g > 70 {
            return ColorCode::Green;
        }
        if r > g && r > b && r > 70 {
            return ColorCode::Red;
        }
        if b > g && b > r && b > 70 {
            return ColorCode::Blue;
        }
    }

    if r == max && r > 70 && r > g + 20 && r > b + 20 {
        return ColorCode::Red;
    }

    if g == max && g > 60 && g > r + 15 && g > b + 15 {
        return ColorCode::Green;
    }

    if b == max && b > 70 && b > r + 20 && b > g + 20 {
        return ColorCode::Blue;
    }

    if diff > 15 {
        if g > r && g > b {
            return ColorCode::Green;
        }
        if r > g && r > b {
            return ColorCode::Red;
        }
        if b > r && b > g {
            return ColorCode::Blue;
        }
    }

    ColorCode::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bright_samples_are_white() {
        for r in (201..=255).step_by(9) {
            for g in (201..=255).step_by(9) {
                for b in (201..=255).step_by(9) {
                    assert_eq!(classify(r, g, b), ColorCode::White, "({r}, {g}, {b})");
                }
            }
        }
    }

    #[test]
    fn test_dark_samples_are_black() {
        for r in (0..60).step_by(7) {
            for g in (0..60).step_by(7) {
                for b in (0..60).step_by(7) {
                    assert_eq!(classify(r, g, b), ColorCode::Black, "({r}, {g}, {b})");
                }
            }
        }
    }

    #[test]
    fn test_orange_is_filed_as_yellow() {
        assert_eq!(classify(180, 100, 50), ColorCode::Yellow);
        assert_eq!(classify(255, 165, 0), ColorCode::Yellow);
    }

    #[test]
    fn test_orange_rule_includes_r_180() {
        // r = 180 is the first red value the orange rule accepts
        assert_eq!(classify(180, 150, 90), ColorCode::Yellow);
        assert_eq!(classify(179, 150, 90), ColorCode::Red);
    }

    #[test]
    fn test_signal_yellow() {
        assert_eq!(classify(250, 210, 20), ColorCode::Yellow);
    }

    #[test]
    fn test_forest_green() {
        assert_eq!(classify(34, 139, 34), ColorCode::Green);
    }

    #[test]
    fn test_dark_highway_green_uses_lenient_margin() {
        // g leads by 16/17: too little for red/blue rules, enough for green
        assert_eq!(classify(45, 62, 46), ColorCode::Green);
    }

    #[test]
    fn test_primary_reds_and_blues() {
        assert_eq!(classify(200, 30, 40), ColorCode::Red);
        assert_eq!(classify(20, 60, 180), ColorCode::Blue);
    }

    #[test]
    fn test_muted_colors() {
        // spread < 30, brightness between 60 and 200
        assert_eq!(classify(100, 120, 105), ColorCode::Green);
        assert_eq!(classify(130, 110, 105), ColorCode::Red);
        assert_eq!(classify(100, 105, 125), ColorCode::Blue);
    }

    #[test]
    fn test_gray_is_other() {
        assert_eq!(classify(128, 128, 128), ColorCode::Other);
        assert_eq!(classify(160, 160, 160), ColorCode::Other);
        assert_eq!(classify(90, 90, 90), ColorCode::Other);
    }

    #[test]
    fn test_last_resort_channel_dominance() {
        // red leads by 18: fails the red rule (needs > 20) but spread > 15
        assert_eq!(classify(150, 132, 60), ColorCode::Red);
    }

    #[test]
    fn test_codes_round_trip_through_letters() {
        for code in ColorCode::ALL {
            let parsed: ColorCode = code.letter().to_string().parse().unwrap();
            assert_eq!(parsed, code);
        }
        assert!("X".parse::<ColorCode>().is_err());
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, code) in ColorCode::ALL.iter().enumerate() {
            assert_eq!(code.index(), i);
        }
    }
}
