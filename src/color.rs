//! Color model used by the recolorer.
//!
//! A [`Color`] is an RGB triple with derived Hue/Whiteness/Blackness and luma
//! views. Every derived color (level inversion, HWB blend) is produced by
//! [`Color::from_hwb`], never by adjusting channels directly.

use std::fmt;
use std::str::FromStr;

use palette::convert::FromColorUnclamped;
use palette::{encoding, Hsv, IntoColor, Srgb};
use thiserror::Error;

/// Backgrounds with a luma strictly below this value are treated as dark.
pub const DARK_LUMA_THRESHOLD: f64 = 0.4;

// ============================================================================
// ColorError
// ============================================================================

/// Errors produced while constructing a [`Color`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorError {
    /// The literal is neither a known color name nor a 3 or 6 digit hex string.
    #[error("{0} is not a parseable color")]
    Invalid(String),

    /// An RGB channel was outside `[0.0, 1.0]` or not finite.
    #[error("channel value {0} is outside 0.0-1.0")]
    OutOfRange(f64),

    /// A background literal was neither a 0-255 gray level nor a color.
    #[error("background {0} must be between 0 and 255 or a color")]
    InvalidBackground(String),
}

// ============================================================================
// Hwb
// ============================================================================

/// Hue, whiteness and blackness of a color, in the sRGB space.
///
/// `hue` is in degrees; `whiteness` and `blackness` are in `0.0..=1.0` for
/// colors built from valid RGB input.
pub type Hwb = palette::Hwb<encoding::Srgb, f64>;

// ============================================================================
// Color
// ============================================================================

/// An immutable RGB color with channels in `0.0..=1.0`.
///
/// # Example
///
/// ```
/// use artwork_recolor::Color;
///
/// let brand: Color = "#333".parse().unwrap();
/// let fill: Color = "red".parse().unwrap();
///
/// // The artwork's tones are kept, the hue comes from the brand color.
/// let tinted = brand.blend_hwb(&fill);
/// assert_eq!(tinted.hwb().hue, brand.hwb().hue);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    r: f64,
    g: f64,
    b: f64,
}

impl Color {
    /// Creates a color from RGB channels in `0.0..=1.0`.
    pub fn new(r: f64, g: f64, b: f64) -> Result<Self, ColorError> {
        for channel in [r, g, b] {
            if !(0.0..=1.0).contains(&channel) {
                return Err(ColorError::OutOfRange(channel));
            }
        }
        Ok(Self { r, g, b })
    }

    /// Creates a neutral gray with all channels set to `level`, clamped to `0.0..=1.0`.
    pub fn gray(level: f64) -> Self {
        let level = level.clamp(0.0, 1.0);
        Self {
            r: level,
            g: level,
            b: level,
        }
    }

    /// Parses a color literal.
    ///
    /// Spaces are ignored. The literal is first looked up as a CSS color name,
    /// then read as hex (`#abc`, `aabbcc`, case-insensitive).
    pub fn parse(literal: &str) -> Result<Self, ColorError> {
        let value: String = literal.chars().filter(|c| *c != ' ').collect();

        if let Some(named) = palette::named::from_str(&value.to_ascii_lowercase()) {
            return Ok(Self::from_srgb8(named));
        }

        let digits = value.strip_prefix('#').unwrap_or(&value);
        let is_hex = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
        if !is_hex {
            return Err(ColorError::Invalid(literal.to_string()));
        }

        Srgb::<u8>::from_str(digits)
            .map(Self::from_srgb8)
            .map_err(|_| ColorError::Invalid(literal.to_string()))
    }

    fn from_srgb8(color: Srgb<u8>) -> Self {
        let color: Srgb<f64> = color.into_format();
        Self {
            r: color.red,
            g: color.green,
            b: color.blue,
        }
    }

    /// Red channel.
    pub fn r(&self) -> f64 {
        self.r
    }

    /// Green channel.
    pub fn g(&self) -> f64 {
        self.g
    }

    /// Blue channel.
    pub fn b(&self) -> f64 {
        self.b
    }

    /// Returns the channels as an `[r, g, b]` array.
    pub fn channels(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Hue, whiteness and blackness derived from HSV.
    ///
    /// `whiteness = (1 - saturation) * value`, `blackness = 1 - value`.
    pub fn hwb(&self) -> Hwb {
        let hsv: Hsv<encoding::Srgb, f64> = Srgb::new(self.r, self.g, self.b).into_color();
        Hwb::from_color_unclamped(hsv)
    }

    /// Builds a color from HWB components.
    ///
    /// When `blackness` is 1 the value is 0 and the result is black whatever
    /// the saturation. Whiteness plus blackness above 1 extrapolates the HSV
    /// formulas linearly instead of normalizing.
    pub fn from_hwb(hwb: Hwb) -> Self {
        let hsv = Hsv::<encoding::Srgb, f64>::from_color_unclamped(hwb);
        let rgb = Srgb::<f64>::from_color_unclamped(hsv);
        Self {
            r: rgb.red,
            g: rgb.green,
            b: rgb.blue,
        }
    }

    /// Perceptual brightness, `sqrt(0.299 r² + 0.587 g² + 0.114 b²)`.
    pub fn luma(&self) -> f64 {
        (self.r * self.r * 0.299 + self.g * self.g * 0.587 + self.b * self.b * 0.114).sqrt()
    }

    /// Returns true if this color counts as a dark background.
    pub fn is_dark(&self) -> bool {
        self.luma() < DARK_LUMA_THRESHOLD
    }

    /// Swaps light and dark tones: whiteness and blackness become `1 - x`.
    pub fn invert_levels(&self) -> Self {
        let hwb = self.hwb();
        Self::from_hwb(Hwb::new(hwb.hue, 1.0 - hwb.whiteness, 1.0 - hwb.blackness))
    }

    /// Averages whiteness and blackness with `other`, keeping this color's hue.
    pub fn blend_hwb(&self, other: &Color) -> Self {
        let mine = self.hwb();
        let theirs = other.hwb();
        Self::from_hwb(Hwb::new(
            mine.hue,
            (mine.whiteness + theirs.whiteness) / 2.0,
            (mine.blackness + theirs.blackness) / 2.0,
        ))
    }

    /// `#rrggbb` form. Channels outside `0.0..=1.0` saturate.
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.channels().map(to_byte);
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

fn to_byte(channel: f64) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<[f64; 3]> for Color {
    type Error = ColorError;

    fn try_from([r, g, b]: [f64; 3]) -> Result<Self, Self::Error> {
        Self::new(r, g, b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ============================================================================
// Tests
// ============================================================================
