//! Deterministic pastel colors
//!
//! A seed string (usually a worktree identity) is hashed onto the color wheel and
//! rendered with the configured saturation and lightness. The foreground is picked
//! from a fixed two-color palette so the status bar stays readable on any hue.

use sha2::{Digest, Sha256};

/// Foreground used on light backgrounds
pub const DARK_FOREGROUND: &str = "#1f2937";

/// Foreground used on dark backgrounds
pub const LIGHT_FOREGROUND: &str = "#f9fafb";

/// Lightness (percent) from which the dark foreground is used
pub const FOREGROUND_LIGHTNESS_THRESHOLD: i32 = 70;

/// Saturation and lightness in percent.
///
/// Values are not validated; anything outside 0-100 is clamped when the final
/// RGB channels are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleParameters {
    pub saturation: i32,
    pub lightness: i32,
}

/// Colors written into the editor status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBarTheme {
    /// Background as `#rrggbb`
    pub background: String,
    /// Foreground as `#rrggbb`
    pub foreground: String,
}

/// Map a seed onto a hue in `[0, 360)`.
pub fn hue(seed: &str) -> u16 {
    let digest = Sha256::digest(seed.as_bytes());
    let value = u16::from_be_bytes([digest[0], digest[1]]);
    value % 360
}

/// Format as a CSS `hsl()` color
pub fn format_hsl(hue: u16, saturation: i32, lightness: i32) -> String {
    format!("hsl({}, {}%, {}%)", hue, saturation, lightness)
}

/// Convert HSL to RGB channels.
///
/// # Arguments
/// * `hue` - Hue in degrees (0-360)
/// * `saturation` - Saturation in percent (0-100)
/// * `lightness` - Lightness in percent (0-100)
pub fn hsl_to_rgb(hue: u16, saturation: i32, lightness: i32) -> (u8, u8, u8) {
    let s = f64::from(saturation) / 100.0;
    let l = f64::from(lightness) / 100.0;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h_prime = f64::from(hue) / 60.0;
    let x = c * (1.0 - ((h_prime % 2.0) - 1.0).abs());

    let (r1, g1, b1) = if h_prime < 1.0 {
        (c, x, 0.0)
    } else if h_prime < 2.0 {
        (x, c, 0.0)
    } else if h_prime < 3.0 {
        (0.0, c, x)
    } else if h_prime < 4.0 {
        (0.0, x, c)
    } else if h_prime < 5.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let m = l - c / 2.0;
    (channel(r1 + m), channel(g1 + m), channel(b1 + m))
}

fn channel(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Convert HSL to a lowercase `#rrggbb` string
pub fn to_hex(hue: u16, saturation: i32, lightness: i32) -> String {
    let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Pick a readable foreground for the given background lightness
pub fn foreground_for(lightness: i32) -> &'static str {
    if lightness >= FOREGROUND_LIGHTNESS_THRESHOLD {
        DARK_FOREGROUND
    } else {
        LIGHT_FOREGROUND
    }
}

/// Build the status bar theme for a seed
pub fn build_theme(seed: &str, params: StyleParameters) -> StatusBarTheme {
    let hue = hue(seed);
    StatusBarTheme {
        background: to_hex(hue, params.saturation, params.lightness),
        foreground: foreground_for(params.lightness).to_string(),
    }
}
