//! Colour space helpers: sRGB transfer functions and colour parsing.
//!
//! Blending happens in linear light. Colours are decoded from sRGB before
//! layers are combined and re-encoded once at the end.

use crate::error::{PolishError, Result};

// ============================================================================
// sRGB Transfer Functions
// ============================================================================

/// Decode one sRGB-encoded component (0.0-1.0) to linear light.
#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode one linear-light component (0.0-1.0) to sRGB.
#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Decode an sRGB triple to linear light.
#[inline]
pub fn linearize(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(srgb_to_linear)
}

/// Encode a linear triple to sRGB, clamping the result to 0.0-1.0.
#[inline]
pub fn delinearize(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(|c| linear_to_srgb(c).clamp(0.0, 1.0))
}

// ============================================================================
// Conversions
// ============================================================================

/// Convert a u8 channel value (0-255) to f32 (0.0-1.0).
#[inline]
pub fn u8_to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

/// Convert an f32 channel value (0.0-1.0) to u8 with rounding.
#[inline]
pub fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Parse `#RRGGBB` (leading `#` optional) into an RGB byte triple.
pub fn parse_hex_rgb(hex: &str) -> Result<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(PolishError::InvalidHexColor(hex.to_string()));
    }
    let mut rgb = [0u8; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
            .map_err(|_| PolishError::InvalidHexColor(hex.to_string()))?;
    }
    Ok(rgb)
}
