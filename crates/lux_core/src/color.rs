//! Colour helpers shared by the renderer and image output.
//!
//! Radiance is carried as linear Rec.709 RGB during path tracing and
//! accumulated in CIE XYZ on the film.

use lux_math::{Mat3, Vec3};

/// Linear RGB colour (RGB values typically 0-1, unbounded for radiance).
pub type Color = Vec3;

/// Linear Rec.709 / sRGB primaries to CIE XYZ (D65 white).
const RGB_TO_XYZ: Mat3 = Mat3::from_cols_array(&[
    0.412_456_4, 0.212_672_9, 0.019_333_9, //
    0.357_576_1, 0.715_152_2, 0.119_192, //
    0.180_437_5, 0.072_175, 0.950_304_1,
]);

/// CIE XYZ (D65 white) to linear Rec.709 / sRGB primaries.
const XYZ_TO_RGB: Mat3 = Mat3::from_cols_array(&[
    3.240_454_2, -0.969_266, 0.055_643_4, //
    -1.537_138_5, 1.876_010_8, -0.204_025_9, //
    -0.498_531_4, 0.041_556, 1.057_225_2,
]);

/// Convert linear RGB to CIE XYZ.
#[inline]
pub fn rgb_to_xyz(rgb: Color) -> Vec3 {
    RGB_TO_XYZ * rgb
}

/// Convert CIE XYZ to linear RGB.
#[inline]
pub fn xyz_to_rgb(xyz: Vec3) -> Color {
    XYZ_TO_RGB * xyz
}

/// Relative luminance (the Y of XYZ) of a linear RGB colour.
#[inline]
pub fn luminance(rgb: Color) -> f32 {
    0.212_672_9 * rgb.x + 0.715_152_2 * rgb.y + 0.072_175 * rgb.z
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a colour to 8-bit RGBA after exposure scaling.
pub fn color_to_rgba(color: Color, exposure: f32) -> [u8; 4] {
    let scaled = color * exposure;
    let r = (255.0 * linear_to_gamma(scaled.x).clamp(0.0, 1.0)) as u8;
    let g = (255.0 * linear_to_gamma(scaled.y).clamp(0.0, 1.0)) as u8;
    let b = (255.0 * linear_to_gamma(scaled.z).clamp(0.0, 1.0)) as u8;
    [r, g, b, 255]
}
