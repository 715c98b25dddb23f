//! Radiance arriving from directions that escape the scene.

use lux_core::Color;
use lux_math::Vec3;
use serde::{Deserialize, Serialize};

/// What a ray sees when it leaves the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Background {
    /// The same radiance in every direction.
    Constant { color: Color },
    /// Vertical blend from `horizon` (straight down) to `zenith` (straight up).
    Gradient { horizon: Color, zenith: Color },
}

impl Default for Background {
    fn default() -> Self {
        Background::Constant { color: Color::ZERO }
    }
}

impl Background {
    pub fn constant(color: Color) -> Self {
        Background::Constant { color }
    }

    /// The classic white-to-blue sky.
    pub fn sky() -> Self {
        Background::Gradient {
            horizon: Color::new(1.0, 1.0, 1.0),
            zenith: Color::new(0.5, 0.7, 1.0),
        }
    }

    /// Radiance arriving along `-direction`, i.e. seen looking along `direction`.
    pub fn radiance(&self, direction: Vec3) -> Color {
        match *self {
            Background::Constant { color } => color,
            Background::Gradient { horizon, zenith } => {
                let unit_direction = direction.normalize_or_zero();
                let a = 0.5 * (unit_direction.y + 1.0);
                horizon * (1.0 - a) + zenith * a
            }
        }
    }

    /// True if no direction carries any radiance.
    pub fn is_black(&self) -> bool {
        match *self {
            Background::Constant { color } => color == Color::ZERO,
            Background::Gradient { horizon, zenith } => {
                horizon == Color::ZERO && zenith == Color::ZERO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sky_gradient() {
        let sky = Background::sky();
        let up_color = sky.radiance(Vec3::Y);
        let down_color = sky.radiance(-Vec3::Y);

        // Up is blue, down is white
        assert!((up_color - Color::new(0.5, 0.7, 1.0)).length() < 1e-6);
        assert!((down_color - Color::ONE).length() < 1e-6);
    }

    #[test]
    fn test_constant_ignores_direction() {
        let bg = Background::constant(Color::splat(0.25));
        assert_eq!(bg.radiance(Vec3::X), bg.radiance(Vec3::new(0.0, -3.0, 1.0)));
        assert!(!bg.is_black());
        assert!(Background::default().is_black());
    }

    #[test]
    fn test_deserialize() {
        let bg: Background =
            serde_json::from_str(r#"{"type": "constant", "color": [0.1, 0.2, 0.3]}"#).unwrap();
        assert_eq!(bg, Background::constant(Color::new(0.1, 0.2, 0.3)));
    }
}
