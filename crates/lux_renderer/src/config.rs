//! Render settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid render configuration: {0}")]
    InvalidArgument(String),
}

/// Render configuration.
///
/// Read-only while a render runs. Missing fields take their defaults when
/// deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of passes; each pass traces one sample per pixel
    pub passes: u32,
    /// Light samples per light at every non-delta bounce
    pub samples_per_light: u32,
    /// Maximum number of path segments
    pub max_bounces: u32,
    /// Bounces before Russian roulette may end a path
    pub min_bounces: u32,
    /// Power heuristic exponent for multiple importance sampling
    pub mis_exponent: f32,
    /// Base seed for per-sample random streams
    pub seed: u64,
    /// Edge length of a render bucket in pixels
    pub bucket_size: u32,
    /// Linear scale applied before 8-bit output
    pub exposure: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            passes: 16,
            samples_per_light: 1,
            max_bounces: 8,
            min_bounces: 3,
            mis_exponent: 2.0,
            seed: 0,
            bucket_size: 64,
            exposure: 1.0,
        }
    }
}

impl RenderConfig {
    /// Reject settings a render cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidArgument(msg));

        if self.width == 0 || self.height == 0 {
            return invalid(format!("image size {}x{} is empty", self.width, self.height));
        }
        if self.passes == 0 {
            return invalid("pass count must be at least 1".into());
        }
        if self.samples_per_light == 0 {
            return invalid("samples per light must be at least 1".into());
        }
        if self.max_bounces == 0 {
            return invalid("max bounces must be at least 1".into());
        }
        if self.min_bounces > self.max_bounces {
            return invalid(format!(
                "min bounces ({}) exceeds max bounces ({})",
                self.min_bounces, self.max_bounces
            ));
        }
        if self.bucket_size == 0 {
            return invalid("bucket size must be at least 1".into());
        }
        if !self.mis_exponent.is_finite() || self.mis_exponent <= 0.0 {
            return invalid(format!("MIS exponent {} must be positive", self.mis_exponent));
        }
        if !self.exposure.is_finite() || self.exposure <= 0.0 {
            return invalid(format!("exposure {} must be positive", self.exposure));
        }
        Ok(())
    }
}
