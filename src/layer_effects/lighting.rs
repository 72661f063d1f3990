//! Lighting and compositor configuration.
//!
//! Both are fixed when a compositor is built and read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{PolishError, Result};
use crate::filters::core::gaussian_radius;

/// Fixed viewing direction (camera looks straight down the z axis).
pub const VIEW_DIRECTION: [f32; 3] = [0.0, 0.0, 1.0];

fn normalize3(v: [f32; 3]) -> Option<[f32; 3]> {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 1e-8 && len.is_finite() {
        Some([v[0] / len, v[1] / len, v[2] / len])
    } else {
        None
    }
}

/// Single directional light.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lighting {
    /// Direction toward the light; need not be unit length.
    pub direction: [f32; 3],
    /// Light colour, RGB 0.0-1.0.
    pub color: [f32; 3],
    /// Ambient term. Carried for callers; the layer model does not consume it.
    pub ambient_intensity: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            direction: [-0.5, -0.5, 0.8],
            color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.3,
        }
    }
}

impl Lighting {
    pub fn new(direction: [f32; 3], color: [f32; 3], ambient_intensity: f32) -> Result<Self> {
        let lighting = Self {
            direction,
            color,
            ambient_intensity,
        };
        lighting.validate()?;
        Ok(lighting)
    }

    pub fn validate(&self) -> Result<()> {
        if normalize3(self.direction).is_none() {
            return Err(PolishError::InvalidParameter {
                name: "light_direction",
                value: (self.direction.iter().map(|c| c * c).sum::<f32>()).sqrt(),
            });
        }
        if let Some(&value) = self.color.iter().find(|c| !(c.is_finite() && **c >= 0.0)) {
            return Err(PolishError::InvalidParameter {
                name: "light_color",
                value,
            });
        }
        Ok(())
    }

    /// Unit vector toward the light.
    pub fn unit_direction(&self) -> [f32; 3] {
        normalize3(self.direction).unwrap_or(VIEW_DIRECTION)
    }

    /// Blinn-Phong halfway vector between the light and the fixed view direction.
    pub fn halfway(&self) -> [f32; 3] {
        let l = self.unit_direction();
        let h = [
            l[0] + VIEW_DIRECTION[0],
            l[1] + VIEW_DIRECTION[1],
            l[2] + VIEW_DIRECTION[2],
        ];
        // Light directly behind the surface: fall back to the view direction
        normalize3(h).unwrap_or(VIEW_DIRECTION)
    }
}

/// Tunables of the compositor that are not part of a material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    pub lighting: Lighting,
    /// Gaussian sigma of the mask feathering.
    pub feather_sigma: f32,
    pub ao_blur_sigma: f32,
    pub edge_blur_sigma: f32,
    pub glitter_blur_sigma: f32,
    /// Base seed of the glitter generator.
    pub glitter_seed: u64,
    /// Mix a hash of the region mask into the glitter seed.
    pub seed_glitter_from_mask: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            lighting: Lighting::default(),
            feather_sigma: 5.0,
            ao_blur_sigma: 2.0,
            edge_blur_sigma: 3.0,
            glitter_blur_sigma: 0.5,
            glitter_seed: 42,
            seed_glitter_from_mask: false,
        }
    }
}

impl CompositorConfig {
    /// Parse from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.lighting.validate()?;
        for (name, value) in [
            ("feather_sigma", self.feather_sigma),
            ("ao_blur_sigma", self.ao_blur_sigma),
            ("edge_blur_sigma", self.edge_blur_sigma),
            ("glitter_blur_sigma", self.glitter_blur_sigma),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(PolishError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }

    /// Widest reach of any blur, in pixels.
    pub fn max_blur_radius(&self) -> usize {
        [
            self.feather_sigma,
            self.ao_blur_sigma,
            self.edge_blur_sigma,
            self.glitter_blur_sigma,
        ]
        .into_iter()
        .map(gaussian_radius)
        .max()
        .unwrap_or(0)
    }
}
