//! Polish material descriptors.
//!
//! A [`Material`] is a plain value: base colour plus the numeric knobs the
//! compositor's layers read. Materials come from the named preset catalog,
//! from a finish type with a custom colour, or from the builder setters.
//!
//! The finish label ([`FinishType`]) is derived from the numbers on demand and
//! is only used for display; rendering never reads it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PolishError, Result};
use crate::filters::color_science::parse_hex_rgb;

/// Display category of a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishType {
    Glossy,
    Matte,
    Metallic,
    Chrome,
    Satin,
    Glitter,
}

impl FinishType {
    pub const ALL: [FinishType; 6] = [
        FinishType::Glossy,
        FinishType::Matte,
        FinishType::Metallic,
        FinishType::Chrome,
        FinishType::Satin,
        FinishType::Glitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FinishType::Glossy => "glossy",
            FinishType::Matte => "matte",
            FinishType::Metallic => "metallic",
            FinishType::Chrome => "chrome",
            FinishType::Satin => "satin",
            FinishType::Glitter => "glitter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for FinishType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Surface description consumed by the compositor.
///
/// Colours are normalized RGB in 0.0-1.0 (sRGB encoded).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub base_color: [f32; 3],
    pub glossiness: f32,
    pub metallic: f32,
    /// Explicit roughness; `None` derives it as `1 - glossiness`.
    pub roughness_override: Option<f32>,
    pub opacity: f32,
    pub specular_intensity: f32,
    pub specular_tint: [f32; 3],
    pub has_glitter: bool,
    pub glitter_density: f32,
    pub glitter_size: f32,
    pub glitter_color: [f32; 3],
    pub edge_darkness: f32,
    pub edge_width: f32,
    pub ambient_occlusion_intensity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [0.8, 0.1, 0.1],
            glossiness: 0.8,
            metallic: 0.0,
            roughness_override: None,
            opacity: 0.85,
            specular_intensity: 1.0,
            specular_tint: [1.0, 1.0, 1.0],
            has_glitter: false,
            glitter_density: 0.0,
            glitter_size: 2.0,
            glitter_color: [1.0, 0.9, 0.7],
            edge_darkness: 0.3,
            edge_width: 0.15,
            ambient_occlusion_intensity: 0.4,
        }
    }
}

/// Accepts either 0.0-1.0 or 0-255 components; anything above 1 means the latter.
fn normalize_color(rgb: [f32; 3]) -> [f32; 3] {
    if rgb.iter().any(|&c| c > 1.0) {
        rgb.map(|c| c / 255.0)
    } else {
        rgb
    }
}

fn rgb_from_u8(rgb: [u8; 3]) -> [f32; 3] {
    rgb.map(|c| c as f32 / 255.0)
}

impl Material {
    /// Material with default parameters and the given base colour.
    pub fn new(base_color: [f32; 3]) -> Self {
        Self {
            base_color: normalize_color(base_color),
            ..Self::default()
        }
    }

    pub fn with_glossiness(mut self, glossiness: f32) -> Self {
        self.glossiness = glossiness;
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic;
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness_override = Some(roughness);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_specular(mut self, intensity: f32, tint: [f32; 3]) -> Self {
        self.specular_intensity = intensity;
        self.specular_tint = tint;
        self
    }

    pub fn with_glitter(mut self, density: f32, size: f32, color: [f32; 3]) -> Self {
        self.has_glitter = true;
        self.glitter_density = density;
        self.glitter_size = size;
        self.glitter_color = color;
        self
    }

    pub fn without_glitter(mut self) -> Self {
        self.has_glitter = false;
        self
    }

    pub fn with_edge(mut self, darkness: f32, width: f32) -> Self {
        self.edge_darkness = darkness;
        self.edge_width = width;
        self
    }

    pub fn with_ambient_occlusion(mut self, intensity: f32) -> Self {
        self.ambient_occlusion_intensity = intensity;
        self
    }

    /// Effective roughness.
    pub fn roughness(&self) -> f32 {
        self.roughness_override.unwrap_or(1.0 - self.glossiness)
    }

    /// Classify the finish from the numeric parameters.
    ///
    /// Glitter wins, then metallic (chrome when also very smooth), then the
    /// glossiness bands.
    pub fn finish_type(&self) -> FinishType {
        if self.has_glitter {
            FinishType::Glitter
        } else if self.metallic > 0.7 {
            if self.roughness() < 0.1 {
                FinishType::Chrome
            } else {
                FinishType::Metallic
            }
        } else if self.glossiness > 0.7 {
            FinishType::Glossy
        } else if self.glossiness < 0.3 {
            FinishType::Matte
        } else {
            FinishType::Satin
        }
    }

    /// Custom colour with the fixed parameter bundle of a finish.
    pub fn custom(rgb: [u8; 3], finish: FinishType) -> Self {
        let (glossiness, metallic, roughness, specular) = match finish {
            FinishType::Glossy => (0.9, 0.0, 0.1, 1.2),
            FinishType::Matte => (0.2, 0.0, 0.8, 0.3),
            FinishType::Metallic => (0.75, 0.85, 0.25, 1.5),
            FinishType::Chrome => (0.98, 0.95, 0.02, 2.5),
            FinishType::Satin => (0.5, 0.0, 0.5, 0.7),
            FinishType::Glitter => (0.8, 0.2, 0.2, 1.0),
        };

        let mut material = Self::new(rgb_from_u8(rgb))
            .with_glossiness(glossiness)
            .with_metallic(metallic)
            .with_roughness(roughness);
        material.specular_intensity = specular;
        if finish == FinishType::Glitter {
            material.has_glitter = true;
            material.glitter_density = 0.4;
        }
        material
    }

    /// [`Material::custom`] from a `#RRGGBB` string.
    pub fn custom_hex(hex: &str, finish: FinishType) -> Result<Self> {
        Ok(Self::custom(parse_hex_rgb(hex)?, finish))
    }

    /// Material from user-facing sliders.
    ///
    /// `intensity` becomes the opacity; specular strength grows with glossiness.
    pub fn from_adjustments(rgb: [u8; 3], glossiness: f32, metallic: f32, intensity: f32) -> Self {
        let mut material = Self::new(rgb_from_u8(rgb))
            .with_glossiness(glossiness)
            .with_metallic(metallic)
            .with_opacity(intensity);
        material.specular_intensity = 1.0 + glossiness * 0.5;
        material
    }

    /// Reject parameters the layers cannot shade with.
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("glossiness", self.glossiness),
            ("metallic", self.metallic),
            ("roughness", self.roughness()),
            ("opacity", self.opacity),
            ("edge_darkness", self.edge_darkness),
            ("ambient_occlusion_intensity", self.ambient_occlusion_intensity),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(PolishError::InvalidParameter { name, value });
            }
        }

        let non_negative = [
            ("specular_intensity", self.specular_intensity),
            ("glitter_density", self.glitter_density),
            ("glitter_size", self.glitter_size),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(PolishError::InvalidParameter { name, value });
            }
        }

        if !(self.edge_width > 0.0 && self.edge_width <= 1.0) {
            return Err(PolishError::InvalidParameter {
                name: "edge_width",
                value: self.edge_width,
            });
        }

        for (name, color) in [
            ("base_color", self.base_color),
            ("specular_tint", self.specular_tint),
            ("glitter_color", self.glitter_color),
        ] {
            if let Some(&value) = color.iter().find(|c| !(0.0..=1.0).contains(*c)) {
                return Err(PolishError::InvalidParameter { name, value });
            }
        }

        Ok(())
    }

    /// Summary of every catalog preset, in catalog order.
    pub fn catalog() -> Vec<MaterialInfo> {
        MaterialPreset::ALL.iter().map(|p| p.info()).collect()
    }
}

// ============================================================================
// Preset Catalog
// ============================================================================

/// Named materials shipped with the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialPreset {
    GlossyRed,
    GlossyNude,
    MatteBlack,
    MattePink,
    MetallicGold,
    MetallicSilver,
    ChromeMirror,
    GlitterPink,
    GlitterSilver,
    Holographic,
    SatinBurgundy,
}

impl MaterialPreset {
    pub const ALL: [MaterialPreset; 11] = [
        MaterialPreset::GlossyRed,
        MaterialPreset::GlossyNude,
        MaterialPreset::MatteBlack,
        MaterialPreset::MattePink,
        MaterialPreset::MetallicGold,
        MaterialPreset::MetallicSilver,
        MaterialPreset::ChromeMirror,
        MaterialPreset::GlitterPink,
        MaterialPreset::GlitterSilver,
        MaterialPreset::Holographic,
        MaterialPreset::SatinBurgundy,
    ];

    /// Preset returned when a requested name is unknown.
    pub const DEFAULT: MaterialPreset = MaterialPreset::GlossyRed;

    pub fn name(&self) -> &'static str {
        match self {
            MaterialPreset::GlossyRed => "glossy_red",
            MaterialPreset::GlossyNude => "glossy_nude",
            MaterialPreset::MatteBlack => "matte_black",
            MaterialPreset::MattePink => "matte_pink",
            MaterialPreset::MetallicGold => "metallic_gold",
            MaterialPreset::MetallicSilver => "metallic_silver",
            MaterialPreset::ChromeMirror => "chrome_mirror",
            MaterialPreset::GlitterPink => "glitter_pink",
            MaterialPreset::GlitterSilver => "glitter_silver",
            MaterialPreset::Holographic => "holographic",
            MaterialPreset::SatinBurgundy => "satin_burgundy",
        }
    }

    /// "metallic_gold" -> "Metallic Gold"
    pub fn display_name(&self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Look up a preset by name, falling back to [`MaterialPreset::DEFAULT`].
    pub fn lookup_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            log::warn!("unknown material preset '{}', using {}", name, Self::DEFAULT.name());
            Self::DEFAULT
        })
    }

    pub fn material(&self) -> Material {
        match self {
            MaterialPreset::GlossyRed => Material::new([0.8, 0.1, 0.1])
                .with_glossiness(0.9)
                .with_metallic(0.0)
                .with_roughness(0.1)
                .with_opacity(0.95)
                .with_specular(1.2, [1.0, 1.0, 1.0])
                .with_edge(0.35, 0.15),
            MaterialPreset::GlossyNude => Material::new([0.92, 0.78, 0.68])
                .with_glossiness(0.85)
                .with_roughness(0.15)
                .with_opacity(0.75)
                .with_specular(0.9, [1.0, 1.0, 1.0])
                .with_edge(0.25, 0.15),
            MaterialPreset::MatteBlack => Material::new([0.15, 0.15, 0.15])
                .with_glossiness(0.2)
                .with_roughness(0.8)
                .with_opacity(0.98)
                .with_specular(0.3, [1.0, 1.0, 1.0])
                .with_edge(0.2, 0.15),
            MaterialPreset::MattePink => Material::new([0.95, 0.6, 0.7])
                .with_glossiness(0.25)
                .with_roughness(0.75)
                .with_opacity(0.85)
                .with_specular(0.4, [1.0, 1.0, 1.0])
                .with_edge(0.3, 0.15),
            MaterialPreset::MetallicGold => Material::new([0.85, 0.65, 0.13])
                .with_glossiness(0.75)
                .with_metallic(0.9)
                .with_roughness(0.25)
                .with_opacity(0.95)
                .with_specular(1.5, [1.0, 0.9, 0.6])
                .with_edge(0.4, 0.15),
            MaterialPreset::MetallicSilver => Material::new([0.75, 0.75, 0.75])
                .with_glossiness(0.85)
                .with_metallic(0.95)
                .with_roughness(0.15)
                .with_opacity(0.98)
                .with_specular(1.8, [0.95, 0.95, 1.0])
                .with_edge(0.45, 0.15),
            MaterialPreset::ChromeMirror => Material::new([0.85, 0.85, 0.9])
                .with_glossiness(0.98)
                .with_metallic(0.98)
                .with_roughness(0.02)
                .with_opacity(0.99)
                .with_specular(2.5, [0.9, 0.95, 1.0])
                .with_edge(0.5, 0.15),
            MaterialPreset::GlitterPink => Material::new([0.95, 0.5, 0.65])
                .with_glossiness(0.8)
                .with_metallic(0.1)
                .with_roughness(0.2)
                .with_opacity(0.9)
                .with_specular(1.0, [1.0, 1.0, 1.0])
                .with_glitter(0.3, 2.5, [1.0, 0.84, 0.0])
                .with_edge(0.35, 0.15),
            MaterialPreset::GlitterSilver => Material::new([0.95, 0.92, 0.95])
                .with_glossiness(0.85)
                .with_metallic(0.2)
                .with_roughness(0.15)
                .with_opacity(0.7)
                .with_specular(1.2, [1.0, 1.0, 1.0])
                .with_glitter(0.5, 3.0, [0.9, 0.9, 0.95])
                .with_edge(0.3, 0.15),
            MaterialPreset::Holographic => Material::new([0.85, 0.75, 0.95])
                .with_glossiness(0.95)
                .with_metallic(0.6)
                .with_roughness(0.05)
                .with_opacity(0.92)
                .with_specular(2.0, [0.9, 0.8, 1.0])
                .with_glitter(0.6, 1.5, [1.0, 0.9, 1.0])
                .with_edge(0.4, 0.15),
            MaterialPreset::SatinBurgundy => Material::new([0.45, 0.1, 0.15])
                .with_glossiness(0.5)
                .with_roughness(0.5)
                .with_opacity(0.95)
                .with_specular(0.7, [1.0, 1.0, 1.0])
                .with_edge(0.35, 0.15),
        }
    }

    pub fn info(&self) -> MaterialInfo {
        let material = self.material();
        MaterialInfo {
            name: self.name().to_string(),
            display_name: self.display_name(),
            finish: material.finish_type(),
            glossiness: material.glossiness,
            metallic: material.metallic,
            has_glitter: material.has_glitter,
            base_color_rgb: material.base_color.map(|c| (c * 255.0) as u8),
        }
    }
}

impl From<MaterialPreset> for Material {
    fn from(preset: MaterialPreset) -> Self {
        preset.material()
    }
}

/// Listing entry for a preset, suitable for UI menus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub name: String,
    pub display_name: String,
    pub finish: FinishType,
    pub glossiness: f32,
    pub metallic: f32,
    pub has_glitter: bool,
    pub base_color_rgb: [u8; 3],
}
