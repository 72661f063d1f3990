//! Region compositor.
//!
//! Combines the six layers in linear light and blends the result onto the
//! image through the feathered alpha:
//!
//! ```text
//! shaded = linearize(base) * shading * ao * edge
//! shaded = shaded + specular + 0.6 * glitter
//! polish = delinearize(clamp(shaded, 0, 1))
//! out    = image * (1 - alpha) + polish * alpha
//! ```
//!
//! Work is confined to a window around the region: the mask's support padded
//! by the reach of the widest blur. Outside the mask every layer is constant,
//! so the windowed result is identical to evaluating the full frame.

use log::debug;
use ndarray::{s, Array3, ArrayView3};
use rayon::prelude::*;

use super::layers::{
    ambient_occlusion_layer, base_color_layer, curvature_shading_layer, edge_darkening_layer,
    feathered_alpha, glitter_layer, glitter_radius, specular_layer,
};
use super::lighting::{CompositorConfig, Lighting};
use crate::error::{PolishError, Result};
use crate::filters::color_science::{linear_to_srgb, srgb_to_linear, u8_to_unit, unit_to_u8};
use crate::filters::core::gaussian_radius;
use crate::geometry::{BoundingBox, RegionGeometry};
use crate::material::Material;

/// Weight of the glitter layer in the linear sum.
pub const GLITTER_WEIGHT: f32 = 0.6;

/// One image and the regions to paint on it.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: Array3<u8>,
    pub regions: Vec<(RegionGeometry, Material)>,
}

/// Paints polish materials onto images.
///
/// Holds only the lighting and blur settings, so one instance can be shared
/// across threads.
#[derive(Clone, Debug, Default)]
pub struct PolishCompositor {
    config: CompositorConfig,
}

impl PolishCompositor {
    pub fn new(config: CompositorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Default settings under a custom light.
    pub fn with_lighting(lighting: Lighting) -> Result<Self> {
        Self::new(CompositorConfig {
            lighting,
            ..CompositorConfig::default()
        })
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn lighting(&self) -> &Lighting {
        &self.config.lighting
    }

    /// Seed of the glitter generator for a region.
    pub fn glitter_seed(&self, geometry: &RegionGeometry) -> u64 {
        if self.config.seed_glitter_from_mask {
            self.config.glitter_seed ^ geometry.mask_hash()
        } else {
            self.config.glitter_seed
        }
    }

    /// Pixel window touched when painting `geometry` with `material`.
    pub fn window(&self, geometry: &RegionGeometry, material: &Material) -> BoundingBox {
        let (height, width) = geometry.dim();
        let mut margin = self.config.max_blur_radius();
        if material.has_glitter {
            let reach = glitter_radius(material, height, width)
                .saturating_add(gaussian_radius(self.config.glitter_blur_sigma));
            margin = margin.max(reach);
        }
        geometry.support().expand(margin.saturating_add(1), height, width)
    }

    /// Paint one region, returning a new image.
    ///
    /// # Arguments
    /// * `image` - RGB or RGBA image, (height, width, 3|4); alpha is kept as is
    /// * `geometry` - Region analysed at the image's resolution
    /// * `material` - Polish to apply
    pub fn render_region(
        &self,
        image: ArrayView3<u8>,
        geometry: &RegionGeometry,
        material: &Material,
    ) -> Result<Array3<u8>> {
        self.render_regions(image, std::iter::once((geometry, material)))
    }

    /// Paint regions one after another; later regions land on top.
    ///
    /// Every input is validated before any pixel is written.
    pub fn render_regions<'a, I>(&self, image: ArrayView3<u8>, regions: I) -> Result<Array3<u8>>
    where
        I: IntoIterator<Item = (&'a RegionGeometry, &'a Material)>,
    {
        let dims = validate_image(image)?;
        let regions: Vec<_> = regions.into_iter().collect();
        for (geometry, material) in &regions {
            if geometry.dim() != dims {
                return Err(PolishError::DimensionMismatch {
                    expected: dims,
                    actual: geometry.dim(),
                });
            }
            material.validate()?;
        }

        let mut output = image.to_owned();
        for (geometry, material) in regions {
            self.composite_into(&mut output, geometry, material);
        }
        Ok(output)
    }

    /// Render independent frames in parallel.
    pub fn render_frames(&self, frames: &[Frame]) -> Result<Vec<Array3<u8>>> {
        frames
            .par_iter()
            .map(|frame| {
                self.render_regions(
                    frame.image.view(),
                    frame.regions.iter().map(|(geometry, material)| (geometry, material)),
                )
            })
            .collect()
    }

    fn composite_into(&self, image: &mut Array3<u8>, geometry: &RegionGeometry, material: &Material) {
        if material.opacity <= 0.0 {
            return;
        }

        let window = self.window(geometry, material);
        if window.width == 0 || window.height == 0 {
            return;
        }
        debug!(
            "compositing {:?} finish in window {}x{} at ({}, {})",
            material.finish_type(),
            window.width,
            window.height,
            window.x,
            window.y
        );

        let rows = window.y..window.y + window.height;
        let cols = window.x..window.x + window.width;
        let mask = geometry.mask().slice_move(s![rows.clone(), cols.clone()]);
        let curvature = geometry.curvature_field().slice_move(s![rows.clone(), cols.clone()]);
        let proximity = geometry.edge_proximity_field().slice_move(s![rows.clone(), cols.clone()]);
        let normals = geometry.normal_field().slice(s![rows.clone(), cols.clone(), ..]);

        let config = &self.config;
        let base = base_color_layer(mask, material);
        let shading = curvature_shading_layer(curvature, material);
        let specular = specular_layer(normals, mask, material, &config.lighting);
        let occlusion = ambient_occlusion_layer(proximity, material, config.ao_blur_sigma);
        let edge = edge_darkening_layer(proximity, material, config.edge_blur_sigma);
        let glitter = glitter_layer(mask, material, self.glitter_seed(geometry), config.glitter_blur_sigma);
        let alpha = feathered_alpha(mask, config.feather_sigma, material.opacity);

        let mut target = image.slice_mut(s![rows, cols, ..]);
        for ((y, x), &a) in alpha.indexed_iter() {
            if a <= 0.0 {
                continue;
            }
            let multiplier = shading[[y, x]] * occlusion[[y, x]] * edge[[y, x]];
            for c in 0..3 {
                let mut linear = srgb_to_linear(base[[y, x, c]]) * multiplier + specular[[y, x, c]];
                if let Some(glitter) = &glitter {
                    linear += GLITTER_WEIGHT * glitter[[y, x, c]];
                }
                let polish = linear_to_srgb(linear.clamp(0.0, 1.0));
                let original = u8_to_unit(target[[y, x, c]]);
                target[[y, x, c]] = unit_to_u8(original * (1.0 - a) + polish * a);
            }
        }
    }
}

/// Check image shape, returning (height, width).
fn validate_image(image: ArrayView3<u8>) -> Result<(usize, usize)> {
    let (height, width, channels) = image.dim();
    if height == 0 || width == 0 {
        return Err(PolishError::EmptyImage);
    }
    if channels != 3 && channels != 4 {
        return Err(PolishError::UnsupportedChannels { channels });
    }
    Ok((height, width))
}
