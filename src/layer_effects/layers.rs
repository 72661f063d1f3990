//! The six polish layers and the feathered alpha.
//!
//! Each layer is a pure function of geometry fields, a material and the
//! compositor settings. The fields passed in may be a window of the full
//! region fields; every function only looks at the pixels it is given.
//!
//! | Layer | Output | Range |
//! |-------|--------|-------|
//! | base colour | (H, W, 3) sRGB | 0.0-1.0, 0 outside the mask |
//! | curvature shading | (H, W) multiplier | `1 - strength`..1 |
//! | specular | (H, W, 3) linear | 0..`specular_intensity` |
//! | ambient occlusion | (H, W) multiplier | `1 - ao`..1 |
//! | edge darkening | (H, W) multiplier | `1 - edge_darkness`..1 |
//! | glitter | (H, W, 3) linear | 0.0-1.0 |

use log::trace;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::lighting::Lighting;
use crate::filters::core::{blur_alpha_f32, blur_channels, blur_field};
use crate::material::Material;

/// Glossiness below which the specular layer is empty.
pub const MIN_SPECULAR_GLOSSINESS: f32 = 0.1;

/// Metallic level above which highlights take on the base colour.
pub const METALLIC_TINT_THRESHOLD: f32 = 0.5;

/// Fraction of `mask pixels x density` that become glitter particles.
pub const GLITTER_PARTICLE_RATE: f32 = 0.05;

/// Flat fill of the base colour inside the mask.
pub fn base_color_layer(mask: ArrayView2<u8>, material: &Material) -> Array3<f32> {
    let (height, width) = mask.dim();
    let mut layer = Array3::<f32>::zeros((height, width, 3));
    for ((y, x), &m) in mask.indexed_iter() {
        if m != 0 {
            for c in 0..3 {
                layer[[y, x, c]] = material.base_color[c];
            }
        }
    }
    layer
}

/// Brightness falloff from the region centre toward its edge.
///
/// `shading = (1 - strength) + curvature^gamma * strength` with
/// `strength = 0.3 + 0.5 * glossiness` and `gamma = 1.5 - 0.5 * roughness`.
pub fn curvature_shading_layer(curvature: ArrayView2<f32>, material: &Material) -> Array2<f32> {
    let strength = 0.3 + 0.5 * material.glossiness;
    let gamma = 1.5 - 0.5 * material.roughness();
    let min_light = 1.0 - strength;
    curvature.mapv(|c| min_light + c.max(0.0).powf(gamma) * strength)
}

/// Blinn-Phong highlight, in linear light.
///
/// `specular_intensity * clamp(n.h, 0, 1)^shininess` with
/// `shininess = 10 + 200 * glossiness`, tinted by the highlight colour.
pub fn specular_layer(
    normals: ArrayView3<f32>,
    mask: ArrayView2<u8>,
    material: &Material,
    lighting: &Lighting,
) -> Array3<f32> {
    let (height, width) = mask.dim();
    let mut layer = Array3::<f32>::zeros((height, width, 3));
    if material.glossiness < MIN_SPECULAR_GLOSSINESS || material.specular_intensity <= 0.0 {
        return layer;
    }

    let h = lighting.halfway();
    let shininess = specular_shininess(material);
    let tint = highlight_color(material, lighting);
    trace!("specular: shininess={:.1} tint={:?}", shininess, tint);

    for ((y, x), &m) in mask.indexed_iter() {
        if m == 0 {
            continue;
        }
        let d = (normals[[y, x, 0]] * h[0] + normals[[y, x, 1]] * h[1] + normals[[y, x, 2]] * h[2])
            .clamp(0.0, 1.0);
        if d <= 0.0 {
            continue;
        }
        let intensity = material.specular_intensity * d.powf(shininess);
        for c in 0..3 {
            layer[[y, x, c]] = intensity * tint[c];
        }
    }
    layer
}

/// Blinn-Phong exponent for a material.
pub fn specular_shininess(material: &Material) -> f32 {
    10.0 + 200.0 * material.glossiness
}

/// Highlight colour: specular tint under the light colour, pulled toward the
/// base colour for metallic finishes.
fn highlight_color(material: &Material, lighting: &Lighting) -> [f32; 3] {
    let mut color = [0.0f32; 3];
    for c in 0..3 {
        let lit = material.specular_tint[c] * lighting.color[c];
        color[c] = if material.metallic > METALLIC_TINT_THRESHOLD {
            lit * (1.0 - material.metallic) + lit * material.base_color[c] * material.metallic
        } else {
            lit
        };
    }
    color
}

/// Darken toward the edge: `1 - (1 - proximity) * ao_intensity`, blurred.
pub fn ambient_occlusion_layer(edge_proximity: ArrayView2<f32>, material: &Material, sigma: f32) -> Array2<f32> {
    let ao = material.ambient_occlusion_intensity;
    let raw = edge_proximity.mapv(|e| 1.0 - (1.0 - e) * ao);
    blur_field(raw.view(), sigma)
}

/// Rim darkening over the outer `edge_width` fraction of the proximity range.
pub fn edge_darkening_layer(edge_proximity: ArrayView2<f32>, material: &Material, sigma: f32) -> Array2<f32> {
    if material.edge_darkness == 0.0 {
        return Array2::ones(edge_proximity.dim());
    }

    let max = edge_proximity.iter().cloned().fold(0.0f32, f32::max);
    let scale = if max > 0.0 { 1.0 / max } else { 1.0 };
    let width = material.edge_width.max(f32::EPSILON);
    let darkness = material.edge_darkness;

    let raw = edge_proximity.mapv(|e| {
        let edge_mask = 1.0 - (e * scale / width).clamp(0.0, 1.0);
        1.0 - edge_mask * darkness
    });
    blur_field(raw.view(), sigma)
}

/// Sparkle particles scattered over the mask, in linear light.
///
/// Returns `None` when the material has no glitter. Particle placement and
/// brightness depend only on the mask pixels (in raster order), the material
/// and `seed`.
pub fn glitter_layer(mask: ArrayView2<u8>, material: &Material, seed: u64, sigma: f32) -> Option<Array3<f32>> {
    if !material.has_glitter {
        return None;
    }

    let (height, width) = mask.dim();
    let mut layer = Array3::<f32>::zeros((height, width, 3));

    let positions: Vec<(usize, usize)> = mask
        .indexed_iter()
        .filter(|(_, &m)| m != 0)
        .map(|(idx, _)| idx)
        .collect();
    let count = ((positions.len() as f32 * material.glitter_density * GLITTER_PARTICLE_RATE) as usize)
        .min(positions.len());
    if count == 0 {
        return Some(layer);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let picks = rand::seq::index::sample(&mut rng, positions.len(), count);
    let radius = glitter_radius(material, height, width) as i64;
    trace!("glitter: {} particles of radius {}", count, radius);

    for pick in picks.iter() {
        let (py, px) = positions[pick];
        let brightness: f32 = rng.random_range(0.5..1.0);
        let color = material.glitter_color.map(|c| c * brightness);
        draw_disc(&mut layer, px as i64, py as i64, radius, color);
    }

    Some(blur_channels(layer.view(), sigma))
}

/// Particle disc radius in pixels for a `height` x `width` frame.
///
/// `trunc(glitter_size)`, capped at the frame diagonal: a disc centred in the
/// frame with that radius already covers all of it.
pub fn glitter_radius(material: &Material, height: usize, width: usize) -> usize {
    let diagonal = ((height as f64).hypot(width as f64)).ceil() as usize;
    // float-to-int casts saturate, so huge sizes land on the cap
    (material.glitter_size.max(0.0) as usize).min(diagonal)
}

/// Fill a disc, overwriting what is underneath. Clipped to the layer.
fn draw_disc(layer: &mut Array3<f32>, cx: i64, cy: i64, radius: i64, color: [f32; 3]) {
    let (height, width, _) = layer.dim();
    if height == 0 || width == 0 {
        return;
    }
    let r2 = radius * radius;
    let (y0, y1) = ((cy - radius).max(0), (cy + radius).min(height as i64 - 1));
    let (x0, x1) = ((cx - radius).max(0), (cx + radius).min(width as i64 - 1));
    for y in y0..=y1 {
        let dy = y - cy;
        for x in x0..=x1 {
            let dx = x - cx;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            for c in 0..3 {
                layer[[y as usize, x as usize, c]] = color[c];
            }
        }
    }
}

/// Soft-edged compositing alpha: blurred mask scaled by opacity.
pub fn feathered_alpha(mask: ArrayView2<u8>, sigma: f32, opacity: f32) -> Array2<f32> {
    let hard = mask.mapv(|m| if m != 0 { 1.0f32 } else { 0.0 });
    let mut alpha = blur_alpha_f32(hard.view(), sigma);
    alpha.mapv_inplace(|a| a * opacity);
    alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::analyze;
    use crate::material::MaterialPreset;
    use approx::assert_abs_diff_eq;

    fn disc_mask(size: usize, radius: f32) -> Array2<u8> {
        let c = size as f32 / 2.0;
        Array2::from_shape_fn((size, size), |(y, x)| {
            let dx = x as f32 - c;
            let dy = y as f32 - c;
            (dx * dx + dy * dy <= radius * radius) as u8
        })
    }

    #[test]
    fn test_base_color_fills_mask_only() {
        let mask = disc_mask(32, 10.0);
        let material = MaterialPreset::GlossyRed.material();
        let layer = base_color_layer(mask.view(), &material);
        assert_eq!(layer[[16, 16, 0]], 0.8);
        assert_eq!(layer[[0, 0, 0]], 0.0);
    }

    #[test]
    fn test_curvature_shading_range() {
        let curvature = Array2::from_shape_fn((1, 11), |(_, x)| x as f32 / 10.0);
        let material = Material::new([0.5, 0.5, 0.5]).with_glossiness(0.8);
        let shading = curvature_shading_layer(curvature.view(), &material);
        let strength = 0.3 + 0.5 * 0.8;
        assert_abs_diff_eq!(shading[[0, 0]], 1.0 - strength, epsilon = 1e-6);
        assert_abs_diff_eq!(shading[[0, 10]], 1.0, epsilon = 1e-6);
        assert!(shading.windows((1, 2)).into_iter().all(|w| w[[0, 1]] >= w[[0, 0]]));
    }

    #[test]
    fn test_specular_skipped_for_low_gloss() {
        let mask = disc_mask(48, 18.0);
        let geometry = analyze(mask.view(), 10.0).unwrap().unwrap();
        let material = Material::new([0.5, 0.5, 0.5]).with_glossiness(0.05);
        let layer = specular_layer(
            geometry.normal_field().view(),
            geometry.mask(),
            &material,
            &Lighting::default(),
        );
        assert!(layer.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_specular_follows_blinn_phong() {
        let mask = disc_mask(48, 18.0);
        let geometry = analyze(mask.view(), 10.0).unwrap().unwrap();
        let lighting = Lighting::default();
        let material = Material::new([0.5, 0.5, 0.5])
            .with_glossiness(0.6)
            .with_specular(1.5, [1.0, 1.0, 1.0]);
        let normals = geometry.normal_field();
        let layer = specular_layer(normals.view(), geometry.mask(), &material, &lighting);

        let h = lighting.halfway();
        let shininess = 10.0 + 200.0 * 0.6;
        for (y, x) in [(24, 24), (14, 14), (20, 30)] {
            let d = (0..3).map(|c| normals[[y, x, c]] * h[c]).sum::<f32>().clamp(0.0, 1.0);
            let expected = 1.5 * d.powf(shininess);
            for c in 0..3 {
                assert_abs_diff_eq!(layer[[y, x, c]], expected, epsilon = 1e-6);
            }
        }

        let peak = layer.iter().cloned().fold(0.0f32, f32::max);
        assert!(peak > 0.0 && peak <= 1.5, "peak {}", peak);
        assert_eq!(layer[[0, 0, 0]], 0.0);
    }

    #[test]
    fn test_specular_at_aligned_normal_holds_with_glossiness() {
        let lighting = Lighting::default();
        let h = lighting.halfway();
        let mask = Array2::from_elem((3, 3), 1u8);
        let mut normals = Array3::<f32>::zeros((3, 3, 3));
        normals[[1, 1, 2]] = 1.0;
        for c in 0..3 {
            normals[[0, 0, c]] = h[c];
        }

        let mut previous = 0.0f32;
        for step in 0..=20 {
            let glossiness = step as f32 / 20.0;
            let material = Material::new([0.5, 0.5, 0.5]).with_glossiness(glossiness);
            let layer = specular_layer(normals.view(), mask.view(), &material, &lighting);
            let aligned = layer[[0, 0, 0]];
            assert!(aligned + 1e-5 >= previous, "glossiness {}: {} -> {}", glossiness, previous, aligned);
            // Off-axis pixels only tighten
            assert!(layer[[1, 1, 0]] <= aligned);
            previous = aligned;
        }
        assert_abs_diff_eq!(previous, Material::new([0.5, 0.5, 0.5]).specular_intensity, epsilon = 1e-4);
    }

    #[test]
    fn test_metallic_highlight_takes_base_color() {
        let lighting = Lighting::default();
        let plain = Material::new([1.0, 0.0, 0.0]).with_metallic(0.0);
        let metal = Material::new([1.0, 0.0, 0.0]).with_metallic(0.9);
        assert_eq!(highlight_color(&plain, &lighting), [1.0, 1.0, 1.0]);
        let tinted = highlight_color(&metal, &lighting);
        assert_abs_diff_eq!(tinted[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(tinted[1], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_ambient_occlusion_bounds() {
        let mask = disc_mask(48, 18.0);
        let geometry = analyze(mask.view(), 10.0).unwrap().unwrap();
        let material = Material::new([0.5, 0.5, 0.5]).with_ambient_occlusion(0.4);
        let ao = ambient_occlusion_layer(geometry.edge_proximity_field(), &material, 2.0);
        assert!(ao.iter().all(|&v| v >= 0.6 - 1e-5 && v <= 1.0 + 1e-5));
        assert_abs_diff_eq!(ao[[0, 0]], 0.6, epsilon = 1e-5);
        assert!(ao[[24, 24]] > ao[[24, 8]]);

        let none = ambient_occlusion_layer(geometry.edge_proximity_field(), &material.with_ambient_occlusion(0.0), 2.0);
        assert!(none.iter().all(|&v| (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_edge_darkening() {
        let mask = disc_mask(48, 18.0);
        let geometry = analyze(mask.view(), 10.0).unwrap().unwrap();
        let material = Material::new([0.5, 0.5, 0.5]).with_edge(0.5, 0.15);
        let dark = edge_darkening_layer(geometry.edge_proximity_field(), &material, 3.0);
        assert_abs_diff_eq!(dark[[24, 24]], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(dark[[0, 0]], 0.5, epsilon = 1e-4);

        let off = edge_darkening_layer(geometry.edge_proximity_field(), &material.with_edge(0.0, 0.15), 3.0);
        assert!(off.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_glitter_is_seeded() {
        let mask = disc_mask(64, 25.0);
        let material = MaterialPreset::GlitterSilver.material();
        let a = glitter_layer(mask.view(), &material, 42, 0.5).unwrap();
        let b = glitter_layer(mask.view(), &material, 42, 0.5).unwrap();
        let c = glitter_layer(mask.view(), &material, 7, 0.5).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().any(|&v| v > 0.0));
        assert!(a.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(glitter_layer(mask.view(), &MaterialPreset::GlossyRed.material(), 42, 0.5).is_none());
    }

    #[test]
    fn test_oversized_glitter_is_clipped_to_layer() {
        let mask = disc_mask(24, 8.0);
        assert_eq!(glitter_radius(&Material::new([0.5; 3]).with_glitter(0.3, 1e20, [1.0; 3]), 24, 24), 34);
        assert_eq!(glitter_radius(&Material::new([0.5; 3]).with_glitter(0.3, 2.7, [1.0; 3]), 24, 24), 2);

        let material = MaterialPreset::GlitterSilver
            .material()
            .with_glitter(1.0, 1e20, [1.0, 1.0, 1.0]);
        assert!(material.validate().is_ok());
        let layer = glitter_layer(mask.view(), &material, 42, 0.5).unwrap();
        assert_eq!(layer.dim(), (24, 24, 3));
        // Every disc covers the whole layer, so the last one wins everywhere
        let first = layer[[0, 0, 0]];
        assert!(first > 0.49 && first < 1.0);
        assert!(layer.iter().all(|&v| (v - first).abs() < 1e-5));
    }

    #[test]
    fn test_feathered_alpha() {
        let mask = disc_mask(64, 20.0);
        let alpha = feathered_alpha(mask.view(), 5.0, 0.8);
        assert_abs_diff_eq!(alpha[[32, 32]], 0.8, epsilon = 1e-3);
        assert!(alpha[[32, 53]] > 0.0 && alpha[[32, 53]] < 0.8);
        assert_eq!(alpha[[0, 0]], 0.0);
        assert!(feathered_alpha(mask.view(), 5.0, 0.0).iter().all(|&a| a == 0.0));
    }
}
