//! Detection-to-render glue.
//!
//! A segmentation model hands back per-detection probability masks at its own
//! resolution plus a confidence score. This module turns those into binary
//! masks at frame resolution, analyses them in parallel and paints every
//! accepted region with one material.

use log::{debug, warn};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PolishError, Result};
use crate::filters::core::resize_bilinear;
use crate::geometry::{analyze, DEFAULT_MIN_AREA};
use crate::layer_effects::PolishCompositor;
use crate::material::Material;

/// One detector output.
#[derive(Clone, Debug)]
pub struct Detection {
    /// Per-pixel probability (or 0/1), any resolution.
    pub mask: Array2<f32>,
    pub confidence: f32,
}

impl Detection {
    pub fn new(mask: Array2<f32>, confidence: f32) -> Self {
        Self { mask, confidence }
    }
}

/// Acceptance thresholds for detections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Detections at or below this score are dropped.
    pub confidence_threshold: f32,
    /// Minimum region size in pixels, checked on the prepared mask and again
    /// as the contour area during analysis.
    pub min_area: f32,
    /// Probability above which a resized mask pixel counts as inside.
    pub mask_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.2,
            min_area: DEFAULT_MIN_AREA,
            mask_threshold: 0.5,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("mask_threshold", self.mask_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PolishError::InvalidParameter { name, value });
            }
        }
        if !(self.min_area >= 0.0) {
            return Err(PolishError::InvalidParameter {
                name: "min_area",
                value: self.min_area,
            });
        }
        Ok(())
    }
}

/// Result of [`render_detections`].
#[derive(Clone, Debug)]
pub struct RenderOutcome {
    pub image: Array3<u8>,
    /// Number of regions painted.
    pub rendered: usize,
}

/// Threshold a probability field into a binary mask (`> threshold` is inside).
pub fn binarize_mask(probabilities: ArrayView2<f32>, threshold: f32) -> Array2<u8> {
    probabilities.mapv(|p| (p > threshold) as u8)
}

/// Resize a probability mask to `(height, width)` and binarize it.
///
/// # Arguments
/// * `probabilities` - Detector mask at model resolution
/// * `size` - Target (height, width), normally the frame size
/// * `threshold` - Probability cut, 0.5 for most detectors
pub fn prepare_mask(probabilities: ArrayView2<f32>, size: (usize, usize), threshold: f32) -> Result<Array2<u8>> {
    let (in_h, in_w) = probabilities.dim();
    if in_h == 0 || in_w == 0 || size.0 == 0 || size.1 == 0 {
        return Err(PolishError::EmptyImage);
    }
    if (in_h, in_w) == size {
        return Ok(binarize_mask(probabilities, threshold));
    }
    let resized = resize_bilinear(probabilities, size.0, size.1);
    Ok(binarize_mask(resized.view(), threshold))
}

/// Paint every accepted detection with `material`.
///
/// Detections below the confidence threshold, with too few mask pixels, or
/// without usable geometry are skipped. Masks are prepared and analysed in
/// parallel; painting happens in detection order.
pub fn render_detections(
    compositor: &PolishCompositor,
    image: ArrayView3<u8>,
    detections: &[Detection],
    material: &Material,
    config: &PipelineConfig,
) -> Result<RenderOutcome> {
    config.validate()?;
    let (height, width, _) = image.dim();
    if height == 0 || width == 0 {
        return Err(PolishError::EmptyImage);
    }

    let accepted: Vec<&Detection> = detections
        .iter()
        .filter(|d| {
            let keep = d.confidence > config.confidence_threshold;
            if !keep {
                debug!(
                    "skipping detection with confidence {:.2} (threshold {:.2})",
                    d.confidence, config.confidence_threshold
                );
            }
            keep
        })
        .collect();

    let geometries = accepted
        .par_iter()
        .map(|detection| {
            let mask = prepare_mask(detection.mask.view(), (height, width), config.mask_threshold)?;
            let pixels = mask.iter().filter(|&&m| m != 0).count();
            if (pixels as f32) < config.min_area {
                debug!("skipping mask with {} pixels", pixels);
                return Ok(None);
            }
            analyze(mask.view(), config.min_area)
        })
        .collect::<Result<Vec<_>>>()?;

    let geometries: Vec<_> = geometries.into_iter().flatten().collect();
    if geometries.len() < accepted.len() {
        warn!(
            "{} of {} accepted detections produced no usable region",
            accepted.len() - geometries.len(),
            accepted.len()
        );
    }

    let image = compositor.render_regions(image, geometries.iter().map(|g| (g, material)))?;
    Ok(RenderOutcome {
        image,
        rendered: geometries.len(),
    })
}
