//! WebAssembly exports.
//!
//! These functions are exposed to JavaScript via wasm-bindgen and work on
//! flat, row-major byte/float buffers (e.g. `ImageData.data`).

use ndarray::{Array2, Array3};
use wasm_bindgen::prelude::*;

use crate::layer_effects::PolishCompositor;
use crate::material::{Material, MaterialPreset};
use crate::pipeline::{render_detections, Detection, PipelineConfig};

fn to_js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Paint one nail mask onto an RGB(A) image.
///
/// # Arguments
/// * `data` - Flat image bytes (length = width * height * channels)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - 3 (RGB) or 4 (RGBA)
/// * `mask` - Flat probability mask (length = mask_width * mask_height)
/// * `mask_width` - Mask width, may differ from the image
/// * `mask_height` - Mask height, may differ from the image
/// * `preset` - Preset name, unknown names fall back to glossy_red
///
/// # Returns
/// Flat image bytes with the polish painted in
#[wasm_bindgen]
pub fn render_nails_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    mask: &[f32],
    mask_width: usize,
    mask_height: usize,
    preset: &str,
) -> Result<Vec<u8>, JsValue> {
    let image = Array3::from_shape_vec((height, width, channels), data.to_vec()).map_err(to_js_err)?;
    let mask = Array2::from_shape_vec((mask_height, mask_width), mask.to_vec()).map_err(to_js_err)?;
    let material = MaterialPreset::lookup_or_default(preset).material();

    let outcome = render_detections(
        &PolishCompositor::default(),
        image.view(),
        &[Detection::new(mask, 1.0)],
        &material,
        &PipelineConfig::default(),
    )
    .map_err(to_js_err)?;

    Ok(outcome.image.into_raw_vec_and_offset().0)
}

/// Preset catalog as a JSON array of summaries.
#[wasm_bindgen]
pub fn material_presets_wasm() -> Result<String, JsValue> {
    serde_json::to_string(&Material::catalog()).map_err(to_js_err)
}
