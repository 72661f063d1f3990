//! NailStag: photo-realistic nail polish rendering.
//!
//! Takes an image and binary fingernail masks and paints a pseudo-3D polish
//! layer onto each nail. Python bindings via PyO3 and WASM bindings for
//! JavaScript are available behind the `python` and `wasm` features.
//!
//! ## Pipeline
//! 1. **Geometry** (`geometry`): contour, centroid, ellipse orientation,
//!    normalized distance field, surface normals and highlight anchor
//! 2. **Material** (`material`): preset catalog or custom parameters
//! 3. **Compositing** (`layer_effects`): six layers (base colour, curvature
//!    shading, specular, ambient occlusion, edge darkening, glitter) combined in
//!    linear light and blended through a feathered alpha
//!
//! `pipeline` ties detector output (probability masks + confidence) to the
//! steps above.
//!
//! ## Image Format
//! - **Images**: (height, width, 3 or 4) `u8`, RGB(A); alpha passes through untouched
//! - **Masks**: (height, width) `u8`, 1 = nail, 0 = background
//! - **Detector masks**: (height, width) `f32` probabilities at any resolution

pub mod error;
pub mod filters;
pub mod geometry;
pub mod layer_effects;
pub mod logger;
pub mod material;
pub mod pipeline;
pub mod selection;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{PolishError, Result};
pub use geometry::{analyze, analyze_all, BoundingBox, RegionGeometry};
pub use layer_effects::{CompositorConfig, Frame, Lighting, PolishCompositor};
pub use material::{FinishType, Material, MaterialInfo, MaterialPreset};
pub use pipeline::{render_detections, Detection, PipelineConfig, RenderOutcome};
pub use selection::Point;

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray2, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use pyo3::types::PyDict;

    use crate::error::PolishError;
    use crate::layer_effects::PolishCompositor;
    use crate::material::{FinishType, Material, MaterialPreset};
    use crate::pipeline::{render_detections, Detection, PipelineConfig};

    fn to_py_err(err: PolishError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }

    fn resolve_material(preset: &str, color: Option<&str>, finish: Option<&str>) -> PyResult<Material> {
        match color {
            Some(hex) => {
                let finish = match finish {
                    Some(name) => FinishType::from_name(name)
                        .ok_or_else(|| PyValueError::new_err(format!("unknown finish '{}'", name)))?,
                    None => FinishType::Glossy,
                };
                Material::custom_hex(hex, finish).map_err(to_py_err)
            }
            None => Ok(MaterialPreset::lookup_or_default(preset).material()),
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Paint nail polish onto an RGB(A) u8 image.
    ///
    /// # Arguments
    /// * `image` - (H, W, 3|4) uint8 array
    /// * `masks` - List of float32 probability masks, any resolution
    /// * `preset` - Preset name, unknown names fall back to glossy_red
    /// * `confidences` - Optional per-mask scores (default 1.0 each)
    /// * `color` - Optional "#RRGGBB" custom colour, overrides `preset`
    /// * `finish` - Finish for the custom colour (default "glossy")
    /// * `min_area` - Minimum region size in pixels
    #[pyfunction]
    #[pyo3(signature = (image, masks, preset="glossy_red", confidences=None, color=None, finish=None, min_area=100.0))]
    pub fn render_nails<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        masks: Vec<PyReadonlyArray2<'py, f32>>,
        preset: &str,
        confidences: Option<Vec<f32>>,
        color: Option<&str>,
        finish: Option<&str>,
        min_area: f32,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let material = resolve_material(preset, color, finish)?;
        if let Some(scores) = &confidences {
            if scores.len() != masks.len() {
                return Err(PyValueError::new_err(format!(
                    "got {} masks but {} confidences",
                    masks.len(),
                    scores.len()
                )));
            }
        }

        let detections: Vec<Detection> = masks
            .iter()
            .enumerate()
            .map(|(i, mask)| {
                let confidence = confidences.as_ref().map_or(1.0, |c| c[i]);
                Detection::new(mask.as_array().to_owned(), confidence)
            })
            .collect();

        let config = PipelineConfig {
            min_area,
            ..PipelineConfig::default()
        };
        let outcome = render_detections(
            &PolishCompositor::default(),
            image.as_array(),
            &detections,
            &material,
            &config,
        )
        .map_err(to_py_err)?;

        Ok(outcome.image.into_pyarray(py))
    }

    /// List the preset catalog as dicts.
    #[pyfunction]
    pub fn material_presets(py: Python<'_>) -> PyResult<Vec<Bound<'_, PyDict>>> {
        Material::catalog()
            .into_iter()
            .map(|info| {
                let dict = PyDict::new(py);
                dict.set_item("name", info.name)?;
                dict.set_item("display_name", info.display_name)?;
                dict.set_item("finish", info.finish.as_str())?;
                dict.set_item("glossiness", info.glossiness)?;
                dict.set_item("metallic", info.metallic)?;
                dict.set_item("has_glitter", info.has_glitter)?;
                dict.set_item("base_color_rgb", info.base_color_rgb.to_vec())?;
                Ok(dict)
            })
            .collect()
    }

    #[pymodule]
    pub fn nailstag(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(render_nails, m)?)?;
        m.add_function(wrap_pyfunction!(material_presets, m)?)?;
        Ok(())
    }
}
