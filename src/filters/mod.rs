//! Raster primitives used to turn a flat mask into shading inputs.
//!
//! ## Field Formats
//!
//! | Field | Shape | Type | Description |
//! |-------|-------|------|-------------|
//! | Binary mask | (H, W) | u8 | 1 = inside region, 0 = outside |
//! | Scalar field | (H, W) | f32 | distance, alpha, shading multipliers |
//! | Colour field | (H, W, 3) | f32 | RGB, 0.0-1.0 (sRGB or linear by context) |
//! | Image | (H, W, 3 or 4) | u8 | RGB(A), 0-255 |
//!
//! ## Modules
//!
//! - **core**: Gaussian kernels, separable blur, Sobel derivatives, bilinear
//!   resize, Euclidean distance transform
//! - **color_science**: sRGB transfer functions, u8/f32 conversion, hex parsing

pub mod color_science;
pub mod core;
