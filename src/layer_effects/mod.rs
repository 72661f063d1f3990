//! Polish layers and the compositor that stacks them.
//!
//! ## Layers
//! - **Base colour** - flat material colour inside the mask
//! - **Curvature shading** - centre-bright falloff from the distance field
//! - **Specular** - Blinn-Phong hotspot from the normal field (`layers.rs`)
//! - **Ambient occlusion** - soft darkening toward the rim
//! - **Edge darkening** - narrow rim band of the proximity field
//! - **Glitter** - seeded sparkle particles (glitter materials only)
//!
//! ## Compositing
//! The compositor (`compositor.rs`) multiplies the shading terms onto the
//! linearized base colour, adds the highlight and glitter, and blends the
//! result through a feathered, opacity-scaled alpha. Lighting and blur
//! settings live in `lighting.rs`.

pub mod compositor;
pub mod layers;
pub mod lighting;

pub use compositor::{Frame, PolishCompositor, GLITTER_WEIGHT};
pub use lighting::{CompositorConfig, Lighting};
