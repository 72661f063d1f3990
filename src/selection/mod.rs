//! Region selection from binary masks.
//!
//! - **Labelling**: 8-connected flood fill over mask pixels
//! - **Contour extraction**: Moore-neighbour tracing of each region's outer boundary
//!
//! The geometry analyzer picks the principal region from these contours.

pub mod contour;

pub use contour::{contour_area, extract_external_contours, label_regions, Point};
