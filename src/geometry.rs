//! Region geometry extraction.
//!
//! Turns a binary region mask into the shape descriptors and pseudo-3D
//! fields the compositor shades with:
//! - principal external contour, centroid, bounding box
//! - orientation and axis extents from a moment ellipse fit
//! - normalized distance field (curvature / edge proximity)
//! - gradient-derived surface normals
//! - specular highlight anchor

use log::debug;
use ndarray::{Array2, Array3, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PolishError, Result};
use crate::filters::core::{distance_transform, sobel5_x, sobel5_y};
use crate::selection::contour::{contour_area, extract_external_contours, Point};

/// Minimum contour area (px²) used when the caller has no better value.
pub const DEFAULT_MIN_AREA: f32 = 100.0;

/// Contours with fewer points fall back to bounding-box extents.
const MIN_ELLIPSE_POINTS: usize = 5;

/// Fraction of the region length the highlight anchor sits from the centre.
const HIGHLIGHT_OFFSET: f32 = 0.15;

/// Axis-aligned integer rectangle, `x`/`y` of the top-left pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl BoundingBox {
    /// Bounding box of a set of points, or `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let x = min_x.max(0.0) as usize;
        let y = min_y.max(0.0) as usize;
        Some(Self {
            x,
            y,
            width: (max_x.max(0.0) as usize) - x + 1,
            height: (max_y.max(0.0) as usize) - y + 1,
        })
    }

    /// Bounding box of every non-zero mask pixel, or `None` for an empty mask.
    pub fn of_mask(mask: ArrayView2<u8>) -> Option<Self> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for ((y, x), &v) in mask.indexed_iter() {
            if v == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds.map(|(x0, y0, x1, y1)| Self {
            x: x0,
            y: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        })
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        BoundingBox {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }

    /// Grow by `margin` on every side, clipped to a `height` x `width` frame.
    pub fn expand(&self, margin: usize, height: usize, width: usize) -> BoundingBox {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        let right = (self.x + self.width).saturating_add(margin).min(width);
        let bottom = (self.y + self.height).saturating_add(margin).min(height);
        BoundingBox {
            x,
            y,
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        }
    }

    /// Whether `p` lies within the covered pixels, `x..x + width` by `y..y + height`.
    pub fn contains(&self, p: Point) -> bool {
        self.width > 0
            && self.height > 0
            && p.x >= self.x as f32
            && p.y >= self.y as f32
            && p.x <= (self.x + self.width - 1) as f32
            && p.y <= (self.y + self.height - 1) as f32
    }
}

/// Raw and central image moments of a closed polygon.
#[derive(Clone, Copy, Debug, Default)]
struct Moments {
    m00: f64,
    m10: f64,
    m01: f64,
    mu20: f64,
    mu11: f64,
    mu02: f64,
}

impl Moments {
    /// Polygon moments via Green's theorem (orientation-independent).
    fn of_polygon(contour: &[Point]) -> Self {
        let n = contour.len();
        if n < 3 {
            return Self::default();
        }

        let (mut m00, mut m10, mut m01) = (0.0f64, 0.0f64, 0.0f64);
        let (mut m20, mut m11, mut m02) = (0.0f64, 0.0f64, 0.0f64);

        for i in 0..n {
            let (xi, yi) = (contour[i].x as f64, contour[i].y as f64);
            let next = contour[(i + 1) % n];
            let (xj, yj) = (next.x as f64, next.y as f64);
            let a = xi * yj - xj * yi;

            m00 += a;
            m10 += a * (xi + xj);
            m01 += a * (yi + yj);
            m20 += a * (xi * xi + xi * xj + xj * xj);
            m02 += a * (yi * yi + yi * yj + yj * yj);
            m11 += a * (2.0 * xi * yi + xi * yj + xj * yi + 2.0 * xj * yj);
        }

        m00 /= 2.0;
        m10 /= 6.0;
        m01 /= 6.0;
        m20 /= 12.0;
        m02 /= 12.0;
        m11 /= 24.0;

        if m00 < 0.0 {
            m00 = -m00;
            m10 = -m10;
            m01 = -m01;
            m20 = -m20;
            m02 = -m02;
            m11 = -m11;
        }

        if m00 == 0.0 {
            return Self::default();
        }

        let cx = m10 / m00;
        let cy = m01 / m00;
        Self {
            m00,
            m10,
            m01,
            mu20: m20 / m00 - cx * cx,
            mu11: m11 / m00 - cx * cy,
            mu02: m02 / m00 - cy * cy,
        }
    }

    fn centroid(&self) -> Option<Point> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(Point::new((self.m10 / self.m00) as f32, (self.m01 / self.m00) as f32))
    }

    /// Ellipse with the same second moments: `(orientation_deg, length, width)`.
    ///
    /// The orientation follows the rotated-rectangle convention: it is the
    /// angle of the width axis in image coordinates, in `[0, 180)`, and the
    /// length axis lies at `orientation + 90`.
    fn ellipse(&self) -> (f32, f32, f32) {
        let half_diff = (self.mu20 - self.mu02) / 2.0;
        let common = (half_diff * half_diff + self.mu11 * self.mu11).sqrt();
        let mean = (self.mu20 + self.mu02) / 2.0;
        let major_var = (mean + common).max(0.0);
        let minor_var = (mean - common).max(0.0);

        // A filled ellipse with semi-axis a has variance a²/4 along that axis
        let length = 4.0 * major_var.sqrt();
        let width = 4.0 * minor_var.sqrt();

        let major_angle = 0.5 * (2.0 * self.mu11).atan2(self.mu20 - self.mu02);
        let orientation = (major_angle.to_degrees() - 90.0).rem_euclid(180.0) as f32;
        // rem_euclid can round up to exactly 180 for tiny negative inputs
        let orientation = if orientation >= 180.0 { 0.0 } else { orientation };

        (orientation, length as f32, width as f32)
    }
}

/// Shape descriptors and shading fields for one detected region.
///
/// Built once by [`analyze`] and read-only afterwards. All fields share the
/// resolution of the analysed mask.
#[derive(Clone, Debug)]
pub struct RegionGeometry {
    contour: Vec<Point>,
    center: Point,
    orientation_angle: f32,
    length: f32,
    width: f32,
    bounding_box: BoundingBox,
    support: BoundingBox,
    mask: Array2<u8>,
    curvature_field: Array2<f32>,
    edge_proximity_field: Array2<f32>,
    normal_field: Array3<f32>,
    highlight_anchor: Point,
}

impl RegionGeometry {
    /// Principal external contour, ordered, implicitly closed.
    pub fn contour(&self) -> &[Point] {
        &self.contour
    }

    /// Area-weighted centroid of the principal contour.
    pub fn center(&self) -> Point {
        self.center
    }

    /// Degrees in `[0, 180)`; see [`RegionGeometry::length`] for the axis convention.
    pub fn orientation_angle(&self) -> f32 {
        self.orientation_angle
    }

    /// Major extent in pixels, measured along `orientation_angle + 90°`.
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Minor extent in pixels, measured along `orientation_angle`.
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Bounding box of every mask pixel, including regions besides the principal one.
    pub fn support(&self) -> BoundingBox {
        self.support
    }

    pub fn mask(&self) -> ArrayView2<'_, u8> {
        self.mask.view()
    }

    /// (height, width) of the mask and every field.
    pub fn dim(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// Normalized distance to the nearest background pixel, 0.0-1.0.
    pub fn curvature_field(&self) -> ArrayView2<'_, f32> {
        self.curvature_field.view()
    }

    /// Proximity field used by ambient occlusion and edge darkening.
    ///
    /// Starts out equal to the curvature field.
    pub fn edge_proximity_field(&self) -> ArrayView2<'_, f32> {
        self.edge_proximity_field.view()
    }

    /// Unit normals with shape (H, W, 3); zero outside the mask.
    pub fn normal_field(&self) -> &Array3<f32> {
        &self.normal_field
    }

    pub fn highlight_anchor(&self) -> Point {
        self.highlight_anchor
    }

    /// BLAKE3 digest of the mask shape and content, folded to a seed.
    ///
    /// Fixed across platforms and toolchains, so a mask always keys the same
    /// sparkle pattern.
    pub fn mask_hash(&self) -> u64 {
        let (height, width) = self.mask.dim();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(height as u64).to_le_bytes());
        hasher.update(&(width as u64).to_le_bytes());
        for row in self.mask.rows() {
            for &v in row.iter() {
                hasher.update(&[v]);
            }
        }
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }
}

/// Check that every mask value is 0 or 1.
pub fn validate_binary_mask(mask: ArrayView2<u8>) -> Result<()> {
    let (height, width) = mask.dim();
    if height == 0 || width == 0 {
        return Err(PolishError::EmptyImage);
    }
    match mask.iter().find(|&&v| v > 1) {
        Some(&value) => Err(PolishError::NonBinaryMask { value }),
        None => Ok(()),
    }
}

/// Analyze a binary mask.
///
/// # Arguments
/// * `mask` - Binary mask, 1 = inside the region, 0 = outside
/// * `min_area` - Minimum enclosed contour area in px²
///
/// # Returns
/// `Ok(None)` when the mask is empty, its largest contour encloses less than
/// `min_area`, or the contour has zero mass. Errors only for malformed input.
pub fn analyze(mask: ArrayView2<u8>, min_area: f32) -> Result<Option<RegionGeometry>> {
    if !(min_area >= 0.0) {
        return Err(PolishError::InvalidParameter {
            name: "min_area",
            value: min_area,
        });
    }
    validate_binary_mask(mask)?;

    let contours = extract_external_contours(mask);
    let Some((contour, area)) = contours
        .into_iter()
        .map(|c| {
            let area = contour_area(&c);
            (c, area)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
    else {
        debug!("no contours in mask");
        return Ok(None);
    };

    if area < min_area as f64 {
        debug!("largest contour area {:.1} below minimum {:.1}", area, min_area);
        return Ok(None);
    }

    let moments = Moments::of_polygon(&contour);
    let Some(center) = moments.centroid() else {
        debug!("degenerate contour with zero mass");
        return Ok(None);
    };

    let Some(bounding_box) = BoundingBox::from_points(&contour) else {
        return Ok(None);
    };

    let (orientation_angle, length, width) = if contour.len() >= MIN_ELLIPSE_POINTS {
        moments.ellipse()
    } else {
        let w = bounding_box.width as f32;
        let h = bounding_box.height as f32;
        (0.0, w.max(h), w.min(h))
    };

    let support = BoundingBox::of_mask(mask)
        .map(|b| b.union(&bounding_box))
        .unwrap_or(bounding_box);

    let curvature_field = curvature_field(mask);
    let edge_proximity_field = curvature_field.clone();
    let normal_field = normal_field(curvature_field.view(), mask);
    let highlight_anchor = highlight_anchor(center, orientation_angle, length * HIGHLIGHT_OFFSET);

    debug!(
        "region: area={:.0} center=({:.1}, {:.1}) angle={:.1} length={:.1} width={:.1}",
        area, center.x, center.y, orientation_angle, length, width
    );

    Ok(Some(RegionGeometry {
        contour,
        center,
        orientation_angle,
        length,
        width,
        bounding_box,
        support,
        mask: mask.to_owned(),
        curvature_field,
        edge_proximity_field,
        normal_field,
        highlight_anchor,
    }))
}

/// Analyze many masks in parallel, one task per mask.
///
/// Results keep the input order. The first malformed mask aborts the batch.
pub fn analyze_all(masks: &[Array2<u8>], min_area: f32) -> Result<Vec<Option<RegionGeometry>>> {
    masks
        .par_iter()
        .map(|mask| analyze(mask.view(), min_area))
        .collect()
}

/// Distance transform normalized by its own maximum.
///
/// An all-zero distance field (no interior) is returned unnormalized.
fn curvature_field(mask: ArrayView2<u8>) -> Array2<f32> {
    let mut field = distance_transform(mask);
    let max = field.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        field.mapv_inplace(|v| v / max);
    }
    field
}

/// Convex pseudo-normals from the curvature gradient.
///
/// xy = -gradient, z = 1 + 2·curvature, normalized, zeroed outside the mask.
fn normal_field(curvature: ArrayView2<f32>, mask: ArrayView2<u8>) -> Array3<f32> {
    let (height, width) = curvature.dim();
    let grad_x = sobel5_x(curvature);
    let grad_y = sobel5_y(curvature);

    let mut normals = Array3::<f32>::zeros((height, width, 3));
    for y in 0..height {
        for x in 0..width {
            if mask[[y, x]] == 0 {
                continue;
            }
            let nx = -grad_x[[y, x]];
            let ny = -grad_y[[y, x]];
            let nz = 1.0 + 2.0 * curvature[[y, x]];
            let norm = (nx * nx + ny * ny + nz * nz).sqrt().max(1e-8);
            normals[[y, x, 0]] = nx / norm;
            normals[[y, x, 1]] = ny / norm;
            normals[[y, x, 2]] = nz / norm;
        }
    }
    normals
}

/// Offset the centre toward the light: `angle - 45°`, `offset` pixels away.
fn highlight_anchor(center: Point, angle_deg: f32, offset: f32) -> Point {
    let light_angle = angle_deg.to_radians() - std::f32::consts::FRAC_PI_4;
    Point::new(
        center.x + offset * light_angle.cos(),
        center.y + offset * light_angle.sin(),
    )
}
