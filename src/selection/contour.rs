//! External contour extraction from binary masks.
//!
//! Connected regions are found with an 8-connected flood fill, then the outer
//! boundary of each region is walked with Moore-neighbour tracing. Interior
//! holes are ignored: only the external boundary of each region is returned.

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates (x to the right, y downward).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Moore neighborhood directions (8-connected, clockwise from right)
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),   // 0: right
    (1, 1),   // 1: down-right
    (0, 1),   // 2: down
    (-1, 1),  // 3: down-left
    (-1, 0),  // 4: left
    (-1, -1), // 5: up-left
    (0, -1),  // 6: up
    (1, -1),  // 7: up-right
];

/// Check if pixel is set (treating out-of-bounds as unset).
#[inline]
fn is_set(mask: &ArrayView2<u8>, x: i32, y: i32) -> bool {
    let (height, width) = mask.dim();
    x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height && mask[[y as usize, x as usize]] != 0
}

/// Label 8-connected foreground regions.
///
/// # Returns
/// `(labels, count)` where `labels` holds 0 for background and `1..=count`
/// for each region, numbered in raster order of the region's first pixel.
pub fn label_regions(mask: ArrayView2<u8>) -> (Array2<u32>, usize) {
    let (height, width) = mask.dim();
    let mut labels = Array2::<u32>::zeros((height, width));
    let mut count = 0u32;
    let mut queue = VecDeque::new();

    for y in 0..height {
        for x in 0..width {
            if mask[[y, x]] == 0 || labels[[y, x]] != 0 {
                continue;
            }

            count += 1;
            labels[[y, x]] = count;
            queue.push_back((x as i32, y as i32));

            while let Some((cx, cy)) = queue.pop_front() {
                for &(dx, dy) in DIRECTIONS.iter() {
                    let nx = cx + dx;
                    let ny = cy + dy;
                    if is_set(&mask, nx, ny) && labels[[ny as usize, nx as usize]] == 0 {
                        labels[[ny as usize, nx as usize]] = count;
                        queue.push_back((nx, ny));
                    }
                }
            }
        }
    }

    (labels, count as usize)
}

/// Extract the external contour of every 8-connected region in the mask.
///
/// # Arguments
/// * `mask` - Binary mask (0 = outside, non-zero = inside)
///
/// # Returns
/// One ordered, closed (last point connects back to first) contour per
/// region, in raster order of the regions' first pixels. A single-pixel
/// region yields a one-point contour.
pub fn extract_external_contours(mask: ArrayView2<u8>) -> Vec<Vec<Point>> {
    let (height, width) = mask.dim();
    if height == 0 || width == 0 {
        return Vec::new();
    }

    let (labels, count) = label_regions(mask);
    let mut seen = vec![false; count + 1];
    let mut contours = Vec::with_capacity(count);

    for y in 0..height {
        for x in 0..width {
            let label = labels[[y, x]] as usize;
            if label == 0 || seen[label] {
                continue;
            }
            seen[label] = true;
            contours.push(trace_external(&mask, x as i32, y as i32));
        }
    }

    contours
}

/// Trace an outer boundary with Moore-neighbour tracing.
///
/// `start` must be the first pixel of its region in raster order, so its
/// left, upper-left, upper and upper-right neighbours are all unset.
/// Tracing stops when the walk leaves `start` in the same direction as its
/// first move (Jacob's stopping criterion).
fn trace_external(mask: &ArrayView2<u8>, start_x: i32, start_y: i32) -> Vec<Point> {
    let (height, width) = mask.dim();
    let start = (start_x, start_y);
    let mut contour = vec![Point::new(start_x as f32, start_y as f32)];

    let mut current = start;
    // Left of the first raster pixel is always unset
    let mut backtrack = 4usize;
    let mut first_move: Option<usize> = None;
    let max_steps = width * height * 4 + 8;

    for _ in 0..max_steps {
        // Search clockwise starting just after the backtrack neighbour
        let next = (1..=8)
            .map(|k| (backtrack + k) % 8)
            .find(|&d| {
                let (dx, dy) = DIRECTIONS[d];
                is_set(mask, current.0 + dx, current.1 + dy)
            });

        let Some(dir) = next else {
            // Isolated pixel
            break;
        };

        if current == start {
            match first_move {
                None => first_move = Some(dir),
                Some(first) if first == dir => {
                    // Back at the start about to repeat the walk
                    if contour.len() > 1 {
                        contour.pop();
                    }
                    break;
                }
                Some(_) => {}
            }
        }

        let (dx, dy) = DIRECTIONS[dir];
        current = (current.0 + dx, current.1 + dy);
        // Last unset neighbour examined, expressed relative to the new pixel
        backtrack = if dir % 2 == 0 { (dir + 6) % 8 } else { (dir + 5) % 8 };
        contour.push(Point::new(current.0 as f32, current.1 as f32));
    }

    contour
}

/// Signed polygon area via the shoelace formula.
///
/// Positive for clockwise traversal in image coordinates (y downward).
pub fn signed_area(contour: &[Point]) -> f64 {
    let n = contour.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    for i in 0..n {
        let p = contour[i];
        let q = contour[(i + 1) % n];
        sum += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    sum * 0.5
}

/// Enclosed polygon area (absolute value of the shoelace area).
pub fn contour_area(contour: &[Point]) -> f64 {
    signed_area(contour).abs()
}
