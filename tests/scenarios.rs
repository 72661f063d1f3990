//! End-to-end rendering scenarios.

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array3};

use nailstag::filters::color_science::{delinearize, linearize};
use nailstag::layer_effects::layers::specular_layer;
use nailstag::{analyze, CompositorConfig, Lighting, Material, MaterialPreset, PolishCompositor};

/// Filled ellipse with semi-axis `a` along `angle_deg` and `b` perpendicular to it.
fn ellipse_mask(h: usize, w: usize, center: (f32, f32), a: f32, b: f32, angle_deg: f32) -> Array2<u8> {
    let (s, c) = angle_deg.to_radians().sin_cos();
    Array2::from_shape_fn((h, w), |(y, x)| {
        let dx = x as f32 - center.0;
        let dy = y as f32 - center.1;
        let u = dx * c + dy * s;
        let v = -dx * s + dy * c;
        ((u / a).powi(2) + (v / b).powi(2) <= 1.0) as u8
    })
}

fn textured_image(h: usize, w: usize) -> Array3<u8> {
    Array3::from_shape_fn((h, w, 3), |(y, x, c)| ((x * 3 + y * 5 + c * 40) % 256) as u8)
}

#[test]
fn rotated_ellipse_orientation() {
    let mask = ellipse_mask(480, 640, (320.0, 240.0), 100.0, 200.0, 45.0);
    let geometry = analyze(mask.view(), 100.0).unwrap().expect("ellipse has geometry");
    assert!(
        (geometry.orientation_angle() - 45.0).abs() <= 5.0,
        "angle {}",
        geometry.orientation_angle()
    );
    assert!(geometry.length() > geometry.width());
}

#[test]
fn valid_masks_have_sane_geometry() {
    let masks = [
        ellipse_mask(120, 160, (80.0, 60.0), 25.0, 40.0, 0.0),
        ellipse_mask(120, 160, (50.0, 70.0), 15.0, 30.0, 70.0),
        ellipse_mask(120, 160, (150.0, 110.0), 20.0, 20.0, 0.0),
        Array2::from_shape_fn((120, 160), |(y, x)| (x >= 20 && x < 60 && y >= 10 && y < 100) as u8),
    ];
    for mask in &masks {
        let geometry = analyze(mask.view(), 100.0).unwrap().expect("large enough");
        assert!(geometry.bounding_box().contains(geometry.center()));
        assert!(geometry.curvature_field().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!((0.0..180.0).contains(&geometry.orientation_angle()));
    }
}

#[test]
fn small_and_empty_masks_have_no_geometry() {
    let empty = Array2::<u8>::zeros((64, 64));
    assert!(analyze(empty.view(), 100.0).unwrap().is_none());

    let tiny = ellipse_mask(64, 64, (32.0, 32.0), 4.0, 4.0, 0.0);
    assert!(analyze(tiny.view(), 100.0).unwrap().is_none());
}

#[test]
fn srgb_round_trip_over_color_grid() {
    for r in 0..=10 {
        for g in 0..=10 {
            for b in 0..=10 {
                let color = [r as f32 / 10.0, g as f32 / 10.0, b as f32 / 10.0];
                let back = delinearize(linearize(color));
                for c in 0..3 {
                    assert_abs_diff_eq!(color[c], back[c], epsilon = 1e-3);
                }
            }
        }
    }
}

#[test]
fn rendering_is_deterministic() {
    let mask = ellipse_mask(120, 160, (80.0, 60.0), 25.0, 40.0, 30.0);
    let geometry = analyze(mask.view(), 100.0).unwrap().unwrap();
    let image = textured_image(120, 160);

    for config in [
        CompositorConfig::default(),
        CompositorConfig {
            seed_glitter_from_mask: true,
            ..CompositorConfig::default()
        },
    ] {
        let compositor = PolishCompositor::new(config).unwrap();
        for preset in [MaterialPreset::GlitterPink, MaterialPreset::Holographic, MaterialPreset::ChromeMirror] {
            let material = preset.material();
            let first = compositor.render_region(image.view(), &geometry, &material).unwrap();
            let second = compositor.render_region(image.view(), &geometry, &material).unwrap();
            assert_eq!(first, second, "{}", preset.name());
        }
    }
}

#[test]
fn zero_opacity_leaves_image_unchanged() {
    let mask = ellipse_mask(120, 160, (80.0, 60.0), 25.0, 40.0, 10.0);
    let geometry = analyze(mask.view(), 100.0).unwrap().unwrap();
    let image = textured_image(120, 160);
    let material = MaterialPreset::GlitterSilver.material().with_opacity(0.0);

    let out = PolishCompositor::default()
        .render_region(image.view(), &geometry, &material)
        .unwrap();
    assert_eq!(out, image);
}

#[test]
fn opaque_flat_material_reproduces_base_color() {
    let mask = ellipse_mask(240, 320, (160.0, 120.0), 60.0, 90.0, 15.0);
    let geometry = analyze(mask.view(), 100.0).unwrap().unwrap();
    let image = Array3::<u8>::zeros((240, 320, 3));
    let base = [0.3, 0.6, 0.9];
    let material = Material::new(base)
        .with_glossiness(0.0)
        .with_opacity(1.0)
        .with_edge(0.0, 0.15)
        .with_ambient_occlusion(0.0);

    let out = PolishCompositor::default()
        .render_region(image.view(), &geometry, &material)
        .unwrap();

    // Deepest interior point: full curvature, alpha saturated
    let curvature = geometry.curvature_field();
    let (mut best, mut best_value) = ((0, 0), -1.0f32);
    for ((y, x), &v) in curvature.indexed_iter() {
        if v > best_value {
            best = (y, x);
            best_value = v;
        }
    }
    for c in 0..3 {
        let expected = (base[c] * 255.0).round() as i32;
        let actual = out[[best.0, best.1, c]] as i32;
        assert!((expected - actual).abs() <= 1, "channel {}: {} vs {}", c, actual, expected);
    }

    // Nothing outside the feathered band changes
    assert_eq!(out[[0, 0, 0]], 0);
}

#[test]
fn glossiness_never_lowers_specular_at_highlight_anchor() {
    let mask = ellipse_mask(160, 200, (100.0, 80.0), 30.0, 55.0, 20.0);
    let geometry = analyze(mask.view(), 100.0).unwrap().unwrap();
    let anchor = geometry.highlight_anchor();
    let (ax, ay) = (anchor.x.round() as usize, anchor.y.round() as usize);
    assert_eq!(geometry.mask()[[ay, ax]], 1, "anchor ({}, {}) outside the region", ax, ay);

    // Light mirrored about the anchor normal, so the halfway vector is that normal
    let normals = geometry.normal_field();
    let n = [normals[[ay, ax, 0]], normals[[ay, ax, 1]], normals[[ay, ax, 2]]];
    let lighting = Lighting::new(
        [2.0 * n[2] * n[0], 2.0 * n[2] * n[1], 2.0 * n[2] * n[2] - 1.0],
        [1.0, 1.0, 1.0],
        0.3,
    )
    .unwrap();

    let mut previous = 0.0f32;
    for step in 0..=20 {
        let glossiness = step as f32 / 20.0;
        let material = Material::new([0.6, 0.2, 0.3]).with_glossiness(glossiness);
        let layer = specular_layer(normals.view(), geometry.mask(), &material, &lighting);
        let current = layer[[ay, ax, 0]];
        assert!(
            current + 1e-4 >= previous,
            "glossiness {} dropped anchor specular {} -> {}",
            glossiness,
            previous,
            current
        );
        previous = current;
    }
    assert!(previous > 0.9, "anchor specular {}", previous);
}

#[test]
fn anchor_specular_follows_blinn_phong_under_default_light() {
    let mask = ellipse_mask(160, 200, (100.0, 80.0), 30.0, 55.0, 20.0);
    let geometry = analyze(mask.view(), 100.0).unwrap().unwrap();
    let anchor = geometry.highlight_anchor();
    let (ax, ay) = (anchor.x.round() as usize, anchor.y.round() as usize);
    let lighting = Lighting::default();
    let h = lighting.halfway();
    let normals = geometry.normal_field();
    let n_dot_h = (0..3).map(|c| normals[[ay, ax, c]] * h[c]).sum::<f32>().clamp(0.0, 1.0);

    for glossiness in [0.05, 0.1, 0.5, 0.9] {
        let material = Material::new([0.6, 0.2, 0.3])
            .with_glossiness(glossiness)
            .with_specular(1.2, [1.0, 1.0, 1.0]);
        let layer = specular_layer(normals.view(), geometry.mask(), &material, &lighting);
        let expected = if glossiness < 0.1 {
            0.0
        } else {
            1.2 * n_dot_h.powf(10.0 + 200.0 * glossiness)
        };
        assert_abs_diff_eq!(layer[[ay, ax, 1]], expected, epsilon = 1e-6);
    }
}

#[test]
fn chrome_is_brighter_than_matte() {
    let mask = ellipse_mask(160, 200, (100.0, 80.0), 30.0, 55.0, 20.0);
    let geometry = analyze(mask.view(), 100.0).unwrap().unwrap();
    let lighting = PolishCompositor::default().lighting().clone();

    let mean_specular = |material: &Material| {
        let layer = specular_layer(geometry.normal_field().view(), geometry.mask(), material, &lighting);
        layer.iter().sum::<f32>() / layer.len() as f32
    };

    let matte = mean_specular(&MaterialPreset::MatteBlack.material());
    let chrome = mean_specular(&MaterialPreset::ChromeMirror.material());
    assert!(chrome > matte * 1.2, "chrome {} vs matte {}", chrome, matte);
}

#[test]
fn multi_region_matches_independent_renders() {
    let left = ellipse_mask(120, 240, (60.0, 60.0), 25.0, 40.0, 0.0);
    let right = ellipse_mask(120, 240, (180.0, 60.0), 25.0, 40.0, 30.0);
    let left_geometry = analyze(left.view(), 100.0).unwrap().unwrap();
    let right_geometry = analyze(right.view(), 100.0).unwrap().unwrap();
    let left_material = MaterialPreset::GlitterPink.material();
    let right_material = MaterialPreset::MetallicSilver.material();

    let compositor = PolishCompositor::default();
    let image = textured_image(120, 240);

    let combined = compositor
        .render_regions(
            image.view(),
            [(&left_geometry, &left_material), (&right_geometry, &right_material)],
        )
        .unwrap();
    let only_left = compositor.render_region(image.view(), &left_geometry, &left_material).unwrap();
    let only_right = compositor.render_region(image.view(), &right_geometry, &right_material).unwrap();

    let expected = Array3::from_shape_fn(image.dim(), |(y, x, c)| {
        if only_left[[y, x, c]] != image[[y, x, c]] {
            only_left[[y, x, c]]
        } else {
            only_right[[y, x, c]]
        }
    });
    assert_eq!(combined, expected);

    let sequential = compositor.render_region(only_left.view(), &right_geometry, &right_material).unwrap();
    assert_eq!(combined, sequential);
}
