//! Tests for heatmap coloring.

use renderer::{update_rgba, Color, HeatmapSettings, HsvLut, LUT_SIZE};
use test_utils::{create_grid_with_nans, create_ramp_grid};

// ============================================================================
// LUT construction
// ============================================================================

#[test]
fn test_lut_endpoints() {
    let lut = HsvLut::new(HeatmapSettings {
        alpha: 1.0,
        saturation: 1.0,
        value: 1.0,
    });

    // Highest index is hue 0: pure red.
    assert_eq!(lut.entry(LUT_SIZE - 1), Color::new(255, 0, 0, 255));

    // Lowest index is hue 255: blue with some red.
    let low = lut.entry(0);
    assert_eq!(low.g, 0);
    assert_eq!(low.b, 255);
    assert!(low.r > 0 && low.r < 128);
}

#[test]
fn test_lut_alpha_applies_to_every_entry() {
    let lut = HsvLut::new(HeatmapSettings {
        alpha: 0.5,
        ..Default::default()
    });
    for i in 0..LUT_SIZE {
        assert_eq!(lut.entry(i).a, 127);
    }
}

#[test]
fn test_lut_zero_saturation_is_gray() {
    let lut = HsvLut::new(HeatmapSettings {
        alpha: 1.0,
        saturation: 0.0,
        value: 0.5,
    });
    for i in [0, 100, 255] {
        let c = lut.entry(i);
        assert_eq!(c.r, c.g);
        assert_eq!(c.g, c.b);
    }
}

#[test]
fn test_lut_rebuild_is_idempotent() {
    let a = HeatmapSettings {
        alpha: 0.8,
        saturation: 0.7,
        value: 0.9,
    };
    let b = HeatmapSettings { alpha: 0.2, ..a };

    let fresh = HsvLut::new(a);
    let mut lut = HsvLut::new(a);
    assert!(lut.validate(b));
    assert!(lut.validate(a));
    assert!(!lut.validate(a));

    for i in 0..LUT_SIZE {
        assert_eq!(lut.entry(i), fresh.entry(i));
    }
    assert_eq!(lut.settings(), Some(a));
}

// ============================================================================
// update_rgba
// ============================================================================

#[test]
fn test_nan_is_transparent() {
    let lut = HsvLut::new(HeatmapSettings::default());
    let elevation = create_grid_with_nans(4, 4, 100.0, &[(1, 1), (3, 2)]);
    let mut rgba = vec![9u8; 64];

    update_rgba(&lut, &elevation, 0.0, 200.0, &mut rgba);

    assert_eq!(&rgba[5 * 4..][..4], &[0, 0, 0, 0]);
    assert_eq!(&rgba[11 * 4..][..4], &[0, 0, 0, 0]);
    assert_eq!(&rgba[0..4], &lut.entry(127).to_array());
}

#[test]
fn test_min_and_max_hit_lut_ends() {
    let lut = HsvLut::new(HeatmapSettings::default());
    let elevation = [10.0, 20.0, -5.0, 1e6];
    let mut rgba = vec![0u8; 16];

    update_rgba(&lut, &elevation, 10.0, 20.0, &mut rgba);

    assert_eq!(&rgba[0..4], &lut.entry(0).to_array());
    assert_eq!(&rgba[4..8], &lut.entry(255).to_array());
    assert_eq!(&rgba[8..12], &lut.entry(0).to_array());
    assert_eq!(&rgba[12..16], &lut.entry(255).to_array());
}

#[test]
fn test_ramp_is_monotonic_in_hue() {
    let lut = HsvLut::new(HeatmapSettings {
        alpha: 1.0,
        saturation: 1.0,
        value: 1.0,
    });
    // 6000 pixels span two parallel work items.
    let (w, h) = (300, 20);
    let elevation = create_ramp_grid(w, h, 0.0, 1.0);
    let mut rgba = vec![0u8; w * h * 4];

    update_rgba(&lut, &elevation, 0.0, (w - 1) as f32, &mut rgba);

    // Every pixel matches the LUT entry of its column.
    for y in 0..h {
        for x in 0..w {
            let idx = (x as f32 / (w - 1) as f32 * 255.0) as usize;
            assert_eq!(
                &rgba[(y * w + x) * 4..][..4],
                &lut.entry(idx).to_array(),
                "pixel ({}, {})",
                x,
                y
            );
        }
    }
}

#[test]
fn test_short_rgba_buffer_is_not_overrun() {
    let lut = HsvLut::new(HeatmapSettings::default());
    let elevation = vec![1.0; 10];
    let mut rgba = vec![0u8; 8];
    update_rgba(&lut, &elevation, 0.0, 2.0, &mut rgba);
    assert_eq!(&rgba[0..4], &lut.entry(127).to_array());
}
