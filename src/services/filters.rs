// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-pixel color operations: CSS-style filter functions and the
//! "color" blend-mode overlay.
//!
//! All operations work on unpremultiplied sRGB values in `[0, 1]` and
//! clamp after every step, so a chain behaves like the equivalent CSS
//! `filter` list.

use crate::models::{Customization, Theme};
use image::RgbaImage;

/// One filter function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    Contrast(f32),
    Saturate(f32),
    Brightness(f32),
    Sepia(f32),
    /// Degrees
    HueRotate(f32),
}

/// Hue rotation keyed by the first color of a scheme.
const HUE_ROTATIONS: [(&str, f32); 4] = [
    ("#8B5CF6", 240.0),
    ("#3B82F6", 180.0),
    ("#F59E0B", 30.0),
    ("#6366F1", 200.0),
];

/// Filter preset for a theme.
pub fn theme_filters(theme: Theme) -> Vec<FilterOp> {
    match theme {
        Theme::Modern => vec![
            FilterOp::Contrast(1.2),
            FilterOp::Saturate(1.2),
            FilterOp::Brightness(1.1),
        ],
        Theme::Retro => vec![
            FilterOp::Sepia(0.5),
            FilterOp::Contrast(1.1),
            FilterOp::Brightness(0.9),
        ],
        Theme::Minimalist | Theme::Natural => Vec::new(),
    }
}

/// Hue rotation in degrees for a scheme's first color; unknown colors get none.
pub fn hue_rotation_for(color: &str) -> Option<f32> {
    let color = color.trim();
    HUE_ROTATIONS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(color))
        .map(|(_, deg)| *deg)
}

/// Full filter list for a customization: theme preset, then hue rotation.
pub fn filter_chain(customization: &Customization) -> Vec<FilterOp> {
    let mut ops = theme_filters(customization.theme);
    if let Some(deg) = customization.primary_color().and_then(hue_rotation_for) {
        ops.push(FilterOp::HueRotate(deg));
    }
    ops
}

/// Row-major 3x3 color matrix plus a constant offset per channel.
type ColorMatrix = ([[f32; 3]; 3], [f32; 3]);

fn matrix_for(op: FilterOp) -> ColorMatrix {
    match op {
        FilterOp::Brightness(a) => ([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]], [0.0; 3]),
        FilterOp::Contrast(a) => {
            let c = 0.5 - 0.5 * a;
            ([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]], [c, c, c])
        }
        FilterOp::Saturate(s) => (
            [
                [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
            ],
            [0.0; 3],
        ),
        FilterOp::Sepia(amount) => {
            let a = 1.0 - amount.clamp(0.0, 1.0);
            (
                [
                    [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a],
                    [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a],
                    [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a],
                ],
                [0.0; 3],
            )
        }
        FilterOp::HueRotate(deg) => {
            let (sin, cos) = deg.to_radians().sin_cos();
            (
                [
                    [
                        0.213 + cos * 0.787 - sin * 0.213,
                        0.715 - cos * 0.715 - sin * 0.715,
                        0.072 - cos * 0.072 + sin * 0.928,
                    ],
                    [
                        0.213 - cos * 0.213 + sin * 0.143,
                        0.715 + cos * 0.285 + sin * 0.140,
                        0.072 - cos * 0.072 - sin * 0.283,
                    ],
                    [
                        0.213 - cos * 0.213 - sin * 0.787,
                        0.715 - cos * 0.715 + sin * 0.715,
                        0.072 + cos * 0.928 + sin * 0.072,
                    ],
                ],
                [0.0; 3],
            )
        }
    }
}

fn apply_matrix((m, offset): &ColorMatrix, c: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (i, row) in m.iter().enumerate() {
        out[i] = (row[0] * c[0] + row[1] * c[1] + row[2] * c[2] + offset[i]).clamp(0.0, 1.0);
    }
    out
}

#[inline]
fn to_unit(px: &image::Rgba<u8>) -> [f32; 3] {
    [
        f32::from(px[0]) / 255.0,
        f32::from(px[1]) / 255.0,
        f32::from(px[2]) / 255.0,
    ]
}

#[inline]
fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Apply a filter chain in place. Alpha is left untouched.
pub fn apply_filters(img: &mut RgbaImage, ops: &[FilterOp]) {
    if ops.is_empty() {
        return;
    }
    let matrices: Vec<ColorMatrix> = ops.iter().copied().map(matrix_for).collect();

    for px in img.pixels_mut() {
        let mut c = to_unit(px);
        for m in &matrices {
            c = apply_matrix(m, c);
        }
        px[0] = to_byte(c[0]);
        px[1] = to_byte(c[1]);
        px[2] = to_byte(c[2]);
    }
}

// ─── Color Blend ─────────────────────────────────────────────

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    let mut out = c;
    if n < 0.0 {
        for v in out.iter_mut() {
            *v = l + (*v - l) * l / (l - n);
        }
    }
    if x > 1.0 {
        for v in out.iter_mut() {
            *v = l + (*v - l) * (1.0 - l) / (x - l);
        }
    }
    out
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color([c[0] + d, c[1] + d, c[2] + d])
}

/// Composite a flat color over the image with the "color" blend mode:
/// hue and saturation from `color`, luminosity from the image.
pub fn apply_color_overlay(img: &mut RgbaImage, color: [u8; 3], alpha: f32) {
    let alpha_s = alpha.clamp(0.0, 1.0);
    if alpha_s == 0.0 {
        return;
    }
    let cs = [
        f32::from(color[0]) / 255.0,
        f32::from(color[1]) / 255.0,
        f32::from(color[2]) / 255.0,
    ];

    for px in img.pixels_mut() {
        let alpha_b = f32::from(px[3]) / 255.0;
        let cb = to_unit(px);
        let blended = set_lum(cs, lum(cb));

        let alpha_o = alpha_s + alpha_b * (1.0 - alpha_s);
        let mut out = [0.0; 3];
        for i in 0..3 {
            let mixed = (1.0 - alpha_b) * cs[i] + alpha_b * blended[i];
            out[i] = (alpha_s * mixed + alpha_b * (1.0 - alpha_s) * cb[i]) / alpha_o;
        }

        px[0] = to_byte(out[0]);
        px[1] = to_byte(out[1]);
        px[2] = to_byte(out[2]);
        px[3] = to_byte(alpha_o);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(2, 2, Rgba(rgba))
    }

    #[test]
    fn test_theme_presets() {
        assert_eq!(theme_filters(Theme::Modern).len(), 3);
        assert_eq!(theme_filters(Theme::Retro)[0], FilterOp::Sepia(0.5));
        assert!(theme_filters(Theme::Natural).is_empty());
    }

    #[test]
    fn test_hue_lookup() {
        assert_eq!(hue_rotation_for("#8B5CF6"), Some(240.0));
        assert_eq!(hue_rotation_for("#8b5cf6"), Some(240.0));
        assert_eq!(hue_rotation_for("#6366F1"), Some(200.0));
        assert_eq!(hue_rotation_for("#123456"), None);
    }

    #[test]
    fn test_filter_chain_order() {
        let c = Customization {
            theme: Theme::Retro,
            color_scheme: vec!["#F59E0B".into(), "#EF4444".into(), "#111827".into()],
            ..Default::default()
        };
        let chain = filter_chain(&c);
        assert_eq!(chain.len(), 4);
        assert_eq!(chain[3], FilterOp::HueRotate(30.0));
    }

    #[test]
    fn test_brightness_and_contrast() {
        let mut img = solid([100, 100, 100, 255]);
        apply_filters(&mut img, &[FilterOp::Brightness(2.0)]);
        assert_eq!(img.get_pixel(0, 0).0, [200, 200, 200, 255]);

        let mut img = solid([128, 0, 255, 255]);
        apply_filters(&mut img, &[FilterOp::Contrast(2.0)]);
        let px = img.get_pixel(0, 0).0;
        assert_eq!(px[1], 0);
        assert_eq!(px[2], 255);
    }

    #[test]
    fn test_identity_ops_preserve_pixels() {
        let mut img = solid([12, 200, 77, 128]);
        apply_filters(
            &mut img,
            &[
                FilterOp::Saturate(1.0),
                FilterOp::Sepia(0.0),
                FilterOp::HueRotate(0.0),
                FilterOp::Contrast(1.0),
            ],
        );
        assert_eq!(img.get_pixel(1, 1).0, [12, 200, 77, 128]);
    }

    #[test]
    fn test_gray_is_stable_under_hue_rotate() {
        let mut img = solid([90, 90, 90, 255]);
        apply_filters(&mut img, &[FilterOp::HueRotate(240.0)]);
        let px = img.get_pixel(0, 0).0;
        for c in &px[..3] {
            assert!((i32::from(*c) - 90).abs() <= 1, "{:?}", px);
        }
    }

    #[test]
    fn test_full_color_overlay_keeps_luminosity() {
        let mut img = solid([128, 128, 128, 255]);
        apply_color_overlay(&mut img, [0x8B, 0x5C, 0xF6], 1.0);
        let px = img.get_pixel(0, 0).0;
        let l = lum([
            f32::from(px[0]) / 255.0,
            f32::from(px[1]) / 255.0,
            f32::from(px[2]) / 255.0,
        ]);
        assert!((l - 128.0 / 255.0).abs() < 0.01);
        assert!(px[2] > px[0], "expected a purple tint: {:?}", px);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_weak_overlay_is_subtle() {
        let mut img = solid([200, 50, 50, 255]);
        apply_color_overlay(&mut img, [0x3B, 0x82, 0xF6], 32.0 / 255.0);
        let px = img.get_pixel(0, 0).0;
        assert!((i32::from(px[0]) - 200).abs() < 30);
        assert_eq!(px[3], 255);
    }
}
