// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Customization options applied to a design.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 2.0;
pub const MIN_ROTATION: f32 = -180.0;
pub const MAX_ROTATION: f32 = 180.0;

/// Named color schemes offered by the dashboard.
pub const COLOR_SCHEMES: [(&str, [&str; 3]); 4] = [
    ("Purple", ["#8B5CF6", "#EC4899", "#FFFFFF"]),
    ("Blue", ["#3B82F6", "#10B981", "#F3F4F6"]),
    ("Warm", ["#F59E0B", "#EF4444", "#111827"]),
    ("Cool", ["#6366F1", "#8B5CF6", "#F3F4F6"]),
];

/// Image theme; selects a fixed filter preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Theme {
    #[default]
    Modern,
    Retro,
    Minimalist,
    /// Identity filter. Unknown theme names also land here.
    #[serde(other)]
    Natural,
}

/// Text size multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum TextSize {
    Small,
    Large,
    /// Unknown size names also land here.
    #[default]
    #[serde(other)]
    Medium,
}

impl TextSize {
    pub fn multiplier(self) -> f32 {
        match self {
            TextSize::Small => 0.8,
            TextSize::Medium => 1.0,
            TextSize::Large => 1.2,
        }
    }
}

/// Content position as a percentage of the container, each axis in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }.clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            x: clamp_percent(self.x),
            y: clamp_percent(self.y),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

fn clamp_percent(v: f32) -> f32 {
    if v.is_nan() {
        50.0
    } else {
        v.clamp(0.0, 100.0)
    }
}

/// Clamp a scale factor to `[0.5, 2]`.
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        1.0
    } else {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }
}

/// Structured customization stored alongside a design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Customization {
    /// Three colors: overlay/hue key, accent, text.
    pub color_scheme: Vec<String>,
    pub font: String,
    pub theme: Theme,
    pub text: String,
    pub size: TextSize,
    pub layout: String,
    pub position: Position,
    pub scale: f32,
    /// Degrees, `[-180, 180]`.
    pub rotation: f32,
}

impl Default for Customization {
    fn default() -> Self {
        Self {
            color_scheme: COLOR_SCHEMES[0].1.iter().map(|c| c.to_string()).collect(),
            font: "sans-serif".to_string(),
            theme: Theme::Modern,
            text: String::new(),
            size: TextSize::Medium,
            layout: "standard".to_string(),
            position: Position::default(),
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

impl Customization {
    /// First scheme color (overlay and hue key).
    pub fn primary_color(&self) -> Option<&str> {
        self.color_scheme.first().map(String::as_str)
    }

    /// Third scheme color, used for text. White if the scheme is short.
    pub fn text_color(&self) -> &str {
        self.color_scheme
            .get(2)
            .map(String::as_str)
            .unwrap_or("#FFFFFF")
    }

    /// Bring every bounded field back into range.
    pub fn normalized(mut self) -> Self {
        self.position = self.position.clamped();
        self.scale = clamp_scale(self.scale);
        if self.rotation.is_nan() {
            self.rotation = 0.0;
        }
        self.rotation = self.rotation.clamp(MIN_ROTATION, MAX_ROTATION);
        if self.color_scheme.is_empty() {
            self.color_scheme = Customization::default().color_scheme;
        }
        self
    }
}

/// Parse `#RRGGBB` (or `#RGB`) into an RGB triple.
pub fn parse_hex_color(raw: &str) -> Option<[u8; 3]> {
    let hex = raw.trim().strip_prefix('#')?;
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let value = u32::from_str_radix(&expanded, 16).ok()?;
    Some([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}
