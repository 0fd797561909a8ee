//! Parameter sets - one complete visual state
//!
//! A [`ParameterSet`] is a fixed, typed record. Mappings and the renderer
//! address its fields by name through [`ParameterName`].

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Linear interpolation, exact at `t == 0` and `t == 1`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha
    pub a: u8,
}

impl Rgba {
    /// Create a color from channels
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from a `0xRRGGBB` value
    pub const fn from_rgb_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
            a: 255,
        }
    }

    /// Channels as `[r, g, b, a]`
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Per-channel interpolation. Each channel is rounded, then clamped.
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        // Clamp after rounding: rounding alone can land outside 0..=255
        let channel = |a: u8, b: u8| lerp(a as f32, b as f32, t).round().clamp(0.0, 255.0) as u8;
        Rgba {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
            a: channel(self.a, other.a),
        }
    }
}

/// Names of every [`ParameterSet`] field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParameterName {
    /// Global animation speed
    TimeSpeed,
    /// Speed of the spin animation
    SpinTimeSpeed,
    /// Main color
    MainColor,
    /// Accent color
    AccentColor,
    /// Background color
    BackgroundColor,
    /// Color contrast
    Contrast,
    /// Spin amount
    SpinAmount,
    /// Horizontal parallax offset
    ParallaxX,
    /// Vertical parallax offset
    ParallaxY,
    /// Zoom scale
    ZoomScale,
    /// First saturation amount
    SaturationAmount,
    /// Second saturation amount
    SaturationAmount2,
    /// Pixelation size
    PixelSize,
    /// Spin easing
    SpinEase,
    /// Pattern loop count
    LoopCount,
}

impl ParameterName {
    /// Every parameter, in declaration order
    pub const ALL: [ParameterName; 15] = [
        ParameterName::TimeSpeed,
        ParameterName::SpinTimeSpeed,
        ParameterName::MainColor,
        ParameterName::AccentColor,
        ParameterName::BackgroundColor,
        ParameterName::Contrast,
        ParameterName::SpinAmount,
        ParameterName::ParallaxX,
        ParameterName::ParallaxY,
        ParameterName::ZoomScale,
        ParameterName::SaturationAmount,
        ParameterName::SaturationAmount2,
        ParameterName::PixelSize,
        ParameterName::SpinEase,
        ParameterName::LoopCount,
    ];

    /// Stable key used by renderers and persisted mappings
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterName::TimeSpeed => "time_speed",
            ParameterName::SpinTimeSpeed => "spin_time_speed",
            ParameterName::MainColor => "main_color",
            ParameterName::AccentColor => "accent_color",
            ParameterName::BackgroundColor => "background_color",
            ParameterName::Contrast => "contrast",
            ParameterName::SpinAmount => "spin_amount",
            ParameterName::ParallaxX => "parallax_x",
            ParameterName::ParallaxY => "parallax_y",
            ParameterName::ZoomScale => "zoom_scale",
            ParameterName::SaturationAmount => "saturation_amount",
            ParameterName::SaturationAmount2 => "saturation_amount_2",
            ParameterName::PixelSize => "pixel_size",
            ParameterName::SpinEase => "spin_ease",
            ParameterName::LoopCount => "loop_count",
        }
    }

    /// True for float fields, false for colors
    pub fn is_scalar(self) -> bool {
        !matches!(
            self,
            ParameterName::MainColor | ParameterName::AccentColor | ParameterName::BackgroundColor
        )
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for ParameterName {
    type Err = ConfigError;

    /// Accepts `zoom_scale`, `ZoomScale`, `zoom-scale` and similar spellings
    fn from_str(s: &str) -> Result<Self> {
        let key = normalize_key(s);
        ParameterName::ALL
            .into_iter()
            .find(|name| normalize_key(name.as_str()) == key)
            .ok_or_else(|| ConfigError::UnknownParameter(s.to_string()))
    }
}

impl TryFrom<String> for ParameterName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ParameterName> for String {
    fn from(name: ParameterName) -> Self {
        name.as_str().to_string()
    }
}

/// Value of one named field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    /// Float field
    Scalar(f32),
    /// Color field
    Color(Rgba),
}

/// One complete, self-consistent visual configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Global animation speed
    pub time_speed: f32,
    /// Speed of the spin animation
    pub spin_time_speed: f32,
    /// Main color
    pub main_color: Rgba,
    /// Accent color
    pub accent_color: Rgba,
    /// Background color
    pub background_color: Rgba,
    /// Color contrast
    pub contrast: f32,
    /// Spin amount
    pub spin_amount: f32,
    /// Horizontal parallax offset
    pub parallax_x: f32,
    /// Vertical parallax offset
    pub parallax_y: f32,
    /// Zoom scale
    pub zoom_scale: f32,
    /// First saturation amount
    pub saturation_amount: f32,
    /// Second saturation amount
    pub saturation_amount_2: f32,
    /// Pixelation size
    pub pixel_size: f32,
    /// Spin easing
    pub spin_ease: f32,
    /// Pattern loop count
    pub loop_count: f32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            time_speed: 1.0,
            spin_time_speed: 1.0,
            main_color: Rgba::from_rgb_hex(0xDE443B),
            accent_color: Rgba::from_rgb_hex(0x006BB4),
            background_color: Rgba::from_rgb_hex(0x162325),
            contrast: 3.5,
            spin_amount: 0.25,
            parallax_x: 0.0,
            parallax_y: 0.0,
            zoom_scale: 1.0,
            saturation_amount: 0.0,
            saturation_amount_2: 0.0,
            pixel_size: 745.0,
            spin_ease: 1.0,
            loop_count: 5.0,
        }
    }
}

impl ParameterSet {
    fn scalar_mut(&mut self, name: ParameterName) -> Option<&mut f32> {
        Some(match name {
            ParameterName::TimeSpeed => &mut self.time_speed,
            ParameterName::SpinTimeSpeed => &mut self.spin_time_speed,
            ParameterName::Contrast => &mut self.contrast,
            ParameterName::SpinAmount => &mut self.spin_amount,
            ParameterName::ParallaxX => &mut self.parallax_x,
            ParameterName::ParallaxY => &mut self.parallax_y,
            ParameterName::ZoomScale => &mut self.zoom_scale,
            ParameterName::SaturationAmount => &mut self.saturation_amount,
            ParameterName::SaturationAmount2 => &mut self.saturation_amount_2,
            ParameterName::PixelSize => &mut self.pixel_size,
            ParameterName::SpinEase => &mut self.spin_ease,
            ParameterName::LoopCount => &mut self.loop_count,
            ParameterName::MainColor
            | ParameterName::AccentColor
            | ParameterName::BackgroundColor => return None,
        })
    }

    fn color_mut(&mut self, name: ParameterName) -> Option<&mut Rgba> {
        match name {
            ParameterName::MainColor => Some(&mut self.main_color),
            ParameterName::AccentColor => Some(&mut self.accent_color),
            ParameterName::BackgroundColor => Some(&mut self.background_color),
            _ => None,
        }
    }

    /// Value of a named field
    pub fn get(&self, name: ParameterName) -> ParameterValue {
        use ParameterValue::{Color, Scalar};
        match name {
            ParameterName::TimeSpeed => Scalar(self.time_speed),
            ParameterName::SpinTimeSpeed => Scalar(self.spin_time_speed),
            ParameterName::MainColor => Color(self.main_color),
            ParameterName::AccentColor => Color(self.accent_color),
            ParameterName::BackgroundColor => Color(self.background_color),
            ParameterName::Contrast => Scalar(self.contrast),
            ParameterName::SpinAmount => Scalar(self.spin_amount),
            ParameterName::ParallaxX => Scalar(self.parallax_x),
            ParameterName::ParallaxY => Scalar(self.parallax_y),
            ParameterName::ZoomScale => Scalar(self.zoom_scale),
            ParameterName::SaturationAmount => Scalar(self.saturation_amount),
            ParameterName::SaturationAmount2 => Scalar(self.saturation_amount_2),
            ParameterName::PixelSize => Scalar(self.pixel_size),
            ParameterName::SpinEase => Scalar(self.spin_ease),
            ParameterName::LoopCount => Scalar(self.loop_count),
        }
    }

    /// Value of a scalar field, `None` for colors
    pub fn scalar(&self, name: ParameterName) -> Option<f32> {
        match self.get(name) {
            ParameterValue::Scalar(value) => Some(value),
            ParameterValue::Color(_) => None,
        }
    }

    /// Set a scalar field
    pub fn set_scalar(&mut self, name: ParameterName, value: f32) -> Result<()> {
        let slot = self
            .scalar_mut(name)
            .ok_or_else(|| ConfigError::NotScalar(name.to_string()))?;
        *slot = value;
        Ok(())
    }

    /// Set a color field. Returns `false` if `name` is a scalar.
    pub fn set_color(&mut self, name: ParameterName, color: Rgba) -> bool {
        match self.color_mut(name) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    /// Overwrite scalar fields from a name-keyed map. Color names are skipped.
    pub fn apply(&mut self, values: &BTreeMap<ParameterName, f32>) {
        for (name, value) in values {
            if let Some(slot) = self.scalar_mut(*name) {
                *slot = *value;
            }
        }
    }

    /// Every field with its name, in declaration order
    pub fn named_values(&self) -> Vec<(ParameterName, ParameterValue)> {
        ParameterName::ALL
            .into_iter()
            .map(|name| (name, self.get(name)))
            .collect()
    }

    /// Interpolate every field toward `other` at `t`
    pub fn lerp(&self, other: &ParameterSet, t: f32) -> ParameterSet {
        ParameterSet {
            time_speed: lerp(self.time_speed, other.time_speed, t),
            spin_time_speed: lerp(self.spin_time_speed, other.spin_time_speed, t),
            main_color: self.main_color.lerp(other.main_color, t),
            accent_color: self.accent_color.lerp(other.accent_color, t),
            background_color: self.background_color.lerp(other.background_color, t),
            contrast: lerp(self.contrast, other.contrast, t),
            spin_amount: lerp(self.spin_amount, other.spin_amount, t),
            parallax_x: lerp(self.parallax_x, other.parallax_x, t),
            parallax_y: lerp(self.parallax_y, other.parallax_y, t),
            zoom_scale: lerp(self.zoom_scale, other.zoom_scale, t),
            saturation_amount: lerp(self.saturation_amount, other.saturation_amount, t),
            saturation_amount_2: lerp(self.saturation_amount_2, other.saturation_amount_2, t),
            pixel_size: lerp(self.pixel_size, other.pixel_size, t),
            spin_ease: lerp(self.spin_ease, other.spin_ease, t),
            loop_count: lerp(self.loop_count, other.loop_count, t),
        }
    }
}
