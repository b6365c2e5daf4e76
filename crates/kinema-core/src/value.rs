//! Plain value types flowing through timelines, plus their interpolation
//! primitives. No parsing or playback logic lives here.

use glam::Vec2;
use kurbo::BezPath;

/// Elementwise interpolation into a caller-owned scratch value.
///
/// `tween_into` writes the blend of `start` and `end` at eased time `t` into
/// `out`, reusing its storage where possible. Timelines call this once per
/// evaluated frame; the scratch value is only valid until the next call.
pub trait Tween: Clone + Default {
    fn tween_into(start: &Self, end: &Self, t: f32, out: &mut Self);
}

impl Tween for f32 {
    fn tween_into(start: &Self, end: &Self, t: f32, out: &mut Self) {
        *out = start + (end - start) * t;
    }
}

impl Tween for i32 {
    fn tween_into(start: &Self, end: &Self, t: f32, out: &mut Self) {
        *out = start + ((end - start) as f32 * t).round() as i32;
    }
}

impl Tween for Vec2 {
    fn tween_into(start: &Self, end: &Self, t: f32, out: &mut Self) {
        *out = start.lerp(*end, t);
    }
}

/// Percent scale pair (100.0 = unscaled).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    pub const ONE: Scale = Scale { x: 100.0, y: 100.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Scale { x, y }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::ONE
    }
}

impl Tween for Scale {
    fn tween_into(start: &Self, end: &Self, t: f32, out: &mut Self) {
        out.x = start.x + (end.x - start.x) * t;
        out.y = start.y + (end.y - start.y) * t;
    }
}

/// 8-bit RGBA color. Blending runs through linear light so that mid-blend
/// colors do not darken the way naive sRGB channel lerp does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Builds a color from document channel components. Components are
    /// normally 0..=1 floats; legacy exports store 0..=255.
    pub fn from_components(components: &[f32]) -> Self {
        let scale = if components.iter().any(|c| *c > 1.0) {
            1.0
        } else {
            255.0
        };
        let channel = |i: usize, default: f32| -> u8 {
            let c = components.get(i).copied().unwrap_or(default);
            (c * scale).round().clamp(0.0, 255.0) as u8
        };
        Color {
            r: channel(0, 0.0),
            g: channel(1, 0.0),
            b: channel(2, 0.0),
            a: channel(3, if scale == 1.0 { 255.0 } else { 1.0 }),
        }
    }

    /// Parses `#rrggbb` or `#aarrggbb` (solid layer colors).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        let value = u32::from_str_radix(digits, 16).ok()?;
        match digits.len() {
            6 => Some(Color {
                r: (value >> 16) as u8,
                g: (value >> 8) as u8,
                b: value as u8,
                a: 255,
            }),
            8 => Some(Color {
                r: (value >> 16) as u8,
                g: (value >> 8) as u8,
                b: value as u8,
                a: (value >> 24) as u8,
            }),
            _ => None,
        }
    }

    /// Gamma-correct blend: sRGB -> linear per channel, lerp, back to sRGB.
    /// Alpha is blended linearly.
    pub fn gamma_blend(start: Color, end: Color, t: f32) -> Color {
        if t <= 0.0 {
            return start;
        }
        if t >= 1.0 {
            return end;
        }
        let blend = |a: u8, b: u8| -> u8 {
            let la = srgb_to_linear(a as f32 / 255.0);
            let lb = srgb_to_linear(b as f32 / 255.0);
            (linear_to_srgb(la + (lb - la) * t) * 255.0).round().clamp(0.0, 255.0) as u8
        };
        let alpha = start.a as f32 + (end.a as f32 - start.a as f32) * t;
        Color {
            r: blend(start.r, end.r),
            g: blend(start.g, end.g),
            b: blend(start.b, end.b),
            a: alpha.round().clamp(0.0, 255.0) as u8,
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

impl Tween for Color {
    fn tween_into(start: &Self, end: &Self, t: f32, out: &mut Self) {
        *out = Color::gamma_blend(*start, *end, t);
    }
}

/// Gradient stops as parallel position/color arrays. Two gradients can only
/// be blended when their stop counts match; the factory fixes the count once
/// from the first keyframe.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GradientColor {
    pub positions: Vec<f32>,
    pub colors: Vec<Color>,
}

impl GradientColor {
    pub fn new(positions: Vec<f32>, colors: Vec<Color>) -> Self {
        debug_assert_eq!(positions.len(), colors.len());
        GradientColor { positions, colors }
    }

    pub fn size(&self) -> usize {
        self.colors.len()
    }
}

impl Tween for GradientColor {
    fn tween_into(start: &Self, end: &Self, t: f32, out: &mut Self) {
        if start.size() != end.size() {
            tracing::warn!(
                from = start.size(),
                to = end.size(),
                "gradient stop counts differ; holding start gradient"
            );
            out.clone_from(start);
            return;
        }
        let n = start.size();
        out.positions.resize(n, 0.0);
        out.colors.resize(n, Color::TRANSPARENT);
        for i in 0..n {
            out.positions[i] = start.positions[i] + (end.positions[i] - start.positions[i]) * t;
            out.colors[i] = Color::gamma_blend(start.colors[i], end.colors[i], t);
        }
    }
}

/// One cubic segment: two absolute control points and the end vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CubicCurve {
    pub cp1: Vec2,
    pub cp2: Vec2,
    pub vertex: Vec2,
}

impl CubicCurve {
    pub fn new(cp1: Vec2, cp2: Vec2, vertex: Vec2) -> Self {
        CubicCurve { cp1, cp2, vertex }
    }
}

/// A bezier contour in renderable form: absolute initial point plus cubic
/// segments. Morphing requires equal curve counts (see `morph`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeData {
    pub initial_point: Vec2,
    pub closed: bool,
    pub curves: Vec<CubicCurve>,
}

impl ShapeData {
    /// Converts to the backend path representation.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to((self.initial_point.x as f64, self.initial_point.y as f64));
        for curve in &self.curves {
            path.curve_to(
                (curve.cp1.x as f64, curve.cp1.y as f64),
                (curve.cp2.x as f64, curve.cp2.y as f64),
                (curve.vertex.x as f64, curve.vertex.y as f64),
            );
        }
        if self.closed {
            path.close_path();
        }
        path
    }
}

impl Tween for ShapeData {
    fn tween_into(start: &Self, end: &Self, t: f32, out: &mut Self) {
        if let Err(err) = crate::morph::morph_into(start, end, t, out) {
            tracing::warn!(%err, "skipping shape morph");
            out.clone_from(start);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justification {
    #[default]
    Left,
    Right,
    Center,
}

/// A rich-text paragraph record. Text never tweens character-by-character;
/// its timeline is discrete.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentText {
    pub text: String,
    pub font_name: String,
    pub size: f32,
    pub justification: Justification,
    pub tracking: f32,
    pub line_height: f32,
    pub baseline_shift: f32,
    pub fill_color: Color,
    pub stroke_color: Option<Color>,
    pub stroke_width: f32,
    pub stroke_over_fill: bool,
}

impl Tween for DocumentText {
    fn tween_into(start: &Self, _end: &Self, _t: f32, out: &mut Self) {
        out.clone_from(start);
    }
}
