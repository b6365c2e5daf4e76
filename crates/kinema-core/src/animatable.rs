//! Factories compiling raw document properties into typed animatable values.
//!
//! All of the keyframe fixups live here: end-frame propagation, trailing
//! time-only records, hold flags, easing control point clamping, and the
//! per-type value conversions (color components, gradient flat arrays,
//! bezier contours, text documents).

use crate::ease::{shared_bezier, Interpolator};
use crate::keyframe::{AnimatableValue, FrameRange, Keyframe};
use crate::value::{
    Color, CubicCurve, DocumentText, GradientColor, Justification, Scale, ShapeData, Tween,
};
use glam::Vec2;
use kinema_data::model::{
    GradientStops, PathData, PositionProperty, Property, RawKeyframe, RawValue, TextDocumentRaw,
};

/// Shared state for compiling the properties of one composition: the frame
/// range progress is normalized against, the spatial scale applied to
/// coordinates, and the warning sink.
pub struct PropertyContext {
    pub range: FrameRange,
    pub scale: f32,
    warnings: Vec<String>,
}

impl PropertyContext {
    pub fn new(range: FrameRange, scale: f32) -> Self {
        PropertyContext {
            range,
            scale,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// A transform position channel: unified, or authored as two independent
/// scalar channels ("split dimensions").
#[derive(Debug, Clone)]
pub enum AnimatablePosition {
    Unified(AnimatableValue<Vec2>),
    Split {
        x: AnimatableValue<f32>,
        y: AnimatableValue<f32>,
    },
}

impl Default for AnimatablePosition {
    fn default() -> Self {
        AnimatablePosition::Unified(AnimatableValue::Static(Vec2::ZERO))
    }
}

pub fn float(ctx: &mut PropertyContext, prop: &Property<f32>, default: f32) -> AnimatableValue<f32> {
    build(ctx, prop, default, |v: &f32| *v)
}

/// A float in document coordinates (stroke widths, corner radii).
pub fn scaled_float(
    ctx: &mut PropertyContext,
    prop: &Property<f32>,
    default: f32,
) -> AnimatableValue<f32> {
    let scale = ctx.scale;
    build(ctx, prop, default * scale, |v: &f32| *v * scale)
}

/// An integer channel (opacity); authored floats round to the nearest step.
pub fn integer(
    ctx: &mut PropertyContext,
    prop: &Property<f32>,
    default: i32,
) -> AnimatableValue<i32> {
    build(ctx, prop, default, |v: &f32| v.round() as i32)
}

pub fn point(ctx: &mut PropertyContext, prop: &Property<Vec<f32>>) -> AnimatableValue<Vec2> {
    let scale = ctx.scale;
    build(ctx, prop, Vec2::ZERO, |v: &Vec<f32>| from_slice(v) * scale)
}

pub fn position(ctx: &mut PropertyContext, prop: &PositionProperty) -> AnimatablePosition {
    match prop {
        PositionProperty::Split { x, y } => AnimatablePosition::Split {
            x: scaled_float(ctx, x, 0.0),
            y: scaled_float(ctx, y, 0.0),
        },
        PositionProperty::Unified(p) => AnimatablePosition::Unified(point(ctx, p)),
    }
}

/// Percent scale pairs are unitless and never spatially scaled.
pub fn scale_pair(ctx: &mut PropertyContext, prop: &Property<Vec<f32>>) -> AnimatableValue<Scale> {
    build(ctx, prop, Scale::ONE, |v: &Vec<f32>| {
        Scale::new(
            v.first().copied().unwrap_or(100.0),
            v.get(1).copied().unwrap_or(100.0),
        )
    })
}

pub fn color(ctx: &mut PropertyContext, prop: &Property<Vec<f32>>) -> AnimatableValue<Color> {
    build(ctx, prop, Color::BLACK, |v: &Vec<f32>| {
        Color::from_components(v)
    })
}

pub fn gradient(ctx: &mut PropertyContext, stops: &GradientStops) -> AnimatableValue<GradientColor> {
    let count = stops.p as usize;
    build(ctx, &stops.k, GradientColor::default(), |data: &Vec<f32>| {
        gradient_from_flat(count, data)
    })
}

pub fn shape(ctx: &mut PropertyContext, prop: &Property<PathData>) -> AnimatableValue<ShapeData> {
    let scale = ctx.scale;
    build(ctx, prop, ShapeData::default(), |data: &PathData| {
        shape_from_path(data, scale)
    })
}

pub fn text_document(
    ctx: &mut PropertyContext,
    prop: &Property<TextDocumentRaw>,
) -> AnimatableValue<DocumentText> {
    build(ctx, prop, DocumentText::default(), document_from_raw)
}

fn build<Raw, T>(
    ctx: &mut PropertyContext,
    prop: &Property<Raw>,
    default: T,
    mut convert: impl FnMut(&Raw) -> T,
) -> AnimatableValue<T>
where
    T: Tween,
{
    if prop.x.is_some() {
        ctx.warn("expressions are not supported and will be ignored");
    }
    match &prop.k {
        RawValue::Default => AnimatableValue::Static(default),
        RawValue::Static(v) => AnimatableValue::Static(convert(v)),
        RawValue::Animated(raw) => {
            let frames = build_keyframes(ctx, raw, convert);
            AnimatableValue::from_keyframes(frames, default)
        }
    }
}

fn build_keyframes<Raw, T>(
    ctx: &mut PropertyContext,
    raw: &[RawKeyframe<Raw>],
    mut convert: impl FnMut(&Raw) -> T,
) -> Vec<Keyframe<T>>
where
    T: Tween,
{
    let scale = ctx.scale;
    let mut out = Vec::with_capacity(raw.len());
    for (idx, rk) in raw.iter().enumerate() {
        let Some(s) = rk.s.as_ref() else {
            // A trailing time-only record exists solely to close the
            // previous keyframe's interval; it never becomes a keyframe.
            if idx + 1 != raw.len() {
                ctx.warn(format!("keyframe at frame {} has no start value", rk.t));
            }
            continue;
        };
        let start_value = convert(s);

        let next = raw.get(idx + 1);
        let end_value = match rk.e.as_ref() {
            Some(e) => Some(convert(e)),
            None => next.and_then(|n| n.s.as_ref()).map(&mut convert),
        };
        // A keyframe's interval is closed by the next keyframe's start time,
        // not by anything authored on the keyframe itself.
        let end_frame = next.map(|n| n.t);

        let interpolator = if rk.h == Some(1) {
            None
        } else {
            Some(easing(rk, scale))
        };

        let spatial = |v: &Option<Vec<f32>>| -> Option<Vec2> {
            v.as_ref().map(|v| from_slice(v) * scale)
        };
        out.push(
            Keyframe::new(
                ctx.range,
                start_value,
                end_value,
                interpolator,
                rk.t,
                end_frame,
            )
            .with_spatial_tangents(spatial(&rk.to), spatial(&rk.ti)),
        );
    }
    out
}

/// Upper bound on easing control point y overshoot, in scaled units.
const MAX_CP_Y: f32 = 100.0;

/// Control points are clamped in scaled units, x to `[-scale, scale]` and y
/// to `[-MAX_CP_Y, MAX_CP_Y]`, then normalized back before the solver runs.
fn easing<Raw>(rk: &RawKeyframe<Raw>, scale: f32) -> Interpolator {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let clamp_x = |v: f32| (v * scale).clamp(-scale, scale) / scale;
    let clamp_y = |v: f32| (v * scale).clamp(-MAX_CP_Y, MAX_CP_Y) / scale;
    match (rk.o.as_ref(), rk.i.as_ref()) {
        (Some(o), Some(i)) => {
            let cp1 = Vec2::new(clamp_x(o.x.first_or(0.0)), clamp_y(o.y.first_or(0.0)));
            let cp2 = Vec2::new(clamp_x(i.x.first_or(1.0)), clamp_y(i.y.first_or(1.0)));
            shared_bezier(cp1, cp2)
        }
        _ => Interpolator::Linear,
    }
}

fn from_slice(v: &[f32]) -> Vec2 {
    Vec2::new(
        v.first().copied().unwrap_or(0.0),
        v.get(1).copied().unwrap_or(0.0),
    )
}

/// Decodes the flat gradient array: `4 * count` leading floats of
/// (position, r, g, b) quads, then optional trailing (position, opacity)
/// pairs which are resampled onto the color stop positions.
fn gradient_from_flat(count: usize, data: &[f32]) -> GradientColor {
    let color_count = if count > 0 {
        count.min(data.len() / 4)
    } else {
        data.len() / 4
    };
    let mut positions = Vec::with_capacity(color_count);
    let mut colors = Vec::with_capacity(color_count);
    let channel = |i: usize| -> u8 {
        (data.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0) * 255.0).round() as u8
    };
    for i in 0..color_count {
        let base = i * 4;
        positions.push(data.get(base).copied().unwrap_or(0.0));
        colors.push(Color::rgba(
            channel(base + 1),
            channel(base + 2),
            channel(base + 3),
            255,
        ));
    }

    let opacity = &data[(color_count * 4).min(data.len())..];
    if opacity.len() >= 2 {
        for (i, c) in colors.iter_mut().enumerate() {
            c.a = (sample_opacity(opacity, positions[i]).clamp(0.0, 1.0) * 255.0) as u8;
        }
    }
    GradientColor::new(positions, colors)
}

/// Linearly interpolates trailing (position, opacity) pairs at `position`,
/// holding the end values outside the authored span.
fn sample_opacity(pairs: &[f32], position: f32) -> f32 {
    let stops: Vec<(f32, f32)> = pairs
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();
    let Some(&(first_pos, first_op)) = stops.first() else {
        return 1.0;
    };
    if position <= first_pos {
        return first_op;
    }
    for window in stops.windows(2) {
        let (p0, o0) = window[0];
        let (p1, o1) = window[1];
        if position <= p1 {
            let span = p1 - p0;
            if span <= 0.0 {
                return o1;
            }
            let t = (position - p0) / span;
            return o0 + (o1 - o0) * t;
        }
    }
    stops.last().map(|&(_, op)| op).unwrap_or(1.0)
}

/// Converts the vertex/tangent arrays into absolute cubic segments. Tangents
/// are authored relative to their vertex; an open contour of `n` vertices
/// yields `n - 1` segments, a closed one wraps around for `n`.
fn shape_from_path(data: &PathData, scale: f32) -> ShapeData {
    let n = data.v.len();
    if n == 0 {
        return ShapeData::default();
    }
    let at = |list: &[[f32; 2]], i: usize| -> Vec2 {
        list.get(i)
            .map(|p| Vec2::new(p[0], p[1]))
            .unwrap_or(Vec2::ZERO)
    };
    let segments = if data.c { n } else { n - 1 };
    let mut curves = Vec::with_capacity(segments);
    for s in 0..segments {
        let from = s;
        let to = (s + 1) % n;
        curves.push(CubicCurve::new(
            (at(&data.v, from) + at(&data.o, from)) * scale,
            (at(&data.v, to) + at(&data.i, to)) * scale,
            at(&data.v, to) * scale,
        ));
    }
    ShapeData {
        initial_point: at(&data.v, 0) * scale,
        closed: data.c,
        curves,
    }
}

fn document_from_raw(raw: &TextDocumentRaw) -> DocumentText {
    DocumentText {
        text: raw.t.clone(),
        font_name: raw.f.clone(),
        size: raw.s,
        justification: match raw.j {
            1 => Justification::Right,
            2 => Justification::Center,
            _ => Justification::Left,
        },
        tracking: raw.tr,
        line_height: raw.lh,
        baseline_shift: raw.ls.unwrap_or(0.0),
        fill_color: Color::from_components(&raw.fc),
        stroke_color: raw.sc.as_deref().map(Color::from_components),
        stroke_width: raw.sw.unwrap_or(0.0),
        stroke_over_fill: raw.of.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> PropertyContext {
        PropertyContext::new(FrameRange::new(0.0, 100.0), 1.0)
    }

    fn float_prop(v: serde_json::Value) -> Property<f32> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn end_frames_propagate_and_trailing_record_drops() {
        let prop = float_prop(json!({
            "a": 1,
            "k": [
                { "t": 0, "s": [0], "e": [10] },
                { "t": 30, "s": [10], "e": [20] },
                { "t": 60 }
            ]
        }));
        let mut ctx = ctx();
        let value = float(&mut ctx, &prop, 0.0);
        let AnimatableValue::Keyframes(frames) = value else {
            panic!("expected keyframes");
        };
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].end_frame, Some(30.0));
        assert_eq!(frames[1].end_frame, Some(60.0));
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn missing_end_value_borrows_next_start() {
        let prop = float_prop(json!({
            "a": 1,
            "k": [
                { "t": 0, "s": [1] },
                { "t": 50, "s": [7] }
            ]
        }));
        let value = float(&mut ctx(), &prop, 0.0);
        let AnimatableValue::Keyframes(frames) = value else {
            panic!("expected keyframes");
        };
        assert_eq!(frames[0].end_value, Some(7.0));
        assert_eq!(frames[1].end_value, None);
    }

    #[test]
    fn hold_flag_produces_discrete_keyframe() {
        let prop = float_prop(json!({
            "a": 1,
            "k": [
                { "t": 0, "s": [1], "h": 1 },
                { "t": 50, "s": [2] }
            ]
        }));
        let value = float(&mut ctx(), &prop, 0.0);
        let AnimatableValue::Keyframes(frames) = value else {
            panic!("expected keyframes");
        };
        assert!(frames[0].is_hold());
        assert!(!frames[1].is_hold());
    }

    #[test]
    fn negative_easing_control_points_stay_distinct() {
        // x control points may reach back to -scale; collapsing them to 0
        // would merge curves that ease differently.
        let eased_at_half = |out_x: f64| -> f32 {
            let prop = float_prop(json!({
                "a": 1,
                "k": [
                    {
                        "t": 0, "s": [0], "e": [10],
                        "o": { "x": out_x, "y": 0.0 },
                        "i": { "x": 1.0, "y": 1.0 }
                    },
                    { "t": 100 }
                ]
            }));
            let value = float(&mut ctx(), &prop, 0.0);
            let mut timeline = crate::timeline::Timeline::new(value);
            timeline.set_progress(0.5);
            *timeline.value()
        };
        assert_ne!(eased_at_half(-0.8), eased_at_half(0.0));
    }

    #[test]
    fn integer_properties_round_statics_and_interpolation() {
        let prop = float_prop(json!({ "a": 0, "k": 80.6 }));
        let value = integer(&mut ctx(), &prop, 100);
        assert!(matches!(value, AnimatableValue::Static(81)));

        let prop = float_prop(json!({
            "a": 1,
            "k": [
                { "t": 0, "s": [0], "e": [5] },
                { "t": 100 }
            ]
        }));
        let mut timeline = crate::timeline::Timeline::new(integer(&mut ctx(), &prop, 0));
        timeline.set_progress(0.5);
        assert_eq!(*timeline.value(), 3);
    }

    #[test]
    fn expression_is_warned_and_ignored() {
        let prop = float_prop(json!({ "a": 0, "k": 4, "x": "var $bm_rt = 1;" }));
        let mut ctx = ctx();
        let value = float(&mut ctx, &prop, 0.0);
        assert!(matches!(value, AnimatableValue::Static(v) if v == 4.0));
        assert_eq!(ctx.warnings().len(), 1);
    }

    #[test]
    fn scaled_float_applies_context_scale() {
        let prop = float_prop(json!({ "a": 0, "k": 5 }));
        let mut ctx = PropertyContext::new(FrameRange::new(0.0, 100.0), 2.0);
        let value = scaled_float(&mut ctx, &prop, 0.0);
        assert!(matches!(value, AnimatableValue::Static(v) if v == 10.0));
    }

    #[test]
    fn split_and_unified_positions() {
        let split: PositionProperty = serde_json::from_value(json!({
            "s": true,
            "x": { "a": 0, "k": 10 },
            "y": { "a": 0, "k": 20 }
        }))
        .unwrap();
        assert!(matches!(
            position(&mut ctx(), &split),
            AnimatablePosition::Split { .. }
        ));

        let unified: PositionProperty =
            serde_json::from_value(json!({ "a": 0, "k": [10, 20, 0] })).unwrap();
        match position(&mut ctx(), &unified) {
            AnimatablePosition::Unified(AnimatableValue::Static(p)) => {
                assert_eq!(p, Vec2::new(10.0, 20.0));
            }
            other => panic!("expected unified static position, got {other:?}"),
        }
    }

    #[test]
    fn gradient_flat_array_with_opacity_stops() {
        // Two color stops (red at 0, blue at 1) and two opacity stops
        // (0.5 at 0, 1.0 at 1).
        let stops: GradientStops = serde_json::from_value(json!({
            "p": 2,
            "k": {
                "a": 0,
                "k": [0.0, 1.0, 0.0, 0.0,  1.0, 0.0, 0.0, 1.0,  0.0, 0.5,  1.0, 1.0]
            }
        }))
        .unwrap();
        let value = gradient(&mut ctx(), &stops);
        let AnimatableValue::Static(g) = value else {
            panic!("expected static gradient");
        };
        assert_eq!(g.positions, vec![0.0, 1.0]);
        assert_eq!(g.colors[0], Color::rgba(255, 0, 0, 127));
        assert_eq!(g.colors[1], Color::rgba(0, 0, 255, 255));
    }

    #[test]
    fn gradient_without_opacity_stops_is_opaque() {
        let stops: GradientStops = serde_json::from_value(json!({
            "p": 2,
            "k": { "a": 0, "k": [0.0, 1.0, 1.0, 1.0,  1.0, 0.0, 0.0, 0.0] }
        }))
        .unwrap();
        let AnimatableValue::Static(g) = gradient(&mut ctx(), &stops) else {
            panic!("expected static gradient");
        };
        assert!(g.colors.iter().all(|c| c.a == 255));
    }

    #[test]
    fn closed_path_wraps_final_segment() {
        let prop: Property<PathData> = serde_json::from_value(json!({
            "a": 0,
            "k": {
                "c": true,
                "v": [[0, 0], [10, 0], [10, 10]],
                "i": [[0, 0], [0, 0], [0, 0]],
                "o": [[0, 0], [0, 0], [0, 0]]
            }
        }))
        .unwrap();
        let AnimatableValue::Static(shape) = shape(&mut ctx(), &prop) else {
            panic!("expected static shape");
        };
        assert!(shape.closed);
        assert_eq!(shape.curves.len(), 3);
        assert_eq!(shape.curves[2].vertex, Vec2::ZERO);
    }

    #[test]
    fn open_path_has_one_fewer_segment() {
        let prop: Property<PathData> = serde_json::from_value(json!({
            "a": 0,
            "k": {
                "c": false,
                "v": [[0, 0], [10, 0], [10, 10]],
                "i": [[0, 0], [0, 0], [0, 0]],
                "o": [[0, 0], [0, 0], [0, 0]]
            }
        }))
        .unwrap();
        let AnimatableValue::Static(shape) = shape(&mut ctx(), &prop) else {
            panic!("expected static shape");
        };
        assert_eq!(shape.curves.len(), 2);
    }

    #[test]
    fn text_document_maps_justification_and_colors() {
        let prop: Property<TextDocumentRaw> = serde_json::from_value(json!({
            "a": 0,
            "k": {
                "t": "Hi",
                "f": "Inter-Bold",
                "s": 36.0,
                "j": 2,
                "lh": 43.2,
                "fc": [1.0, 1.0, 1.0]
            }
        }))
        .unwrap();
        let AnimatableValue::Static(doc) = text_document(&mut ctx(), &prop) else {
            panic!("expected static document");
        };
        assert_eq!(doc.text, "Hi");
        assert_eq!(doc.justification, Justification::Center);
        assert_eq!(doc.fill_color, Color::WHITE);
        assert_eq!(doc.stroke_color, None);
    }
}
