//! Compiles the raw interchange document into the typed composition model.
//!
//! Malformed JSON is the only fatal error; everything else the compiler does
//! not understand degrades to a warning on the composition so a partially
//! supported document still plays.

use crate::animatable::{self, PropertyContext};
use crate::error::ParseError;
use crate::keyframe::{AnimatableValue, FrameRange, Keyframe};
use crate::model::{
    AnimatableTransform, Composition, ContentModel, EllipseModel, FillModel, FillRule, Font,
    FontCharacter, GradientFillModel, GradientKind, GradientStrokeModel, GroupModel, ImageAsset,
    Layer, LayerKind, LineCap, LineJoin, Mask, MaskMode, MatteMode, MergeMode, MergePathsModel,
    PathModel, PolystarKind, PolystarModel, RectangleModel, RepeaterModel, StrokeModel,
    TransformGroupModel, TrimMode, TrimModel, Version,
};
use kinema_data::model as raw;
use std::collections::HashMap;

/// Parses a document from JSON text. `scale` converts document coordinates
/// into display units (1.0 keeps them as authored).
pub fn parse_str(json: &str, scale: f32) -> Result<Composition, ParseError> {
    let doc: raw::Document = serde_json::from_str(json)?;
    Ok(compile(doc, scale))
}

pub fn parse_slice(bytes: &[u8], scale: f32) -> Result<Composition, ParseError> {
    let doc: raw::Document = serde_json::from_slice(bytes)?;
    Ok(compile(doc, scale))
}

pub fn compile(doc: raw::Document, scale: f32) -> Composition {
    let start = doc.ip;
    let mut end = doc.op;
    let mut ctx = PropertyContext::new(FrameRange::new(start, end), scale);

    if end < start {
        ctx.warn(format!(
            "composition out point {end} precedes in point {start}; clamping to empty"
        ));
        end = start;
        ctx.range = FrameRange::new(start, end);
    }

    let version = match doc.v.as_deref() {
        Some(v) => match Version::parse(v) {
            Some(parsed) => {
                if parsed < Version::MIN_SUPPORTED {
                    ctx.warn(format!(
                        "document exported by version {parsed}, older than supported {}; \
                         some features may not load",
                        Version::MIN_SUPPORTED
                    ));
                }
                Some(parsed)
            }
            None => {
                ctx.warn(format!("unparseable exporter version {v:?}"));
                None
            }
        },
        None => None,
    };

    let mut precomps = HashMap::new();
    let mut images = HashMap::new();
    for asset in &doc.assets {
        match &asset.layers {
            Some(layers) => {
                let compiled = compile_layers(&mut ctx, layers);
                precomps.insert(asset.id.clone(), compiled);
            }
            None => {
                images.insert(
                    asset.id.clone(),
                    ImageAsset {
                        id: asset.id.clone(),
                        name: asset.nm.clone(),
                        width: scaled_dim(asset.w.unwrap_or(0), scale),
                        height: scaled_dim(asset.h.unwrap_or(0), scale),
                        directory: asset.u.clone(),
                        file_name: asset.p.clone(),
                    },
                );
            }
        }
    }

    let fonts = doc
        .fonts
        .as_ref()
        .map(|list| {
            list.list
                .iter()
                .map(|f| {
                    (
                        f.name.clone(),
                        Font {
                            name: f.name.clone(),
                            family: f.family.clone(),
                            style: f.style.clone(),
                            ascent: f.ascent,
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let mut characters = HashMap::new();
    for ch in &doc.chars {
        let shapes = ch
            .data
            .as_ref()
            .map(|d| compile_contents(&mut ctx, &d.shapes))
            .unwrap_or_default();
        let glyph = FontCharacter {
            character: ch.ch.clone(),
            family: ch.family.clone(),
            style: ch.style.clone(),
            size: ch.size,
            width: ch.w,
            shapes,
        };
        characters.insert(glyph.key(), glyph);
    }

    let layers = compile_layers(&mut ctx, &doc.layers);

    Composition {
        name: doc.nm.clone(),
        version,
        frame_range: ctx.range,
        frame_rate: doc.fr,
        width: scaled_dim(doc.w, scale),
        height: scaled_dim(doc.h, scale),
        layers,
        precomps,
        images,
        fonts,
        characters,
        warnings: ctx.take_warnings(),
    }
}

fn scaled_dim(dim: u32, scale: f32) -> u32 {
    (dim as f32 * scale).round() as u32
}

fn compile_layers(ctx: &mut PropertyContext, layers: &[raw::RawLayer]) -> Vec<Layer> {
    layers
        .iter()
        .filter_map(|layer| compile_layer(ctx, layer))
        .collect()
}

fn compile_layer(ctx: &mut PropertyContext, layer: &raw::RawLayer) -> Option<Layer> {
    let kind = match layer.ty {
        0 => LayerKind::PreComp,
        1 => LayerKind::Solid,
        2 => LayerKind::Image,
        3 => LayerKind::Null,
        4 => LayerKind::Shape,
        5 => LayerKind::Text,
        other => {
            ctx.warn(format!(
                "skipping layer {:?} of unsupported type {other}",
                layer.nm.as_deref().unwrap_or("")
            ));
            return None;
        }
    };

    if layer.ef.is_some() {
        ctx.warn(format!(
            "layer {:?} uses effects, which are not supported",
            layer.nm.as_deref().unwrap_or("")
        ));
    }
    let from_illustrator = layer.cl.as_deref() == Some("ai")
        || layer
            .nm
            .as_deref()
            .map_or(false, |nm| nm.ends_with(".ai"));
    if from_illustrator {
        ctx.warn(
            "layer appears to be an unconverted Illustrator layer; \
             convert it to shapes for best results"
                .to_string(),
        );
    }

    let matte = match layer.tt {
        None | Some(0) => None,
        Some(1) => Some(MatteMode::Add),
        Some(2) => Some(MatteMode::Invert),
        Some(3) => {
            ctx.warn("luma mattes are approximated as alpha mattes".to_string());
            Some(MatteMode::Add)
        }
        Some(4) => {
            ctx.warn("inverted luma mattes are approximated as alpha mattes".to_string());
            Some(MatteMode::Invert)
        }
        Some(other) => {
            ctx.warn(format!("unknown matte type {other}; ignoring"));
            None
        }
    };

    let masks = layer
        .masks_properties
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|mask| compile_mask(ctx, mask))
        .collect();

    let contents = match (&layer.shapes, kind) {
        (Some(shapes), LayerKind::Shape) => compile_contents(ctx, shapes),
        _ => Vec::new(),
    };

    let solid_color = match (kind, layer.sc.as_deref()) {
        (LayerKind::Solid, Some(hex)) => {
            let color = crate::value::Color::from_hex(hex);
            if color.is_none() {
                ctx.warn(format!("unparseable solid color {hex:?}"));
            }
            color
        }
        _ => None,
    };
    let (width, height) = match kind {
        LayerKind::Solid => (
            scaled_dim(layer.sw.unwrap_or(0), ctx.scale),
            scaled_dim(layer.sh.unwrap_or(0), ctx.scale),
        ),
        _ => (
            scaled_dim(layer.w.unwrap_or(0), ctx.scale),
            scaled_dim(layer.h.unwrap_or(0), ctx.scale),
        ),
    };

    let text = match (&layer.t, kind) {
        (Some(t), LayerKind::Text) => Some(animatable::text_document(ctx, &t.d)),
        _ => None,
    };

    Some(Layer {
        kind,
        name: layer.nm.clone(),
        index: layer.ind,
        parent: layer.parent,
        in_point: layer.ip,
        out_point: layer.op,
        start_frame: layer.st,
        time_stretch: layer.sr,
        hidden: layer.hd.unwrap_or(false),
        transform: compile_transform(ctx, &layer.ks),
        visibility: visibility_keyframes(ctx, layer.ip, layer.op, layer.sr),
        time_remap: layer
            .tm
            .as_ref()
            .map(|tm| animatable::float(ctx, tm, 0.0)),
        masks,
        matte,
        is_matte_source: layer.td == Some(1),
        ref_id: layer.ref_id.clone(),
        width,
        height,
        solid_color,
        contents,
        text,
    })
}

/// Compiles a layer's in/out points into a discrete visibility timeline:
/// hidden before the in point, visible until the out point, hidden after.
fn visibility_keyframes(
    ctx: &PropertyContext,
    in_point: f32,
    out_point: f32,
    stretch: f32,
) -> AnimatableValue<f32> {
    let stretch = if stretch <= 0.0 { 1.0 } else { stretch };
    let in_frame = in_point / stretch;
    let out_frame = out_point / stretch;

    let mut frames = Vec::with_capacity(3);
    if in_frame > ctx.range.start {
        frames.push(Keyframe::hold(ctx.range, 0.0, ctx.range.start, Some(in_frame)));
    }
    frames.push(Keyframe::hold(
        ctx.range,
        1.0,
        in_frame.max(ctx.range.start),
        Some(out_frame),
    ));
    frames.push(Keyframe::hold(ctx.range, 0.0, out_frame, None));
    AnimatableValue::from_keyframes(frames, 1.0)
}

fn compile_transform(ctx: &mut PropertyContext, t: &raw::RawTransform) -> AnimatableTransform {
    AnimatableTransform {
        anchor_point: animatable::point(ctx, &t.a),
        position: animatable::position(ctx, &t.p),
        scale: animatable::scale_pair(ctx, &t.s),
        rotation: animatable::float(ctx, &t.r, 0.0),
        skew: animatable::float(ctx, &t.sk, 0.0),
        skew_angle: animatable::float(ctx, &t.sa, 0.0),
        opacity: animatable::integer(ctx, &t.o, 100),
    }
}

fn compile_mask(ctx: &mut PropertyContext, mask: &raw::RawMask) -> Mask {
    let mode = match mask.mode.as_deref() {
        None | Some("a") => MaskMode::Add,
        Some("s") => MaskMode::Subtract,
        Some("i") => {
            ctx.warn("intersect masks are not fully supported".to_string());
            MaskMode::Intersect
        }
        Some("n") => MaskMode::None,
        Some(other) => {
            ctx.warn(format!("unknown mask mode {other:?}; treating as add"));
            MaskMode::Add
        }
    };
    Mask {
        name: mask.nm.clone(),
        mode,
        inverted: mask.inv,
        path: animatable::shape(ctx, &mask.pt),
        opacity: animatable::float(ctx, &mask.o, 100.0),
    }
}

fn compile_contents(ctx: &mut PropertyContext, shapes: &[raw::Shape]) -> Vec<ContentModel> {
    shapes
        .iter()
        .filter_map(|shape| compile_content(ctx, shape))
        .collect()
}

fn compile_content(ctx: &mut PropertyContext, shape: &raw::Shape) -> Option<ContentModel> {
    let model = match shape {
        raw::Shape::Group(s) => ContentModel::Group(GroupModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            contents: compile_contents(ctx, &s.it),
        }),
        raw::Shape::Path(s) => ContentModel::Path(PathModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            shape: animatable::shape(ctx, &s.ks),
        }),
        raw::Shape::Fill(s) => ContentModel::Fill(FillModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            color: animatable::color(ctx, &s.c),
            opacity: animatable::float(ctx, &s.o, 100.0),
            fill_rule: fill_rule(s.r),
        }),
        raw::Shape::Stroke(s) => ContentModel::Stroke(StrokeModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            color: animatable::color(ctx, &s.c),
            width: animatable::scaled_float(ctx, &s.w, 0.0),
            opacity: animatable::float(ctx, &s.o, 100.0),
            cap: line_cap(s.lc),
            join: line_join(s.lj),
            miter_limit: s.ml.unwrap_or(4.0),
        }),
        raw::Shape::GradientFill(s) => ContentModel::GradientFill(GradientFillModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            kind: gradient_kind(s.t),
            start_point: animatable::point(ctx, &s.s),
            end_point: animatable::point(ctx, &s.e),
            stops: animatable::gradient(ctx, &s.g),
            opacity: animatable::float(ctx, &s.o, 100.0),
            fill_rule: fill_rule(s.r),
        }),
        raw::Shape::GradientStroke(s) => ContentModel::GradientStroke(GradientStrokeModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            kind: gradient_kind(s.t),
            start_point: animatable::point(ctx, &s.s),
            end_point: animatable::point(ctx, &s.e),
            stops: animatable::gradient(ctx, &s.g),
            width: animatable::scaled_float(ctx, &s.w, 0.0),
            opacity: animatable::float(ctx, &s.o, 100.0),
            cap: line_cap(s.lc),
            join: line_join(s.lj),
            miter_limit: s.ml.unwrap_or(4.0),
        }),
        raw::Shape::Ellipse(s) => ContentModel::Ellipse(EllipseModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            position: animatable::point(ctx, &s.p),
            size: animatable::point(ctx, &s.s),
        }),
        raw::Shape::Rect(s) => ContentModel::Rectangle(RectangleModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            position: animatable::point(ctx, &s.p),
            size: animatable::point(ctx, &s.s),
            corner_radius: animatable::scaled_float(ctx, &s.r, 0.0),
        }),
        raw::Shape::Polystar(s) => {
            let kind = if s.sy == 2 {
                PolystarKind::Polygon
            } else {
                PolystarKind::Star
            };
            ContentModel::Polystar(PolystarModel {
                name: s.nm.clone(),
                hidden: s.hd.unwrap_or(false),
                kind,
                points: animatable::float(ctx, &s.pt, 0.0),
                position: animatable::position(ctx, &s.p),
                rotation: animatable::float(ctx, &s.r, 0.0),
                outer_radius: animatable::scaled_float(ctx, &s.or, 0.0),
                outer_roundness: animatable::float(ctx, &s.os, 0.0),
                inner_radius: match (kind, &s.ir) {
                    (PolystarKind::Star, Some(ir)) => {
                        Some(animatable::scaled_float(ctx, ir, 0.0))
                    }
                    _ => None,
                },
                inner_roundness: match (kind, &s.is) {
                    (PolystarKind::Star, Some(is)) => Some(animatable::float(ctx, is, 0.0)),
                    _ => None,
                },
            })
        }
        raw::Shape::Trim(s) => ContentModel::Trim(TrimModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            start: animatable::float(ctx, &s.s, 0.0),
            end: animatable::float(ctx, &s.e, 100.0),
            offset: animatable::float(ctx, &s.o, 0.0),
            mode: if s.m == 2 {
                TrimMode::Individual
            } else {
                TrimMode::Simultaneous
            },
        }),
        raw::Shape::MergePaths(s) => ContentModel::MergePaths(MergePathsModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            mode: match s.mm {
                2 => MergeMode::Add,
                3 => MergeMode::Subtract,
                4 => MergeMode::Intersect,
                5 => MergeMode::ExcludeIntersections,
                _ => MergeMode::Merge,
            },
        }),
        raw::Shape::Repeater(s) => ContentModel::Repeater(RepeaterModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            copies: animatable::float(ctx, &s.c, 0.0),
            offset: animatable::float(ctx, &s.o, 0.0),
            transform: compile_transform(ctx, &s.tr.t),
            start_opacity: animatable::float(ctx, &s.tr.so, 100.0),
            end_opacity: animatable::float(ctx, &s.tr.eo, 100.0),
        }),
        raw::Shape::Transform(s) => ContentModel::TransformGroup(TransformGroupModel {
            name: s.nm.clone(),
            hidden: s.hd.unwrap_or(false),
            transform: compile_transform(ctx, &s.t),
        }),
        raw::Shape::Unknown => {
            ctx.warn("skipping shape of unknown type".to_string());
            return None;
        }
    };
    Some(model)
}

fn fill_rule(r: Option<u8>) -> FillRule {
    if r == Some(2) {
        FillRule::EvenOdd
    } else {
        FillRule::NonZero
    }
}

fn line_cap(lc: u8) -> LineCap {
    match lc {
        2 => LineCap::Round,
        3 => LineCap::Square,
        _ => LineCap::Butt,
    }
}

fn line_join(lj: u8) -> LineJoin {
    match lj {
        2 => LineJoin::Round,
        3 => LineJoin::Bevel,
        _ => LineJoin::Miter,
    }
}

fn gradient_kind(t: u8) -> GradientKind {
    if t == 2 {
        GradientKind::Radial
    } else {
        GradientKind::Linear
    }
}
