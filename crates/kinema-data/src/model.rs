//! Loosely-typed model of the exported interchange document.
//!
//! Everything here mirrors the JSON shape one-to-one; the strongly-typed
//! animation model is compiled from these records by `kinema-core`. Unknown
//! fields are skipped by serde, matching the "skip, don't fail" contract of
//! the document format.

use serde::{de::DeserializeOwned, de::SeqAccess, Deserialize, Deserializer};
use std::fmt;

#[derive(Debug, Deserialize, Clone)]
pub struct Document {
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default = "default_frame_rate")]
    pub fr: f32,
    #[serde(default)]
    pub w: u32,
    #[serde(default)]
    pub h: u32,
    #[serde(default)]
    pub layers: Vec<RawLayer>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub fonts: Option<FontList>,
    #[serde(default)]
    pub chars: Vec<CharData>,
}

fn default_frame_rate() -> f32 {
    30.0
}

fn default_one() -> f32 {
    1.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawLayer {
    #[serde(default)]
    pub ty: u8,
    #[serde(default)]
    pub ind: Option<u32>,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub st: f32,
    // Time stretch: 1.0 = normal, >1 = slower.
    #[serde(default = "default_one")]
    pub sr: f32,
    #[serde(default)]
    pub ks: RawTransform,
    #[serde(default)]
    pub tm: Option<Property<f32>>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default, rename = "masksProperties")]
    pub masks_properties: Option<Vec<RawMask>>,
    // Matte mode: 0=none, 1=alpha, 2=inverted alpha, 3=luma, 4=inverted luma.
    #[serde(default)]
    pub tt: Option<u8>,
    #[serde(default)]
    pub td: Option<u8>,
    // Layer effects are carried opaquely; the compiler only warns on them.
    #[serde(default)]
    pub ef: Option<serde_json::Value>,
    #[serde(default)]
    pub cl: Option<String>,

    // PreComp / image reference
    #[serde(default, rename = "refId")]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub w: Option<u32>,
    #[serde(default)]
    pub h: Option<u32>,

    // Solid
    #[serde(default)]
    pub sc: Option<String>,
    #[serde(default)]
    pub sw: Option<u32>,
    #[serde(default)]
    pub sh: Option<u32>,

    // Shape layer
    #[serde(default)]
    pub shapes: Option<Vec<Shape>>,

    // Text layer
    #[serde(default)]
    pub t: Option<TextData>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawMask {
    #[serde(default)]
    pub inv: bool,
    #[serde(default)]
    pub mode: Option<String>,
    pub pt: Property<PathData>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub nm: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawTransform {
    #[serde(default)]
    pub a: Property<Vec<f32>>,
    #[serde(default)]
    pub p: PositionProperty,
    #[serde(default)]
    pub s: Property<Vec<f32>>,
    #[serde(default, alias = "rz")]
    pub r: Property<f32>,
    #[serde(default)]
    pub sk: Property<f32>,
    #[serde(default)]
    pub sa: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
}

/// A position is either a single animatable channel or two independently
/// keyframed scalar channels. `Split` is tried first: a unified property
/// never carries `x`/`y` sub-objects.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        x: Property<f32>,
        y: Property<f32>,
    },
    Unified(Property<Vec<f32>>),
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

// Shapes

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "ty")]
pub enum Shape {
    #[serde(rename = "gr")]
    Group(GroupShape),
    #[serde(rename = "sh")]
    Path(PathShape),
    #[serde(rename = "fl")]
    Fill(FillShape),
    #[serde(rename = "st")]
    Stroke(StrokeShape),
    #[serde(rename = "gf")]
    GradientFill(GradientFillShape),
    #[serde(rename = "gs")]
    GradientStroke(GradientStrokeShape),
    #[serde(rename = "el")]
    Ellipse(EllipseShape),
    #[serde(rename = "rc")]
    Rect(RectShape),
    #[serde(rename = "sr")]
    Polystar(PolystarShape),
    #[serde(rename = "tm")]
    Trim(TrimShape),
    #[serde(rename = "mm")]
    MergePaths(MergePathsShape),
    #[serde(rename = "rp")]
    Repeater(RepeaterShape),
    #[serde(rename = "tr")]
    Transform(TransformShape),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GroupShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub it: Vec<Shape>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub ks: Property<PathData>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FillShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub c: Property<Vec<f32>>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub r: Option<u8>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub c: Property<Vec<f32>>,
    pub w: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub lc: u8,
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GradientFillShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub o: Property<f32>,
    pub s: Property<Vec<f32>>,
    pub e: Property<Vec<f32>>,
    // Gradient kind: 1=linear, 2=radial.
    #[serde(default = "default_gradient_kind")]
    pub t: u8,
    pub g: GradientStops,
    #[serde(default)]
    pub r: Option<u8>,
}

fn default_gradient_kind() -> u8 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct GradientStrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub o: Property<f32>,
    pub w: Property<f32>,
    pub s: Property<Vec<f32>>,
    pub e: Property<Vec<f32>>,
    #[serde(default = "default_gradient_kind")]
    pub t: u8,
    pub g: GradientStops,
    #[serde(default)]
    pub lc: u8,
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
}

/// Gradient stop data: `p` is the authored color stop count, `k` the flat
/// position/color (and optional trailing opacity) array.
#[derive(Debug, Deserialize, Clone)]
pub struct GradientStops {
    #[serde(default)]
    pub p: u32,
    pub k: Property<Vec<f32>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EllipseShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub p: Property<Vec<f32>>,
    pub s: Property<Vec<f32>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RectShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub p: Property<Vec<f32>>,
    pub s: Property<Vec<f32>>,
    #[serde(default)]
    pub r: Property<f32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolystarShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    // 1=star, 2=polygon.
    #[serde(default = "default_polystar_kind")]
    pub sy: u8,
    pub p: PositionProperty,
    pub pt: Property<f32>,
    #[serde(default)]
    pub r: Property<f32>,
    #[serde(default)]
    pub or: Property<f32>,
    #[serde(default)]
    pub os: Property<f32>,
    #[serde(default)]
    pub ir: Option<Property<f32>>,
    #[serde(default)]
    pub is: Option<Property<f32>>,
}

fn default_polystar_kind() -> u8 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrimShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub s: Property<f32>,
    pub e: Property<f32>,
    pub o: Property<f32>,
    // 1=simultaneously, 2=individually.
    #[serde(default = "default_one_u8")]
    pub m: u8,
}

fn default_one_u8() -> u8 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct MergePathsShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default = "default_one_u8")]
    pub mm: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepeaterShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub c: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    pub tr: RepeaterTransform,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepeaterTransform {
    #[serde(flatten)]
    pub t: RawTransform,
    #[serde(default)]
    pub so: Property<f32>,
    #[serde(default)]
    pub eo: Property<f32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransformShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(flatten)]
    pub t: RawTransform,
}

// Properties

#[derive(Debug, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: RawValue<T>,
    #[serde(default)]
    pub ix: Option<u32>,
    /// Expression source, if the property is expression-bound.
    #[serde(default)]
    pub x: Option<String>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: RawValue::Default,
            ix: None,
            x: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RawValue<T> {
    Default,
    Static(T),
    Animated(Vec<RawKeyframe<T>>),
}

impl<T> Default for RawValue<T> {
    fn default() -> Self {
        RawValue::Default
    }
}

/// Static values and keyframe sequences share one JSON slot; the document
/// carries no schema tag. A `k` payload is a keyframe sequence iff it is an
/// array whose first element is an object carrying a `t` (time) field —
/// anything else is a static value (scalars, component arrays, path objects).
impl<'de, T: DeserializeOwned> Deserialize<'de> for RawValue<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        if v.is_null() {
            return Ok(RawValue::Default);
        }

        if let serde_json::Value::Array(items) = &v {
            let keyframe_like = items
                .first()
                .map_or(false, |first| first.is_object() && first.get("t").is_some());
            if keyframe_like {
                let frames = serde_json::from_value::<Vec<RawKeyframe<T>>>(v)
                    .map_err(serde::de::Error::custom)?;
                return Ok(RawValue::Animated(frames));
            }
        }

        if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
            return Ok(RawValue::Static(val));
        }

        // Single-element array wrapping a scalar value.
        if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
            if let Some(first) = vec.into_iter().next() {
                return Ok(RawValue::Static(first));
            }
        }

        Ok(RawValue::Default)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct RawKeyframe<T> {
    pub t: f32,
    #[serde(default, deserialize_with = "keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "keyframe_value")]
    pub e: Option<T>,
    /// Incoming easing control point of the next segment.
    #[serde(default)]
    pub i: Option<Tangent>,
    /// Outgoing easing control point of this segment.
    #[serde(default)]
    pub o: Option<Tangent>,
    /// Spatial out/in tangents, only present on path-valued properties.
    #[serde(default)]
    pub to: Option<Vec<f32>>,
    #[serde(default)]
    pub ti: Option<Vec<f32>>,
    /// Hold flag: the value snaps instead of tweening across the interval.
    #[serde(default)]
    pub h: Option<u8>,
}

fn keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }

    if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
        return Ok(Some(val));
    }

    // Scalar keyframe values are usually wrapped in a single-element array.
    if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
        if let Some(first) = vec.into_iter().next() {
            return Ok(Some(first));
        }
    }

    Ok(None)
}

/// Easing control point coordinates; authored either as scalars or as
/// per-dimension arrays. Only the first component drives the shared easing
/// curve.
#[derive(Debug, Deserialize, Clone)]
pub struct Tangent {
    #[serde(default)]
    pub x: FloatList,
    #[serde(default)]
    pub y: FloatList,
}

#[derive(Debug, Clone, Default)]
pub struct FloatList(pub Vec<f32>);

impl FloatList {
    pub fn first_or(&self, default: f32) -> f32 {
        self.0.first().copied().unwrap_or(default)
    }
}

impl<'de> Deserialize<'de> for FloatList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FloatListVisitor;
        impl<'de> serde::de::Visitor<'de> for FloatListVisitor {
            type Value = FloatList;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number or a sequence of numbers")
            }
            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(FloatList(vec![v as f32]))
            }
            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(FloatList(vec![v as f32]))
            }
            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(FloatList(vec![v as f32]))
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut values = Vec::new();
                while let Some(v) = seq.next_element::<f32>()? {
                    values.push(v);
                }
                Ok(FloatList(values))
            }
        }
        deserializer.deserialize_any(FloatListVisitor)
    }
}

/// Closed cubic bezier contour: vertices plus relative in/out tangents.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PathData {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub i: Vec<[f32; 2]>,
    #[serde(default)]
    pub o: Vec<[f32; 2]>,
    #[serde(default)]
    pub v: Vec<[f32; 2]>,
}

// Assets, fonts, glyphs, text

#[derive(Debug, Deserialize, Clone)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub nm: Option<String>,
    /// Present on precomposition assets.
    #[serde(default)]
    pub layers: Option<Vec<RawLayer>>,
    #[serde(default)]
    pub w: Option<u32>,
    #[serde(default)]
    pub h: Option<u32>,
    #[serde(default)]
    pub u: Option<String>,
    #[serde(default)]
    pub p: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FontList {
    #[serde(default)]
    pub list: Vec<FontAsset>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FontAsset {
    #[serde(rename = "fName")]
    pub name: String,
    #[serde(default, rename = "fFamily")]
    pub family: String,
    #[serde(default, rename = "fStyle")]
    pub style: String,
    #[serde(default)]
    pub ascent: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CharData {
    pub ch: String,
    #[serde(default, rename = "fFamily")]
    pub family: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub size: f32,
    #[serde(default)]
    pub w: f32,
    #[serde(default)]
    pub data: Option<CharShapes>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CharShapes {
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TextData {
    pub d: Property<TextDocumentRaw>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct TextDocumentRaw {
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub f: String,
    #[serde(default)]
    pub s: f32,
    #[serde(default)]
    pub j: u8,
    #[serde(default)]
    pub tr: f32,
    #[serde(default)]
    pub lh: f32,
    #[serde(default)]
    pub ls: Option<f32>,
    #[serde(default)]
    pub fc: Vec<f32>,
    #[serde(default)]
    pub sc: Option<Vec<f32>>,
    #[serde(default)]
    pub sw: Option<f32>,
    #[serde(default)]
    pub of: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn static_scalar_and_wrapped_scalar() {
        let p: Property<f32> = serde_json::from_value(json!({ "a": 0, "k": 5 })).unwrap();
        assert!(matches!(p.k, RawValue::Static(v) if v == 5.0));

        let p: Property<f32> = serde_json::from_value(json!({ "a": 0, "k": [5] })).unwrap();
        assert!(matches!(p.k, RawValue::Static(v) if v == 5.0));
    }

    #[test]
    fn keyframes_detected_by_time_field() {
        let p: Property<f32> = serde_json::from_value(json!({
            "a": 1,
            "k": [
                { "t": 0, "s": [0], "e": [10] },
                { "t": 30 }
            ]
        }))
        .unwrap();
        match p.k {
            RawValue::Animated(frames) => {
                assert_eq!(frames.len(), 2);
                assert_eq!(frames[0].s, Some(0.0));
                assert_eq!(frames[0].e, Some(10.0));
                assert_eq!(frames[1].s, None);
            }
            other => panic!("expected keyframes, got {other:?}"),
        }
    }

    #[test]
    fn component_array_is_static_not_keyframes() {
        // A numeric array property must not be mistaken for a keyframe list.
        let p: Property<Vec<f32>> =
            serde_json::from_value(json!({ "a": 0, "k": [250.0, 120.0, 0.0] })).unwrap();
        assert!(matches!(p.k, RawValue::Static(v) if v == vec![250.0, 120.0, 0.0]));
    }

    #[test]
    fn split_position_is_not_unified() {
        let p: PositionProperty = serde_json::from_value(json!({
            "s": true,
            "x": { "a": 0, "k": 10 },
            "y": { "a": 0, "k": 20 }
        }))
        .unwrap();
        assert!(matches!(p, PositionProperty::Split { .. }));

        let p: PositionProperty =
            serde_json::from_value(json!({ "a": 0, "k": [10, 20, 0] })).unwrap();
        assert!(matches!(p, PositionProperty::Unified(_)));
    }

    #[test]
    fn tangent_accepts_scalar_and_array() {
        let t: Tangent = serde_json::from_value(json!({ "x": 0.5, "y": [1.0] })).unwrap();
        assert_eq!(t.x.first_or(0.0), 0.5);
        assert_eq!(t.y.first_or(0.0), 1.0);
    }

    #[test]
    fn unknown_shape_kind_parses_as_unknown() {
        let s: Shape = serde_json::from_value(json!({ "ty": "zz", "nm": "ZigZag" })).unwrap();
        assert!(matches!(s, Shape::Unknown));
    }
}
