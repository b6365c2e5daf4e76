//! The compiled, strongly-typed composition model.
//!
//! Everything here is immutable after parsing and safe to share between
//! threads behind an `Arc`; playback state lives in the runtime tree, never
//! in the model.

use crate::animatable::AnimatablePosition;
use crate::keyframe::{AnimatableValue, FrameRange};
use crate::value::{Color, DocumentText, GradientColor, Scale, ShapeData};
use glam::Vec2;
use std::collections::HashMap;
use std::fmt;

/// Exporter version triple, e.g. `5.7.4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Oldest exporter whose documents are fully understood.
    pub const MIN_SUPPORTED: Version = Version {
        major: 4,
        minor: 5,
        patch: 0,
    };

    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(s: &str) -> Option<Version> {
        let mut parts = s.split('.');
        let mut next = || parts.next().and_then(|p| p.trim().parse::<u32>().ok());
        let major = next()?;
        let minor = next().unwrap_or(0);
        let patch = next().unwrap_or(0);
        Some(Version::new(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A parsed document: layer stack, referenced assets, and global timing.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    pub name: Option<String>,
    pub version: Option<Version>,
    pub frame_range: FrameRange,
    pub frame_rate: f32,
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Layer>,
    /// Precomposition assets by id, instantiated per referencing layer.
    pub precomps: HashMap<String, Vec<Layer>>,
    pub images: HashMap<String, ImageAsset>,
    pub fonts: HashMap<String, Font>,
    /// Glyphs keyed by [`FontCharacter::key`].
    pub characters: HashMap<String, FontCharacter>,
    /// Non-fatal problems found while parsing, in document order.
    pub warnings: Vec<String>,
}

impl Composition {
    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        if self.frame_rate <= 0.0 {
            0.0
        } else {
            self.frame_range.duration() / self.frame_rate
        }
    }

    pub fn precomp(&self, ref_id: &str) -> Option<&[Layer]> {
        self.precomps.get(ref_id).map(Vec::as_slice)
    }

    /// Top-level layer with the given index, if any. Indices are unique
    /// within one layer scope (the root stack or a single precomp).
    pub fn layer_by_index(&self, index: u32) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.index == Some(index))
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    PreComp,
    Solid,
    Image,
    Null,
    Shape,
    Text,
    Unknown,
}

/// Track matte consumed from the layer directly above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatteMode {
    Add,
    Invert,
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub kind: LayerKind,
    pub name: Option<String>,
    pub index: Option<u32>,
    pub parent: Option<u32>,
    pub in_point: f32,
    pub out_point: f32,
    pub start_frame: f32,
    pub time_stretch: f32,
    pub hidden: bool,
    pub transform: AnimatableTransform,
    /// Visibility over the composition, compiled from in/out points as hold
    /// keyframes (0 before in, 1 inside, 0 after out).
    pub visibility: AnimatableValue<f32>,
    pub time_remap: Option<AnimatableValue<f32>>,
    pub masks: Vec<Mask>,
    pub matte: Option<MatteMode>,
    /// True when this layer is only a matte source for the layer below.
    pub is_matte_source: bool,
    /// PreComp or image reference.
    pub ref_id: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Solid layers only.
    pub solid_color: Option<Color>,
    /// Shape layers only.
    pub contents: Vec<ContentModel>,
    /// Text layers only.
    pub text: Option<AnimatableValue<DocumentText>>,
}

#[derive(Debug, Clone, Default)]
pub struct AnimatableTransform {
    pub anchor_point: AnimatableValue<Vec2>,
    pub position: AnimatablePosition,
    pub scale: AnimatableValue<Scale>,
    pub rotation: AnimatableValue<f32>,
    pub skew: AnimatableValue<f32>,
    pub skew_angle: AnimatableValue<f32>,
    /// Authored in whole percent steps; interpolated values round.
    pub opacity: AnimatableValue<i32>,
}

impl Default for AnimatableValue<Vec2> {
    fn default() -> Self {
        AnimatableValue::Static(Vec2::ZERO)
    }
}

impl Default for AnimatableValue<Scale> {
    fn default() -> Self {
        AnimatableValue::Static(Scale::ONE)
    }
}

impl Default for AnimatableValue<f32> {
    fn default() -> Self {
        AnimatableValue::Static(0.0)
    }
}

/// The only integer channel is transform opacity, which defaults opaque.
impl Default for AnimatableValue<i32> {
    fn default() -> Self {
        AnimatableValue::Static(100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    Add,
    Subtract,
    Intersect,
    None,
}

#[derive(Debug, Clone)]
pub struct Mask {
    pub name: Option<String>,
    pub mode: MaskMode,
    pub inverted: bool,
    pub path: AnimatableValue<ShapeData>,
    pub opacity: AnimatableValue<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    Simultaneous,
    Individual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolystarKind {
    Star,
    Polygon,
}

/// Merge-paths operator. Carried through the model even though merging is
/// not evaluated here, so consumers can decide how to rasterize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Merge,
    Add,
    Subtract,
    Intersect,
    ExcludeIntersections,
}

/// One element of a shape layer's content list.
#[derive(Debug, Clone)]
pub enum ContentModel {
    Group(GroupModel),
    Path(PathModel),
    Fill(FillModel),
    Stroke(StrokeModel),
    GradientFill(GradientFillModel),
    GradientStroke(GradientStrokeModel),
    Ellipse(EllipseModel),
    Rectangle(RectangleModel),
    Polystar(PolystarModel),
    Trim(TrimModel),
    MergePaths(MergePathsModel),
    Repeater(RepeaterModel),
    TransformGroup(TransformGroupModel),
}

impl ContentModel {
    pub fn name(&self) -> Option<&str> {
        match self {
            ContentModel::Group(m) => m.name.as_deref(),
            ContentModel::Path(m) => m.name.as_deref(),
            ContentModel::Fill(m) => m.name.as_deref(),
            ContentModel::Stroke(m) => m.name.as_deref(),
            ContentModel::GradientFill(m) => m.name.as_deref(),
            ContentModel::GradientStroke(m) => m.name.as_deref(),
            ContentModel::Ellipse(m) => m.name.as_deref(),
            ContentModel::Rectangle(m) => m.name.as_deref(),
            ContentModel::Polystar(m) => m.name.as_deref(),
            ContentModel::Trim(m) => m.name.as_deref(),
            ContentModel::MergePaths(m) => m.name.as_deref(),
            ContentModel::Repeater(m) => m.name.as_deref(),
            ContentModel::TransformGroup(m) => m.name.as_deref(),
        }
    }

    pub fn hidden(&self) -> bool {
        match self {
            ContentModel::Group(m) => m.hidden,
            ContentModel::Path(m) => m.hidden,
            ContentModel::Fill(m) => m.hidden,
            ContentModel::Stroke(m) => m.hidden,
            ContentModel::GradientFill(m) => m.hidden,
            ContentModel::GradientStroke(m) => m.hidden,
            ContentModel::Ellipse(m) => m.hidden,
            ContentModel::Rectangle(m) => m.hidden,
            ContentModel::Polystar(m) => m.hidden,
            ContentModel::Trim(m) => m.hidden,
            ContentModel::MergePaths(m) => m.hidden,
            ContentModel::Repeater(m) => m.hidden,
            ContentModel::TransformGroup(m) => m.hidden,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub contents: Vec<ContentModel>,
}

#[derive(Debug, Clone)]
pub struct PathModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub shape: AnimatableValue<ShapeData>,
}

#[derive(Debug, Clone)]
pub struct FillModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub color: AnimatableValue<Color>,
    pub opacity: AnimatableValue<f32>,
    pub fill_rule: FillRule,
}

#[derive(Debug, Clone)]
pub struct StrokeModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub color: AnimatableValue<Color>,
    pub width: AnimatableValue<f32>,
    pub opacity: AnimatableValue<f32>,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
}

#[derive(Debug, Clone)]
pub struct GradientFillModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub kind: GradientKind,
    pub start_point: AnimatableValue<Vec2>,
    pub end_point: AnimatableValue<Vec2>,
    pub stops: AnimatableValue<GradientColor>,
    pub opacity: AnimatableValue<f32>,
    pub fill_rule: FillRule,
}

#[derive(Debug, Clone)]
pub struct GradientStrokeModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub kind: GradientKind,
    pub start_point: AnimatableValue<Vec2>,
    pub end_point: AnimatableValue<Vec2>,
    pub stops: AnimatableValue<GradientColor>,
    pub width: AnimatableValue<f32>,
    pub opacity: AnimatableValue<f32>,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
}

#[derive(Debug, Clone)]
pub struct EllipseModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub position: AnimatableValue<Vec2>,
    pub size: AnimatableValue<Vec2>,
}

#[derive(Debug, Clone)]
pub struct RectangleModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub position: AnimatableValue<Vec2>,
    pub size: AnimatableValue<Vec2>,
    pub corner_radius: AnimatableValue<f32>,
}

#[derive(Debug, Clone)]
pub struct PolystarModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub kind: PolystarKind,
    pub points: AnimatableValue<f32>,
    pub position: AnimatablePosition,
    pub rotation: AnimatableValue<f32>,
    pub outer_radius: AnimatableValue<f32>,
    pub outer_roundness: AnimatableValue<f32>,
    /// Star kind only.
    pub inner_radius: Option<AnimatableValue<f32>>,
    pub inner_roundness: Option<AnimatableValue<f32>>,
}

#[derive(Debug, Clone)]
pub struct TrimModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub start: AnimatableValue<f32>,
    pub end: AnimatableValue<f32>,
    pub offset: AnimatableValue<f32>,
    pub mode: TrimMode,
}

#[derive(Debug, Clone)]
pub struct MergePathsModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub mode: MergeMode,
}

#[derive(Debug, Clone)]
pub struct RepeaterModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub copies: AnimatableValue<f32>,
    pub offset: AnimatableValue<f32>,
    pub transform: AnimatableTransform,
    pub start_opacity: AnimatableValue<f32>,
    pub end_opacity: AnimatableValue<f32>,
}

#[derive(Debug, Clone)]
pub struct TransformGroupModel {
    pub name: Option<String>,
    pub hidden: bool,
    pub transform: AnimatableTransform,
}

#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub id: String,
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub directory: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Font {
    pub name: String,
    pub family: String,
    pub style: String,
    pub ascent: f32,
}

/// A pre-exported glyph outline.
#[derive(Debug, Clone)]
pub struct FontCharacter {
    pub character: String,
    pub family: String,
    pub style: String,
    pub size: f32,
    pub width: f32,
    pub shapes: Vec<ContentModel>,
}

impl FontCharacter {
    /// Lookup key: glyphs are unique per character, family, and style.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.character, self.family, self.style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parse_and_order() {
        assert_eq!(Version::parse("5.7.4"), Some(Version::new(5, 7, 4)));
        assert_eq!(Version::parse("4.8"), Some(Version::new(4, 8, 0)));
        assert_eq!(Version::parse(""), None);
        assert!(Version::new(4, 4, 0) < Version::MIN_SUPPORTED);
        assert!(Version::new(4, 5, 0) >= Version::MIN_SUPPORTED);
        assert!(Version::new(5, 0, 0) > Version::MIN_SUPPORTED);
    }

    #[test]
    fn composition_duration_in_seconds() {
        let comp = Composition {
            frame_range: FrameRange::new(0.0, 90.0),
            frame_rate: 30.0,
            ..Composition::default()
        };
        assert_eq!(comp.duration(), 3.0);
    }

    #[test]
    fn character_key_concatenates_identity() {
        let glyph = FontCharacter {
            character: "a".into(),
            family: "Inter".into(),
            style: "Bold".into(),
            size: 36.0,
            width: 12.0,
            shapes: Vec::new(),
        };
        assert_eq!(glyph.key(), "aInterBold");
    }
}
