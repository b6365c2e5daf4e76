//! Runtime animation tree: per-property timelines arranged in the layer and
//! content hierarchy of a composition.
//!
//! The compiled [`Composition`] stays immutable and shareable; this tree
//! owns the playback state. Precomposition layers are instantiated per
//! referencing layer, so two instances of one precomp animate independently.

use crate::animatable::AnimatablePosition;
use crate::keypath::{KeyPath, CONTAINER};
use crate::model::{AnimatableTransform, Composition, ContentModel, Layer, LayerKind};
use crate::timeline::{SplitPointTimeline, Timeline, ValueCallback};
use crate::value::{Color, DocumentText, GradientColor, Scale, ShapeData, Tween};
use glam::Vec2;
use std::any::Any;

/// Addressable property of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    AnchorPoint,
    Position,
    Scale,
    Rotation,
    Skew,
    SkewAngle,
    Opacity,
    Visibility,
    TimeRemap,
    Color,
    StrokeColor,
    StrokeWidth,
    GradientColor,
    StartPoint,
    EndPoint,
    Path,
    Size,
    CornerRadius,
    Points,
    OuterRadius,
    OuterRoundness,
    InnerRadius,
    InnerRoundness,
    TrimStart,
    TrimEnd,
    TrimOffset,
    Copies,
    CopyOffset,
    StartOpacity,
    EndOpacity,
    MaskPath,
    MaskOpacity,
    TextDocument,
}

enum Channel {
    Float(Timeline<f32>),
    Int(Timeline<i32>),
    Point(Timeline<Vec2>),
    SplitPoint(SplitPointTimeline),
    Scale(Timeline<Scale>),
    Color(Timeline<Color>),
    Gradient(Timeline<GradientColor>),
    Shape(Timeline<ShapeData>),
    Text(Timeline<DocumentText>),
}

impl Channel {
    fn set_progress(&mut self, progress: f32) -> bool {
        match self {
            Channel::Float(t) => t.set_progress(progress),
            Channel::Int(t) => t.set_progress(progress),
            Channel::Point(t) => t.set_progress(progress),
            Channel::SplitPoint(t) => t.set_progress(progress),
            Channel::Scale(t) => t.set_progress(progress),
            Channel::Color(t) => t.set_progress(progress),
            Channel::Gradient(t) => t.set_progress(progress),
            Channel::Shape(t) => t.set_progress(progress),
            Channel::Text(t) => t.set_progress(progress),
        }
    }

    /// Installs a type-erased callback; fails when the value type does not
    /// match the channel. A split position accepts a scalar callback applied
    /// to both of its sub-channels.
    fn set_callback_any(&mut self, callback: &dyn Any) -> bool {
        fn install<T: Tween>(timeline: &mut Timeline<T>, callback: &dyn Any) -> bool
        where
            T: 'static,
        {
            match callback.downcast_ref::<ValueCallback<T>>() {
                Some(cb) => {
                    timeline.set_callback(Some(cb.clone()));
                    true
                }
                None => false,
            }
        }
        match self {
            Channel::Float(t) => install(t, callback),
            Channel::Int(t) => install(t, callback),
            Channel::Point(t) => install(t, callback),
            Channel::SplitPoint(t) => {
                let x = install(t.x(), callback);
                let y = install(t.y(), callback);
                x && y
            }
            Channel::Scale(t) => install(t, callback),
            Channel::Color(t) => install(t, callback),
            Channel::Gradient(t) => install(t, callback),
            Channel::Shape(t) => install(t, callback),
            Channel::Text(t) => install(t, callback),
        }
    }

    fn value_as<T: Clone + 'static>(&self) -> Option<T> {
        let any: &dyn Any = match self {
            Channel::Float(t) => t.value(),
            Channel::Int(t) => t.value(),
            Channel::Point(t) => t.value(),
            Channel::SplitPoint(t) => {
                let v = t.value();
                return (&v as &dyn Any).downcast_ref::<T>().cloned();
            }
            Channel::Scale(t) => t.value(),
            Channel::Color(t) => t.value(),
            Channel::Gradient(t) => t.value(),
            Channel::Shape(t) => t.value(),
            Channel::Text(t) => t.value(),
        };
        any.downcast_ref::<T>().cloned()
    }
}

struct Node {
    name: String,
    properties: Vec<(Property, Channel)>,
    children: Vec<Node>,
}

impl Node {
    fn set_progress(&mut self, progress: f32) -> bool {
        let mut changed = false;
        for (_, channel) in &mut self.properties {
            changed |= channel.set_progress(progress);
        }
        for child in &mut self.children {
            changed |= child.set_progress(progress);
        }
        changed
    }

    fn resolve_into(
        &self,
        pattern: &KeyPath,
        depth: usize,
        partial: &KeyPath,
        acc: &mut Vec<KeyPath>,
    ) {
        if !pattern.matches(&self.name, depth) {
            return;
        }
        let extended;
        let partial = if self.name == CONTAINER {
            partial
        } else {
            extended = partial.extended(&self.name);
            if pattern.fully_resolves_to(&self.name, depth) {
                acc.push(extended.clone());
            }
            &extended
        };
        if pattern.propagate_to_children(&self.name, depth) {
            let depth = depth + pattern.increment_depth_by(&self.name, depth);
            for child in &self.children {
                child.resolve_into(pattern, depth, partial, acc);
            }
        }
    }

    fn collect_into<'a>(&'a self, pattern: &KeyPath, depth: usize, acc: &mut Vec<&'a Node>) {
        if !pattern.matches(&self.name, depth) {
            return;
        }
        if self.name != CONTAINER && pattern.fully_resolves_to(&self.name, depth) {
            acc.push(self);
        }
        if pattern.propagate_to_children(&self.name, depth) {
            let depth = depth + pattern.increment_depth_by(&self.name, depth);
            for child in &self.children {
                child.collect_into(pattern, depth, acc);
            }
        }
    }

    fn override_into(
        &mut self,
        pattern: &KeyPath,
        depth: usize,
        property: Property,
        callback: &dyn Any,
    ) -> usize {
        if !pattern.matches(&self.name, depth) {
            return 0;
        }
        let mut installed = 0;
        if self.name != CONTAINER && pattern.fully_resolves_to(&self.name, depth) {
            for (prop, channel) in &mut self.properties {
                if *prop == property && channel.set_callback_any(callback) {
                    installed += 1;
                }
            }
        }
        if pattern.propagate_to_children(&self.name, depth) {
            let depth = depth + pattern.increment_depth_by(&self.name, depth);
            for child in &mut self.children {
                installed += child.override_into(pattern, depth, property, callback);
            }
        }
        installed
    }
}

/// Playable instance of a composition.
pub struct AnimationTree {
    root: Node,
    progress: f32,
}

impl AnimationTree {
    pub fn new(composition: &Composition) -> Self {
        let mut builder = TreeBuilder {
            composition,
            precomp_stack: Vec::new(),
        };
        let children = composition
            .layers
            .iter()
            .map(|layer| builder.layer_node(layer))
            .collect();
        AnimationTree {
            root: Node {
                name: CONTAINER.to_string(),
                properties: Vec::new(),
                children,
            },
            progress: -1.0,
        }
    }

    pub fn progress(&self) -> f32 {
        self.progress.max(0.0)
    }

    /// Drives every timeline in the tree. Returns whether any value changed.
    pub fn set_progress(&mut self, progress: f32) -> bool {
        let clamped = progress.clamp(0.0, 1.0);
        if clamped == self.progress {
            return false;
        }
        self.progress = clamped;
        self.root.set_progress(clamped)
    }

    /// Expands a (possibly wildcarded) key path into the concrete paths it
    /// matches in this tree, in depth-first document order.
    pub fn resolve(&self, pattern: &KeyPath) -> Vec<KeyPath> {
        let mut acc = Vec::new();
        let empty = KeyPath::new(Vec::<String>::new());
        self.root.resolve_into(pattern, 0, &empty, &mut acc);
        acc
    }

    /// Installs `callback` on `property` of every node the pattern resolves
    /// to. Returns the number of timelines the callback landed on; zero
    /// means the path matched nothing with that property and value type.
    pub fn add_override<T>(
        &mut self,
        pattern: &KeyPath,
        property: Property,
        callback: ValueCallback<T>,
    ) -> usize
    where
        T: Tween + 'static,
    {
        let installed = self
            .root
            .override_into(pattern, 0, property, &callback as &dyn Any);
        if installed == 0 {
            tracing::warn!(%pattern, ?property, "override matched no properties");
        }
        installed
    }

    /// Reads the current value of `property` on the first node the pattern
    /// resolves to, if its value type is `T`.
    pub fn value<T>(&self, pattern: &KeyPath, property: Property) -> Option<T>
    where
        T: Clone + 'static,
    {
        let mut nodes = Vec::new();
        self.root.collect_into(pattern, 0, &mut nodes);
        nodes.iter().find_map(|node| {
            node.properties
                .iter()
                .find(|(prop, _)| *prop == property)
                .and_then(|(_, channel)| channel.value_as::<T>())
        })
    }
}

struct TreeBuilder<'a> {
    composition: &'a Composition,
    precomp_stack: Vec<String>,
}

impl TreeBuilder<'_> {
    fn layer_node(&mut self, layer: &Layer) -> Node {
        let mut properties = transform_channels(&layer.transform);
        properties.push((
            Property::Visibility,
            Channel::Float(Timeline::new(layer.visibility.clone())),
        ));
        if let Some(tm) = &layer.time_remap {
            properties.push((Property::TimeRemap, Channel::Float(Timeline::new(tm.clone()))));
        }
        if let Some(text) = &layer.text {
            properties.push((
                Property::TextDocument,
                Channel::Text(Timeline::new(text.clone())),
            ));
        }

        let mut children: Vec<Node> = layer
            .masks
            .iter()
            .map(|mask| Node {
                name: CONTAINER.to_string(),
                properties: vec![
                    (Property::MaskPath, Channel::Shape(Timeline::new(mask.path.clone()))),
                    (
                        Property::MaskOpacity,
                        Channel::Float(Timeline::new(mask.opacity.clone())),
                    ),
                ],
                children: Vec::new(),
            })
            .collect();

        children.extend(layer.contents.iter().map(|c| self.content_node(c)));

        if layer.kind == LayerKind::PreComp {
            if let Some(ref_id) = &layer.ref_id {
                if self.precomp_stack.iter().any(|id| id == ref_id) {
                    tracing::warn!(ref_id, "precomposition references itself; skipping");
                } else if let Some(layers) = self.composition.precomp(ref_id) {
                    self.precomp_stack.push(ref_id.clone());
                    children.extend(layers.iter().map(|l| self.layer_node(l)));
                    self.precomp_stack.pop();
                }
            }
        }

        Node {
            name: name_or_container(layer.name.as_deref()),
            properties,
            children,
        }
    }

    fn content_node(&mut self, content: &ContentModel) -> Node {
        let name = name_or_container(content.name());
        let (properties, children) = match content {
            ContentModel::Group(m) => (
                Vec::new(),
                m.contents.iter().map(|c| self.content_node(c)).collect(),
            ),
            ContentModel::Path(m) => (
                vec![(Property::Path, Channel::Shape(Timeline::new(m.shape.clone())))],
                Vec::new(),
            ),
            ContentModel::Fill(m) => (
                vec![
                    (Property::Color, Channel::Color(Timeline::new(m.color.clone()))),
                    (Property::Opacity, Channel::Float(Timeline::new(m.opacity.clone()))),
                ],
                Vec::new(),
            ),
            ContentModel::Stroke(m) => (
                vec![
                    (
                        Property::StrokeColor,
                        Channel::Color(Timeline::new(m.color.clone())),
                    ),
                    (
                        Property::StrokeWidth,
                        Channel::Float(Timeline::new(m.width.clone())),
                    ),
                    (Property::Opacity, Channel::Float(Timeline::new(m.opacity.clone()))),
                ],
                Vec::new(),
            ),
            ContentModel::GradientFill(m) => (
                vec![
                    (
                        Property::GradientColor,
                        Channel::Gradient(Timeline::new(m.stops.clone())),
                    ),
                    (
                        Property::StartPoint,
                        Channel::Point(Timeline::new(m.start_point.clone())),
                    ),
                    (
                        Property::EndPoint,
                        Channel::Point(Timeline::new(m.end_point.clone())),
                    ),
                    (Property::Opacity, Channel::Float(Timeline::new(m.opacity.clone()))),
                ],
                Vec::new(),
            ),
            ContentModel::GradientStroke(m) => (
                vec![
                    (
                        Property::GradientColor,
                        Channel::Gradient(Timeline::new(m.stops.clone())),
                    ),
                    (
                        Property::StartPoint,
                        Channel::Point(Timeline::new(m.start_point.clone())),
                    ),
                    (
                        Property::EndPoint,
                        Channel::Point(Timeline::new(m.end_point.clone())),
                    ),
                    (
                        Property::StrokeWidth,
                        Channel::Float(Timeline::new(m.width.clone())),
                    ),
                    (Property::Opacity, Channel::Float(Timeline::new(m.opacity.clone()))),
                ],
                Vec::new(),
            ),
            ContentModel::Ellipse(m) => (
                vec![
                    (
                        Property::Position,
                        Channel::Point(Timeline::new(m.position.clone())),
                    ),
                    (Property::Size, Channel::Point(Timeline::new(m.size.clone()))),
                ],
                Vec::new(),
            ),
            ContentModel::Rectangle(m) => (
                vec![
                    (
                        Property::Position,
                        Channel::Point(Timeline::new(m.position.clone())),
                    ),
                    (Property::Size, Channel::Point(Timeline::new(m.size.clone()))),
                    (
                        Property::CornerRadius,
                        Channel::Float(Timeline::new(m.corner_radius.clone())),
                    ),
                ],
                Vec::new(),
            ),
            ContentModel::Polystar(m) => {
                let mut properties = vec![
                    (Property::Points, Channel::Float(Timeline::new(m.points.clone()))),
                    (Property::Position, position_channel(&m.position)),
                    (
                        Property::Rotation,
                        Channel::Float(Timeline::new(m.rotation.clone())),
                    ),
                    (
                        Property::OuterRadius,
                        Channel::Float(Timeline::new(m.outer_radius.clone())),
                    ),
                    (
                        Property::OuterRoundness,
                        Channel::Float(Timeline::new(m.outer_roundness.clone())),
                    ),
                ];
                if let Some(ir) = &m.inner_radius {
                    properties.push((
                        Property::InnerRadius,
                        Channel::Float(Timeline::new(ir.clone())),
                    ));
                }
                if let Some(is) = &m.inner_roundness {
                    properties.push((
                        Property::InnerRoundness,
                        Channel::Float(Timeline::new(is.clone())),
                    ));
                }
                (properties, Vec::new())
            }
            ContentModel::Trim(m) => (
                vec![
                    (Property::TrimStart, Channel::Float(Timeline::new(m.start.clone()))),
                    (Property::TrimEnd, Channel::Float(Timeline::new(m.end.clone()))),
                    (
                        Property::TrimOffset,
                        Channel::Float(Timeline::new(m.offset.clone())),
                    ),
                ],
                Vec::new(),
            ),
            ContentModel::MergePaths(_) => (Vec::new(), Vec::new()),
            ContentModel::Repeater(m) => {
                let mut properties = vec![
                    (Property::Copies, Channel::Float(Timeline::new(m.copies.clone()))),
                    (
                        Property::CopyOffset,
                        Channel::Float(Timeline::new(m.offset.clone())),
                    ),
                    (
                        Property::StartOpacity,
                        Channel::Float(Timeline::new(m.start_opacity.clone())),
                    ),
                    (
                        Property::EndOpacity,
                        Channel::Float(Timeline::new(m.end_opacity.clone())),
                    ),
                ];
                properties.extend(transform_channels(&m.transform));
                (properties, Vec::new())
            }
            ContentModel::TransformGroup(m) => (transform_channels(&m.transform), Vec::new()),
        };
        Node {
            name,
            properties,
            children,
        }
    }
}

fn name_or_container(name: Option<&str>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => CONTAINER.to_string(),
    }
}

fn position_channel(position: &AnimatablePosition) -> Channel {
    match position {
        AnimatablePosition::Unified(p) => Channel::Point(Timeline::new(p.clone())),
        AnimatablePosition::Split { x, y } => {
            Channel::SplitPoint(SplitPointTimeline::new(x.clone(), y.clone()))
        }
    }
}

fn transform_channels(t: &AnimatableTransform) -> Vec<(Property, Channel)> {
    vec![
        (
            Property::AnchorPoint,
            Channel::Point(Timeline::new(t.anchor_point.clone())),
        ),
        (Property::Position, position_channel(&t.position)),
        (Property::Scale, Channel::Scale(Timeline::new(t.scale.clone()))),
        (Property::Rotation, Channel::Float(Timeline::new(t.rotation.clone()))),
        (Property::Skew, Channel::Float(Timeline::new(t.skew.clone()))),
        (Property::SkewAngle, Channel::Float(Timeline::new(t.skew_angle.clone()))),
        (Property::Opacity, Channel::Int(Timeline::new(t.opacity.clone()))),
    ]
}
