//! Playback engine for exported vector motion graphics documents.
//!
//! The pipeline: `kinema-data` deserializes the interchange JSON into raw
//! records, [`parser`] compiles those into an immutable [`model::Composition`],
//! and [`tree::AnimationTree`] instantiates it into a progress-driven tree of
//! [`timeline::Timeline`]s that can be scrubbed, observed, and overridden
//! through [`keypath::KeyPath`] addresses.

pub mod animatable;
pub mod cache;
pub mod ease;
pub mod error;
pub mod keyframe;
pub mod keypath;
pub mod model;
pub mod morph;
pub mod parser;
pub mod timeline;
pub mod tree;
pub mod value;

pub use cache::{CompositionCache, LruCache, Retention};
pub use error::{ParseError, TopologyError};
pub use keyframe::{AnimatableValue, FrameRange, Keyframe};
pub use keypath::KeyPath;
pub use model::Composition;
pub use parser::{parse_slice, parse_str};
pub use timeline::{value_callback, FrameInfo, SplitPointTimeline, Timeline, ValueCallback};
pub use tree::{AnimationTree, Property};
pub use value::{Color, DocumentText, GradientColor, Scale, ShapeData, Tween};
