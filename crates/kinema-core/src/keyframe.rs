//! Keyframes and the static-or-keyframed property container.

use crate::ease::Interpolator;
use glam::Vec2;

/// Frame span of the composition a property belongs to. Threaded explicitly
/// through parsing so there is no process-wide timing state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRange {
    pub start: f32,
    pub end: f32,
}

impl FrameRange {
    pub fn new(start: f32, end: f32) -> Self {
        FrameRange { start, end }
    }

    /// Duration in frames; a reversed range degrades to empty.
    pub fn duration(&self) -> f32 {
        (self.end - self.start).max(0.0)
    }

    /// Normalized progress of `frame` inside the range, unclamped.
    pub fn progress_at(&self, frame: f32) -> f32 {
        let duration = self.duration();
        if duration <= 0.0 {
            0.0
        } else {
            (frame - self.start) / duration
        }
    }
}

impl Default for FrameRange {
    fn default() -> Self {
        FrameRange::new(0.0, 0.0)
    }
}

/// One authored value transition. `end_frame` is always the next keyframe's
/// start frame (computed during parsing, never authored); the final keyframe
/// of a property has none and holds to the end of the composition.
#[derive(Debug, Clone)]
pub struct Keyframe<T> {
    pub start_value: T,
    /// Missing end value means the keyframe holds its start value.
    pub end_value: Option<T>,
    pub start_frame: f32,
    pub end_frame: Option<f32>,
    /// `None` marks a hold (discrete) keyframe.
    pub interpolator: Option<Interpolator>,
    /// Spatial tangent hints carried only by path-valued properties.
    pub spatial_out: Option<Vec2>,
    pub spatial_in: Option<Vec2>,
    start_progress: f32,
    end_progress: f32,
}

impl<T> Keyframe<T> {
    pub fn new(
        range: FrameRange,
        start_value: T,
        end_value: Option<T>,
        interpolator: Option<Interpolator>,
        start_frame: f32,
        end_frame: Option<f32>,
    ) -> Self {
        // Unclamped: content may start or end past the composition bounds.
        // Overall progress is clamped at evaluation time instead; collapsing
        // an out-of-range keyframe to the boundary here would shadow the
        // keyframe that actually contains the final frame.
        let start_progress = range.progress_at(start_frame);
        let end_progress = end_frame
            .map(|frame| range.progress_at(frame))
            .unwrap_or(1.0);
        Keyframe {
            start_value,
            end_value,
            start_frame,
            end_frame,
            interpolator,
            spatial_out: None,
            spatial_in: None,
            start_progress,
            end_progress,
        }
    }

    /// A discrete keyframe holding `value` over `[start_frame, end_frame)`.
    pub fn hold(range: FrameRange, value: T, start_frame: f32, end_frame: Option<f32>) -> Self {
        Keyframe::new(range, value, None, None, start_frame, end_frame)
    }

    pub fn with_spatial_tangents(mut self, out: Option<Vec2>, into: Option<Vec2>) -> Self {
        self.spatial_out = out;
        self.spatial_in = into;
        self
    }

    pub fn start_progress(&self) -> f32 {
        self.start_progress
    }

    pub fn end_progress(&self) -> f32 {
        self.end_progress
    }

    pub fn is_hold(&self) -> bool {
        self.interpolator.is_none()
    }

    /// Half-open containment, except the final keyframe of a timeline which
    /// closes the upper bound so progress exactly 1.0 resolves.
    pub fn contains_progress(&self, progress: f32, is_last: bool) -> bool {
        if is_last {
            progress >= self.start_progress && progress <= self.end_progress
        } else {
            progress >= self.start_progress && progress < self.end_progress
        }
    }
}

/// A property value: either a single static value or an ordered, non-empty
/// keyframe sequence sorted by ascending start frame.
#[derive(Debug, Clone)]
pub enum AnimatableValue<T> {
    Static(T),
    Keyframes(Vec<Keyframe<T>>),
}

impl<T: Clone> AnimatableValue<T> {
    /// Wraps keyframes, degrading to a static fallback when the sequence is
    /// empty so timelines never observe an empty frame list.
    pub fn from_keyframes(frames: Vec<Keyframe<T>>, fallback: T) -> Self {
        if frames.is_empty() {
            AnimatableValue::Static(fallback)
        } else {
            AnimatableValue::Keyframes(frames)
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, AnimatableValue::Keyframes(_))
    }

    /// The value at the head of the property.
    pub fn initial(&self) -> Option<&T> {
        match self {
            AnimatableValue::Static(value) => Some(value),
            AnimatableValue::Keyframes(frames) => frames.first().map(|kf| &kf.start_value),
        }
    }
}
