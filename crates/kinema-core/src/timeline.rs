//! Progress-driven evaluation of a single animated property.

use crate::keyframe::{AnimatableValue, Keyframe};
use crate::value::Tween;
use glam::Vec2;
use std::cell::RefCell;
use std::rc::Rc;

/// Snapshot handed to an override callback for one evaluation.
pub struct FrameInfo<'a, T> {
    pub start_frame: f32,
    pub end_frame: Option<f32>,
    pub start_value: &'a T,
    pub end_value: &'a T,
    pub linear_progress: f32,
    pub eased_progress: f32,
    pub overall_progress: f32,
}

/// Override installed through the keypath resolver. Returning `None` keeps
/// the computed value. Shared (`Rc`) because one callback may be installed
/// on every timeline a keypath resolves to; timelines live on a single
/// animation thread.
pub type ValueCallback<T> = Rc<RefCell<dyn FnMut(&FrameInfo<'_, T>) -> Option<T>>>;

pub fn value_callback<T, F>(f: F) -> ValueCallback<T>
where
    F: FnMut(&FrameInfo<'_, T>) -> Option<T> + 'static,
{
    Rc::new(RefCell::new(f))
}

/// Change notification, delivered synchronously from `set_progress`. A
/// listener must not drive the same timeline's progress reentrantly.
pub type ChangeListener = Box<dyn FnMut()>;

enum Frames<T> {
    /// Static variant: ignores progress, never notifies.
    Constant(T),
    Keyframed { frames: Vec<Keyframe<T>>, cached: usize },
}

/// Maps overall progress to an interpolated value for one property.
///
/// The evaluated value lives in a scratch slot owned by the timeline;
/// references returned by [`Timeline::value`] are valid until the next
/// `set_progress` call.
pub struct Timeline<T: Tween> {
    frames: Frames<T>,
    progress: f32,
    current: T,
    callback: Option<ValueCallback<T>>,
    listeners: Vec<ChangeListener>,
}

impl<T: Tween> Timeline<T> {
    pub fn new(value: AnimatableValue<T>) -> Self {
        match value {
            AnimatableValue::Static(value) => Timeline::constant(value),
            AnimatableValue::Keyframes(frames) => match frames.first() {
                Some(first) => {
                    let current = first.start_value.clone();
                    Timeline {
                        frames: Frames::Keyframed { frames, cached: 0 },
                        progress: -1.0,
                        current,
                        callback: None,
                        listeners: Vec::new(),
                    }
                }
                None => Timeline::constant(T::default()),
            },
        }
    }

    pub fn constant(value: T) -> Self {
        Timeline {
            current: value.clone(),
            frames: Frames::Constant(value),
            progress: -1.0,
            callback: None,
            listeners: Vec::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self.frames, Frames::Constant(_))
    }

    pub fn progress(&self) -> f32 {
        self.progress.max(0.0)
    }

    /// The value for the current progress. Valid until the next evaluation.
    pub fn value(&self) -> &T {
        &self.current
    }

    pub fn add_listener(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    /// Installs (or clears) the override callback and re-evaluates so the
    /// current value reflects it immediately.
    pub fn set_callback(&mut self, callback: Option<ValueCallback<T>>) {
        self.callback = callback;
        match &self.frames {
            Frames::Constant(base) => {
                if let Some(cb) = self.callback.clone() {
                    let info = FrameInfo {
                        start_frame: 0.0,
                        end_frame: None,
                        start_value: base,
                        end_value: base,
                        linear_progress: 0.0,
                        eased_progress: 0.0,
                        overall_progress: self.progress.max(0.0),
                    };
                    if let Some(overridden) = (cb.borrow_mut())(&info) {
                        self.current = overridden;
                    }
                } else {
                    self.current = base.clone();
                }
            }
            Frames::Keyframed { .. } => {
                if self.progress >= 0.0 {
                    self.evaluate();
                }
            }
        }
    }

    /// Clamps to `[0, 1]` and then into the keyframe span, evaluates, and
    /// notifies listeners. Setting the same clamped progress twice is a
    /// no-op and fires no notification.
    pub fn set_progress(&mut self, progress: f32) -> bool {
        let clamped = match &self.frames {
            Frames::Constant(_) => return false,
            Frames::Keyframed { frames, .. } => {
                // Keyframe progress is unclamped so content spanning past the
                // composition end keeps its real span; the clamp into [0, 1]
                // happens here instead.
                let lo = frames[0].start_progress().clamp(0.0, 1.0);
                let hi = frames[frames.len() - 1]
                    .end_progress()
                    .clamp(0.0, 1.0)
                    .max(lo);
                progress.clamp(0.0, 1.0).max(lo).min(hi)
            }
        };
        if clamped == self.progress {
            return false;
        }
        self.progress = clamped;
        self.evaluate();
        for listener in &mut self.listeners {
            listener();
        }
        true
    }

    fn evaluate(&mut self) {
        let overall = self.progress;
        let Frames::Keyframed { frames, cached } = &mut self.frames else {
            return;
        };
        let len = frames.len();

        // Playback is almost always monotonic: the keyframe resolved last
        // time usually still contains the new progress. Otherwise scan from
        // the back for the containing keyframe.
        let mut idx = *cached;
        if idx >= len || !frames[idx].contains_progress(overall, idx + 1 == len) {
            idx = len - 1;
            while idx > 0 && frames[idx].start_progress() > overall {
                idx -= 1;
            }
            *cached = idx;
        }

        let kf = &frames[idx];
        let span = kf.end_progress() - kf.start_progress();
        let linear = if kf.is_hold() || span <= 0.0 {
            0.0
        } else {
            ((overall - kf.start_progress()) / span).clamp(0.0, 1.0)
        };
        let eased = match &kf.interpolator {
            Some(interpolator) => interpolator.ease(linear),
            None => 0.0,
        };
        let end_value = kf.end_value.as_ref().unwrap_or(&kf.start_value);
        T::tween_into(&kf.start_value, end_value, eased, &mut self.current);

        if let Some(callback) = self.callback.clone() {
            let info = FrameInfo {
                start_frame: kf.start_frame,
                end_frame: kf.end_frame,
                start_value: &kf.start_value,
                end_value,
                linear_progress: linear,
                eased_progress: eased,
                overall_progress: overall,
            };
            if let Some(overridden) = (callback.borrow_mut())(&info) {
                self.current = overridden;
            }
        }
    }
}

/// Point property authored as two independently keyframed scalar channels.
/// Progress fans out to both children; the recombined point is cached here.
pub struct SplitPointTimeline {
    x: Timeline<f32>,
    y: Timeline<f32>,
    current: Vec2,
}

impl SplitPointTimeline {
    pub fn new(x: AnimatableValue<f32>, y: AnimatableValue<f32>) -> Self {
        let x = Timeline::new(x);
        let y = Timeline::new(y);
        let current = Vec2::new(*x.value(), *y.value());
        SplitPointTimeline { x, y, current }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        let changed_x = self.x.set_progress(progress);
        let changed_y = self.y.set_progress(progress);
        if changed_x || changed_y {
            self.current = Vec2::new(*self.x.value(), *self.y.value());
        }
        changed_x || changed_y
    }

    pub fn value(&self) -> Vec2 {
        self.current
    }

    pub fn x(&mut self) -> &mut Timeline<f32> {
        &mut self.x
    }

    pub fn y(&mut self) -> &mut Timeline<f32> {
        &mut self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ease::Interpolator;
    use crate::keyframe::FrameRange;
    use std::cell::Cell;

    fn two_segment_timeline() -> Timeline<f32> {
        let range = FrameRange::new(0.0, 100.0);
        let frames = vec![
            Keyframe::new(
                range,
                0.0,
                Some(10.0),
                Some(Interpolator::Linear),
                0.0,
                Some(50.0),
            ),
            Keyframe::new(range, 10.0, Some(20.0), Some(Interpolator::Linear), 50.0, None),
        ];
        Timeline::new(AnimatableValue::Keyframes(frames))
    }

    #[test]
    fn evaluates_linear_segments() {
        let mut timeline = two_segment_timeline();
        timeline.set_progress(0.25);
        assert_eq!(*timeline.value(), 5.0);
        timeline.set_progress(0.75);
        assert_eq!(*timeline.value(), 15.0);
        timeline.set_progress(1.0);
        assert_eq!(*timeline.value(), 20.0);
    }

    #[test]
    fn backward_scan_handles_scrubbing() {
        let mut timeline = two_segment_timeline();
        timeline.set_progress(0.9);
        timeline.set_progress(0.1);
        assert_eq!(*timeline.value(), 2.0);
    }

    #[test]
    fn set_progress_is_idempotent_per_notification() {
        let mut timeline = two_segment_timeline();
        let fired = Rc::new(Cell::new(0));
        let observed = fired.clone();
        timeline.add_listener(Box::new(move || observed.set(observed.get() + 1)));

        assert!(timeline.set_progress(0.5));
        assert!(!timeline.set_progress(0.5));
        assert_eq!(fired.get(), 1);

        // Values outside the clamp collapse to the same progress.
        assert!(timeline.set_progress(2.0));
        assert!(!timeline.set_progress(1.0));
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn hold_keyframes_snap() {
        let range = FrameRange::new(0.0, 100.0);
        let frames = vec![
            Keyframe::hold(range, 1.0f32, 0.0, Some(50.0)),
            Keyframe::hold(range, 9.0f32, 50.0, None),
        ];
        let mut timeline = Timeline::new(AnimatableValue::Keyframes(frames));
        timeline.set_progress(0.49);
        assert_eq!(*timeline.value(), 1.0);
        timeline.set_progress(0.5);
        assert_eq!(*timeline.value(), 9.0);
    }

    #[test]
    fn static_timeline_never_notifies() {
        let mut timeline = Timeline::constant(3.0f32);
        let fired = Rc::new(Cell::new(0));
        let observed = fired.clone();
        timeline.add_listener(Box::new(move || observed.set(observed.get() + 1)));
        assert!(!timeline.set_progress(0.5));
        assert!(!timeline.set_progress(1.0));
        assert_eq!(fired.get(), 0);
        assert_eq!(*timeline.value(), 3.0);
    }

    #[test]
    fn callback_supersedes_computed_value() {
        let mut timeline = two_segment_timeline();
        timeline.set_callback(Some(value_callback(|info: &FrameInfo<'_, f32>| {
            if info.overall_progress > 0.5 {
                Some(99.0)
            } else {
                None
            }
        })));
        timeline.set_progress(0.25);
        assert_eq!(*timeline.value(), 5.0);
        timeline.set_progress(0.75);
        assert_eq!(*timeline.value(), 99.0);
    }

    #[test]
    fn progress_clamps_to_keyframe_span() {
        let range = FrameRange::new(0.0, 100.0);
        // Property starts animating at frame 40.
        let frames = vec![Keyframe::new(
            range,
            0.0f32,
            Some(10.0),
            Some(Interpolator::Linear),
            40.0,
            None,
        )];
        let mut timeline = Timeline::new(AnimatableValue::Keyframes(frames));
        timeline.set_progress(0.0);
        assert_eq!(timeline.progress(), 0.4);
        assert_eq!(*timeline.value(), 0.0);
    }

    #[test]
    fn transition_past_composition_end_reads_mid_span_at_the_final_frame() {
        let range = FrameRange::new(0.0, 60.0);
        // Authored 0 -> 10 over frames 0..120 inside a 60-frame composition:
        // the final composition frame sits halfway through the transition.
        let frames = vec![Keyframe::new(
            range,
            0.0f32,
            Some(10.0),
            Some(Interpolator::Linear),
            0.0,
            Some(120.0),
        )];
        let mut timeline = Timeline::new(AnimatableValue::Keyframes(frames));
        timeline.set_progress(1.0);
        assert_eq!(*timeline.value(), 5.0);
    }

    #[test]
    fn split_point_recombines_channels() {
        let range = FrameRange::new(0.0, 100.0);
        let x = AnimatableValue::Keyframes(vec![Keyframe::new(
            range,
            0.0f32,
            Some(100.0),
            Some(Interpolator::Linear),
            0.0,
            None,
        )]);
        let y = AnimatableValue::Static(25.0f32);
        let mut point = SplitPointTimeline::new(x, y);
        assert!(point.set_progress(0.5));
        assert_eq!(point.value(), Vec2::new(50.0, 25.0));
    }
}
