//! Touch gesture recognition.
//!
//! The [`GestureTracker`] consumes raw touch events, classifies them as a drag
//! along the stack, a swipe across it, an overshoot past either end, a fling or
//! a click, and reports the outcome to a [`DragCallback`]. It does not know
//! anything about the layout; the callback translates drags into positions.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::DragThresholds;
use crate::model::ItemKey;

/// Samples older than this, relative to the latest one, are ignored when
/// estimating a velocity.
const VELOCITY_WINDOW_MS: u64 = 100;

/// Maximum number of samples kept by a [`VelocityTracker`].
const MAX_VELOCITY_SAMPLES: usize = 20;

/// Multiple of the drag threshold an orthogonal movement must exceed to be
/// recognized as a swipe.
const SWIPE_THRESHOLD_FACTOR: f32 = 4.0;

/// Fraction of the release velocity (in px/s) that a fling travels.
const FLING_DISTANCE_FACTOR: f32 = 0.25;

/// Classification of the current gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragState {
    #[default]
    None,
    /// Cards move toward the start of the dragging axis.
    DragToStart,
    /// Cards move toward the end of the dragging axis.
    DragToEnd,
    /// Dragged past the start; the stack translates and tilts.
    OvershootStart,
    /// Dragged past the end; the stack tilts.
    OvershootEnd,
    /// A card is swiped along the orthogonal axis.
    Swipe,
}

impl DragState {
    pub fn is_overshooting(self) -> bool {
        matches!(self, DragState::OvershootStart | DragState::OvershootEnd)
    }
}

/// Result of applying a drag to the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overshoot {
    #[default]
    None,
    /// The stack cannot move further toward the start.
    Start,
    /// The stack cannot move further toward the end.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchAction {
    Down,
    Move,
    Up,
    Cancel,
}

/// A raw touch event in container coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    pub pointer_id: u32,
    pub action: TouchAction,
    pub x: f32,
    pub y: f32,
    /// Event time in milliseconds.
    pub time_ms: u64,
}

impl TouchEvent {
    pub fn new(pointer_id: u32, action: TouchAction, x: f32, y: f32, time_ms: u64) -> Self {
        Self {
            pointer_id,
            action,
            x,
            y,
            time_ms,
        }
    }
}

/// Tracks the distance of a one-dimensional drag relative to the point where
/// it exceeded a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DragHelper {
    threshold: f32,
    start: Option<f32>,
    threshold_position: Option<f32>,
    current: f32,
}

impl DragHelper {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.max(0.0),
            start: None,
            threshold_position: None,
            current: 0.0,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Forget the current drag. The next update starts a new one.
    pub fn reset(&mut self) {
        self.start = None;
        self.threshold_position = None;
        self.current = 0.0;
    }

    pub fn is_reset(&self) -> bool {
        self.start.is_none()
    }

    pub fn update(&mut self, position: f32) {
        let start = *self.start.get_or_insert(position);
        self.current = position;
        if self.threshold_position.is_none() && (position - start).abs() > self.threshold {
            self.threshold_position = Some(start + self.threshold.copysign(position - start));
        }
    }

    pub fn has_threshold_been_reached(&self) -> bool {
        self.threshold_position.is_some()
    }

    /// Distance traveled since the threshold was exceeded, 0 before that.
    pub fn drag_distance(&self) -> f32 {
        self.threshold_position
            .map_or(0.0, |position| self.current - position)
    }

    /// Distance traveled since the first update.
    pub fn raw_distance(&self) -> f32 {
        self.start.map_or(0.0, |start| self.current - start)
    }

    /// Whether the drag went far enough to count as a swipe.
    pub fn is_swipe_threshold_reached(&self) -> bool {
        self.raw_distance().abs() > self.threshold * SWIPE_THRESHOLD_FACTOR
    }
}

/// Estimates the velocity of a pointer along one axis, in pixels per second.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    samples: VecDeque<(u64, f32)>,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn add(&mut self, time_ms: u64, position: f32) {
        if self.samples.len() == MAX_VELOCITY_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back((time_ms, position));
    }

    /// Least-squares slope over the recent samples.
    pub fn velocity(&self) -> f32 {
        let Some(&(latest, _)) = self.samples.back() else {
            return 0.0;
        };
        let recent: Vec<(f64, f64)> = self
            .samples
            .iter()
            .filter(|(time, _)| latest.saturating_sub(*time) <= VELOCITY_WINDOW_MS)
            .map(|&(time, position)| {
                (
                    (time as f64 - latest as f64) / 1000.0,
                    f64::from(position),
                )
            })
            .collect();
        if recent.len() < 2 {
            return 0.0;
        }

        let n = recent.len() as f64;
        let mean_t = recent.iter().map(|(t, _)| t).sum::<f64>() / n;
        let mean_p = recent.iter().map(|(_, p)| p).sum::<f64>() / n;
        let (covariance, variance) = recent.iter().fold((0.0, 0.0), |(c, v), (t, p)| {
            (c + (t - mean_t) * (p - mean_p), v + (t - mean_t) * (t - mean_t))
        });
        if variance <= f64::EPSILON {
            return 0.0;
        }
        (covariance / variance) as f32
    }
}

/// Receiver of classified gestures.
pub trait DragCallback {
    /// Convert container coordinates into `(dragging, orthogonal)` coordinates.
    fn logical_point(&self, x: f32, y: f32) -> (f32, f32);

    /// The item rendered at a logical point, front-most first.
    fn item_at(&self, dragging: f32, orthogonal: f32) -> Option<ItemKey>;

    fn is_closeable(&self, key: ItemKey) -> bool;

    fn orthogonal_length(&self) -> f32;

    /// A new gesture begins. Running animations must be stopped.
    fn on_gesture_start(&mut self);

    /// Move the stack by `delta` along the dragging axis.
    fn on_drag(&mut self, state: DragState, delta: f32) -> Overshoot;

    fn on_click(&mut self, key: ItemKey);

    /// A card is swiped `distance` pixels along the orthogonal axis.
    fn on_swipe(&mut self, key: ItemKey, distance: f32);

    fn on_swipe_ended(&mut self, key: ItemKey, close: bool, velocity: f32);

    /// The front card is pulled `distance` pixels past the start.
    fn on_start_overshoot(&mut self, distance: f32);

    /// The stack is tilted by `angle` degrees.
    fn on_tilt(&mut self, state: DragState, angle: f32);

    fn on_revert_start_overshoot(&mut self, progress: f32);

    fn on_revert_end_overshoot(&mut self, progress: f32);

    /// Continue the drag by `distance` pixels over `duration_ms`.
    fn on_fling(&mut self, distance: f32, duration_ms: u64);
}

/// State machine classifying touch events into gestures.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    thresholds: DragThresholds,
    state: DragState,
    pointer: Option<u32>,
    touched: Option<ItemKey>,
    drag_helper: DragHelper,
    swipe_helper: DragHelper,
    drag_velocity: VelocityTracker,
    swipe_velocity: VelocityTracker,
    last_drag_distance: f32,
    start_overshoot_threshold: Option<f32>,
    end_overshoot_threshold: Option<f32>,
    overshoot_amount: f32,
}

impl GestureTracker {
    pub fn new(thresholds: DragThresholds) -> Self {
        Self {
            thresholds,
            state: DragState::None,
            pointer: None,
            touched: None,
            drag_helper: DragHelper::new(thresholds.drag_threshold),
            swipe_helper: DragHelper::new(thresholds.drag_threshold),
            drag_velocity: VelocityTracker::new(),
            swipe_velocity: VelocityTracker::new(),
            last_drag_distance: 0.0,
            start_overshoot_threshold: None,
            end_overshoot_threshold: None,
            overshoot_amount: 0.0,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Whether a pointer is down.
    pub fn is_tracking(&self) -> bool {
        self.pointer.is_some()
    }

    /// The item under the pointer when the gesture began.
    pub fn touched(&self) -> Option<ItemKey> {
        self.touched
    }

    pub fn swipe_helper(&self) -> &DragHelper {
        &self.swipe_helper
    }

    pub fn drag_helper(&self) -> &DragHelper {
        &self.drag_helper
    }

    fn reset(&mut self) {
        self.state = DragState::None;
        self.pointer = None;
        self.touched = None;
        self.drag_helper.reset();
        self.swipe_helper.reset();
        self.drag_velocity.clear();
        self.swipe_velocity.clear();
        self.last_drag_distance = 0.0;
        self.start_overshoot_threshold = None;
        self.end_overshoot_threshold = None;
        self.overshoot_amount = 0.0;
    }

    /// Feed a touch event. Returns `true` if the event was consumed.
    pub fn handle(&mut self, event: &TouchEvent, callback: &mut impl DragCallback) -> bool {
        match event.action {
            TouchAction::Down => {
                self.on_down(event, callback);
                true
            }
            _ if self.pointer != Some(event.pointer_id) => {
                trace!("Ignoring event of untracked pointer {}", event.pointer_id);
                false
            }
            TouchAction::Move => {
                self.on_move(event, callback);
                true
            }
            TouchAction::Up => {
                self.on_up(event, callback);
                true
            }
            TouchAction::Cancel => {
                self.on_cancel(callback);
                true
            }
        }
    }

    /// Abandon the current gesture. A swiped card is sent back into place.
    pub fn cancel(&mut self, callback: &mut impl DragCallback) {
        if self.state == DragState::Swipe {
            if let Some(key) = self.touched {
                debug!("Swipe of {} abandoned", key);
                callback.on_swipe_ended(key, false, 0.0);
            }
        }
        self.reset();
    }

    fn on_down(&mut self, event: &TouchEvent, callback: &mut impl DragCallback) {
        if self.pointer.is_some() {
            debug!("Pointer {} restarts the gesture", event.pointer_id);
        }
        self.cancel(callback);
        callback.on_gesture_start();

        let (dragging, orthogonal) = callback.logical_point(event.x, event.y);
        self.pointer = Some(event.pointer_id);
        self.touched = callback.item_at(dragging, orthogonal);
        self.drag_helper.update(dragging);
        self.swipe_helper.update(orthogonal);
        self.drag_velocity.add(event.time_ms, dragging);
        self.swipe_velocity.add(event.time_ms, orthogonal);
        trace!("Gesture started on {:?}", self.touched);
    }

    fn on_move(&mut self, event: &TouchEvent, callback: &mut impl DragCallback) {
        let (dragging, orthogonal) = callback.logical_point(event.x, event.y);
        self.drag_helper.update(dragging);
        self.swipe_helper.update(orthogonal);
        self.drag_velocity.add(event.time_ms, dragging);
        self.swipe_velocity.add(event.time_ms, orthogonal);

        if self.state == DragState::Swipe {
            if let Some(key) = self.touched {
                callback.on_swipe(key, self.swipe_helper.raw_distance());
            }
            return;
        }

        if self.should_start_swipe(&*callback) {
            if let Some(key) = self.touched {
                debug!("Swiping {}", key);
                self.state = DragState::Swipe;
                callback.on_swipe(key, self.swipe_helper.raw_distance());
            }
            return;
        }

        if !self.drag_helper.has_threshold_been_reached() {
            return;
        }

        let distance = self.drag_helper.drag_distance();
        match self.state {
            DragState::OvershootStart => self.overshoot_start(distance, callback),
            DragState::OvershootEnd => self.overshoot_end(distance, callback),
            _ => self.drag(distance, callback),
        }
    }

    fn should_start_swipe(&self, callback: &impl DragCallback) -> bool {
        let Some(key) = self.touched else {
            return false;
        };
        let candidate = match self.state {
            DragState::None => true,
            DragState::DragToStart | DragState::DragToEnd => {
                self.swipe_helper.raw_distance().abs() > self.drag_helper.raw_distance().abs()
            }
            _ => false,
        };
        candidate && self.swipe_helper.is_swipe_threshold_reached() && callback.is_closeable(key)
    }

    fn drag(&mut self, distance: f32, callback: &mut impl DragCallback) {
        let delta = distance - self.last_drag_distance;
        if delta == 0.0 {
            return;
        }
        self.last_drag_distance = distance;
        let direction = if delta < 0.0 {
            DragState::DragToStart
        } else {
            DragState::DragToEnd
        };
        if self.state != direction {
            trace!("Drag direction is now {:?}", direction);
        }
        self.state = direction;

        match (callback.on_drag(direction, delta), direction) {
            (Overshoot::Start, DragState::DragToStart) => {
                debug!("Overshooting at the start");
                self.state = DragState::OvershootStart;
                self.start_overshoot_threshold = Some(distance);
            }
            (Overshoot::End, DragState::DragToEnd) => {
                debug!("Overshooting at the end");
                self.state = DragState::OvershootEnd;
                self.end_overshoot_threshold = Some(distance);
            }
            _ => {}
        }
    }

    fn overshoot_start(&mut self, distance: f32, callback: &mut impl DragCallback) {
        let threshold = self.start_overshoot_threshold.unwrap_or(distance);
        if distance > threshold {
            trace!("Leaving the start overshoot");
            callback.on_start_overshoot(0.0);
            callback.on_tilt(DragState::DragToEnd, 0.0);
            self.leave_overshoot(DragState::DragToEnd);
            return;
        }

        let amount = threshold - distance;
        let max_distance = self.thresholds.max_start_overshoot_distance;
        self.overshoot_amount = amount;
        callback.on_start_overshoot(amount.min(max_distance));
        let excess = (amount - max_distance).max(0.0);
        callback.on_tilt(DragState::OvershootStart, self.tilt_angle(excess));
    }

    fn overshoot_end(&mut self, distance: f32, callback: &mut impl DragCallback) {
        let threshold = self.end_overshoot_threshold.unwrap_or(distance);
        if distance < threshold {
            trace!("Leaving the end overshoot");
            callback.on_tilt(DragState::DragToStart, 0.0);
            self.leave_overshoot(DragState::DragToStart);
            return;
        }

        let amount = distance - threshold;
        self.overshoot_amount = amount;
        callback.on_tilt(DragState::OvershootEnd, self.tilt_angle(amount));
    }

    fn tilt_angle(&self, excess: f32) -> f32 {
        let ratio = (excess / self.thresholds.overshoot_tilt_distance).min(1.0);
        self.thresholds.max_overshoot_angle * ratio
    }

    fn leave_overshoot(&mut self, direction: DragState) {
        self.state = direction;
        self.drag_helper.reset();
        self.last_drag_distance = 0.0;
        self.start_overshoot_threshold = None;
        self.end_overshoot_threshold = None;
        self.overshoot_amount = 0.0;
    }

    fn on_up(&mut self, event: &TouchEvent, callback: &mut impl DragCallback) {
        let (dragging, orthogonal) = callback.logical_point(event.x, event.y);
        self.drag_velocity.add(event.time_ms, dragging);
        self.swipe_velocity.add(event.time_ms, orthogonal);

        match self.state {
            DragState::Swipe => self.finish_swipe(callback),
            DragState::OvershootStart | DragState::OvershootEnd => self.revert_overshoot(callback),
            DragState::DragToStart | DragState::DragToEnd => {
                let velocity = self.drag_velocity.velocity();
                if velocity.abs() >= self.thresholds.min_fling_velocity {
                    let velocity = velocity.clamp(
                        -self.thresholds.max_fling_velocity,
                        self.thresholds.max_fling_velocity,
                    );
                    let distance = FLING_DISTANCE_FACTOR * velocity;
                    let duration_ms = (2.0 * distance.abs() / velocity.abs() * 1000.0).round() as u64;
                    debug!("Fling of {:.1}px over {}ms", distance, duration_ms);
                    callback.on_fling(distance, duration_ms);
                }
            }
            DragState::None => {
                let clicked = !self.drag_helper.has_threshold_been_reached()
                    && !self.swipe_helper.has_threshold_been_reached();
                if let (true, Some(key)) = (clicked, self.touched) {
                    debug!("Click on {}", key);
                    callback.on_click(key);
                }
            }
        }
        self.reset();
    }

    fn on_cancel(&mut self, callback: &mut impl DragCallback) {
        if self.state.is_overshooting() {
            self.revert_overshoot(callback);
        }
        self.cancel(callback);
    }

    fn finish_swipe(&mut self, callback: &mut impl DragCallback) {
        let Some(key) = self.touched else {
            return;
        };
        let velocity = self.swipe_velocity.velocity();
        let displacement = self.swipe_helper.raw_distance();
        let fast = velocity.abs() >= self.thresholds.min_swipe_velocity
            && displacement != 0.0
            && velocity.signum() == displacement.signum();
        let far = displacement.abs() > callback.orthogonal_length() / 4.0;
        let close = fast || far;
        debug!(
            "Swipe of {} ended (displacement {:.1}, velocity {:.1}, close: {})",
            key, displacement, velocity, close
        );
        callback.on_swipe_ended(key, close, velocity);
    }

    fn revert_overshoot(&mut self, callback: &mut impl DragCallback) {
        match self.state {
            DragState::OvershootStart => {
                let total = self.thresholds.max_start_overshoot_distance
                    + self.thresholds.overshoot_tilt_distance;
                let progress = (self.overshoot_amount / total).clamp(0.0, 1.0);
                callback.on_revert_start_overshoot(progress);
            }
            DragState::OvershootEnd => {
                let progress =
                    (self.overshoot_amount / self.thresholds.overshoot_tilt_distance).clamp(0.0, 1.0);
                callback.on_revert_end_overshoot(progress);
            }
            _ => {}
        }
    }
}
