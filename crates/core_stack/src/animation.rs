//! Animation planning and playback.
//!
//! The [`Orchestrator`] turns a logical transition (show, hide, add, remove,
//! relocate, clear, revert) into a [`Plan`]: a batch of [`TweenCommand`]s plus
//! the tags and surfaces that need no animation. The [`Animator`] plays tweens
//! on surfaces and hands back their [`Completion`]s; tags are only updated when
//! a completion is processed, never while a tween is in flight.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::arithmetics::{Arithmetics, Axis};
use crate::config::AnimationDurations;
use crate::layout::{OvershootEffect, Relocation};
use crate::model::{Item, ItemKey, Tag};
use crate::surface::{Surface, SurfaceRecycler};

/// Distance a removed card travels along the orthogonal axis, as a multiple
/// of the axis length.
const REMOVE_DISTANCE_RATIO: f32 = 1.25;

/// Scale of a removed card at the end of its animation, relative to the tab
/// scale.
const REMOVE_SCALE_RATIO: f32 = 0.8;

/// How far a peeking tab enters the container, as a fraction of the axis.
const PEEK_RATIO: f32 = 0.33;

/// Easing curve of a tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolator {
    Linear,
    #[default]
    AccelerateDecelerate,
    Accelerate,
    Decelerate,
}

impl Interpolator {
    /// Map linear progress in `[0, 1]` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Interpolator::Linear => t,
            Interpolator::Accelerate => t * t,
            Interpolator::Decelerate => 1.0 - (1.0 - t) * (1.0 - t),
            Interpolator::AccelerateDecelerate => {
                ((t + 1.0) * std::f32::consts::PI).cos() / 2.0 + 0.5
            }
        }
    }
}

/// Side of the orthogonal axis a swipe animation enters from or leaves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    /// Toward smaller orthogonal coordinates.
    Left,
    #[default]
    Right,
}

impl SwipeDirection {
    pub fn sign(self) -> f32 {
        match self {
            SwipeDirection::Left => -1.0,
            SwipeDirection::Right => 1.0,
        }
    }

    /// Direction of a displacement along the orthogonal axis.
    pub fn of(displacement: f32) -> Self {
        if displacement < 0.0 {
            SwipeDirection::Left
        } else {
            SwipeDirection::Right
        }
    }
}

/// How an added or removed tab is animated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum AnimationStyle {
    /// Slide along the orthogonal axis.
    Swipe {
        #[serde(default)]
        direction: SwipeDirection,
        /// Overrides the configured duration.
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    /// Grow out of a point in container coordinates.
    Reveal { x: f32, y: f32 },
    /// Briefly show the tab in front of the current one without selecting it.
    Peek { x: f32, y: f32 },
}

impl Default for AnimationStyle {
    fn default() -> Self {
        AnimationStyle::Swipe {
            direction: SwipeDirection::default(),
            duration_ms: None,
        }
    }
}

/// Category of a tween. Starting a tween cancels a running one of the same
/// category on the same item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    Show,
    Hide,
    Add,
    Peek,
    Remove,
    Relocate,
    Swipe,
    RevertOvershoot,
    Clear,
}

/// Animated property of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Position(Axis),
    Scale,
    Alpha,
    Rotation(Axis),
}

impl Property {
    fn read(self, arithmetics: &Arithmetics, surface: &Surface) -> f32 {
        match self {
            Property::Position(axis) => arithmetics.position(axis, surface),
            Property::Scale => arithmetics.scale(surface),
            Property::Alpha => surface.alpha,
            Property::Rotation(axis) => arithmetics.rotation(axis, surface),
        }
    }

    fn write(self, arithmetics: &Arithmetics, surface: &mut Surface, value: f32) {
        match self {
            Property::Position(axis) => arithmetics.set_position(axis, surface, value),
            Property::Scale => surface.scale = value,
            Property::Alpha => surface.alpha = value,
            Property::Rotation(axis) => arithmetics.set_rotation(axis, surface, value),
        }
    }

    /// Identity of the physical property, so that two logical axes mapping onto
    /// the same physical one conflict.
    fn physical(self, arithmetics: &Arithmetics) -> Property {
        match self {
            Property::Position(axis) => Property::Position(arithmetics.physical(axis)),
            Property::Rotation(axis) => Property::Rotation(arithmetics.physical(axis)),
            other => other,
        }
    }
}

/// One animated property. A missing `from` starts at the surface's current
/// value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub property: Property,
    pub from: Option<f32>,
    pub to: f32,
}

impl Track {
    pub fn new(property: Property, from: Option<f32>, to: f32) -> Self {
        Self { property, from, to }
    }

    pub fn to(property: Property, to: f32) -> Self {
        Self::new(property, None, to)
    }
}

/// Work to do once a tween ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Completion {
    /// Store the final tag of an item.
    Settle { key: ItemKey, tag: Tag },
    /// Release the surface of a removed item.
    Detach { key: ItemKey },
    /// Release the surface of an item that left the screen.
    Release { key: ItemKey },
    /// A swiped card is back in place.
    SwipeReverted { key: ItemKey },
    /// A peeking tab went back behind the selected one.
    PeekFinished { key: ItemKey },
    OvershootReverted,
    SwitcherShown,
    SwitcherHidden,
}

/// Request to tween some properties of one item's surface.
#[derive(Debug, Clone, PartialEq)]
pub struct TweenCommand {
    pub key: ItemKey,
    pub kind: AnimationKind,
    pub tracks: Vec<Track>,
    pub duration_ms: u64,
    pub delay_ms: u64,
    pub interpolator: Interpolator,
    pub completions: Vec<Completion>,
}

impl TweenCommand {
    pub fn new(key: ItemKey, kind: AnimationKind, duration_ms: u64) -> Self {
        Self {
            key,
            kind,
            tracks: Vec::new(),
            duration_ms,
            delay_ms: 0,
            interpolator: Interpolator::default(),
            completions: Vec::new(),
        }
    }

    pub fn track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn interpolator(mut self, interpolator: Interpolator) -> Self {
        self.interpolator = interpolator;
        self
    }

    pub fn then(mut self, completion: Completion) -> Self {
        self.completions.push(completion);
        self
    }
}

/// Outcome of planning a transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub tweens: Vec<TweenCommand>,
    /// Tags of items that need no animation and can be stored right away.
    pub settle: Vec<(ItemKey, Tag)>,
    /// Surfaces that can be released right away.
    pub release: Vec<ItemKey>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty() && self.settle.is_empty() && self.release.is_empty()
    }

    pub fn extend(&mut self, other: Plan) {
        self.tweens.extend(other.tweens);
        self.settle.extend(other.settle);
        self.release.extend(other.release);
    }
}

/// Turns logical transitions into tween batches.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrator {
    durations: AnimationDurations,
}

impl Orchestrator {
    pub fn new(durations: AnimationDurations) -> Self {
        Self { durations }
    }

    pub fn durations(&self) -> &AnimationDurations {
        &self.durations
    }

    /// Tween every visible item from the full-screen tab into its place in the
    /// stack. The selected item shrinks out of the full-screen tab, the others
    /// slide in from the end of the axis.
    pub fn show(&self, items: &[Item], selected: Option<ItemKey>, arithmetics: &Arithmetics) -> Plan {
        let mut plan = Plan::default();
        let tab_scale = arithmetics.tab_scale();
        for item in items {
            if !item.tag.state.is_visible() {
                plan.settle.push((item.key, item.tag));
                continue;
            }
            let mut tween = TweenCommand::new(item.key, AnimationKind::Show, self.durations.show_switcher)
                .then(Completion::Settle {
                    key: item.key,
                    tag: item.tag,
                });
            if Some(item.key) == selected {
                tween = tween
                    .track(Track::new(
                        Property::Position(Axis::Dragging),
                        Some(arithmetics.full_screen_position(Axis::Dragging)),
                        item.tag.position,
                    ))
                    .track(Track::new(
                        Property::Position(Axis::Orthogonal),
                        Some(arithmetics.full_screen_position(Axis::Orthogonal)),
                        0.0,
                    ))
                    .track(Track::new(Property::Scale, Some(1.0), tab_scale))
                    .then(Completion::SwitcherShown);
            } else {
                tween = tween
                    .track(Track::new(
                        Property::Position(Axis::Dragging),
                        Some(arithmetics.axis_length()),
                        item.tag.position,
                    ))
                    .track(Track::new(Property::Scale, Some(tab_scale), tab_scale));
            }
            plan.tweens.push(tween);
        }
        plan
    }

    /// Inverse of [`show`](Self::show). Non-selected items leave through the
    /// end of the axis and release their surface.
    pub fn hide(&self, visible: &[ItemKey], selected: Option<ItemKey>, arithmetics: &Arithmetics) -> Plan {
        let mut plan = Plan::default();
        for &key in visible {
            if Some(key) == selected {
                continue;
            }
            plan.tweens.push(
                TweenCommand::new(key, AnimationKind::Hide, self.durations.hide_switcher)
                    .track(Track::to(
                        Property::Position(Axis::Dragging),
                        arithmetics.axis_length(),
                    ))
                    .then(Completion::Release { key }),
            );
        }
        if let Some(key) = selected {
            plan.tweens.push(
                TweenCommand::new(key, AnimationKind::Hide, self.durations.hide_switcher)
                    .track(Track::to(
                        Property::Position(Axis::Dragging),
                        arithmetics.full_screen_position(Axis::Dragging),
                    ))
                    .track(Track::to(
                        Property::Position(Axis::Orthogonal),
                        arithmetics.full_screen_position(Axis::Orthogonal),
                    ))
                    .track(Track::to(Property::Scale, 1.0))
                    .track(Track::to(Property::Rotation(Axis::Dragging), 0.0))
                    .track(Track::to(Property::Alpha, 1.0))
                    .then(Completion::SwitcherHidden),
            );
        }
        plan
    }

    /// Animate a tab added to the visible stack, and its neighbors making room.
    pub fn add_to_stack(
        &self,
        key: ItemKey,
        tag: Tag,
        style: AnimationStyle,
        relocations: &[Relocation],
        arithmetics: &Arithmetics,
    ) -> Plan {
        let mut plan = self.relocate(relocations);
        if !tag.state.is_visible() {
            plan.settle.push((key, tag));
            return plan;
        }

        let tab_scale = arithmetics.tab_scale();
        let tween = match style {
            AnimationStyle::Swipe {
                direction,
                duration_ms,
            } => TweenCommand::new(
                key,
                AnimationKind::Add,
                duration_ms.unwrap_or(self.durations.add_tab),
            )
            .track(Track::new(
                Property::Position(Axis::Orthogonal),
                Some(direction.sign() * REMOVE_DISTANCE_RATIO * arithmetics.orthogonal_length()),
                0.0,
            ))
            .track(Track::new(
                Property::Position(Axis::Dragging),
                Some(tag.position),
                tag.position,
            ))
            .track(Track::new(Property::Scale, Some(tab_scale), tab_scale))
            .interpolator(Interpolator::Decelerate),
            AnimationStyle::Reveal { x, y } | AnimationStyle::Peek { x, y } => {
                let (origin, _) = arithmetics.logical_point(x, y);
                TweenCommand::new(key, AnimationKind::Add, self.durations.add_tab)
                    .track(Track::new(
                        Property::Position(Axis::Dragging),
                        Some(origin),
                        tag.position,
                    ))
                    .track(Track::new(Property::Scale, Some(0.0), tab_scale))
                    .track(Track::new(Property::Alpha, Some(0.0), 1.0))
            }
        };
        plan.tweens
            .push(tween.then(Completion::Settle { key, tag }));
        plan
    }

    /// Animate a tab added while only the selected tab is shown.
    ///
    /// Swipe and reveal replace the selected tab; peek shows the new tab
    /// briefly and leaves the selection alone.
    pub fn add_full_screen(
        &self,
        key: ItemKey,
        previous: Option<ItemKey>,
        style: AnimationStyle,
        arithmetics: &Arithmetics,
    ) -> Plan {
        let mut plan = Plan::default();
        let full_dragging = arithmetics.full_screen_position(Axis::Dragging);
        let full_orthogonal = arithmetics.full_screen_position(Axis::Orthogonal);
        match style {
            AnimationStyle::Swipe {
                direction,
                duration_ms,
            } => {
                let duration = duration_ms.unwrap_or(self.durations.add_tab);
                let length = arithmetics.container_size(Axis::Orthogonal);
                plan.tweens.push(
                    TweenCommand::new(key, AnimationKind::Add, duration)
                        .track(Track::new(
                            Property::Position(Axis::Orthogonal),
                            Some(full_orthogonal + direction.sign() * length),
                            full_orthogonal,
                        ))
                        .track(Track::new(
                            Property::Position(Axis::Dragging),
                            Some(full_dragging),
                            full_dragging,
                        ))
                        .interpolator(Interpolator::Decelerate),
                );
                if let Some(previous) = previous.filter(|previous| *previous != key) {
                    plan.tweens.push(
                        TweenCommand::new(previous, AnimationKind::Add, duration)
                            .track(Track::to(
                                Property::Position(Axis::Orthogonal),
                                full_orthogonal - direction.sign() * length,
                            ))
                            .interpolator(Interpolator::Decelerate)
                            .then(Completion::Release { key: previous }),
                    );
                }
            }
            AnimationStyle::Reveal { .. } => {
                let mut tween = TweenCommand::new(key, AnimationKind::Add, self.durations.add_tab)
                    .track(Track::new(
                        Property::Position(Axis::Dragging),
                        Some(full_dragging),
                        full_dragging,
                    ))
                    .track(Track::new(Property::Scale, Some(0.0), 1.0))
                    .track(Track::new(Property::Alpha, Some(0.0), 1.0));
                if let Some(previous) = previous.filter(|previous| *previous != key) {
                    tween = tween.then(Completion::Release { key: previous });
                }
                plan.tweens.push(tween);
            }
            AnimationStyle::Peek { .. } => {
                let length = arithmetics.container_size(Axis::Dragging);
                plan.tweens.push(
                    TweenCommand::new(key, AnimationKind::Peek, self.durations.peek)
                        .track(Track::new(
                            Property::Position(Axis::Dragging),
                            Some(full_dragging + length),
                            full_dragging + length * (1.0 - PEEK_RATIO),
                        ))
                        .track(Track::new(
                            Property::Scale,
                            Some(arithmetics.tab_scale()),
                            arithmetics.tab_scale(),
                        ))
                        .interpolator(Interpolator::Decelerate)
                        .then(Completion::PeekFinished { key }),
                );
            }
        }
        plan
    }

    /// Animate a removed card off the orthogonal axis, fading and shrinking it,
    /// while its neighbors close the gap.
    ///
    /// A positive `velocity` (px/s) from a swipe shortens the animation.
    pub fn remove(
        &self,
        key: ItemKey,
        direction: SwipeDirection,
        velocity: f32,
        relocations: &[Relocation],
        arithmetics: &Arithmetics,
    ) -> Plan {
        let mut plan = self.relocate(relocations);
        let distance = REMOVE_DISTANCE_RATIO * arithmetics.orthogonal_length();
        let duration = if velocity.abs() > 0.0 {
            ((distance / velocity.abs()) * 1000.0)
                .max(1.0)
                .min(self.durations.remove_tab as f32) as u64
        } else {
            self.durations.remove_tab
        };
        plan.tweens.push(
            TweenCommand::new(key, AnimationKind::Remove, duration)
                .track(Track::to(
                    Property::Position(Axis::Orthogonal),
                    direction.sign() * distance,
                ))
                .track(Track::to(Property::Alpha, 0.0))
                .track(Track::to(
                    Property::Scale,
                    REMOVE_SCALE_RATIO * arithmetics.tab_scale(),
                ))
                .then(Completion::Detach { key }),
        );
        plan
    }

    /// Move neighbors to their new tags, closer ones first. Items hidden both
    /// before and after the move are settled without animation.
    pub fn relocate(&self, relocations: &[Relocation]) -> Plan {
        let mut plan = Plan::default();
        for relocation in relocations {
            if !relocation.from.state.is_visible() && !relocation.to.state.is_visible() {
                plan.settle.push((relocation.key, relocation.to));
                continue;
            }
            let from = Some(relocation.from.position).filter(|position| !position.is_nan());
            plan.tweens.push(
                TweenCommand::new(relocation.key, AnimationKind::Relocate, self.durations.relocate)
                    .track(Track::new(
                        Property::Position(Axis::Dragging),
                        from,
                        relocation.to.position,
                    ))
                    .delay(relocation.delay_ms)
                    .then(Completion::Settle {
                        key: relocation.key,
                        tag: relocation.to,
                    }),
            );
        }
        plan
    }

    /// Swipe every visible card out with a staggered delay, front first.
    pub fn clear(&self, visible: &[ItemKey], arithmetics: &Arithmetics) -> Plan {
        let distance = REMOVE_DISTANCE_RATIO * arithmetics.orthogonal_length();
        let tweens = visible
            .iter()
            .enumerate()
            .map(|(position, &key)| {
                TweenCommand::new(key, AnimationKind::Clear, self.durations.clear)
                    .track(Track::to(Property::Position(Axis::Orthogonal), distance))
                    .track(Track::to(Property::Alpha, 0.0))
                    .delay(position as u64 * self.durations.clear_delay_step)
                    .interpolator(Interpolator::Accelerate)
                    .then(Completion::Detach { key })
            })
            .collect();
        Plan {
            tweens,
            ..Plan::default()
        }
    }

    /// Tween the stack back from an overshoot. The further the stack went, the
    /// longer the way back takes.
    pub fn revert_overshoot(&self, visible: &[Item], effect: &OvershootEffect, progress: f32) -> Plan {
        let duration =
            (self.durations.revert_overshoot as f32 * progress.clamp(0.0, 1.0).sqrt()).round() as u64;
        let mut tweens: Vec<TweenCommand> = visible
            .iter()
            .map(|item| {
                let mut tween =
                    TweenCommand::new(item.key, AnimationKind::RevertOvershoot, duration)
                        .track(Track::to(Property::Rotation(Axis::Dragging), 0.0));
                if item.index == 0 && effect.translation != 0.0 {
                    tween = tween.track(Track::to(
                        Property::Position(Axis::Dragging),
                        item.tag.position,
                    ));
                }
                tween
            })
            .collect();
        match tweens.first_mut() {
            Some(first) => first.completions.push(Completion::OvershootReverted),
            None => debug!("Nothing to revert"),
        }
        Plan {
            tweens,
            ..Plan::default()
        }
    }

    /// Tween a swiped card back into place.
    pub fn revert_swipe(&self, key: ItemKey, arithmetics: &Arithmetics) -> Plan {
        Plan {
            tweens: vec![TweenCommand::new(key, AnimationKind::Swipe, self.durations.revert_swipe)
                .track(Track::to(Property::Position(Axis::Orthogonal), 0.0))
                .track(Track::to(Property::Alpha, 1.0))
                .track(Track::to(Property::Scale, arithmetics.tab_scale()))
                .interpolator(Interpolator::Decelerate)
                .then(Completion::SwipeReverted { key })],
            ..Plan::default()
        }
    }
}

#[derive(Debug, Clone)]
struct Tween {
    command: TweenCommand,
    from: Vec<f32>,
    elapsed_ms: u64,
}

impl Tween {
    fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.command.delay_ms + self.command.duration_ms
    }

    fn progress(&self) -> f32 {
        let active = self.elapsed_ms.saturating_sub(self.command.delay_ms);
        if self.command.duration_ms == 0 {
            return if self.is_finished() { 1.0 } else { 0.0 };
        }
        (active as f32 / self.command.duration_ms as f32).min(1.0)
    }

    fn conflicts(&self, command: &TweenCommand, arithmetics: &Arithmetics) -> bool {
        if self.command.key != command.key {
            return false;
        }
        self.command.kind == command.kind
            || self.command.tracks.iter().any(|running| {
                command.tracks.iter().any(|track| {
                    running.property.physical(arithmetics) == track.property.physical(arithmetics)
                })
            })
    }
}

/// Plays tweens on surfaces.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    tweens: Vec<Tween>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_animating(&self) -> bool {
        !self.tweens.is_empty()
    }

    pub fn is_animating_key(&self, key: ItemKey) -> bool {
        self.tweens.iter().any(|tween| tween.command.key == key)
    }

    /// Number of running tweens.
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Keys and kinds of the running tweens.
    pub fn running(&self) -> Vec<(ItemKey, AnimationKind)> {
        self.tweens
            .iter()
            .map(|tween| (tween.command.key, tween.command.kind))
            .collect()
    }

    /// Tag an item will have once its running tweens complete.
    pub fn pending_tag(&self, key: ItemKey) -> Option<Tag> {
        self.tweens
            .iter()
            .filter(|tween| tween.command.key == key)
            .flat_map(|tween| tween.command.completions.iter())
            .filter_map(|completion| match completion {
                Completion::Settle { key: target, tag } if *target == key => Some(*tag),
                _ => None,
            })
            .last()
    }

    /// Start a tween. A running tween of the same kind on the same item, or one
    /// animating the same property, is cancelled first; the completions of
    /// cancelled tweens are returned so that the caller can clean up.
    pub fn start(
        &mut self,
        command: TweenCommand,
        recycler: &mut impl SurfaceRecycler,
        arithmetics: &Arithmetics,
    ) -> Vec<Completion> {
        let mut cancelled = Vec::new();
        self.tweens.retain(|tween| {
            if tween.conflicts(&command, arithmetics) {
                debug!(
                    "Cancelling {:?} of {} for {:?}",
                    tween.command.kind, tween.command.key, command.kind
                );
                cancelled.extend(tween.command.completions.iter().copied());
                false
            } else {
                true
            }
        });

        let (surface, _) = recycler.obtain(command.key);
        let from = command
            .tracks
            .iter()
            .map(|track| {
                track
                    .from
                    .unwrap_or_else(|| track.property.read(arithmetics, surface))
            })
            .collect();
        trace!(
            "Starting {:?} of {} ({}ms after {}ms)",
            command.kind,
            command.key,
            command.duration_ms,
            command.delay_ms
        );
        self.tweens.push(Tween {
            command,
            from,
            elapsed_ms: 0,
        });
        cancelled
    }

    /// Cancel every tween of an item.
    pub fn cancel(&mut self, key: ItemKey) -> Vec<Completion> {
        let mut cancelled = Vec::new();
        self.tweens.retain(|tween| {
            if tween.command.key == key {
                cancelled.extend(tween.command.completions.iter().copied());
                false
            } else {
                true
            }
        });
        cancelled
    }

    /// Drop every tween and return their completions.
    pub fn cancel_all(&mut self) -> Vec<Completion> {
        self.tweens
            .drain(..)
            .flat_map(|tween| tween.command.completions)
            .collect()
    }

    /// Advance all tweens and return the completions of those that ended, in
    /// the order they were started.
    pub fn tick(&mut self, delta_ms: u64) -> Vec<Completion> {
        for tween in &mut self.tweens {
            tween.elapsed_ms = tween.elapsed_ms.saturating_add(delta_ms);
        }
        self.drain_finished()
    }

    /// Jump every tween to its end and return all completions.
    pub fn finish_all(&mut self) -> Vec<Completion> {
        for tween in &mut self.tweens {
            tween.elapsed_ms = tween.command.delay_ms + tween.command.duration_ms;
        }
        self.drain_finished()
    }

    fn drain_finished(&mut self) -> Vec<Completion> {
        let mut completions = Vec::new();
        self.tweens.retain(|tween| {
            if tween.is_finished() {
                completions.extend(tween.command.completions.iter().copied());
                false
            } else {
                true
            }
        });
        completions
    }

    /// Write the current value of every running tween onto its surface.
    pub fn apply(&self, recycler: &mut impl SurfaceRecycler, arithmetics: &Arithmetics) {
        for tween in &self.tweens {
            let eased = tween.command.interpolator.apply(tween.progress());
            let Some(surface) = recycler.surface_mut(tween.command.key) else {
                continue;
            };
            for (track, from) in tween.command.tracks.iter().zip(&tween.from) {
                let value = from + (track.to - from) * eased;
                track.property.write(arithmetics, surface, value);
            }
            if !tween.command.tracks.is_empty() {
                surface.visible = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwitcherConfig;
    use crate::model::{State, TabId};
    use crate::surface::SurfacePool;

    fn key(id: u64) -> ItemKey {
        ItemKey::Tab(TabId(id))
    }

    fn arithmetics() -> Arithmetics {
        let mut arithmetics = Arithmetics::new(&SwitcherConfig::default());
        arithmetics.set_container_size(400.0, 1000.0);
        arithmetics
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(AnimationDurations::default())
    }

    #[test]
    fn test_interpolators() {
        for interpolator in [
            Interpolator::Linear,
            Interpolator::Accelerate,
            Interpolator::Decelerate,
            Interpolator::AccelerateDecelerate,
        ] {
            assert!(interpolator.apply(0.0).abs() < 1e-6);
            assert!((interpolator.apply(1.0) - 1.0).abs() < 1e-6);
        }
        assert!(Interpolator::Decelerate.apply(0.5) > 0.5);
        assert!(Interpolator::Accelerate.apply(0.5) < 0.5);
        assert!((Interpolator::AccelerateDecelerate.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tween_playback() {
        let arithmetics = arithmetics();
        let mut pool = SurfacePool::new(4);
        let mut animator = Animator::new();
        let command = TweenCommand::new(key(1), AnimationKind::Relocate, 100)
            .track(Track::new(Property::Position(Axis::Dragging), Some(0.0), 100.0))
            .interpolator(Interpolator::Linear)
            .then(Completion::Settle {
                key: key(1),
                tag: Tag::new(100.0, State::Floating),
            });
        assert!(animator.start(command, &mut pool, &arithmetics).is_empty());

        assert!(animator.tick(50).is_empty());
        animator.apply(&mut pool, &arithmetics);
        let surface = pool.surface(key(1)).unwrap();
        assert!((arithmetics.position(Axis::Dragging, surface) - 50.0).abs() < 1e-3);
        assert!(surface.visible);

        let completions = animator.tick(50);
        assert_eq!(completions.len(), 1);
        assert!(!animator.is_animating());
    }

    #[test]
    fn test_delay_holds_start_value() {
        let arithmetics = arithmetics();
        let mut pool = SurfacePool::new(4);
        let mut animator = Animator::new();
        let command = TweenCommand::new(key(1), AnimationKind::Relocate, 100)
            .track(Track::new(Property::Alpha, Some(0.2), 1.0))
            .delay(50);
        animator.start(command, &mut pool, &arithmetics);
        animator.tick(40);
        animator.apply(&mut pool, &arithmetics);
        assert!((pool.surface(key(1)).unwrap().alpha - 0.2).abs() < 1e-6);
        assert!(animator.tick(60).is_empty());
        assert_eq!(animator.tick(50).len(), 0);
        assert!(!animator.is_animating());
    }

    #[test]
    fn test_same_kind_is_cancelled() {
        let arithmetics = arithmetics();
        let mut pool = SurfacePool::new(4);
        let mut animator = Animator::new();
        let first = TweenCommand::new(key(1), AnimationKind::Relocate, 100)
            .track(Track::to(Property::Position(Axis::Dragging), 10.0))
            .then(Completion::Settle {
                key: key(1),
                tag: Tag::new(10.0, State::Floating),
            });
        let second = TweenCommand::new(key(1), AnimationKind::Relocate, 100)
            .track(Track::to(Property::Position(Axis::Dragging), 20.0));
        let other = TweenCommand::new(key(2), AnimationKind::Relocate, 100)
            .track(Track::to(Property::Position(Axis::Dragging), 20.0));

        animator.start(first, &mut pool, &arithmetics);
        animator.start(other, &mut pool, &arithmetics);
        let cancelled = animator.start(second, &mut pool, &arithmetics);
        assert_eq!(cancelled.len(), 1);
        assert_eq!(animator.len(), 2);
    }

    #[test]
    fn test_conflicting_property_is_cancelled() {
        let arithmetics = arithmetics();
        let mut pool = SurfacePool::new(4);
        let mut animator = Animator::new();
        animator.start(
            TweenCommand::new(key(1), AnimationKind::Show, 100)
                .track(Track::to(Property::Scale, 0.9))
                .then(Completion::SwitcherShown),
            &mut pool,
            &arithmetics,
        );
        let cancelled = animator.start(
            TweenCommand::new(key(1), AnimationKind::Hide, 100).track(Track::to(Property::Scale, 1.0)),
            &mut pool,
            &arithmetics,
        );
        assert_eq!(cancelled, vec![Completion::SwitcherShown]);
    }

    #[test]
    fn test_cancel_all_returns_completions() {
        let arithmetics = arithmetics();
        let mut pool = SurfacePool::new(4);
        let mut animator = Animator::new();
        animator.start(
            TweenCommand::new(key(1), AnimationKind::Swipe, 100)
                .track(Track::to(Property::Alpha, 1.0))
                .then(Completion::SwipeReverted { key: key(1) }),
            &mut pool,
            &arithmetics,
        );
        animator.start(
            TweenCommand::new(key(2), AnimationKind::Relocate, 100).delay(50),
            &mut pool,
            &arithmetics,
        );
        assert_eq!(
            animator.cancel_all(),
            vec![Completion::SwipeReverted { key: key(1) }]
        );
        assert!(!animator.is_animating());
    }

    #[test]
    fn test_finish_all_and_pending_tag() {
        let arithmetics = arithmetics();
        let mut pool = SurfacePool::new(4);
        let mut animator = Animator::new();
        let tag = Tag::new(42.0, State::Floating);
        animator.start(
            TweenCommand::new(key(3), AnimationKind::Relocate, 500)
                .delay(100)
                .then(Completion::Settle { key: key(3), tag }),
            &mut pool,
            &arithmetics,
        );
        assert_eq!(animator.pending_tag(key(3)), Some(tag));
        assert_eq!(animator.pending_tag(key(4)), None);
        assert_eq!(
            animator.finish_all(),
            vec![Completion::Settle { key: key(3), tag }]
        );
        assert!(animator.is_empty());
    }

    #[test]
    fn test_show_plan() {
        let arithmetics = arithmetics();
        let items = vec![
            Item {
                index: 0,
                key: key(1),
                tag: Tag::new(500.0, State::Floating),
            },
            Item {
                index: 1,
                key: key(2),
                tag: Tag::new(36.0, State::Hidden),
            },
        ];
        let plan = orchestrator().show(&items, Some(key(1)), &arithmetics);
        assert_eq!(plan.tweens.len(), 1);
        assert_eq!(plan.settle, vec![(key(2), Tag::new(36.0, State::Hidden))]);
        assert!(plan.tweens[0]
            .completions
            .contains(&Completion::SwitcherShown));
        assert_eq!(plan.tweens[0].tracks[0].from, Some(0.0));
    }

    #[test]
    fn test_hide_plan_releases_others() {
        let arithmetics = arithmetics();
        let plan = orchestrator().hide(&[key(1), key(2)], Some(key(2)), &arithmetics);
        assert_eq!(plan.tweens.len(), 2);
        assert_eq!(
            plan.tweens[0].completions,
            vec![Completion::Release { key: key(1) }]
        );
        assert_eq!(plan.tweens[1].completions, vec![Completion::SwitcherHidden]);
    }

    #[test]
    fn test_remove_plan() {
        let arithmetics = arithmetics();
        let relocation = Relocation {
            key: key(2),
            from: Tag::new(100.0, State::Floating),
            to: Tag::new(200.0, State::Floating),
            delay_ms: 25,
        };
        let plan = orchestrator().remove(key(1), SwipeDirection::Left, 0.0, &[relocation], &arithmetics);
        assert_eq!(plan.tweens.len(), 2);
        assert_eq!(plan.tweens[0].delay_ms, 25);
        let removal = &plan.tweens[1];
        assert_eq!(removal.duration_ms, AnimationDurations::default().remove_tab);
        assert_eq!(removal.tracks[0].to, -500.0);
        assert_eq!(removal.completions, vec![Completion::Detach { key: key(1) }]);

        let fast = orchestrator().remove(key(1), SwipeDirection::Right, 10_000.0, &[], &arithmetics);
        assert_eq!(fast.tweens[0].duration_ms, 50);
    }

    #[test]
    fn test_relocate_settles_hidden_items() {
        let relocation = Relocation {
            key: key(2),
            from: Tag::new(36.0, State::Hidden),
            to: Tag::new(24.0, State::Hidden),
            delay_ms: 0,
        };
        let plan = orchestrator().relocate(&[relocation]);
        assert!(plan.tweens.is_empty());
        assert_eq!(plan.settle.len(), 1);
    }

    #[test]
    fn test_revert_overshoot_duration() {
        let items = vec![Item {
            index: 0,
            key: key(1),
            tag: Tag::new(36.0, State::StackedStartAtop),
        }];
        let effect = OvershootEffect {
            translation: 20.0,
            angle: 1.0,
            state: crate::drag::DragState::OvershootStart,
        };
        let plan = orchestrator().revert_overshoot(&items, &effect, 0.25);
        assert_eq!(plan.tweens[0].duration_ms, 125);
        assert_eq!(plan.tweens[0].tracks.len(), 2);
        assert_eq!(
            plan.tweens[0].completions,
            vec![Completion::OvershootReverted]
        );
    }

    #[test]
    fn test_clear_is_staggered() {
        let arithmetics = arithmetics();
        let plan = orchestrator().clear(&[key(1), key(2), key(3)], &arithmetics);
        let delays: Vec<_> = plan.tweens.iter().map(|tween| tween.delay_ms).collect();
        assert_eq!(delays, vec![0, 25, 50]);
    }

    #[test]
    fn test_style_serialization() {
        let style: AnimationStyle = serde_json::from_str(r#"{"style":"reveal","x":1.0,"y":2.0}"#).unwrap();
        assert_eq!(style, AnimationStyle::Reveal { x: 1.0, y: 2.0 });
        let style: AnimationStyle = serde_json::from_str(r#"{"style":"swipe"}"#).unwrap();
        assert_eq!(style, AnimationStyle::default());
    }
}
