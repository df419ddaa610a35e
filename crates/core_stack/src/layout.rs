//! Layout passes over the whole stack.
//!
//! [`StackLayout`] turns drag deltas into new tags for every affected item,
//! computes the initial layout when the switcher is shown, and plans the
//! relocation of neighbors when items are added or removed. Per-gesture
//! bookkeeping (the first visible item and the anchor of the non-linear
//! damping) lives here and is reset whenever a gesture starts.

use tracing::{debug, trace};

use crate::animation::Interpolator;
use crate::drag::{DragState, Overshoot};
use crate::iterator::{ItemIterator, Resolve};
use crate::model::{Item, ItemKey, State, TabModel, Tag};
use crate::policy::SpacingPolicy;

/// Visual effect applied on top of the tags while overshooting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OvershootEffect {
    /// How far the front card is pulled past the start.
    pub translation: f32,
    /// Tilt of the visible cards, in degrees.
    pub angle: f32,
    /// Drag state that determines the pivot of the tilt.
    pub state: DragState,
}

impl OvershootEffect {
    pub fn is_active(&self) -> bool {
        self.translation != 0.0 || self.angle != 0.0
    }
}

/// A planned move of one item to a new tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relocation {
    pub key: ItemKey,
    pub from: Tag,
    pub to: Tag,
    pub delay_ms: u64,
}

/// Continuation of a released drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fling {
    distance: f32,
    duration_ms: u64,
    elapsed_ms: u64,
    traveled: f32,
}

impl Fling {
    pub fn new(distance: f32, duration_ms: u64) -> Self {
        Self {
            distance,
            duration_ms,
            elapsed_ms: 0,
            traveled: 0.0,
        }
    }

    pub fn direction(&self) -> DragState {
        if self.distance < 0.0 {
            DragState::DragToStart
        } else {
            DragState::DragToEnd
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    /// Advance the fling and return the distance covered during `delta_ms`.
    pub fn advance(&mut self, delta_ms: u64) -> f32 {
        self.elapsed_ms = (self.elapsed_ms + delta_ms).min(self.duration_ms);
        let progress = if self.duration_ms == 0 {
            1.0
        } else {
            self.elapsed_ms as f32 / self.duration_ms as f32
        };
        let target = self.distance * Interpolator::Decelerate.apply(progress);
        let increment = target - self.traveled;
        self.traveled = target;
        increment
    }
}

/// Resolves the initial layout around a reference item.
///
/// Items behind the reference rest at the largest allowed spacing behind their
/// predecessor; items in front of it at the maximum spacing in front of their
/// successor.
struct InitialLayout<'a> {
    policy: &'a SpacingPolicy,
    count: usize,
    reference_position: f32,
}

impl Resolve for InitialLayout<'_> {
    fn resolve(&mut self, model: &TabModel, index: usize, predecessor: Option<&Item>) -> Tag {
        let selected = model.is_selected(model.key_at(index));
        match predecessor {
            None => self
                .policy
                .clip_position(self.count, index, self.reference_position, None),
            Some(previous) if previous.index < index => {
                let raw = self
                    .policy
                    .non_linear_position(self.count, previous.tag.position, selected);
                self.policy
                    .clip_position(self.count, index, raw, Some(previous.tag.state))
            }
            Some(next) => {
                let next_selected = model.is_selected(next.key);
                let raw = next.tag.position + self.policy.max_tab_spacing(self.count, next_selected);
                self.policy.clip_position(self.count, index, raw, None)
            }
        }
    }
}

/// Layout state of the card stack.
#[derive(Debug, Clone)]
pub struct StackLayout {
    policy: SpacingPolicy,
    first_visible_index: Option<usize>,
    last_attached_index: Option<usize>,
    overshoot: OvershootEffect,
}

impl StackLayout {
    pub fn new(policy: SpacingPolicy) -> Self {
        Self {
            policy,
            first_visible_index: None,
            last_attached_index: None,
            overshoot: OvershootEffect::default(),
        }
    }

    pub fn policy(&self) -> &SpacingPolicy {
        &self.policy
    }

    pub fn set_axis_length(&mut self, axis_length: f32) {
        self.policy.set_axis_length(axis_length);
    }

    pub fn overshoot(&self) -> &OvershootEffect {
        &self.overshoot
    }

    /// Forget the bookkeeping of the previous gesture.
    pub fn reset_gesture(&mut self) {
        self.first_visible_index = None;
        self.last_attached_index = None;
    }

    /// Index of the item at which drag passes begin: the first floating item,
    /// or the first item stacked at the start if nothing floats.
    pub fn first_visible_index(&self, model: &TabModel) -> Option<usize> {
        if model.count() == 0 {
            return None;
        }
        let states: Vec<State> = model.keys().map(|key| model.stored_tag(key).state).collect();
        states
            .iter()
            .position(|state| *state == State::Floating)
            .or_else(|| states.iter().position(|state| state.is_stacked_at_start()))
            .or(Some(0))
    }

    /// First visible index of the latest drag pass.
    pub fn tracked_first_visible_index(&self) -> Option<usize> {
        self.first_visible_index
    }

    /// Index the damping of the current gesture is anchored at.
    pub fn last_attached_index(&self) -> Option<usize> {
        self.last_attached_index
    }

    /// Move the stack by `delta` and report whether it overshoots in the
    /// direction of the drag.
    pub fn drag(&mut self, model: &mut TabModel, state: DragState, delta: f32) -> Overshoot {
        let to_end = match state {
            DragState::DragToEnd => true,
            DragState::DragToStart => false,
            _ => return Overshoot::None,
        };

        if let Some(first_visible) = self.first_visible_index(model) {
            self.first_visible_index = Some(first_visible);
            let resolved = {
                let mut iter = ItemIterator::stored(model).start(first_visible);
                self.drag_forward(&mut iter, to_end, delta);
                if !to_end {
                    self.drag_backward(&mut iter, first_visible);
                }
                iter.into_resolved()
            };
            model.apply(&resolved);
        }

        if to_end && self.is_overshooting_at_end(model) {
            Overshoot::End
        } else if !to_end && self.is_overshooting_at_start(model) {
            Overshoot::Start
        } else {
            Overshoot::None
        }
    }

    fn drag_forward(&mut self, iter: &mut ItemIterator<'_>, to_end: bool, delta: f32) {
        let model = iter.model();
        let count = model.count();
        let last = count - 1;
        let policy = self.policy;

        while let Some(item) = iter.next() {
            let index = item.index;
            let predecessor = index.checked_sub(1).map(|previous| iter.item_at(previous));
            let predecessor_state = predecessor.map(|previous| previous.tag.state);

            // The back card stays pinned unless it floats and the stack moves
            // toward the start.
            if index == last && (to_end || item.tag.state != State::Floating) {
                let tag = policy.clip_position(count, index, item.tag.position, predecessor_state);
                iter.update(retag(item, tag));
                break;
            }

            let attached = predecessor.is_some_and(|previous| {
                if to_end {
                    policy.is_attached_dragging_to_end(&previous.tag)
                } else {
                    policy.is_attached_dragging_to_start(count, &previous.tag)
                }
            });

            let raw = match (attached, predecessor) {
                (true, Some(previous)) => {
                    let anchor = *self.last_attached_index.get_or_insert(index);
                    let damped = policy.damped_delta(delta, index, anchor);
                    let selected = model.is_selected(item.key);
                    let (min, max) =
                        policy.spacing_band(count, previous.tag.position, selected);
                    (item.tag.position + damped)
                        .max(previous.tag.position - max)
                        .min(previous.tag.position - min)
                }
                _ => match item.tag.state {
                    State::Floating => item.tag.position + delta,
                    State::StackedStartAtop if predecessor.is_none() => item.tag.position + delta,
                    State::StackedStartAtop => {
                        if !to_end {
                            let tag = policy.clip_position(
                                count,
                                index,
                                item.tag.position,
                                predecessor_state,
                            );
                            iter.update(retag(item, tag));
                        }
                        break;
                    }
                    State::Hidden | State::StackedStart if !to_end => break,
                    _ => continue,
                },
            };

            let raw = if to_end && index + 2 == count {
                let back = model.stored_tag(model.key_at(last));
                let limit = back.position
                    + policy.max_tab_spacing(count, model.is_selected(model.key_at(last)));
                raw.min(limit)
            } else {
                raw
            };

            let tag = policy.clip_position(count, index, raw, predecessor_state);
            trace!(
                "Drag moves item {} from {:.1} to {:.1} ({:?})",
                index,
                item.tag.position,
                tag.position,
                tag.state
            );
            iter.update(retag(item, tag));
        }
    }

    /// Pull items out of the end stack behind a stack that moves to the start.
    fn drag_backward(&self, iter: &mut ItemIterator<'_>, first_visible: usize) {
        let model = iter.model();
        let count = model.count();
        for index in (0..first_visible).rev() {
            let item = iter.item_at(index);
            let successor = iter.item_at(index + 1);
            let predecessor_state = index.checked_sub(1).map(|previous| iter.item_at(previous).tag.state);
            let raw = successor.tag.position
                + self
                    .policy
                    .max_tab_spacing(count, model.is_selected(successor.key));
            let tag = self
                .policy
                .clip_position(count, index, raw, predecessor_state);
            iter.update(retag(item, tag));
            if tag.state != State::Floating {
                break;
            }
        }
    }

    /// Whether the stack cannot move further toward the start. A stack of at
    /// most one item always is.
    pub fn is_overshooting_at_start(&self, model: &TabModel) -> bool {
        if model.count() <= 1 {
            return true;
        }
        model.stored_tag(model.key_at(0)).state == State::StackedStartAtop
    }

    /// Whether the stack cannot move further toward the end. A stack of at
    /// most one item always is.
    pub fn is_overshooting_at_end(&self, model: &TabModel) -> bool {
        let count = model.count();
        if count <= 1 {
            return true;
        }
        let last = model.key_at(count - 1);
        let position = model.stored_tag(model.key_at(count - 2)).position;
        position.round() >= self.policy.max_tab_spacing(count, model.is_selected(last)).round()
    }

    /// Record the translation of the front card while overshooting at the start.
    pub fn set_start_overshoot(&mut self, distance: f32) {
        self.overshoot.translation = distance.max(0.0);
        if distance > 0.0 {
            self.overshoot.state = DragState::OvershootStart;
        }
    }

    /// Record the tilt of the stack. Tilting at the start leans the cards
    /// forward, at the end backward.
    pub fn set_tilt(&mut self, state: DragState, angle: f32) {
        match state {
            DragState::OvershootStart => {
                self.overshoot.angle = angle;
                self.overshoot.state = state;
            }
            DragState::OvershootEnd => {
                self.overshoot.angle = -angle;
                self.overshoot.state = state;
            }
            _ => {
                self.overshoot.angle = 0.0;
                if self.overshoot.translation == 0.0 {
                    self.overshoot.state = DragState::None;
                }
            }
        }
    }

    /// Drop the overshoot effect, returning the one that was active.
    pub fn clear_overshoot(&mut self) -> OvershootEffect {
        std::mem::take(&mut self.overshoot)
    }

    /// Zero the translation and tilt but keep the pivot until the revert
    /// animation ends.
    pub fn release_overshoot(&mut self) -> OvershootEffect {
        let effect = self.overshoot;
        self.overshoot.translation = 0.0;
        self.overshoot.angle = 0.0;
        effect
    }

    /// Center the pivot again once the stack is back in place.
    pub fn restore_pivot(&mut self) {
        if !self.overshoot.is_active() {
            self.overshoot.state = DragState::None;
        }
    }

    /// Compute the layout of every item from scratch.
    ///
    /// The reference item is placed at `reference` if given, otherwise the
    /// selected item (or the first one) is placed at the attached position.
    pub fn initial_layout(&self, model: &TabModel, reference: Option<(usize, f32)>) -> Vec<Item> {
        let count = model.count();
        if count == 0 {
            return Vec::new();
        }
        let (reference_index, reference_position) = reference
            .filter(|(index, position)| *index < count && position.is_finite())
            .unwrap_or_else(|| {
                (
                    model.selected_index().unwrap_or(0),
                    self.policy.attached_position(count),
                )
            });
        debug!(
            "Initial layout of {} items around item {} at {:.1}",
            count, reference_index, reference_position
        );

        let resolver = || InitialLayout {
            policy: &self.policy,
            count,
            reference_position,
        };
        let mut positions = vec![f32::NAN; count];
        for item in ItemIterator::new(model, resolver()).start(reference_index) {
            positions[item.index] = item.tag.position;
        }
        for item in ItemIterator::new(model, resolver())
            .reverse()
            .start(reference_index)
            .skip(1)
        {
            positions[item.index] = item.tag.position;
        }

        let mut items: Vec<Item> = Vec::with_capacity(count);
        for (index, position) in positions.into_iter().enumerate() {
            let predecessor = items.last().map(|previous| previous.tag.state);
            let tag = self.policy.clip_position(count, index, position, predecessor);
            items.push(Item {
                index,
                key: model.key_at(index),
                tag,
            });
        }
        items
    }

    /// Plan how the remaining items move after the item at `removed_index` was
    /// removed.
    ///
    /// `previous` holds the tags of the items before the removal. Successors
    /// of the removed item move into the slot in front of them. If the back
    /// item was removed, every item moves one slot back instead. Closer
    /// neighbors start first.
    pub fn relocate_after_remove(
        &self,
        model: &TabModel,
        removed_index: usize,
        previous: &[Tag],
        delay_step_ms: u64,
    ) -> Vec<Relocation> {
        let count = model.count();
        assert_eq!(
            previous.len(),
            count + 1,
            "relocation expects the tags from before the removal"
        );
        let removed_last = removed_index == count;

        let mut relocations = Vec::new();
        let mut predecessor: Option<State> = None;
        for index in 0..count {
            let old_index = if index >= removed_index { index + 1 } else { index };
            let slot = if removed_last { index + 1 } else { index };
            let to = self
                .policy
                .clip_position(count, index, previous[slot].position, predecessor);
            predecessor = Some(to.state);

            let from = previous[old_index];
            let distance = if index >= removed_index {
                index - removed_index + 1
            } else {
                removed_index - index
            };
            if from.position != to.position || from.state != to.state {
                relocations.push(Relocation {
                    key: model.key_at(index),
                    from,
                    to,
                    delay_ms: (distance as u64 - 1) * delay_step_ms,
                });
            }
        }
        relocations
    }

    /// Plan the tag of an item inserted at `added_index` and how its neighbors
    /// make room.
    ///
    /// Slots keep their positions; items behind the new one shift into the next
    /// slot and a new back slot opens at the minimum spacing behind the old
    /// back item. Returns the tag of the new item and the relocations.
    pub fn relocate_after_add(
        &self,
        model: &TabModel,
        added_index: usize,
        previous: &[Tag],
        delay_step_ms: u64,
    ) -> (Tag, Vec<Relocation>) {
        let count = model.count();
        assert_eq!(
            previous.len() + 1,
            count,
            "relocation expects the tags from before the insertion"
        );

        if previous.iter().all(|tag| !tag.is_resolved()) {
            let items = self.initial_layout(model, None);
            let tag = items[added_index].tag;
            let relocations = items
                .into_iter()
                .filter(|item| item.index != added_index)
                .map(|item| Relocation {
                    key: item.key,
                    from: previous[if item.index > added_index { item.index - 1 } else { item.index }],
                    to: item.tag,
                    delay_ms: 0,
                })
                .collect();
            return (tag, relocations);
        }

        let min = self.policy.min_tab_spacing(count);
        let back = previous.len() - 1;
        let slot = |index: usize| {
            if index < previous.len() {
                previous[index].position
            } else {
                previous[back].position - min
            }
        };

        let mut added = Tag::default();
        let mut relocations = Vec::new();
        let mut predecessor: Option<State> = None;
        for index in 0..count {
            let to = self
                .policy
                .clip_position(count, index, slot(index), predecessor);
            predecessor = Some(to.state);

            if index == added_index {
                added = to;
                continue;
            }
            let from = previous[if index > added_index { index - 1 } else { index }];
            let distance = index.abs_diff(added_index);
            if from.position != to.position || from.state != to.state {
                relocations.push(Relocation {
                    key: model.key_at(index),
                    from,
                    to,
                    delay_ms: (distance as u64 - 1) * delay_step_ms,
                });
            }
        }
        (added, relocations)
    }
}

fn retag(item: Item, tag: Tag) -> Item {
    Item {
        tag: Tag {
            closing: item.tag.closing,
            ..tag
        },
        ..item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutTraits;
    use crate::model::TabSpec;

    fn model(count: usize) -> TabModel {
        let mut model = TabModel::new();
        for i in 0..count {
            model.insert_tab(TabSpec::new(format!("Tab {}", i)), i).unwrap();
        }
        model
    }

    fn layout() -> StackLayout {
        StackLayout::new(SpacingPolicy::new(LayoutTraits::phone(), 1000.0))
    }

    fn laid_out(count: usize) -> (StackLayout, TabModel) {
        let layout = layout();
        let mut model = model(count);
        let items = layout.initial_layout(&model, None);
        model.apply(&items);
        (layout, model)
    }

    fn tag(model: &TabModel, index: usize) -> Tag {
        model.stored_tag(model.key_at(index))
    }

    fn assert_monotonic(model: &TabModel) {
        for index in 1..model.count() {
            assert!(
                tag(model, index).position <= tag(model, index - 1).position,
                "item {} is in front of its predecessor",
                index
            );
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-2
    }

    #[test]
    fn test_initial_layout_of_twelve() {
        let (_, model) = laid_out(12);
        assert_eq!(tag(&model, 0), Tag::new(500.0, State::Floating));
        assert!(approx(tag(&model, 1).position, 250.0));
        assert_eq!(tag(&model, 2).state, State::Floating);
        assert_eq!(tag(&model, 3), Tag::new(36.0, State::StackedStartAtop));
        assert_eq!(tag(&model, 5).state, State::Hidden);
        assert_eq!(tag(&model, 9), Tag::new(24.0, State::StackedStart));
        assert_eq!(tag(&model, 11), Tag::new(0.0, State::StackedStart));
        assert_monotonic(&model);
    }

    #[test]
    fn test_initial_layout_around_reference() {
        let layout = layout();
        let model = model(6);
        let items = layout.initial_layout(&model, Some((3, 400.0)));
        assert_eq!(items[3].tag, Tag::new(400.0, State::Floating));
        assert_eq!(items[2].tag.position, 650.0);
        assert_eq!(items[1].tag.position, 900.0);
        assert_eq!(items[0].tag, Tag::new(978.0, State::StackedEnd));
    }

    #[test]
    fn test_initial_layout_empty() {
        let layout = layout();
        assert!(layout.initial_layout(&TabModel::new(), None).is_empty());
    }

    #[test]
    fn test_drag_to_end_pulls_attached_items() {
        let (mut layout, mut model) = laid_out(12);
        let overshoot = layout.drag(&mut model, DragState::DragToEnd, 100.0);
        assert_eq!(overshoot, Overshoot::None);

        assert_eq!(tag(&model, 0), Tag::new(600.0, State::Floating));
        assert!(approx(tag(&model, 1).position, 350.0));
        assert!(approx(tag(&model, 2).position, 146.875));
        assert_eq!(tag(&model, 3).state, State::Floating);
        assert_eq!(tag(&model, 4), Tag::new(36.0, State::StackedStartAtop));
        assert_eq!(tag(&model, 11), Tag::new(0.0, State::StackedStart));
        assert_eq!(layout.last_attached_index(), Some(1));
        assert_monotonic(&model);
    }

    #[test]
    fn test_drag_to_start_pushes_items() {
        let (mut layout, mut model) = laid_out(12);
        let overshoot = layout.drag(&mut model, DragState::DragToStart, -100.0);
        assert_eq!(overshoot, Overshoot::None);

        assert_eq!(tag(&model, 0), Tag::new(400.0, State::Floating));
        assert!(approx(tag(&model, 1).position, 181.25));
        assert_eq!(tag(&model, 2), Tag::new(36.0, State::StackedStartAtop));
        assert_eq!(tag(&model, 3), Tag::new(36.0, State::Hidden));
        assert_monotonic(&model);
    }

    #[test]
    fn test_drag_to_start_overshoots() {
        let (mut layout, mut model) = laid_out(12);
        let overshoot = layout.drag(&mut model, DragState::DragToStart, -1000.0);
        assert_eq!(overshoot, Overshoot::Start);
        assert_eq!(tag(&model, 0), Tag::new(36.0, State::StackedStartAtop));
        assert!(layout.is_overshooting_at_start(&model));
        assert_monotonic(&model);
    }

    #[test]
    fn test_drag_to_end_overshoots() {
        let (mut layout, mut model) = laid_out(2);
        assert_eq!(
            layout.drag(&mut model, DragState::DragToEnd, 100.0),
            Overshoot::None
        );
        assert_eq!(tag(&model, 0).position, 600.0);
        assert_eq!(
            layout.drag(&mut model, DragState::DragToEnd, 100.0),
            Overshoot::End
        );
        assert!(approx(tag(&model, 0).position, 660.0));
        assert_eq!(tag(&model, 1), Tag::new(0.0, State::StackedStartAtop));
    }

    #[test]
    fn test_drag_backward_pulls_items_out_of_the_end_stack() {
        let layout_template = layout();
        let mut model = model(6);
        let items = layout_template.initial_layout(&model, Some((3, 400.0)));
        model.apply(&items);
        let mut layout = layout_template;

        assert_eq!(layout.first_visible_index(&model), Some(1));
        layout.drag(&mut model, DragState::DragToStart, -200.0);
        assert_eq!(tag(&model, 1).state, State::Floating);
        assert_eq!(tag(&model, 0).state, State::Floating);
        assert_monotonic(&model);
    }

    #[test]
    fn test_single_item_always_overshoots() {
        let (mut layout, mut model) = laid_out(1);
        assert!(layout.is_overshooting_at_start(&model));
        assert!(layout.is_overshooting_at_end(&model));
        assert_eq!(
            layout.drag(&mut model, DragState::DragToEnd, 10.0),
            Overshoot::End
        );
        assert_eq!(
            layout.drag(&mut model, DragState::DragToStart, -10.0),
            Overshoot::Start
        );
    }

    #[test]
    fn test_reset_gesture() {
        let (mut layout, mut model) = laid_out(5);
        layout.drag(&mut model, DragState::DragToEnd, 10.0);
        assert!(layout.tracked_first_visible_index().is_some());
        layout.reset_gesture();
        assert!(layout.tracked_first_visible_index().is_none());
        assert!(layout.last_attached_index().is_none());
    }

    #[test]
    fn test_relocate_after_remove() {
        let layout = layout();
        let mut model = model(5);
        let positions = [800.0, 600.0, 400.0, 250.0, 100.0];
        let previous: Vec<Tag> = positions
            .iter()
            .map(|position| Tag::new(*position, State::Floating))
            .collect();
        let removed = model.tabs()[2].id;
        model.remove_tab(removed).unwrap();

        let relocations = layout.relocate_after_remove(&model, 2, &previous, 25);
        assert_eq!(relocations.len(), 2);
        assert_eq!(relocations[0].key, model.key_at(2));
        assert_eq!(relocations[0].to, Tag::new(400.0, State::Floating));
        assert_eq!(relocations[0].delay_ms, 0);
        assert_eq!(relocations[1].to, Tag::new(250.0, State::Floating));
        assert_eq!(relocations[1].delay_ms, 25);
    }

    #[test]
    fn test_relocate_after_removing_back_item() {
        let layout = layout();
        let mut model = model(3);
        let previous = vec![
            Tag::new(700.0, State::Floating),
            Tag::new(300.0, State::Floating),
            Tag::new(0.0, State::StackedStartAtop),
        ];
        let removed = model.tabs()[2].id;
        model.remove_tab(removed).unwrap();

        let relocations = layout.relocate_after_remove(&model, 2, &previous, 25);
        assert_eq!(relocations.len(), 2);
        assert_eq!(relocations[0].to, Tag::new(300.0, State::Floating));
        assert_eq!(relocations[0].delay_ms, 25);
        assert_eq!(relocations[1].to, Tag::new(0.0, State::StackedStartAtop));
        assert_eq!(relocations[1].delay_ms, 0);
    }

    #[test]
    fn test_relocate_after_add() {
        let layout = layout();
        let mut model = model(3);
        let previous = vec![
            Tag::new(700.0, State::Floating),
            Tag::new(400.0, State::Floating),
            Tag::new(150.0, State::Floating),
        ];
        model.insert_tab(TabSpec::new("new"), 1).unwrap();

        let (added, relocations) = layout.relocate_after_add(&model, 1, &previous, 25);
        assert_eq!(added, Tag::new(400.0, State::Floating));
        assert_eq!(relocations.len(), 2);
        assert_eq!(relocations[0].key, model.key_at(2));
        assert_eq!(relocations[0].to.position, 150.0);
        assert_eq!(relocations[0].delay_ms, 0);
        assert_eq!(relocations[1].key, model.key_at(3));
        assert_eq!(relocations[1].to, Tag::new(37.5, State::Floating));
        assert_eq!(relocations[1].delay_ms, 25);
    }

    #[test]
    fn test_first_add_uses_initial_layout() {
        let layout = layout();
        let mut model = TabModel::new();
        model.insert_tab(TabSpec::new("first"), 0).unwrap();
        let (added, relocations) = layout.relocate_after_add(&model, 0, &[], 25);
        assert_eq!(added, Tag::new(500.0, State::Floating));
        assert!(relocations.is_empty());
    }

    #[test]
    fn test_fling_decelerates() {
        let mut fling = Fling::new(300.0, 300);
        assert_eq!(fling.direction(), DragState::DragToEnd);
        let first = fling.advance(100);
        let second = fling.advance(100);
        let third = fling.advance(100);
        assert!(first > second && second > third);
        assert!(approx(first + second + third, 300.0));
        assert!(fling.is_finished());
        assert_eq!(fling.advance(16), 0.0);
    }

    #[test]
    fn test_overshoot_effect() {
        let mut layout = layout();
        layout.set_start_overshoot(20.0);
        layout.set_tilt(DragState::OvershootStart, 1.5);
        assert!(layout.overshoot().is_active());
        assert_eq!(layout.overshoot().state, DragState::OvershootStart);

        let effect = layout.clear_overshoot();
        assert_eq!(effect.translation, 20.0);
        assert!(!layout.overshoot().is_active());

        layout.set_tilt(DragState::OvershootEnd, 2.0);
        assert_eq!(layout.overshoot().angle, -2.0);

        let effect = layout.release_overshoot();
        assert_eq!(effect.angle, -2.0);
        assert_eq!(layout.overshoot().state, DragState::OvershootEnd);
        layout.restore_pivot();
        assert_eq!(layout.overshoot().state, DragState::None);
    }
}
