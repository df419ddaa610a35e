//! The tab switcher facade.
//!
//! [`TabSwitcher`] owns the model, the layout, the gesture tracker, the
//! animator and the surfaces, and exposes the lifecycle API a host drives:
//! tab changes, switcher visibility, touch input, measured size and the
//! animation clock. Every call ends with a sync pass that binds tags onto
//! surfaces and then lets running tweens override the properties they animate.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::animation::{AnimationStyle, Animator, Completion, Orchestrator, Plan, SwipeDirection};
use crate::arithmetics::{Arithmetics, Axis};
use crate::config::SwitcherConfig;
use crate::drag::{DragCallback, DragState, GestureTracker, Overshoot, TouchEvent};
use crate::layout::{Fling, StackLayout};
use crate::model::{Item, ItemKey, TabId, TabModel, TabSpec, Tag};
use crate::policy::SpacingPolicy;
use crate::state::{ContentState, FirstVisible, SwitcherSnapshot};
use crate::surface::{bind, bind_full_screen, Surface, SurfacePool, SurfaceRecycler};
use crate::StackError;

/// Alpha of a card swiped across the whole orthogonal axis.
const MIN_SWIPE_ALPHA: f32 = 0.25;

/// Scale of a card swiped across the whole orthogonal axis, relative to the
/// tab scale.
const MIN_SWIPE_SCALE: f32 = 0.8;

/// Notification for the host, drained with [`TabSwitcher::drain_events`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SwitcherEvent {
    TabAdded { id: TabId, index: usize },
    TabRemoved { id: TabId },
    SelectionChanged { id: Option<TabId> },
    SwitcherShown,
    SwitcherHidden,
    AllTabsRemoved,
    /// The add button was clicked.
    AddTabRequested,
    GestureStarted,
}

/// Where a bound surface currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub key: ItemKey,
    /// `None` for a removed item that is still animating out.
    pub index: Option<usize>,
    pub tag: Option<Tag>,
    pub surface: Surface,
}

/// Card-stack tab switcher.
pub struct TabSwitcher<R: SurfaceRecycler = SurfacePool> {
    tracker: GestureTracker,
    stack: Stack<R>,
}

impl TabSwitcher<SurfacePool> {
    /// Create a switcher backed by an in-memory surface pool.
    pub fn with_pool(config: SwitcherConfig) -> Result<Self, StackError> {
        let pool = SurfacePool::new(config.max_recycled_surfaces);
        Self::new(config, pool)
    }
}

impl<R: SurfaceRecycler> TabSwitcher<R> {
    pub fn new(config: SwitcherConfig, recycler: R) -> Result<Self, StackError> {
        config.validate()?;
        let arithmetics = Arithmetics::new(&config);
        Ok(Self {
            tracker: GestureTracker::new(config.drag),
            stack: Stack {
                config,
                model: TabModel::new(),
                layout: StackLayout::new(SpacingPolicy::new(config.traits, 0.0)),
                arithmetics,
                orchestrator: Orchestrator::new(config.durations),
                animator: Animator::new(),
                recycler,
                shown: false,
                fling: None,
                swipe: None,
                detaching: HashSet::new(),
                content: ContentState::new(),
                events: Vec::new(),
            },
        })
    }

    pub fn config(&self) -> &SwitcherConfig {
        &self.stack.config
    }

    pub fn model(&self) -> &TabModel {
        &self.stack.model
    }

    pub fn layout(&self) -> &StackLayout {
        &self.stack.layout
    }

    pub fn arithmetics(&self) -> &Arithmetics {
        &self.stack.arithmetics
    }

    pub fn recycler(&self) -> &R {
        &self.stack.recycler
    }

    pub fn content(&self) -> &ContentState {
        &self.stack.content
    }

    pub fn content_mut(&mut self) -> &mut ContentState {
        &mut self.stack.content
    }

    pub fn is_shown(&self) -> bool {
        self.stack.shown
    }

    pub fn drag_state(&self) -> DragState {
        self.tracker.state()
    }

    /// Whether a tween or a fling is running.
    pub fn is_animating(&self) -> bool {
        self.stack.animator.is_animating() || self.stack.fling.is_some()
    }

    pub fn is_overshooting_at_start(&self) -> bool {
        self.stack.layout.is_overshooting_at_start(&self.stack.model)
    }

    pub fn is_overshooting_at_end(&self) -> bool {
        self.stack.layout.is_overshooting_at_end(&self.stack.model)
    }

    /// Tag of a tab.
    pub fn tag(&self, id: TabId) -> Option<Tag> {
        self.stack
            .model
            .contains(ItemKey::Tab(id))
            .then(|| self.stack.model.stored_tag(ItemKey::Tab(id)))
    }

    /// Handle a new container size, e.g. after a rotation.
    pub fn on_layout(&mut self, width: f32, height: f32) {
        self.stack.on_layout(width, height);
        self.stack.sync();
    }

    /// Add a tab at a tab index (0 when omitted, the front of the stack).
    pub fn add_tab(
        &mut self,
        spec: TabSpec,
        index: Option<usize>,
        style: AnimationStyle,
    ) -> Result<TabId, StackError> {
        let id = self.stack.add_tab(spec, index.unwrap_or(0), style)?;
        self.stack.sync();
        Ok(id)
    }

    pub fn remove_tab(&mut self, id: TabId, style: AnimationStyle) -> Result<(), StackError> {
        let direction = match style {
            AnimationStyle::Swipe { direction, .. } => direction,
            _ => SwipeDirection::default(),
        };
        self.stack.remove_tab(id, direction, 0.0)?;
        self.stack.sync();
        Ok(())
    }

    /// Remove every tab.
    pub fn clear(&mut self) {
        self.tracker.cancel(&mut self.stack);
        self.stack.clear();
        self.stack.sync();
    }

    pub fn select_tab(&mut self, id: TabId) -> Result<(), StackError> {
        self.stack.select(id)?;
        self.stack.sync();
        Ok(())
    }

    pub fn show_switcher(&mut self) {
        self.stack.show();
        self.stack.sync();
    }

    pub fn hide_switcher(&mut self) {
        self.tracker.cancel(&mut self.stack);
        self.stack.hide();
        self.stack.sync();
    }

    pub fn toggle_switcher(&mut self) {
        if self.stack.shown {
            self.hide_switcher();
        } else {
            self.show_switcher();
        }
    }

    pub fn set_add_button_shown(&mut self, shown: bool) {
        self.stack.set_add_button_shown(shown);
        self.stack.sync();
    }

    /// Feed a touch event. Touches are ignored while the switcher is hidden.
    /// Returns `true` if the event was consumed.
    pub fn on_touch(&mut self, event: &TouchEvent) -> bool {
        if !self.stack.shown {
            return false;
        }
        let consumed = self.tracker.handle(event, &mut self.stack);
        self.stack.sync();
        consumed
    }

    /// Advance the animation clock.
    pub fn tick(&mut self, delta_ms: u64) {
        self.stack.tick(delta_ms);
        self.stack.sync();
    }

    /// Every bound surface: items in index order, then removed items that are
    /// still animating out.
    pub fn placements(&self) -> Vec<Placement> {
        let stack = &self.stack;
        let mut placements: Vec<Placement> = stack
            .model
            .keys()
            .enumerate()
            .filter_map(|(index, key)| {
                stack.recycler.surface(key).map(|surface| Placement {
                    key,
                    index: Some(index),
                    tag: Some(stack.model.stored_tag(key)),
                    surface: *surface,
                })
            })
            .collect();
        let mut detaching: Vec<ItemKey> = stack.detaching.iter().copied().collect();
        detaching.sort_by_key(|key| key.tab_id());
        placements.extend(detaching.into_iter().filter_map(|key| {
            stack.recycler.surface(key).map(|surface| Placement {
                key,
                index: None,
                tag: None,
                surface: *surface,
            })
        }));
        placements
    }

    pub fn drain_events(&mut self) -> Vec<SwitcherEvent> {
        std::mem::take(&mut self.stack.events)
    }

    pub fn save_state(&self) -> SwitcherSnapshot {
        self.stack.snapshot()
    }

    /// Rebuild the switcher from a snapshot. Running animations are dropped.
    pub fn restore_state(&mut self, snapshot: SwitcherSnapshot) -> Result<(), StackError> {
        self.tracker.cancel(&mut self.stack);
        self.stack.restore(snapshot)?;
        self.stack.sync();
        Ok(())
    }
}

/// Everything the gesture tracker drives.
struct Stack<R> {
    config: SwitcherConfig,
    model: TabModel,
    layout: StackLayout,
    arithmetics: Arithmetics,
    orchestrator: Orchestrator,
    animator: Animator,
    recycler: R,
    shown: bool,
    fling: Option<Fling>,
    swipe: Option<(ItemKey, f32)>,
    /// Removed items whose cards are still animating out.
    detaching: HashSet<ItemKey>,
    content: ContentState,
    events: Vec<SwitcherEvent>,
}

impl<R: SurfaceRecycler> Stack<R> {
    fn selected_key(&self) -> Option<ItemKey> {
        self.model.selected().map(ItemKey::Tab)
    }

    fn items(&self) -> Vec<Item> {
        (0..self.model.count()).map(|index| self.model.item_at(index)).collect()
    }

    /// Tags items will have once running tweens complete.
    fn effective_tags(&self) -> Vec<Tag> {
        self.model
            .keys()
            .map(|key| {
                self.animator
                    .pending_tag(key)
                    .unwrap_or_else(|| self.model.stored_tag(key))
            })
            .collect()
    }

    fn is_surface_visible(&self, key: ItemKey) -> bool {
        self.recycler.surface(key).is_some_and(|surface| surface.visible)
    }

    fn run(&mut self, plan: Plan) {
        for (key, tag) in plan.settle {
            self.model.set_tag(key, tag);
        }
        for key in plan.release {
            if !self.animator.is_animating_key(key) {
                self.recycler.release(key);
            }
        }
        for tween in plan.tweens {
            let cancelled = self.animator.start(tween, &mut self.recycler, &self.arithmetics);
            for completion in cancelled {
                self.complete(completion, true);
            }
        }
    }

    fn complete(&mut self, completion: Completion, cancelled: bool) {
        match completion {
            Completion::Settle { key, tag } => {
                if self.model.contains(key) {
                    self.model.set_tag(key, tag);
                } else {
                    debug!("Ignoring stale settle of {}", key);
                }
            }
            Completion::Detach { key } | Completion::Release { key } => {
                self.detaching.remove(&key);
            }
            Completion::PeekFinished { key } => trace!("{} stopped peeking", key),
            Completion::SwipeReverted { key } => {
                if self.model.contains(key) {
                    self.model.tag_mut(key).closing = false;
                } else {
                    debug!("Ignoring stale swipe revert of {}", key);
                }
            }
            Completion::OvershootReverted => self.layout.restore_pivot(),
            Completion::SwitcherShown if !cancelled && self.shown => {
                self.events.push(SwitcherEvent::SwitcherShown);
            }
            Completion::SwitcherHidden if !cancelled && !self.shown => {
                self.events.push(SwitcherEvent::SwitcherHidden);
            }
            Completion::SwitcherShown | Completion::SwitcherHidden => {
                debug!("Dropping {:?} of an interrupted transition", completion);
            }
        }
    }

    fn finish_animations(&mut self) {
        for completion in self.animator.finish_all() {
            self.complete(completion, false);
        }
    }

    fn on_layout(&mut self, width: f32, height: f32) {
        let old_length = self.arithmetics.axis_length();
        self.arithmetics.set_container_size(width, height);
        self.layout.set_axis_length(self.arithmetics.axis_length());
        self.fling = None;
        self.finish_animations();
        debug!(
            "Container measured at {}x{} ({:?})",
            width,
            height,
            self.arithmetics.orientation()
        );

        if self.shown {
            let new_length = self.arithmetics.axis_length();
            let reference = self.layout.first_visible_index(&self.model).and_then(|index| {
                let tag = self.model.stored_tag(self.model.key_at(index));
                (tag.is_resolved() && old_length > 0.0)
                    .then(|| (index, tag.position * new_length / old_length))
            });
            let mut items = self.layout.initial_layout(&self.model, reference);
            let selected_hidden = self.model.selected_index().is_some_and(|index| {
                !items[index].tag.state.is_visible()
            });
            if selected_hidden {
                items = self.layout.initial_layout(&self.model, None);
            }
            self.model.apply(&items);
            self.layout.reset_gesture();
        }
    }

    fn add_tab(
        &mut self,
        spec: TabSpec,
        tab_index: usize,
        style: AnimationStyle,
    ) -> Result<TabId, StackError> {
        let previous = self.effective_tags();
        let previous_selected = self.selected_key();
        let id = self.model.insert_tab(spec, tab_index)?;
        let key = ItemKey::Tab(id);
        let index = self.model.index_of(id).unwrap_or(tab_index);
        info!("Added tab {} at {}", id, index);
        self.events.push(SwitcherEvent::TabAdded { id, index });

        if self.shown {
            let (tag, relocations) = self.layout.relocate_after_add(
                &self.model,
                index,
                &previous,
                self.config.durations.relocate_delay_step,
            );
            let plan =
                self.orchestrator
                    .add_to_stack(key, tag, style, &relocations, &self.arithmetics);
            self.run(plan);
            return Ok(id);
        }

        let style = match style {
            AnimationStyle::Peek { x, y } if previous_selected.is_none() => {
                AnimationStyle::Reveal { x, y }
            }
            style => style,
        };
        match style {
            AnimationStyle::Peek { .. } => {
                let (surface, _) = self.recycler.obtain(key);
                bind_full_screen(&self.arithmetics, surface);
            }
            _ => {
                if previous_selected.is_some() {
                    self.model.select(id)?;
                }
                self.events.push(SwitcherEvent::SelectionChanged { id: Some(id) });
            }
        }
        let plan = self
            .orchestrator
            .add_full_screen(key, previous_selected, style, &self.arithmetics);
        self.run(plan);
        Ok(id)
    }

    fn remove_tab(
        &mut self,
        id: TabId,
        direction: SwipeDirection,
        velocity: f32,
    ) -> Result<(), StackError> {
        let key = ItemKey::Tab(id);
        let previous = self.effective_tags();
        let was_selected = self.model.is_selected(key);
        let visible = self.shown && self.is_surface_visible(key);
        let (index, tab) = self.model.remove_tab(id)?;
        info!("Removed tab {} \"{}\" from {}", id, tab.title, index);
        self.content.remove(id);
        self.events.push(SwitcherEvent::TabRemoved { id });
        if was_selected {
            self.events.push(SwitcherEvent::SelectionChanged {
                id: self.model.selected(),
            });
        }

        if !self.shown {
            for completion in self.animator.cancel(key) {
                self.complete(completion, true);
            }
            return Ok(());
        }

        let relocations = self.layout.relocate_after_remove(
            &self.model,
            index,
            &previous,
            self.config.durations.relocate_delay_step,
        );
        let plan = if visible {
            self.detaching.insert(key);
            self.orchestrator
                .remove(key, direction, velocity, &relocations, &self.arithmetics)
        } else {
            for completion in self.animator.cancel(key) {
                self.complete(completion, true);
            }
            self.orchestrator.relocate(&relocations)
        };
        self.run(plan);
        Ok(())
    }

    fn clear(&mut self) {
        let visible: Vec<ItemKey> = self
            .model
            .keys()
            .filter(|key| key.tab_id().is_some() && self.shown && self.is_surface_visible(*key))
            .collect();
        let had_selection = self.model.selected().is_some();
        let tabs = self.model.clear();
        if tabs.is_empty() {
            return;
        }
        info!("Removed all {} tabs", tabs.len());
        for tab in &tabs {
            self.content.remove(tab.id);
            let key = ItemKey::Tab(tab.id);
            if !visible.contains(&key) {
                for completion in self.animator.cancel(key) {
                    self.complete(completion, true);
                }
            }
        }
        self.events.push(SwitcherEvent::AllTabsRemoved);
        if had_selection {
            self.events.push(SwitcherEvent::SelectionChanged { id: None });
        }

        if self.shown {
            self.detaching.extend(visible.iter().copied());
            let plan = self.orchestrator.clear(&visible, &self.arithmetics);
            self.run(plan);
            let items = self.layout.initial_layout(&self.model, None);
            self.model.apply(&items);
        }
    }

    fn select(&mut self, id: TabId) -> Result<(), StackError> {
        if self.model.selected() == Some(id) {
            return Ok(());
        }
        self.model.select(id)?;
        debug!("Selected tab {}", id);
        self.events.push(SwitcherEvent::SelectionChanged { id: Some(id) });
        Ok(())
    }

    fn show(&mut self) {
        if self.shown {
            return;
        }
        info!("Showing the switcher");
        self.shown = true;
        self.fling = None;
        self.layout.reset_gesture();
        let items = self.layout.initial_layout(&self.model, None);
        let plan = self
            .orchestrator
            .show(&items, self.selected_key(), &self.arithmetics);
        let announced = plan
            .tweens
            .iter()
            .any(|tween| tween.completions.contains(&Completion::SwitcherShown));
        self.run(plan);
        if !announced {
            self.events.push(SwitcherEvent::SwitcherShown);
        }
    }

    fn hide(&mut self) {
        if !self.shown {
            return;
        }
        info!("Hiding the switcher");
        self.fling = None;
        self.swipe = None;
        self.layout.clear_overshoot();

        let selected = self.selected_key();
        if let Some(key) = selected {
            let tag = self.model.stored_tag(key);
            let (surface, _) = self.recycler.obtain(key);
            if !surface.visible && !self.animator.is_animating_key(key) {
                bind(&self.arithmetics, surface, &tag, DragState::None);
            }
        }
        let visible: Vec<ItemKey> = self
            .model
            .keys()
            .filter(|key| self.is_surface_visible(*key))
            .collect();
        self.shown = false;
        let plan = self.orchestrator.hide(&visible, selected, &self.arithmetics);
        self.run(plan);
        if selected.is_none() {
            self.events.push(SwitcherEvent::SwitcherHidden);
        }
    }

    fn set_add_button_shown(&mut self, shown: bool) {
        if self.model.add_button_shown() == shown {
            return;
        }
        self.finish_animations();
        self.model.set_add_button_shown(shown);
        if self.shown {
            let items = self.layout.initial_layout(&self.model, None);
            self.model.apply(&items);
        }
    }

    fn tick(&mut self, delta_ms: u64) {
        if let Some(fling) = self.fling.as_mut() {
            let increment = fling.advance(delta_ms);
            let direction = fling.direction();
            let finished = fling.is_finished();
            let overshoot = self.layout.drag(&mut self.model, direction, increment);
            if finished || overshoot != Overshoot::None {
                trace!("Fling stopped (overshoot: {:?})", overshoot);
                self.fling = None;
            }
        }
        for completion in self.animator.tick(delta_ms) {
            self.complete(completion, false);
        }
    }

    /// Whether an item should have a bound surface, ignoring animations.
    fn needs_surface(&self, key: ItemKey) -> bool {
        if !self.model.contains(key) {
            return false;
        }
        if !self.shown {
            return Some(key) == self.selected_key();
        }
        let tag = self.model.stored_tag(key);
        (tag.state.is_visible() && tag.is_resolved())
            || self.swipe.is_some_and(|(swiped, _)| swiped == key)
    }

    /// Bind tags onto surfaces and apply running tweens on top.
    fn sync(&mut self) {
        let arithmetics = self.arithmetics;
        for key in self.recycler.bound_keys() {
            let animating = self.animator.is_animating_key(key);
            if !animating {
                self.detaching.remove(&key);
            }
            if !animating && !self.needs_surface(key) {
                self.recycler.release(key);
            }
        }

        if self.shown {
            let effect = *self.layout.overshoot();
            for item in self.items() {
                if !self.needs_surface(item.key) && !self.animator.is_animating_key(item.key) {
                    continue;
                }
                let (surface, _) = self.recycler.obtain(item.key);
                bind(&arithmetics, surface, &item.tag, effect.state);
                if surface.visible && effect.angle != 0.0 {
                    arithmetics.set_rotation(Axis::Dragging, surface, effect.angle);
                }
                if item.index == 0 && effect.translation != 0.0 {
                    let position = arithmetics.position(Axis::Dragging, surface);
                    arithmetics.set_position(Axis::Dragging, surface, position - effect.translation);
                }
                if let Some((_, distance)) = self.swipe.filter(|(key, _)| *key == item.key) {
                    let length = arithmetics.orthogonal_length();
                    let ratio = if length > 0.0 {
                        (distance.abs() / length).min(1.0)
                    } else {
                        1.0
                    };
                    arithmetics.set_position(Axis::Orthogonal, surface, distance);
                    surface.alpha = 1.0 - (1.0 - MIN_SWIPE_ALPHA) * ratio;
                    surface.scale = arithmetics.tab_scale() * (1.0 - (1.0 - MIN_SWIPE_SCALE) * ratio);
                }
            }
        } else if let Some(id) = self.model.selected() {
            let (surface, fresh) = self.recycler.obtain(ItemKey::Tab(id));
            bind_full_screen(&arithmetics, surface);
            if fresh {
                trace!("Tab {} is now on screen", id);
            }
            self.content.mark_shown(id);
        }

        self.animator.apply(&mut self.recycler, &arithmetics);
    }

    fn snapshot(&self) -> SwitcherSnapshot {
        let first_visible = self
            .shown
            .then(|| self.layout.first_visible_index(&self.model))
            .flatten()
            .and_then(|index| {
                let key = self.model.key_at(index);
                let tag = self
                    .animator
                    .pending_tag(key)
                    .unwrap_or_else(|| self.model.stored_tag(key));
                tag.is_resolved().then_some(FirstVisible {
                    key,
                    position: tag.position,
                })
            });
        SwitcherSnapshot {
            tabs: self.model.tabs().to_vec(),
            selected: self.model.selected(),
            switcher_shown: self.shown,
            add_button_shown: self.model.add_button_shown(),
            first_visible,
            content: self.content.clone(),
        }
    }

    fn restore(&mut self, snapshot: SwitcherSnapshot) -> Result<(), StackError> {
        snapshot.validate()?;
        let SwitcherSnapshot {
            tabs,
            selected,
            switcher_shown,
            add_button_shown,
            first_visible,
            mut content,
        } = snapshot;

        for completion in self.animator.cancel_all() {
            self.complete(completion, true);
        }
        self.model.restore(tabs, selected, add_button_shown)?;
        self.recycler.clear();
        self.detaching.clear();
        self.fling = None;
        self.swipe = None;
        self.layout.reset_gesture();
        self.layout.clear_overshoot();

        let ids: BTreeSet<TabId> = self.model.tabs().iter().map(|tab| tab.id).collect();
        content.retain(&ids);
        self.content = content;
        self.shown = switcher_shown;
        if self.shown {
            let reference = first_visible.and_then(|first_visible| {
                self.model
                    .item_index(first_visible.key)
                    .map(|index| (index, first_visible.position))
            });
            let items = self.layout.initial_layout(&self.model, reference);
            self.model.apply(&items);
        }
        info!(
            "Restored {} tabs (switcher shown: {})",
            self.model.tab_count(),
            self.shown
        );
        Ok(())
    }
}

impl<R: SurfaceRecycler> DragCallback for Stack<R> {
    fn logical_point(&self, x: f32, y: f32) -> (f32, f32) {
        self.arithmetics.logical_point(x, y)
    }

    /// The front-most visible card under a point. A card spans the length of
    /// the container behind its position, scaled to the tab scale.
    fn item_at(&self, dragging: f32, orthogonal: f32) -> Option<ItemKey> {
        if orthogonal < 0.0 || orthogonal > self.arithmetics.orthogonal_length() {
            return None;
        }
        let length = self.arithmetics.container_size(Axis::Dragging) * self.arithmetics.tab_scale();
        self.model
            .keys()
            .map(|key| (key, self.model.stored_tag(key)))
            .find(|(_, tag)| {
                tag.state.is_visible()
                    && tag.is_resolved()
                    && dragging >= tag.position
                    && dragging < tag.position + length
            })
            .map(|(key, _)| key)
    }

    fn is_closeable(&self, key: ItemKey) -> bool {
        self.model.is_closeable(key)
    }

    fn orthogonal_length(&self) -> f32 {
        self.arithmetics.orthogonal_length()
    }

    fn on_gesture_start(&mut self) {
        self.fling = None;
        self.finish_animations();
        self.layout.reset_gesture();
        self.layout.clear_overshoot();
        self.events.push(SwitcherEvent::GestureStarted);
    }

    fn on_drag(&mut self, state: DragState, delta: f32) -> Overshoot {
        self.layout.drag(&mut self.model, state, delta)
    }

    fn on_click(&mut self, key: ItemKey) {
        match key {
            ItemKey::AddButton => self.events.push(SwitcherEvent::AddTabRequested),
            ItemKey::Tab(id) => {
                if let Err(err) = self.select(id) {
                    warn!("Clicked tab is gone: {}", err);
                    return;
                }
                self.hide();
            }
        }
    }

    fn on_swipe(&mut self, key: ItemKey, distance: f32) {
        if !self.model.contains(key) {
            return;
        }
        self.model.tag_mut(key).closing = true;
        self.swipe = Some((key, distance));
    }

    fn on_swipe_ended(&mut self, key: ItemKey, close: bool, velocity: f32) {
        let distance = self
            .swipe
            .take()
            .map(|(_, distance)| distance)
            .unwrap_or_default();
        match key.tab_id() {
            Some(id) if close && self.model.contains(key) => {
                if let Err(err) = self.remove_tab(id, SwipeDirection::of(distance), velocity.abs()) {
                    warn!("Failed to close swiped tab: {}", err);
                }
            }
            _ if self.model.contains(key) => {
                let plan = self.orchestrator.revert_swipe(key, &self.arithmetics);
                self.run(plan);
            }
            _ => debug!("Swiped {} is gone", key),
        }
    }

    fn on_start_overshoot(&mut self, distance: f32) {
        self.layout.set_start_overshoot(distance);
    }

    fn on_tilt(&mut self, state: DragState, angle: f32) {
        self.layout.set_tilt(state, angle);
    }

    fn on_revert_start_overshoot(&mut self, progress: f32) {
        self.revert_overshoot(progress);
    }

    fn on_revert_end_overshoot(&mut self, progress: f32) {
        self.revert_overshoot(progress);
    }

    fn on_fling(&mut self, distance: f32, duration_ms: u64) {
        self.fling = Some(Fling::new(distance, duration_ms));
    }
}

impl<R: SurfaceRecycler> Stack<R> {
    fn revert_overshoot(&mut self, progress: f32) {
        let effect = self.layout.release_overshoot();
        let visible: Vec<Item> = self
            .items()
            .into_iter()
            .filter(|item| self.is_surface_visible(item.key))
            .collect();
        let plan = self.orchestrator.revert_overshoot(&visible, &effect, progress);
        if plan.is_empty() {
            self.layout.restore_pivot();
        }
        self.run(plan);
    }
}
