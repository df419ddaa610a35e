//! Property tests for the spacing policy, the item iterator and the model.

use proptest::prelude::*;

use tabstack_core::iterator::Resolve;
use tabstack_core::layout::StackLayout;
use tabstack_core::{DragState, ItemIterator, LayoutTraits, SpacingPolicy, State, TabModel, TabSpec, Tag};

fn predecessor_state() -> impl Strategy<Value = Option<State>> {
    prop_oneof![
        Just(None),
        Just(Some(State::StackedStart)),
        Just(Some(State::StackedStartAtop)),
        Just(Some(State::Floating)),
        Just(Some(State::StackedEnd)),
        Just(Some(State::Hidden)),
    ]
}

fn traits() -> impl Strategy<Value = LayoutTraits> {
    prop_oneof![Just(LayoutTraits::phone()), Just(LayoutTraits::tablet())]
}

/// Count, an index below it, and an axis length.
fn stack() -> impl Strategy<Value = (usize, usize, f32)> {
    (1usize..=50, 0.0f32..3000.0)
        .prop_flat_map(|(count, axis)| (Just(count), 0..count, Just(axis)))
}

fn model(count: usize) -> TabModel {
    let mut model = TabModel::new();
    for i in 0..count {
        model.insert_tab(TabSpec::new(format!("Tab {}", i)), i).unwrap();
    }
    model
}

/// Resolver that records how often each index was resolved.
struct Counting {
    calls: Vec<usize>,
}

impl Resolve for Counting {
    fn resolve(&mut self, _model: &TabModel, index: usize, _predecessor: Option<&tabstack_core::Item>) -> Tag {
        self.calls[index] += 1;
        Tag::new(index as f32 * 10.0, State::Floating)
    }
}

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Remove(usize),
    ToggleAddButton,
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..64).prop_map(Op::Add),
        3 => (0usize..64).prop_map(Op::Remove),
        1 => Just(Op::ToggleAddButton),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #[test]
    fn clip_is_monotonic(
        (count, index, axis) in stack(),
        traits in traits(),
        predecessor in predecessor_state(),
        a in -500.0f32..3500.0,
        b in -500.0f32..3500.0,
    ) {
        let policy = SpacingPolicy::new(traits, axis);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low = policy.clip_position(count, index, low, predecessor);
        let high = policy.clip_position(count, index, high, predecessor);
        prop_assert!(low.position <= high.position);
    }

    #[test]
    fn clip_stays_within_boundaries(
        (count, index, axis) in stack(),
        traits in traits(),
        predecessor in predecessor_state(),
        raw in prop_oneof![Just(f32::NAN), -500.0f32..3500.0],
    ) {
        let policy = SpacingPolicy::new(traits, axis);
        let (start, _) = policy.start_boundary(count, index, predecessor);
        let (end, _) = policy.end_boundary(count, index, predecessor);
        let tag = policy.clip_position(count, index, raw, predecessor);
        prop_assert!(start <= end);
        prop_assert!(tag.position >= start && tag.position <= end);
        if tag.state == State::Floating {
            prop_assert_eq!(tag.position, raw);
        }
    }

    #[test]
    fn initial_layout_is_ordered(
        count in 1usize..=50,
        selected in 0usize..50,
        axis in 100.0f32..3000.0,
        traits in traits(),
    ) {
        let mut model = model(count);
        let id = model.tabs()[selected % count].id;
        model.select(id).unwrap();
        let layout = StackLayout::new(SpacingPolicy::new(traits, axis));
        let items = layout.initial_layout(&model, None);
        prop_assert_eq!(items.len(), count);
        for pair in items.windows(2) {
            prop_assert!(pair[1].tag.position <= pair[0].tag.position);
        }
    }

    #[test]
    fn iterator_resolves_each_item_once(count in 1usize..40, probes in prop::collection::vec(0usize..40, 1..20)) {
        let model = model(count);
        let resolver = Counting { calls: vec![0; count] };
        let mut iter = ItemIterator::new(&model, resolver);
        for probe in probes {
            let index = probe % count;
            let first = iter.item_at(index);
            let second = iter.item_at(index);
            prop_assert_eq!(first, second);
        }
        let visited: Vec<_> = iter.by_ref().collect();
        prop_assert_eq!(visited.len(), count);
        for item in visited {
            prop_assert_eq!(iter.item_at(item.index), item);
        }
    }

    #[test]
    fn count_tracks_tabs_and_add_button(ops in prop::collection::vec(op(), 0..60)) {
        let mut model = TabModel::new();
        for op in ops {
            match op {
                Op::Add(index) => {
                    let index = index % (model.tab_count() + 1);
                    model.insert_tab(TabSpec::new("tab"), index).unwrap();
                }
                Op::Remove(index) => {
                    if model.tab_count() > 0 {
                        let id = model.tabs()[index % model.tab_count()].id;
                        model.remove_tab(id).unwrap();
                    }
                }
                Op::ToggleAddButton => {
                    let shown = model.add_button_shown();
                    model.set_add_button_shown(!shown);
                }
                Op::Clear => {
                    model.clear();
                }
            }
            let iter = ItemIterator::stored(&model);
            prop_assert_eq!(
                iter.item_count(),
                model.tab_count() + usize::from(model.add_button_shown())
            );
            prop_assert_eq!(model.selected().is_some(), model.tab_count() > 0);
        }
    }

    #[test]
    fn drag_keeps_stack_ordered(
        count in 1usize..=30,
        selected in 0usize..30,
        axis in 400.0f32..3000.0,
        traits in traits(),
        gestures in prop::collection::vec(
            prop::collection::vec(prop_oneof![-300.0f32..-0.5, 0.5f32..300.0], 1..12),
            1..4,
        ),
    ) {
        let mut model = model(count);
        let id = model.tabs()[selected % count].id;
        model.select(id).unwrap();
        let mut layout = StackLayout::new(SpacingPolicy::new(traits, axis));
        let items = layout.initial_layout(&model, None);
        model.apply(&items);

        for deltas in gestures {
            layout.reset_gesture();
            for delta in deltas {
                let state = if delta > 0.0 { DragState::DragToEnd } else { DragState::DragToStart };
                layout.drag(&mut model, state, delta);

                let tags: Vec<Tag> = (0..model.count())
                    .map(|index| model.stored_tag(model.key_at(index)))
                    .filter(|tag| tag.is_resolved())
                    .collect();
                for tag in &tags {
                    prop_assert!(
                        tag.position >= 0.0 && tag.position <= axis,
                        "position {} outside [0, {}]", tag.position, axis
                    );
                }
                for pair in tags.windows(2) {
                    prop_assert!(
                        pair[1].position <= pair[0].position,
                        "{:?} is in front of {:?}", pair[1], pair[0]
                    );
                }
            }
        }
    }
}
