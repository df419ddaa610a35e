//! Spacing policy: the thresholds and clipping rules of the card stack.
//!
//! Positions are measured along the dragging axis. Index 0 is the front card
//! closest to the end of the axis and positions decrease with the index, so the
//! back-most card rests at position 0 when the stack is collapsed at the start.
//!
//! Every function here is pure. The policy is parameterized by
//! [`LayoutTraits`] and the usable axis length; phone and tablet layouts only
//! differ in their traits.

use crate::config::LayoutTraits;
use crate::model::{State, Tag};

/// Upper bound of the exponent used to damp the movement of attached cards.
const MAX_DAMPING_EXPONENT: usize = 16;

/// Parameterized layout and spacing rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacingPolicy {
    traits: LayoutTraits,
    axis_length: f32,
}

impl SpacingPolicy {
    pub fn new(traits: LayoutTraits, axis_length: f32) -> Self {
        Self {
            traits,
            axis_length: axis_length.max(0.0),
        }
    }

    pub fn traits(&self) -> &LayoutTraits {
        &self.traits
    }

    pub fn axis_length(&self) -> f32 {
        self.axis_length
    }

    pub fn set_axis_length(&mut self, axis_length: f32) {
        self.axis_length = axis_length.max(0.0);
    }

    /// Maximum spacing between two neighboring cards.
    ///
    /// The selected card gets more room, but only in stacks of more than four.
    pub fn max_tab_spacing(&self, count: usize, selected: bool) -> f32 {
        let ratio = match count {
            0..=2 => 0.66,
            3 => 0.33,
            4 => 0.3,
            _ => 0.25,
        };
        let spacing = self.axis_length * ratio;
        if count > 4 && selected {
            spacing * self.traits.selected_spacing_ratio
        } else {
            spacing
        }
    }

    /// Minimum spacing between two neighboring floating cards.
    pub fn min_tab_spacing(&self, count: usize) -> f32 {
        self.max_tab_spacing(count, false) * self.traits.min_spacing_ratio
    }

    /// Position beyond which the spacing to the predecessor is at its maximum.
    pub fn attached_position(&self, count: usize) -> f32 {
        let ratio = match count {
            3 => 0.66,
            4 => 0.6,
            _ => 0.5,
        };
        self.axis_length * ratio
    }

    /// Position and state of an item collapsed into the start stack.
    pub fn start_boundary(
        &self,
        count: usize,
        index: usize,
        predecessor: Option<State>,
    ) -> (f32, State) {
        let stacked = self.traits.stacked_tab_count;
        let spacing = self.traits.stacked_tab_spacing;
        let atop = matches!(predecessor, None | Some(State::Floating));
        let remaining = count.saturating_sub(index);

        if remaining <= stacked {
            let position = spacing * remaining.saturating_sub(1) as f32;
            let state = if atop {
                State::StackedStartAtop
            } else {
                State::StackedStart
            };
            (position, state)
        } else {
            let state = if atop {
                State::StackedStartAtop
            } else {
                State::Hidden
            };
            (spacing * stacked as f32, state)
        }
    }

    /// Position and state of an item collapsed into the end stack.
    ///
    /// Never below the start boundary, so that clipping stays monotonic even
    /// when the axis is too short to hold both stacks.
    pub fn end_boundary(
        &self,
        count: usize,
        index: usize,
        predecessor: Option<State>,
    ) -> (f32, State) {
        let stacked = self.traits.stacked_tab_count;
        let spacing = self.traits.stacked_tab_spacing;
        let edge = self.axis_length - self.traits.tab_inset;

        let (position, state) = if index < stacked {
            (edge - spacing * (index + 1) as f32, State::StackedEnd)
        } else {
            (edge - spacing * stacked as f32, State::Hidden)
        };
        let (start, _) = self.start_boundary(count, index, predecessor);
        (position.max(start), state)
    }

    /// Clip a candidate position into the stack.
    ///
    /// The result is the start boundary, the end boundary, or the candidate
    /// itself as a floating card. A NaN candidate collapses to the start.
    pub fn clip_position(
        &self,
        count: usize,
        index: usize,
        raw: f32,
        predecessor: Option<State>,
    ) -> Tag {
        let (start, start_state) = self.start_boundary(count, index, predecessor);
        if raw.is_nan() || raw <= start {
            return Tag::new(start, start_state);
        }
        let (end, end_state) = self.end_boundary(count, index, predecessor);
        if raw >= end {
            return Tag::new(end, end_state);
        }
        Tag::new(raw, State::Floating)
    }

    /// Allowed spacing to a predecessor at `predecessor_position`, as
    /// `(min, max)`.
    ///
    /// The maximum grows linearly from the minimum spacing to the maximum
    /// spacing while the predecessor moves from the start to the attached
    /// position.
    pub fn spacing_band(&self, count: usize, predecessor_position: f32, selected: bool) -> (f32, f32) {
        let min = self.min_tab_spacing(count);
        let max = self.max_tab_spacing(count, selected).max(min);
        let attached = self.attached_position(count);
        let ratio = if attached > 0.0 {
            (predecessor_position / attached).clamp(0.0, 1.0)
        } else {
            1.0
        };
        (min, min + ratio * (max - min))
    }

    /// Position of an item that rests at the largest allowed spacing behind a
    /// predecessor at `predecessor_position`.
    pub fn non_linear_position(&self, count: usize, predecessor_position: f32, selected: bool) -> f32 {
        let (_, max) = self.spacing_band(count, predecessor_position, selected);
        predecessor_position - max
    }

    /// Drag delta applied to an attached item, halved for every index it lies
    /// behind the anchor of the gesture.
    pub fn damped_delta(&self, delta: f32, index: usize, anchor: usize) -> f32 {
        let exponent = index.saturating_sub(anchor).min(MAX_DAMPING_EXPONENT);
        delta * 0.5f32.powi(exponent as i32)
    }

    /// While dragging toward the end, an item follows a floating predecessor.
    pub fn is_attached_dragging_to_end(&self, predecessor: &Tag) -> bool {
        predecessor.state == State::Floating
    }

    /// While dragging toward the start, an item only follows a floating
    /// predecessor that is not beyond the attached position.
    pub fn is_attached_dragging_to_start(&self, count: usize, predecessor: &Tag) -> bool {
        predecessor.state == State::Floating && predecessor.position <= self.attached_position(count)
    }
}
