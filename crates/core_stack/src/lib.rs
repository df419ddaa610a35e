//! Tabstack Core Engine
//!
//! Platform-agnostic engine for a card-stack tab switcher.
//!
//! This crate implements the "stack of cards" paradigm where:
//! - Tabs are cards ordered along a single dragging axis
//! - Cards float freely in the middle and compress into stacks at both ends
//! - Dragging scrolls the stack non-linearly, swiping sideways closes a card
//! - Structural changes (add, remove, show, hide) are planned as batches of tweens
//!
//! Rendering, view inflation and animation playback on a real toolkit are left to
//! the host; the engine only positions [`Surface`] records through the
//! [`SurfaceRecycler`] capability.

pub mod animation;
pub mod arithmetics;
pub mod config;
pub mod drag;
pub mod iterator;
pub mod layout;
pub mod model;
pub mod policy;
pub mod state;
pub mod surface;
pub mod switcher;

use thiserror::Error;

pub use animation::{AnimationKind, AnimationStyle, Interpolator, SwipeDirection};
pub use arithmetics::{Arithmetics, Axis, Orientation};
pub use config::{AnimationDurations, AxisMode, DragThresholds, FormFactor, Insets, LayoutTraits, SwitcherConfig};
pub use drag::{DragState, TouchAction, TouchEvent};
pub use iterator::{Direction, ItemIterator};
pub use model::{Item, ItemKey, State, Tab, TabId, TabModel, TabSpec, Tag};
pub use policy::SpacingPolicy;
pub use state::{ContentState, FirstVisible, SwitcherSnapshot};
pub use surface::{Surface, SurfacePool, SurfaceRecycler};
pub use switcher::{Placement, SwitcherEvent, TabSwitcher};

/// Errors that can occur during switcher operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StackError {
    #[error("Tab {0} not found")]
    TabNotFound(TabId),

    #[error("Index {0} is out of bounds (count: {1})")]
    IndexOutOfBounds(usize, usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Snapshot does not match the model: {0}")]
    SnapshotMismatch(String),
}
