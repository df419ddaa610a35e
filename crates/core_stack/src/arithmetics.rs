//! Coordinate transforms between logical stack positions and surface geometry.
//!
//! Layout code only deals with two logical axes: the dragging axis along which
//! the stack scrolls and the orthogonal axis used for swipe-to-close. This
//! module maps them onto physical X/Y depending on orientation and axis mode,
//! and accounts for container padding and the toolbar.

use serde::{Deserialize, Serialize};

use crate::config::{AxisMode, Insets, SwitcherConfig};
use crate::drag::DragState;
use crate::surface::Surface;

/// A logical or physical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// The axis along which the stack scrolls.
    Dragging,
    /// The axis used for swipe gestures.
    Orthogonal,
    X,
    Y,
}

/// Orientation of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Pure geometry helper. Holds only the measured container and the immutable
/// configuration values it needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arithmetics {
    width: f32,
    height: f32,
    padding: Insets,
    toolbar_height: f32,
    axis_mode: AxisMode,
}

impl Arithmetics {
    pub fn new(config: &SwitcherConfig) -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            padding: config.padding,
            toolbar_height: config.toolbar_height,
            axis_mode: config.traits.axis_mode,
        }
    }

    /// Update the measured container size.
    pub fn set_container_size(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Whether a container has been measured.
    pub fn is_measured(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Whether the dragging axis is the physical X axis.
    pub fn is_dragging_axis_horizontal(&self) -> bool {
        match self.axis_mode {
            AxisMode::AlwaysHorizontal => true,
            AxisMode::AlwaysVertical => false,
            AxisMode::FollowOrientation => self.orientation() == Orientation::Landscape,
        }
    }

    /// The physical axis a logical axis maps onto.
    pub fn physical(&self, axis: Axis) -> Axis {
        let horizontal = self.is_dragging_axis_horizontal();
        match axis {
            Axis::Dragging if horizontal => Axis::X,
            Axis::Dragging => Axis::Y,
            Axis::Orthogonal if horizontal => Axis::Y,
            Axis::Orthogonal => Axis::X,
            physical => physical,
        }
    }

    /// Size of the container along an axis.
    pub fn container_size(&self, axis: Axis) -> f32 {
        match self.physical(axis) {
            Axis::X => self.width,
            _ => self.height,
        }
    }

    fn origin(&self, axis: Axis) -> f32 {
        match self.physical(axis) {
            Axis::X => self.padding.left,
            _ => self.padding.top + self.toolbar_height,
        }
    }

    /// Usable length of an axis once padding and toolbar are subtracted.
    pub fn length(&self, axis: Axis) -> f32 {
        let length = match self.physical(axis) {
            Axis::X => self.width - self.padding.horizontal(),
            _ => self.height - self.padding.vertical() - self.toolbar_height,
        };
        length.max(0.0)
    }

    /// Usable length of the dragging axis.
    pub fn axis_length(&self) -> f32 {
        self.length(Axis::Dragging)
    }

    /// Usable length of the orthogonal axis.
    pub fn orthogonal_length(&self) -> f32 {
        self.length(Axis::Orthogonal)
    }

    /// Scale of a card in the switcher relative to the full-screen tab.
    pub fn tab_scale(&self) -> f32 {
        let size = self.container_size(Axis::Orthogonal);
        if size <= 0.0 {
            return 1.0;
        }
        (self.length(Axis::Orthogonal) / size).clamp(0.0, 1.0)
    }

    /// Logical position that places a surface flush with the container edge.
    pub fn full_screen_position(&self, axis: Axis) -> f32 {
        -self.origin(axis)
    }

    /// Convert a point in container coordinates into `(dragging, orthogonal)`
    /// logical coordinates.
    pub fn logical_point(&self, x: f32, y: f32) -> (f32, f32) {
        let coordinate = |axis: Axis| match self.physical(axis) {
            Axis::X => x - self.origin(axis),
            _ => y - self.origin(axis),
        };
        (coordinate(Axis::Dragging), coordinate(Axis::Orthogonal))
    }

    /// Give a surface the size of the container.
    pub fn fit(&self, surface: &mut Surface) {
        surface.width = self.width;
        surface.height = self.height;
    }

    pub fn position(&self, axis: Axis, surface: &Surface) -> f32 {
        match self.physical(axis) {
            Axis::X => surface.x - self.origin(axis),
            _ => surface.y - self.origin(axis),
        }
    }

    pub fn set_position(&self, axis: Axis, surface: &mut Surface, value: f32) {
        let origin = self.origin(axis);
        match self.physical(axis) {
            Axis::X => surface.x = origin + value,
            _ => surface.y = origin + value,
        }
    }

    /// Rendered size of a surface along an axis.
    pub fn size(&self, axis: Axis, surface: &Surface) -> f32 {
        let size = match self.physical(axis) {
            Axis::X => surface.width,
            _ => surface.height,
        };
        size * surface.scale
    }

    pub fn scale(&self, surface: &Surface) -> f32 {
        surface.scale
    }

    /// Pivot of a surface along an axis for the given drag state.
    ///
    /// While overshooting at the start the stack tilts around its far edge, at
    /// the end around its near edge. Otherwise scaling and rotation are
    /// centered.
    pub fn pivot(&self, axis: Axis, surface: &Surface, drag_state: DragState) -> f32 {
        let size = match self.physical(axis) {
            Axis::X => surface.width,
            _ => surface.height,
        };
        let dragging = self.physical(axis) == self.physical(Axis::Dragging);
        match drag_state {
            DragState::OvershootStart if dragging => size,
            DragState::OvershootEnd if dragging => 0.0,
            _ => size / 2.0,
        }
    }

    pub fn set_pivot(&self, axis: Axis, surface: &mut Surface, value: f32) {
        match self.physical(axis) {
            Axis::X => surface.pivot_x = value,
            _ => surface.pivot_y = value,
        }
    }

    /// Rotation that tilts a surface along an axis, in degrees.
    pub fn rotation(&self, axis: Axis, surface: &Surface) -> f32 {
        match self.physical(axis) {
            Axis::Y => surface.rotation_x,
            _ => surface.rotation_y,
        }
    }

    pub fn set_rotation(&self, axis: Axis, surface: &mut Surface, angle: f32) {
        match self.physical(axis) {
            Axis::Y => surface.rotation_x = angle,
            _ => surface.rotation_y = angle,
        }
    }
}
