//! Visual surfaces and the recycling capability.
//!
//! A [`Surface`] is the headless stand-in for a rendered card: a geometry
//! record the engine positions and the host renders. Surfaces are obtained and
//! released through a [`SurfaceRecycler`], which lets a host pool expensive
//! views. The engine never stores layout state on a surface; it only copies
//! tags onto it with [`bind`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::arithmetics::{Arithmetics, Axis};
use crate::drag::DragState;
use crate::model::{ItemKey, Tag};

/// Geometry of one rendered card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Left edge in container coordinates, before scaling.
    pub x: f32,
    /// Top edge in container coordinates, before scaling.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    /// Rotation around the X axis, in degrees.
    pub rotation_x: f32,
    /// Rotation around the Y axis, in degrees.
    pub rotation_y: f32,
    /// Pivot of scale and rotation, relative to the surface's left edge.
    pub pivot_x: f32,
    /// Pivot of scale and rotation, relative to the surface's top edge.
    pub pivot_y: f32,
    pub alpha: f32,
    pub visible: bool,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            scale: 1.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            pivot_x: 0.0,
            pivot_y: 0.0,
            alpha: 1.0,
            visible: false,
        }
    }
}

impl Surface {
    /// Reset every transform, keeping the measured size.
    pub fn reset(&mut self) {
        *self = Self {
            width: self.width,
            height: self.height,
            ..Self::default()
        };
    }
}

/// Capability to obtain and release reusable surfaces for items.
pub trait SurfaceRecycler {
    /// The surface bound to `key`, inflating or recycling one if necessary.
    /// Returns `true` as second value if the surface was newly bound.
    fn obtain(&mut self, key: ItemKey) -> (&mut Surface, bool);

    /// The surface currently bound to `key`.
    fn surface(&self, key: ItemKey) -> Option<&Surface>;

    fn surface_mut(&mut self, key: ItemKey) -> Option<&mut Surface>;

    /// Unbind the surface of `key` and make it available for reuse.
    fn release(&mut self, key: ItemKey);

    /// Unbind every surface.
    fn clear(&mut self);

    /// Keys of all bound surfaces.
    fn bound_keys(&self) -> Vec<ItemKey>;
}

/// In-memory recycler keeping a bounded free list.
#[derive(Debug, Clone, Default)]
pub struct SurfacePool {
    active: HashMap<ItemKey, Surface>,
    free: Vec<Surface>,
    max_free: usize,
    inflated: usize,
}

impl SurfacePool {
    pub fn new(max_free: usize) -> Self {
        Self {
            max_free,
            ..Self::default()
        }
    }

    /// Number of surfaces created since the pool was built.
    pub fn inflated(&self) -> usize {
        self.inflated
    }

    /// Number of surfaces waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl SurfaceRecycler for SurfacePool {
    fn obtain(&mut self, key: ItemKey) -> (&mut Surface, bool) {
        let mut fresh = false;
        if !self.active.contains_key(&key) {
            let surface = match self.free.pop() {
                Some(mut surface) => {
                    trace!("Recycling surface for {}", key);
                    surface.reset();
                    surface
                }
                None => {
                    trace!("Inflating surface for {}", key);
                    self.inflated += 1;
                    Surface::default()
                }
            };
            self.active.insert(key, surface);
            fresh = true;
        }
        let surface = self.active.entry(key).or_default();
        (surface, fresh)
    }

    fn surface(&self, key: ItemKey) -> Option<&Surface> {
        self.active.get(&key)
    }

    fn surface_mut(&mut self, key: ItemKey) -> Option<&mut Surface> {
        self.active.get_mut(&key)
    }

    fn release(&mut self, key: ItemKey) {
        if let Some(surface) = self.active.remove(&key) {
            trace!("Releasing surface of {}", key);
            if self.free.len() < self.max_free {
                self.free.push(surface);
            }
        }
    }

    fn clear(&mut self) {
        let keys: Vec<_> = self.active.keys().copied().collect();
        for key in keys {
            self.release(key);
        }
    }

    fn bound_keys(&self) -> Vec<ItemKey> {
        self.active.keys().copied().collect()
    }
}

/// Copy a tag onto a surface through the arithmetics of the current layout.
///
/// The surface is visible iff the tag's state is not `Hidden`.
pub fn bind(arithmetics: &Arithmetics, surface: &mut Surface, tag: &Tag, drag_state: DragState) {
    arithmetics.fit(surface);
    surface.scale = arithmetics.tab_scale();
    surface.alpha = 1.0;
    surface.rotation_x = 0.0;
    surface.rotation_y = 0.0;
    arithmetics.set_position(Axis::Orthogonal, surface, 0.0);
    if tag.is_resolved() {
        arithmetics.set_position(Axis::Dragging, surface, tag.position);
    }
    for axis in [Axis::Dragging, Axis::Orthogonal] {
        let pivot = arithmetics.pivot(axis, surface, drag_state);
        arithmetics.set_pivot(axis, surface, pivot);
    }
    surface.visible = tag.state.is_visible() && tag.is_resolved();
}

/// Place a surface as the single full-screen tab.
pub fn bind_full_screen(arithmetics: &Arithmetics, surface: &mut Surface) {
    arithmetics.fit(surface);
    surface.scale = 1.0;
    surface.alpha = 1.0;
    surface.rotation_x = 0.0;
    surface.rotation_y = 0.0;
    for axis in [Axis::Dragging, Axis::Orthogonal] {
        arithmetics.set_position(axis, surface, arithmetics.full_screen_position(axis));
        let pivot = arithmetics.pivot(axis, surface, DragState::None);
        arithmetics.set_pivot(axis, surface, pivot);
    }
    surface.visible = true;
}
