//! Immutable switcher configuration.
//!
//! A [`SwitcherConfig`] is built once when the switcher is created. Phone and
//! tablet layouts differ only in the [`LayoutTraits`] preset they start from.

use serde::{Deserialize, Serialize};

use crate::StackError;

/// Device class the layout is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFactor {
    #[default]
    Phone,
    Tablet,
}

/// How the logical dragging axis maps onto the physical X/Y axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisMode {
    /// Vertical in portrait, horizontal in landscape.
    #[default]
    FollowOrientation,
    /// Always scroll along Y.
    AlwaysVertical,
    /// Always scroll along X.
    AlwaysHorizontal,
}

/// Padding around the tab container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Insets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Insets {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Layout parameters that distinguish one form factor from another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutTraits {
    pub form_factor: FormFactor,
    pub axis_mode: AxisMode,
    /// Number of cards that remain individually visible in a stack.
    pub stacked_tab_count: usize,
    /// Offset between two cards of a stack, in pixels.
    pub stacked_tab_spacing: f32,
    /// Inset of a card's visible edge from its bounds, in pixels.
    pub tab_inset: f32,
    /// Multiplier applied to the maximum spacing of the selected tab.
    pub selected_spacing_ratio: f32,
    /// Minimum spacing as a fraction of the maximum spacing.
    pub min_spacing_ratio: f32,
}

impl LayoutTraits {
    pub fn phone() -> Self {
        Self {
            form_factor: FormFactor::Phone,
            axis_mode: AxisMode::FollowOrientation,
            stacked_tab_count: 3,
            stacked_tab_spacing: 12.0,
            tab_inset: 10.0,
            selected_spacing_ratio: 1.5,
            min_spacing_ratio: 0.375,
        }
    }

    pub fn tablet() -> Self {
        Self {
            form_factor: FormFactor::Tablet,
            axis_mode: AxisMode::AlwaysHorizontal,
            stacked_tab_count: 4,
            stacked_tab_spacing: 16.0,
            tab_inset: 12.0,
            selected_spacing_ratio: 1.5,
            min_spacing_ratio: 0.375,
        }
    }

    pub fn for_form_factor(form_factor: FormFactor) -> Self {
        match form_factor {
            FormFactor::Phone => Self::phone(),
            FormFactor::Tablet => Self::tablet(),
        }
    }
}

impl Default for LayoutTraits {
    fn default() -> Self {
        Self::phone()
    }
}

/// Gesture thresholds, in pixels, pixels per second and degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragThresholds {
    /// Distance a pointer must travel before a drag is recognized.
    pub drag_threshold: f32,
    /// Minimum velocity that turns a released drag into a fling.
    pub min_fling_velocity: f32,
    /// Velocities above this are clamped before computing a fling.
    pub max_fling_velocity: f32,
    /// Minimum orthogonal velocity that closes a swiped tab.
    pub min_swipe_velocity: f32,
    /// How far the front card may be pulled past the start before tilting.
    pub max_start_overshoot_distance: f32,
    /// Maximum tilt applied while overshooting.
    pub max_overshoot_angle: f32,
    /// Overshoot distance over which the tilt grows to its maximum.
    pub overshoot_tilt_distance: f32,
}

impl Default for DragThresholds {
    fn default() -> Self {
        Self {
            drag_threshold: 8.0,
            min_fling_velocity: 500.0,
            max_fling_velocity: 8000.0,
            min_swipe_velocity: 1000.0,
            max_start_overshoot_distance: 48.0,
            max_overshoot_angle: 3.0,
            overshoot_tilt_distance: 200.0,
        }
    }
}

/// Animation durations and stagger steps, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationDurations {
    pub show_switcher: u64,
    pub hide_switcher: u64,
    pub add_tab: u64,
    pub peek: u64,
    pub remove_tab: u64,
    pub relocate: u64,
    pub relocate_delay_step: u64,
    pub revert_overshoot: u64,
    pub revert_swipe: u64,
    pub clear: u64,
    pub clear_delay_step: u64,
}

impl Default for AnimationDurations {
    fn default() -> Self {
        Self {
            show_switcher: 400,
            hide_switcher: 400,
            add_tab: 300,
            peek: 250,
            remove_tab: 200,
            relocate: 200,
            relocate_delay_step: 25,
            revert_overshoot: 250,
            revert_swipe: 150,
            clear: 200,
            clear_delay_step: 25,
        }
    }
}

/// Complete configuration of a switcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwitcherConfig {
    pub traits: LayoutTraits,
    pub drag: DragThresholds,
    pub durations: AnimationDurations,
    /// Padding of the tab container.
    pub padding: Insets,
    /// Height of the toolbar above the container (0 when hidden).
    pub toolbar_height: f32,
    /// Number of detached surfaces kept for reuse.
    pub max_recycled_surfaces: usize,
}

impl Default for SwitcherConfig {
    fn default() -> Self {
        Self::phone()
    }
}

impl SwitcherConfig {
    pub fn phone() -> Self {
        Self {
            traits: LayoutTraits::phone(),
            drag: DragThresholds::default(),
            durations: AnimationDurations::default(),
            padding: Insets::default(),
            toolbar_height: 0.0,
            max_recycled_surfaces: 8,
        }
    }

    pub fn tablet() -> Self {
        Self {
            traits: LayoutTraits::tablet(),
            max_recycled_surfaces: 12,
            ..Self::phone()
        }
    }

    /// Check that every length and ratio is usable by the layout.
    pub fn validate(&self) -> Result<(), StackError> {
        fn non_negative(name: &str, value: f32) -> Result<(), StackError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(StackError::InvalidConfig(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, value
                )))
            }
        }

        fn positive(name: &str, value: f32) -> Result<(), StackError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(StackError::InvalidConfig(format!(
                    "{} must be a finite, positive number (got {})",
                    name, value
                )))
            }
        }

        if self.traits.stacked_tab_count == 0 {
            return Err(StackError::InvalidConfig(
                "stacked_tab_count must be at least 1".to_string(),
            ));
        }
        non_negative("stacked_tab_spacing", self.traits.stacked_tab_spacing)?;
        non_negative("tab_inset", self.traits.tab_inset)?;
        positive("selected_spacing_ratio", self.traits.selected_spacing_ratio)?;
        positive("min_spacing_ratio", self.traits.min_spacing_ratio)?;
        if self.traits.min_spacing_ratio > 1.0 {
            return Err(StackError::InvalidConfig(
                "min_spacing_ratio must not exceed 1".to_string(),
            ));
        }
        non_negative("drag_threshold", self.drag.drag_threshold)?;
        positive("min_fling_velocity", self.drag.min_fling_velocity)?;
        positive("max_fling_velocity", self.drag.max_fling_velocity)?;
        positive("min_swipe_velocity", self.drag.min_swipe_velocity)?;
        non_negative(
            "max_start_overshoot_distance",
            self.drag.max_start_overshoot_distance,
        )?;
        non_negative("max_overshoot_angle", self.drag.max_overshoot_angle)?;
        positive("overshoot_tilt_distance", self.drag.overshoot_tilt_distance)?;
        non_negative("padding.left", self.padding.left)?;
        non_negative("padding.top", self.padding.top)?;
        non_negative("padding.right", self.padding.right)?;
        non_negative("padding.bottom", self.padding.bottom)?;
        non_negative("toolbar_height", self.toolbar_height)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SwitcherConfig::default().validate().is_ok());
        assert!(SwitcherConfig::phone().validate().is_ok());
        assert!(SwitcherConfig::tablet().validate().is_ok());
    }

    #[test]
    fn test_form_factor_is_a_value() {
        assert_eq!(
            LayoutTraits::for_form_factor(FormFactor::Tablet),
            LayoutTraits::tablet()
        );
        assert_eq!(LayoutTraits::default().form_factor, FormFactor::Phone);
        assert_eq!(LayoutTraits::tablet().axis_mode, AxisMode::AlwaysHorizontal);
    }

    #[test]
    fn test_rejects_zero_stacked_count() {
        let mut config = SwitcherConfig::default();
        config.traits.stacked_tab_count = 0;
        assert!(matches!(
            config.validate(),
            Err(StackError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_nan_lengths() {
        let mut config = SwitcherConfig::default();
        config.traits.stacked_tab_spacing = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = SwitcherConfig::default();
        config.padding.top = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_insets() {
        let insets = Insets::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(insets.horizontal(), 4.0);
        assert_eq!(insets.vertical(), 6.0);
        assert_eq!(Insets::uniform(5.0).horizontal(), 10.0);
    }
}
