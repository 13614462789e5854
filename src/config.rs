use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::models::NumericField;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Presentation and view parameters. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    pub brush_transition_ms: u64,
    pub reset_transition_ms: u64,
    pub highlight_transition_ms: u64,
    /// Part-time-job answers shown as boxes, left to right.
    pub box_categories: Vec<String>,
    /// Attendance axis bounds when nothing is zoomed.
    pub box_value_extent: (f64, f64),
    /// Slack added around a box's min/max when zooming onto it.
    pub box_zoom_padding: f64,
    pub box_band_padding: f64,
    pub bar_band_padding: f64,
    /// Stack order of the habit chart, baseline first.
    pub habit_keys: Vec<NumericField>,
    /// Tooltip offset from the pointer as (left, top).
    pub tooltip_offset: (f64, f64),
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 300.0,
            margin: Margin {
                top: 40.0,
                right: 40.0,
                bottom: 60.0,
                left: 60.0,
            },
            brush_transition_ms: 1000,
            reset_transition_ms: 750,
            highlight_transition_ms: 750,
            box_categories: vec!["Yes".to_string(), "No".to_string()],
            box_value_extent: (0.0, 100.0),
            box_zoom_padding: 5.0,
            box_band_padding: 0.3,
            bar_band_padding: 0.2,
            habit_keys: NumericField::HABITS.to_vec(),
            tooltip_offset: (10.0, -10.0),
        }
    }
}

impl DashboardConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inner_width() <= 0.0 || self.inner_height() <= 0.0 {
            return Err(DashboardError::InvalidConfig(
                "margins leave no room for the plot area".to_string(),
            ));
        }
        if self.box_categories.is_empty() {
            return Err(DashboardError::InvalidConfig(
                "box_categories must not be empty".to_string(),
            ));
        }
        if self.habit_keys.is_empty() {
            return Err(DashboardError::InvalidConfig(
                "habit_keys must not be empty".to_string(),
            ));
        }
        let (lo, hi) = self.box_value_extent;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(DashboardError::InvalidConfig(format!(
                "box_value_extent [{lo}, {hi}] is not an interval"
            )));
        }
        Ok(())
    }

    pub fn inner_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    pub fn inner_height(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom
    }
}
