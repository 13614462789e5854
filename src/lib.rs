//! Statistics and interaction state behind the student habits dashboard:
//! a study/sleep scatter with trend line, sleep-by-age line chart with brush
//! zoom, attendance box plot with zoom-on-click, and a toggleable stacked
//! chart of daily habits.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod load;
pub mod models;
pub mod render;
pub mod report;
pub mod scale;
pub mod stats;
pub mod view_state;

pub use config::DashboardConfig;
pub use coordinator::{Dashboard, InputEvent};
pub use error::{DashboardError, Result};
pub use models::{Record, ViewId};
