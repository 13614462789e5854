//! Everything handed to the render adapter. Each redraw carries complete
//! data for one view; adapters never receive diffs.

use std::io::{self, Write};

use serde::Serialize;

use crate::models::{BoxStats, GroupMean, StackedSeries, TrendLine, ViewId};
use crate::scale::{BandScale, LinearScale};
use crate::view_state::{Emphasis, ViewState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub student_id: String,
    /// Emphasis key for the point.
    pub gender: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    Scatter {
        points: Vec<ScatterPoint>,
        /// Omitted when the subset cannot be fitted.
        trend: Option<TrendLine>,
    },
    SleepByAge {
        means: Vec<GroupMean<u32>>,
    },
    Attendance {
        boxes: Vec<(String, Option<BoxStats>)>,
    },
    Habits {
        series: Vec<StackedSeries>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AxisScale {
    Linear(LinearScale),
    Band(BandScale),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axes {
    pub x: AxisScale,
    pub y: AxisScale,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedrawRequest {
    pub view: ViewId,
    pub artifact: Artifact,
    pub state: ViewState,
    pub emphasis: Vec<(String, Emphasis)>,
    pub axes: Axes,
    /// Animate towards the new marks over this many milliseconds.
    pub transition_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TooltipUpdate {
    Show { html: String },
    Move { top: f64, left: f64 },
    Hide,
}

pub trait RenderSink {
    fn redraw(&mut self, request: RedrawRequest) -> io::Result<()>;

    fn tooltip(&mut self, update: TooltipUpdate) -> io::Result<()>;
}

#[derive(Serialize)]
#[serde(tag = "message", rename_all = "snake_case")]
enum Line<'a> {
    Redraw(&'a RedrawRequest),
    Tooltip(&'a TooltipUpdate),
}

/// Writes one JSON object per update.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &Line<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> RenderSink for JsonLinesSink<W> {
    fn redraw(&mut self, request: RedrawRequest) -> io::Result<()> {
        self.write_line(&Line::Redraw(&request))
    }

    fn tooltip(&mut self, update: TooltipUpdate) -> io::Result<()> {
        self.write_line(&Line::Tooltip(&update))
    }
}

/// Keeps every update in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub redraws: Vec<RedrawRequest>,
    pub tooltips: Vec<TooltipUpdate>,
}

impl RecordingSink {
    pub fn last_redraw(&self, view: ViewId) -> Option<&RedrawRequest> {
        self.redraws.iter().rev().find(|r| r.view == view)
    }
}

impl RenderSink for RecordingSink {
    fn redraw(&mut self, request: RedrawRequest) -> io::Result<()> {
        self.redraws.push(request);
        Ok(())
    }

    fn tooltip(&mut self, update: TooltipUpdate) -> io::Result<()> {
        self.tooltips.push(update);
        Ok(())
    }
}
