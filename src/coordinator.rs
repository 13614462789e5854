//! Routes input events to recomputation, view-state transitions and redraws.
//!
//! Every handler runs to completion before the next event: derive the
//! artifact, update the view's state, hand a complete redraw to the sink.
//! Failures inside the statistics degrade to an omitted artifact or an
//! ignored event for that one view.

use std::io;

use serde::Deserialize;

use crate::config::DashboardConfig;
use crate::models::{NumericField, Point, Record, ViewId};
use crate::render::{
    Artifact, AxisScale, Axes, RedrawRequest, RenderSink, ScatterPoint, TooltipUpdate,
};
use crate::scale::{BandScale, Interval, LinearScale};
use crate::stats;
use crate::view_state::{Filter, ViewState, ViewStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    #[default]
    Gender,
    PartTimeJob,
}

fn default_filter_view() -> ViewId {
    ViewId::Scatter
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mark", rename_all = "snake_case")]
pub enum HoverTarget {
    Student { student_id: String },
    AgeGroup { age: u32 },
    Outlier { value: f64 },
    HabitBand { category: String, key: NumericField },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    FilterChanged {
        #[serde(default = "default_filter_view")]
        view: ViewId,
        #[serde(default)]
        field: FilterField,
        value: String,
    },
    /// Pixel range along the view's zoomable axis; `None` when cleared.
    BrushEnded {
        view: ViewId,
        selection: Option<(f64, f64)>,
    },
    MarkClicked {
        view: ViewId,
        key: String,
    },
    MarkHovered {
        target: Option<HoverTarget>,
    },
    PointerMoved {
        page_x: f64,
        page_y: f64,
    },
    PointerLeft,
    ResetZoom {
        view: ViewId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Filtering,
    Zooming,
    Highlighting,
}

/// The axis a view does not zoom on.
#[derive(Debug, Clone)]
enum CrossAxis {
    Linear(Interval),
    Band(Vec<String>, f64),
}

#[derive(Debug, Clone)]
struct ViewSlot {
    store: ViewStore,
    phase: Phase,
    cross: CrossAxis,
}

fn index(view: ViewId) -> usize {
    match view {
        ViewId::Scatter => 0,
        ViewId::SleepByAge => 1,
        ViewId::Attendance => 2,
        ViewId::Habits => 3,
    }
}

/// Zoom runs along x for the scatter and line chart, along y for the others.
fn zooms_horizontally(view: ViewId) -> bool {
    matches!(view, ViewId::Scatter | ViewId::SleepByAge)
}

fn categories_in_order<'a, I>(records: I, key: impl Fn(&Record) -> &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        let category = key(record);
        if !seen.iter().any(|c| c == category) {
            seen.push(category.to_string());
        }
    }
    seen
}

fn extent_or_unit<I: IntoIterator<Item = f64>>(values: I) -> Interval {
    Interval::from_extent(stats::extent(values).unwrap_or((0.0, 1.0)))
}

pub struct Dashboard<'a> {
    records: &'a [Record],
    config: DashboardConfig,
    slots: Vec<ViewSlot>,
}

impl<'a> Dashboard<'a> {
    pub fn new(records: &'a [Record], config: DashboardConfig) -> Self {
        let genders = categories_in_order(records, |r| r.gender.as_str());

        let scatter = ViewSlot {
            store: ViewStore::new(
                ViewId::Scatter,
                extent_or_unit(records.iter().map(|r| r.study_hours_per_day)),
                genders.clone(),
            ),
            phase: Phase::Idle,
            cross: CrossAxis::Linear(extent_or_unit(records.iter().map(|r| r.sleep_hours))),
        };

        let sleep = stats::grouped_mean(records, |r| r.age, |r| r.sleep_hours);
        let sleep_max = sleep.iter().filter_map(|g| g.mean).fold(0.0, f64::max);
        let sleep_view = ViewSlot {
            store: ViewStore::new(
                ViewId::SleepByAge,
                extent_or_unit(sleep.iter().map(|g| f64::from(g.key))),
                sleep.iter().map(|g| g.key.to_string()).collect(),
            ),
            phase: Phase::Idle,
            cross: CrossAxis::Linear(Interval::from_extent((0.0, sleep_max))),
        };

        let attendance = ViewSlot {
            store: ViewStore::new(
                ViewId::Attendance,
                Interval::from_extent(config.box_value_extent),
                config.box_categories.clone(),
            ),
            phase: Phase::Idle,
            cross: CrossAxis::Band(config.box_categories.clone(), config.box_band_padding),
        };

        let habit_means =
            stats::group_means_by_category(records, |r| r.gender.as_str(), &config.habit_keys);
        let stack_max = habit_means
            .iter()
            .map(|g| g.means.iter().filter_map(|(_, m)| *m).sum::<f64>())
            .fold(0.0, f64::max);
        let habits = ViewSlot {
            store: ViewStore::new(
                ViewId::Habits,
                Interval::from_extent((0.0, stack_max)),
                config.habit_keys.iter().map(|k| k.column().to_string()).collect(),
            ),
            phase: Phase::Idle,
            cross: CrossAxis::Band(genders, config.bar_band_padding),
        };

        Self {
            records,
            config,
            slots: vec![scatter, sleep_view, attendance, habits],
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn view_state(&self, view: ViewId) -> &ViewState {
        self.slots[index(view)].store.state()
    }

    pub fn phase(&self, view: ViewId) -> Phase {
        self.slots[index(view)].phase
    }

    /// The artifact last drawn for `view`, if it is still current.
    pub fn artifact(&self, view: ViewId) -> Option<&Artifact> {
        self.slots[index(view)].store.memo()
    }

    /// Draws every view once from the unfiltered data.
    pub fn initial_render(&mut self, sink: &mut dyn RenderSink) -> io::Result<()> {
        for view in ViewId::ALL {
            self.redraw(view, None, sink)?;
        }
        Ok(())
    }

    pub fn handle(&mut self, event: InputEvent, sink: &mut dyn RenderSink) -> io::Result<()> {
        match event {
            InputEvent::FilterChanged { view, field, value } => {
                let filter = match field {
                    FilterField::Gender => Filter::gender_selection(&value),
                    FilterField::PartTimeJob if value.trim() == "All" => Filter::All,
                    FilterField::PartTimeJob => Filter::PartTimeJob(value.trim().to_string()),
                };
                self.on_filter(view, filter, sink)
            }
            InputEvent::BrushEnded { view, selection } => match selection {
                Some(pixels) => self.on_brush(view, pixels, sink),
                None => Ok(()),
            },
            InputEvent::MarkClicked { view, key } => self.on_click(view, &key, sink),
            InputEvent::ResetZoom { view } => self.on_reset(view, sink),
            InputEvent::MarkHovered { target: Some(target) } => {
                let update = match self.tooltip_text(&target) {
                    Some(html) => TooltipUpdate::Show { html },
                    None => TooltipUpdate::Hide,
                };
                sink.tooltip(update)
            }
            InputEvent::MarkHovered { target: None } | InputEvent::PointerLeft => {
                sink.tooltip(TooltipUpdate::Hide)
            }
            InputEvent::PointerMoved { page_x, page_y } => {
                let (dx, dy) = self.config.tooltip_offset;
                sink.tooltip(TooltipUpdate::Move {
                    top: page_y + dy,
                    left: page_x + dx,
                })
            }
        }
    }

    fn enter(&mut self, view: ViewId, phase: Phase) {
        let slot = &mut self.slots[index(view)];
        debug_assert_eq!(slot.phase, Phase::Idle, "overlapping transition on {view}");
        tracing::debug!(%view, ?phase, "transition started");
        slot.phase = phase;
    }

    fn leave(&mut self, view: ViewId) {
        self.slots[index(view)].phase = Phase::Idle;
    }

    fn on_filter(&mut self, view: ViewId, filter: Filter, sink: &mut dyn RenderSink) -> io::Result<()> {
        self.enter(view, Phase::Filtering);
        let subset = self.slots[index(view)].store.set_filter(filter, self.records);
        tracing::info!(%view, records = subset.len(), "filter applied");
        let result = self.redraw(view, None, sink);
        self.leave(view);
        result
    }

    fn on_brush(&mut self, view: ViewId, (px0, px1): (f64, f64), sink: &mut dyn RenderSink) -> io::Result<()> {
        self.enter(view, Phase::Zooming);
        let scale = self.zoom_scale(view);
        let zoomed = Interval::new(scale.invert(px0), scale.invert(px1))
            .and_then(|requested| self.slots[index(view)].store.set_zoom_domain(requested));
        let result = match zoomed {
            Ok(domain) => {
                tracing::debug!(%view, lo = domain.lo, hi = domain.hi, "zoomed");
                self.redraw(view, Some(self.config.brush_transition_ms), sink)
            }
            Err(err) => {
                tracing::warn!(%view, %err, "ignoring brush");
                Ok(())
            }
        };
        self.leave(view);
        result
    }

    fn on_reset(&mut self, view: ViewId, sink: &mut dyn RenderSink) -> io::Result<()> {
        self.enter(view, Phase::Zooming);
        self.slots[index(view)].store.reset_zoom();
        let result = self.redraw(view, Some(self.config.reset_transition_ms), sink);
        self.leave(view);
        result
    }

    fn on_click(&mut self, view: ViewId, key: &str, sink: &mut dyn RenderSink) -> io::Result<()> {
        self.enter(view, Phase::Highlighting);
        let toggled = self.slots[index(view)]
            .store
            .toggle_highlight(key)
            .map(|h| h.map(str::to_string));
        let result = match toggled {
            Ok(highlighted) => {
                tracing::debug!(%view, ?highlighted, "highlight toggled");
                let transition = match view {
                    ViewId::Attendance => {
                        self.zoom_to_box(highlighted.as_deref());
                        Some(self.config.highlight_transition_ms)
                    }
                    ViewId::Habits => {
                        self.slots[index(view)].store.invalidate();
                        None
                    }
                    ViewId::Scatter | ViewId::SleepByAge => Some(self.config.highlight_transition_ms),
                };
                self.redraw(view, transition, sink)
            }
            Err(err) => {
                tracing::warn!(%view, %err, "ignoring click");
                Ok(())
            }
        };
        self.leave(view);
        result
    }

    /// Zooms the attendance axis onto one box, or back out when `category`
    /// is `None` or has no data.
    fn zoom_to_box(&mut self, category: Option<&str>) {
        let bounds = category.and_then(|category| {
            let Artifact::Attendance { boxes } = self.current_artifact(ViewId::Attendance) else {
                return None;
            };
            boxes
                .into_iter()
                .find(|(c, _)| c == category)
                .and_then(|(_, stats)| stats)
                .map(|stats| (stats.min, stats.max))
        });

        let pad = self.config.box_zoom_padding;
        let store = &mut self.slots[index(ViewId::Attendance)].store;
        match bounds {
            Some((min, max)) => {
                let zoomed = Interval::new(min - pad, max + pad)
                    .and_then(|requested| store.set_zoom_domain(requested));
                if let Err(err) = zoomed {
                    tracing::warn!(%err, "cannot zoom onto box");
                    store.reset_zoom();
                }
            }
            None => store.reset_zoom(),
        }
    }

    fn zoom_scale(&self, view: ViewId) -> LinearScale {
        let store = &self.slots[index(view)].store;
        if zooms_horizontally(view) {
            store.zoom_scale((0.0, self.config.inner_width()))
        } else {
            store.zoom_scale((self.config.inner_height(), 0.0))
        }
    }

    fn axes(&self, view: ViewId) -> Axes {
        let zoom = AxisScale::Linear(self.zoom_scale(view));
        match &self.slots[index(view)].cross {
            CrossAxis::Linear(domain) => {
                let cross = AxisScale::Linear(LinearScale::new(*domain, (self.config.inner_height(), 0.0)));
                Axes { x: zoom, y: cross }
            }
            CrossAxis::Band(categories, padding) => {
                let cross = AxisScale::Band(BandScale::new(
                    categories.clone(),
                    (0.0, self.config.inner_width()),
                    *padding,
                ));
                Axes { x: cross, y: zoom }
            }
        }
    }

    /// Memoized artifact for `view`, derived afresh if the memo was dropped.
    fn current_artifact(&mut self, view: ViewId) -> Artifact {
        if let Some(artifact) = self.slots[index(view)].store.memo() {
            return artifact.clone();
        }
        let artifact = self.derive(view);
        self.slots[index(view)].store.remember(artifact.clone());
        artifact
    }

    fn derive(&self, view: ViewId) -> Artifact {
        let store = &self.slots[index(view)].store;
        let subset = store.filtered(self.records);
        match view {
            ViewId::Scatter => {
                let points: Vec<ScatterPoint> = subset
                    .iter()
                    .filter(|r| r.study_hours_per_day.is_finite() && r.sleep_hours.is_finite())
                    .map(|r| ScatterPoint {
                        student_id: r.student_id.clone(),
                        gender: r.gender.clone(),
                        x: r.study_hours_per_day,
                        y: r.sleep_hours,
                    })
                    .collect();
                let xy: Vec<Point> = points.iter().map(|p| Point { x: p.x, y: p.y }).collect();
                let trend = match stats::trend_line(&xy) {
                    Ok(line) => Some(line),
                    Err(err) => {
                        tracing::debug!(%err, "omitting trend line");
                        None
                    }
                };
                Artifact::Scatter { points, trend }
            }
            ViewId::SleepByAge => Artifact::SleepByAge {
                means: stats::grouped_mean(subset.iter().copied(), |r| r.age, |r| r.sleep_hours),
            },
            ViewId::Attendance => Artifact::Attendance {
                boxes: stats::box_statistics(
                    subset.iter().copied(),
                    &self.config.box_categories,
                    |r| r.part_time_job.as_str(),
                    |r| r.attendance_percentage,
                ),
            },
            ViewId::Habits => {
                let groups = stats::group_means_by_category(
                    subset.iter().copied(),
                    |r| r.gender.as_str(),
                    &self.config.habit_keys,
                );
                let keys: Vec<NumericField> = match store.highlighted().and_then(NumericField::from_column) {
                    Some(key) => vec![key],
                    None => self.config.habit_keys.clone(),
                };
                Artifact::Habits {
                    series: stats::stacked_decomposition(&groups, &keys),
                }
            }
        }
    }

    fn redraw(&mut self, view: ViewId, transition_ms: Option<u64>, sink: &mut dyn RenderSink) -> io::Result<()> {
        let artifact = self.current_artifact(view);
        let store = &self.slots[index(view)].store;
        let request = RedrawRequest {
            view,
            artifact,
            state: store.state().clone(),
            emphasis: store.emphasis(),
            axes: self.axes(view),
            transition_ms,
        };
        sink.redraw(request)
    }

    fn tooltip_text(&mut self, target: &HoverTarget) -> Option<String> {
        match target {
            HoverTarget::Student { student_id } => {
                let record = self.records.iter().find(|r| r.student_id == *student_id)?;
                Some(format!(
                    "Sleep: {} hrs<br>Study: {} hrs",
                    record.sleep_hours, record.study_hours_per_day
                ))
            }
            HoverTarget::AgeGroup { age } => {
                let Artifact::SleepByAge { means } = self.current_artifact(ViewId::SleepByAge) else {
                    return None;
                };
                let mean = means.iter().find(|g| g.key == *age)?.mean?;
                Some(format!("Age: {age}<br>Avg Sleep: {mean:.1} hrs"))
            }
            HoverTarget::Outlier { value } => Some(format!("Outlier: {value}% attendance")),
            HoverTarget::HabitBand { category, key } => {
                let Artifact::Habits { series } = self.current_artifact(ViewId::Habits) else {
                    return None;
                };
                let band = series
                    .iter()
                    .find(|s| s.key == *key)?
                    .bands
                    .iter()
                    .find(|(c, _)| c == category)?
                    .1;
                Some(format!("{key} Hours: {:.1}", band.value?))
            }
        }
    }
}
