use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::models::{Record, ViewId};
use crate::render::Artifact;
use crate::scale::{Interval, LinearScale};

/// Which records a view shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Gender(String),
    PartTimeJob(String),
}

impl Filter {
    /// Maps a selector value to a gender filter; "All" clears it.
    pub fn gender_selection(value: &str) -> Self {
        match value.trim() {
            "" | "All" => Filter::All,
            other => Filter::Gender(other.to_string()),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Gender(gender) => record.gender == *gender,
            Filter::PartTimeJob(answer) => record.part_time_job == *answer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Full,
    Muted,
}

/// Emphasis for every key: all keys are full when nothing is highlighted,
/// otherwise only the highlighted one is.
pub fn emphasis(keys: &[String], highlighted: Option<&str>) -> Vec<(String, Emphasis)> {
    keys.iter()
        .map(|key| {
            let level = match highlighted {
                Some(h) if h != key => Emphasis::Muted,
                _ => Emphasis::Full,
            };
            (key.clone(), level)
        })
        .collect()
}

/// Interaction state of one view. Transitions return a new value and leave
/// `self` untouched on error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub filter: Filter,
    pub zoom: Interval,
    pub highlighted: Option<String>,
}

impl ViewState {
    pub fn new(full_extent: Interval) -> Self {
        Self {
            filter: Filter::All,
            zoom: full_extent,
            highlighted: None,
        }
    }

    pub fn with_filter(&self, filter: Filter) -> Self {
        Self {
            filter,
            ..self.clone()
        }
    }

    pub fn zoomed(&self, requested: Interval, full_extent: &Interval) -> Result<Self> {
        let zoom = requested.clip_to(full_extent)?;
        Ok(Self {
            zoom,
            ..self.clone()
        })
    }

    pub fn zoom_reset(&self, full_extent: &Interval) -> Self {
        Self {
            zoom: *full_extent,
            ..self.clone()
        }
    }

    pub fn highlight_toggled(&self, view: ViewId, key: &str, keys: &[String]) -> Result<Self> {
        if !keys.iter().any(|k| k == key) {
            return Err(DashboardError::UnknownKey {
                view,
                key: key.to_string(),
            });
        }
        let highlighted = match &self.highlighted {
            Some(current) if current == key => None,
            _ => Some(key.to_string()),
        };
        Ok(Self {
            highlighted,
            ..self.clone()
        })
    }
}

/// Owns one view's state, its key set and the last artifact derived for it.
#[derive(Debug, Clone)]
pub struct ViewStore {
    view: ViewId,
    state: ViewState,
    full_extent: Interval,
    keys: Vec<String>,
    memo: Option<Artifact>,
}

impl ViewStore {
    pub fn new(view: ViewId, full_extent: Interval, keys: Vec<String>) -> Self {
        Self {
            view,
            state: ViewState::new(full_extent),
            full_extent,
            keys,
            memo: None,
        }
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn full_extent(&self) -> Interval {
        self.full_extent
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.state.highlighted.as_deref()
    }

    /// Records passing the active filter.
    pub fn filtered<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|r| self.state.filter.matches(r)).collect()
    }

    pub fn set_filter<'a>(&mut self, filter: Filter, records: &'a [Record]) -> Vec<&'a Record> {
        self.state = self.state.with_filter(filter);
        self.memo = None;
        self.filtered(records)
    }

    pub fn set_zoom_domain(&mut self, requested: Interval) -> Result<Interval> {
        self.state = self.state.zoomed(requested, &self.full_extent)?;
        Ok(self.state.zoom)
    }

    pub fn reset_zoom(&mut self) {
        self.state = self.state.zoom_reset(&self.full_extent);
    }

    /// Returns the key highlighted after the toggle, if any.
    pub fn toggle_highlight(&mut self, key: &str) -> Result<Option<&str>> {
        self.state = self.state.highlight_toggled(self.view, key, &self.keys)?;
        Ok(self.highlighted())
    }

    pub fn emphasis(&self) -> Vec<(String, Emphasis)> {
        emphasis(&self.keys, self.highlighted())
    }

    /// Mapping for the zoomable axis under the current zoom domain.
    pub fn zoom_scale(&self, range: (f64, f64)) -> LinearScale {
        LinearScale::new(self.state.zoom, range)
    }

    pub fn memo(&self) -> Option<&Artifact> {
        self.memo.as_ref()
    }

    pub fn remember(&mut self, artifact: Artifact) {
        self.memo = Some(artifact);
    }

    pub fn invalidate(&mut self) {
        self.memo = None;
    }
}
