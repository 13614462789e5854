use thiserror::Error;

use crate::models::ViewId;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("line {line}: field `{field}` has invalid value {value:?}: {reason}")]
    MalformedRow {
        line: u64,
        field: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("csv header is missing column `{column}`")]
    MissingColumn { column: &'static str },
    #[error("regression undefined for {n} points")]
    DegenerateInput { n: usize },
    #[error("no values recorded for category {category:?}")]
    EmptyGroup { category: String },
    #[error("zoom interval [{lo}, {hi}] is degenerate")]
    DegenerateZoom { lo: f64, hi: f64 },
    #[error("{view} view has no key {key:?}")]
    UnknownKey { view: ViewId, key: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("could not parse config: {0}")]
    ConfigFormat(#[from] serde_json::Error),
    #[error("could not read csv: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
