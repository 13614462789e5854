use std::fmt;

use serde::{Deserialize, Serialize};

/// One student row. Missing numeric values are NaN (age: `None`) and are
/// skipped by every aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub student_id: String,
    pub age: Option<u32>,
    pub gender: String,
    pub study_hours_per_day: f64,
    pub social_media_hours: f64,
    pub netflix_hours: f64,
    pub part_time_job: String,
    pub attendance_percentage: f64,
    pub sleep_hours: f64,
    pub exercise_frequency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    StudyHoursPerDay,
    SleepHours,
    Age,
    AttendancePercentage,
    SocialMediaHours,
    NetflixHours,
    ExerciseFrequency,
}

impl NumericField {
    pub const HABITS: [NumericField; 4] = [
        NumericField::StudyHoursPerDay,
        NumericField::SocialMediaHours,
        NumericField::NetflixHours,
        NumericField::ExerciseFrequency,
    ];

    pub fn column(self) -> &'static str {
        match self {
            NumericField::StudyHoursPerDay => "study_hours_per_day",
            NumericField::SleepHours => "sleep_hours",
            NumericField::Age => "age",
            NumericField::AttendancePercentage => "attendance_percentage",
            NumericField::SocialMediaHours => "social_media_hours",
            NumericField::NetflixHours => "netflix_hours",
            NumericField::ExerciseFrequency => "exercise_frequency",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        [
            NumericField::StudyHoursPerDay,
            NumericField::SleepHours,
            NumericField::Age,
            NumericField::AttendancePercentage,
            NumericField::SocialMediaHours,
            NumericField::NetflixHours,
            NumericField::ExerciseFrequency,
        ]
        .into_iter()
        .find(|field| field.column() == column)
    }

    /// Value of this field on `record`, NaN when missing.
    pub fn value(self, record: &Record) -> f64 {
        match self {
            NumericField::StudyHoursPerDay => record.study_hours_per_day,
            NumericField::SleepHours => record.sleep_hours,
            NumericField::Age => record.age.map_or(f64::NAN, f64::from),
            NumericField::AttendancePercentage => record.attendance_percentage,
            NumericField::SocialMediaHours => record.social_media_hours,
            NumericField::NetflixHours => record.netflix_hours,
            NumericField::ExerciseFrequency => record.exercise_frequency,
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewId {
    Scatter,
    SleepByAge,
    Attendance,
    Habits,
}

impl ViewId {
    pub const ALL: [ViewId; 4] = [
        ViewId::Scatter,
        ViewId::SleepByAge,
        ViewId::Attendance,
        ViewId::Habits,
    ];
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewId::Scatter => "scatter",
            ViewId::SleepByAge => "sleep-by-age",
            ViewId::Attendance => "attendance",
            ViewId::Habits => "habits",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least-squares fit drawn between the x-extremes of its subset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    pub fit: Regression,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean<K> {
    pub key: K,
    /// `None` when the group had no valid values.
    pub mean: Option<f64>,
    pub count: usize,
}

/// `min`/`max` are the extremes of all values, outliers included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub sorted_values: Vec<f64>,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
    pub iqr: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn lower_fence(&self) -> f64 {
        self.q1 - 1.5 * self.iqr
    }

    pub fn upper_fence(&self) -> f64 {
        self.q3 + 1.5 * self.iqr
    }
}

/// Mean of each habit field within one category, e.g. one gender.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMeans {
    pub category: String,
    pub means: Vec<(NumericField, Option<f64>)>,
}

impl CategoryMeans {
    pub fn mean(&self, field: NumericField) -> Option<f64> {
        self.means
            .iter()
            .find(|(key, _)| *key == field)
            .and_then(|(_, mean)| *mean)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub start: f64,
    pub end: f64,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedSeries {
    pub key: NumericField,
    /// One band per category, in category order.
    pub bands: Vec<(String, Band)>,
}
