use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{DashboardError, Result};
use crate::models::Record;

const MISSING_MARKERS: [&str; 5] = ["", "na", "n/a", "nan", "null"];

pub const REQUIRED_COLUMNS: [&str; 10] = [
    "student_id",
    "age",
    "gender",
    "study_hours_per_day",
    "social_media_hours",
    "netflix_hours",
    "part_time_job",
    "attendance_percentage",
    "sleep_hours",
    "exercise_frequency",
];

/// A row as text, before any validation. Extra columns are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    pub student_id: String,
    pub age: String,
    pub gender: String,
    pub study_hours_per_day: String,
    pub social_media_hours: String,
    pub netflix_hours: String,
    pub part_time_job: String,
    pub attendance_percentage: String,
    pub sleep_hours: String,
    pub exercise_frequency: String,
}

#[derive(Debug, Default)]
pub struct LoadedDataset {
    pub records: Vec<Record>,
    pub rejected: Vec<DashboardError>,
}

fn is_missing(value: &str) -> bool {
    let value = value.trim();
    MISSING_MARKERS
        .iter()
        .any(|marker| value.eq_ignore_ascii_case(marker))
}

fn malformed(line: u64, field: &'static str, value: &str, reason: &'static str) -> DashboardError {
    DashboardError::MalformedRow {
        line,
        field,
        value: value.to_string(),
        reason,
    }
}

fn parse_measure(line: u64, field: &'static str, value: &str, max: Option<f64>) -> Result<f64> {
    if is_missing(value) {
        return Ok(f64::NAN);
    }
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| malformed(line, field, value, "not a number"))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(malformed(line, field, value, "must be a non-negative number"));
    }
    if max.is_some_and(|max| parsed > max) {
        return Err(malformed(line, field, value, "above the allowed maximum"));
    }
    Ok(parsed)
}

fn parse_age(line: u64, value: &str) -> Result<Option<u32>> {
    if is_missing(value) {
        return Ok(None);
    }
    match value.trim().parse::<u32>() {
        Ok(0) => Err(malformed(line, "age", value, "must be positive")),
        Ok(age) => Ok(Some(age)),
        Err(_) => Err(malformed(line, "age", value, "not a whole number")),
    }
}

pub fn parse_record(raw: &RawRow, line: u64) -> Result<Record> {
    let student_id = raw.student_id.trim();
    if student_id.is_empty() {
        return Err(malformed(line, "student_id", &raw.student_id, "empty identifier"));
    }

    Ok(Record {
        student_id: student_id.to_string(),
        age: parse_age(line, &raw.age)?,
        gender: raw.gender.trim().to_string(),
        study_hours_per_day: parse_measure(line, "study_hours_per_day", &raw.study_hours_per_day, None)?,
        social_media_hours: parse_measure(line, "social_media_hours", &raw.social_media_hours, None)?,
        netflix_hours: parse_measure(line, "netflix_hours", &raw.netflix_hours, None)?,
        part_time_job: raw.part_time_job.trim().to_string(),
        attendance_percentage: parse_measure(
            line,
            "attendance_percentage",
            &raw.attendance_percentage,
            Some(100.0),
        )?,
        sleep_hours: parse_measure(line, "sleep_hours", &raw.sleep_hours, None)?,
        exercise_frequency: parse_measure(line, "exercise_frequency", &raw.exercise_frequency, None)?,
    })
}

pub fn load_csv(path: &Path) -> Result<LoadedDataset> {
    let file = std::fs::File::open(path)?;
    load_from_reader(file)
}

/// Parses every row, keeping the good ones. Bad rows are logged and kept in
/// `rejected`; only an unreadable header stops the load.
pub fn load_from_reader<R: Read>(reader: R) -> Result<LoadedDataset> {
    // Header names are trimmed here so row deserialization sees the same
    // names the column check does.
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DashboardError::MissingColumn { column });
        }
    }

    let mut dataset = LoadedDataset::default();
    let mut seen_ids = HashSet::new();

    for result in reader.records() {
        let parsed = result.map_err(DashboardError::from).and_then(|row| {
            let line = row.position().map_or(0, |p| p.line());
            let raw: RawRow = row.deserialize(Some(&headers))?;
            let record = parse_record(&raw, line)?;
            if !seen_ids.insert(record.student_id.clone()) {
                return Err(malformed(line, "student_id", &record.student_id, "duplicate identifier"));
            }
            Ok(record)
        });

        match parsed {
            Ok(record) => dataset.records.push(record),
            Err(err) => {
                tracing::warn!(%err, "skipping row");
                dataset.rejected.push(err);
            }
        }
    }

    tracing::info!(
        loaded = dataset.records.len(),
        rejected = dataset.rejected.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "student_id,age,gender,study_hours_per_day,social_media_hours,netflix_hours,part_time_job,attendance_percentage,sleep_hours,exercise_frequency,exam_score";

    fn raw(study: &str, age: &str, attendance: &str) -> RawRow {
        RawRow {
            student_id: "S1000".to_string(),
            age: age.to_string(),
            gender: "Female".to_string(),
            study_hours_per_day: study.to_string(),
            social_media_hours: "1.2".to_string(),
            netflix_hours: "1.1".to_string(),
            part_time_job: "No".to_string(),
            attendance_percentage: attendance.to_string(),
            sleep_hours: "8.0".to_string(),
            exercise_frequency: "6".to_string(),
        }
    }

    #[test]
    fn parses_valid_row() {
        let record = parse_record(&raw("0.0", "23", "85.0"), 2).unwrap();
        assert_eq!(record.student_id, "S1000");
        assert_eq!(record.age, Some(23));
        assert_eq!(record.study_hours_per_day, 0.0);
        assert_eq!(record.attendance_percentage, 85.0);
    }

    #[test]
    fn missing_markers_become_nan_not_zero() {
        let record = parse_record(&raw("NA", "", "null"), 2).unwrap();
        assert!(record.study_hours_per_day.is_nan());
        assert!(record.attendance_percentage.is_nan());
        assert_eq!(record.age, None);
    }

    #[test]
    fn non_numeric_field_is_reported_by_name() {
        let err = parse_record(&raw("lots", "23", "85.0"), 7).unwrap_err();
        match err {
            DashboardError::MalformedRow { line, field, value, .. } => {
                assert_eq!(line, 7);
                assert_eq!(field, "study_hours_per_day");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(parse_record(&raw("1.0", "23", "101"), 2).is_err());
        assert!(parse_record(&raw("-1.0", "23", "90"), 2).is_err());
        assert!(parse_record(&raw("1.0", "0", "90"), 2).is_err());
        assert!(parse_record(&raw("1.0", "20.5", "90"), 2).is_err());
    }

    #[test]
    fn load_keeps_going_past_bad_rows() {
        let csv = format!(
            "{HEADER}\n\
             S1,23,Female,0.0,1.2,1.1,No,85.0,8.0,6,56.2\n\
             S2,20,Female,abc,2.8,2.3,No,97.3,4.6,6,100.0\n\
             S3,21,Male,1.4,3.1,1.3,No,94.8,8.0,1,34.3\n\
             S3,22,Male,1.0,3.0,1.0,Yes,90.0,7.0,1,50.0\n\
             S4,23,Other,2.0,NA,1.0,Yes,71.0,6.2,0,26.8\n"
        );
        let dataset = load_from_reader(csv.as_bytes()).unwrap();
        let ids: Vec<&str> = dataset.records.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S3", "S4"]);
        assert_eq!(dataset.rejected.len(), 2);
        assert!(dataset.records[2].social_media_hours.is_nan());
    }

    #[test]
    fn missing_column_aborts_load() {
        let csv = "student_id,age\nS1,20\n";
        let err = load_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn { column: "gender" }));
    }

    #[test]
    fn padded_header_names_still_load_rows() {
        let header = HEADER.replace(',', ", ");
        let csv = format!("{header}\nS1000,23,Female,3.5,1.2,1.1,No,85.0,8.0,6,56.2\n");
        let dataset = load_from_reader(csv.as_bytes()).unwrap();
        assert!(dataset.rejected.is_empty());
        assert_eq!(dataset.records.len(), 1);
        assert_eq!(dataset.records[0].age, Some(23));
        assert_eq!(dataset.records[0].study_hours_per_day, 3.5);
    }
}
