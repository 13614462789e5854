use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::config::DashboardConfig;
use crate::load::LoadedDataset;
use crate::models::{Point, Record};
use crate::stats;

fn trend_summary<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    let points: Vec<Point> = records
        .into_iter()
        .map(|r| Point {
            x: r.study_hours_per_day,
            y: r.sleep_hours,
        })
        .collect();
    match stats::trend_line(&points) {
        Ok(line) => format!(
            "sleep = {:.3} x study + {:.3} (from {:.1}h to {:.1}h of study)",
            line.fit.slope, line.fit.intercept, line.start.x, line.end.x
        ),
        Err(_) => "not enough distinct study hours for a trend line".to_string(),
    }
}

pub fn build_report(
    generated_at: DateTime<Utc>,
    source: &str,
    dataset: &LoadedDataset,
    config: &DashboardConfig,
) -> String {
    let records = &dataset.records;
    let mut output = String::new();

    let _ = writeln!(output, "# Student Habits Dashboard Report");
    let _ = writeln!(
        output,
        "Generated {} from {}",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        source
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Dataset");
    let _ = writeln!(
        output,
        "- {} records loaded, {} rows rejected",
        records.len(),
        dataset.rejected.len()
    );
    for err in dataset.rejected.iter().take(5) {
        let _ = writeln!(output, "  - {err}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Study vs. Sleep");
    let _ = writeln!(output, "- All: {}", trend_summary(records));
    let genders = stats::group_means_by_category(records, |r| r.gender.as_str(), &[]);
    for group in &genders {
        let subset = records.iter().filter(|r| r.gender == group.category);
        let _ = writeln!(output, "- {}: {}", group.category, trend_summary(subset));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Average Sleep by Age");
    let sleep = stats::grouped_mean(records, |r| r.age, |r| r.sleep_hours);
    if sleep.is_empty() {
        let _ = writeln!(output, "No ages recorded.");
    }
    for group in &sleep {
        match group.mean {
            Some(mean) => {
                let _ = writeln!(output, "- {}: {:.1} hrs ({} students)", group.key, mean, group.count);
            }
            None => {
                let _ = writeln!(output, "- {}: no data", group.key);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance by Part-Time Job");
    let _ = writeln!(output, "Whiskers span the full range, outliers included.");
    let boxes = stats::box_statistics(
        records,
        &config.box_categories,
        |r| r.part_time_job.as_str(),
        |r| r.attendance_percentage,
    );
    for (category, summary) in &boxes {
        match summary {
            Some(summary) => {
                let _ = writeln!(
                    output,
                    "- {}: median {:.1}%, IQR {:.1}-{:.1}%, range {:.1}-{:.1}%, {} outliers",
                    category,
                    summary.median,
                    summary.q1,
                    summary.q3,
                    summary.min,
                    summary.max,
                    summary.outliers.len()
                );
            }
            None => {
                let _ = writeln!(output, "- {}: no data", category);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Habits by Gender");
    let habits = stats::group_means_by_category(records, |r| r.gender.as_str(), &config.habit_keys);
    if habits.is_empty() {
        let _ = writeln!(output, "No records to summarize.");
    }
    for group in &habits {
        let parts: Vec<String> = group
            .means
            .iter()
            .map(|(key, mean)| match mean {
                Some(mean) => format!("{key} {mean:.1}"),
                None => format!("{key} n/a"),
            })
            .collect();
        let _ = writeln!(output, "- {}: {}", group.category, parts.join(", "));
    }

    output
}
