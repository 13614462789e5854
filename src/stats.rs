use std::collections::BTreeMap;

use crate::error::{DashboardError, Result};
use crate::models::{
    Band, BoxStats, CategoryMeans, GroupMean, NumericField, Point, Record, Regression,
    StackedSeries, TrendLine,
};

/// Smallest and largest finite value, or `None` if there are none.
pub fn extent<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Quantile of an ascending slice by linear interpolation at index
/// `p * (n - 1)`. NaN for an empty slice.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    match n {
        0 => return f64::NAN,
        1 => return sorted[0],
        _ => {}
    }
    let idx = (p.clamp(0.0, 1.0) * (n - 1) as f64).max(0.0);
    let lower = idx.floor() as usize;
    let upper = (idx.ceil() as usize).min(n - 1);
    let frac = idx - lower as f64;
    (sorted[lower] + (sorted[upper] - sorted[lower]) * frac).clamp(sorted[lower], sorted[upper])
}

pub fn linear_regression(points: &[Point]) -> Result<Regression> {
    let points: Vec<&Point> = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    let n = points.len();
    if n < 2 {
        return Err(DashboardError::DegenerateInput { n });
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for p in &points {
        sum_x += p.x;
        sum_y += p.y;
        sum_xy += p.x * p.y;
        sum_x2 += p.x * p.x;
    }

    let n = n as f64;
    let denominator = n * sum_x2 - sum_x * sum_x;
    // Cancellation can leave a residue relative to n * sum_x2 when every x
    // is equal, so the threshold scales with the data.
    if denominator <= f64::EPSILON * n * sum_x2 {
        return Err(DashboardError::DegenerateInput { n: points.len() });
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Ok(Regression { slope, intercept })
}

pub fn trend_line(points: &[Point]) -> Result<TrendLine> {
    let fit = linear_regression(points)?;
    let (x0, x1) = extent(points.iter().filter(|p| p.y.is_finite()).map(|p| p.x))
        .ok_or(DashboardError::DegenerateInput { n: 0 })?;
    Ok(TrendLine {
        fit,
        start: Point {
            x: x0,
            y: fit.predict(x0),
        },
        end: Point {
            x: x1,
            y: fit.predict(x1),
        },
    })
}

/// Mean of `value` per group, ascending by key. Missing values leave the
/// group's denominator; groups left with nothing get `mean: None`.
pub fn grouped_mean<'a, I, K, G, V>(records: I, group_key: G, value: V) -> Vec<GroupMean<K>>
where
    I: IntoIterator<Item = &'a Record>,
    K: Ord,
    G: Fn(&Record) -> Option<K>,
    V: Fn(&Record) -> f64,
{
    let mut groups: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for record in records {
        let Some(key) = group_key(record) else {
            continue;
        };
        let entry = groups.entry(key).or_insert((0.0, 0));
        let v = value(record);
        if v.is_finite() {
            entry.0 += v;
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, (sum, count))| GroupMean {
            key,
            mean: (count > 0).then(|| sum / count as f64),
            count,
        })
        .collect()
}

/// Box statistics over the finite values in `values`.
pub fn box_stats<I>(category: &str, values: I) -> Result<BoxStats>
where
    I: IntoIterator<Item = f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(DashboardError::EmptyGroup {
            category: category.to_string(),
        });
    }
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|&v| v < lower || v > upper)
        .collect();

    Ok(BoxStats {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        sorted_values: sorted,
        q1,
        median,
        q3,
        iqr,
        outliers,
    })
}

/// Box statistics per category, in the order of `categories`. Categories
/// with no valid values map to `None`.
pub fn box_statistics<'a, I, C, V>(
    records: I,
    categories: &[String],
    category_key: C,
    value: V,
) -> Vec<(String, Option<BoxStats>)>
where
    I: IntoIterator<Item = &'a Record> + Clone,
    C: Fn(&Record) -> &str,
    V: Fn(&Record) -> f64,
{
    categories
        .iter()
        .map(|category| {
            let values = records
                .clone()
                .into_iter()
                .filter(|r| category_key(r) == category.as_str())
                .map(&value);
            match box_stats(category, values) {
                Ok(stats) => (category.clone(), Some(stats)),
                Err(err) => {
                    tracing::debug!(%err, "skipping box");
                    (category.clone(), None)
                }
            }
        })
        .collect()
}

/// Mean of every field in `keys` per category, categories in order of
/// first appearance.
pub fn group_means_by_category<'a, I, C>(
    records: I,
    category_key: C,
    keys: &[NumericField],
) -> Vec<CategoryMeans>
where
    I: IntoIterator<Item = &'a Record>,
    C: Fn(&Record) -> &str,
{
    let mut order: Vec<String> = Vec::new();
    let mut members: Vec<Vec<&Record>> = Vec::new();
    for record in records {
        let category = category_key(record);
        match order.iter().position(|c| c == category) {
            Some(idx) => members[idx].push(record),
            None => {
                order.push(category.to_string());
                members.push(vec![record]);
            }
        }
    }

    order
        .into_iter()
        .zip(members)
        .map(|(category, group)| {
            let means = keys
                .iter()
                .map(|&key| {
                    let (sum, count) = group
                        .iter()
                        .map(|r| key.value(r))
                        .filter(|v| v.is_finite())
                        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                    (key, (count > 0).then(|| sum / count as f64))
                })
                .collect();
            CategoryMeans { category, means }
        })
        .collect()
}

/// Cumulative bands per key; the first key sits on the baseline. A single
/// key gives one band per group.
pub fn stacked_decomposition(groups: &[CategoryMeans], keys: &[NumericField]) -> Vec<StackedSeries> {
    let mut offsets = vec![0.0; groups.len()];
    keys.iter()
        .map(|&key| {
            let bands = groups
                .iter()
                .zip(offsets.iter_mut())
                .map(|(group, offset)| {
                    let value = group.mean(key);
                    let start = *offset;
                    *offset += value.unwrap_or(0.0);
                    (
                        group.category.clone(),
                        Band {
                            start,
                            end: *offset,
                            value,
                        },
                    )
                })
                .collect();
            StackedSeries { key, bands }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(id: &str, gender: &str, age: Option<u32>, study: f64, sleep: f64) -> Record {
        Record {
            student_id: id.to_string(),
            age,
            gender: gender.to_string(),
            study_hours_per_day: study,
            social_media_hours: 1.0,
            netflix_hours: 0.5,
            part_time_job: "No".to_string(),
            attendance_percentage: 90.0,
            sleep_hours: sleep,
            exercise_frequency: 3.0,
        }
    }

    fn rss(points: &[Point], slope: f64, intercept: f64) -> f64 {
        points
            .iter()
            .map(|p| (p.y - (slope * p.x + intercept)).powi(2))
            .sum()
    }

    #[test]
    fn regression_recovers_colinear_points() {
        let points: Vec<Point> = (0..6)
            .map(|i| Point {
                x: i as f64,
                y: 2.5 * i as f64 - 1.0,
            })
            .collect();
        let fit = linear_regression(&points).unwrap();
        assert!((fit.slope - 2.5).abs() < 1e-9);
        assert!((fit.intercept + 1.0).abs() < 1e-9);
    }

    #[test]
    fn regression_rejects_degenerate_input() {
        let single = [Point { x: 1.0, y: 2.0 }];
        assert!(matches!(
            linear_regression(&single),
            Err(DashboardError::DegenerateInput { n: 1 })
        ));

        let vertical = [Point { x: 3.0, y: 1.0 }, Point { x: 3.0, y: 5.0 }];
        assert!(matches!(
            linear_regression(&vertical),
            Err(DashboardError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn regression_fits_small_magnitude_inputs() {
        let points: Vec<Point> = [0.0, 1e-8, 2e-8].iter().map(|&x| Point { x, y: x }).collect();
        let fit = linear_regression(&points).unwrap();
        assert!((fit.slope - 1.0).abs() < 1e-6);
        assert!(fit.intercept.abs() < 1e-12);
    }

    #[test]
    fn trend_line_spans_x_extent() {
        let points = [
            Point { x: 4.0, y: 6.0 },
            Point { x: 1.0, y: 8.0 },
            Point { x: 2.0, y: 7.5 },
            Point { x: f64::NAN, y: 7.0 },
        ];
        let line = trend_line(&points).unwrap();
        assert_eq!(line.start.x, 1.0);
        assert_eq!(line.end.x, 4.0);
        assert!((line.start.y - line.fit.predict(1.0)).abs() < 1e-12);
    }

    #[test]
    fn grouped_mean_excludes_missing_values() {
        let records = vec![
            record("a", "Male", Some(19), 2.0, f64::NAN),
            record("b", "Female", Some(18), 3.0, 6.0),
            record("c", "Male", Some(18), 1.0, 8.0),
        ];
        let means = grouped_mean(&records, |r| r.age, |r| r.sleep_hours);
        assert_eq!(means.len(), 2);
        assert_eq!(means[0].key, 18);
        assert_eq!(means[0].mean, Some(7.0));
        assert_eq!(means[0].count, 2);
        assert_eq!(means[1].key, 19);
        assert_eq!(means[1].mean, None);
    }

    #[test]
    fn grouped_mean_skips_records_without_group() {
        let records = vec![
            record("a", "Male", None, 2.0, 5.0),
            record("b", "Male", Some(20), 2.0, 9.0),
        ];
        let means = grouped_mean(&records, |r| r.age, |r| r.sleep_hours);
        assert_eq!(means.len(), 1);
        assert_eq!(means[0].mean, Some(9.0));
    }

    #[test]
    fn quantile_interpolates_between_order_statistics() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 1.0), 4.0);
        assert_eq!(quantile(&[7.0], 0.75), 7.0);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn box_stats_flags_outliers_and_keeps_full_range() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0];
        let stats = box_stats("Yes", values).unwrap();
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 100.0);
        assert_eq!(stats.iqr, stats.q3 - stats.q1);
    }

    #[test]
    fn box_statistics_yields_none_for_empty_category() {
        let mut with_job = record("a", "Male", Some(20), 2.0, 7.0);
        with_job.part_time_job = "Yes".to_string();
        let records = vec![with_job];
        let categories = vec!["Yes".to_string(), "No".to_string()];
        let boxes = box_statistics(
            &records,
            &categories,
            |r| r.part_time_job.as_str(),
            |r| r.attendance_percentage,
        );
        assert_eq!(boxes[0].0, "Yes");
        assert!(boxes[0].1.is_some());
        assert_eq!(boxes[1].0, "No");
        assert!(boxes[1].1.is_none());
    }

    #[test]
    fn stacked_study_band_sits_on_baseline_for_each_gender() {
        let groups = vec![
            CategoryMeans {
                category: "Female".to_string(),
                means: vec![
                    (NumericField::StudyHoursPerDay, Some(3.5)),
                    (NumericField::SocialMediaHours, Some(2.0)),
                ],
            },
            CategoryMeans {
                category: "Male".to_string(),
                means: vec![
                    (NumericField::StudyHoursPerDay, Some(3.2)),
                    (NumericField::SocialMediaHours, Some(2.5)),
                ],
            },
        ];
        let keys = [NumericField::StudyHoursPerDay, NumericField::SocialMediaHours];
        let series = stacked_decomposition(&groups, &keys);

        assert_eq!(series[0].key, NumericField::StudyHoursPerDay);
        let study: Vec<(f64, f64)> = series[0].bands.iter().map(|(_, b)| (b.start, b.end)).collect();
        assert_eq!(study, vec![(0.0, 3.5), (0.0, 3.2)]);
        let social = &series[1].bands;
        assert_eq!((social[0].1.start, social[0].1.end), (3.5, 5.5));
        assert_eq!(social[1].1.start, 3.2);
        assert!((social[1].1.end - 5.7).abs() < 1e-12);

        let mut reversed = groups.clone();
        reversed.reverse();
        let series = stacked_decomposition(&reversed, &keys);
        let male = &series[0].bands[0];
        assert_eq!(male.0, "Male");
        assert_eq!((male.1.start, male.1.end), (0.0, 3.2));
    }

    #[test]
    fn single_key_stack_is_one_band_per_group() {
        let groups = vec![CategoryMeans {
            category: "Other".to_string(),
            means: vec![
                (NumericField::StudyHoursPerDay, Some(3.0)),
                (NumericField::NetflixHours, None),
            ],
        }];
        let series = stacked_decomposition(&groups, &[NumericField::NetflixHours]);
        assert_eq!(series.len(), 1);
        let band = series[0].bands[0].1;
        assert_eq!((band.start, band.end, band.value), (0.0, 0.0, None));
    }

    #[test]
    fn category_means_follow_first_appearance() {
        let records = vec![
            record("a", "Male", Some(20), 2.0, 7.0),
            record("b", "Female", Some(21), 4.0, 7.0),
            record("c", "Male", Some(22), 4.0, 7.0),
            record("d", "Female", Some(22), f64::NAN, 7.0),
        ];
        let groups = group_means_by_category(
            &records,
            |r| r.gender.as_str(),
            &[NumericField::StudyHoursPerDay],
        );
        assert_eq!(groups[0].category, "Male");
        assert_eq!(groups[0].mean(NumericField::StudyHoursPerDay), Some(3.0));
        assert_eq!(groups[1].category, "Female");
        assert_eq!(groups[1].mean(NumericField::StudyHoursPerDay), Some(4.0));
    }

    proptest! {
        #[test]
        fn prop_regression_minimizes_residuals(
            points in prop::collection::vec((-100.0f64..100.0, -100.0f64..100.0), 3..40),
            ds in -0.5f64..0.5,
            di in -0.5f64..0.5,
        ) {
            let points: Vec<Point> = points.into_iter().map(|(x, y)| Point { x, y }).collect();
            if let Ok(fit) = linear_regression(&points) {
                let best = rss(&points, fit.slope, fit.intercept);
                let other = rss(&points, fit.slope + ds, fit.intercept + di);
                prop_assert!(best <= other + 1e-6 * other.abs().max(1.0));
            }
        }

        #[test]
        fn prop_box_stats_are_ordered(values in prop::collection::vec(0.0f64..100.0, 1..60)) {
            let stats = box_stats("cat", values).unwrap();
            prop_assert!(stats.min <= stats.q1);
            prop_assert!(stats.q1 <= stats.median);
            prop_assert!(stats.median <= stats.q3);
            prop_assert!(stats.q3 <= stats.max);
        }

        #[test]
        fn prop_outliers_are_exactly_values_outside_fences(
            values in prop::collection::vec(-50.0f64..150.0, 1..60),
        ) {
            let stats = box_stats("cat", values).unwrap();
            let (lo, hi) = (stats.lower_fence(), stats.upper_fence());
            let expected: Vec<f64> = stats
                .sorted_values
                .iter()
                .copied()
                .filter(|&v| v < lo || v > hi)
                .collect();
            prop_assert_eq!(&stats.outliers, &expected);
            for v in &stats.outliers {
                prop_assert!(*v < lo || *v > hi);
            }
        }
    }
}
