use habits_dashboard::coordinator::{FilterField, HoverTarget};
use habits_dashboard::load::load_from_reader;
use habits_dashboard::models::NumericField;
use habits_dashboard::render::{Artifact, JsonLinesSink, RecordingSink};
use habits_dashboard::{Dashboard, DashboardConfig, InputEvent, ViewId};

const CSV: &str = "\
student_id,age,gender,study_hours_per_day,social_media_hours,netflix_hours,part_time_job,attendance_percentage,sleep_hours,exercise_frequency,mental_health_rating,exam_score
S1000,23,Female,3.5,1.2,1.1,No,85.0,8.0,6,8,56.2
S1001,20,Male,3.2,2.8,2.3,No,97.3,4.6,6,8,100.0
S1002,21,Male,not-a-number,3.1,1.3,No,94.8,8.0,1,1,34.3
";

fn habits(sink: &RecordingSink) -> Vec<(NumericField, Vec<(String, f64, f64)>)> {
    let Artifact::Habits { series } = &sink.last_redraw(ViewId::Habits).unwrap().artifact else {
        panic!("expected habits artifact");
    };
    series
        .iter()
        .map(|s| {
            let bands = s
                .bands
                .iter()
                .map(|(category, band)| (category.clone(), band.start, band.end))
                .collect();
            (s.key, bands)
        })
        .collect()
}

#[test]
fn study_band_sits_on_baseline_for_both_genders() {
    let dataset = load_from_reader(CSV.as_bytes()).unwrap();
    assert_eq!(dataset.records.len(), 2);
    assert_eq!(dataset.rejected.len(), 1);

    let config = DashboardConfig {
        habit_keys: vec![NumericField::StudyHoursPerDay, NumericField::SocialMediaHours],
        ..DashboardConfig::default()
    };
    let mut dashboard = Dashboard::new(&dataset.records, config);
    let mut sink = RecordingSink::default();
    dashboard.initial_render(&mut sink).unwrap();

    let stacked = habits(&sink);
    assert_eq!(stacked[0].0, NumericField::StudyHoursPerDay);
    assert!(stacked[0].1.contains(&("Female".to_string(), 0.0, 3.5)));
    assert!(stacked[0].1.contains(&("Male".to_string(), 0.0, 3.2)));
    for (category, start, _) in &stacked[1].1 {
        let study_end = stacked[0]
            .1
            .iter()
            .find(|(c, _, _)| c == category)
            .map(|(_, _, end)| *end)
            .unwrap();
        assert_eq!(*start, study_end);
    }
}

#[test]
fn replay_writes_a_json_line_per_update() {
    let dataset = load_from_reader(CSV.as_bytes()).unwrap();
    let mut dashboard = Dashboard::new(&dataset.records, DashboardConfig::default());
    let mut sink = JsonLinesSink::new(Vec::new());
    dashboard.initial_render(&mut sink).unwrap();

    let events = vec![
        InputEvent::FilterChanged {
            view: ViewId::Scatter,
            field: FilterField::Gender,
            value: "Male".to_string(),
        },
        InputEvent::MarkHovered {
            target: Some(HoverTarget::Student {
                student_id: "S1001".to_string(),
            }),
        },
        InputEvent::BrushEnded {
            view: ViewId::SleepByAge,
            selection: None,
        },
    ];
    for event in events {
        dashboard.handle(event, &mut sink).unwrap();
    }

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[4]["view"], "scatter");
    assert_eq!(lines[4]["state"]["filter"]["by"], "gender");
    assert_eq!(lines[4]["artifact"]["points"].as_array().unwrap().len(), 1);
    assert_eq!(lines[5]["html"], "Sleep: 4.6 hrs<br>Study: 3.2 hrs");
}
