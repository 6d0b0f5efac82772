use chrono::{NaiveDate, TimeZone, Utc};
use sleeplog_core::db::open_db_in_memory;
use sleeplog_core::{
    build_series, week_duration_values, week_values, ChartConfig, MetricKind, RecordStore,
    SleepRecord, SqliteRecordStore,
};

fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()
}

#[test]
fn stored_records_render_as_a_sunday_first_duration_series() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    for (day, hours) in [(3, 6), (4, 8), (6, 4)] {
        let at = Utc.with_ymd_and_hms(2024, 3, day, 7, 0, 0).unwrap();
        store
            .append(&SleepRecord::new(hours * 3600, "", at))
            .unwrap();
    }

    let chart = ChartConfig::default();
    let values = week_duration_values(&store.read_all(), wednesday());
    let series = build_series(
        &values,
        chart.duration_minimum_scale_secs,
        &MetricKind::Duration,
    );

    assert_eq!(series.bars.len(), 7);
    assert_eq!(series.bars[0].label, "Sun");
    assert_eq!(series.bars[0].display_value, "6h 0m");
    assert_eq!(series.bars[1].scaled_height_ratio, 1.0);
    assert_eq!(series.bars[3].scaled_height_ratio, 0.5);
    assert_eq!(series.bars[6].scaled_height_ratio, 0.0);
    assert_eq!(series.bars[6].display_value, "0h 0m");
}

#[test]
fn empty_week_renders_flat_bars() {
    let values = week_duration_values(&[], wednesday());
    let series = build_series(&values, 1.0, &MetricKind::Duration);

    assert!(series
        .bars
        .iter()
        .all(|bar| bar.scaled_height_ratio == 0.0));
}

#[test]
fn score_series_uses_configured_unit() {
    let chart = ChartConfig::default();
    let scores = vec![
        (NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(), 90.0),
        (NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), 45.0),
    ];
    let series = build_series(
        &week_values(scores, wednesday()),
        chart.score_minimum_scale,
        &chart.score_kind(),
    );

    assert_eq!(series.bars[0].display_value, "90pts");
    assert_eq!(series.bars[6].scaled_height_ratio, 0.5);
}

#[test]
fn building_twice_gives_identical_series() {
    let values = week_values(
        vec![(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), 70.0)],
        wednesday(),
    );
    let kind = MetricKind::Score {
        unit: String::new(),
    };
    assert_eq!(
        build_series(&values, 1.0, &kind),
        build_series(&values, 1.0, &kind)
    );
}
