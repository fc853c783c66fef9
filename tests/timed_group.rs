use chrono::{DateTime, TimeZone, Utc};
use streamhub::{ContentKey, ContentPath, GroupError, TimeUnit, TimedGroup};

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, h, m, s).unwrap()
}

#[test]
fn units_and_periods_follow_the_hierarchy() {
    assert_eq!(TimedGroup::Second.unit(), TimeUnit::Seconds);
    assert_eq!(TimedGroup::Minute.unit(), TimeUnit::Minutes);
    assert_eq!(TimedGroup::Hour.unit(), TimeUnit::Hours);
    assert_eq!(TimedGroup::Day.unit(), TimeUnit::Days);
    assert_eq!(TimedGroup::Minute.period_seconds(), 60);
    assert_eq!(TimedGroup::Day.period_seconds(), 86_400);
}

#[test]
fn minute_offset_aligns_emission_to_second_six() {
    let cases = [(0, 6), (5, 1), (6, 0), (7, 59), (59, 7)];
    for (second_of_minute, expected) in cases {
        let offset = TimedGroup::Minute.offset_seconds(at(13, 47, second_of_minute));
        assert_eq!(offset, expected, "second-of-minute {second_of_minute}");
    }
}

#[test]
fn offsets_stay_inside_the_period() {
    for second in 0..60 {
        let offset = TimedGroup::Minute.offset_seconds(at(13, 47, second));
        assert!(offset < 60, "second {second} gave offset {offset}");
    }
}

#[test]
fn second_offset_is_always_zero() {
    for second in [0, 6, 33, 59] {
        assert_eq!(TimedGroup::Second.offset_seconds(at(13, 47, second)), 0);
    }
}

#[test]
fn hour_offset_generalizes_the_skew_buffer() {
    assert_eq!(TimedGroup::Hour.offset_seconds(at(13, 0, 0)), 6);
    assert_eq!(TimedGroup::Hour.offset_seconds(at(13, 0, 6)), 0);
    assert_eq!(TimedGroup::Hour.offset_seconds(at(13, 0, 7)), 3_599);
}

#[test]
fn none_is_the_epoch_window() {
    assert_eq!(
        TimedGroup::Minute.none(),
        ContentPath::minute(DateTime::UNIX_EPOCH)
    );
    let contemporary = ContentPath::minute(at(10, 0, 0));
    assert!(TimedGroup::Minute.none() < contemporary);
}

#[test]
fn bucket_sorts_and_dedups_window_keys() {
    let window = at(10, 15, 0);
    let keys = vec![
        ContentKey::new(at(10, 15, 45), 2),
        ContentKey::new(at(10, 15, 3), 0),
        ContentKey::new(at(10, 15, 45), 2),
        ContentKey::new(at(10, 15, 3), 1),
    ];
    let bucketed = TimedGroup::Minute.bucket(window, keys).unwrap();
    assert_eq!(bucketed.path(), &ContentPath::minute(window));
    assert_eq!(
        bucketed.keys(),
        &[
            ContentKey::new(at(10, 15, 3), 0),
            ContentKey::new(at(10, 15, 3), 1),
            ContentKey::new(at(10, 15, 45), 2),
        ]
    );
}

#[test]
fn bucket_rounds_the_window_start() {
    let bucketed = TimedGroup::Hour
        .bucket(at(10, 15, 30), Vec::new())
        .unwrap();
    assert_eq!(bucketed.path(), &ContentPath::hour(at(10, 0, 0)));
}

#[test]
fn bucket_rejects_keys_from_a_foreign_window() {
    let stray = ContentKey::new(at(10, 16, 0), 0);
    let err = TimedGroup::Minute
        .bucket(at(10, 15, 0), vec![stray])
        .unwrap_err();
    assert!(matches!(err, GroupError::KeyOutsideWindow { key, .. } if key == stray));
}

#[test]
fn stable_boundary_backs_off_at_the_final_second() {
    let group = TimedGroup::Minute;
    let at_59 = ContentPath::second(at(10, 15, 59));
    assert_eq!(group.replicating_stable(&at_59), at(10, 14, 0));

    let at_0 = ContentPath::second(at(10, 15, 0));
    assert_eq!(group.replicating_stable(&at_0), at(10, 15, 0));
    let at_58 = ContentPath::second(at(10, 15, 58));
    assert_eq!(group.replicating_stable(&at_58), at(10, 15, 0));
}

#[test]
fn stable_boundary_backs_off_for_bare_keys() {
    let key: ContentPath = ContentKey::new(at(10, 15, 30), 4).into();
    assert_eq!(TimedGroup::Minute.replicating_stable(&key), at(10, 14, 0));
    assert_eq!(TimedGroup::Hour.replicating_stable(&key), at(9, 0, 0));
}

#[test]
fn stable_boundary_uses_the_path_window_otherwise() {
    let minute = ContentPath::minute(at(10, 15, 0));
    assert_eq!(TimedGroup::Minute.replicating_stable(&minute), at(10, 15, 0));

    let second = ContentPath::second(at(10, 15, 30));
    assert_eq!(TimedGroup::Day.replicating_stable(&second), at(0, 0, 0));
}
