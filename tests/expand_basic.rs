#![forbid(unsafe_code)]
use chrono::{Datelike, NaiveDate};
use turnero::{
    detect_mode, expand, ExpandMode, Frequency, Regime, ServiceRecord, ServiceType, ShiftSpec,
    SolveError,
};

#[test]
fn template_daily_covers_every_date() {
    let services = vec![record("faena-a", vec![template_spec("06:00", 8.0, 1, Frequency::Daily)])];
    let shifts = expand(2025, 3, &services, &Regime::default()).unwrap();

    assert_eq!(shifts.len(), 31);
    for (idx, shift) in shifts.iter().enumerate() {
        assert_eq!(shift.id.index(), idx);
        assert_eq!(shift.date.month(), 3);
        assert_eq!(shift.start_min, 6 * 60);
        assert_eq!(shift.duration_min, 8 * 60);
    }
}

#[test]
fn template_weekday_frequency_skips_weekends() {
    let services = vec![record(
        "faena-a",
        vec![template_spec("06:00", 8.0, 1, Frequency::Weekdays)],
    )];
    let shifts = expand(2025, 3, &services, &Regime::default()).unwrap();

    // marzo 2025: 21 días hábiles
    assert_eq!(shifts.len(), 21);
    assert!(shifts
        .iter()
        .all(|s| s.date.weekday().number_from_monday() <= 5));
}

#[test]
fn dated_mode_filters_to_target_month() {
    let services = vec![record(
        "faena-a",
        vec![
            dated_spec(date(2025, 3, 5), "06:00", 8.0, 1),
            dated_spec(date(2025, 3, 20), "06:00", 8.0, 1),
            dated_spec(date(2025, 4, 2), "06:00", 8.0, 1),
        ],
    )];
    let shifts = expand(2025, 3, &services, &Regime::default()).unwrap();

    assert_eq!(shifts.len(), 2);
    assert!(shifts.iter().all(|s| s.date.month() == 3));
}

#[test]
fn dated_input_is_never_reexpanded() {
    // regresión: la entrada ya fechada debe salir 1:1, nunca multiplicada
    // por los días del mes
    let mut specs = Vec::new();
    for day in 1..=28u32 {
        let per_day = if day <= 20 { 34 } else { 33 };
        for k in 0..per_day {
            let start = (240 + k * 35) % 1440;
            specs.push(dated_spec(
                date(2025, 2, day),
                &format!("{:02}:{:02}", start / 60, start % 60),
                4.0,
                k + 1,
            ));
        }
    }
    assert_eq!(specs.len(), 944);

    let services = vec![record("faena-n", specs)];
    let shifts = expand(2025, 2, &services, &Regime::default()).unwrap();

    assert_eq!(shifts.len(), 944);
    let mut ids: Vec<u32> = shifts.iter().map(|s| s.id.as_u32()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 944);
}

#[test]
fn mixed_kinds_are_rejected() {
    let services = vec![record(
        "faena-a",
        vec![
            dated_spec(date(2025, 3, 5), "06:00", 8.0, 1),
            template_spec("14:00", 8.0, 2, Frequency::Daily),
        ],
    )];
    let err = expand(2025, 3, &services, &Regime::default()).unwrap_err();
    assert!(matches!(err, SolveError::MixedShiftKinds));
}

#[test]
fn detect_mode_classifies_by_first_spec() {
    let dated = vec![record(
        "faena-a",
        vec![dated_spec(date(2025, 3, 5), "06:00", 8.0, 1)],
    )];
    assert_eq!(detect_mode(&dated).unwrap(), ExpandMode::Dated);

    let template = vec![record(
        "faena-a",
        vec![template_spec("06:00", 8.0, 1, Frequency::Daily)],
    )];
    assert_eq!(detect_mode(&template).unwrap(), ExpandMode::Template);
}

#[test]
fn hard_limits_are_enforced_per_shift() {
    let zero = vec![record(
        "faena-a",
        vec![dated_spec(date(2025, 3, 5), "06:00", 0.0, 1)],
    )];
    assert!(matches!(
        expand(2025, 3, &zero, &Regime::default()).unwrap_err(),
        SolveError::InvalidShift { .. }
    ));

    let too_long = vec![record(
        "faena-a",
        vec![dated_spec(date(2025, 3, 5), "06:00", 15.0, 1)],
    )];
    assert!(matches!(
        expand(2025, 3, &too_long, &Regime::default()).unwrap_err(),
        SolveError::InvalidShift { .. }
    ));

    let bad_time = vec![record(
        "faena-a",
        vec![dated_spec(date(2025, 3, 5), "25:00", 8.0, 1)],
    )];
    assert!(matches!(
        expand(2025, 3, &bad_time, &Regime::default()).unwrap_err(),
        SolveError::InvalidShift { .. }
    ));
}

#[test]
fn cross_midnight_shift_keeps_its_start_date() {
    let services = vec![record(
        "faena-a",
        vec![dated_spec(date(2025, 3, 31), "19:30", 5.25, 1)],
    )];
    let shifts = expand(2025, 3, &services, &Regime::default()).unwrap();

    assert_eq!(shifts.len(), 1);
    let shift = &shifts[0];
    assert_eq!(shift.date, date(2025, 3, 31));
    assert_eq!(shift.start_min, 1170);
    assert_eq!(shift.end_min(), 1485);
    assert!(shift.crosses_midnight());

    let segments = shift.day_segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0], (date(2025, 3, 31), 1170, 1440));
    assert_eq!(segments[1], (date(2025, 4, 1), 0, 45));
}

#[test]
fn frequency_grammar() {
    assert_eq!(Frequency::parse("daily").unwrap(), Frequency::Daily);
    assert_eq!(Frequency::parse("mon-fri").unwrap(), Frequency::Weekdays);
    assert_eq!(Frequency::parse("sat-sun").unwrap(), Frequency::Weekends);
    assert_eq!(
        Frequency::parse("lu,mi,vi").unwrap(),
        Frequency::Days(vec![1, 3, 5])
    );
    assert_eq!(
        Frequency::parse("1,7").unwrap(),
        Frequency::Days(vec![1, 7])
    );
    assert!(Frequency::parse("8").is_err());
    assert!(Frequency::parse("").is_err());
}

fn record(service: &str, shifts: Vec<ShiftSpec>) -> ServiceRecord {
    ServiceRecord {
        service: service.to_string(),
        vehicle: None,
        kind: ServiceType::Faena,
        shifts,
    }
}

fn template_spec(start: &str, hours: f64, number: u32, frequency: Frequency) -> ShiftSpec {
    ShiftSpec {
        date: None,
        frequency: Some(frequency),
        start: start.to_string(),
        duration_hours: hours,
        number,
    }
}

fn dated_spec(date: NaiveDate, start: &str, hours: f64, number: u32) -> ShiftSpec {
    ShiftSpec {
        date: Some(date),
        frequency: None,
        start: start.to_string(),
        duration_hours: hours,
        number,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
