#![forbid(unsafe_code)]
use chrono::NaiveDate;
use turnero::{
    expand, fleet_lower_bound, greedy, refine, refine_multi_start, CancelToken, ConflictSets,
    Frequency, Regime, SearchParams, ServiceRecord, ServiceType, Shift, ShiftId, ShiftSpec,
    Solution,
};

#[test]
fn drop_driver_removes_a_wasteful_driver() {
    // dos turnos compatibles repartidos a mano en dos conductores: el
    // refinamiento debe dejar uno solo
    let shifts = vec![
        shift(0, date(2025, 2, 3), 360, 480),
        shift(1, date(2025, 2, 3), 1200, 180),
    ];
    let regime = Regime::default();
    let conflicts = ConflictSets::build(&shifts, &regime);

    let mut initial = Solution::new(regime.cycle, shifts.len());
    let d0 = initial.spawn_driver(date(2025, 2, 3));
    let d1 = initial.spawn_driver(date(2025, 2, 3));
    initial.assign(&shifts[0], d0);
    initial.assign(&shifts[1], d1);
    assert_eq!(initial.driver_count(), 2);

    let params = SearchParams {
        time_budget_secs: 30.0,
        stagnation_limit: 60,
        seed: 1,
        ..SearchParams::default()
    };
    let outcome = refine(
        &initial,
        &shifts,
        &conflicts,
        &regime,
        &params,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(outcome.solution.driver_count(), 1);
    assert!(outcome.solution.is_complete());
    assert!(outcome.solution.violations(&shifts, &regime).is_empty());
    assert!(outcome.stats.improvements >= 1);
}

#[test]
fn refine_is_deterministic_per_seed() {
    let shifts = month_fixture();
    let regime = Regime::default();
    let conflicts = ConflictSets::build(&shifts, &regime);
    let initial = greedy(&shifts, &conflicts, &regime, 3).unwrap();

    let params = SearchParams {
        time_budget_secs: 600.0,
        stagnation_limit: 40,
        seed: 42,
        ..SearchParams::default()
    };
    let a = refine(&initial, &shifts, &conflicts, &regime, &params, &CancelToken::new()).unwrap();
    let b = refine(&initial, &shifts, &conflicts, &regime, &params, &CancelToken::new()).unwrap();

    assert_eq!(a.stats.iterations, b.stats.iterations);
    assert_eq!(
        a.solution.assignment_views(&shifts),
        b.solution.assignment_views(&shifts)
    );
    assert_eq!(a.solution.driver_summaries(), b.solution.driver_summaries());
}

#[test]
fn refine_never_worse_than_greedy() {
    let shifts = month_fixture();
    let regime = Regime::default();
    let conflicts = ConflictSets::build(&shifts, &regime);
    let initial = greedy(&shifts, &conflicts, &regime, 0).unwrap();

    let params = SearchParams {
        time_budget_secs: 10.0,
        stagnation_limit: 80,
        seed: 5,
        ..SearchParams::default()
    };
    let outcome = refine(
        &initial,
        &shifts,
        &conflicts,
        &regime,
        &params,
        &CancelToken::new(),
    )
    .unwrap();

    assert!(outcome.solution.driver_count() <= initial.driver_count());
    assert!(outcome.solution.is_complete());
    assert!(outcome.solution.violations(&shifts, &regime).is_empty());
}

#[test]
fn cancelled_refine_returns_best_so_far() {
    let shifts = month_fixture();
    let regime = Regime::default();
    let conflicts = ConflictSets::build(&shifts, &regime);
    let initial = greedy(&shifts, &conflicts, &regime, 0).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let outcome = refine(
        &initial,
        &shifts,
        &conflicts,
        &regime,
        &SearchParams::default(),
        &cancel,
    )
    .unwrap();

    assert!(outcome.stats.cancelled);
    assert_eq!(outcome.stats.iterations, 0);
    assert_eq!(outcome.solution.driver_count(), initial.driver_count());
    assert!(outcome.solution.violations(&shifts, &regime).is_empty());
}

#[test]
fn speculative_clone_leaves_original_untouched() {
    let shifts = month_fixture();
    let regime = Regime::default();
    let conflicts = ConflictSets::build(&shifts, &regime);
    let original = greedy(&shifts, &conflicts, &regime, 0).unwrap();

    let before: Vec<_> = shifts.iter().map(|s| original.driver_of(s.id)).collect();
    let mut clone = original.clone();
    for s in shifts.iter().take(10) {
        clone.unassign(s);
    }
    let after: Vec<_> = shifts.iter().map(|s| original.driver_of(s.id)).collect();

    assert_eq!(before, after);
    assert_eq!(clone.assigned_count(), original.assigned_count() - 10);
}

#[test]
fn multi_start_picks_a_feasible_winner() {
    let shifts = month_fixture();
    let regime = Regime::default();
    let conflicts = ConflictSets::build(&shifts, &regime);
    let initial = greedy(&shifts, &conflicts, &regime, 0).unwrap();

    let params = SearchParams {
        time_budget_secs: 10.0,
        stagnation_limit: 30,
        ..SearchParams::default()
    };
    let outcome = refine_multi_start(
        &initial,
        &shifts,
        &conflicts,
        &regime,
        &params,
        &[1, 2, 3],
        &CancelToken::new(),
    )
    .unwrap();

    assert!(outcome.solution.driver_count() <= initial.driver_count());
    assert!(outcome.solution.violations(&shifts, &regime).is_empty());
}

#[test]
fn reference_scale_month_stays_within_forty_drivers() {
    // mes de referencia: 944 turnos, 3865 h exactas, 28 días. Cada día
    // trae 17 pares mañana/tarde separados por más de cinco horas; un
    // conductor lleva su par completo y vuelve al día siguiente con más
    // de diez horas de descanso.
    let mut specs = Vec::new();
    let mut emitted = 0u32;
    for day in 1..=28u32 {
        for slot in 0..17u32 {
            let first = 240 + slot * 24;
            for (block, start) in [(0u32, first), (1, first + 560)] {
                // 8 días cortos para cuadrar los 944 turnos exactos
                if block == 1 && slot == 16 && day > 20 {
                    continue;
                }
                // 534 turnos de 250 min + 410 de 240 min = 3865 h
                let duration_hours = if emitted < 534 { 250.0 / 60.0 } else { 4.0 };
                emitted += 1;
                specs.push(ShiftSpec {
                    date: Some(date(2025, 2, day)),
                    frequency: None,
                    start: format!("{:02}:{:02}", start / 60, start % 60),
                    duration_hours,
                    number: slot + 1 + block * 20,
                });
            }
        }
    }
    let services = vec![ServiceRecord {
        service: "faena-n".to_string(),
        vehicle: None,
        kind: ServiceType::Faena,
        shifts: specs,
    }];
    let regime = Regime::default();
    let shifts = expand(2025, 2, &services, &regime).unwrap();
    assert_eq!(shifts.len(), 944);
    let total_min: u64 = shifts.iter().map(|s| u64::from(s.duration_min)).sum();
    assert_eq!(total_min, 3865 * 60);

    let conflicts = ConflictSets::build(&shifts, &regime);
    let initial = greedy(&shifts, &conflicts, &regime, 0).unwrap();
    assert!(initial.is_complete());
    assert!(initial.violations(&shifts, &regime).is_empty());
    assert!(initial.driver_count() <= 40);

    let params = SearchParams {
        time_budget_secs: 3.0,
        stagnation_limit: 120,
        seed: 9,
        ..SearchParams::default()
    };
    let outcome = refine(
        &initial,
        &shifts,
        &conflicts,
        &regime,
        &params,
        &CancelToken::new(),
    )
    .unwrap();

    let bound = fleet_lower_bound(&shifts, &regime);
    assert!(outcome.solution.driver_count() <= initial.driver_count());
    assert!(outcome.solution.driver_count() <= 40);
    assert!(outcome.solution.driver_count() >= bound);
    assert!(outcome.solution.violations(&shifts, &regime).is_empty());
}

/// Dos servicios diarios no triviales sobre febrero 2025.
fn month_fixture() -> Vec<Shift> {
    let services = vec![
        ServiceRecord {
            service: "faena-a".to_string(),
            vehicle: None,
            kind: ServiceType::Faena,
            shifts: vec![
                ShiftSpec {
                    date: None,
                    frequency: Some(Frequency::Daily),
                    start: "06:00".to_string(),
                    duration_hours: 8.0,
                    number: 1,
                },
                ShiftSpec {
                    date: None,
                    frequency: Some(Frequency::Daily),
                    start: "20:00".to_string(),
                    duration_hours: 3.0,
                    number: 2,
                },
            ],
        },
        ServiceRecord {
            service: "faena-b".to_string(),
            vehicle: None,
            kind: ServiceType::Faena,
            shifts: vec![ShiftSpec {
                date: None,
                frequency: Some(Frequency::Weekdays),
                start: "09:00".to_string(),
                duration_hours: 6.0,
                number: 1,
            }],
        },
    ];
    expand(2025, 2, &services, &Regime::default()).unwrap()
}

fn shift(id: u32, date: NaiveDate, start_min: u32, duration_min: u32) -> Shift {
    Shift {
        id: ShiftId::new(id),
        service: "faena-a".to_string(),
        number: 1,
        vehicle: None,
        kind: ServiceType::Faena,
        date,
        start_min,
        duration_min,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
