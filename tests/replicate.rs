#![forbid(unsafe_code)]
use turnero::{
    expand, greedy, replicate, ConflictSets, Frequency, Regime, ServiceRecord, ServiceType,
    ShiftSpec,
};

#[test]
fn matching_month_replicates_with_same_fleet() {
    let services = fixture_services();
    let regime = Regime::default();

    let source_shifts = expand(2025, 2, &services, &regime).unwrap();
    let conflicts = ConflictSets::build(&source_shifts, &regime);
    let source = greedy(&source_shifts, &conflicts, &regime, 0).unwrap();
    assert!(source.violations(&source_shifts, &regime).is_empty());

    let target_shifts = expand(2025, 3, &services, &regime).unwrap();
    let outcome = replicate(&source, &source_shifts, (2025, 2), &target_shifts, &regime).unwrap();

    assert!(outcome.gaps.is_empty());
    assert!(outcome.solution.is_complete());
    assert_eq!(outcome.solution.driver_count(), source.driver_count());
    assert!(outcome
        .solution
        .violations(&target_shifts, &regime)
        .is_empty());
}

#[test]
fn replicated_drivers_keep_their_anchors() {
    let services = fixture_services();
    let regime = Regime::default();

    let source_shifts = expand(2025, 2, &services, &regime).unwrap();
    let conflicts = ConflictSets::build(&source_shifts, &regime);
    let source = greedy(&source_shifts, &conflicts, &regime, 0).unwrap();

    let target_shifts = expand(2025, 3, &services, &regime).unwrap();
    let outcome = replicate(&source, &source_shifts, (2025, 2), &target_shifts, &regime).unwrap();

    let mut source_anchors: Vec<_> = source
        .driver_summaries()
        .iter()
        .map(|d| d.work_start)
        .collect();
    source_anchors.sort_unstable();
    let mut target_anchors: Vec<_> = outcome
        .solution
        .driver_summaries()
        .iter()
        .map(|d| d.work_start)
        .collect();
    target_anchors.sort_unstable();
    assert_eq!(source_anchors, target_anchors);
}

#[test]
fn unknown_service_in_target_is_reported_as_gap() {
    let services = fixture_services();
    let regime = Regime::default();

    let source_shifts = expand(2025, 2, &services, &regime).unwrap();
    let conflicts = ConflictSets::build(&source_shifts, &regime);
    let source = greedy(&source_shifts, &conflicts, &regime, 0).unwrap();

    let mut target_services = services.clone();
    target_services.push(ServiceRecord {
        service: "nuevo".to_string(),
        vehicle: None,
        kind: ServiceType::Especial,
        shifts: vec![ShiftSpec {
            date: None,
            frequency: Some(Frequency::Weekends),
            start: "10:00".to_string(),
            duration_hours: 4.0,
            number: 1,
        }],
    });
    let target_shifts = expand(2025, 3, &target_services, &regime).unwrap();
    let outcome = replicate(&source, &source_shifts, (2025, 2), &target_shifts, &regime).unwrap();

    // marzo 2025 tiene 10 días de fin de semana
    assert_eq!(outcome.gaps.len(), 10);
    assert!(outcome
        .gaps
        .iter()
        .all(|sid| target_shifts[sid.index()].service == "nuevo"));

    // lo replicable queda asignado y legal
    let covered = target_shifts.len() - outcome.gaps.len();
    assert_eq!(outcome.solution.assigned_count(), covered);
    assert!(outcome
        .solution
        .violations(&target_shifts, &regime)
        .iter()
        .all(|v| {
            use turnero::ViolationKind;
            v.kind == ViolationKind::Uncovered
        }));
}

fn fixture_services() -> Vec<ServiceRecord> {
    vec![
        ServiceRecord {
            service: "faena-a".to_string(),
            vehicle: Some("BUS-01".to_string()),
            kind: ServiceType::Faena,
            shifts: vec![ShiftSpec {
                date: None,
                frequency: Some(Frequency::Daily),
                start: "06:00".to_string(),
                duration_hours: 8.0,
                number: 1,
            }],
        },
        ServiceRecord {
            service: "faena-b".to_string(),
            vehicle: None,
            kind: ServiceType::Faena,
            shifts: vec![ShiftSpec {
                date: None,
                frequency: Some(Frequency::Daily),
                start: "20:00".to_string(),
                duration_hours: 3.0,
                number: 1,
            }],
        },
    ]
}
