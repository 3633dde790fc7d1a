use crate::config::Regime;
use crate::model::{DriverId, Shift, ShiftId};
use crate::solver::conflicts::ConflictSets;
use crate::solver::greedy::check_dense_ids;
use crate::solver::solution::Solution;
use crate::solver::types::SolveError;
use anyhow::anyhow;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Resultado de una réplica: solución del mes destino más los turnos que
/// no encontraron ranura de origen (el llamador decide re-optimizarlos).
#[derive(Debug)]
pub struct ReplicationOutcome {
    pub solution: Solution,
    pub gaps: Vec<ShiftId>,
}

/// Clave de ranura: (día-en-ciclo, servicio, número de turno, vehículo).
type SlotKey = (i64, String, u32, Option<String>);

/// Proyecta un mes resuelto sobre otro mes por equivalencia de
/// día-en-ciclo módulo 2N, preservando los conductores del origen.
///
/// Los turnos de origen que comparten clave se guardan en orden de fecha y
/// se emparejan posicionalmente (con vuelta) contra las ocurrencias del
/// destino; cuando los meses calzan, esto reproduce la estructura exacta y
/// el mismo número de conductores.
pub fn replicate(
    source: &Solution,
    source_shifts: &[Shift],
    source_month: (i32, u32),
    target_shifts: &[Shift],
    regime: &Regime,
) -> Result<ReplicationOutcome, SolveError> {
    check_dense_ids(source_shifts)?;
    check_dense_ids(target_shifts)?;
    let anchor = month_anchor(source_month)?;
    // ids de conductor densos, pase lo que pase con la solución de entrada
    let source = source.compact();
    let modulus = i64::from(2 * source.cycle());

    // ranura → conductores de origen, en orden de fecha
    let mut slots: HashMap<SlotKey, Vec<(NaiveDate, DriverId)>> = HashMap::new();
    for shift in source_shifts {
        let Some(driver) = source.driver_of(shift.id) else {
            continue;
        };
        slots
            .entry(slot_key(shift, anchor, modulus))
            .or_default()
            .push((shift.date, driver));
    }
    for drivers in slots.values_mut() {
        drivers.sort_unstable();
    }

    let inherited = source
        .active_drivers()
        .map(|st| st.driver().clone())
        .collect();
    let mut solution = Solution::with_drivers(source.cycle(), target_shifts.len(), inherited);
    let conflicts = ConflictSets::build(target_shifts, regime);
    let mut gaps = Vec::new();

    // ocurrencias del destino por ranura, en orden de fecha
    let mut ordered: Vec<ShiftId> = target_shifts.iter().map(|s| s.id).collect();
    ordered.sort_unstable_by_key(|&sid| {
        let s = &target_shifts[sid.index()];
        (s.date, s.start_min, sid)
    });
    let mut taken: HashMap<SlotKey, usize> = HashMap::new();

    for sid in ordered {
        let shift = &target_shifts[sid.index()];
        let key = slot_key(shift, anchor, modulus);
        let Some(source_drivers) = slots.get(&key) else {
            gaps.push(sid);
            continue;
        };
        let position = taken.entry(key).or_insert(0);
        let (_, driver) = source_drivers[*position % source_drivers.len()];
        *position += 1;
        if solution.can_host(driver, shift, &conflicts, regime) {
            solution.assign(shift, driver);
        } else {
            gaps.push(sid);
        }
    }

    if !gaps.is_empty() {
        tracing::warn!(gaps = gaps.len(), "replication left uncovered shifts");
    }
    Ok(ReplicationOutcome { solution, gaps })
}

fn slot_key(shift: &Shift, anchor: NaiveDate, modulus: i64) -> SlotKey {
    let day_in_cycle = shift
        .date
        .signed_duration_since(anchor)
        .num_days()
        .rem_euclid(modulus);
    (
        day_in_cycle,
        shift.service.clone(),
        shift.number,
        shift.vehicle.clone(),
    )
}

fn month_anchor(month: (i32, u32)) -> Result<NaiveDate, SolveError> {
    NaiveDate::from_ymd_opt(month.0, month.1, 1)
        .ok_or_else(|| SolveError::Other(anyhow!("invalid month {}-{:02}", month.0, month.1)))
}
