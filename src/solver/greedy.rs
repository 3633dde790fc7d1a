use crate::config::Regime;
use crate::model::{Shift, ShiftId};
use crate::solver::conflicts::{bucket_by_date, ConflictSets};
use crate::solver::solution::Solution;
use crate::solver::types::SolveError;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Constructor goloso: recorre los días del mes en orden, y cada turno va
/// al primer conductor factible en orden de creación; si ninguno puede, se
/// crea un conductor cuyo ciclo parte ese mismo día.
///
/// Determinista para una semilla dada; la semilla sólo baraja los empates
/// de hora de inicio, lo que da puntos de partida distintos al multi-start.
pub fn greedy(
    shifts: &[Shift],
    conflicts: &ConflictSets,
    regime: &Regime,
    seed: u64,
) -> Result<Solution, SolveError> {
    check_dense_ids(shifts)?;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut solution = Solution::new(regime.cycle, shifts.len());

    for (_, ids) in bucket_by_date(shifts) {
        let ordered = order_for_day(ids, shifts, &mut rng);
        for sid in ordered {
            let shift = &shifts[sid.index()];
            let host = solution
                .driver_ids()
                .find(|&d| solution.can_host(d, shift, conflicts, regime));
            match host {
                Some(driver) => solution.assign(shift, driver),
                None => {
                    let driver = solution.spawn_driver(shift.date);
                    if !solution.can_host(driver, shift, conflicts, regime) {
                        return Err(SolveError::UnreachableShift(sid));
                    }
                    solution.assign(shift, driver);
                }
            }
        }
    }

    tracing::info!(
        drivers = solution.driver_count(),
        shifts = shifts.len(),
        "greedy roster built"
    );
    Ok(solution)
}

/// Orden del día: hora de inicio ascendente, empates barajados por la
/// semilla, id como último desempate estable.
fn order_for_day(mut ids: Vec<ShiftId>, shifts: &[Shift], rng: &mut ChaCha20Rng) -> Vec<ShiftId> {
    ids.sort_unstable();
    ids.shuffle(rng);
    ids.sort_by_key(|id| shifts[id.index()].start_min);
    ids
}

pub(crate) fn check_dense_ids(shifts: &[Shift]) -> Result<(), SolveError> {
    for (idx, s) in shifts.iter().enumerate() {
        if s.id.index() != idx {
            return Err(SolveError::NonDenseIds {
                expected: idx as u32,
                found: s.id.as_u32(),
            });
        }
    }
    Ok(())
}
