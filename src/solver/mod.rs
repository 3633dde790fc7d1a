mod bitset;
mod conflicts;
mod greedy;
mod lns;
mod replicate;
mod solution;
mod types;

pub use bitset::DayBits;
pub use conflicts::ConflictSets;
pub use greedy::greedy;
pub use lns::{refine, refine_multi_start, RefineOutcome};
pub use replicate::{replicate, ReplicationOutcome};
pub use solution::{
    audit, AssignmentRecord, AssignmentView, Cost, DriverState, DriverSummary, Kpis, Solution,
    SolutionSnapshot,
};
pub use types::{CancelToken, RefineStats, SolveError, Violation, ViolationKind};

use crate::config::{Regime, SearchParams};
use crate::model::Shift;

/// Pipeline completo de un mes: conflictos, constructor goloso y
/// refinamiento LNS bajo presupuesto.
pub fn solve_month(
    shifts: &[Shift],
    regime: &Regime,
    params: &SearchParams,
    cancel: &CancelToken,
) -> Result<RefineOutcome, SolveError> {
    regime.validate()?;
    let conflicts = ConflictSets::build(shifts, regime);
    let initial = greedy(shifts, &conflicts, regime, params.seed)?;
    refine(&initial, shifts, &conflicts, regime, params, cancel)
}

/// Cota inferior diagnóstica de flota: minutos totales contra lo máximo
/// que un conductor puede rendir en las mitades de trabajo del mes. No es
/// una restricción, sólo una referencia para leer los KPIs.
pub fn fleet_lower_bound(shifts: &[Shift], regime: &Regime) -> u32 {
    if shifts.is_empty() {
        return 0;
    }
    let total: u64 = shifts.iter().map(|s| u64::from(s.duration_min)).sum();
    let span_days = conflicts::bucket_by_date(shifts).len() as u64;
    let work_days = (span_days / 2).max(1);
    let capacity = u64::from(regime.max_daily_minutes) * work_days;
    total.div_ceil(capacity) as u32
}
