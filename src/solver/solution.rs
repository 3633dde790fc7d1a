use crate::config::Regime;
use crate::model::{Driver, DriverId, Shift, ShiftId, MINUTES_PER_DAY};
use crate::solver::bitset::DayBits;
use crate::solver::conflicts::ConflictSets;
use crate::solver::types::{Violation, ViolationKind};
use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Estado cacheado de un conductor dentro de una solución.
///
/// Las asignaciones (`Solution::assigned`) son la fuente de verdad; todo lo
/// de aquí se reconstruye desde ellas.
#[derive(Debug, Clone)]
pub struct DriverState {
    driver: Driver,
    retired: bool,
    shift_ids: HashSet<ShiftId>,
    days: HashMap<NaiveDate, DayBits>,
    day_minutes: HashMap<NaiveDate, u32>,
    total_minutes: u64,
}

impl DriverState {
    fn new(driver: Driver) -> Self {
        Self {
            driver,
            retired: false,
            shift_ids: HashSet::new(),
            days: HashMap::new(),
            day_minutes: HashMap::new(),
            total_minutes: 0,
        }
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }
    pub fn is_retired(&self) -> bool {
        self.retired
    }
    pub fn shift_ids(&self) -> &HashSet<ShiftId> {
        &self.shift_ids
    }
    pub fn total_minutes(&self) -> u64 {
        self.total_minutes
    }
    /// Fechas con al menos un turno asignado (por fecha de inicio).
    pub fn days_worked(&self) -> u32 {
        self.day_minutes.len() as u32
    }
    pub fn minutes_on(&self, date: NaiveDate) -> u32 {
        self.day_minutes.get(&date).copied().unwrap_or(0)
    }
}

/// Costo lexicográfico: primero conductores activos, luego minutos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cost {
    pub drivers: u32,
    pub minutes: u64,
}

/// KPIs de nivel solución.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Kpis {
    pub drivers: u32,
    pub coverage: f64,
    pub total_minutes: u64,
}

/// Resumen por conductor para el contrato de salida.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverSummary {
    pub id: DriverId,
    pub cycle: u32,
    pub work_start: NaiveDate,
    pub total_minutes: u64,
    pub total_shifts: u32,
    pub days_worked: u32,
}

/// Vista plana de una asignación.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentView {
    pub driver: DriverId,
    pub cycle: u32,
    pub shift: ShiftId,
    pub date: NaiveDate,
    pub start_min: u32,
    pub end_min: u32,
    pub duration_min: u32,
}

/// Forma persistible de una solución: conductores + pares de asignación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSnapshot {
    pub cycle: u32,
    pub shift_count: u32,
    pub drivers: Vec<Driver>,
    pub assignments: Vec<AssignmentRecord>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub driver: u32,
    pub shift: u32,
}

impl SolutionSnapshot {
    /// Coherencia estructural: ciclo soportado, ids de conductor densos,
    /// registros dentro de rango y ningún turno asignado dos veces.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.cycle, 7 | 10 | 14) {
            bail!("unsupported cycle length {}", self.cycle);
        }
        for (idx, d) in self.drivers.iter().enumerate() {
            if d.id.index() != idx {
                bail!("driver ids are not dense (position {idx})");
            }
        }
        let mut seen = vec![false; self.shift_count as usize];
        for rec in &self.assignments {
            if rec.driver as usize >= self.drivers.len() {
                bail!("assignment references unknown driver {}", rec.driver);
            }
            match seen.get_mut(rec.shift as usize) {
                None => bail!("assignment references unknown shift {}", rec.shift),
                Some(slot) if *slot => bail!("shift {} assigned twice", rec.shift),
                Some(slot) => *slot = true,
            }
        }
        Ok(())
    }
}

/// Roster en construcción: conductores sintéticos más el vector de
/// asignaciones turno → conductor.
///
/// `clone()` es la copia profunda para movimientos especulativos; deshacer
/// un movimiento es descartar el clon.
#[derive(Debug, Clone)]
pub struct Solution {
    cycle: u32,
    drivers: Vec<DriverState>,
    assigned: Vec<Option<DriverId>>,
}

impl Solution {
    pub fn new(cycle: u32, shift_count: usize) -> Self {
        Self {
            cycle,
            drivers: Vec::new(),
            assigned: vec![None; shift_count],
        }
    }

    /// Solución vacía que hereda conductores ya existentes (réplica anual).
    pub fn with_drivers(cycle: u32, shift_count: usize, drivers: Vec<Driver>) -> Self {
        let drivers = drivers.into_iter().map(DriverState::new).collect();
        Self {
            cycle,
            drivers,
            assigned: vec![None; shift_count],
        }
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn shift_count(&self) -> usize {
        self.assigned.len()
    }

    pub fn spawn_driver(&mut self, work_start: NaiveDate) -> DriverId {
        let id = DriverId::new(self.drivers.len() as u32);
        self.drivers
            .push(DriverState::new(Driver::new(id, self.cycle, work_start)));
        id
    }

    pub fn driver_state(&self, id: DriverId) -> &DriverState {
        &self.drivers[id.index()]
    }

    /// Ids de todos los conductores creados, en orden de creación.
    pub fn driver_ids(&self) -> impl Iterator<Item = DriverId> + '_ {
        (0..self.drivers.len() as u32).map(DriverId::new)
    }

    pub fn driver_states(&self) -> impl Iterator<Item = &DriverState> {
        self.drivers.iter()
    }

    /// Conductores vivos con al menos un turno.
    pub fn active_drivers(&self) -> impl Iterator<Item = &DriverState> {
        self.drivers
            .iter()
            .filter(|d| !d.retired && !d.shift_ids.is_empty())
    }

    pub fn driver_of(&self, shift: ShiftId) -> Option<DriverId> {
        self.assigned[shift.index()]
    }

    pub fn driver_count(&self) -> u32 {
        self.active_drivers().count() as u32
    }

    pub fn total_minutes(&self) -> u64 {
        self.drivers.iter().map(|d| d.total_minutes).sum()
    }

    pub fn cost(&self) -> Cost {
        Cost {
            drivers: self.driver_count(),
            minutes: self.total_minutes(),
        }
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned.iter().filter(|a| a.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.assigned.iter().all(|a| a.is_some())
    }

    /// ¿Puede `driver` recibir `shift` sin romper ninguna regla?
    ///
    /// Orden de descarte: día de descanso, intersección con el conjunto de
    /// conflicto, tope diario, y recién ahí las consultas de bitset.
    pub fn can_host(
        &self,
        driver: DriverId,
        shift: &Shift,
        conflicts: &ConflictSets,
        regime: &Regime,
    ) -> bool {
        let st = &self.drivers[driver.index()];
        if st.retired || !st.driver.is_work_day(shift.date) {
            return false;
        }
        if !conflicts.disjoint_from(shift.id, &st.shift_ids) {
            return false;
        }
        if st.minutes_on(shift.date) + shift.duration_min > regime.max_daily_minutes {
            return false;
        }
        // solape + ventana de descanso intradía, por segmento calendario
        for (date, s, e) in shift.day_segments() {
            if let Some(bits) = st.days.get(&date) {
                let lo = s.saturating_sub(regime.min_same_day_rest);
                let hi = (e + regime.min_same_day_rest).min(MINUTES_PER_DAY);
                if bits.any_in(lo, hi) {
                    return false;
                }
            }
        }
        // descanso contra el último minuto del día anterior
        if let Some(prev) = shift.date.pred_opt() {
            if let Some(last) = st.days.get(&prev).and_then(DayBits::last_set) {
                let gap = i64::from(MINUTES_PER_DAY - (last + 1)) + i64::from(shift.start_min);
                if gap < i64::from(regime.min_inter_day_rest) {
                    return false;
                }
            }
        }
        // y contra el primer minuto del día siguiente
        if let Some(next) = shift.date.succ_opt() {
            if let Some(first) = st.days.get(&next).and_then(DayBits::first_set) {
                let gap =
                    i64::from(MINUTES_PER_DAY) - i64::from(shift.end_min()) + i64::from(first);
                if gap < i64::from(regime.min_inter_day_rest) {
                    return false;
                }
            }
        }
        true
    }

    /// Registra la asignación. La factibilidad es responsabilidad del
    /// llamador (`can_host`); aquí sólo se mantiene la contabilidad.
    pub fn assign(&mut self, shift: &Shift, driver: DriverId) {
        debug_assert!(self.assigned[shift.id.index()].is_none());
        let st = &mut self.drivers[driver.index()];
        debug_assert!(!st.retired);
        for (date, s, e) in shift.day_segments() {
            st.days.entry(date).or_default().set_range(s, e);
        }
        *st.day_minutes.entry(shift.date).or_insert(0) += shift.duration_min;
        st.total_minutes += u64::from(shift.duration_min);
        st.shift_ids.insert(shift.id);
        self.assigned[shift.id.index()] = Some(driver);
    }

    pub fn unassign(&mut self, shift: &Shift) -> Option<DriverId> {
        let holder = self.assigned[shift.id.index()].take()?;
        let st = &mut self.drivers[holder.index()];
        for (date, s, e) in shift.day_segments() {
            if let Some(bits) = st.days.get_mut(&date) {
                bits.clear_range(s, e);
                if bits.is_empty() {
                    st.days.remove(&date);
                }
            }
        }
        if let Some(m) = st.day_minutes.get_mut(&shift.date) {
            *m -= shift.duration_min;
            if *m == 0 {
                st.day_minutes.remove(&shift.date);
            }
        }
        st.total_minutes -= u64::from(shift.duration_min);
        st.shift_ids.remove(&shift.id);
        Some(holder)
    }

    /// Vacía un conductor y lo marca retirado. Devuelve sus turnos, en el
    /// orden denso de ids.
    pub fn retire_driver(&mut self, driver: DriverId, shifts: &[Shift]) -> Vec<ShiftId> {
        let mut ids: Vec<ShiftId> = self.drivers[driver.index()].shift_ids.iter().copied().collect();
        ids.sort_unstable();
        for &sid in &ids {
            self.unassign(&shifts[sid.index()]);
        }
        self.drivers[driver.index()].retired = true;
        ids
    }

    /// Limpieza final: descarta conductores vacíos/retirados y renumera.
    pub fn compact(&self) -> Solution {
        let mut drivers = Vec::new();
        let mut remap: HashMap<DriverId, DriverId> = HashMap::new();
        for st in &self.drivers {
            if st.shift_ids.is_empty() {
                continue;
            }
            let new_id = DriverId::new(drivers.len() as u32);
            remap.insert(st.driver.id, new_id);
            let mut kept = st.clone();
            kept.driver.id = new_id;
            kept.retired = false;
            drivers.push(kept);
        }
        let assigned = self
            .assigned
            .iter()
            .map(|slot| slot.map(|d| remap[&d]))
            .collect();
        Solution {
            cycle: self.cycle,
            drivers,
            assigned,
        }
    }

    pub fn snapshot(&self) -> SolutionSnapshot {
        let compacted = self.compact();
        let mut assignments = Vec::with_capacity(compacted.assigned_count());
        for (idx, slot) in compacted.assigned.iter().enumerate() {
            if let Some(driver) = slot {
                assignments.push(AssignmentRecord {
                    driver: driver.as_u32(),
                    shift: idx as u32,
                });
            }
        }
        SolutionSnapshot {
            cycle: compacted.cycle,
            shift_count: compacted.assigned.len() as u32,
            drivers: compacted.drivers.iter().map(|d| d.driver.clone()).collect(),
            assignments,
        }
    }

    /// Reconstruye una solución (y todas sus cachés) desde un snapshot.
    pub fn restore(snapshot: &SolutionSnapshot, shifts: &[Shift]) -> Result<Solution> {
        snapshot.validate()?;
        if snapshot.shift_count as usize != shifts.len() {
            bail!(
                "snapshot covers {} shifts but {} were provided",
                snapshot.shift_count,
                shifts.len()
            );
        }
        let mut solution =
            Solution::with_drivers(snapshot.cycle, shifts.len(), snapshot.drivers.clone());
        for rec in &snapshot.assignments {
            solution.assign(&shifts[rec.shift as usize], DriverId::new(rec.driver));
        }
        Ok(solution)
    }

    pub fn kpis(&self) -> Kpis {
        let total = self.assigned.len();
        let covered = self.assigned_count();
        Kpis {
            drivers: self.driver_count(),
            coverage: if total == 0 {
                1.0
            } else {
                covered as f64 / total as f64
            },
            total_minutes: self.total_minutes(),
        }
    }

    pub fn driver_summaries(&self) -> Vec<DriverSummary> {
        self.active_drivers()
            .map(|st| DriverSummary {
                id: st.driver.id,
                cycle: st.driver.cycle,
                work_start: st.driver.work_start,
                total_minutes: st.total_minutes,
                total_shifts: st.shift_ids.len() as u32,
                days_worked: st.days_worked(),
            })
            .collect()
    }

    pub fn assignment_views(&self, shifts: &[Shift]) -> Vec<AssignmentView> {
        let mut views: Vec<AssignmentView> = self
            .assigned
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let driver = (*slot)?;
                let shift = &shifts[idx];
                Some(AssignmentView {
                    driver,
                    cycle: self.drivers[driver.index()].driver.cycle,
                    shift: shift.id,
                    date: shift.date,
                    start_min: shift.start_min,
                    end_min: shift.end_min(),
                    duration_min: shift.duration_min,
                })
            })
            .collect();
        views.sort_by_key(|v| (v.date, v.start_min, v.shift));
        views
    }

    /// Auditoría independiente contra el listado crudo de turnos.
    pub fn violations(&self, shifts: &[Shift], regime: &Regime) -> Vec<Violation> {
        let pairs: Vec<(DriverId, ShiftId)> = self
            .assigned
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.map(|d| (d, ShiftId::new(idx as u32))))
            .collect();
        let drivers: Vec<Driver> = self.drivers.iter().map(|d| d.driver.clone()).collect();
        audit(&pairs, &drivers, shifts, regime)
    }
}

/// Re-validación completa desde datos crudos: cobertura, doble cobertura,
/// legalidad de ciclo, tope diario, descansos y solapes.
pub fn audit(
    pairs: &[(DriverId, ShiftId)],
    drivers: &[Driver],
    shifts: &[Shift],
    regime: &Regime,
) -> Vec<Violation> {
    let mut out = Vec::new();
    let by_id: HashMap<DriverId, &Driver> = drivers.iter().map(|d| (d.id, d)).collect();

    let mut cover = vec![0u32; shifts.len()];
    let mut per_driver: HashMap<DriverId, Vec<ShiftId>> = HashMap::new();
    for &(driver, shift) in pairs {
        cover[shift.index()] += 1;
        per_driver.entry(driver).or_default().push(shift);
    }
    for (idx, count) in cover.iter().enumerate() {
        let kind = match count {
            0 => ViolationKind::Uncovered,
            1 => continue,
            _ => ViolationKind::DoubleCover,
        };
        out.push(Violation {
            driver: None,
            shift_a: ShiftId::new(idx as u32),
            shift_b: None,
            kind,
        });
    }

    let mut driver_ids: Vec<DriverId> = per_driver.keys().copied().collect();
    driver_ids.sort_unstable();
    for driver_id in driver_ids {
        let Some(driver) = by_id.get(&driver_id) else {
            continue;
        };
        let mut ids = per_driver.remove(&driver_id).unwrap_or_default();
        ids.sort_unstable_by_key(|id| (shifts[id.index()].abs_start(), *id));

        let mut daily: HashMap<NaiveDate, u32> = HashMap::new();
        for &sid in &ids {
            let shift = &shifts[sid.index()];
            if !driver.is_work_day(shift.date) {
                out.push(Violation {
                    driver: Some(driver_id),
                    shift_a: sid,
                    shift_b: None,
                    kind: ViolationKind::RestDayWork,
                });
            }
            *daily.entry(shift.date).or_insert(0) += shift.duration_min;
        }
        for (_, minutes) in daily {
            if minutes > regime.max_daily_minutes {
                out.push(Violation {
                    driver: Some(driver_id),
                    shift_a: ids[0],
                    shift_b: None,
                    kind: ViolationKind::DailyCap,
                });
            }
        }

        for (i, &a) in ids.iter().enumerate() {
            for &b in ids.iter().skip(i + 1) {
                let sa = &shifts[a.index()];
                let sb = &shifts[b.index()];
                let day_delta = sb
                    .date
                    .signed_duration_since(sa.date)
                    .num_days()
                    .unsigned_abs();
                if day_delta >= 2 {
                    continue;
                }
                let kind = if sa.abs_start() < sb.abs_end() && sb.abs_start() < sa.abs_end() {
                    Some(ViolationKind::Overlap)
                } else {
                    let gap = gap_between(sa, sb);
                    if day_delta == 0 && gap < i64::from(regime.min_same_day_rest) {
                        Some(ViolationKind::SameDayRest)
                    } else if day_delta == 1 && gap < i64::from(regime.min_inter_day_rest) {
                        Some(ViolationKind::InterDayRest)
                    } else {
                        None
                    }
                };
                if let Some(kind) = kind {
                    out.push(Violation {
                        driver: Some(driver_id),
                        shift_a: a,
                        shift_b: Some(b),
                        kind,
                    });
                }
            }
        }
    }
    out
}

fn gap_between(a: &Shift, b: &Shift) -> i64 {
    if a.abs_end() <= b.abs_start() {
        b.abs_start() - a.abs_end()
    } else {
        a.abs_start() - b.abs_end()
    }
}
