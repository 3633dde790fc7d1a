use crate::config::Regime;
use crate::model::{Shift, ShiftId};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Conjuntos de conflicto por turno: `of(s)` contiene todo turno que no
/// puede compartir conductor con `s`.
///
/// Simétrico, sin el propio turno, inmutable una vez construido. La
/// pertenencia depende sólo de la incompatibilidad temporal bajo el
/// régimen: solape en la misma fecha, brecha <5 h en la misma fecha, o
/// brecha <10 h entre fechas consecutivas. Fechas a dos o más días de
/// distancia nunca entran en conflicto.
#[derive(Debug, Clone)]
pub struct ConflictSets {
    sets: Vec<HashSet<ShiftId>>,
}

impl ConflictSets {
    pub fn build(shifts: &[Shift], regime: &Regime) -> Self {
        debug_assert!(shifts.iter().enumerate().all(|(i, s)| s.id.index() == i));
        let mut sets = vec![HashSet::new(); shifts.len()];
        let buckets = bucket_by_date(shifts);

        for (date, ids) in &buckets {
            // pares dentro de la misma fecha
            for (i, &a) in ids.iter().enumerate() {
                for &b in ids.iter().skip(i + 1) {
                    if incompatible_same_day(&shifts[a.index()], &shifts[b.index()], regime) {
                        sets[a.index()].insert(b);
                        sets[b.index()].insert(a);
                    }
                }
            }
            // pares con la fecha siguiente
            let Some(next) = date.succ_opt() else { continue };
            let Some(next_ids) = buckets.get(&next) else {
                continue;
            };
            for &a in ids {
                for &b in next_ids {
                    if incompatible_adjacent(&shifts[a.index()], &shifts[b.index()], regime) {
                        sets[a.index()].insert(b);
                        sets[b.index()].insert(a);
                    }
                }
            }
        }

        let built = Self { sets };
        tracing::debug!(
            shifts = shifts.len(),
            mean_degree = built.mean_degree(),
            "conflict sets built"
        );
        built
    }

    pub fn of(&self, id: ShiftId) -> &HashSet<ShiftId> {
        &self.sets[id.index()]
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Tamaño promedio de los conjuntos, como diagnóstico de densidad.
    pub fn mean_degree(&self) -> f64 {
        if self.sets.is_empty() {
            return 0.0;
        }
        let total: usize = self.sets.iter().map(HashSet::len).sum();
        total as f64 / self.sets.len() as f64
    }

    /// ¿El conjunto de `id` es disjunto de `assigned`? Itera el lado chico.
    pub fn disjoint_from(&self, id: ShiftId, assigned: &HashSet<ShiftId>) -> bool {
        let set = &self.sets[id.index()];
        if set.len() <= assigned.len() {
            set.iter().all(|s| !assigned.contains(s))
        } else {
            assigned.iter().all(|s| !set.contains(s))
        }
    }
}

/// Turnos agrupados por fecha, en orden calendario.
pub(crate) fn bucket_by_date(shifts: &[Shift]) -> BTreeMap<NaiveDate, Vec<ShiftId>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<ShiftId>> = BTreeMap::new();
    for s in shifts {
        buckets.entry(s.date).or_default().push(s.id);
    }
    buckets
}

fn incompatible_same_day(a: &Shift, b: &Shift, regime: &Regime) -> bool {
    let (a0, a1) = (a.abs_start(), a.abs_end());
    let (b0, b1) = (b.abs_start(), b.abs_end());
    if a0 < b1 && b0 < a1 {
        return true;
    }
    let gap = if a1 <= b0 { b0 - a1 } else { a0 - b1 };
    gap < i64::from(regime.min_same_day_rest)
}

/// `a` es de la fecha D y `b` de la D+1.
fn incompatible_adjacent(a: &Shift, b: &Shift, regime: &Regime) -> bool {
    if b.abs_start() < a.abs_end() {
        return true;
    }
    b.abs_start() - a.abs_end() < i64::from(regime.min_inter_day_rest)
}
