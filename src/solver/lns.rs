use crate::config::{Regime, SearchParams};
use crate::model::{Shift, ShiftId};
use crate::solver::conflicts::ConflictSets;
use crate::solver::greedy::check_dense_ids;
use crate::solver::solution::Solution;
use crate::solver::types::{CancelToken, RefineStats, SolveError};
use anyhow::anyhow;
use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

const OPERATOR_COUNT: usize = 3;
const REWARD_BEST: f64 = 10.0;
const REWARD_ACCEPTED: f64 = 4.0;
const WEIGHT_SMOOTHING: f64 = 0.1;
const WEIGHT_FLOOR: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    DropDriver,
    DestroyWindow,
    DestroyService,
}

impl Operator {
    const ALL: [Operator; OPERATOR_COUNT] = [
        Operator::DropDriver,
        Operator::DestroyWindow,
        Operator::DestroyService,
    ];
}

/// Resultado de `refine`: la mejor solución encontrada más las estadísticas
/// de la corrida.
#[derive(Debug)]
pub struct RefineOutcome {
    pub solution: Solution,
    pub stats: RefineStats,
}

/// Refinamiento por búsqueda de vecindario grande con selección adaptativa
/// de operadores y aceptación por recocido simulado.
///
/// Toda la aleatoriedad sale de un único stream ChaCha20 sembrado con
/// `params.seed`; con la misma semilla, entradas y corte por estancamiento,
/// dos corridas son idénticas. Un movimiento que queda infactible a medio
/// camino nunca toca `current`: se descarta el clon especulativo.
pub fn refine(
    initial: &Solution,
    shifts: &[Shift],
    conflicts: &ConflictSets,
    regime: &Regime,
    params: &SearchParams,
    cancel: &CancelToken,
) -> Result<RefineOutcome, SolveError> {
    regime.validate()?;
    params.validate()?;
    check_dense_ids(shifts)?;

    let started = Instant::now();
    let budget = Duration::from_secs_f64(params.time_budget_secs);
    let mut engine = Refiner::new(shifts, conflicts, regime, params);

    let mut current = initial.clone();
    let mut best = current.clone();
    let mut best_cost = best.cost();
    let mut iterations = 0u64;
    let mut improvements = 0u64;
    let mut since_improvement = 0u32;
    let mut cancelled = false;

    loop {
        if started.elapsed() >= budget || cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        if since_improvement >= params.stagnation_limit {
            break;
        }
        iterations += 1;

        let op_idx = engine.pick_operator();
        let before = current.cost();
        let mut work = current.clone();
        let completed = engine.apply(Operator::ALL[op_idx], &mut work);

        let mut reward = 0.0;
        let mut improved = false;
        if completed {
            let after = work.cost();
            let delta = f64::from(after.drivers) - f64::from(before.drivers)
                + (after.minutes as f64 - before.minutes as f64) * 1e-9;
            let accepted =
                delta < 0.0 || engine.rng.gen::<f64>() < (-delta / engine.temperature).exp();
            if accepted {
                current = work;
                reward = REWARD_ACCEPTED;
                if current.cost() < best_cost {
                    best = current.clone();
                    best_cost = best.cost();
                    reward = REWARD_BEST;
                    improved = true;
                    tracing::debug!(
                        iteration = iterations,
                        drivers = best_cost.drivers,
                        "new best roster"
                    );
                }
            }
        }
        engine.update_weight(op_idx, reward);
        engine.cool_down();

        if params.consolidation_period > 0
            && iterations % u64::from(params.consolidation_period) == 0
            && engine.consolidate(&mut current)
            && current.cost() < best_cost
        {
            best = current.clone();
            best_cost = best.cost();
            improved = true;
        }

        if improved {
            improvements += 1;
            since_improvement = 0;
        } else {
            since_improvement += 1;
        }
    }

    tracing::info!(
        iterations,
        improvements,
        drivers = best_cost.drivers,
        cancelled,
        "refine finished"
    );
    Ok(RefineOutcome {
        solution: best.compact(),
        stats: RefineStats {
            iterations,
            improvements,
            cancelled,
            operator_weights: engine.weights,
            seed: params.seed,
        },
    })
}

/// Multi-start independiente: una corrida por semilla, cada una con su
/// propia solución; los conjuntos de conflicto se comparten sólo lectura.
/// Gana el menor (conductores, minutos, semilla).
pub fn refine_multi_start(
    initial: &Solution,
    shifts: &[Shift],
    conflicts: &ConflictSets,
    regime: &Regime,
    base: &SearchParams,
    seeds: &[u64],
    cancel: &CancelToken,
) -> Result<RefineOutcome, SolveError> {
    if seeds.is_empty() {
        return refine(initial, shifts, conflicts, regime, base, cancel);
    }
    let outcomes = std::thread::scope(|scope| {
        let handles: Vec<_> = seeds
            .iter()
            .map(|&seed| {
                let params = SearchParams { seed, ..*base };
                scope.spawn(move || refine(initial, shifts, conflicts, regime, &params, cancel))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .map_err(|_| SolveError::Other(anyhow!("refine worker panicked")))?
            })
            .collect::<Result<Vec<_>, SolveError>>()
    })?;

    outcomes
        .into_iter()
        .min_by_key(|o| {
            let cost = o.solution.cost();
            (cost.drivers, cost.minutes, o.stats.seed)
        })
        .ok_or_else(|| SolveError::Other(anyhow!("no refine outcome produced")))
}

struct Refiner<'a> {
    shifts: &'a [Shift],
    conflicts: &'a ConflictSets,
    regime: &'a Regime,
    /// Fechas presentes en el mes, ordenadas.
    dates: Vec<NaiveDate>,
    /// Servicios presentes, ordenados.
    services: Vec<String>,
    rng: ChaCha20Rng,
    weights: [f64; OPERATOR_COUNT],
    temperature: f64,
    cooling: f64,
}

impl<'a> Refiner<'a> {
    fn new(
        shifts: &'a [Shift],
        conflicts: &'a ConflictSets,
        regime: &'a Regime,
        params: &SearchParams,
    ) -> Self {
        let dates: Vec<NaiveDate> = shifts
            .iter()
            .map(|s| s.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let services: Vec<String> = shifts
            .iter()
            .map(|s| s.service.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            shifts,
            conflicts,
            regime,
            dates,
            services,
            rng: ChaCha20Rng::seed_from_u64(params.seed),
            weights: [1.0; OPERATOR_COUNT],
            temperature: params.initial_temperature,
            cooling: params.cooling_rate,
        }
    }

    /// Ruleta sobre los pesos adaptativos.
    fn pick_operator(&mut self) -> usize {
        let total: f64 = self.weights.iter().sum();
        let mut draw = self.rng.gen::<f64>() * total;
        for (idx, w) in self.weights.iter().enumerate() {
            if draw < *w {
                return idx;
            }
            draw -= w;
        }
        OPERATOR_COUNT - 1
    }

    fn update_weight(&mut self, idx: usize, reward: f64) {
        let w = &mut self.weights[idx];
        *w = ((1.0 - WEIGHT_SMOOTHING) * *w + WEIGHT_SMOOTHING * reward).max(WEIGHT_FLOOR);
    }

    fn cool_down(&mut self) {
        self.temperature = (self.temperature * self.cooling).max(1e-6);
    }

    fn apply(&mut self, op: Operator, work: &mut Solution) -> bool {
        match op {
            Operator::DropDriver => self.drop_driver(work),
            Operator::DestroyWindow => self.destroy_window(work),
            Operator::DestroyService => self.destroy_service(work),
        }
    }

    /// Retira al conductor menos cargado y reinserta su carga sin crear
    /// conductores nuevos; sólo cuenta si el total neto baja.
    fn drop_driver(&self, work: &mut Solution) -> bool {
        let Some((_, victim)) = work
            .active_drivers()
            .map(|st| (st.total_minutes(), st.driver().id))
            .min()
        else {
            return false;
        };
        let before = work.driver_count();
        let removed = work.retire_driver(victim, self.shifts);
        for sid in self.by_difficulty(removed) {
            if !self.repair(work, sid, false) {
                return false;
            }
        }
        work.driver_count() < before
    }

    /// Disuelve las asignaciones de una ventana de 3–4 días y las repara.
    fn destroy_window(&mut self, work: &mut Solution) -> bool {
        if self.dates.is_empty() {
            return false;
        }
        let len = self.rng.gen_range(3..=4).min(self.dates.len());
        let start = self.rng.gen_range(0..=self.dates.len() - len);
        let window = &self.dates[start..start + len];
        let removed = remove_matching(work, self.shifts, |s| window.contains(&s.date));
        if removed.is_empty() {
            return false;
        }
        self.reinsert_all(work, removed)
    }

    /// Disuelve las asignaciones de un servicio completo y las repara.
    fn destroy_service(&mut self, work: &mut Solution) -> bool {
        if self.services.is_empty() {
            return false;
        }
        let service = &self.services[self.rng.gen_range(0..self.services.len())];
        let removed = remove_matching(work, self.shifts, |s| &s.service == service);
        if removed.is_empty() {
            return false;
        }
        self.reinsert_all(work, removed)
    }

    fn reinsert_all(&self, work: &mut Solution, removed: Vec<ShiftId>) -> bool {
        for sid in self.by_difficulty(removed) {
            if !self.repair(work, sid, true) {
                return false;
            }
        }
        true
    }

    /// Más difícil primero: mayor duración, luego mayor grado de conflicto.
    fn by_difficulty(&self, mut ids: Vec<ShiftId>) -> Vec<ShiftId> {
        ids.sort_by_key(|&sid| {
            let shift = &self.shifts[sid.index()];
            (
                std::cmp::Reverse(shift.duration_min),
                std::cmp::Reverse(self.conflicts.of(sid).len()),
                sid,
            )
        });
        ids
    }

    /// Reinserción determinista: conductores en orden de id; si ninguno
    /// acepta y se permite, nace un conductor anclado en la fecha del turno.
    fn repair(&self, work: &mut Solution, sid: ShiftId, allow_spawn: bool) -> bool {
        let shift = &self.shifts[sid.index()];
        let found = work
            .driver_ids()
            .find(|&d| work.can_host(d, shift, self.conflicts, self.regime));
        if let Some(driver) = found {
            work.assign(shift, driver);
            return true;
        }
        if !allow_spawn {
            return false;
        }
        let driver = work.spawn_driver(shift.date);
        if !work.can_host(driver, shift, self.conflicts, self.regime) {
            return false;
        }
        work.assign(shift, driver);
        true
    }

    /// Consolidación golosa sobre la solución corriente: retira conductores
    /// poco cargados mientras el retiro sea una mejora estricta.
    fn consolidate(&self, current: &mut Solution) -> bool {
        let mut improved = false;
        loop {
            let mut work = current.clone();
            if self.drop_driver(&mut work) {
                *current = work;
                improved = true;
            } else {
                break;
            }
        }
        improved
    }
}

fn remove_matching(
    work: &mut Solution,
    shifts: &[Shift],
    keep_out: impl Fn(&Shift) -> bool,
) -> Vec<ShiftId> {
    let mut removed = Vec::new();
    for shift in shifts {
        if work.driver_of(shift.id).is_some() && keep_out(shift) {
            work.unassign(shift);
            removed.push(shift.id);
        }
    }
    removed
}
