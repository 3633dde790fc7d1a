use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Reglas del régimen laboral (faena minera por defecto).
///
/// Valor inmutable que viaja por todo el grafo de llamadas; ningún módulo
/// guarda constantes de régimen propias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regime {
    /// Largo N del ciclo NxN (7, 10 o 14).
    pub cycle: u32,
    /// Tope de minutos conducidos por fecha calendario.
    pub max_daily_minutes: u32,
    /// Descanso mínimo entre turnos de una misma fecha.
    pub min_same_day_rest: u32,
    /// Descanso mínimo entre turnos de fechas consecutivas.
    pub min_inter_day_rest: u32,
}

impl Default for Regime {
    fn default() -> Self {
        Self {
            cycle: 7,
            max_daily_minutes: 14 * 60,
            min_same_day_rest: 5 * 60,
            min_inter_day_rest: 10 * 60,
        }
    }
}

impl Regime {
    pub fn with_cycle(cycle: u32) -> Self {
        Self {
            cycle,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.cycle, 7 | 10 | 14) {
            bail!("unsupported cycle length {} (expected 7, 10 or 14)", self.cycle);
        }
        if self.max_daily_minutes == 0 || self.max_daily_minutes > 1440 {
            bail!("max_daily_minutes must be in (0, 1440]");
        }
        Ok(())
    }
}

/// Parámetros de la búsqueda LNS + recocido simulado.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Presupuesto de reloj de pared, en segundos.
    pub time_budget_secs: f64,
    pub initial_temperature: f64,
    /// Factor multiplicativo de enfriamiento, en (0, 1).
    pub cooling_rate: f64,
    /// Cada cuántas iteraciones corre la consolidación golosa.
    pub consolidation_period: u32,
    /// Iteraciones sin mejora antes de cortar.
    pub stagnation_limit: u32,
    pub seed: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            time_budget_secs: 600.0,
            initial_temperature: 100.0,
            cooling_rate: 0.95,
            consolidation_period: 50,
            stagnation_limit: 1000,
            seed: 0,
        }
    }
}

impl SearchParams {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            bail!("cooling_rate must lie in (0, 1)");
        }
        if self.initial_temperature <= 0.0 {
            bail!("initial_temperature must be positive");
        }
        if self.time_budget_secs < 0.0 {
            bail!("time_budget_secs cannot be negative");
        }
        Ok(())
    }
}
