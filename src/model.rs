use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Minutos por día calendario.
pub const MINUTES_PER_DAY: u32 = 1440;

/// Identificador denso para Shift (igual a su índice en el listado expandido).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShiftId(u32);

impl ShiftId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }
    pub fn index(self) -> usize {
        self.0 as usize
    }
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Identificador denso para Driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriverId(u32);

impl DriverId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }
    pub fn index(self) -> usize {
        self.0 as usize
    }
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Tipo de servicio de origen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    Faena,
    Urbano,
    Especial,
}

impl ServiceType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "faena" => Some(Self::Faena),
            "urbano" | "urban" => Some(Self::Urbano),
            "especial" | "special" => Some(Self::Especial),
            _ => None,
        }
    }
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Faena => "faena",
            Self::Urbano => "urbano",
            Self::Especial => "especial",
        }
    }
}

/// Turno fechado, con resolución de minutos.
///
/// `end_min` puede superar 1440 cuando el turno cruza medianoche; el turno
/// sigue perteneciendo a su fecha de inicio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub service: String,
    pub number: u32,
    pub vehicle: Option<String>,
    pub kind: ServiceType,
    pub date: NaiveDate,
    pub start_min: u32,
    pub duration_min: u32,
}

impl Shift {
    /// Minuto de término relativo a la fecha de inicio (puede exceder 1440).
    pub fn end_min(&self) -> u32 {
        self.start_min + self.duration_min
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end_min() > MINUTES_PER_DAY
    }

    /// Inicio en minutos absolutos desde el día 0 del calendario común.
    pub fn abs_start(&self) -> i64 {
        day_number(self.date) * i64::from(MINUTES_PER_DAY) + i64::from(self.start_min)
    }

    pub fn abs_end(&self) -> i64 {
        self.abs_start() + i64::from(self.duration_min)
    }

    /// Segmentos de ocupación por fecha calendario: (fecha, desde, hasta).
    pub fn day_segments(&self) -> Vec<(NaiveDate, u32, u32)> {
        let end = self.end_min();
        if end <= MINUTES_PER_DAY {
            vec![(self.date, self.start_min, end)]
        } else {
            let mut out = vec![(self.date, self.start_min, MINUTES_PER_DAY)];
            if let Some(next) = self.date.succ_opt() {
                out.push((next, 0, end - MINUTES_PER_DAY));
            }
            out
        }
    }
}

/// Conductor sintético con ciclo NxN anclado en `work_start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub cycle: u32,
    pub work_start: NaiveDate,
}

impl Driver {
    pub fn new(id: DriverId, cycle: u32, work_start: NaiveDate) -> Self {
        Self {
            id,
            cycle,
            work_start,
        }
    }

    /// Día dentro del ciclo 2N: [0, N) trabaja, [N, 2N) descansa.
    pub fn day_in_cycle(&self, date: NaiveDate) -> i64 {
        let delta = date.signed_duration_since(self.work_start).num_days();
        delta.rem_euclid(i64::from(2 * self.cycle))
    }

    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        self.day_in_cycle(date) < i64::from(self.cycle)
    }
}

/// Número de día absoluto para aritmética de calendario.
pub(crate) fn day_number(date: NaiveDate) -> i64 {
    use chrono::Datelike;
    i64::from(date.num_days_from_ce())
}
