use crate::config::Regime;
use crate::model::{ServiceType, Shift, ShiftId};
use crate::solver::SolveError;
use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Registro de servicio entregado por el lector aguas arriba.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service: String,
    #[serde(default)]
    pub vehicle: Option<String>,
    pub kind: ServiceType,
    pub shifts: Vec<ShiftSpec>,
}

/// Especificación de turno: plantilla (frecuencia semanal, sin fecha) o
/// turno ya fechado. Una misma carga no puede mezclar ambas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftSpec {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    /// Hora de inicio, HH:MM de 24 horas.
    pub start: String,
    /// Duración en horas (fracciones permitidas).
    pub duration_hours: f64,
    pub number: u32,
}

/// Frecuencia semanal de una plantilla. Los días se guardan como números
/// ISO 1..=7 (lunes=1), igual que las planillas de origen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekdays,
    Weekends,
    Days(Vec<u8>),
}

impl Frequency {
    pub fn matches(&self, date: NaiveDate) -> bool {
        let day = date.weekday().number_from_monday() as u8;
        match self {
            Frequency::Daily => true,
            Frequency::Weekdays => day <= 5,
            Frequency::Weekends => day >= 6,
            Frequency::Days(days) => days.contains(&day),
        }
    }

    /// Acepta `daily`, `mon-fri`, `sat-sun` o una lista separada por comas
    /// de días (`mon`, `lu`, `1`, ...).
    pub fn parse(raw: &str) -> Result<Self> {
        let norm = raw.trim().to_ascii_lowercase();
        match norm.as_str() {
            "daily" | "diario" => return Ok(Self::Daily),
            "mon-fri" | "lu-vi" | "weekdays" => return Ok(Self::Weekdays),
            "sat-sun" | "sa-do" | "weekends" => return Ok(Self::Weekends),
            _ => {}
        }
        let mut days = Vec::new();
        for token in norm.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            days.push(parse_day_token(token)?);
        }
        if days.is_empty() {
            bail!("empty frequency: {raw:?}");
        }
        days.sort_unstable();
        days.dedup();
        Ok(Self::Days(days))
    }
}

fn parse_day_token(token: &str) -> Result<u8> {
    let day = match token {
        "1" | "mon" | "lu" | "lun" => 1,
        "2" | "tue" | "ma" | "mar" => 2,
        "3" | "wed" | "mi" | "mie" => 3,
        "4" | "thu" | "ju" | "jue" => 4,
        "5" | "fri" | "vi" | "vie" => 5,
        "6" | "sat" | "sa" | "sab" => 6,
        "7" | "sun" | "do" | "dom" => 7,
        _ => bail!("unknown weekday token: {token:?}"),
    };
    Ok(day)
}

/// Modo de expansión, decidido una sola vez en la frontera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandMode {
    Template,
    Dated,
}

/// Clasifica la carga por la primera especificación del primer registro y
/// exige que todas las demás sean del mismo tipo.
pub fn detect_mode(services: &[ServiceRecord]) -> Result<ExpandMode, SolveError> {
    let first = services
        .iter()
        .flat_map(|r| r.shifts.iter())
        .next()
        .ok_or_else(|| SolveError::Other(anyhow!("no shift specifications supplied")))?;
    let mode = if first.date.is_some() {
        ExpandMode::Dated
    } else {
        ExpandMode::Template
    };
    let uniform = services
        .iter()
        .flat_map(|r| r.shifts.iter())
        .all(|spec| spec.date.is_some() == (mode == ExpandMode::Dated));
    if !uniform {
        return Err(SolveError::MixedShiftKinds);
    }
    Ok(mode)
}

/// Expande los registros de servicio al listado plano de turnos fechados
/// del mes objetivo.
///
/// En modo plantilla se enumera cada fecha del mes y se emite una
/// instancia por frecuencia coincidente. En modo fechado los turnos pasan
/// tal cual, filtrados al mes objetivo; nunca se vuelven a expandir, los
/// componentes aguas abajo asumen la lista ya fijada a fechas.
pub fn expand(
    year: i32,
    month: u32,
    services: &[ServiceRecord],
    regime: &Regime,
) -> Result<Vec<Shift>, SolveError> {
    let mode = detect_mode(services)?;
    let dates = month_dates(year, month)
        .ok_or_else(|| SolveError::Other(anyhow!("invalid month {year}-{month:02}")))?;
    let mut out = Vec::new();

    match mode {
        ExpandMode::Template => {
            for &date in &dates {
                for record in services {
                    for spec in &record.shifts {
                        let applies = match &spec.frequency {
                            Some(freq) => freq.matches(date),
                            None => true,
                        };
                        if applies {
                            out.push(materialize(record, spec, date, out.len(), regime)?);
                        }
                    }
                }
            }
        }
        ExpandMode::Dated => {
            for record in services {
                for spec in &record.shifts {
                    let date = spec.date.ok_or(SolveError::MixedShiftKinds)?;
                    if date.year() != year || date.month() != month {
                        continue;
                    }
                    out.push(materialize(record, spec, date, out.len(), regime)?);
                }
            }
            out.sort_by(|a, b| {
                (a.date, a.start_min, &a.service, a.number)
                    .cmp(&(b.date, b.start_min, &b.service, b.number))
            });
            // re-numerar tras el orden canónico
            for (idx, shift) in out.iter_mut().enumerate() {
                shift.id = ShiftId::new(idx as u32);
            }
        }
    }

    tracing::debug!(
        year,
        month,
        mode = ?mode,
        shifts = out.len(),
        "service records expanded"
    );
    Ok(out)
}

fn materialize(
    record: &ServiceRecord,
    spec: &ShiftSpec,
    date: NaiveDate,
    index: usize,
    regime: &Regime,
) -> Result<Shift, SolveError> {
    let invalid = |reason: &'static str| SolveError::InvalidShift {
        service: record.service.clone(),
        number: spec.number,
        date,
        reason,
    };
    let start_min = parse_hhmm(&spec.start).ok_or_else(|| invalid("malformed start time"))?;
    if !(spec.duration_hours > 0.0) {
        return Err(invalid("duration must be positive"));
    }
    let duration_min = (spec.duration_hours * 60.0).round() as u32;
    if duration_min == 0 {
        return Err(invalid("duration rounds to zero minutes"));
    }
    if duration_min > regime.max_daily_minutes {
        return Err(invalid("duration exceeds the daily cap"));
    }
    Ok(Shift {
        id: ShiftId::new(index as u32),
        service: record.service.clone(),
        number: spec.number,
        vehicle: record.vehicle.clone(),
        kind: record.kind,
        date,
        start_min,
        duration_min,
    })
}

/// HH:MM de 24 horas a minutos del día.
pub fn parse_hhmm(raw: &str) -> Option<u32> {
    let (h, m) = raw.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Fechas del mes, en orden; `None` si (año, mes) no es válido.
pub fn month_dates(year: i32, month: u32) -> Option<Vec<NaiveDate>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let mut dates = Vec::with_capacity(31);
    let mut current = first;
    while current.month() == month {
        dates.push(current);
        current = current.succ_opt()?;
    }
    Some(dates)
}
