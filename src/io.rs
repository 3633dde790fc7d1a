use crate::expand::{Frequency, ServiceRecord, ShiftSpec};
use crate::model::{ServiceType, Shift};
use crate::solver::Solution;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::Path;

/// Import de servicios desde CSV plano. Header:
/// `service,vehicle,service_type,date,frequency,start,duration_hours,shift_number`
/// (`date` vacío en filas de plantilla, `frequency` vacío en filas fechadas).
/// Las filas se agrupan por (servicio, vehículo, tipo).
pub fn import_services_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ServiceRecord>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out: Vec<ServiceRecord> = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let ctx = || format!("services row {}", line + 2);
        let service = rec.get(0).map(str::trim).unwrap_or_default();
        if service.is_empty() {
            bail!("{}: empty service id", ctx());
        }
        let vehicle = rec
            .get(1)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        let kind_raw = rec.get(2).map(str::trim).unwrap_or_default();
        let kind = ServiceType::parse(kind_raw)
            .with_context(|| format!("{}: unknown service_type {kind_raw:?}", ctx()))?;
        let date = match rec.get(3).map(str::trim) {
            Some("") | None => None,
            Some(raw) => Some(parse_date(raw).with_context(ctx)?),
        };
        let frequency = match rec.get(4).map(str::trim) {
            Some("") | None => None,
            Some(raw) => Some(Frequency::parse(raw).with_context(ctx)?),
        };
        let start = rec
            .get(5)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .with_context(|| format!("{}: missing start time", ctx()))?
            .to_owned();
        let duration_hours: f64 = rec
            .get(6)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .with_context(|| format!("{}: missing duration_hours", ctx()))?
            .parse()
            .with_context(|| format!("{}: invalid duration_hours", ctx()))?;
        let number: u32 = rec
            .get(7)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("1")
            .parse()
            .with_context(|| format!("{}: invalid shift_number", ctx()))?;

        let spec = ShiftSpec {
            date,
            frequency,
            start,
            duration_hours,
            number,
        };
        match out
            .iter_mut()
            .find(|r| r.service == service && r.vehicle == vehicle && r.kind == kind)
        {
            Some(record) => record.shifts.push(spec),
            None => out.push(ServiceRecord {
                service: service.to_owned(),
                vehicle,
                kind,
                shifts: vec![spec],
            }),
        }
    }
    Ok(out)
}

/// Import de servicios desde JSON anidado (mismo esquema que el export).
pub fn import_services_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ServiceRecord>> {
    let data = fs::read(&path)
        .with_context(|| format!("reading services {}", path.as_ref().display()))?;
    let records: Vec<ServiceRecord> = serde_json::from_slice(&data)
        .with_context(|| format!("parsing services {}", path.as_ref().display()))?;
    Ok(records)
}

/// Export JSON del listado de turnos expandidos.
pub fn export_shifts_json<P: AsRef<Path>>(path: P, shifts: &[Shift]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(shifts)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn import_shifts_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Shift>> {
    let data =
        fs::read(&path).with_context(|| format!("reading shifts {}", path.as_ref().display()))?;
    let shifts: Vec<Shift> = serde_json::from_slice(&data)
        .with_context(|| format!("parsing shifts {}", path.as_ref().display()))?;
    Ok(shifts)
}

/// Export CSV de asignaciones:
/// `driver_id,cycle,work_start,shift_id,service,shift_number,date,start_min,end_min,duration_min`
pub fn export_solution_csv<P: AsRef<Path>>(
    path: P,
    solution: &Solution,
    shifts: &[Shift],
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record([
        "driver_id",
        "cycle",
        "work_start",
        "shift_id",
        "service",
        "shift_number",
        "date",
        "start_min",
        "end_min",
        "duration_min",
    ])?;
    let mut ints = itoa::Buffer::new();
    for view in solution.assignment_views(shifts) {
        let shift = &shifts[view.shift.index()];
        let work_start = solution.driver_state(view.driver).driver().work_start;
        w.write_field(ints.format(view.driver.as_u32()))?;
        w.write_field(ints.format(view.cycle))?;
        w.write_field(work_start.to_string())?;
        w.write_field(ints.format(view.shift.as_u32()))?;
        w.write_field(&shift.service)?;
        w.write_field(ints.format(shift.number))?;
        w.write_field(view.date.to_string())?;
        w.write_field(ints.format(view.start_min))?;
        w.write_field(ints.format(view.end_min))?;
        w.write_field(ints.format(view.duration_min))?;
        w.write_record(None::<&[u8]>)?;
    }
    w.flush()?;
    Ok(())
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date (expected YYYY-MM-DD): {raw}"))
}
