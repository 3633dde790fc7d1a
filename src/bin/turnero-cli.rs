#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use turnero::{
    expand, fleet_lower_bound, io, replicate, solve_month, CancelToken, JsonStorage, Regime,
    SearchParams, ServiceRecord, Solution, Storage,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de rosterización de conductores (sin base de datos)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Activa los logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Expandir servicios al listado de turnos de un mes
    Expand {
        /// CSV plano o JSON anidado de servicios
        #[arg(long)]
        services: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        /// Archivo JSON de turnos expandidos
        #[arg(long)]
        out: String,
    },

    /// Resolver un mes: expansión, goloso y refinamiento LNS
    Solve {
        #[arg(long)]
        services: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        /// Largo N del ciclo NxN
        #[arg(long, default_value_t = 7)]
        cycle: u32,
        #[arg(long, default_value_t = 600.0)]
        budget_seconds: f64,
        #[arg(long, default_value_t = 1000)]
        stagnation: u32,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Snapshot JSON de la solución
        #[arg(long)]
        out: String,
        /// Guarda también los turnos expandidos (JSON)
        #[arg(long)]
        shifts_out: Option<String>,
        /// Export CSV de asignaciones (opcional)
        #[arg(long)]
        csv: Option<String>,
    },

    /// Auditar una solución guardada contra sus turnos
    Check {
        #[arg(long)]
        solution: String,
        #[arg(long)]
        shifts: String,
        #[arg(long, default_value_t = 7)]
        cycle: u32,
    },

    /// Replicar un mes resuelto sobre otro mes
    Replicate {
        #[arg(long)]
        solution: String,
        /// Turnos del mes de origen (JSON)
        #[arg(long)]
        shifts: String,
        /// Mes de origen, YYYY-MM
        #[arg(long)]
        source: String,
        /// Servicios para expandir el mes destino
        #[arg(long)]
        services: String,
        /// Mes destino, YYYY-MM
        #[arg(long)]
        target: String,
        #[arg(long)]
        out: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }
    #[cfg(not(feature = "logging"))]
    let _ = cli.log;

    let code = match cli.cmd {
        Commands::Expand {
            services,
            year,
            month,
            out,
        } => {
            let records = load_services(&services)?;
            let shifts = expand(year, month, &records, &Regime::default())?;
            io::export_shifts_json(&out, &shifts)?;
            println!("{} shifts expanded for {year}-{month:02} into {out}", shifts.len());
            0
        }

        Commands::Solve {
            services,
            year,
            month,
            cycle,
            budget_seconds,
            stagnation,
            seed,
            out,
            shifts_out,
            csv,
        } => {
            let records = load_services(&services)?;
            let regime = Regime::with_cycle(cycle);
            regime.validate()?;
            let shifts = expand(year, month, &records, &regime)?;
            if shifts.is_empty() {
                bail!("no shifts fall in {year}-{month:02}");
            }
            let params = SearchParams {
                time_budget_secs: budget_seconds,
                stagnation_limit: stagnation,
                seed,
                ..SearchParams::default()
            };
            let outcome = solve_month(&shifts, &regime, &params, &CancelToken::new())?;
            let kpis = outcome.solution.kpis();
            println!(
                "{} drivers | coverage {:.1}% | {:.1} h assigned | lower bound {} | {} iterations{}",
                kpis.drivers,
                kpis.coverage * 100.0,
                kpis.total_minutes as f64 / 60.0,
                fleet_lower_bound(&shifts, &regime),
                outcome.stats.iterations,
                if outcome.stats.cancelled {
                    " (budget hit)"
                } else {
                    ""
                }
            );
            let storage = JsonStorage::open(&out)?;
            storage.save(&outcome.solution.snapshot())?;
            if let Some(path) = shifts_out {
                io::export_shifts_json(path, &shifts)?;
            }
            if let Some(path) = csv {
                io::export_solution_csv(path, &outcome.solution, &shifts)?;
            }
            0
        }

        Commands::Check {
            solution,
            shifts,
            cycle,
        } => {
            let shifts = io::import_shifts_json(&shifts)?;
            let snapshot = JsonStorage::open(&solution)?.load()?;
            let solution = Solution::restore(&snapshot, &shifts)?;
            let regime = Regime::with_cycle(cycle);
            let violations = solution.violations(&shifts, &regime);
            if violations.is_empty() {
                println!("OK: no violations");
                0
            } else {
                eprintln!("Found {} violation(s)", violations.len());
                for v in &violations {
                    eprintln!("  {v:?}");
                }
                // código 2 = roster inválido
                2
            }
        }

        Commands::Replicate {
            solution,
            shifts,
            source,
            services,
            target,
            out,
        } => {
            let source_shifts = io::import_shifts_json(&shifts)?;
            let snapshot = JsonStorage::open(&solution)?.load()?;
            let source_solution = Solution::restore(&snapshot, &source_shifts)?;
            let source_month = parse_month(&source)?;
            let target_month = parse_month(&target)?;
            let regime = Regime::with_cycle(source_solution.cycle());
            let records = load_services(&services)?;
            let target_shifts = expand(target_month.0, target_month.1, &records, &regime)?;
            let outcome = replicate(
                &source_solution,
                &source_shifts,
                source_month,
                &target_shifts,
                &regime,
            )?;
            println!(
                "{} drivers carried over to {target}; {} gap(s)",
                outcome.solution.driver_count(),
                outcome.gaps.len()
            );
            JsonStorage::open(&out)?.save(&outcome.solution.snapshot())?;
            if outcome.gaps.is_empty() {
                0
            } else {
                // código 2 = mes destino con huecos; re-optimizar aparte
                2
            }
        }
    };

    std::process::exit(code);
}

fn load_services(path: &str) -> Result<Vec<ServiceRecord>> {
    let is_csv = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        io::import_services_csv(path)
    } else {
        io::import_services_json(path)
    }
}

fn parse_month(value: &str) -> Result<(i32, u32)> {
    let (y, m) = value
        .split_once('-')
        .with_context(|| format!("invalid month (expected YYYY-MM): {value}"))?;
    let year: i32 = y
        .parse()
        .with_context(|| format!("invalid year in {value}"))?;
    let month: u32 = m
        .parse()
        .with_context(|| format!("invalid month in {value}"))?;
    if !(1..=12).contains(&month) {
        bail!("month out of range in {value}");
    }
    Ok((year, month))
}
