use crate::model::{DriverId, ShiftId};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("invalid shift {service} #{number} on {date}: {reason}")]
    InvalidShift {
        service: String,
        number: u32,
        date: NaiveDate,
        reason: &'static str,
    },
    #[error("cannot mix dated and template shift rows in one batch")]
    MixedShiftKinds,
    #[error("shift {0:?} does not fit any driver, not even a fresh one")]
    UnreachableShift(ShiftId),
    #[error("shift ids are not dense (expected index {expected}, found {found})")]
    NonDenseIds { expected: u32, found: u32 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Señal cooperativa de cancelación; el motor la consulta en cada iteración.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Resumen de una corrida de refinamiento.
#[derive(Debug, Clone)]
pub struct RefineStats {
    pub iterations: u64,
    pub improvements: u64,
    /// true si se cortó por presupuesto o por cancelación externa.
    pub cancelled: bool,
    pub operator_weights: [f64; 3],
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Uncovered,
    DoubleCover,
    RestDayWork,
    DailyCap,
    SameDayRest,
    InterDayRest,
    Overlap,
}

/// Infracción detectada por la auditoría independiente de una solución.
#[derive(Debug, Clone)]
pub struct Violation {
    pub driver: Option<DriverId>,
    pub shift_a: ShiftId,
    pub shift_b: Option<ShiftId>,
    pub kind: ViolationKind,
}
