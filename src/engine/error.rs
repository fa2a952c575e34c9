use chrono::NaiveDate;
use ulid::Ulid;

/// A constraint the candidate allocation violated. Each variant knows which
/// logical input field the caller should attach the error to, so the API
/// layer never has to re-derive which rule failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    TermWindow {
        term_start: NaiveDate,
        term_end: NaiveDate,
    },
    Blackout {
        blackout_id: Ulid,
    },
    Holiday {
        holiday_id: Ulid,
    },
    Capacity {
        capacity: u32,
        peak: u32,
    },
}

impl Violation {
    pub fn field(&self) -> &'static str {
        match self {
            Violation::TermWindow { .. }
            | Violation::Blackout { .. }
            | Violation::Holiday { .. } => "start_at",
            Violation::Capacity { .. } => "seats",
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::TermWindow {
                term_start,
                term_end,
            } => write!(
                f,
                "allocation falls outside the term window {term_start}..{term_end}"
            ),
            Violation::Blackout { blackout_id } => {
                write!(f, "allocation overlaps blackout window {blackout_id}")
            }
            Violation::Holiday { holiday_id } => {
                write!(f, "allocation falls on holiday {holiday_id}")
            }
            Violation::Capacity { capacity, peak } => {
                write!(f, "room capacity {capacity} exceeded: peak load would reach {peak}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// A validation constraint failed. Recoverable, user-facing.
    Rejected(Violation),
    /// Malformed interval or seat count, rejected before the pipeline runs.
    InvalidInterval(&'static str),
    /// Room still holds allocations and cannot be deleted.
    HasAllocations(Ulid),
    LimitExceeded(&'static str),
    /// The room's exclusive lock could not be acquired within the configured
    /// wait. Transient; the whole validate-and-commit call is safe to retry.
    LockTimeout(Ulid),
}

impl EngineError {
    /// Transient infrastructure failure, candidate for caller-driven retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::LockTimeout(_))
    }
}

impl From<Violation> for EngineError {
    fn from(v: Violation) -> Self {
        EngineError::Rejected(v)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::Rejected(v) => write!(f, "{}: {v}", v.field()),
            EngineError::InvalidInterval(msg) => write!(f, "invalid interval: {msg}"),
            EngineError::HasAllocations(id) => {
                write!(f, "cannot delete room {id}: allocations still committed")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::LockTimeout(id) => {
                write!(f, "lock wait expired for room {id}; retry the submission")
            }
        }
    }
}

impl std::error::Error for EngineError {}
