use chrono::Datelike;
use chrono_tz::Tz;
use ulid::Ulid;

use crate::model::*;
use crate::timeday;

use super::error::{EngineError, Violation};
use super::sweep::{self, SeatLoad};

/// Everything the constraint pipeline reads, materialized by the caller.
/// The overlap set is plain data, so tests can inject one without holding a
/// live room lock.
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    pub room_id: Ulid,
    pub capacity: u32,
    pub term: &'a Term,
    pub blackouts: &'a [BlackoutWindow],
    pub holidays: &'a [Holiday],
    pub overlaps: &'a [Allocation],
    pub timezone: Tz,
}

/// Interval sanity, checked before the pipeline runs. Zero-duration,
/// inverted, out-of-range, or seatless candidates never reach the
/// constraint checks.
pub fn validate_slot(slot: &Slot, seats: u32) -> Result<(), EngineError> {
    use crate::limits::*;
    if slot.start >= slot.end {
        return Err(EngineError::InvalidInterval("start_at must precede end_at"));
    }
    if seats == 0 {
        return Err(EngineError::InvalidInterval("seats must be at least 1"));
    }
    if slot.start.year() < MIN_VALID_YEAR || slot.end.year() > MAX_VALID_YEAR {
        return Err(EngineError::InvalidInterval("timestamp out of range"));
    }
    if slot.duration().num_seconds() > MAX_SLOT_DURATION_SECS {
        return Err(EngineError::InvalidInterval("slot too wide"));
    }
    Ok(())
}

/// Ordered constraint pipeline: term window, blackout overlap, holiday
/// overlap, capacity. Short-circuits on the first violated constraint; the
/// order is part of the contract so error reporting stays deterministic.
pub fn validate(slot: &Slot, seats: u32, ctx: &ValidationContext<'_>) -> Result<(), Violation> {
    let (first_day, last_day) = timeday::local_date_span(ctx.timezone, slot);

    if !ctx.term.contains_dates(first_day, last_day) {
        return Err(Violation::TermWindow {
            term_start: ctx.term.start_date,
            term_end: ctx.term.end_date,
        });
    }

    if let Some(bw) = ctx
        .blackouts
        .iter()
        .find(|bw| bw.applies_to(ctx.room_id) && bw.slot.overlaps(slot))
    {
        return Err(Violation::Blackout { blackout_id: bw.id });
    }

    if let Some(h) = ctx
        .holidays
        .iter()
        .find(|h| h.intersects(first_day, last_day))
    {
        return Err(Violation::Holiday { holiday_id: h.id });
    }

    sweep::check_capacity(ctx.capacity, ctx.overlaps, SeatLoad { slot: *slot, seats }).map_err(
        |peak| Violation::Capacity {
            capacity: ctx.capacity,
            peak,
        },
    )
}
