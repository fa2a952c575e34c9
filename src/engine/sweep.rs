use chrono::{DateTime, Utc};

use crate::model::{Allocation, Slot};

// ── Sweep-Line Capacity Evaluation ────────────────────────────────

/// One booked interval weighted by its seat count — the unit the sweep
/// consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatLoad {
    pub slot: Slot,
    pub seats: u32,
}

impl From<&Allocation> for SeatLoad {
    fn from(a: &Allocation) -> Self {
        Self {
            slot: a.slot,
            seats: a.seats,
        }
    }
}

/// Expand loads into directed events: `+seats` at arrival, `-seats` at
/// departure, sorted by `(timestamp, delta)`. The delta tie-break places
/// departures strictly before arrivals at equal timestamps, so a seat freed
/// at T is available again at T and back-to-back bookings never overlap.
pub fn seat_events(loads: &[SeatLoad]) -> Vec<(DateTime<Utc>, i64)> {
    let mut events: Vec<(DateTime<Utc>, i64)> = Vec::with_capacity(loads.len() * 2);
    for l in loads {
        events.push((l.slot.start, i64::from(l.seats)));
        events.push((l.slot.end, -i64::from(l.seats)));
    }
    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    events
}

/// Maximum simultaneous seat usage across the event set. O(n log n),
/// deterministic under equal timestamps thanks to the delta tie-break.
///
/// Panics if departures ever outrun arrivals: that is a malformed event set,
/// a programming error rather than a validation failure.
pub fn peak_load(loads: &[SeatLoad]) -> u32 {
    let mut current: i64 = 0;
    let mut peak: i64 = 0;
    for (_, delta) in seat_events(loads) {
        current += delta;
        assert!(current >= 0, "sweep underflow: departure without matching arrival");
        peak = peak.max(current);
    }
    peak as u32
}

/// Capacity check over the locked overlap set plus the candidate. Returns
/// the offending peak on failure.
pub fn check_capacity(
    capacity: u32,
    overlaps: &[Allocation],
    candidate: SeatLoad,
) -> Result<(), u32> {
    let mut loads: Vec<SeatLoad> = overlaps.iter().map(SeatLoad::from).collect();
    loads.push(candidate);
    metrics::histogram!(crate::observability::SWEEP_EVENT_COUNT).record((loads.len() * 2) as f64);
    let peak = peak_load(&loads);
    if peak > capacity { Err(peak) } else { Ok(()) }
}

/// Clip a load to `window`, dropping it when disjoint. Used to split
/// allocations crossing day boundaries into per-day sub-intervals.
pub fn clip_to_window(load: &SeatLoad, window: &Slot) -> Option<SeatLoad> {
    if !load.slot.overlaps(window) {
        return None;
    }
    Some(SeatLoad {
        slot: Slot::new(
            load.slot.start.max(window.start),
            load.slot.end.min(window.end),
        ),
        seats: load.seats,
    })
}
