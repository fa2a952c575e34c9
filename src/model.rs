use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "Slot start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// A committed exam-room booking. Immutable once admitted; changes go
/// through full replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: Ulid,
    pub exam_id: Ulid,
    pub slot: Slot,
    pub seats: u32,
}

/// A candidate allocation as submitted by the caller, not yet admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationInput {
    pub exam_id: Ulid,
    pub room_id: Ulid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub seats: u32,
}

#[derive(Debug, Clone)]
pub struct RoomState {
    pub id: Ulid,
    pub name: String,
    /// Seat ceiling the sweep must never let concurrent load exceed.
    pub capacity: u32,
    /// Committed allocations, sorted by `slot.start`.
    pub allocations: Vec<Allocation>,
}

impl RoomState {
    pub fn new(id: Ulid, name: String, capacity: u32) -> Self {
        Self {
            id,
            name,
            capacity,
            allocations: Vec::new(),
        }
    }

    /// Insert allocation maintaining sort order by slot.start.
    pub fn insert_allocation(&mut self, allocation: Allocation) {
        let pos = self
            .allocations
            .binary_search_by_key(&allocation.slot.start, |a| a.slot.start)
            .unwrap_or_else(|e| e);
        self.allocations.insert(pos, allocation);
    }

    /// Remove allocation by id.
    pub fn remove_allocation(&mut self, id: Ulid) -> Option<Allocation> {
        if let Some(pos) = self.allocations.iter().position(|a| a.id == id) {
            Some(self.allocations.remove(pos))
        } else {
            None
        }
    }

    /// Return only allocations whose slot overlaps the query window.
    /// Uses binary search to skip allocations starting at or after `query.end`.
    pub fn overlapping(&self, query: &Slot) -> impl Iterator<Item = &Allocation> {
        // Everything at index >= right_bound starts at or after query.end → can't overlap.
        let right_bound = self
            .allocations
            .partition_point(|a| a.slot.start < query.end);
        self.allocations[..right_bound]
            .iter()
            .filter(move |a| a.slot.end > query.start)
    }
}

/// Administrator-defined period during which nothing may be scheduled.
/// `room_id = None` applies to every room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutWindow {
    pub id: Ulid,
    pub name: String,
    pub slot: Slot,
    pub room_id: Option<Ulid>,
}

impl BlackoutWindow {
    pub fn applies_to(&self, room_id: Ulid) -> bool {
        self.room_id.is_none_or(|r| r == room_id)
    }
}

/// Whole-day range where exams are not scheduled. Both dates inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: Ulid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Holiday {
    /// Inclusive intersection with an inclusive local date span.
    pub fn intersects(&self, first: NaiveDate, last: NaiveDate) -> bool {
        self.start_date <= last && self.end_date >= first
    }
}

/// Academic term. Both dates inclusive. Published-term immutability is the
/// caller's concern; the engine reads terms as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: Ulid,
    pub name: String,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub published: bool,
}

impl Term {
    /// True if the inclusive local date span sits inside the term window.
    pub fn contains_dates(&self, first: NaiveDate, last: NaiveDate) -> bool {
        first >= self.start_date && last <= self.end_date
    }
}

/// Exam definition. Supplies the term for its allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: Ulid,
    pub title: String,
    pub course_code: String,
    pub expected_students: u32,
    pub duration_minutes: u32,
    pub term_id: Ulid,
}

/// Shared scheduling reference data: blackouts and holidays.
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    pub blackouts: Vec<BlackoutWindow>,
    pub holidays: Vec<Holiday>,
}

/// Change notifications broadcast per room after a mutation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationEvent {
    AllocationCommitted {
        id: Ulid,
        exam_id: Ulid,
        room_id: Ulid,
        slot: Slot,
        seats: u32,
    },
    AllocationCancelled {
        id: Ulid,
        room_id: Ulid,
    },
    RoomCreated {
        id: Ulid,
        name: String,
        capacity: u32,
    },
    RoomUpdated {
        id: Ulid,
        name: String,
        capacity: u32,
    },
    RoomDeleted {
        id: Ulid,
    },
    BlackoutAdded {
        id: Ulid,
        room_id: Option<Ulid>,
    },
    BlackoutRemoved {
        id: Ulid,
    },
    HolidayAdded {
        id: Ulid,
    },
    HolidayRemoved {
        id: Ulid,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Ulid,
    pub name: String,
    pub capacity: u32,
    pub allocation_count: usize,
}
