use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::validate::{ValidationContext, validate, validate_slot};
use super::{Engine, EngineError};

impl Engine {
    // ── Rooms ────────────────────────────────────────────────

    pub async fn create_room(
        &self,
        id: Ulid,
        name: &str,
        capacity: u32,
    ) -> Result<(), EngineError> {
        if self.rooms.len() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("room name too long"));
        }
        if capacity == 0 {
            return Err(EngineError::LimitExceeded("room capacity must be at least 1"));
        }
        if self.rooms.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let rs = RoomState::new(id, name.to_string(), capacity);
        self.rooms.insert(id, Arc::new(RwLock::new(rs)));
        metrics::gauge!(observability::ROOMS_ACTIVE).set(self.rooms.len() as f64);
        self.notify.send(
            id,
            &AllocationEvent::RoomCreated {
                id,
                name: name.to_string(),
                capacity,
            },
        );
        Ok(())
    }

    /// Rename or resize a room. Shrinking capacity does not re-validate
    /// committed allocations; the caller decides how to resolve those.
    pub async fn update_room(
        &self,
        id: Ulid,
        name: &str,
        capacity: u32,
    ) -> Result<(), EngineError> {
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("room name too long"));
        }
        if capacity == 0 {
            return Err(EngineError::LimitExceeded("room capacity must be at least 1"));
        }
        let mut guard = self.lock_room(id).await?;
        guard.name = name.to_string();
        guard.capacity = capacity;
        drop(guard);
        self.notify.send(
            id,
            &AllocationEvent::RoomUpdated {
                id,
                name: name.to_string(),
                capacity,
            },
        );
        Ok(())
    }

    pub async fn delete_room(&self, id: Ulid) -> Result<(), EngineError> {
        let guard = self.lock_room(id).await?;
        if !guard.allocations.is_empty() {
            return Err(EngineError::HasAllocations(id));
        }
        drop(guard);
        self.rooms.remove(&id);
        metrics::gauge!(observability::ROOMS_ACTIVE).set(self.rooms.len() as f64);
        self.notify.send(id, &AllocationEvent::RoomDeleted { id });
        self.notify.remove(&id);
        Ok(())
    }

    // ── Reference data ───────────────────────────────────────

    pub async fn register_term(&self, term: Term) -> Result<(), EngineError> {
        if term.start_date > term.end_date {
            return Err(EngineError::InvalidInterval("term start after end"));
        }
        if term.name.len() > MAX_NAME_LEN || term.code.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("term name too long"));
        }
        if self.terms.contains_key(&term.id) {
            return Err(EngineError::AlreadyExists(term.id));
        }
        self.terms.insert(term.id, term);
        Ok(())
    }

    pub async fn register_exam(&self, exam: Exam) -> Result<(), EngineError> {
        if exam.expected_students == 0 || exam.duration_minutes == 0 {
            return Err(EngineError::LimitExceeded(
                "exam students and duration must be at least 1",
            ));
        }
        if !self.terms.contains_key(&exam.term_id) {
            return Err(EngineError::NotFound(exam.term_id));
        }
        if self.exams.contains_key(&exam.id) {
            return Err(EngineError::AlreadyExists(exam.id));
        }
        self.exams.insert(exam.id, exam);
        Ok(())
    }

    pub async fn add_blackout(&self, blackout: BlackoutWindow) -> Result<(), EngineError> {
        if blackout.slot.start >= blackout.slot.end {
            return Err(EngineError::InvalidInterval("start_at must precede end_at"));
        }
        if let Some(rid) = blackout.room_id
            && !self.rooms.contains_key(&rid) {
                return Err(EngineError::NotFound(rid));
            }
        let event = AllocationEvent::BlackoutAdded {
            id: blackout.id,
            room_id: blackout.room_id,
        };
        let room_id = blackout.room_id;
        let mut calendar = self.calendar.write().await;
        if calendar.blackouts.iter().any(|b| b.id == blackout.id) {
            return Err(EngineError::AlreadyExists(blackout.id));
        }
        calendar.blackouts.push(blackout);
        drop(calendar);
        match room_id {
            Some(rid) => self.notify.send(rid, &event),
            None => self.notify.send_all(&event),
        }
        Ok(())
    }

    pub async fn remove_blackout(&self, id: Ulid) -> Result<(), EngineError> {
        let mut calendar = self.calendar.write().await;
        let before = calendar.blackouts.len();
        calendar.blackouts.retain(|b| b.id != id);
        if calendar.blackouts.len() == before {
            return Err(EngineError::NotFound(id));
        }
        drop(calendar);
        self.notify.send_all(&AllocationEvent::BlackoutRemoved { id });
        Ok(())
    }

    pub async fn add_holiday(&self, holiday: Holiday) -> Result<(), EngineError> {
        if holiday.start_date > holiday.end_date {
            return Err(EngineError::InvalidInterval("holiday start after end"));
        }
        let id = holiday.id;
        let mut calendar = self.calendar.write().await;
        if calendar.holidays.iter().any(|h| h.id == id) {
            return Err(EngineError::AlreadyExists(id));
        }
        calendar.holidays.push(holiday);
        drop(calendar);
        self.notify.send_all(&AllocationEvent::HolidayAdded { id });
        Ok(())
    }

    pub async fn remove_holiday(&self, id: Ulid) -> Result<(), EngineError> {
        let mut calendar = self.calendar.write().await;
        let before = calendar.holidays.len();
        calendar.holidays.retain(|h| h.id != id);
        if calendar.holidays.len() == before {
            return Err(EngineError::NotFound(id));
        }
        drop(calendar);
        self.notify.send_all(&AllocationEvent::HolidayRemoved { id });
        Ok(())
    }

    // ── Allocation admission ─────────────────────────────────

    /// Admit a new allocation: lock the room, read the overlap set, run the
    /// constraint pipeline, and commit. On rejection the lock guard drops
    /// with the room untouched.
    pub async fn validate_and_persist(
        &self,
        id: Ulid,
        input: AllocationInput,
    ) -> Result<Allocation, EngineError> {
        if self.allocation_to_room.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        self.admit(id, input, None).await
    }

    /// Full replacement of an existing allocation, re-running the pipeline
    /// with the prior version excluded from the overlap set. Supports
    /// moving to a different room.
    pub async fn replace_allocation(
        &self,
        id: Ulid,
        input: AllocationInput,
    ) -> Result<Allocation, EngineError> {
        let old_room = self
            .room_for_allocation(&id)
            .ok_or(EngineError::NotFound(id))?;
        if old_room == input.room_id {
            return self.admit(id, input, Some(id)).await;
        }
        self.admit_moving(id, input, old_room).await
    }

    pub async fn cancel_allocation(&self, id: Ulid) -> Result<Ulid, EngineError> {
        let room_id = self
            .room_for_allocation(&id)
            .ok_or(EngineError::NotFound(id))?;
        let mut guard = self.lock_room(room_id).await?;
        guard
            .remove_allocation(id)
            .ok_or(EngineError::NotFound(id))?;
        drop(guard);
        self.allocation_to_room.remove(&id);
        tracing::info!("cancelled allocation {id} in room {room_id}");
        metrics::counter!(observability::ALLOCATIONS_CANCELLED_TOTAL).increment(1);
        self.notify
            .send(room_id, &AllocationEvent::AllocationCancelled { id, room_id });
        Ok(room_id)
    }

    /// Lock-then-read-then-validate-then-write. `exclude` names the prior
    /// version of the candidate on same-room replacement.
    async fn admit(
        &self,
        id: Ulid,
        input: AllocationInput,
        exclude: Option<Ulid>,
    ) -> Result<Allocation, EngineError> {
        let slot = self.checked_slot(&input)?;
        let term = self.term_for_exam(&input.exam_id)?;

        let started = Instant::now();
        let (mut guard, overlaps) = self
            .lock_and_read_overlaps(input.room_id, &slot, exclude)
            .await?;
        if guard.allocations.len() >= self.config.max_allocations_per_room {
            return Err(EngineError::LimitExceeded("too many allocations in room"));
        }

        let calendar = self.calendar.read().await;
        let outcome = validate(
            &slot,
            input.seats,
            &ValidationContext {
                room_id: input.room_id,
                capacity: guard.capacity,
                term: &term,
                blackouts: &calendar.blackouts,
                holidays: &calendar.holidays,
                overlaps: &overlaps,
                timezone: self.config.timezone,
            },
        );
        drop(calendar);
        self.record_outcome(started, &outcome);
        outcome?;

        if let Some(prev) = exclude {
            guard.remove_allocation(prev);
        }
        let allocation = Allocation {
            id,
            exam_id: input.exam_id,
            slot,
            seats: input.seats,
        };
        guard.insert_allocation(allocation);
        drop(guard);
        self.allocation_to_room.insert(id, input.room_id);
        self.committed(&allocation, input.room_id);
        Ok(allocation)
    }

    /// Replacement that moves the allocation to another room. Both room
    /// locks are taken in id order so concurrent movers cannot deadlock.
    async fn admit_moving(
        &self,
        id: Ulid,
        input: AllocationInput,
        old_room: Ulid,
    ) -> Result<Allocation, EngineError> {
        let slot = self.checked_slot(&input)?;
        let term = self.term_for_exam(&input.exam_id)?;

        let started = Instant::now();
        let first = old_room.min(input.room_id);
        let second = old_room.max(input.room_id);
        let g1 = self.lock_room(first).await?;
        let g2 = self.lock_room(second).await?;
        let (mut old_guard, mut new_guard) = if first == old_room { (g1, g2) } else { (g2, g1) };
        if new_guard.allocations.len() >= self.config.max_allocations_per_room {
            return Err(EngineError::LimitExceeded("too many allocations in room"));
        }

        let overlaps: Vec<Allocation> = new_guard.overlapping(&slot).copied().collect();
        let calendar = self.calendar.read().await;
        let outcome = validate(
            &slot,
            input.seats,
            &ValidationContext {
                room_id: input.room_id,
                capacity: new_guard.capacity,
                term: &term,
                blackouts: &calendar.blackouts,
                holidays: &calendar.holidays,
                overlaps: &overlaps,
                timezone: self.config.timezone,
            },
        );
        drop(calendar);
        self.record_outcome(started, &outcome);
        outcome?;

        old_guard
            .remove_allocation(id)
            .ok_or(EngineError::NotFound(id))?;
        let allocation = Allocation {
            id,
            exam_id: input.exam_id,
            slot,
            seats: input.seats,
        };
        new_guard.insert_allocation(allocation);
        drop(new_guard);
        drop(old_guard);
        self.allocation_to_room.insert(id, input.room_id);
        self.notify
            .send(old_room, &AllocationEvent::AllocationCancelled { id, room_id: old_room });
        self.committed(&allocation, input.room_id);
        Ok(allocation)
    }

    fn checked_slot(&self, input: &AllocationInput) -> Result<Slot, EngineError> {
        validate_slot(
            &Slot {
                start: input.start_at,
                end: input.end_at,
            },
            input.seats,
        )?;
        Ok(Slot::new(input.start_at, input.end_at))
    }

    fn term_for_exam(&self, exam_id: &Ulid) -> Result<Term, EngineError> {
        let term_id = self
            .exams
            .get(exam_id)
            .map(|e| e.value().term_id)
            .ok_or(EngineError::NotFound(*exam_id))?;
        self.terms
            .get(&term_id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::NotFound(term_id))
    }

    fn record_outcome(&self, started: Instant, outcome: &Result<(), super::Violation>) {
        metrics::histogram!(observability::VALIDATION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        let label = match outcome {
            Ok(()) => "accepted",
            Err(v) => {
                tracing::debug!("candidate rejected: {v}");
                observability::violation_label(v)
            }
        };
        metrics::counter!(observability::VALIDATIONS_TOTAL, "outcome" => label).increment(1);
    }

    fn committed(&self, allocation: &Allocation, room_id: Ulid) {
        tracing::info!(
            "committed allocation {} ({} seats) in room {room_id}",
            allocation.id,
            allocation.seats
        );
        metrics::counter!(observability::ALLOCATIONS_COMMITTED_TOTAL).increment(1);
        self.notify.send(
            room_id,
            &AllocationEvent::AllocationCommitted {
                id: allocation.id,
                exam_id: allocation.exam_id,
                room_id,
                slot: allocation.slot,
                seats: allocation.seats,
            },
        );
    }
}
