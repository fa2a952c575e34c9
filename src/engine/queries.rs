use ulid::Ulid;

use crate::model::*;

use super::{Engine, EngineError};

impl Engine {
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::with_capacity(self.rooms.len());
        let shared: Vec<_> = self.rooms.iter().map(|e| e.value().clone()).collect();
        for rs in shared {
            let guard = rs.read().await;
            infos.push(RoomInfo {
                id: guard.id,
                name: guard.name.clone(),
                capacity: guard.capacity,
                allocation_count: guard.allocations.len(),
            });
        }
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub async fn get_room_info(&self, room_id: Ulid) -> Option<RoomInfo> {
        let rs = self.get_room(&room_id)?;
        let guard = rs.read().await;
        Some(RoomInfo {
            id: guard.id,
            name: guard.name.clone(),
            capacity: guard.capacity,
            allocation_count: guard.allocations.len(),
        })
    }

    /// All committed allocations in a room, sorted by start. Missing rooms
    /// read as empty.
    pub async fn get_allocations(&self, room_id: Ulid) -> Vec<Allocation> {
        let Some(rs) = self.get_room(&room_id) else {
            return Vec::new();
        };
        let guard = rs.read().await;
        guard.allocations.clone()
    }

    pub async fn get_allocation(&self, id: Ulid) -> Result<(Ulid, Allocation), EngineError> {
        let room_id = self
            .room_for_allocation(&id)
            .ok_or(EngineError::NotFound(id))?;
        let rs = self
            .get_room(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = rs.read().await;
        let allocation = guard
            .allocations
            .iter()
            .find(|a| a.id == id)
            .copied()
            .ok_or(EngineError::NotFound(id))?;
        Ok((room_id, allocation))
    }

    pub async fn list_blackouts(&self) -> Vec<BlackoutWindow> {
        self.calendar.read().await.blackouts.clone()
    }

    pub async fn list_holidays(&self) -> Vec<Holiday> {
        self.calendar.read().await.holidays.clone()
    }

    pub fn get_term(&self, id: &Ulid) -> Option<Term> {
        self.terms.get(id).map(|e| e.value().clone())
    }

    pub fn get_exam(&self, id: &Ulid) -> Option<Exam> {
        self.exams.get(id).map(|e| e.value().clone())
    }
}
