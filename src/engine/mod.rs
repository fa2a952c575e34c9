mod error;
mod heatmap;
mod mutations;
mod queries;
pub mod sweep;
pub mod validate;

pub use error::{EngineError, Violation};
pub use heatmap::{DayUtilization, RoomHeatmap};
pub use sweep::{SeatLoad, check_capacity, peak_load, seat_events};
pub use validate::{ValidationContext, validate, validate_slot};

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::config::EngineConfig;
use crate::model::*;
use crate::notify::NotifyHub;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

/// The allocation ledger. Rooms own their committed allocations behind
/// per-room exclusive locks; blackouts and holidays sit in a shared
/// calendar; terms and exams are registered read-mostly reference data.
pub struct Engine {
    pub(crate) rooms: DashMap<Ulid, SharedRoomState>,
    pub(crate) calendar: RwLock<Calendar>,
    pub(crate) terms: DashMap<Ulid, Term>,
    pub(crate) exams: DashMap<Ulid, Exam>,
    /// Reverse lookup: allocation id → room id.
    pub(crate) allocation_to_room: DashMap<Ulid, Ulid>,
    pub notify: Arc<NotifyHub>,
    pub(crate) config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig, notify: Arc<NotifyHub>) -> Self {
        Self {
            rooms: DashMap::new(),
            calendar: RwLock::new(Calendar::default()),
            terms: DashMap::new(),
            exams: DashMap::new(),
            allocation_to_room: DashMap::new(),
            notify,
            config,
        }
    }

    pub fn get_room(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn room_for_allocation(&self, allocation_id: &Ulid) -> Option<Ulid> {
        self.allocation_to_room
            .get(allocation_id)
            .map(|e| *e.value())
    }

    /// Exclusive room lock, bounded by the configured lock wait. Expiry is
    /// the retryable contention signal, never a validation failure.
    pub(super) async fn lock_room(
        &self,
        room_id: Ulid,
    ) -> Result<OwnedRwLockWriteGuard<RoomState>, EngineError> {
        let rs = self
            .get_room(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        match tokio::time::timeout(self.config.lock_wait, rs.write_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!("lock wait expired for room {room_id}");
                metrics::counter!(crate::observability::LOCK_TIMEOUTS_TOTAL).increment(1);
                Err(EngineError::LockTimeout(room_id))
            }
        }
    }

    /// Phase one of admission: take the room's exclusive lock, then
    /// materialize every committed allocation overlapping `slot` —
    /// excluding `exclude`, the candidate's own prior version on
    /// replacement. The guard travels back to the caller: committing means
    /// mutating through it, rolling back means dropping it untouched.
    pub async fn lock_and_read_overlaps(
        &self,
        room_id: Ulid,
        slot: &Slot,
        exclude: Option<Ulid>,
    ) -> Result<(OwnedRwLockWriteGuard<RoomState>, Vec<Allocation>), EngineError> {
        let guard = self.lock_room(room_id).await?;
        let overlaps = guard
            .overlapping(slot)
            .filter(|a| exclude != Some(a.id))
            .copied()
            .collect();
        Ok((guard, overlaps))
    }
}
