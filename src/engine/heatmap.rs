use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::*;
use crate::timeday;

use super::sweep::{self, SeatLoad};
use super::{Engine, EngineError};

/// One room-day of utilization data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayUtilization {
    pub date: NaiveDate,
    pub peak_seats: u32,
    pub total_seats_booked: u64,
    pub allocation_count: usize,
    /// `peak_seats / capacity`, in `[0, 1]` unless the room is overbooked.
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomHeatmap {
    pub room_id: Ulid,
    pub room_name: String,
    pub capacity: u32,
    pub days: Vec<DayUtilization>,
}

impl Engine {
    /// Per-room per-day utilization over a term-bounded date range.
    ///
    /// Read-only and best-effort: each room is read under its own read lock,
    /// with no cross-room snapshot atomicity. Allocations crossing local
    /// day boundaries are split into per-day sub-intervals before the sweep,
    /// so a two-day exam counts toward both days' peaks. Unknown room ids
    /// read as absent, matching the query conventions elsewhere.
    pub async fn capacity_heatmap(
        &self,
        room_ids: &[Ulid],
        term_id: Ulid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RoomHeatmap>, EngineError> {
        if room_ids.len() > MAX_HEATMAP_ROOMS {
            return Err(EngineError::LimitExceeded("too many room ids"));
        }
        let term = self
            .terms
            .get(&term_id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::NotFound(term_id))?;

        let from = from.max(term.start_date);
        let to = to.min(term.end_date);
        if from > to {
            return Ok(Vec::new());
        }
        if (to - from).num_days() >= MAX_HEATMAP_DAYS {
            return Err(EngineError::LimitExceeded("date range too wide"));
        }

        let tz = self.config.timezone;
        let mut out = Vec::with_capacity(room_ids.len());
        for room_id in room_ids {
            let Some(rs) = self.get_room(room_id) else {
                continue;
            };
            let guard = rs.read().await;

            let mut days = Vec::new();
            for date in timeday::dates(from, to) {
                let window = timeday::day_slot(tz, date);
                let mut loads: Vec<SeatLoad> = Vec::new();
                let mut total_seats_booked: u64 = 0;
                for allocation in guard.overlapping(&window) {
                    if let Some(clipped) =
                        sweep::clip_to_window(&SeatLoad::from(allocation), &window)
                    {
                        total_seats_booked += u64::from(allocation.seats);
                        loads.push(clipped);
                    }
                }
                let peak_seats = sweep::peak_load(&loads);
                days.push(DayUtilization {
                    date,
                    peak_seats,
                    total_seats_booked,
                    allocation_count: loads.len(),
                    utilization: f64::from(peak_seats) / f64::from(guard.capacity.max(1)),
                });
            }

            out.push(RoomHeatmap {
                room_id: *room_id,
                room_name: guard.name.clone(),
                capacity: guard.capacity,
                days,
            });
        }
        Ok(out)
    }
}
