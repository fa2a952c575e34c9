//! Hard bounds on inputs. These protect the engine from pathological
//! payloads; operational tuning lives in `config`.

pub const MAX_ROOMS: usize = 4096;
pub const MAX_ALLOCATIONS_PER_ROOM: usize = 8192;
pub const MAX_NAME_LEN: usize = 255;

/// Widest admissible allocation slot. Exams run hours, not weeks.
pub const MAX_SLOT_DURATION_SECS: i64 = 14 * 24 * 3600;

/// Timestamps outside this year range are treated as malformed input.
pub const MIN_VALID_YEAR: i32 = 2000;
pub const MAX_VALID_YEAR: i32 = 2100;

/// Heatmap request bounds: at most a year of days, at most this many rooms.
pub const MAX_HEATMAP_DAYS: i64 = 366;
pub const MAX_HEATMAP_ROOMS: usize = 256;
