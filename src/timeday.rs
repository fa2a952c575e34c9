//! Local-day computation in a configured timezone.
//!
//! Term windows, holiday checks, and the heatmap all reason about
//! "the local date of an instant"; everything funnels through here so
//! DST behavior lives in one place.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono::offset::LocalResult;
use chrono_tz::Tz;

use crate::model::Slot;

/// Local calendar date of a UTC instant.
pub fn local_date(tz: Tz, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Inclusive local date span covered by a half-open slot. The exclusive end
/// is pulled back by one microsecond so an allocation ending exactly at
/// midnight does not claim the following day.
pub fn local_date_span(tz: Tz, slot: &Slot) -> (NaiveDate, NaiveDate) {
    let last = slot.end - TimeDelta::microseconds(1);
    (local_date(tz, slot.start), local_date(tz, last))
}

/// UTC instant of local midnight on `date`.
///
/// Midnight can be skipped by a spring-forward transition (e.g. Chile moves
/// 24:00 straight to 01:00) or repeated by a fall-back one. A skipped
/// midnight resolves to the first representable local minute after it; a
/// repeated midnight resolves to the earlier offset.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            let mut probe = naive + TimeDelta::minutes(1);
            // Transition gaps are bounded well under a day.
            let limit = naive + TimeDelta::days(1);
            loop {
                assert!(probe < limit, "no representable instant on {date} in {tz}");
                match tz.from_local_datetime(&probe) {
                    LocalResult::Single(dt) => break dt.with_timezone(&Utc),
                    LocalResult::Ambiguous(earlier, _) => break earlier.with_timezone(&Utc),
                    LocalResult::None => probe += TimeDelta::minutes(1),
                }
            }
        }
    }
}

/// The local calendar day `[midnight, next midnight)` as a UTC slot.
/// On DST transition days this is shorter or longer than 24 hours.
pub fn day_slot(tz: Tz, date: NaiveDate) -> Slot {
    Slot::new(local_midnight(tz, date), local_midnight(tz, date + TimeDelta::days(1)))
}

/// Iterate calendar dates from `first` to `last`, inclusive.
pub fn dates(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    first.iter_days().take_while(move |d| *d <= last)
}
