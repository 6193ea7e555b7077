use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone};
use clap::ValueEnum;

use crate::types::HistoryRecord;

/// Relative time windows offered by the palette's history views.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    LastHour,
    Today,
    Yesterday,
    /// Since Monday 00:00 of the current ISO week.
    Week,
    /// Since the 1st of the current month.
    Month,
    All,
}

/// Half-open `[start, end)` range in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub start_ms: i64,
    pub end_ms: Option<i64>,
}

impl Bounds {
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_ms && self.end_ms.map_or(true, |end| timestamp_ms < end)
    }

    /// Calendar dates in `tz`, both inclusive. `None` when neither is given.
    pub fn between_dates<Tz: TimeZone>(
        tz: &Tz,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Option<Bounds> {
        if from.is_none() && to.is_none() {
            return None;
        }
        Some(Bounds {
            start_ms: from.map_or(i64::MIN, |d| midnight_ms(tz, d)),
            end_ms: to.and_then(|d| d.succ_opt()).map(|d| midnight_ms(tz, d)),
        })
    }
}

impl Window {
    /// Bounds relative to `now`, with midnights taken in `now`'s zone.
    pub fn bounds<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Bounds {
        let today = now.date_naive();
        let tz = now.timezone();
        let since = |date: NaiveDate| Bounds {
            start_ms: midnight_ms(&tz, date),
            end_ms: None,
        };

        match self {
            Window::LastHour => Bounds {
                start_ms: (now.clone() - Duration::hours(1)).timestamp_millis(),
                end_ms: None,
            },
            Window::Today => since(today),
            Window::Yesterday => Bounds {
                start_ms: midnight_ms(&tz, today - Duration::days(1)),
                end_ms: Some(midnight_ms(&tz, today)),
            },
            Window::Week => {
                let back = today.weekday().num_days_from_monday() as i64;
                since(today - Duration::days(back))
            }
            Window::Month => since(today.with_day(1).unwrap_or(today)),
            Window::All => Bounds {
                start_ms: i64::MIN,
                end_ms: None,
            },
        }
    }
}

/// Epoch ms of local midnight on `date`. Where a DST jump skips midnight the
/// earliest existing instant of the day is used.
fn midnight_ms<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> i64 {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t.timestamp_millis(),
        LocalResult::Ambiguous(early, _) => early.timestamp_millis(),
        LocalResult::None => (1..=24)
            .filter_map(|h| tz.from_local_datetime(&(naive + Duration::hours(h))).earliest())
            .map(|t| t.timestamp_millis())
            .next()
            .unwrap_or_else(|| naive.and_utc().timestamp_millis()),
    }
}

pub fn filter(records: Vec<HistoryRecord>, bounds: Bounds) -> Vec<HistoryRecord> {
    records
        .into_iter()
        .filter(|r| bounds.contains(r.timestamp))
        .collect()
}
