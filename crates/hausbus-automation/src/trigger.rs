//! Temporal trigger predicates for the schedule engine

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday as ChronoWeekday};
use serde::{Deserialize, Serialize};

/// A pure temporal predicate deciding whether a scheduled task fires at a
/// given instant.
///
/// Variants are a deterministic function of `now` alone, so persisted
/// triggers reload with identical behavior and can be evaluated
/// concurrently and repeatedly. The evaluation tick runs at one-second
/// granularity, so all time comparisons truncate to whole seconds;
/// sub-second components never take part in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires once per day at the given time.
    Daily { time: NaiveTime },
    /// Fires Monday through Friday at the given time.
    Weekday { time: NaiveTime },
    /// Fires Saturday and Sunday at the given time.
    Weekend { time: NaiveTime },
    /// Fires on one day of the week at the given time.
    DayOfWeek { day: ChronoWeekday, time: NaiveTime },
    /// Fires at the top of every hour.
    EveryHour,
    /// Fires at the top of every minute.
    EveryMinute,
    /// Fires on every evaluation tick.
    EverySecond,
}

impl Trigger {
    /// True if the trigger should fire at `now`.
    #[must_use]
    pub fn matches(&self, now: NaiveDateTime) -> bool {
        match self {
            Trigger::Daily { time } => same_second(now.time(), *time),
            Trigger::Weekday { time } => !is_weekend(now) && same_second(now.time(), *time),
            Trigger::Weekend { time } => is_weekend(now) && same_second(now.time(), *time),
            Trigger::DayOfWeek { day, time } => {
                now.weekday() == *day && same_second(now.time(), *time)
            }
            Trigger::EveryHour => now.minute() == 0 && now.second() == 0,
            Trigger::EveryMinute => now.second() == 0,
            Trigger::EverySecond => true,
        }
    }
}

/// Compare two times at one-second resolution.
fn same_second(a: NaiveTime, b: NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute() && a.second() == b.second()
}

fn is_weekend(now: NaiveDateTime) -> bool {
    matches!(now.weekday(), ChronoWeekday::Sat | ChronoWeekday::Sun)
}
