// src/scheduler/jobs.rs
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use chrono_tz::Tz;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Daily(NaiveTime),
    Weekly(Weekday, NaiveTime),
    Every(Duration),
}

impl Trigger {
    /// First run strictly after `from`.
    pub fn next_after(&self, from: DateTime<Tz>) -> DateTime<Tz> {
        let tz = from.timezone();
        match *self {
            Trigger::Every(interval) => from + interval,
            Trigger::Daily(at) => {
                let today = localize(&tz, from.date_naive().and_time(at));
                if today > from {
                    today
                } else {
                    localize(&tz, (from.date_naive() + Duration::days(1)).and_time(at))
                }
            }
            Trigger::Weekly(day, at) => {
                let date = from.date_naive();
                let ahead = (7 + day.num_days_from_monday() as i64
                    - date.weekday().num_days_from_monday() as i64)
                    % 7;
                let candidate = localize(&tz, (date + Duration::days(ahead)).and_time(at));
                if candidate > from {
                    candidate
                } else {
                    localize(&tz, (date + Duration::days(ahead + 7)).and_time(at))
                }
            }
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Trigger::Daily(at) => write!(f, "daily at {}", at.format("%H:%M")),
            Trigger::Weekly(day, at) => write!(f, "every {} at {}", day, at.format("%H:%M")),
            Trigger::Every(interval) => write!(f, "every {} minutes", interval.num_minutes()),
        }
    }
}

/// Resolves a wall-clock time in `tz`. A time skipped by a DST jump moves
/// forward to the first valid instant; an ambiguous one takes the earlier.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    for shift in 0..=3 {
        let candidate = naive + Duration::minutes(30 * shift);
        if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
            return dt;
        }
    }
    tz.from_utc_datetime(&naive)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    FetchNews,
    FetchPapers,
    FetchStocks,
}

impl JobAction {
    pub fn name(&self) -> &'static str {
        match self {
            JobAction::FetchNews => "fetch AI news",
            JobAction::FetchPapers => "fetch research papers",
            JobAction::FetchStocks => "fetch stock data",
        }
    }

    /// Directory under the data root that receives this action's markers.
    pub fn marker_dir(&self) -> &'static str {
        match self {
            JobAction::FetchNews => "news",
            JobAction::FetchPapers => "papers",
            JobAction::FetchStocks => "stocks",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub trigger: Trigger,
    pub action: JobAction,
    pub next_run: DateTime<Tz>,
    pub last_run: Option<DateTime<Tz>>,
}

impl ScheduledJob {
    pub fn new(trigger: Trigger, action: JobAction, now: DateTime<Tz>) -> Self {
        Self {
            trigger,
            action,
            next_run: trigger.next_after(now),
            last_run: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Tz>) -> bool {
        now >= self.next_run
    }

    pub fn mark_ran(&mut self, at: DateTime<Tz>) {
        self.last_run = Some(at);
        self.next_run = self.trigger.next_after(at);
    }
}
