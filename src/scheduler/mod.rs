//! Periodic trigger process.
//!
//! Holds a fixed list of (trigger, action) jobs, runs every action once at
//! startup, then checks once per poll for jobs that are due. A failed action
//! is logged and forgotten; it never delays or cancels the next run.

mod clock;
mod jobs;
mod runner;

pub use clock::{Clock, ManualClock, SystemClock};
pub use jobs::{localize, JobAction, ScheduledJob, Trigger};
pub use runner::{marker_file_name, write_marker, TriggerRunner};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Weekday};
use chrono_tz::Tz;
use log::{error, info};

pub const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, action: JobAction) -> Result<()>;
}

pub struct Scheduler<C: Clock> {
    clock: C,
    jobs: Vec<ScheduledJob>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            jobs: Vec::new(),
        }
    }

    /// The news / papers / stocks schedule.
    pub fn with_standard_jobs(clock: C) -> Self {
        let mut scheduler = Self::new(clock);
        for (trigger, action) in standard_jobs() {
            scheduler.add(trigger, action);
        }
        scheduler
    }

    pub fn add(&mut self, trigger: Trigger, action: JobAction) -> &mut Self {
        let job = ScheduledJob::new(trigger, action, self.clock.now());
        info!("Scheduled {} {}, first run at {}", job.action.name(), trigger, job.next_run);
        self.jobs.push(job);
        self
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    pub fn next_run(&self) -> Option<chrono::DateTime<Tz>> {
        self.jobs.iter().map(|j| j.next_run).min()
    }

    /// Runs every job once without touching its schedule.
    pub async fn run_all<R: JobRunner + ?Sized>(&self, runner: &R) -> usize {
        for job in &self.jobs {
            execute(runner, job.action).await;
        }
        self.jobs.len()
    }

    /// Runs each due job in registration order and reschedules it. Returns
    /// how many ran.
    pub async fn run_pending<R: JobRunner + ?Sized>(&mut self, runner: &R) -> usize {
        let now = self.clock.now();
        let mut ran = 0;
        for job in self.jobs.iter_mut().filter(|j| j.is_due(now)) {
            execute(runner, job.action).await;
            job.mark_ran(now);
            ran += 1;
        }
        ran
    }
}

async fn execute<R: JobRunner + ?Sized>(runner: &R, action: JobAction) {
    info!("Running scheduled task: {}", action.name());
    match runner.run(action).await {
        Ok(()) => info!("Scheduled task finished: {}", action.name()),
        Err(e) => error!("Error in scheduled task {}: {:#}", action.name(), e),
    }
}

pub fn standard_jobs() -> Vec<(Trigger, JobAction)> {
    let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
    vec![
        (Trigger::Daily(at(3, 0)), JobAction::FetchNews),
        (Trigger::Weekly(Weekday::Fri, at(20, 0)), JobAction::FetchPapers),
        (Trigger::Every(Duration::hours(6)), JobAction::FetchStocks),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::TimeZone;
    use chrono_tz::UTC;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<JobAction>>,
        fail: bool,
    }

    #[async_trait]
    impl JobRunner for Recorder {
        async fn run(&self, action: JobAction) -> Result<()> {
            self.calls.lock().unwrap().push(action);
            if self.fail {
                Err(anyhow!("connection refused"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn startup_runs_everything_once_without_rescheduling() {
        let clock = ManualClock::new(UTC.with_ymd_and_hms(2025, 4, 21, 0, 0, 0).unwrap());
        let scheduler = Scheduler::with_standard_jobs(clock);
        let before: Vec<_> = scheduler.jobs().iter().map(|j| j.next_run).collect();

        let recorder = Recorder::default();
        assert_eq!(scheduler.run_all(&recorder).await, 3);
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec![JobAction::FetchNews, JobAction::FetchPapers, JobAction::FetchStocks]
        );
        let after: Vec<_> = scheduler.jobs().iter().map(|j| j.next_run).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn one_simulated_day_of_minute_ticks() {
        let start = UTC.with_ymd_and_hms(2025, 4, 21, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let mut scheduler = Scheduler::with_standard_jobs(clock.clone());
        let recorder = Recorder::default();

        let mut news_at = Vec::new();
        for _ in 0..24 * 60 {
            clock.advance(Duration::minutes(1));
            let before = recorder.calls.lock().unwrap().len();
            scheduler.run_pending(&recorder).await;
            let calls = recorder.calls.lock().unwrap();
            if calls[before..].contains(&JobAction::FetchNews) {
                news_at.push(clock.now());
            }
        }

        let calls = recorder.calls.lock().unwrap();
        let count = |a: JobAction| calls.iter().filter(|c| **c == a).count();
        assert_eq!(news_at, vec![UTC.with_ymd_and_hms(2025, 4, 21, 3, 0, 0).unwrap()]);
        assert_eq!(count(JobAction::FetchStocks), 4);
        assert_eq!(count(JobAction::FetchPapers), 0);
    }

    #[tokio::test]
    async fn papers_run_on_friday_evening() {
        let start = UTC.with_ymd_and_hms(2025, 4, 21, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let mut scheduler = Scheduler::new(clock.clone());
        let eight = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        scheduler.add(Trigger::Weekly(Weekday::Fri, eight), JobAction::FetchPapers);

        let recorder = Recorder::default();
        clock.set(UTC.with_ymd_and_hms(2025, 4, 25, 19, 59, 0).unwrap());
        assert_eq!(scheduler.run_pending(&recorder).await, 0);
        clock.set(UTC.with_ymd_and_hms(2025, 4, 25, 20, 0, 0).unwrap());
        assert_eq!(scheduler.run_pending(&recorder).await, 1);
        assert_eq!(
            scheduler.next_run(),
            Some(UTC.with_ymd_and_hms(2025, 5, 2, 20, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn failures_do_not_disturb_the_next_tick() {
        let start = UTC.with_ymd_and_hms(2025, 4, 21, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let mut scheduler = Scheduler::new(clock.clone());
        scheduler.add(Trigger::Every(Duration::minutes(1)), JobAction::FetchNews);

        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        for _ in 0..3 {
            clock.advance(Duration::minutes(1));
            assert_eq!(scheduler.run_pending(&recorder).await, 1);
        }
        assert_eq!(recorder.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn coinciding_jobs_both_run_in_one_tick() {
        let clock = ManualClock::new(UTC.with_ymd_and_hms(2025, 4, 21, 0, 0, 0).unwrap());
        let mut scheduler = Scheduler::new(clock.clone());
        let three = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        scheduler
            .add(Trigger::Daily(three), JobAction::FetchNews)
            .add(Trigger::Every(Duration::hours(3)), JobAction::FetchStocks);

        clock.advance(Duration::hours(3));
        let recorder = Recorder::default();
        assert_eq!(scheduler.run_pending(&recorder).await, 2);
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec![JobAction::FetchNews, JobAction::FetchStocks]
        );
    }

    #[test]
    fn next_run_is_the_earliest_job() {
        let clock = ManualClock::new(UTC.with_ymd_and_hms(2025, 4, 21, 0, 0, 0).unwrap());
        let scheduler = Scheduler::with_standard_jobs(clock);
        assert_eq!(
            scheduler.next_run(),
            Some(UTC.with_ymd_and_hms(2025, 4, 21, 3, 0, 0).unwrap())
        );
    }
}
