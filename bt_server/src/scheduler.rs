//! Daily tournament jobs driven by cron expressions (UTC).

use blast_tournament::Engine;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::{logging, metrics};

/// Midnight: create and start the day's tournament
pub const OPEN_DAILY_EXPR: &str = "0 0 0 * * *";
/// One minute before midnight: close the active tournament
pub const CLOSE_ACTIVE_EXPR: &str = "0 59 23 * * *";

#[derive(Debug, thiserror::Error)]
#[error("Invalid cron expression '{expression}': {reason}")]
pub struct ScheduleError {
    pub expression: String,
    pub reason: String,
}

/// A parsed cron schedule
#[derive(Debug, Clone)]
pub struct CronSchedule {
    schedule: Schedule,
    expression: String,
}

impl CronSchedule {
    /// Parse a six-field expression: `sec min hour day_of_month month day_of_week`
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let schedule = Schedule::from_str(expression).map_err(|e| ScheduleError {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            schedule,
            expression: expression.to_string(),
        })
    }

    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyJob {
    OpenDaily,
    CloseActive,
}

impl DailyJob {
    pub fn name(self) -> &'static str {
        match self {
            DailyJob::OpenDaily => "open_daily_tournament",
            DailyJob::CloseActive => "close_active_tournament",
        }
    }

    pub fn expression(self) -> &'static str {
        match self {
            DailyJob::OpenDaily => OPEN_DAILY_EXPR,
            DailyJob::CloseActive => CLOSE_ACTIVE_EXPR,
        }
    }

    pub fn schedule(self) -> Result<CronSchedule, ScheduleError> {
        CronSchedule::parse(self.expression())
    }

    /// Run the job once. Returns a short outcome description.
    async fn run(self, engine: &Engine) -> Result<String, String> {
        match self {
            DailyJob::OpenDaily => engine
                .lifecycle()
                .create_and_start_daily()
                .await
                .map(|t| format!("tournament {} active", t.id))
                .map_err(|e| e.to_string()),
            DailyJob::CloseActive => match engine.lifecycle().close_active().await {
                Ok(Some((id, rewards))) => {
                    Ok(format!("tournament {} closed, {} rewards", id, rewards.len()))
                }
                Ok(None) => Ok("nothing to close".to_string()),
                Err(e) => Err(e.to_string()),
            },
        }
    }
}

/// Spawn one loop per daily job. Loops run until aborted.
pub fn spawn_daily_jobs(engine: Engine) -> Result<Vec<JoinHandle<()>>, ScheduleError> {
    [DailyJob::OpenDaily, DailyJob::CloseActive]
        .into_iter()
        .map(|job| {
            let schedule = job.schedule()?;
            Ok(tokio::spawn(run_job(job, schedule, engine.clone())))
        })
        .collect()
}

async fn run_job(job: DailyJob, schedule: CronSchedule, engine: Engine) {
    tracing::info!(job = job.name(), expression = schedule.expression(), "Job scheduled");
    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(now) else {
            tracing::warn!(job = job.name(), "Schedule has no further occurrences");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        let started = Instant::now();
        let result = job.run(&engine).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        metrics::scheduler_job_total(job.name(), result.is_ok());
        match result {
            Ok(outcome) => logging::log_job_run(job.name(), duration_ms, &outcome),
            Err(e) => tracing::error!(job = job.name(), error = %e, "Scheduled job failed"),
        }
    }
}
