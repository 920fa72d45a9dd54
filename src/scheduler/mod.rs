pub mod cron;

use crate::digest::DigestRunner;
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Daily trigger: sleeps until the next fire time and runs the digest.
pub struct Scheduler {
    schedule: ::cron::Schedule,
    expression: String,
    runner: Arc<DigestRunner>,
}

impl Scheduler {
    pub fn new(expression: &str, runner: Arc<DigestRunner>) -> Result<Self, ::cron::error::Error> {
        Ok(Self {
            schedule: cron::parse_schedule(expression)?,
            expression: expression.to_string(),
            runner,
        })
    }

    /// Next fire time after `now`, evaluated in the report time zone.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.runner.settings().timezone {
            Some(tz) => cron::next_fire(&self.schedule, &now.with_timezone(&tz)),
            None => cron::next_fire(&self.schedule, &now.with_timezone(&Local)),
        }
    }

    /// Run the trigger loop. Blocks forever (should be spawned).
    pub async fn run(self) {
        tracing::info!("Scheduler started (schedule: '{}')", self.expression);
        let mut last_fire: Option<DateTime<Utc>> = None;

        loop {
            let now = Utc::now();
            // Never fire the same slot twice if the wall clock lags the timer.
            let after = match last_fire {
                Some(last) if last > now => last,
                _ => now,
            };
            let Some(next) = self.next_fire_after(after) else {
                tracing::warn!("Schedule '{}' has no future runs, stopping", self.expression);
                return;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::info!(
                "Next summary run at {} (in {:.1} min)",
                next,
                wait.as_secs_f64() / 60.0
            );

            tokio::time::sleep(wait).await;
            last_fire = Some(next);
            let at = run_instant(next, Utc::now());
            self.runner.clone().run_isolated("scheduled", at).await;
        }
    }
}

/// The instant a fired slot reports on. A wall clock that still reads before
/// the slot must not select the previous window.
fn run_instant(slot: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    slot.max(now)
}
