//! Background retention sweeper
//!
//! Deletes events older than the retention window. First run happens at a
//! fixed local wall-clock hour, then every 24 hours. Deleting events can
//! invalidate outstanding read cursors; the read path reports that as a
//! full-resync condition, so nothing here needs to coordinate with readers.

use chrono::{DateTime, Datelike, Duration, Local, TimeZone, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::repository::EventLogRepository;

pub struct RetentionSweeper {
    log: EventLogRepository,
    retention_days: i64,
    sweep_hour_local: u32,
}

impl RetentionSweeper {
    pub fn new(log: EventLogRepository, retention_days: i64, sweep_hour_local: u32) -> Self {
        Self {
            log,
            retention_days,
            sweep_hour_local,
        }
    }

    /// Spawn the sweep loop. Flipping the shutdown channel stops the loop at
    /// the next sleep point; an in-flight sweep always completes first.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut next_run = next_run_after(Local::now(), self.sweep_hour_local);
            tracing::info!(
                retention_days = self.retention_days,
                next_run = %next_run,
                "Retention sweeper started"
            );

            loop {
                let wait = (next_run - Local::now())
                    .to_std()
                    .unwrap_or(std::time::Duration::ZERO);

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown.changed() => {
                        tracing::info!("Retention sweeper shutting down");
                        return;
                    }
                }

                self.sweep().await;
                next_run += Duration::hours(24);
            }
        })
    }

    /// One sweep pass. Not cancellable by design.
    pub async fn sweep(&self) {
        let cutoff = (Utc::now() - Duration::days(self.retention_days)).timestamp();
        match self.log.delete_older_than(cutoff).await {
            Ok(deleted) => {
                tracing::info!(deleted, cutoff, "Retention sweep completed");
            }
            Err(e) => {
                tracing::error!(error = %e, "Retention sweep failed");
            }
        }
    }
}

/// Next occurrence of `hour:00` strictly after `now`.
fn next_run_after(now: DateTime<Local>, hour: u32) -> DateTime<Local> {
    let today_run = Local
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour, 0, 0)
        .single()
        .unwrap_or(now);

    if today_run > now {
        today_run
    } else {
        today_run + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_run_later_today() {
        let now = Local.with_ymd_and_hms(2026, 3, 10, 1, 15, 0).unwrap();
        let next = next_run_after(now, 2);
        assert_eq!(next, Local.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Local.with_ymd_and_hms(2026, 3, 10, 2, 0, 1).unwrap();
        let next = next_run_after(now, 2);
        assert_eq!(next, Local.with_ymd_and_hms(2026, 3, 11, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_exactly_at_hour_rolls_over() {
        let now = Local.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).unwrap();
        let next = next_run_after(now, 2);
        assert_eq!(next, Local.with_ymd_and_hms(2026, 3, 11, 2, 0, 0).unwrap());
    }
}
