//! Units of periodic work.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use itrack_core::{ReminderRepository, Result};
use itrack_db::Database;

/// One idempotent unit of periodic work.
///
/// Running it twice for the same instant must not change the outcome, so the
/// runner can skip or repeat ticks freely.
#[async_trait]
pub trait SweepTask: Send + Sync {
    /// Name used in logs and events.
    fn name(&self) -> &'static str;

    /// Run once. Returns how many records were touched.
    async fn run_once(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Marks reminders whose date has passed as sent.
pub struct ReminderSweep {
    reminders: Arc<dyn ReminderRepository>,
}

impl ReminderSweep {
    pub fn new(reminders: Arc<dyn ReminderRepository>) -> Self {
        Self { reminders }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(Arc::new(db.reminders.clone()))
    }
}

#[async_trait]
impl SweepTask for ReminderSweep {
    fn name(&self) -> &'static str {
        "reminder_sweep"
    }

    async fn run_once(&self, now: DateTime<Utc>) -> Result<u64> {
        self.reminders.mark_due_sent(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use itrack_core::{CreateReminderRequest, Error, Reminder};
    use uuid::Uuid;

    /// Records the instants it was asked to sweep.
    #[derive(Default)]
    struct RecordingReminders {
        calls: Mutex<Vec<DateTime<Utc>>>,
    }

    #[async_trait]
    impl ReminderRepository for RecordingReminders {
        async fn list(&self, _user_id: Uuid, _application_id: Uuid) -> Result<Vec<Reminder>> {
            Ok(Vec::new())
        }

        async fn create(
            &self,
            _user_id: Uuid,
            _application_id: Uuid,
            _req: CreateReminderRequest,
        ) -> Result<Reminder> {
            Err(Error::Internal("not used".into()))
        }

        async fn mark_due_sent(&self, now: DateTime<Utc>) -> Result<u64> {
            self.calls.lock().unwrap().push(now);
            Ok(3)
        }
    }

    #[tokio::test]
    async fn test_reminder_sweep_passes_instant_through() {
        let repo = Arc::new(RecordingReminders::default());
        let sweep = ReminderSweep::new(repo.clone());
        let now = Utc::now();

        assert_eq!(sweep.run_once(now).await.unwrap(), 3);
        assert_eq!(repo.calls.lock().unwrap().as_slice(), &[now]);
        assert_eq!(sweep.name(), "reminder_sweep");
    }
}
