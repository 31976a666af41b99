//! Proactive notifications and the smart-reminder poller.
//!
//! The scan walks the user's open tasks and recent feedback and drafts
//! notifications for due-soon, overdue, and stagnating work. The poller is an
//! explicit stateful object driven by caller ticks, with a re-entrancy guard
//! so an overlapping tick never double-fires a reminder.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::learning::FeedbackEvent;
use crate::metrics::{stagnation_risk, StagnationRisk};
use crate::storage::Database;
use crate::task::Task;

/// Kind of proactive notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DueSoon,
    Overdue,
    Stagnation,
}

/// A notification row to insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub task_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationDraft {
    fn new(
        user_id: &str,
        kind: NotificationKind,
        title: String,
        body: String,
        task_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            title,
            body,
            task_id,
            created_at: now,
        }
    }
}

/// Scan tasks and recent feedback for notification-worthy conditions.
///
/// Pure: returns drafts for the caller to insert (the store deduplicates per
/// task, kind, and day). Zero drafts is the normal quiet-day outcome.
pub fn proactive_scan(
    user_id: &str,
    tasks: &[Task],
    recent_feedback: &[FeedbackEvent],
    now: DateTime<Utc>,
) -> Vec<NotificationDraft> {
    let mut drafts = Vec::new();

    for task in tasks.iter().filter(|t| t.is_plannable()) {
        if task.is_overdue(now) {
            drafts.push(NotificationDraft::new(
                user_id,
                NotificationKind::Overdue,
                format!("Tarea vencida: {}", task.title),
                "Esta tarea ya pasó su fecha límite. Replanifícala o ciérrala.".to_string(),
                Some(task.id.clone()),
                now,
            ));
        } else if let Some(due) = task.due_date {
            if due - now <= Duration::hours(24) {
                drafts.push(NotificationDraft::new(
                    user_id,
                    NotificationKind::DueSoon,
                    format!("Vence pronto: {}", task.title),
                    format!("Vence el {}. Resérvale un hueco hoy.", due.format("%d/%m %H:%M")),
                    Some(task.id.clone()),
                    now,
                ));
            }
        }
    }

    let has_open_tasks = tasks.iter().any(|t| t.is_plannable());
    let last_feedback = recent_feedback.iter().map(|e| e.created_at).max();
    if has_open_tasks && stagnation_risk(last_feedback, now) == StagnationRisk::High {
        drafts.push(NotificationDraft::new(
            user_id,
            NotificationKind::Stagnation,
            "Llevas días sin actividad".to_string(),
            "Tus tareas siguen abiertas. Una sesión corta basta para retomar el ritmo."
                .to_string(),
            None,
            now,
        ));
    }

    drafts
}

/// A scheduled reminder row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartReminder {
    pub id: String,
    pub user_id: String,
    pub task_id: String,
    pub remind_at: DateTime<Utc>,
    pub fired: bool,
}

impl SmartReminder {
    pub fn new(user_id: impl Into<String>, task_id: impl Into<String>, remind_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            task_id: task_id.into(),
            remind_at,
            fired: false,
        }
    }
}

/// Caller-ticked reminder poller.
///
/// Owns its lifecycle (`start`/`stop`) and an internal re-entrancy guard;
/// `tick` is cheap to call from any periodic driver and fires each due
/// reminder at most once.
pub struct ReminderPoller {
    interval_minutes: i64,
    running: bool,
    checking: bool,
    last_tick: Option<DateTime<Utc>>,
}

impl ReminderPoller {
    pub fn new(interval_minutes: u32) -> Self {
        Self {
            interval_minutes: interval_minutes.max(1) as i64,
            running: false,
            checking: false,
            last_tick: None,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Fire reminders due at `now`, marking each as fired in the store.
    ///
    /// Returns an empty list when stopped, when a tick is already in flight,
    /// or when called again before the polling interval has elapsed.
    ///
    /// # Errors
    /// Propagates store failures; the guard is always released.
    pub fn tick(
        &mut self,
        db: &Database,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SmartReminder>> {
        if !self.running || self.checking {
            return Ok(Vec::new());
        }
        if let Some(last) = self.last_tick {
            if now - last < Duration::minutes(self.interval_minutes) {
                return Ok(Vec::new());
            }
        }

        self.checking = true;
        let result = self.fire_due(db, user_id, now);
        self.checking = false;
        self.last_tick = Some(now);
        result
    }

    fn fire_due(
        &self,
        db: &Database,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SmartReminder>> {
        let due = db.due_reminders(user_id, now)?;
        for reminder in &due {
            db.mark_reminder_fired(&reminder.id)?;
        }
        Ok(due)
    }
}
