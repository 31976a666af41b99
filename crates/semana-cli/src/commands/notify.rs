//! Proactive notification and reminder commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use semana_core::learning::ANALYSIS_WINDOW;
use semana_core::notify::{proactive_scan, ReminderPoller, SmartReminder};
use semana_core::storage::Database;

use super::user_id;

#[derive(Subcommand)]
pub enum NotifyAction {
    /// Scan tasks and feedback, inserting due notifications
    Scan,
    /// List recent notifications
    List,
    /// Schedule a reminder for a task
    Remind {
        /// Task ID
        task_id: String,
        /// When to remind (RFC 3339)
        at: String,
    },
    /// Fire due reminders once
    Tick,
}

pub fn run(action: NotifyAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let user = user_id();

    match action {
        NotifyAction::Scan => {
            let tasks = db.list_tasks(&user)?;
            let feedback = db.recent_feedback(&user, ANALYSIS_WINDOW)?;
            let drafts = proactive_scan(&user, &tasks, &feedback, Utc::now());

            let mut created = 0u32;
            for draft in &drafts {
                if db.insert_notification_unique(draft)? {
                    created += 1;
                }
            }
            println!("{}", serde_json::json!({ "notifications_created": created }));
        }
        NotifyAction::List => {
            let rows = db.list_notifications(&user, 20)?;
            for (kind, title, body, read) in rows {
                let marker = if read { " " } else { "*" };
                println!("{marker} [{kind}] {title} — {body}");
            }
        }
        NotifyAction::Remind { task_id, at } => {
            let remind_at = DateTime::parse_from_rfc3339(&at)?.with_timezone(&Utc);
            let reminder = SmartReminder::new(user.clone(), task_id, remind_at);
            db.insert_reminder(&reminder)?;
            println!("{}", serde_json::to_string_pretty(&reminder)?);
        }
        NotifyAction::Tick => {
            let mut poller = ReminderPoller::new(1);
            poller.start();
            let fired = poller.tick(&db, &user, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&fired)?);
        }
    }
    Ok(())
}
