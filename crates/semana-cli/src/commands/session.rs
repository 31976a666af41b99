//! Work session logging commands.

use chrono::{Duration, Utc};
use clap::Subcommand;
use semana_core::storage::Database;
use semana_core::task::WorkSession;

use super::user_id;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Log a finished work session
    Log {
        /// Duration in minutes
        minutes: u32,
        /// Task the session belongs to
        #[arg(long)]
        task_id: Option<String>,
        /// Productivity score 1-5
        #[arg(long)]
        score: Option<u8>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List sessions from the last 30 days
    List,
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let user = user_id();

    match action {
        SessionAction::Log {
            minutes,
            task_id,
            score,
            notes,
        } => {
            let ended_at = Utc::now();
            let started_at = ended_at - Duration::minutes(minutes.max(1) as i64);
            let mut session = WorkSession::start(task_id, started_at);
            session.end(ended_at, score)?;
            session.notes = notes;
            db.insert_session(&user, &session)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::List => {
            let sessions = db.sessions_since(&user, 30)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
