//! Context analysis command.

use chrono::Utc;
use clap::Subcommand;
use semana_core::context::{ContextAnalyzer, ContextSnapshot};
use semana_core::storage::{Config, Database};

use super::user_id;

#[derive(Subcommand)]
pub enum ContextAction {
    /// Analyze the current workload
    Analyze,
}

pub fn run(action: ContextAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let user = user_id();

    match action {
        ContextAction::Analyze => {
            let tasks = db.list_tasks(&user)?;
            let projects = db.list_projects(&user)?;
            let sessions = db.sessions_since(&user, 30)?;
            let config = Config::load()?;

            let snapshot = ContextSnapshot {
                user_name: Some(user.as_str()),
                tasks: &tasks,
                projects: &projects,
                sessions: &sessions,
                has_productivity_data: sessions.iter().any(|s| s.productivity_score.is_some()),
                has_work_pattern: config.planner.is_customized(),
                now: Utc::now(),
            };
            let analysis = ContextAnalyzer::analyze(&snapshot);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
    }
    Ok(())
}
