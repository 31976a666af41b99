//! Project management commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use semana_core::storage::Database;
use semana_core::task::{Project, ProjectStatus};

use super::user_id;

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a new project
    Create {
        /// Project name
        name: String,
        /// Deadline (RFC 3339)
        #[arg(long)]
        deadline: Option<String>,
    },
    /// List projects
    List,
    /// Mark a project completed
    Complete {
        /// Project ID
        id: String,
    },
}

pub fn run(action: ProjectAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let user = user_id();

    match action {
        ProjectAction::Create { name, deadline } => {
            let mut project = Project::new(name);
            project.deadline = deadline
                .map(|raw| DateTime::parse_from_rfc3339(&raw).map(|d| d.with_timezone(&Utc)))
                .transpose()?;
            db.upsert_project(&user, &project)?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        ProjectAction::List => {
            let projects = db.list_projects(&user)?;
            println!("{}", serde_json::to_string_pretty(&projects)?);
        }
        ProjectAction::Complete { id } => {
            let mut projects = db.list_projects(&user)?;
            let project = projects
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| format!("project '{id}' not found"))?;
            project.status = ProjectStatus::Completed;
            db.upsert_project(&user, project)?;
            println!("{}", serde_json::to_string_pretty(project)?);
        }
    }
    Ok(())
}
