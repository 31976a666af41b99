//! Task management commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use semana_core::storage::Database;
use semana_core::task::{validate_hierarchy, Task, TaskLevel, TaskStatus};

use super::{parse_priority, user_id};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Priority: low, medium, high, urgent
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Due date (RFC 3339, e.g. 2025-03-14T17:00:00Z)
        #[arg(long)]
        due: Option<String>,
        /// Estimated duration in minutes
        #[arg(long)]
        estimate: Option<u32>,
        /// Project ID to associate with
        #[arg(long)]
        project_id: Option<String>,
        /// Parent task ID (creates a subtask or microtask)
        #[arg(long)]
        parent: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// List open tasks
    List,
    /// Mark a task as started
    Start {
        /// Task ID
        id: String,
    },
    /// Mark a task as completed
    Complete {
        /// Task ID
        id: String,
        /// Actual duration in minutes
        #[arg(long)]
        actual: Option<u32>,
    },
    /// Archive a task (soft delete)
    Archive {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let user = user_id();

    match action {
        TaskAction::Create {
            title,
            description,
            priority,
            due,
            estimate,
            project_id,
            parent,
            tags,
        } => {
            let mut task = Task::new(title);
            task.description = description;
            task.priority = parse_priority(&priority)?;
            task.due_date = due
                .map(|raw| DateTime::parse_from_rfc3339(&raw).map(|d| d.with_timezone(&Utc)))
                .transpose()?;
            task.estimated_minutes = estimate;
            task.project_id = project_id;
            task.tags = tags
                .map(|raw| raw.split(',').map(|t| t.trim().to_string()).collect())
                .unwrap_or_default();

            if let Some(parent_id) = parent {
                let parent_task = db
                    .get_task(&user, &parent_id)?
                    .ok_or_else(|| format!("parent task '{parent_id}' not found"))?;
                task.parent_task_id = Some(parent_id);
                task.level = parent_task
                    .level
                    .child_level()
                    .ok_or("microtasks cannot have children")?;

                // Check the invariant against the stored tree before writing.
                let mut all = db.list_tasks(&user)?;
                all.push(task.clone());
                validate_hierarchy(&all)?;
            } else {
                task.level = TaskLevel::Main;
            }

            db.upsert_task(&user, &task)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List => {
            let tasks = db.list_tasks(&user)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Start { id } => {
            let mut task = db
                .get_task(&user, &id)?
                .ok_or_else(|| format!("task '{id}' not found"))?;
            task.status = TaskStatus::InProgress;
            db.upsert_task(&user, &task)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Complete { id, actual } => {
            let mut task = db
                .get_task(&user, &id)?
                .ok_or_else(|| format!("task '{id}' not found"))?;
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now());
            if actual.is_some() {
                task.actual_minutes = actual;
            }
            db.upsert_task(&user, &task)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Archive { id } => {
            db.archive_task(&user, &id)?;
            println!("archived {id}");
        }
    }
    Ok(())
}
