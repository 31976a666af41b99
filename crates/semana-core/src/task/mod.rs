//! Task, work session, and project types.
//!
//! Tasks form a 3-level tree (main task → subtask → microtask). The level of
//! a task must stay consistent with its `parent_task_id` chain, and parent
//! progress is always derived from child statuses, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has been created but not started
    Pending,
    /// Task is actively being worked on
    InProgress,
    /// Task is completed (terminal state)
    Completed,
    /// Task was cancelled (terminal state)
    Cancelled,
}

impl TaskStatus {
    /// Whether this status counts as open work.
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Numeric weight used for queue ordering (higher schedules first).
    pub fn weight(&self) -> u8 {
        match self {
            TaskPriority::Low => 1,
            TaskPriority::Medium => 2,
            TaskPriority::High => 3,
            TaskPriority::Urgent => 4,
        }
    }

    /// Energy a task of this priority typically demands.
    pub fn energy_requirement(&self) -> EnergyLevel {
        match self {
            TaskPriority::Urgent | TaskPriority::High => EnergyLevel::High,
            TaskPriority::Medium => EnergyLevel::Medium,
            TaskPriority::Low => EnergyLevel::Low,
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// Energy level for task scheduling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    /// Low energy (e.g., end of day)
    Low,
    /// Medium energy (default)
    Medium,
    /// High energy (e.g., morning)
    High,
}

impl Default for EnergyLevel {
    fn default() -> Self {
        EnergyLevel::Medium
    }
}

/// Position of a task in the 3-level tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TaskLevel {
    /// Top-level main task
    Main,
    /// Child of a main task
    Subtask,
    /// Child of a subtask
    Microtask,
}

impl TaskLevel {
    /// Numeric level (1-3), matching the stored representation.
    pub fn depth(&self) -> u8 {
        match self {
            TaskLevel::Main => 1,
            TaskLevel::Subtask => 2,
            TaskLevel::Microtask => 3,
        }
    }

    /// Level from its numeric form.
    pub fn from_depth(depth: u8) -> Option<Self> {
        match depth {
            1 => Some(TaskLevel::Main),
            2 => Some(TaskLevel::Subtask),
            3 => Some(TaskLevel::Microtask),
            _ => None,
        }
    }

    /// The level a direct child of this level must have.
    pub fn child_level(&self) -> Option<TaskLevel> {
        match self {
            TaskLevel::Main => Some(TaskLevel::Subtask),
            TaskLevel::Subtask => Some(TaskLevel::Microtask),
            TaskLevel::Microtask => None,
        }
    }
}

impl Default for TaskLevel {
    fn default() -> Self {
        TaskLevel::Main
    }
}

/// A task record.
///
/// Tasks are soft-deleted via the `archived` flag rather than removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Task title
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Priority
    pub priority: TaskPriority,
    /// Due date (null when the task has no deadline)
    pub due_date: Option<DateTime<Utc>>,
    /// Estimated duration in minutes (null if not set)
    pub estimated_minutes: Option<u32>,
    /// Actual logged duration in minutes
    pub actual_minutes: Option<u32>,
    /// Optional project ID
    pub project_id: Option<String>,
    /// Parent task ID when this task is a subtask or microtask
    pub parent_task_id: Option<String>,
    /// Level in the task tree
    pub level: TaskLevel,
    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Soft-delete flag
    #[serde(default)]
    pub archived: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Completion timestamp (null if not completed)
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending main task.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            due_date: None,
            estimated_minutes: None,
            actual_minutes: None,
            project_id: None,
            parent_task_id: None,
            level: TaskLevel::Main,
            tags: Vec::new(),
            archived: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Whether the task is past its due date at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && self.due_date.is_some_and(|due| due < now)
    }

    /// Whether the task is due on the same calendar day as `now`.
    pub fn is_due_today(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && self.due_date.is_some_and(|due| due.date_naive() == now.date_naive())
    }

    /// Whether the task participates in scheduling and recommendations.
    pub fn is_plannable(&self) -> bool {
        self.status.is_open() && !self.archived
    }
}

/// A logged unit of work, optionally attached to a task.
///
/// Immutable once ended, except for `notes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: String,
    pub task_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: u32,
    /// Self-reported productivity, 1 (worst) to 5 (best)
    pub productivity_score: Option<u8>,
    pub notes: Option<String>,
}

impl WorkSession {
    /// Start a session at `started_at`.
    pub fn start(task_id: Option<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id,
            started_at,
            ended_at: None,
            duration_minutes: 0,
            productivity_score: None,
            notes: None,
        }
    }

    /// End the session, fixing its duration.
    ///
    /// # Errors
    /// Returns an error if `ended_at` is not after `started_at`.
    pub fn end(
        &mut self,
        ended_at: DateTime<Utc>,
        productivity_score: Option<u8>,
    ) -> Result<(), ValidationError> {
        if ended_at <= self.started_at {
            return Err(ValidationError::InvalidTimeRange {
                start: self.started_at,
                end: ended_at,
            });
        }
        self.ended_at = Some(ended_at);
        self.duration_minutes = (ended_at - self.started_at).num_minutes().max(0) as u32;
        self.productivity_score = productivity_score.map(|s| s.clamp(1, 5));
        Ok(())
    }
}

/// Project status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
    Archived,
}

/// A project grouping tasks under a shared deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            status: ProjectStatus::Active,
            deadline: None,
            created_at: Utc::now(),
        }
    }
}

/// Validate the 3-level tree invariant over a task set.
///
/// Every task's level must match its parent chain: main tasks have no parent,
/// subtasks hang off main tasks, microtasks hang off subtasks.
///
/// # Errors
/// Returns the first violation found.
pub fn validate_hierarchy(tasks: &[Task]) -> Result<(), ValidationError> {
    let by_id: std::collections::HashMap<&str, &Task> =
        tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    for task in tasks {
        match (&task.parent_task_id, task.level) {
            (None, TaskLevel::Main) => {}
            (None, level) => {
                return Err(ValidationError::InvalidHierarchy {
                    task_id: task.id.clone(),
                    message: format!("level {:?} requires a parent task", level),
                });
            }
            (Some(parent_id), level) => {
                let parent = by_id.get(parent_id.as_str()).ok_or_else(|| {
                    ValidationError::InvalidHierarchy {
                        task_id: task.id.clone(),
                        message: format!("parent '{parent_id}' not found"),
                    }
                })?;
                if parent.level.child_level() != Some(level) {
                    return Err(ValidationError::InvalidHierarchy {
                        task_id: task.id.clone(),
                        message: format!(
                            "level {:?} cannot be a child of {:?}",
                            level, parent.level
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Derived completion progress (0-100) for a task, rolled up from children.
///
/// Leaves report 100 when completed, 0 otherwise. A parent's progress is the
/// mean of its direct children's progress.
pub fn overall_progress(task: &Task, all_tasks: &[Task]) -> u8 {
    let children: Vec<&Task> = all_tasks
        .iter()
        .filter(|t| t.parent_task_id.as_deref() == Some(task.id.as_str()) && !t.archived)
        .collect();

    if children.is_empty() {
        return if task.status == TaskStatus::Completed { 100 } else { 0 };
    }

    let sum: u32 = children
        .iter()
        .map(|c| overall_progress(c, all_tasks) as u32)
        .sum();
    (sum / children.len() as u32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_of(parent: &Task, level: TaskLevel) -> Task {
        let mut t = Task::new("child");
        t.parent_task_id = Some(parent.id.clone());
        t.level = level;
        t
    }

    #[test]
    fn test_valid_three_level_tree() {
        let main = Task::new("main");
        let sub = child_of(&main, TaskLevel::Subtask);
        let micro = child_of(&sub, TaskLevel::Microtask);
        assert!(validate_hierarchy(&[main, sub, micro]).is_ok());
    }

    #[test]
    fn test_microtask_under_main_is_rejected() {
        let main = Task::new("main");
        let micro = child_of(&main, TaskLevel::Microtask);
        assert!(validate_hierarchy(&[main, micro]).is_err());
    }

    #[test]
    fn test_subtask_without_parent_is_rejected() {
        let mut orphan = Task::new("orphan");
        orphan.level = TaskLevel::Subtask;
        assert!(validate_hierarchy(&[orphan]).is_err());
    }

    #[test]
    fn test_progress_rolls_up_from_children() {
        let main = Task::new("main");
        let mut a = child_of(&main, TaskLevel::Subtask);
        let b = child_of(&main, TaskLevel::Subtask);
        a.status = TaskStatus::Completed;

        let tasks = vec![main.clone(), a, b];
        assert_eq!(overall_progress(&tasks[0], &tasks), 50);
    }

    #[test]
    fn test_leaf_progress_follows_status() {
        let mut t = Task::new("leaf");
        assert_eq!(overall_progress(&t, &[t.clone()]), 0);
        t.status = TaskStatus::Completed;
        assert_eq!(overall_progress(&t, std::slice::from_ref(&t)), 100);
    }

    #[test]
    fn test_session_end_fixes_duration() {
        let start = Utc::now();
        let mut session = WorkSession::start(None, start);
        session
            .end(start + chrono::Duration::minutes(25), Some(4))
            .unwrap();
        assert_eq!(session.duration_minutes, 25);
        assert_eq!(session.productivity_score, Some(4));
    }

    #[test]
    fn test_session_end_before_start_is_rejected() {
        let start = Utc::now();
        let mut session = WorkSession::start(None, start);
        assert!(session.end(start - chrono::Duration::minutes(1), None).is_err());
    }

    #[test]
    fn test_overdue_only_applies_to_open_tasks() {
        let now = Utc::now();
        let mut t = Task::new("t");
        t.due_date = Some(now - chrono::Duration::hours(1));
        assert!(t.is_overdue(now));
        t.status = TaskStatus::Completed;
        assert!(!t.is_overdue(now));
    }
}
