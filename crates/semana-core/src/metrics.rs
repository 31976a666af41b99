//! Activity metrics derived from the current task/session/project state.
//!
//! Pure counting over in-memory records; empty input yields zeroed metrics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Project, ProjectStatus, Task, TaskPriority, TaskStatus, WorkSession};

/// Window ahead of `now` in which a project deadline counts as approaching.
const DEADLINE_WINDOW_DAYS: i64 = 7;

/// Snapshot of activity-derived counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActivityMetrics {
    /// Open tasks past their due date
    pub overdue_tasks: u32,
    /// Open tasks with urgent priority
    pub urgent_tasks: u32,
    /// Completed / total ratio over non-archived tasks (0.0-1.0)
    pub completion_rate: f64,
    /// Hours since the last logged work session (or last completion)
    pub work_session_gap_hours: f64,
    /// Active projects whose deadline falls within the next 7 days
    pub project_deadlines: u32,
}

impl ActivityMetrics {
    /// Collect metrics from the current records at `now`.
    pub fn collect(
        tasks: &[Task],
        projects: &[Project],
        sessions: &[WorkSession],
        now: DateTime<Utc>,
    ) -> Self {
        let visible: Vec<&Task> = tasks.iter().filter(|t| !t.archived).collect();

        let overdue_tasks = visible.iter().filter(|t| t.is_overdue(now)).count() as u32;
        let urgent_tasks = visible
            .iter()
            .filter(|t| t.status.is_open() && t.priority == TaskPriority::Urgent)
            .count() as u32;

        let completion_rate = if visible.is_empty() {
            0.0
        } else {
            let done = visible
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count();
            done as f64 / visible.len() as f64
        };

        let work_session_gap_hours = last_activity(&visible, sessions)
            .map(|last| ((now - last).num_minutes().max(0) as f64) / 60.0)
            .unwrap_or(0.0);

        let horizon = now + Duration::days(DEADLINE_WINDOW_DAYS);
        let project_deadlines = projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Active)
            .filter(|p| p.deadline.is_some_and(|d| d > now && d <= horizon))
            .count() as u32;

        Self {
            overdue_tasks,
            urgent_tasks,
            completion_rate,
            work_session_gap_hours,
            project_deadlines,
        }
    }
}

fn last_activity(tasks: &[&Task], sessions: &[WorkSession]) -> Option<DateTime<Utc>> {
    let last_session = sessions
        .iter()
        .map(|s| s.ended_at.unwrap_or(s.started_at))
        .max();
    let last_completion = tasks.iter().filter_map(|t| t.completed_at).max();
    last_session.max(last_completion)
}

/// How long a task hierarchy has gone without logged activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StagnationRisk {
    Low,
    Medium,
    High,
}

/// Classify stagnation from the last activity timestamp.
///
/// Under 48h is low, under 120h medium, beyond that high. No recorded
/// activity at all counts as high.
pub fn stagnation_risk(last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> StagnationRisk {
    match last_activity {
        None => StagnationRisk::High,
        Some(last) => {
            let hours = (now - last).num_hours();
            if hours < 48 {
                StagnationRisk::Low
            } else if hours < 120 {
                StagnationRisk::Medium
            } else {
                StagnationRisk::High
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task_due(now: DateTime<Utc>, hours_from_now: i64) -> Task {
        let mut t = Task::new("t");
        t.due_date = Some(now + Duration::hours(hours_from_now));
        t
    }

    #[test]
    fn test_empty_input_yields_zeroed_metrics() {
        let m = ActivityMetrics::collect(&[], &[], &[], Utc::now());
        assert_eq!(m, ActivityMetrics::default());
    }

    #[test]
    fn test_overdue_and_urgent_counts() {
        let now = Utc::now();
        let overdue = task_due(now, -2);
        let mut urgent = Task::new("u");
        urgent.priority = TaskPriority::Urgent;

        let m = ActivityMetrics::collect(&[overdue, urgent], &[], &[], now);
        assert_eq!(m.overdue_tasks, 1);
        assert_eq!(m.urgent_tasks, 1);
    }

    #[test]
    fn test_archived_tasks_are_excluded() {
        let now = Utc::now();
        let mut t = task_due(now, -2);
        t.archived = true;
        let m = ActivityMetrics::collect(&[t], &[], &[], now);
        assert_eq!(m.overdue_tasks, 0);
        assert_eq!(m.completion_rate, 0.0);
    }

    #[test]
    fn test_completion_rate() {
        let mut done = Task::new("done");
        done.status = TaskStatus::Completed;
        let open = Task::new("open");
        let m = ActivityMetrics::collect(&[done, open], &[], &[], Utc::now());
        assert!((m.completion_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_session_gap_from_last_session() {
        let now = Utc::now();
        let mut session = WorkSession::start(None, now - Duration::hours(26));
        session.end(now - Duration::hours(25), Some(3)).unwrap();

        let m = ActivityMetrics::collect(&[], &[], &[session], now);
        assert!(m.work_session_gap_hours > 24.0 && m.work_session_gap_hours < 26.0);
    }

    #[test]
    fn test_project_deadline_window() {
        let now = Utc::now();
        let mut soon = Project::new("soon");
        soon.deadline = Some(now + Duration::days(3));
        let mut far = Project::new("far");
        far.deadline = Some(now + Duration::days(30));
        let mut past = Project::new("past");
        past.deadline = Some(now - Duration::days(1));

        let m = ActivityMetrics::collect(&[], &[soon, far, past], &[], now);
        assert_eq!(m.project_deadlines, 1);
    }

    #[test]
    fn test_stagnation_risk_thresholds() {
        let now = Utc::now();
        assert_eq!(
            stagnation_risk(Some(now - Duration::hours(10)), now),
            StagnationRisk::Low
        );
        assert_eq!(
            stagnation_risk(Some(now - Duration::hours(72)), now),
            StagnationRisk::Medium
        );
        assert_eq!(
            stagnation_risk(Some(now - Duration::hours(200)), now),
            StagnationRisk::High
        );
        assert_eq!(stagnation_risk(None, now), StagnationRisk::High);
    }
}
