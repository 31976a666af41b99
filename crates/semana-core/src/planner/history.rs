//! Historical productivity tallies feeding the weekly planner.
//!
//! Built from a 30-day window of completed tasks and ended work sessions:
//! a per-hour productivity average and a mean actual duration per priority
//! bucket. Empty buckets fall back to fixed defaults rather than propagating
//! a division by zero.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskPriority, TaskStatus, WorkSession};

/// Fallback duration when a priority bucket has no history (minutes).
pub const DEFAULT_TASK_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct HourTally {
    samples: u32,
    score_sum: u32,
}

impl HourTally {
    fn mean(&self) -> Option<f64> {
        if self.samples == 0 {
            None
        } else {
            Some(self.score_sum as f64 / self.samples as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct DurationTally {
    samples: u32,
    minutes_sum: u64,
}

/// Productivity-by-hour and duration-by-priority history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductivityHistory {
    hours: [HourTally; 24],
    /// Indexed by priority weight - 1 (low..urgent)
    durations: [DurationTally; 4],
    /// Total observations folded in
    pub sample_count: u32,
}

impl Default for ProductivityHistory {
    fn default() -> Self {
        Self::empty()
    }
}

impl ProductivityHistory {
    /// History with no observations; every lookup falls back.
    pub fn empty() -> Self {
        Self {
            hours: [HourTally::default(); 24],
            durations: [DurationTally::default(); 4],
            sample_count: 0,
        }
    }

    /// Build from completed tasks and ended sessions (callers pre-filter to
    /// the 30-day window).
    pub fn from_records(completed_tasks: &[Task], sessions: &[WorkSession]) -> Self {
        let mut history = Self::empty();

        for session in sessions {
            if let (Some(score), Some(_)) = (session.productivity_score, session.ended_at) {
                let hour = session.started_at.hour() as usize;
                let tally = &mut history.hours[hour.min(23)];
                tally.samples += 1;
                tally.score_sum += score.min(5) as u32;
                history.sample_count += 1;
            }
        }

        for task in completed_tasks {
            if task.status != TaskStatus::Completed {
                continue;
            }
            if let Some(actual) = task.actual_minutes {
                let bucket = &mut history.durations[(task.priority.weight() - 1) as usize];
                bucket.samples += 1;
                bucket.minutes_sum += actual as u64;
                history.sample_count += 1;
            }
        }

        history
    }

    /// Mean productivity score (1-5) logged for an hour, if any.
    pub fn productivity_at(&self, hour: u8) -> Option<f64> {
        self.hours[(hour as usize).min(23)].mean()
    }

    /// Mean actual duration for a priority bucket, or the 60-minute default
    /// when the bucket is empty.
    pub fn mean_duration(&self, priority: TaskPriority) -> u32 {
        let bucket = &self.durations[(priority.weight() - 1) as usize];
        if bucket.samples == 0 {
            DEFAULT_TASK_MINUTES
        } else {
            (bucket.minutes_sum / bucket.samples as u64) as u32
        }
    }

    /// Pick the best hour among `candidates`, ranked by logged productivity.
    /// Hours with no data rank below any hour with data; ties keep the
    /// earliest candidate.
    pub fn best_hour_among(&self, candidates: &[u8]) -> Option<u8> {
        candidates
            .iter()
            .copied()
            .max_by(|a, b| {
                let pa = self.productivity_at(*a).unwrap_or(0.0);
                let pb = self.productivity_at(*b).unwrap_or(0.0);
                pa.partial_cmp(&pb)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // On ties prefer the earlier hour, so max_by must see the
                    // earlier one as "greater".
                    .then_with(|| b.cmp(a))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn session_at(hour: u32, score: u8) -> WorkSession {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap();
        let mut s = WorkSession::start(None, start);
        s.end(start + chrono::Duration::minutes(30), Some(score))
            .unwrap();
        s
    }

    fn completed_task(priority: TaskPriority, actual: u32) -> Task {
        let mut t = Task::new("done");
        t.status = TaskStatus::Completed;
        t.priority = priority;
        t.actual_minutes = Some(actual);
        t
    }

    #[test]
    fn test_empty_history_falls_back() {
        let h = ProductivityHistory::empty();
        assert_eq!(h.mean_duration(TaskPriority::High), DEFAULT_TASK_MINUTES);
        assert_eq!(h.productivity_at(9), None);
        assert_eq!(h.sample_count, 0);
    }

    #[test]
    fn test_mean_duration_per_priority() {
        let tasks = vec![
            completed_task(TaskPriority::High, 40),
            completed_task(TaskPriority::High, 60),
            completed_task(TaskPriority::Low, 10),
        ];
        let h = ProductivityHistory::from_records(&tasks, &[]);
        assert_eq!(h.mean_duration(TaskPriority::High), 50);
        assert_eq!(h.mean_duration(TaskPriority::Low), 10);
        // Empty bucket keeps the fallback.
        assert_eq!(h.mean_duration(TaskPriority::Urgent), DEFAULT_TASK_MINUTES);
    }

    #[test]
    fn test_best_hour_prefers_logged_productivity() {
        let sessions = vec![session_at(9, 5), session_at(9, 5), session_at(16, 2)];
        let h = ProductivityHistory::from_records(&[], &sessions);
        assert_eq!(h.best_hour_among(&[9, 16]), Some(9));
        assert_eq!(h.best_hour_among(&[16]), Some(16));
    }

    #[test]
    fn test_best_hour_tie_keeps_earliest() {
        let h = ProductivityHistory::empty();
        assert_eq!(h.best_hour_among(&[10, 14, 8]), Some(8));
        assert_eq!(h.best_hour_among(&[]), None);
    }

    #[test]
    fn test_unended_sessions_are_ignored() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let mut open = WorkSession::start(None, start);
        open.productivity_score = Some(5);
        let h = ProductivityHistory::from_records(&[], &[open]);
        assert_eq!(h.sample_count, 0);
    }
}
