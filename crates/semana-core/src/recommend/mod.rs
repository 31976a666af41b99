//! Time-based task recommendations.
//!
//! Given the task pool and an available-time budget, this engine filters and
//! scores candidates and returns a ranked top-3 list, each with the reason it
//! was picked. Scores are fixed per candidate pool so results stay explainable.

pub mod time_intent;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskPriority, TaskStatus};

pub use time_intent::{detect_time_intention, TimeIntention};

/// Heuristic base duration when a task carries no estimate (minutes).
const BASE_DURATION_MIN: u32 = 30;
/// Bounds for any duration estimate (minutes).
const MIN_DURATION_MIN: u32 = 5;
const MAX_DURATION_MIN: u32 = 120;
/// Maximum recommendations returned.
const MAX_RECOMMENDATIONS: usize = 3;

/// Verbs that mark a task as a quick interaction; estimate is capped at 15.
const QUICK_KEYWORDS: &[&str] = &[
    "llamar", "enviar", "revisar", "responder", "confirmar", "correo", "email",
];
/// Verbs that mark a task as substantial creative work; estimate gains 30.
const LONG_KEYWORDS: &[&str] = &[
    "desarrollar", "crear", "diseñar", "investigar", "escribir", "implementar",
];

/// Why a task entered the candidate set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidatePool {
    /// Due today and still open
    DueToday,
    /// Past its due date
    Overdue,
    /// Already in progress
    InProgress,
    /// Fits the available-time bucket
    TimeFit,
}

impl CandidatePool {
    /// Fixed urgency score for this pool. The time-fit pool scores 75 for
    /// short tasks (quick wins) and 70 otherwise.
    fn score(&self, quick_win: bool) -> u8 {
        match self {
            CandidatePool::DueToday => 95,
            CandidatePool::Overdue => 90,
            CandidatePool::InProgress => 85,
            CandidatePool::TimeFit => {
                if quick_win {
                    75
                } else {
                    70
                }
            }
        }
    }
}

/// A single ranked recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRecommendation {
    pub task_id: String,
    pub title: String,
    /// Fixed pool score (70-95)
    pub urgency_score: u8,
    /// Estimated duration in minutes, always within the task's time budget
    pub estimated_minutes: u32,
    pub pool: CandidatePool,
    /// Human-readable reason for this pick
    pub reason: String,
}

/// Estimate a task's duration in minutes.
///
/// An explicit estimate always wins; a logged actual duration comes second.
/// Otherwise a 30-minute base is adjusted by priority and by keyword matches
/// in the title/description. The result is always within [5, 120].
pub fn estimate_duration(task: &Task) -> u32 {
    if let Some(estimate) = task.estimated_minutes {
        return estimate.clamp(MIN_DURATION_MIN, MAX_DURATION_MIN);
    }
    if let Some(actual) = task.actual_minutes {
        return actual.clamp(MIN_DURATION_MIN, MAX_DURATION_MIN);
    }

    let mut minutes = BASE_DURATION_MIN;
    match task.priority {
        TaskPriority::Urgent | TaskPriority::High => minutes += 20,
        TaskPriority::Low => minutes = minutes.saturating_sub(10),
        TaskPriority::Medium => {}
    }

    let text = format!(
        "{} {}",
        task.title.to_lowercase(),
        task.description.as_deref().unwrap_or("").to_lowercase()
    );
    if LONG_KEYWORDS.iter().any(|k| text.contains(k)) {
        minutes += 30;
    }
    if QUICK_KEYWORDS.iter().any(|k| text.contains(k)) {
        minutes = minutes.min(15);
    }

    minutes.clamp(MIN_DURATION_MIN, MAX_DURATION_MIN)
}

/// Generate up to 3 recommendations fitting `available_minutes`.
///
/// Candidate pools are built in fixed-score order (due today 95, overdue 90,
/// in progress 85, time-fit 70/75), filtered to tasks whose estimate fits the
/// budget, merged, and ranked by score. Empty pools are fine; no tasks at all
/// yields an empty list.
pub fn recommend(
    tasks: &[Task],
    available_minutes: u32,
    now: DateTime<Utc>,
) -> Vec<TimeRecommendation> {
    let plannable: Vec<&Task> = tasks.iter().filter(|t| t.is_plannable()).collect();

    let mut candidates: Vec<TimeRecommendation> = Vec::new();

    for task in &plannable {
        let estimated = estimate_duration(task);
        if estimated > available_minutes {
            continue;
        }

        let pool = if task.is_due_today(now) && !task.is_overdue(now) {
            CandidatePool::DueToday
        } else if task.is_overdue(now) {
            CandidatePool::Overdue
        } else if task.status == TaskStatus::InProgress {
            CandidatePool::InProgress
        } else {
            // Anything else that fits the budget enters the time-fit pool;
            // short tasks score as quick wins.
            CandidatePool::TimeFit
        };

        let quick_win = estimated <= 15;
        candidates.push(TimeRecommendation {
            task_id: task.id.clone(),
            title: task.title.clone(),
            urgency_score: pool.score(quick_win),
            estimated_minutes: estimated,
            pool,
            reason: render_reason(pool, estimated),
        });
    }

    candidates.sort_by(|a, b| b.urgency_score.cmp(&a.urgency_score));
    candidates.truncate(MAX_RECOMMENDATIONS);
    candidates
}

fn render_reason(pool: CandidatePool, estimated: u32) -> String {
    match pool {
        CandidatePool::DueToday => "Vence hoy y encaja en tu tiempo disponible".to_string(),
        CandidatePool::Overdue => "Está vencida; cuanto antes mejor".to_string(),
        CandidatePool::InProgress => "Ya la tienes empezada; ciérrala".to_string(),
        CandidatePool::TimeFit => {
            if estimated <= 15 {
                format!("Victoria rápida de {estimated} minutos")
            } else {
                format!("Encaja bien en el hueco ({estimated} min)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    /// Fixed mid-morning timestamp so day-boundary logic stays deterministic.
    fn midmorning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()
    }

    fn task_titled(title: &str, priority: TaskPriority) -> Task {
        let mut t = Task::new(title);
        t.priority = priority;
        t
    }

    #[test]
    fn test_explicit_estimate_wins() {
        let mut t = task_titled("desarrollar módulo", TaskPriority::High);
        t.estimated_minutes = Some(45);
        assert_eq!(estimate_duration(&t), 45);
    }

    #[test]
    fn test_actual_duration_is_second_choice() {
        let mut t = Task::new("t");
        t.actual_minutes = Some(25);
        assert_eq!(estimate_duration(&t), 25);
    }

    #[test]
    fn test_quick_keyword_caps_estimate() {
        // High priority raises the base to 50, but "llamar" caps it at 15.
        let t = task_titled("llamar al cliente", TaskPriority::High);
        assert_eq!(estimate_duration(&t), 15);
    }

    #[test]
    fn test_long_keyword_extends_estimate() {
        let t = task_titled("diseñar la propuesta", TaskPriority::Medium);
        assert_eq!(estimate_duration(&t), 60);
    }

    #[test]
    fn test_low_priority_shortens_estimate() {
        let t = task_titled("ordenar notas", TaskPriority::Low);
        assert_eq!(estimate_duration(&t), 20);
    }

    #[test]
    fn test_due_today_quick_task_ranks_first() {
        // Due in 1 hour, high priority, no estimate, title "llamar al
        // cliente", 20 minutes available.
        let now = midmorning();
        let mut t = task_titled("llamar al cliente", TaskPriority::High);
        t.due_date = Some(now + Duration::hours(1));

        let recs = recommend(&[t], 20, now);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].urgency_score, 95);
        assert!(recs[0].estimated_minutes <= 15);
        assert_eq!(recs[0].pool, CandidatePool::DueToday);
    }

    #[test]
    fn test_never_exceeds_available_minutes() {
        let now = Utc::now();
        let mut long = Task::new("escribir informe completo");
        long.estimated_minutes = Some(90);
        let short = task_titled("enviar resumen", TaskPriority::Medium);

        let recs = recommend(&[long, short], 20, now);
        assert!(recs.iter().all(|r| r.estimated_minutes <= 20));
    }

    #[test]
    fn test_at_most_three_sorted_descending() {
        let now = midmorning();
        let mut tasks = Vec::new();
        for i in 0..6 {
            let mut t = Task::new(format!("revisar doc {i}"));
            t.due_date = Some(now + Duration::minutes(30));
            tasks.push(t);
        }
        let mut in_progress = Task::new("enviar acta");
        in_progress.status = TaskStatus::InProgress;
        tasks.push(in_progress);

        let recs = recommend(&tasks, 60, now);
        assert!(recs.len() <= 3);
        assert!(recs.windows(2).all(|w| w[0].urgency_score >= w[1].urgency_score));
    }

    #[test]
    fn test_completed_and_archived_are_ignored() {
        let now = Utc::now();
        let mut done = Task::new("hecha");
        done.status = TaskStatus::Completed;
        let mut archived = Task::new("archivada");
        archived.archived = true;

        assert!(recommend(&[done, archived], 60, now).is_empty());
    }

    proptest! {
        #[test]
        fn prop_estimate_always_in_bounds(
            title in "[a-záéíóú ]{0,40}",
            priority in prop_oneof![
                Just(TaskPriority::Low),
                Just(TaskPriority::Medium),
                Just(TaskPriority::High),
                Just(TaskPriority::Urgent),
            ],
            estimate in proptest::option::of(0u32..500),
            actual in proptest::option::of(0u32..500),
        ) {
            let mut t = Task::new(title);
            t.priority = priority;
            t.estimated_minutes = estimate;
            t.actual_minutes = actual;
            let minutes = estimate_duration(&t);
            prop_assert!((5..=120).contains(&minutes));
        }

        #[test]
        fn prop_recommendations_fit_budget(available in 5u32..180) {
            let now = midmorning();
            let tasks: Vec<Task> = (0..10)
                .map(|i| {
                    let mut t = Task::new(format!("tarea {i}"));
                    if i % 2 == 0 {
                        t.due_date = Some(now + Duration::minutes(10));
                    }
                    t
                })
                .collect();
            let recs = recommend(&tasks, available, now);
            prop_assert!(recs.len() <= 3);
            prop_assert!(recs.iter().all(|r| r.estimated_minutes <= available));
        }
    }
}
