//! Context analysis: workload classification, urgency scoring, and focus area.
//!
//! Turns an activity snapshot into a coarse, explainable assessment the
//! assistant surfaces before recommending anything. Pure and deterministic
//! for a given snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::ActivityMetrics;
use crate::task::{Project, ProjectStatus, Task, TaskStatus, WorkSession};

/// Coarse workload classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadLevel {
    Light,
    Moderate,
    Heavy,
    Overwhelming,
}

/// Where the user's attention should go first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    Tasks,
    Projects,
    Planning,
    Review,
    Maintenance,
}

/// Input bundle for the analyzer.
#[derive(Debug, Clone)]
pub struct ContextSnapshot<'a> {
    /// Display name, when known
    pub user_name: Option<&'a str>,
    pub tasks: &'a [Task],
    pub projects: &'a [Project],
    pub sessions: &'a [WorkSession],
    /// Whether per-hour productivity data exists for this user
    pub has_productivity_data: bool,
    /// Whether a learned work pattern exists for this user
    pub has_work_pattern: bool,
    pub now: DateTime<Utc>,
}

/// Analyzer output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextAnalysis {
    pub metrics: ActivityMetrics,
    pub workload: WorkloadLevel,
    /// 0-100 heuristic combining overdue/urgent counts, completion, inactivity, deadlines
    pub urgency_score: u8,
    pub focus_area: FocusArea,
    /// At most 4 suggested actions
    pub recommended_actions: Vec<String>,
    pub attention_points: Vec<String>,
    /// 0-100 estimate of how complete the input snapshot was
    pub context_quality: u8,
}

/// Maximum number of recommended actions surfaced per analysis.
const MAX_ACTIONS: usize = 4;

/// Context analyzer over an activity snapshot.
pub struct ContextAnalyzer;

impl ContextAnalyzer {
    /// Analyze a snapshot.
    pub fn analyze(snapshot: &ContextSnapshot<'_>) -> ContextAnalysis {
        let metrics = ActivityMetrics::collect(
            snapshot.tasks,
            snapshot.projects,
            snapshot.sessions,
            snapshot.now,
        );

        let pending = snapshot
            .tasks
            .iter()
            .filter(|t| !t.archived && t.status == TaskStatus::Pending)
            .count() as u32;
        let active_projects = snapshot
            .projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Active)
            .count() as u32;

        let workload = classify_workload(pending, metrics.urgent_tasks, active_projects);
        let urgency_score = urgency_score(&metrics);
        let focus_area = pick_focus_area(&metrics, pending);
        let (recommended_actions, attention_points) =
            render_guidance(&metrics, workload, focus_area, pending);
        let context_quality = context_quality(snapshot);

        ContextAnalysis {
            metrics,
            workload,
            urgency_score,
            focus_area,
            recommended_actions,
            attention_points,
            context_quality,
        }
    }
}

/// Threshold ladder over pending/urgent/project counts, most severe first.
fn classify_workload(pending: u32, urgent: u32, active_projects: u32) -> WorkloadLevel {
    if pending > 15 || urgent > 5 || active_projects > 5 {
        WorkloadLevel::Overwhelming
    } else if pending > 10 || urgent > 3 || active_projects > 3 {
        WorkloadLevel::Heavy
    } else if pending > 5 || urgent >= 1 || active_projects > 1 {
        WorkloadLevel::Moderate
    } else {
        WorkloadLevel::Light
    }
}

/// Weighted urgency sum, capped at 100.
fn urgency_score(metrics: &ActivityMetrics) -> u8 {
    let mut score = metrics.overdue_tasks.saturating_mul(25)
        + metrics.urgent_tasks.saturating_mul(15)
        + metrics.project_deadlines.saturating_mul(10);

    if metrics.completion_rate < 0.5 {
        score += 20;
    } else if metrics.completion_rate < 0.7 {
        score += 10;
    }

    if metrics.work_session_gap_hours > 48.0 {
        score += 15;
    } else if metrics.work_session_gap_hours > 24.0 {
        score += 8;
    }

    score.min(100) as u8
}

/// Fixed priority order: tasks → projects → planning → review → maintenance.
fn pick_focus_area(metrics: &ActivityMetrics, pending: u32) -> FocusArea {
    if metrics.overdue_tasks > 0 || metrics.urgent_tasks > 1 {
        FocusArea::Tasks
    } else if metrics.project_deadlines > 0 {
        FocusArea::Projects
    } else if metrics.work_session_gap_hours > 48.0 {
        FocusArea::Planning
    } else if metrics.completion_rate > 0.8 {
        FocusArea::Review
    } else if pending > 8 {
        FocusArea::Maintenance
    } else {
        FocusArea::Tasks
    }
}

fn render_guidance(
    metrics: &ActivityMetrics,
    workload: WorkloadLevel,
    focus_area: FocusArea,
    pending: u32,
) -> (Vec<String>, Vec<String>) {
    let mut actions = Vec::new();
    let mut attention = Vec::new();

    if metrics.overdue_tasks > 0 {
        actions.push(format!(
            "Atiende primero las {} tareas vencidas",
            metrics.overdue_tasks
        ));
        attention.push(format!("{} tareas vencidas", metrics.overdue_tasks));
    }
    if metrics.urgent_tasks > 0 {
        actions.push(format!(
            "Tienes {} tareas urgentes pendientes",
            metrics.urgent_tasks
        ));
    }
    if metrics.project_deadlines > 0 {
        actions.push(format!(
            "{} proyectos con fecha límite esta semana",
            metrics.project_deadlines
        ));
        attention.push("Fechas límite de proyecto próximas".to_string());
    }
    if metrics.work_session_gap_hours > 24.0 {
        actions.push("Retoma el trabajo con una sesión corta".to_string());
        attention.push(format!(
            "Sin actividad registrada desde hace {:.0} horas",
            metrics.work_session_gap_hours
        ));
    }

    match focus_area {
        FocusArea::Planning => {
            actions.push("Dedica unos minutos a planificar la semana".to_string())
        }
        FocusArea::Review => {
            actions.push("Buen ritmo: revisa y archiva lo completado".to_string())
        }
        FocusArea::Maintenance if pending > 8 => actions.push(format!(
            "Depura la lista: {pending} tareas pendientes acumuladas"
        )),
        _ => {}
    }

    if workload == WorkloadLevel::Overwhelming {
        attention.push("Carga de trabajo desbordada: pospón lo no esencial".to_string());
    }

    actions.truncate(MAX_ACTIONS);
    (actions, attention)
}

/// Quality of the snapshot itself: penalized for missing identity/history,
/// bonused for learned productivity data.
fn context_quality(snapshot: &ContextSnapshot<'_>) -> u8 {
    let mut quality: i32 = 100;

    if snapshot.user_name.is_none() {
        quality -= 15;
    }
    if snapshot.tasks.is_empty() {
        quality -= 25;
    }
    if snapshot.sessions.is_empty() {
        quality -= 15;
    }
    if snapshot.projects.is_empty() {
        quality -= 10;
    }
    if snapshot.has_productivity_data {
        quality += 10;
    }
    if snapshot.has_work_pattern {
        quality += 10;
    }

    quality.clamp(0, 100) as u8
}
