//! SQLite-based persistence for tasks, sessions, feedback, and plans.
//!
//! Provides the filtered selects and single-row upserts the engine needs:
//! - task/session/project records per user
//! - the append-only recommendation feedback log
//! - adaptive weights and learning rules (upserted per feedback event)
//! - weekly plans, unique per (user, week start)
//! - proactive notifications (deduped per task/kind/day) and smart reminders

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use crate::error::{DatabaseError, Result, ValidationError};
use crate::learning::{
    AdaptiveWeight, FeedbackAction, FeedbackEvent, InsightKind, LearningInsight, LearningRule,
    RuleCondition, RuleType, TrendDirection,
};
use crate::notify::{NotificationDraft, NotificationKind, SmartReminder};
use crate::planner::{PlanStatus, PlanStrategy, WeeklyPlan};
use crate::task::{
    Project, ProjectStatus, Task, TaskLevel, TaskPriority, TaskStatus, WorkSession,
};

/// SQLite database for all engine records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/semana/semana.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .join("semana.db");
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and ephemeral runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS tasks (
                    id              TEXT PRIMARY KEY,
                    user_id         TEXT NOT NULL,
                    title           TEXT NOT NULL,
                    description     TEXT,
                    status          TEXT NOT NULL,
                    priority        TEXT NOT NULL,
                    due_date        TEXT,
                    estimated_min   INTEGER,
                    actual_min      INTEGER,
                    project_id      TEXT,
                    parent_task_id  TEXT,
                    level           INTEGER NOT NULL DEFAULT 1,
                    tags            TEXT NOT NULL DEFAULT '[]',
                    archived        INTEGER NOT NULL DEFAULT 0,
                    created_at      TEXT NOT NULL,
                    completed_at    TEXT
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id          TEXT PRIMARY KEY,
                    user_id     TEXT NOT NULL,
                    name        TEXT NOT NULL,
                    status      TEXT NOT NULL,
                    deadline    TEXT,
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS task_sessions (
                    id                  TEXT PRIMARY KEY,
                    user_id             TEXT NOT NULL,
                    task_id             TEXT,
                    started_at          TEXT NOT NULL,
                    ended_at            TEXT,
                    duration_min        INTEGER NOT NULL DEFAULT 0,
                    productivity_score  INTEGER,
                    notes               TEXT
                );

                CREATE TABLE IF NOT EXISTS recommendation_feedback (
                    id          TEXT PRIMARY KEY,
                    user_id     TEXT NOT NULL,
                    task_id     TEXT,
                    action      TEXT NOT NULL,
                    satisfaction INTEGER,
                    context_data TEXT NOT NULL DEFAULT '{}',
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS adaptive_weights (
                    user_id     TEXT NOT NULL,
                    factor      TEXT NOT NULL,
                    weight      REAL NOT NULL,
                    confidence  REAL NOT NULL,
                    trend       TEXT NOT NULL,
                    sample_size INTEGER NOT NULL,
                    PRIMARY KEY (user_id, factor)
                );

                CREATE TABLE IF NOT EXISTS learning_rules (
                    id            TEXT PRIMARY KEY,
                    user_id       TEXT NOT NULL,
                    rule_type     TEXT NOT NULL,
                    condition_key TEXT NOT NULL,
                    score_delta   INTEGER NOT NULL,
                    confidence    REAL NOT NULL,
                    usage_count   INTEGER NOT NULL,
                    success_rate  REAL NOT NULL,
                    created_at    TEXT NOT NULL,
                    UNIQUE (user_id, rule_type, condition_key)
                );

                CREATE TABLE IF NOT EXISTS weekly_plans (
                    id          TEXT PRIMARY KEY,
                    user_id     TEXT NOT NULL,
                    week_start  TEXT NOT NULL,
                    week_end    TEXT NOT NULL,
                    days        TEXT NOT NULL,
                    strategy    TEXT NOT NULL,
                    ai_confidence INTEGER NOT NULL,
                    completion_rate REAL NOT NULL DEFAULT 0,
                    total_estimated_hours REAL NOT NULL DEFAULT 0,
                    actual_hours REAL NOT NULL DEFAULT 0,
                    status      TEXT NOT NULL,
                    UNIQUE (user_id, week_start)
                );

                CREATE TABLE IF NOT EXISTS proactive_notifications (
                    id          TEXT PRIMARY KEY,
                    user_id     TEXT NOT NULL,
                    kind        TEXT NOT NULL,
                    title       TEXT NOT NULL,
                    body        TEXT NOT NULL,
                    task_id     TEXT,
                    created_at  TEXT NOT NULL,
                    read        INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS smart_reminders (
                    id          TEXT PRIMARY KEY,
                    user_id     TEXT NOT NULL,
                    task_id     TEXT NOT NULL,
                    remind_at   TEXT NOT NULL,
                    fired       INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS ai_insights (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id     TEXT NOT NULL,
                    kind        TEXT NOT NULL,
                    message     TEXT NOT NULL,
                    confidence  REAL NOT NULL,
                    actionable  INTEGER NOT NULL,
                    created_at  TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_user_status ON tasks(user_id, status);
                CREATE INDEX IF NOT EXISTS idx_sessions_user_started ON task_sessions(user_id, started_at);
                CREATE INDEX IF NOT EXISTS idx_feedback_user_created ON recommendation_feedback(user_id, created_at);
                CREATE INDEX IF NOT EXISTS idx_notifications_user ON proactive_notifications(user_id, created_at);
                CREATE INDEX IF NOT EXISTS idx_reminders_due ON smart_reminders(user_id, fired, remind_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // ── Tasks ──────────────────────────────────────────────────────────

    /// Insert or replace a task row.
    pub fn upsert_task(&self, user_id: &str, task: &Task) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO tasks
             (id, user_id, title, description, status, priority, due_date,
              estimated_min, actual_min, project_id, parent_task_id, level,
              tags, archived, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                task.id,
                user_id,
                task.title,
                task.description,
                status_str(task.status),
                priority_str(task.priority),
                task.due_date.map(|d| d.to_rfc3339()),
                task.estimated_minutes,
                task.actual_minutes,
                task.project_id,
                task.parent_task_id,
                task.level.depth(),
                serde_json::to_string(&task.tags)?,
                task.archived as i64,
                task.created_at.to_rfc3339(),
                task.completed_at.map(|d| d.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Fetch one task by id.
    pub fn get_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 AND id = ?2"),
                params![user_id, task_id],
                row_to_task,
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(row)
    }

    /// All non-archived tasks for a user.
    pub fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1 AND archived = 0
             ORDER BY created_at"
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_task)?;
        collect_rows(rows)
    }

    /// Tasks completed within the last `days` days (for history tallies).
    pub fn completed_tasks_since(&self, user_id: &str, days: u32) -> Result<Vec<Task>> {
        let cutoff = (Utc::now() - chrono::Duration::days(days as i64)).to_rfc3339();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1 AND status = 'completed' AND completed_at >= ?2"
        ))?;
        let rows = stmt.query_map(params![user_id, cutoff], row_to_task)?;
        collect_rows(rows)
    }

    /// Flag a task as archived (soft delete).
    pub fn archive_task(&self, user_id: &str, task_id: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET archived = 1 WHERE user_id = ?1 AND id = ?2",
            params![user_id, task_id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                table: "tasks".to_string(),
                key: task_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    // ── Projects ───────────────────────────────────────────────────────

    pub fn upsert_project(&self, user_id: &str, project: &Project) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO projects (id, user_id, name, status, deadline, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                user_id,
                project.name,
                project_status_str(project.status),
                project.deadline.map(|d| d.to_rfc3339()),
                project.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, status, deadline, created_at FROM projects
             WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Project {
                id: row.get(0)?,
                name: row.get(1)?,
                status: parse_project_status(&row.get::<_, String>(2)?)?,
                deadline: parse_opt_ts(row.get::<_, Option<String>>(3)?)?,
                created_at: parse_ts(&row.get::<_, String>(4)?)?,
            })
        })?;
        collect_rows(rows)
    }

    // ── Work sessions ──────────────────────────────────────────────────

    pub fn insert_session(&self, user_id: &str, session: &WorkSession) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO task_sessions
             (id, user_id, task_id, started_at, ended_at, duration_min, productivity_score, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.id,
                user_id,
                session.task_id,
                session.started_at.to_rfc3339(),
                session.ended_at.map(|d| d.to_rfc3339()),
                session.duration_minutes,
                session.productivity_score,
                session.notes,
            ],
        )?;
        Ok(())
    }

    /// Sessions started within the last `days` days, oldest first.
    pub fn sessions_since(&self, user_id: &str, days: u32) -> Result<Vec<WorkSession>> {
        let cutoff = (Utc::now() - chrono::Duration::days(days as i64)).to_rfc3339();
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, started_at, ended_at, duration_min, productivity_score, notes
             FROM task_sessions
             WHERE user_id = ?1 AND started_at >= ?2
             ORDER BY started_at",
        )?;
        let rows = stmt.query_map(params![user_id, cutoff], |row| {
            Ok(WorkSession {
                id: row.get(0)?,
                task_id: row.get(1)?,
                started_at: parse_ts(&row.get::<_, String>(2)?)?,
                ended_at: parse_opt_ts(row.get::<_, Option<String>>(3)?)?,
                duration_minutes: row.get(4)?,
                productivity_score: row.get(5)?,
                notes: row.get(6)?,
            })
        })?;
        collect_rows(rows)
    }

    // ── Recommendation feedback ────────────────────────────────────────

    /// Append one feedback row. The log is never mutated.
    pub fn insert_feedback(&self, event: &FeedbackEvent) -> Result<()> {
        self.conn.execute(
            "INSERT INTO recommendation_feedback
             (id, user_id, task_id, action, satisfaction, context_data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id,
                event.user_id,
                event.task_id,
                action_str(event.action),
                event.satisfaction,
                serde_json::to_string(&event.context)?,
                event.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent feedback rows, newest first.
    pub fn recent_feedback(&self, user_id: &str, limit: usize) -> Result<Vec<FeedbackEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, task_id, action, satisfaction, context_data, created_at
             FROM recommendation_feedback
             WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(FeedbackEvent {
                id: row.get(0)?,
                user_id: row.get(1)?,
                task_id: row.get(2)?,
                action: parse_action(&row.get::<_, String>(3)?)?,
                satisfaction: row.get(4)?,
                context: parse_json(&row.get::<_, String>(5)?, 5)?,
                created_at: parse_ts(&row.get::<_, String>(6)?)?,
            })
        })?;
        collect_rows(rows)
    }

    // ── Adaptive weights ───────────────────────────────────────────────

    pub fn get_weight(&self, user_id: &str, factor: &str) -> Result<Option<AdaptiveWeight>> {
        let row = self
            .conn
            .query_row(
                "SELECT weight, confidence, trend, sample_size FROM adaptive_weights
                 WHERE user_id = ?1 AND factor = ?2",
                params![user_id, factor],
                |row| {
                    Ok(AdaptiveWeight {
                        user_id: user_id.to_string(),
                        factor: factor.to_string(),
                        weight: row.get(0)?,
                        confidence: row.get(1)?,
                        trend: parse_trend(&row.get::<_, String>(2)?)?,
                        sample_size: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(row)
    }

    /// One row per (user, factor); conflicts update in place.
    pub fn upsert_weight(&self, weight: &AdaptiveWeight) -> Result<()> {
        self.conn.execute(
            "INSERT INTO adaptive_weights (user_id, factor, weight, confidence, trend, sample_size)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (user_id, factor) DO UPDATE SET
                weight = excluded.weight,
                confidence = excluded.confidence,
                trend = excluded.trend,
                sample_size = excluded.sample_size",
            params![
                weight.user_id,
                weight.factor,
                weight.weight,
                weight.confidence,
                trend_str(weight.trend),
                weight.sample_size,
            ],
        )?;
        Ok(())
    }

    pub fn list_weights(&self, user_id: &str) -> Result<Vec<AdaptiveWeight>> {
        let mut stmt = self.conn.prepare(
            "SELECT factor, weight, confidence, trend, sample_size FROM adaptive_weights
             WHERE user_id = ?1 ORDER BY factor",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(AdaptiveWeight {
                user_id: user_id.to_string(),
                factor: row.get(0)?,
                weight: row.get(1)?,
                confidence: row.get(2)?,
                trend: parse_trend(&row.get::<_, String>(3)?)?,
                sample_size: row.get(4)?,
            })
        })?;
        collect_rows(rows)
    }

    // ── Learning rules ─────────────────────────────────────────────────

    /// Find a rule by its canonical condition key.
    pub fn find_rule(
        &self,
        user_id: &str,
        rule_type: RuleType,
        condition_key: &str,
    ) -> Result<Option<LearningRule>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, condition_key, score_delta, confidence, usage_count, success_rate, created_at
                 FROM learning_rules
                 WHERE user_id = ?1 AND rule_type = ?2 AND condition_key = ?3",
                params![user_id, rule_type_str(rule_type), condition_key],
                |row| {
                    Ok(LearningRule {
                        id: row.get(0)?,
                        user_id: user_id.to_string(),
                        rule_type,
                        condition: parse_json::<RuleCondition>(&row.get::<_, String>(1)?, 1)?,
                        score_delta: row.get(2)?,
                        confidence: row.get(3)?,
                        usage_count: row.get(4)?,
                        success_rate: row.get(5)?,
                        created_at: parse_ts(&row.get::<_, String>(6)?)?,
                    })
                },
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(row)
    }

    /// One row per (user, type, condition); conflicts update the aggregates.
    pub fn upsert_rule(&self, rule: &LearningRule) -> Result<()> {
        self.conn.execute(
            "INSERT INTO learning_rules
             (id, user_id, rule_type, condition_key, score_delta, confidence,
              usage_count, success_rate, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (user_id, rule_type, condition_key) DO UPDATE SET
                score_delta = excluded.score_delta,
                confidence = excluded.confidence,
                usage_count = excluded.usage_count,
                success_rate = excluded.success_rate",
            params![
                rule.id,
                rule.user_id,
                rule_type_str(rule.rule_type),
                rule.condition.canonical_key(),
                rule.score_delta,
                rule.confidence,
                rule.usage_count,
                rule.success_rate,
                rule.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_rules(&self, user_id: &str) -> Result<Vec<LearningRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, rule_type, condition_key, score_delta, confidence, usage_count,
                    success_rate, created_at
             FROM learning_rules WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(LearningRule {
                id: row.get(0)?,
                user_id: user_id.to_string(),
                rule_type: parse_rule_type(&row.get::<_, String>(1)?)?,
                condition: parse_json::<RuleCondition>(&row.get::<_, String>(2)?, 2)?,
                score_delta: row.get(3)?,
                confidence: row.get(4)?,
                usage_count: row.get(5)?,
                success_rate: row.get(6)?,
                created_at: parse_ts(&row.get::<_, String>(7)?)?,
            })
        })?;
        collect_rows(rows)
    }

    // ── Weekly plans ───────────────────────────────────────────────────

    /// Upsert the plan for its (user, week start); a conflict replaces the
    /// whole stored plan.
    pub fn upsert_weekly_plan(&self, plan: &WeeklyPlan) -> Result<()> {
        self.conn.execute(
            "INSERT INTO weekly_plans
             (id, user_id, week_start, week_end, days, strategy, ai_confidence,
              completion_rate, total_estimated_hours, actual_hours, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (user_id, week_start) DO UPDATE SET
                id = excluded.id,
                week_end = excluded.week_end,
                days = excluded.days,
                strategy = excluded.strategy,
                ai_confidence = excluded.ai_confidence,
                completion_rate = excluded.completion_rate,
                total_estimated_hours = excluded.total_estimated_hours,
                actual_hours = excluded.actual_hours,
                status = excluded.status",
            params![
                plan.id,
                plan.user_id,
                plan.week_start.format("%Y-%m-%d").to_string(),
                plan.week_end.format("%Y-%m-%d").to_string(),
                serde_json::to_string(&plan.days)?,
                strategy_str(plan.strategy),
                plan.ai_confidence,
                plan.completion_rate,
                plan.total_estimated_hours,
                plan.actual_hours,
                plan_status_str(plan.status),
            ],
        )?;
        Ok(())
    }

    pub fn get_weekly_plan(&self, user_id: &str, week_start: NaiveDate) -> Result<Option<WeeklyPlan>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, week_start, week_end, days, strategy, ai_confidence,
                        completion_rate, total_estimated_hours, actual_hours, status
                 FROM weekly_plans WHERE user_id = ?1 AND week_start = ?2",
                params![user_id, week_start.format("%Y-%m-%d").to_string()],
                |row| {
                    Ok(WeeklyPlan {
                        id: row.get(0)?,
                        user_id: user_id.to_string(),
                        week_start: parse_date(&row.get::<_, String>(1)?)?,
                        week_end: parse_date(&row.get::<_, String>(2)?)?,
                        days: parse_json(&row.get::<_, String>(3)?, 3)?,
                        strategy: parse_strategy(&row.get::<_, String>(4)?)?,
                        ai_confidence: row.get(5)?,
                        completion_rate: row.get(6)?,
                        total_estimated_hours: row.get(7)?,
                        actual_hours: row.get(8)?,
                        status: parse_plan_status(&row.get::<_, String>(9)?)?,
                    })
                },
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(row)
    }

    /// Advance a plan's status, enforcing draft → active → completed.
    pub fn set_plan_status(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        to: PlanStatus,
    ) -> Result<()> {
        let plan = self.get_weekly_plan(user_id, week_start)?.ok_or_else(|| {
            DatabaseError::NotFound {
                table: "weekly_plans".to_string(),
                key: week_start.to_string(),
            }
        })?;
        if !plan.status.can_transition_to(to) {
            return Err(ValidationError::InvalidTransition {
                from: plan_status_str(plan.status).to_string(),
                to: plan_status_str(to).to_string(),
            }
            .into());
        }
        self.conn.execute(
            "UPDATE weekly_plans SET status = ?1 WHERE user_id = ?2 AND week_start = ?3",
            params![
                plan_status_str(to),
                user_id,
                week_start.format("%Y-%m-%d").to_string()
            ],
        )?;
        Ok(())
    }

    // ── Notifications & reminders ──────────────────────────────────────

    /// Insert a notification unless an equal (kind, task, day) one exists.
    ///
    /// Returns whether a row was inserted.
    pub fn insert_notification_unique(&self, draft: &NotificationDraft) -> Result<bool> {
        let day = draft.created_at.format("%Y-%m-%d").to_string();
        let existing: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM proactive_notifications
             WHERE user_id = ?1 AND kind = ?2
               AND COALESCE(task_id, '') = COALESCE(?3, '')
               AND substr(created_at, 1, 10) = ?4",
            params![draft.user_id, kind_str(draft.kind), draft.task_id, day],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO proactive_notifications
             (id, user_id, kind, title, body, task_id, created_at, read)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
            params![
                draft.id,
                draft.user_id,
                kind_str(draft.kind),
                draft.title,
                draft.body,
                draft.task_id,
                draft.created_at.to_rfc3339(),
            ],
        )?;
        Ok(true)
    }

    /// Latest notifications, newest first: (kind, title, body, read).
    pub fn list_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<(String, String, String, bool)>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, title, body, read FROM proactive_notifications
             WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get::<_, i64>(3)? != 0,
            ))
        })?;
        collect_rows(rows)
    }

    pub fn insert_reminder(&self, reminder: &SmartReminder) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO smart_reminders (id, user_id, task_id, remind_at, fired)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                reminder.id,
                reminder.user_id,
                reminder.task_id,
                reminder.remind_at.to_rfc3339(),
                reminder.fired as i64,
            ],
        )?;
        Ok(())
    }

    /// Unfired reminders due at or before `now`.
    pub fn due_reminders(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<SmartReminder>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, task_id, remind_at, fired FROM smart_reminders
             WHERE user_id = ?1 AND fired = 0 AND remind_at <= ?2
             ORDER BY remind_at",
        )?;
        let rows = stmt.query_map(params![user_id, now.to_rfc3339()], |row| {
            Ok(SmartReminder {
                id: row.get(0)?,
                user_id: row.get(1)?,
                task_id: row.get(2)?,
                remind_at: parse_ts(&row.get::<_, String>(3)?)?,
                fired: row.get::<_, i64>(4)? != 0,
            })
        })?;
        collect_rows(rows)
    }

    pub fn mark_reminder_fired(&self, reminder_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE smart_reminders SET fired = 1 WHERE id = ?1",
            params![reminder_id],
        )?;
        Ok(())
    }

    // ── Insights ───────────────────────────────────────────────────────

    pub fn insert_insight(&self, user_id: &str, insight: &LearningInsight) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ai_insights (user_id, kind, message, confidence, actionable, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                insight_kind_str(insight.kind),
                insight.message,
                insight.confidence,
                insight.actionable as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Latest insight messages, newest first.
    pub fn recent_insights(&self, user_id: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT message FROM ai_insights
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| row.get(0))?;
        collect_rows(rows)
    }
}

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, estimated_min, \
                            actual_min, project_id, parent_task_id, level, tags, archived, \
                            created_at, completed_at";

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: parse_status(&row.get::<_, String>(3)?)?,
        priority: parse_priority(&row.get::<_, String>(4)?)?,
        due_date: parse_opt_ts(row.get::<_, Option<String>>(5)?)?,
        estimated_minutes: row.get(6)?,
        actual_minutes: row.get(7)?,
        project_id: row.get(8)?,
        parent_task_id: row.get(9)?,
        level: TaskLevel::from_depth(row.get::<_, i64>(10)? as u8)
            .ok_or_else(|| conversion_err(10, "task level out of range"))?,
        tags: parse_json(&row.get::<_, String>(11)?, 11)?,
        archived: row.get::<_, i64>(12)? != 0,
        created_at: parse_ts(&row.get::<_, String>(13)?)?,
        completed_at: parse_opt_ts(row.get::<_, Option<String>>(14)?)?,
    })
}

fn collect_rows<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(DatabaseError::from)?);
    }
    Ok(out)
}

// String forms for enum columns.

fn status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Completed => "completed",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn parse_status(raw: &str) -> rusqlite::Result<TaskStatus> {
    match raw {
        "pending" => Ok(TaskStatus::Pending),
        "in_progress" => Ok(TaskStatus::InProgress),
        "completed" => Ok(TaskStatus::Completed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        _ => Err(conversion_err(3, "unknown task status")),
    }
}

fn priority_str(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
        TaskPriority::Urgent => "urgent",
    }
}

fn parse_priority(raw: &str) -> rusqlite::Result<TaskPriority> {
    match raw {
        "low" => Ok(TaskPriority::Low),
        "medium" => Ok(TaskPriority::Medium),
        "high" => Ok(TaskPriority::High),
        "urgent" => Ok(TaskPriority::Urgent),
        _ => Err(conversion_err(4, "unknown task priority")),
    }
}

fn project_status_str(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Active => "active",
        ProjectStatus::Completed => "completed",
        ProjectStatus::Archived => "archived",
    }
}

fn parse_project_status(raw: &str) -> rusqlite::Result<ProjectStatus> {
    match raw {
        "active" => Ok(ProjectStatus::Active),
        "completed" => Ok(ProjectStatus::Completed),
        "archived" => Ok(ProjectStatus::Archived),
        _ => Err(conversion_err(2, "unknown project status")),
    }
}

fn action_str(action: FeedbackAction) -> &'static str {
    match action {
        FeedbackAction::Accepted => "accepted",
        FeedbackAction::Skipped => "skipped",
        FeedbackAction::Completed => "completed",
        FeedbackAction::FeedbackPositive => "feedback_positive",
        FeedbackAction::FeedbackNegative => "feedback_negative",
    }
}

fn parse_action(raw: &str) -> rusqlite::Result<FeedbackAction> {
    match raw {
        "accepted" => Ok(FeedbackAction::Accepted),
        "skipped" => Ok(FeedbackAction::Skipped),
        "completed" => Ok(FeedbackAction::Completed),
        "feedback_positive" => Ok(FeedbackAction::FeedbackPositive),
        "feedback_negative" => Ok(FeedbackAction::FeedbackNegative),
        _ => Err(conversion_err(3, "unknown feedback action")),
    }
}

fn trend_str(trend: TrendDirection) -> &'static str {
    match trend {
        TrendDirection::Increasing => "increasing",
        TrendDirection::Decreasing => "decreasing",
        TrendDirection::Stable => "stable",
    }
}

fn parse_trend(raw: &str) -> rusqlite::Result<TrendDirection> {
    match raw {
        "increasing" => Ok(TrendDirection::Increasing),
        "decreasing" => Ok(TrendDirection::Decreasing),
        "stable" => Ok(TrendDirection::Stable),
        _ => Err(conversion_err(2, "unknown trend")),
    }
}

fn rule_type_str(rule_type: RuleType) -> &'static str {
    match rule_type {
        RuleType::Preference => "preference",
        RuleType::Avoidance => "avoidance",
        RuleType::Timing => "timing",
        RuleType::Energy => "energy",
    }
}

fn parse_rule_type(raw: &str) -> rusqlite::Result<RuleType> {
    match raw {
        "preference" => Ok(RuleType::Preference),
        "avoidance" => Ok(RuleType::Avoidance),
        "timing" => Ok(RuleType::Timing),
        "energy" => Ok(RuleType::Energy),
        _ => Err(conversion_err(1, "unknown rule type")),
    }
}

fn strategy_str(strategy: PlanStrategy) -> &'static str {
    match strategy {
        PlanStrategy::Balanced => "balanced",
        PlanStrategy::Focused => "focused",
        PlanStrategy::Intensive => "intensive",
    }
}

fn parse_strategy(raw: &str) -> rusqlite::Result<PlanStrategy> {
    PlanStrategy::parse(raw).ok_or_else(|| conversion_err(4, "unknown strategy"))
}

fn plan_status_str(status: PlanStatus) -> &'static str {
    match status {
        PlanStatus::Draft => "draft",
        PlanStatus::Active => "active",
        PlanStatus::Completed => "completed",
    }
}

fn parse_plan_status(raw: &str) -> rusqlite::Result<PlanStatus> {
    match raw {
        "draft" => Ok(PlanStatus::Draft),
        "active" => Ok(PlanStatus::Active),
        "completed" => Ok(PlanStatus::Completed),
        _ => Err(conversion_err(9, "unknown plan status")),
    }
}

fn insight_kind_str(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::PatternDetected => "pattern_detected",
        InsightKind::BestHour => "best_hour",
        InsightKind::Trend => "trend",
    }
}

fn kind_str(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::DueSoon => "due_soon",
        NotificationKind::Overdue => "overdue",
        NotificationKind::Stagnation => "stagnation",
    }
}

// Column parsing helpers; failures surface as conversion errors so they flow
// through rusqlite's row mapping.

fn parse_ts(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn parse_opt_ts(raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}

fn parse_date(raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str, column: usize) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn conversion_err(column: usize, message: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        message.to_string().into(),
    )
}
