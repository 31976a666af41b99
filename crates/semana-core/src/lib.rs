//! # Semana Core Library
//!
//! This library provides the core business logic for the Semana task
//! planner. It implements a CLI-first philosophy where all operations are
//! available via a standalone CLI binary, with the HTTP functions service
//! being a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Context Analysis**: Pure scoring of the current workload into an
//!   urgency score, focus area, and recommended actions
//! - **Recommendations**: Time-budget-aware, explainable top-3 suggestions
//! - **Learning**: Feedback-driven adaptive weights and preference rules
//! - **Planner**: Greedy weekly bin packing over day hour/task budgets
//! - **Storage**: SQLite record store and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`ContextAnalyzer`]: Workload and urgency assessment
//! - [`WeeklyPlanner`]: Seven-day plan generation
//! - [`FeedbackLearner`]: Feedback processing pipeline
//! - [`Database`]: Record persistence
//! - [`Config`]: Application configuration management

pub mod context;
pub mod error;
pub mod learning;
pub mod llm;
pub mod metrics;
pub mod notify;
pub mod parser;
pub mod planner;
pub mod recommend;
pub mod storage;
pub mod task;

pub use context::{ContextAnalysis, ContextAnalyzer, ContextSnapshot, FocusArea, WorkloadLevel};
pub use error::{ConfigError, CoreError, DatabaseError, LlmError, ValidationError};
pub use learning::{
    AdaptiveWeight, FeedbackAction, FeedbackEvent, FeedbackLearner, LearningInsight, LearningRule,
};
pub use metrics::{stagnation_risk, ActivityMetrics, StagnationRisk};
pub use notify::{proactive_scan, NotificationDraft, ReminderPoller, SmartReminder};
pub use parser::{parse_structured_text, ParseOutcome, ParseStrategy, ParsedResponse, RiskLevel};
pub use planner::{
    DayPlan, PlanBundle, PlanOutcome, PlanStatus, PlanStrategy, ProductivityHistory, WeeklyPlan,
    WeeklyPlanner,
};
pub use recommend::{detect_time_intention, estimate_duration, TimeIntention, TimeRecommendation};
pub use storage::{Config, Database, PlannerPreferences};
pub use task::{Project, Task, TaskLevel, TaskPriority, TaskStatus, WorkSession};
