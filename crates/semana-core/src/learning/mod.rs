//! Feedback learning: adaptive weights, learned rules, and pattern insights.
//!
//! Each user feedback event (accept/skip/complete/thumbs) is appended to the
//! store and folded into three incremental structures:
//!
//! - per-factor adaptive weights, nudged within a bounded range
//! - preference/avoidance rules keyed by a canonical condition
//! - a rolling pattern analysis over the most recent ~50 events
//!
//! The arithmetic lives in pure functions; [`FeedbackLearner`] wires them to
//! the store and surfaces each storage failure as a `Result` so callers can
//! decide to degrade instead of blocking the interactive flow.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::Database;
use crate::task::TaskPriority;

/// Factors whose weights bias future scoring.
pub const WEIGHT_FACTORS: &[&str] = &["urgency", "context", "pattern", "momentum", "learning"];

/// Window of recent feedback rows considered by the pattern analysis.
pub const ANALYSIS_WINDOW: usize = 50;
/// Minimum rows before any insight is produced.
const MIN_ROWS_FOR_INSIGHTS: usize = 10;
/// Minimum samples for an hour to compete as "best hour".
const MIN_HOUR_SAMPLES: usize = 3;

/// Weight nudge amounts per feedback direction.
const POSITIVE_NUDGE: f64 = 0.05;
const NEGATIVE_NUDGE: f64 = 0.03;
/// Soft bounds every adaptive weight stays within.
pub const WEIGHT_MIN: f64 = 0.5;
pub const WEIGHT_MAX: f64 = 1.5;

/// Score deltas attached to learned rules.
const PREFERENCE_BOOST: i32 = 20;
const AVOIDANCE_PENALTY: i32 = -15;

/// User feedback on a recommendation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Accepted,
    Skipped,
    Completed,
    FeedbackPositive,
    FeedbackNegative,
}

impl FeedbackAction {
    /// Whether this action endorses the recommendation.
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            FeedbackAction::Accepted | FeedbackAction::Completed | FeedbackAction::FeedbackPositive
        )
    }
}

/// Context captured alongside a feedback event, used as the rule key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackContext {
    /// Hour of day (0-23) the recommendation was shown
    pub hour: u8,
    pub priority: Option<TaskPriority>,
    pub tags: Vec<String>,
}

/// One feedback event. Append-only; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub id: String,
    pub user_id: String,
    pub task_id: Option<String>,
    pub action: FeedbackAction,
    /// Self-reported satisfaction 1-5, when given
    pub satisfaction: Option<u8>,
    pub context: FeedbackContext,
    pub created_at: DateTime<Utc>,
}

impl FeedbackEvent {
    pub fn new(user_id: impl Into<String>, action: FeedbackAction) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            task_id: None,
            action,
            satisfaction: None,
            context: FeedbackContext {
                hour: now.hour() as u8,
                priority: None,
                tags: Vec::new(),
            },
            created_at: now,
        }
    }
}

/// Direction a weight has been moving.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Per-user, per-factor scalar biasing future scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveWeight {
    pub user_id: String,
    pub factor: String,
    /// Always within [0.5, 1.5]
    pub weight: f64,
    /// Grows with sample size, capped at 1.0
    pub confidence: f64,
    pub trend: TrendDirection,
    pub sample_size: u32,
}

impl AdaptiveWeight {
    /// Neutral starting weight for a factor.
    pub fn neutral(user_id: impl Into<String>, factor: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            factor: factor.into(),
            weight: 1.0,
            confidence: 0.5,
            trend: TrendDirection::Stable,
            sample_size: 0,
        }
    }

    /// Nudge the weight by one feedback event.
    ///
    /// Positive feedback moves it up by 0.05, negative down by 0.03, always
    /// clamped to [0.5, 1.5]. Confidence is recomputed from the sample count.
    pub fn nudge(&mut self, action: FeedbackAction) {
        let before = self.weight;
        let delta = if action.is_positive() {
            POSITIVE_NUDGE
        } else {
            -NEGATIVE_NUDGE
        };
        self.weight = (self.weight + delta).clamp(WEIGHT_MIN, WEIGHT_MAX);
        self.sample_size += 1;
        self.confidence = (0.5 + self.sample_size as f64 * 0.02).min(1.0);
        self.trend = if self.weight > before {
            TrendDirection::Increasing
        } else if self.weight < before {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };
    }
}

/// Kind of learned rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Preference,
    Avoidance,
    Timing,
    Energy,
}

/// Condition a rule fires on. Tags are kept sorted so the serialized form is
/// canonical and usable as a dedup key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleCondition {
    pub hour: u8,
    pub priority: Option<TaskPriority>,
    pub tags: Vec<String>,
}

impl RuleCondition {
    pub fn from_context(context: &FeedbackContext) -> Self {
        let mut tags = context.tags.clone();
        tags.sort();
        tags.dedup();
        Self {
            hour: context.hour,
            priority: context.priority,
            tags,
        }
    }

    /// Canonical serialized form used as the upsert key.
    pub fn canonical_key(&self) -> String {
        // Field order is fixed by the struct; tags are sorted in the
        // constructor, so equal conditions always serialize identically.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A learned condition → score-delta rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRule {
    pub id: String,
    pub user_id: String,
    pub rule_type: RuleType,
    pub condition: RuleCondition,
    /// Score delta applied when the condition matches (+20 / -15)
    pub score_delta: i32,
    pub confidence: f64,
    pub usage_count: u32,
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
}

impl LearningRule {
    fn fresh(event: &FeedbackEvent) -> Self {
        let (rule_type, score_delta) = if event.action.is_positive() {
            (RuleType::Preference, PREFERENCE_BOOST)
        } else {
            (RuleType::Avoidance, AVOIDANCE_PENALTY)
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: event.user_id.clone(),
            rule_type,
            condition: RuleCondition::from_context(&event.context),
            score_delta,
            confidence: 0.3,
            usage_count: 1,
            success_rate: if event.action.is_positive() { 1.0 } else { 0.0 },
            created_at: event.created_at,
        }
    }

    /// Fold another matching event into the rule: bump usage, recompute the
    /// running success rate, and grow confidence by 0.1 up to 1.0.
    fn reinforce(&mut self, event: &FeedbackEvent) {
        let outcome = if event.action.is_positive() { 1.0 } else { 0.0 };
        let count = self.usage_count as f64;
        self.success_rate = (self.success_rate * count + outcome) / (count + 1.0);
        self.usage_count += 1;
        self.confidence = (self.confidence + 0.1).min(1.0);
    }
}

/// Upsert step for a rule: reinforce the existing row or create a fresh one.
pub fn update_rule(existing: Option<LearningRule>, event: &FeedbackEvent) -> LearningRule {
    match existing {
        Some(mut rule) => {
            rule.reinforce(event);
            rule
        }
        None => LearningRule::fresh(event),
    }
}

/// Typed insight emitted by the pattern analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningInsight {
    pub kind: InsightKind,
    pub message: String,
    pub confidence: f64,
    pub actionable: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    PatternDetected,
    BestHour,
    Trend,
}

/// Rolling analysis over the most recent feedback rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub total: usize,
    /// (accepted + completed) / total
    pub acceptance_rate: f64,
    /// Hour with the highest accept-rate among hours with ≥3 samples
    pub best_hour: Option<u8>,
    /// Most-recent-10 vs previous-10 positive-ratio comparison
    pub trend: TrendDirection,
}

/// Analyze the most recent feedback rows, newest first.
///
/// Fewer than 10 rows yields an analysis with no insights; that is a valid
/// outcome, not an error.
pub fn analyze_patterns(recent: &[FeedbackEvent]) -> (PatternAnalysis, Vec<LearningInsight>) {
    let window = &recent[..recent.len().min(ANALYSIS_WINDOW)];
    let total = window.len();

    let accepted = window
        .iter()
        .filter(|e| {
            matches!(
                e.action,
                FeedbackAction::Accepted | FeedbackAction::Completed
            )
        })
        .count();
    let acceptance_rate = if total == 0 {
        0.0
    } else {
        accepted as f64 / total as f64
    };

    let best_hour = best_hour(window);
    let trend = recent_trend(window);

    let analysis = PatternAnalysis {
        total,
        acceptance_rate,
        best_hour,
        trend,
    };

    if total < MIN_ROWS_FOR_INSIGHTS {
        return (analysis, Vec::new());
    }

    let mut insights = Vec::new();
    if acceptance_rate < 0.5 {
        insights.push(LearningInsight {
            kind: InsightKind::PatternDetected,
            message: format!(
                "Solo aceptas el {:.0}% de las sugerencias; conviene ajustar los criterios",
                acceptance_rate * 100.0
            ),
            confidence: 0.7,
            actionable: true,
        });
    } else if acceptance_rate > 0.8 {
        insights.push(LearningInsight {
            kind: InsightKind::PatternDetected,
            message: format!(
                "Aceptas el {:.0}% de las sugerencias; el criterio actual funciona",
                acceptance_rate * 100.0
            ),
            confidence: 0.7,
            actionable: false,
        });
    }

    if let Some(hour) = best_hour {
        insights.push(LearningInsight {
            kind: InsightKind::BestHour,
            message: format!("Las sugerencias de las {hour}:00 son las que mejor funcionan"),
            confidence: 0.6,
            actionable: true,
        });
    }

    match trend {
        TrendDirection::Increasing => insights.push(LearningInsight {
            kind: InsightKind::Trend,
            message: "Tu tasa de aceptación está mejorando".to_string(),
            confidence: 0.6,
            actionable: false,
        }),
        TrendDirection::Decreasing => insights.push(LearningInsight {
            kind: InsightKind::Trend,
            message: "Tu tasa de aceptación está bajando".to_string(),
            confidence: 0.6,
            actionable: true,
        }),
        TrendDirection::Stable => {}
    }

    (analysis, insights)
}

/// Hour of day with the best accept-rate among hours with enough samples.
fn best_hour(window: &[FeedbackEvent]) -> Option<u8> {
    let mut per_hour: [(usize, usize); 24] = [(0, 0); 24];
    for event in window {
        let slot = &mut per_hour[(event.context.hour as usize).min(23)];
        slot.0 += 1;
        if event.action.is_positive() {
            slot.1 += 1;
        }
    }

    per_hour
        .iter()
        .enumerate()
        .filter(|(_, (count, _))| *count >= MIN_HOUR_SAMPLES)
        .max_by(|(_, (ca, pa)), (_, (cb, pb))| {
            let ra = *pa as f64 / *ca as f64;
            let rb = *pb as f64 / *cb as f64;
            ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(hour, _)| hour as u8)
}

/// Compare the most recent 10 events against the previous 10.
fn recent_trend(window: &[FeedbackEvent]) -> TrendDirection {
    if window.len() < 20 {
        return TrendDirection::Stable;
    }
    let ratio = |events: &[FeedbackEvent]| {
        events.iter().filter(|e| e.action.is_positive()).count() as f64 / events.len() as f64
    };
    // Window is ordered newest first.
    let recent = ratio(&window[..10]);
    let previous = ratio(&window[10..20]);
    let delta = recent - previous;
    if delta > 0.1 {
        TrendDirection::Increasing
    } else if delta < -0.1 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Feedback learner bound to the store for one user.
pub struct FeedbackLearner<'a> {
    db: &'a Database,
    user_id: &'a str,
}

impl<'a> FeedbackLearner<'a> {
    pub fn new(db: &'a Database, user_id: &'a str) -> Self {
        Self { db, user_id }
    }

    /// Process one feedback event end to end: persist it, re-analyze recent
    /// history, update the matching rule, and nudge every factor weight.
    ///
    /// Returns the insights produced by the analysis (possibly empty).
    ///
    /// # Errors
    /// Any storage failure is returned to the caller; callers that must not
    /// block on learning can drop the error and continue with no insights.
    pub fn process_feedback(&self, event: &FeedbackEvent) -> Result<Vec<LearningInsight>> {
        self.db.insert_feedback(event)?;

        let recent = self.db.recent_feedback(self.user_id, ANALYSIS_WINDOW)?;
        let (_, insights) = analyze_patterns(&recent);
        for insight in &insights {
            self.db.insert_insight(self.user_id, insight)?;
        }

        self.update_rules(event)?;
        self.adjust_weights(event)?;

        Ok(insights)
    }

    fn update_rules(&self, event: &FeedbackEvent) -> Result<()> {
        let condition = RuleCondition::from_context(&event.context);
        let rule_type = if event.action.is_positive() {
            RuleType::Preference
        } else {
            RuleType::Avoidance
        };
        let existing = self
            .db
            .find_rule(self.user_id, rule_type, &condition.canonical_key())?;
        let rule = update_rule(existing, event);
        self.db.upsert_rule(&rule)?;
        Ok(())
    }

    fn adjust_weights(&self, event: &FeedbackEvent) -> Result<()> {
        for factor in WEIGHT_FACTORS {
            let mut weight = self
                .db
                .get_weight(self.user_id, factor)?
                .unwrap_or_else(|| AdaptiveWeight::neutral(self.user_id, *factor));
            weight.nudge(event.action);
            self.db.upsert_weight(&weight)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn event_at(hour: u8, action: FeedbackAction) -> FeedbackEvent {
        let mut e = FeedbackEvent::new("local", action);
        e.context.hour = hour;
        e
    }

    #[test]
    fn test_weight_nudge_up_and_down() {
        let mut w = AdaptiveWeight::neutral("local", "urgency");
        w.nudge(FeedbackAction::Accepted);
        assert!((w.weight - 1.05).abs() < 1e-9);
        assert_eq!(w.trend, TrendDirection::Increasing);

        w.nudge(FeedbackAction::Skipped);
        assert!((w.weight - 1.02).abs() < 1e-9);
        assert_eq!(w.trend, TrendDirection::Decreasing);
    }

    #[test]
    fn test_five_skips_from_neutral() {
        // Spec scenario: five skips starting at 1.0 land on 0.85.
        let mut w = AdaptiveWeight::neutral("local", "urgency");
        for _ in 0..5 {
            w.nudge(FeedbackAction::Skipped);
        }
        assert!((w.weight - 0.85).abs() < 1e-9);
        assert_eq!(w.sample_size, 5);
    }

    #[test]
    fn test_weight_never_leaves_bounds() {
        let mut w = AdaptiveWeight::neutral("local", "momentum");
        for _ in 0..100 {
            w.nudge(FeedbackAction::Accepted);
        }
        assert!(w.weight <= WEIGHT_MAX);
        assert_eq!(w.trend, TrendDirection::Stable); // pinned at the cap

        for _ in 0..100 {
            w.nudge(FeedbackAction::Skipped);
        }
        assert!(w.weight >= WEIGHT_MIN);
    }

    #[test]
    fn test_confidence_grows_with_samples() {
        let mut w = AdaptiveWeight::neutral("local", "context");
        for _ in 0..10 {
            w.nudge(FeedbackAction::Accepted);
        }
        assert!((w.confidence - 0.7).abs() < 1e-9);
        for _ in 0..30 {
            w.nudge(FeedbackAction::Accepted);
        }
        assert!((w.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rule_created_then_reinforced() {
        let event = event_at(9, FeedbackAction::Accepted);
        let rule = update_rule(None, &event);
        assert_eq!(rule.rule_type, RuleType::Preference);
        assert_eq!(rule.score_delta, 20);
        assert_eq!(rule.usage_count, 1);
        assert!((rule.success_rate - 1.0).abs() < 1e-9);

        let skip = event_at(9, FeedbackAction::Skipped);
        let rule = update_rule(Some(rule), &skip);
        assert_eq!(rule.usage_count, 2);
        assert!((rule.success_rate - 0.5).abs() < 1e-9);
        assert!((rule.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_avoidance_rule_from_skip() {
        let event = event_at(22, FeedbackAction::FeedbackNegative);
        let rule = update_rule(None, &event);
        assert_eq!(rule.rule_type, RuleType::Avoidance);
        assert_eq!(rule.score_delta, -15);
    }

    #[test]
    fn test_canonical_key_ignores_tag_order() {
        let mut a = FeedbackContext {
            hour: 9,
            priority: Some(TaskPriority::High),
            tags: vec!["ventas".into(), "cliente".into()],
        };
        let cond_a = RuleCondition::from_context(&a);
        a.tags.reverse();
        let cond_b = RuleCondition::from_context(&a);
        assert_eq!(cond_a.canonical_key(), cond_b.canonical_key());
    }

    #[test]
    fn test_too_few_rows_produce_no_insights() {
        let events: Vec<_> = (0..5)
            .map(|_| event_at(9, FeedbackAction::Accepted))
            .collect();
        let (analysis, insights) = analyze_patterns(&events);
        assert_eq!(analysis.total, 5);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_low_acceptance_insight() {
        let events: Vec<_> = (0..12)
            .map(|i| {
                event_at(
                    9,
                    if i < 3 {
                        FeedbackAction::Accepted
                    } else {
                        FeedbackAction::Skipped
                    },
                )
            })
            .collect();
        let (analysis, insights) = analyze_patterns(&events);
        assert!(analysis.acceptance_rate < 0.5);
        assert!(insights
            .iter()
            .any(|i| i.kind == InsightKind::PatternDetected && i.actionable));
    }

    #[test]
    fn test_best_hour_requires_three_samples() {
        // Hour 9: 3 accepts. Hour 15: 1 accept (too few samples to count).
        let mut events = Vec::new();
        for _ in 0..3 {
            events.push(event_at(9, FeedbackAction::Accepted));
        }
        events.push(event_at(15, FeedbackAction::Accepted));
        for _ in 0..8 {
            events.push(event_at(11, FeedbackAction::Skipped));
        }
        let (analysis, _) = analyze_patterns(&events);
        assert_eq!(analysis.best_hour, Some(9));
    }

    #[test]
    fn test_trend_improving() {
        // Newest first: 10 accepts, then 10 skips before them.
        let mut events = Vec::new();
        for _ in 0..10 {
            events.push(event_at(9, FeedbackAction::Accepted));
        }
        for _ in 0..10 {
            events.push(event_at(9, FeedbackAction::Skipped));
        }
        let (analysis, _) = analyze_patterns(&events);
        assert_eq!(analysis.trend, TrendDirection::Increasing);
    }

    proptest! {
        #[test]
        fn prop_weight_bounded_under_any_sequence(
            actions in proptest::collection::vec(
                prop_oneof![
                    Just(FeedbackAction::Accepted),
                    Just(FeedbackAction::Skipped),
                    Just(FeedbackAction::Completed),
                    Just(FeedbackAction::FeedbackNegative),
                ],
                0..200,
            )
        ) {
            let mut w = AdaptiveWeight::neutral("local", "pattern");
            for action in actions {
                w.nudge(action);
                prop_assert!((WEIGHT_MIN..=WEIGHT_MAX).contains(&w.weight));
                prop_assert!(w.confidence <= 1.0);
            }
        }
    }
}
