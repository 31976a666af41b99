//! Recommendation feedback and learning-state commands.

use chrono::{Timelike, Utc};
use clap::Subcommand;
use semana_core::learning::{FeedbackAction, FeedbackEvent, FeedbackLearner};
use semana_core::storage::Database;

use super::{parse_priority, user_id};

#[derive(Subcommand)]
pub enum FeedbackCliAction {
    /// Record feedback on a recommendation
    Record {
        /// One of: accepted, skipped, completed, positive, negative
        action: String,
        /// Task the recommendation referred to
        #[arg(long)]
        task_id: Option<String>,
        /// Satisfaction 1-5
        #[arg(long)]
        satisfaction: Option<u8>,
        /// Priority of the recommended task
        #[arg(long)]
        priority: Option<String>,
        /// Comma-separated tags of the recommended task
        #[arg(long)]
        tags: Option<String>,
    },
    /// Show current adaptive weights
    Weights,
    /// Show learned rules
    Rules,
    /// Show recent learning insights
    Insights,
}

fn parse_action(raw: &str) -> Result<FeedbackAction, String> {
    match raw {
        "accepted" => Ok(FeedbackAction::Accepted),
        "skipped" => Ok(FeedbackAction::Skipped),
        "completed" => Ok(FeedbackAction::Completed),
        "positive" => Ok(FeedbackAction::FeedbackPositive),
        "negative" => Ok(FeedbackAction::FeedbackNegative),
        _ => Err(format!(
            "unknown action '{raw}' (expected accepted|skipped|completed|positive|negative)"
        )),
    }
}

pub fn run(action: FeedbackCliAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let user = user_id();

    match action {
        FeedbackCliAction::Record {
            action,
            task_id,
            satisfaction,
            priority,
            tags,
        } => {
            let mut event = FeedbackEvent::new(user.clone(), parse_action(&action)?);
            event.task_id = task_id;
            event.satisfaction = satisfaction.map(|s| s.clamp(1, 5));
            event.context.hour = Utc::now().hour() as u8;
            event.context.priority = priority.as_deref().map(parse_priority).transpose()?;
            event.context.tags = tags
                .map(|raw| raw.split(',').map(|t| t.trim().to_string()).collect())
                .unwrap_or_default();

            let learner = FeedbackLearner::new(&db, &user);
            let insights = learner.process_feedback(&event)?;
            println!("{}", serde_json::to_string_pretty(&insights)?);
        }
        FeedbackCliAction::Weights => {
            let weights = db.list_weights(&user)?;
            println!("{}", serde_json::to_string_pretty(&weights)?);
        }
        FeedbackCliAction::Rules => {
            let rules = db.list_rules(&user)?;
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
        FeedbackCliAction::Insights => {
            let insights = db.recent_insights(&user, 20)?;
            println!("{}", serde_json::to_string_pretty(&insights)?);
        }
    }
    Ok(())
}
