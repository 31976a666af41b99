//! Weekly plan commands.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use semana_core::planner::{
    week_start_of, PlanOutcome, PlanStatus, PlanStrategy, ProductivityHistory, WeeklyPlanner,
};
use semana_core::storage::{Config, Database};

use super::user_id;

#[derive(Subcommand)]
pub enum PlanAction {
    /// Generate and store a plan for a week
    Generate {
        /// Week start date (YYYY-MM-DD); defaults to this week's Monday
        #[arg(long)]
        week_start: Option<String>,
        /// Strategy: balanced, focused, intensive
        #[arg(long, default_value = "balanced")]
        strategy: String,
    },
    /// Show the stored plan for a week
    Show {
        /// Week start date (YYYY-MM-DD); defaults to this week's Monday
        #[arg(long)]
        week_start: Option<String>,
    },
    /// Mark the week's plan active
    Activate {
        #[arg(long)]
        week_start: Option<String>,
    },
    /// Mark the week's plan completed
    Complete {
        #[arg(long)]
        week_start: Option<String>,
    },
}

fn resolve_week_start(raw: Option<String>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match raw {
        Some(raw) => Ok(NaiveDate::parse_from_str(&raw, "%Y-%m-%d")?),
        None => Ok(week_start_of(Utc::now().date_naive())),
    }
}

pub fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let user = user_id();

    match action {
        PlanAction::Generate {
            week_start,
            strategy,
        } => {
            let week_start = resolve_week_start(week_start)?;
            let strategy = PlanStrategy::parse(&strategy)
                .ok_or_else(|| format!("unknown strategy '{strategy}'"))?;

            let config = Config::load()?;
            let completed = db.completed_tasks_since(&user, 30)?;
            let sessions = db.sessions_since(&user, 30)?;
            let history = ProductivityHistory::from_records(&completed, &sessions);
            let tasks = db.list_tasks(&user)?;

            let planner = WeeklyPlanner::new(&config.planner, &history);
            match planner.plan(&user, week_start, strategy, &tasks) {
                PlanOutcome::Planned(bundle) => {
                    db.upsert_weekly_plan(&bundle.plan)?;
                    println!("{}", serde_json::to_string_pretty(&bundle)?);
                }
                PlanOutcome::NothingToPlan => {
                    println!("No hay tareas pendientes que planificar.");
                }
            }
        }
        PlanAction::Show { week_start } => {
            let week_start = resolve_week_start(week_start)?;
            match db.get_weekly_plan(&user, week_start)? {
                Some(plan) => println!("{}", serde_json::to_string_pretty(&plan)?),
                None => println!("No hay plan guardado para la semana del {week_start}."),
            }
        }
        PlanAction::Activate { week_start } => {
            let week_start = resolve_week_start(week_start)?;
            db.set_plan_status(&user, week_start, PlanStatus::Active)?;
            println!("Plan de la semana del {week_start} activado.");
        }
        PlanAction::Complete { week_start } => {
            let week_start = resolve_week_start(week_start)?;
            db.set_plan_status(&user, week_start, PlanStatus::Completed)?;
            println!("Plan de la semana del {week_start} completado.");
        }
    }
    Ok(())
}
