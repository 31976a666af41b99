//! Configuration management commands.

use clap::Subcommand;
use semana_core::storage::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Set the daily task goal
    SetGoal {
        /// Tasks per work day
        goal: u32,
    },
    /// Set work days (comma-separated ISO numbers, 1=Monday)
    SetWorkDays {
        /// e.g. "1,2,3,4,5"
        days: String,
    },
    /// Set the work-hour window
    SetHours {
        /// Start hour (0-23)
        start: u8,
        /// End hour (0-23)
        end: u8,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::SetGoal { goal } => {
            let mut config = Config::load()?;
            config.planner.daily_task_goal = goal.max(1);
            config.save()?;
            println!("daily_task_goal = {}", config.planner.daily_task_goal);
        }
        ConfigAction::SetWorkDays { days } => {
            let parsed: Result<Vec<u8>, _> =
                days.split(',').map(|d| d.trim().parse::<u8>()).collect();
            let mut parsed = parsed?;
            parsed.retain(|d| (1..=7).contains(d));
            parsed.sort_unstable();
            parsed.dedup();
            if parsed.is_empty() {
                return Err("at least one work day (1-7) is required".into());
            }
            let mut config = Config::load()?;
            config.planner.work_days = parsed;
            config.save()?;
            println!("work_days = {:?}", config.planner.work_days);
        }
        ConfigAction::SetHours { start, end } => {
            if start >= end || end > 23 {
                return Err("expected start < end <= 23".into());
            }
            let mut config = Config::load()?;
            config.planner.work_start_hour = start;
            config.planner.work_end_hour = end;
            config.save()?;
            println!("work hours = {start}:00-{end}:00");
        }
    }
    Ok(())
}
