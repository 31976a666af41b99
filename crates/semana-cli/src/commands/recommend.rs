//! Time-based recommendation command.

use chrono::Utc;
use clap::Args;
use semana_core::recommend::{detect_time_intention, recommend};
use semana_core::storage::Database;

use super::user_id;

#[derive(Args)]
pub struct RecommendArgs {
    /// Available time in minutes
    #[arg(long, conflicts_with = "message")]
    minutes: Option<u32>,
    /// Free-form message to parse for a time budget, e.g. "tengo media hora"
    #[arg(long)]
    message: Option<String>,
}

pub fn run(args: RecommendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let available = match (args.minutes, args.message) {
        (Some(minutes), _) => minutes,
        (None, Some(message)) => {
            let intent = detect_time_intention(&message);
            if !intent.mentioned {
                println!("El mensaje no menciona tiempo disponible.");
                return Ok(());
            }
            // A bare availability phrase defaults to half an hour.
            intent.minutes.unwrap_or(30)
        }
        (None, None) => 30,
    };

    let db = Database::open()?;
    let user = user_id();
    let tasks = db.list_tasks(&user)?;
    let recommendations = recommend(&tasks, available, Utc::now());

    if recommendations.is_empty() {
        println!("No hay tareas que encajen en {available} minutos.");
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&recommendations)?);
    Ok(())
}
