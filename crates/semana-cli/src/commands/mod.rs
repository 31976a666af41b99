pub mod config;
pub mod context;
pub mod feedback;
pub mod notify;
pub mod plan;
pub mod project;
pub mod recommend;
pub mod session;
pub mod task;

use semana_core::storage::Config;

/// User the CLI operates as, taken from the config file.
pub fn user_id() -> String {
    Config::load()
        .map(|c| c.server.user_id)
        .unwrap_or_else(|_| "local".to_string())
}

/// Parse a priority flag value.
pub fn parse_priority(raw: &str) -> Result<semana_core::TaskPriority, String> {
    match raw {
        "low" => Ok(semana_core::TaskPriority::Low),
        "medium" => Ok(semana_core::TaskPriority::Medium),
        "high" => Ok(semana_core::TaskPriority::High),
        "urgent" => Ok(semana_core::TaskPriority::Urgent),
        _ => Err(format!(
            "unknown priority '{raw}' (expected low|medium|high|urgent)"
        )),
    }
}
