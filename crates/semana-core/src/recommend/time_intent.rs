//! Natural-language detection of available-time expressions.
//!
//! Decides whether a free-form message mentions a time budget ("tengo 30
//! minutos", "media hora") before the recommendation engine is invoked at all.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Result of scanning a message for a time budget.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeIntention {
    /// Parsed minutes, when an explicit amount was found
    pub minutes: Option<u32>,
    /// Whether the message mentions available time at all
    pub mentioned: bool,
}

fn minutes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,3})\s*(?:min(?:utos?)?)\b").unwrap())
}

fn hours_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})\s*(?:h\b|horas?\b)").unwrap())
}

/// Bare phrases that signal free time without an amount.
const FREE_TIME_PHRASES: &[&str] = &[
    "tengo tiempo",
    "tiempo libre",
    "un rato",
    "un hueco",
    "estoy libre",
];

/// Scan a message for a time budget.
///
/// Recognizes explicit amounts ("30 minutos", "2 horas"), common Spanish
/// idioms ("media hora", "un cuarto de hora", "una hora"), and bare
/// availability phrases which set `mentioned` without an amount.
pub fn detect_time_intention(message: &str) -> TimeIntention {
    let text = message.to_lowercase();

    if let Some(caps) = minutes_re().captures(&text) {
        if let Ok(minutes) = caps[1].parse::<u32>() {
            return TimeIntention {
                minutes: Some(minutes),
                mentioned: true,
            };
        }
    }

    if text.contains("cuarto de hora") {
        return TimeIntention {
            minutes: Some(15),
            mentioned: true,
        };
    }
    if text.contains("media hora") {
        return TimeIntention {
            minutes: Some(30),
            mentioned: true,
        };
    }
    if text.contains("una hora") {
        return TimeIntention {
            minutes: Some(60),
            mentioned: true,
        };
    }

    if let Some(caps) = hours_re().captures(&text) {
        if let Ok(hours) = caps[1].parse::<u32>() {
            return TimeIntention {
                minutes: Some(hours.saturating_mul(60)),
                mentioned: true,
            };
        }
    }

    if FREE_TIME_PHRASES.iter().any(|p| text.contains(p)) {
        return TimeIntention {
            minutes: None,
            mentioned: true,
        };
    }

    TimeIntention::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_minutes() {
        let intent = detect_time_intention("Tengo 30 minutos antes de la reunión");
        assert_eq!(intent.minutes, Some(30));
        assert!(intent.mentioned);
    }

    #[test]
    fn test_abbreviated_minutes() {
        assert_eq!(detect_time_intention("solo 10 min").minutes, Some(10));
    }

    #[test]
    fn test_half_hour_idiom() {
        assert_eq!(detect_time_intention("tengo media hora").minutes, Some(30));
    }

    #[test]
    fn test_quarter_hour_idiom() {
        assert_eq!(
            detect_time_intention("me queda un cuarto de hora").minutes,
            Some(15)
        );
    }

    #[test]
    fn test_one_hour_idiom() {
        assert_eq!(detect_time_intention("tengo una hora libre").minutes, Some(60));
    }

    #[test]
    fn test_numeric_hours() {
        assert_eq!(detect_time_intention("dispongo de 2 horas").minutes, Some(120));
    }

    #[test]
    fn test_bare_availability_phrase() {
        let intent = detect_time_intention("tengo tiempo libre esta tarde");
        assert!(intent.mentioned);
        assert_eq!(intent.minutes, None);
    }

    #[test]
    fn test_no_intention() {
        let intent = detect_time_intention("¿cómo va el proyecto?");
        assert!(!intent.mentioned);
        assert_eq!(intent.minutes, None);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(detect_time_intention("TENGO 45 MINUTOS").minutes, Some(45));
    }
}
