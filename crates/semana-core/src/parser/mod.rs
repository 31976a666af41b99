//! Best-effort parser for freeform LLM output.
//!
//! The assistant's completions are asked to follow `ESTADO:`/`ACCIÓN:`
//! section markers but frequently don't. This module runs a cascade of
//! independent strategies — markers, paragraph sections, verb patterns,
//! sentence slicing, raw truncation — and tags the result with the strategy
//! that produced it, so callers can tell a confident parse from a last-resort
//! one. The cascade never fails: any non-empty input yields a result with
//! non-empty required fields.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum lengths (in characters) for a tier's result to be accepted.
const MIN_STATUS_CHARS: usize = 20;
const MIN_NEXT_STEPS_CHARS: usize = 15;

/// Default next step when a confident tier found a status but no action.
const DEFAULT_NEXT_STEPS: &str = "Continuar con el plan actual";

/// Risk classification extracted from the text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Fixed-shape result of parsing one completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub status_summary: String,
    pub next_steps: String,
    #[serde(default)]
    pub alerts: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub problems: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Which cascade tier produced the result, in decreasing confidence order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParseStrategy {
    Marker,
    Section,
    Pattern,
    Sentence,
    Truncate,
}

/// A parse result tagged with its producing strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub strategy: ParseStrategy,
    pub response: ParsedResponse,
}

/// Parse a completion through the strategy cascade.
pub fn parse_structured_text(raw: &str) -> ParseOutcome {
    let text = collapse_whitespace(raw);

    for (strategy, parse) in [
        (ParseStrategy::Marker, parse_by_markers as fn(&str) -> Option<ParsedResponse>),
        (ParseStrategy::Section, parse_by_sections),
        (ParseStrategy::Pattern, parse_by_patterns),
        (ParseStrategy::Sentence, parse_by_sentences),
    ] {
        if let Some(response) = parse(raw).filter(is_valid) {
            return ParseOutcome { strategy, response };
        }
    }

    ParseOutcome {
        strategy: ParseStrategy::Truncate,
        response: truncate_fallback(&text),
    }
}

fn is_valid(response: &ParsedResponse) -> bool {
    response.status_summary.chars().count() > MIN_STATUS_CHARS
        && response.next_steps.chars().count() > MIN_NEXT_STEPS_CHARS
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Derive the risk level from keyword presence anywhere in the text.
fn detect_risk(text: &str) -> RiskLevel {
    let lower = text.to_lowercase();
    const HIGH: &[&str] = &["crítico", "critico", "urgente", "bloqueado"];
    const MEDIUM: &[&str] = &["retraso", "problema"];

    if HIGH.iter().any(|k| lower.contains(k)) {
        RiskLevel::High
    } else if MEDIUM.iter().any(|k| lower.contains(k)) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

// ── Tier 1: section markers ────────────────────────────────────────────────

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(ESTADO|ACCIÓN|ACCION|ALERTA|INSIGHT|PROBLEMAS|SUGERENCIAS)\s*:\s*(.*)$")
            .unwrap()
    })
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s*(.+)$").unwrap())
}

fn parse_by_markers(raw: &str) -> Option<ParsedResponse> {
    let mut status = None;
    let mut next_steps = None;
    let mut alerts = Vec::new();
    let mut insights = Vec::new();
    let mut problems = Vec::new();
    let mut recommendations = Vec::new();

    // PROBLEMAS/SUGERENCIAS open a list block consumed until the next marker
    // or a blank line.
    #[derive(Clone, Copy)]
    enum ListTarget {
        Problems,
        Recommendations,
    }
    let mut current_list: Option<ListTarget> = None;

    for line in raw.lines() {
        if let Some(caps) = marker_re().captures(line) {
            let header = caps[1].to_uppercase();
            let rest = caps[2].trim().to_string();
            current_list = None;
            match header.as_str() {
                "ESTADO" => status = Some(rest),
                "ACCIÓN" | "ACCION" => next_steps = Some(rest),
                "ALERTA" => {
                    if !rest.is_empty() {
                        alerts.push(rest);
                    }
                }
                "INSIGHT" => {
                    if !rest.is_empty() {
                        insights.push(rest);
                    }
                }
                "PROBLEMAS" => {
                    if !rest.is_empty() {
                        problems.push(rest);
                    }
                    current_list = Some(ListTarget::Problems);
                }
                "SUGERENCIAS" => {
                    if !rest.is_empty() {
                        recommendations.push(rest);
                    }
                    current_list = Some(ListTarget::Recommendations);
                }
                _ => {}
            }
        } else if let Some(target) = current_list {
            if let Some(caps) = list_item_re().captures(line) {
                let item = caps[1].trim().to_string();
                match target {
                    ListTarget::Problems => problems.push(item),
                    ListTarget::Recommendations => recommendations.push(item),
                }
            } else if line.trim().is_empty() {
                current_list = None;
            }
        }
    }

    let status = status?;
    Some(ParsedResponse {
        next_steps: next_steps.filter(|s| !s.is_empty()).unwrap_or_else(|| DEFAULT_NEXT_STEPS.to_string()),
        status_summary: status,
        alerts,
        insights,
        risk_level: detect_risk(raw),
        problems,
        recommendations,
    })
}

// ── Tier 2: blank-line sections ────────────────────────────────────────────

fn parse_by_sections(raw: &str) -> Option<ParsedResponse> {
    let paragraphs: Vec<String> = raw
        .split("\n\n")
        .map(collapse_whitespace)
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.len() < 2 {
        return None;
    }

    Some(ParsedResponse {
        status_summary: paragraphs[0].clone(),
        next_steps: paragraphs[1].clone(),
        alerts: Vec::new(),
        insights: paragraphs.iter().skip(2).cloned().collect(),
        risk_level: detect_risk(raw),
        problems: Vec::new(),
        recommendations: Vec::new(),
    })
}

// ── Tier 3: state/action verb patterns ─────────────────────────────────────

fn state_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(está|esta en|tiene|muestra|presenta|avanza)\b").unwrap())
}

fn action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(debe(?:ría)?s?|recomiendo|sugiero|conviene|hay que)\b").unwrap()
    })
}

fn parse_by_patterns(raw: &str) -> Option<ParsedResponse> {
    let sentences = split_sentences(raw);

    let status = sentences.iter().find(|s| state_re().is_match(s))?;
    let next = sentences
        .iter()
        .find(|s| action_re().is_match(s) && s.as_str() != status.as_str())?;

    let insights: Vec<String> = sentences
        .iter()
        .filter(|s| {
            s.as_str() != status.as_str()
                && s.as_str() != next.as_str()
                && (state_re().is_match(s) || action_re().is_match(s))
        })
        .take(3)
        .cloned()
        .collect();

    Some(ParsedResponse {
        status_summary: status.clone(),
        next_steps: next.clone(),
        alerts: Vec::new(),
        insights,
        risk_level: detect_risk(raw),
        problems: Vec::new(),
        recommendations: Vec::new(),
    })
}

// ── Tier 4: first sentences ────────────────────────────────────────────────

fn parse_by_sentences(raw: &str) -> Option<ParsedResponse> {
    let sentences = split_sentences(raw);
    if sentences.len() < 2 {
        return None;
    }

    Some(ParsedResponse {
        status_summary: sentences[0].clone(),
        next_steps: sentences[1].clone(),
        alerts: Vec::new(),
        insights: sentences.iter().skip(2).take(3).cloned().collect(),
        risk_level: detect_risk(raw),
        problems: Vec::new(),
        recommendations: Vec::new(),
    })
}

// ── Tier 5: raw truncation ─────────────────────────────────────────────────

/// Last resort: clip the raw text into the two required fields. Risk is
/// forced to medium because nothing reliable could be extracted.
fn truncate_fallback(text: &str) -> ParsedResponse {
    let base = if text.is_empty() {
        "Sin contenido que analizar"
    } else {
        text
    };

    ParsedResponse {
        status_summary: clip(base, 200),
        next_steps: clip(base, 120),
        alerts: Vec::new(),
        insights: Vec::new(),
        risk_level: RiskLevel::Medium,
        problems: Vec::new(),
        recommendations: Vec::new(),
    }
}

fn split_sentences(raw: &str) -> Vec<String> {
    collapse_whitespace(raw)
        .split_inclusive(['.', '!', '?'])
        .map(|s| s.trim().trim_end_matches(['.', '!', '?']).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKED: &str = "ESTADO: El proyecto avanza según lo previsto esta semana\n\
ACCIÓN: Cerrar la revisión del presupuesto mañana\n\
ALERTA: El proveedor aún no ha confirmado plazos\n\
PROBLEMAS:\n- Falta la validación del cliente\n- El entorno de pruebas está caído\n\
SUGERENCIAS:\n- Adelantar la reunión de seguimiento\n";

    #[test]
    fn test_marker_parse() {
        let outcome = parse_structured_text(MARKED);
        assert_eq!(outcome.strategy, ParseStrategy::Marker);
        assert!(outcome.response.status_summary.contains("según lo previsto"));
        assert!(outcome.response.next_steps.contains("revisión del presupuesto"));
        assert_eq!(outcome.response.alerts.len(), 1);
        assert_eq!(outcome.response.problems.len(), 2);
        assert_eq!(outcome.response.recommendations.len(), 1);
    }

    #[test]
    fn test_marker_without_action_gets_default() {
        let raw = "ESTADO: Todo marcha correctamente y sin retrasos visibles";
        let outcome = parse_structured_text(raw);
        assert_eq!(outcome.strategy, ParseStrategy::Marker);
        assert_eq!(outcome.response.next_steps, DEFAULT_NEXT_STEPS);
    }

    #[test]
    fn test_risk_keywords() {
        let calm = "ESTADO: Semana tranquila con avances constantes en el proyecto\nACCIÓN: Mantener el ritmo actual de entregas";
        assert_eq!(
            parse_structured_text(calm).response.risk_level,
            RiskLevel::Low
        );
        // The PROBLEMAS header itself counts as a risk keyword.
        assert_eq!(
            parse_structured_text(MARKED).response.risk_level,
            RiskLevel::Medium
        );
        let risky = "ESTADO: El despliegue está bloqueado por dependencias externas\nACCIÓN: Escalar el bloqueo al equipo de plataforma";
        assert_eq!(
            parse_structured_text(risky).response.risk_level,
            RiskLevel::High
        );
        let delayed = "ESTADO: Hay un retraso acumulado de dos días en la entrega\nACCIÓN: Replanificar los hitos de la semana";
        assert_eq!(
            parse_structured_text(delayed).response.risk_level,
            RiskLevel::Medium
        );
    }

    #[test]
    fn test_section_parse_on_paragraphs() {
        let raw = "El equipo completó la migración de datos sin incidencias.\n\n\
Preparar el informe de cierre para el comité del jueves.\n\n\
La velocidad del equipo subió un 15% este mes.";
        let outcome = parse_structured_text(raw);
        assert_eq!(outcome.strategy, ParseStrategy::Section);
        assert!(outcome.response.status_summary.contains("migración"));
        assert!(outcome.response.next_steps.contains("informe"));
        assert_eq!(outcome.response.insights.len(), 1);
    }

    #[test]
    fn test_pattern_parse_on_verbs() {
        let raw = "El proyecto muestra un avance sostenido en todas las áreas. Recomiendo priorizar la integración de pagos esta semana.";
        let outcome = parse_structured_text(raw);
        assert_eq!(outcome.strategy, ParseStrategy::Pattern);
        assert!(outcome.response.status_summary.contains("avance sostenido"));
        assert!(outcome.response.next_steps.contains("priorizar"));
    }

    #[test]
    fn test_sentence_fallback() {
        let raw = "Terminamos la primera fase del piloto con buenos resultados. Queda pendiente agendar la retrospectiva del equipo. Hubo menos incidencias que el mes pasado.";
        let outcome = parse_structured_text(raw);
        // No markers, one paragraph, no state/action verbs: sentence tier.
        assert_eq!(outcome.strategy, ParseStrategy::Sentence);
        assert!(outcome.response.status_summary.contains("primera fase"));
        assert!(outcome.response.next_steps.contains("retrospectiva"));
        assert_eq!(outcome.response.insights.len(), 1);
    }

    #[test]
    fn test_truncate_fallback_on_single_word() {
        let outcome = parse_structured_text("ok");
        assert_eq!(outcome.strategy, ParseStrategy::Truncate);
        assert_eq!(outcome.response.status_summary, "ok");
        assert!(!outcome.response.next_steps.is_empty());
        assert_eq!(outcome.response.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_whitespace_only_input_still_yields_fields() {
        let outcome = parse_structured_text("   \n\t  \n ");
        assert_eq!(outcome.strategy, ParseStrategy::Truncate);
        assert!(!outcome.response.status_summary.is_empty());
        assert!(!outcome.response.next_steps.is_empty());
    }

    #[test]
    fn test_html_escaped_text_does_not_panic() {
        let raw = "&lt;div&gt;Estado del proyecto&lt;/div&gt; &amp; resto";
        let outcome = parse_structured_text(raw);
        assert!(!outcome.response.status_summary.is_empty());
        assert!(!outcome.response.next_steps.is_empty());
    }

    #[test]
    fn test_never_empty_for_any_nonempty_input() {
        for raw in ["a", "¿?", "....", "palabra", "\u{00a0}", "1 2 3"] {
            let outcome = parse_structured_text(raw);
            assert!(
                !outcome.response.status_summary.is_empty(),
                "empty status for {raw:?}"
            );
            assert!(
                !outcome.response.next_steps.is_empty(),
                "empty next steps for {raw:?}"
            );
        }
    }
}
