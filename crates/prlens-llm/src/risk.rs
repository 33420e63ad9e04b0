//! JSON-mode risk-assessment parsing (spec §4.2, §9 REDESIGN FLAG: model
//! exception-driven LLM parsing as a tagged result rather than raising).

use serde::{Deserialize, Serialize};

/// The risk-assessment sub-contract's response shape (spec §4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub file_path: String,
    pub risk_score_file: f32,
    pub high_risk_flag: bool,
    pub reasons: Vec<String>,
    pub confidence: f32,
}

impl RiskAssessment {
    pub fn zero(file_path: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskAssessment {
            file_path: file_path.into(),
            risk_score_file: 0.0,
            high_risk_flag: false,
            reasons: vec![reason.into()],
            confidence: 0.0,
        }
    }
}

/// Outcome of parsing a chat completion as a risk assessment. Callers branch
/// on the tag instead of catching a parse exception.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskParseOutcome {
    /// Parsed on the first attempt, no recovery needed.
    Ok(RiskAssessment),
    /// Parsed only after fence-stripping and/or greedy object extraction.
    Recovered { raw: String, assessment: RiskAssessment },
    /// Never parsed; `assessment` is a zero-score stand-in carrying the
    /// parse error as its sole reason.
    Failed { error: String, assessment: RiskAssessment },
}

impl RiskParseOutcome {
    pub fn assessment(&self) -> &RiskAssessment {
        match self {
            RiskParseOutcome::Ok(a) => a,
            RiskParseOutcome::Recovered { assessment, .. } => assessment,
            RiskParseOutcome::Failed { assessment, .. } => assessment,
        }
    }
}

/// Strip a leading/trailing ```-fenced block (with optional language tag).
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
        return rest.trim();
    }
    trimmed
}

/// Greedily extract the first `{ ... }` block by brace depth, ignoring
/// braces inside string literals.
fn extract_first_object(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let start = s.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a chat completion into a risk assessment using the three-step
/// recovery algorithm of spec §4.2.
pub fn parse_risk_assessment(file_path: &str, raw: &str) -> RiskParseOutcome {
    let stripped = strip_fence(raw);

    if let Ok(assessment) = serde_json::from_str::<RiskAssessment>(stripped) {
        return RiskParseOutcome::Ok(assessment);
    }

    if let Some(obj) = extract_first_object(stripped) {
        if let Ok(assessment) = serde_json::from_str::<RiskAssessment>(obj) {
            return RiskParseOutcome::Recovered { raw: raw.to_string(), assessment };
        }
    }

    RiskParseOutcome::Failed {
        error: "no valid risk-assessment JSON object found in response".to_string(),
        assessment: RiskAssessment::zero(file_path, "LLM response could not be parsed as JSON"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let raw = r#"{"file_path":"a.rs","risk_score_file":5.0,"high_risk_flag":false,"reasons":["x"],"confidence":0.8}"#;
        match parse_risk_assessment("a.rs", raw) {
            RiskParseOutcome::Ok(a) => assert_eq!(a.risk_score_file, 5.0),
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn recovers_from_fenced_json() {
        let raw = "```json\n{\"file_path\":\"a.rs\",\"risk_score_file\":2.0,\"high_risk_flag\":false,\"reasons\":[],\"confidence\":0.5}\n```";
        match parse_risk_assessment("a.rs", raw) {
            RiskParseOutcome::Ok(a) => assert_eq!(a.risk_score_file, 2.0),
            other => panic!("expected Ok (fence strip happens pre-parse), got {other:?}"),
        }
    }

    #[test]
    fn recovers_from_chatty_prefix() {
        let raw = "Sure, here is the assessment:\n{\"file_path\":\"a.rs\",\"risk_score_file\":1.0,\"high_risk_flag\":false,\"reasons\":[],\"confidence\":0.3}\nLet me know if you need more.";
        match parse_risk_assessment("a.rs", raw) {
            RiskParseOutcome::Recovered { assessment, .. } => assert_eq!(assessment.risk_score_file, 1.0),
            other => panic!("expected Recovered, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_zero_on_garbage() {
        let raw = "not json at all";
        match parse_risk_assessment("a.rs", raw) {
            RiskParseOutcome::Failed { assessment, .. } => {
                assert_eq!(assessment.risk_score_file, 0.0);
                assert!(!assessment.reasons.is_empty());
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
