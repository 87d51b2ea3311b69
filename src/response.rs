//! Parsing and validation of raw LLM output into a SwotDocument.
//!
//! Models rarely honor "return only JSON" perfectly, so parsing is an
//! ordered chain of strategies, each a pure function over the response text:
//!
//! 1. direct parse,
//! 2. strip markdown code fences,
//! 3. extract the first-`{`-to-last-`}` substring,
//! 4. tolerant repairs (trailing commas, unterminated strings/containers).
//!
//! Only when all four fail does the caller see a [`ResponseParseError`].

use crate::error::ResponseParseError;
use crate::swot::{Level, Quadrant, SwotDocument, SwotItem};
use serde_json::Value;

/// Non-fatal findings from validation, surfaced alongside the document.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ValidationReport {
    /// Items missing both topic and description, discarded.
    pub dropped_items: usize,
    /// Items missing one of topic/description, kept with an empty field.
    pub coerced_items: usize,
}

type Strategy = fn(&str) -> Option<Value>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", parse_direct),
    ("fenced", parse_fenced),
    ("braced", parse_braced),
    ("repaired", parse_repaired),
];

/// Parse raw model output into a validated SwotDocument.
pub fn parse_response(raw: &str) -> Result<(SwotDocument, ValidationReport), ResponseParseError> {
    let cleaned = strip_control_chars(raw.trim());

    for (name, strategy) in STRATEGIES {
        if let Some(value) = strategy(&cleaned) {
            tracing::debug!("Response parsed via '{}' strategy", name);
            return Ok(validate(value));
        }
    }

    Err(ResponseParseError {
        raw: raw.to_string(),
    })
}

/// Control characters (except \n, \r, \t) break serde_json inside strings.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_control() && !matches!(c, '\n' | '\r' | '\t') {
                ' '
            } else {
                c
            }
        })
        .collect()
}

fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Strip ```json ... ``` (or bare ```) fencing, then parse.
fn parse_fenced(text: &str) -> Option<Value> {
    let inner = if let Some(after) = text.split("```json").nth(1) {
        after.split("```").next()?
    } else if text.contains("```") {
        text.split("```").nth(1)?
    } else {
        return None;
    };
    serde_json::from_str(inner.trim()).ok()
}

/// Parse the substring between the first `{` and the last `}`.
fn parse_braced(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Last resort: remove trailing commas and close unterminated strings,
/// arrays, and objects by bracket-depth tracking, then parse.
fn parse_repaired(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let repaired = repair_json(&text[start..]);
    serde_json::from_str(&repaired).ok()
}

fn repair_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                stack.push(c);
                out.push(c);
            }
            '}' | ']' => {
                strip_trailing_comma(&mut out);
                stack.pop();
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    if in_string {
        out.push('"');
    }
    strip_trailing_comma(&mut out);
    while let Some(open) = stack.pop() {
        out.push(if open == '{' { '}' } else { ']' });
    }
    out
}

/// Drop a comma that directly precedes a closing brace/bracket.
fn strip_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
    }
}

/// Coerce a parsed JSON value into a SwotDocument: all four quadrant keys
/// materialized, summary defaulted, malformed items dropped or coerced with
/// counts reported.
fn validate(value: Value) -> (SwotDocument, ValidationReport) {
    let mut report = ValidationReport::default();
    let mut doc = SwotDocument::default();

    // Tolerate responses that omit the SWOT_Analysis wrapper
    let analysis = value
        .get("SWOT_Analysis")
        .filter(|v| v.is_object())
        .unwrap_or(&value);

    for q in Quadrant::ALL {
        let items = analysis
            .get(q.as_str())
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|raw| coerce_item(raw, &mut report))
                    .collect()
            })
            .unwrap_or_default();
        *doc.analysis.quadrant_mut(q) = items;
    }

    doc.executive_summary = value
        .get("Executive_Summary")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    if report.dropped_items > 0 || report.coerced_items > 0 {
        tracing::warn!(
            "SWOT validation: {} items dropped, {} coerced",
            report.dropped_items,
            report.coerced_items
        );
    }

    (doc, report)
}

fn coerce_item(raw: &Value, report: &mut ValidationReport) -> Option<SwotItem> {
    let obj = match raw.as_object() {
        Some(o) => o,
        None => {
            report.dropped_items += 1;
            return None;
        }
    };

    let field = |key: &str| {
        obj.get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let topic = field("topic");
    let description = field("description");
    if topic.is_none() && description.is_none() {
        report.dropped_items += 1;
        return None;
    }
    if topic.is_none() || description.is_none() {
        report.coerced_items += 1;
    }

    let mut item = SwotItem::new(topic.unwrap_or_default(), description.unwrap_or_default());
    item.impact = field("impact").and_then(Level::parse);
    item.risk_level = field("risk_level").and_then(Level::parse);
    item.root_cause = field("root_cause").map(String::from);
    item.action_idea = field("action_idea").map(String::from);
    Some(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "SWOT_Analysis": {
            "Strengths": [{"topic": "Chất lượng đồ uống", "description": "Cà phê được khen ngon", "impact": "High"}],
            "Weaknesses": [{"topic": "Tốc độ phục vụ", "description": "Phục vụ chậm giờ cao điểm", "root_cause": "Thiếu nhân viên", "impact": "Medium"}],
            "Opportunities": [],
            "Threats": [{"topic": "Đối thủ lớn", "description": "Starbucks có không gian đẹp", "risk_level": "High"}]
        },
        "Executive_Summary": "Tình hình chung ổn định."
    }"#;

    #[test]
    fn test_strategy_1_direct() {
        let (doc, report) = parse_response(SAMPLE).unwrap();
        assert_eq!(doc.analysis.strengths.len(), 1);
        assert_eq!(doc.analysis.strengths[0].topic, "Chất lượng đồ uống");
        assert_eq!(doc.analysis.strengths[0].impact, Some(Level::High));
        assert_eq!(doc.analysis.threats[0].risk_level, Some(Level::High));
        assert_eq!(doc.executive_summary, "Tình hình chung ổn định.");
        assert_eq!(report, ValidationReport::default());
    }

    #[test]
    fn test_strategy_2_markdown_fences() {
        let fenced = format!("```json\n{}\n```", SAMPLE);
        let (doc, _) = parse_response(&fenced).unwrap();
        let (direct, _) = parse_response(SAMPLE).unwrap();
        assert_eq!(doc, direct);
    }

    #[test]
    fn test_strategy_3_surrounding_commentary() {
        let noisy = format!("Here is the analysis you asked for:\n{}\nHope this helps!", SAMPLE);
        let (doc, _) = parse_response(&noisy).unwrap();
        let (direct, _) = parse_response(SAMPLE).unwrap();
        assert_eq!(doc, direct);
    }

    #[test]
    fn test_strategy_4_trailing_comma() {
        let with_comma = SAMPLE.replace(
            r#""risk_level": "High"}"#,
            r#""risk_level": "High",}"#,
        );
        let (doc, _) = parse_response(&with_comma).unwrap();
        let (direct, _) = parse_response(SAMPLE).unwrap();
        assert_eq!(doc, direct);
    }

    #[test]
    fn test_strategy_4_truncated_response() {
        // Cut mid-string, as a token-limited response would be
        let truncated = &SAMPLE[..SAMPLE.find("giờ cao điểm").unwrap()];
        let (doc, _) = parse_response(truncated).unwrap();
        assert_eq!(doc.analysis.strengths.len(), 1);
        assert_eq!(doc.analysis.weaknesses.len(), 1);
    }

    #[test]
    fn test_garbage_is_error() {
        let err = parse_response("I could not analyze the reviews, sorry.").unwrap_err();
        assert!(err.raw.contains("could not analyze"));
    }

    #[test]
    fn test_missing_quadrants_materialized() {
        let partial = r#"{"SWOT_Analysis": {"Strengths": [{"topic": "A", "description": "B"}]}, "Executive_Summary": "s"}"#;
        let (doc, _) = parse_response(partial).unwrap();
        assert_eq!(doc.analysis.strengths.len(), 1);
        assert!(doc.analysis.weaknesses.is_empty());
        assert!(doc.analysis.opportunities.is_empty());
        assert!(doc.analysis.threats.is_empty());
    }

    #[test]
    fn test_missing_summary_defaults_empty() {
        let no_summary = r#"{"SWOT_Analysis": {"Strengths": []}}"#;
        let (doc, _) = parse_response(no_summary).unwrap();
        assert_eq!(doc.executive_summary, "");
    }

    #[test]
    fn test_malformed_items_counted() {
        let messy = r#"{
            "SWOT_Analysis": {
                "Strengths": [
                    {"topic": "Good", "description": "fine"},
                    {"impact": "High"},
                    {"topic": "No description"},
                    "not an object"
                ]
            }
        }"#;
        let (doc, report) = parse_response(messy).unwrap();
        assert_eq!(doc.analysis.strengths.len(), 2);
        assert_eq!(report.dropped_items, 2);
        assert_eq!(report.coerced_items, 1);
    }

    #[test]
    fn test_repair_closes_nested_containers() {
        let repaired = repair_json(r#"{"a": [{"b": "unterminated"#);
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["a"][0]["b"], "unterminated");
    }

    #[test]
    fn test_control_chars_stripped() {
        let with_ctrl = "{\"SWOT_Analysis\": {\"Strengths\": [{\"topic\": \"a\u{0001}b\", \"description\": \"d\"}]}}";
        let (doc, _) = parse_response(with_ctrl).unwrap();
        assert_eq!(doc.analysis.strengths[0].topic, "a b");
    }
}
