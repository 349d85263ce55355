//! Extraction of structured analysis from free-form model replies.
//!
//! Models wrap JSON in prose, fence it in markdown, or get cut off by the
//! output-token limit. Each [`ResponseParser`] handles one of those shapes;
//! [`parse_response`] tries them in order and the first success wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::narrative::{LogFinding, NarrativeAnalysis};

pub const UNPARSEABLE_SUMMARY: &str = "Could not parse the analysis response.";

/// One strategy for pulling a [`NarrativeAnalysis`] out of reply text.
pub trait ResponseParser: Send + Sync {
    fn name(&self) -> &'static str;

    fn parse(&self, text: &str) -> Option<NarrativeAnalysis>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed {
        strategy: &'static str,
        analysis: NarrativeAnalysis,
    },
    Unparseable,
}

impl ParseOutcome {
    /// Converts to an analysis carrying `raw` as its raw response.
    pub fn into_analysis(self, raw: String) -> NarrativeAnalysis {
        let mut analysis = match self {
            ParseOutcome::Parsed { analysis, .. } => analysis,
            ParseOutcome::Unparseable => NarrativeAnalysis::with_summary(UNPARSEABLE_SUMMARY),
        };
        analysis.raw_response = Some(raw);
        analysis
    }
}

/// The whole reply is a JSON object.
pub struct StrictJson;

/// A markdown code fence holds the object.
pub struct FencedBlock;

/// The object spans from the first `{` to the last `}`.
pub struct BraceSpan;

/// The object starts at a line beginning with `{` and ends where braces
/// balance, ignoring prose that follows it.
pub struct LineScan;

/// Individual `"field": "value"` pairs, for replies truncated mid-object.
pub struct FieldPattern;

pub fn default_parsers() -> Vec<Box<dyn ResponseParser>> {
    vec![
        Box::new(StrictJson),
        Box::new(FencedBlock),
        Box::new(BraceSpan),
        Box::new(LineScan),
        Box::new(FieldPattern),
    ]
}

/// Runs the default parser chain over `text`.
pub fn parse_response(text: &str) -> ParseOutcome {
    for parser in default_parsers() {
        if let Some(analysis) = parser.parse(text) {
            debug!(strategy = parser.name(), errors = analysis.errors.len(), "parsed model reply");
            return ParseOutcome::Parsed {
                strategy: parser.name(),
                analysis,
            };
        }
    }
    debug!(reply_len = text.len(), "model reply matched no parser");
    ParseOutcome::Unparseable
}

fn decode_object(text: &str) -> Option<NarrativeAnalysis> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

impl ResponseParser for StrictJson {
    fn name(&self) -> &'static str {
        "strict_json"
    }

    fn parse(&self, text: &str) -> Option<NarrativeAnalysis> {
        decode_object(text)
    }
}

static FENCE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").ok());

impl ResponseParser for FencedBlock {
    fn name(&self) -> &'static str {
        "fenced_block"
    }

    fn parse(&self, text: &str) -> Option<NarrativeAnalysis> {
        let fence = FENCE.as_ref()?;
        fence
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|body| decode_object(body.as_str()))
    }
}

impl ResponseParser for BraceSpan {
    fn name(&self) -> &'static str {
        "brace_span"
    }

    fn parse(&self, text: &str) -> Option<NarrativeAnalysis> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }
        decode_object(&text[start..=end])
    }
}

impl ResponseParser for LineScan {
    fn name(&self) -> &'static str {
        "line_scan"
    }

    fn parse(&self, text: &str) -> Option<NarrativeAnalysis> {
        let lines: Vec<&str> = text.lines().collect();
        for (start, line) in lines.iter().enumerate() {
            if !line.trim_start().starts_with('{') {
                continue;
            }

            let mut depth = 0i64;
            let mut candidate = String::new();
            for l in &lines[start..] {
                candidate.push_str(l);
                candidate.push('\n');
                depth += brace_delta(l);
                if depth <= 0 {
                    break;
                }
            }

            if let Some(analysis) = decode_object(&candidate) {
                return Some(analysis);
            }
        }
        None
    }
}

/// Net `{`/`}` count of a line, skipping braces inside string literals.
fn brace_delta(line: &str) -> i64 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in line.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

fn field_regex(field: &str) -> Option<Regex> {
    Regex::new(&format!(r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, field)).ok()
}

struct FieldRegexes {
    message: Regex,
    root_cause: Regex,
    severity: Regex,
    timestamp: Regex,
    summary: Regex,
}

static FIELDS: Lazy<Option<FieldRegexes>> = Lazy::new(|| {
    Some(FieldRegexes {
        message: field_regex("message")?,
        root_cause: field_regex("root_cause")?,
        severity: field_regex("severity")?,
        timestamp: field_regex("timestamp")?,
        summary: field_regex("summary")?,
    })
});

fn captured(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
        .collect()
}

fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

impl ResponseParser for FieldPattern {
    fn name(&self) -> &'static str {
        "field_pattern"
    }

    fn parse(&self, text: &str) -> Option<NarrativeAnalysis> {
        let fields = FIELDS.as_ref()?;

        let messages = captured(&fields.message, text);
        let summary = captured(&fields.summary, text).into_iter().next();
        if messages.is_empty() && summary.is_none() {
            return None;
        }

        let root_causes = captured(&fields.root_cause, text);
        let severities = captured(&fields.severity, text);
        let timestamps = captured(&fields.timestamp, text);

        let errors = messages
            .into_iter()
            .enumerate()
            .map(|(i, message)| LogFinding {
                message,
                root_cause: root_causes.get(i).cloned().unwrap_or_default(),
                severity: severities.get(i).cloned().unwrap_or_default(),
                timestamp: timestamps.get(i).cloned(),
            })
            .collect();

        Some(NarrativeAnalysis {
            errors,
            summary: summary.unwrap_or_default(),
            recommendations: Vec::new(),
            raw_response: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJECT: &str = r#"{"errors": [{"message": "Gateway timeout", "root_cause": "Slow upstream", "severity": "High", "timestamp": "10:00"}], "summary": "One timeout"}"#;

    fn strategy(text: &str) -> Option<&'static str> {
        match parse_response(text) {
            ParseOutcome::Parsed { strategy, .. } => Some(strategy),
            ParseOutcome::Unparseable => None,
        }
    }

    #[test]
    fn test_strict_json() {
        assert_eq!(strategy(OBJECT), Some("strict_json"));
        let analysis = StrictJson.parse(OBJECT).unwrap();
        assert_eq!(analysis.errors[0].message, "Gateway timeout");
        assert_eq!(analysis.summary, "One timeout");
    }

    #[test]
    fn test_fenced_block() {
        let text = format!("Here is the analysis {{see below}}:\n```json\n{}\n```\nThanks {{bye}}", OBJECT);
        assert_eq!(strategy(&text), Some("fenced_block"));
    }

    #[test]
    fn test_brace_span() {
        let text = format!("Sure! Analysis follows.\n{}\nLet me know.", OBJECT);
        assert_eq!(strategy(&text), Some("brace_span"));
    }

    #[test]
    fn test_line_scan_ignores_trailing_braces() {
        let text = "Result:\n{\n  \"errors\": [],\n  \"summary\": \"All {good}\"\n}\nUse {placeholder} for more.";
        assert_eq!(strategy(text), Some("line_scan"));
        assert_eq!(LineScan.parse(text).unwrap().summary, "All {good}");
    }

    #[test]
    fn test_field_pattern_recovers_truncated_reply() {
        let text = r#"{"errors": [{"message": "DB \"orders\" down", "root_cause": "Pool exhausted", "severity": "High"}, {"message": "Retry"#;
        assert_eq!(strategy(text), Some("field_pattern"));
        let analysis = FieldPattern.parse(text).unwrap();
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(analysis.errors[0].message, "DB \"orders\" down");
        assert_eq!(analysis.errors[0].root_cause, "Pool exhausted");
        assert_eq!(analysis.errors[0].timestamp, None);
    }

    #[test]
    fn test_unparseable() {
        let outcome = parse_response("The logs look fine to me.");
        assert_eq!(outcome, ParseOutcome::Unparseable);
        let analysis = outcome.into_analysis("The logs look fine to me.".to_string());
        assert_eq!(analysis.summary, UNPARSEABLE_SUMMARY);
        assert!(analysis.errors.is_empty());
        assert_eq!(analysis.raw_response.as_deref(), Some("The logs look fine to me."));
    }

    #[test]
    fn test_brace_delta_skips_strings() {
        assert_eq!(brace_delta(r#"{"a": "}{", "b": "\"{"#), 1);
        assert_eq!(brace_delta("}"), -1);
    }
}
