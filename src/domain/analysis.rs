//! `streaming_analysis`: sectioned campaign analysis meant for chunked delivery

use serde_json::{json, Map, Value};
use tracing::info;

use crate::domain::utils::{humanize, now_millis, required_str};
use crate::tool_registry::ToolError;

pub const DEFAULT_SECTIONS: u64 = 3;
pub const MAX_SECTIONS: u64 = 20;

const SECTION_TOPICS: [(&str, &str); 5] = [
    (
        "Market overview",
        "Demand signals and segment sizing for the selected line of business.",
    ),
    (
        "Audience behaviour",
        "Engagement patterns by age band, income level and preferred channel.",
    ),
    (
        "Channel performance",
        "Open, click and conversion benchmarks per delivery channel.",
    ),
    (
        "Risk and compliance",
        "Regulatory disclosures and consent requirements affecting outreach.",
    ),
    (
        "Recommendations",
        "Prioritised next steps for campaign planning and optimisation.",
    ),
];

pub fn analyze(arguments: &Map<String, Value>) -> Result<Value, ToolError> {
    let analysis_type = required_str(arguments, "analysis_type")?;
    let sections = section_count(arguments.get("sections"))?;

    info!(analysis_type, sections, "running streaming analysis");

    let content: Vec<Value> = (0..sections)
        .map(|position| section(analysis_type, position as usize))
        .collect();

    Ok(json!({
        "analysis_type": analysis_type,
        "summary": format!(
            "{} analysis in {sections} sections",
            capitalize(&humanize(analysis_type))
        ),
        "section_count": sections,
        "generated_at": now_millis(),
        "streaming_content": content,
    }))
}

fn section_count(raw: Option<&Value>) -> Result<u64, ToolError> {
    match raw {
        None | Some(Value::Null) => Ok(DEFAULT_SECTIONS),
        Some(value) => value
            .as_u64()
            .filter(|count| (1..=MAX_SECTIONS).contains(count))
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!(
                    "sections must be an integer between 1 and {MAX_SECTIONS}"
                ))
            }),
    }
}

fn section(analysis_type: &str, position: usize) -> Value {
    let (title, body) = SECTION_TOPICS[position % SECTION_TOPICS.len()];
    json!({
        "section": position + 1,
        "title": title,
        "body": format!("{body} Scope: {}.", humanize(analysis_type)),
    })
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
