//! `inspector_query`: keyword-driven code query analysis

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::domain::utils::{contains_any, now_millis, optional_str, required_str};
use crate::tool_registry::ToolError;

const STOP_WORDS: [&str; 12] = [
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^\s*```[^\n]*\n(.*?)^\s*```").expect("fenced block pattern is valid")
});
const FRAMEWORKS: [&str; 8] = [
    "spring", "react", "angular", "vue", "express", "django", "flask", "rails",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Shallow,
    Deep,
}

impl Depth {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("deep") => Self::Deep,
            _ => Self::Shallow,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Shallow => "shallow",
            Self::Deep => "deep",
        }
    }
}

pub fn query(arguments: &Map<String, Value>) -> Result<Value, ToolError> {
    let query = required_str(arguments, "query")?;
    let context = optional_str(arguments, "context").unwrap_or_default();
    let depth = Depth::parse(optional_str(arguments, "depth"));

    info!(depth = depth.as_str(), "processing inspector query");

    let mut result = Map::new();
    result.insert("query".to_string(), json!(query));
    result.insert("context".to_string(), json!(context));
    result.insert("depth".to_string(), json!(depth.as_str()));
    result.insert("timestamp".to_string(), json!(now_millis()));
    result.insert("analysis_type".to_string(), json!(depth.as_str()));
    result.insert("parsed_query".to_string(), parse_query(query));
    result.insert("relevant_context".to_string(), relevant_context(context));

    match depth {
        Depth::Shallow => {
            result.insert("complexity".to_string(), json!("low"));
            result.insert("estimated_time".to_string(), json!("1-2 seconds"));
            result.insert(
                "suggestions".to_string(),
                json!([
                    "Consider adding error handling to your code",
                    "Review the code for potential security vulnerabilities",
                    "Optimize for performance where possible",
                    "Add comprehensive documentation",
                ]),
            );
        }
        Depth::Deep => {
            result.insert("complexity".to_string(), json!("high"));
            result.insert("estimated_time".to_string(), json!("5-10 seconds"));
            result.insert("query_intent".to_string(), intent(query));
            result.insert("code_patterns".to_string(), code_patterns(query));
            result.insert("dependencies".to_string(), dependencies(query));
            result.insert(
                "security_implications".to_string(),
                security_implications(query),
            );
            result.insert(
                "performance_considerations".to_string(),
                performance_considerations(query),
            );
            result.insert("recommendations".to_string(), recommendations());
        }
    }

    result.insert("status".to_string(), json!("completed"));
    result.insert(
        "message".to_string(),
        json!("Inspector query processed successfully"),
    );

    Ok(Value::Object(result))
}

fn parse_query(query: &str) -> Value {
    let lowered = query.to_lowercase();
    let (kind, target) = if contains_any(&lowered, &["function", "method"]) {
        ("function_analysis", "functions")
    } else if contains_any(&lowered, &["class", "interface"]) {
        ("class_analysis", "classes")
    } else if contains_any(&lowered, &["variable", "field"]) {
        ("variable_analysis", "variables")
    } else {
        ("general_analysis", "codebase")
    };

    json!({
        "type": kind,
        "target": target,
        "keywords": keywords(&lowered),
        "complexity_score": complexity_score(query),
    })
}

fn keywords(lowered: &str) -> Vec<&str> {
    lowered
        .split_whitespace()
        .filter(|word| word.len() > 3 && !STOP_WORDS.contains(word))
        .collect()
}

fn complexity_score(query: &str) -> u32 {
    let mut score = 0;
    if query.contains('?') {
        score += 1;
    }
    if query.contains('!') {
        score += 1;
    }
    if query.len() > 50 {
        score += 2;
    }
    if query.split_whitespace().count() > 10 {
        score += 2;
    }
    score.min(10)
}

fn intent(query: &str) -> Value {
    let lowered = query.to_lowercase();
    let (kind, goal) = if contains_any(&lowered, &["how", "why"]) {
        ("explanatory", "understanding")
    } else if contains_any(&lowered, &["find", "search"]) {
        ("search", "discovery")
    } else if contains_any(&lowered, &["fix", "error"]) {
        ("problem_solving", "resolution")
    } else if contains_any(&lowered, &["optimize", "improve"]) {
        ("optimization", "enhancement")
    } else {
        ("general", "information")
    };

    json!({"type": kind, "goal": goal})
}

fn relevant_context(context: &str) -> Value {
    if context.is_empty() {
        return json!({"available": false, "message": "No context provided"});
    }

    let snippets = code_snippets(context);
    json!({
        "available": true,
        "length": context.len(),
        "contains_code": contains_any(context, &["{", "class", "function"]),
        "estimated_complexity": if context.len() > 1000 { "high" } else { "medium" },
        "snippet_count": snippets.len(),
        "code_snippets": snippets,
    })
}

/// Bodies of fenced (```) blocks, trimmed; empty blocks are skipped.
fn code_snippets(context: &str) -> Vec<String> {
    FENCED_BLOCK
        .captures_iter(context)
        .filter_map(|captures| captures.get(1))
        .map(|body| body.as_str().trim().to_string())
        .filter(|body| !body.is_empty())
        .collect()
}

fn code_patterns(query: &str) -> Value {
    let rules: [(&[&str], &str); 6] = [
        (&["if", "else"], "conditional_logic"),
        (&["for", "while", "loop"], "iteration"),
        (&["try", "catch", "exception"], "exception_handling"),
        (&["async", "await", "promise"], "asynchronous_programming"),
        (&["class", "interface"], "object_oriented"),
        (&["function", "method"], "functional_programming"),
    ];
    let patterns = matching(query, &rules);

    json!({"pattern_count": patterns.len(), "patterns": patterns})
}

fn dependencies(query: &str) -> Value {
    let lowered = query.to_lowercase();
    let detected: Vec<&str> = FRAMEWORKS
        .iter()
        .copied()
        .filter(|framework| lowered.contains(framework))
        .collect();

    json!({"count": detected.len(), "detected": detected})
}

fn security_implications(query: &str) -> Value {
    let rules: [(&[&str], &str); 4] = [
        (&["password", "auth"], "authentication"),
        (&["sql", "database"], "sql_injection"),
        (&["input", "user"], "input_validation"),
        (&["https", "ssl"], "transport_security"),
    ];
    let concerns = matching(&query.to_lowercase(), &rules);
    let risk = if concerns.is_empty() { "low" } else { "medium" };

    json!({"concerns": concerns, "risk_level": risk})
}

fn performance_considerations(query: &str) -> Value {
    let rules: [(&[&str], &str); 4] = [
        (&["loop", "iteration"], "iteration_complexity"),
        (&["database", "query"], "database_performance"),
        (&["cache", "memory"], "memory_usage"),
        (&["async", "parallel"], "concurrency"),
    ];
    let factors = matching(&query.to_lowercase(), &rules);
    let impact = if factors.is_empty() { "minimal" } else { "moderate" };

    json!({"factors": factors, "impact_level": impact})
}

fn matching<'a>(text: &str, rules: &[(&[&str], &'a str)]) -> Vec<&'a str> {
    rules
        .iter()
        .filter(|(needles, _)| contains_any(text, needles))
        .map(|(_, label)| *label)
        .collect()
}

fn recommendations() -> Value {
    json!({
        "code_quality": [
            "Implement comprehensive unit tests",
            "Add integration tests for critical paths",
            "Use static code analysis tools",
            "Follow coding standards and best practices",
        ],
        "security": [
            "Implement input validation and sanitization",
            "Use parameterized queries for database operations",
            "Implement proper authentication and authorization",
            "Regular security audits and vulnerability assessments",
        ],
        "performance": [
            "Profile the application to identify bottlenecks",
            "Implement caching strategies where appropriate",
            "Optimize database queries and indexes",
            "Consider asynchronous processing for long-running tasks",
        ],
        "maintainability": [
            "Write clear and self-documenting code",
            "Implement proper logging and monitoring",
            "Use dependency injection for better testability",
            "Regular code reviews and refactoring",
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn requires_query() {
        let err = query(&args(json!({"depth": "deep"}))).expect_err("missing query");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn shallow_is_the_default_depth() {
        let result = query(&args(json!({"query": "explain this function"}))).expect("query");

        assert_eq!(result["depth"], "shallow");
        assert_eq!(result["parsed_query"]["type"], "function_analysis");
        assert_eq!(
            result["parsed_query"]["keywords"],
            json!(["explain", "this", "function"])
        );
        assert!(result.get("query_intent").is_none());
        assert_eq!(result["relevant_context"]["available"], false);
    }

    #[test]
    fn deep_analysis_adds_intent_and_risk_sections() {
        let result = query(&args(json!({
            "query": "how does the django auth database layer work?",
            "depth": "DEEP",
        })))
        .expect("query");

        assert_eq!(result["query_intent"]["type"], "explanatory");
        assert_eq!(result["dependencies"]["detected"], json!(["django"]));
        assert_eq!(
            result["security_implications"]["concerns"],
            json!(["authentication", "sql_injection"])
        );
        assert_eq!(result["security_implications"]["risk_level"], "medium");
        assert_eq!(
            result["performance_considerations"]["factors"],
            json!(["database_performance"])
        );
    }

    #[test]
    fn extracts_fenced_snippets_from_context() {
        let context = "intro\n```rust\nfn main() {}\n```\nmiddle\n```\n\n```\n```\nlet x = 1;\n```";
        let result = query(&args(json!({"query": "check", "context": context}))).expect("query");

        let relevant = &result["relevant_context"];
        assert_eq!(relevant["available"], true);
        assert_eq!(relevant["snippet_count"], 2);
        assert_eq!(relevant["code_snippets"], json!(["fn main() {}", "let x = 1;"]));
        assert_eq!(relevant["contains_code"], true);
    }

    #[test]
    fn snippet_pattern_is_shared_between_calls() {
        assert!(code_snippets("no fences here").is_empty());
        assert_eq!(code_snippets("```\nfirst\n```"), vec!["first".to_string()]);
        assert_eq!(code_snippets("```sh\nsecond\n```"), vec!["second".to_string()]);
    }

    #[test]
    fn complexity_score_counts_punctuation_and_length() {
        assert_eq!(complexity_score("why?"), 1);
        assert_eq!(
            complexity_score("one two three four five six seven eight nine ten eleven twelve!"),
            5
        );
    }
}
