//! Tool descriptors exposed via `tools/list` and the default registry wiring
//!
//! Each descriptor's `inputSchema` documents the arguments its handler reads;
//! schemas are advertised to clients but not enforced at call time.

use serde_json::{json, Value};

use crate::domain::{analysis, audience, content, inspector};
use crate::tool_registry::{StaticToolRegistry, ToolDescriptor};

pub const AUDIENCE_TARGETING: &str = "audience_targeting";
pub const CAMPAIGN_CONTENT: &str = "campaign_content_recommendation";
pub const INSPECTOR_QUERY: &str = "inspector_query";
pub const STREAMING_ANALYSIS: &str = "streaming_analysis";

/// Registry with the bundled insurance-campaign tools, in advertised order.
pub fn campaign_registry() -> StaticToolRegistry {
    StaticToolRegistry::new()
        .register(audience_targeting_tool(), audience::recommend)
        .register(campaign_content_tool(), content::recommend)
        .register(inspector_tool(), inspector::query)
        .register(streaming_analysis_tool(), analysis::analyze)
}

fn descriptor(name: &str, description: &str, input_schema: Value) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn audience_targeting_tool() -> ToolDescriptor {
    descriptor(
        AUDIENCE_TARGETING,
        "Recommends audience targeting criteria for insurance marketing campaigns",
        json!({
            "type": "object",
            "properties": {
                "requirements": {"type": "string", "description": "Targeting requirements"},
                "insurance_type": {"type": "string", "description": "Type of insurance"},
                "campaign_objective": {"type": "string", "description": "Campaign objective"},
            },
            "required": ["requirements", "insurance_type"],
        }),
    )
}

fn campaign_content_tool() -> ToolDescriptor {
    descriptor(
        CAMPAIGN_CONTENT,
        "Recommends campaign content and messaging for insurance marketing",
        json!({
            "type": "object",
            "properties": {
                "audience_criteria": {"type": "object", "description": "Target audience criteria"},
                "insurance_type": {"type": "string", "description": "Type of insurance"},
                "channel": {"type": "string", "description": "Delivery channel, defaults to email"},
                "campaign_goal": {"type": "string", "description": "Campaign goal, defaults to awareness"},
            },
            "required": ["audience_criteria", "insurance_type"],
        }),
    )
}

fn inspector_tool() -> ToolDescriptor {
    descriptor(
        INSPECTOR_QUERY,
        "Inspector integration for code analysis and querying",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Query to analyze"},
                "context": {"type": "string", "description": "Additional context for the query"},
                "depth": {
                    "type": "string",
                    "enum": ["shallow", "deep"],
                    "description": "Analysis depth",
                },
            },
            "required": ["query"],
        }),
    )
}

fn streaming_analysis_tool() -> ToolDescriptor {
    descriptor(
        STREAMING_ANALYSIS,
        "Provides streaming analysis capabilities with real-time updates",
        json!({
            "type": "object",
            "properties": {
                "analysis_type": {"type": "string", "description": "Type of analysis to perform"},
                "sections": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": analysis::MAX_SECTIONS,
                    "description": "Number of sections to produce",
                },
                "stream_results": {"type": "boolean", "description": "Whether to stream results"},
            },
            "required": ["analysis_type"],
        }),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::tool_registry::{ToolError, ToolRegistry};

    #[test]
    fn registry_lists_bundled_tools_in_order() {
        let names: Vec<_> = campaign_registry()
            .list_tools()
            .into_iter()
            .map(|tool| tool.name)
            .collect();

        assert_eq!(
            names,
            vec![
                AUDIENCE_TARGETING,
                CAMPAIGN_CONTENT,
                INSPECTOR_QUERY,
                STREAMING_ANALYSIS
            ]
        );
    }

    #[test]
    fn every_schema_declares_required_fields() {
        for tool in campaign_registry().list_tools() {
            let required = tool.input_schema["required"]
                .as_array()
                .expect("required array");
            assert!(!required.is_empty(), "{} has no required fields", tool.name);
        }
    }

    #[test]
    fn registry_routes_to_handlers() {
        let registry = campaign_registry();
        let mut arguments = Map::new();
        arguments.insert("query".to_string(), json!("find the login method"));

        let result = registry
            .call_tool(INSPECTOR_QUERY, &arguments)
            .expect("inspector call");
        assert_eq!(result["status"], "completed");

        let err = registry
            .call_tool(STREAMING_ANALYSIS, &Map::new())
            .expect_err("missing analysis_type");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
