//! Tool system for the agent.
//!
//! Each tool declares its parameters up front. The registry turns those
//! declarations into the JSON schema offered to the model and checks the
//! model's arguments against them before the tool runs. Every failure on
//! this path becomes a result string for the model, never an error for the
//! loop.

mod search_api;

pub use search_api::SearchApiTool;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::knowledge::KnowledgeStore;
use crate::llm::ToolSchema;

/// JSON type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// A statically declared tool parameter.
#[derive(Debug, Clone, Copy)]
pub struct Parameter {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

/// Validated arguments handed to a tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}

/// Information about a tool for display purposes.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Trait for implementing tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    /// Description offered to the model.
    fn description(&self) -> &str;

    /// Declared parameters.
    fn parameters(&self) -> &[Parameter];

    /// Run the tool with arguments that already passed validation.
    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String>;
}

/// Name-indexed set of tools, kept in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The support agent's tool set: documentation search.
    pub fn for_support(knowledge: KnowledgeStore, top_n: usize) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchApiTool::new(knowledge, top_n)));
        registry
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    pub fn get_tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| tool_schema(t.as_ref())).collect()
    }

    /// Resolve, parse, validate and run one call. Always yields a string.
    pub async fn execute(&self, name: &str, raw_arguments: &str) -> String {
        let Some(tool) = self.get(name) else {
            tracing::warn!("Model requested unknown tool {}", name);
            return format!("Tool '{}' not found.", name);
        };

        let args = parse_arguments(name, raw_arguments);
        let args = match validate(tool.parameters(), args) {
            Ok(args) => args,
            Err(reason) => return format!("Error executing tool '{}': {}", name, reason),
        };

        match tool.execute(args).await {
            Ok(output) => output,
            Err(e) => format!("Error executing tool '{}': {}", name, e),
        }
    }
}

/// Parse the model's argument payload. Anything that is not a JSON object
/// degrades to no arguments.
fn parse_arguments(tool: &str, raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!("Arguments for tool {} are not an object: {}", tool, other);
            Map::new()
        }
        Err(e) => {
            tracing::warn!("Error parsing arguments for tool {}: {} ({})", tool, raw, e);
            Map::new()
        }
    }
}

fn validate(parameters: &[Parameter], args: Map<String, Value>) -> Result<ToolArgs, String> {
    for key in args.keys() {
        if !parameters.iter().any(|p| p.name == key.as_str()) {
            return Err(format!("unexpected parameter '{}'", key));
        }
    }
    for param in parameters {
        match args.get(param.name) {
            Some(value) if !param.kind.accepts(value) => {
                return Err(format!(
                    "parameter '{}' must be a {}",
                    param.name,
                    param.kind.json_type()
                ));
            }
            None if param.required => {
                return Err(format!("missing required parameter '{}'", param.name));
            }
            _ => {}
        }
    }
    Ok(ToolArgs(args))
}

fn tool_schema(tool: &dyn Tool) -> ToolSchema {
    let parameters = tool.parameters();
    let properties: Map<String, Value> = parameters
        .iter()
        .map(|p| {
            let mut property = json!({"type": p.kind.json_type()});
            if !p.description.is_empty() {
                property["description"] = Value::String(p.description.to_string());
            }
            (p.name.to_string(), property)
        })
        .collect();
    let required: Vec<&str> = parameters
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name)
        .collect();

    ToolSchema {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        }),
        // Strict mode needs every property listed as required.
        strict: parameters.iter().all(|p| p.required),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTool;

    const OPTIONAL_LIMIT: &[Parameter] = &[Parameter {
        name: "limit",
        kind: ParamKind::Integer,
        required: false,
        description: "",
    }];

    const REQUIRED_QUERY: &[Parameter] = &[Parameter {
        name: "query",
        kind: ParamKind::String,
        required: true,
        description: "Search text",
    }];

    #[tokio::test]
    async fn unknown_tool_is_reported_in_band() {
        let registry = ToolRegistry::new();
        let result = registry.execute("foo", "{}").await;
        assert_eq!(result, "Tool 'foo' not found.");
    }

    #[tokio::test]
    async fn malformed_arguments_run_with_no_arguments() {
        let tool = Arc::new(RecordingTool::new("echo", OPTIONAL_LIMIT));
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone());

        let result = registry.execute("echo", "{not json").await;
        assert_eq!(result, "echo ran");
        assert_eq!(tool.calls().await, vec![ToolArgs::default()]);
    }

    #[tokio::test]
    async fn validation_failure_skips_the_tool() {
        let tool = Arc::new(RecordingTool::new("lookup", REQUIRED_QUERY));
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone());

        let missing = registry.execute("lookup", "{}").await;
        assert_eq!(
            missing,
            "Error executing tool 'lookup': missing required parameter 'query'"
        );
        let wrong_type = registry.execute("lookup", r#"{"query": 3}"#).await;
        assert!(wrong_type.contains("must be a string"));
        let extra = registry.execute("lookup", r#"{"query": "a", "x": 1}"#).await;
        assert!(extra.contains("unexpected parameter 'x'"));
        assert!(tool.calls().await.is_empty());
    }

    #[tokio::test]
    async fn tool_errors_become_result_strings() {
        let tool = Arc::new(RecordingTool::failing("broken", OPTIONAL_LIMIT));
        let mut registry = ToolRegistry::new();
        registry.register(tool);
        let result = registry.execute("broken", "{}").await;
        assert_eq!(result, "Error executing tool 'broken': tool exploded");
    }

    #[test]
    fn schema_lists_required_fields_and_forbids_extras() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(RecordingTool::new("lookup", REQUIRED_QUERY)));
        registry.register(Arc::new(RecordingTool::new("echo", OPTIONAL_LIMIT)));

        let schemas = registry.get_tool_schemas();
        assert_eq!(schemas[0].name, "lookup");
        assert_eq!(
            schemas[0].parameters,
            json!({
                "type": "object",
                "properties": {"query": {"type": "string", "description": "Search text"}},
                "required": ["query"],
                "additionalProperties": false
            })
        );
        assert!(schemas[0].strict);
        assert!(!schemas[1].strict);
    }

    #[test]
    fn registering_same_name_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(RecordingTool::new("echo", OPTIONAL_LIMIT)));
        registry.register(Arc::new(RecordingTool::new("echo", REQUIRED_QUERY)));
        assert_eq!(registry.list_tools().len(), 1);
        assert!(registry.get("echo").unwrap().parameters()[0].required);
    }
}
