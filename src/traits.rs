//! The retriever as a callable tool.
//!
//! Agents discover tools through `GET /tools/list` and call them through
//! `POST /tools/{name}` (see [`crate::server`]). Every tool implements
//! [`Tool`] and receives a [`ToolContext`] that resolves the configured
//! index on each call.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  ┌────────────────┐ ┌─────────────────┐  │
//! │  │search_sections │ │  get_section    │  │
//! │  └────────────────┘ └─────────────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!          Retriever → SQLite index
//! ```
//!
//! # Usage
//!
//! ```rust
//! use statute_index::traits::ToolRegistry;
//!
//! let tools = ToolRegistry::with_builtins();
//! assert!(tools.find("search_sections").is_some());
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::error::IndexError;
use crate::models::SectionHit;
use crate::search::Retriever;

/// A tool callable over the HTTP tool API.
///
/// [`execute`](Tool::execute) receives parameters that have already been
/// checked against [`parameters_schema`](Tool::parameters_schema) by
/// [`validate_params`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route name (`POST /tools/{name}`); lowercase with underscores.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    fn is_builtin(&self) -> bool {
        false
    }

    /// OpenAI function-calling JSON Schema for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. The returned value is wrapped in `{ "result": ... }`.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Bridge from a tool invocation to the configured index.
pub struct ToolContext {
    config: Arc<Config>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Semantic search; `k` defaults to `retrieval.top_k`.
    pub async fn search(&self, query: &str, k: Option<usize>) -> Result<Vec<SectionHit>> {
        Retriever::from_config(&self.config)?.search(query, k).await
    }

    /// Exact lookup by section number.
    pub async fn section(&self, number: u32) -> Result<Vec<SectionHit>> {
        Retriever::from_config(&self.config)?.section(number).await
    }
}

/// Built-in semantic search over the statute sections.
pub struct SearchSectionsTool;

#[async_trait]
impl Tool for SearchSectionsTool {
    fn name(&self) -> &str {
        "search_sections"
    }

    fn description(&self) -> &str {
        "Find the penal code sections most relevant to a question or description of conduct"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Free-text question or description" },
                "k": { "type": "integer", "description": "Number of sections to return (default: retrieval.top_k)" }
            },
            "required": ["query"]
        })
    }

    /// A blank `query` yields `{"results": []}`, the same as the CLI.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = params["query"].as_str().unwrap_or("");
        let k = match params.get("k").and_then(Value::as_i64) {
            Some(k) if k < 1 => {
                bail!(IndexError::InvalidQuery(format!("k must be at least 1, got {}", k)))
            }
            Some(k) => Some(k as usize),
            None => None,
        };

        let results = ctx.search(query, k).await?;
        Ok(serde_json::json!({ "results": results }))
    }
}

/// Built-in lookup of a section by its number.
pub struct GetSectionTool;

#[async_trait]
impl Tool for GetSectionTool {
    fn name(&self) -> &str {
        "get_section"
    }

    fn description(&self) -> &str {
        "Retrieve the full text of a penal code section by its number"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "section": { "type": "integer", "description": "Section number" }
            },
            "required": ["section"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let number = params["section"]
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                IndexError::InvalidQuery(format!(
                    "section must be a positive integer, got {}",
                    params["section"]
                ))
            })?;

        let entries = ctx.section(number).await?;
        if entries.is_empty() {
            bail!(IndexError::SectionNotFound(number));
        }
        Ok(serde_json::json!({ "section": number, "entries": entries }))
    }
}

/// Tool metadata as listed by `GET /tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// A registry with `search_sections` and `get_section`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchSectionsTool));
        registry.register(Box::new(GetSectionTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(|t| ToolInfo::of(t.as_ref())).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check `params` against a tool's JSON Schema: required keys present,
/// declared types respected, enum values allowed. Missing optional keys
/// that declare a `default` are filled in.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("parameters must be a JSON object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<String> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    for req_field in &required {
        if !params_obj.contains_key(req_field) {
            bail!("missing required parameter: {}", req_field);
        }
    }

    let mut result = params_obj.clone();
    for (prop_name, prop_schema) in &properties {
        if let Some(value) = params_obj.get(prop_name) {
            if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
                let type_ok = match expected_type {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    _ => true,
                };
                if !type_ok {
                    bail!(
                        "parameter '{}' must be of type '{}', got {}",
                        prop_name,
                        expected_type,
                        json_type_name(value)
                    );
                }
            }

            if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                if !enum_values.contains(value) {
                    let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
                    bail!(
                        "parameter '{}' must be one of [{}], got {}",
                        prop_name,
                        allowed.join(", "),
                        value
                    );
                }
            }
        } else if let Some(default) = prop_schema.get("default") {
            result.insert(prop_name.clone(), default.clone());
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
