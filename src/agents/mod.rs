//! Agent System
//!
//! Agents are named bundles of tools. The manager routes each user message to
//! one tool of one sub-agent and presents what it returns:
//!
//! ```text
//! User Message
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Manager   │  → picks {agent, tool, arguments}
//! └─────────────┘
//!      │
//!      ├──────────────────┬──────────────────┐
//!      ▼                  ▼                  ▼
//! ┌──────────┐     ┌──────────────┐   ┌──────────────┐
//! │  Sector  │     │   Country    │   │ News analyst │
//! │  agent   │     │    agent     │   │              │
//! └──────────┘     └──────────────┘   └──────────────┘
//!      │                  │                  │
//!      └───── Query Pipeline ─────┘       SerpAPI
//! ```
//!
//! Tools never fail for ordinary reasons: bad arguments, empty searches and
//! upload problems come back as `{"error": ..}`. Only a lost dataset store
//! is returned as `Err`.

pub mod country;
pub mod manager;
pub mod news;
pub mod sector;

pub use country::country_agent;
pub use manager::{ManagerAgent, RouteDecision};
pub use news::news_agent;
pub use sector::sector_agent;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::chart::{self, ChartPublisher};
use crate::config::PipelineConfig;
use crate::models::{AgentSummary, Dataset, Operation, QueryRequest, QueryResult, ToolSummary};
use crate::pipeline::QueryPipeline;
use crate::types::{AppError, AppResult};

/// What a tool hands back to the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Text(String),
    Result { result: String },
    Error { error: String },
}

impl ToolOutput {
    pub fn result(text: impl Into<String>) -> Self {
        ToolOutput::Result {
            result: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ToolOutput::Error { error: text.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error { .. })
    }

    pub fn as_text(&self) -> &str {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::Result { result } => result,
            ToolOutput::Error { error } => error,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> AppResult<ToolOutput>;
}

/// Non-fatal errors become `{"error": ..}`; a lost store stays an `Err`.
pub fn settle(result: AppResult<ToolOutput>) -> AppResult<ToolOutput> {
    match result {
        Ok(output) => Ok(output),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "Tool call failed");
            Ok(ToolOutput::error(e.to_string()))
        }
    }
}

pub struct Agent {
    pub name: String,
    pub description: String,
    /// How the agent presents tool results to the user.
    pub instruction: String,
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instruction: instruction.into(),
            tools: BTreeMap::new(),
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub async fn invoke(&self, tool: &str, args: Value) -> AppResult<ToolOutput> {
        let Some(handler) = self.tools.get(tool) else {
            return Err(AppError::NotFound(format!(
                "Agent {} has no tool named {}",
                self.name, tool
            )));
        };
        info!(agent = %self.name, tool = %tool, "Invoking tool");
        settle(handler.call(args).await)
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            tools: self
                .tools
                .values()
                .map(|t| ToolSummary {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters(),
                })
                .collect(),
        }
    }
}

/// Shared collaborators of the dataset tools.
pub struct DataTools {
    pub pipeline: Arc<QueryPipeline>,
    pub publisher: Arc<ChartPublisher>,
    pub tuning: PipelineConfig,
}

impl DataTools {
    pub fn new(
        pipeline: Arc<QueryPipeline>,
        publisher: Arc<ChartPublisher>,
        tuning: PipelineConfig,
    ) -> Self {
        Self {
            pipeline,
            publisher,
            tuning,
        }
    }

    pub fn request(&self, text: &str, dataset: Dataset, operation: Operation) -> QueryRequest {
        QueryRequest::new(text, dataset, operation, self.tuning.params(dataset, operation))
    }

    /// Runs a text operation and wraps the report as `{"result": ..}`.
    pub async fn report(&self, request: &QueryRequest) -> AppResult<ToolOutput> {
        match self.pipeline.execute(request).await? {
            QueryResult::TextReport(report) => Ok(ToolOutput::result(report.render())),
            QueryResult::Error(e) => Ok(ToolOutput::error(e.reason)),
            QueryResult::Chart(_) => Err(AppError::Internal(
                "text operation produced a chart".to_string(),
            )),
        }
    }

    /// Runs a trend operation, publishes the chart and returns its markdown.
    pub async fn chart(&self, request: &QueryRequest, subject: &str) -> AppResult<ToolOutput> {
        match self.pipeline.execute(request).await? {
            QueryResult::Chart(artifact) => {
                let url = self.publisher.publish(&artifact).await.map_err(|e| {
                    AppError::Publish(format!(
                        "Error generating or uploading image for {}: {}",
                        subject, e
                    ))
                })?;
                Ok(ToolOutput::Text(chart::chart_markdown(subject, &url)))
            }
            QueryResult::Error(e) => Ok(ToolOutput::error(e.reason)),
            QueryResult::TextReport(_) => Err(AppError::Internal(
                "trend operation produced a text report".to_string(),
            )),
        }
    }

    pub async fn listing(&self, dataset: Dataset, column: &str, title: &str) -> AppResult<ToolOutput> {
        let values = self.pipeline.distinct(dataset, column).await?;
        Ok(ToolOutput::result(
            crate::report::format_listing(title, &values).render(),
        ))
    }
}

/// Required string argument, trimmed and non-empty.
pub fn required_str(args: &Value, key: &str) -> AppResult<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::InvalidInput(format!("missing required argument '{}'", key)))
}

pub fn optional_bool(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Schema for an object of string properties, all required.
pub fn string_params(props: &[(&str, &str)]) -> Value {
    let properties: serde_json::Map<String, Value> = props
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                serde_json::json!({"type": "string", "description": description}),
            )
        })
        .collect();
    let required: Vec<&str> = props.iter().map(|(name, _)| *name).collect();
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeats its input"
        }

        fn parameters(&self) -> Value {
            string_params(&[("text", "What to repeat")])
        }

        async fn call(&self, args: Value) -> AppResult<ToolOutput> {
            Ok(ToolOutput::Text(required_str(&args, "text")?))
        }
    }

    #[test]
    fn test_tool_output_serializes_untagged() {
        assert_eq!(serde_json::to_value(ToolOutput::Text("hi".into())).unwrap(), json!("hi"));
        assert_eq!(
            serde_json::to_value(ToolOutput::result("r")).unwrap(),
            json!({"result": "r"})
        );
        assert_eq!(
            serde_json::to_value(ToolOutput::error("e")).unwrap(),
            json!({"error": "e"})
        );
    }

    #[test]
    fn test_settle_keeps_fatal_errors() {
        let settled = settle(Err(AppError::NotFound("No data found for sector: X".into()))).unwrap();
        assert_eq!(settled, ToolOutput::error("No data found for sector: X"));

        let fatal = settle(Err(AppError::StoreUnavailable("down".into())));
        assert!(matches!(fatal, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_agent_invoke_validates_arguments() {
        let agent = Agent::new("test", "Test agent", "").with_tool(Arc::new(Echo));
        assert_eq!(agent.tool_names(), vec!["echo"]);

        let out = agent.invoke("echo", json!({"text": " hello "})).await.unwrap();
        assert_eq!(out, ToolOutput::Text("hello".into()));

        let out = agent.invoke("echo", json!({})).await.unwrap();
        assert!(out.is_error());
        assert!(out.as_text().contains("'text'"));

        let missing = agent.invoke("nope", json!({})).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_summary_lists_schema() {
        let agent = Agent::new("test", "Test agent", "").with_tool(Arc::new(Echo));
        let summary = agent.summary();
        assert_eq!(summary.tools.len(), 1);
        assert_eq!(summary.tools[0].parameters["required"], json!(["text"]));
    }
}
