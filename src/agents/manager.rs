//! Manager Agent
//!
//! Delegates each user message to one tool of one sub-agent. The LLM picks
//! the tool, the tool runs, then the LLM presents the result in the
//! sub-agent's voice. Without an LLM the manager only describes what it can
//! do.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{Agent, ToolOutput};
use crate::llm::LLM;
use crate::models::{AgentSummary, ChatResponse};
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};

const INSTRUCTION: &str = r#"You are a manager agent overseeing CO2 emissions analysts.
Always delegate the task to the most appropriate agent and tool. Use your best judgement.
Answer directly only for greetings or questions none of the tools can help with."#;

/// The LLM's choice for one user message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RouteDecision {
    Call {
        agent: String,
        tool: String,
        #[serde(default)]
        arguments: Value,
    },
    Reply {
        reply: String,
    },
}

pub struct ManagerAgent {
    agents: BTreeMap<String, Agent>,
    llm: Option<LLM>,
    model: String,
}

impl ManagerAgent {
    pub fn new(agents: Vec<Agent>, llm: Option<LLM>, model: impl Into<String>) -> Self {
        Self {
            agents: agents.into_iter().map(|a| (a.name.clone(), a)).collect(),
            llm,
            model: model.into(),
        }
    }

    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.get(name)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn summaries(&self) -> Vec<AgentSummary> {
        self.agents.values().map(Agent::summary).collect()
    }

    /// Runs one tool directly, bypassing the LLM.
    pub async fn invoke(&self, agent: &str, tool: &str, args: Value) -> AppResult<ToolOutput> {
        let target = self
            .agents
            .get(agent)
            .ok_or_else(|| AppError::NotFound(format!("No agent named {}", agent)))?;
        target.invoke(tool, args).await
    }

    pub async fn handle(&self, message: &str) -> AppResult<ChatResponse> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::InvalidInput("message must not be empty".to_string()));
        }

        let Some(llm) = &self.llm else {
            info!("No LLM configured, answering with capabilities");
            return Ok(ChatResponse {
                text: self.capabilities(),
                agent: None,
                tool: None,
            });
        };

        let routing = self
            .complete(llm, INSTRUCTION.to_string(), self.routing_prompt(message))
            .await?;

        let decision = match parse_decision(&routing) {
            Some(decision) => decision,
            None => {
                warn!("Routing reply was not JSON, passing it through");
                RouteDecision::Reply {
                    reply: routing.trim().to_string(),
                }
            }
        };

        let (agent_name, tool, arguments) = match decision {
            RouteDecision::Reply { reply } => {
                return Ok(ChatResponse {
                    text: reply,
                    agent: None,
                    tool: None,
                })
            }
            RouteDecision::Call {
                agent,
                tool,
                arguments,
            } => (agent, tool, arguments),
        };

        info!(agent = %agent_name, tool = %tool, "Delegating");
        let arguments = if arguments.is_null() {
            Value::Object(Default::default())
        } else {
            arguments
        };
        let output = super::settle(self.invoke(&agent_name, &tool, arguments).await)?;

        let instruction = self
            .agents
            .get(&agent_name)
            .map(|a| a.instruction.clone())
            .unwrap_or_else(|| INSTRUCTION.to_string());
        let prompt = format!(
            "User request:\n{}\n\nTool {} returned:\n{}\n\nPresent this result to the user.",
            message,
            tool,
            output.as_text()
        );

        let text = match self.complete(llm, instruction, prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => output.as_text().to_string(),
            Err(e) => {
                warn!(error = %e, "Presentation failed, returning raw tool output");
                output.as_text().to_string()
            }
        };

        Ok(ChatResponse {
            text,
            agent: Some(agent_name),
            tool: Some(tool),
        })
    }

    async fn complete(&self, llm: &LLM, system: String, prompt: String) -> AppResult<String> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(prompt)],
            max_tokens: Some(2048),
            temperature: Some(0.2),
            system_instruction: Some(system),
        };
        Ok(llm.create_chat_completion(&request).await?.content)
    }

    fn routing_prompt(&self, message: &str) -> String {
        let catalog: Vec<Value> = self
            .summaries()
            .into_iter()
            .map(|a| {
                serde_json::json!({
                    "agent": a.name,
                    "description": a.description,
                    "tools": a.tools.iter().map(|t| serde_json::json!({
                        "tool": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        let catalog = serde_json::to_string_pretty(&catalog).unwrap_or_default();

        format!(
            r#"AVAILABLE AGENTS AND TOOLS:
{catalog}

USER MESSAGE:
{message}

Respond with ONLY a JSON object, either
{{"agent": "<agent name>", "tool": "<tool name>", "arguments": {{...}}}}
to delegate, or
{{"reply": "<your answer>"}}
to answer directly."#
        )
    }

    fn capabilities(&self) -> String {
        let mut lines = vec![
            "No language model is configured, so I can't interpret free-form requests yet. \
             These tools can be called directly:"
                .to_string(),
        ];
        for agent in self.agents.values() {
            lines.push(format!("- {}: {}", agent.name, agent.description));
            for tool in agent.tool_names() {
                lines.push(format!("  - {}", tool));
            }
        }
        lines.join("\n")
    }
}

/// Pulls the JSON object out of a reply that may be wrapped in a code fence.
pub fn parse_decision(response: &str) -> Option<RouteDecision> {
    let json_str = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else if response.contains("```") {
        response.split("```").nth(1).unwrap_or(response).trim()
    } else {
        response.trim()
    };

    serde_json::from_str(json_str).ok()
}
