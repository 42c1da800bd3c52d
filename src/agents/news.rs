//! News Analyst Agent

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{required_str, string_params, Agent, Tool, ToolOutput};
use crate::search::SerpApiClient;
use crate::types::{AppError, AppResult};

pub const AGENT_NAME: &str = "news_analyst";

const DESCRIPTION: &str = "Searches recent news and summarizes it.";

const INSTRUCTION: &str = r#"You are a news analyst. Summarize the articles returned by the search in a few short paragraphs.
Mention the source of each claim and keep the article links.
If the search failed, say so and suggest a different query."#;

pub fn news_agent(client: Option<SerpApiClient>) -> Agent {
    Agent::new(AGENT_NAME, DESCRIPTION, INSTRUCTION).with_tool(Arc::new(NewsSearchTool { client }))
}

struct NewsSearchTool {
    client: Option<SerpApiClient>,
}

#[async_trait]
impl Tool for NewsSearchTool {
    fn name(&self) -> &str {
        "search_news"
    }

    fn description(&self) -> &str {
        "Searches Google News for articles about a topic."
    }

    fn parameters(&self) -> Value {
        string_params(&[("query", "Topic to search news for")])
    }

    async fn call(&self, args: Value) -> AppResult<ToolOutput> {
        let query = required_str(&args, "query")?;
        let client = self.client.as_ref().ok_or_else(|| {
            AppError::Config("news search is not configured (set SERPAPI_KEY)".to_string())
        })?;

        let articles = client.search_news(&query).await?;
        let mut lines = vec![format!("News results for '{}':", query)];
        lines.extend(articles.iter().map(|a| a.to_markdown()));
        Ok(ToolOutput::result(lines.join("\n")))
    }
}
