//! SerpAPI Client
//!
//! News search through SerpAPI's `google_news` engine, used by the news
//! analyst to put emissions figures in context.

use serpapi_search_rust::serp_api_search::SerpApiSearch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::AppError;

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("SerpAPI key not configured")]
    NoApiKey,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse search results: {0}")]
    ParseError(String),

    #[error("No results found for query")]
    NoResults,
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError::Search(err.to_string())
    }
}

/// One article from Google News
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsResult {
    pub title: String,
    pub link: String,
    pub source: Option<String>,
    pub date: Option<String>,
    pub snippet: Option<String>,
}

impl NewsResult {
    /// Markdown bullet used in tool output.
    pub fn to_markdown(&self) -> String {
        let mut line = format!("- [{}]({})", self.title, self.link);
        match (&self.source, &self.date) {
            (Some(source), Some(date)) => line.push_str(&format!(" ({}, {})", source, date)),
            (Some(source), None) => line.push_str(&format!(" ({})", source)),
            (None, Some(date)) => line.push_str(&format!(" ({})", date)),
            (None, None) => {}
        }
        if let Some(snippet) = self.snippet.as_deref().filter(|s| !s.is_empty()) {
            line.push_str(&format!(": {}", snippet));
        }
        line
    }
}

pub struct SerpApiClient {
    api_key: String,
    max_results: usize,
}

impl SerpApiClient {
    /// `None` when no key is configured.
    pub fn from_config(config: &crate::config::SearchConfig) -> Option<Self> {
        if config.serpapi_key.trim().is_empty() {
            return None;
        }

        Some(Self {
            api_key: config.serpapi_key.clone(),
            max_results: config.max_results,
        })
    }

    pub async fn search_news(&self, query: &str) -> Result<Vec<NewsResult>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }

        info!(query = %query, "Searching Google News via SerpAPI");

        let mut params = HashMap::<String, String>::new();
        params.insert("engine".to_string(), "google_news".to_string());
        params.insert("q".to_string(), query.to_string());
        params.insert("hl".to_string(), "en".to_string());
        params.insert("gl".to_string(), "us".to_string());

        let search = SerpApiSearch::google(params, self.api_key.clone());
        let results = search
            .json()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        debug!("Raw news response received");
        parse_news_results(&results, self.max_results)
    }
}

/// Reads `news_results`; grouped stories contribute their first article.
pub fn parse_news_results(results: &Value, max: usize) -> Result<Vec<NewsResult>, SearchError> {
    if let Some(error) = results.get("error").and_then(|v| v.as_str()) {
        return Err(SearchError::RequestFailed(error.to_string()));
    }

    let items = results
        .get("news_results")
        .ok_or(SearchError::NoResults)?
        .as_array()
        .ok_or_else(|| SearchError::ParseError("Expected array of news results".to_string()))?;

    let news: Vec<NewsResult> = items
        .iter()
        .filter_map(|item| {
            let item = match item.get("stories").and_then(|s| s.as_array()) {
                Some(stories) if item.get("link").is_none() => stories.first()?,
                _ => item,
            };
            let title = item.get("title")?.as_str()?.to_string();
            let link = item.get("link")?.as_str()?.to_string();
            let source = match item.get("source") {
                Some(Value::String(name)) => Some(name.clone()),
                Some(obj) => obj.get("name").and_then(|v| v.as_str()).map(String::from),
                None => None,
            };
            Some(NewsResult {
                title,
                link,
                source,
                date: item.get("date").and_then(|v| v.as_str()).map(String::from),
                snippet: item.get("snippet").and_then(|v| v.as_str()).map(String::from),
            })
        })
        .take(max)
        .collect();

    if news.is_empty() {
        return Err(SearchError::NoResults);
    }
    Ok(news)
}
