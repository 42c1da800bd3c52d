//! Search Module
//!
//! News search for the news analyst agent, backed by SerpAPI.

pub mod serpapi;

pub use serpapi::{NewsResult, SearchError, SerpApiClient};
