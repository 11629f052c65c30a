//! Smart search: free-text query in, display-ready [`SearchResult`] out.
//!
//! Every accepted query yields a result value. Provider failures are logged and replaced by a
//! fixed apology; a missing credential short-circuits to a fixed placeholder without any network
//! call. At most one search runs at a time; further calls are rejected while one is pending.

use crate::gemini_bridge::{GroundedAnswer, GroundedQuery, SearchProvider};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const MISSING_KEY_TEXT: &str = "API Key is missing. Please check your configuration.";
pub const SEARCH_ERROR_TEXT: &str =
    "Sorry, I encountered an error while searching. Please try again later.";
pub const NO_RESULT_TEXT: &str = "No result found.";
pub const FALLBACK_SOURCE_TITLE: &str = "Web Source";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    /// Present only when the provider cited at least one source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SearchSource>>,
}

impl SearchResult {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            sources: None,
        }
    }

    fn from_answer(answer: GroundedAnswer) -> Self {
        let sources: Vec<SearchSource> = answer
            .citations
            .into_iter()
            .map(|c| SearchSource {
                title: c.title.unwrap_or_else(|| FALLBACK_SOURCE_TITLE.to_string()),
                uri: c.uri,
            })
            .collect();
        Self {
            text: answer.text.unwrap_or_else(|| NO_RESULT_TEXT.to_string()),
            sources: Some(sources).filter(|s| !s.is_empty()),
        }
    }
}

/// Why a search call produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SearchRejection {
    #[error("query is empty")]
    EmptyQuery,
    #[error("a search is already in flight")]
    InFlight,
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SmartSearch {
    /// `None` when no credential is configured.
    provider: Option<Arc<dyn SearchProvider>>,
    in_flight: AtomicBool,
}

impl SmartSearch {
    pub fn new(provider: Option<Arc<dyn SearchProvider>>) -> Self {
        Self {
            provider,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn unconfigured() -> Self {
        Self::new(None)
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// True while a provider call is pending.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn search(&self, query: &str) -> Result<SearchResult, SearchRejection> {
        if query.trim().is_empty() {
            return Err(SearchRejection::EmptyQuery);
        }

        let Some(provider) = self.provider.as_ref() else {
            tracing::warn!("search requested but no API key is configured");
            return Ok(SearchResult::plain(MISSING_KEY_TEXT));
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("rejecting search while another is in flight");
            return Err(SearchRejection::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let request = GroundedQuery::dashboard(query);
        match provider.ground(&request).await {
            Ok(answer) => {
                let result = SearchResult::from_answer(answer);
                tracing::info!(
                    sources = result.sources.as_ref().map_or(0, Vec::len),
                    "search completed"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, "search provider error");
                Ok(SearchResult::plain(SEARCH_ERROR_TEXT))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini_bridge::Citation;

    #[test]
    fn answer_fallbacks_apply() {
        let result = SearchResult::from_answer(GroundedAnswer {
            text: None,
            citations: vec![Citation { title: None, uri: "https://x.example".into() }],
        });
        assert_eq!(result.text, NO_RESULT_TEXT);
        assert_eq!(
            result.sources,
            Some(vec![SearchSource {
                title: FALLBACK_SOURCE_TITLE.into(),
                uri: "https://x.example".into()
            }])
        );
    }

    #[test]
    fn no_citations_means_no_sources_field() {
        let result = SearchResult::from_answer(GroundedAnswer {
            text: Some("answer".into()),
            citations: vec![],
        });
        assert!(result.sources.is_none());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("sources").is_none());
    }

    #[tokio::test]
    async fn blank_queries_are_rejected_even_without_provider() {
        let search = SmartSearch::unconfigured();
        assert_eq!(search.search("").await, Err(SearchRejection::EmptyQuery));
        assert_eq!(search.search(" \t\n").await, Err(SearchRejection::EmptyQuery));
    }
}
