//! Search and related-media lookup
//!
//! Reuses the resolver's candidate traversal with list-producing parsers.
//! A candidate that exits cleanly but yields no items counts as failed.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SearchConfig;
use crate::errors::{CandidateError, CandidateFailure, SearchError};
use crate::models::media::{normalize_identifier, video_id, watch_url};
use crate::models::{MediaListItem, ResolveCandidate};
use crate::services::fallback::CandidateTraversal;
use crate::services::output_parsers::{parse_list, parse_title};
use crate::services::process_runner::ProcessRunner;

#[derive(Clone)]
pub struct SearchAggregator {
    traversal: CandidateTraversal,
    candidates: Arc<[ResolveCandidate]>,
    related_candidates: Arc<[ResolveCandidate]>,
    title_candidates: Arc<[ResolveCandidate]>,
    max_results: usize,
    related_query_words: usize,
}

impl SearchAggregator {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &SearchConfig) -> Self {
        Self {
            traversal: CandidateTraversal::new(runner, config.timeout),
            candidates: config.candidates.clone().into(),
            related_candidates: config.related_candidates.clone().into(),
            title_candidates: config.title_candidates.clone().into(),
            max_results: config.max_results,
            related_query_words: config.related_query_words,
        }
    }

    /// Items matching a free-text query, in tool order
    pub async fn search(&self, query: &str) -> Result<Vec<MediaListItem>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery("query is empty".to_string()));
        }

        let resolution = self
            .traversal
            .traverse("search", &self.candidates, query, self.max_results, |c, stdout| {
                parse_list(c.parser, stdout)
            })
            .await
            .map_err(|attempts| SearchError::Exhausted { attempts })?;

        let mut items = resolution.value;
        items.truncate(self.max_results);
        info!("query={:?} results={} candidate={}", query, items.len(), resolution.candidate);
        Ok(items)
    }

    /// Items related to `media_url`.
    ///
    /// Tries the platform mix playlist first, then falls back to searching
    /// for the first words of the item's title. The source item is never
    /// part of the result, which may therefore be empty.
    pub async fn related_to(&self, media_url: &str) -> Result<Vec<MediaListItem>, SearchError> {
        let target = normalize_identifier(media_url)
            .map_err(|e| SearchError::InvalidQuery(e.to_string()))?;
        let source_id = video_id(&target);
        let mut attempts = Vec::new();

        if let Some(id) = source_id.as_deref() {
            match self.native_related(id).await {
                Ok(items) => return Ok(items),
                Err(failures) => attempts.extend(failures),
            }
        }

        warn!("Related list unavailable for {}, falling back to title search", target);
        let title_target = source_id.as_deref().map(watch_url).unwrap_or_else(|| target.clone());
        let title = match self
            .traversal
            .traverse("title", &self.title_candidates, &title_target, 1, |c, stdout| {
                parse_title(c.parser, stdout)
            })
            .await
        {
            Ok(resolution) => resolution.value,
            Err(failures) => {
                attempts.extend(failures);
                return Err(SearchError::Exhausted { attempts });
            }
        };

        let query = query_from_title(&title, self.related_query_words);
        if query.is_empty() {
            attempts.push(CandidateFailure {
                candidate: "title".to_string(),
                error: CandidateError::EmptyOutput,
            });
            return Err(SearchError::Exhausted { attempts });
        }

        info!("Related fallback query={:?} from title={:?}", query, title);
        let mut items = match self.search(&query).await {
            Ok(items) => items,
            Err(SearchError::Exhausted { attempts: failures }) => {
                attempts.extend(failures);
                return Err(SearchError::Exhausted { attempts });
            }
            Err(other) => return Err(other),
        };

        if let Some(id) = source_id.as_deref() {
            items.retain(|item| item.id != id);
        }
        Ok(items)
    }

    async fn native_related(&self, id: &str) -> Result<Vec<MediaListItem>, Vec<CandidateFailure>> {
        let mix_url = format!("{}&list=RD{}", watch_url(id), id);
        let max_results = self.max_results;

        let resolution = self
            .traversal
            .traverse(
                "related",
                &self.related_candidates,
                &mix_url,
                max_results + 1,
                |c, stdout| {
                    let mut items = parse_list(c.parser, stdout)?;
                    items.retain(|item| item.id != id);
                    items.truncate(max_results);
                    if items.is_empty() {
                        return Err(CandidateError::NoResults);
                    }
                    Ok(items)
                },
            )
            .await?;

        Ok(resolution.value)
    }
}

/// First `words` whitespace-separated words of `title`
pub fn query_from_title(title: &str, words: usize) -> String {
    title.split_whitespace().take(words).collect::<Vec<_>>().join(" ")
}
