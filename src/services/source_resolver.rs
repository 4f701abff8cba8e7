//! Single-media source resolution
//!
//! Turns a media identifier into a direct playable URL by walking the
//! configured resolver candidates in order.

use std::sync::Arc;
use tracing::info;

use crate::config::ResolverConfig;
use crate::errors::{AppError, CandidateFailure, ResolveError};
use crate::models::media::normalize_identifier;
use crate::models::{MediaUrlFilter, ResolveCandidate, ResolvedMedia};
use crate::services::fallback::{CandidateTraversal, Resolution};
use crate::services::output_parsers::parse_media;
use crate::services::process_runner::ProcessRunner;

/// Resolved media plus the attempts that failed before it
#[derive(Debug)]
pub struct ResolvedSource {
    pub media: ResolvedMedia,
    pub candidate: String,
    pub failures: Vec<CandidateFailure>,
}

#[derive(Clone)]
pub struct SourceResolver {
    traversal: CandidateTraversal,
    candidates: Arc<[ResolveCandidate]>,
    filter: MediaUrlFilter,
}

impl SourceResolver {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &ResolverConfig) -> Result<Self, AppError> {
        let filter = MediaUrlFilter::new(&config.non_media_patterns).map_err(|e| {
            AppError::Configuration {
                message: format!("invalid non-media pattern: {e}"),
            }
        })?;

        Ok(Self {
            traversal: CandidateTraversal::new(runner, config.timeout),
            candidates: config.candidates.clone().into(),
            filter,
        })
    }

    /// Resolve `identifier` to a direct media URL.
    ///
    /// Each candidate is attempted at most once; the first valid result wins.
    pub async fn resolve(&self, identifier: &str) -> Result<ResolvedSource, ResolveError> {
        let target = normalize_identifier(identifier)?;
        info!("Resolving media source: {}", target);

        let filter = &self.filter;
        let Resolution {
            value,
            candidate,
            failures,
        } = self
            .traversal
            .traverse("resolve", &self.candidates, &target, 1, |candidate, stdout| {
                parse_media(candidate.parser, stdout, filter)
            })
            .await
            .map_err(|attempts| ResolveError::Exhausted { attempts })?;

        info!(
            "Resolved {} via candidate={} mime={:?}",
            target, candidate, value.mime_hint
        );

        Ok(ResolvedSource {
            media: value,
            candidate,
            failures,
        })
    }
}
