//! Priority-ordered lookup across providers with a shared result budget.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{SearchError, SearchHints, SearchProvider};
use crate::metadata::MetadataCollection;

/// Upper bound on the number of candidates a lookup returns.
pub const MAX_RESULTS: usize = 5;

/// Runs providers in order until the result budget is used up.
///
/// Every sub-query asks for no more than what is left of the budget, and
/// whatever it returns is subtracted before the next one runs, so the total
/// never exceeds `max_results`. Results keep provider order and are not
/// deduplicated.
pub struct SearchCoordinator {
    providers: Vec<Arc<dyn SearchProvider>>,
    max_results: usize,
    timeout: Duration,
}

impl SearchCoordinator {
    /// `max_results` outside `1..=5` falls back to 5.
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>, max_results: usize, timeout: Duration) -> Self {
        let max_results = match max_results {
            n @ 1..=MAX_RESULTS => n,
            _ => MAX_RESULTS,
        };
        Self {
            providers,
            max_results,
            timeout,
        }
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Collect candidates for a release.
    ///
    /// An empty result means "no match"; failing or slow sub-queries are
    /// logged and count as zero results.
    pub async fn resolve(&self, hints: &SearchHints) -> Vec<MetadataCollection> {
        let mut results = Vec::new();
        let mut budget = self.max_results;

        for provider in &self.providers {
            if budget == 0 {
                break;
            }
            let source = provider.source();
            let tokens = provider.tokens(hints);
            if tokens.is_empty() {
                debug!(%source, "No usable tokens, skipping provider");
                continue;
            }

            for &scope in provider.scopes() {
                if budget == 0 {
                    break;
                }
                if !scope.is_satisfied(&tokens) {
                    debug!(%source, %scope, "Missing tokens for sub-query");
                    continue;
                }

                let timeout = self.timeout + provider.pacing(budget);
                let found = match tokio::time::timeout(timeout, provider.search(scope, &tokens, budget)).await {
                    Ok(Ok(found)) => found,
                    Ok(Err(e)) => {
                        warn!(%source, %scope, error = %e, "Sub-query failed");
                        continue;
                    }
                    Err(_) => {
                        let e = SearchError::Timeout(timeout);
                        warn!(%source, %scope, error = %e, "Sub-query dropped");
                        continue;
                    }
                };

                debug!(%source, %scope, count = found.len(), budget, "Sub-query returned");
                for mut candidate in found.into_iter().take(budget) {
                    candidate.set_source(source);
                    results.push(candidate);
                    budget -= 1;
                }
            }
        }

        info!(candidates = results.len(), "Lookup finished");
        results
    }
}
