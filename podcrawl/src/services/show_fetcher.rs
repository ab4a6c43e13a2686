//! Concurrent show fetching
//!
//! One task per identifier, all launched at once (optionally bounded by a
//! semaphore). Each task records its own outcome in the shared sink; the
//! fetcher waits for every task before draining the sink, so the caller
//! always sees exactly one outcome per distinct identifier.

use crate::error::ShowError;
use crate::models::Show;
use crate::options::RequestOptions;
use crate::services::discovery::{identifiers_from_links, EntityDiscovery};
use crate::services::lookup_client::ShowResolver;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

/// Partitioned result of one batch. Order carries no meaning.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub shows: Vec<Show>,
    pub errors: Vec<ShowError>,
}

impl FetchOutcome {
    /// Batch aborted before any lookup ran
    fn aborted(error: ShowError) -> Self {
        Self {
            shows: Vec::new(),
            errors: vec![error],
        }
    }

    /// Number of outcomes recorded
    pub fn len(&self) -> usize {
        self.shows.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write side shared by all workers, one lock per outcome kind
#[derive(Default)]
struct OutcomeSink {
    shows: Mutex<Vec<Show>>,
    errors: Mutex<Vec<ShowError>>,
}

impl OutcomeSink {
    async fn record(&self, outcome: Result<Show, ShowError>) {
        match outcome {
            Ok(show) => self.shows.lock().await.push(show),
            Err(err) => self.errors.lock().await.push(err),
        }
    }

    /// Only called after every worker has joined
    async fn drain(&self) -> FetchOutcome {
        FetchOutcome {
            shows: std::mem::take(&mut *self.shows.lock().await),
            errors: std::mem::take(&mut *self.errors.lock().await),
        }
    }
}

/// Fans lookups out over a resolver and gathers the outcomes
pub struct ShowFetcher {
    resolver: Arc<dyn ShowResolver>,
    max_concurrency: Option<usize>,
}

impl ShowFetcher {
    /// Unbounded fetcher: every lookup starts immediately
    pub fn new(resolver: Arc<dyn ShowResolver>) -> Self {
        Self {
            resolver,
            max_concurrency: None,
        }
    }

    /// Cap the number of lookups in flight (`None` = unbounded)
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit.map(|n| n.max(1));
        self
    }

    /// Discover show links, extract identifiers, then resolve them all
    ///
    /// A discovery or extraction failure is returned as the only error and
    /// no lookup is attempted.
    pub async fn get_shows(
        &self,
        discovery: &dyn EntityDiscovery,
        options: Arc<RequestOptions>,
    ) -> FetchOutcome {
        let links = match discovery.discover(&options.discovery).await {
            Ok(links) => links,
            Err(e) => {
                tracing::error!(error = %e, "Show discovery failed");
                return FetchOutcome::aborted(e);
            }
        };

        let ids = match identifiers_from_links(&links) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Show identifier extraction failed");
                return FetchOutcome::aborted(e);
            }
        };

        self.resolve_all(ids, options).await
    }

    /// Resolve every distinct identifier concurrently and wait for all
    ///
    /// Duplicate identifiers are looked up once. A worker that panics still
    /// contributes a `ShowError::Worker` for its identifier.
    pub async fn resolve_all<I>(&self, ids: I, options: Arc<RequestOptions>) -> FetchOutcome
    where
        I: IntoIterator<Item = u64>,
    {
        let ids: BTreeSet<u64> = ids.into_iter().collect();
        if ids.is_empty() {
            return FetchOutcome::default();
        }

        let sink = Arc::new(OutcomeSink::default());
        let completed = Arc::new(AtomicUsize::new(0));
        let permits = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));

        tracing::info!(
            shows = ids.len(),
            max_concurrency = ?self.max_concurrency,
            "Resolving shows"
        );

        let mut join_set = JoinSet::new();
        let mut task_ids = HashMap::with_capacity(ids.len());

        for id in ids {
            let resolver = Arc::clone(&self.resolver);
            let options = Arc::clone(&options);
            let sink = Arc::clone(&sink);
            let completed = Arc::clone(&completed);
            let permits = permits.clone();

            let handle = join_set.spawn(async move {
                // The semaphore is never closed, so acquire only fails if it is dropped
                let _permit = match permits {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                let outcome = resolver.resolve(id, &options).await;
                if let Err(e) = &outcome {
                    tracing::warn!(id, error = %e, "Show lookup failed");
                }

                sink.record(outcome).await;
                completed.fetch_add(1, Ordering::AcqRel);
            });
            task_ids.insert(handle.id(), id);
        }

        let launched = task_ids.len();

        // Barrier: every launched worker must be joined before draining
        while let Some(joined) = join_set.join_next_with_id().await {
            if let Err(join_error) = joined {
                let task_id = join_error.id();
                let reason = if join_error.is_panic() {
                    panic_reason(join_error.into_panic())
                } else {
                    "task cancelled".to_string()
                };

                match task_ids.get(&task_id) {
                    Some(&id) => {
                        tracing::error!(id, reason = %reason, "Show resolver task aborted");
                        sink.record(Err(ShowError::Worker { id, reason })).await;
                        completed.fetch_add(1, Ordering::AcqRel);
                    }
                    None => {
                        tracing::error!(reason = %reason, "Unknown resolver task aborted");
                    }
                }
            }
        }

        let finished = completed.load(Ordering::Acquire);
        debug_assert_eq!(finished, launched, "every worker reports exactly once");

        let outcome = sink.drain().await;

        tracing::info!(
            launched,
            shows = outcome.shows.len(),
            failures = outcome.errors.len(),
            "Show batch resolved"
        );

        outcome
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
