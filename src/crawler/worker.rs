//! Fetch worker: the full multi-page retrieval of a single target
//!
//! A worker never returns an error. Whatever goes wrong while fetching one
//! target is turned into a `FetchStatus::Failed` carrying the error text, so
//! one target cannot disturb its siblings or the orchestrator.

use crate::crawler::fetcher::{request_page, FetchError, FetchSettings, PageResponse};
use crate::crawler::Target;
use crate::state::{wait_for_reset, FetchState};
use crate::storage::ArtifactStore;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Result of one target in one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// The artifact exists (written now or by an earlier run)
    Success,

    /// The attempt was abandoned; carries the error description
    Failed(String),
}

/// Outcome reported for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub url: String,
    pub status: FetchStatus,
}

impl Outcome {
    pub fn success(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: FetchStatus::Success,
        }
    }

    pub fn failed(url: &str, reason: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            status: FetchStatus::Failed(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}

/// Ordered collection of elements gathered across pages for one target
#[derive(Debug, Default)]
pub struct AccumulatedResult {
    items: Vec<Value>,
}

impl AccumulatedResult {
    /// Adds one page payload
    ///
    /// An object is appended as a single element, an array is appended
    /// element by element. Anything else is rejected.
    ///
    /// # Returns
    ///
    /// The number of elements added
    pub fn absorb(&mut self, body: &[u8]) -> Result<usize, FetchError> {
        match serde_json::from_slice::<Value>(body)? {
            object @ Value::Object(_) => {
                self.items.push(object);
                Ok(1)
            }
            Value::Array(items) => {
                let count = items.len();
                self.items.extend(items);
                Ok(count)
            }
            Value::Null => Err(FetchError::UnexpectedPayload("null")),
            Value::Bool(_) => Err(FetchError::UnexpectedPayload("a boolean")),
            Value::Number(_) => Err(FetchError::UnexpectedPayload("a number")),
            Value::String(_) => Err(FetchError::UnexpectedPayload("a string")),
        }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fetches targets one at a time; cheap to clone into spawned tasks
#[derive(Clone)]
pub struct FetchWorker {
    client: Client,
    settings: Arc<FetchSettings>,
    store: Arc<dyn ArtifactStore>,
}

impl FetchWorker {
    pub fn new(client: Client, settings: FetchSettings, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
            store,
        }
    }

    /// Replaces the artifact store
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    /// Performs the complete retrieval of `target`
    ///
    /// # Flow
    ///
    /// 1. Skip without any request if the artifact already exists
    /// 2. Walk the pagination state machine from page 1
    /// 3. On `Done`, persist the accumulated collection once
    pub async fn fetch(&self, target: &Target) -> Outcome {
        if self.store.exists(&target.artifact_path) {
            tracing::debug!(
                "Artifact {} already exists, skipping {}",
                target.artifact_path.display(),
                target.url
            );
            return Outcome::success(&target.url);
        }

        let status = self.run(target).await;
        if let FetchStatus::Failed(reason) = &status {
            tracing::warn!("Failed to fetch {}: {}", target.url, reason);
        }

        Outcome {
            url: target.url.clone(),
            status,
        }
    }

    async fn run(&self, target: &Target) -> FetchStatus {
        let base = match Url::parse(&target.url) {
            Ok(url) => url,
            Err(e) => return FetchStatus::Failed(FetchError::from(e).to_string()),
        };

        let mut accumulated = AccumulatedResult::default();
        let mut state = FetchState::start();

        while !state.is_terminal() {
            tracing::trace!(
                "{}: {} (page {:?}, {} items so far)",
                target.url,
                state.as_str(),
                state.page(),
                accumulated.len()
            );
            state = self
                .step(state, &base, target, &mut accumulated)
                .await
                .unwrap_or_else(|e| FetchState::Failed(e.to_string()));
        }

        if let FetchState::Failed(reason) = state {
            return FetchStatus::Failed(reason);
        }

        match self.persist(target, accumulated).await {
            Ok(count) => {
                tracing::debug!(
                    "Stored {} items for {} at {}",
                    count,
                    target.url,
                    target.artifact_path.display()
                );
                FetchStatus::Success
            }
            Err(e) => FetchStatus::Failed(e.to_string()),
        }
    }

    /// Hands the finished collection to the store off the async workers
    ///
    /// # Returns
    ///
    /// The number of elements written
    async fn persist(&self, target: &Target, accumulated: AccumulatedResult) -> Result<usize, FetchError> {
        let store = Arc::clone(&self.store);
        let path = target.artifact_path.clone();
        let items = accumulated.into_items();
        let count = items.len();

        tokio::task::spawn_blocking(move || store.persist(&path, &items)).await??;
        Ok(count)
    }

    /// Advances an active state by one request
    async fn step(
        &self,
        state: FetchState,
        base: &Url,
        target: &Target,
        accumulated: &mut AccumulatedResult,
    ) -> Result<FetchState, FetchError> {
        match state {
            FetchState::Fetching { page } => {
                let response = self.request(base, target, page).await?;
                if response.window.is_exhausted() {
                    let reset_at = response
                        .window
                        .reset_at
                        .ok_or_else(|| FetchError::MissingHeader(self.settings.reset_header.clone()))?;
                    return Ok(FetchState::RateLimited { page, reset_at });
                }
                self.absorb_page(page, response, target, accumulated)
            }

            FetchState::RateLimited { page, reset_at } => {
                tracing::info!(
                    "Rate limit exhausted for {} on page {}, waiting for reset at {}",
                    target.url,
                    page,
                    reset_at
                );
                let polls = wait_for_reset(reset_at, self.settings.poll_interval).await;
                tracing::debug!("Rate limit reset after {} polls, retrying page {}", polls, page);

                // The repeated request is issued exactly once and used as-is
                let response = self.request(base, target, page).await?;
                self.absorb_page(page, response, target, accumulated)
            }

            terminal => Ok(terminal),
        }
    }

    async fn request(&self, base: &Url, target: &Target, page: u32) -> Result<PageResponse, FetchError> {
        request_page(&self.client, &self.settings, base, &target.credential, page).await
    }

    fn absorb_page(
        &self,
        page: u32,
        response: PageResponse,
        target: &Target,
        accumulated: &mut AccumulatedResult,
    ) -> Result<FetchState, FetchError> {
        let added = accumulated.absorb(&response.body)?;
        tracing::trace!(
            "Page {} of {} (HTTP {}): {} items, {} remaining in window",
            page,
            target.url,
            response.status_code,
            added,
            response.window.remaining
        );

        if response.has_next {
            Ok(FetchState::Fetching { page: page + 1 })
        } else {
            Ok(FetchState::Done)
        }
    }
}
