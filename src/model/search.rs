//! Debounced, cancellable remote city search
//!
//! Every keystroke cancels whatever request is pending or in flight before
//! anything else happens, so a completion for an older query can never land
//! after a newer query was typed. Requests run on spawned tasks and report
//! back over a channel; `poll`/`next_update` apply those reports on the
//! caller's task, and anything from a superseded request is dropped there too.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::city::CityListItem;
use super::weather_api::CityLookup;
use crate::error::TransportError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchSettings {
    /// Quiet period after the last keystroke before a request goes out.
    pub debounce: Duration,
    /// Queries this short or shorter never reach the network.
    pub min_query_len: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            min_query_len: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    /// Waiting out the debounce window.
    Pending,
    InFlight,
}

/// A live request. Cancelling is idempotent and also happens on drop.
pub struct SearchHandle {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SearchHandle {
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::trace!(generation = self.generation, "Cancelling search request");
            self.token.cancel();
            self.task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug)]
enum SearchEvent {
    Started {
        generation: u64,
    },
    Finished {
        generation: u64,
        query: String,
        result: Result<Vec<String>, TransportError>,
    },
}

/// What changed after applying a completion.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchUpdate {
    Loading { query: String },
    Results { query: String, count: usize },
    Failed { query: String, error: TransportError },
}

#[derive(Default)]
struct SearchSession {
    query: String,
    handle: Option<SearchHandle>,
}

pub struct DebouncedSearch {
    client: Arc<dyn CityLookup>,
    settings: SearchSettings,
    session: SearchSession,
    generation: u64,
    state: SearchState,
    results: Vec<CityListItem>,
    last_error: Option<TransportError>,
    tx: mpsc::UnboundedSender<SearchEvent>,
    rx: mpsc::UnboundedReceiver<SearchEvent>,
}

impl DebouncedSearch {
    pub fn new(client: Arc<dyn CityLookup>, settings: SearchSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            settings,
            session: SearchSession::default(),
            generation: 0,
            state: SearchState::Idle,
            results: Vec::new(),
            last_error: None,
            tx,
            rx,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn query(&self) -> &str {
        &self.session.query
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SearchState::InFlight
    }

    pub fn results(&self) -> &[CityListItem] {
        &self.results
    }

    pub fn last_error(&self) -> Option<&TransportError> {
        self.last_error.as_ref()
    }

    /// React to new input text. Must be called from within a tokio runtime.
    pub fn on_query_changed(&mut self, text: &str) {
        self.cancel();
        self.session.query = text.to_string();

        if text.chars().count() <= self.settings.min_query_len {
            tracing::trace!(query = text, "Query too short, clearing results");
            self.results.clear();
            self.last_error = None;
            return;
        }

        let generation = self.generation;
        let token = CancellationToken::new();
        let task = tokio::spawn(supervise_request(
            self.client.clone(),
            self.tx.clone(),
            token.clone(),
            generation,
            text.to_string(),
            self.settings.debounce,
        ));

        self.session.handle = Some(SearchHandle {
            generation,
            token,
            task,
        });
        self.state = SearchState::Pending;
        tracing::debug!(query = text, generation, "Search scheduled");
    }

    /// Cancel any pending or in-flight request and return to `Idle`.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.session.handle.take() {
            handle.cancel();
        }
        // Anything already queued for the old generation is now stale.
        self.generation += 1;
        self.state = SearchState::Idle;
    }

    /// Apply every queued completion without waiting.
    pub fn poll(&mut self) -> Vec<SearchUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            if let Some(update) = self.handle_event(event) {
                updates.push(update);
            }
        }
        updates
    }

    /// Wait for the next update of the live request, or `None` if nothing is
    /// pending.
    pub async fn next_update(&mut self) -> Option<SearchUpdate> {
        while self.state != SearchState::Idle {
            let event = self.rx.recv().await?;
            if let Some(update) = self.handle_event(event) {
                return Some(update);
            }
        }
        None
    }

    fn handle_event(&mut self, event: SearchEvent) -> Option<SearchUpdate> {
        let live = self
            .session
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_cancelled() && handle.generation == self.generation);

        match event {
            SearchEvent::Started { generation } if live && generation == self.generation => {
                self.state = SearchState::InFlight;
                Some(SearchUpdate::Loading {
                    query: self.session.query.clone(),
                })
            }
            SearchEvent::Finished {
                generation,
                query,
                result,
            } if live && generation == self.generation => {
                self.state = SearchState::Idle;
                self.session.handle = None;
                match result {
                    Ok(items) => {
                        tracing::info!(query = %query, count = items.len(), "City search completed");
                        self.results = items.into_iter().map(CityListItem::from).collect();
                        self.last_error = None;
                        Some(SearchUpdate::Results {
                            query,
                            count: self.results.len(),
                        })
                    }
                    Err(error) => {
                        tracing::warn!(query = %query, error = %error, "City search failed");
                        self.last_error = Some(error.clone());
                        Some(SearchUpdate::Failed { query, error })
                    }
                }
            }
            stale => {
                tracing::trace!(?stale, "Dropping stale search event");
                None
            }
        }
    }
}

/// Run the request on its own task so a panic in the client still ends the
/// search with a failure instead of leaving it loading forever.
async fn supervise_request(
    client: Arc<dyn CityLookup>,
    tx: mpsc::UnboundedSender<SearchEvent>,
    token: CancellationToken,
    generation: u64,
    query: String,
    debounce: Duration,
) {
    let request = tokio::spawn(run_request(
        client,
        tx.clone(),
        token.clone(),
        generation,
        query.clone(),
        debounce,
    ));

    if let Err(e) = request.await {
        if token.is_cancelled() {
            return;
        }
        tracing::error!(query = %query, error = %e, "City search task failed");
        let _ = tx.send(SearchEvent::Finished {
            generation,
            query,
            result: Err(TransportError::Request("search task failed".to_string())),
        });
    }
}

async fn run_request(
    client: Arc<dyn CityLookup>,
    tx: mpsc::UnboundedSender<SearchEvent>,
    token: CancellationToken,
    generation: u64,
    query: String,
    debounce: Duration,
) {
    tokio::select! {
        _ = token.cancelled() => return,
        _ = tokio::time::sleep(debounce) => {}
    }

    if tx.send(SearchEvent::Started { generation }).is_err() {
        return;
    }

    let result = tokio::select! {
        _ = token.cancelled() => return,
        result = client.autocomplete(&query) => result,
    };

    if !token.is_cancelled() {
        let _ = tx.send(SearchEvent::Finished {
            generation,
            query,
            result,
        });
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    type Responder = Box<dyn Fn(&str) -> Result<Vec<String>, TransportError> + Send + Sync>;

    struct FakeLookup {
        calls: Mutex<Vec<String>>,
        latency: Duration,
        respond: Responder,
    }

    impl FakeLookup {
        fn new(latency: Duration, respond: Responder) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                latency,
                respond,
            })
        }

        fn echo() -> Arc<Self> {
            Self::new(
                Duration::from_millis(50),
                Box::new(|query| Ok(vec![format!("{},Region,Country", query)])),
            )
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl CityLookup for FakeLookup {
        async fn autocomplete(&self, query: &str) -> Result<Vec<String>, TransportError> {
            self.calls.lock().push(query.to_string());
            tokio::time::sleep(self.latency).await;
            (self.respond)(query)
        }
    }

    fn search_with(client: &Arc<FakeLookup>) -> DebouncedSearch {
        let client: Arc<dyn CityLookup> = client.clone();
        DebouncedSearch::new(client, SearchSettings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn short_queries_never_hit_the_network() {
        let client = FakeLookup::echo();
        let mut search = search_with(&client);

        search.on_query_changed("Lima");
        search.next_update().await;
        search.next_update().await;
        assert_eq!(search.results().len(), 1);

        for text in ["", "L", "Li", "éü"] {
            search.on_query_changed(text);
            assert_eq!(search.state(), SearchState::Idle);
            assert!(search.results().is_empty());
            assert_eq!(search.next_update().await, None);
        }
        assert_eq!(client.calls(), ["Lima"]);
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_query_in_the_window_is_sent() {
        let client = FakeLookup::echo();
        let mut search = search_with(&client);

        search.on_query_changed("Par");
        search.on_query_changed("Pari");
        search.on_query_changed("Paris");
        assert_eq!(search.state(), SearchState::Pending);

        assert_eq!(
            search.next_update().await,
            Some(SearchUpdate::Loading { query: "Paris".into() })
        );
        assert!(search.is_loading());
        assert_eq!(
            search.next_update().await,
            Some(SearchUpdate::Results { query: "Paris".into(), count: 1 })
        );
        assert_eq!(client.calls(), ["Paris"]);
        assert_eq!(search.results()[0].name(), "Paris");
        assert_eq!(search.state(), SearchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_request_never_completes() {
        let client = FakeLookup::new(
            Duration::from_secs(1),
            Box::new(|query| Ok(vec![query.to_string()])),
        );
        let mut search = search_with(&client);

        search.on_query_changed("Paris");
        assert_eq!(
            search.next_update().await,
            Some(SearchUpdate::Loading { query: "Paris".into() })
        );

        search.on_query_changed("Pa");
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(search.poll().is_empty());
        assert!(search.results().is_empty());
        assert!(!search.is_loading());
        assert_eq!(client.calls(), ["Paris"]);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_completion_of_a_cancelled_request_is_ignored() {
        let client = FakeLookup::echo();
        let mut search = search_with(&client);

        search.on_query_changed("Oslo");
        let stale_generation = search.generation;
        search.cancel();
        search.cancel();

        search
            .tx
            .send(SearchEvent::Finished {
                generation: stale_generation,
                query: "Oslo".into(),
                result: Ok(vec!["Oslo,Oslo,Norway".into()]),
            })
            .unwrap();

        assert!(search.poll().is_empty());
        assert!(search.results().is_empty());
        assert_eq!(search.state(), SearchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_cancel_is_idempotent() {
        let client = FakeLookup::echo();
        let mut search = search_with(&client);
        search.on_query_changed("Quito");

        let handle = search.session.handle.take().unwrap();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        drop(handle);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_results() {
        let client = FakeLookup::new(
            Duration::from_millis(10),
            Box::new(|query| {
                if query == "Xyzzy" {
                    Err(TransportError::Status { code: 500 })
                } else {
                    Ok(vec!["Berlin,Berlin,Germany".into(), "Bern,BE,Switzerland".into()])
                }
            }),
        );
        let mut search = search_with(&client);

        search.on_query_changed("Ber");
        search.next_update().await;
        search.next_update().await;
        assert_eq!(search.results().len(), 2);

        search.on_query_changed("Xyzzy");
        search.next_update().await;
        assert_eq!(
            search.next_update().await,
            Some(SearchUpdate::Failed {
                query: "Xyzzy".into(),
                error: TransportError::Status { code: 500 },
            })
        );
        assert_eq!(search.results().len(), 2);
        assert_eq!(search.last_error(), Some(&TransportError::Status { code: 500 }));
        assert!(!search.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_client_ends_the_search_with_a_failure() {
        let client = FakeLookup::new(
            Duration::from_millis(10),
            Box::new(|query: &str| -> Result<Vec<String>, TransportError> {
                panic!("lookup exploded on {}", query)
            }),
        );
        let mut search = search_with(&client);

        search.on_query_changed("Oslo");
        assert_eq!(
            search.next_update().await,
            Some(SearchUpdate::Loading { query: "Oslo".into() })
        );
        assert!(matches!(
            search.next_update().await,
            Some(SearchUpdate::Failed { ref query, error: TransportError::Request(_) }) if query == "Oslo"
        ));
        assert!(!search.is_loading());
        assert_eq!(search.state(), SearchState::Idle);
    }
}
