//! Page fetching for the grid's item frontier.
//!
//! - At most one request in flight per frontier cursor
//! - Fetches run on the tokio runtime, results come back over a flume channel
//!   and are applied on the owning thread
//! - Every response carries the generation it was requested under; responses
//!   from before a `reset` are discarded
//! - Failed fetches retry with exponential backoff, then freeze the frontier.
//!   A fetch that panics freezes it immediately.

use std::sync::Arc;

use anyhow::{anyhow, Error};
use flume::{Receiver, Sender};
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, trace, warn};

use super::{Cursor, ItemSource, Page};
use crate::config::RetryPolicy;
use crate::models::Item;

struct PageResponse {
    generation: u64,
    cursor: Cursor,
    attempts: u32,
    result: Result<Page, Error>,
}

struct InFlight {
    cursor: Cursor,
    fetch: AbortHandle,
    report: JoinHandle<()>,
}

impl InFlight {
    fn abort(self) {
        self.fetch.abort();
        self.report.abort();
    }
}

/// A response accepted by the pager.
#[derive(Debug)]
pub enum PageEvent {
    /// A page arrived. `finished` is set when the source reported its end.
    Items { items: Vec<Item>, finished: bool },
    /// Every attempt failed. The frontier stays where it was.
    Failed {
        cursor: Cursor,
        attempts: u32,
        error: Error,
    },
}

pub struct Pager<S: ItemSource> {
    source: Arc<S>,
    retry: RetryPolicy,
    runtime: Handle,
    tx: Sender<PageResponse>,
    rx: Receiver<PageResponse>,
    frontier: Cursor,
    generation: u64,
    in_flight: Option<InFlight>,
    exhausted: bool,
    frozen: bool,
    requests_issued: u64,
}

impl<S: ItemSource> Pager<S> {
    pub fn new(source: S, retry: RetryPolicy, runtime: Handle) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            source: Arc::new(source),
            retry,
            runtime,
            tx,
            rx,
            frontier: Cursor::start(),
            generation: 0,
            in_flight: None,
            exhausted: false,
            frozen: false,
            requests_issued: 0,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn frontier(&self) -> Cursor {
        self.frontier
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// True after a fetch exhausted its retries.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    /// Requests the page at the frontier.
    ///
    /// Returns false without doing anything when that page is already in
    /// flight, the source is exhausted, or paging is frozen.
    pub fn request_next(&mut self) -> bool {
        if self.exhausted || self.frozen {
            return false;
        }
        if let Some(in_flight) = &self.in_flight {
            trace!(cursor = in_flight.cursor.offset(), "Page request already in flight");
            return false;
        }

        let cursor = self.frontier;
        let generation = self.generation;
        let source = Arc::clone(&self.source);
        let retry = self.retry.clone();
        let tx = self.tx.clone();

        let fetch = self
            .runtime
            .spawn(async move { fetch_with_retry(source.as_ref(), cursor, &retry).await });
        let fetch_abort = fetch.abort_handle();

        // A panicking source must still produce a response, or the frontier
        // would stay in flight forever.
        let report = self.runtime.spawn(async move {
            let (result, attempts) = match fetch.await {
                Ok(outcome) => outcome,
                Err(err) => (Err(anyhow!("Page fetch task failed: {err}")), 1),
            };
            // The pager may be gone already.
            let _ = tx.send(PageResponse {
                generation,
                cursor,
                attempts,
                result,
            });
        });

        self.requests_issued += 1;
        self.in_flight = Some(InFlight {
            cursor,
            fetch: fetch_abort,
            report,
        });
        debug!(cursor = cursor.offset(), generation, "Requested page");
        true
    }

    /// Applies every response that has already arrived, without waiting.
    pub fn poll(&mut self) -> Vec<PageEvent> {
        let mut events = Vec::new();
        while let Ok(response) = self.rx.try_recv() {
            if let Some(event) = self.accept(response) {
                events.push(event);
            }
        }
        events
    }

    /// Waits until the in-flight request resolves. Returns `None` when
    /// nothing is in flight.
    pub async fn wait(&mut self) -> Option<PageEvent> {
        while self.in_flight.is_some() {
            let response = self.rx.recv_async().await.ok()?;
            if let Some(event) = self.accept(response) {
                return Some(event);
            }
        }
        None
    }

    /// Leaves the frozen state so the frontier page can be requested again.
    pub fn unfreeze(&mut self) -> bool {
        std::mem::replace(&mut self.frozen, false)
    }

    /// Abandons in-flight work and restarts from the first page.
    pub fn reset(&mut self) {
        self.generation += 1;
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort();
        }
        self.frontier = Cursor::start();
        self.exhausted = false;
        self.frozen = false;
        debug!(generation = self.generation, "Pager reset");
    }

    fn accept(&mut self, response: PageResponse) -> Option<PageEvent> {
        if response.generation != self.generation || response.cursor != self.frontier {
            trace!(
                generation = response.generation,
                current = self.generation,
                cursor = response.cursor.offset(),
                "Discarding stale page response"
            );
            return None;
        }
        self.in_flight = None;

        match response.result {
            Ok(page) => {
                match page.next {
                    Some(next) if next != response.cursor => self.frontier = next,
                    Some(_) => {
                        warn!(
                            cursor = response.cursor.offset(),
                            "Source returned the same cursor, treating it as exhausted"
                        );
                        self.exhausted = true;
                    }
                    None => self.exhausted = true,
                }
                debug!(
                    count = page.items.len(),
                    attempts = response.attempts,
                    finished = self.exhausted,
                    "Page arrived"
                );
                Some(PageEvent::Items {
                    items: page.items,
                    finished: self.exhausted,
                })
            }
            Err(error) => {
                warn!(
                    error = ?error,
                    cursor = response.cursor.offset(),
                    attempts = response.attempts,
                    "Page fetch failed, freezing frontier"
                );
                self.frozen = true;
                Some(PageEvent::Failed {
                    cursor: response.cursor,
                    attempts: response.attempts,
                    error,
                })
            }
        }
    }
}

impl<S: ItemSource> Drop for Pager<S> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort();
        }
    }
}

async fn fetch_with_retry<S: ItemSource>(
    source: &S,
    cursor: Cursor,
    retry: &RetryPolicy,
) -> (Result<Page, Error>, u32) {
    let mut attempt = 1;
    loop {
        match source.next_page(cursor).await {
            Ok(page) => return (Ok(page), attempt),
            Err(err) if attempt < retry.max_attempts => {
                let delay = retry.backoff_for(attempt);
                warn!(
                    error = ?err,
                    attempt,
                    ?delay,
                    cursor = cursor.offset(),
                    "Page fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return (Err(err), attempt),
        }
    }
}
