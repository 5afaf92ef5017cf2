//! Concurrent fan-out to resolved sources.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use crate::config::{DEFAULT_DEADLINE_MS, DEFAULT_SOURCE_TIMEOUT_MS};
use crate::{ErrorKind, Record, SearchQuery, SourceAdapter, SourceOutcome};

/// Records and outcomes gathered from one fan-out.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Records per source, in source resolution order.
    pub batches: Vec<(String, Vec<Record>)>,
    /// One outcome per resolved source, in source resolution order.
    pub outcomes: Vec<SourceOutcome>,
}

impl Dispatch {
    /// Flattens the batches into one record stream, keeping delivery order.
    pub fn into_records(self) -> (Vec<Record>, Vec<SourceOutcome>) {
        let records = self
            .batches
            .into_iter()
            .flat_map(|(_, records)| records)
            .collect();
        (records, self.outcomes)
    }
}

/// Runs every resolved source concurrently under a per-source timeout and an
/// overall deadline.
///
/// A source failure of any kind, including a panic inside the adapter, is
/// turned into an error outcome for that source alone. Sources still running
/// when the deadline passes are dropped and reported as timeouts.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    source_timeout: Duration,
    deadline: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_millis(DEFAULT_SOURCE_TIMEOUT_MS),
            deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
        }
    }
}

type Slot = (Vec<Record>, SourceOutcome);

impl Dispatcher {
    /// Creates a dispatcher with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout applied to sources without their own.
    pub fn set_source_timeout(&mut self, timeout: Duration) {
        self.source_timeout = timeout;
    }

    /// Sets the overall deadline.
    pub fn set_deadline(&mut self, deadline: Duration) {
        self.deadline = deadline;
    }

    /// Default per-source timeout.
    pub fn source_timeout(&self) -> Duration {
        self.source_timeout
    }

    /// Overall deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Queries every source and collects one slot per source.
    pub async fn dispatch(&self, sources: &[Arc<dyn SourceAdapter>], query: &SearchQuery) -> Dispatch {
        if sources.is_empty() {
            return Dispatch::default();
        }

        let started = Instant::now();
        let deadline = started + self.deadline;
        let query = Arc::new(query.clone());
        let mut slots: Vec<Option<Slot>> = (0..sources.len()).map(|_| None).collect();

        let mut pending: FuturesUnordered<_> = sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let source = Arc::clone(source);
                let query = Arc::clone(&query);
                let limit = source.timeout().unwrap_or(self.source_timeout);

                async move {
                    let began = Instant::now();
                    let result =
                        timeout(limit, AssertUnwindSafe(source.search(&query)).catch_unwind()).await;
                    let elapsed_ms = began.elapsed().as_millis() as u64;
                    let id = source.id();

                    let slot = match result {
                        Ok(Ok(Ok(mut records))) => {
                            for record in &mut records {
                                record.source = id.to_string();
                            }
                            debug!("Source {} returned {} records in {}ms", id, records.len(), elapsed_ms);
                            let outcome = SourceOutcome::from_count(id, records.len(), elapsed_ms);
                            (records, outcome)
                        }
                        Ok(Ok(Err(e))) => {
                            warn!("Source {} failed: {}", id, e);
                            (Vec::new(), SourceOutcome::failed(id, e.kind(), e.to_string(), elapsed_ms))
                        }
                        Ok(Err(_)) => {
                            warn!("Source {} panicked", id);
                            let outcome =
                                SourceOutcome::failed(id, ErrorKind::Parse, "adapter panicked", elapsed_ms);
                            (Vec::new(), outcome)
                        }
                        Err(_) => {
                            warn!("Source {} timed out after {:?}", id, limit);
                            let cause = format!("timed out after {}ms", limit.as_millis());
                            (Vec::new(), SourceOutcome::failed(id, ErrorKind::Timeout, cause, elapsed_ms))
                        }
                    };
                    (index, slot)
                }
            })
            .collect();

        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some((index, slot))) => slots[index] = Some(slot),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Overall deadline of {:?} exceeded with {} sources outstanding",
                        self.deadline,
                        pending.len()
                    );
                    break;
                }
            }
        }
        drop(pending);

        let total_ms = started.elapsed().as_millis() as u64;
        let mut dispatch = Dispatch::default();
        for (source, slot) in sources.iter().zip(slots) {
            let (records, outcome) = slot.unwrap_or_else(|| {
                let cause = format!("overall deadline of {}ms exceeded", self.deadline.as_millis());
                (
                    Vec::new(),
                    SourceOutcome::failed(source.id(), ErrorKind::Timeout, cause, total_ms),
                )
            });
            dispatch.batches.push((source.id().to_string(), records));
            dispatch.outcomes.push(outcome);
        }
        dispatch
    }
}
