//! Structured events emitted by the indexing and retrieval cores.
//!
//! The cores never log directly; they report to an [`EventSink`] handed in by
//! the caller. Binaries use [`TracingSink`], tests use [`MemorySink`].

use parking_lot::Mutex;

use crate::model::{DocId, QueryId};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    InvertedListLoaded { terms: usize, documents: usize },
    /// The inverted list referenced no documents; an empty model was produced.
    NothingToIndex,
    WeightsComputed { terms: usize },
    NormsComputed { documents: usize },
    /// The query set was empty; nothing was ranked.
    NoQueries,
    /// A query had no terms and was left out of the results.
    EmptyQuery { query_id: QueryId },
    /// A document matched a query but its vector norm is zero.
    ZeroNormExcluded { query_id: QueryId, doc_id: DocId },
    QueryRanked { query_id: QueryId, hits: usize },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Forwards events to `tracing`, warnings for the recoverable conditions.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        match event {
            Event::InvertedListLoaded { terms, documents } => {
                tracing::info!(terms, documents, "inverted list loaded")
            }
            Event::NothingToIndex => tracing::warn!("no documents found, weight computation skipped"),
            Event::WeightsComputed { terms } => tracing::info!(terms, "tf-idf weights computed"),
            Event::NormsComputed { documents } => tracing::info!(documents, "document norms computed"),
            Event::NoQueries => tracing::warn!("query set is empty, nothing to rank"),
            Event::EmptyQuery { query_id } => tracing::warn!(query_id, "query has no terms, skipped"),
            Event::ZeroNormExcluded { query_id, doc_id } => {
                tracing::debug!(query_id, doc_id, "document has zero norm, excluded")
            }
            Event::QueryRanked { query_id, hits } => tracing::debug!(query_id, hits, "query ranked"),
        }
    }
}

/// Keeps every event in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn contains(&self, event: &Event) -> bool {
        self.events.lock().iter().any(|e| e == event)
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}
