use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

pub type DocId = u32;
pub type QueryId = u32;

/// Term → occurrence sequence, one entry per occurrence of the term in a document.
/// Repeated ids encode the raw term frequency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedList {
    entries: BTreeMap<String, Vec<DocId>>,
}

impl InvertedList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the occurrence sequence for a term that is not yet present.
    pub fn insert(&mut self, term: impl Into<String>, occurrences: Vec<DocId>) -> Result<()> {
        let term = term.into();
        if term.is_empty() {
            return Err(Error::malformed("<inverted list>", 0, "empty term"));
        }
        if occurrences.is_empty() {
            return Err(Error::malformed("<inverted list>", 0, format!("term {term} has no occurrences")));
        }
        if occurrences.contains(&0) {
            return Err(Error::malformed("<inverted list>", 0, format!("term {term} references document id 0")));
        }
        if self.entries.contains_key(&term) {
            return Err(Error::malformed("<inverted list>", 0, format!("duplicate term {term}")));
        }
        self.entries.insert(term, occurrences);
        Ok(())
    }

    pub fn get(&self, term: &str) -> Option<&[DocId]> {
        self.entries.get(term).map(Vec::as_slice)
    }

    /// Terms in ascending order with their occurrence sequences.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DocId])> {
        self.entries.iter().map(|(t, docs)| (t.as_str(), docs.as_slice()))
    }

    /// The document universe: every distinct id referenced by any term.
    pub fn documents(&self) -> BTreeSet<DocId> {
        self.entries.values().flatten().copied().collect()
    }

    pub fn num_terms(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// TF-IDF weight table plus the Euclidean norm of every document vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub(crate) weights: BTreeMap<String, BTreeMap<DocId, f64>>,
    pub(crate) norms: BTreeMap<DocId, f64>,
}

impl Model {
    pub fn from_parts(
        weights: BTreeMap<String, BTreeMap<DocId, f64>>,
        norms: BTreeMap<DocId, f64>,
    ) -> Self {
        Self { weights, norms }
    }

    pub fn weights(&self) -> &BTreeMap<String, BTreeMap<DocId, f64>> {
        &self.weights
    }

    pub fn norms(&self) -> &BTreeMap<DocId, f64> {
        &self.norms
    }

    pub fn postings(&self, term: &str) -> Option<&BTreeMap<DocId, f64>> {
        self.weights.get(term)
    }

    /// Weight of `term` in `doc`; absence means 0.
    pub fn weight(&self, term: &str, doc: DocId) -> f64 {
        self.weights
            .get(term)
            .and_then(|p| p.get(&doc))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn norm(&self, doc: DocId) -> Option<f64> {
        self.norms.get(&doc).copied()
    }

    pub fn num_terms(&self) -> usize {
        self.weights.len()
    }

    pub fn num_documents(&self) -> usize {
        self.norms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Query id → normalized query text.
pub type QuerySet = BTreeMap<QueryId, String>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedHit {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub doc_id: DocId,
    pub score: f64,
}

pub type RankedResults = BTreeMap<QueryId, Vec<RankedHit>>;
