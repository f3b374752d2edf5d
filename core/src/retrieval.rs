use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::events::{Event, EventSink};
use crate::model::{DocId, Model, QueryId, QuerySet, RankedHit, RankedResults};

/// Scores queries against an immutable model by cosine similarity.
///
/// Query terms carry weight 1, so the query norm is `sqrt(|Q|)`. Repeated
/// terms count once per occurrence.
pub struct Retriever<'m> {
    model: &'m Model,
}

impl<'m> Retriever<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self { model }
    }

    /// Ranks every document sharing a term with `text`.
    /// Returns `None` when the query has no terms.
    pub fn rank(&self, text: &str) -> Option<Vec<RankedHit>> {
        self.rank_with(0, text, None)
    }

    /// Ranks every query in the set. Queries are scored in parallel; the
    /// result is keyed (and therefore ordered) by query id.
    pub fn run(&self, queries: &QuerySet, sink: &dyn EventSink) -> RankedResults {
        if queries.is_empty() {
            sink.emit(Event::NoQueries);
            return RankedResults::new();
        }
        queries
            .par_iter()
            .filter_map(|(query_id, text)| {
                let hits = self.rank_with(*query_id, text, Some(sink));
                match &hits {
                    Some(h) => sink.emit(Event::QueryRanked { query_id: *query_id, hits: h.len() }),
                    None => sink.emit(Event::EmptyQuery { query_id: *query_id }),
                }
                hits.map(|h| (*query_id, h))
            })
            .collect()
    }

    fn rank_with(&self, query_id: QueryId, text: &str, sink: Option<&dyn EventSink>) -> Option<Vec<RankedHit>> {
        let terms: Vec<&str> = text.split_whitespace().collect();
        if terms.is_empty() {
            return None;
        }
        let query_norm = (terms.len() as f64).sqrt();

        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for term in &terms {
            if let Some(postings) = self.model.postings(term) {
                for (doc, weight) in postings {
                    *scores.entry(*doc).or_insert(0.0) += weight;
                }
            }
        }

        let mut scored: Vec<(DocId, f64)> = Vec::with_capacity(scores.len());
        for (doc, score) in scores {
            match self.model.norm(doc) {
                Some(norm) if norm > 0.0 => scored.push((doc, score / (norm * query_norm))),
                _ => {
                    if let Some(sink) = sink {
                        sink.emit(Event::ZeroNormExcluded { query_id, doc_id: doc });
                    }
                }
            }
        }

        scored.sort_by(|a, b| by_score_then_doc(*a, *b));
        Some(
            scored
                .into_iter()
                .enumerate()
                .map(|(i, (doc_id, score))| RankedHit { rank: i + 1, doc_id, score })
                .collect(),
        )
    }
}

/// Descending score, ties broken by ascending document id.
fn by_score_then_doc(a: (DocId, f64), b: (DocId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn model(weights: Vec<(&str, Vec<(DocId, f64)>)>, norms: Vec<(DocId, f64)>) -> Model {
        let weights = weights
            .into_iter()
            .map(|(t, p)| (t.to_string(), p.into_iter().collect::<BTreeMap<_, _>>()))
            .collect();
        Model::from_parts(weights, norms.into_iter().collect())
    }

    #[test]
    fn equal_scores_break_ties_by_doc_id() {
        let m = model(vec![("X", vec![(9, 1.0), (3, 1.0), (5, 1.0)])], vec![(3, 1.0), (5, 1.0), (9, 1.0)]);
        let hits = Retriever::new(&m).rank("X").unwrap();
        let docs: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(docs, vec![3, 5, 9]);
        assert_eq!(hits.iter().map(|h| h.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn repeated_query_terms_accumulate() {
        let m = model(vec![("X", vec![(1, 2.0)])], vec![(1, 2.0)]);
        let hits = Retriever::new(&m).rank("X X").unwrap();
        // score 4 / (2 * sqrt(2))
        assert!((hits[0].score - 4.0 / (2.0 * 2f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn blank_query_is_none() {
        let m = Model::default();
        assert!(Retriever::new(&m).rank("   ").is_none());
    }
}
