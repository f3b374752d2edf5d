use std::collections::{BTreeMap, BTreeSet};

use crate::events::{Event, EventSink};
use crate::model::{DocId, InvertedList, Model};

/// `log10(N / df)`. Zero when the term occurs in every document.
pub fn idf(num_docs: usize, doc_freq: usize) -> f64 {
    (num_docs as f64 / doc_freq as f64).log10()
}

/// Log-dampened term frequency, `1 + log10(freq)` for `freq >= 1`.
pub fn tf(freq: u32) -> f64 {
    1.0 + f64::from(freq).log10()
}

/// Builds the TF-IDF model from an inverted list.
pub struct Indexer<'a> {
    sink: &'a dyn EventSink,
}

impl<'a> Indexer<'a> {
    pub fn new(sink: &'a dyn EventSink) -> Self {
        Self { sink }
    }

    pub fn build(&self, list: &InvertedList) -> Model {
        let documents = list.documents();
        self.sink.emit(Event::InvertedListLoaded { terms: list.num_terms(), documents: documents.len() });
        if documents.is_empty() {
            self.sink.emit(Event::NothingToIndex);
            return Model::default();
        }

        let weights = self.compute_weights(list, documents.len());
        self.sink.emit(Event::WeightsComputed { terms: weights.len() });

        // A document's norm depends on every term touching it, so this only
        // runs once the whole weight table exists.
        let norms = compute_norms(&weights, &documents);
        self.sink.emit(Event::NormsComputed { documents: norms.len() });

        Model::from_parts(weights, norms)
    }

    fn compute_weights(&self, list: &InvertedList, num_docs: usize) -> BTreeMap<String, BTreeMap<DocId, f64>> {
        let mut weights = BTreeMap::new();
        for (term, occurrences) in list.iter() {
            let mut freqs: BTreeMap<DocId, u32> = BTreeMap::new();
            for doc in occurrences {
                *freqs.entry(*doc).or_insert(0) += 1;
            }
            let idf = idf(num_docs, freqs.len());
            // Zero weights (idf == 0) are kept; they still belong to the document vector.
            let postings = freqs.into_iter().map(|(doc, freq)| (doc, tf(freq) * idf)).collect();
            weights.insert(term.to_string(), postings);
        }
        weights
    }
}

fn compute_norms(
    weights: &BTreeMap<String, BTreeMap<DocId, f64>>,
    documents: &BTreeSet<DocId>,
) -> BTreeMap<DocId, f64> {
    let mut sums: BTreeMap<DocId, f64> = documents.iter().map(|d| (*d, 0.0)).collect();
    for postings in weights.values() {
        for (doc, w) in postings {
            if let Some(sum) = sums.get_mut(doc) {
                *sum += w * w;
            }
        }
    }
    for sum in sums.values_mut() {
        *sum = sum.sqrt();
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn idf_is_zero_for_ubiquitous_terms() {
        assert_eq!(idf(4, 4), 0.0);
        assert!(close(idf(10, 1), 1.0));
    }

    #[test]
    fn tf_is_log_dampened() {
        assert_eq!(tf(1), 1.0);
        assert!(close(tf(10), 2.0));
        assert!(close(tf(2), 1.0 + 2f64.log10()));
    }

    #[test]
    fn norm_covers_every_term() {
        let mut list = InvertedList::new();
        list.insert("A", vec![1, 1, 1]).unwrap();
        list.insert("B", vec![1, 2]).unwrap();
        list.insert("C", vec![2, 3]).unwrap();
        let sink = MemorySink::new();
        let model = Indexer::new(&sink).build(&list);

        let wa = model.weight("A", 1);
        let wb = model.weight("B", 1);
        assert!(close(wa, (1.0 + 3f64.log10()) * 3f64.log10()));
        assert!(close(model.norm(1).unwrap(), (wa * wa + wb * wb).sqrt()));
    }

    #[test]
    fn empty_input_yields_empty_model() {
        let sink = MemorySink::new();
        let model = Indexer::new(&sink).build(&InvertedList::new());
        assert!(model.is_empty());
        assert!(sink.contains(&Event::NothingToIndex));
    }
}
