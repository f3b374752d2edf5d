use std::collections::{BTreeMap, BTreeSet};
use vsm::events::{Event, MemorySink};
use vsm::{DocId, Indexer, InvertedList, Model, QuerySet, Retriever};

fn cat_dog_model() -> Model {
    let mut list = InvertedList::new();
    list.insert("cat", vec![1, 1, 2]).unwrap();
    list.insert("dog", vec![2]).unwrap();
    Indexer::new(&MemorySink::new()).build(&list)
}

fn collection() -> (InvertedList, Model) {
    let mut list = InvertedList::new();
    list.insert("CYSTIC", vec![1, 2, 2, 5]).unwrap();
    list.insert("FIBROSIS", vec![1, 2, 5, 6]).unwrap();
    list.insert("LUNG", vec![3, 3, 3, 4]).unwrap();
    list.insert("SWEAT", vec![2, 4, 6, 6]).unwrap();
    list.insert("CHLORIDE", vec![4]).unwrap();
    list.insert("TEST", vec![1, 2, 3, 4, 5, 6]).unwrap();
    let model = Indexer::new(&MemorySink::new()).build(&list);
    (list, model)
}

#[test]
fn dog_query_ranks_document_two_only() {
    let model = cat_dog_model();
    let hits = Retriever::new(&model).rank("dog").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!((hits[0].rank, hits[0].doc_id), (1, 2));
    assert!((hits[0].score - 1.0).abs() < 1e-12);
}

#[test]
fn zero_norm_documents_are_excluded() {
    let model = cat_dog_model();
    let sink = MemorySink::new();
    let queries: QuerySet = [(7, "cat".to_string())].into_iter().collect();
    let results = Retriever::new(&model).run(&queries, &sink);

    let docs: Vec<DocId> = results[&7].iter().map(|h| h.doc_id).collect();
    assert_eq!(docs, vec![2]);
    assert_eq!(results[&7][0].score, 0.0);
    assert!(sink.contains(&Event::ZeroNormExcluded { query_id: 7, doc_id: 1 }));
}

#[test]
fn zero_norm_document_with_positive_score_is_excluded() {
    let weights: BTreeMap<String, BTreeMap<DocId, f64>> = [(
        "LUNG".to_string(),
        [(1, 1.0), (2, 0.5), (3, 2.0)].into_iter().collect(),
    )]
    .into_iter()
    .collect();
    let norms: BTreeMap<DocId, f64> = [(1, 0.0), (2, 1.0), (3, 4.0)].into_iter().collect();
    let model = Model::from_parts(weights, norms);

    let hits = Retriever::new(&model).rank("LUNG").unwrap();
    let docs: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
    assert_eq!(docs, vec![2, 3]);
    assert_eq!(hits.iter().map(|h| h.rank).collect::<Vec<_>>(), vec![1, 2]);
    assert!(hits.iter().all(|h| h.score.is_finite()));

    let sink = MemorySink::new();
    let queries: QuerySet = [(4, "LUNG".to_string())].into_iter().collect();
    let results = Retriever::new(&model).run(&queries, &sink);
    assert_eq!(results[&4], hits);
    assert!(sink.contains(&Event::ZeroNormExcluded { query_id: 4, doc_id: 1 }));
}

#[test]
fn unknown_terms_contribute_nothing() {
    let model = cat_dog_model();
    let hits = Retriever::new(&model).rank("platypus dog").unwrap();
    assert_eq!(hits.len(), 1);
    // query norm is sqrt(2) even though one term is unknown
    assert!((hits[0].score - 1.0 / 2f64.sqrt()).abs() < 1e-12);

    let none = Retriever::new(&model).rank("platypus").unwrap();
    assert!(none.is_empty());
}

#[test]
fn rankings_are_sorted_contiguous_and_complete() {
    let (list, model) = collection();
    let queries: QuerySet = [
        (1, "CYSTIC FIBROSIS".to_string()),
        (2, "SWEAT CHLORIDE TEST".to_string()),
        (3, "LUNG".to_string()),
        (4, "TEST TEST".to_string()),
    ]
    .into_iter()
    .collect();
    let results = Retriever::new(&model).run(&queries, &MemorySink::new());

    for (id, text) in &queries {
        let hits = &results[id];
        let expected: BTreeSet<DocId> = text
            .split_whitespace()
            .filter_map(|t| list.get(t))
            .flatten()
            .copied()
            .filter(|d| model.norm(*d).unwrap_or(0.0) > 0.0)
            .collect();
        let got: BTreeSet<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(got, expected, "query {id}");
        assert_eq!(hits.len(), expected.len());

        for (i, hit) in hits.iter().enumerate() {
            assert_eq!(hit.rank, i + 1);
        }
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                assert!(pair[0].doc_id < pair[1].doc_id);
            }
        }
    }
}

#[test]
fn cosine_matches_manual_computation() {
    let (_, model) = collection();
    let hits = Retriever::new(&model).rank("SWEAT CHLORIDE").unwrap();
    let q_norm = 2f64.sqrt();
    let manual: BTreeMap<DocId, f64> = hits
        .iter()
        .map(|h| {
            let dot = model.weight("SWEAT", h.doc_id) + model.weight("CHLORIDE", h.doc_id);
            (h.doc_id, dot / (model.norm(h.doc_id).unwrap() * q_norm))
        })
        .collect();
    for hit in &hits {
        assert!((hit.score - manual[&hit.doc_id]).abs() < 1e-12);
    }
    assert_eq!(hits[0].doc_id, 4);
}

#[test]
fn batch_output_is_keyed_by_query_and_skips_empty_text() {
    let model = cat_dog_model();
    let sink = MemorySink::new();
    let queries: QuerySet = [(3, "dog".to_string()), (1, "   ".to_string()), (2, "cat dog".to_string())]
        .into_iter()
        .collect();
    let results = Retriever::new(&model).run(&queries, &sink);

    assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
    assert!(sink.contains(&Event::EmptyQuery { query_id: 1 }));
    assert!(sink.contains(&Event::QueryRanked { query_id: 3, hits: 1 }));
}

#[test]
fn empty_query_set_is_a_warning() {
    let model = cat_dog_model();
    let sink = MemorySink::new();
    let results = Retriever::new(&model).run(&QuerySet::new(), &sink);
    assert!(results.is_empty());
    assert_eq!(sink.events(), vec![Event::NoQueries]);
}

#[test]
fn query_terms_are_not_renormalized() {
    let (_, model) = collection();
    assert!(Retriever::new(&model).rank("lung").unwrap().is_empty());
    assert!(!Retriever::new(&model).rank("LUNG").unwrap().is_empty());
}
