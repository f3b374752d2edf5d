use vsm::events::{Event, MemorySink};
use vsm::weighting::{idf, tf};
use vsm::{Indexer, InvertedList};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn cat_dog() -> InvertedList {
    let mut list = InvertedList::new();
    list.insert("cat", vec![1, 1, 2]).unwrap();
    list.insert("dog", vec![2]).unwrap();
    list
}

#[test]
fn cat_dog_scenario() {
    let sink = MemorySink::new();
    let model = Indexer::new(&sink).build(&cat_dog());

    assert_eq!(model.weight("cat", 1), 0.0);
    assert_eq!(model.weight("cat", 2), 0.0);
    assert!(close(model.weight("dog", 2), 2f64.log10()));
    assert!(close(model.norm(2).unwrap(), 2f64.log10()));
    assert_eq!(model.norm(1), Some(0.0));
    assert_eq!(model.num_documents(), 2);

    assert_eq!(
        sink.events(),
        vec![
            Event::InvertedListLoaded { terms: 2, documents: 2 },
            Event::WeightsComputed { terms: 2 },
            Event::NormsComputed { documents: 2 },
        ]
    );
}

#[test]
fn zero_weights_are_stored() {
    let model = Indexer::new(&MemorySink::new()).build(&cat_dog());
    let cat = model.postings("cat").unwrap();
    assert_eq!(cat.len(), 2);
}

#[test]
fn every_weight_matches_the_formula() {
    let mut list = InvertedList::new();
    list.insert("alpha", vec![1, 1, 1, 4]).unwrap();
    list.insert("beta", vec![2, 3, 3]).unwrap();
    list.insert("gamma", vec![1, 2, 3, 4]).unwrap();
    list.insert("delta", vec![4, 4, 4, 4, 4, 4, 4, 4, 4, 4]).unwrap();
    let model = Indexer::new(&MemorySink::new()).build(&list);
    let n = list.documents().len();
    assert_eq!(n, 4);

    for (term, occurrences) in list.iter() {
        let postings = model.postings(term).unwrap();
        let df = postings.len();
        assert!(df <= n);
        let term_idf = idf(n, df);
        assert_eq!(term_idf == 0.0, df == n);
        for (doc, w) in postings {
            let freq = occurrences.iter().filter(|d| *d == doc).count() as u32;
            assert!(freq >= 1);
            assert!(close(*w, tf(freq) * term_idf));
        }
    }
    assert!(close(model.weight("delta", 4), 2.0 * 4f64.log10()));
}

#[test]
fn norms_sum_over_all_terms() {
    let mut list = InvertedList::new();
    list.insert("a", vec![1, 2]).unwrap();
    list.insert("b", vec![1, 1, 3]).unwrap();
    list.insert("c", vec![1, 4]).unwrap();
    let model = Indexer::new(&MemorySink::new()).build(&list);

    for (doc, norm) in model.norms() {
        let expected: f64 = model
            .weights()
            .values()
            .filter_map(|p| p.get(doc))
            .map(|w| w * w)
            .sum::<f64>()
            .sqrt();
        assert!(close(*norm, expected), "doc {doc}");
    }
    assert!(model.norm(1).unwrap() > model.weight("a", 1));
}

#[test]
fn building_twice_is_bit_identical() {
    let mut list = InvertedList::new();
    for (i, term) in ["x", "y", "z", "w", "v"].iter().enumerate() {
        let docs: Vec<u32> = (1..=(i as u32 + 2)).chain(std::iter::repeat(1).take(i)).collect();
        list.insert(*term, docs).unwrap();
    }
    let sink = MemorySink::new();
    let a = Indexer::new(&sink).build(&list);
    let b = Indexer::new(&sink).build(&list);
    assert_eq!(bincode::serialize(&a).unwrap(), bincode::serialize(&b).unwrap());
}

#[test]
fn empty_list_warns_and_returns_empty_model() {
    let sink = MemorySink::new();
    let model = Indexer::new(&sink).build(&InvertedList::new());
    assert!(model.is_empty());
    assert_eq!(model.num_documents(), 0);
    assert!(sink.contains(&Event::NothingToIndex));
}
