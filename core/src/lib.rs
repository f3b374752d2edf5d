//! Vector-space retrieval: TF-IDF model building and cosine ranking.

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod persist;
pub mod retrieval;
pub mod tokenizer;
pub mod weighting;

pub use error::{Error, Result};
pub use model::{DocId, InvertedList, Model, QueryId, QuerySet, RankedHit, RankedResults};
pub use retrieval::Retriever;
pub use weighting::Indexer;
