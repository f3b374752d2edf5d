use anyhow::{Context, Result};
use axum::{extract::{Query, State}, http::HeaderValue, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vsm::config::SearchConfig;
use vsm::events::EventSink;
use vsm::persist::{load_model, load_queries, save_results};
use vsm::tokenizer::normalize_query;
use vsm::{DocId, Model, Retriever};

/// Batch retrieval: ranks every query in the query-set file and writes the
/// ranked-result file. Returns how many queries produced a ranking.
pub fn run_batch(cfg: &SearchConfig, sink: &dyn EventSink) -> Result<usize> {
    tracing::info!(model = %cfg.model.display(), queries = %cfg.queries.display(), results = %cfg.results.display(), "searching");
    let model = load_model(&cfg.model).with_context(|| format!("loading model {}", cfg.model.display()))?;
    tracing::info!(terms = model.num_terms(), documents = model.num_documents(), "model loaded");
    let queries = load_queries(&cfg.queries).with_context(|| format!("loading queries {}", cfg.queries.display()))?;
    tracing::info!(queries = queries.len(), "queries loaded");

    let results = Retriever::new(&model).run(&queries, sink);
    if results.is_empty() {
        tracing::warn!("no results to write");
        return Ok(0);
    }
    save_results(&cfg.results, &results).with_context(|| format!("writing results {}", cfg.results.display()))?;
    tracing::info!(queries = results.len(), "results written");
    Ok(results.len())
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub doc_id: DocId,
    pub score: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<Model>,
}

pub fn build_app(model_path: &Path) -> Result<Router> {
    let model = load_model(model_path).with_context(|| format!("loading model {}", model_path.display()))?;
    tracing::info!(terms = model.num_terms(), documents = model.num_documents(), "model loaded");
    Ok(router(Arc::new(model)))
}

pub fn router(model: Arc<Model>) -> Router {
    // CORS_ALLOW_ORIGIN holds a comma-separated origin list; anything else allows all.
    let origins: Vec<HeaderValue> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .with_state(AppState { model })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    // Raw text from the wire goes through the same normalizer as the query files.
    let text = normalize_query(&params.q);
    let hits = Retriever::new(&state.model).rank(&text).unwrap_or_default();
    let total_hits = hits.len();
    let k = params.k.clamp(1, 100);
    let results = hits
        .into_iter()
        .take(k)
        .map(|h| SearchHit { rank: h.rank, doc_id: h.doc_id, score: h.score })
        .collect();

    let elapsed = start.elapsed();
    Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results })
}
