use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use spamdex::persist::{load_index, IndexPaths, MetaFile};
use spamdex::tokenizer::tokenize;
use spamdex::{search, Category, DocId, IndexSnapshot, Label, NaiveBayes};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

const SNIPPET_CHARS: usize = 200;

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
    pub keywords: Vec<String>,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub label: String,
    pub spam: bool,
    pub content: String,
    pub snippet: String,
}

#[derive(Deserialize)]
pub struct ClassifyParams {
    pub text: String,
}

#[derive(Serialize)]
pub struct ClassifyResponse {
    pub category: Category,
    pub label: String,
    /// Per-category log posterior. `None` (JSON `null`) where the score is
    /// `-inf`, which happens for a category no training message carried.
    pub log_scores: Vec<Option<f64>>,
}

/// Everything is read-only after startup, so handlers share it without locks.
#[derive(Clone)]
pub struct AppState {
    pub snapshot: Arc<IndexSnapshot>,
    pub model: Arc<NaiveBayes>,
    pub meta: Arc<MetaFile>,
}

pub fn build_app(index_dir: String) -> Result<Router> {
    let (snapshot, model, meta) = load_index(&IndexPaths::new(&index_dir))?;
    tracing::info!(index_dir, num_docs = snapshot.num_docs(), num_keywords = snapshot.vocabulary.len(), "index loaded");
    let app_state = AppState { snapshot: Arc::new(snapshot), model: Arc::new(model), meta: Arc::new(meta) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(stats_handler))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/classify", get(classify_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let keywords = tokenize(&params.q);
    let hits = search(&state.snapshot, keywords.as_slice());
    let total_hits = hits.len();
    let k = params.k.max(1).min(100);

    // Highlight the words as typed; stems would miss inflected forms.
    let raw_terms: Vec<String> = params
        .q
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    let results = hits
        .into_iter()
        .take(k)
        .filter_map(|hit| {
            let doc = state.snapshot.document(hit.document_id)?;
            Some(SearchHit {
                doc_id: hit.document_id,
                score: hit.score,
                title: doc.title.clone(),
                label: doc.label().to_string(),
                spam: doc.label().is_spam(),
                content: doc.content.clone(),
                snippet: snippet(&doc.content, &raw_terms),
            })
        })
        .collect();

    let elapsed = start.elapsed();
    Json(SearchResponse { query: params.q, keywords, took_s: elapsed.as_secs_f64(), total_hits, results })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let doc = state.snapshot.document(doc_id).ok_or((StatusCode::NOT_FOUND, format!("no document {doc_id}")))?;
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "title": doc.title,
        "label": doc.label().to_string(),
        "category": doc.label().category(),
        "content": doc.content,
        "tokens": doc.tokens,
    })))
}

pub async fn classify_handler(State(state): State<AppState>, Query(params): Query<ClassifyParams>) -> Json<ClassifyResponse> {
    let tokens = tokenize(&params.text);
    let category = state.model.predict(tokens.as_slice());
    Json(ClassifyResponse {
        category,
        label: Label::Category(category).to_string(),
        log_scores: state
            .model
            .log_scores(tokens.as_slice())
            .into_iter()
            .map(|score| score.is_finite().then_some(score))
            .collect(),
    })
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let meta = &state.meta;
    Json(serde_json::json!({
        "num_docs": meta.num_docs,
        "num_keywords": meta.num_keywords,
        "created_at": meta.created_at,
        "version": meta.version,
        "accuracy": meta.evaluation.as_ref().and_then(|m| m.accuracy()),
        "confusion_matrix": meta.evaluation.as_ref().map(|m| &m.counts),
    }))
}

/// Window of the message around the first term found, with every term wrapped in `<em>`.
fn snippet(text: &str, raw_terms: &[String]) -> String {
    let first_idx = raw_terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .find_map(|t| find_case_insensitive(text, t));
    let window = match first_idx {
        Some(idx) => {
            let start = floor_boundary(text, idx.saturating_sub(SNIPPET_CHARS / 2));
            let end = floor_boundary(text, (idx + SNIPPET_CHARS).min(text.len()));
            &text[start..end]
        }
        None => &text[..floor_boundary(text, SNIPPET_CHARS.min(text.len()))],
    };
    highlight_terms(window, raw_terms)
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn case_insensitive(term: &str) -> Option<regex::Regex> {
    regex::RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build().ok()
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    case_insensitive(needle)?.find(haystack).map(|m| m.start())
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for t in terms {
        if t.trim().is_empty() { continue; }
        let Some(pat) = case_insensitive(t) else { continue };
        s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classify_reports_unreachable_category_as_null() {
        let spam: Vec<String> = tokenize("win cash prize");
        let ham: Vec<String> = tokenize("see you at lunch");
        // category 2 has no training messages, so its prior is zero
        let model = NaiveBayes::train(&[(spam.as_slice(), 1), (ham.as_slice(), 0)], 3).unwrap();
        let state = AppState {
            snapshot: Arc::new(IndexSnapshot::default()),
            model: Arc::new(model),
            meta: Arc::new(MetaFile {
                num_docs: 0,
                num_keywords: 0,
                created_at: String::new(),
                version: spamdex::persist::FORMAT_VERSION,
                evaluation: None,
            }),
        };
        let Json(resp) = classify_handler(State(state), Query(ClassifyParams { text: "free cash".into() })).await;
        assert_eq!(resp.category, 1);
        assert_eq!(resp.log_scores.len(), 3);
        assert!(resp.log_scores[0].is_some_and(f64::is_finite));
        assert!(resp.log_scores[1].is_some_and(f64::is_finite));
        assert_eq!(resp.log_scores[2], None);
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["log_scores"][2].is_null());
    }

    #[test]
    fn snippet_highlights_case_insensitively() {
        let s = snippet("Claim your FREE prize now", &["free".to_string()]);
        assert_eq!(s, "Claim your <em>FREE</em> prize now");
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = "é".repeat(300);
        let s = snippet(&text, &["zzz".to_string()]);
        assert!(s.chars().all(|c| c == 'é'));
        assert!(s.len() <= SNIPPET_CHARS);
    }
}
