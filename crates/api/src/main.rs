mod config;
mod session;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use extract::{ExtractError, GraphData, GraphExtractor};
use index::{ChunkerConfig, EmbeddingClient, QdrantBackend, RetrievalIndex, VectorBackend};
use llm::{LlmClient, LlmConfig, RateLimitStore};
use query::{ChatEngine, ChatOutcome};

use config::AppConfig;
use session::{Session, SessionCache, collection_name};

struct AppState {
    config: AppConfig,
    extractor: GraphExtractor,
    chat: ChatEngine,
    sessions: SessionCache<QdrantBackend>,
}

type ApiError = (StatusCode, String);

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    vector_store: String,
}

#[derive(Deserialize)]
struct UploadRequest {
    /// Plain text extracted from the document by the caller.
    text: String,
    doc_id: Option<String>,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    let api_key = std::env::var("MODEL_API_KEY").context("MODEL_API_KEY is not set")?;

    let llm = LlmClient::new(
        LlmConfig {
            endpoint: config.gateway.endpoint.clone(),
            api_key,
            timeout_secs: config.gateway.timeout_secs,
        },
        RateLimitStore::new(),
    );
    let extractor = GraphExtractor::new(llm.clone(), config.gateway.model.clone());
    let chat = ChatEngine::new(llm, config.gateway.model.clone())
        .with_top_k(config.retrieval.top_k);
    let sessions = SessionCache::new(config.sessions.max_sessions);

    let listen_addr = config.listen_addr.clone();
    let state = Arc::new(AppState {
        config,
        extractor,
        chat,
        sessions,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/documents", post(upload_document))
        .route("/graph", get(get_graph))
        .route("/reset", post(reset_session))
        .route("/chat", post(chat_turn))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(%listen_addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let vector_store = match reqwest::get(&state.config.retrieval.qdrant_url).await {
        Ok(resp) if resp.status().is_success() => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {e}"),
    };

    Json(HealthResponse {
        status: "online".to_string(),
        vector_store,
    })
}

fn session_for(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<Arc<Session<QdrantBackend>>, ApiError> {
    let session_id = headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "Missing X-Session-Id header".to_string(),
            )
        })?;

    let retrieval_config = &state.config.retrieval;
    Ok(state.sessions.get_or_create(session_id, || {
        let embeddings = EmbeddingClient::new(
            retrieval_config.embedding_url.clone(),
            retrieval_config.embedding_model.clone(),
        );
        let backend = QdrantBackend::new(
            retrieval_config.qdrant_url.clone(),
            collection_name(session_id),
            embeddings,
        );
        Session::new(RetrievalIndex::new(
            backend,
            ChunkerConfig {
                chunk_chars: retrieval_config.chunk_chars,
                overlap_chars: retrieval_config.overlap_chars,
            },
        ))
    }))
}

/// Ingest one document: index its chunks, extract its graph, and return
/// the graph so the caller can render immediately.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<UploadRequest>,
) -> Result<Json<GraphData>, ApiError> {
    if request.text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Could not extract any valid text from the document".to_string(),
        ));
    }

    let session = session_for(&state, &headers)?;
    let doc_id = request
        .doc_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    ingest_document(&state.extractor, &session, &request.text, &doc_id).await
}

/// Reset the index, index the new document, extract its graph, and swap
/// both into the session together. A failed extraction clears the session
/// graph and text: the index already holds the new document's chunks, and
/// the previous document's graph must not survive alongside them.
async fn ingest_document<B: VectorBackend>(
    extractor: &GraphExtractor,
    session: &Session<B>,
    text: &str,
    doc_id: &str,
) -> Result<Json<GraphData>, ApiError> {
    // Stale chunks from the previous document must not leak into answers.
    session.retrieval.reset().await.map_err(internal)?;
    let chunks = session
        .retrieval
        .index_document(text, doc_id)
        .await
        .map_err(internal)?;
    info!(doc_id, chunks, "document indexed");

    match extractor.extract(text).await {
        Ok(extraction) => {
            let mut session_state = session.state.lock().await;
            session_state.graph = extraction.graph;
            session_state.latest_text = text.to_string();
            Ok(Json(session_state.graph.graph_data()))
        }
        Err(e) => {
            error!(%e, "graph extraction failed");
            let mut session_state = session.state.lock().await;
            session_state.graph.clear();
            session_state.latest_text.clear();
            Err(match &e {
                ExtractError::Llm(llm_error) if llm_error.is_rate_limited() => {
                    (StatusCode::TOO_MANY_REQUESTS, e.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Graph extraction failed: {e}"),
                ),
            })
        }
    }
}

async fn get_graph(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<GraphData>, ApiError> {
    let session = session_for(&state, &headers)?;
    let session_state = session.state.lock().await;
    Ok(Json(session_state.graph.graph_data()))
}

async fn reset_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<GraphData>, ApiError> {
    let session = session_for(&state, &headers)?;

    if let Err(e) = session.retrieval.reset().await {
        // The next upload resets again; a failed drop is not fatal here.
        tracing::warn!(%e, "vector store reset failed");
    }

    let mut session_state = session.state.lock().await;
    session_state.graph.clear();
    session_state.latest_text.clear();
    Ok(Json(session_state.graph.graph_data()))
}

/// A chat turn always answers with 200; degraded responses are part of the
/// payload, never an HTTP error.
async fn chat_turn(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, ApiError> {
    let session = session_for(&state, &headers)?;
    let session_state = session.state.lock().await;

    let outcome = state
        .chat
        .answer(&request.message, &session_state.graph, &session.retrieval)
        .await;

    Ok(Json(outcome))
}

fn internal(e: anyhow::Error) -> ApiError {
    error!(%e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{KnowledgeGraph, Triple};
    use index::InMemoryBackend;
    use llm::{LlmConfig, RateLimitStore};

    fn failing_extractor() -> GraphExtractor {
        // Nothing listens on port 9; every extraction fails in transport.
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: "test-key".to_string(),
            timeout_secs: 1,
        };
        GraphExtractor::new(
            LlmClient::new(config, RateLimitStore::new()),
            "gpt-4o-mini",
        )
    }

    fn session_with_graph() -> Session<InMemoryBackend> {
        let session = Session::new(RetrievalIndex::new(
            InMemoryBackend::new(),
            ChunkerConfig::default(),
        ));
        let graph = KnowledgeGraph::assemble(&[Triple {
            source: "A".to_string(),
            target: "B".to_string(),
            relation: "r".to_string(),
        }]);
        session
            .state
            .try_lock()
            .map(|mut state| {
                state.graph = graph;
                state.latest_text = "first document".to_string();
            })
            .expect("fresh session lock");
        session
    }

    #[tokio::test]
    async fn failed_extraction_leaves_no_stale_graph() {
        let session = session_with_graph();

        let result =
            ingest_document(&failing_extractor(), &session, "second document", "doc-2").await;
        let (status, _) = result.err().expect("extraction failure propagates");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        // The previous document's graph and text are gone, not stale.
        let state = session.state.lock().await;
        assert!(state.graph.is_empty());
        assert!(state.latest_text.is_empty());

        // The new document's chunks are indexed; a later chat sees them
        // against an empty graph, never against document A's graph.
        let hits = session.retrieval.query("second document", 3).await.unwrap();
        assert_eq!(hits, vec!["second document".to_string()]);
    }

    #[tokio::test]
    async fn failed_reingest_replaces_old_chunks() {
        let session = session_with_graph();
        session
            .retrieval
            .index_document("first document", "doc-1")
            .await
            .unwrap();

        let result =
            ingest_document(&failing_extractor(), &session, "second document", "doc-2").await;
        assert!(result.is_err());

        let hits = session.retrieval.query("document", 10).await.unwrap();
        assert_eq!(hits, vec!["second document".to_string()]);
    }
}
