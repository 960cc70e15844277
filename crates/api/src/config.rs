use serde::{Deserialize, Serialize};

use llm::{DEFAULT_ENDPOINT, DEFAULT_MODEL, REQUEST_TIMEOUT_SECS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub listen_addr: String,
    pub gateway: GatewayConfig,
    pub retrieval: RetrievalConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub qdrant_url: String,
    pub embedding_url: String,
    pub embedding_model: String,
    pub chunk_chars: usize,
    pub overlap_chars: usize,
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_sessions: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            gateway: GatewayConfig {
                endpoint: DEFAULT_ENDPOINT.to_string(),
                model: DEFAULT_MODEL.to_string(),
                timeout_secs: REQUEST_TIMEOUT_SECS,
            },
            retrieval: RetrievalConfig {
                qdrant_url: "http://localhost:6333".to_string(),
                embedding_url: "http://localhost:11434".to_string(),
                embedding_model: "nomic-embed-text".to_string(),
                chunk_chars: 1000,
                overlap_chars: 200,
                top_k: 3,
            },
            sessions: SessionConfig { max_sessions: 256 },
        }
    }
}

impl AppConfig {
    /// Defaults with environment overrides for anything deployment-specific.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(endpoint) = std::env::var("MODEL_ENDPOINT") {
            config.gateway.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("MODEL_NAME") {
            config.gateway.model = model;
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.retrieval.qdrant_url = url;
        }
        if let Ok(url) = std::env::var("EMBEDDING_URL") {
            config.retrieval.embedding_url = url;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.retrieval.embedding_model = model;
        }
        if let Ok(max) = std::env::var("MAX_SESSIONS") {
            if let Ok(max) = max.parse() {
                config.sessions.max_sessions = max;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_core_contracts() {
        let config = AppConfig::default();
        assert_eq!(config.gateway.timeout_secs, 180);
        assert_eq!(config.gateway.model, "gpt-4o-mini");
        assert_eq!(config.retrieval.chunk_chars, 1000);
        assert_eq!(config.retrieval.overlap_chars, 200);
        assert_eq!(config.retrieval.top_k, 3);
        assert!(config.sessions.max_sessions > 0);
    }
}
