//! Session controller. Drives upload → index and query → answer.
//!
//! Phases: `NoKey` (terminal until restart) or `Idle → Indexing → Idle` and
//! `Idle → Querying → Idle`. Search is available once the store directory
//! exists. The session is held behind an async mutex in `AppState`, so
//! interactions run one at a time.

pub mod report;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::answer::{Answer, AnswerComposer};
use crate::credential::{ConfigError, Credential};
use crate::documents::{ChunkConfig, Chunker, DocumentLoader, UploadedFile};
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::errors::AppError;
use crate::store::{IndexEntry, SearchResult, VectorStore};

pub use report::{FileOutcome, FileReport, UploadReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NoKey,
    Idle,
    Indexing,
    Querying,
}

/// Collaborators shared by every session regardless of credential state.
pub struct SessionDeps {
    pub store_dir: PathBuf,
    pub chunking: ChunkConfig,
    pub top_k: usize,
    pub loader: Arc<dyn DocumentLoader>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

/// Snapshot used to render the page.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub store_ready: bool,
    pub entry_count: usize,
    pub masked_key: Option<String>,
    pub key_source: Option<&'static str>,
    pub config_error: Option<String>,
    pub embedding_model: String,
    pub top_k: usize,
}

/// Result of a successful query interaction.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub answer: Answer,
}

enum Access {
    Ready {
        composer: AnswerComposer,
        credential: Credential,
    },
    NoKey(String),
}

pub struct Session {
    phase: SessionPhase,
    access: Access,
    store_dir: PathBuf,
    store: Option<VectorStore>,
    chunker: Chunker,
    top_k: usize,
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Session {
    /// A session with a resolved credential. Opens the store if its directory
    /// already exists.
    pub fn ready(
        deps: SessionDeps,
        credential: Credential,
        composer: AnswerComposer,
    ) -> Result<Self, AppError> {
        let store = VectorStore::open_existing(&deps.store_dir)?;
        info!(
            "Session ready (key {} from {}, store {})",
            credential.masked(),
            credential.source().label(),
            if store.is_some() { "present" } else { "absent" }
        );
        Ok(Self::build(
            deps,
            SessionPhase::Idle,
            Access::Ready {
                composer,
                credential,
            },
            store,
        ))
    }

    /// A session that could not resolve its credential. Nothing is indexed or
    /// queried until the process is restarted with a key.
    pub fn no_key(deps: SessionDeps, error: ConfigError) -> Self {
        warn!("Session halted: {error}");
        Self::build(deps, SessionPhase::NoKey, Access::NoKey(error.to_string()), None)
    }

    fn build(
        deps: SessionDeps,
        phase: SessionPhase,
        access: Access,
        store: Option<VectorStore>,
    ) -> Self {
        Self {
            phase,
            access,
            store_dir: deps.store_dir,
            store,
            chunker: Chunker::new(deps.chunking),
            top_k: deps.top_k,
            loader: deps.loader,
            embedder: deps.embedder,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Search is offered only once the store directory exists.
    pub fn store_ready(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Option<&VectorStore> {
        self.store.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        let (masked_key, key_source, config_error) = match &self.access {
            Access::Ready { credential, .. } => (
                Some(credential.masked()),
                Some(credential.source().label()),
                None,
            ),
            Access::NoKey(message) => (None, None, Some(message.clone())),
        };
        SessionStatus {
            phase: self.phase,
            store_ready: self.store_ready(),
            entry_count: self.store.as_ref().map(VectorStore::len).unwrap_or(0),
            masked_key,
            key_source,
            config_error,
            embedding_model: self.embedder.model_id().to_string(),
            top_k: self.top_k,
        }
    }

    fn composer(&self) -> Result<&AnswerComposer, AppError> {
        match &self.access {
            Access::Ready { composer, .. } => Ok(composer),
            Access::NoKey(message) => Err(AppError::Configuration(message.clone())),
        }
    }

    /// Indexes every file in the batch, best-effort: a file that fails is
    /// reported and the rest of the batch continues.
    pub async fn handle_upload(&mut self, files: Vec<UploadedFile>) -> Result<UploadReport, AppError> {
        self.composer()?;
        if files.is_empty() {
            return Err(AppError::Validation("Select at least one PDF to upload.".to_string()));
        }

        self.transition(SessionPhase::Indexing);
        let mut report = UploadReport::default();
        for file in files {
            let outcome = match self.index_file(&file).await {
                Ok(outcome) => outcome,
                Err(reason) => {
                    warn!("Failed to index {}: {reason}", file.filename);
                    FileOutcome::Failed { reason }
                }
            };
            report.files.push(FileReport {
                filename: file.filename,
                outcome,
            });
        }
        self.transition(SessionPhase::Idle);

        info!(
            "Upload batch finished: {} indexed, {} failed, {} chunks",
            report.indexed_count(),
            report.failed_count(),
            report.total_chunks()
        );
        Ok(report)
    }

    async fn index_file(&mut self, file: &UploadedFile) -> Result<FileOutcome, String> {
        let pages = self.loader.load(file).await.map_err(|e| e.to_string())?;
        let chunks = self.chunker.split_pages(&pages);
        if chunks.is_empty() {
            return Err(format!("no extractable text in {}", file.filename));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_blocking(self.embedder.clone(), texts)
            .await
            .map_err(|e| e.to_string())?;
        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                got: vectors.len(),
            }
            .to_string());
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry::from_chunk(chunk, vector))
            .collect();

        if self.store.is_none() {
            self.store = Some(VectorStore::open(&self.store_dir).map_err(|e| e.to_string())?);
        }
        let added = match self.store.as_mut() {
            Some(store) => store.add(entries).map_err(|e| e.to_string())?,
            None => return Err("vector store is not open".to_string()),
        };

        Ok(FileOutcome::Indexed {
            pages: pages.len(),
            chunks: added,
        })
    }

    /// Retrieves the top-k chunks for `query` and asks the model to summarise
    /// matching candidates. The session stays usable whatever the outcome.
    pub async fn handle_query(&mut self, query: &str) -> Result<QueryOutcome, AppError> {
        let composer = self.composer()?.clone();
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("Enter one or more skills to search for.".to_string()));
        }
        if self.store.is_none() {
            return Err(AppError::StoreUnavailable);
        }

        self.transition(SessionPhase::Querying);
        let outcome = self.run_query(&composer, query).await;
        self.transition(SessionPhase::Idle);
        outcome
    }

    async fn run_query(&self, composer: &AnswerComposer, query: &str) -> Result<QueryOutcome, AppError> {
        let store = self.store.as_ref().ok_or(AppError::StoreUnavailable)?;

        let embedder = self.embedder.clone();
        let text = query.to_string();
        let query_vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| EmbeddingError::Model(format!("embedding task failed: {e}")))??;

        let results = store.search(&query_vector, self.top_k)?;
        info!("Query '{}' matched {} chunks", query, results.len());

        let answer = composer.compose(query, &results).await?;
        debug!(
            "Answer of {} chars from a {}-char prompt",
            answer.text.len(),
            answer.prompt.len()
        );
        Ok(QueryOutcome {
            query: query.to_string(),
            results,
            answer,
        })
    }

    /// Deletes every indexed entry. Search becomes unavailable until the next
    /// successful upload.
    pub fn clear_store(&mut self) -> Result<usize, AppError> {
        self.composer()?;
        let removed = match self.store.as_mut() {
            Some(store) => store.clear()?,
            None => return Ok(0),
        };
        self.store = None;
        Ok(removed)
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!("Session phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}

/// Runs the embedding model on the blocking pool.
async fn embed_blocking(
    embedder: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    tokio::task::spawn_blocking(move || embedder.embed_many(&texts))
        .await
        .map_err(|e| EmbeddingError::Model(format!("embedding task failed: {e}")))?
}
