//! Test doubles shared by the session and route tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::answer::AnswerComposer;
use crate::credential::{ConfigError, Credential};
use crate::documents::loader::ExtractionError;
use crate::documents::{ChunkConfig, DocumentLoader, Page, UploadedFile};
use crate::embedding::{PlaceholderEmbedder, DEFAULT_EMBEDDING_DIM};
use crate::llm_client::{CompletionService, LlmError};
use crate::session::{Session, SessionDeps};

/// Treats the upload as UTF-8 text with pages separated by form feeds.
/// Files whose content starts with `FAIL` fail to extract.
pub struct TextLoader;

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self, file: &UploadedFile) -> Result<Vec<Page>, ExtractionError> {
        let text = String::from_utf8_lossy(&file.bytes);
        if text.starts_with("FAIL") {
            return Err(ExtractionError::Parse {
                filename: file.filename.clone(),
                reason: "simulated parser failure".to_string(),
            });
        }
        Ok(text
            .split('\x0c')
            .enumerate()
            .map(|(i, page)| Page {
                text: page.to_string(),
                source: file.filename.clone(),
                number: (i + 1) as u32,
            })
            .collect())
    }
}

/// Returns queued results in order, then `"summary"` forever. Records prompts.
#[derive(Default)]
pub struct ScriptedCompletion {
    queued: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn with(results: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            queued: Mutex::new(results.into()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("summary".to_string()))
    }
}

pub fn auth_error() -> LlmError {
    LlmError::Api {
        status: 401,
        message: "Invalid API Key".to_string(),
    }
}

pub fn credential() -> Credential {
    Credential::resolve_from(Path::new("/nonexistent/secrets.toml"), Some("gsk_test_abcd".to_string()))
        .unwrap()
}

pub fn deps(store_dir: PathBuf) -> SessionDeps {
    SessionDeps {
        store_dir,
        chunking: ChunkConfig::default(),
        top_k: 5,
        loader: Arc::new(TextLoader),
        embedder: Arc::new(PlaceholderEmbedder::new(DEFAULT_EMBEDDING_DIM)),
    }
}

pub fn ready_session(store_dir: PathBuf, completion: Arc<ScriptedCompletion>) -> Session {
    Session::ready(deps(store_dir), credential(), AnswerComposer::new(completion)).unwrap()
}

pub fn no_key_session(store_dir: PathBuf) -> Session {
    Session::no_key(
        deps(store_dir),
        ConfigError::MissingCredential {
            secrets_path: PathBuf::from(".streamlit/secrets.toml"),
        },
    )
}

pub fn text_file(name: &str, text: &str) -> UploadedFile {
    UploadedFile {
        filename: name.to_string(),
        bytes: Bytes::from(text.to_string()),
    }
}

/// A 300-character single-page resume mentioning Python and Java.
pub fn python_java_resume() -> String {
    let mut text = String::from("Jane Doe. Backend engineer. Skills: Python, Java. ");
    while text.chars().count() < 300 {
        text.push('.');
    }
    text
}
