//! The shared user document: one JSON object mapping every username to the
//! opaque JSON value that user uploaded.
//!
//! The file is the only state. Every operation loads it in full and every
//! mutation writes it back in full; nothing is cached between calls.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::{read_optional, write_atomic, StoreError, DEFAULT_IO_TIMEOUT};

/// In-memory copy of the document. Pure value type; persistence lives in
/// [`DocumentStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for `username`, or `{}` when there is none.
    pub fn get(&self, username: &str) -> Value {
        self.0
            .get(username)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Map `username` to `value`, replacing any previous record.
    pub fn set(mut self, username: &str, value: Value) -> Self {
        self.0.insert(username.to_string(), value);
        self
    }

    /// Drop the record for `username`; absent keys are a no-op. The other
    /// records keep their order.
    pub fn delete(mut self, username: &str) -> Self {
        self.0.shift_remove(username);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flat-file backing for [`Document`].
///
/// `load_all` and `persist` are the raw primitives. `read` and `update` go
/// through a whole-document gate, so within one process a load-mutate-persist
/// sequence never interleaves with another and no update is lost. Separate
/// processes sharing the same file are not coordinated.
pub struct DocumentStore {
    path: PathBuf,
    io_timeout: Duration,
    gate: Mutex<()>,
}

impl DocumentStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self::with_io_timeout(path, DEFAULT_IO_TIMEOUT)
    }

    pub fn with_io_timeout<P: Into<PathBuf>>(path: P, io_timeout: Duration) -> Self {
        Self { path: path.into(), io_timeout, gate: Mutex::new(()) }
    }

    /// Read the backing file. A missing file is first-run: an empty document
    /// is written out and returned. Anything other than a JSON object is
    /// reported as corrupt.
    pub async fn load_all(&self) -> Result<Document, StoreError> {
        let Some(bytes) = read_optional(&self.path, self.io_timeout).await? else {
            info!(path = %self.path.display(), "document file missing, initializing empty document");
            let empty = Document::new();
            self.persist(&empty).await?;
            return Ok(empty);
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(Document(map)),
            Ok(other) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                reason: format!("expected a JSON object, found {}", kind_of(&other)),
            }),
            Err(e) => Err(StoreError::Corrupt { path: self.path.clone(), reason: e.to_string() }),
        }
    }

    /// Serialize the full document and atomically replace the backing file.
    pub async fn persist(&self, document: &Document) -> Result<(), StoreError> {
        let data = serde_json::to_vec(document)?;
        write_atomic(&self.path, &data, self.io_timeout).await?;
        debug!(path = %self.path.display(), users = document.len(), bytes = data.len(), "document persisted");
        Ok(())
    }

    /// Load the current document under the gate.
    pub async fn read(&self) -> Result<Document, StoreError> {
        let _guard = self.gate.lock().await;
        self.load_all().await
    }

    /// Load, apply `f`, persist; the gate is held for the whole sequence.
    /// Returns the document as written.
    #[instrument(skip(self, f), fields(path = %self.path.display()))]
    pub async fn update<F>(&self, f: F) -> Result<Document, StoreError>
    where
        F: FnOnce(Document) -> Document,
    {
        let _guard = self.gate.lock().await;
        let document = f(self.load_all().await?);
        self.persist(&document).await?;
        Ok(document)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
