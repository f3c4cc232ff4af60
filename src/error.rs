use std::path::PathBuf;

use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

/// One rejected element of an import payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    /// Zero-based position of the element in the payload array.
    pub position: usize,
    pub reason: String,
    /// The offending element, serialized as compact JSON.
    pub object: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database open error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("search engine error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("invalid query: {0}")]
    Query(#[from] tantivy::query::QueryParserError),

    #[error("can not parse json content: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("{0}")]
    Shape(String),

    #[error("can not determine id (id path={id_path}) for {object}")]
    IdResolution { id_path: String, object: String },

    #[error("import rejected: {} invalid document(s)", failures.len())]
    ImportRejected { failures: Vec<ImportFailure> },

    #[error("stored document {uid} is not valid json: {source}")]
    CorruptSource {
        uid: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("search node is not running")]
    NodeNotRunning,

    #[error("search node is {actual}, expected {expected}")]
    NodeState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("lock poisoned")]
    Poisoned,

    #[error("blocking task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    /// Short machine-readable name used in error response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Parse(_) => "parse",
            Error::Shape(_) => "shape",
            Error::IdResolution { .. } => "id_resolution",
            Error::ImportRejected { .. } => "import_rejected",
            Error::Query(_) => "query",
            Error::NodeNotRunning | Error::NodeState { .. } => "node",
            Error::DataDir(_) => "config",
            _ => "engine",
        }
    }

    /// Whether the error was caused by the request payload rather than by
    /// the engine or the node.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Parse(_)
                | Error::Shape(_)
                | Error::IdResolution { .. }
                | Error::ImportRejected { .. }
                | Error::Query(_)
        )
    }
}
