//! Lifecycle of the embedded search node and the client handle resources use
//! to talk to it.
//!
//! The node runs in-process: it opens the document store and the catalog
//! under the data directory and never listens on a network socket.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use serde_json::Value;

use crate::{
    catalog::Catalog,
    doc_id,
    error::{Error, Result},
    tantivy_index::{DocumentStore, SearchHits, SearchRequest, uid},
};

/// Cluster name every node of this service runs under.
pub const CLUSTER_NAME: &str = "example-cluster";

const CLUSTER_NAME_KEY: &str = "cluster_name";

/// Catalog database, relative to the data directory.
const CATALOG_FILE: &str = "catalog.redb";
/// Tantivy index directory, relative to the data directory.
const STORE_DIR: &str = "tantivy";

enum NodeState {
    Unstarted,
    Running(Client),
    Stopped,
}

impl NodeState {
    fn name(&self) -> &'static str {
        match self {
            NodeState::Unstarted => "unstarted",
            NodeState::Running(_) => "running",
            NodeState::Stopped => "stopped",
        }
    }
}

/// Owns one embedded search node: `unstarted -> running -> stopped`.
///
/// A node is started once and stopped once; it cannot be restarted.
pub struct NodeManager {
    data_dir: PathBuf,
    cluster_name: String,
    state: RwLock<NodeState>,
}

impl NodeManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cluster_name: CLUSTER_NAME.to_string(),
            state: RwLock::new(NodeState::Unstarted),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn start(&self) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Error::Poisoned)?;
        if !matches!(*state, NodeState::Unstarted) {
            return Err(Error::NodeState {
                expected: "unstarted",
                actual: state.name(),
            });
        }

        tracing::info!(
            "starting search node '{}' in data dir: {}",
            self.cluster_name,
            self.data_dir.display()
        );

        std::fs::create_dir_all(&self.data_dir)
            .map_err(|_| Error::DataDir(self.data_dir.clone()))?;
        let catalog = Catalog::open(&self.data_dir.join(CATALOG_FILE))?;
        match catalog.get_setting(CLUSTER_NAME_KEY)? {
            Some(existing) if existing != self.cluster_name => {
                tracing::warn!(
                    "data dir was written by cluster '{existing}', \
                     now running as '{}'",
                    self.cluster_name
                );
            }
            Some(_) => {}
            None => catalog.set_setting(CLUSTER_NAME_KEY, &self.cluster_name)?,
        }
        for index in catalog.list_indices()? {
            tracing::debug!(
                "found index '{index}' with types {:?}",
                catalog.list_types(&index)?
            );
        }
        let store = DocumentStore::open(&self.data_dir.join(STORE_DIR))?;

        *state = NodeState::Running(Client {
            engine: Arc::new(Engine { store, catalog }),
        });
        tracing::debug!("search node started");
        Ok(())
    }

    /// Commit pending writes and release the engine. Clients still held by
    /// callers must not be used afterwards.
    pub fn stop(&self) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Error::Poisoned)?;
        let client = match std::mem::replace(&mut *state, NodeState::Stopped) {
            NodeState::Running(client) => client,
            other => {
                let actual = other.name();
                *state = other;
                return Err(Error::NodeState {
                    expected: "running",
                    actual,
                });
            }
        };

        tracing::info!("stopping search node '{}'", self.cluster_name);
        client.engine.store.commit()
    }

    pub fn is_running(&self) -> bool {
        self.state
            .read()
            .map(|s| matches!(*s, NodeState::Running(_)))
            .unwrap_or(false)
    }

    /// The live client handle, or [`Error::NodeNotRunning`].
    pub fn client(&self) -> Result<Client> {
        let state = self.state.read().map_err(|_| Error::Poisoned)?;
        match &*state {
            NodeState::Running(client) => Ok(client.clone()),
            _ => Err(Error::NodeNotRunning),
        }
    }

    pub fn does_index_exist(&self, index: &str) -> Result<bool> {
        self.client()?.index_exists(index)
    }
}

impl std::fmt::Debug for NodeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self
            .state
            .read()
            .map(|s| s.name())
            .unwrap_or("poisoned");
        f.debug_struct("NodeManager")
            .field("data_dir", &self.data_dir)
            .field("cluster_name", &self.cluster_name)
            .field("state", &state)
            .finish()
    }
}

struct Engine {
    store: DocumentStore,
    catalog: Catalog,
}

/// Cheap-to-clone handle onto a running node. Every call blocks until the
/// engine has finished the operation.
#[derive(Clone)]
pub struct Client {
    engine: Arc<Engine>,
}

impl Client {
    /// Store `source` under `id`, or under a generated id when `id` is
    /// `None`. Creates the index and type on first use. Returns the id.
    pub fn index(
        &self,
        index: &str,
        doc_type: &str,
        id: Option<&str>,
        source: Value,
    ) -> Result<String> {
        let id = id.map_or_else(doc_id::generate, str::to_string);
        self.index_batch(index, doc_type, &[(id.clone(), source)])?;
        Ok(id)
    }

    /// Store many documents in one commit. The index and type are only
    /// registered once the documents are committed; an empty batch touches
    /// nothing.
    pub fn index_batch(
        &self,
        index: &str,
        doc_type: &str,
        docs: &[(String, Value)],
    ) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }
        self.engine.store.put_batch(index, doc_type, docs)?;
        self.ensure_type(index, doc_type)?;
        Ok(docs.len())
    }

    /// Realtime get of one document's stored JSON.
    pub fn get(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<Option<Value>> {
        match self.engine.store.get(index, doc_type, id)? {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(
                |source| Error::CorruptSource {
                    uid: uid(index, doc_type, id),
                    source,
                },
            ),
            None => Ok(None),
        }
    }

    pub fn delete(&self, index: &str, doc_type: &str, id: &str) -> Result<()> {
        self.engine
            .store
            .delete_batch(index, doc_type, &[id.to_string()])
    }

    /// Delete many documents in one commit.
    pub fn delete_batch(
        &self,
        index: &str,
        doc_type: &str,
        ids: &[String],
    ) -> Result<usize> {
        self.engine.store.delete_batch(index, doc_type, ids)?;
        Ok(ids.len())
    }

    pub fn search(&self, request: &SearchRequest<'_>) -> Result<SearchHits> {
        self.engine.store.search(request)
    }

    pub fn refresh(&self) -> Result<()> {
        self.engine.store.refresh()
    }

    pub fn index_exists(&self, index: &str) -> Result<bool> {
        self.engine.catalog.index_exists(index)
    }

    fn ensure_type(&self, index: &str, doc_type: &str) -> Result<()> {
        if self.engine.catalog.ensure_type(index, doc_type)? {
            tracing::info!("created index '{index}'");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
