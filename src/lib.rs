//! docrest - a generic REST facade over an embedded document search engine.
//!
//! Each [`DocumentResource`] exposes one index/type pair of the embedded
//! node as a JSON collection with list, get, create, update, delete, bulk
//! import and bulk delete routes. Documents are stored in a
//! [Tantivy](https://github.com/quickwit-oss/tantivy) index; which indices
//! and types exist is tracked in a [redb](https://github.com/cberner/redb)
//! catalog beside it.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use docrest::{AppContext, DocumentResource, NodeManager, ServerConfig, server};
//!
//! # async fn run() -> docrest::Result<()> {
//! let node = Arc::new(NodeManager::new("data"));
//! node.start()?;
//!
//! let app = server::build_router(
//!     AppContext::new(Arc::clone(&node)),
//!     vec![DocumentResource::new("lib", "book").with_id_path("isbn")],
//!     &ServerConfig::default(),
//! )?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod doc_id;
pub mod error;
pub mod node;
pub mod resource;
pub mod server;
pub mod service_index;
pub mod tantivy_index;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use node::{Client, NodeManager};
pub use resource::DocumentResource;
pub use server::{AppContext, ServerConfig};
pub use service_index::{Service, ServiceIndex};
pub use tantivy_index::DocumentStore;
