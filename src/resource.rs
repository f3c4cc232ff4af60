//! A generic REST resource over one index/type pair of the search node.
//!
//! Every [`DocumentResource`] exposes the same set of routes:
//!
//! | Method | Path                         | Operation                       |
//! |--------|------------------------------|---------------------------------|
//! | GET    | `{base}{index}/{type}`       | [`DocumentResource::search`]    |
//! | POST   | `{base}{index}/{type}`       | [`DocumentResource::create`]    |
//! | GET    | `{base}{index}/{type}/{id}`  | [`DocumentResource::get_one_by_id`] |
//! | PUT    | `{base}{index}/{type}/{id}`  | [`DocumentResource::update_one`] |
//! | DELETE | `{base}{index}/{type}/{id}`  | [`DocumentResource::delete_one`] |
//! | PUT    | `{base}{index}/{type}/_import` | [`DocumentResource::import_documents`] |
//! | DELETE | `{base}{index}/{type}/_deleteAll` | [`DocumentResource::delete_all`] |
//!
//! `_import` and `_deleteAll` only claim the method listed above; any other
//! id route method on them addresses the document with that id.
//!
//! The operations themselves are synchronous and take a [`Client`]; the HTTP
//! handlers run them on the blocking thread pool.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, put},
};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    doc_id::{self, ID_FIELD, IdPath},
    error::{Error, ImportFailure, Result},
    node::Client,
    server::{AppContext, JSON_UTF8, json_response},
    service_index::Service,
    tantivy_index::{SearchHits, SearchRequest},
};

/// Number of hits fetched by the first search of a listing.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

pub const DEFAULT_BASE_PATH: &str = "/api/";

const IMPORT_SEGMENT: &str = "_import";
const DELETE_ALL_SEGMENT: &str = "_deleteAll";

/// Bytes escaped when an id is written as one path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[derive(Debug, Clone)]
pub struct DocumentResource {
    index: String,
    doc_type: String,
    base_path: String,
    id_path: Option<IdPath>,
    not_found_status: StatusCode,
    page_size: usize,
}

impl DocumentResource {
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            id_path: None,
            not_found_status: StatusCode::NOT_FOUND,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Mount point of the resource, with a trailing slash (e.g. `/api/`).
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Derive document ids from their content instead of generating them.
    pub fn with_id_path(mut self, id_path: impl Into<String>) -> Self {
        self.id_path = Some(IdPath::new(id_path));
        self
    }

    pub fn with_not_found_status(mut self, status: StatusCode) -> Self {
        self.not_found_status = status;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn id_path(&self) -> Option<&IdPath> {
        self.id_path.as_ref()
    }

    pub fn not_found_status(&self) -> StatusCode {
        self.not_found_status
    }

    /// `{base}{index}/{type}`
    pub fn collection_path(&self) -> String {
        format!("{}{}/{}", self.base_path, self.index, self.doc_type)
    }

    /// `{base}{index}/{type}/{id}`, with the id percent-encoded.
    pub fn location(&self, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_path(),
            utf8_percent_encode(id, PATH_SEGMENT)
        )
    }

    // -- Operations --

    /// Every document of the index/type. A missing index is an empty list.
    pub fn list_all(&self, client: &Client) -> Result<Vec<Value>> {
        self.search(client, None)
    }

    /// Documents matching `query` (all documents when it is absent or blank).
    pub fn search(
        &self,
        client: &Client,
        query: Option<&str>,
    ) -> Result<Vec<Value>> {
        if !client.index_exists(&self.index)? {
            tracing::warn!("index {} does not exist.", self.index);
            return Ok(Vec::new());
        }
        tracing::trace!(
            "searching for all {} in index: {}.",
            self.doc_type,
            self.index
        );

        let response = self.fetch(client, query, true)?;
        response
            .hits
            .into_iter()
            .map(|hit| {
                let source = hit.source.unwrap_or_default();
                let document = self.parse_stored(&hit.id, &source)?;
                Ok(self.ensure_id(document, &hit.id))
            })
            .collect()
    }

    /// The stored document, or `None` when the index or the document is
    /// missing.
    pub fn get_one_by_id(
        &self,
        client: &Client,
        id: &str,
    ) -> Result<Option<Value>> {
        if !client.index_exists(&self.index)? {
            tracing::warn!("index {} does not exist.", self.index);
            return Ok(None);
        }
        tracing::trace!(
            "fetching one entry from index {} and type {} with id {id}",
            self.index,
            self.doc_type
        );
        Ok(client
            .get(&self.index, &self.doc_type, id)?
            .map(|document| self.ensure_id(document, id)))
    }

    /// Store a new document and refresh so that it is immediately listed.
    /// Returns the id it was stored under.
    pub fn create(&self, client: &Client, content: &str) -> Result<String> {
        tracing::trace!(
            "create document of type {} in index: {}.",
            self.doc_type,
            self.index
        );
        let document = parse_object(content)?;
        let id = match &self.id_path {
            Some(path) => Some(path.resolve(&document).ok_or_else(|| {
                Error::IdResolution {
                    id_path: path.to_string(),
                    object: document.to_string(),
                }
            })?),
            None => None,
        };

        let id =
            client.index(&self.index, &self.doc_type, id.as_deref(), document)?;
        tracing::trace!(
            "have created document of type {} in index: {}, got id: {id}",
            self.doc_type,
            self.index
        );
        client.refresh()?;
        Ok(id)
    }

    /// Overwrite (or create) the document at `id`.
    pub fn update_one(
        &self,
        client: &Client,
        id: &str,
        content: &str,
    ) -> Result<()> {
        tracing::trace!(
            "update one entry from index {} and type {} with id {id}",
            self.index,
            self.doc_type
        );
        let document = parse_object(content)?;
        client.index(&self.index, &self.doc_type, Some(id), document)?;
        Ok(())
    }

    /// Remove the document at `id` and refresh.
    pub fn delete_one(&self, client: &Client, id: &str) -> Result<()> {
        tracing::trace!(
            "delete one entry from index {} and type {} with id {id}",
            self.index,
            self.doc_type
        );
        client.delete(&self.index, &self.doc_type, id)?;
        client.refresh()
    }

    /// Delete every document of the index/type in one batch. Returns how
    /// many were deleted.
    pub fn delete_all(&self, client: &Client) -> Result<usize> {
        tracing::trace!(
            "delete all documents from index {} and type {}",
            self.index,
            self.doc_type
        );
        let ids: Vec<String> = self
            .fetch(client, None, false)?
            .hits
            .into_iter()
            .map(|hit| hit.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let count = client.delete_batch(&self.index, &self.doc_type, &ids)?;
        client.refresh()?;
        Ok(count)
    }

    /// Import a JSON array of objects, overwriting documents with the same
    /// id.
    ///
    /// Each object is stored under its `@id` field (removed before storage),
    /// else under the id found at the id path, else under a generated id.
    /// The payload is validated as a whole first: if any element is not an
    /// object or has no resolvable id, nothing is stored and every failure is
    /// reported in [`Error::ImportRejected`].
    pub fn import_documents(
        &self,
        client: &Client,
        content: &str,
    ) -> Result<usize> {
        let documents = self.prepare_import(content)?;
        let count =
            client.index_batch(&self.index, &self.doc_type, &documents)?;
        tracing::debug!(
            "imported {count} documents into {}/{}",
            self.index,
            self.doc_type
        );
        Ok(count)
    }

    fn prepare_import(&self, content: &str) -> Result<Vec<(String, Value)>> {
        let parsed: Value = serde_json::from_str(content).map_err(Error::Parse)?;
        let Value::Array(items) = parsed else {
            return Err(Error::Shape("json document is not an array".into()));
        };

        let mut documents = Vec::with_capacity(items.len());
        let mut failures = Vec::new();

        for (position, mut item) in items.into_iter().enumerate() {
            match self.import_id(&item) {
                Ok(id) => {
                    if let Value::Object(object) = &mut item {
                        object.remove(ID_FIELD);
                    }
                    documents.push((id, item));
                }
                Err(reason) => failures.push(ImportFailure {
                    position,
                    reason,
                    object: item.to_string(),
                }),
            }
        }

        if !failures.is_empty() {
            return Err(Error::ImportRejected { failures });
        }
        Ok(documents)
    }

    fn import_id(&self, item: &Value) -> std::result::Result<String, String> {
        if !item.is_object() {
            return Err("json child is not an object".to_string());
        }
        if let Some(explicit) = item.get(ID_FIELD) {
            return doc_id::scalar_to_id(explicit)
                .ok_or_else(|| format!("field {ID_FIELD} is not a usable id"));
        }
        match &self.id_path {
            Some(path) => path.resolve(item).ok_or_else(|| {
                format!("can not determine id (id path={path})")
            }),
            None => Ok(doc_id::generate()),
        }
    }

    /// Search with the page size, re-issuing once with the exact total when
    /// the first page did not hold every hit.
    fn fetch(
        &self,
        client: &Client,
        query: Option<&str>,
        fetch_source: bool,
    ) -> Result<SearchHits> {
        let mut request = SearchRequest {
            index: &self.index,
            doc_type: &self.doc_type,
            query,
            size: self.page_size,
            fetch_source,
        };
        let response = client.search(&request)?;
        if response.hits.len() >= response.total {
            return Ok(response);
        }

        request.size = response.total;
        client.search(&request)
    }

    fn parse_stored(&self, id: &str, source: &str) -> Result<Value> {
        serde_json::from_str(source).map_err(|source| Error::CorruptSource {
            uid: crate::tantivy_index::uid(&self.index, &self.doc_type, id),
            source,
        })
    }

    /// Without an id path the id is not part of the content, so it is added
    /// as `@id` for clients.
    fn ensure_id(&self, mut document: Value, id: &str) -> Value {
        if self.id_path.is_none()
            && let Value::Object(object) = &mut document
        {
            object.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        }
        document
    }

    // -- Routes --

    /// Build the routes of this resource and register its collection in the
    /// service directory.
    pub fn router<S>(self, ctx: AppContext) -> Result<Router<S>>
    where
        S: Clone + Send + Sync + 'static,
    {
        let collection = self.collection_path();
        ctx.services.add(Service::new(
            collection.clone(),
            format!("{} {}", self.index, self.doc_type),
        ))?;
        tracing::debug!("mounting {collection}");

        let state = ResourceState {
            ctx,
            resource: Arc::new(self),
        };

        Ok(Router::<ResourceState>::new()
            .route(&collection, get(list_handler).post(create_handler))
            .route(
                &format!("{collection}/{IMPORT_SEGMENT}"),
                put(import_handler)
                    .get(|State(state): State<ResourceState>| {
                        get_document(state, IMPORT_SEGMENT.to_string())
                    })
                    .delete(|State(state): State<ResourceState>| {
                        delete_document(state, IMPORT_SEGMENT.to_string())
                    }),
            )
            .route(
                &format!("{collection}/{DELETE_ALL_SEGMENT}"),
                delete(delete_all_handler)
                    .get(|State(state): State<ResourceState>| {
                        get_document(state, DELETE_ALL_SEGMENT.to_string())
                    })
                    .put(|State(state): State<ResourceState>, body: String| {
                        update_document(
                            state,
                            DELETE_ALL_SEGMENT.to_string(),
                            body,
                        )
                    }),
            )
            .route(
                &format!("{collection}/{{id}}"),
                get(get_handler).put(update_handler).delete(delete_handler),
            )
            .with_state(state))
    }
}

fn parse_object(content: &str) -> Result<Value> {
    let document: Value = serde_json::from_str(content).map_err(Error::Parse)?;
    if !document.is_object() {
        return Err(Error::Shape("json document is not an object".into()));
    }
    Ok(document)
}

#[derive(Clone)]
struct ResourceState {
    ctx: AppContext,
    resource: Arc<DocumentResource>,
}

impl ResourceState {
    /// Run `op` against the live client on the blocking thread pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DocumentResource, &Client) -> Result<T> + Send + 'static,
    {
        let client = self.ctx.node.client()?;
        let resource = Arc::clone(&self.resource);
        tokio::task::spawn_blocking(move || op(resource.as_ref(), &client))
            .await?
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    q: Option<String>,
}

async fn list_handler(
    State(state): State<ResourceState>,
    Query(params): Query<ListParams>,
) -> Result<Response> {
    let documents = state
        .run(move |resource, client| resource.search(client, params.q.as_deref()))
        .await?;
    Ok(json_response(StatusCode::OK, &Value::Array(documents)))
}

async fn get_handler(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<Response> {
    get_document(state, id).await
}

async fn get_document(state: ResourceState, id: String) -> Result<Response> {
    let not_found = state.resource.not_found_status();
    let document = state
        .run(move |resource, client| resource.get_one_by_id(client, &id))
        .await?;
    Ok(match document {
        Some(document) => json_response(StatusCode::OK, &document),
        None => (not_found, [(header::CONTENT_TYPE, JSON_UTF8)], "")
            .into_response(),
    })
}

async fn create_handler(
    State(state): State<ResourceState>,
    body: String,
) -> Result<Response> {
    let (id, document) = state
        .run(move |resource, client| {
            let id = resource.create(client, &body)?;
            let document = resource.get_one_by_id(client, &id)?;
            Ok((id, document))
        })
        .await?;

    let document = document.unwrap_or_else(|| json!({ ID_FIELD: id }));
    let mut response = json_response(StatusCode::CREATED, &document);
    match HeaderValue::from_str(&state.resource.location(&id)) {
        Ok(location) => {
            response.headers_mut().insert(header::LOCATION, location);
        }
        Err(e) => {
            tracing::warn!("no location header for document {id}: {e}");
        }
    }
    Ok(response)
}

async fn update_handler(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Response> {
    update_document(state, id, body).await
}

async fn update_document(
    state: ResourceState,
    id: String,
    body: String,
) -> Result<Response> {
    let reply = json!({ "result": "updated", "id": id });
    state
        .run(move |resource, client| resource.update_one(client, &id, &body))
        .await?;
    Ok(json_response(StatusCode::OK, &reply))
}

async fn delete_handler(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<Response> {
    delete_document(state, id).await
}

async fn delete_document(state: ResourceState, id: String) -> Result<Response> {
    let reply = json!({ "result": "deleted", "id": id });
    state
        .run(move |resource, client| resource.delete_one(client, &id))
        .await?;
    Ok(json_response(StatusCode::OK, &reply))
}

async fn delete_all_handler(
    State(state): State<ResourceState>,
) -> Result<Response> {
    let count = state
        .run(|resource, client| resource.delete_all(client))
        .await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "deleted": count,
            "message": format!("{count} documents deleted."),
        }),
    ))
}

async fn import_handler(
    State(state): State<ResourceState>,
    body: String,
) -> Result<Response> {
    let count = state
        .run(move |resource, client| resource.import_documents(client, &body))
        .await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "imported": count,
            "message": format!("{count} documents imported."),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::node::NodeManager;

    fn started() -> (tempfile::TempDir, NodeManager) {
        let tmp = tempfile::tempdir().unwrap();
        let node = NodeManager::new(tmp.path());
        node.start().unwrap();
        (tmp, node)
    }

    fn books() -> DocumentResource {
        DocumentResource::new("lib", "book")
    }

    #[test]
    fn paths() {
        let res = books();
        assert_eq!(res.collection_path(), "/api/lib/book");
        assert_eq!(res.location("42"), "/api/lib/book/42");
        assert_eq!(res.location("what?"), "/api/lib/book/what%3F");
        assert_eq!(res.location("a/b#c"), "/api/lib/book/a%2Fb%23c");
        assert_eq!(
            res.location("Stanisław Lem"),
            "/api/lib/book/Stanis%C5%82aw%20Lem"
        );

        let res = books().with_base_path("/v1/");
        assert_eq!(res.collection_path(), "/v1/lib/book");
    }

    #[test]
    fn list_all_on_missing_index_is_empty() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();

        assert!(books().list_all(&client).unwrap().is_empty());
        assert_eq!(books().get_one_by_id(&client, "x").unwrap(), None);
    }

    #[test]
    fn create_then_get_round_trips() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books();

        let input = json!({"title": "Dune", "year": 1965});
        let id = res.create(&client, &input.to_string()).unwrap();

        let mut expected = input.clone();
        expected["@id"] = json!(id);
        assert_eq!(res.get_one_by_id(&client, &id).unwrap(), Some(expected));

        // Visible to listings without any further refresh.
        let listed = res.list_all(&client).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["@id"], json!(id));
        assert_eq!(listed[0]["title"], json!("Dune"));
    }

    #[test]
    fn create_with_id_path_uses_content() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books().with_id_path("isbn");

        let id = res
            .create(&client, r#"{"isbn": "0441013597", "title": "Dune"}"#)
            .unwrap();
        assert_eq!(id, "0441013597");

        let stored = res.get_one_by_id(&client, &id).unwrap().unwrap();
        assert_eq!(stored, json!({"isbn": "0441013597", "title": "Dune"}));

        let listed = res.list_all(&client).unwrap();
        assert!(listed[0].get("@id").is_none());
    }

    #[test]
    fn create_with_unresolvable_id_path_fails() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books().with_id_path("isbn");

        let err = res.create(&client, r#"{"title": "Dune"}"#).unwrap_err();
        assert!(matches!(err, Error::IdResolution { .. }));
        assert!(!client.index_exists("lib").unwrap());
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();

        assert!(matches!(
            books().create(&client, "{not json"),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            books().update_one(&client, "a", "[1, 2]"),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn update_one_upserts() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books();

        res.update_one(&client, "dune", r#"{"v": 1}"#).unwrap();
        res.update_one(&client, "dune", r#"{"v": 2}"#).unwrap();

        assert_eq!(
            res.get_one_by_id(&client, "dune").unwrap(),
            Some(json!({"v": 2, "@id": "dune"}))
        );
    }

    #[test]
    fn delete_one_removes_from_listing() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books();

        let id = res.create(&client, r#"{"title": "Dune"}"#).unwrap();
        res.delete_one(&client, &id).unwrap();

        assert_eq!(res.get_one_by_id(&client, &id).unwrap(), None);
        assert!(res.list_all(&client).unwrap().is_empty());
    }

    #[test]
    fn import_strips_explicit_ids() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books();

        let count = res
            .import_documents(
                &client,
                r#"[{"@id":"a","x":1},{"@id":"b","x":2}]"#,
            )
            .unwrap();
        assert_eq!(count, 2);

        // The stored content no longer carries the id...
        let raw = client.get("lib", "book", "a").unwrap().unwrap();
        assert_eq!(raw, json!({"x": 1}));
        // ...which the resource adds back for clients.
        assert_eq!(
            res.get_one_by_id(&client, "b").unwrap(),
            Some(json!({"x": 2, "@id": "b"}))
        );
    }

    #[test]
    fn import_falls_back_to_id_path_then_generated() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();

        let with_path = DocumentResource::new("lib", "author").with_id_path("name");
        with_path
            .import_documents(&client, r#"[{"name":"herbert"},{"@id":"x","name":"le guin"}]"#)
            .unwrap();
        assert!(client.get("lib", "author", "herbert").unwrap().is_some());
        assert!(client.get("lib", "author", "x").unwrap().is_some());

        let generated = books();
        assert_eq!(
            generated
                .import_documents(&client, r#"[{"title":"a"},{"title":"b"}]"#)
                .unwrap(),
            2
        );
        client.refresh().unwrap();
        assert_eq!(generated.list_all(&client).unwrap().len(), 2);
    }

    #[test]
    fn empty_import_does_not_create_index() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();

        assert_eq!(books().import_documents(&client, "[]").unwrap(), 0);
        assert!(!client.index_exists("lib").unwrap());
        assert!(books().list_all(&client).unwrap().is_empty());
    }

    #[test]
    fn import_rejects_non_array() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();

        let err = books().import_documents(&client, r#"{"x":1}"#).unwrap_err();
        assert!(matches!(err, Error::Shape(_)));
        assert!(!client.index_exists("lib").unwrap());
    }

    #[test]
    fn import_reports_every_failure_and_stores_nothing() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books().with_id_path("isbn");

        let err = res
            .import_documents(
                &client,
                r#"[{"isbn":"1"}, 7, {"title":"no isbn"}, {"@id":{"a":1}}]"#,
            )
            .unwrap_err();

        let failures = match err {
            Error::ImportRejected { failures } => failures,
            other => panic!("expected ImportRejected, got {other:?}"),
        };
        let positions: Vec<usize> = failures.iter().map(|f| f.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(failures[0].object, "7");
        assert!(failures[1].reason.contains("isbn"));
        assert!(failures[1].object.contains("no isbn"));

        assert_eq!(client.get("lib", "book", "1").unwrap(), None);
    }

    #[test]
    fn delete_all_counts_and_empties() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books();
        let authors = DocumentResource::new("lib", "author");

        res.import_documents(&client, r#"[{"@id":"a"},{"@id":"b"},{"@id":"c"}]"#)
            .unwrap();
        authors
            .import_documents(&client, r#"[{"@id":"a"}]"#)
            .unwrap();
        client.refresh().unwrap();

        assert_eq!(res.delete_all(&client).unwrap(), 3);
        assert!(res.list_all(&client).unwrap().is_empty());
        assert_eq!(authors.list_all(&client).unwrap().len(), 1);

        assert_eq!(res.delete_all(&client).unwrap(), 0);
    }

    #[test]
    fn listing_beyond_one_page_reissues() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books().with_page_size(2);

        let body: Vec<Value> =
            (0..5).map(|i| json!({"@id": format!("d{i}")})).collect();
        res.import_documents(&client, &Value::Array(body).to_string())
            .unwrap();
        client.refresh().unwrap();

        assert_eq!(res.list_all(&client).unwrap().len(), 5);
        assert_eq!(res.delete_all(&client).unwrap(), 5);
    }

    #[test]
    fn search_filters_by_content() {
        let (_tmp, node) = started();
        let client = node.client().unwrap();
        let res = books();

        res.create(&client, r#"{"title": "Dune"}"#).unwrap();
        res.create(&client, r#"{"title": "Solaris"}"#).unwrap();

        let hits = res.search(&client, Some("solaris")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["title"], json!("Solaris"));

        assert_eq!(res.search(&client, Some("  ")).unwrap().len(), 2);
    }
}
