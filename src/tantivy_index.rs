use std::{
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use serde_json::Value as Json;
use tantivy::{
    DocAddress,
    Index,
    IndexReader,
    IndexWriter,
    ReloadPolicy,
    Searcher,
    TantivyDocument,
    Term,
    collector::{Count, TopDocs},
    doc,
    query::{BooleanQuery, Occur, Query, QueryParser, TermQuery},
    schema::*,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::error::{Error, Result};

/// Heap handed to the single index writer.
const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// Field names used in the schema.
pub mod fields {
    pub const UID: &str = "uid";
    pub const INDEX: &str = "index";
    pub const DOC_TYPE: &str = "doc_type";
    pub const ID: &str = "id";
    pub const SOURCE: &str = "source";
    pub const CONTENT: &str = "content";
    pub const SEQ: &str = "seq";
}

/// Resolved field handles for the schema.
#[derive(Clone, Copy)]
pub struct SchemaFields {
    pub uid: Field,
    pub index: Field,
    pub doc_type: Field,
    pub id: Field,
    pub source: Field,
    pub content: Field,
    pub seq: Field,
}

/// Parameters of a search scoped to one index/type pair.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub index: &'a str,
    pub doc_type: &'a str,
    /// Query string over document content; `None` matches everything.
    pub query: Option<&'a str>,
    pub size: usize,
    /// Load the stored JSON of each hit. Id-only searches skip it.
    pub fetch_source: bool,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub seq: u64,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    /// Exact number of matching documents, independent of `size`.
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

/// The embedded document store: every document of every index/type lives in
/// one Tantivy index, keyed by `index/type/id`.
///
/// Writes are committed before they return. Searches see them only after
/// [`DocumentStore::refresh`]; [`DocumentStore::get`] refreshes on its own.
pub struct DocumentStore {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: SchemaFields,
    last_seq: AtomicU64,
}

fn build_schema() -> (Schema, SchemaFields) {
    let mut builder = Schema::builder();

    let uid = builder.add_text_field(fields::UID, STRING);
    let index = builder.add_text_field(fields::INDEX, STRING | STORED);
    let doc_type = builder.add_text_field(fields::DOC_TYPE, STRING | STORED);
    let id = builder.add_text_field(fields::ID, STRING | STORED);
    let source = builder.add_text_field(fields::SOURCE, STORED);

    let content_opts = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("en_stem")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    let content = builder.add_text_field(fields::CONTENT, content_opts);

    let seq = builder.add_u64_field(fields::SEQ, STORED | FAST);

    let schema = builder.build();
    let fields = SchemaFields {
        uid,
        index,
        doc_type,
        id,
        source,
        content,
        seq,
    };

    (schema, fields)
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

/// The unique key of a document across all indices and types.
pub fn uid(index: &str, doc_type: &str, id: &str) -> String {
    format!("{index}/{doc_type}/{id}")
}

impl DocumentStore {
    /// Open or create a document store at the given directory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let (schema, fields) = build_schema();

        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        let index = if Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?
        {
            Index::open(mmap_dir)?
        } else {
            Index::create(mmap_dir, schema, tantivy::IndexSettings::default())?
        };

        Self::from_index(index, fields)
    }

    /// Create an in-memory document store (for testing).
    pub fn open_in_ram() -> Result<Self> {
        let (schema, fields) = build_schema();
        Self::from_index(Index::create_in_ram(schema), fields)
    }

    fn from_index(index: Index, fields: SchemaFields) -> Result<Self> {
        register_tokenizers(&index);
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer(WRITER_MEMORY_BUDGET)?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
            last_seq: AtomicU64::new(0),
        })
    }

    /// Store (or overwrite) a batch of documents under one index/type and
    /// commit them together. Nothing is committed if any add fails.
    pub fn put_batch(
        &self,
        index: &str,
        doc_type: &str,
        docs: &[(String, Json)],
    ) -> Result<()> {
        let f = self.fields;
        self.write(|writer| {
            for (id, source) in docs {
                let key = uid(index, doc_type, id);
                writer.delete_term(Term::from_field_text(f.uid, &key));
                writer.add_document(doc!(
                    f.uid => key.as_str(),
                    f.index => index,
                    f.doc_type => doc_type,
                    f.id => id.as_str(),
                    f.source => source.to_string(),
                    f.content => flatten_text(source),
                    f.seq => self.next_seq(),
                ))?;
            }
            Ok(())
        })
    }

    /// Delete a batch of documents by id and commit once.
    pub fn delete_batch(
        &self,
        index: &str,
        doc_type: &str,
        ids: &[String],
    ) -> Result<()> {
        let f = self.fields;
        self.write(|writer| {
            for id in ids {
                let key = uid(index, doc_type, id);
                writer.delete_term(Term::from_field_text(f.uid, &key));
            }
            Ok(())
        })
    }

    /// Commit anything still pending in the writer.
    pub fn commit(&self) -> Result<()> {
        self.write(|_| Ok(()))
    }

    /// Make every committed write visible to searches.
    pub fn refresh(&self) -> Result<()> {
        self.reader.reload()?;
        Ok(())
    }

    /// Realtime lookup of the stored JSON of one document.
    pub fn get(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<Option<String>> {
        let f = self.fields;
        self.refresh()?;
        let searcher = self.reader.searcher();

        let term = Term::from_field_text(f.uid, &uid(index, doc_type, id));
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;

        match top_docs.first() {
            Some((_, address)) => {
                let doc: TantivyDocument = searcher.doc(*address)?;
                Ok(Some(extract_text(&doc, f.source)))
            }
            None => Ok(None),
        }
    }

    /// Search the documents of one index/type.
    ///
    /// `total` is exact, so a caller whose page was too small can re-issue
    /// the request once with `size = total`. Unfiltered searches return hits
    /// in write order; query searches in score order.
    pub fn search(&self, req: &SearchRequest<'_>) -> Result<SearchHits> {
        let f = self.fields;
        let searcher = self.reader.searcher();

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![
            (Occur::Must, term_query(f.index, req.index)),
            (Occur::Must, term_query(f.doc_type, req.doc_type)),
        ];
        if let Some(query_str) = req.query.filter(|q| !q.trim().is_empty()) {
            let parser = QueryParser::for_index(&self.index, vec![f.content]);
            clauses.push((Occur::Must, parser.parse_query(query_str)?));
        }
        let query = BooleanQuery::new(clauses);

        // TopDocs rejects a zero limit; the count is what matters then.
        let collector = (TopDocs::with_limit(req.size.max(1)), Count);
        let (top_docs, total) = searcher.search(&query, &collector)?;

        let mut hits = Vec::with_capacity(top_docs.len().min(req.size));
        for (score, address) in top_docs.into_iter().take(req.size) {
            hits.push(self.load_hit(&searcher, score, address, req)?);
        }

        if req.query.is_none_or(|q| q.trim().is_empty()) {
            hits.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.id.cmp(&b.id)));
        }

        Ok(SearchHits { total, hits })
    }

    fn load_hit(
        &self,
        searcher: &Searcher,
        score: f32,
        address: DocAddress,
        req: &SearchRequest<'_>,
    ) -> Result<SearchHit> {
        let f = self.fields;
        let doc: TantivyDocument = searcher.doc(address)?;
        Ok(SearchHit {
            id: extract_text(&doc, f.id),
            score,
            seq: extract_u64(&doc, f.seq),
            source: req.fetch_source.then(|| extract_text(&doc, f.source)),
        })
    }

    fn write<F>(&self, ops: F) -> Result<()>
    where
        F: FnOnce(&mut IndexWriter) -> Result<()>,
    {
        let mut writer = self.writer.lock().map_err(|_| Error::Poisoned)?;
        if let Err(e) = ops(&mut writer) {
            if let Err(rollback) = writer.rollback() {
                tracing::error!("rollback after failed write failed: {rollback}");
            }
            return Err(e);
        }
        writer.commit()?;
        Ok(())
    }

    /// Strictly increasing write sequence, seeded from the wall clock so that
    /// order also holds across restarts.
    fn next_seq(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        let mut last = self.last_seq.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_seq.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}

fn term_query(field: Field, text: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, text),
        IndexRecordOption::Basic,
    ))
}

/// Concatenate every scalar value of a JSON document into one searchable
/// string. Keys are not indexed.
fn flatten_text(value: &Json) -> String {
    fn walk(value: &Json, out: &mut Vec<String>) {
        match value {
            Json::String(s) => out.push(s.clone()),
            Json::Number(n) => out.push(n.to_string()),
            Json::Bool(b) => out.push(b.to_string()),
            Json::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Json::Object(map) => map.values().for_each(|v| walk(v, out)),
            Json::Null => {}
        }
    }

    let mut parts = Vec::new();
    walk(value, &mut parts);
    parts.join(" ")
}

fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn extract_u64(doc: &TantivyDocument, field: Field) -> u64 {
    doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0)
}
