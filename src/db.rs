// Financials API - Document Store
// A single SQLite connection holding schemaless JSON documents, one logical
// collection per record kind.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// Field carrying the store-assigned identifier of every document
pub const ID_FIELD: &str = "_id";

/// Connection string selecting a throwaway in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// A stored document: a JSON object
pub type Document = Map<String, Value>;

// ============================================================================
// COLLECTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tasks,
    Revenues,
    Expenses,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Revenues => "revenues",
            Collection::Expenses => "expenses",
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("couldn't serialize document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid document id {0:?}")]
    InvalidId(String),
    #[error("cast to schema type failed for field {field:?}: {value}")]
    Cast { field: String, value: String },
    #[error("unsupported filter value for field {0:?}")]
    UnsupportedFilter(String),
    #[error("corrupted document {0}")]
    CorruptedDocument(String),
    #[error("store connection lock poisoned")]
    LockPoisoned,
    #[error("storage task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// QUERIES
// ============================================================================

/// Equality conditions on top-level fields, all of which must hold.
/// An empty filter matches every document of the collection.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }
}

/// Descending order on one top-level field. Documents missing the field come
/// last; ties go to the most recently inserted document.
#[derive(Debug, Clone)]
pub struct Sort {
    field: String,
}

impl Sort {
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

fn filter_param(field: &str, value: &Value) -> StoreResult<Option<SqlValue>> {
    // json_extract() yields SQL scalars: booleans come back as 0/1
    let param = match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlValue::Integer(i)),
            None => Some(SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => {
            return Err(StoreError::UnsupportedFilter(field.to_string()))
        }
    };
    Ok(param)
}

fn parse_id(id: &str) -> StoreResult<String> {
    Uuid::parse_str(id)
        .map(|uuid| uuid.to_string())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}

fn parse_body(id: &str, body: &str) -> StoreResult<Document> {
    match serde_json::from_str(body)? {
        Value::Object(doc) => Ok(doc),
        _ => Err(StoreError::CorruptedDocument(id.to_string())),
    }
}

fn with_id(id: String, mut doc: Document) -> Document {
    doc.insert(ID_FIELD.to_string(), Value::String(id));
    doc
}

// ============================================================================
// STORE INTERFACE
// ============================================================================

/// Storage backend behind every resource handler
pub trait DocumentStore: Send + Sync {
    /// Store `doc` under a freshly assigned id and return it with `_id` set
    fn insert(&self, collection: Collection, doc: Document) -> StoreResult<Document>;

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> StoreResult<Vec<Document>>;

    /// Overwrite the fields present in `patch`, nulls included; returns the
    /// updated document, or `None` when nothing has this id. Never creates a
    /// document.
    fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> StoreResult<Option<Document>>;

    /// Remove and return the document with this id, `None` when absent
    fn delete_by_id(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>>;
}

// ============================================================================
// SQLITE BACKEND
// ============================================================================

pub struct SqliteStore {
    conn: Mutex<Connection>,
    name: String,
}

impl SqliteStore {
    /// Open the database named by a connection string: a file path, or
    /// `:memory:`
    pub fn connect(url: &str) -> StoreResult<Self> {
        if url == IN_MEMORY {
            Self::open_in_memory()
        } else {
            Self::open(url)
        }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        // Enable WAL mode for crash recovery
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("financials")
            .to_string();

        Self::init(conn, name)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, "memory".to_string())
    }

    fn init(conn: Connection, name: String) -> StoreResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                UNIQUE (collection, id)
            );
            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            name,
        })
    }

    /// Name of the active database
    pub fn database_name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl DocumentStore for SqliteStore {
    fn insert(&self, collection: Collection, mut doc: Document) -> StoreResult<Document> {
        doc.remove(ID_FIELD);
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(&doc)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
            params![collection.name(), id, body],
        )?;

        Ok(with_id(id, doc))
    }

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> StoreResult<Vec<Document>> {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?1");
        let mut values = vec![SqlValue::Text(collection.name().to_string())];

        for (field, value) in &filter.conditions {
            values.push(SqlValue::Text(json_path(field)));
            let path_idx = values.len();
            match filter_param(field, value)? {
                // Missing fields match null, as in a document database
                None => sql.push_str(&format!(" AND json_extract(body, ?{path_idx}) IS NULL")),
                Some(param) => {
                    values.push(param);
                    let value_idx = values.len();
                    sql.push_str(&format!(
                        " AND json_extract(body, ?{path_idx}) = ?{value_idx}"
                    ));
                }
            }
        }

        match sort {
            Some(sort) => {
                values.push(SqlValue::Text(json_path(&sort.field)));
                let idx = values.len();
                sql.push_str(&format!(
                    " ORDER BY json_extract(body, ?{idx}) IS NULL, json_extract(body, ?{idx}) DESC, seq DESC"
                ));
            }
            None => sql.push_str(" ORDER BY seq"),
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, body)| parse_body(&id, &body).map(|doc| with_id(id, doc)))
            .collect()
    }

    fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        mut patch: Document,
    ) -> StoreResult<Option<Document>> {
        let id = parse_id(id)?;
        patch.remove(ID_FIELD);

        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection.name(), id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(body) = body else {
            return Ok(None);
        };

        let mut doc = parse_body(&id, &body)?;
        doc.extend(patch);

        conn.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND id = ?2",
            params![collection.name(), id, serde_json::to_string(&doc)?],
        )?;

        Ok(Some(with_id(id, doc)))
    }

    fn delete_by_id(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let id = parse_id(id)?;

        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2 RETURNING body",
                params![collection.name(), id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| parse_body(&id, &body).map(|doc| with_id(id, doc)))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn id_of(doc: &Document) -> String {
        doc[ID_FIELD].as_str().unwrap().to_string()
    }

    #[test]
    fn test_insert_assigns_unique_ids() {
        let store = SqliteStore::open_in_memory().unwrap();

        let a = store
            .insert(Collection::Tasks, doc(json!({"person": "ana", "text": "pay rent"})))
            .unwrap();
        let b = store
            .insert(Collection::Tasks, doc(json!({"person": "ana", "text": "file taxes"})))
            .unwrap();

        assert_ne!(id_of(&a), id_of(&b));
        assert!(Uuid::parse_str(&id_of(&a)).is_ok());
        assert_eq!(a["text"], "pay rent");
    }

    #[test]
    fn test_insert_ignores_client_id() {
        let store = SqliteStore::open_in_memory().unwrap();

        let saved = store
            .insert(Collection::Revenues, doc(json!({"_id": "mine", "amount": 10})))
            .unwrap();

        assert_ne!(id_of(&saved), "mine");
    }

    #[test]
    fn test_find_filters_by_field() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(Collection::Tasks, doc(json!({"person": "ana", "completed": false})))
            .unwrap();
        store
            .insert(Collection::Tasks, doc(json!({"person": "luis", "completed": true})))
            .unwrap();
        store
            .insert(Collection::Tasks, doc(json!({"person": "ana", "completed": true})))
            .unwrap();

        let ana = store
            .find(Collection::Tasks, &Filter::eq("person", "ana"), None)
            .unwrap();
        assert_eq!(ana.len(), 2);
        assert!(ana.iter().all(|d| d["person"] == "ana"));

        let done = store
            .find(
                Collection::Tasks,
                &Filter::eq("person", "ana").and("completed", true),
                None,
            )
            .unwrap();
        assert_eq!(done.len(), 1);

        let nobody = store
            .find(Collection::Tasks, &Filter::eq("person", "maria"), None)
            .unwrap();
        assert!(nobody.is_empty());
    }

    #[test]
    fn test_find_sorts_descending_with_missing_last() {
        let store = SqliteStore::open_in_memory().unwrap();
        for created in [
            Some("2024-02-01T00:00:00.000Z"),
            None,
            Some("2024-03-01T00:00:00.000Z"),
            Some("2024-01-01T00:00:00.000Z"),
        ] {
            let mut d = doc(json!({"amount": 1}));
            if let Some(created) = created {
                d.insert("createdAt".to_string(), json!(created));
            }
            store.insert(Collection::Expenses, d).unwrap();
        }

        let found = store
            .find(
                Collection::Expenses,
                &Filter::all(),
                Some(&Sort::descending("createdAt")),
            )
            .unwrap();

        let order: Vec<Option<&str>> = found.iter().map(|d| d.get("createdAt").and_then(Value::as_str)).collect();
        assert_eq!(
            order,
            vec![
                Some("2024-03-01T00:00:00.000Z"),
                Some("2024-02-01T00:00:00.000Z"),
                Some("2024-01-01T00:00:00.000Z"),
                None,
            ]
        );
    }

    #[test]
    fn test_collections_are_independent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let revenue = store
            .insert(Collection::Revenues, doc(json!({"amount": 5})))
            .unwrap();

        assert!(store
            .find(Collection::Expenses, &Filter::all(), None)
            .unwrap()
            .is_empty());
        assert!(store
            .delete_by_id(Collection::Expenses, &id_of(&revenue))
            .unwrap()
            .is_none());
        assert_eq!(store.find(Collection::Revenues, &Filter::all(), None).unwrap().len(), 1);
    }

    #[test]
    fn test_update_merges_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        let task = store
            .insert(
                Collection::Tasks,
                doc(json!({"person": "ana", "text": "call bank", "completed": false})),
            )
            .unwrap();

        let updated = store
            .update_by_id(Collection::Tasks, &id_of(&task), doc(json!({"completed": true})))
            .unwrap()
            .unwrap();

        assert_eq!(updated["completed"], true);
        assert_eq!(updated["text"], "call bank");
        assert_eq!(id_of(&updated), id_of(&task));

        let stored = store.find(Collection::Tasks, &Filter::all(), None).unwrap();
        assert_eq!(stored, vec![updated]);
    }

    #[test]
    fn test_update_stores_explicit_null() {
        let store = SqliteStore::open_in_memory().unwrap();
        let task = store
            .insert(Collection::Tasks, doc(json!({"person": "ana", "completed": true})))
            .unwrap();

        let updated = store
            .update_by_id(Collection::Tasks, &id_of(&task), doc(json!({"completed": null})))
            .unwrap()
            .unwrap();

        assert_eq!(updated["completed"], Value::Null);
        assert_eq!(updated["person"], "ana");
    }

    #[test]
    fn test_update_missing_id_creates_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let missing = Uuid::new_v4().to_string();

        let result = store
            .update_by_id(Collection::Tasks, &missing, doc(json!({"completed": true})))
            .unwrap();

        assert!(result.is_none());
        assert!(store.find(Collection::Tasks, &Filter::all(), None).unwrap().is_empty());
    }

    #[test]
    fn test_delete_then_delete_again() {
        let store = SqliteStore::open_in_memory().unwrap();
        let expense = store
            .insert(Collection::Expenses, doc(json!({"amount": 42.5, "reason": "supplies"})))
            .unwrap();
        let id = id_of(&expense);

        let deleted = store.delete_by_id(Collection::Expenses, &id).unwrap();
        assert_eq!(deleted, Some(expense));
        assert!(store.delete_by_id(Collection::Expenses, &id).unwrap().is_none());
    }

    #[test]
    fn test_malformed_id_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();

        let err = store.delete_by_id(Collection::Tasks, "not-an-id").unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(id) if id == "not-an-id"));

        let err = store
            .update_by_id(Collection::Tasks, "42", Document::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
    }

    #[test]
    fn test_composite_filter_value_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();

        let err = store
            .find(Collection::Tasks, &Filter::eq("person", json!(["ana"])), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedFilter(_)));
    }

    #[test]
    fn test_file_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("financials.db");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.database_name(), "financials");
            id_of(
                &store
                    .insert(Collection::Revenues, doc(json!({"amount": 150, "source": "consulting"})))
                    .unwrap(),
            )
        };

        let store = SqliteStore::connect(path.to_str().unwrap()).unwrap();
        let found = store.find(Collection::Revenues, &Filter::all(), None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(id_of(&found[0]), id);
        assert_eq!(found[0]["source"], "consulting");
    }

    #[test]
    fn test_connect_in_memory() {
        let store = SqliteStore::connect(IN_MEMORY).unwrap();
        assert_eq!(store.database_name(), "memory");
    }
}
