// Financials API - Typed Repositories
// Async, typed access to one collection of the shared document store

use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::db::{Document, DocumentStore, Filter, Sort, StoreError, StoreResult};
use crate::models::{cast_document, Record, CREATED_AT};

/// One record kind's view of the store.
///
/// Store calls block on the SQLite connection, so each one runs on tokio's
/// blocking pool and the handler awaits it. That await is the only point
/// where a request yields.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    async fn run<R, F>(&self, op: F) -> StoreResult<R>
    where
        F: FnOnce(&dyn DocumentStore) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Matching records, newest `createdAt` first
    pub async fn list(&self, filter: Filter) -> StoreResult<Vec<T>> {
        let docs = self
            .run(move |store| store.find(T::COLLECTION, &filter, Some(&Sort::descending(CREATED_AT))))
            .await?;

        docs.into_iter().map(from_document).collect()
    }

    /// Persist a request body, cast to the schema, and return the stored
    /// record with its assigned id
    pub async fn create(&self, body: Document) -> StoreResult<T> {
        let doc = cast_document::<T>(body)?;
        let saved = self.run(move |store| store.insert(T::COLLECTION, doc)).await?;

        from_document(saved)
    }

    /// Overwrite the schema fields named in `body`, explicit nulls included;
    /// `None` when no record has `id`
    pub async fn update(&self, id: String, body: Document) -> StoreResult<Option<T>> {
        let patch = cast_document::<T>(body)?;
        let updated = self
            .run(move |store| store.update_by_id(T::COLLECTION, &id, patch))
            .await?;

        updated.map(from_document).transpose()
    }

    /// Remove the record with `id` and return it; `None` when absent
    pub async fn delete(&self, id: String) -> StoreResult<Option<T>> {
        let deleted = self
            .run(move |store| store.delete_by_id(T::COLLECTION, &id))
            .await?;

        deleted.map(from_document).transpose()
    }
}

fn from_document<T: Record>(doc: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::models::{Revenue, Task};
    use serde_json::{json, Number};

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(SqliteStore::open_in_memory().unwrap())
    }

    fn body(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn test_create_then_list_for_person() {
        let tasks: Repository<Task> = Repository::new(store());

        let created = tasks
            .create(body(json!({"person": "ana", "text": "pay rent", "completed": false})))
            .await
            .unwrap();
        assert!(created.id.is_some());

        let listed = tasks.list(Filter::eq("person", "ana")).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let tasks: Repository<Task> = Repository::new(store());
        let created = tasks
            .create(body(json!({"person": "ana", "text": "call bank", "completed": false})))
            .await
            .unwrap();

        let updated = tasks
            .update(created.id.clone().unwrap(), body(json!({"completed": "true"})))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.completed, Some(true));
        assert_eq!(updated.text, created.text);
        assert_eq!(updated.person, created.person);
    }

    #[tokio::test]
    async fn test_update_with_null_clears_field() {
        let tasks: Repository<Task> = Repository::new(store());
        let created = tasks
            .create(body(json!({"person": "ana", "completed": true})))
            .await
            .unwrap();

        let updated = tasks
            .update(created.id.clone().unwrap(), body(json!({"completed": null})))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.completed, None);
        assert_eq!(updated.person.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_uncastable_value_fails_before_store() {
        let revenues: Repository<Revenue> = Repository::new(store());

        let err = revenues.create(body(json!({"amount": "lots"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Cast { .. }));
        assert!(revenues.list(Filter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let revenues: Repository<Revenue> = Repository::new(store());
        for day in [3, 1, 2] {
            revenues
                .create(body(json!({
                    "amount": day,
                    "createdAt": format!("2024-05-0{day}T12:00:00Z")
                })))
                .await
                .unwrap();
        }

        let amounts: Vec<Option<Number>> = revenues
            .list(Filter::all())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.amount)
            .collect();
        assert_eq!(
            amounts,
            vec![Some(Number::from(3)), Some(Number::from(2)), Some(Number::from(1))]
        );
    }

    #[tokio::test]
    async fn test_delete_returns_removed_record() {
        let revenues: Repository<Revenue> = Repository::new(store());
        let created = revenues
            .create(body(json!({"amount": 150, "source": "consulting"})))
            .await
            .unwrap();
        let id = created.id.clone().unwrap();

        assert_eq!(revenues.delete(id.clone()).await.unwrap(), Some(created));
        assert_eq!(revenues.delete(id).await.unwrap(), None);
    }
}
