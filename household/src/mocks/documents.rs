//! In-memory document store.

use crate::error::{HouseholdError, Result};
use crate::providers::{CollectionPath, CollectionSubscription, Document, DocumentPath, DocumentStore};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<String, Value>,
    listeners: HashMap<u64, Listener>,
    next_listener: u64,
    failing_prefixes: Vec<String>,
}

#[derive(Debug)]
struct Listener {
    collection: CollectionPath,
    sender: mpsc::UnboundedSender<Vec<Document>>,
}

impl Inner {
    fn check_writable(&self, path: &str) -> Result<()> {
        if self.failing_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Err(HouseholdError::Backend(format!("write to {path} failed")));
        }
        Ok(())
    }

    fn collection(&self, collection: &CollectionPath) -> Vec<Document> {
        let prefix = format!("{collection}/");
        self.documents
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, data)| {
                let id = &path[prefix.len()..];
                (!id.contains('/')).then(|| Document {
                    id: id.to_string(),
                    data: data.clone(),
                })
            })
            .collect()
    }

    fn publish(&mut self, changed: &DocumentPath) {
        let collection = changed.parent();
        let snapshot = self.collection(&collection);
        self.listeners.retain(|_, listener| {
            if listener.collection != collection {
                return true;
            }
            listener.sender.send(snapshot.clone()).is_ok()
        });
    }

    fn write(&mut self, path: &DocumentPath, data: Value) {
        self.documents.insert(path.as_str().to_string(), data);
        self.publish(path);
    }
}

fn merge_fields(target: &mut Value, fields: Value) {
    match (target, fields) {
        (Value::Object(target), Value::Object(fields)) => {
            target.extend(fields);
        },
        (target, fields) => *target = fields,
    }
}

/// In-memory [`DocumentStore`].
///
/// Clones share the same documents, so several simulated devices can work
/// against one store. Subscriptions receive a full snapshot of their
/// collection after every write to it.
#[derive(Debug, Clone, Default)]
pub struct MockDocumentStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write or delete under `prefix` fail with a backend error.
    pub fn fail_writes_under(&self, prefix: impl Into<String>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_prefixes.push(prefix.into());
        }
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_prefixes.clear();
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.listeners.len())
    }

    /// Number of stored documents.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.documents.len())
    }

    /// Read a document without going through the async trait.
    #[must_use]
    pub fn peek(&self, path: &DocumentPath) -> Option<Value> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.documents.get(path.as_str()).cloned())
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> Result<T>) -> Result<T> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| HouseholdError::Backend("document store lock poisoned".to_string()))?;
        f(&mut inner)
    }
}

impl DocumentStore for MockDocumentStore {
    fn get(&self, path: &DocumentPath) -> impl Future<Output = Result<Option<Value>>> + Send {
        let result = self.with_inner(|inner| Ok(inner.documents.get(path.as_str()).cloned()));
        async move { result }
    }

    fn create(&self, path: &DocumentPath, data: Value) -> impl Future<Output = Result<bool>> + Send {
        let result = self.with_inner(|inner| {
            inner.check_writable(path.as_str())?;
            if inner.documents.contains_key(path.as_str()) {
                return Ok(false);
            }
            inner.write(path, data);
            Ok(true)
        });
        async move { result }
    }

    fn set(&self, path: &DocumentPath, data: Value) -> impl Future<Output = Result<()>> + Send {
        let result = self.with_inner(|inner| {
            inner.check_writable(path.as_str())?;
            inner.write(path, data);
            Ok(())
        });
        async move { result }
    }

    fn merge(&self, path: &DocumentPath, fields: Value) -> impl Future<Output = Result<()>> + Send {
        let result = self.with_inner(|inner| {
            inner.check_writable(path.as_str())?;
            let mut document = inner
                .documents
                .get(path.as_str())
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            merge_fields(&mut document, fields);
            inner.write(path, document);
            Ok(())
        });
        async move { result }
    }

    fn update(&self, path: &DocumentPath, fields: Value) -> impl Future<Output = Result<()>> + Send {
        let result = self.with_inner(|inner| {
            inner.check_writable(path.as_str())?;
            let mut document = inner
                .documents
                .get(path.as_str())
                .cloned()
                .ok_or_else(|| HouseholdError::DocumentNotFound(path.to_string()))?;
            merge_fields(&mut document, fields);
            inner.write(path, document);
            Ok(())
        });
        async move { result }
    }

    fn delete(&self, path: &DocumentPath) -> impl Future<Output = Result<()>> + Send {
        let result = self.with_inner(|inner| {
            inner.check_writable(path.as_str())?;
            if inner.documents.remove(path.as_str()).is_some() {
                inner.publish(path);
            }
            Ok(())
        });
        async move { result }
    }

    fn add(&self, collection: &CollectionPath, data: Value) -> impl Future<Output = Result<String>> + Send {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let path = collection.document(&id);
        let result = self.with_inner(|inner| {
            inner.check_writable(path.as_str())?;
            inner.write(&path, data);
            Ok(id)
        });
        async move { result }
    }

    fn list(&self, collection: &CollectionPath) -> impl Future<Output = Result<Vec<Document>>> + Send {
        let result = self.with_inner(|inner| Ok(inner.collection(collection)));
        async move { result }
    }

    fn subscribe(
        &self,
        collection: &CollectionPath,
    ) -> impl Future<Output = Result<CollectionSubscription>> + Send {
        let shared = Arc::clone(&self.inner);
        let result = self.with_inner(|inner| {
            let (sender, receiver) = mpsc::unbounded_channel();
            let _ = sender.send(inner.collection(collection));

            let key = inner.next_listener;
            inner.next_listener += 1;
            inner.listeners.insert(
                key,
                Listener {
                    collection: collection.clone(),
                    sender,
                },
            );

            Ok(CollectionSubscription::new(receiver, move || {
                if let Ok(mut inner) = shared.lock() {
                    inner.listeners.remove(&key);
                }
            }))
        });
        async move { result }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::FamilyId;
    use serde_json::json;

    fn family(id: &str) -> DocumentPath {
        DocumentPath::family(&FamilyId::new(id))
    }

    #[tokio::test]
    async fn create_refuses_existing_path() {
        let store = MockDocumentStore::new();
        assert!(store.create(&family("Smiths"), json!({ "name": "first" })).await.unwrap());
        assert!(!store.create(&family("Smiths"), json!({ "name": "second" })).await.unwrap());
        assert_eq!(store.peek(&family("Smiths")).unwrap()["name"], "first");
    }

    #[tokio::test]
    async fn merge_keeps_other_fields_and_writes_nulls() {
        let store = MockDocumentStore::new();
        let path = family("Smiths");
        store.merge(&path, json!({ "a": 1, "b": 2 })).await.unwrap();
        store.merge(&path, json!({ "b": null })).await.unwrap();
        assert_eq!(store.get(&path).await.unwrap(), Some(json!({ "a": 1, "b": null })));
    }

    #[tokio::test]
    async fn update_requires_existing_document() {
        let store = MockDocumentStore::new();
        let result = store.update(&family("Nobody"), json!({ "a": 1 })).await;
        assert_eq!(
            result,
            Err(HouseholdError::DocumentNotFound("families/Nobody".to_string()))
        );
    }

    #[tokio::test]
    async fn list_returns_direct_children_only() {
        let store = MockDocumentStore::new();
        let items = CollectionPath::items(&FamilyId::new("Smiths"));
        store.set(&family("Smiths"), json!({})).await.unwrap();
        let id = store.add(&items, json!({ "name": "Milk" })).await.unwrap();
        store.add(&CollectionPath::items(&FamilyId::new("Smithson")), json!({})).await.unwrap();

        let documents = store.list(&items).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, id);

        let families = store.list(&family("x").parent()).await.unwrap();
        assert_eq!(families.len(), 1);
    }

    #[tokio::test]
    async fn subscription_sees_every_write_until_closed() {
        let store = MockDocumentStore::new();
        let items = CollectionPath::items(&FamilyId::new("Smiths"));
        let mut subscription = store.subscribe(&items).await.unwrap();
        assert_eq!(subscription.next().await, Some(Vec::new()));
        assert_eq!(store.listener_count(), 1);

        let id = store.add(&items, json!({ "bought": false })).await.unwrap();
        assert_eq!(subscription.next().await.unwrap().len(), 1);

        store.update(&items.document(&id), json!({ "bought": true })).await.unwrap();
        let snapshot = subscription.next().await.unwrap();
        assert_eq!(snapshot[0].data["bought"], true);

        subscription.close();
        assert_eq!(store.listener_count(), 0);
        store.delete(&items.document(&id)).await.unwrap();
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn dropping_subscription_releases_listener() {
        let store = MockDocumentStore::new();
        let items = CollectionPath::items(&FamilyId::new("Smiths"));
        let subscription = store.subscribe(&items).await.unwrap();
        assert_eq!(store.listener_count(), 1);
        drop(subscription);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn injected_failures_apply_by_prefix() {
        let store = MockDocumentStore::new();
        store.fail_writes_under("families/Smiths/items");
        let items = CollectionPath::items(&FamilyId::new("Smiths"));
        assert!(matches!(store.add(&items, json!({})).await, Err(HouseholdError::Backend(_))));
        store.set(&family("Smiths"), json!({})).await.unwrap();

        store.clear_failures();
        assert!(store.add(&items, json!({})).await.is_ok());
    }
}
