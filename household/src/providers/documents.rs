//! Document store trait and paths.
//!
//! The store holds JSON documents addressed by slash-separated paths. A
//! collection is the set of documents directly below a collection path:
//!
//! ```text
//! users/{identity}
//! families/{family}
//! families/{family}/items/{item}
//! ```

use crate::error::Result;
use crate::state::{FamilyId, IdentityId, ItemId};
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// `users/{id}`
    #[must_use]
    pub fn user(id: &IdentityId) -> Self {
        Self(format!("users/{id}"))
    }

    /// `families/{id}`
    #[must_use]
    pub fn family(id: &FamilyId) -> Self {
        Self(format!("families/{id}"))
    }

    /// `families/{family}/items/{item}`
    #[must_use]
    pub fn item(family: &FamilyId, item: &ItemId) -> Self {
        CollectionPath::items(family).document(item.as_str())
    }

    /// Full path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.rsplit_once('/').map_or(self.0.as_str(), |(_, id)| id)
    }

    /// Collection this document belongs to.
    #[must_use]
    pub fn parent(&self) -> CollectionPath {
        CollectionPath(
            self.0
                .rsplit_once('/')
                .map_or_else(String::new, |(parent, _)| parent.to_string()),
        )
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// `families/{family}/items`
    #[must_use]
    pub fn items(family: &FamilyId) -> Self {
        Self(format!("families/{family}/items"))
    }

    /// Document `id` inside this collection.
    #[must_use]
    pub fn document(&self, id: &str) -> DocumentPath {
        DocumentPath(format!("{}/{id}", self.0))
    }

    /// Full path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document read from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Last path segment.
    pub id: String,
    /// Document body.
    pub data: Value,
}

/// Live view of a collection.
///
/// Each delivery is the full collection at that moment. Closing (or
/// dropping) the subscription releases the backend listener; no snapshot is
/// delivered afterwards.
pub struct CollectionSubscription {
    snapshots: mpsc::UnboundedReceiver<Vec<Document>>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl CollectionSubscription {
    /// Wrap a snapshot channel and the callback that deregisters it.
    pub fn new<F>(snapshots: mpsc::UnboundedReceiver<Vec<Document>>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            snapshots,
            release: Some(Box::new(release)),
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the subscription is closed or the backend stops
    /// delivering.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        if self.release.is_none() {
            return None;
        }
        self.snapshots.recv().await
    }

    /// Stop delivery and release the backend listener. Idempotent.
    pub fn close(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        self.snapshots.close();
    }

    /// `true` after [`CollectionSubscription::close`].
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for CollectionSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CollectionSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionSubscription")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Document store.
///
/// Writes are last-write-wins except [`DocumentStore::create`], which must be
/// atomic: of two concurrent creates for the same path exactly one succeeds.
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the store is unreachable.
    fn get(&self, path: &DocumentPath) -> impl std::future::Future<Output = Result<Option<Value>>> + Send;

    /// Write a document only if none exists at `path`.
    ///
    /// Returns `false` (and writes nothing) if the path is taken.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the store is unreachable.
    fn create(
        &self,
        path: &DocumentPath,
        data: Value,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Replace a document, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the store is unreachable.
    fn set(&self, path: &DocumentPath, data: Value) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Merge top-level fields into a document, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the store is unreachable.
    fn merge(&self, path: &DocumentPath, fields: Value) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Overwrite top-level fields of an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HouseholdError::DocumentNotFound`] if the document
    /// does not exist.
    fn update(&self, path: &DocumentPath, fields: Value) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete a document. Deleting a missing document succeeds.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the store is unreachable.
    fn delete(&self, path: &DocumentPath) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Add a document under a store-assigned id and return that id.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the store is unreachable.
    fn add(
        &self,
        collection: &CollectionPath,
        data: Value,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Every document directly in a collection.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the store is unreachable.
    fn list(
        &self,
        collection: &CollectionPath,
    ) -> impl std::future::Future<Output = Result<Vec<Document>>> + Send;

    /// Subscribe to a collection. The first snapshot is the current content.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the listener cannot be registered.
    fn subscribe(
        &self,
        collection: &CollectionPath,
    ) -> impl std::future::Future<Output = Result<CollectionSubscription>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_paths_nest_under_family() {
        let path = DocumentPath::item(&FamilyId::new("Smiths"), &ItemId::new("i1"));
        assert_eq!(path.as_str(), "families/Smiths/items/i1");
        assert_eq!(path.id(), "i1");
        assert_eq!(path.parent(), CollectionPath::items(&FamilyId::new("Smiths")));
        assert_eq!(DocumentPath::user(&IdentityId::new("a")).parent().as_str(), "users");
    }

    #[tokio::test]
    async fn close_releases_once_and_stops_delivery() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let released = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let counter = Arc::clone(&released);
        let mut subscription = CollectionSubscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let _ = tx.send(Vec::new());
        assert_eq!(subscription.next().await, Some(Vec::new()));

        subscription.close();
        subscription.close();
        let _ = tx.send(Vec::new());
        assert_eq!(subscription.next().await, None);
        drop(subscription);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
