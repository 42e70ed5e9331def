//! Queryable record store with live views
//!
//! `LocalStore` keeps records in memory, persists them as JSON on `save()` and
//! pushes a change batch to every open view whenever a mutation changes what
//! that view would show. Batches travel over unbounded channels so they are
//! applied by whoever owns the view, on its own task.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::mpsc;

use super::changes::{ChangeBatch, Record, RecordId, Snapshot};
use super::predicate::{Predicate, Queryable, SortDescriptor};
use crate::error::{PersistenceError, QueryError};

pub type SectionKeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Definition of a view: filter, ordering and optional sectioning.
pub struct ViewSpec<T> {
    pub predicate: Option<Predicate>,
    pub sort: SortDescriptor,
    pub section_key: Option<SectionKeyFn<T>>,
}

impl<T> ViewSpec<T> {
    pub fn sorted_by(sort: SortDescriptor) -> Self {
        Self {
            predicate: None,
            sort,
            section_key: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Option<Predicate>) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn sectioned_by(mut self, key: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.section_key = Some(Arc::new(key));
        self
    }
}

impl<T> Clone for ViewSpec<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            sort: self.sort.clone(),
            section_key: self.section_key.clone(),
        }
    }
}

impl<T> fmt::Debug for ViewSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewSpec")
            .field("predicate", &self.predicate)
            .field("sort", &self.sort)
            .field("sectioned", &self.section_key.is_some())
            .finish()
    }
}

/// Receiving end of a view's change notifications. Dropping it closes the view.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<ChangeBatch<T>>,
}

impl<T> Subscription<T> {
    pub fn new(rx: mpsc::UnboundedReceiver<ChangeBatch<T>>) -> Self {
        Self { rx }
    }

    /// Next queued batch, if any, without waiting.
    pub fn try_next(&mut self) -> Option<ChangeBatch<T>> {
        self.rx.try_recv().ok()
    }
}

/// An open query: its initial contents plus the stream of later changes.
pub struct StoreView<T> {
    pub spec: ViewSpec<T>,
    pub snapshot: Snapshot<T>,
    pub changes: Subscription<T>,
}

pub trait QueryableStore<T>: Send + Sync {
    fn query(&self, spec: ViewSpec<T>) -> Result<StoreView<T>, QueryError>;

    /// Evaluate `spec` against the current contents without opening a view.
    fn snapshot(&self, spec: &ViewSpec<T>) -> Result<Snapshot<T>, QueryError>;

    fn insert(&self, value: T) -> RecordId;

    fn update(&self, id: RecordId, value: T) -> Result<(), PersistenceError>;

    fn delete(&self, id: RecordId) -> Result<T, PersistenceError>;

    /// Persist every change since the last save.
    fn save(&self) -> Result<(), PersistenceError>;

    /// Discard unsaved changes; open views receive the compensating batch.
    fn rollback(&self);
}

#[derive(Serialize, Deserialize)]
struct StoreFile<T> {
    next_id: u64,
    records: Vec<Record<T>>,
}

struct LiveView<T> {
    spec: ViewSpec<T>,
    last: Snapshot<T>,
    tx: mpsc::UnboundedSender<ChangeBatch<T>>,
}

struct StoreInner<T> {
    records: Vec<Record<T>>,
    next_id: u64,
    saved_records: Vec<Record<T>>,
    saved_next_id: u64,
    views: Vec<LiveView<T>>,
}

pub struct LocalStore<T> {
    inner: Mutex<StoreInner<T>>,
    path: Option<PathBuf>,
}

impl<T> LocalStore<T>
where
    T: Queryable + Clone + PartialEq + Serialize + DeserializeOwned + Send + 'static,
{
    /// A store that never touches disk; `save()` only marks changes as committed.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::with_records(Vec::new(), 1, None)
    }

    /// Open the store backed by `path`, loading it if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let file: StoreFile<T> = serde_json::from_str(&content)?;
            tracing::info!(path = %path.display(), records = file.records.len(), "Loaded store from disk");
            Ok(Self::with_records(file.records, file.next_id, Some(path)))
        } else {
            tracing::debug!(path = %path.display(), "No store file yet, starting empty");
            Ok(Self::with_records(Vec::new(), 1, Some(path)))
        }
    }

    fn with_records(records: Vec<Record<T>>, next_id: u64, path: Option<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                saved_records: records.clone(),
                saved_next_id: next_id,
                records,
                next_id,
                views: Vec::new(),
            }),
            path,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Number of views still subscribed.
    #[cfg(test)]
    pub fn open_views(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.views.retain(|view| !view.tx.is_closed());
        inner.views.len()
    }

    fn validate(spec: &ViewSpec<T>) -> Result<(), QueryError> {
        if let Some(predicate) = &spec.predicate {
            predicate.validate::<T>()?;
        }
        spec.sort.validate::<T>()
    }

    fn evaluate(records: &[Record<T>], spec: &ViewSpec<T>) -> Snapshot<T> {
        let mut matching: Vec<Record<T>> = records
            .iter()
            .filter(|record| {
                spec.predicate
                    .as_ref()
                    .is_none_or(|predicate| predicate.matches(&record.value))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| spec.sort.compare(&a.value, &b.value).then(a.id.cmp(&b.id)));
        Snapshot::from_sorted(matching, spec.section_key.as_deref())
    }

    fn notify(inner: &mut StoreInner<T>) {
        let StoreInner { records, views, .. } = inner;
        views.retain_mut(|view| {
            let current = Self::evaluate(records.as_slice(), &view.spec);
            let batch = Snapshot::diff(&view.last, &current);
            view.last = current;
            if batch.is_empty() {
                return !view.tx.is_closed();
            }
            tracing::trace!(events = batch.len(), "Publishing change batch");
            view.tx.send(batch).is_ok()
        });
    }
}

impl<T> QueryableStore<T> for LocalStore<T>
where
    T: Queryable + Clone + PartialEq + Serialize + DeserializeOwned + Send + 'static,
{
    fn query(&self, spec: ViewSpec<T>) -> Result<StoreView<T>, QueryError> {
        Self::validate(&spec)?;
        let mut inner = self.inner.lock();
        let snapshot = Self::evaluate(&inner.records, &spec);
        let (tx, rx) = mpsc::unbounded_channel();
        inner.views.push(LiveView {
            spec: spec.clone(),
            last: snapshot.clone(),
            tx,
        });
        tracing::debug!(?spec, rows = snapshot.len(), "Opened store view");
        Ok(StoreView {
            spec,
            snapshot,
            changes: Subscription::new(rx),
        })
    }

    fn snapshot(&self, spec: &ViewSpec<T>) -> Result<Snapshot<T>, QueryError> {
        Self::validate(spec)?;
        Ok(Self::evaluate(&self.inner.lock().records, spec))
    }

    fn insert(&self, value: T) -> RecordId {
        let mut inner = self.inner.lock();
        let id = RecordId(inner.next_id);
        inner.next_id += 1;
        inner.records.push(Record { id, value });
        tracing::debug!(%id, "Inserted record");
        Self::notify(&mut inner);
        id
    }

    fn update(&self, id: RecordId, value: T) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        let record = inner
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(PersistenceError::NotFound { id })?;
        record.value = value;
        tracing::debug!(%id, "Updated record");
        Self::notify(&mut inner);
        Ok(())
    }

    fn delete(&self, id: RecordId) -> Result<T, PersistenceError> {
        let mut inner = self.inner.lock();
        let index = inner
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or(PersistenceError::NotFound { id })?;
        let record = inner.records.remove(index);
        tracing::debug!(%id, "Deleted record");
        Self::notify(&mut inner);
        Ok(record.value)
    }

    fn save(&self) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();

        if let Some(path) = &self.path {
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() && !dir.exists() {
                    std::fs::create_dir_all(dir)?;
                }
            }
            let file = StoreFile {
                next_id: inner.next_id,
                records: inner.records.clone(),
            };
            let content = serde_json::to_string_pretty(&file)?;
            std::fs::write(path, content)?;
            tracing::info!(path = %path.display(), records = file.records.len(), "Saved store");
        }

        inner.saved_records = inner.records.clone();
        inner.saved_next_id = inner.next_id;
        Ok(())
    }

    fn rollback(&self) {
        let mut inner = self.inner.lock();
        inner.records = inner.saved_records.clone();
        inner.next_id = inner.saved_next_id;
        tracing::warn!("Rolled back unsaved store changes");
        Self::notify(&mut inner);
    }
}
