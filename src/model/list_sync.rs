//! Generic list data source kept in sync with a live store view
//!
//! The engine owns the snapshot a list is drawn from. It never edits that
//! snapshot on its own: row actions mutate the store, the store publishes a
//! change batch, and [`ListSyncEngine::sync`] applies the batch to the
//! snapshot and replays it on the [`Presentation`] between
//! `begin_batch`/`end_batch`. The store's notification path is therefore the
//! only way the list ever changes after `configure`.

use std::sync::Arc;

use super::changes::{ChangeBatch, ChangeEvent, IndexPath, Record, Snapshot};
use super::store::{QueryableStore, Subscription, ViewSpec};
use crate::error::{ListError, PersistenceError, ProtocolError};

/// Structural updates a list host renders against its own visible list.
pub trait Presentation {
    fn begin_batch(&mut self);
    fn insert_row(&mut self, path: IndexPath);
    fn delete_row(&mut self, path: IndexPath);
    fn update_row(&mut self, path: IndexPath);
    fn move_row(&mut self, from: IndexPath, to: IndexPath);
    fn insert_section(&mut self, index: usize);
    fn delete_section(&mut self, index: usize);
    fn end_batch(&mut self);

    /// Drop everything and redraw from scratch with the given row counts.
    fn reload(&mut self, row_counts: &[usize]);
}

/// What a list host needs from its data source.
pub trait ListSource {
    type Item;
    type Spec;

    fn configure(&mut self, spec: Self::Spec) -> Result<(), ListError>;
    fn section_count(&self) -> usize;
    fn row_count(&self, section: usize) -> usize;
    fn item(&self, path: IndexPath) -> Option<&Self::Item>;
    fn apply_edit(&mut self, path: IndexPath, action: &str) -> Result<(), ListError>;
    fn select(&mut self, path: IndexPath) -> Result<(), ListError>;
}

pub type ActionHandler<T> = Arc<dyn Fn(&Record<T>) -> Result<(), PersistenceError>>;

/// A per-row command such as "Delete".
pub struct RowAction<T> {
    pub title: String,
    pub destructive: bool,
    handler: ActionHandler<T>,
}

impl<T> RowAction<T> {
    pub fn new(
        title: impl Into<String>,
        handler: impl Fn(&Record<T>) -> Result<(), PersistenceError> + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            destructive: false,
            handler: Arc::new(handler),
        }
    }

    pub fn destructive(
        title: impl Into<String>,
        handler: impl Fn(&Record<T>) -> Result<(), PersistenceError> + 'static,
    ) -> Self {
        Self {
            destructive: true,
            ..Self::new(title, handler)
        }
    }
}

/// How a row action is offered to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionLabel {
    pub title: String,
    pub destructive: bool,
}

impl<T> Clone for RowAction<T> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            destructive: self.destructive,
            handler: self.handler.clone(),
        }
    }
}

type RowActionsFn<T> = Box<dyn Fn(&Record<T>) -> Vec<RowAction<T>>>;
type SelectFn<T> = Box<dyn FnMut(&Record<T>)>;

struct OpenView<T> {
    snapshot: Snapshot<T>,
    changes: Subscription<T>,
}

pub struct ListSyncEngine<T, P> {
    store: Arc<dyn QueryableStore<T>>,
    presentation: P,
    view: Option<OpenView<T>>,
    row_actions: RowActionsFn<T>,
    on_select: Option<SelectFn<T>>,
    fault: Option<ProtocolError>,
}

impl<T: Clone, P: Presentation> ListSyncEngine<T, P> {
    pub fn new(store: Arc<dyn QueryableStore<T>>, presentation: P) -> Self {
        Self {
            store,
            presentation,
            view: None,
            row_actions: Box::new(|_| Vec::new()),
            on_select: None,
            fault: None,
        }
    }

    pub fn with_row_actions(mut self, actions: impl Fn(&Record<T>) -> Vec<RowAction<T>> + 'static) -> Self {
        self.row_actions = Box::new(actions);
        self
    }

    pub fn on_select(mut self, callback: impl FnMut(&Record<T>) + 'static) -> Self {
        self.on_select = Some(Box::new(callback));
        self
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn snapshot(&self) -> Option<&Snapshot<T>> {
        self.view.as_ref().map(|view| &view.snapshot)
    }

    /// True when no view is open or the open view has no rows.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_none_or(Snapshot::is_empty)
    }

    /// The protocol violation that closed the current view, if any.
    pub fn fault(&self) -> Option<&ProtocolError> {
        self.fault.as_ref()
    }

    /// Actions offered for the row at `path`.
    pub fn row_actions(&self, path: IndexPath) -> Vec<ActionLabel> {
        self.item(path)
            .map(|record| {
                (self.row_actions)(record)
                    .into_iter()
                    .map(|action| ActionLabel {
                        title: action.title,
                        destructive: action.destructive,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply every change batch the store has published since the last call.
    ///
    /// Returns the number of batches applied. A protocol violation closes the
    /// view: the list keeps its last good state, the error is returned once,
    /// and later batches are discarded until the view is configured again.
    pub fn sync(&mut self) -> Result<usize, ProtocolError> {
        let mut applied = 0;
        loop {
            let Some(view) = self.view.as_mut() else {
                return Ok(applied);
            };
            let Some(batch) = view.changes.try_next() else {
                return Ok(applied);
            };
            if self.fault.is_some() {
                continue;
            }
            if let Err(err) = self.apply_batch(batch) {
                tracing::error!(error = %err, "Store sent an invalid change batch, closing view");
                self.fault = Some(err.clone());
                return Err(err);
            }
            applied += 1;
        }
    }

    fn apply_batch(&mut self, batch: ChangeBatch<T>) -> Result<(), ProtocolError> {
        let Some(view) = self.view.as_mut() else {
            return Ok(());
        };
        view.snapshot.apply(&batch)?;

        tracing::trace!(events = batch.len(), "Applying change batch");
        self.presentation.begin_batch();
        for event in &batch {
            match event {
                ChangeEvent::Insert { path, .. } => self.presentation.insert_row(*path),
                ChangeEvent::Delete { path } => self.presentation.delete_row(*path),
                ChangeEvent::Update { path, .. } => self.presentation.update_row(*path),
                ChangeEvent::Move { from, to, .. } => self.presentation.move_row(*from, *to),
                ChangeEvent::SectionInsert { index, .. } => self.presentation.insert_section(*index),
                ChangeEvent::SectionDelete { index } => self.presentation.delete_section(*index),
                // Rejected by Snapshot::apply above.
                ChangeEvent::SectionMove { .. } | ChangeEvent::SectionUpdate { .. } => {}
            }
        }
        self.presentation.end_batch();
        Ok(())
    }

    fn row_counts(&self) -> Vec<usize> {
        self.snapshot()
            .map(|snapshot| snapshot.sections().iter().map(|s| s.items.len()).collect())
            .unwrap_or_default()
    }
}

impl<T: Clone, P: Presentation> ListSource for ListSyncEngine<T, P> {
    type Item = Record<T>;
    type Spec = ViewSpec<T>;

    /// Open (or reopen) the view. A new filter is always a full requery; the
    /// old snapshot is replaced wholesale and the presentation reloaded.
    fn configure(&mut self, spec: ViewSpec<T>) -> Result<(), ListError> {
        let view = self.store.query(spec)?;
        tracing::debug!(spec = ?view.spec, rows = view.snapshot.len(), "List view configured");
        self.view = Some(OpenView {
            snapshot: view.snapshot,
            changes: view.changes,
        });
        self.fault = None;
        let counts = self.row_counts();
        self.presentation.reload(&counts);
        Ok(())
    }

    fn section_count(&self) -> usize {
        self.snapshot().map_or(0, Snapshot::section_count)
    }

    fn row_count(&self, section: usize) -> usize {
        self.snapshot().map_or(0, |snapshot| snapshot.row_count(section))
    }

    fn item(&self, path: IndexPath) -> Option<&Record<T>> {
        self.snapshot()?.get(path)
    }

    fn apply_edit(&mut self, path: IndexPath, action: &str) -> Result<(), ListError> {
        let record = self
            .item(path)
            .cloned()
            .ok_or(ListError::OutOfBounds { path })?;
        let chosen = (self.row_actions)(&record)
            .into_iter()
            .find(|candidate| candidate.title == action)
            .ok_or_else(|| ListError::UnknownAction {
                title: action.to_string(),
            })?;

        tracing::debug!(action, %path, id = %record.id, "Running row action");
        (chosen.handler)(&record)?;
        self.sync()?;
        Ok(())
    }

    fn select(&mut self, path: IndexPath) -> Result<(), ListError> {
        let view = self.view.as_ref().ok_or(ListError::NotConfigured)?;
        let record = view
            .snapshot
            .get(path)
            .ok_or(ListError::OutOfBounds { path })?;
        if let Some(callback) = self.on_select.as_mut() {
            callback(record);
        }
        Ok(())
    }
}
