//! Favourites list: filter, delete and open

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{ListError, ProtocolError};
use crate::model::{
    ActionLabel, FavoriteCity, IndexPath, ListSource, ListSyncEngine, ListViewState, Predicate,
    QueryableStore, Record, RowAction, SortDescriptor, ViewSpec,
};

use super::Navigation;

pub const DELETE_ACTION: &str = "Delete";

/// Key that triggers a row action, for the hint bar.
pub fn action_key(title: &str) -> Option<&'static str> {
    (title == DELETE_ACTION).then_some("Del")
}

pub struct FavoritesController {
    engine: ListSyncEngine<FavoriteCity, ListViewState>,
    filter: String,
}

/// Filtered, name-ordered view with one section per city name.
pub fn favorites_spec(filter: &str) -> ViewSpec<FavoriteCity> {
    let predicate = (!filter.is_empty()).then(|| Predicate::begins_with("name", filter));
    ViewSpec::sorted_by(SortDescriptor::ascending("name"))
        .with_predicate(predicate)
        .sectioned_by(FavoriteCity::section_title)
}

impl FavoritesController {
    pub fn new(
        store: Arc<dyn QueryableStore<FavoriteCity>>,
        navigation: mpsc::UnboundedSender<Navigation>,
    ) -> Result<Self, ListError> {
        let action_store = store.clone();
        let mut engine = ListSyncEngine::new(store, ListViewState::new())
            .with_row_actions(move |_| {
                let store = action_store.clone();
                vec![RowAction::destructive(
                    DELETE_ACTION,
                    move |record: &Record<FavoriteCity>| {
                        store.delete(record.id)?;
                        if let Err(e) = store.save() {
                            store.rollback();
                            return Err(e);
                        }
                        tracing::info!(city = %record.value.name, "Favourite deleted");
                        Ok(())
                    },
                )]
            })
            .on_select(move |record| {
                let _ = navigation.send(Navigation::OpenDetail(record.value.clone()));
            });
        engine.configure(favorites_spec(""))?;

        Ok(Self {
            engine,
            filter: String::new(),
        })
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Requery with a new name prefix.
    pub fn set_filter(&mut self, filter: &str) -> Result<(), ListError> {
        self.filter = filter.to_string();
        self.reload()
    }

    /// Reopen the view with the current filter. Clears a protocol fault.
    pub fn reload(&mut self) -> Result<(), ListError> {
        self.engine.configure(favorites_spec(&self.filter))
    }

    pub fn sync(&mut self) -> Result<usize, ProtocolError> {
        self.engine.sync()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }

    /// True after the store sent a batch the list could not apply. The rows
    /// shown are the last good state until `reload`.
    pub fn is_faulted(&self) -> bool {
        self.engine.fault().is_some()
    }

    pub fn list(&self) -> &ListViewState {
        self.engine.presentation()
    }

    /// The data source the list is drawn from.
    pub fn source(&self) -> &impl ListSource<Item = Record<FavoriteCity>> {
        &self.engine
    }

    pub fn move_up(&mut self) {
        self.engine.presentation_mut().move_up();
    }

    pub fn move_down(&mut self) {
        self.engine.presentation_mut().move_down();
    }

    pub fn selected_path(&self) -> Option<IndexPath> {
        self.engine.presentation().selected_path()
    }

    pub fn selected_actions(&self) -> Vec<ActionLabel> {
        self.selected_path()
            .map(|path| self.engine.row_actions(path))
            .unwrap_or_default()
    }

    /// Fire the selection callback for the highlighted row.
    pub fn open_selected(&mut self) -> Result<(), ListError> {
        match self.selected_path() {
            Some(path) => self.engine.select(path),
            None => Ok(()),
        }
    }

    pub fn delete_selected(&mut self) -> Result<(), ListError> {
        match self.selected_path() {
            Some(path) => self.engine.apply_edit(path, DELETE_ACTION),
            None => Ok(()),
        }
    }
}
