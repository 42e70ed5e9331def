//! Add-city screen: live autocomplete feeding a pickable result list

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::PersistenceError;
use crate::model::{
    CityListItem, CityLookup, DebouncedSearch, FavoriteCity, QueryableStore, SearchSettings,
    SearchUpdate,
};

use super::Navigation;

pub struct SearchController {
    search: DebouncedSearch,
    store: Arc<dyn QueryableStore<FavoriteCity>>,
    navigation: mpsc::UnboundedSender<Navigation>,
    selected: usize,
}

impl SearchController {
    pub fn new(
        client: Arc<dyn CityLookup>,
        settings: SearchSettings,
        store: Arc<dyn QueryableStore<FavoriteCity>>,
        navigation: mpsc::UnboundedSender<Navigation>,
    ) -> Self {
        Self {
            search: DebouncedSearch::new(client, settings),
            store,
            navigation,
            selected: 0,
        }
    }

    pub fn search(&self) -> &DebouncedSearch {
        &self.search
    }

    pub fn results(&self) -> &[CityListItem] {
        self.search.results()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn on_input(&mut self, text: &str) {
        self.search.on_query_changed(text);
        self.clamp_selection();
    }

    /// Apply finished requests. New results move the cursor back to the top.
    pub fn poll(&mut self) {
        for update in self.search.poll() {
            if let SearchUpdate::Results { .. } = update {
                self.selected = 0;
            }
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.results().len() {
            self.selected += 1;
        }
    }

    /// Persist the highlighted result as a favourite and go back.
    ///
    /// Returns the saved city, or `None` when nothing is highlighted.
    pub fn add_selected(&mut self) -> Result<Option<FavoriteCity>, PersistenceError> {
        let Some(item) = self.results().get(self.selected) else {
            return Ok(None);
        };
        let city = item.to_favorite();

        let id = self.store.insert(city.clone());
        if let Err(e) = self.store.save() {
            tracing::error!(error = %e, %id, "Saving new favourite failed");
            self.store.rollback();
            return Err(e);
        }
        tracing::info!(city = %city.name, country = %city.country, %id, "Favourite added");

        self.search.cancel();
        let _ = self.navigation.send(Navigation::Back);
        Ok(Some(city))
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.results().len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::TransportError;
    use crate::model::{LocalStore, SortDescriptor, ViewSpec};

    struct FixedLookup(Vec<String>);

    #[async_trait]
    impl CityLookup for FixedLookup {
        async fn autocomplete(&self, _query: &str) -> Result<Vec<String>, TransportError> {
            Ok(self.0.clone())
        }
    }

    fn controller() -> (
        Arc<LocalStore<FavoriteCity>>,
        SearchController,
        mpsc::UnboundedReceiver<Navigation>,
    ) {
        let store = Arc::new(LocalStore::in_memory());
        let (tx, rx) = mpsc::unbounded_channel();
        let lookup = Arc::new(FixedLookup(vec![
            "Springfield,IL,United States".into(),
            "Springfield,MO,United States".into(),
            "Lima,,".into(),
        ]));
        let controller = SearchController::new(lookup, SearchSettings::default(), store.clone(), tx);
        (store, controller, rx)
    }

    async fn settle(controller: &mut SearchController) {
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.poll();
    }

    #[tokio::test(start_paused = true)]
    async fn picking_a_result_saves_a_favourite_and_goes_back() {
        let (store, mut controller, mut rx) = controller();
        controller.on_input("Spri");
        settle(&mut controller).await;
        assert_eq!(controller.results().len(), 3);

        controller.move_down();
        let added = controller.add_selected().unwrap();
        assert_eq!(added, Some(FavoriteCity::new("Springfield", "United States")));
        assert_eq!(rx.try_recv().ok(), Some(Navigation::Back));

        let saved = store
            .snapshot(&ViewSpec::sorted_by(SortDescriptor::ascending("name")))
            .unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn short_country_field_is_saved_empty() {
        let (store, mut controller, _rx) = controller();
        controller.on_input("Lim");
        settle(&mut controller).await;

        controller.move_down();
        controller.move_down();
        controller.move_down();
        assert_eq!(controller.selected(), 2);
        assert_eq!(controller.add_selected().unwrap(), Some(FavoriteCity::new("Lima", "")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_to_add_without_results() {
        let (store, mut controller, mut rx) = controller();
        controller.on_input("Sp");
        assert_eq!(controller.add_selected(), Ok(None));
        assert!(store.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_rolls_back_and_stays_on_screen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        let store = Arc::new(LocalStore::open(&path).unwrap());
        store.save().unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let lookup = Arc::new(FixedLookup(vec!["Quito,Pichincha,Ecuador".into()]));
        let mut controller = SearchController::new(lookup, SearchSettings::default(), store.clone(), tx);
        controller.on_input("Quit");
        settle(&mut controller).await;

        assert!(matches!(controller.add_selected(), Err(PersistenceError::Io(_))));
        assert!(store.is_empty());
        assert!(rx.try_recv().is_err());
        assert_eq!(controller.results().len(), 1);
    }
}
