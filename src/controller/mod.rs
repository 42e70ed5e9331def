//! Controller module - Application logic and event handling
//!
//! The controller owns the model and every screen controller and runs on the
//! UI task only. Background work (searches, weather fetches, store
//! notifications) reports back over channels and is applied in `tick`.
//!
//! - `input`: Key event handling
//! - `favorites`: Favourites list bound to the store
//! - `search`: Add-city screen fed by the debounced search
//! - `detail`: Current weather for a favourite

mod input;
mod favorites;
mod search;
mod detail;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ListError;
use crate::model::{AppModel, CityLookup, FavoriteCity, Notice, QueryableStore, Screen, SearchSettings, WeatherSource};

pub use detail::{DetailController, DetailState};
pub use favorites::{action_key, FavoritesController};
pub use search::SearchController;

/// Screen changes requested from callbacks that cannot reach the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    OpenDetail(FavoriteCity),
    Back,
}

pub struct AppController {
    pub(crate) model: AppModel,
    pub(crate) favorites: FavoritesController,
    pub(crate) search: SearchController,
    pub(crate) detail: DetailController,
    navigation: mpsc::UnboundedReceiver<Navigation>,
}

impl AppController {
    pub fn new(
        store: Arc<dyn QueryableStore<FavoriteCity>>,
        lookup: Arc<dyn CityLookup>,
        weather: Arc<dyn WeatherSource>,
        settings: SearchSettings,
    ) -> Result<Self, ListError> {
        let (tx, navigation) = mpsc::unbounded_channel();
        Ok(Self {
            model: AppModel::new(),
            favorites: FavoritesController::new(store.clone(), tx.clone())?,
            search: SearchController::new(lookup, settings, store, tx),
            detail: DetailController::new(weather),
            navigation,
        })
    }

    pub fn model(&self) -> &AppModel {
        &self.model
    }

    pub fn favorites(&self) -> &FavoritesController {
        &self.favorites
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub fn detail(&self) -> &DetailController {
        &self.detail
    }

    pub fn should_quit(&self) -> bool {
        self.model.should_quit()
    }

    /// Apply everything that arrived from the store and background tasks.
    pub fn tick(&mut self) {
        if let Err(e) = self.favorites.sync() {
            self.model.set_notice(Notice::ListFault {
                message: e.to_string(),
            });
        }
        self.search.poll();
        if let Some(notice) = self.detail.poll() {
            self.model.set_notice(notice);
        }
        while let Ok(navigation) = self.navigation.try_recv() {
            self.navigate(navigation);
        }
        self.model.auto_clear_old_notices();
    }

    pub(crate) fn navigate(&mut self, navigation: Navigation) {
        match navigation {
            Navigation::OpenDetail(city) => {
                self.detail.open(city);
                self.model.navigate_to(Screen::Detail);
            }
            Navigation::Back => self.go_back(),
        }
    }

    pub(crate) fn go_back(&mut self) {
        match self.model.screen() {
            Screen::Favorites => {}
            Screen::Search => {
                self.model.clear_input();
                self.search.on_input("");
                self.model.navigate_to(Screen::Favorites);
            }
            Screen::Detail => {
                self.detail.close();
                self.model.navigate_to(Screen::Favorites);
            }
        }
    }

    /// Dismiss the current notice and recover from whatever raised it.
    pub(crate) fn dismiss_notice(&mut self) {
        match self.model.clear_notice() {
            Some(Notice::ListFault { .. }) => self.reload_favorites(),
            Some(Notice::Offline | Notice::ForecastUnavailable { .. }) => {
                if self.model.screen() == Screen::Detail {
                    self.go_back();
                }
            }
            _ => {}
        }
    }

    pub(crate) fn reload_favorites(&mut self) {
        if let Err(e) = self.favorites.reload() {
            tracing::error!(error = %e, "Could not reopen favourites");
            self.model.set_notice(Notice::ListFault {
                message: e.to_string(),
            });
        }
    }

    pub(crate) fn report_list_error(&mut self, error: ListError) {
        let notice = match error {
            ListError::Persistence(e) => Notice::SaveFailed {
                message: e.to_string(),
            },
            other => Notice::ListFault {
                message: other.to_string(),
            },
        };
        self.model.set_notice(notice);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::*;
    use crate::error::TransportError;
    use crate::model::{CityWeather, LocalStore};

    struct Offline;

    #[async_trait]
    impl CityLookup for Offline {
        async fn autocomplete(&self, _query: &str) -> Result<Vec<String>, TransportError> {
            Ok(vec!["Quito,Pichincha,Ecuador".into()])
        }
    }

    #[async_trait]
    impl WeatherSource for Offline {
        async fn current_weather(&self, _city: &str) -> Result<CityWeather, TransportError> {
            Err(TransportError::Timeout)
        }
    }

    fn app() -> (Arc<LocalStore<FavoriteCity>>, AppController) {
        let store = Arc::new(LocalStore::in_memory());
        let controller = AppController::new(
            store.clone(),
            Arc::new(Offline),
            Arc::new(Offline),
            SearchSettings::default(),
        )
        .unwrap();
        (store, controller)
    }

    fn press(controller: &mut AppController, code: KeyCode) {
        controller.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(controller: &mut AppController, text: &str) {
        for c in text.chars() {
            press(controller, KeyCode::Char(c));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn add_city_then_open_detail_offline() {
        let (store, mut app) = app();

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.model().screen(), Screen::Search);
        type_text(&mut app, "Quit");
        tokio::time::sleep(Duration::from_secs(1)).await;
        app.tick();
        assert_eq!(app.search().results().len(), 1);

        press(&mut app, KeyCode::Enter);
        app.tick();
        assert_eq!(app.model().screen(), Screen::Favorites);
        assert_eq!(app.model().notice(), Some(&Notice::CityAdded { name: "Quito".into() }));
        assert_eq!(store.len(), 1);
        assert_eq!(app.favorites().list().len(), 1);

        app.dismiss_notice();
        press(&mut app, KeyCode::Enter);
        app.tick();
        assert_eq!(app.model().screen(), Screen::Detail);

        tokio::time::sleep(Duration::from_secs(1)).await;
        app.tick();
        assert_eq!(app.model().notice(), Some(&Notice::Offline));

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.model().screen(), Screen::Favorites);
        assert!(!app.model().has_notice());
    }

    #[tokio::test(start_paused = true)]
    async fn typing_on_favourites_filters_the_list() {
        let (store, mut app) = app();
        store.insert(FavoriteCity::new("Paris", "France"));
        store.insert(FavoriteCity::new("Lima", "Peru"));
        app.tick();
        assert_eq!(app.favorites().list().len(), 2);

        type_text(&mut app, "pa");
        assert_eq!(app.favorites().filter(), "pa");
        assert_eq!(app.favorites().list().len(), 1);

        press(&mut app, KeyCode::Delete);
        assert!(app.favorites().is_empty());
        assert_eq!(store.len(), 1);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.favorites().list().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ctrl_q_quits_from_any_screen() {
        let (_store, mut app) = app();
        press(&mut app, KeyCode::Tab);
        app.handle_key_event(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_saves_raise_a_notice_and_keep_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        let store = Arc::new(LocalStore::open(&path).unwrap());
        store.insert(FavoriteCity::new("Paris", "France"));
        store.save().unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let mut app = AppController::new(
            store.clone(),
            Arc::new(Offline),
            Arc::new(Offline),
            SearchSettings::default(),
        )
        .unwrap();

        press(&mut app, KeyCode::Delete);
        assert!(matches!(app.model().notice(), Some(Notice::SaveFailed { .. })));
        app.tick();
        assert_eq!(app.favorites().list().len(), 1);
        assert_eq!(store.len(), 1);
        press(&mut app, KeyCode::Enter);
        assert!(!app.model().has_notice());

        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Quit");
        tokio::time::sleep(Duration::from_secs(1)).await;
        app.tick();
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.model().notice(), Some(Notice::SaveFailed { .. })));

        app.tick();
        assert_eq!(app.model().screen(), Screen::Search);
        assert_eq!(store.len(), 1);
        assert_eq!(app.favorites().list().len(), 1);
    }
}
