//! Model module - Application state and data types
//!
//! This module contains the data structures, the live list machinery and the
//! remote clients. It is organized into submodules by responsibility:
//!
//! - `types`: Core type definitions (screens, notices, UI state)
//! - `predicate`: Filter expressions and sort descriptors over record fields
//! - `changes`: Records, snapshots, change batches and snapshot diffing
//! - `store`: Queryable record store with live views
//! - `list_sync`: List data source kept in sync with a store view
//! - `list_view`: Visible-list state driven by change batches
//! - `city`: Favourite cities and autocomplete entries
//! - `weather_api`: HTTP client for autocomplete and current weather
//! - `search`: Debounced, cancellable city search
//! - `app_model`: Main application model with state management methods

mod types;
mod predicate;
mod changes;
mod store;
mod list_sync;
mod list_view;
mod city;
mod weather_api;
mod search;
mod app_model;

// Re-export all public types for convenient access
pub use types::{Notice, Screen, UiState};

pub use predicate::{Predicate, SortDescriptor};

pub use changes::{IndexPath, Record, RecordId};

pub use store::{LocalStore, QueryableStore, ViewSpec};

pub use list_sync::{ActionLabel, ListSource, ListSyncEngine, RowAction};

pub use list_view::ListViewState;

pub use city::{CityListItem, FavoriteCity};

pub use weather_api::{CityLookup, CityWeather, WeatherApi, WeatherSource};

pub use search::{DebouncedSearch, SearchSettings, SearchUpdate};

pub use app_model::AppModel;
