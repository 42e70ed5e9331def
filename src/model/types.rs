//! Core type definitions for the application

use std::time::Instant;

/// Which screen is showing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Favorites,
    Search,
    Detail,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Favorites => " Favourites ",
            Screen::Search => " Add City ",
            Screen::Detail => " Weather ",
        }
    }
}

/// A message shown to the user in a modal overlay
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    CityAdded { name: String },
    Offline,
    ForecastUnavailable { city: String },
    SaveFailed { message: String },
    ListFault { message: String },
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::CityAdded { .. } => " City added ",
            Notice::Offline => " No connection ",
            Notice::ForecastUnavailable { .. } => " Forecast unavailable ",
            Notice::SaveFailed { .. } => " Could not save ",
            Notice::ListFault { .. } => " List out of sync ",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::CityAdded { name } => format!("{} was added to your favourites.", name),
            Notice::Offline => {
                "Could not reach the weather service. Check your connection and try again.".to_string()
            }
            Notice::ForecastUnavailable { city } => {
                format!("Could not find a forecast for {}.", city)
            }
            Notice::SaveFailed { message } => format!("Your change was not saved: {}", message),
            Notice::ListFault { message } => {
                format!("The list stopped updating and will be reloaded: {}", message)
            }
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::CityAdded { .. })
    }
}

/// UI state for the application
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub screen: Screen,
    pub filter_input: String,
    pub search_input: String,
    pub notice: Option<Notice>,
    pub notice_timestamp: Option<Instant>,
    pub show_help_popup: bool,
}
