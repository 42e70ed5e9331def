//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared utility functions (formatting, scrollable lists)
//! - `layout`: Main layout structure (input bar, status bar)
//! - `content`: Screen bodies (favourites, search results, weather)
//! - `overlays`: Modal overlays (notices, help)

mod utils;
mod layout;
mod content;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::controller::AppController;
use crate::model::Screen;

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, app: &AppController) {
        let ui_state = app.model().ui_state();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Input bar
                Constraint::Min(0),    // Screen body
                Constraint::Length(1), // Key hints
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], ui_state, app);

        match ui_state.screen {
            Screen::Favorites => content::render_favorites(frame, chunks[1], app.favorites()),
            Screen::Search => content::render_search_results(frame, chunks[1], app.search()),
            Screen::Detail => content::render_detail(frame, chunks[1], app.detail()),
        }

        layout::render_status_bar(frame, chunks[2], app);

        if let Some(notice) = &ui_state.notice {
            overlays::render_notice(frame, notice);
        }

        if ui_state.show_help_popup {
            let min_letters = app.search().search().settings().min_query_len + 1;
            overlays::render_help_popup(frame, min_letters);
        }
    }
}
