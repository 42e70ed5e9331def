//! Main application model with state management
//!
//! Owned by the UI task; nothing here is shared across tasks.

use std::time::{Duration, Instant};

use super::types::{Notice, Screen, UiState};

/// Confirmations close on their own after this long. Errors wait for the user.
const NOTICE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Default)]
pub struct AppModel {
    ui_state: UiState,
    should_quit: bool,
}

impl AppModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui_state
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn set_should_quit(&mut self, quit: bool) {
        self.should_quit = quit;
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn screen(&self) -> Screen {
        self.ui_state.screen
    }

    pub fn navigate_to(&mut self, screen: Screen) {
        if self.ui_state.screen != screen {
            tracing::debug!(from = ?self.ui_state.screen, to = ?screen, "Navigating");
            self.ui_state.screen = screen;
        }
    }

    // ========================================================================
    // Text input
    // ========================================================================

    fn active_input(&mut self) -> Option<&mut String> {
        match self.ui_state.screen {
            Screen::Favorites => Some(&mut self.ui_state.filter_input),
            Screen::Search => Some(&mut self.ui_state.search_input),
            Screen::Detail => None,
        }
    }

    /// Append to the current screen's input and return its new contents.
    pub fn append_to_input(&mut self, c: char) -> Option<String> {
        let input = self.active_input()?;
        input.push(c);
        Some(input.clone())
    }

    pub fn backspace_input(&mut self) -> Option<String> {
        let input = self.active_input()?;
        input.pop();
        Some(input.clone())
    }

    pub fn clear_input(&mut self) -> Option<String> {
        let input = self.active_input()?;
        input.clear();
        Some(String::new())
    }

    // ========================================================================
    // Notices & Help
    // ========================================================================

    pub fn set_notice(&mut self, notice: Notice) {
        if notice.is_error() {
            tracing::warn!(?notice, "Showing notice");
        }
        self.ui_state.notice = Some(notice);
        self.ui_state.notice_timestamp = Some(Instant::now());
    }

    pub fn clear_notice(&mut self) -> Option<Notice> {
        self.ui_state.notice_timestamp = None;
        self.ui_state.notice.take()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.ui_state.notice.as_ref()
    }

    pub fn has_notice(&self) -> bool {
        self.ui_state.notice.is_some()
    }

    pub fn auto_clear_old_notices(&mut self) {
        let expired = match (&self.ui_state.notice, self.ui_state.notice_timestamp) {
            (Some(notice), Some(shown)) => !notice.is_error() && shown.elapsed() >= NOTICE_TIMEOUT,
            _ => false,
        };
        if expired {
            self.clear_notice();
        }
    }

    pub fn show_help_popup(&mut self) {
        self.ui_state.show_help_popup = true;
    }

    pub fn hide_help_popup(&mut self) {
        self.ui_state.show_help_popup = false;
    }

    pub fn is_help_popup_open(&self) -> bool {
        self.ui_state.show_help_popup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_follows_the_active_screen() {
        let mut model = AppModel::new();
        assert_eq!(model.append_to_input('P'), Some("P".to_string()));

        model.navigate_to(Screen::Search);
        model.append_to_input('L');
        assert_eq!(model.append_to_input('i'), Some("Li".to_string()));
        assert_eq!(model.backspace_input(), Some("L".to_string()));

        assert_eq!(model.ui_state().filter_input, "P");
        assert_eq!(model.ui_state().search_input, "L");

        model.navigate_to(Screen::Detail);
        assert_eq!(model.append_to_input('x'), None);
        assert_eq!(model.clear_input(), None);
    }

    #[test]
    fn confirmations_expire_but_errors_stay() {
        let mut model = AppModel::new();
        model.set_notice(Notice::CityAdded { name: "Oslo".into() });
        model.ui_state.notice_timestamp = Some(Instant::now() - NOTICE_TIMEOUT);
        model.auto_clear_old_notices();
        assert!(!model.has_notice());

        model.set_notice(Notice::Offline);
        model.ui_state.notice_timestamp = Some(Instant::now() - NOTICE_TIMEOUT * 10);
        model.auto_clear_old_notices();
        assert_eq!(model.notice(), Some(&Notice::Offline));
        assert_eq!(model.clear_notice(), Some(Notice::Offline));
    }
}
