//! Key event handling

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::{Notice, Screen};
use super::AppController;

impl AppController {
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Ctrl+Q / Ctrl+C quit from anywhere, even with an overlay open
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
        {
            self.model.set_should_quit(true);
            return;
        }

        // Notices block all other interactions
        if self.model.has_notice() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.dismiss_notice();
            }
            return;
        }

        if self.model.is_help_popup_open() {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1)) {
                self.model.hide_help_popup();
            }
            return;
        }

        if key.code == KeyCode::F(1) {
            self.model.show_help_popup();
            return;
        }

        match self.model.screen() {
            Screen::Favorites => self.handle_favorites_key(key),
            Screen::Search => self.handle_search_key(key),
            Screen::Detail => self.handle_detail_key(key),
        }
    }

    fn handle_favorites_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.favorites.move_up(),
            KeyCode::Down => self.favorites.move_down(),
            KeyCode::Tab => self.model.navigate_to(Screen::Search),
            KeyCode::Enter => {
                if let Err(e) = self.favorites.open_selected() {
                    self.report_list_error(e);
                }
            }
            KeyCode::Delete => {
                if let Err(e) = self.favorites.delete_selected() {
                    self.report_list_error(e);
                }
            }
            KeyCode::Esc => {
                if let Some(filter) = self.model.clear_input() {
                    self.apply_filter(&filter);
                }
            }
            KeyCode::Backspace => {
                if let Some(filter) = self.model.backspace_input() {
                    self.apply_filter(&filter);
                }
            }
            KeyCode::Char(c) => {
                if let Some(filter) = self.model.append_to_input(c) {
                    self.apply_filter(&filter);
                }
            }
            _ => {}
        }
    }

    fn apply_filter(&mut self, filter: &str) {
        if let Err(e) = self.favorites.set_filter(filter) {
            self.report_list_error(e);
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.search.move_up(),
            KeyCode::Down => self.search.move_down(),
            KeyCode::Esc | KeyCode::Tab => self.go_back(),
            KeyCode::Enter => match self.search.add_selected() {
                Ok(Some(city)) => self.model.set_notice(Notice::CityAdded { name: city.name }),
                Ok(None) => {}
                Err(e) => self.model.set_notice(Notice::SaveFailed {
                    message: e.to_string(),
                }),
            },
            KeyCode::Backspace => {
                if let Some(query) = self.model.backspace_input() {
                    self.search.on_input(&query);
                }
            }
            KeyCode::Char(c) => {
                if let Some(query) = self.model.append_to_input(c) {
                    self.search.on_input(&query);
                }
            }
            _ => {}
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Backspace => self.go_back(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.detail.refresh(),
            KeyCode::Char('q') | KeyCode::Char('Q') => self.model.set_should_quit(true),
            _ => {}
        }
    }
}
