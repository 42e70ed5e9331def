//! Layout rendering (input bar, status bar)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

use crate::controller::{action_key, AppController, DetailState};
use crate::model::{Screen, UiState};

pub fn render_top_bar(frame: &mut Frame, area: Rect, ui_state: &UiState, app: &AppController) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Input
            Constraint::Length(22), // Counter / state
        ])
        .split(area);

    let (title, text, placeholder) = match ui_state.screen {
        Screen::Favorites => (" Filter ", ui_state.filter_input.as_str(), "Type to filter favourites..."),
        Screen::Search => (" Add City ", ui_state.search_input.as_str(), "Type a city name..."),
        Screen::Detail => (
            " City ",
            app.detail().city().map(|city| city.name.as_str()).unwrap_or_default(),
            "",
        ),
    };

    let (shown, style) = if text.is_empty() {
        (placeholder, Style::default().fg(Color::DarkGray))
    } else {
        (text, Style::default().fg(Color::Green))
    };

    let input = Paragraph::new(shown).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .padding(Padding::horizontal(1))
            .border_style(Style::default().fg(Color::Green)),
    );
    frame.render_widget(input, chunks[0]);

    let status = match ui_state.screen {
        Screen::Favorites => match app.favorites().list() {
            list if list.is_empty() => "No cities".to_string(),
            list if list.len() == 1 => "1 city".to_string(),
            list => format!("{} cities", list.len()),
        },
        Screen::Search if app.search().search().is_loading() => "Searching...".to_string(),
        Screen::Search => format!("{} results", app.search().results().len()),
        Screen::Detail => match app.detail().state() {
            DetailState::Loading => "Loading...".to_string(),
            DetailState::Loaded(_) => "Up to date".to_string(),
            DetailState::Failed(_) => "Unavailable".to_string(),
            DetailState::Idle => String::new(),
        },
    };
    let status = Paragraph::new(status)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(ui_state.screen.title()));
    frame.render_widget(status, chunks[1]);
}

pub fn render_status_bar(frame: &mut Frame, area: Rect, app: &AppController) {
    let key_style = Style::default().fg(Color::Black).bg(Color::Green);
    let fixed: &[(&str, &str)] = match app.model().screen() {
        Screen::Favorites => &[("↑↓", "move"), ("Enter", "weather")],
        Screen::Search => &[("↑↓", "move"), ("Enter", "add"), ("Esc", "back")],
        Screen::Detail => &[("R", "refresh"), ("Esc", "back")],
    };
    let mut hints: Vec<(&str, String, Style)> = fixed
        .iter()
        .map(|(key, action)| (*key, action.to_string(), key_style))
        .collect();

    if app.model().screen() == Screen::Favorites {
        // Row actions offered for the highlighted city
        for action in app.favorites().selected_actions() {
            if let Some(key) = action_key(&action.title) {
                let style = if action.destructive {
                    Style::default().fg(Color::White).bg(Color::Red)
                } else {
                    key_style
                };
                hints.push((key, action.title.to_lowercase(), style));
            }
        }
        hints.push(("Tab", "add city".to_string(), key_style));
    }
    hints.push(("F1", "help".to_string(), key_style));
    hints.push(("Ctrl+Q", "quit".to_string(), key_style));

    let mut spans = Vec::new();
    for (key, action, style) in hints {
        spans.push(Span::styled(format!(" {} ", key), style));
        spans.push(Span::raw(format!(" {}  ", action)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
