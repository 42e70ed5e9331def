//! Screen bodies (favourites list, search results, weather detail)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, ListItem, Padding, Paragraph},
    Frame,
};

use crate::controller::{DetailController, DetailState, FavoritesController, SearchController};
use crate::model::{CityWeather, IndexPath, ListSource};
use super::utils::{format_temperature, render_scrollable_list, row_style, truncate_string};

fn content_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding::horizontal(1))
        .border_style(Style::default().fg(Color::Green))
}

fn render_hint(frame: &mut Frame, area: Rect, title: &str, text: &str) {
    let hint = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::DarkGray))
        .block(content_block(title));
    frame.render_widget(hint, area);
}

pub fn render_favorites(frame: &mut Frame, area: Rect, favorites: &FavoritesController) {
    if favorites.is_empty() {
        let text = if favorites.filter().is_empty() {
            "No favourite cities yet\n\nPress Tab to search for a city and add it"
        } else {
            "No favourites match this filter"
        };
        render_hint(frame, area, " Favourites ", text);
        return;
    }

    let name_width = (area.width as usize).saturating_sub(4) * 6 / 10;
    let selected_path = favorites.selected_path();
    let source = favorites.source();

    let mut items = Vec::new();
    for section in 0..source.section_count() {
        for row in 0..source.row_count(section) {
            let path = IndexPath::new(section, row);
            let Some(record) = source.item(path) else {
                continue;
            };
            let city = &record.value;
            let line = format!("{}  {}", truncate_string(&city.name, name_width), city.country);
            items.push(ListItem::new(line).style(row_style(selected_path == Some(path))));
        }
    }

    let title = if favorites.is_faulted() {
        " Favourites (out of date) "
    } else {
        " Favourites "
    };
    render_scrollable_list(frame, area, items, favorites.list().selected(), content_block(title));
}

pub fn render_search_results(frame: &mut Frame, area: Rect, search: &SearchController) {
    let state = search.search();

    if search.results().is_empty() {
        let text = if let Some(error) = state.last_error() {
            format!("Search failed: {}", error)
        } else if state.is_loading() {
            "Searching...".to_string()
        } else {
            format!(
                "Type at least {} letters to search",
                state.settings().min_query_len + 1
            )
        };
        render_hint(frame, area, " Results ", &text);
        return;
    }

    let width = (area.width as usize).saturating_sub(4);
    let items: Vec<ListItem> = search
        .results()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut spans = vec![Span::raw(item.name().to_string())];
            if !item.region().is_empty() {
                spans.push(Span::styled(format!(", {}", item.region()), Style::default().fg(Color::DarkGray)));
            }
            if !item.country().is_empty() {
                spans.push(Span::raw(format!(", {}", item.country())));
            }
            let line = Line::from(spans);
            if line.width() > width {
                ListItem::new(truncate_string(item.raw(), width)).style(row_style(i == search.selected()))
            } else {
                ListItem::new(line).style(row_style(i == search.selected()))
            }
        })
        .collect();

    let title = match state.last_error() {
        Some(_) => " Results (last search failed) ",
        None => " Results ",
    };
    render_scrollable_list(frame, area, items, search.selected(), content_block(title));
}

pub fn render_detail(frame: &mut Frame, area: Rect, detail: &DetailController) {
    let title = detail
        .city()
        .map(|city| {
            if city.country.is_empty() {
                format!(" {} ", city.name)
            } else {
                format!(" {}, {} ", city.name, city.country)
            }
        })
        .unwrap_or_else(|| " Weather ".to_string());

    match detail.state() {
        DetailState::Idle => render_hint(frame, area, &title, ""),
        DetailState::Loading => render_hint(frame, area, &title, "Loading current weather..."),
        DetailState::Failed(error) => {
            render_hint(frame, area, &title, &format!("No forecast available ({})\n\nPress R to retry", error))
        }
        DetailState::Loaded(weather) => {
            let paragraph = Paragraph::new(weather_lines(weather)).block(content_block(&title));
            frame.render_widget(paragraph, area);
        }
    }
}

fn weather_lines(weather: &CityWeather) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::Cyan);
    let field = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<12}", name), label),
            Span::raw(value),
        ])
    };

    vec![
        Line::from(Span::styled(
            format_temperature(weather.temp),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(weather.description.clone()),
        Line::from(""),
        field(
            "Min / Max",
            format!("{} / {}", format_temperature(weather.temp_min), format_temperature(weather.temp_max)),
        ),
        field("Feels like", format_temperature(weather.feels_like)),
        field("Pressure", format!("{} hPa", weather.pressure)),
        field("Humidity", format!("{}%", weather.humidity)),
        field("Icon", weather.icon.clone()),
        Line::from(""),
        Line::from(Span::styled(
            format!("Updated {}", weather.fetched_at.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::TransportError;
    use crate::model::{CityLookup, FavoriteCity, LocalStore, SearchSettings};

    struct NoLookup;

    #[async_trait]
    impl CityLookup for NoLookup {
        async fn autocomplete(&self, _query: &str) -> Result<Vec<String>, TransportError> {
            Ok(Vec::new())
        }
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn search_hint_follows_minimum_query_length() {
        let settings = SearchSettings {
            min_query_len: 4,
            ..SearchSettings::default()
        };
        let (tx, _rx) = mpsc::unbounded_channel();
        let store = Arc::new(LocalStore::<FavoriteCity>::in_memory());
        let search = SearchController::new(Arc::new(NoLookup), settings, store, tx);

        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                render_search_results(frame, area, &search);
            })
            .unwrap();
        assert!(screen_text(&terminal).contains("Type at least 5 letters to search"));
    }
}
