//! Utility functions for rendering UI components

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, List, ListItem, ListState},
    Frame,
};

pub fn render_scrollable_list(
    frame: &mut Frame,
    area: Rect,
    items: Vec<ListItem>,
    selected_index: usize,
    block: Block,
) {
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default()); // Highlight handled by item styles

    let mut list_state = ListState::default();
    list_state.select(Some(selected_index));

    frame.render_stateful_widget(list, area, &mut list_state);
}

pub fn row_style(selected: bool) -> Style {
    if selected {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

/// Whole degrees Celsius, `-0` shown as `0`.
pub fn format_temperature(celsius: f64) -> String {
    let rounded = celsius.round();
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.0}°C", rounded)
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_width)
    } else {
        format!("{:<width$}", s, width = max_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperatures_round_to_whole_degrees() {
        assert_eq!(format_temperature(21.4), "21°C");
        assert_eq!(format_temperature(-0.3), "0°C");
        assert_eq!(format_temperature(-7.6), "-8°C");
    }

    #[test]
    fn long_names_are_truncated_and_padded() {
        assert_eq!(truncate_string("Oslo", 6), "Oslo  ");
        assert_eq!(truncate_string("Llanfairpwllgwyngyll", 8), "Llanf...");
    }
}
