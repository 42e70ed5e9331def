//! Overlay rendering (notices, help popup)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::model::Notice;

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

pub fn render_notice(frame: &mut Frame, notice: &Notice) {
    let area = frame.area();
    let message = notice.message();
    let color = if notice.is_error() { Color::Red } else { Color::Green };

    // Fixed width popup (responsive to screen size)
    let popup_width = 52.min(area.width.saturating_sub(4));
    let inner_width = popup_width.saturating_sub(4).max(1) as usize;

    // Wrapped message, a blank line and the dismiss hint, inside borders
    let message_lines = message.chars().count().div_ceil(inner_width).max(1) as u16;
    let popup_height = (message_lines + 4).min(area.height.saturating_sub(2));
    let popup_area = centered(area, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let hint = match notice {
        Notice::Offline | Notice::ForecastUnavailable { .. } => "Enter / Esc to go back",
        _ => "Enter / Esc to dismiss",
    };
    let lines = vec![
        Line::from(message),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
    ];

    let widget = Paragraph::new(lines)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(notice.title())
                .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        );

    frame.render_widget(widget, popup_area);
}

pub fn render_help_popup(frame: &mut Frame, min_search_letters: usize) {
    let area = frame.area();
    let search_hint = format!("Search ({}+ letters)", min_search_letters);

    let keybindings = [
        ("", "── Favourites ──"),
        ("type", "Filter by name prefix"),
        ("↑ / ↓", "Move selection"),
        ("Enter", "Show current weather"),
        ("Delete", "Remove favourite"),
        ("Esc", "Clear filter"),
        ("Tab", "Add a city"),
        ("", ""),
        ("", "── Add City ──"),
        ("type", search_hint.as_str()),
        ("↑ / ↓", "Move selection"),
        ("Enter", "Add to favourites"),
        ("Esc / Tab", "Back"),
        ("", ""),
        ("", "── Weather ──"),
        ("R", "Refresh"),
        ("Esc", "Back"),
        ("", ""),
        ("", "── General ──"),
        ("F1", "Toggle this help"),
        ("Ctrl+Q", "Quit"),
    ];

    let popup_height = (keybindings.len() as u16 + 2).min(area.height.saturating_sub(2));
    let popup_area = centered(area, 52.min(area.width), popup_height);

    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = keybindings
        .iter()
        .map(|(key, desc)| {
            if key.is_empty() {
                Line::from(Span::styled(
                    format!("{:^48}", desc),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("{:>12}", key),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(desc.to_string(), Style::default().fg(Color::White)),
                ])
            }
        })
        .collect();

    let help_text = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help (F1 or Esc to close) ")
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        )
        .style(Style::default().bg(Color::Black));

    frame.render_widget(help_text, popup_area);
}
