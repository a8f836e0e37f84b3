//! TUI rendering logic for the station selector.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use super::state::{InputMode, StationSelectorState};

/// Draws the station selector UI.
#[allow(clippy::indexing_slicing)]
pub fn draw(frame: &mut Frame, state: &StationSelectorState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(5),    // station list
            Constraint::Length(3), // footer
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], state);
    draw_stations(frame, chunks[1], state);
    draw_footer(frame, chunks[2], state);
}

/// Draws the header with filter input and selection count.
#[allow(clippy::indexing_slicing)]
fn draw_header(frame: &mut Frame, area: Rect, state: &StationSelectorState) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let filter_style = if state.input_mode == InputMode::Filter {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let filter = Paragraph::new(state.filter.as_str())
        .style(filter_style)
        .block(Block::default().borders(Borders::ALL).title(" Filter: / "));
    frame.render_widget(filter, header_chunks[0]);

    let count_text = format!(
        "Enabled: {} / {}",
        state.selected_count(),
        state.total_stations()
    );
    let count = Paragraph::new(count_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Enabled Stations "),
    );
    frame.render_widget(count, header_chunks[1]);
}

/// Draws the checkbox list of stations.
fn draw_stations(frame: &mut Frame, area: Rect, state: &StationSelectorState) {
    let items: Vec<ListItem> = state
        .filtered_stations()
        .iter()
        .enumerate()
        .filter_map(|(i, &idx)| {
            let station = state.stations.get(idx)?;
            let enabled = state.selected.contains(&station.station_id);
            let checkbox = if enabled { "[x]" } else { "[ ]" };

            let style = if i == state.cursor {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else if enabled {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };

            Some(ListItem::new(Line::from(vec![Span::styled(
                format!(" {checkbox} {:<12} {}", station.station_id, station.name),
                style,
            )])))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Stations "),
    );

    // ListState keeps the cursor row scrolled into view.
    let mut list_state = ListState::default().with_selected(Some(state.cursor));
    frame.render_stateful_widget(list, area, &mut list_state);
}

/// Draws the footer with key hints.
fn draw_footer(frame: &mut Frame, area: Rect, state: &StationSelectorState) {
    let help_text = if state.input_mode == InputMode::Filter {
        "Type to filter | Esc: cancel filter | Enter: apply"
    } else {
        "\u{2191}\u{2193}/j/k: move  Space: toggle  a: enable shown  A: disable shown  /: filter  Enter: confirm  q: cancel"
    };

    let footer = Paragraph::new(help_text).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}
