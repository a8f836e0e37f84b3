//! Station selector TUI main loop.

use std::collections::BTreeSet;
use std::io;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use super::state::{InputMode, SelectorResult, StationEntry, StationSelectorState};
use super::ui;

/// Runs the station selector TUI and returns the enabled station IDs.
///
/// Returns `None` if the user cancels, or `Some(selected)` if confirmed.
///
/// # Errors
///
/// Returns an error if terminal setup or event handling fails.
pub fn run_station_selector(
    stations: Vec<StationEntry>,
    initial_selected: BTreeSet<String>,
) -> Result<Option<Vec<String>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)
        .context("failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    let mut state = StationSelectorState::new(stations, initial_selected);

    let result = run_event_loop(&mut terminal, &mut state);

    // Cleanup (always attempt even if event loop failed)
    disable_raw_mode().context("failed to disable raw mode")?;
    crossterm::execute!(io::stdout(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;

    match result? {
        SelectorResult::Confirmed => Ok(Some(state.selected_ids())),
        SelectorResult::Cancelled => Ok(None),
    }
}

/// Main event loop.
fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut StationSelectorState,
) -> Result<SelectorResult> {
    loop {
        terminal
            .draw(|frame| ui::draw(frame, state))
            .context("failed to draw TUI")?;

        if event::poll(std::time::Duration::from_millis(100)).context("failed to poll events")?
            && let Event::Key(key) = event::read().context("failed to read event")?
            && key.kind == KeyEventKind::Press
        {
            let outcome = match state.input_mode {
                InputMode::Filter => handle_filter_input(state, key.code),
                InputMode::Normal => handle_normal_input(state, key.code, key.modifiers),
            };
            if let Some(result) = outcome {
                return Ok(result);
            }
        }
    }
}

/// Handles key input in filter mode. Returns `Some` to exit the loop.
fn handle_filter_input(state: &mut StationSelectorState, key: KeyCode) -> Option<SelectorResult> {
    match key {
        KeyCode::Esc => {
            state.set_filter(String::new());
            state.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            state.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            state.filter_pop();
        }
        KeyCode::Char(c) => {
            state.filter_push(c);
        }
        _ => {}
    }
    None
}

/// Handles key input in normal mode. Returns `Some` to exit the loop.
fn handle_normal_input(
    state: &mut StationSelectorState,
    key: KeyCode,
    modifiers: KeyModifiers,
) -> Option<SelectorResult> {
    match key {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            return Some(SelectorResult::Cancelled);
        }
        KeyCode::Char('q') | KeyCode::Esc => return Some(SelectorResult::Cancelled),
        KeyCode::Enter => return Some(SelectorResult::Confirmed),
        KeyCode::Up | KeyCode::Char('k') => state.move_up(),
        KeyCode::Down | KeyCode::Char('j') => state.move_down(),
        KeyCode::Char(' ') => state.toggle_current(),
        KeyCode::Char('a') => state.select_all_visible(),
        KeyCode::Char('A') => state.deselect_all_visible(),
        KeyCode::Char('/') => {
            state.input_mode = InputMode::Filter;
        }
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_state() -> StationSelectorState {
        StationSelectorState::new(
            vec![
                StationEntry {
                    station_id: String::from("QRR"),
                    name: String::from("文化放送"),
                },
                StationEntry {
                    station_id: String::from("TBS"),
                    name: String::from("TBSラジオ"),
                },
            ],
            BTreeSet::new(),
        )
    }

    #[test]
    fn test_normal_keys_exit_loop() {
        // Arrange
        let mut state = make_state();

        // Act & Assert
        assert_eq!(
            handle_normal_input(&mut state, KeyCode::Enter, KeyModifiers::NONE),
            Some(SelectorResult::Confirmed)
        );
        assert_eq!(
            handle_normal_input(&mut state, KeyCode::Char('q'), KeyModifiers::NONE),
            Some(SelectorResult::Cancelled)
        );
        assert_eq!(
            handle_normal_input(&mut state, KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(SelectorResult::Cancelled)
        );
    }

    #[test]
    fn test_space_toggles_and_slash_enters_filter() {
        // Arrange
        let mut state = make_state();

        // Act
        handle_normal_input(&mut state, KeyCode::Char(' '), KeyModifiers::NONE);
        handle_normal_input(&mut state, KeyCode::Char('/'), KeyModifiers::NONE);

        // Assert
        assert!(state.selected.contains("QRR"));
        assert_eq!(state.input_mode, InputMode::Filter);
    }

    #[test]
    fn test_filter_mode_typing_and_escape() {
        // Arrange
        let mut state = make_state();
        state.input_mode = InputMode::Filter;

        // Act
        handle_filter_input(&mut state, KeyCode::Char('t'));
        let filtered = state.filtered_stations().len();
        handle_filter_input(&mut state, KeyCode::Esc);

        // Assert
        assert_eq!(filtered, 1);
        assert!(state.filter.is_empty());
        assert_eq!(state.input_mode, InputMode::Normal);
    }
}
