//! Station selector state management.

use std::collections::BTreeSet;

/// A single selectable station.
#[derive(Debug, Clone)]
pub struct StationEntry {
    /// Station ID.
    pub station_id: String,
    /// Station name.
    pub name: String,
}

/// Input mode for the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode.
    Normal,
    /// Filter text input mode.
    Filter,
}

/// Result of the TUI interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorResult {
    /// User confirmed the selection.
    Confirmed,
    /// User cancelled.
    Cancelled,
}

/// State for the station selector TUI.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct StationSelectorState {
    /// Catalog stations in display order.
    pub stations: Vec<StationEntry>,
    /// Currently enabled station IDs.
    pub selected: BTreeSet<String>,
    /// Cursor position within the filtered list.
    pub cursor: usize,
    /// Current input mode.
    pub input_mode: InputMode,
    /// Filter text.
    pub filter: String,
    /// Cached indices of stations matching the filter.
    filtered_indices: Vec<usize>,
}

impl StationSelectorState {
    /// Creates a new state from the catalog and the current enabled set.
    #[must_use]
    pub fn new(stations: Vec<StationEntry>, selected: BTreeSet<String>) -> Self {
        let mut state = Self {
            stations,
            selected,
            cursor: 0,
            input_mode: InputMode::Normal,
            filter: String::new(),
            filtered_indices: Vec::new(),
        };
        state.rebuild_filter_cache();
        state
    }

    /// Returns the number of catalog stations.
    #[must_use]
    pub const fn total_stations(&self) -> usize {
        self.stations.len()
    }

    /// Returns the number of enabled stations.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Returns indices of stations matching the filter.
    #[must_use]
    pub fn filtered_stations(&self) -> &[usize] {
        &self.filtered_indices
    }

    /// Returns the station under the cursor.
    #[must_use]
    pub fn current_station(&self) -> Option<&StationEntry> {
        let idx = self.filtered_indices.get(self.cursor)?;
        self.stations.get(*idx)
    }

    /// Moves the cursor up.
    pub const fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Moves the cursor down.
    pub fn move_down(&mut self) {
        let next = self.cursor.saturating_add(1);
        if next < self.filtered_indices.len() {
            self.cursor = next;
        }
    }

    /// Toggles the station under the cursor.
    pub fn toggle_current(&mut self) {
        let Some(station_id) = self.current_station().map(|s| s.station_id.clone()) else {
            return;
        };
        if !self.selected.remove(&station_id) {
            self.selected.insert(station_id);
        }
    }

    /// Enables every station matching the filter.
    pub fn select_all_visible(&mut self) {
        for idx in &self.filtered_indices {
            if let Some(s) = self.stations.get(*idx) {
                self.selected.insert(s.station_id.clone());
            }
        }
    }

    /// Disables every station matching the filter.
    pub fn deselect_all_visible(&mut self) {
        for idx in &self.filtered_indices {
            if let Some(s) = self.stations.get(*idx) {
                self.selected.remove(&s.station_id);
            }
        }
    }

    /// Enabled IDs in catalog order, followed by IDs unknown to the catalog.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .stations
            .iter()
            .filter(|s| self.selected.contains(&s.station_id))
            .map(|s| s.station_id.clone())
            .collect();
        let known: BTreeSet<&str> = self.stations.iter().map(|s| s.station_id.as_str()).collect();
        ids.extend(
            self.selected
                .iter()
                .filter(|id| !known.contains(id.as_str()))
                .cloned(),
        );
        ids
    }

    /// Updates the filter and rebuilds the cache.
    pub fn set_filter(&mut self, filter: String) {
        self.filter = filter;
        self.rebuild_filter_cache();
        self.cursor = 0;
    }

    /// Appends a character to the filter.
    pub fn filter_push(&mut self, ch: char) {
        self.filter.push(ch);
        self.rebuild_filter_cache();
        self.cursor = 0;
    }

    /// Removes the last character from the filter.
    pub fn filter_pop(&mut self) {
        self.filter.pop();
        self.rebuild_filter_cache();
        self.cursor = self.cursor.min(self.filtered_indices.len().saturating_sub(1));
    }

    /// Rebuilds the filter cache (case-insensitive match on ID or name).
    fn rebuild_filter_cache(&mut self) {
        let filter_lower = self.filter.to_lowercase();
        self.filtered_indices = self
            .stations
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                filter_lower.is_empty()
                    || s.station_id.to_lowercase().contains(&filter_lower)
                    || s.name.to_lowercase().contains(&filter_lower)
            })
            .map(|(i, _)| i)
            .collect();
    }
}
