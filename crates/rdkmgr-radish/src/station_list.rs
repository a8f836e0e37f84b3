//! Station list export (`radish-play.sh -l`) and its parser.
//!
//! # Input format
//!
//! ```text
//! radiko,TBS,TBSラジオ
//! radiko,QRR,文化放送
//! nhk,r1,NHKラジオ第1
//! ```

use anyhow::{Context, Result};
use tracing::instrument;

use crate::command::run_capture;
use crate::config::RadishConfig;

/// Number of comma-separated fields in a station line. The last one takes
/// the rest of the line, commas included.
const STATION_FIELDS: usize = 3;

/// One parsed `service,station_id,name` line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct StationRow {
    /// Service name.
    pub service: String,
    /// Station ID.
    pub station_id: String,
    /// Display name.
    pub name: String,
}

/// Result of parsing a station list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct StationList {
    /// Accepted rows for the requested service, in input order.
    pub stations: Vec<StationRow>,
    /// Malformed lines (fewer than 3 fields).
    pub skipped: usize,
    /// Well-formed lines of another service (not an error).
    pub filtered: usize,
}

/// Parses station list output, keeping rows of `service` only.
///
/// A line is split on its first two commas, so a name may contain commas.
/// Lines with fewer than three fields increment [`StationList::skipped`].
/// Blank lines are ignored.
#[must_use]
#[allow(clippy::module_name_repetitions)]
pub fn parse_station_list(text: &str, service: &str) -> StationList {
    let mut list = StationList::default();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut fields = line.splitn(STATION_FIELDS, ',').map(str::trim);
        let (Some(svc), Some(id), Some(name)) = (fields.next(), fields.next(), fields.next())
        else {
            tracing::debug!(line, "Skipping malformed station line");
            list.skipped = list.skipped.saturating_add(1);
            continue;
        };

        if svc != service {
            list.filtered = list.filtered.saturating_add(1);
            continue;
        }

        list.stations.push(StationRow {
            service: String::from(svc),
            station_id: String::from(id),
            name: String::from(name),
        });
    }

    list
}

/// Runs `{play_script} -l` and parses its output for the configured service.
///
/// # Errors
///
/// Returns an error if the external command fails.
#[instrument(skip_all)]
#[allow(clippy::module_name_repetitions)]
pub async fn fetch_station_list(config: &RadishConfig) -> Result<StationList> {
    let stdout = run_capture(&config.shell, &config.play_script, &["-l"])
        .await
        .context("station list command failed")?;
    Ok(parse_station_list(&stdout, &config.service))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_parse_accepts_three_field_lines() {
        // Arrange
        let text = "radiko,TBS,TBSラジオ\nradiko,QRR,文化放送\n";

        // Act
        let list = parse_station_list(text, "radiko");

        // Assert
        assert_eq!(list.stations.len(), 2);
        assert_eq!(list.stations[0].station_id, "TBS");
        assert_eq!(list.stations[1].name, "文化放送");
        assert_eq!(list.skipped, 0);
    }

    #[test]
    fn test_parse_skips_lines_with_too_few_fields() {
        // Arrange
        let text = "radiko,TBS,TBSラジオ\nradiko,BROKEN\njunk\n";

        // Act
        let list = parse_station_list(text, "radiko");

        // Assert
        assert_eq!(list.stations.len(), 1);
        assert_eq!(list.skipped, 2);
    }

    #[test]
    fn test_parse_keeps_commas_in_station_name() {
        // Arrange
        let text = "radiko,ABC,Foo, Bar Radio\nradiko,A,B,C\n";

        // Act
        let list = parse_station_list(text, "radiko");

        // Assert
        assert_eq!(list.skipped, 0);
        assert_eq!(list.stations.len(), 2);
        assert_eq!(list.stations[0].station_id, "ABC");
        assert_eq!(list.stations[0].name, "Foo, Bar Radio");
        assert_eq!(list.stations[1].name, "B,C");
    }

    #[test]
    fn test_parse_filters_other_services_without_counting_skips() {
        // Arrange
        let text = "radiko,TBS,TBSラジオ\nnhk,r1,NHKラジオ第1\nnhk,fm,NHK-FM\n";

        // Act
        let list = parse_station_list(text, "radiko");

        // Assert
        assert_eq!(list.stations.len(), 1);
        assert_eq!(list.filtered, 2);
        assert_eq!(list.skipped, 0);
    }

    #[test]
    fn test_parse_other_service_filter() {
        // Arrange
        let text = "radiko,TBS,TBSラジオ\nnhk,r1,NHKラジオ第1\n";

        // Act
        let list = parse_station_list(text, "nhk");

        // Assert
        assert_eq!(list.stations.len(), 1);
        assert_eq!(list.stations[0].station_id, "r1");
    }

    #[test]
    fn test_parse_trims_whitespace_and_ignores_blank_lines() {
        // Arrange
        let text = "\n  radiko, LFR ,ニッポン放送  \n\n";

        // Act
        let list = parse_station_list(text, "radiko");

        // Assert
        assert_eq!(list.stations.len(), 1);
        assert_eq!(list.stations[0].station_id, "LFR");
        assert_eq!(list.stations[0].name, "ニッポン放送");
        assert_eq!(list.skipped, 0);
    }

    #[test]
    fn test_parse_empty_input() {
        // Arrange & Act
        let list = parse_station_list("", "radiko");

        // Assert
        assert_eq!(list, StationList::default());
    }
}
