//! Schedule export (`rx2`) and its tab-separated parser.
//!
//! # Input format
//!
//! ```text
//! station_id	prog_id	date	weekday	ftime	duration	title	url	pfm	info
//! TBS	12345	20240101	月	0900	30	番組名	https://…	出演者	説明
//! ```

use anyhow::{Context, Result, bail};
use tracing::instrument;

use crate::command::run_capture;
use crate::config::RadishConfig;

/// Leading column name that identifies a valid header line.
const HEADER_LEADING_FIELD: &str = "station_id";

/// Number of columns in a program row.
const PROGRAM_FIELDS: usize = 10;

/// One parsed program row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRow {
    /// Station ID.
    pub station_id: String,
    /// Program ID.
    pub prog_id: String,
    /// Broadcast date (`YYYYMMDD`).
    pub date: String,
    /// Weekday label.
    pub weekday: String,
    /// Start time (`HHMM`).
    pub start_time: String,
    /// Duration in minutes.
    pub duration_min: u32,
    /// Title.
    pub title: String,
    /// Homepage URL, `None` when the column is empty.
    pub url: Option<String>,
    /// Personality / host names.
    pub personality: String,
    /// Description.
    pub info: String,
}

/// Result of parsing a schedule export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramTable {
    /// Accepted rows, in input order.
    pub programs: Vec<ProgramRow>,
    /// Rows missing a required field.
    pub skipped: usize,
    /// Rows with a non-numeric duration or unreadable bytes.
    pub errors: usize,
}

/// Parses the schedule export.
///
/// The first line must be a header starting with `station_id`; otherwise
/// the whole input is rejected. Data lines are padded to ten columns and
/// columns past the tenth are folded back into `info`. A row needs
/// `station_id`, `prog_id`, `date`, `start_time` and `duration`; a
/// non-integer duration is logged and the row is dropped. Each row is
/// judged on its own.
///
/// # Errors
///
/// Returns an error if the input is empty or the header is missing.
pub fn parse_program_table(text: &str) -> Result<ProgramTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader.records();

    let header = records
        .next()
        .context("schedule output is empty")?
        .context("failed to read schedule header")?;
    if header.get(0) != Some(HEADER_LEADING_FIELD) {
        bail!(
            "schedule output has no `{HEADER_LEADING_FIELD}` header (got {:?})",
            header.get(0).unwrap_or_default()
        );
    }

    let mut table = ProgramTable::default();
    for (index, record) in records.enumerate() {
        let line_no = index.saturating_add(2);
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line = line_no, "Unreadable schedule line: {e}");
                table.errors = table.errors.saturating_add(1);
                continue;
            }
        };

        let fields = pad_fields(&record);
        match parse_row(&fields) {
            RowParse::Row(row) => table.programs.push(*row),
            RowParse::MissingField => {
                tracing::debug!(line = line_no, "Skipping row with missing required field");
                table.skipped = table.skipped.saturating_add(1);
            }
            RowParse::BadDuration(raw) => {
                tracing::warn!(
                    line = line_no,
                    station_id = fields.first().map_or("", String::as_str),
                    "Invalid duration {raw:?}, row skipped"
                );
                table.errors = table.errors.saturating_add(1);
            }
        }
    }

    Ok(table)
}

/// Outcome of parsing one data row.
enum RowParse {
    Row(Box<ProgramRow>),
    MissingField,
    BadDuration(String),
}

/// Pads a record to `PROGRAM_FIELDS` columns, joining any overflow into the last one.
fn pad_fields(record: &csv::StringRecord) -> Vec<String> {
    let mut fields: Vec<String> = record
        .iter()
        .take(PROGRAM_FIELDS.saturating_sub(1))
        .map(String::from)
        .collect();

    let rest: Vec<&str> = record.iter().skip(PROGRAM_FIELDS.saturating_sub(1)).collect();
    fields.push(rest.join("\t"));

    fields.resize(PROGRAM_FIELDS, String::new());
    fields
}

/// Converts ten padded columns into a row.
fn parse_row(fields: &[String]) -> RowParse {
    let [
        station_id,
        prog_id,
        date,
        weekday,
        start_time,
        duration,
        title,
        url,
        personality,
        info,
    ] = fields
    else {
        return RowParse::MissingField;
    };

    if [station_id, prog_id, date, start_time, duration]
        .iter()
        .any(|f| f.is_empty())
    {
        return RowParse::MissingField;
    }

    let Ok(duration_min) = duration.parse::<u32>() else {
        return RowParse::BadDuration(duration.clone());
    };

    RowParse::Row(Box::new(ProgramRow {
        station_id: station_id.clone(),
        prog_id: prog_id.clone(),
        date: date.clone(),
        weekday: weekday.clone(),
        start_time: start_time.clone(),
        duration_min,
        title: title.clone(),
        url: (!url.is_empty()).then(|| url.clone()),
        personality: personality.clone(),
        info: info.clone(),
    }))
}

/// Runs the schedule export command and parses its output.
///
/// # Errors
///
/// Returns an error if the command fails or its header is missing.
#[instrument(skip_all)]
pub async fn fetch_program_table(config: &RadishConfig) -> Result<ProgramTable> {
    let stdout = run_capture(&config.shell, &config.schedule_command, &[])
        .await
        .context("schedule export command failed")?;
    parse_program_table(&stdout)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;

    const HEADER: &str =
        "station_id\tprog_id\tdate\tweekday\tftime\tduration\ttitle\turl\tpfm\tinfo\n";

    #[test]
    fn test_parse_full_row() {
        // Arrange
        let text = format!(
            "{HEADER}S1\tP1\t20240101\tMon\t0900\t30\tTitle\thttps://example.com\tHost\tAbout\n"
        );

        // Act
        let table = parse_program_table(&text).unwrap();

        // Assert
        assert_eq!(table.programs.len(), 1);
        let row = &table.programs[0];
        assert_eq!(row.station_id, "S1");
        assert_eq!(row.start_time, "0900");
        assert_eq!(row.duration_min, 30);
        assert_eq!(row.url.as_deref(), Some("https://example.com"));
        assert_eq!(row.personality, "Host");
        assert_eq!(row.info, "About");
    }

    #[test]
    fn test_parse_pads_short_rows() {
        // Arrange: only the six leading columns
        let text = format!("{HEADER}S1\tP1\t20240101\tMon\t0900\t30\n");

        // Act
        let table = parse_program_table(&text).unwrap();

        // Assert
        assert_eq!(table.programs.len(), 1);
        assert_eq!(table.programs[0].title, "");
        assert!(table.programs[0].url.is_none());
    }

    #[test]
    fn test_parse_folds_extra_columns_into_info() {
        // Arrange
        let text = format!("{HEADER}S1\tP1\t20240101\tMon\t0900\t30\tT\tU\tH\tpart1\tpart2\n");

        // Act
        let table = parse_program_table(&text).unwrap();

        // Assert
        assert_eq!(table.programs[0].info, "part1\tpart2");
    }

    #[test]
    fn test_parse_rejects_missing_header() {
        // Arrange
        let text = "S1\tP1\t20240101\tMon\t0900\t30\tT\tU\tH\tI\n";

        // Act
        let result = parse_program_table(text);

        // Assert
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("station_id"));
    }

    #[test]
    fn test_parse_rejects_empty_output() {
        // Arrange & Act
        let result = parse_program_table("");

        // Assert
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_skips_rows_missing_required_fields() {
        // Arrange: missing prog_id, then missing duration, then a good row
        let text = format!(
            "{HEADER}S1\t\t20240101\tMon\t0900\t30\nS1\tP2\t20240101\tMon\t0900\nS1\tP3\t20240101\t\t1000\t60\n"
        );

        // Act
        let table = parse_program_table(&text).unwrap();

        // Assert
        assert_eq!(table.programs.len(), 1);
        assert_eq!(table.programs[0].prog_id, "P3");
        assert_eq!(table.skipped, 2);
    }

    #[test]
    fn test_parse_bad_duration_is_counted_and_batch_continues() {
        // Arrange
        let text = format!(
            "{HEADER}S1\tP1\t20240101\tMon\t0900\tthirty\nS1\tP2\t20240101\tMon\t0930\t30\n"
        );

        // Act
        let table = parse_program_table(&text).unwrap();

        // Assert
        assert_eq!(table.errors, 1);
        assert_eq!(table.programs.len(), 1);
        assert_eq!(table.programs[0].prog_id, "P2");
    }

    #[test]
    fn test_parse_header_only() {
        // Arrange & Act
        let table = parse_program_table(HEADER).unwrap();

        // Assert
        assert!(table.programs.is_empty());
        assert_eq!(table.skipped, 0);
    }
}
