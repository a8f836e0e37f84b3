#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]
#![cfg(unix)]

use std::path::Path;

use assert_cmd::cargo_bin_cmd;
use predicates::prelude::predicate;
use tempfile::TempDir;

/// Fake `radish-play.sh`: `-l` lists stations, `-m record` simulates probes.
const PLAY_SCRIPT: &str = r#"
if [ "$1" = "-l" ]; then
  printf 'radiko,TBS,TBS Radio\n'
  printf 'radiko,QRR,Nippon Cultural\n'
  printf 'radiko,LFR,Nippon Broadcasting\n'
  printf 'radiko,BROKEN\n'
  printf 'nhk,NHK1,NHK Radio 1\n'
  exit 0
fi
case "$4" in
  QRR) echo 'HTTP error 403 Forbidden' >&2; exit 1 ;;
  LFR) sleep 30 ;;
  *) exit 0 ;;
esac
"#;

const SCHEDULE_HEADER: &str =
    "station_id\tprog_id\tdate\tweekday\tftime\tduration\ttitle\turl\tpfm\tinfo\n";

/// Creates a data dir with a config pointing at fake scripts.
fn setup(schedule: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let play = dir.path().join("radish-play.sh");
    let rx2 = dir.path().join("rx2");
    std::fs::write(&play, PLAY_SCRIPT).unwrap();
    std::fs::write(&rx2, format!("cat <<'EOF'\n{schedule}EOF\n")).unwrap();
    write_config(dir.path(), "sh");
    dir
}

fn write_config(dir: &Path, shell: &str) {
    let config = format!(
        "[radish]\nshell = '{shell}'\nplay_script = '{}'\nschedule_command = '{}'\n\n\
         [probe]\noutput_dir = '{}'\n",
        dir.join("radish-play.sh").display(),
        dir.join("rx2").display(),
        dir.join("probe-out").display(),
    );
    std::fs::write(dir.join("config.toml"), config).unwrap();
}

fn rdkmgr(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = cargo_bin_cmd!("rdkmgr");
    cmd.arg("--dir").arg(dir).args(args).assert()
}

fn schedule_with(rows: &[&str]) -> String {
    let mut text = String::from(SCHEDULE_HEADER);
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

#[test]
fn test_help_lists_commands() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("rdkmgr");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("stations"))
        .stdout(predicate::str::contains("now-playing"));
}

#[test]
fn test_stations_scan_help() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("rdkmgr");
    cmd.args(["stations", "scan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--workers"))
        .stdout(predicate::str::contains("--timeout-secs"));
}

#[test]
fn test_import_stations_counts_skipped_and_filtered() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);

    // Act & Assert
    rdkmgr(dir.path(), &["db", "import-stations"])
        .success()
        .stdout(predicate::str::contains(
            "Imported 3 stations (1 skipped, 1 other services, 0 failed)",
        ));
    rdkmgr(dir.path(), &["stations", "list"])
        .success()
        .stdout(predicate::str::contains("Nippon Cultural"))
        .stdout(predicate::str::contains("Total: 3 stations"));
}

#[test]
fn test_import_programs_rejects_bad_header() {
    // Arrange
    let dir = setup("id\tprog\n");

    // Act & Assert
    rdkmgr(dir.path(), &["db", "import-programs"])
        .failure()
        .stderr(predicate::str::contains("station_id"));
}

#[test]
fn test_import_programs_is_idempotent() {
    // Arrange
    let schedule = schedule_with(&[
        "TBS\tP1\t20240101\tMon\t0900\t30\tMorning Show\t\tHost A\t",
        "TBS\tP2\t20240101\tMon\t0930\tabc\tBroken Duration\t\t\t",
    ]);
    let dir = setup(&schedule);

    // Act & Assert
    for _ in 0..2 {
        rdkmgr(dir.path(), &["db", "import-programs"])
            .success()
            .stdout(predicate::str::contains(
                "Imported 1 programs (0 skipped, 1 errors, 0 failed)",
            ));
    }
}

#[test]
fn test_programs_now_end_to_end() {
    // Arrange
    let schedule = schedule_with(&["TBS\tP1\t20240101\tMon\t0900\t30\tTitle\thttps://example.com\tHost\t"]);
    let dir = setup(&schedule);
    rdkmgr(dir.path(), &["db", "import-stations"]).success();
    rdkmgr(dir.path(), &["db", "import-programs"]).success();
    std::fs::write(dir.path().join("enabled_stations.txt"), "TBS\n").unwrap();

    // Act & Assert
    rdkmgr(dir.path(), &["programs", "now", "--at", "2024-01-01 09:15"])
        .success()
        .stdout(predicate::str::contains("Title"))
        .stdout(predicate::str::contains("09:00-09:30"));
    rdkmgr(dir.path(), &["programs", "now", "--at", "2024-01-01T09:30"])
        .success()
        .stdout(predicate::str::contains("No programs on air"));
}

#[test]
fn test_programs_now_enabled_station_missing_from_catalog() {
    // Arrange
    let schedule = schedule_with(&["S1\tP1\t20240101\tMon\t0900\t30\tTitle\t\tHost\t"]);
    let dir = setup(&schedule);
    rdkmgr(dir.path(), &["db", "import-programs"]).success();
    std::fs::write(dir.path().join("enabled_stations.txt"), "S1\n").unwrap();

    // Act & Assert
    rdkmgr(dir.path(), &["programs", "now", "--at", "2024-01-01 09:15"])
        .success()
        .stdout(predicate::str::contains("No programs on air"));
}

#[test]
fn test_programs_now_without_enabled_list() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);

    // Act & Assert
    rdkmgr(dir.path(), &["programs", "now"])
        .success()
        .stdout(predicate::str::contains("No enabled stations"));
}

#[test]
fn test_programs_now_rejects_bad_time() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);

    // Act & Assert
    rdkmgr(dir.path(), &["programs", "now", "--at", "tomorrow"])
        .failure()
        .stderr(predicate::str::contains("invalid time"));
}

#[test]
fn test_programs_search() {
    // Arrange
    let schedule = schedule_with(&[
        "TBS\tP1\t20240101\tMon\t0900\t30\tMorning Show\t\tHost A\t",
        "TBS\tP2\t20240101\tMon\t2200\t60\tNight Talk\t\tHost B\tguest: Morning Star",
    ]);
    let dir = setup(&schedule);
    rdkmgr(dir.path(), &["db", "import-stations"]).success();
    rdkmgr(dir.path(), &["db", "import-programs"]).success();

    // Act & Assert
    rdkmgr(dir.path(), &["programs", "search", "Morning"])
        .success()
        .stdout(predicate::str::contains("Morning Show"))
        .stdout(predicate::str::contains("Night Talk"))
        .stdout(predicate::str::contains("Total: 2 programs"));
    rdkmgr(dir.path(), &["programs", "search", "nothing-like-this"])
        .success()
        .stdout(predicate::str::contains("No programs match"));
}

#[test]
fn test_stations_scan_writes_reachable() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);

    // Act
    rdkmgr(
        dir.path(),
        &["stations", "scan", "--workers", "2", "--timeout-secs", "1"],
    )
    .success()
    .stdout(predicate::str::contains("Found 2 reachable of 3 stations"));

    // Assert
    let enabled = std::fs::read_to_string(dir.path().join("enabled_stations.txt")).unwrap();
    let mut ids: Vec<&str> = enabled.lines().collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["LFR", "TBS"]);
}

#[test]
fn test_stations_enabled_shows_names() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);
    rdkmgr(dir.path(), &["db", "import-stations"]).success();
    std::fs::write(dir.path().join("enabled_stations.txt"), "QRR\nXYZ\n").unwrap();

    // Act & Assert
    rdkmgr(dir.path(), &["stations", "enabled"])
        .success()
        .stdout(predicate::str::contains("Nippon Cultural"))
        .stdout(predicate::str::contains("(unknown)"));
}

#[test]
fn test_db_init_requires_confirmation() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);
    rdkmgr(dir.path(), &["db", "import-stations"]).success();

    // Act & Assert - anything but "y" aborts
    let mut cmd = cargo_bin_cmd!("rdkmgr");
    cmd.arg("--dir")
        .arg(dir.path())
        .args(["db", "init"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Aborted"));
    rdkmgr(dir.path(), &["stations", "list"])
        .success()
        .stdout(predicate::str::contains("Total: 3 stations"));

    rdkmgr(dir.path(), &["db", "init", "--force"])
        .success()
        .stdout(predicate::str::contains("Database initialized"));
    rdkmgr(dir.path(), &["stations", "list"])
        .success()
        .stdout(predicate::str::contains("No radiko stations"));
}

#[test]
fn test_db_init_short_force_flag() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);
    rdkmgr(dir.path(), &["db", "import-stations"]).success();

    // Act & Assert
    rdkmgr(dir.path(), &["db", "init", "-f"])
        .success()
        .stdout(predicate::str::contains("Database initialized"));
    rdkmgr(dir.path(), &["stations", "list"])
        .success()
        .stdout(predicate::str::contains("No radiko stations"));
}

#[test]
fn test_stations_scan_rejects_zero_timeout() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);

    // Act & Assert
    rdkmgr(dir.path(), &["stations", "scan", "--timeout-secs", "0"])
        .failure()
        .stderr(predicate::str::contains("--timeout-secs"));
    assert!(!dir.path().join("enabled_stations.txt").exists());
}

#[test]
fn test_zero_timeout_in_config_is_rejected() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);
    let config_path = dir.path().join("config.toml");
    let config = std::fs::read_to_string(&config_path).unwrap();
    std::fs::write(&config_path, format!("{config}timeout_secs = 0\n")).unwrap();

    // Act & Assert
    rdkmgr(dir.path(), &["stations", "scan"])
        .failure()
        .stderr(predicate::str::contains("probe.timeout_secs must be at least 1"));
}

#[test]
fn test_now_playing_uses_configured_script_name() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);
    let script = dir.path().join("play.sh");
    std::fs::write(&script, "sleep 5\nexit 0\n").unwrap();
    let config_path = dir.path().join("config.toml");
    let config = std::fs::read_to_string(&config_path)
        .unwrap()
        .replace("radish-play.sh", "play.sh");
    std::fs::write(&config_path, config).unwrap();
    rdkmgr(dir.path(), &["play", "RDKTEST"]).success();

    // Act & Assert
    rdkmgr(dir.path(), &["now-playing"])
        .success()
        .stdout(predicate::str::contains("RDKTEST"));
}

#[test]
fn test_play_launch_failure_exits_non_zero() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);
    write_config(dir.path(), "/nonexistent/shell-binary");

    // Act & Assert
    rdkmgr(dir.path(), &["play", "TBS"])
        .failure()
        .stderr(predicate::str::contains("failed to start playback of TBS"));
}

#[test]
fn test_import_stations_command_failure_exits_non_zero() {
    // Arrange
    let dir = setup(SCHEDULE_HEADER);
    write_config(dir.path(), "/nonexistent/shell-binary");

    // Act & Assert
    rdkmgr(dir.path(), &["db", "import-stations"])
        .failure()
        .stderr(predicate::str::contains("failed to fetch station list"));
}

#[test]
fn test_completions_bash() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("rdkmgr");
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rdkmgr"));
}
