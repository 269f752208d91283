//! Integration tests for the journal run loop.
//!
//! These tests write journal lines to a temporary file and drive the full
//! pipeline: tailer, parser, classifier and router.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use afk_monitor::classifier::Classifier;
use afk_monitor::config::{MalformedPolicy, VerbosityPolicy};
use afk_monitor::error::MonitorError;
use afk_monitor::format::TimeMode;
use afk_monitor::monitor::{Monitor, StopReason};
use afk_monitor::router::Router;
use afk_monitor::tailer::Tailer;
use afk_monitor::types::{EventKey, LogLevel};
use afk_monitor::webhook::WebhookSender;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn create_journal(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("Journal.2025-01-29T120000.01.log");
    std::fs::write(
        &path,
        "{\"timestamp\":\"2025-01-29T11:00:00Z\",\"event\":\"Fileheader\",\"part\":1}\n",
    )
    .unwrap();
    path
}

fn append_lines(path: &Path, lines: &[&str]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

fn create_monitor(
    policy: VerbosityPolicy,
    on_malformed: MalformedPolicy,
) -> Monitor<Vec<u8>, WebhookSender> {
    Monitor::new(
        Classifier::new(policy, 64.0),
        Router::new(Vec::new(), TimeMode::Utc),
        on_malformed,
        5,
    )
}

fn output(monitor: &Monitor<Vec<u8>, WebhookSender>) -> String {
    String::from_utf8(monitor.router().output().clone()).unwrap()
}

async fn open_tailer(path: &Path) -> Tailer {
    Tailer::open(path)
        .await
        .unwrap()
        .with_poll_interval(Duration::from_millis(10))
}

// =============================================================================
// Run Loop Tests
// =============================================================================

/// Lines already in the journal at startup are never replayed, and nothing
/// after a shutdown marker is processed.
#[tokio::test]
async fn test_shutdown_marker_stops_processing() {
    let dir = TempDir::new().unwrap();
    let journal = create_journal(&dir);
    let mut tailer = open_tailer(&journal).await;

    append_lines(
        &journal,
        &[
            r#"{"timestamp":"2025-01-29T12:00:00Z","event":"Music","MusicTrack":"MainMenu"}"#,
            r#"{"timestamp":"2025-01-29T12:00:01Z","event":"Shutdown"}"#,
            r#"{"timestamp":"2025-01-29T12:00:02Z","event":"Died"}"#,
        ],
    );

    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Skip);
    let reason = tokio::time::timeout(
        Duration::from_secs(5),
        monitor.run(&mut tailer, std::future::pending::<()>()),
    )
    .await
    .expect("run loop should stop on the shutdown marker")
    .unwrap();

    assert_eq!(reason, StopReason::ShutdownMarker);

    let out = output(&monitor);
    assert!(!out.contains("Fileheader"));
    assert!(out.contains("[12:00:00]🚪 Exited to main menu"));
    assert!(out.contains("[12:00:01]🛑 Quit to desktop"));
    assert!(!out.contains("Ship destroyed"));
    assert_eq!(monitor.tracking().total_logged, 2);
    assert!(monitor.tracking().previous_was("Shutdown"));
}

/// An interrupt ends the loop while waiting for data.
#[tokio::test]
async fn test_interrupt_stops_idle_loop() {
    let dir = TempDir::new().unwrap();
    let journal = create_journal(&dir);
    let mut tailer = open_tailer(&journal).await;

    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Skip);
    let reason = monitor
        .run(&mut tailer, tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert!(output(&monitor).is_empty());
}

/// A skipped malformed line does not disturb the lines around it.
#[tokio::test]
async fn test_malformed_line_is_skipped() {
    let dir = TempDir::new().unwrap();
    let journal = create_journal(&dir);
    let mut tailer = open_tailer(&journal).await;

    append_lines(
        &journal,
        &[
            r#"{"timestamp":"2025-01-29T12:00:00Z","event":"ShieldState","ShieldsUp":false}"#,
            r#"{"timestamp":"2025-01-29T12:00:01Z","event":"#,
            r#"{"timestamp":"2025-01-29T12:00:02Z","event":"Shutdown"}"#,
        ],
    );

    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Skip);
    let reason = monitor
        .run(&mut tailer, std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(reason, StopReason::ShutdownMarker);
    assert!(output(&monitor).contains("Ship shields down!"));
}

/// With the abort policy a malformed line ends the run with an error.
#[tokio::test]
async fn test_malformed_line_aborts_when_configured() {
    let dir = TempDir::new().unwrap();
    let journal = create_journal(&dir);
    let mut tailer = open_tailer(&journal).await;

    append_lines(&journal, &["not json at all"]);

    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Abort);
    let err = monitor
        .run(&mut tailer, std::future::pending::<()>())
        .await
        .unwrap_err();

    assert!(matches!(err, MonitorError::Parse(_)));
}

/// A journal that disappears mid-run is fatal.
#[tokio::test]
async fn test_removed_journal_is_fatal() {
    let dir = TempDir::new().unwrap();
    let journal = create_journal(&dir);
    let mut tailer = open_tailer(&journal).await;
    std::fs::remove_file(&journal).unwrap();

    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Skip);
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        monitor.run(&mut tailer, std::future::pending::<()>()),
    )
    .await
    .expect("missing journal should be detected")
    .unwrap_err();

    assert!(matches!(err, MonitorError::Tailer(_)));
}

// =============================================================================
// Session Lifecycle Tests
// =============================================================================

/// A journal removed mid-session is fatal, and the stopped notification is
/// still routed exactly once.
#[tokio::test]
async fn test_session_reports_stop_after_fatal_error() {
    let dir = TempDir::new().unwrap();
    let journal = create_journal(&dir);
    let mut tailer = open_tailer(&journal).await;
    std::fs::remove_file(&journal).unwrap();

    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Skip);
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        monitor.run_session(
            "0.1.0",
            "Journal.2025-01-29T120000.01.log",
            &mut tailer,
            std::future::pending::<()>(),
        ),
    )
    .await
    .expect("missing journal should be detected")
    .unwrap_err();

    assert!(matches!(err, MonitorError::Tailer(_)));

    let out = output(&monitor);
    assert_eq!(out.matches("📖 AFK Monitor v0.1.0 started").count(), 1);
    assert_eq!(
        out.matches("📕 AFK Monitor stopped (Journal.2025-01-29T120000.01.log)")
            .count(),
        1
    );
}

/// An interrupt ends the session with one stopped notification.
#[tokio::test]
async fn test_session_reports_stop_after_interrupt() {
    let dir = TempDir::new().unwrap();
    let journal = create_journal(&dir);
    let mut tailer = open_tailer(&journal).await;

    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Skip);
    let reason = monitor
        .run_session(
            "0.1.0",
            "Journal.2025-01-29T120000.01.log",
            &mut tailer,
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Interrupted);

    let out = output(&monitor);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("📖 AFK Monitor v0.1.0 started"));
    assert!(lines[1].ends_with("📕 AFK Monitor stopped (Journal.2025-01-29T120000.01.log)"));
}

/// A shutdown marker ends the session after the quit line.
#[tokio::test]
async fn test_session_reports_stop_after_shutdown_marker() {
    let dir = TempDir::new().unwrap();
    let journal = create_journal(&dir);
    let mut tailer = open_tailer(&journal).await;
    append_lines(
        &journal,
        &[r#"{"timestamp":"2025-01-29T12:00:00Z","event":"Shutdown"}"#],
    );

    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Skip);
    let reason = tokio::time::timeout(
        Duration::from_secs(5),
        monitor.run_session("0.1.0", "Journal.01.log", &mut tailer, std::future::pending::<()>()),
    )
    .await
    .expect("session should stop on the shutdown marker")
    .unwrap();

    assert_eq!(reason, StopReason::ShutdownMarker);

    let out = output(&monitor);
    assert!(out.contains("🛑 Quit to desktop"));
    assert_eq!(out.matches("📕 AFK Monitor stopped (Journal.01.log)").count(), 1);
}

// =============================================================================
// Session Scenarios
// =============================================================================

/// Re-targeting the same ship is reported once per encounter; a new session
/// marker starts a fresh encounter.
#[tokio::test]
async fn test_rescan_suppressed_until_new_session() {
    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Skip);
    let scan = r#"{"timestamp":"2025-01-29T12:00:00Z","event":"ShipTargeted","TargetLocked":true,"Ship":"vulture","ScanStage":1}"#;

    for _ in 0..3 {
        monitor.handle_line(scan).await.unwrap();
    }
    monitor
        .handle_line(r#"{"timestamp":"2025-01-29T12:01:00Z","event":"Commander","FID":"F1","Name":"Jameson"}"#)
        .await
        .unwrap();
    monitor.handle_line(scan).await.unwrap();

    let out = output(&monitor);
    assert_eq!(out.matches("Vulture(!)").count(), 2);
    assert!(out.contains("Started new session for CMDR Jameson"));
}

/// Ten kills one minute apart produce a summary with a 60 kills/h rate, and
/// the kill counter equals the number of kills.
#[tokio::test]
async fn test_tenth_kill_summary() {
    let mut monitor = create_monitor(VerbosityPolicy::default(), MalformedPolicy::Skip);

    for minute in 0..10 {
        let line = format!(
            r#"{{"timestamp":"2025-01-29T12:{minute:02}:00Z","event":"Bounty","Rewards":[{{"Faction":"Feds","Reward":10000}}],"Target":"eagle","TotalReward":10000,"VictimFaction":"Pirates"}}"#
        );
        monitor.handle_line(&line).await.unwrap();
    }

    assert_eq!(monitor.session().kill_count(), 10);
    assert_eq!(monitor.session().average_kill_interval(), Some(60.0));

    let out = output(&monitor);
    assert_eq!(out.matches("Kill").count(), 10);
    assert!(out.contains("[+1m0s]"));
    assert!(out.contains("📝 Session kills: 10 (Avg time: 1m0s, Rate: 60.0/h)"));
}

/// A level 0 override silences an event entirely.
#[tokio::test]
async fn test_level_override_silences_event() {
    let policy = VerbosityPolicy::default().with_level(EventKey::MainMenu, LogLevel::Suppressed);
    let mut monitor = create_monitor(policy, MalformedPolicy::Skip);

    monitor
        .handle_line(r#"{"timestamp":"2025-01-29T12:00:00Z","event":"Music","MusicTrack":"MainMenu"}"#)
        .await
        .unwrap();

    assert!(output(&monitor).is_empty());
    assert_eq!(monitor.tracking().total_logged, 0);
}
