//! Background worker end-to-end tests
//!
//! These run the real worker thread against a temp directory and observe results
//! after `shutdown`, which drains the queue.

use std::fs;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use scribe_core::{Direction, EditorCore};
use scribe_store::{
    DurabilityConfig, JournalReader, PersistEvent, PersistenceService, RecoveryManager,
    RecoverySource, SaveKind, read_manuscript,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn type_text(
    service: &mut PersistenceService,
    editor: &mut EditorCore,
    text: &str,
    now: Instant,
) {
    for ch in text.chars() {
        editor.insert(ch.encode_utf8(&mut [0; 4]));
        service.record_changes(editor, "novel", now).unwrap();
    }
}

#[test]
fn test_idle_autosave_writes_manuscript() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = DurabilityConfig::with_root(dir.path());
    let paths = config.project("novel");
    let mut service = PersistenceService::spawn(config).unwrap();
    let mut editor = EditorCore::empty();
    service.begin_session(&mut editor, "novel").unwrap();

    let start = Instant::now();
    editor.insert("Chapter one");
    assert!(!service.tick(&mut editor, "novel", start).unwrap());
    assert!(service.tick(&mut editor, "novel", start + Duration::from_secs(2)).unwrap());

    let events = service.shutdown();
    assert!(events.iter().any(|event| matches!(
        event,
        PersistEvent::Saved { kind: SaveKind::Autosave, revision, .. } if *revision == editor.revision()
    )));
    assert_eq!(read_manuscript(&paths).unwrap().as_deref(), Some("Chapter one"));
    assert!(!paths.backup(1).exists());
}

#[test]
fn test_manual_saves_rotate_backups() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = DurabilityConfig::with_root(dir.path());
    let paths = config.project("novel");
    let mut service = PersistenceService::spawn(config).unwrap();
    let mut editor = EditorCore::empty();
    service.begin_session(&mut editor, "novel").unwrap();

    let now = Instant::now();
    for draft in ["one", " two", " three", " four"] {
        editor.move_cursor_document(Direction::Forward);
        editor.insert(draft);
        loop {
            match service.save_now(&mut editor, "novel", now) {
                Ok(()) => break,
                Err(scribe_store::StoreError::QueueFull) => {
                    std::thread::sleep(Duration::from_millis(5))
                }
                Err(other) => panic!("save failed: {other}"),
            }
        }
    }
    service.shutdown();

    assert_eq!(
        read_manuscript(&paths).unwrap().as_deref(),
        Some("one two three four")
    );
    assert_eq!(fs::read_to_string(paths.backup(1)).unwrap(), "one two three");
    assert_eq!(fs::read_to_string(paths.backup(2)).unwrap(), "one two");
    assert_eq!(fs::read_to_string(paths.backup(3)).unwrap(), "one");
}

#[test]
fn test_unsaved_edits_survive_in_journal() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = DurabilityConfig::with_root(dir.path());
    let mut service = PersistenceService::spawn(config.clone()).unwrap();
    let mut editor = EditorCore::empty();
    service.begin_session(&mut editor, "novel").unwrap();

    let now = Instant::now();
    service
        .request_save(&mut editor, "novel", SaveKind::Manual, now)
        .unwrap();
    type_text(&mut service, &mut editor, "Dear diary", now);
    editor.delete_word(Direction::Backward);
    service.record_changes(&mut editor, "novel", now).unwrap();
    // Stopping the worker checkpoints the journal; no save follows.
    service.shutdown();

    let recovery = RecoveryManager::new(&config, "novel");
    let candidate = recovery.inspect().unwrap().expect("journal offered");
    assert_eq!(candidate.source, RecoverySource::Journal);
    assert_eq!(candidate.content, editor.text());
    assert_eq!(candidate.committed.as_deref(), Some(""));

    recovery.restore(&candidate).unwrap();
    assert_eq!(
        read_manuscript(recovery.paths()).unwrap(),
        Some(editor.text())
    );
}

#[test]
fn test_save_rebases_journal() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = DurabilityConfig::with_root(dir.path());
    let paths = config.project("novel");
    let mut service = PersistenceService::spawn(config.clone()).unwrap();
    let mut editor = EditorCore::new("draft");
    service.begin_session(&mut editor, "novel").unwrap();

    editor.move_cursor_document(Direction::Forward);
    type_text(&mut service, &mut editor, " v2", Instant::now());
    service
        .request_save(&mut editor, "novel", SaveKind::Autosave, Instant::now())
        .unwrap();
    service.shutdown();

    let scan = JournalReader::new(paths.clone()).read().unwrap();
    assert!(!scan.torn);
    assert_eq!(scan.entries.len(), 2, "baseline insert plus marker");
    assert!(RecoveryManager::new(&config, "novel").inspect().unwrap().is_none());
}

#[test]
fn test_failed_save_is_reported_and_journal_keeps_text() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = DurabilityConfig::with_root(dir.path());
    let paths = config.project("novel");
    let mut service = PersistenceService::spawn(config.clone()).unwrap();
    let mut editor = EditorCore::new("kept");
    service.begin_session(&mut editor, "novel").unwrap();

    // A directory where the manuscript should be makes the rename fail.
    fs::create_dir_all(paths.manuscript()).unwrap();
    fs::write(paths.manuscript().join("blocker"), "x").unwrap();

    editor.move_cursor_document(Direction::Forward);
    type_text(&mut service, &mut editor, "!", Instant::now());
    service
        .request_save(&mut editor, "novel", SaveKind::Autosave, Instant::now())
        .unwrap();
    let events = service.shutdown();

    assert!(events.iter().any(|event| matches!(
        event,
        PersistEvent::SaveFailed { kind: SaveKind::Autosave, .. }
    )));
    assert_eq!(editor.text(), "kept!");
    assert_eq!(
        JournalReader::new(paths).recover().unwrap().as_deref(),
        Some("kept!")
    );
}

#[test]
fn test_save_drains_pending_edits_before_snapshot() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = DurabilityConfig::with_root(dir.path());
    let paths = config.project("novel");
    let mut service = PersistenceService::spawn(config.clone()).unwrap();
    let mut editor = EditorCore::empty();
    service.begin_session(&mut editor, "novel").unwrap();

    // Edits not yet recorded when the save is requested.
    editor.insert("abc");
    let now = Instant::now();
    service
        .request_save(&mut editor, "novel", SaveKind::Manual, now)
        .unwrap();
    service.record_changes(&mut editor, "novel", now).unwrap();
    service.shutdown();

    assert_eq!(read_manuscript(&paths).unwrap().as_deref(), Some("abc"));
    assert_eq!(
        JournalReader::new(paths).recover().unwrap().as_deref(),
        Some("abc")
    );
    assert!(RecoveryManager::new(&config, "novel").inspect().unwrap().is_none());
}

#[test]
fn test_reload_starts_new_journal_baseline() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = DurabilityConfig::with_root(dir.path());
    let mut service = PersistenceService::spawn(config.clone()).unwrap();
    let mut editor = EditorCore::new("old document");
    service.begin_session(&mut editor, "novel").unwrap();

    let now = Instant::now();
    editor.move_cursor(3);
    editor.insert("?");
    service.record_changes(&mut editor, "novel", now).unwrap();

    editor.load("new");
    editor.move_cursor(3);
    editor.insert("!");
    service.record_changes(&mut editor, "novel", now).unwrap();
    editor.insert("!");
    service.record_changes(&mut editor, "novel", now).unwrap();
    service.shutdown();

    let candidate = RecoveryManager::new(&config, "novel")
        .inspect()
        .unwrap()
        .expect("journal offered");
    assert_eq!(candidate.content, "new!!");
    assert_eq!(candidate.content, editor.text());
}

#[test]
fn test_recording_without_begin_session_sets_baseline() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = DurabilityConfig::with_root(dir.path());
    let paths = config.project("novel");
    let mut service = PersistenceService::spawn(config).unwrap();
    let mut editor = EditorCore::new("loaded");

    editor.move_cursor_document(Direction::Forward);
    type_text(&mut service, &mut editor, " more", Instant::now());
    service.shutdown();

    assert_eq!(
        JournalReader::new(paths).recover().unwrap().as_deref(),
        Some("loaded more")
    );
}
