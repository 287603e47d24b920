use std::fs;

use pretty_assertions::assert_eq;
use scribe_core::{EditorCore, PieceTable};
use scribe_store::{
    DurabilityConfig, ProjectPaths, RecoveryManager, RecoverySource, atomic_save, commit_temp,
    read_manuscript, rotate_snapshots, write_temp,
};

fn save(paths: &ProjectPaths, text: &str, rotate: Option<usize>) {
    atomic_save(paths, &PieceTable::new(text).snapshot(), rotate).unwrap();
}

#[test]
fn test_round_trip_preserves_content() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path().join("p"));

    for text in [
        "",
        "plain ascii",
        "line one\nline two\r\nline three\n",
        "日本語のテキスト, émoji 🚀 and combining e\u{301}",
    ] {
        save(&paths, text, None);
        assert_eq!(read_manuscript(&paths).unwrap().as_deref(), Some(text));
        assert!(!paths.temp().exists());
    }
}

#[test]
fn test_edited_piece_table_saves_logical_text() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path());

    let mut editor = EditorCore::new("The quick fox");
    editor.move_cursor(10);
    editor.insert("brown ");
    editor.move_cursor(0);
    editor.delete_word(scribe_core::Direction::Forward);
    let snapshot = editor.create_snapshot("p");

    atomic_save(&paths, &snapshot.content, None).unwrap();
    assert_eq!(fs::read_to_string(paths.manuscript()).unwrap(), editor.text());
}

#[test]
fn test_repeated_save_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path());
    save(&paths, "same", None);
    let first = fs::read(paths.manuscript()).unwrap();
    save(&paths, "same", None);
    assert_eq!(fs::read(paths.manuscript()).unwrap(), first);
}

#[test]
fn test_large_document_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path());
    let text: String = (0..20_000).map(|i| format!("line {i} ✓\n")).collect();
    save(&paths, &text, None);
    assert_eq!(read_manuscript(&paths).unwrap(), Some(text));
}

#[test]
fn test_manual_saves_keep_three_backups() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path());

    for version in 1..=5 {
        save(&paths, &format!("v{version}"), Some(3));
    }

    assert_eq!(fs::read_to_string(paths.manuscript()).unwrap(), "v5");
    assert_eq!(fs::read_to_string(paths.backup(1)).unwrap(), "v4");
    assert_eq!(fs::read_to_string(paths.backup(2)).unwrap(), "v3");
    assert_eq!(fs::read_to_string(paths.backup(3)).unwrap(), "v2");
    assert!(!paths.backup(4).exists());
}

#[test]
fn test_first_manual_save_creates_no_backup() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path());
    save(&paths, "first", Some(3));
    assert!(!paths.backup(1).exists());

    save(&paths, "second", Some(3));
    assert_eq!(fs::read_to_string(paths.backup(1)).unwrap(), "first");
    assert!(!paths.backup(2).exists());
}

#[test]
fn test_autosave_does_not_rotate() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path());
    save(&paths, "a", None);
    save(&paths, "b", None);
    assert!(!paths.backup(1).exists());
}

#[test]
fn test_rotation_keeps_manuscript_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path());
    save(&paths, "current", None);
    rotate_snapshots(&paths, 3).unwrap();
    assert_eq!(fs::read_to_string(paths.manuscript()).unwrap(), "current");
    assert_eq!(fs::read_to_string(paths.backup(1)).unwrap(), "current");
}

#[test]
fn test_crash_before_rename_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let config = DurabilityConfig::with_root(dir.path());
    let paths = config.project("novel");
    save(&paths, "committed", None);

    // Power lost after the temp file was synced but before the rename.
    write_temp(&paths, &PieceTable::new("in flight").snapshot()).unwrap();
    assert_eq!(read_manuscript(&paths).unwrap().as_deref(), Some("committed"));

    let recovery = RecoveryManager::new(&config, "novel");
    let candidate = recovery.inspect().unwrap().expect("temp file offered");
    assert_eq!(candidate.source, RecoverySource::TempFile);
    assert_eq!(candidate.content, "in flight");
    assert_eq!(candidate.committed.as_deref(), Some("committed"));

    // Finishing the interrupted save by hand is equivalent to restoring.
    commit_temp(&paths).unwrap();
    assert_eq!(read_manuscript(&paths).unwrap().as_deref(), Some("in flight"));
    assert!(recovery.inspect().unwrap().is_none());
}
