use pretty_assertions::assert_eq;
use scribe_core::{Direction, EditorCore};

/// Snapshot of everything undo must restore.
fn state(editor: &EditorCore) -> (String, usize) {
    (editor.text(), editor.cursor().offset)
}

#[test]
fn test_undo_redo_insert() {
    let mut editor = EditorCore::empty();
    editor.insert("a");
    assert_eq!(editor.text(), "a");
    assert!(editor.can_undo());
    assert!(!editor.can_redo());

    assert!(editor.undo());
    assert_eq!(editor.text(), "");
    assert!(!editor.can_undo());
    assert!(editor.can_redo());

    assert!(editor.redo());
    assert_eq!(editor.text(), "a");
    assert!(editor.can_undo());
    assert!(!editor.can_redo());
}

#[test]
fn test_undo_on_empty_history_is_noop() {
    let mut editor = EditorCore::new("text");
    assert!(!editor.undo());
    assert!(!editor.redo());
    assert_eq!(editor.text(), "text");
}

#[test]
fn test_inverse_law_for_every_edit_kind() {
    type Edit = fn(&mut EditorCore);
    let edits: &[(&str, Edit)] = &[
        ("insert", |e| e.insert("XY")),
        ("backspace", |e| e.delete_char(Direction::Backward)),
        ("delete", |e| e.delete_char(Direction::Forward)),
        ("delete word back", |e| e.delete_word(Direction::Backward)),
        ("delete word forward", |e| e.delete_word(Direction::Forward)),
    ];

    for (name, edit) in edits {
        let mut editor = EditorCore::new("alpha beta\ngamma delta");
        editor.move_cursor(8);
        let before = state(&editor);

        edit(&mut editor);
        let after = state(&editor);
        assert_ne!(before.0, after.0, "{name} should change the text");

        assert!(editor.undo(), "{name}");
        assert_eq!(state(&editor), before, "undo of {name}");
        assert!(editor.redo(), "{name}");
        assert_eq!(state(&editor), after, "redo of {name}");
    }
}

#[test]
fn test_inverse_law_for_selection_delete() {
    let mut editor = EditorCore::new("alpha beta");
    editor.set_selection(6, 10);
    let before = state(&editor);

    editor.delete_selection();
    assert_eq!(state(&editor), ("alpha ".to_string(), 6));

    editor.undo();
    assert_eq!(state(&editor), before);
}

#[test]
fn test_new_edit_after_undo_truncates_redo() {
    let mut editor = EditorCore::empty();
    editor.insert("one");
    editor.insert(" two");
    editor.undo();
    assert!(editor.can_redo());

    editor.insert(" three");
    assert!(!editor.can_redo());
    assert_eq!(editor.text(), "one three");

    editor.undo();
    editor.undo();
    assert_eq!(editor.text(), "");
    assert!(!editor.undo());
}

#[test]
fn test_multiple_undo_redo_round_trip() {
    let mut editor = EditorCore::empty();
    let mut history = vec![editor.text()];
    for word in ["The", " quick", " brown", " fox"] {
        editor.insert(word);
        history.push(editor.text());
    }
    editor.move_cursor(4);
    editor.delete_word(Direction::Forward);
    history.push(editor.text());
    assert_eq!(editor.text(), "The brown fox");

    for expected in history.iter().rev().skip(1) {
        editor.undo();
        assert_eq!(&editor.text(), expected);
    }
    for expected in history.iter().skip(1) {
        editor.redo();
        assert_eq!(&editor.text(), expected);
    }
}

#[test]
fn test_undo_limit() {
    let mut editor = EditorCore::with_config(
        "",
        scribe_core::EditorConfig {
            undo_limit: 3,
            ..Default::default()
        },
    );
    for ch in ["a", "b", "c", "d", "e"] {
        editor.insert(ch);
    }
    assert_eq!(editor.undo_depth(), 3);
    while editor.undo() {}
    assert_eq!(editor.text(), "ab");
}

#[test]
fn test_undo_restores_derived_counts() {
    let mut editor = EditorCore::new("one two");
    editor.move_cursor_document(Direction::Forward);
    editor.insert("\nthree four");
    assert_eq!((editor.word_count(), editor.line_count()), (4, 2));
    assert_eq!((editor.cursor().line, editor.cursor().column), (1, 10));

    editor.undo();
    assert_eq!((editor.word_count(), editor.line_count()), (2, 1));
    assert_eq!((editor.cursor().line, editor.cursor().column), (0, 7));
}
