use authoring_core::{
    Action, CommandError, CommandResult, Document, Effect, EditorConfig, EditorStore, Point,
    Selection, StateChange, StateChangeType,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn store(text: &str) -> EditorStore {
    EditorStore::new(Document::from_text(text), EditorConfig::default().with_author("desk"))
        .with_clock(|| 7)
}

fn caret(store: &mut EditorStore, block: &str, offset: usize) {
    store
        .dispatch(Action::EditorSetSelection {
            selection: Selection::caret(block, offset),
        })
        .unwrap();
}

fn type_text(store: &mut EditorStore, text: &str) {
    for ch in text.chars() {
        store
            .dispatch(Action::EditorInsertText {
                text: ch.to_string(),
            })
            .unwrap();
    }
}

#[test]
fn test_subscribers_see_each_changed_aspect_once() {
    let mut store = store("Hello");
    let seen: Arc<Mutex<Vec<StateChange>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(move |change| sink.lock().unwrap().push(change.clone()));

    caret(&mut store, "b0", 5);
    store
        .dispatch(Action::EditorInsertText { text: "!".into() })
        .unwrap();

    let seen = seen.lock().unwrap();
    let kinds: Vec<StateChangeType> = seen.iter().map(|c| c.change_type).collect();
    assert_eq!(
        kinds,
        vec![
            StateChangeType::SelectionChanged,
            StateChangeType::DocumentModified,
            StateChangeType::SelectionChanged,
        ]
    );
    for (i, change) in seen.iter().enumerate() {
        assert_eq!(change.old_version, i as u64);
        assert_eq!(change.new_version, i as u64 + 1);
    }
    assert_eq!(store.version(), 3);
    assert!(store.has_changed_since(2));
    assert!(!store.has_changed_since(3));
}

#[test]
fn test_dispatch_json() {
    let mut store = store("Hello");
    store
        .dispatch_json(r#"{"type": "EDITOR_SET_SELECTION", "selection": {"anchor": {"block": "b0", "offset": 5}, "focus": {"block": "b0", "offset": 5}}}"#)
        .unwrap();
    store
        .dispatch_json(r#"{"type": "EDITOR_INSERT_TEXT", "text": " world"}"#)
        .unwrap();
    assert_eq!(store.document().plain_text(), "Hello world");

    let version = store.version();
    let outcome = store
        .dispatch_json(r#"{"type": "TOTALLY_NEW_ACTION", "payload": [1, 2]}"#)
        .unwrap();
    assert_eq!(outcome.result, CommandResult::Success);
    assert!(outcome.changes.is_empty());
    assert_eq!(store.version(), version);

    let err = store
        .dispatch_json(r#"{"type": "EDITOR_INSERT_TEXT"}"#)
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidAction(_)));
    let err = store.dispatch_json("[").unwrap_err();
    assert!(matches!(err, CommandError::InvalidAction(_)));
    assert_eq!(store.version(), version);
}

#[test]
fn test_typing_undoes_as_one_group() {
    let mut store = store("");
    type_text(&mut store, "abc");
    assert_eq!(store.document().plain_text(), "abc");

    store.dispatch(Action::EditorUndo).unwrap();
    assert_eq!(store.document().plain_text(), "");
    assert!(!store.can_undo());
    assert!(store.can_redo());

    store.dispatch(Action::EditorRedo).unwrap();
    assert_eq!(store.document().plain_text(), "abc");
    assert_eq!(store.state().selection, Selection::caret("b0", 3));
}

#[test]
fn test_selection_change_breaks_typing_group() {
    let mut store = store("");
    type_text(&mut store, "ab");
    caret(&mut store, "b0", 0);
    type_text(&mut store, "x");
    assert_eq!(store.document().plain_text(), "xab");

    store.dispatch(Action::EditorUndo).unwrap();
    assert_eq!(store.document().plain_text(), "ab");
    store.dispatch(Action::EditorUndo).unwrap();
    assert_eq!(store.document().plain_text(), "");
}

#[test]
fn test_new_edit_clears_redo() {
    let mut store = store("");
    type_text(&mut store, "a");
    store.dispatch(Action::EditorUndo).unwrap();
    store.dispatch(Action::EditorSplitBlock).unwrap();
    assert!(!store.can_redo());
    store.dispatch(Action::EditorRedo).unwrap();
    assert_eq!(store.document().block_count(), 2);
}

#[test]
fn test_undo_restores_highlights() {
    let mut store = store("The quick fox");
    store.dispatch(Action::EditorToggleSuggestingMode).unwrap();
    store
        .dispatch(Action::EditorSetSelection {
            selection: Selection::within("b0", 4, 10),
        })
        .unwrap();
    store.dispatch(Action::EditorRemoveRange).unwrap();
    let id = store.pending_suggestions()[0].id;
    store.dispatch(Action::AcceptSuggestion { id }).unwrap();
    assert_eq!(store.document().plain_text(), "The fox");

    store.dispatch(Action::EditorUndo).unwrap();
    assert_eq!(store.document().plain_text(), "The quick fox");
    assert_eq!(store.pending_suggestions().len(), 1);
    assert!(store.state().highlights.contains(id));
}

#[test]
fn test_undo_depth_is_bounded() {
    let config = EditorConfig {
        max_undo: 2,
        ..EditorConfig::default()
    };
    let mut store = EditorStore::new(Document::from_text(""), config);
    for _ in 0..3 {
        store.dispatch(Action::EditorSplitBlock).unwrap();
    }
    assert_eq!(store.undo_depth(), 2);
}

#[test]
fn test_caret_style_toggle_applies_to_next_insert() {
    let mut store = store("plain ");
    caret(&mut store, "b0", 6);
    store
        .dispatch(Action::ToolbarToggleInlineStyle {
            style: authoring_core::InlineStyle::Italic,
        })
        .unwrap();
    assert_eq!(store.version(), 2, "the pending style is a mode change only");
    type_text(&mut store, "it");
    let block = store.document().first_block().unwrap();
    assert!(block.styles().covers(6, 8, &authoring_core::InlineStyle::Italic));
    assert!(!block.styles().covers(0, 6, &authoring_core::InlineStyle::Italic));
}

#[test]
fn test_spellcheck_lookup_round_trip() {
    let mut store = store("Teh story");
    let outcome = store
        .dispatch(Action::SpellcheckRequest {
            point: Some(Point::new("b0", 1)),
        })
        .unwrap();
    assert_eq!(outcome.result, CommandResult::Ticket(1));
    assert_eq!(
        outcome.effects,
        vec![Effect::LookupSuggestions {
            ticket: 1,
            word: "Teh".into()
        }]
    );

    store
        .dispatch(Action::SpellcheckSuggestionsLoaded {
            ticket: 1,
            suggestions: vec!["The".into(), "Tech".into()],
        })
        .unwrap();
    let loaded = store.state().spellcheck.loaded.clone().unwrap();
    assert_eq!(loaded.suggestions[0], "The");

    store
        .dispatch(Action::SpellcheckReplace {
            target: loaded.target,
            replacement: "The".into(),
        })
        .unwrap();
    assert_eq!(store.document().plain_text(), "The story");
    assert_eq!(store.state().spellcheck.loaded, None);
}

#[test]
fn test_superseded_spellcheck_completion_is_ignored() {
    let mut store = store("Teh storry");
    store
        .dispatch(Action::SpellcheckRequest {
            point: Some(Point::new("b0", 1)),
        })
        .unwrap();
    store
        .dispatch(Action::SpellcheckRequest {
            point: Some(Point::new("b0", 6)),
        })
        .unwrap();

    let version = store.version();
    let outcome = store
        .dispatch(Action::SpellcheckSuggestionsLoaded {
            ticket: 1,
            suggestions: vec!["The".into()],
        })
        .unwrap();
    assert!(outcome.changes.is_empty());
    assert_eq!(store.version(), version);
    assert_eq!(store.state().spellcheck.loaded, None);
}

#[test]
fn test_completion_for_edited_word_is_ignored() {
    let mut store = store("Teh");
    store
        .dispatch(Action::SpellcheckRequest {
            point: Some(Point::new("b0", 3)),
        })
        .unwrap();
    caret(&mut store, "b0", 1);
    type_text(&mut store, "x");

    store
        .dispatch(Action::SpellcheckSuggestionsLoaded {
            ticket: 1,
            suggestions: vec!["The".into()],
        })
        .unwrap();
    assert_eq!(store.state().spellcheck.loaded, None);
}

#[test]
fn test_dictionary_effects() {
    let mut store = store("Zelenskyy spoke");
    let outcome = store
        .dispatch(Action::SpellcheckAdd {
            word: "Zelenskyy".into(),
        })
        .unwrap();
    assert_eq!(
        outcome.effects,
        vec![Effect::UpdateDictionary {
            word: "Zelenskyy".into(),
            permanent: true
        }]
    );
    assert!(store.state().spellcheck.is_known("Zelenskyy"));

    let words = authoring_core::spellcheck::words(
        store.document(),
        &store.state().highlights,
        &store.state().spellcheck,
    );
    let words: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
    assert_eq!(words, vec!["spoke"]);
}
