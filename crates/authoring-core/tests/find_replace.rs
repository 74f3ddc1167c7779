use authoring_core::search::{self, DocumentMatch};
use authoring_core::{
    Action, CommandResult, Document, EditorConfig, EditorStore, InlineStyle, SearchCriteria,
    SearchOptions, SearchState, Selection, edit,
};
use pretty_assertions::assert_eq;

fn criteria(pattern: &str) -> Action {
    Action::HighlightsCriteria {
        pattern: pattern.into(),
        case_sensitive: None,
        whole_word: false,
        regex: false,
    }
}

fn found(block: &str, start: usize, end: usize) -> CommandResult {
    CommandResult::SearchMatch(DocumentMatch {
        block: block.into(),
        start,
        end,
    })
}

#[test]
fn test_find_next_wraps_around() {
    let mut store = EditorStore::new(Document::from_text("cat cat cat"), EditorConfig::default());
    let first = store.dispatch(criteria("cat")).unwrap().result;
    assert_eq!(first, found("b0", 0, 3));

    let results: Vec<CommandResult> = (0..3)
        .map(|_| store.dispatch(Action::HighlightsFindNext).unwrap().result)
        .collect();
    assert_eq!(
        results,
        vec![found("b0", 4, 7), found("b0", 8, 11), found("b0", 0, 3)]
    );
}

#[test]
fn test_find_prev_wraps_to_last_match() {
    let mut store = EditorStore::new(Document::from_text("cat\ncat"), EditorConfig::default());
    store.dispatch(criteria("cat")).unwrap();
    let result = store.dispatch(Action::HighlightsFindPrev).unwrap().result;
    assert_eq!(result, found("b1", 0, 3));
    let result = store.dispatch(Action::HighlightsFindPrev).unwrap().result;
    assert_eq!(result, found("b0", 0, 3));
}

#[test]
fn test_search_starts_at_caret() {
    let mut store = EditorStore::new(Document::from_text("dog cat dog"), EditorConfig::default());
    store
        .dispatch(Action::EditorSetSelection {
            selection: Selection::caret("b0", 5),
        })
        .unwrap();
    let result = store.dispatch(criteria("dog")).unwrap().result;
    assert_eq!(result, found("b0", 8, 11));
}

#[test]
fn test_case_sensitivity_defaults_from_config() {
    let mut store = EditorStore::new(Document::from_text("Paris"), EditorConfig::default());
    assert_eq!(store.dispatch(criteria("paris")).unwrap().result, found("b0", 0, 5));

    let config = EditorConfig {
        search_case_sensitive: true,
        ..EditorConfig::default()
    };
    let mut store = EditorStore::new(Document::from_text("Paris"), config);
    assert_eq!(
        store.dispatch(criteria("paris")).unwrap().result,
        CommandResult::SearchNotFound
    );
}

#[test]
fn test_empty_pattern_clears_search() {
    let mut store = EditorStore::new(Document::from_text("cat"), EditorConfig::default());
    store.dispatch(criteria("cat")).unwrap();
    assert!(store.state().search.criteria.is_some());
    store.dispatch(criteria("")).unwrap();
    assert_eq!(store.state().search.criteria, None);
    assert_eq!(store.state().search.current, None);
}

#[test]
fn test_invalid_regex_is_an_error() {
    let mut store = EditorStore::new(Document::from_text("cat"), EditorConfig::default());
    let version = store.version();
    let result = store.dispatch(Action::HighlightsCriteria {
        pattern: "(unclosed".into(),
        case_sensitive: None,
        whole_word: false,
        regex: true,
    });
    assert!(result.is_err());
    assert_eq!(store.version(), version);
}

#[test]
fn test_replace_advances_to_next_match() {
    let mut store = EditorStore::new(Document::from_text("cat cat"), EditorConfig::default());
    store.dispatch(criteria("cat")).unwrap();
    let outcome = store
        .dispatch(Action::HighlightsReplace { text: "dog".into() })
        .unwrap();
    assert_eq!(outcome.result, CommandResult::ReplaceResult { replaced: 1 });
    assert_eq!(store.document().plain_text(), "dog cat");
    assert_eq!(
        store.state().search.current,
        Some(DocumentMatch {
            block: "b0".into(),
            start: 4,
            end: 7
        })
    );
}

#[test]
fn test_replace_with_stale_match_does_nothing() {
    let mut store = EditorStore::new(Document::from_text("cat"), EditorConfig::default());
    store.dispatch(criteria("cat")).unwrap();
    store
        .dispatch(Action::EditorSetSelection {
            selection: Selection::within("b0", 0, 3),
        })
        .unwrap();
    store
        .dispatch(Action::EditorInsertText { text: "cow".into() })
        .unwrap();

    let outcome = store
        .dispatch(Action::HighlightsReplace { text: "dog".into() })
        .unwrap();
    assert_eq!(outcome.result, CommandResult::ReplaceResult { replaced: 0 });
    assert_eq!(store.document().plain_text(), "cow");
}

#[test]
fn test_replace_all_is_one_undo_step() {
    let mut store = EditorStore::new(
        Document::from_text("cat and cat\nno cats here"),
        EditorConfig::default(),
    );
    store.dispatch(criteria("cat")).unwrap();
    let outcome = store
        .dispatch(Action::HighlightsReplaceAll { text: "dog".into() })
        .unwrap();
    assert_eq!(outcome.result, CommandResult::ReplaceResult { replaced: 3 });
    assert_eq!(store.document().plain_text(), "dog and dog\nno dogs here");
    assert_eq!(store.undo_depth(), 1);

    store.dispatch(Action::EditorUndo).unwrap();
    assert_eq!(store.document().plain_text(), "cat and cat\nno cats here");
}

#[test]
fn test_replace_keeps_styles_at_match_start() {
    let doc = Document::from_text("a cat");
    let doc = edit::apply_inline_style(&doc, &Selection::within("b0", 2, 5), InlineStyle::Bold)
        .unwrap()
        .document;
    let (replaced, count) = search::replace_all(&doc, &SearchCriteria::new("cat"), "tiger").unwrap();
    assert_eq!(count, 1);
    let block = replaced.first_block().unwrap();
    assert_eq!(block.text(), "a tiger");
    assert!(block.styles().covers(2, 7, &InlineStyle::Bold));
}

#[test]
fn test_replace_keeps_link_at_match_start() {
    let doc = Document::from_text("see cat here");
    let doc = edit::apply_link(&doc, &Selection::within("b0", 4, 7), "https://example.com/cat")
        .unwrap()
        .document;
    let link = doc.first_block().unwrap().entity_at(4).unwrap();

    let (replaced, count) = search::replace_all(&doc, &SearchCriteria::new("cat"), "dog").unwrap();
    assert_eq!(count, 1);
    let block = replaced.first_block().unwrap();
    assert_eq!(block.text(), "see dog here");
    assert_eq!(block.entity_at(4), Some(link));
    assert_eq!(block.entity_at(6), Some(link));
    assert_eq!(block.entity_at(7), None);

    let state = SearchState::new(SearchCriteria::new("cat"), None)
        .find_next(&doc)
        .unwrap();
    let (edit, _) = state.replace(&doc, "tiger").unwrap().unwrap();
    let block = edit.document.first_block().unwrap();
    assert_eq!(block.text(), "see tiger here");
    assert_eq!(block.entity_at(4), Some(link));
    assert_eq!(block.entity_at(8), Some(link));
    assert_eq!(block.entity_at(9), None);
}

#[test]
fn test_replace_inside_link_keeps_it_whole() {
    let doc = Document::from_text("the cat flap");
    let doc = edit::apply_link(&doc, &Selection::within("b0", 0, 12), "https://example.com")
        .unwrap()
        .document;
    let (replaced, _) = search::replace_all(&doc, &SearchCriteria::new("cat"), "dog").unwrap();
    let block = replaced.first_block().unwrap();
    assert_eq!(block.entities().len(), 1);
    assert_eq!(
        (block.entities().spans()[0].start, block.entities().spans()[0].end),
        (0, 12)
    );
}

#[test]
fn test_replace_multiple_runs_pairs_in_given_order() {
    let mut store = EditorStore::new(Document::from_text("cat"), EditorConfig::default());
    let outcome = store
        .dispatch_json(r#"{"type": "HIGHLIGHTS_REPLACE_MULTIPLE", "diff": {"dog": "cow", "cat": "dog"}}"#)
        .unwrap();
    assert_eq!(outcome.result, CommandResult::ReplaceResult { replaced: 1 });
    assert_eq!(store.document().plain_text(), "dog");
}

#[test]
fn test_replace_multiple_applies_each_pair() {
    let doc = Document::from_text("colour and flavour");
    let diff = vec![
        ("colour".to_string(), "color".to_string()),
        ("flavour".to_string(), "flavor".to_string()),
    ];
    let (replaced, count) = search::replace_multiple(&doc, &diff, SearchOptions::default()).unwrap();
    assert_eq!(count, 2);
    assert_eq!(replaced.plain_text(), "color and flavor");

    let mut store = EditorStore::new(doc, EditorConfig::default());
    let outcome = store
        .dispatch(Action::HighlightsReplaceMultiple { diff })
        .unwrap();
    assert_eq!(outcome.result, CommandResult::ReplaceResult { replaced: 2 });
    assert_eq!(store.document().plain_text(), "color and flavor");
}

#[test]
fn test_whole_word_and_regex() {
    let doc = Document::from_text("cat concat cat");
    let whole = SearchCriteria::new("cat").with_options(SearchOptions {
        whole_word: true,
        ..SearchOptions::default()
    });
    let matches = search::find_matches(&doc, &whole).unwrap();
    assert_eq!(matches.len(), 2);

    let regex = SearchCriteria::new(r"c\w+t").with_options(SearchOptions {
        regex: true,
        ..SearchOptions::default()
    });
    let matches = search::find_matches(&doc, &regex).unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!((matches[1].start, matches[1].end), (4, 10));
}
