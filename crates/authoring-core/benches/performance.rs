use authoring_core::{Action, Document, EditorConfig, EditorStore, Selection, interchange};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn large_text(block_count: usize) -> String {
    let mut out = String::with_capacity(block_count * 80);
    for i in 0..block_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (authoring-core benchmark)\n"
        ));
    }
    out.pop();
    out
}

fn bench_open_from_json(c: &mut Criterion) {
    let json = interchange::serialize(&Document::from_text(&large_text(5_000))).unwrap();
    c.bench_function("open_json/5k_blocks", |b| {
        b.iter(|| {
            let store = EditorStore::from_json(black_box(&json), EditorConfig::default()).unwrap();
            black_box(store.document().block_count());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let doc = Document::from_text(&large_text(5_000));
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || {
                let mut store = EditorStore::new(doc.clone(), EditorConfig::default());
                store
                    .dispatch(Action::EditorSetSelection {
                        selection: Selection::caret("b2500", 10),
                    })
                    .unwrap();
                store
            },
            |mut store| {
                for _ in 0..100 {
                    store
                        .dispatch(Action::EditorInsertText {
                            text: "x".to_string(),
                        })
                        .unwrap();
                }
                black_box(store.version());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_suggesting_typing(c: &mut Criterion) {
    let doc = Document::from_text(&large_text(5_000));
    c.bench_function("suggesting_typing/100_inserts", |b| {
        b.iter_batched(
            || {
                let mut store = EditorStore::new(doc.clone(), EditorConfig::default());
                store.dispatch(Action::EditorToggleSuggestingMode).unwrap();
                store
                    .dispatch(Action::EditorSetSelection {
                        selection: Selection::caret("b2500", 10),
                    })
                    .unwrap();
                store
            },
            |mut store| {
                for _ in 0..100 {
                    store
                        .dispatch(Action::EditorInsertText {
                            text: "x".to_string(),
                        })
                        .unwrap();
                }
                black_box(store.pending_suggestions().len());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_replace_all(c: &mut Criterion) {
    let doc = Document::from_text(&large_text(5_000));
    c.bench_function("replace_all/5k_blocks", |b| {
        b.iter_batched(
            || {
                let mut store = EditorStore::new(doc.clone(), EditorConfig::default());
                store
                    .dispatch(Action::HighlightsCriteria {
                        pattern: "fox".into(),
                        case_sensitive: None,
                        whole_word: true,
                        regex: false,
                    })
                    .unwrap();
                store
            },
            |mut store| {
                let outcome = store
                    .dispatch(Action::HighlightsReplaceAll {
                        text: "cat".into(),
                    })
                    .unwrap();
                black_box(outcome.result);
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_open_from_json,
    bench_typing_in_middle,
    bench_suggesting_typing,
    bench_replace_all
);
criterion_main!(benches);
