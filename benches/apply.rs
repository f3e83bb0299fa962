// Benchmarks for anchor resolution and application.

use criterion::{criterion_group, criterion_main, Criterion};
use html_highlight::{apply, Anchor};

fn sample_anchor(id: &str, exact: &str, prefix: &str, suffix: &str) -> Anchor {
    let json = serde_json::json!({
        "id": id,
        "article_id": "bench-article",
        "start_offset": 0,
        "end_offset": exact.chars().count(),
        "exact_text": exact,
        "prefix_context": prefix,
        "suffix_context": suffix,
        "note_content": null,
        "color": "yellow",
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
    });
    Anchor::from_json(&json.to_string()).unwrap()
}

fn bench_single_paragraph(c: &mut Criterion) {
    let html = "<p>This is a powerful engine for durable text highlighting.</p>";
    let anchors = vec![sample_anchor("a1", "powerful engine", "is a ", " for")];
    c.bench_function("single_paragraph", |b| {
        b.iter(|| apply(html, &anchors, None, false));
    });
}

fn bench_long_document(c: &mut Criterion) {
    let paragraph = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let html = format!("<article>{}</article>", format!("<p>{paragraph}</p>").repeat(50));
    let anchors = vec![
        sample_anchor("a1", "quick brown fox", "The ", " jumps"),
        sample_anchor("a2", "lazy dog", "the ", ". The"),
    ];
    c.bench_function("long_document", |b| {
        b.iter(|| apply(&html, &anchors, None, false));
    });
}

criterion_group!(benches, bench_single_paragraph, bench_long_document);
criterion_main!(benches);
