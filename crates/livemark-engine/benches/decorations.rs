use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use livemark_config::PreviewSettings;
use livemark_engine::decorate::{DecorationContext, resolve};
use livemark_engine::editing::Selection;
use livemark_engine::syntax::{Span, parse};
use livemark_engine::trigger::detect;
mod common;

fn bench_decoration_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("decorations");
    group.sample_size(20);
    let settings = PreviewSettings::default();

    for size in [10, 100] {
        let content = common::generate_note(size);
        let selection = Selection::caret(content.len() / 2);
        group.bench_with_input(BenchmarkId::new("full_pass", size), &content, |b, content| {
            b.iter(|| {
                let text = std::hint::black_box(content.as_str());
                let ctx = DecorationContext::new(text, &selection, &settings);
                std::hint::black_box(resolve(&ctx));
            });
        });
    }

    let content = common::generate_note(100);
    let selection = Selection::caret(0);
    group.bench_function("viewport_pass", |b| {
        b.iter(|| {
            let ctx = DecorationContext::new(&content, &selection, &settings)
                .with_viewport(Span::new(0, 2_000));
            std::hint::black_box(resolve(&ctx));
        });
    });

    let outline = common::generate_outline(1_000, 4);
    let selection = Selection::caret(outline.len());
    group.bench_function("outline", |b| {
        b.iter(|| {
            let ctx = DecorationContext::new(&outline, &selection, &settings);
            std::hint::black_box(resolve(&ctx));
        });
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let content = common::generate_note(100);
    c.bench_function("syntax_tree", |b| {
        b.iter(|| std::hint::black_box(parse(std::hint::black_box(content.as_str()))));
    });
}

fn bench_trigger(c: &mut Criterion) {
    let content = format!("{}see [[Some Page", common::generate_note(100));
    let selection = Selection::caret(content.len());
    c.bench_function("trigger_detect", |b| {
        b.iter(|| std::hint::black_box(detect(&content, &selection, true)));
    });
}

criterion_group!(benches, bench_decoration_pass, bench_parse, bench_trigger);
criterion_main!(benches);
