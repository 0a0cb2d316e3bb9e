//! Deep traversal benchmark suite.
//!
//! Benchmarks pattern matching across nested shadow roots and frames:
//! - Shadow nesting depths: 4, 16, 64
//! - Page widths (siblings per level): 10, 100
//!
//! Run with: cargo bench --bench deep_walk
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use ask_screenshot::{
    CaptureFile, CompiledCatalog, DeepWalker, Document, Injector, PlatformKey, Selector,
    resolve_file_input,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const DEPTHS: &[usize] = &[4, 16, 64];
const WIDTHS: &[usize] = &[10, 100];

// ============================================================================
// Page Generation
// ============================================================================

/// `depth` nested shadow roots, each with `width` filler siblings; the file
/// input sits in the innermost root, next to a same-origin frame.
fn nested_page(depth: usize, width: usize) -> String {
    let filler = r#"<div class="message"><p class="text"></p><span></span></div>"#.repeat(width);
    let mut html = format!(
        r#"{filler}<button id="btn" class="attach"></button><input type="file" hidden><iframe srcdoc="<textarea></textarea>"></iframe>"#
    );
    for _ in 0..depth {
        html = format!(r#"{filler}<chat-layer><template shadowrootmode="open">{html}</template></chat-layer>"#);
    }
    html
}

// ============================================================================
// Benchmark: find_all
// ============================================================================

fn bench_find_all(c: &mut Criterion) {
    let selector = Selector::parse(r#"input[type="file"]"#).unwrap();

    let mut group = c.benchmark_group("find_all");
    for &width in WIDTHS {
        for &depth in DEPTHS {
            let walker = DeepWalker::new(Arc::new(Document::parse(&nested_page(depth, width)).unwrap()));
            let id = format!("d{depth}_w{width}");
            group.bench_with_input(BenchmarkId::new("file_input", &id), &walker, |b, walker| {
                b.iter(|| black_box(walker.find_all(&selector)));
            });
        }
    }
    group.finish();
}

// ============================================================================
// Benchmark: resolve_file_input
// ============================================================================

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_file_input");
    for &depth in DEPTHS {
        let doc = Arc::new(Document::parse(&nested_page(depth, 10)).unwrap());
        let button = doc.find_by_id("btn").unwrap();
        let walker = DeepWalker::new(doc);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &walker, |b, walker| {
            b.iter(|| black_box(resolve_file_input(walker, button)));
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark: Full Attempt
// ============================================================================

fn bench_attempt(c: &mut Criterion) {
    let catalog = CompiledCatalog::for_platform(PlatformKey::Qwen).unwrap();
    let file = CaptureFile::new("ask-screenshot.png", "image/png", vec![0u8; 4096]);

    let mut group = c.benchmark_group("attempt");
    for &depth in DEPTHS {
        let walker = DeepWalker::new(Arc::new(Document::parse(&nested_page(depth, 10)).unwrap()));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &walker, |b, walker| {
            let injector = Injector::new(walker, &catalog);
            b.iter(|| black_box(injector.attempt(&file)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_find_all, bench_resolve, bench_attempt);
criterion_main!(benches);
