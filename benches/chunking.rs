use criterion::{Criterion, criterion_group, criterion_main};
use handbook_rag::crawler::domain::PageUrl;
use handbook_rag::crawler::extractor::{ExtractionConfig, extract_sections};
use handbook_rag::embeddings::{ChunkingConfig, RecursiveSplitter, split_sections};
use std::fs::{self};
use std::hint::black_box;
use std::path::Path;

pub fn criterion_benchmark(c: &mut Criterion) {
    let test_page_path =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("benches/testpage_handbook.html");
    let test_page = fs::read_to_string(test_page_path).expect("can read test file");
    let url = PageUrl::parse("https://handbook.gitlab.com/handbook/communication")
        .expect("valid page URL");
    let sections = extract_sections(&test_page, &url, &ExtractionConfig::default());

    let splitter =
        RecursiveSplitter::from_config(&ChunkingConfig::default()).expect("valid default config");
    c.bench_function("chunking", |b| {
        b.iter(|| split_sections(black_box(&sections), black_box(&splitter)))
    });

    // Small chunks force the recursive separator fallback and the merge pass
    let small = RecursiveSplitter::new(40, 10).expect("valid small config");
    c.bench_function("chunking_small", |b| {
        b.iter(|| split_sections(black_box(&sections), black_box(&small)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
