use criterion::{Criterion, criterion_group, criterion_main};
use handbook_rag::crawler::domain::PageUrl;
use handbook_rag::crawler::extractor::{ExtractionConfig, extract_sections};
use std::fs::{self};
use std::hint::black_box;
use std::path::Path;

pub fn criterion_benchmark(c: &mut Criterion) {
    let test_page_path =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("benches/testpage_handbook.html");
    let test_page = fs::read_to_string(test_page_path).expect("can read test file");
    let url = PageUrl::parse("https://handbook.gitlab.com/handbook/communication")
        .expect("valid page URL");
    let config = ExtractionConfig::default();
    c.bench_function("extraction", |b| {
        b.iter(|| extract_sections(black_box(&test_page), black_box(&url), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
