//! Criterion benchmarks for search performance
//!
//! Run with: cargo bench --bench search_benchmark
//! View HTML report: target/criterion/report/index.html

use codeloom::config::Config;
use codeloom::coordinator::{Coordinator, SearchWithOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

const DEFAULT_NUM_FILES: usize = 100;
const DEFAULT_LINES_PER_FILE: usize = 50;

static CACHED_CORPUS: OnceLock<(Coordinator, TempDir)> = OnceLock::new();

fn get_or_create_corpus() -> &'static (Coordinator, TempDir) {
    CACHED_CORPUS.get_or_init(|| setup_corpus(DEFAULT_NUM_FILES, DEFAULT_LINES_PER_FILE))
}

fn generate_source_files(num_files: usize, lines_per_file: usize) -> Vec<(PathBuf, String)> {
    let mut files = Vec::with_capacity(num_files);

    for i in 0..num_files {
        let mut content = String::with_capacity(lines_per_file * 60);
        content.push_str(&format!("// File {i} - generated for benchmarking\n"));
        content.push_str("use std::collections::HashMap;\n");
        content.push_str("use std::sync::Arc;\n\n");

        for j in 0..lines_per_file / 10 {
            content.push_str(&format!("pub fn process_data_{j}_{i}(input: &str) -> Result<String, Error> {{\n"));
            content.push_str("    let mut result = String::new();\n");
            content.push_str("    for line in input.lines() {\n");
            content.push_str("        if line.contains(\"pattern\") {\n");
            content.push_str("            result.push_str(line);\n");
            content.push_str("        }\n");
            content.push_str("    }\n");
            content.push_str("    Ok(result)\n");
            content.push_str("}\n\n");
        }

        content.push_str(&format!("pub struct DataProcessor{i} {{\n    data: Vec<u8>,\n    cache: HashMap<String, String>,\n}}\n\n"));
        content.push_str(&format!("impl DataProcessor{i} {{\n"));
        content.push_str("    pub fn new() -> Self {\n");
        content.push_str("        Self { data: Vec::new(), cache: HashMap::new() }\n");
        content.push_str("    }\n");
        content.push_str("    pub fn search_internal(&self, query: &str) -> Option<&str> {\n");
        content.push_str("        self.cache.get(query).map(|s| s.as_str())\n");
        content.push_str("    }\n");
        content.push_str("}\n");

        let path = PathBuf::from(format!("src/module_{}/processor_{i}.rs", i / 10));
        files.push((path, content));
    }

    files
}

fn setup_corpus(num_files: usize, lines_per_file: usize) -> (Coordinator, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let files = generate_source_files(num_files, lines_per_file);

    for (rel_path, content) in &files {
        let full_path = temp_dir.path().join(rel_path);
        std::fs::create_dir_all(full_path.parent().unwrap()).unwrap();
        std::fs::write(&full_path, content).unwrap();
    }

    let coordinator = Coordinator::new(Config::default());
    coordinator.index_directory(temp_dir.path()).expect("failed to index corpus");

    (coordinator, temp_dir)
}

fn bench_text_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_search");
    group.measurement_time(Duration::from_secs(3));
    group.sample_size(50);

    for num_files in [50, 100, 200] {
        let (coordinator, _temp_dir) = setup_corpus(num_files, DEFAULT_LINES_PER_FILE);
        let total_lines = num_files * DEFAULT_LINES_PER_FILE;
        group.throughput(Throughput::Elements(total_lines as u64));

        group.bench_with_input(BenchmarkId::new("common_query", num_files), &coordinator, |b, coordinator| {
            b.iter(|| black_box(coordinator.search(black_box("result"), 100)));
        });

        group.bench_with_input(BenchmarkId::new("rare_query", num_files), &coordinator, |b, coordinator| {
            b.iter(|| black_box(coordinator.search(black_box("DataProcessor0"), 100)));
        });

        group.bench_with_input(BenchmarkId::new("no_match", num_files), &coordinator, |b, coordinator| {
            b.iter(|| black_box(coordinator.search(black_box("xyznonexistent"), 100)));
        });
    }

    group.finish();
}

fn bench_regex_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("regex_search");
    group.measurement_time(Duration::from_secs(3));
    group.sample_size(50);

    let (coordinator, _temp_dir) = get_or_create_corpus();

    let patterns = [
        ("simple_literal", "process_data"),
        ("alternation", "String|Vec|HashMap"),
        ("char_class", "process_[a-z]+"),
        ("no_literal", ".*data.*"),
    ];

    for (name, pattern) in patterns {
        group.bench_function(name, |b| {
            let options = SearchWithOptions { use_regex: true, max_results: 100, ..SearchWithOptions::default() };
            b.iter(|| black_box(coordinator.search_with_options(black_box(pattern), options.clone())));
        });
    }

    group.finish();
}

fn bench_filtered_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_search");
    group.measurement_time(Duration::from_secs(3));
    group.sample_size(50);

    let (coordinator, _temp_dir) = get_or_create_corpus();

    let queries = [
        ("no_filter", "result"),
        ("include_filter", "path:**/module_1/** result"),
        ("rust_extension", "ext:rs result"),
    ];

    for (name, pattern) in queries {
        group.bench_function(name, |b| {
            b.iter(|| black_box(coordinator.search(black_box(pattern), 100)));
        });
    }

    group.finish();
}

fn bench_case_sensitivity(c: &mut Criterion) {
    let mut group = c.benchmark_group("case_sensitivity");
    group.measurement_time(Duration::from_secs(3));
    group.sample_size(50);

    let (coordinator, _temp_dir) = get_or_create_corpus();

    for (name, pattern) in [("lowercase", "result"), ("uppercase", "RESULT"), ("mixed_case", "HashMap")] {
        group.bench_function(name, |b| {
            let options = SearchWithOptions { case_insensitive: true, max_results: 100, ..SearchWithOptions::default() };
            b.iter(|| black_box(coordinator.search_with_options(black_box(pattern), options.clone())));
        });
    }

    group.finish();
}

fn bench_result_limits(c: &mut Criterion) {
    let mut group = c.benchmark_group("result_limits");
    group.measurement_time(Duration::from_secs(3));
    group.sample_size(50);

    let (coordinator, _temp_dir) = get_or_create_corpus();

    for limit in [10i64, 100, 500] {
        group.bench_with_input(BenchmarkId::new("limit", limit), &limit, |b, &limit| {
            let options = SearchWithOptions { max_results: limit, ..SearchWithOptions::default() };
            b.iter(|| black_box(coordinator.search_with_options(black_box("result"), options.clone())));
        });
    }

    group.finish();
}

fn bench_query_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_length");
    group.measurement_time(Duration::from_secs(3));
    group.sample_size(50);

    let (coordinator, _temp_dir) = get_or_create_corpus();

    let queries = [("short", "fn"), ("medium", "process_"), ("long", "process_data_0_0")];

    for (name, query) in queries {
        group.bench_function(name, |b| {
            b.iter(|| black_box(coordinator.search(black_box(query), 100)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_text_search,
    bench_regex_search,
    bench_filtered_search,
    bench_case_sensitivity,
    bench_result_limits,
    bench_query_length,
);

criterion_main!(benches);
