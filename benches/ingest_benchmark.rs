//! Criterion benchmarks for cold-start corpus ingest
//!
//! Run with: cargo bench --bench ingest_benchmark
//! View HTML report: target/criterion/report/index.html
//!
//! These benchmarks measure the scan -> parse -> integrate pipeline's
//! throughput indexing a synthetic corpus from a clean `Coordinator`, plus
//! the cost of the incremental paths (single-file update, removal) once a
//! corpus is already resident.

use codeloom::config::Config;
use codeloom::coordinator::Coordinator;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Generate synthetic source files for benchmarking
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
        content.push_str("    pub fn call_peer(&self) -> String {\n");
        content.push_str(&format!("        process_data_0_{}(\"x\").unwrap_or_default()\n", if i > 0 { i - 1 } else { i }));
        content.push_str("    }\n");
        content.push_str("}\n");

        let path = PathBuf::from(format!("src/module_{}/processor_{i}.rs", i / 10));
        files.push((path, content));
    }

    files
}

/// Create a temp directory populated with source files, without indexing it.
fn write_corpus(num_files: usize, lines_per_file: usize) -> TempDir {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    for (rel_path, content) in generate_source_files(num_files, lines_per_file) {
        let full_path = temp_dir.path().join(&rel_path);
        std::fs::create_dir_all(full_path.parent().unwrap()).unwrap();
        std::fs::write(&full_path, content).unwrap();
    }
    temp_dir
}

/// Benchmark the full cold-start scan -> parse -> integrate -> reduce pipeline.
fn bench_index_directory(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_directory");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(10);

    for num_files in [100, 500, 1000] {
        let temp_dir = write_corpus(num_files, 50);

        group.throughput(Throughput::Elements(num_files as u64));
        group.bench_with_input(BenchmarkId::from_parameter(num_files), &num_files, |b, _| {
            b.iter(|| {
                let coordinator = Coordinator::new(Config::default());
                let outcome = coordinator
                    .index_directory(black_box(temp_dir.path()))
                    .expect("failed to index corpus");
                black_box(outcome);
            });
        });
    }

    group.finish();
}

/// Benchmark a single-file incremental update against an already-resident corpus,
/// isolating the point-update path from the bulk `index_directory` reduce pass.
fn bench_update_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_file");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for num_files in [100, 500, 1000] {
        let temp_dir = write_corpus(num_files, 50);
        let coordinator = Coordinator::new(Config::default());
        coordinator.index_directory(temp_dir.path()).expect("failed to index corpus");
        let target = temp_dir.path().join("src/module_0/processor_0.rs");

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(num_files), &num_files, |b, &i| {
            let mut version = 0u32;
            b.iter(|| {
                version += 1;
                let content = format!("pub fn edited_{i}_{version}() {{}}\n");
                coordinator
                    .update_file(black_box(&target), content.as_bytes())
                    .expect("failed to update file");
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_index_directory, bench_update_file);
criterion_main!(benches);
