//! Benchmarks for sluice-core ingestion.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use sluice_core::ChecksumAlgorithm;
use sluice_core::IngestConfig;
use sluice_core::IngestPipeline;
use sluice_core::ShapefileRules;
use sluice_core::SniffingClassifier;
use sluice_core::UploadSession;
use sluice_core::checksum::digest;
use sluice_core::formats::shapefile::plan_groups;
use std::io::Cursor;
use std::io::Write;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::write::ZipWriter;

/// Creates a ZIP archive with many small files.
fn create_many_small_files_zip(file_count: usize) -> Vec<u8> {
    let buffer = Vec::new();
    let mut zip = ZipWriter::new(Cursor::new(buffer));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for i in 0..file_count {
        let filename = format!("file{i:04}.txt");
        zip.start_file(&filename, options).unwrap();
        zip.write_all(format!("content{i}").as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// Files directory with its `temp` subdirectory.
fn files_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("temp")).unwrap();
    temp
}

fn benchmark_many_small_files(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_small_files");

    for file_count in [10, 100, 600] {
        let zip_data = create_many_small_files_zip(file_count);
        group.throughput(Throughput::Elements(file_count as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(file_count),
            &zip_data,
            |b, data| {
                b.iter(|| {
                    let temp = files_dir();
                    let config = IngestConfig::new(temp.path()).with_zip_upload_files_limit(0);
                    let pipeline = IngestPipeline::new(&config, SniffingClassifier::new());
                    let session = UploadSession::new(Cursor::new(data.clone()), "bench.zip");
                    pipeline.ingest(session).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_checksums(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");
    let data = vec![0xAB_u8; 8 * 1024 * 1024];
    group.throughput(Throughput::Bytes(data.len() as u64));

    for algorithm in ChecksumAlgorithm::ALL {
        group.bench_with_input(
            BenchmarkId::from_parameter(algorithm),
            &data,
            |b, data| {
                b.iter(|| digest(&mut Cursor::new(data), algorithm).unwrap());
            },
        );
    }

    group.finish();
}

fn benchmark_shapefile_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("shapefile_plan");

    for sets in [10, 100, 1000] {
        let names: Vec<String> = (0..sets)
            .flat_map(|i| {
                ["shp", "shx", "dbf", "prj", "txt"]
                    .into_iter()
                    .map(move |ext| format!("layers/layer{i}.{ext}"))
            })
            .collect();
        group.throughput(Throughput::Elements(names.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(sets), &names, |b, names| {
            b.iter(|| plan_groups(names, ShapefileRules::default()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_many_small_files,
    benchmark_checksums,
    benchmark_shapefile_planning
);
criterion_main!(benches);
