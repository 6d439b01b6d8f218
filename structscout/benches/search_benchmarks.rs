use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::{Cursor, Write};
use structscout::archive::ZipFile;
use structscout::chunk::{chunk_ranges, chunks_to_matches};
use structscout::comby::pattern::structural_pat_to_regexp_query;
use structscout::search::{regex_search_batch, PatternMatcher};
use structscout::{Cancellation, Location, PatternInfo, Range};
use zip::write::FileOptions;

fn create_test_archive(file_count: usize, lines_per_file: usize) -> ZipFile {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..file_count {
        writer
            .start_file(format!("src/file_{}.go", i), FileOptions::default())
            .unwrap();
        for j in 0..lines_per_file {
            writeln!(
                writer,
                "func f{}() {{ fmt.Println(\"line {} TODO: fix bug {}\") }}",
                j, j, i
            )
            .unwrap();
        }
    }
    let bytes = writer.finish().unwrap().into_inner();
    ZipFile::from_reader(Cursor::new(bytes)).unwrap()
}

/// One range every `stride` lines, as if every line were 40 bytes long
fn spread_ranges(count: u32, stride: u32) -> Vec<Range> {
    (0..count)
        .rev()
        .map(|i| {
            let line = i * stride;
            let offset = line * 40;
            Range::new(
                Location::new(offset + 4, line, 4),
                Location::new(offset + 12, line, 12),
            )
        })
        .collect()
}

fn bench_chunk_ranges(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_ranges");

    let dense = spread_ranges(10_000, 1);
    group.bench_function("dense_gap_0", |b| {
        b.iter(|| chunk_ranges(black_box(dense.clone()), 0))
    });

    let sparse = spread_ranges(10_000, 5);
    group.bench_function("sparse_gap_3", |b| {
        b.iter(|| chunk_ranges(black_box(sparse.clone()), 3))
    });

    let buf = vec![b'x'; 40 * 50_000];
    group.bench_function("chunks_to_matches", |b| {
        b.iter(|| chunks_to_matches(black_box(&buf), chunk_ranges(sparse.clone(), 0)))
    });

    group.finish();
}

fn bench_regex_search(c: &mut Criterion) {
    let zip = create_test_archive(200, 200);
    let cancel = Cancellation::new();
    let mut group = c.benchmark_group("regex_search_batch");

    let literal = PatternMatcher::compile(&PatternInfo::literal("TODO")).unwrap();
    group.bench_function("literal", |b| {
        b.iter(|| regex_search_batch(black_box(&literal), &zip, 0, &cancel).unwrap())
    });

    let prefilter = PatternMatcher::compile(&PatternInfo::regex(structural_pat_to_regexp_query(
        "fmt.Println(:[args])",
        false,
    )))
    .unwrap();
    group.bench_function("structural_prefilter", |b| {
        b.iter(|| regex_search_batch(black_box(&prefilter), &zip, 0, &cancel).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_chunk_ranges, bench_regex_search);
criterion_main!(benches);
