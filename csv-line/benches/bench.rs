use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use csv_line::{escape, tokenize, Fields};

static PLAIN: &str = "John Doe,54,London,engineer,2019-04-01,12.5%,yes";
static QUOTED: &str =
    "\"Doe, John\",54,\"said \"\"hi\"\"\",\"a\r\nb\",2019-04-01,\"x,y,z\",no";

fn count_fields(line: &str) -> usize {
    Fields::new(line, ',').count()
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    for (name, line) in &[("plain", PLAIN), ("quoted", QUOTED)] {
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_function(format!("{}_owned", name), |b| {
            b.iter(|| tokenize(black_box(line), ','))
        });
        group.bench_function(format!("{}_borrowed", name), |b| {
            b.iter(|| count_fields(black_box(line)))
        });
    }
    group.finish();
}

fn bench_escape(c: &mut Criterion) {
    let fields = tokenize(QUOTED, ',');
    let bytes: usize = fields.iter().map(|f| f.len()).sum();
    let mut group = c.benchmark_group("escape");
    group.throughput(Throughput::Bytes(bytes as u64));
    group.bench_function("quoted_fields", |b| {
        b.iter(|| {
            fields.iter().map(|f| escape(black_box(f), ',').len()).sum::<usize>()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_escape);
criterion_main!(benches);
