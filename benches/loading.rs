use criterion::{black_box, criterion_group, criterion_main, Criterion};

use csv_sqlite_loader::ingestion::{parse_csv_from_bytes, CsvOptions};
use csv_sqlite_loader::storage::Storage;

fn synthetic_csv(rows: usize) -> String {
    let mut out = String::from("id,name,score,city\n");
    for i in 0..rows {
        let city = if i % 7 == 0 { "" } else { "Lisbon" };
        out.push_str(&format!("{i},user_{i},{}.5,{city}\n", i % 100));
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let input = synthetic_csv(10_000);
    let opts = CsvOptions::default();
    c.bench_function("parse_csv_10k_rows", |b| {
        b.iter(|| parse_csv_from_bytes(black_box(input.as_bytes()), &opts).unwrap())
    });
}

fn bench_write(c: &mut Criterion) {
    let data = parse_csv_from_bytes(synthetic_csv(10_000).as_bytes(), &CsvOptions::default()).unwrap();
    let mut storage = Storage::open(":memory:").unwrap();
    c.bench_function("write_table_10k_rows", |b| {
        b.iter(|| storage.write_table("bench", black_box(&data)).unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_write);
criterion_main!(benches);
