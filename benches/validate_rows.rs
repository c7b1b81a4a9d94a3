use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use sheet_validate::{
    DynamicRecord, RuleSet, ValidationOptions, schema::BindingFile, source::CsvSource, validate,
};
use tempfile::TempDir;

const BINDING: &str = r#"
formatter: trim
unique: [id]
fields:
  - name: id
    kind: integer
    required: true
  - name: name
    kind: text
    required: true
    max_length: 32
  - name: amount
    kind: float
    min: 0
  - name: ordered_at
    kind: date
"#;

fn generate_orders(rows: usize, bad_every: Option<usize>) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("orders.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "id,name,amount,ordered_at").expect("header");
    for i in 0..rows {
        let day = (i % 28) + 1;
        let hour = i % 24;
        let amount = match bad_every {
            Some(every) if i % every == 0 => "n/a".to_string(),
            _ => format!("{}.{:02}", i % 500, i % 100),
        };
        writeln!(
            file,
            "{i}, customer {i} ,{amount},2024/1/{day} {hour}:00:00"
        )
        .expect("row");
    }
    (temp_dir, csv_path)
}

fn bench_validate(c: &mut Criterion) {
    let binding = BindingFile::from_yaml_str(BINDING).expect("binding");
    let schema = binding.record_schema().expect("schema");
    let columns = binding.column_map().expect("columns");
    let rules = RuleSet::from_binding(&binding).expect("rules");
    let options = ValidationOptions::<DynamicRecord>::from_binding(&binding);

    let (clean_dir, clean_path) = generate_orders(20_000, None);
    let (dirty_dir, dirty_path) = generate_orders(20_000, Some(50));

    let mut group = c.benchmark_group("validate_rows");
    group.sample_size(20);

    group.bench_function("clean_20k", |b| {
        b.iter_batched(
            || CsvSource::new(&clean_path),
            |mut source| {
                let result = validate(&mut source, &columns, &schema, &rules, &options)
                    .expect("validate clean");
                assert!(result.is_valid);
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("coercion_failures_20k", |b| {
        b.iter_batched(
            || CsvSource::new(&dirty_path),
            |mut source| {
                let result = validate(&mut source, &columns, &schema, &rules, &options)
                    .expect("validate dirty");
                assert!(!result.is_valid);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
    drop(clean_dir);
    drop(dirty_dir);
}

criterion_group!(benches, bench_validate);
criterion_main!(benches);
