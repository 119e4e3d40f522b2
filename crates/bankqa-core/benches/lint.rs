use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bankqa_core::config::QaConfig;
use bankqa_core::lint::{lint_bank, LintTables};
use bankqa_core::model::BLUEPRINT;
use bankqa_core::parser::parse_bank;
use bankqa_core::schema::validate_schema;

fn synthetic_bank(n: usize) -> Vec<u8> {
    let items: Vec<String> = (0..n)
        .map(|i| {
            let (domain, _) = BLUEPRINT[i % BLUEPRINT.len()];
            format!(
                r#"{{"id": "q-{i}", "domain": "{domain}",
                    "stem": "The security manager at organization {i} must decide which control should be the first priority after an incident involving a vendor.",
                    "choices": ["Isolate the affected segment", "Rotate vendor credentials", "Notify the regulator", "None of the above"],
                    "correctIndex": {}, "difficulty": {:.2}, "discrimination": 1.0,
                    "explanation": "Containment comes first.", "sourceIds": ["nist"]}}"#,
                i % 4,
                (i % 7) as f64 / 3.0 - 1.0
            )
        })
        .collect();
    format!(r#"{{"items": [{}], "sourceCatalog": {{}}}}"#, items.join(",")).into_bytes()
}

fn bench_lint(c: &mut Criterion) {
    let mut group = c.benchmark_group("lint_bank");
    let tables = LintTables::new().unwrap();
    let config = QaConfig::default();

    for n in [100, 1_000, 5_000] {
        let bank = parse_bank(&synthetic_bank(n)).unwrap();
        group.bench_function(format!("items={n}"), |b| {
            b.iter(|| lint_bank(black_box(&bank), &tables, &config.lint))
        });
    }

    group.finish();
}

fn bench_schema(c: &mut Criterion) {
    let bank = parse_bank(&synthetic_bank(1_000)).unwrap();
    c.bench_function("validate_schema/items=1000", |b| {
        b.iter(|| validate_schema(black_box(&bank)))
    });
}

fn bench_parse(c: &mut Criterion) {
    let bytes = synthetic_bank(1_000);
    c.bench_function("parse_bank/items=1000", |b| {
        b.iter(|| parse_bank(black_box(&bytes)))
    });
}

criterion_group!(benches, bench_lint, bench_schema, bench_parse);
criterion_main!(benches);
