use criterion::{criterion_group, criterion_main, Criterion};
use datamodel::prelude::*;

fn make_model(rows: usize) -> DataModel {
    let mut cities = Vec::with_capacity(rows);
    let mut orders = Vec::with_capacity(rows);
    let mut values = Vec::with_capacity(rows);
    for i in 0..rows {
        cities.push(Scalar::Str(format!("city-{}", i % 64)));
        orders.push(Scalar::F64(((i * 7919) % rows) as f64));
        values.push(Scalar::F64((i % 10) as f64));
    }
    let schema = Schema::from_specs(&[
        FieldSpec::dimension("city"),
        FieldSpec::measure("order"),
        FieldSpec::measure("value"),
    ])
    .unwrap();
    DataModel::from_columns(schema, vec![cities, orders, values]).unwrap()
}

fn make_lookup() -> DataModel {
    let schema =
        Schema::from_specs(&[FieldSpec::dimension("city"), FieldSpec::dimension("region")])
            .unwrap();
    let cities = (0..64).map(|i| Scalar::Str(format!("city-{i}"))).collect();
    let regions = (0..64)
        .map(|i| Scalar::Str(format!("region-{}", i % 4)))
        .collect();
    DataModel::from_columns(schema, vec![cities, regions]).unwrap()
}

fn bench_group_by(c: &mut Criterion) {
    let model = make_model(16_384);
    let ctx = Context::default();
    let spec = ReducerSpec::new().with("value", "avg");
    c.bench_function("group_by_city", |b| {
        b.iter(|| {
            let _ = group_by(&model, &["city"], &spec, ctx.reducers()).unwrap();
        })
    });
}

fn bench_hash_join(c: &mut Criterion) {
    let model = make_model(16_384);
    let lookup = make_lookup();
    c.bench_function("natural_join_lookup", |b| {
        b.iter(|| {
            let _ = natural_join(&model, &lookup).unwrap();
        })
    });
}

fn bench_sort(c: &mut Criterion) {
    let model = make_model(16_384);
    let keys = [SortKey::asc("city"), SortKey::desc("order")];
    c.bench_function("merge_sort_two_keys", |b| {
        b.iter(|| {
            let _ = sort(&model, &keys).unwrap();
        })
    });
}

criterion_group!(operators, bench_group_by, bench_hash_join, bench_sort);
criterion_main!(operators);
