//! Worked examples: group-by totals, outer joins on an id, equal-width binning.

use datamodel::prelude::*;
use serde_json::{json, Value};

fn build(rows: Value, schema: &[FieldSpec]) -> DataModel {
    let Value::Array(items) = rows else {
        panic!("expected an array of rows");
    };
    let rows = items
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(m) => Some(m),
            _ => None,
        })
        .collect();
    data_builder(&RawData::Rows(rows), schema, &BuildOptions::default()).unwrap()
}

#[test]
fn group_by_sums_sales_per_city() {
    let m = build(
        json!([
            { "city": "NY", "sales": 10 },
            { "city": "NY", "sales": 5 },
            { "city": "LA", "sales": 7 }
        ]),
        &[FieldSpec::dimension("city"), FieldSpec::measure("sales")],
    );
    let ctx = Context::default();
    let out = group_by(
        &m,
        &["city"],
        &ReducerSpec::new().with("sales", "sum"),
        ctx.reducers(),
    )
    .unwrap();
    assert_eq!(
        out.to_json_rows(),
        vec![
            json!({ "city": "NY", "sales": 15.0 }).as_object().unwrap().clone(),
            json!({ "city": "LA", "sales": 7.0 }).as_object().unwrap().clone(),
        ]
    );
}

fn id_models() -> (DataModel, DataModel) {
    let left = build(
        json!([{ "id": 1, "x": "a" }]),
        &[FieldSpec::dimension("id"), FieldSpec::dimension("x")],
    );
    let right = build(
        json!([{ "id": 1, "y": "b" }, { "id": 2, "y": "c" }]),
        &[FieldSpec::dimension("id"), FieldSpec::dimension("y")],
    );
    (left, right)
}

#[test]
fn outer_joins_on_id() {
    let (left, right) = id_models();
    let on_id = JoinCondition::on([("id", "id")]);

    let l = left_outer_join(&left, &right, &on_id).unwrap();
    assert_eq!(l.schema().names().collect::<Vec<_>>(), vec!["id", "x", "y"]);
    assert_eq!(
        l.get_data().data,
        vec![vec!["1".into(), "a".into(), "b".into()]]
    );

    let f = full_outer_join(&left, &right, &on_id).unwrap();
    assert_eq!(
        f.get_data().data,
        vec![
            vec!["1".into(), "a".into(), "b".into()],
            vec!["2".into(), Scalar::Null, "c".into()],
        ]
    );

    let r = right_outer_join(&left, &right, &on_id).unwrap();
    assert_eq!(r.len(), 2);
    assert_eq!(natural_join(&left, &right).unwrap().len(), 1);
}

#[test]
fn equal_width_bins_of_ten() {
    let m = build(
        json!([{ "v": 1 }, { "v": 5 }, { "v": 9 }, { "v": 15 }]),
        &[FieldSpec::measure("v")],
    );
    let cfg = BinConfig::default().with_strategy(BinStrategy::Size {
        size: 10.0,
        start: Some(0.0),
        end: None,
    });
    let out = bin(&m, "v", &cfg).unwrap();
    let labels: Vec<String> = out.rows().map(|r| r.value("v_binned").to_string()).collect();
    assert_eq!(labels, vec!["0-10", "0-10", "0-10", "10-20"]);
}

#[test]
fn composed_pipeline_matches_manual_chain() {
    let m = build(
        json!([
            { "city": "NY", "sales": 10 },
            { "city": "NY", "sales": 5 },
            { "city": "LA", "sales": 7 },
            { "city": "SF", "sales": 1 }
        ]),
        &[FieldSpec::dimension("city"), FieldSpec::measure("sales")],
    );
    let ctx = Context::default();
    let pipeline = compose(vec![
        Box::new(Select::new("sales > 2", |r| {
            r.value("sales").as_f64().is_some_and(|v| v > 2.0)
        })),
        Box::new(GroupBy::new(["city"], ReducerSpec::new())),
        Box::new(Sort::new(vec![SortKey::desc("sales")])),
    ]);
    let out = pipeline.run(&m, &ctx).unwrap();

    let manual = sort(
        &group_by(
            &select(&m, |r| r.value("sales").as_f64().is_some_and(|v| v > 2.0)),
            &["city"],
            &ReducerSpec::new(),
            ctx.reducers(),
        )
        .unwrap(),
        &[SortKey::desc("sales")],
    )
    .unwrap();
    assert_eq!(out.get_data().data, manual.get_data().data);
    assert_eq!(out.row(0).value("city"), &Scalar::from("NY"));
}

#[test]
fn custom_reducers_live_in_the_context() {
    let m = build(
        json!([{ "k": "a", "v": 2 }, { "k": "a", "v": 3 }]),
        &[FieldSpec::dimension("k"), FieldSpec::measure("v")],
    );
    let mut ctx = Context::default();
    ctx.def_reducer("product", |values: &[Scalar]| {
        Scalar::F64(values.iter().filter_map(Scalar::as_f64).product())
    });
    let spec = ReducerSpec::new().with("v", "product");
    let out = group_by(&m, &["k"], &spec, ctx.reducers()).unwrap();
    assert_eq!(out.row(0).value("v"), &Scalar::F64(6.0));

    let fresh = Context::default();
    assert!(group_by(&m, &["k"], &spec, fresh.reducers()).is_err());
}
