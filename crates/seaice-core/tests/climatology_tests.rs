//! End-to-end grouped statistics and climatology tests

mod common;

use common::fixtures::{load_cores, load_table, salinity};
use seaice_core::{
    compute_climatology, grouped_cores, BinningError, ClimatologyRow, DegreeDays, Diagnostics, FieldValue, GroupKey, KeyValue,
    ObservationRow, SeaIceError, Stack, Stage, Statistic, VerticalReference,
};

fn scenario_a() -> Stack {
    Stack::from_rows(vec![
        salinity("A", 0.0, 10.0, Some(5.0)),
        salinity("A", 10.0, 20.0, Some(7.0)),
        salinity("B", 0.0, 10.0, Some(3.0)),
    ])
}

fn depth(edges: &[f64]) -> GroupKey {
    GroupKey::depth(edges.to_vec())
}

// === Grouped statistics ===

#[test]
fn test_two_core_mean_with_provenance() {
    let mut diag = Diagnostics::new();
    let groups = vec![GroupKey::categorical("v_ref"), depth(&[0.0, 10.0, 20.0])];
    let table = scenario_a()
        .section_stat(&groups, None, &[Statistic::Mean], &mut diag)
        .unwrap();

    assert_eq!(table.len(), 2);
    let top = Some(KeyValue::Label(FieldValue::Text("top".into())));

    let first = &table.rows[0];
    assert_eq!(first.value, Some(4.0));
    assert_eq!(first.n, 2);
    assert_eq!(first.collection.as_deref(), Some("A, B"));
    assert_eq!(first.keys, vec![top.clone()]);
    assert_eq!(first.stats, Statistic::Mean);
    assert_eq!(first.v_ref, VerticalReference::Top);

    let second = &table.rows[1];
    assert_eq!(second.value, Some(7.0));
    assert_eq!(second.n, 1);
    assert_eq!(second.collection.as_deref(), Some("A"));
    assert_eq!((second.y_low, second.y_sup, second.y_mid), (Some(10.0), Some(20.0), Some(15.0)));
}

#[test]
fn test_zero_weight_and_missing_values_give_missing_bin() {
    let stack = Stack::from_rows(vec![
        salinity("A", 0.0, 10.0, Some(100.0)).with_weight(0.0),
        salinity("B", 0.0, 10.0, None),
        salinity("C", 0.0, 10.0, None),
    ]);
    let mut diag = Diagnostics::new();
    let table = stack
        .section_stat(&[depth(&[0.0, 10.0])], None, &[Statistic::Mean, Statistic::Sum], &mut diag)
        .unwrap();

    for row in &table.rows {
        assert_eq!(row.value, None);
        assert_eq!(row.n, 0);
        assert_eq!(row.collection, None);
    }
    // every member is still listed
    assert_eq!(table.membership["salinity"][0], vec!["A", "B", "C"]);
}

#[test]
fn test_zero_weight_core_listed_only_through_weighted_rows() {
    let stack = Stack::from_rows(vec![
        salinity("A", 0.0, 10.0, Some(100.0)).with_weight(0.0),
        salinity("A", 0.0, 10.0, Some(2.0)),
        salinity("B", 0.0, 10.0, Some(4.0)),
    ]);
    let mut diag = Diagnostics::new();
    let table = stack
        .section_stat(&[depth(&[0.0, 10.0])], None, &[Statistic::Mean, Statistic::Max], &mut diag)
        .unwrap();
    let mean = table.select("salinity", Statistic::Mean)[0];
    assert_eq!(mean.value, Some(3.0));
    assert_eq!(mean.cores(), vec!["A", "B"]);
    assert_eq!(mean.n, mean.cores().len());
    assert_eq!(table.select("salinity", Statistic::Max)[0].value, Some(4.0));
}

#[test]
fn test_unsupported_statistic_is_fatal() {
    let err = Statistic::parse_list(&["mean", "median"]).unwrap_err();
    assert!(err.to_string().contains("median"));
    let err: SeaIceError = err.into();
    assert!(matches!(err, SeaIceError::Stat(_)));
}

#[test]
fn test_empty_grouping_is_fatal() {
    let mut diag = Diagnostics::new();
    let err = scenario_a()
        .section_stat(&[], None, &[Statistic::Mean], &mut diag)
        .unwrap_err();
    assert!(matches!(err, SeaIceError::Binning(BinningError::EmptyGrouping)));
}

#[test]
fn test_depth_edges_synthesized_from_horizons() {
    let mut diag = Diagnostics::new();
    let table = scenario_a()
        .section_stat(&[GroupKey::categorical("name")], None, &[Statistic::Mean], &mut diag)
        .unwrap();
    // 2 cores x 2 depth bins from horizons 0, 10, 20
    assert_eq!(table.len(), 4);
    assert_eq!(table.rows[2].keys, vec![Some(KeyValue::Label(FieldValue::Text("B".into())))]);
    assert_eq!(table.rows[2].value, Some(3.0));
    assert_eq!(table.rows[3].value, None);
    assert_eq!(diag.for_stage(Stage::Binning).len(), 2);
}

#[test]
fn test_mixed_profile_shape_reported() {
    let stack = Stack::from_rows(vec![
        salinity("A", 0.0, 10.0, Some(5.0)),
        ObservationRow::point("B", "salinity", 5.0)
            .with_value("salinity", Some(3.0))
            .with_weight(1.0),
    ]);
    let mut diag = Diagnostics::new();
    let table = stack
        .section_stat(&[depth(&[0.0, 10.0])], None, &[Statistic::Mean], &mut diag)
        .unwrap();
    assert_eq!(table.rows[0].value, Some(4.0));
    assert_eq!(table.rows[0].y_low, None);
    assert_eq!(table.rows[0].y_mid, Some(5.0));
    assert_eq!(diag.for_stage(Stage::Assemble).len(), 1);
}

#[test]
fn test_grouped_cores_by_depth() {
    let cores = grouped_cores(&scenario_a(), &[depth(&[0.0, 10.0, 20.0])]).unwrap();
    assert_eq!(cores[[0]], vec!["A", "B"]);
    assert_eq!(cores[[1]], vec!["A"]);
}

// === Fixture pipeline ===

#[test]
fn test_fixture_climatology() {
    let (stack, _) = load_cores();
    assert_eq!(stack.names(), vec!["BRW-1", "BRW-2"]);

    let lookup = DegreeDays::from_tables(&load_table("degree_days.csv"), &load_table("freezeup.csv")).unwrap();
    let mut diag = Diagnostics::new();
    let enriched = lookup.enrich(&stack, &mut diag);
    assert!(diag.is_empty());
    assert_eq!(enriched.rows()[0].dd, Some(2500.0));
    assert_eq!(enriched.rows()[4].dd, Some(-40.0));

    let table = compute_climatology(
        &enriched,
        &[-100.0, 0.0, 3000.0, 4000.0],
        &[0.0, 10.0, 20.0],
        None,
        &[VerticalReference::Top],
        &mut diag,
    )
    .unwrap();

    // 2 variables x 4 stats x 3 DD bins x 2 depth bins
    assert_eq!(table.len(), 48);

    let means = table.select("salinity", Statistic::Mean);
    let dd_bin = |row: &ClimatologyRow| match &row.keys[0] {
        Some(KeyValue::Bin { index, .. }) => *index,
        _ => usize::MAX,
    };
    let thawing: Vec<_> = means.iter().filter(|&&r| dd_bin(r) == 0).collect();
    assert_eq!(thawing[0].value, Some(3.0));
    assert_eq!(thawing[0].collection.as_deref(), Some("BRW-2"));
    let freezing: Vec<_> = means.iter().filter(|&&r| dd_bin(r) == 1).collect();
    assert_eq!(freezing[0].value, Some(5.0));
    assert_eq!(freezing[1].value, Some(7.0));

    let temperature = table.select("temperature", Statistic::Mean);
    assert_eq!(temperature[2].y_low, None);
    assert_eq!(temperature[2].value, Some(-10.0));

    assert_eq!(table.membership["salinity"], vec![vec!["BRW-2"], vec!["BRW-1"], vec![]]);

    let flat = table.to_table().unwrap();
    assert!(flat.has_column("bin_DD"));
    assert!(flat.has_column("DD_min"));
    assert!(flat.has_column("temperature"));
}

#[test]
fn test_fixture_climatology_bottom_reference() {
    let (stack, _) = load_cores();
    let lookup = DegreeDays::from_tables(&load_table("degree_days.csv"), &load_table("freezeup.csv")).unwrap();
    let mut diag = Diagnostics::new();
    let enriched = lookup.enrich(&stack, &mut diag);
    let variables = vec!["salinity".to_string()];
    let table = compute_climatology(
        &enriched,
        &[0.0, 3000.0],
        &[0.0, 50.0, 100.0],
        Some(&variables),
        &[VerticalReference::Top, VerticalReference::Bottom],
        &mut diag,
    )
    .unwrap();

    // 2 references x 4 stats x 1 DD bin x 2 depth bins
    assert_eq!(table.len(), 16);
    let bottom: Vec<_> = table
        .rows
        .iter()
        .filter(|r| r.v_ref == VerticalReference::Bottom && r.stats == Statistic::Mean)
        .collect();
    // BRW-1 sections sit 80-100 cm above the ice/water interface
    assert_eq!(bottom[0].value, None);
    assert_eq!(bottom[1].value, Some(6.0));
}
